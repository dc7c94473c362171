pub mod attribute_json;
pub mod document_store;
pub mod dynamodb;
pub mod memory_store;
pub mod push;
pub mod sns;
