//! Shared ride matching domain primitives.
//!
//! This crate owns the deterministic parts of volunteer matching: record
//! schemas and decoding, the ride status state machine, great-circle
//! distance, candidate ranking and notification payloads. It excludes the
//! AWS SDK and Lambda runtime concerns, which live in `ride_match_lambda`.

pub mod contract;
pub mod decode;
pub mod geo;
pub mod matching;
pub mod model;
pub mod notification;
