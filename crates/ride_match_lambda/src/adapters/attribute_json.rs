//! Conversions between DynamoDB attribute values and plain JSON documents.
//!
//! The SDK hands out `AttributeValue`s while DynamoDB Streams events carry
//! the same data as typed JSON (`{"S": "..."}`, `{"N": "1.5"}`, ...). Both
//! are flattened into the plain JSON objects the record decoders expect.

use std::collections::HashMap;

use aws_sdk_dynamodb::types::AttributeValue;
use serde_json::{Map, Number, Value};

/// Key attribute of every table.
pub const ID_ATTRIBUTE: &str = "id";

fn number_value(text: &str) -> Option<Value> {
    if let Ok(integer) = text.parse::<i64>() {
        return Some(Value::from(integer));
    }
    text.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
}

pub fn attribute_to_json(attribute: &AttributeValue) -> Value {
    match attribute {
        AttributeValue::S(text) => Value::String(text.clone()),
        AttributeValue::N(text) => number_value(text).unwrap_or(Value::Null),
        AttributeValue::Bool(flag) => Value::Bool(*flag),
        AttributeValue::M(map) => Value::Object(
            map.iter()
                .map(|(key, value)| (key.clone(), attribute_to_json(value)))
                .collect(),
        ),
        AttributeValue::L(list) => Value::Array(list.iter().map(attribute_to_json).collect()),
        AttributeValue::Ss(items) => {
            Value::Array(items.iter().cloned().map(Value::String).collect())
        }
        AttributeValue::Ns(items) => Value::Array(
            items
                .iter()
                .filter_map(|item| number_value(item))
                .collect(),
        ),
        _ => Value::Null,
    }
}

pub fn json_to_attribute(value: &Value) -> AttributeValue {
    match value {
        Value::Null => AttributeValue::Null(true),
        Value::Bool(flag) => AttributeValue::Bool(*flag),
        Value::Number(number) => AttributeValue::N(number.to_string()),
        Value::String(text) => AttributeValue::S(text.clone()),
        Value::Array(items) => AttributeValue::L(items.iter().map(json_to_attribute).collect()),
        Value::Object(map) => AttributeValue::M(
            map.iter()
                .map(|(key, value)| (key.clone(), json_to_attribute(value)))
                .collect(),
        ),
    }
}

/// Splits a table item into its id and the remaining fields.
pub fn item_to_document(item: &HashMap<String, AttributeValue>) -> Option<(String, Value)> {
    let id = match item.get(ID_ATTRIBUTE) {
        Some(AttributeValue::S(id)) => id.clone(),
        _ => return None,
    };
    let fields: Map<String, Value> = item
        .iter()
        .filter(|(key, _)| key.as_str() != ID_ATTRIBUTE)
        .map(|(key, value)| (key.clone(), attribute_to_json(value)))
        .collect();
    Some((id, Value::Object(fields)))
}

pub fn document_to_item(id: &str, fields: &Map<String, Value>) -> HashMap<String, AttributeValue> {
    let mut item: HashMap<String, AttributeValue> = fields
        .iter()
        .filter(|(key, _)| key.as_str() != ID_ATTRIBUTE)
        .map(|(key, value)| (key.clone(), json_to_attribute(value)))
        .collect();
    item.insert(ID_ATTRIBUTE.to_string(), AttributeValue::S(id.to_string()));
    item
}

/// Converts one typed stream attribute (`{"S": "x"}`) into plain JSON.
pub fn stream_attribute_to_json(attribute: &Value) -> Result<Value, String> {
    let object = attribute
        .as_object()
        .filter(|object| object.len() == 1)
        .ok_or_else(|| "stream attribute must be a single-key object".to_string())?;
    let (kind, inner) = object
        .iter()
        .next()
        .ok_or_else(|| "stream attribute must be a single-key object".to_string())?;

    match (kind.as_str(), inner) {
        ("S", Value::String(text)) | ("B", Value::String(text)) => Ok(Value::String(text.clone())),
        ("N", Value::String(text)) => {
            number_value(text).ok_or_else(|| format!("invalid number attribute '{text}'"))
        }
        ("BOOL", Value::Bool(flag)) => Ok(Value::Bool(*flag)),
        ("NULL", _) => Ok(Value::Null),
        ("M", Value::Object(_)) => stream_image_to_json(inner),
        ("L", Value::Array(items)) => items
            .iter()
            .map(stream_attribute_to_json)
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        ("SS", Value::Array(items)) | ("BS", Value::Array(items)) => Ok(Value::Array(items.clone())),
        ("NS", Value::Array(items)) => items
            .iter()
            .map(|item| {
                item.as_str()
                    .and_then(number_value)
                    .ok_or_else(|| format!("invalid number set member '{item}'"))
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        (other, _) => Err(format!("unsupported stream attribute type '{other}'")),
    }
}

/// Converts a stream image (attribute name -> typed attribute) into plain JSON.
pub fn stream_image_to_json(image: &Value) -> Result<Value, String> {
    let object = image
        .as_object()
        .ok_or_else(|| "stream image must be an object".to_string())?;
    let mut fields = Map::with_capacity(object.len());
    for (name, attribute) in object {
        let value = stream_attribute_to_json(attribute)
            .map_err(|error| format!("attribute '{name}': {error}"))?;
        fields.insert(name.clone(), value);
    }
    Ok(Value::Object(fields))
}
