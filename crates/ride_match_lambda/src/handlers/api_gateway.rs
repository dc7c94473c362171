use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiGatewayResponse {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub headers: Value,
    pub body: String,
}

impl ApiGatewayResponse {
    pub fn body_json(&self) -> Result<Value, serde_json::Error> {
        serde_json::from_str(&self.body)
    }
}

/// True when `event` looks like an API Gateway proxy event rather than a
/// direct invocation whose own payload happens to carry a `body` field.
pub fn is_proxy_event(event: &Value) -> bool {
    let Some(object) = event.as_object() else {
        return false;
    };
    if ["requestContext", "httpMethod", "isBase64Encoded"]
        .iter()
        .any(|key| object.contains_key(*key))
    {
        return true;
    }
    !object.contains_key("token")
        && matches!(object.get("body"), Some(Value::String(_) | Value::Object(_)))
}

/// Unwraps an API Gateway proxy event into its JSON body.
///
/// Direct invocations (no `body` key) pass through unchanged.
pub fn normalize_apigw_event(event: Value) -> Result<Value, String> {
    let Some(object) = event.as_object() else {
        return Err("Request payload must be a JSON object".to_string());
    };

    let Some(body) = object.get("body") else {
        return Ok(event);
    };

    match body {
        Value::Null => Ok(json!({})),
        Value::Object(_) => Ok(body.clone()),
        Value::String(text) => {
            serde_json::from_str(text).map_err(|error| format!("Malformed JSON body: {error}"))
        }
        _ => Err("Request body must be a JSON object".to_string()),
    }
}

pub fn validation_error_response(message: &str) -> ApiGatewayResponse {
    error_response(
        400,
        json!({
            "error": "validation_error",
            "message": message,
        }),
    )
}

pub fn success_response(status_code: u16, payload: impl Serialize) -> ApiGatewayResponse {
    match serde_json::to_string(&payload) {
        Ok(body) => ApiGatewayResponse {
            status_code,
            headers: json_headers(),
            body,
        },
        Err(error) => error_response(
            500,
            json!({
                "error": "serialization_error",
                "message": error.to_string(),
            }),
        ),
    }
}

pub fn error_response(status_code: u16, payload: Value) -> ApiGatewayResponse {
    ApiGatewayResponse {
        status_code,
        headers: json_headers(),
        body: payload.to_string(),
    }
}

fn json_headers() -> Value {
    json!({"Content-Type": "application/json"})
}
