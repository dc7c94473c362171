//! SNS mobile push delivery.
//!
//! The stored push token is the SNS platform endpoint ARN for the
//! volunteer's device. Messages are published with `MessageStructure=json`
//! so Android (GCM/FCM) and iOS (APNS) endpoints each get their own shape.

use serde_json::{json, Value};

use ride_match_core::notification::PushMessage;

use super::push::{PushError, PushSender};

#[derive(Clone)]
pub struct SnsPushSender {
    client: aws_sdk_sns::Client,
}

impl SnsPushSender {
    pub fn new(client: aws_sdk_sns::Client) -> Self {
        Self { client }
    }
}

/// Per-platform message envelope for a JSON-structured SNS publish.
pub fn platform_message(message: &PushMessage) -> String {
    let gcm = json!({
        "notification": {
            "title": message.title,
            "body": message.body,
        },
        "data": message.data,
    });

    let mut apns = json!({
        "aps": {
            "alert": {
                "title": message.title,
                "body": message.body,
            },
        },
    });
    if let Value::Object(object) = &mut apns {
        for (key, value) in &message.data {
            object.insert(key.clone(), Value::String(value.clone()));
        }
    }

    json!({
        "default": message.body,
        "GCM": gcm.to_string(),
        "APNS": apns.to_string(),
    })
    .to_string()
}

impl PushSender for SnsPushSender {
    fn send(&self, message: &PushMessage) -> Result<String, PushError> {
        let client = self.client.clone();
        let target_arn = message.token.clone();
        let body = platform_message(message);

        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                match client
                    .publish()
                    .target_arn(target_arn)
                    .message_structure("json")
                    .message(body)
                    .send()
                    .await
                {
                    Ok(output) => Ok(output.message_id().unwrap_or_default().to_string()),
                    Err(error) => {
                        let rejected = error
                            .as_service_error()
                            .map(|service| {
                                service.is_endpoint_disabled_exception()
                                    || service.is_invalid_parameter_exception()
                                    || service.is_not_found_exception()
                            })
                            .unwrap_or(false);
                        if rejected {
                            Err(PushError::InvalidToken(error.to_string()))
                        } else {
                            Err(PushError::Delivery(error.to_string()))
                        }
                    }
                }
            })
        })
    }
}
