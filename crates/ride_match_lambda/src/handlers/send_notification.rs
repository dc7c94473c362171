//! Callable that pushes an arbitrary notification to one device token.

use serde_json::{json, Value};
use tracing::Level;

use ride_match_core::contract::{
    normalize_send_notification, SendNotificationRequest, SendNotificationResponse,
};

use crate::adapters::push::PushSender;
use crate::handlers::api_gateway::{is_proxy_event, normalize_apigw_event};
use crate::logging::log_event;

const COMPONENT: &str = "send_notification";

/// Failures come back as `{success: false, error}`, never as an `Err`.
///
/// The payload's own `body` is the notification text, so proxy unwrapping
/// only happens for events that look like API Gateway requests.
pub fn handle_send_notification(event: Value, push: &impl PushSender) -> SendNotificationResponse {
    let payload = if is_proxy_event(&event) {
        match normalize_apigw_event(event) {
            Ok(value) => value,
            Err(message) => return SendNotificationResponse::failed(message),
        }
    } else {
        event
    };

    let request = match serde_json::from_value::<SendNotificationRequest>(payload) {
        Ok(value) => value,
        Err(error) => {
            return SendNotificationResponse::failed(format!("Malformed request: {error}"))
        }
    };

    let message = match normalize_send_notification(request) {
        Ok(value) => value,
        Err(error) => return SendNotificationResponse::failed(error.message()),
    };

    match push.send(&message) {
        Ok(message_id) => {
            log_event(
                Level::INFO,
                COMPONENT,
                "notification_sent",
                json!({ "message_id": message_id, "title": message.title }),
            );
            SendNotificationResponse::sent(message_id)
        }
        Err(error) => {
            log_event(
                Level::ERROR,
                COMPONENT,
                "notification_failed",
                json!({ "error": error.to_string() }),
            );
            SendNotificationResponse::failed(error.to_string())
        }
    }
}
