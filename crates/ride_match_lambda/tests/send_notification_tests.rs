mod support;

use serde_json::json;

use ride_match_core::contract::SendNotificationResponse;
use ride_match_lambda::adapters::push::PushError;
use ride_match_lambda::handlers::send_notification::handle_send_notification;

use support::fakes::RecordingPushSender;

#[test]
fn sends_raw_payload() {
    let push = RecordingPushSender::new();
    let response = handle_send_notification(
        json!({
            "token": "device-token",
            "title": "Hello",
            "body": "World",
            "data": {"rideId": "ride-1"}
        }),
        &push,
    );

    assert_eq!(response, SendNotificationResponse::sent("msg-1"));
    let sent = push.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].token, "device-token");
    assert_eq!(sent[0].body, "World");
    assert_eq!(sent[0].data.get("rideId").map(String::as_str), Some("ride-1"));
}

#[test]
fn plain_text_body_is_not_parsed_as_json() {
    let push = RecordingPushSender::new();
    let response = handle_send_notification(
        json!({"token": "t", "title": "Hi", "body": "{not json"}),
        &push,
    );

    assert!(response.success, "error: {:?}", response.error);
    assert_eq!(push.sent()[0].body, "{not json");
}

#[test]
fn accepts_api_gateway_string_body() {
    let push = RecordingPushSender::new();
    let response = handle_send_notification(
        json!({"body": "{\"token\":\"t\",\"title\":\"Hi\",\"body\":\"World\"}"}),
        &push,
    );

    assert!(response.success);
    assert_eq!(push.sent()[0].title, "Hi");
    assert_eq!(push.sent()[0].body, "World");
}

#[test]
fn proxy_event_with_malformed_body_fails() {
    let push = RecordingPushSender::new();
    let response = handle_send_notification(
        json!({"httpMethod": "POST", "body": "{oops"}),
        &push,
    );

    assert!(!response.success);
    assert!(response
        .error
        .as_deref()
        .is_some_and(|error| error.starts_with("Malformed JSON body")));
    assert!(push.sent().is_empty());
}

#[test]
fn blank_token_fails_without_sending() {
    let push = RecordingPushSender::new();
    let response =
        handle_send_notification(json!({"token": "  ", "title": "Hi", "body": "x"}), &push);

    assert!(!response.success);
    assert_eq!(response.error.as_deref(), Some("token cannot be empty"));
    assert!(push.sent().is_empty());
}

#[test]
fn delivery_failure_is_reported_in_response() {
    let push = RecordingPushSender::failing(PushError::InvalidToken("stale".to_string()));
    let response =
        handle_send_notification(json!({"token": "t", "title": "Hi", "body": "x"}), &push);

    assert!(!response.success);
    assert_eq!(response.message_id, None);
    assert_eq!(response.error.as_deref(), Some("push token rejected: stale"));
}

#[test]
fn response_serializes_camel_case() {
    let body = serde_json::to_value(SendNotificationResponse::sent("abc")).expect("serialize");
    assert_eq!(body, json!({"success": true, "messageId": "abc"}));
}
