use thiserror::Error;
use tracing::info;

use ride_match_core::notification::PushMessage;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PushError {
    #[error("push token rejected: {0}")]
    InvalidToken(String),
    #[error("push delivery failed: {0}")]
    Delivery(String),
}

/// Push-messaging collaborator. Returns the provider's message id.
pub trait PushSender {
    fn send(&self, message: &PushMessage) -> Result<String, PushError>;
}

/// Logs messages instead of delivering them (local runs and dry-run deployments).
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingPushSender;

impl PushSender for LoggingPushSender {
    fn send(&self, message: &PushMessage) -> Result<String, PushError> {
        let message_id = format!("dry-run-{}", uuid::Uuid::new_v4());
        info!(
            component = "push_sender",
            event = "dry_run_push",
            message_id = %message_id,
            title = %message.title,
            body = %message.body,
            "push delivery skipped"
        );
        Ok(message_id)
    }
}
