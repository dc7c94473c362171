//! Cold-start wiring shared by the Lambda binaries.

use ride_match_core::notification::PushMessage;

use crate::adapters::dynamodb::DynamoDbDocumentStore;
use crate::adapters::push::{LoggingPushSender, PushError, PushSender};
use crate::adapters::sns::SnsPushSender;
use crate::config::RuntimeConfig;

/// Push sender picked from `PUSH_DRY_RUN`.
#[derive(Clone)]
pub enum ConfiguredPushSender {
    Sns(SnsPushSender),
    DryRun(LoggingPushSender),
}

impl PushSender for ConfiguredPushSender {
    fn send(&self, message: &PushMessage) -> Result<String, PushError> {
        match self {
            Self::Sns(sender) => sender.send(message),
            Self::DryRun(sender) => sender.send(message),
        }
    }
}

/// Clients built once per execution environment and reused across invocations.
#[derive(Clone)]
pub struct RuntimeDependencies {
    pub config: RuntimeConfig,
    pub store: DynamoDbDocumentStore,
    pub push: ConfiguredPushSender,
}

impl RuntimeDependencies {
    pub async fn load(config: RuntimeConfig) -> Self {
        let aws_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        let store = DynamoDbDocumentStore::new(
            aws_sdk_dynamodb::Client::new(&aws_config),
            config.tables.clone(),
        );
        let push = if config.push_dry_run {
            ConfiguredPushSender::DryRun(LoggingPushSender)
        } else {
            ConfiguredPushSender::Sns(SnsPushSender::new(aws_sdk_sns::Client::new(&aws_config)))
        };

        Self {
            config,
            store,
            push,
        }
    }
}
