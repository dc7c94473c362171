use lambda_runtime::{service_fn, Error, LambdaEvent};
use serde_json::Value;

use ride_match_core::contract::SendNotificationResponse;
use ride_match_lambda::config::RuntimeConfig;
use ride_match_lambda::handlers::send_notification::handle_send_notification;
use ride_match_lambda::logging::init_tracing;
use ride_match_lambda::runtime::RuntimeDependencies;

async fn handle_request(
    event: LambdaEvent<Value>,
    dependencies: &RuntimeDependencies,
) -> Result<SendNotificationResponse, Error> {
    Ok(handle_send_notification(event.payload, &dependencies.push))
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    init_tracing();
    let config = RuntimeConfig::from_env()?;
    let dependencies = RuntimeDependencies::load(config).await;

    lambda_runtime::run(service_fn(move |event: LambdaEvent<Value>| {
        let dependencies = dependencies.clone();
        async move { handle_request(event, &dependencies).await }
    }))
    .await
}
