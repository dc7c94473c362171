use lambda_runtime::{service_fn, Error, LambdaEvent};
use serde_json::Value;

use ride_match_core::matching::NearestInRangeMatcher;
use ride_match_lambda::config::RuntimeConfig;
use ride_match_lambda::handlers::match_ride::{
    handle_stream_batch, is_dynamodb_stream_event, BatchSummary,
};
use ride_match_lambda::logging::init_tracing;
use ride_match_lambda::runtime::RuntimeDependencies;

async fn handle_request(
    event: LambdaEvent<Value>,
    dependencies: &RuntimeDependencies,
) -> Result<BatchSummary, Error> {
    if !is_dynamodb_stream_event(&event.payload) {
        return Err(Error::from(
            "match_ride_lambda expects a DynamoDB Streams event",
        ));
    }

    handle_stream_batch(
        &event.payload,
        &dependencies.store,
        &dependencies.push,
        &NearestInRangeMatcher,
    )
    .map_err(Error::from)
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
