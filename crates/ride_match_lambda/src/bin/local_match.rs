use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use serde_json::json;

use ride_match_core::contract::RIDE_REQUESTS_COLLECTION;
use ride_match_lambda::adapters::memory_store::InMemoryDocumentStore;
use ride_match_lambda::adapters::push::LoggingPushSender;
use ride_match_lambda::handlers::match_ride::{
    handle_ride_created_with_default_matcher, MatchOutcome, RideCreatedEvent,
};
use ride_match_lambda::logging::init_tracing;

/// Replays ride requests from a fixture file through the match pipeline.
///
/// Push messages are logged instead of delivered. The resulting store
/// state is printed alongside the outcomes.
#[derive(Parser)]
#[command(name = "local_match")]
struct Args {
    /// JSON fixture: `{ "rideRequests": {id: fields}, "volunteers": {id: fields} }`
    #[arg(long, env = "RIDE_FIXTURE", default_value = "fixtures/lift_together.json")]
    fixture: PathBuf,
    /// Only process this ride id (every ride in the fixture otherwise)
    #[arg(long)]
    ride: Option<String>,
    /// Pin the store clock, in epoch milliseconds
    #[arg(long)]
    now_ms: Option<i64>,
}

fn main() -> ExitCode {
    init_tracing();
    let args = Args::parse();

    let mut store = match InMemoryDocumentStore::from_fixture_file(&args.fixture) {
        Ok(store) => store,
        Err(error) => {
            eprintln!("{error}");
            return ExitCode::FAILURE;
        }
    };
    if let Some(now_ms) = args.now_ms {
        store = store.with_fixed_clock(now_ms);
    }

    let rides = match store.documents(RIDE_REQUESTS_COLLECTION) {
        Ok(rides) => rides,
        Err(error) => {
            eprintln!("{error}");
            return ExitCode::FAILURE;
        }
    };

    let outcomes: Vec<MatchOutcome> = rides
        .into_iter()
        .filter(|ride| args.ride.as_deref().map_or(true, |id| id == ride.id))
        .map(|ride| {
            let event = RideCreatedEvent {
                ride_id: ride.id,
                fields: ride.fields,
            };
            handle_ride_created_with_default_matcher(&event, &store, &LoggingPushSender)
        })
        .collect();

    let report = json!({
        "outcomes": outcomes,
        "rideRequests": store.documents(RIDE_REQUESTS_COLLECTION).unwrap_or_default()
            .into_iter()
            .map(|document| json!({ "id": document.id, "fields": document.fields }))
            .collect::<Vec<_>>(),
    });
    match serde_json::to_string_pretty(&report) {
        Ok(text) => {
            println!("{text}");
            ExitCode::SUCCESS
        }
        Err(error) => {
            eprintln!("failed to render report: {error}");
            ExitCode::FAILURE
        }
    }
}
