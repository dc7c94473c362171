//! Match-and-notify pipeline for newly created ride requests.
//!
//! trigger check -> candidate fetch -> ranking -> assignment claim -> notification.
//!
//! Store and push failures never escape this module: every failure is
//! logged and reported as a [`MatchOutcome`] so the triggering platform
//! sees a successful invocation.

use serde::Serialize;
use serde_json::{json, Value};
use tracing::Level;

use ride_match_core::contract::{FIELD_IS_AVAILABLE, FIELD_IS_ONLINE, VOLUNTEERS_COLLECTION};
use ride_match_core::decode::{decode_ride_request, decode_volunteer};
use ride_match_core::matching::{MatchCandidate, NearestInRangeMatcher, VolunteerMatcher};
use ride_match_core::model::{RideRequest, RideStatus, Volunteer};
use ride_match_core::notification::ride_request_notification;

use crate::adapters::attribute_json::{stream_image_to_json, ID_ATTRIBUTE};
use crate::adapters::document_store::{
    AssignmentClaim, ClaimOutcome, DocumentStore, FieldEquals, StoreError,
};
use crate::adapters::push::PushSender;
use crate::logging::log_event;

const COMPONENT: &str = "match_ride";
const PUSH_TOKEN_FIELD: &str = "fcmToken";

/// Snapshot of a newly created ride request document.
#[derive(Debug, Clone, PartialEq)]
pub struct RideCreatedEvent {
    pub ride_id: String,
    pub fields: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Trigger,
    FetchCandidates,
    WriteAssignment,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum NotificationStatus {
    Sent { message_id: String },
    TokenMissing,
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum MatchOutcome {
    SkippedNotPending {
        ride_id: String,
        status: RideStatus,
    },
    NoCandidates {
        ride_id: String,
    },
    NoMatchInRange {
        ride_id: String,
        candidates: usize,
    },
    Assigned {
        ride_id: String,
        volunteer_id: String,
        distance_km: f64,
        notification: NotificationStatus,
    },
    /// Every in-range volunteer was claimed elsewhere, or the ride left Pending.
    Contended {
        ride_id: String,
        attempts: usize,
    },
    Failed {
        ride_id: String,
        stage: PipelineStage,
        message: String,
    },
}

pub fn handle_ride_created(
    event: &RideCreatedEvent,
    store: &impl DocumentStore,
    push: &impl PushSender,
    matcher: &impl VolunteerMatcher,
) -> MatchOutcome {
    let ride_id = event.ride_id.clone();

    let ride = match decode_ride_request(&event.ride_id, &event.fields) {
        Ok(ride) => ride,
        Err(error) => {
            log_event(
                Level::ERROR,
                COMPONENT,
                "record_decode_failed",
                json!({ "ride_id": ride_id, "error": error.to_string() }),
            );
            return MatchOutcome::Failed {
                ride_id,
                stage: PipelineStage::Trigger,
                message: error.to_string(),
            };
        }
    };

    if ride.status != RideStatus::Pending {
        log_event(
            Level::INFO,
            COMPONENT,
            "trigger_skipped",
            json!({ "ride_id": ride_id, "status": ride.status.wire_name() }),
        );
        return MatchOutcome::SkippedNotPending {
            ride_id,
            status: ride.status,
        };
    }

    let volunteers = match fetch_candidates(store) {
        Ok(volunteers) => volunteers,
        Err(error) => return store_failure(ride_id, PipelineStage::FetchCandidates, &error),
    };

    if volunteers.is_empty() {
        log_event(
            Level::INFO,
            COMPONENT,
            "no_candidates",
            json!({ "ride_id": ride_id }),
        );
        return MatchOutcome::NoCandidates { ride_id };
    }

    let ranked = matcher.rank_candidates(&ride, &volunteers);
    if ranked.is_empty() {
        log_event(
            Level::INFO,
            COMPONENT,
            "no_match_in_range",
            json!({
                "ride_id": ride_id,
                "urgency": ride.urgency.wire_name(),
                "candidates": volunteers.len(),
            }),
        );
        return MatchOutcome::NoMatchInRange {
            ride_id,
            candidates: volunteers.len(),
        };
    }

    let mut attempts = 0usize;
    for candidate in &ranked {
        attempts += 1;
        match write_assignment(store, &ride.id, candidate) {
            Ok(ClaimOutcome::Claimed { accepted_at_ms }) => {
                log_event(
                    Level::INFO,
                    COMPONENT,
                    "volunteer_claimed",
                    json!({
                        "ride_id": ride_id,
                        "volunteer_id": candidate.volunteer_id(),
                        "distance_km": candidate.distance_km,
                        "urgency": ride.urgency.wire_name(),
                        "accepted_at_ms": accepted_at_ms,
                        "attempt": attempts,
                    }),
                );
                let notification = notify_volunteer(store, push, candidate.volunteer_id(), &ride);
                return MatchOutcome::Assigned {
                    ride_id,
                    volunteer_id: candidate.volunteer_id().to_string(),
                    distance_km: candidate.distance_km,
                    notification,
                };
            }
            Ok(ClaimOutcome::VolunteerUnavailable) => {
                log_event(
                    Level::WARN,
                    COMPONENT,
                    "claim_contended",
                    json!({
                        "ride_id": ride_id,
                        "volunteer_id": candidate.volunteer_id(),
                        "attempt": attempts,
                    }),
                );
            }
            Ok(ClaimOutcome::RideNotPending) => {
                log_event(
                    Level::WARN,
                    COMPONENT,
                    "claim_contended",
                    json!({
                        "ride_id": ride_id,
                        "reason": "ride_not_pending",
                        "attempt": attempts,
                    }),
                );
                return MatchOutcome::Contended { ride_id, attempts };
            }
            Err(error) => return store_failure(ride_id, PipelineStage::WriteAssignment, &error),
        }
    }

    MatchOutcome::Contended { ride_id, attempts }
}

/// Runs the pipeline with the nearest-in-range matcher.
pub fn handle_ride_created_with_default_matcher(
    event: &RideCreatedEvent,
    store: &impl DocumentStore,
    push: &impl PushSender,
) -> MatchOutcome {
    handle_ride_created(event, store, push, &NearestInRangeMatcher)
}

/// Volunteers currently flagged both available and online, in store order.
///
/// Documents that do not decode are logged and left out.
pub fn fetch_candidates(store: &impl DocumentStore) -> Result<Vec<Volunteer>, StoreError> {
    let documents = store.query_equal(
        VOLUNTEERS_COLLECTION,
        &[
            FieldEquals::new(FIELD_IS_AVAILABLE, true),
            FieldEquals::new(FIELD_IS_ONLINE, true),
        ],
    )?;

    Ok(documents
        .into_iter()
        .filter_map(|document| match decode_volunteer(&document.id, &document.fields) {
            Ok(volunteer) => Some(volunteer),
            Err(error) => {
                log_event(
                    Level::WARN,
                    COMPONENT,
                    "record_decode_failed",
                    json!({ "volunteer_id": document.id, "error": error.to_string() }),
                );
                None
            }
        })
        .collect())
}

/// Records `candidate` as the ride's volunteer and moves the ride to Accepted.
///
/// Only a Pending ride is ever written, so terminal statuses stay put.
pub fn write_assignment(
    store: &impl DocumentStore,
    ride_id: &str,
    candidate: &MatchCandidate,
) -> Result<ClaimOutcome, StoreError> {
    store.claim_assignment(&AssignmentClaim {
        ride_id: ride_id.to_string(),
        volunteer_id: candidate.volunteer_id().to_string(),
        volunteer_name: candidate.volunteer.display_name().to_string(),
    })
}

/// Best-effort push to the matched volunteer. Never fails.
pub fn notify_volunteer(
    store: &impl DocumentStore,
    push: &impl PushSender,
    volunteer_id: &str,
    ride: &RideRequest,
) -> NotificationStatus {
    let token = match store.get(VOLUNTEERS_COLLECTION, volunteer_id) {
        Ok(document) => document.and_then(|fields| {
            fields
                .get(PUSH_TOKEN_FIELD)
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|token| !token.is_empty())
                .map(str::to_string)
        }),
        Err(error) => {
            log_event(
                Level::ERROR,
                COMPONENT,
                "notification_failed",
                json!({ "volunteer_id": volunteer_id, "error": error.to_string() }),
            );
            return NotificationStatus::Failed {
                error: error.to_string(),
            };
        }
    };

    let Some(token) = token else {
        log_event(
            Level::INFO,
            COMPONENT,
            "push_token_missing",
            json!({ "volunteer_id": volunteer_id, "ride_id": ride.id }),
        );
        return NotificationStatus::TokenMissing;
    };

    let message = ride_request_notification(ride, &token);
    match push.send(&message) {
        Ok(message_id) => {
            log_event(
                Level::INFO,
                COMPONENT,
                "notification_sent",
                json!({
                    "volunteer_id": volunteer_id,
                    "ride_id": ride.id,
                    "message_id": message_id,
                }),
            );
            NotificationStatus::Sent { message_id }
        }
        Err(error) => {
            log_event(
                Level::ERROR,
                COMPONENT,
                "notification_failed",
                json!({
                    "volunteer_id": volunteer_id,
                    "ride_id": ride.id,
                    "error": error.to_string(),
                }),
            );
            NotificationStatus::Failed {
                error: error.to_string(),
            }
        }
    }
}

fn store_failure(ride_id: String, stage: PipelineStage, error: &StoreError) -> MatchOutcome {
    log_event(
        Level::ERROR,
        COMPONENT,
        "store_failure",
        json!({ "ride_id": ride_id, "stage": stage, "error": error.to_string() }),
    );
    MatchOutcome::Failed {
        ride_id,
        stage,
        message: error.to_string(),
    }
}

/// Inserted ride documents found in a DynamoDB Streams batch.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StreamBatch {
    pub inserts: Vec<RideCreatedEvent>,
    /// Non-insert records (updates, removals) that were ignored.
    pub ignored: usize,
    /// Insert records that could not be turned into an event.
    pub rejected: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchSummary {
    pub processed: usize,
    pub ignored: usize,
    pub rejected: usize,
    pub outcomes: Vec<MatchOutcome>,
}

pub fn is_dynamodb_stream_event(event: &Value) -> bool {
    event
        .get("Records")
        .and_then(Value::as_array)
        .map(|records| {
            !records.is_empty()
                && records.iter().all(|record| {
                    record
                        .get("eventSource")
                        .and_then(Value::as_str)
                        .map(|source| source == "aws:dynamodb")
                        .unwrap_or(false)
                })
        })
        .unwrap_or(false)
}

pub fn decode_stream_inserts(event: &Value) -> Result<StreamBatch, String> {
    let records = event
        .get("Records")
        .and_then(Value::as_array)
        .ok_or_else(|| "stream event must include Records array".to_string())?;

    let mut batch = StreamBatch::default();
    for record in records {
        if record.get("eventName").and_then(Value::as_str) != Some("INSERT") {
            batch.ignored += 1;
            continue;
        }
        match decode_insert_record(record) {
            Ok(insert) => batch.inserts.push(insert),
            Err(error) => batch.rejected.push(error),
        }
    }
    Ok(batch)
}

fn decode_insert_record(record: &Value) -> Result<RideCreatedEvent, String> {
    let image = record
        .get("dynamodb")
        .and_then(|dynamodb| dynamodb.get("NewImage"))
        .ok_or_else(|| "INSERT record must include dynamodb.NewImage".to_string())?;
    let mut fields = stream_image_to_json(image)?;

    let ride_id = fields
        .as_object_mut()
        .and_then(|object| object.remove(ID_ATTRIBUTE))
        .and_then(|id| id.as_str().map(str::to_string))
        .ok_or_else(|| "INSERT record image must include a string id".to_string())?;

    Ok(RideCreatedEvent { ride_id, fields })
}

/// Runs the pipeline for every inserted ride in a stream batch.
pub fn handle_stream_batch(
    event: &Value,
    store: &impl DocumentStore,
    push: &impl PushSender,
    matcher: &impl VolunteerMatcher,
) -> Result<BatchSummary, String> {
    let batch = decode_stream_inserts(event)?;
    for error in &batch.rejected {
        log_event(
            Level::ERROR,
            COMPONENT,
            "record_decode_failed",
            json!({ "error": error }),
        );
    }

    let outcomes: Vec<MatchOutcome> = batch
        .inserts
        .iter()
        .map(|insert| handle_ride_created(insert, store, push, matcher))
        .collect();

    Ok(BatchSummary {
        processed: outcomes.len(),
        ignored: batch.ignored,
        rejected: batch.rejected.len(),
        outcomes,
    })
}
