//! Rider and volunteer operations against the document store.
//!
//! One callable covering ride creation, the pending list, status
//! transitions and volunteer availability, dispatched on `action`.

use serde_json::{json, Value};
use thiserror::Error;
use tracing::Level;

use ride_match_core::contract::{
    CreateRideRequestInput, RideApiRequest, ValidationError, FIELD_ACTIVE_RIDE_ID,
    FIELD_IS_AVAILABLE, FIELD_IS_ONLINE, FIELD_STATUS, RIDE_REQUESTS_COLLECTION,
    VOLUNTEERS_COLLECTION,
};
use ride_match_core::decode::{decode_ride_request, encode_ride_request};
use ride_match_core::model::{RideRequest, RideStatus, TransitionError};

use crate::adapters::document_store::{DocumentStore, FieldEquals, Fields, StoreError};
use crate::handlers::api_gateway::{
    error_response, normalize_apigw_event, success_response, validation_error_response,
    ApiGatewayResponse,
};
use crate::logging::log_event;

const COMPONENT: &str = "ride_api";

#[derive(Debug, Error)]
pub enum RideApiError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("{kind} '{id}' not found")]
    NotFound { kind: &'static str, id: String },
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error("ride '{0}' changed status while it was being updated")]
    Conflict(String),
    #[error("volunteer '{0}' still has an active ride")]
    VolunteerBusy(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl RideApiError {
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Validation(_) => 400,
            Self::NotFound { .. } => 404,
            Self::Transition(_) | Self::Conflict(_) | Self::VolunteerBusy(_) => 409,
            Self::Store(_) => 500,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::NotFound { .. } => "not_found",
            Self::Transition(_) => "invalid_transition",
            Self::Conflict(_) => "conflict",
            Self::VolunteerBusy(_) => "volunteer_busy",
            Self::Store(_) => "store_failure",
        }
    }

    fn into_response(self) -> ApiGatewayResponse {
        if let Self::Validation(error) = &self {
            return validation_error_response(error.message());
        }
        error_response(
            self.status_code(),
            json!({
                "error": self.error_code(),
                "message": self.to_string(),
            }),
        )
    }
}

pub fn handle_ride_api_event(event: Value, store: &impl DocumentStore) -> ApiGatewayResponse {
    let payload = match normalize_apigw_event(event) {
        Ok(value) => value,
        Err(message) => return validation_error_response(&message),
    };

    let request = match serde_json::from_value::<RideApiRequest>(payload) {
        Ok(value) => value,
        Err(error) => return validation_error_response(&format!("Malformed request: {error}")),
    };

    let result = match request {
        RideApiRequest::CreateRideRequest(input) => {
            create_ride_request(store, input).map(|ride_id| (201, json!({ "rideId": ride_id })))
        }
        RideApiRequest::ListPendingRequests => list_pending_requests(store).map(|rides| {
            let rides: Vec<Value> = rides.iter().map(ride_body).collect();
            (200, json!({ "rides": rides }))
        }),
        RideApiRequest::UpdateRideStatus { ride_id, status } => {
            update_ride_status(store, &ride_id, status)
                .map(|status| (200, json!({ "rideId": ride_id, "status": status })))
        }
        RideApiRequest::SetVolunteerAvailability {
            volunteer_id,
            is_available,
            is_online,
        } => set_volunteer_availability(store, &volunteer_id, is_available, is_online).map(|()| {
            (
                200,
                json!({ "volunteerId": volunteer_id, "isAvailable": is_available }),
            )
        }),
    };

    match result {
        Ok((status_code, body)) => success_response(status_code, body),
        Err(error) => {
            if matches!(error, RideApiError::Store(_)) {
                log_event(
                    Level::ERROR,
                    COMPONENT,
                    "store_failure",
                    json!({ "error": error.to_string() }),
                );
            }
            error.into_response()
        }
    }
}

/// Stores a new Pending ride stamped with the store clock. Returns its id.
pub fn create_ride_request(
    store: &impl DocumentStore,
    input: CreateRideRequestInput,
) -> Result<String, RideApiError> {
    let input = input.normalize()?;
    let ride = RideRequest {
        id: String::new(),
        rider_id: input.rider_id,
        rider_name: input.rider_name,
        pickup: input.pickup_location,
        dropoff: input.dropoff_location,
        urgency: input.urgency,
        notes: input.notes,
        status: RideStatus::Pending,
        created_at_ms: Some(store.server_timestamp_ms()),
        assigned_volunteer_id: None,
        assigned_volunteer_name: None,
        accepted_at_ms: None,
    };

    let ride_id = store.create(RIDE_REQUESTS_COLLECTION, encode_ride_request(&ride))?;
    log_event(
        Level::INFO,
        COMPONENT,
        "ride_request_created",
        json!({ "ride_id": ride_id, "urgency": ride.urgency.wire_name() }),
    );
    Ok(ride_id)
}

/// Rides still waiting for a volunteer. Undecodable documents are skipped.
pub fn list_pending_requests(store: &impl DocumentStore) -> Result<Vec<RideRequest>, RideApiError> {
    let documents = store.query_equal(
        RIDE_REQUESTS_COLLECTION,
        &[FieldEquals::new(
            FIELD_STATUS,
            RideStatus::Pending.wire_name(),
        )],
    )?;

    Ok(documents
        .into_iter()
        .filter_map(|document| match decode_ride_request(&document.id, &document.fields) {
            Ok(ride) => Some(ride),
            Err(error) => {
                log_event(
                    Level::WARN,
                    COMPONENT,
                    "record_decode_failed",
                    json!({ "ride_id": document.id, "error": error.to_string() }),
                );
                None
            }
        })
        .collect())
}

/// Moves a ride along the status state machine.
///
/// The write is conditional on the status that was read. Reaching a
/// terminal status hands the assigned volunteer back to the pool.
pub fn update_ride_status(
    store: &impl DocumentStore,
    ride_id: &str,
    next: RideStatus,
) -> Result<RideStatus, RideApiError> {
    let fields = store
        .get(RIDE_REQUESTS_COLLECTION, ride_id)?
        .ok_or_else(|| RideApiError::NotFound {
            kind: "ride request",
            id: ride_id.to_string(),
        })?;
    let ride = decode_ride_request(ride_id, &fields).map_err(StoreError::from)?;
    let status = ride.status.transition_to(next)?;
    // Legacy rows store ASSIGNED for Accepted; compare against the raw value.
    let stored_status = fields.get(FIELD_STATUS).cloned().unwrap_or(Value::Null);

    let mut update = Fields::new();
    update.insert(FIELD_STATUS.to_string(), json!(status.wire_name()));
    match store.update_fields(
        RIDE_REQUESTS_COLLECTION,
        ride_id,
        &update,
        Some(&FieldEquals::new(FIELD_STATUS, stored_status)),
    ) {
        Ok(()) => {}
        Err(StoreError::ConditionFailed { .. }) => {
            return Err(RideApiError::Conflict(ride_id.to_string()))
        }
        Err(error) => return Err(error.into()),
    }

    if status.is_terminal() {
        if let Some(volunteer_id) = ride.assigned_volunteer_id.as_deref() {
            release_volunteer(store, volunteer_id, ride_id);
        }
    }

    log_event(
        Level::INFO,
        COMPONENT,
        "ride_status_updated",
        json!({ "ride_id": ride_id, "from": ride.status.wire_name(), "to": status.wire_name() }),
    );
    Ok(status)
}

/// Toggles a volunteer's availability and, optionally, online flag.
///
/// A volunteer cannot become available while still holding a ride; the
/// ride's terminal status update releases them instead.
pub fn set_volunteer_availability(
    store: &impl DocumentStore,
    volunteer_id: &str,
    is_available: bool,
    is_online: Option<bool>,
) -> Result<(), RideApiError> {
    let not_found = || RideApiError::NotFound {
        kind: "volunteer",
        id: volunteer_id.to_string(),
    };
    let fields = store
        .get(VOLUNTEERS_COLLECTION, volunteer_id)?
        .ok_or_else(not_found)?;
    let active_ride = fields.get(FIELD_ACTIVE_RIDE_ID);
    if is_available && active_ride.is_some_and(|ride| !ride.is_null()) {
        return Err(RideApiError::VolunteerBusy(volunteer_id.to_string()));
    }

    let mut update = Fields::new();
    update.insert(FIELD_IS_AVAILABLE.to_string(), json!(is_available));
    if let Some(is_online) = is_online {
        update.insert(FIELD_IS_ONLINE.to_string(), json!(is_online));
    }
    // Guard against a claim landing between the read and the write.
    let condition = active_ride
        .filter(|_| is_available)
        .map(|value| FieldEquals::new(FIELD_ACTIVE_RIDE_ID, value.clone()));

    match store.update_fields(VOLUNTEERS_COLLECTION, volunteer_id, &update, condition.as_ref()) {
        Ok(()) => Ok(()),
        Err(StoreError::NotFound { .. }) => Err(not_found()),
        Err(StoreError::ConditionFailed { .. }) => {
            Err(RideApiError::VolunteerBusy(volunteer_id.to_string()))
        }
        Err(error) => Err(error.into()),
    }
}

/// Clears the volunteer's active ride if it still points at `ride_id`.
fn release_volunteer(store: &impl DocumentStore, volunteer_id: &str, ride_id: &str) {
    let mut update = Fields::new();
    update.insert(FIELD_IS_AVAILABLE.to_string(), json!(true));
    update.insert(FIELD_ACTIVE_RIDE_ID.to_string(), Value::Null);

    if let Err(error) = store.update_fields(
        VOLUNTEERS_COLLECTION,
        volunteer_id,
        &update,
        Some(&FieldEquals::new(FIELD_ACTIVE_RIDE_ID, ride_id)),
    ) {
        log_event(
            Level::WARN,
            COMPONENT,
            "volunteer_release_skipped",
            json!({
                "volunteer_id": volunteer_id,
                "ride_id": ride_id,
                "error": error.to_string(),
            }),
        );
    }
}

fn ride_body(ride: &RideRequest) -> Value {
    let mut body = encode_ride_request(ride);
    if let Value::Object(object) = &mut body {
        object.insert("id".to_string(), json!(ride.id));
    }
    body
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory_store::InMemoryDocumentStore;

    fn store_with_ride(status: &str) -> InMemoryDocumentStore {
        let store = InMemoryDocumentStore::new().with_fixed_clock(5_000);
        store
            .insert(
                RIDE_REQUESTS_COLLECTION,
                "ride-1",
                json!({
                    "riderName": "Ada",
                    "pickupLocation": {"latitude": 0.0, "longitude": 0.0},
                    "dropoffLocation": {"latitude": 1.0, "longitude": 1.0},
                    "urgency": "MEDIUM",
                    "status": status,
                    "assignedVolunteerId": "v1"
                }),
            )
            .expect("insert ride");
        store
            .insert(
                VOLUNTEERS_COLLECTION,
                "v1",
                json!({"isAvailable": false, "isOnline": true, "activeRideId": "ride-1"}),
            )
            .expect("insert volunteer");
        store
    }

    fn body(response: &ApiGatewayResponse) -> Value {
        response.body_json().expect("response body is json")
    }

    #[test]
    fn create_returns_201_with_generated_id() {
        let store = InMemoryDocumentStore::new().with_fixed_clock(5_000);
        let response = handle_ride_api_event(
            json!({
                "action": "create_ride_request",
                "riderName": "Ada",
                "pickupLocation": {"latitude": 10.0, "longitude": 20.0},
                "dropoffLocation": {"latitude": 10.5, "longitude": 20.5},
                "urgency": "HIGH"
            }),
            &store,
        );

        assert_eq!(response.status_code, 201);
        let ride_id = body(&response)["rideId"]
            .as_str()
            .expect("ride id")
            .to_string();
        let stored = store
            .get(RIDE_REQUESTS_COLLECTION, &ride_id)
            .expect("get")
            .expect("ride stored");
        assert_eq!(stored["status"], json!("PENDING"));
        assert_eq!(stored["createdAt"], json!(5_000));
    }

    #[test]
    fn create_rejects_out_of_range_coordinates() {
        let store = InMemoryDocumentStore::new();
        let response = handle_ride_api_event(
            json!({
                "action": "create_ride_request",
                "pickupLocation": {"latitude": 0.0, "longitude": 200.0},
                "dropoffLocation": {"latitude": 0.0, "longitude": 0.0},
                "urgency": "LOW"
            }),
            &store,
        );

        assert_eq!(response.status_code, 400);
        assert_eq!(body(&response)["error"], json!("validation_error"));
        assert!(store
            .documents(RIDE_REQUESTS_COLLECTION)
            .expect("documents")
            .is_empty());
    }

    #[test]
    fn unknown_action_is_a_validation_error() {
        let store = InMemoryDocumentStore::new();
        let response = handle_ride_api_event(json!({"action": "delete_everything"}), &store);
        assert_eq!(response.status_code, 400);
    }

    #[test]
    fn valid_transition_is_applied() {
        let store = store_with_ride("ACCEPTED");
        let status = update_ride_status(&store, "ride-1", RideStatus::OnTheWay)
            .expect("accepted -> on the way");

        assert_eq!(status, RideStatus::OnTheWay);
        let ride = store
            .get(RIDE_REQUESTS_COLLECTION, "ride-1")
            .expect("get")
            .expect("ride");
        assert_eq!(ride["status"], json!("ON_THE_WAY"));
    }

    #[test]
    fn skipping_states_is_409() {
        let store = store_with_ride("ACCEPTED");
        let response = handle_ride_api_event(
            json!({"action": "update_ride_status", "rideId": "ride-1", "status": "COMPLETED"}),
            &store,
        );

        assert_eq!(response.status_code, 409);
        assert_eq!(body(&response)["error"], json!("invalid_transition"));
    }

    #[test]
    fn unknown_ride_is_404() {
        let store = InMemoryDocumentStore::new();
        let response = handle_ride_api_event(
            json!({"action": "update_ride_status", "rideId": "nope", "status": "CANCELLED"}),
            &store,
        );
        assert_eq!(response.status_code, 404);
    }

    #[test]
    fn cancelling_releases_the_volunteer() {
        let store = store_with_ride("ACCEPTED");
        update_ride_status(&store, "ride-1", RideStatus::Cancelled).expect("cancel");

        let volunteer = store
            .get(VOLUNTEERS_COLLECTION, "v1")
            .expect("get")
            .expect("volunteer");
        assert_eq!(volunteer["isAvailable"], json!(true));
        assert_eq!(volunteer["activeRideId"], Value::Null);
    }

    #[test]
    fn release_leaves_a_volunteer_on_another_ride_alone() {
        let store = store_with_ride("ACCEPTED");
        store
            .insert(
                VOLUNTEERS_COLLECTION,
                "v1",
                json!({"isAvailable": false, "isOnline": true, "activeRideId": "ride-9"}),
            )
            .expect("reassign volunteer");

        update_ride_status(&store, "ride-1", RideStatus::Cancelled).expect("cancel");

        let volunteer = store
            .get(VOLUNTEERS_COLLECTION, "v1")
            .expect("get")
            .expect("volunteer");
        assert_eq!(volunteer["activeRideId"], json!("ride-9"));
        assert_eq!(volunteer["isAvailable"], json!(false));
    }

    #[test]
    fn availability_for_unknown_volunteer_is_404() {
        let store = InMemoryDocumentStore::new();
        let response = handle_ride_api_event(
            json!({"action": "set_volunteer_availability", "volunteerId": "ghost", "isAvailable": true}),
            &store,
        );
        assert_eq!(response.status_code, 404);
    }

    #[test]
    fn availability_updates_online_flag_when_given() {
        let store = store_with_ride("COMPLETED");
        store
            .insert(
                VOLUNTEERS_COLLECTION,
                "v1",
                json!({"isAvailable": false, "isOnline": true, "activeRideId": null}),
            )
            .expect("release volunteer");
        set_volunteer_availability(&store, "v1", true, Some(false)).expect("update");

        let volunteer = store
            .get(VOLUNTEERS_COLLECTION, "v1")
            .expect("get")
            .expect("volunteer");
        assert_eq!(volunteer["isAvailable"], json!(true));
        assert_eq!(volunteer["isOnline"], json!(false));
    }

    #[test]
    fn busy_volunteer_cannot_become_available() {
        let store = store_with_ride("ACCEPTED");
        let response = handle_ride_api_event(
            json!({"action": "set_volunteer_availability", "volunteerId": "v1", "isAvailable": true}),
            &store,
        );

        assert_eq!(response.status_code, 409);
        assert_eq!(body(&response)["error"], json!("volunteer_busy"));
        let volunteer = store
            .get(VOLUNTEERS_COLLECTION, "v1")
            .expect("get")
            .expect("volunteer");
        assert_eq!(volunteer["isAvailable"], json!(false));
    }

    #[test]
    fn busy_volunteer_can_still_go_offline() {
        let store = store_with_ride("ACCEPTED");
        set_volunteer_availability(&store, "v1", false, Some(false)).expect("go offline");

        let volunteer = store
            .get(VOLUNTEERS_COLLECTION, "v1")
            .expect("get")
            .expect("volunteer");
        assert_eq!(volunteer["isOnline"], json!(false));
        assert_eq!(volunteer["activeRideId"], json!("ride-1"));
    }

    #[test]
    fn list_pending_only_returns_pending_rides() {
        let store = store_with_ride("ACCEPTED");
        store
            .insert(
                RIDE_REQUESTS_COLLECTION,
                "ride-2",
                json!({
                    "pickupLocation": {"latitude": 0.0, "longitude": 0.0},
                    "dropoffLocation": {"latitude": 1.0, "longitude": 1.0},
                    "urgency": "LOW",
                    "status": "PENDING"
                }),
            )
            .expect("insert");

        let response = handle_ride_api_event(
            json!({"body": "{\"action\":\"list_pending_requests\"}"}),
            &store,
        );

        assert_eq!(response.status_code, 200);
        let rides = body(&response)["rides"].as_array().expect("rides").clone();
        assert_eq!(rides.len(), 1);
        assert_eq!(rides[0]["id"], json!("ride-2"));
    }
}
