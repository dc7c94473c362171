//! In-process document store seeded from fixtures.
//!
//! Used by tests and the local runner in place of the hosted store. The
//! whole store sits behind one mutex, so `claim_assignment` is atomic.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use serde_json::{json, Value};

use ride_match_core::contract::{
    FIELD_ACCEPTED_AT, FIELD_ACTIVE_RIDE_ID, FIELD_ASSIGNED_VOLUNTEER_ID,
    FIELD_ASSIGNED_VOLUNTEER_NAME, FIELD_IS_AVAILABLE, FIELD_STATUS, RIDE_REQUESTS_COLLECTION,
    VOLUNTEERS_COLLECTION,
};
use ride_match_core::model::RideStatus;

use super::document_store::{
    AssignmentClaim, ClaimOutcome, DocumentStore, FieldEquals, Fields, StoreError, StoredDocument,
};

/// Collection name -> document id -> fields.
pub type FixtureSet = BTreeMap<String, BTreeMap<String, Value>>;

#[derive(Debug, Default)]
struct State {
    collections: FixtureSet,
    next_id: u64,
}

#[derive(Debug, Default)]
pub struct InMemoryDocumentStore {
    state: Mutex<State>,
    fixed_clock_ms: Option<i64>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_fixtures(collections: FixtureSet) -> Self {
        Self {
            state: Mutex::new(State {
                collections,
                next_id: 0,
            }),
            fixed_clock_ms: None,
        }
    }

    pub fn from_fixture_json(text: &str) -> Result<Self, StoreError> {
        let collections: FixtureSet = serde_json::from_str(text)
            .map_err(|error| StoreError::Backend(format!("invalid fixture json: {error}")))?;
        Ok(Self::from_fixtures(collections))
    }

    pub fn from_fixture_file(path: &Path) -> Result<Self, StoreError> {
        let text = std::fs::read_to_string(path).map_err(|error| {
            StoreError::Backend(format!(
                "failed to read fixture '{}': {error}",
                path.display()
            ))
        })?;
        Self::from_fixture_json(&text)
    }

    /// Pins `server_timestamp_ms` to a constant.
    pub fn with_fixed_clock(mut self, now_ms: i64) -> Self {
        self.fixed_clock_ms = Some(now_ms);
        self
    }

    pub fn insert(&self, collection: &str, id: &str, fields: Value) -> Result<(), StoreError> {
        self.lock()?
            .collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), fields);
        Ok(())
    }

    /// Every document of `collection`, ordered by id.
    pub fn documents(&self, collection: &str) -> Result<Vec<StoredDocument>, StoreError> {
        Ok(self
            .lock()?
            .collections
            .get(collection)
            .map(|documents| {
                documents
                    .iter()
                    .map(|(id, fields)| StoredDocument {
                        id: id.clone(),
                        fields: fields.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>, StoreError> {
        self.state
            .lock()
            .map_err(|_| StoreError::Backend("in-memory store lock poisoned".to_string()))
    }
}

fn field_matches(fields: &Value, condition: &FieldEquals) -> bool {
    fields.get(&condition.field) == Some(&condition.value)
}

fn merge_fields(target: &mut Value, fields: &Fields) {
    if let Value::Object(object) = target {
        for (key, value) in fields {
            object.insert(key.clone(), value.clone());
        }
    }
}

impl DocumentStore for InMemoryDocumentStore {
    fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, StoreError> {
        Ok(self
            .lock()?
            .collections
            .get(collection)
            .and_then(|documents| documents.get(id))
            .cloned())
    }

    fn create(&self, collection: &str, fields: Value) -> Result<String, StoreError> {
        if !fields.is_object() {
            return Err(StoreError::Backend(
                "documents must be JSON objects".to_string(),
            ));
        }
        let mut state = self.lock()?;
        state.next_id += 1;
        let id = format!("{collection}-{:06}", state.next_id);
        state
            .collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.clone(), fields);
        Ok(id)
    }

    fn update_fields(
        &self,
        collection: &str,
        id: &str,
        fields: &Fields,
        condition: Option<&FieldEquals>,
    ) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        let document = state
            .collections
            .get_mut(collection)
            .and_then(|documents| documents.get_mut(id))
            .ok_or_else(|| StoreError::NotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            })?;

        if let Some(condition) = condition {
            if !field_matches(document, condition) {
                return Err(StoreError::ConditionFailed {
                    collection: collection.to_string(),
                    id: id.to_string(),
                });
            }
        }

        merge_fields(document, fields);
        Ok(())
    }

    fn query_equal(
        &self,
        collection: &str,
        filters: &[FieldEquals],
    ) -> Result<Vec<StoredDocument>, StoreError> {
        Ok(self
            .documents(collection)?
            .into_iter()
            .filter(|document| {
                filters
                    .iter()
                    .all(|filter| field_matches(&document.fields, filter))
            })
            .collect())
    }

    fn claim_assignment(&self, claim: &AssignmentClaim) -> Result<ClaimOutcome, StoreError> {
        let accepted_at_ms = self.server_timestamp_ms();
        let mut state = self.lock()?;

        // A missing ride fails the status condition, as it does in DynamoDB.
        let ride_pending = state
            .collections
            .get(RIDE_REQUESTS_COLLECTION)
            .and_then(|rides| rides.get(&claim.ride_id))
            .is_some_and(|ride| {
                field_matches(
                    ride,
                    &FieldEquals::new(FIELD_STATUS, RideStatus::Pending.wire_name()),
                )
            });
        if !ride_pending {
            return Ok(ClaimOutcome::RideNotPending);
        }

        let Some(volunteer) = state
            .collections
            .get_mut(VOLUNTEERS_COLLECTION)
            .and_then(|volunteers| volunteers.get_mut(&claim.volunteer_id))
        else {
            return Ok(ClaimOutcome::VolunteerUnavailable);
        };
        let free = volunteer
            .get(FIELD_ACTIVE_RIDE_ID)
            .map_or(true, Value::is_null);
        if !free || !field_matches(volunteer, &FieldEquals::new(FIELD_IS_AVAILABLE, true)) {
            return Ok(ClaimOutcome::VolunteerUnavailable);
        }
        merge_fields(
            volunteer,
            &json_fields(json!({
                FIELD_IS_AVAILABLE: false,
                FIELD_ACTIVE_RIDE_ID: claim.ride_id.clone(),
            })),
        );

        if let Some(ride) = state
            .collections
            .get_mut(RIDE_REQUESTS_COLLECTION)
            .and_then(|rides| rides.get_mut(&claim.ride_id))
        {
            merge_fields(
                ride,
                &json_fields(json!({
                    FIELD_ASSIGNED_VOLUNTEER_ID: claim.volunteer_id.clone(),
                    FIELD_ASSIGNED_VOLUNTEER_NAME: claim.volunteer_name.clone(),
                    FIELD_STATUS: RideStatus::Accepted.wire_name(),
                    FIELD_ACCEPTED_AT: accepted_at_ms,
                })),
            );
        }

        Ok(ClaimOutcome::Claimed { accepted_at_ms })
    }

    fn server_timestamp_ms(&self) -> i64 {
        self.fixed_clock_ms
            .unwrap_or_else(|| chrono::Utc::now().timestamp_millis())
    }
}

fn json_fields(value: Value) -> Fields {
    match value {
        Value::Object(object) => object,
        _ => Fields::new(),
    }
}
