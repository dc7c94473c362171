use serde_json::{Map, Value};
use thiserror::Error;

use ride_match_core::decode::DecodeError;

pub type Fields = Map<String, Value>;

/// A stored document: its identifier plus its field values.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    pub id: String,
    pub fields: Value,
}

/// Equality precondition on a single field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldEquals {
    pub field: String,
    pub value: Value,
}

impl FieldEquals {
    pub fn new(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }
}

/// Both sides of a volunteer assignment, written together or not at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssignmentClaim {
    pub ride_id: String,
    pub volunteer_id: String,
    pub volunteer_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimOutcome {
    /// Ride moved to Accepted and the volunteer was marked unavailable.
    Claimed { accepted_at_ms: i64 },
    /// The volunteer was taken (or went offline) since the candidate read.
    VolunteerUnavailable,
    /// The ride is no longer Pending; nothing was written.
    RideNotPending,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("{collection}/{id} does not exist")]
    NotFound { collection: String, id: String },
    #[error("precondition failed for {collection}/{id}")]
    ConditionFailed { collection: String, id: String },
    #[error("document store failure: {0}")]
    Backend(String),
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

/// Document store collaborator.
///
/// Mirrors the operations the ride pipeline needs from the backend:
/// point reads, creation with generated identifiers, field updates,
/// equality-filtered queries, and the conditional assignment claim.
pub trait DocumentStore {
    fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, StoreError>;

    /// Stores `fields` under a newly generated identifier and returns it.
    fn create(&self, collection: &str, fields: Value) -> Result<String, StoreError>;

    /// Merges `fields` into an existing document.
    ///
    /// Fails with `NotFound` when the document is missing and with
    /// `ConditionFailed` when `condition` does not hold.
    fn update_fields(
        &self,
        collection: &str,
        id: &str,
        fields: &Fields,
        condition: Option<&FieldEquals>,
    ) -> Result<(), StoreError>;

    /// Documents whose fields equal every filter, in store order.
    fn query_equal(
        &self,
        collection: &str,
        filters: &[FieldEquals],
    ) -> Result<Vec<StoredDocument>, StoreError>;

    /// Assigns a volunteer to a pending ride and takes the volunteer out of
    /// the available pool in one conditional write.
    fn claim_assignment(&self, claim: &AssignmentClaim) -> Result<ClaimOutcome, StoreError>;

    /// The store's notion of "now", in epoch milliseconds.
    fn server_timestamp_ms(&self) -> i64;
}
