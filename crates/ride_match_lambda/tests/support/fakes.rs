#![allow(dead_code)]

use std::sync::Mutex;

use serde_json::{json, Value};

use ride_match_core::contract::{FIELD_IS_AVAILABLE, VOLUNTEERS_COLLECTION};
use ride_match_core::notification::PushMessage;
use ride_match_lambda::adapters::document_store::{
    AssignmentClaim, ClaimOutcome, DocumentStore, FieldEquals, Fields, StoreError, StoredDocument,
};
use ride_match_lambda::adapters::memory_store::InMemoryDocumentStore;
use ride_match_lambda::adapters::push::{PushError, PushSender};

/// Push sender that records every message it is asked to deliver.
pub struct RecordingPushSender {
    sent: Mutex<Vec<PushMessage>>,
    fail_with: Option<PushError>,
}

impl RecordingPushSender {
    pub fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail_with: None,
        }
    }

    pub fn failing(error: PushError) -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail_with: Some(error),
        }
    }

    pub fn sent(&self) -> Vec<PushMessage> {
        self.sent.lock().expect("poisoned mutex").clone()
    }
}

impl PushSender for RecordingPushSender {
    fn send(&self, message: &PushMessage) -> Result<String, PushError> {
        let mut sent = self.sent.lock().expect("poisoned mutex");
        sent.push(message.clone());
        match &self.fail_with {
            Some(error) => Err(error.clone()),
            None => Ok(format!("msg-{}", sent.len())),
        }
    }
}

/// Wraps the in-memory store to count calls, inject failures and
/// simulate a concurrent invocation claiming volunteers first.
pub struct InstrumentedStore {
    pub inner: InMemoryDocumentStore,
    queries: Mutex<usize>,
    claims: Mutex<Vec<AssignmentClaim>>,
    updates: Mutex<usize>,
    fail_queries: bool,
    fail_claims: bool,
    claimed_elsewhere: Vec<String>,
}

impl InstrumentedStore {
    pub fn new(inner: InMemoryDocumentStore) -> Self {
        Self {
            inner,
            queries: Mutex::new(0),
            claims: Mutex::new(Vec::new()),
            updates: Mutex::new(0),
            fail_queries: false,
            fail_claims: false,
            claimed_elsewhere: Vec::new(),
        }
    }

    pub fn failing_queries(mut self) -> Self {
        self.fail_queries = true;
        self
    }

    pub fn failing_claims(mut self) -> Self {
        self.fail_claims = true;
        self
    }

    /// These volunteers get taken by someone else right before our claim lands.
    pub fn claimed_elsewhere(mut self, volunteer_ids: &[&str]) -> Self {
        self.claimed_elsewhere = volunteer_ids.iter().map(|id| id.to_string()).collect();
        self
    }

    pub fn query_count(&self) -> usize {
        *self.queries.lock().expect("poisoned mutex")
    }

    pub fn claims(&self) -> Vec<AssignmentClaim> {
        self.claims.lock().expect("poisoned mutex").clone()
    }

    pub fn write_count(&self) -> usize {
        self.claims().len() + *self.updates.lock().expect("poisoned mutex")
    }
}

impl DocumentStore for InstrumentedStore {
    fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, StoreError> {
        self.inner.get(collection, id)
    }

    fn create(&self, collection: &str, fields: Value) -> Result<String, StoreError> {
        *self.updates.lock().expect("poisoned mutex") += 1;
        self.inner.create(collection, fields)
    }

    fn update_fields(
        &self,
        collection: &str,
        id: &str,
        fields: &Fields,
        condition: Option<&FieldEquals>,
    ) -> Result<(), StoreError> {
        *self.updates.lock().expect("poisoned mutex") += 1;
        self.inner.update_fields(collection, id, fields, condition)
    }

    fn query_equal(
        &self,
        collection: &str,
        filters: &[FieldEquals],
    ) -> Result<Vec<StoredDocument>, StoreError> {
        *self.queries.lock().expect("poisoned mutex") += 1;
        if self.fail_queries {
            return Err(StoreError::Backend("scan throttled".to_string()));
        }
        self.inner.query_equal(collection, filters)
    }

    fn claim_assignment(&self, claim: &AssignmentClaim) -> Result<ClaimOutcome, StoreError> {
        self.claims
            .lock()
            .expect("poisoned mutex")
            .push(claim.clone());
        if self.fail_claims {
            return Err(StoreError::Backend("transaction failed".to_string()));
        }
        if self.claimed_elsewhere.contains(&claim.volunteer_id) {
            let mut taken = Fields::new();
            taken.insert(FIELD_IS_AVAILABLE.to_string(), json!(false));
            self.inner
                .update_fields(VOLUNTEERS_COLLECTION, &claim.volunteer_id, &taken, None)?;
        }
        self.inner.claim_assignment(claim)
    }

    fn server_timestamp_ms(&self) -> i64 {
        self.inner.server_timestamp_ms()
    }
}
