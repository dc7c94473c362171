#![allow(dead_code)]

use serde_json::{json, Value};

use ride_match_core::contract::{RIDE_REQUESTS_COLLECTION, VOLUNTEERS_COLLECTION};
use ride_match_lambda::adapters::document_store::DocumentStore;
use ride_match_lambda::adapters::memory_store::InMemoryDocumentStore;
use ride_match_lambda::handlers::match_ride::RideCreatedEvent;

/// Store clock used by every seeded store, in epoch milliseconds.
pub const FIXED_NOW_MS: i64 = 1_760_000_000_000;

/// Builder for ride request documents as the client app writes them.
#[derive(Clone, Debug)]
pub struct RideBuilder {
    rider_name: Option<String>,
    pickup: (f64, f64),
    urgency: &'static str,
    status: &'static str,
}

impl Default for RideBuilder {
    fn default() -> Self {
        Self {
            rider_name: Some("Ada".to_string()),
            pickup: (0.0, 0.0),
            urgency: "MEDIUM",
            status: "PENDING",
        }
    }
}

impl RideBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn at(mut self, latitude: f64, longitude: f64) -> Self {
        self.pickup = (latitude, longitude);
        self
    }

    pub fn urgency(mut self, urgency: &'static str) -> Self {
        self.urgency = urgency;
        self
    }

    pub fn status(mut self, status: &'static str) -> Self {
        self.status = status;
        self
    }

    pub fn anonymous(mut self) -> Self {
        self.rider_name = None;
        self
    }

    pub fn fields(&self) -> Value {
        let mut fields = json!({
            "riderId": "rider-1",
            "pickupLocation": {"latitude": self.pickup.0, "longitude": self.pickup.1},
            "dropoffLocation": {"latitude": self.pickup.0 + 0.05, "longitude": self.pickup.1 + 0.05},
            "urgency": self.urgency,
            "notes": "",
            "status": self.status,
            "createdAt": FIXED_NOW_MS - 60_000,
        });
        if let Some(name) = &self.rider_name {
            fields["riderName"] = json!(name);
        }
        fields
    }
}

/// Builder for volunteer documents.
#[derive(Clone, Debug)]
pub struct VolunteerBuilder {
    name: Option<String>,
    location: (f64, f64),
    max_distance_km: f64,
    is_available: bool,
    is_online: bool,
    push_token: Option<String>,
}

impl VolunteerBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: Some(name.to_string()),
            location: (0.0, 0.0),
            max_distance_km: 10.0,
            is_available: true,
            is_online: true,
            push_token: Some(format!("token-{}", name.to_lowercase())),
        }
    }

    pub fn at(mut self, latitude: f64, longitude: f64) -> Self {
        self.location = (latitude, longitude);
        self
    }

    pub fn max_distance(mut self, max_distance_km: f64) -> Self {
        self.max_distance_km = max_distance_km;
        self
    }

    pub fn offline(mut self) -> Self {
        self.is_online = false;
        self
    }

    pub fn unavailable(mut self) -> Self {
        self.is_available = false;
        self
    }

    pub fn without_token(mut self) -> Self {
        self.push_token = None;
        self
    }

    pub fn unnamed(mut self) -> Self {
        self.name = None;
        self
    }

    pub fn fields(&self) -> Value {
        let mut fields = json!({
            "isAvailable": self.is_available,
            "isOnline": self.is_online,
            "currentLocation": {"latitude": self.location.0, "longitude": self.location.1},
            "maxDistance": self.max_distance_km,
        });
        if let Some(name) = &self.name {
            fields["name"] = json!(name);
        }
        if let Some(token) = &self.push_token {
            fields["fcmToken"] = json!(token);
        }
        fields
    }
}

/// In-memory store holding the given documents, with the clock pinned.
pub fn seeded_store(
    rides: &[(&str, RideBuilder)],
    volunteers: &[(&str, VolunteerBuilder)],
) -> InMemoryDocumentStore {
    let store = InMemoryDocumentStore::new().with_fixed_clock(FIXED_NOW_MS);
    for (id, ride) in rides {
        store
            .insert(RIDE_REQUESTS_COLLECTION, id, ride.fields())
            .expect("seed ride");
    }
    for (id, volunteer) in volunteers {
        store
            .insert(VOLUNTEERS_COLLECTION, id, volunteer.fields())
            .expect("seed volunteer");
    }
    store
}

/// Creation event carrying the ride document as currently stored.
pub fn created_event(store: &impl DocumentStore, ride_id: &str) -> RideCreatedEvent {
    let fields = store
        .get(RIDE_REQUESTS_COLLECTION, ride_id)
        .expect("read ride")
        .expect("ride exists");
    RideCreatedEvent {
        ride_id: ride_id.to_string(),
        fields,
    }
}

pub fn stored(store: &impl DocumentStore, collection: &str, id: &str) -> Value {
    store
        .get(collection, id)
        .expect("read document")
        .expect("document exists")
}

pub fn stored_ride(store: &impl DocumentStore, id: &str) -> Value {
    stored(store, RIDE_REQUESTS_COLLECTION, id)
}

pub fn stored_volunteer(store: &impl DocumentStore, id: &str) -> Value {
    stored(store, VOLUNTEERS_COLLECTION, id)
}
