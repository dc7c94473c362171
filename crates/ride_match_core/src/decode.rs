//! Typed decoding of stored documents.
//!
//! Documents arrive as untyped JSON objects (camelCase keys). Each record
//! kind has an explicit schema struct where every field is optional; the
//! decode step then checks the required fields and reports the first one
//! missing instead of substituting a default.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::geo::GeoPoint;
use crate::model::{RideRequest, RideStatus, UrgencyLevel, VehicleInfo, Volunteer};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    RideRequest,
    Volunteer,
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RideRequest => f.write_str("ride request"),
            Self::Volunteer => f.write_str("volunteer"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("{kind} '{id}' is missing required field '{field}'")]
    MissingField {
        kind: RecordKind,
        id: String,
        field: &'static str,
    },
    #[error("{kind} '{id}' is malformed: {message}")]
    Malformed {
        kind: RecordKind,
        id: String,
        message: String,
    },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RideRequestDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rider_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rider_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pickup_location: Option<GeoPoint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dropoff_location: Option<GeoPoint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub urgency: Option<UrgencyLevel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<RideStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_volunteer_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_volunteer_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accepted_at: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolunteerDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vehicle_info: Option<VehicleInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_available: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_online: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_location: Option<GeoPoint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_distance: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fcm_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_ride_id: Option<String>,
}

fn parse_document<T: for<'de> Deserialize<'de>>(
    kind: RecordKind,
    id: &str,
    fields: &Value,
) -> Result<T, DecodeError> {
    if !fields.is_object() {
        return Err(DecodeError::Malformed {
            kind,
            id: id.to_string(),
            message: "document must be a JSON object".to_string(),
        });
    }
    T::deserialize(fields).map_err(|error| DecodeError::Malformed {
        kind,
        id: id.to_string(),
        message: error.to_string(),
    })
}

fn required<T>(
    value: Option<T>,
    kind: RecordKind,
    id: &str,
    field: &'static str,
) -> Result<T, DecodeError> {
    value.ok_or_else(|| DecodeError::MissingField {
        kind,
        id: id.to_string(),
        field,
    })
}

pub fn decode_ride_request(id: &str, fields: &Value) -> Result<RideRequest, DecodeError> {
    let kind = RecordKind::RideRequest;
    let document: RideRequestDocument = parse_document(kind, id, fields)?;

    Ok(RideRequest {
        id: id.to_string(),
        rider_id: document.rider_id,
        rider_name: document.rider_name,
        pickup: required(document.pickup_location, kind, id, "pickupLocation")?,
        dropoff: required(document.dropoff_location, kind, id, "dropoffLocation")?,
        urgency: required(document.urgency, kind, id, "urgency")?,
        notes: document.notes.unwrap_or_default(),
        status: required(document.status, kind, id, "status")?,
        created_at_ms: document.created_at,
        assigned_volunteer_id: document.assigned_volunteer_id,
        assigned_volunteer_name: document.assigned_volunteer_name,
        accepted_at_ms: document.accepted_at,
    })
}

pub fn decode_volunteer(id: &str, fields: &Value) -> Result<Volunteer, DecodeError> {
    let kind = RecordKind::Volunteer;
    let document: VolunteerDocument = parse_document(kind, id, fields)?;

    Ok(Volunteer {
        id: id.to_string(),
        name: document.name,
        vehicle: document.vehicle_info,
        rating: document.rating,
        is_available: required(document.is_available, kind, id, "isAvailable")?,
        is_online: required(document.is_online, kind, id, "isOnline")?,
        location: required(document.current_location, kind, id, "currentLocation")?,
        max_distance_km: required(document.max_distance, kind, id, "maxDistance")?,
        push_token: document
            .fcm_token
            .filter(|token| !token.trim().is_empty()),
        active_ride_id: document.active_ride_id,
    })
}

pub fn encode_ride_request(ride: &RideRequest) -> Value {
    let document = RideRequestDocument {
        rider_id: ride.rider_id.clone(),
        rider_name: ride.rider_name.clone(),
        pickup_location: Some(ride.pickup),
        dropoff_location: Some(ride.dropoff),
        urgency: Some(ride.urgency),
        notes: Some(ride.notes.clone()),
        status: Some(ride.status),
        created_at: ride.created_at_ms,
        assigned_volunteer_id: ride.assigned_volunteer_id.clone(),
        assigned_volunteer_name: ride.assigned_volunteer_name.clone(),
        accepted_at: ride.accepted_at_ms,
    };
    serde_json::to_value(document).expect("ride request document should serialize")
}
