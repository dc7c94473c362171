//! Request/response contracts shared by the Lambda entry points.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::geo::GeoPoint;
use crate::model::{RideStatus, UrgencyLevel};
use crate::notification::PushMessage;

pub const RIDE_REQUESTS_COLLECTION: &str = "rideRequests";
pub const VOLUNTEERS_COLLECTION: &str = "volunteers";
pub const USERS_COLLECTION: &str = "users";

pub const FIELD_STATUS: &str = "status";
pub const FIELD_IS_AVAILABLE: &str = "isAvailable";
pub const FIELD_IS_ONLINE: &str = "isOnline";
pub const FIELD_ASSIGNED_VOLUNTEER_ID: &str = "assignedVolunteerId";
pub const FIELD_ASSIGNED_VOLUNTEER_NAME: &str = "assignedVolunteerName";
pub const FIELD_ACCEPTED_AT: &str = "acceptedAt";
pub const FIELD_ACTIVE_RIDE_ID: &str = "activeRideId";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    message: String,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Payload of the `sendRideNotification` callable.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SendNotificationRequest {
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub data: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SendNotificationResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SendNotificationResponse {
    pub fn sent(message_id: impl Into<String>) -> Self {
        Self {
            success: true,
            message_id: Some(message_id.into()),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            message_id: None,
            error: Some(error.into()),
        }
    }
}

pub fn normalize_send_notification(
    request: SendNotificationRequest,
) -> Result<PushMessage, ValidationError> {
    let token = request.token.trim().to_string();
    if token.is_empty() {
        return Err(ValidationError::new("token cannot be empty"));
    }
    if request.title.trim().is_empty() {
        return Err(ValidationError::new("title cannot be empty"));
    }

    Ok(PushMessage {
        token,
        title: request.title,
        body: request.body,
        data: request.data.unwrap_or_default(),
    })
}

/// Actions accepted by the ride API callable, tagged by `action`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum RideApiRequest {
    CreateRideRequest(CreateRideRequestInput),
    ListPendingRequests,
    #[serde(rename_all = "camelCase")]
    UpdateRideStatus { ride_id: String, status: RideStatus },
    #[serde(rename_all = "camelCase")]
    SetVolunteerAvailability {
        volunteer_id: String,
        is_available: bool,
        #[serde(default)]
        is_online: Option<bool>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CreateRideRequestInput {
    #[serde(default)]
    pub rider_id: Option<String>,
    #[serde(default)]
    pub rider_name: Option<String>,
    pub pickup_location: GeoPoint,
    pub dropoff_location: GeoPoint,
    pub urgency: UrgencyLevel,
    #[serde(default)]
    pub notes: String,
}

impl CreateRideRequestInput {
    /// Checks both coordinates and trims free-text fields.
    pub fn normalize(self) -> Result<Self, ValidationError> {
        let pickup = GeoPoint::validated(
            self.pickup_location.latitude,
            self.pickup_location.longitude,
        )
        .map_err(|error| ValidationError::new(format!("pickupLocation: {error}")))?;
        let dropoff = GeoPoint::validated(
            self.dropoff_location.latitude,
            self.dropoff_location.longitude,
        )
        .map_err(|error| ValidationError::new(format!("dropoffLocation: {error}")))?;

        Ok(Self {
            rider_id: trimmed_non_empty(self.rider_id),
            rider_name: trimmed_non_empty(self.rider_name),
            pickup_location: pickup,
            dropoff_location: dropoff,
            urgency: self.urgency,
            notes: self.notes.trim().to_string(),
        })
    }
}

fn trimmed_non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}
