use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::model::RideRequest;

pub const NEW_RIDE_REQUEST_TITLE: &str = "New Ride Request";
pub const RIDE_REQUEST_MESSAGE_TYPE: &str = "ride_request";
const UNNAMED_RIDER: &str = "a rider";

/// A push notification addressed to one device token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushMessage {
    pub token: String,
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub data: BTreeMap<String, String>,
}

/// Notification telling a volunteer they were matched to `ride`.
pub fn ride_request_notification(ride: &RideRequest, token: &str) -> PushMessage {
    let rider_name = ride
        .rider_name
        .as_deref()
        .filter(|name| !name.trim().is_empty())
        .unwrap_or(UNNAMED_RIDER);

    PushMessage {
        token: token.to_string(),
        title: NEW_RIDE_REQUEST_TITLE.to_string(),
        body: format!(
            "Ride request from {rider_name} - {} priority",
            ride.urgency.wire_name()
        ),
        data: BTreeMap::from([
            ("rideId".to_string(), ride.id.clone()),
            ("type".to_string(), RIDE_REQUEST_MESSAGE_TYPE.to_string()),
        ]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::GeoPoint;
    use crate::model::{RideStatus, UrgencyLevel};

    fn ride(rider_name: Option<&str>) -> RideRequest {
        RideRequest {
            id: "ride-42".to_string(),
            rider_id: None,
            rider_name: rider_name.map(str::to_string),
            pickup: GeoPoint::new(0.0, 0.0),
            dropoff: GeoPoint::new(1.0, 1.0),
            urgency: UrgencyLevel::Emergency,
            notes: "wheelchair".to_string(),
            status: RideStatus::Accepted,
            created_at_ms: None,
            assigned_volunteer_id: None,
            assigned_volunteer_name: None,
            accepted_at_ms: None,
        }
    }

    #[test]
    fn payload_names_rider_and_urgency() {
        let message = ride_request_notification(&ride(Some("Ada")), "device-token");

        assert_eq!(message.token, "device-token");
        assert_eq!(message.title, "New Ride Request");
        assert_eq!(message.body, "Ride request from Ada - EMERGENCY priority");
        assert_eq!(message.data.get("rideId").map(String::as_str), Some("ride-42"));
        assert_eq!(message.data.get("type").map(String::as_str), Some("ride_request"));
    }

    #[test]
    fn missing_rider_name_uses_placeholder() {
        let message = ride_request_notification(&ride(None), "t");
        assert_eq!(message.body, "Ride request from a rider - EMERGENCY priority");
    }
}
