//! Ride request and volunteer records plus the ride status state machine.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geo::GeoPoint;

/// Display name recorded on an assignment when the volunteer has none.
pub const DEFAULT_VOLUNTEER_NAME: &str = "Volunteer";

/// Priority classification of a ride request, highest priority first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UrgencyLevel {
    Emergency,
    High,
    Medium,
    Low,
}

impl UrgencyLevel {
    pub const ALL: [UrgencyLevel; 4] = [
        UrgencyLevel::Emergency,
        UrgencyLevel::High,
        UrgencyLevel::Medium,
        UrgencyLevel::Low,
    ];

    pub fn wire_name(self) -> &'static str {
        match self {
            Self::Emergency => "EMERGENCY",
            Self::High => "HIGH",
            Self::Medium => "MEDIUM",
            Self::Low => "LOW",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Self::Emergency => "Emergency",
            Self::High => "High",
            Self::Medium => "Medium",
            Self::Low => "Low",
        }
    }
}

impl fmt::Display for UrgencyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Lifecycle of a ride request.
///
/// `Pending -> Accepted -> OnTheWay -> Arrived -> InProgress -> Completed`,
/// with `Cancelled` reachable from every non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RideStatus {
    Pending,
    #[serde(alias = "ASSIGNED")]
    Accepted,
    OnTheWay,
    Arrived,
    InProgress,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("ride status cannot move from {from} to {to}")]
pub struct TransitionError {
    pub from: RideStatus,
    pub to: RideStatus,
}

impl RideStatus {
    pub fn wire_name(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Accepted => "ACCEPTED",
            Self::OnTheWay => "ON_THE_WAY",
            Self::Arrived => "ARRIVED",
            Self::InProgress => "IN_PROGRESS",
            Self::Completed => "COMPLETED",
            Self::Cancelled => "CANCELLED",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    pub fn can_transition_to(self, next: RideStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        matches!(
            (self, next),
            (_, Self::Cancelled)
                | (Self::Pending, Self::Accepted)
                | (Self::Accepted, Self::OnTheWay)
                | (Self::OnTheWay, Self::Arrived)
                | (Self::Arrived, Self::InProgress)
                | (Self::InProgress, Self::Completed)
        )
    }

    pub fn transition_to(self, next: RideStatus) -> Result<RideStatus, TransitionError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(TransitionError {
                from: self,
                to: next,
            })
        }
    }
}

impl fmt::Display for RideStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleInfo {
    pub make: String,
    pub model: String,
    pub color: String,
    pub license_plate: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RideRequest {
    pub id: String,
    pub rider_id: Option<String>,
    pub rider_name: Option<String>,
    pub pickup: GeoPoint,
    pub dropoff: GeoPoint,
    pub urgency: UrgencyLevel,
    pub notes: String,
    pub status: RideStatus,
    pub created_at_ms: Option<i64>,
    pub assigned_volunteer_id: Option<String>,
    pub assigned_volunteer_name: Option<String>,
    pub accepted_at_ms: Option<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Volunteer {
    pub id: String,
    pub name: Option<String>,
    pub vehicle: Option<VehicleInfo>,
    pub rating: Option<f64>,
    pub is_available: bool,
    pub is_online: bool,
    pub location: GeoPoint,
    pub max_distance_km: f64,
    pub push_token: Option<String>,
    pub active_ride_id: Option<String>,
}

impl Volunteer {
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(DEFAULT_VOLUNTEER_NAME)
    }

    pub fn is_matchable(&self) -> bool {
        self.is_available && self.is_online
    }
}
