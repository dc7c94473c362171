use crate::model::{RideRequest, Volunteer};

use super::types::MatchCandidate;

/// Trait for strategies that pick a volunteer for a ride request.
///
/// Implementations rank candidates from best to worst. Callers that can
/// lose a claim race walk the ranking in order; callers that only need
/// the winner use [`VolunteerMatcher::find_match`].
///
/// # Examples
///
/// ```rust
/// use ride_match_core::geo::GeoPoint;
/// use ride_match_core::matching::{NearestInRangeMatcher, VolunteerMatcher};
/// use ride_match_core::model::{RideRequest, RideStatus, UrgencyLevel, Volunteer};
///
/// let ride = RideRequest {
///     id: "ride-1".to_string(),
///     rider_id: None,
///     rider_name: None,
///     pickup: GeoPoint::new(0.0, 0.0),
///     dropoff: GeoPoint::new(0.1, 0.1),
///     urgency: UrgencyLevel::Emergency,
///     notes: String::new(),
///     status: RideStatus::Pending,
///     created_at_ms: None,
///     assigned_volunteer_id: None,
///     assigned_volunteer_name: None,
///     accepted_at_ms: None,
/// };
/// let near = Volunteer {
///     id: "v1".to_string(),
///     name: None,
///     vehicle: None,
///     rating: None,
///     is_available: true,
///     is_online: true,
///     location: GeoPoint::new(0.0, 0.01),
///     max_distance_km: 5.0,
///     push_token: None,
///     active_ride_id: None,
/// };
///
/// let matched = NearestInRangeMatcher.find_match(&ride, &[near]);
/// assert_eq!(matched.map(|candidate| candidate.volunteer.id), Some("v1".to_string()));
/// ```
pub trait VolunteerMatcher: Send + Sync {
    /// Rank every eligible volunteer for `ride`, best first.
    ///
    /// Volunteers the ride is out of range for are excluded, so an empty
    /// result means no volunteer can serve the request.
    fn rank_candidates(&self, ride: &RideRequest, volunteers: &[Volunteer]) -> Vec<MatchCandidate>;

    /// The single best candidate, or `None` when nobody is in range.
    fn find_match(&self, ride: &RideRequest, volunteers: &[Volunteer]) -> Option<MatchCandidate> {
        self.rank_candidates(ride, volunteers).into_iter().next()
    }
}
