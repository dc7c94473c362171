use std::cmp::Ordering;

use crate::model::{RideRequest, Volunteer};

use super::algorithm::VolunteerMatcher;
use super::types::MatchCandidate;

/// Nearest volunteer whose own service radius covers the pickup point.
///
/// # Algorithm Behavior
///
/// 1. Computes the haversine distance from the pickup to each volunteer
/// 2. Drops volunteers farther away than their `max_distance_km`
/// 3. Orders the rest by ascending distance, ties broken by ascending
///    volunteer id so the result never depends on store order
///
/// The ride's urgency does not change the ordering: emergency and routine
/// requests both go to the closest volunteer in range.
///
/// # Performance
///
/// O(n log n) in the number of volunteers.
#[derive(Debug, Default, Clone, Copy)]
pub struct NearestInRangeMatcher;

impl NearestInRangeMatcher {
    fn compare(a: &MatchCandidate, b: &MatchCandidate) -> Ordering {
        a.distance_km
            .total_cmp(&b.distance_km)
            .then_with(|| a.volunteer.id.cmp(&b.volunteer.id))
    }
}

impl VolunteerMatcher for NearestInRangeMatcher {
    fn rank_candidates(&self, ride: &RideRequest, volunteers: &[Volunteer]) -> Vec<MatchCandidate> {
        let mut candidates: Vec<MatchCandidate> = volunteers
            .iter()
            .map(|volunteer| MatchCandidate {
                distance_km: ride.pickup.distance_km(&volunteer.location),
                volunteer: volunteer.clone(),
            })
            // NaN distances or radii fail the comparison and drop out here.
            .filter(MatchCandidate::is_within_range)
            .collect();

        candidates.sort_by(Self::compare);
        candidates
    }
}
