use crate::model::Volunteer;

/// A volunteer annotated with its great-circle distance to a pickup point.
///
/// Exists only for the duration of one matching pass.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchCandidate {
    pub volunteer: Volunteer,
    pub distance_km: f64,
}

impl MatchCandidate {
    pub fn volunteer_id(&self) -> &str {
        &self.volunteer.id
    }

    pub fn is_within_range(&self) -> bool {
        self.distance_km <= self.volunteer.max_distance_km
    }
}
