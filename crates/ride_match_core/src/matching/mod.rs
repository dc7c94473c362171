pub mod algorithm;
pub mod nearest;
pub mod types;

pub use algorithm::VolunteerMatcher;
pub use nearest::NearestInRangeMatcher;
pub use types::MatchCandidate;
