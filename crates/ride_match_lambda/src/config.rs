//! Runtime configuration read from the Lambda environment.

use thiserror::Error;

use ride_match_core::contract::{
    RIDE_REQUESTS_COLLECTION, USERS_COLLECTION, VOLUNTEERS_COLLECTION,
};

pub const RIDE_REQUESTS_TABLE_VAR: &str = "RIDE_REQUESTS_TABLE";
pub const VOLUNTEERS_TABLE_VAR: &str = "VOLUNTEERS_TABLE";
pub const USERS_TABLE_VAR: &str = "USERS_TABLE";
pub const PUSH_DRY_RUN_VAR: &str = "PUSH_DRY_RUN";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{name} must be 'true' or 'false', got '{value}'")]
    InvalidBool { name: &'static str, value: String },
    #[error("{0} cannot be blank")]
    Blank(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableNames {
    pub ride_requests: String,
    pub volunteers: String,
    pub users: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    pub tables: TableNames,
    /// Log push messages instead of publishing them.
    pub push_dry_run: bool,
}

impl RuntimeConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let table = |name: &'static str, default: &str| -> Result<String, ConfigError> {
            match lookup(name) {
                Some(value) if value.trim().is_empty() => Err(ConfigError::Blank(name)),
                Some(value) => Ok(value.trim().to_string()),
                None => Ok(default.to_string()),
            }
        };

        let push_dry_run = match lookup(PUSH_DRY_RUN_VAR) {
            None => false,
            Some(value) => match value.trim().to_ascii_lowercase().as_str() {
                "" | "false" | "0" => false,
                "true" | "1" => true,
                _ => {
                    return Err(ConfigError::InvalidBool {
                        name: PUSH_DRY_RUN_VAR,
                        value,
                    })
                }
            },
        };

        Ok(Self {
            tables: TableNames {
                ride_requests: table(RIDE_REQUESTS_TABLE_VAR, RIDE_REQUESTS_COLLECTION)?,
                volunteers: table(VOLUNTEERS_TABLE_VAR, VOLUNTEERS_COLLECTION)?,
                users: table(USERS_TABLE_VAR, USERS_COLLECTION)?,
            },
            push_dry_run,
        })
    }
}
