use serde::{Deserialize, Serialize};

/// A session whose start and end have both been observed.
///
/// Timestamps and durations are milliseconds. `duration` is always positive:
/// non-positive durations are filtered before a session is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletedSession {
    pub user_id: String,
    pub end_timestamp: i64,
    pub duration: i64,
}

impl CompletedSession {
    pub fn new(user_id: impl Into<String>, end_timestamp: i64, duration: i64) -> Self {
        Self {
            user_id: user_id.into(),
            end_timestamp,
            duration,
        }
    }
}

/// Which live sessions a duration query covers
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryScope {
    /// Every session still inside the retention window
    All,
    /// Sessions of a single user
    User(String),
}

impl QueryScope {
    /// Maps a raw user id to a scope; an empty id means all users.
    pub fn from_user_id(user_id: &str) -> Self {
        if user_id.is_empty() {
            Self::All
        } else {
            Self::User(user_id.to_string())
        }
    }

    pub fn user_id(&self) -> Option<&str> {
        match self {
            Self::All => None,
            Self::User(id) => Some(id),
        }
    }
}

impl Default for QueryScope {
    fn default() -> Self {
        Self::All
    }
}
