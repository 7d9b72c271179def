use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::Result;

/// Which edge of a session an event marks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionEventKind {
    Started,
    Ended,
}

impl fmt::Display for SessionEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionEventKind::Started => write!(f, "started"),
            SessionEventKind::Ended => write!(f, "ended"),
        }
    }
}

/// Payload of a session start/end notification.
///
/// On the wire `timestamp` is a decimal string of milliseconds since the
/// epoch (`"1700000000000"`); plain JSON integers are accepted as well.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionEvent {
    pub user_id: String,
    pub session_id: String,
    #[serde(
        serialize_with = "serialize_timestamp",
        deserialize_with = "deserialize_timestamp"
    )]
    pub timestamp: i64,
}

impl SessionEvent {
    pub fn new(user_id: impl Into<String>, session_id: impl Into<String>, timestamp: i64) -> Self {
        Self {
            user_id: user_id.into(),
            session_id: session_id.into(),
            timestamp,
        }
    }

    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawTimestamp {
    Number(i64),
    Text(String),
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> std::result::Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    match RawTimestamp::deserialize(deserializer)? {
        RawTimestamp::Number(value) => Ok(value),
        RawTimestamp::Text(text) => text.parse::<i64>().map_err(|e| {
            serde::de::Error::custom(format!("invalid timestamp {:?}: {}", text, e))
        }),
    }
}

fn serialize_timestamp<S>(timestamp: &i64, serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&timestamp.to_string())
}
