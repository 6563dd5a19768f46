//! Task identifiers
//!
//! ID Format:
//! - Generated IDs: `t-{7-char-hash}` (e.g., `t-9d3e5f2`)
//! - Imported IDs: any non-empty token without whitespace (e.g. a UUID)
//!
//! The scheduler treats IDs as opaque; only uniqueness matters. Generated
//! hashes are derived from name + creation timestamp, so the same name at
//! different times yields different IDs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum IdError {
    #[error("Task ID must not be empty")]
    Empty,

    #[error("Invalid task ID '{0}': whitespace is not allowed")]
    Whitespace(String),
}

/// Generates a 7-character hash from name and timestamp
fn generate_hash(name: &str, timestamp: DateTime<Utc>) -> String {
    let input = format!("{}{}", name, timestamp.timestamp_nanos_opt().unwrap_or(0));
    let hash = blake3::hash(input.as_bytes());
    let hex = hash.to_hex();
    hex[..7].to_string()
}

/// Opaque, totally ordered task identifier
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TaskId(String);

impl TaskId {
    /// Creates a new `t-` ID from name and timestamp
    pub fn generate(name: &str, timestamp: DateTime<Utc>) -> Self {
        Self(format!("t-{}", generate_hash(name, timestamp)))
    }

    /// Returns the ID as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for TaskId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(IdError::Empty);
        }
        if s.chars().any(char::is_whitespace) {
            return Err(IdError::Whitespace(s.to_string()));
        }
        Ok(Self(s.to_string()))
    }
}

impl TryFrom<String> for TaskId {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TaskId> for String {
    fn from(id: TaskId) -> Self {
        id.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_differ_across_timestamps() {
        let name = "Same Name";
        let ts1 = Utc::now();
        let ts2 = ts1 + chrono::Duration::nanoseconds(1);

        assert_ne!(TaskId::generate(name, ts1), TaskId::generate(name, ts2));
    }

    #[test]
    fn generated_id_format_is_correct() {
        let id = TaskId::generate("Design", Utc::now());
        let s = id.to_string();

        assert!(s.starts_with("t-"));
        assert_eq!(s.len(), 9); // "t-" + 7 chars
        assert!(s[2..].chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn parses_opaque_tokens() {
        let id: TaskId = "0F8FAD5B-D9CB-469F-A165-70867728950E".parse().unwrap();
        assert_eq!(id.as_str(), "0F8FAD5B-D9CB-469F-A165-70867728950E");

        let trimmed: TaskId = "  t-1234567 ".parse().unwrap();
        assert_eq!(trimmed.as_str(), "t-1234567");
    }

    #[test]
    fn rejects_empty_and_whitespace() {
        assert_eq!("".parse::<TaskId>(), Err(IdError::Empty));
        assert_eq!("   ".parse::<TaskId>(), Err(IdError::Empty));
        assert!(matches!(
            "two words".parse::<TaskId>(),
            Err(IdError::Whitespace(_))
        ));
    }

    #[test]
    fn serde_uses_plain_string() {
        let id: TaskId = "t-abcdef1".parse().unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"t-abcdef1\"");

        let back: TaskId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);

        assert!(serde_json::from_str::<TaskId>("\"\"").is_err());
    }
}
