//! Strongly-typed ID types for domain entities.
//!
//! The storefront backend issues opaque string identifiers (GUIDs in
//! practice). The client never interprets them; it only carries them back in
//! request paths, so the wrapper only rejects values that could not form a
//! path segment.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Error returned when parsing an ID from a string fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIdError {
    /// The type of ID that failed to parse.
    pub id_type: &'static str,
    /// The reason for the parse failure.
    pub reason: String,
}

impl fmt::Display for ParseIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to parse {}: {}", self.id_type, self.reason)
    }
}

impl std::error::Error for ParseIdError {}

/// Unique identifier for a user, as assigned by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Creates an ID from a backend-issued string without validation.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for UserId {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(ParseIdError {
                id_type: "UserId",
                reason: "empty identifier".to_string(),
            });
        }
        if trimmed.contains(['/', '?', '#']) {
            return Err(ParseIdError {
                id_type: "UserId",
                reason: format!("'{trimmed}' contains a reserved path character"),
            });
        }
        Ok(Self(trimmed.to_string()))
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for UserId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_raw_value() {
        let id = UserId::new("3f2a9c1e-0000-4000-8000-000000000001");
        assert_eq!(id.to_string(), "3f2a9c1e-0000-4000-8000-000000000001");
    }

    #[test]
    fn parse_trims_whitespace() {
        let id: UserId = "  abc-123 ".parse().expect("should parse");
        assert_eq!(id.as_str(), "abc-123");
    }

    #[test]
    fn parse_empty_fails() {
        let err = "   ".parse::<UserId>().unwrap_err();
        assert_eq!(err.id_type, "UserId");
        assert!(err.to_string().contains("empty"));
    }

    #[test]
    fn parse_rejects_path_characters() {
        assert!("abc/def".parse::<UserId>().is_err());
        assert!("abc?x=1".parse::<UserId>().is_err());
    }

    #[test]
    fn serializes_as_plain_string() {
        let id = UserId::from("u-1");
        let json = serde_json::to_string(&id).expect("serialize");
        assert_eq!(json, "\"u-1\"");
    }
}
