//! Strongly-typed identifiers used across the graph.

use core::str::FromStr;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::GraphError;

/// Maximum length of a logical id accepted by the template format.
pub const MAX_LOGICAL_ID_LEN: usize = 255;

/// Logical identifier of a resource or output within a template.
///
/// Logical ids are non-empty, ASCII alphanumeric and at most
/// [`MAX_LOGICAL_ID_LEN`] characters long.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LogicalId(String);

impl LogicalId {
    pub fn new(id: impl Into<String>) -> Result<Self, GraphError> {
        let id = id.into();
        if id.is_empty() {
            return Err(GraphError::invalid_id("logical id cannot be empty"));
        }
        if id.len() > MAX_LOGICAL_ID_LEN {
            return Err(GraphError::invalid_id(format!(
                "logical id '{id}' exceeds {MAX_LOGICAL_ID_LEN} characters"
            )));
        }
        if !id.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(GraphError::invalid_id(format!(
                "logical id '{id}' must be alphanumeric"
            )));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Derive a child id by appending an alphanumeric suffix.
    pub fn child(&self, suffix: &str) -> Result<Self, GraphError> {
        Self::new(format!("{}{}", self.0, suffix))
    }
}

impl core::fmt::Display for LogicalId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for LogicalId {
    type Err = GraphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for LogicalId {
    type Error = GraphError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<LogicalId> for String {
    fn from(value: LogicalId) -> Self {
        value.0
    }
}

/// Identifier of one synthesis run, stamped into template metadata.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SynthesisId(Uuid);

impl SynthesisId {
    /// Create a new identifier.
    ///
    /// Uses UUIDv7 (time-ordered). Prefer passing IDs explicitly in tests
    /// for determinism.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for SynthesisId {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Display for SynthesisId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for SynthesisId {
    type Err = GraphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let uuid = Uuid::from_str(s)
            .map_err(|e| GraphError::invalid_id(format!("SynthesisId: {e}")))?;
        Ok(Self(uuid))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_alphanumeric_ids() {
        let id = LogicalId::new("ItemsTable01").unwrap();
        assert_eq!(id.as_str(), "ItemsTable01");
        assert_eq!(id.to_string(), "ItemsTable01");
    }

    #[test]
    fn rejects_empty_and_punctuated_ids() {
        assert!(matches!(LogicalId::new(""), Err(GraphError::InvalidId(_))));
        assert!(matches!(LogicalId::new("items_table"), Err(GraphError::InvalidId(_))));
        assert!(matches!(LogicalId::new("Items-Table"), Err(GraphError::InvalidId(_))));
    }

    #[test]
    fn rejects_overlong_ids() {
        let long = "A".repeat(MAX_LOGICAL_ID_LEN + 1);
        assert!(LogicalId::new(long).is_err());
        assert!(LogicalId::new("A".repeat(MAX_LOGICAL_ID_LEN)).is_ok());
    }

    #[test]
    fn child_ids_append_suffix() {
        let api = LogicalId::new("HttpApi").unwrap();
        assert_eq!(api.child("DefaultStage").unwrap().as_str(), "HttpApiDefaultStage");
        assert!(api.child("/stage").is_err());
    }

    #[test]
    fn deserialization_validates() {
        let ok: LogicalId = serde_json::from_str("\"UserPool\"").unwrap();
        assert_eq!(ok.as_str(), "UserPool");
        assert!(serde_json::from_str::<LogicalId>("\"user pool\"").is_err());
    }

    #[test]
    fn synthesis_id_round_trips_through_display() {
        let id = SynthesisId::new();
        let parsed: SynthesisId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }
}
