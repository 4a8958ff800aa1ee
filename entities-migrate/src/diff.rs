//! Differences between recorded, live and declared schemas.

use std::fmt;

use entities_schema::TableModel;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Reason given when a live table no longer matches its fingerprint.
pub const ALTERED_OUTSIDE: &str = "table altered outside its model";
/// Reason given when a declared model no longer matches its fingerprint.
pub const ALTERED_BY_MODEL: &str = "table altered by its model";
/// Reason given when a fingerprinted table disappeared.
pub const DROPPED_OUTSIDE: &str = "table dropped outside of its model";
/// Reason given when a live table has no fingerprint.
pub const CREATED_OUTSIDE: &str = "table created outside of its model";
/// Reason given when a declared table predates the store with another shape.
pub const PREDATES_STORE: &str = "table predates the fingerprint store";

/// Which side of the comparison drifted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DifferenceKind {
    /// The live table changed behind the engine's back.
    Physical,
    /// The declared model changed since the last run.
    Object,
}

impl fmt::Display for DifferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Physical => f.write_str("physical"),
            Self::Object => f.write_str("object"),
        }
    }
}

/// A named schema difference found during reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Difference {
    /// Table name.
    pub name: String,
    /// Which side drifted.
    pub kind: DifferenceKind,
    /// Human-readable reason.
    pub reason: String,
}

impl Difference {
    /// A physical difference.
    pub fn physical(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: DifferenceKind::Physical,
            reason: reason.into(),
        }
    }

    /// An object difference.
    pub fn object(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: DifferenceKind::Object,
            reason: reason.into(),
        }
    }

    /// Check if this is a physical difference.
    pub fn is_physical(&self) -> bool {
        self.kind == DifferenceKind::Physical
    }

    /// Check if this is an object difference.
    pub fn is_object(&self) -> bool {
        self.kind == DifferenceKind::Object
    }
}

impl fmt::Display for Difference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.name, self.kind, self.reason)
    }
}

/// Column-set change between a recorded scheme and a declared model.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemeDelta {
    /// Declared columns missing from the recorded scheme, in declaration order.
    pub added: Vec<String>,
    /// Recorded columns no longer declared, in recorded order.
    pub removed: Vec<String>,
}

impl SchemeDelta {
    /// Compute the delta from a recorded scheme to a declared model.
    pub fn between(stored: &Map<String, Value>, declared: &TableModel) -> Self {
        let added = declared
            .columns()
            .iter()
            .map(|c| c.name())
            .filter(|name| !stored.contains_key(*name))
            .map(str::to_string)
            .collect();

        let removed = stored
            .keys()
            .filter(|name| declared.get_column(name).is_none())
            .cloned()
            .collect();

        Self { added, removed }
    }

    /// Whether the column sets are equal.
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }

    /// Whether the change looks like a rename: the column count is unchanged
    /// but the names differ. Renames can't be told apart from a removal plus
    /// an addition, so they are refused.
    pub fn is_rename(&self) -> bool {
        !self.added.is_empty() && self.added.len() == self.removed.len()
    }
}
