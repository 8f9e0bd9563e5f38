//! Unique identifiers for plan nodes.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a node within a plan tree.
///
/// Ids are unique within one tree. A rewrite that substitutes a node keeps
/// the id of the node it replaces, so the same id may appear in several
/// trees that share history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlanNodeId(u64);

impl PlanNodeId {
    /// Create a new `PlanNodeId` from a raw u64 value.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw u64 value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl From<u64> for PlanNodeId {
    fn from(id: u64) -> Self {
        Self::new(id)
    }
}

impl fmt::Display for PlanNodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
