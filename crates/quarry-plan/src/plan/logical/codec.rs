//! JSON encoding of plans.
//!
//! Nodes are tagged with `"@type"` and use camelCase field names. Decoding
//! re-runs every construction check, so a plan read from JSON satisfies the
//! same invariants as one built in memory. Shared subtrees are written once
//! per use and come back unshared.

use super::node::PlanNode;
use super::validate::PlanResult;

/// Encodes a plan as compact JSON.
///
/// # Errors
///
/// Returns [`PlanError::Codec`](super::PlanError::Codec) if encoding fails.
pub fn to_json(plan: &PlanNode) -> PlanResult<String> {
    Ok(serde_json::to_string(plan)?)
}

/// Encodes a plan as indented JSON.
///
/// # Errors
///
/// Returns [`PlanError::Codec`](super::PlanError::Codec) if encoding fails.
pub fn to_json_pretty(plan: &PlanNode) -> PlanResult<String> {
    Ok(serde_json::to_string_pretty(plan)?)
}

/// Decodes a plan from JSON.
///
/// # Errors
///
/// Returns [`PlanError::Codec`](super::PlanError::Codec) if the input is not
/// a well-formed plan, including when a node violates a construction
/// invariant.
pub fn from_json(json: &str) -> PlanResult<PlanNode> {
    Ok(serde_json::from_str(json)?)
}
