//! Command implementations.

pub mod explain;
pub mod optimize;
pub mod outputs;
pub mod validate;

use std::io::Read;
use std::path::Path;

use quarry_plan::plan::logical::codec::from_json;
use quarry_plan::PlanNode;
use tracing::debug;

use crate::error::{CliError, Result};

/// Reads a JSON plan from `path`, or from standard input when `path` is `-`.
pub fn read_plan(path: &Path) -> Result<PlanNode> {
    let json = if path == Path::new("-") {
        let mut json = String::new();
        std::io::stdin().read_to_string(&mut json)?;
        json
    } else {
        if !path.exists() {
            return Err(CliError::FileNotFound(path.to_path_buf()));
        }
        std::fs::read_to_string(path)?
    };

    let plan = from_json(&json)?;
    debug!(path = %path.display(), nodes = plan.node_count(), "plan loaded");
    Ok(plan)
}
