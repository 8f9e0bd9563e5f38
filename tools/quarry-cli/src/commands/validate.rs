//! Validate command implementation.

use std::path::Path;

use quarry_plan::plan::logical::PlanValidator;

use crate::commands::read_plan;
use crate::error::Result;
use crate::OutputFormat;

/// Run the validate command.
///
/// An invalid plan is reported as an error, so the process exits non-zero.
pub fn run(path: &Path, validator: &PlanValidator, format: OutputFormat) -> Result<()> {
    let plan = read_plan(path)?;
    validator.validate(&plan)?;

    match format {
        OutputFormat::Text => println!("plan is valid ({} nodes)", plan.node_count()),
        OutputFormat::Json => {
            let value = serde_json::json!({ "valid": true, "nodes": plan.node_count() });
            println!("{}", serde_json::to_string(&value)?);
        }
    }
    Ok(())
}
