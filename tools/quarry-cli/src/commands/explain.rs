//! Explain command implementation.

use std::path::Path;
use std::sync::Arc;

use quarry_plan::plan::logical::PlanValidator;
use quarry_plan::Optimizer;

use crate::commands::read_plan;
use crate::error::Result;
use crate::OutputFormat;

/// Run the explain command - prints the plan tree, optimized unless no
/// optimizer is given.
pub fn run(
    path: &Path,
    validator: &PlanValidator,
    optimizer: Option<&Optimizer>,
    format: OutputFormat,
) -> Result<()> {
    let plan = read_plan(path)?;
    validator.validate(&plan)?;

    let plan = match optimizer {
        Some(optimizer) => optimizer.optimize(Arc::new(plan))?,
        None => Arc::new(plan),
    };

    match format {
        OutputFormat::Text => print!("{}", plan.display_tree()),
        OutputFormat::Json => {
            let value = serde_json::json!({
                "plan": plan.to_string(),
                "nodes": plan.node_count(),
            });
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
    }
    Ok(())
}
