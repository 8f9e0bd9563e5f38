//! Optimize command implementation.

use std::path::Path;
use std::sync::Arc;

use quarry_plan::plan::logical::codec::to_json_pretty;
use quarry_plan::plan::logical::PlanValidator;
use quarry_plan::Optimizer;
use tracing::info;

use crate::commands::read_plan;
use crate::error::Result;

/// Run the optimize command - validates, optimizes and prints the plan as
/// JSON.
pub fn run(path: &Path, validator: &PlanValidator, optimizer: &Optimizer) -> Result<()> {
    let plan = read_plan(path)?;
    validator.validate(&plan)?;

    let before = plan.node_count();
    let optimized = optimizer.optimize(Arc::new(plan))?;
    validator.validate(&optimized)?;
    info!(before, after = optimized.node_count(), "plan optimized");

    println!("{}", to_json_pretty(&optimized)?);
    Ok(())
}
