//! Outputs command implementation.

use std::path::Path;

use quarry_core::Symbol;

use crate::commands::read_plan;
use crate::error::Result;
use crate::OutputFormat;

/// Run the outputs command - prints the root's output symbols in order.
pub fn run(path: &Path, format: OutputFormat) -> Result<()> {
    let plan = read_plan(path)?;
    let symbols: Vec<Symbol> = plan.output_symbols();

    match format {
        OutputFormat::Text => {
            for (position, symbol) in symbols.iter().enumerate() {
                println!("{position}\t{symbol}");
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string(&symbols)?),
    }
    Ok(())
}
