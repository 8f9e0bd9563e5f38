//! Quarry Command Line Interface
//!
//! A CLI tool for inspecting, validating and optimizing serialized Quarry
//! plans.

mod commands;
mod error;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use quarry_plan::plan::logical::{PlanValidator, SymbolTypes, DEFAULT_MAX_DEPTH};
use quarry_plan::Optimizer;

use crate::commands::{explain, optimize, outputs, validate};
use crate::error::{CliError, Result};

/// Quarry Command Line Interface
///
/// Reads a logical plan encoded as JSON. Use `-` as the file to read from
/// standard input.
#[derive(Parser, Debug)]
#[command(name = "quarry")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format
    #[arg(short, long, value_enum, default_value = "text", global = true)]
    pub format: OutputFormat,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, env = "QUARRY_LOG", default_value = "warn", global = true)]
    pub log: String,

    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Output format for command results
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text
    Text,
    /// JSON
    Json,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the plan tree
    Explain {
        /// Path to the plan file
        file: PathBuf,

        /// Print the plan as read, without optimizing it
        #[arg(long)]
        no_optimize: bool,

        #[command(flatten)]
        validation: ValidationArgs,
    },

    /// Validate the plan
    Validate {
        /// Path to the plan file
        file: PathBuf,

        #[command(flatten)]
        validation: ValidationArgs,
    },

    /// Print the output symbols of the plan root
    Outputs {
        /// Path to the plan file
        file: PathBuf,
    },

    /// Optimize the plan and write it back out as JSON
    Optimize {
        /// Path to the plan file
        file: PathBuf,

        /// Maximum optimizer iterations
        #[arg(long, default_value_t = 10)]
        max_iterations: usize,

        #[command(flatten)]
        validation: ValidationArgs,
    },
}

/// Validation options shared by several commands.
#[derive(Args, Debug, Clone)]
pub struct ValidationArgs {
    /// Maximum plan depth
    #[arg(long, default_value_t = DEFAULT_MAX_DEPTH)]
    pub max_depth: usize,

    /// Skip the copartitioning check
    #[arg(long)]
    pub skip_copartitioning: bool,

    /// Skip the symbol dependency check
    #[arg(long)]
    pub skip_dependencies: bool,

    /// JSON object mapping symbol names to type names, used to type-check
    /// copartitioned columns
    #[arg(long, value_name = "FILE")]
    pub types: Option<PathBuf>,
}

impl ValidationArgs {
    /// Builds the validator these options describe, reading the types
    /// file if one is given.
    pub fn validator(&self) -> Result<PlanValidator> {
        let mut validator = PlanValidator::new().with_max_depth(self.max_depth);
        if let Some(path) = &self.types {
            if !path.exists() {
                return Err(CliError::FileNotFound(path.clone()));
            }
            let types: SymbolTypes = serde_json::from_str(&std::fs::read_to_string(path)?)?;
            validator = validator.with_types(Arc::new(types));
        }
        if self.skip_copartitioning {
            validator = validator.without_copartitioning_check();
        }
        if self.skip_dependencies {
            validator = validator.without_dependency_check();
        }
        Ok(validator)
    }
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    match cli.command {
        Commands::Explain { file, no_optimize, validation } => {
            let optimizer = (!no_optimize).then(Optimizer::new);
            explain::run(&file, &validation.validator()?, optimizer.as_ref(), cli.format)
        }
        Commands::Validate { file, validation } => {
            validate::run(&file, &validation.validator()?, cli.format)
        }
        Commands::Outputs { file } => outputs::run(&file, cli.format),
        Commands::Optimize { file, max_iterations, validation } => {
            let optimizer = Optimizer::new().with_max_iterations(max_iterations);
            optimize::run(&file, &validation.validator()?, &optimizer)
        }
    }
}
