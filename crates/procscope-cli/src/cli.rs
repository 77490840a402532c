//! CLI argument parsing using clap.

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// procscope - T-SQL column-level lineage analyzer
#[derive(Parser, Debug)]
#[command(name = "procscope")]
#[command(about = "Analyze a T-SQL script for column-level data lineage", long_about = None)]
#[command(version)]
pub struct Args {
    /// SQL file to analyze (reads from stdin if omitted)
    #[arg(value_name = "FILE")]
    pub file: Option<PathBuf>,

    /// Schema file: JSON object mapping table names to {column: type}
    #[arg(short, long, value_name = "FILE")]
    pub schema: Option<PathBuf>,

    /// Output file (defaults to stdout)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, default_value = "table", value_enum)]
    pub format: OutputFormat,

    /// Compact JSON output (no pretty-printing)
    #[arg(short, long)]
    pub compact: bool,

    /// Suppress diagnostics on stderr
    #[arg(short, long)]
    pub quiet: bool,
}

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable report
    Table,
    /// JSON report
    Json,
}
