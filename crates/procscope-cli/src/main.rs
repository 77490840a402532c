//! procscope CLI - T-SQL column-level lineage analyzer

use anyhow::{Context, Result};
use clap::Parser;
use procscope_cli::cli::{Args, OutputFormat};
use procscope_cli::{input, output, schema};
use procscope_core::{analyze, AnalyzeRequest, Severity};
use std::fs;
use std::io::{self, Write};
use std::process::ExitCode;

fn main() -> ExitCode {
    init_tracing();

    match run() {
        Ok(has_errors) => {
            if has_errors {
                ExitCode::from(1)
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(e) => {
            eprintln!("procscope: error: {e:#}");
            ExitCode::from(66)
        }
    }
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();
}

fn run() -> Result<bool> {
    let args = Args::parse();

    let sql = input::read_input(args.file.as_ref())?;

    let schema_metadata = args
        .schema
        .as_deref()
        .map(schema::load_schema)
        .transpose()
        .context("Failed to load schema")?;

    let request = AnalyzeRequest {
        sql,
        schema: schema_metadata,
    };
    let result = analyze(&request);

    let rendered = match args.format {
        OutputFormat::Json => output::format_json(&result.analysis, args.compact)?,
        OutputFormat::Table => output::format_table(&result, args.quiet),
    };
    write_output(args.output.as_ref(), &rendered)?;

    if !args.quiet && args.format == OutputFormat::Json {
        print_issues_to_stderr(&result);
    }

    Ok(result.summary.has_errors)
}

fn write_output(path: Option<&std::path::PathBuf>, content: &str) -> Result<()> {
    if let Some(path) = path {
        fs::write(path, content)
            .with_context(|| format!("Failed to write to {}", path.display()))?;
    } else {
        io::stdout()
            .write_all(content.as_bytes())
            .context("Failed to write to stdout")?;
        if !content.ends_with('\n') {
            println!();
        }
    }
    Ok(())
}

fn print_issues_to_stderr(result: &procscope_core::AnalyzeResult) {
    for issue in &result.issues {
        let level = match issue.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Info => "info",
        };

        let location = issue
            .statement_index
            .map(|i| format!(" (statement {i})"))
            .unwrap_or_default();

        eprintln!("procscope: {level}:{location} {}", issue.message);
    }
}
