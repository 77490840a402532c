//! Human-readable report formatting.

use is_terminal::IsTerminal;
use owo_colors::OwoColorize;
use procscope_core::{AnalyzeResult, Severity};
use std::fmt::Write;

/// Format the analysis result as human-readable text with optional colors.
pub fn format_table(result: &AnalyzeResult, quiet: bool) -> String {
    let colored = std::io::stdout().is_terminal();
    let mut out = String::new();

    write_header(&mut out, result, colored);
    write_tables(&mut out, result, colored);
    write_lineages(&mut out, result, colored);
    write_patterns(&mut out, result, colored);

    if !quiet {
        write_issues(&mut out, result);
    }

    out
}

fn write_header(out: &mut String, result: &AnalyzeResult, colored: bool) {
    let title = if result.analysis.procedure_name.is_empty() {
        "procscope analysis".to_string()
    } else {
        format!("procscope analysis: {}", result.analysis.procedure_name)
    };
    let line = "═".repeat(60);

    if colored {
        writeln!(out, "{}", title.bold()).unwrap();
        writeln!(out, "{}", line.dimmed()).unwrap();
    } else {
        writeln!(out, "{title}").unwrap();
        writeln!(out, "{line}").unwrap();
    }

    writeln!(
        out,
        "Statements: {} | Fragments: {} | Lineages: {}",
        result.summary.statement_count,
        result.summary.fragment_count,
        result.summary.lineage_count
    )
    .unwrap();
    writeln!(out).unwrap();
}

fn write_tables(out: &mut String, result: &AnalyzeResult, colored: bool) {
    write_section(out, "Source tables", colored);
    if result.analysis.source_tables.is_empty() {
        writeln!(out, "  (none)").unwrap();
    }
    for table in &result.analysis.source_tables {
        writeln!(out, "  {table}").unwrap();
    }
    writeln!(out).unwrap();

    write_section(out, "Target tables", colored);
    if result.analysis.target_tables.is_empty() {
        writeln!(out, "  (none)").unwrap();
    }
    for table in &result.analysis.target_tables {
        writeln!(out, "  {table}").unwrap();
    }
    writeln!(out).unwrap();
}

fn write_lineages(out: &mut String, result: &AnalyzeResult, colored: bool) {
    write_section(out, "Column lineages", colored);
    if result.analysis.column_lineages.is_empty() {
        writeln!(out, "  (none resolved)").unwrap();
    }
    for lineage in &result.analysis.column_lineages {
        writeln!(
            out,
            "  {}.{} -> {}.{}",
            lineage.source_table,
            lineage.source_column,
            lineage.target_table,
            lineage.target_column
        )
        .unwrap();
    }
    writeln!(out).unwrap();
}

fn write_patterns(out: &mut String, result: &AnalyzeResult, colored: bool) {
    if !result.analysis.merge_patterns.is_empty() {
        write_section(out, "MERGE statements", colored);
        for merge in &result.analysis.merge_patterns {
            writeln!(
                out,
                "  {} <- {} (on: {})",
                merge.target_table,
                merge.source_table,
                merge.join_columns.join(", ")
            )
            .unwrap();
        }
        writeln!(out).unwrap();
    }

    if !result.analysis.temp_table_patterns.is_empty() {
        write_section(out, "Temp tables", colored);
        for temp in &result.analysis.temp_table_patterns {
            let role = if temp.is_intermediate {
                "intermediate"
            } else {
                "write-only"
            };
            writeln!(
                out,
                "  {} [{}] via {} ({})",
                temp.name,
                temp.columns.join(", "),
                temp.source_pattern,
                role
            )
            .unwrap();
        }
        writeln!(out).unwrap();
    }
}

fn write_issues(out: &mut String, result: &AnalyzeResult) {
    if result.issues.is_empty() {
        return;
    }
    writeln!(out, "Diagnostics:").unwrap();
    for issue in &result.issues {
        let level = match issue.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Info => "info",
        };
        writeln!(out, "  {level}: [{}] {}", issue.code, issue.message).unwrap();
    }
}

fn write_section(out: &mut String, title: &str, colored: bool) {
    if colored {
        writeln!(out, "{}", format!("{title}:").bold()).unwrap();
    } else {
        writeln!(out, "{title}:").unwrap();
    }
}
