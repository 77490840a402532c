//! Script preparation: procedure-body extraction, batch splitting, parsing.
//!
//! T-SQL scripts arrive in three shapes: a bare statement list, a
//! `GO`-separated multi-batch file, or a full `CREATE PROCEDURE … AS BEGIN …
//! END` definition. The analyzer works on plain statement batches, so this
//! module unwraps the procedure body (capturing the procedure name) and
//! splits on `GO` before handing each batch to the parser.
//!
//! Parse failures are per-batch: a failing batch is reported as an issue and
//! re-split on `;` so one unparseable statement does not sink the batch.

use crate::ident::canonical_table_name;
use crate::parser::parse_batch;
use crate::types::{issue_codes, Issue};
use regex::Regex;
use sqlparser::ast::Statement;
use std::sync::OnceLock;

/// A prepared script: procedure name (empty for bare scripts) plus batches.
pub(crate) struct ScriptInput {
    pub(crate) procedure_name: String,
    pub(crate) batches: Vec<String>,
}

/// Extracts the procedure body (if any) and splits the script into batches.
pub(crate) fn prepare_script(sql: &str) -> ScriptInput {
    let (procedure_name, body) = match extract_procedure_body(sql) {
        Some((name, body)) => (name, body),
        None => (String::new(), sql.to_string()),
    };

    ScriptInput {
        procedure_name,
        batches: split_batches(&body),
    }
}

/// Parses one batch, salvaging individual statements when the batch as a
/// whole does not parse.
pub(crate) fn collect_statements(batch: &str, issues: &mut Vec<Issue>) -> Vec<Statement> {
    match parse_batch(batch) {
        Ok(statements) => statements,
        Err(err) => {
            issues.push(Issue::error(issue_codes::PARSE_ERROR, err.to_string()));
            salvage_statements(batch)
        }
    }
}

/// Re-splits a failing batch on `;` and keeps whatever still parses.
fn salvage_statements(batch: &str) -> Vec<Statement> {
    let mut statements = Vec::new();
    for piece in batch.split(';') {
        if piece.trim().is_empty() {
            continue;
        }
        if let Ok(parsed) = parse_batch(piece) {
            statements.extend(parsed);
        }
    }
    tracing::debug!(salvaged = statements.len(), "recovered statements from failing batch");
    statements
}

/// Detects a `CREATE PROCEDURE <name> … AS BEGIN … END` wrapper and returns
/// the canonical procedure name and the body between the outermost
/// BEGIN/END pair.
fn extract_procedure_body(sql: &str) -> Option<(String, String)> {
    static HEADER: OnceLock<Regex> = OnceLock::new();
    let header = HEADER.get_or_init(|| {
        Regex::new(r"(?is)\bCREATE\s+(?:OR\s+ALTER\s+)?PROC(?:EDURE)?\s+([^\s(]+)[\s\S]*?\bAS\s+BEGIN\b")
            .expect("Invalid regex pattern")
    });

    let captures = header.captures(sql)?;
    let name = canonical_table_name(captures.get(1)?.as_str());
    let body_start = captures.get(0)?.end();

    let body_end = find_matching_end(sql, body_start).unwrap_or(sql.len());
    let body = sql[body_start..body_end].trim().to_string();
    if body.is_empty() {
        return None;
    }
    Some((name, body))
}

/// Scans forward from `start` counting block openers and `END` keywords to
/// find the `END` matching the procedure's outer `BEGIN`.
///
/// `BEGIN TRAN[SACTION]` does not open a block (it pairs with COMMIT), and
/// `CASE` opens one (it pairs with `END`), so both are special-cased or the
/// count drifts.
fn find_matching_end(sql: &str, start: usize) -> Option<usize> {
    static TOKENS: OnceLock<Regex> = OnceLock::new();
    let tokens = TOKENS.get_or_init(|| {
        Regex::new(r"(?i)\b(BEGIN|CASE|END)\b(?:\s+(TRAN|TRANSACTION))?")
            .expect("Invalid regex pattern")
    });

    let mut depth: usize = 1;
    for capture in tokens.captures_iter(&sql[start..]) {
        let word = capture.get(1).map(|m| m.as_str().to_uppercase())?;
        let is_tran = capture.get(2).is_some();
        match word.as_str() {
            "BEGIN" if !is_tran => depth += 1,
            "CASE" => depth += 1,
            "END" => {
                depth -= 1;
                if depth == 0 {
                    return Some(start + capture.get(1)?.start());
                }
            }
            _ => {}
        }
    }
    None
}

/// Splits a script into batches on `GO` separator lines.
fn split_batches(sql: &str) -> Vec<String> {
    static GO_LINE: OnceLock<Regex> = OnceLock::new();
    let go_line = GO_LINE.get_or_init(|| {
        Regex::new(r"(?im)^\s*GO(?:\s+\d+)?\s*$").expect("Invalid regex pattern")
    });

    go_line
        .split(sql)
        .map(|batch| batch.trim())
        .filter(|batch| !batch.is_empty())
        .map(|batch| batch.to_string())
        .collect()
}
