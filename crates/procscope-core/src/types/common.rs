//! Common types shared between request and response.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// An issue encountered during analysis (error, warning, or info).
///
/// Issues are the non-fatal side of the error model: SQL-level problems
/// (unresolved aliases, ambiguous wildcard expansions, unparseable batches)
/// are collected here while analysis continues with what it can prove.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub struct Issue {
    /// Severity level
    pub severity: Severity,

    /// Machine-readable issue code
    pub code: String,

    /// Human-readable message
    pub message: String,

    /// Optional: which statement index this issue relates to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub statement_index: Option<usize>,
}

impl Issue {
    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            code: code.into(),
            message: message.into(),
            statement_index: None,
        }
    }

    pub fn warning(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            code: code.into(),
            message: message.into(),
            statement_index: None,
        }
    }

    pub fn info(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Info,
            code: code.into(),
            message: message.into(),
            statement_index: None,
        }
    }

    pub fn with_statement(mut self, index: usize) -> Self {
        self.statement_index = Some(index);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

/// Summary statistics for an analysis run.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub struct Summary {
    /// Total number of statements analyzed
    pub statement_count: usize,

    /// Lineage fragments recorded before resolution
    pub fragment_count: usize,

    /// Resolved permanent-to-permanent lineages
    pub lineage_count: usize,

    /// Issue counts by severity
    pub issue_count: IssueCount,

    /// Quick check: true if any errors were encountered
    pub has_errors: bool,
}

/// Counts of issues by severity level.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub struct IssueCount {
    pub errors: usize,
    pub warnings: usize,
    pub infos: usize,
}

/// Machine-readable issue codes.
pub mod issue_codes {
    pub const PARSE_ERROR: &str = "PARSE_ERROR";
    pub const INVALID_REQUEST: &str = "INVALID_REQUEST";
    pub const UNSUPPORTED_SYNTAX: &str = "UNSUPPORTED_SYNTAX";
    pub const UNKNOWN_SCHEMA: &str = "UNKNOWN_SCHEMA";
    pub const AMBIGUOUS_EXPANSION: &str = "AMBIGUOUS_EXPANSION";
    pub const UNRESOLVED_REFERENCE: &str = "UNRESOLVED_REFERENCE";
    pub const COLUMN_COUNT_MISMATCH: &str = "COLUMN_COUNT_MISMATCH";
    pub const APPROXIMATE_LINEAGE: &str = "APPROXIMATE_LINEAGE";
}
