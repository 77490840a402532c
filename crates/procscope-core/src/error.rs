//! Error types for SQL parsing.
//!
//! # Error Handling Strategy
//!
//! Two complementary patterns:
//!
//! - [`ParseError`]: a batch could not be parsed at all. Reported as an
//!   error-severity issue for that batch; remaining batches still analyze.
//!
//! - [`crate::types::Issue`]: non-fatal diagnostics collected during analysis
//!   (unresolved references, ambiguous expansions, column-count mismatches).
//!   The report always contains whatever the analyzer could resolve.
//!
//! SQL-level problems never raise; only internal invariant violations panic.

use std::fmt;

/// Error encountered while parsing a T-SQL batch.
#[derive(Debug, Clone)]
pub struct ParseError {
    /// Human-readable error message.
    pub message: String,
    /// Position where the error occurred, if available.
    pub position: Option<Position>,
}

/// Position information for a parse error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    /// Line number (1-indexed).
    pub line: usize,
    /// Column number (1-indexed).
    pub column: usize,
}

impl ParseError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            position: None,
        }
    }
}

/// Pulls `Line: <n>, Column: <n>` coordinates out of a parser message.
///
/// sqlparser appends the error position to its messages in that form.
/// A token scan over the two markers is enough; any message that does not
/// follow the shape yields no position rather than a wrong one.
fn scrape_position(message: &str) -> Option<Position> {
    let after_line = message.split_once("Line:")?.1;
    let (line_text, after_comma) = after_line.split_once(',')?;
    let column_text = after_comma.split_once("Column:")?.1;

    Some(Position {
        line: leading_number(line_text)?,
        column: leading_number(column_text)?,
    })
}

/// Parses the digits at the start of `text`, ignoring leading whitespace.
fn leading_number(text: &str) -> Option<usize> {
    let trimmed = text.trim_start();
    let digit_end = trimmed
        .find(|ch: char| !ch.is_ascii_digit())
        .unwrap_or(trimmed.len());
    trimmed[..digit_end].parse().ok()
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Parse error")?;
        if let Some(pos) = self.position {
            write!(f, " at line {}, column {}", pos.line, pos.column)?;
        }
        write!(f, ": {}", self.message)
    }
}

impl std::error::Error for ParseError {}

impl From<sqlparser::parser::ParserError> for ParseError {
    fn from(err: sqlparser::parser::ParserError) -> Self {
        let message = err.to_string();
        let position = scrape_position(&message);
        Self { message, position }
    }
}
