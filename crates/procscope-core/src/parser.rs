//! Thin wrapper over the SQL parser.
//!
//! The analyzer consumes the typed AST; everything dialect-specific
//! (temp-table `#` identifiers, bracketed names, T-SQL MERGE syntax) is the
//! parser's concern.

use crate::error::ParseError;
use sqlparser::ast::Statement;
use sqlparser::dialect::MsSqlDialect;
use sqlparser::parser::Parser;

/// Parse a T-SQL batch into statements.
pub fn parse_batch(sql: &str) -> Result<Vec<Statement>, ParseError> {
    Parser::parse_sql(&MsSqlDialect {}, sql).map_err(ParseError::from)
}
