//! procscope-core: column-level data-lineage engine for T-SQL scripts.
//!
//! Feed [`analyze`] a script (a bare batch, a `GO`-separated file, or a full
//! `CREATE PROCEDURE` definition) plus optional schema metadata, get back a
//! [`ProcedureAnalysis`]: which permanent source columns flow into which
//! permanent target columns, the input/output table sets, MERGE descriptors
//! and temp-table descriptors. Temp tables and CTEs are intermediate nodes
//! that are eliminated by transitive resolution; only permanent-to-permanent
//! edges appear in the final report.

pub mod analyzer;
pub mod error;
pub mod graph;
pub mod ident;
pub mod parser;
pub mod types;

pub use analyzer::analyze;
pub use error::ParseError;
pub use graph::LineageGraph;
pub use ident::{ColumnRef, LineageFragment, TableKind};

pub use types::{
    issue_codes, AnalyzeRequest, AnalyzeResult, ColumnLineage, ColumnSchema, Issue, IssueCount,
    MergePattern, ProcedureAnalysis, SchemaMetadata, SchemaTable, Severity, Summary,
    TempTablePattern,
};
