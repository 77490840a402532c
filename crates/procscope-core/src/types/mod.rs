//! Request and response types for the analyzer.

mod common;
mod request;
mod response;

pub use common::{issue_codes, Issue, IssueCount, Severity, Summary};
pub use request::{AnalyzeRequest, ColumnSchema, SchemaMetadata, SchemaTable};
pub use response::{
    AnalyzeResult, ColumnLineage, MergePattern, ProcedureAnalysis, TempTablePattern,
};
