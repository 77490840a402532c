//! Analysis request types.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A request to analyze one T-SQL script.
///
/// The script may be a bare batch, a `GO`-separated multi-batch file, or a
/// full `CREATE PROCEDURE … AS BEGIN … END` definition; the analyzer detects
/// the procedure wrapper and works on its body.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub struct AnalyzeRequest {
    /// The T-SQL text to analyze.
    pub sql: String,

    /// Optional schema metadata for permanent tables.
    ///
    /// Used to expand `SELECT *` and to infer target columns for INSERT
    /// statements without an explicit column list. Analysis degrades
    /// gracefully without it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<SchemaMetadata>,
}

/// Schema metadata: the permanent tables known to the caller.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub struct SchemaMetadata {
    pub tables: Vec<SchemaTable>,
}

/// One table definition: name plus ordered column list.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub struct SchemaTable {
    /// Possibly qualified table name (`dbo.customer`). Case-insensitive.
    pub name: String,

    /// Columns in declaration order.
    pub columns: Vec<ColumnSchema>,
}

/// One column definition.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub struct ColumnSchema {
    pub name: String,

    /// Declared type, kept verbatim for display; lineage ignores it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,
}
