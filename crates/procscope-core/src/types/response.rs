//! Analysis result types.
//!
//! The field and key names of [`ProcedureAnalysis`] are an external contract:
//! `procedure_name`, `source_tables`, `target_tables`, `column_lineages`,
//! `merge_patterns`, `temp_table_patterns`. Consumers downstream key on them
//! verbatim, so renames here are breaking changes.

use super::common::{Issue, Summary};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Complete result of analyzing one script.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub struct AnalyzeResult {
    /// The lineage report.
    pub analysis: ProcedureAnalysis,

    /// Non-fatal diagnostics collected during analysis.
    pub issues: Vec<Issue>,

    /// Aggregate statistics.
    pub summary: Summary,
}

/// The column-level lineage report for one procedure or script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub struct ProcedureAnalysis {
    /// Name of the outermost procedure declaration, empty for bare scripts.
    pub procedure_name: String,

    /// Permanent tables that feed at least one resolved lineage, sorted.
    pub source_tables: Vec<String>,

    /// Permanent tables targeted by at least one DML statement, sorted.
    pub target_tables: Vec<String>,

    /// Resolved permanent-to-permanent column lineages, sorted by
    /// `(target_table, target_column, source_table, source_column)`.
    pub column_lineages: Vec<ColumnLineage>,

    /// One descriptor per MERGE statement encountered, in statement order.
    pub merge_patterns: Vec<MergePattern>,

    /// One descriptor per temp table, in order of first definition.
    pub temp_table_patterns: Vec<TempTablePattern>,
}

/// One resolved source→target column edge.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub struct ColumnLineage {
    pub source_table: String,
    pub source_column: String,
    pub target_table: String,
    pub target_column: String,
}

/// Descriptor of one MERGE statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub struct MergePattern {
    /// The USING source: a table/CTE name, or the alias of a derived source.
    pub source_table: String,
    pub target_table: String,
    /// Column names equated in the ON predicate.
    pub join_columns: Vec<String>,
    /// Columns assigned by WHEN MATCHED UPDATE actions.
    pub update_columns: Vec<String>,
    /// Columns listed by WHEN NOT MATCHED INSERT actions.
    pub insert_columns: Vec<String>,
}

/// Descriptor of one temp table observed in the script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub struct TempTablePattern {
    /// Canonical name, `#`-prefixed.
    pub name: String,
    /// The statement kind that introduced the table (`CREATE TABLE`,
    /// `SELECT INTO`).
    pub source_pattern: String,
    /// Column names in declaration order (empty when unknown).
    pub columns: Vec<String>,
    /// True when the table is both written and subsequently read.
    pub is_intermediate: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_json_keys_are_stable() {
        let analysis = ProcedureAnalysis {
            procedure_name: "dbo.usp_load".to_string(),
            source_tables: vec!["dbo.customer".to_string()],
            target_tables: vec!["dbo.report".to_string()],
            column_lineages: vec![ColumnLineage {
                source_table: "dbo.customer".to_string(),
                source_column: "cid".to_string(),
                target_table: "dbo.report".to_string(),
                target_column: "rid".to_string(),
            }],
            merge_patterns: Vec::new(),
            temp_table_patterns: Vec::new(),
        };

        let json = serde_json::to_value(&analysis).unwrap();
        for key in [
            "procedure_name",
            "source_tables",
            "target_tables",
            "column_lineages",
            "merge_patterns",
            "temp_table_patterns",
        ] {
            assert!(json.get(key).is_some(), "missing contract key {key}");
        }
        assert_eq!(json["column_lineages"][0]["source_column"], "cid");
    }
}
