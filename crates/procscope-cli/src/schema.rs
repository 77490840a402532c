//! Schema loading from JSON files.
//!
//! The file format is a JSON object mapping table names to an object of
//! `column: type` pairs:
//!
//! ```json
//! {
//!   "dbo.Customer": { "CId": "int", "CName": "nvarchar(50)" },
//!   "dbo.Report":   { "RId": "int", "RName": "nvarchar(50)" }
//! }
//! ```
//!
//! Key order of the inner objects is the column order, which matters for
//! `SELECT *` expansion and positional INSERT inference. Type strings are
//! opaque and carried through for display only.

use anyhow::{bail, Context, Result};
use procscope_core::{ColumnSchema, SchemaMetadata, SchemaTable};
use serde_json::Value;
use std::path::Path;

/// Load schema metadata from a JSON file.
pub fn load_schema(path: &Path) -> Result<SchemaMetadata> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read schema file: {}", path.display()))?;

    parse_schema_json(&content)
        .with_context(|| format!("Failed to parse schema file: {}", path.display()))
}

/// Parse schema JSON content into [`SchemaMetadata`].
pub fn parse_schema_json(content: &str) -> Result<SchemaMetadata> {
    let value: Value = serde_json::from_str(content).context("Schema file is not valid JSON")?;

    let Value::Object(tables) = value else {
        bail!("Schema file must be a JSON object of {{table: {{column: type}}}}");
    };

    let mut metadata = SchemaMetadata { tables: Vec::new() };
    for (table_name, columns_value) in tables {
        let Value::Object(columns) = columns_value else {
            bail!("Table '{table_name}' must map to an object of {{column: type}}");
        };

        let columns = columns
            .into_iter()
            .map(|(name, type_value)| ColumnSchema {
                name,
                data_type: match type_value {
                    Value::String(s) => Some(s),
                    Value::Null => None,
                    other => Some(other.to_string()),
                },
            })
            .collect();

        metadata.tables.push(SchemaTable {
            name: table_name,
            columns,
        });
    }

    Ok(metadata)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_schema() {
        let json = r#"{
            "dbo.Customer": { "CId": "int", "CName": "nvarchar(50)" },
            "dbo.Report": { "RId": "int" }
        }"#;

        let schema = parse_schema_json(json).unwrap();
        assert_eq!(schema.tables.len(), 2);

        let customer = schema
            .tables
            .iter()
            .find(|t| t.name == "dbo.Customer")
            .unwrap();
        assert_eq!(customer.columns.len(), 2);
        assert_eq!(customer.columns[0].name, "CId");
        assert_eq!(customer.columns[0].data_type.as_deref(), Some("int"));
    }

    #[test]
    fn test_column_order_is_preserved() {
        let json = r#"{ "dbo.T": { "z": "int", "a": "int", "m": "int" } }"#;
        let schema = parse_schema_json(json).unwrap();

        let names: Vec<&str> = schema.tables[0]
            .columns
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(names, ["z", "a", "m"], "JSON key order is column order");
    }

    #[test]
    fn test_null_type_is_tolerated() {
        let json = r#"{ "dbo.T": { "a": null } }"#;
        let schema = parse_schema_json(json).unwrap();
        assert_eq!(schema.tables[0].columns[0].data_type, None);
    }

    #[test]
    fn test_non_object_root_is_rejected() {
        assert!(parse_schema_json("[1, 2, 3]").is_err());
        assert!(parse_schema_json("not json at all").is_err());
    }

    #[test]
    fn test_non_object_table_is_rejected() {
        assert!(parse_schema_json(r#"{ "dbo.T": ["a", "b"] }"#).is_err());
    }
}
