//! Read-only registry of permanent-table schemas.
//!
//! Built once from the request's [`SchemaMetadata`] and never mutated
//! afterwards. Lookups are case-insensitive; names are canonicalized at the
//! boundary. The analyzer tolerates an empty registry: only `SELECT *`
//! expansion and column-less INSERT inference degrade.

use crate::ident::canonical_table_name;
use crate::types::SchemaMetadata;
use std::collections::HashMap;

#[derive(Debug, Default)]
pub(crate) struct SchemaRegistry {
    tables: HashMap<String, Vec<String>>,
}

impl SchemaRegistry {
    pub(crate) fn new(schema: Option<&SchemaMetadata>) -> Self {
        let mut tables = HashMap::new();
        if let Some(schema) = schema {
            for table in &schema.tables {
                let canonical = canonical_table_name(&table.name);
                let columns = table
                    .columns
                    .iter()
                    .map(|c| c.name.to_lowercase())
                    .collect();
                tables.insert(canonical, columns);
            }
        }
        Self { tables }
    }

    pub(crate) fn table_exists(&self, name: &str) -> bool {
        self.tables.contains_key(&canonical_table_name(name))
    }

    /// Ordered column names of a table; `None` when the table is unknown.
    pub(crate) fn columns_of(&self, name: &str) -> Option<&[String]> {
        self.tables
            .get(&canonical_table_name(name))
            .map(|c| c.as_slice())
    }
}
