//! FROM-clause resolution: populating the alias scope.
//!
//! Walks `FROM` trees and registers every `(alias_or_name, table)` pair into
//! the current alias scope. Named references bind under their explicit alias
//! when present, and always under both the full canonical name and its last
//! segment so `dbo.Customer.cid`, `Customer.cid` and `c.cid` all resolve.
//! Derived tables are processed as a SELECT into a synthetic intermediate
//! named after their alias; unknown factor kinds are skipped without error.

use super::query::TargetSpec;
use super::Analyzer;
use crate::ident::{canonical_table_name, is_temp_table_name, simple_name};
use sqlparser::ast::{TableFactor, TableWithJoins};

impl<'a> Analyzer<'a> {
    /// Registers every table of a FROM clause into the current alias scope.
    pub(super) fn resolve_from(&mut self, from: &[TableWithJoins]) {
        for table_with_joins in from {
            self.resolve_table_with_joins(table_with_joins);
        }
    }

    pub(super) fn resolve_table_with_joins(&mut self, table_with_joins: &TableWithJoins) {
        self.resolve_table_factor(&table_with_joins.relation);
        for join in &table_with_joins.joins {
            self.resolve_table_factor(&join.relation);
        }
    }

    pub(super) fn resolve_table_factor(&mut self, factor: &TableFactor) {
        match factor {
            TableFactor::Table { name, alias, .. } => {
                self.register_named_table(&name.to_string(), alias.as_ref());
            }
            TableFactor::Derived {
                subquery, alias, ..
            } => {
                match alias {
                    Some(a) => {
                        let alias_name = a.name.value.to_lowercase();
                        // Bind before processing the body so fragments into
                        // the synthetic name classify as intermediate.
                        self.scopes.bind_cte(&alias_name, Vec::new());
                        let spec = TargetSpec {
                            table: alias_name.clone(),
                            columns: None,
                        };
                        let columns = self.process_query(subquery, Some(&spec));
                        self.scopes.bind_cte(&alias_name, columns);
                        self.scopes.bind_alias(&alias_name, &alias_name);
                    }
                    None => {
                        // No alias means the derived columns are unreachable
                        // from the outer query; still traverse for its reads.
                        self.process_query(subquery, None);
                    }
                }
            }
            TableFactor::NestedJoin {
                table_with_joins, ..
            } => {
                self.resolve_table_with_joins(table_with_joins);
            }
            _ => {}
        }
    }

    /// Registers a named table (or CTE/temp reference) into the current
    /// alias scope and returns its canonical name.
    pub(super) fn register_named_table(
        &mut self,
        raw_name: &str,
        alias: Option<&sqlparser::ast::TableAlias>,
    ) -> String {
        let canonical = canonical_table_name(raw_name);

        if is_temp_table_name(&canonical) {
            self.mark_temp_read(&canonical);
        }

        if let Some(a) = alias {
            self.scopes.bind_alias(&a.name.value, &canonical);
        }
        self.scopes.bind_alias(&canonical, &canonical);
        let short = simple_name(&canonical).to_string();
        if short != canonical {
            self.scopes.bind_alias(&short, &canonical);
        }

        canonical
    }
}
