//! Lexically nested symbol environments for table resolution.
//!
//! Three environments with different lifetimes:
//!
//! - alias scopes: one per SELECT/statement, pushed on entry and popped on
//!   exit, mapping aliases to resolved table names;
//! - CTE scopes: one per `WITH` block, mapping CTE names to their ordered
//!   output columns;
//! - the temp-table map, which is deliberately flat: temp tables in T-SQL
//!   outlive the batch until dropped, so `#t` defined in statement 1 resolves
//!   in statement 7.
//!
//! Lookups walk from the innermost scope outward. Every `push_*` is paired
//! with a `pop_*` inside the processor that pushed it; popping an empty stack
//! is an internal invariant violation and panics.

use crate::ident::{is_temp_table_name, TableKind};
use std::collections::HashMap;

/// One alias environment: `alias → table`, plus the distinct tables of the
/// FROM clause in registration order (wildcard expansion needs that order).
#[derive(Debug, Default)]
struct AliasScope {
    aliases: HashMap<String, String>,
    tables: Vec<String>,
}

/// One CTE environment: `name → ordered column list`.
#[derive(Debug, Default)]
struct CteScope {
    bindings: HashMap<String, Vec<String>>,
}

/// The full scope stack owned by one analyzer instance.
#[derive(Debug, Default)]
pub(crate) struct ScopeStack {
    alias_scopes: Vec<AliasScope>,
    cte_scopes: Vec<CteScope>,
    temp_tables: HashMap<String, Vec<String>>,
}

impl ScopeStack {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    // --- alias scopes ---

    pub(crate) fn push_alias_scope(&mut self) {
        self.alias_scopes.push(AliasScope::default());
    }

    pub(crate) fn pop_alias_scope(&mut self) {
        self.alias_scopes
            .pop()
            .expect("pop_alias_scope on empty stack");
    }

    /// Binds `alias → table` in the current scope and records the table for
    /// wildcard expansion order.
    pub(crate) fn bind_alias(&mut self, alias: &str, table: &str) {
        let scope = self
            .alias_scopes
            .last_mut()
            .expect("bind_alias without an alias scope");
        scope
            .aliases
            .insert(alias.to_lowercase(), table.to_lowercase());
        let table = table.to_lowercase();
        if !scope.tables.contains(&table) {
            scope.tables.push(table);
        }
    }

    /// Resolves an alias innermost-first.
    pub(crate) fn resolve_alias(&self, alias: &str) -> Option<String> {
        let alias = alias.to_lowercase();
        self.alias_scopes
            .iter()
            .rev()
            .find_map(|scope| scope.aliases.get(&alias).cloned())
    }

    /// Distinct tables of the innermost alias scope, FROM order.
    pub(crate) fn tables_in_scope(&self) -> Vec<String> {
        self.alias_scopes
            .last()
            .map(|scope| scope.tables.clone())
            .unwrap_or_default()
    }

    // --- CTE scopes ---

    pub(crate) fn push_cte_scope(&mut self) {
        self.cte_scopes.push(CteScope::default());
    }

    pub(crate) fn pop_cte_scope(&mut self) {
        self.cte_scopes.pop().expect("pop_cte_scope on empty stack");
    }

    /// Binds a CTE (or derived-table alias) to its output columns in the
    /// current CTE scope. Rebinding updates the columns in place, which is
    /// how inferred columns replace the empty pre-registration binding.
    pub(crate) fn bind_cte(&mut self, name: &str, columns: Vec<String>) {
        let name = name.to_lowercase();
        let scope = self
            .cte_scopes
            .last_mut()
            .expect("bind_cte without a CTE scope");
        scope.bindings.insert(name, columns);
    }

    /// True when the name is bound in any active CTE scope.
    pub(crate) fn is_cte(&self, name: &str) -> bool {
        let name = name.to_lowercase();
        self.cte_scopes
            .iter()
            .rev()
            .any(|scope| scope.bindings.contains_key(&name))
    }

    /// Columns of a CTE, innermost binding first.
    pub(crate) fn cte_columns(&self, name: &str) -> Option<&[String]> {
        let name = name.to_lowercase();
        self.cte_scopes
            .iter()
            .rev()
            .find_map(|scope| scope.bindings.get(&name).map(|c| c.as_slice()))
    }

    // --- temp tables (flat, batch lifetime) ---

    pub(crate) fn define_temp(&mut self, name: &str, columns: Vec<String>) {
        self.temp_tables.insert(name.to_lowercase(), columns);
    }

    pub(crate) fn temp_columns(&self, name: &str) -> Option<&[String]> {
        self.temp_tables
            .get(&name.to_lowercase())
            .map(|c| c.as_slice())
    }

    // --- classification ---

    /// Classifies a resolved table name against the current environment.
    pub(crate) fn classify(&self, table: &str) -> TableKind {
        if is_temp_table_name(table) {
            TableKind::Temp
        } else if self.is_cte(table) {
            TableKind::Cte
        } else {
            TableKind::Permanent
        }
    }
}
