//! The lineage engine.
//!
//! The analyzer walks the parsed statement list, maintains the scope stack
//! (aliases, CTEs, temp-table schemas), records per-statement lineage
//! fragments at column granularity, and finally resolves the fragment graph
//! into end-to-end permanent-to-permanent lineages.
//!
//! One `Analyzer` instance owns all mutable state for one script; there are
//! no process-wide statics. The schema registry is immutable input.

use crate::graph::LineageGraph;
use crate::ident::{ColumnRef, LineageFragment, TableKind};
use crate::types::*;
use std::collections::{BTreeSet, HashMap};

/// Maximum SQL input size (10MB) to prevent memory exhaustion.
const MAX_SQL_LENGTH: usize = 10 * 1024 * 1024;

mod expression;
mod from_clause;
mod input;
mod query;
mod report;
mod schema_registry;
mod scope;
mod statements;

use schema_registry::SchemaRegistry;
use scope::ScopeStack;

#[cfg(test)]
mod tests;

/// Main entry point: analyze one T-SQL script.
#[must_use]
pub fn analyze(request: &AnalyzeRequest) -> AnalyzeResult {
    let mut analyzer = Analyzer::new(request);
    analyzer.analyze()
}

/// Record of one temp table observed in the script, in definition order.
struct TempTableRecord {
    name: String,
    source_pattern: String,
    columns: Vec<String>,
    read: bool,
}

/// Internal analyzer state.
pub(crate) struct Analyzer<'a> {
    request: &'a AnalyzeRequest,
    /// Read-only registry of caller-provided permanent-table schemas.
    schema: SchemaRegistry,
    /// Alias scopes, CTE scopes, temp-table map.
    scopes: ScopeStack,
    /// Fragment accumulator, resolved once all statements are processed.
    graph: LineageGraph,
    issues: Vec<Issue>,
    /// Permanent tables targeted by at least one DML statement.
    output_tables: BTreeSet<String>,
    /// Column lists discovered from permanent CREATE TABLE / SELECT INTO in
    /// this script. Consulted after the registry; the registry itself stays
    /// read-only.
    local_schemas: HashMap<String, Vec<String>>,
    merge_patterns: Vec<MergePattern>,
    temp_tables: Vec<TempTableRecord>,
    statement_index: usize,
}

impl<'a> Analyzer<'a> {
    fn new(request: &'a AnalyzeRequest) -> Self {
        Self {
            request,
            schema: SchemaRegistry::new(request.schema.as_ref()),
            scopes: ScopeStack::new(),
            graph: LineageGraph::new(),
            issues: Vec::new(),
            output_tables: BTreeSet::new(),
            local_schemas: HashMap::new(),
            merge_patterns: Vec::new(),
            temp_tables: Vec::new(),
            statement_index: 0,
        }
    }

    fn analyze(&mut self) -> AnalyzeResult {
        let _span = tracing::info_span!("analyze", bytes = self.request.sql.len()).entered();

        if self.request.sql.len() > MAX_SQL_LENGTH {
            self.issues.push(Issue::error(
                issue_codes::INVALID_REQUEST,
                format!(
                    "SQL exceeds maximum length of {} bytes ({} bytes provided)",
                    MAX_SQL_LENGTH,
                    self.request.sql.len()
                ),
            ));
            return self.build_result("", 0);
        }
        if self.request.sql.trim().is_empty() {
            self.issues.push(Issue::error(
                issue_codes::INVALID_REQUEST,
                "Provide a non-empty SQL script to analyze",
            ));
            return self.build_result("", 0);
        }

        let script = input::prepare_script(&self.request.sql);
        let mut statements = Vec::new();
        for batch in &script.batches {
            statements.extend(input::collect_statements(batch, &mut self.issues));
        }

        tracing::debug!(
            statements = statements.len(),
            procedure = %script.procedure_name,
            "collected statements"
        );

        for statement in &statements {
            let _stmt_span =
                tracing::debug_span!("statement", index = self.statement_index).entered();
            // Base CTE scope for the statement: holds WITH-less derived-table
            // aliases; popped unconditionally so scope pairing survives any
            // processor path.
            self.scopes.push_cte_scope();
            self.dispatch_statement(statement);
            self.scopes.pop_cte_scope();
            self.statement_index += 1;
        }

        self.build_result(&script.procedure_name, statements.len())
    }

    /// Creates a column reference classified against the current scopes.
    fn column_ref(&self, table: &str, column: &str) -> ColumnRef {
        ColumnRef::new(table, column, self.scopes.classify(table))
    }

    /// Records one lineage fragment.
    fn emit(&mut self, source: ColumnRef, target: ColumnRef) {
        self.graph.add(LineageFragment::new(source, target));
    }

    /// Ordered column list of a table, searched the way target-column
    /// inference prioritizes sources: temp schema, CTE binding, columns
    /// declared locally in this script, then the caller-provided registry.
    fn known_columns(&self, table: &str) -> Option<Vec<String>> {
        match self.scopes.classify(table) {
            TableKind::Temp => self.scopes.temp_columns(table).map(|c| c.to_vec()),
            TableKind::Cte => self
                .scopes
                .cte_columns(table)
                .filter(|c| !c.is_empty())
                .map(|c| c.to_vec()),
            _ => self
                .local_schemas
                .get(table)
                .cloned()
                .or_else(|| self.schema.columns_of(table).map(|c| c.to_vec())),
        }
    }

    /// Records a permanent DML target.
    fn record_output_table(&mut self, canonical: &str) {
        if self.scopes.classify(canonical) == TableKind::Permanent {
            self.output_tables.insert(canonical.to_string());
        }
    }

    /// Records a temp table the first time it is defined.
    fn record_temp_table(&mut self, name: &str, source_pattern: &str, columns: Vec<String>) {
        if let Some(existing) = self.temp_tables.iter_mut().find(|t| t.name == name) {
            if existing.columns.is_empty() {
                existing.columns = columns;
            }
            return;
        }
        self.temp_tables.push(TempTableRecord {
            name: name.to_string(),
            source_pattern: source_pattern.to_string(),
            columns,
            read: false,
        });
    }

    /// Marks a temp table as read (referenced as a source).
    fn mark_temp_read(&mut self, name: &str) {
        if let Some(record) = self.temp_tables.iter_mut().find(|t| t.name == name) {
            record.read = true;
        }
    }
}
