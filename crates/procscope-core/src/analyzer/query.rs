//! Query processing: CTE blocks, SELECT projections, set operations,
//! wildcard expansion and positional pairing with target columns.

use super::Analyzer;
use crate::ident::{canonical_table_name, is_temp_table_name};
use crate::types::{issue_codes, Issue};
use sqlparser::ast::{self, Expr, Query, SelectItem, SetExpr, Statement};

/// The table a query's output flows into, with its column list when known.
///
/// `columns: None` means the target columns are inferred positionally from
/// the query's own output names.
pub(super) struct TargetSpec {
    pub(super) table: String,
    pub(super) columns: Option<Vec<String>>,
}

/// One projected output: derived name plus the source columns feeding it.
struct ProjectionItem {
    name: String,
    sources: Vec<crate::ident::ColumnRef>,
}

impl<'a> Analyzer<'a> {
    /// Processes a query, emitting fragments into `target` when given.
    /// Returns the query's output column names (used to infer CTE and
    /// derived-table schemas).
    pub(super) fn process_query(&mut self, query: &Query, target: Option<&TargetSpec>) -> Vec<String> {
        let has_with = query.with.is_some();
        if let Some(with) = &query.with {
            self.scopes.push_cte_scope();
            for cte in &with.cte_tables {
                self.process_cte(cte);
            }
        }

        let names = self.process_set_expr(&query.body, target);

        if has_with {
            self.scopes.pop_cte_scope();
        }
        names
    }

    /// Processes one CTE: registers the name before the body so
    /// self-referential CTEs resolve, then pairs the body's output into the
    /// CTE's columns.
    fn process_cte(&mut self, cte: &ast::Cte) {
        let name = cte.alias.name.value.to_lowercase();
        let explicit: Vec<String> = cte
            .alias
            .columns
            .iter()
            .map(|c| c.name.value.to_lowercase())
            .collect();
        let explicit = if explicit.is_empty() {
            None
        } else {
            Some(explicit)
        };

        self.scopes
            .bind_cte(&name, explicit.clone().unwrap_or_default());

        let spec = TargetSpec {
            table: name.clone(),
            columns: explicit.clone(),
        };
        let inferred = self.process_query(&cte.query, Some(&spec));

        let columns = explicit.unwrap_or(inferred);
        self.scopes.bind_cte(&name, columns);
    }

    pub(super) fn process_set_expr(
        &mut self,
        body: &SetExpr,
        target: Option<&TargetSpec>,
    ) -> Vec<String> {
        match body {
            SetExpr::Select(select) => self.process_select(select, target),
            SetExpr::Query(query) => self.process_query(query, target),
            SetExpr::SetOperation { left, right, .. } => {
                // Both branches pair positionally against the same target;
                // column names come from the first branch, as in SQL.
                let names = self.process_set_expr(left, target);
                self.process_set_expr(right, target);
                names
            }
            SetExpr::Values(values) => {
                // VALUES reached outside INSERT context: traverse expressions
                // for diagnostics, no names to report.
                for row in &values.rows {
                    for expr in row {
                        self.expression_sources(expr);
                    }
                }
                Vec::new()
            }
            // `WITH … INSERT` / `WITH … UPDATE` parse as a query whose body
            // is the wrapped statement; dispatch it with the CTE scope live.
            SetExpr::Insert(statement) | SetExpr::Update(statement) => {
                self.dispatch_statement(statement);
                Vec::new()
            }
            _ => Vec::new(),
        }
    }

    fn process_select(&mut self, select: &ast::Select, target: Option<&TargetSpec>) -> Vec<String> {
        self.scopes.push_alias_scope();
        self.resolve_from(&select.from);

        let items = self.collect_projection(select);
        let names: Vec<String> = items.iter().map(|item| item.name.clone()).collect();

        if let Some(spec) = target {
            self.emit_into_target(&items, spec);
        } else if let Some(into) = &select.into {
            let into_table = canonical_table_name(&into.name.to_string());
            self.process_select_into(&into_table, &items, &names);
        }

        self.scopes.pop_alias_scope();
        names
    }

    /// Collects the SELECT list into projection items, expanding wildcards.
    fn collect_projection(&mut self, select: &ast::Select) -> Vec<ProjectionItem> {
        let mut items = Vec::new();

        for (idx, item) in select.projection.iter().enumerate() {
            match item {
                SelectItem::UnnamedExpr(expr) => {
                    let name = derive_output_name(expr, idx);
                    let sources = self.expression_sources(expr);
                    items.push(ProjectionItem { name, sources });
                }
                SelectItem::ExprWithAlias { expr, alias } => {
                    let sources = self.expression_sources(expr);
                    items.push(ProjectionItem {
                        name: alias.value.to_lowercase(),
                        sources,
                    });
                }
                SelectItem::Wildcard(_) => {
                    for table in self.scopes.tables_in_scope() {
                        self.expand_wildcard_table(&table, &mut items);
                    }
                }
                SelectItem::QualifiedWildcard(kind, _) => {
                    let prefix = canonical_table_name(&kind.to_string());
                    let table = self.scopes.resolve_alias(&prefix).unwrap_or(prefix);
                    self.expand_wildcard_table(&table, &mut items);
                }
            }
        }

        items
    }

    /// Expands `table.*` into one item per known column, or records an
    /// ambiguous-expansion diagnostic when the column list is unknown.
    fn expand_wildcard_table(&mut self, table: &str, items: &mut Vec<ProjectionItem>) {
        match self.known_columns(table) {
            Some(columns) => {
                for column in columns {
                    let source = self.column_ref(table, &column);
                    items.push(ProjectionItem {
                        name: column,
                        sources: vec![source],
                    });
                }
            }
            None => {
                self.issues.push(
                    Issue::warning(
                        issue_codes::AMBIGUOUS_EXPANSION,
                        format!(
                            "SELECT * from '{table}': column list unknown, expansion dropped"
                        ),
                    )
                    .with_statement(self.statement_index),
                );
            }
        }
    }

    /// Pairs projection items against the target columns and emits one
    /// fragment per extracted source column.
    fn emit_into_target(&mut self, items: &[ProjectionItem], spec: &TargetSpec) {
        match &spec.columns {
            Some(columns) => {
                if items.len() != columns.len() && !items.is_empty() {
                    self.issues.push(
                        Issue::warning(
                            issue_codes::COLUMN_COUNT_MISMATCH,
                            format!(
                                "'{}' expects {} columns but the query produces {}; extras are dropped, missing targets stay unmapped",
                                spec.table,
                                columns.len(),
                                items.len()
                            ),
                        )
                        .with_statement(self.statement_index),
                    );
                }
                for (item, column) in items.iter().zip(columns.iter()) {
                    let target_ref = self.column_ref(&spec.table, column);
                    for source in &item.sources {
                        self.emit(source.clone(), target_ref.clone());
                    }
                }
            }
            None => {
                for item in items {
                    let target_ref = self.column_ref(&spec.table, &item.name);
                    for source in &item.sources {
                        self.emit(source.clone(), target_ref.clone());
                    }
                }
            }
        }
    }

    /// `SELECT … INTO t`: implicit CREATE TABLE with inferred columns,
    /// followed by an INSERT…SELECT into it.
    fn process_select_into(&mut self, table: &str, items: &[ProjectionItem], names: &[String]) {
        if items.is_empty() {
            // SELECT * INTO with unknown source schema: infer no columns,
            // emit no lineage; the wildcard diagnostic is already recorded.
            if is_temp_table_name(table) {
                self.scopes.define_temp(table, Vec::new());
                self.record_temp_table(table, "SELECT INTO", Vec::new());
            }
            return;
        }

        if is_temp_table_name(table) {
            self.scopes.define_temp(table, names.to_vec());
            self.record_temp_table(table, "SELECT INTO", names.to_vec());
        } else {
            self.local_schemas.insert(table.to_string(), names.to_vec());
            self.record_output_table(table);
        }

        let spec = TargetSpec {
            table: table.to_string(),
            columns: None,
        };
        self.emit_into_target(items, &spec);
    }

    /// Dispatches a statement wrapped inside a query body (`WITH … INSERT`).
    pub(super) fn dispatch_statement(&mut self, statement: &Statement) {
        match statement {
            Statement::Query(query) => {
                self.process_query(query, None);
            }
            Statement::Insert(insert) => self.process_insert(insert),
            Statement::CreateTable(create) => self.process_create_table(create),
            Statement::Update {
                table,
                assignments,
                from,
                selection,
                ..
            } => self.process_update(table, assignments, from.as_ref(), selection.as_ref()),
            Statement::Merge {
                table,
                source,
                on,
                clauses,
                ..
            } => self.process_merge(table, source, on, clauses),
            Statement::Delete(delete) => self.process_delete(delete),
            // Session, transaction and variable statements carry no lineage.
            Statement::Declare { .. }
            | Statement::Set(_)
            | Statement::StartTransaction { .. }
            | Statement::Commit { .. }
            | Statement::Rollback { .. }
            | Statement::Truncate { .. }
            | Statement::Drop { .. }
            | Statement::CreateIndex(_) => {}
            other => {
                self.issues.push(
                    Issue::info(
                        issue_codes::UNSUPPORTED_SYNTAX,
                        format!(
                            "Statement not tracked for lineage: {}",
                            statement_label(other)
                        ),
                    )
                    .with_statement(self.statement_index),
                );
            }
        }
    }
}

/// Derives an output column name from an unaliased projection expression.
fn derive_output_name(expr: &Expr, index: usize) -> String {
    match expr {
        Expr::Identifier(ident) => ident.value.to_lowercase(),
        Expr::CompoundIdentifier(parts) => parts
            .last()
            .map(|i| i.value.to_lowercase())
            .unwrap_or_else(|| format!("col_{index}")),
        Expr::Function(func) => func.name.to_string().to_lowercase(),
        Expr::Cast { expr, .. } => derive_output_name(expr, index),
        _ => format!("col_{index}"),
    }
}

/// Short label for an unsupported statement, for diagnostics.
fn statement_label(statement: &Statement) -> String {
    let rendered = statement.to_string();
    rendered
        .split_whitespace()
        .take(2)
        .collect::<Vec<_>>()
        .join(" ")
        .to_uppercase()
}

impl<'a> Analyzer<'a> {
    /// Emit helper shared with the statement processors: classifies the
    /// target column against the current scopes and records fragments.
    pub(super) fn emit_assignment(
        &mut self,
        target_table: &str,
        target_column: &str,
        sources: Vec<crate::ident::ColumnRef>,
    ) {
        let target_ref = self.column_ref(target_table, target_column);
        for source in sources {
            self.emit(source, target_ref.clone());
        }
    }
}
