//! Statement-level processors for DML shapes.
//!
//! One processor per DML shape: CREATE TABLE (temp schema capture), INSERT
//! (SELECT and VALUES forms), UPDATE (including the T-SQL `UPDATE alias …
//! FROM` form), MERGE (named and derived USING sources) and DELETE (target
//! capture only). SELECT…INTO and WITH are handled by the query machinery.
//!
//! Every processor pushes and pops exactly the scopes it acquires; all
//! processor paths are infallible, so the pairing is straight-line code.

use super::query::TargetSpec;
use super::Analyzer;
use crate::ident::{canonical_table_name, is_temp_table_name, TableKind};
use crate::types::{issue_codes, Issue, MergePattern};
use sqlparser::ast::{
    self, Assignment, AssignmentTarget, Expr, MergeAction, MergeClause, MergeInsertKind, SetExpr,
    TableFactor, TableWithJoins, UpdateTableFromKind,
};

impl<'a> Analyzer<'a> {
    pub(super) fn process_insert(&mut self, insert: &ast::Insert) {
        let canonical = canonical_table_name(&insert.table.to_string());
        self.record_output_table(&canonical);

        let explicit: Vec<String> = insert
            .columns
            .iter()
            .map(|c| c.value.to_lowercase())
            .collect();
        let target_columns = if explicit.is_empty() {
            let known = self.known_columns(&canonical);
            if known.is_none()
                && self.scopes.classify(&canonical) == TableKind::Permanent
                && !self.schema.table_exists(&canonical)
            {
                self.issues.push(
                    Issue::info(
                        issue_codes::UNKNOWN_SCHEMA,
                        format!(
                            "No column metadata for '{canonical}'; target columns inferred from the query's output names"
                        ),
                    )
                    .with_statement(self.statement_index),
                );
            }
            known
        } else {
            Some(explicit)
        };

        let Some(source) = &insert.source else {
            return;
        };

        if let SetExpr::Values(values) = source.body.as_ref() {
            self.process_insert_values(&canonical, target_columns.as_deref(), &values.rows);
        } else {
            let spec = TargetSpec {
                table: canonical,
                columns: target_columns,
            };
            self.process_query(source, Some(&spec));
        }
    }

    /// INSERT…VALUES: each row expression pairs with the corresponding
    /// target column. Literal-only expressions seed the column without a
    /// source and produce no fragment.
    fn process_insert_values(
        &mut self,
        target: &str,
        target_columns: Option<&[String]>,
        rows: &[Vec<Expr>],
    ) {
        let Some(columns) = target_columns else {
            self.issues.push(
                Issue::warning(
                    issue_codes::AMBIGUOUS_EXPANSION,
                    format!(
                        "INSERT into '{target}' without a resolvable column list; VALUES lineage dropped"
                    ),
                )
                .with_statement(self.statement_index),
            );
            return;
        };

        for row in rows {
            if row.len() > columns.len() {
                self.issues.push(
                    Issue::warning(
                        issue_codes::COLUMN_COUNT_MISMATCH,
                        format!(
                            "'{target}' expects {} columns but a VALUES row provides {}",
                            columns.len(),
                            row.len()
                        ),
                    )
                    .with_statement(self.statement_index),
                );
            }
            for (expr, column) in row.iter().zip(columns.iter()) {
                let sources = self.expression_sources(expr);
                self.emit_assignment(target, column, sources);
            }
        }
    }

    pub(super) fn process_update(
        &mut self,
        table: &TableWithJoins,
        assignments: &[Assignment],
        from: Option<&UpdateTableFromKind>,
        _selection: Option<&Expr>,
    ) {
        self.scopes.push_alias_scope();

        // FROM first: the T-SQL `UPDATE t SET … FROM dbo.Tgt t` form names
        // the target by an alias bound in the FROM clause.
        if let Some(kind) = from {
            let tables = match kind {
                UpdateTableFromKind::BeforeSet(tables) => tables,
                UpdateTableFromKind::AfterSet(tables) => tables,
            };
            for table_with_joins in tables {
                self.resolve_table_with_joins(table_with_joins);
            }
        }

        let target_table = self.register_update_target(table);
        if let Some(target) = &target_table {
            self.record_output_table(target);
        }

        for assignment in assignments {
            let Some(column) = assignment_column(&assignment.target) else {
                continue;
            };
            let sources = self.expression_sources(&assignment.value);
            if let Some(target) = &target_table {
                self.emit_assignment(target, &column, sources);
            }
        }

        self.scopes.pop_alias_scope();
    }

    /// Resolves the UPDATE target relation, following an alias into the
    /// FROM clause when the statement uses the aliased form.
    fn register_update_target(&mut self, table: &TableWithJoins) -> Option<String> {
        let target = match &table.relation {
            TableFactor::Table { name, alias, .. } => {
                let canonical = canonical_table_name(&name.to_string());
                let resolved = self.scopes.resolve_alias(&canonical).unwrap_or(canonical);
                if let Some(a) = alias {
                    self.scopes.bind_alias(&a.name.value, &resolved);
                }
                self.scopes.bind_alias(&resolved, &resolved);
                Some(resolved)
            }
            other => {
                self.resolve_table_factor(other);
                None
            }
        };

        for join in &table.joins {
            self.resolve_table_factor(&join.relation);
        }

        target
    }

    pub(super) fn process_merge(
        &mut self,
        table: &TableFactor,
        source: &TableFactor,
        on: &Expr,
        clauses: &[MergeClause],
    ) {
        self.scopes.push_alias_scope();

        let target_table = match table {
            TableFactor::Table { name, alias, .. } => {
                self.register_named_table(&name.to_string(), alias.as_ref())
            }
            other => {
                self.resolve_table_factor(other);
                String::new()
            }
        };
        if !target_table.is_empty() {
            self.record_output_table(&target_table);
        }

        let source_table = self.register_merge_source(source);
        let join_columns = self.merge_join_columns(on, &target_table);

        let mut update_columns = Vec::new();
        let mut insert_columns = Vec::new();

        for clause in clauses {
            match &clause.action {
                MergeAction::Update { assignments } => {
                    for assignment in assignments {
                        let Some(column) = assignment_column(&assignment.target) else {
                            continue;
                        };
                        update_columns.push(column.clone());
                        let sources = self.expression_sources(&assignment.value);
                        if !target_table.is_empty() {
                            self.emit_assignment(&target_table, &column, sources);
                        }
                    }
                }
                MergeAction::Insert(insert_expr) => {
                    let mut columns: Vec<String> = insert_expr
                        .columns
                        .iter()
                        .map(|c| c.value.to_lowercase())
                        .collect();
                    if columns.is_empty() {
                        columns = self.known_columns(&target_table).unwrap_or_default();
                    }
                    insert_columns.extend(columns.iter().cloned());

                    if let MergeInsertKind::Values(values) = &insert_expr.kind {
                        if !target_table.is_empty() {
                            self.process_insert_values(
                                &target_table,
                                Some(&columns),
                                &values.rows,
                            );
                        }
                    }
                }
                MergeAction::Delete => {}
            }
        }

        self.merge_patterns.push(MergePattern {
            source_table,
            target_table,
            join_columns,
            update_columns,
            insert_columns,
        });

        self.scopes.pop_alias_scope();
    }

    /// Registers the USING source. Named tables bind their alias; a derived
    /// subquery becomes a synthetic intermediate named after its alias, its
    /// columns flowing through like a CTE's.
    fn register_merge_source(&mut self, source: &TableFactor) -> String {
        match source {
            TableFactor::Table { name, alias, .. } => {
                self.register_named_table(&name.to_string(), alias.as_ref())
            }
            TableFactor::Derived {
                subquery,
                alias: Some(a),
                ..
            } => {
                let alias_name = a.name.value.to_lowercase();
                self.scopes.bind_cte(&alias_name, Vec::new());
                let spec = TargetSpec {
                    table: alias_name.clone(),
                    columns: None,
                };
                let columns = self.process_query(subquery, Some(&spec));
                self.scopes.bind_cte(&alias_name, columns);
                self.scopes.bind_alias(&alias_name, &alias_name);
                alias_name
            }
            other => {
                self.resolve_table_factor(other);
                String::new()
            }
        }
    }

    /// Collects the column names equated in the ON predicate. Prefers the
    /// target-side column of each equality.
    fn merge_join_columns(&mut self, on: &Expr, target_table: &str) -> Vec<String> {
        let mut columns = Vec::new();
        self.collect_join_columns(on, target_table, &mut columns);
        columns
    }

    fn collect_join_columns(&mut self, expr: &Expr, target_table: &str, out: &mut Vec<String>) {
        match expr {
            Expr::BinaryOp {
                left,
                op: ast::BinaryOperator::And,
                right,
            } => {
                self.collect_join_columns(left, target_table, out);
                self.collect_join_columns(right, target_table, out);
            }
            Expr::BinaryOp {
                left,
                op: ast::BinaryOperator::Eq,
                right,
            } => {
                let left_ref = column_ref_parts(left);
                let right_ref = column_ref_parts(right);
                if let (Some(left_ref), Some(right_ref)) = (left_ref, right_ref) {
                    let column = self
                        .pick_target_side(&left_ref, target_table)
                        .or_else(|| self.pick_target_side(&right_ref, target_table))
                        .unwrap_or(left_ref.1);
                    if !out.contains(&column) {
                        out.push(column);
                    }
                }
            }
            Expr::Nested(inner) => self.collect_join_columns(inner, target_table, out),
            _ => {}
        }
    }

    fn pick_target_side(
        &self,
        (qualifier, column): &(Option<String>, String),
        target_table: &str,
    ) -> Option<String> {
        let qualifier = qualifier.as_ref()?;
        let resolved = self.scopes.resolve_alias(qualifier)?;
        (resolved == target_table).then(|| column.clone())
    }

    pub(super) fn process_create_table(&mut self, create: &ast::CreateTable) {
        let canonical = canonical_table_name(&create.name.to_string());
        let columns: Vec<String> = create
            .columns
            .iter()
            .map(|c| c.name.value.to_lowercase())
            .collect();

        if is_temp_table_name(&canonical) {
            self.scopes.define_temp(&canonical, columns.clone());
            self.record_temp_table(&canonical, "CREATE TABLE", columns.clone());
        } else if !columns.is_empty() {
            self.local_schemas.insert(canonical.clone(), columns.clone());
        }

        // CREATE TABLE … AS SELECT behaves like SELECT INTO.
        if let Some(query) = &create.query {
            let spec = TargetSpec {
                table: canonical.clone(),
                columns: if columns.is_empty() {
                    None
                } else {
                    Some(columns.clone())
                },
            };
            let inferred = self.process_query(query, Some(&spec));

            if columns.is_empty() {
                if is_temp_table_name(&canonical) {
                    self.scopes.define_temp(&canonical, inferred.clone());
                    self.record_temp_table(&canonical, "CREATE TABLE", inferred);
                } else {
                    self.local_schemas.insert(canonical.clone(), inferred);
                }
            }
            self.record_output_table(&canonical);
        }
    }

    /// DELETE contributes no column fragments; its permanent target is still
    /// a modified table and joins the output set.
    pub(super) fn process_delete(&mut self, delete: &ast::Delete) {
        let from_tables = match &delete.from {
            ast::FromTable::WithFromKeyword(tables) => tables,
            ast::FromTable::WithoutKeyword(tables) => tables,
        };

        if !delete.tables.is_empty() {
            self.scopes.push_alias_scope();
            for table_with_joins in from_tables {
                self.resolve_table_with_joins(table_with_joins);
            }
            for name in &delete.tables {
                let canonical = canonical_table_name(&name.to_string());
                let resolved = self.scopes.resolve_alias(&canonical).unwrap_or(canonical);
                self.record_output_table(&resolved);
            }
            self.scopes.pop_alias_scope();
        } else if let Some(first) = from_tables.first() {
            if let TableFactor::Table { name, .. } = &first.relation {
                let canonical = canonical_table_name(&name.to_string());
                self.record_output_table(&canonical);
            }
        }
    }
}

/// Extracts the column name assigned by a SET clause target.
fn assignment_column(target: &AssignmentTarget) -> Option<String> {
    match target {
        AssignmentTarget::ColumnName(name) => {
            let canonical = canonical_table_name(&name.to_string());
            Some(crate::ident::simple_name(&canonical).to_string())
        }
        AssignmentTarget::Tuple(_) => None,
    }
}

/// `(qualifier, column)` parts of a plain column reference expression.
fn column_ref_parts(expr: &Expr) -> Option<(Option<String>, String)> {
    match expr {
        Expr::Identifier(ident) => Some((None, ident.value.to_lowercase())),
        Expr::CompoundIdentifier(parts) if parts.len() >= 2 => {
            let qualifier = parts[..parts.len() - 1]
                .iter()
                .map(|i| i.value.to_lowercase())
                .collect::<Vec<_>>()
                .join(".");
            Some((Some(qualifier), parts[parts.len() - 1].value.to_lowercase()))
        }
        _ => None,
    }
}
