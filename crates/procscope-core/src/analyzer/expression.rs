//! Column-leaf extraction from scalar expressions.
//!
//! Given any scalar expression tree, returns the set of resolved
//! `(table, column)` leaves it depends on. Multi-part identifiers resolve
//! their leading prefix through the alias scopes; an unresolvable prefix is
//! kept with [`TableKind::Unresolved`] so it drops out during resolution
//! instead of guessing. Unqualified identifiers are attributed only when the
//! current scope makes the owner unambiguous (a single source, or exactly one
//! in-scope source known to carry the column); otherwise they are recorded as
//! a diagnostic and dropped, trading recall for precision.

use super::Analyzer;
use crate::ident::{ColumnRef, TableKind};
use crate::types::{issue_codes, Issue};
use sqlparser::ast::{self, Expr, FunctionArg, FunctionArgExpr, Query, SetExpr};

/// Recursion guard for pathologically nested expressions.
const MAX_RECURSION_DEPTH: usize = 100;

impl<'a> Analyzer<'a> {
    /// Extracts every resolved source column an expression depends on.
    pub(super) fn expression_sources(&mut self, expr: &Expr) -> Vec<ColumnRef> {
        let mut sources = Vec::new();
        let depth_limited = self.collect_expr_sources(expr, &mut sources, 0);
        if depth_limited {
            self.issues.push(
                Issue::warning(
                    issue_codes::APPROXIMATE_LINEAGE,
                    format!(
                        "Expression recursion depth exceeded (>{MAX_RECURSION_DEPTH}). Lineage may be incomplete."
                    ),
                )
                .with_statement(self.statement_index),
            );
        }
        sources
    }

    fn collect_expr_sources(
        &mut self,
        expr: &Expr,
        out: &mut Vec<ColumnRef>,
        depth: usize,
    ) -> bool {
        if depth > MAX_RECURSION_DEPTH {
            return true;
        }
        let next_depth = depth + 1;
        let mut depth_limited = false;

        match expr {
            Expr::Identifier(ident) => {
                if let Some(source) = self.resolve_unqualified_column(&ident.value) {
                    out.push(source);
                }
            }
            Expr::CompoundIdentifier(parts) => {
                if parts.len() >= 2 {
                    let prefix = parts[..parts.len() - 1]
                        .iter()
                        .map(|i| i.value.as_str())
                        .collect::<Vec<_>>()
                        .join(".");
                    let column = &parts[parts.len() - 1].value;
                    out.push(self.resolve_qualified_column(&prefix, column));
                }
            }
            Expr::BinaryOp { left, right, .. } => {
                depth_limited |= self.collect_expr_sources(left, out, next_depth);
                depth_limited |= self.collect_expr_sources(right, out, next_depth);
            }
            Expr::UnaryOp { expr, .. } | Expr::Nested(expr) => {
                depth_limited |= self.collect_expr_sources(expr, out, next_depth);
            }
            Expr::Cast { expr, .. } => {
                depth_limited |= self.collect_expr_sources(expr, out, next_depth);
            }
            Expr::Case {
                operand,
                conditions,
                else_result,
                ..
            } => {
                if let Some(op) = operand {
                    depth_limited |= self.collect_expr_sources(op, out, next_depth);
                }
                for case_when in conditions {
                    depth_limited |=
                        self.collect_expr_sources(&case_when.condition, out, next_depth);
                    depth_limited |= self.collect_expr_sources(&case_when.result, out, next_depth);
                }
                if let Some(el) = else_result {
                    depth_limited |= self.collect_expr_sources(el, out, next_depth);
                }
            }
            Expr::Function(func) => {
                if let ast::FunctionArguments::List(arg_list) = &func.args {
                    for arg in &arg_list.args {
                        match arg {
                            FunctionArg::Unnamed(FunctionArgExpr::Expr(e))
                            | FunctionArg::Named {
                                arg: FunctionArgExpr::Expr(e),
                                ..
                            } => {
                                depth_limited |= self.collect_expr_sources(e, out, next_depth);
                            }
                            _ => {}
                        }
                    }
                }
                // Window clauses reference columns too (OVER (PARTITION BY …
                // ORDER BY …)).
                if let Some(ast::WindowType::WindowSpec(spec)) = &func.over {
                    for e in &spec.partition_by {
                        depth_limited |= self.collect_expr_sources(e, out, next_depth);
                    }
                    for order in &spec.order_by {
                        depth_limited |= self.collect_expr_sources(&order.expr, out, next_depth);
                    }
                }
            }
            Expr::Subquery(query) => {
                out.extend(self.scalar_subquery_sources(query));
            }
            Expr::InList { expr, list, .. } => {
                depth_limited |= self.collect_expr_sources(expr, out, next_depth);
                for item in list {
                    depth_limited |= self.collect_expr_sources(item, out, next_depth);
                }
            }
            Expr::Between {
                expr, low, high, ..
            } => {
                depth_limited |= self.collect_expr_sources(expr, out, next_depth);
                depth_limited |= self.collect_expr_sources(low, out, next_depth);
                depth_limited |= self.collect_expr_sources(high, out, next_depth);
            }
            Expr::IsNull(e) | Expr::IsNotNull(e) => {
                depth_limited |= self.collect_expr_sources(e, out, next_depth);
            }
            Expr::Like { expr, pattern, .. } | Expr::ILike { expr, pattern, .. } => {
                depth_limited |= self.collect_expr_sources(expr, out, next_depth);
                depth_limited |= self.collect_expr_sources(pattern, out, next_depth);
            }
            Expr::Tuple(exprs) => {
                for e in exprs {
                    depth_limited |= self.collect_expr_sources(e, out, next_depth);
                }
            }
            Expr::Extract { expr, .. } => {
                depth_limited |= self.collect_expr_sources(expr, out, next_depth);
            }
            Expr::Substring {
                expr,
                substring_from,
                substring_for,
                ..
            } => {
                depth_limited |= self.collect_expr_sources(expr, out, next_depth);
                if let Some(from) = substring_from {
                    depth_limited |= self.collect_expr_sources(from, out, next_depth);
                }
                if let Some(for_expr) = substring_for {
                    depth_limited |= self.collect_expr_sources(for_expr, out, next_depth);
                }
            }
            // Predicate subqueries gate rows, they do not produce values.
            Expr::InSubquery { .. } | Expr::Exists { .. } => {}
            _ => {}
        }

        depth_limited
    }

    /// Resolves an `alias.column` (or `schema.table.column`) reference.
    fn resolve_qualified_column(&mut self, prefix: &str, column: &str) -> ColumnRef {
        let prefix = crate::ident::canonical_table_name(prefix);
        if let Some(table) = self.scopes.resolve_alias(&prefix) {
            return self.column_ref(&table, column);
        }
        // Not an alias in any scope: record as unresolved rather than guess.
        self.issues.push(
            Issue::warning(
                issue_codes::UNRESOLVED_REFERENCE,
                format!("Unresolved table or alias '{prefix}' for column '{column}'"),
            )
            .with_statement(self.statement_index),
        );
        ColumnRef::new(&prefix, column, TableKind::Unresolved)
    }

    /// Attributes an unqualified column when the current scope makes the
    /// owner unambiguous; otherwise records the reference and drops it.
    fn resolve_unqualified_column(&mut self, column: &str) -> Option<ColumnRef> {
        let tables = self.scopes.tables_in_scope();
        match tables.len() {
            0 => None,
            1 => Some(self.column_ref(&tables[0], column)),
            _ => {
                let column_lower = column.to_lowercase();
                let candidates: Vec<&String> = tables
                    .iter()
                    .filter(|table| {
                        self.known_columns(table)
                            .map(|cols| cols.contains(&column_lower))
                            .unwrap_or(false)
                    })
                    .collect();
                if candidates.len() == 1 {
                    let table = candidates[0].clone();
                    Some(self.column_ref(&table, column))
                } else {
                    self.issues.push(
                        Issue::info(
                            issue_codes::UNRESOLVED_REFERENCE,
                            format!(
                                "Unqualified column '{column}' is ambiguous across: {}",
                                tables.join(", ")
                            ),
                        )
                        .with_statement(self.statement_index),
                    );
                    None
                }
            }
        }
    }

    /// Sources of a scalar subquery: its FROM is resolved in a fresh alias
    /// scope and the projection's column leaves are surfaced as the
    /// expression's sources.
    fn scalar_subquery_sources(&mut self, query: &Query) -> Vec<ColumnRef> {
        let mut sources = Vec::new();
        if let SetExpr::Select(select) = query.body.as_ref() {
            self.scopes.push_alias_scope();
            self.resolve_from(&select.from);
            for item in &select.projection {
                match item {
                    ast::SelectItem::UnnamedExpr(expr)
                    | ast::SelectItem::ExprWithAlias { expr, .. } => {
                        sources.extend(self.expression_sources(expr));
                    }
                    _ => {}
                }
            }
            self.scopes.pop_alias_scope();
        }
        sources
    }
}
