//! Report assembly: turning analyzer state into a [`ProcedureAnalysis`].

use super::Analyzer;
use crate::types::{
    AnalyzeResult, IssueCount, ProcedureAnalysis, Severity, Summary, TempTablePattern,
};
use std::collections::BTreeSet;

impl<'a> Analyzer<'a> {
    pub(super) fn build_result(
        &mut self,
        procedure_name: &str,
        statement_count: usize,
    ) -> AnalyzeResult {
        let column_lineages = self.graph.resolve();

        // Input tables are the source side of at least one resolved lineage.
        let source_tables: BTreeSet<String> = column_lineages
            .iter()
            .map(|l| l.source_table.clone())
            .collect();

        let temp_table_patterns: Vec<TempTablePattern> = self
            .temp_tables
            .iter()
            .map(|record| TempTablePattern {
                name: record.name.clone(),
                source_pattern: record.source_pattern.clone(),
                columns: record.columns.clone(),
                is_intermediate: record.read,
            })
            .collect();

        let analysis = ProcedureAnalysis {
            procedure_name: procedure_name.to_string(),
            source_tables: source_tables.into_iter().collect(),
            target_tables: self.output_tables.iter().cloned().collect(),
            column_lineages,
            merge_patterns: self.merge_patterns.clone(),
            temp_table_patterns,
        };

        let mut issue_count = IssueCount::default();
        for issue in &self.issues {
            match issue.severity {
                Severity::Error => issue_count.errors += 1,
                Severity::Warning => issue_count.warnings += 1,
                Severity::Info => issue_count.infos += 1,
            }
        }

        let summary = Summary {
            statement_count,
            fragment_count: self.graph.len(),
            lineage_count: analysis.column_lineages.len(),
            has_errors: issue_count.errors > 0,
            issue_count,
        };

        tracing::debug!(
            lineages = summary.lineage_count,
            inputs = analysis.source_tables.len(),
            outputs = analysis.target_tables.len(),
            "report assembled"
        );

        AnalyzeResult {
            analysis,
            issues: self.issues.clone(),
            summary,
        }
    }
}
