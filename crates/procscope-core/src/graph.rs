//! Fragment graph and end-to-end lineage resolution.
//!
//! Fragments are appended as statements are processed, then indexed as a
//! reverse adjacency map (`target → sources`) for resolution. For every
//! permanent target node a depth-first walk of the reverse graph expands
//! temp/CTE nodes and collects permanent sources. Permanent predecessors are
//! collected without being expanded, so a direct permanent→permanent edge is
//! emitted unchanged and interior nodes of every reported path are
//! temp/CTE only.
//!
//! The fragment graph may be cyclic (recursive CTEs, pathological scripts).
//! The walk carries a visited set per target, so re-entering a node simply
//! ends that path; cycles terminate and contribute no sources of their own.

use crate::ident::{ColumnRef, LineageFragment};
use crate::types::ColumnLineage;
use std::collections::{BTreeSet, HashMap, HashSet};

/// Accumulates lineage fragments and resolves them into permanent-to-permanent
/// column lineages.
#[derive(Debug, Default)]
pub struct LineageGraph {
    fragments: Vec<LineageFragment>,
}

impl LineageGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one fragment. Duplicates are tolerated; resolution dedupes.
    pub fn add(&mut self, fragment: LineageFragment) {
        self.fragments.push(fragment);
    }

    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    pub fn fragments(&self) -> &[LineageFragment] {
        &self.fragments
    }

    /// Resolves end-to-end lineages for every permanent target node.
    ///
    /// Total: always terminates, never fails, returns a (possibly empty) list
    /// sorted by `(target_table, target_column, source_table, source_column)`.
    pub fn resolve(&self) -> Vec<ColumnLineage> {
        let mut reverse: HashMap<&ColumnRef, Vec<&ColumnRef>> = HashMap::new();
        for fragment in &self.fragments {
            reverse
                .entry(&fragment.target)
                .or_default()
                .push(&fragment.source);
        }

        let targets: BTreeSet<&ColumnRef> = self
            .fragments
            .iter()
            .map(|f| &f.target)
            .filter(|t| !t.is_intermediate())
            .collect();

        let mut resolved: BTreeSet<(String, String, String, String)> = BTreeSet::new();
        for target in targets {
            let mut visited: HashSet<&ColumnRef> = HashSet::new();
            let mut sources: BTreeSet<&ColumnRef> = BTreeSet::new();
            Self::collect_sources(&reverse, target, &mut visited, &mut sources);

            for source in sources {
                resolved.insert((
                    target.table.clone(),
                    target.column.clone(),
                    source.table.clone(),
                    source.column.clone(),
                ));
            }
        }

        tracing::debug!(
            fragments = self.fragments.len(),
            lineages = resolved.len(),
            "resolved lineage graph"
        );

        resolved
            .into_iter()
            .map(
                |(target_table, target_column, source_table, source_column)| ColumnLineage {
                    source_table,
                    source_column,
                    target_table,
                    target_column,
                },
            )
            .collect()
    }

    fn collect_sources<'a>(
        reverse: &HashMap<&'a ColumnRef, Vec<&'a ColumnRef>>,
        node: &'a ColumnRef,
        visited: &mut HashSet<&'a ColumnRef>,
        sources: &mut BTreeSet<&'a ColumnRef>,
    ) {
        if !visited.insert(node) {
            return;
        }
        let Some(predecessors) = reverse.get(node) else {
            return;
        };
        for pred in predecessors {
            if pred.is_intermediate() {
                Self::collect_sources(reverse, pred, visited, sources);
            } else {
                sources.insert(pred);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ident::TableKind;

    fn col(table: &str, column: &str, kind: TableKind) -> ColumnRef {
        ColumnRef::new(table, column, kind)
    }

    fn frag(source: ColumnRef, target: ColumnRef) -> LineageFragment {
        LineageFragment::new(source, target)
    }

    #[test]
    fn test_direct_permanent_edge_passes_through() {
        let mut graph = LineageGraph::new();
        graph.add(frag(
            col("dbo.src", "a", TableKind::Permanent),
            col("dbo.dst", "a", TableKind::Permanent),
        ));

        let lineages = graph.resolve();
        assert_eq!(lineages.len(), 1);
        assert_eq!(lineages[0].source_table, "dbo.src");
        assert_eq!(lineages[0].target_table, "dbo.dst");
    }

    #[test]
    fn test_temp_hop_is_eliminated() {
        let mut graph = LineageGraph::new();
        graph.add(frag(
            col("dbo.customer", "cid", TableKind::Permanent),
            col("#t", "id", TableKind::Temp),
        ));
        graph.add(frag(
            col("#t", "id", TableKind::Temp),
            col("dbo.report", "rid", TableKind::Permanent),
        ));

        let lineages = graph.resolve();
        assert_eq!(lineages.len(), 1);
        assert_eq!(lineages[0].source_table, "dbo.customer");
        assert_eq!(lineages[0].source_column, "cid");
        assert_eq!(lineages[0].target_table, "dbo.report");
        assert_eq!(lineages[0].target_column, "rid");
    }

    #[test]
    fn test_permanent_chain_does_not_collapse() {
        // A -> B -> C through permanent B must not report A -> C: interior
        // nodes of a reported path are temp/CTE only.
        let mut graph = LineageGraph::new();
        graph.add(frag(
            col("dbo.a", "x", TableKind::Permanent),
            col("dbo.b", "x", TableKind::Permanent),
        ));
        graph.add(frag(
            col("dbo.b", "x", TableKind::Permanent),
            col("dbo.c", "x", TableKind::Permanent),
        ));

        let lineages = graph.resolve();
        assert_eq!(lineages.len(), 2);
        assert!(lineages
            .iter()
            .all(|l| !(l.source_table == "dbo.a" && l.target_table == "dbo.c")));
    }

    #[test]
    fn test_cycle_terminates_and_adds_nothing() {
        let mut graph = LineageGraph::new();
        // seed -> r, r -> r (recursive CTE shape), r -> out
        graph.add(frag(
            col("dbo.seed", "id", TableKind::Permanent),
            col("r", "id", TableKind::Cte),
        ));
        graph.add(frag(
            col("r", "id", TableKind::Cte),
            col("r", "id", TableKind::Cte),
        ));
        graph.add(frag(
            col("r", "id", TableKind::Cte),
            col("dbo.out", "id", TableKind::Permanent),
        ));

        let lineages = graph.resolve();
        assert_eq!(lineages.len(), 1);
        assert_eq!(lineages[0].source_table, "dbo.seed");
        assert_eq!(lineages[0].target_table, "dbo.out");
    }

    #[test]
    fn test_two_node_cycle_between_temps() {
        let mut graph = LineageGraph::new();
        graph.add(frag(
            col("#a", "x", TableKind::Temp),
            col("#b", "x", TableKind::Temp),
        ));
        graph.add(frag(
            col("#b", "x", TableKind::Temp),
            col("#a", "x", TableKind::Temp),
        ));
        graph.add(frag(
            col("dbo.s", "x", TableKind::Permanent),
            col("#a", "x", TableKind::Temp),
        ));
        graph.add(frag(
            col("#b", "x", TableKind::Temp),
            col("dbo.t", "x", TableKind::Permanent),
        ));

        let lineages = graph.resolve();
        assert_eq!(lineages.len(), 1);
        assert_eq!(lineages[0].source_table, "dbo.s");
        assert_eq!(lineages[0].target_table, "dbo.t");
    }

    #[test]
    fn test_unresolved_node_drops_out() {
        let mut graph = LineageGraph::new();
        graph.add(frag(
            col("mystery", "x", TableKind::Unresolved),
            col("dbo.t", "x", TableKind::Permanent),
        ));

        assert!(graph.resolve().is_empty());
    }

    #[test]
    fn test_multiple_sources_all_emitted() {
        let mut graph = LineageGraph::new();
        graph.add(frag(
            col("dbo.c", "descr", TableKind::Permanent),
            col("dbo.tgt", "msg", TableKind::Permanent),
        ));
        graph.add(frag(
            col("dbo.c", "deflt", TableKind::Permanent),
            col("dbo.tgt", "msg", TableKind::Permanent),
        ));

        let lineages = graph.resolve();
        assert_eq!(lineages.len(), 2);
    }

    #[test]
    fn test_output_is_sorted_and_deduped() {
        let mut graph = LineageGraph::new();
        for _ in 0..2 {
            graph.add(frag(
                col("dbo.b", "y", TableKind::Permanent),
                col("dbo.z", "y", TableKind::Permanent),
            ));
            graph.add(frag(
                col("dbo.a", "x", TableKind::Permanent),
                col("dbo.z", "x", TableKind::Permanent),
            ));
        }

        let lineages = graph.resolve();
        assert_eq!(lineages.len(), 2);
        assert_eq!(lineages[0].target_column, "x");
        assert_eq!(lineages[1].target_column, "y");
    }

    #[test]
    fn test_temp_target_produces_no_lineage_row() {
        let mut graph = LineageGraph::new();
        graph.add(frag(
            col("dbo.s", "x", TableKind::Permanent),
            col("#dead", "x", TableKind::Temp),
        ));

        assert!(graph.resolve().is_empty());
    }

    #[test]
    fn test_diamond_through_temps() {
        let mut graph = LineageGraph::new();
        graph.add(frag(
            col("dbo.s", "x", TableKind::Permanent),
            col("#a", "x", TableKind::Temp),
        ));
        graph.add(frag(
            col("dbo.s", "x", TableKind::Permanent),
            col("#b", "x", TableKind::Temp),
        ));
        graph.add(frag(
            col("#a", "x", TableKind::Temp),
            col("dbo.t", "x", TableKind::Permanent),
        ));
        graph.add(frag(
            col("#b", "x", TableKind::Temp),
            col("dbo.t", "x", TableKind::Permanent),
        ));

        let lineages = graph.resolve();
        assert_eq!(lineages.len(), 1, "diamond paths dedupe to one lineage");
    }
}
