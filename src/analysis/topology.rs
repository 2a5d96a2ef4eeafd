//! Evaluation order for derived fields.
use crate::compute::derived::DerivedField;
use crate::error::SchemaError;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};

/// Orders derived fields so every producer comes before its consumers.
///
/// An edge `a -> b` means `b` reads `a`'s target. Ties keep declaration order.
/// Returns indices into `derived`, or the cycle as a `SchemaError`.
pub fn derived_order(derived: &[DerivedField]) -> Result<Vec<usize>, SchemaError> {
    let mut graph: DiGraph<usize, ()> = DiGraph::with_capacity(derived.len(), derived.len());
    let nodes: Vec<NodeIndex> = (0..derived.len()).map(|i| graph.add_node(i)).collect();

    for (consumer, field) in derived.iter().enumerate() {
        for input in &field.depends_on {
            for (producer, other) in derived.iter().enumerate() {
                if other.target == *input || input.matches(&other.target) {
                    graph.add_edge(nodes[producer], nodes[consumer], ());
                }
            }
        }
    }

    let sorted = toposort(&graph, None)
        .map_err(|cycle| SchemaError::DerivedCycle(derived[graph[cycle.node_id()]].target.to_string()))?;

    // petgraph's DFS-based order is valid but not stable; re-sort by
    // (depth, declaration index) so independent fields keep their declared order.
    let mut depth = vec![0usize; derived.len()];
    for idx in &sorted {
        let i = graph[*idx];
        for parent in graph.neighbors_directed(*idx, petgraph::Direction::Incoming) {
            depth[i] = depth[i].max(depth[graph[parent]] + 1);
        }
    }
    let mut order: Vec<usize> = (0..derived.len()).collect();
    order.sort_by_key(|&i| (depth[i], i));
    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::derived::Calculator;
    use crate::store::FieldPath;

    fn p(s: &str) -> FieldPath {
        FieldPath::parse(s).unwrap()
    }

    fn remaining(target: &str, balance: &str, amount: &str) -> DerivedField {
        DerivedField::new(p(target), Calculator::RemainingBalance { balance: p(balance), amount: p(amount) })
    }

    #[test]
    fn test_producers_come_first() {
        let fields = vec![
            remaining("c", "b", "x"), // reads b
            remaining("b", "a", "x"), // reads a
            remaining("a", "x", "y"),
        ];
        assert_eq!(derived_order(&fields).unwrap(), vec![2, 1, 0]);
    }

    #[test]
    fn test_independent_fields_keep_declaration_order() {
        let fields = vec![remaining("a", "x", "y"), remaining("b", "x", "y"), remaining("c", "x", "y")];
        assert_eq!(derived_order(&fields).unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn test_cycle_is_rejected() {
        let fields = vec![remaining("a", "b", "x"), remaining("b", "a", "x")];
        assert!(matches!(derived_order(&fields), Err(SchemaError::DerivedCycle(_))));
    }
}
