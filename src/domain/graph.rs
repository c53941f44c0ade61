//! The requirement relation between entries.
//!
//! The graph knows nothing about entry state. It only stores which entries
//! require which, keyed by registry index; the [`Session`](super::Session)
//! owns the entries and consults the graph whenever an entry is disabled.

use petgraph::{Direction, graphmap::DiGraphMap};

/// Directed requirement edges between registry indices.
///
/// An edge points from a prerequisite to its dependent: `a -> b` means "`b`
/// requires `a`", so `a` must not be disabled while `b` is enabled.
#[derive(Debug, Default, Clone)]
pub struct RequirementGraph {
    graph: DiGraphMap<usize, ()>,
}

impl RequirementGraph {
    /// Creates an empty graph sized for `capacity` entries.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            graph: DiGraphMap::with_capacity(capacity, capacity),
        }
    }

    /// Record that `dependent` requires `prerequisite`.
    ///
    /// Returns `true` if the edge is new. Self edges are never stored.
    pub fn add_edge(&mut self, prerequisite: usize, dependent: usize) -> bool {
        if prerequisite == dependent {
            return false;
        }
        self.graph.add_edge(prerequisite, dependent, ()).is_none()
    }

    /// Remove the edge, if present.
    ///
    /// Returns `true` if an edge was removed.
    pub fn remove_edge(&mut self, prerequisite: usize, dependent: usize) -> bool {
        self.graph.remove_edge(prerequisite, dependent).is_some()
    }

    /// Remove every dependent of `prerequisite`, returning how many there
    /// were.
    pub fn clear_dependents(&mut self, prerequisite: usize) -> usize {
        let dependents: Vec<_> = self.dependents(prerequisite).collect();
        for &dependent in &dependents {
            self.graph.remove_edge(prerequisite, dependent);
        }
        dependents.len()
    }

    /// Whether `dependent` requires `prerequisite`.
    #[must_use]
    pub fn contains_edge(&self, prerequisite: usize, dependent: usize) -> bool {
        self.graph.contains_edge(prerequisite, dependent)
    }

    /// Entries that require `prerequisite`, in ascending index order.
    pub fn dependents(&self, prerequisite: usize) -> impl Iterator<Item = usize> + '_ {
        self.sorted_neighbors(prerequisite, Direction::Outgoing)
    }

    /// Entries that `dependent` requires, in ascending index order.
    pub fn prerequisites(&self, dependent: usize) -> impl Iterator<Item = usize> + '_ {
        self.sorted_neighbors(dependent, Direction::Incoming)
    }

    /// Whether anything requires `prerequisite`.
    #[must_use]
    pub fn has_dependents(&self, prerequisite: usize) -> bool {
        self.graph.contains_node(prerequisite)
            && self
                .graph
                .neighbors_directed(prerequisite, Direction::Outgoing)
                .next()
                .is_some()
    }

    /// Every prerequisite that has at least one dependent, with its
    /// dependents. Both levels are in ascending index order.
    #[must_use]
    pub fn edges(&self) -> Vec<(usize, Vec<usize>)> {
        let mut prerequisites: Vec<_> = self
            .graph
            .nodes()
            .filter(|&node| self.has_dependents(node))
            .collect();
        prerequisites.sort_unstable();

        prerequisites
            .into_iter()
            .map(|prerequisite| (prerequisite, self.dependents(prerequisite).collect()))
            .collect()
    }

    /// Number of requirement edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    fn sorted_neighbors(&self, node: usize, direction: Direction) -> std::vec::IntoIter<usize> {
        let mut neighbors: Vec<_> = if self.graph.contains_node(node) {
            self.graph.neighbors_directed(node, direction).collect()
        } else {
            Vec::new()
        };
        neighbors.sort_unstable();
        neighbors.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn self_edges_are_ignored() {
        let mut graph = RequirementGraph::default();
        assert!(!graph.add_edge(3, 3));
        assert_eq!(graph.edge_count(), 0);
        assert!(!graph.has_dependents(3));
    }

    #[test]
    fn duplicate_edges_are_stored_once() {
        let mut graph = RequirementGraph::default();
        assert!(graph.add_edge(0, 1));
        assert!(!graph.add_edge(0, 1));
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn edges_are_directed() {
        let mut graph = RequirementGraph::default();
        graph.add_edge(0, 1);

        assert!(graph.contains_edge(0, 1));
        assert!(!graph.contains_edge(1, 0));
        assert_eq!(graph.dependents(0).collect::<Vec<_>>(), vec![1]);
        assert_eq!(graph.prerequisites(1).collect::<Vec<_>>(), vec![0]);
        assert!(graph.dependents(1).next().is_none());
    }

    #[test]
    fn removing_edges_is_idempotent() {
        let mut graph = RequirementGraph::default();
        graph.add_edge(0, 1);

        assert!(graph.remove_edge(0, 1));
        assert!(!graph.remove_edge(0, 1));
        assert!(!graph.has_dependents(0));
    }

    #[test]
    fn clear_dependents_keeps_other_prerequisites() {
        let mut graph = RequirementGraph::default();
        graph.add_edge(0, 1);
        graph.add_edge(0, 2);
        graph.add_edge(3, 1);

        assert_eq!(graph.clear_dependents(0), 2);
        assert!(!graph.has_dependents(0));
        assert_eq!(graph.dependents(3).collect::<Vec<_>>(), vec![1]);
    }

    #[test]
    fn edges_only_lists_prerequisites_with_dependents() {
        let mut graph = RequirementGraph::default();
        graph.add_edge(5, 2);
        graph.add_edge(5, 0);
        graph.add_edge(1, 4);
        graph.remove_edge(1, 4);

        assert_eq!(graph.edges(), vec![(5, vec![0, 2])]);
    }

    #[test]
    fn unknown_nodes_have_no_neighbours() {
        let graph = RequirementGraph::default();
        assert!(graph.dependents(42).next().is_none());
        assert!(graph.prerequisites(42).next().is_none());
    }
}
