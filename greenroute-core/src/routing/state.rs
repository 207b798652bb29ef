use std::cmp::Ordering;

use petgraph::graph::NodeIndex;

use crate::NodeId;

#[derive(Copy, Clone, PartialEq)]
pub(super) struct State {
    /// Priority: tentative cost plus heuristic.
    pub(super) f_score: f64,
    /// Tentative cost from the start, for stale-entry detection.
    pub(super) g_score: f64,
    pub(super) node: NodeIndex,
    /// External node id, the deterministic tie-break.
    pub(super) tie: NodeId,
}

impl Eq for State {}

impl Ord for State {
    fn cmp(&self, other: &Self) -> Ordering {
        // Min-heap by f-score (reversed from standard Rust BinaryHeap),
        // ties broken by node id so identical inputs pop identically.
        other
            .f_score
            .total_cmp(&self.f_score)
            .then_with(|| other.tie.cmp(&self.tie))
    }
}

impl PartialOrd for State {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
