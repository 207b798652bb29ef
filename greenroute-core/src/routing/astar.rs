//! Single-pair least-cost search: A* with a great-circle lower-bound
//! heuristic, degrading to plain Dijkstra under health-aware profiles.

use std::collections::BinaryHeap;

use hashbrown::{HashMap, HashSet};
use petgraph::graph::NodeIndex;
use petgraph::visit::EdgeRef;

use crate::cost::edge_cost;
use crate::distance::haversine_km;
use crate::model::criteria::CostWeights;
use crate::model::network::RouteGraph;

use super::state::State;

/// Deflation of the heuristic scale. Stated edge lengths may round below
/// the geodesic between their endpoints, so the bound is backed off to
/// keep the estimate a true lower bound.
const HEURISTIC_SAFETY: f64 = 0.9;

/// Immutable masked view of the graph for spur searches: banned nodes and
/// banned directed edges are skipped during relaxation, with no mutation of
/// the underlying graph.
#[derive(Debug, Default)]
pub(crate) struct GraphMask {
    banned_nodes: HashSet<NodeIndex>,
    banned_edges: HashSet<(NodeIndex, NodeIndex)>,
}

impl GraphMask {
    pub(crate) fn none() -> Self {
        Self::default()
    }

    pub(crate) fn ban_node(&mut self, node: NodeIndex) {
        self.banned_nodes.insert(node);
    }

    pub(crate) fn ban_edge(&mut self, from: NodeIndex, to: NodeIndex) {
        self.banned_edges.insert((from, to));
    }

    fn allows_node(&self, node: NodeIndex) -> bool {
        !self.banned_nodes.contains(&node)
    }

    fn allows_edge(&self, from: NodeIndex, to: NodeIndex) -> bool {
        !self.banned_edges.contains(&(from, to))
    }
}

/// Per-kilometer lower bound on remaining cost.
///
/// Only the distance and time terms admit a geometric lower bound; the
/// other additive terms are non-negative so dropping them keeps the
/// heuristic admissible. The time part divides by the graph's own maximum
/// resolved speed, since edge speeds are caller-supplied and unbounded. A
/// health-aware profile subtracts from edge costs, which can undercut any
/// distance-based bound, so it falls back to 0 (plain Dijkstra).
fn heuristic_scale(weights: &CostWeights, max_speed_kmh: f64) -> f64 {
    if weights.is_health_aware() {
        0.0
    } else {
        (weights.distance + weights.time * 60.0 / max_speed_kmh) * HEURISTIC_SAFETY
    }
}

/// Least-cost loopless path from `start` to `goal` under `weights`,
/// honoring `mask`. Returns the node sequence and its total cost, or
/// `None` when the goal is unreachable (an expected network condition,
/// not an error).
pub(crate) fn shortest_path(
    graph: &RouteGraph,
    weights: &CostWeights,
    start: NodeIndex,
    goal: NodeIndex,
    mask: &GraphMask,
) -> Option<(Vec<NodeIndex>, f64)> {
    if start == goal {
        return Some((vec![start], 0.0));
    }
    if !mask.allows_node(start) || !mask.allows_node(goal) {
        return None;
    }

    let mode = graph.mode;
    let h_scale = heuristic_scale(weights, graph.max_speed_kmh());
    let goal_point = graph.node(goal).geometry;
    let heuristic = |node: NodeIndex| -> f64 {
        if h_scale == 0.0 {
            0.0
        } else {
            h_scale * haversine_km(graph.node(node).geometry, goal_point)
        }
    };

    let estimated = graph.node_count().min(1024);
    let mut g_scores: HashMap<NodeIndex, f64> = HashMap::with_capacity(estimated);
    let mut predecessors: HashMap<NodeIndex, NodeIndex> = HashMap::with_capacity(estimated);
    let mut heap = BinaryHeap::with_capacity(estimated / 4);

    g_scores.insert(start, 0.0);
    heap.push(State {
        f_score: heuristic(start),
        g_score: 0.0,
        node: start,
        tie: graph.node_id(start),
    });

    while let Some(State { g_score, node, .. }) = heap.pop() {
        if node == goal {
            break;
        }

        // Stale heap entry: a cheaper path to this node was already found.
        if g_scores.get(&node).is_some_and(|&best| g_score > best) {
            continue;
        }

        for edge in graph.graph.edges(node) {
            let next = edge.target();
            if !mask.allows_node(next) || !mask.allows_edge(node, next) {
                continue;
            }

            let next_g = g_score + edge_cost(edge.weight(), mode, weights);
            match g_scores.entry(next) {
                hashbrown::hash_map::Entry::Vacant(entry) => {
                    entry.insert(next_g);
                    predecessors.insert(next, node);
                    heap.push(State {
                        f_score: next_g + heuristic(next),
                        g_score: next_g,
                        node: next,
                        tie: graph.node_id(next),
                    });
                }
                hashbrown::hash_map::Entry::Occupied(mut entry) => {
                    // Relax only on strict improvement.
                    if next_g < *entry.get() {
                        *entry.get_mut() = next_g;
                        predecessors.insert(next, node);
                        heap.push(State {
                            f_score: next_g + heuristic(next),
                            g_score: next_g,
                            node: next,
                            tie: graph.node_id(next),
                        });
                    }
                }
            }
        }
    }

    let total_cost = *g_scores.get(&goal)?;
    if !predecessors.contains_key(&goal) {
        return None;
    }

    let mut path = vec![goal];
    let mut current = goal;
    while current != start {
        current = *predecessors.get(&current)?;
        path.push(current);
    }
    path.reverse();
    Some((path, total_cost))
}

/// Exact cost of a known node path, re-summing the same per-edge costs the
/// search uses. Returns `None` if consecutive nodes are not adjacent.
pub(crate) fn path_cost(
    graph: &RouteGraph,
    weights: &CostWeights,
    path: &[NodeIndex],
) -> Option<f64> {
    let mode = graph.mode;
    let mut total = 0.0;
    for pair in path.windows(2) {
        let edge_idx =
            graph.cheapest_edge_between(pair[0], pair[1], |e| edge_cost(e, mode, weights))?;
        total += edge_cost(&graph.graph[edge_idx], mode, weights);
    }
    Some(total)
}
