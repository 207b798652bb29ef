//! Yen's loopless k-shortest-paths over masked graph views, with a
//! diversity filter on accepted alternatives.
//!
//! Spur searches never mutate the graph: each iteration builds a
//! [`GraphMask`] banning the root's interior nodes and the spur-node edges
//! already committed to accepted paths sharing that root.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use hashbrown::HashSet;
use log::debug;
use petgraph::graph::NodeIndex;

use crate::model::criteria::CostWeights;
use crate::model::network::RouteGraph;

use super::astar::{GraphMask, path_cost, shortest_path};

#[derive(Clone, PartialEq)]
struct Candidate {
    cost: f64,
    path: Vec<NodeIndex>,
}

impl Eq for Candidate {}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        // Min-heap by cost; ties broken by node sequence for determinism.
        other
            .cost
            .total_cmp(&self.cost)
            .then_with(|| other.path.cmp(&self.path))
    }
}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Up to `k` loopless paths from `start` to `goal`, cheapest first.
///
/// No two returned paths share a node sequence, and each alternative's
/// directed-edge overlap with every earlier accepted path stays at or below
/// `1 - min_difference`.
pub(crate) fn k_shortest_paths(
    graph: &RouteGraph,
    weights: &CostWeights,
    start: NodeIndex,
    goal: NodeIndex,
    k: usize,
    min_difference: f64,
) -> Vec<(Vec<NodeIndex>, f64)> {
    let Some(first) = shortest_path(graph, weights, start, goal, &GraphMask::none()) else {
        return Vec::new();
    };
    let mut accepted = vec![first];

    let mut candidates: BinaryHeap<Candidate> = BinaryHeap::new();
    let mut seen: HashSet<Vec<NodeIndex>> = HashSet::new();
    seen.insert(accepted[0].0.clone());

    while accepted.len() < k {
        let (prev_path, _) = accepted.last().expect("at least the first path").clone();

        for spur_idx in 0..prev_path.len().saturating_sub(1) {
            let spur_node = prev_path[spur_idx];
            let root = &prev_path[..=spur_idx];

            let mut mask = GraphMask::none();
            // Edges already taken out of the spur node by any accepted path
            // sharing this root.
            for (path, _) in &accepted {
                if path.len() > spur_idx + 1 && path[..=spur_idx] == *root {
                    mask.ban_edge(path[spur_idx], path[spur_idx + 1]);
                }
            }
            // Interior root nodes, to keep candidates loopless.
            for &node in &root[..spur_idx] {
                mask.ban_node(node);
            }

            let Some((spur_path, _)) = shortest_path(graph, weights, spur_node, goal, &mask)
            else {
                continue;
            };

            let mut candidate_path = root[..spur_idx].to_vec();
            candidate_path.extend(spur_path);

            if !seen.insert(candidate_path.clone()) {
                continue;
            }
            // Re-sum over the unmasked graph: the definitive candidate cost.
            let Some(cost) = path_cost(graph, weights, &candidate_path) else {
                continue;
            };
            candidates.push(Candidate {
                cost,
                path: candidate_path,
            });
        }

        // Accept the best sufficiently-distinct candidate, if any remain.
        let mut found = false;
        while let Some(Candidate { cost, path }) = candidates.pop() {
            if too_similar(&path, &accepted, min_difference) {
                debug!("rejecting near-duplicate alternative (cost {cost:.3})");
                continue;
            }
            accepted.push((path, cost));
            found = true;
            break;
        }
        if !found {
            break;
        }
    }

    accepted
}

/// Directed-edge overlap check against every accepted path.
fn too_similar(
    candidate: &[NodeIndex],
    accepted: &[(Vec<NodeIndex>, f64)],
    min_difference: f64,
) -> bool {
    if candidate.len() < 2 {
        return false;
    }
    let max_overlap = 1.0 - min_difference.clamp(0.0, 1.0);

    let candidate_edges: HashSet<(NodeIndex, NodeIndex)> = candidate
        .windows(2)
        .map(|pair| (pair[0], pair[1]))
        .collect();

    accepted.iter().any(|(path, _)| {
        let shared = path
            .windows(2)
            .filter(|pair| candidate_edges.contains(&(pair[0], pair[1])))
            .count();
        shared as f64 / candidate_edges.len() as f64 > max_overlap
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::criteria::Criteria;
    use crate::model::mode::TravelMode;
    use crate::model::network::{EdgeRecord, NetworkData, Node, RouteGraph};
    use crate::model::overlay::TrafficImpacts;
    use crate::pollution::{ExposureField, ExposureMethod};

    fn build(net: &NetworkData) -> RouteGraph {
        RouteGraph::build(
            net,
            TravelMode::Driving,
            &TrafficImpacts::new(),
            &ExposureField::new(&[]),
            ExposureMethod::IdwMidpoint,
            None,
        )
    }

    /// Diamond with a shortcut: several distinct 1 -> 4 paths.
    fn diamond() -> NetworkData {
        NetworkData {
            nodes: vec![
                Node::new(1, 0.00, 0.00),
                Node::new(2, 0.01, 0.01),
                Node::new(3, 0.01, -0.01),
                Node::new(4, 0.02, 0.00),
            ],
            edges: vec![
                EdgeRecord::new(1, 2, 1.0),
                EdgeRecord::new(2, 4, 1.0),
                EdgeRecord::new(1, 3, 1.5),
                EdgeRecord::new(3, 4, 1.5),
                EdgeRecord::new(2, 3, 0.5),
            ],
        }
    }

    fn ids(graph: &RouteGraph, path: &[NodeIndex]) -> Vec<i64> {
        path.iter().map(|&i| graph.node_id(i)).collect()
    }

    #[test]
    fn returns_distinct_loopless_paths_cheapest_first() {
        let net = diamond();
        let graph = build(&net);
        let weights = Criteria::Shortest.weights();
        let paths = k_shortest_paths(
            &graph,
            &weights,
            graph.index_of(1).unwrap(),
            graph.index_of(4).unwrap(),
            3,
            0.0,
        );

        assert!(!paths.is_empty());
        assert!(paths.len() <= 3);
        assert_eq!(ids(&graph, &paths[0].0), vec![1, 2, 4]);

        // Costs ascend, node sequences are unique and loopless.
        let mut sequences = HashSet::new();
        for window in paths.windows(2) {
            assert!(window[0].1 <= window[1].1);
        }
        for (path, _) in &paths {
            assert!(sequences.insert(path.clone()), "duplicate path");
            let mut nodes = HashSet::new();
            for &node in path {
                assert!(nodes.insert(node), "loop in path");
            }
        }
    }

    #[test]
    fn never_returns_more_than_k() {
        let net = diamond();
        let graph = build(&net);
        let weights = Criteria::Shortest.weights();
        for k in 1..=4 {
            let paths = k_shortest_paths(
                &graph,
                &weights,
                graph.index_of(1).unwrap(),
                graph.index_of(4).unwrap(),
                k,
                0.0,
            );
            assert!(paths.len() <= k);
        }
    }

    #[test]
    fn high_min_difference_suppresses_similar_alternatives() {
        // A long chain with one alternative middle link: every alternative
        // reuses most of the chain, so a strict diversity requirement
        // leaves only the best path.
        let net = NetworkData {
            nodes: vec![
                Node::new(1, 0.00, 0.0),
                Node::new(2, 0.01, 0.0),
                Node::new(3, 0.02, 0.0),
                Node::new(4, 0.03, 0.0),
                Node::new(5, 0.04, 0.0),
                Node::new(6, 0.02, 0.01),
            ],
            edges: vec![
                EdgeRecord::new(1, 2, 1.0),
                EdgeRecord::new(2, 3, 1.0),
                EdgeRecord::new(3, 4, 1.0),
                EdgeRecord::new(4, 5, 1.0),
                EdgeRecord::new(2, 6, 1.2),
                EdgeRecord::new(6, 4, 1.2),
            ],
        };
        let graph = build(&net);
        let weights = Criteria::Shortest.weights();

        let strict = k_shortest_paths(
            &graph,
            &weights,
            graph.index_of(1).unwrap(),
            graph.index_of(5).unwrap(),
            3,
            0.9,
        );
        assert_eq!(strict.len(), 1);

        let relaxed = k_shortest_paths(
            &graph,
            &weights,
            graph.index_of(1).unwrap(),
            graph.index_of(5).unwrap(),
            3,
            0.2,
        );
        assert!(relaxed.len() > 1);
    }

    #[test]
    fn degenerate_start_equals_goal() {
        let net = diamond();
        let graph = build(&net);
        let weights = Criteria::Fastest.weights();
        let a = graph.index_of(1).unwrap();
        let paths = k_shortest_paths(&graph, &weights, a, a, 3, 0.3);
        assert_eq!(paths.len(), 1);
        assert_eq!(paths[0].0, vec![a]);
        assert_eq!(paths[0].1, 0.0);
    }
}
