//! Raw network tables and the mode-filtered search graph.
//!
//! [`NetworkData`] is the caller-supplied node/edge table pair; how it is
//! persisted or ingested is out of scope here. [`RouteGraph::build`] derives
//! a per-call petgraph `DiGraph` from it: a pure function of the tables, the
//! requested travel mode and the overlay snapshot, which never mutates its
//! inputs (reverse edges are cloned, with reversed geometry).

use geo::{LineString, Point, line_string};
use hashbrown::{HashMap, HashSet};
use log::{debug, info, trace};
use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;
use rayon::prelude::*;

use crate::NodeId;
use crate::cost::{resolve_speed, resolve_vc};
use crate::model::mode::{SPEED_FLOOR_KMH, TravelMode};
use crate::model::overlay::TrafficImpacts;
use crate::pollution::{ExposureField, ExposureMethod};

/// Degenerate edge lengths are clamped up to this, km.
pub const MIN_EDGE_LENGTH_KM: f64 = 1e-4;

/// One row of the node table.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: NodeId,
    /// Longitude, degrees.
    pub lon: f64,
    /// Latitude, degrees.
    pub lat: f64,
}

impl Node {
    pub fn new(id: NodeId, lon: f64, lat: f64) -> Self {
        Self { id, lon, lat }
    }

    pub fn point(&self) -> Point<f64> {
        Point::new(self.lon, self.lat)
    }
}

/// Observed per-mode speeds on an edge, km/h. Any field may be absent;
/// the resolution order (observed → free-flow → mode default → floor) is
/// the cost model's named policy.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ModeSpeeds {
    pub walking: Option<f64>,
    pub cycling: Option<f64>,
    pub motorcycle: Option<f64>,
    pub driving: Option<f64>,
}

impl ModeSpeeds {
    pub fn get(&self, mode: TravelMode) -> Option<f64> {
        match mode {
            TravelMode::Walking => self.walking,
            TravelMode::Cycling => self.cycling,
            TravelMode::Motorcycle => self.motorcycle,
            TravelMode::Driving => self.driving,
        }
    }
}

/// One row of the edge table.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeRecord {
    pub from_node: NodeId,
    pub to_node: NodeId,
    pub length_km: f64,
    /// Comma-separated mode names ("car,bike"); empty means open to all.
    pub mode_tag: String,
    pub mode_speeds: ModeSpeeds,
    /// Generic free-flow speed, km/h.
    pub free_flow_kmh: Option<f64>,
    pub capacity: Option<f64>,
    pub volume: Option<f64>,
    /// Preferred congestion signal when present; otherwise derived as
    /// volume / capacity.
    pub vc_ratio: Option<f64>,
    /// Scalar exposure proxy used when no AQI reading covers the edge.
    pub pollution_factor: f64,
    /// Full geometry; synthesized from the endpoints when absent.
    pub geometry: Option<LineString<f64>>,
    /// External identifier for display and debugging.
    pub link_id: Option<String>,
    pub one_way: bool,
}

impl EdgeRecord {
    pub fn new(from_node: NodeId, to_node: NodeId, length_km: f64) -> Self {
        Self {
            from_node,
            to_node,
            length_km,
            mode_tag: String::new(),
            mode_speeds: ModeSpeeds::default(),
            free_flow_kmh: None,
            capacity: None,
            volume: None,
            vc_ratio: None,
            pollution_factor: 0.05,
            geometry: None,
            link_id: None,
            one_way: false,
        }
    }

    /// Whether the edge's mode tag admits `mode`. An untagged edge is open
    /// to every mode.
    pub fn allows(&self, mode: TravelMode) -> bool {
        if self.mode_tag.trim().is_empty() {
            return true;
        }
        self.mode_tag.split(',').any(|token| mode.matches_tag(token))
    }
}

/// Caller-supplied network tables. Immutable for the duration of a call.
#[derive(Debug, Clone, Default)]
pub struct NetworkData {
    pub nodes: Vec<Node>,
    pub edges: Vec<EdgeRecord>,
}

/// Node payload of the search graph.
#[derive(Debug, Clone)]
pub struct GraphNode {
    pub id: NodeId,
    pub geometry: Point<f64>,
}

/// Directed edge payload of the search graph, with all per-edge inputs of
/// the cost model resolved at build time.
#[derive(Debug, Clone)]
pub struct GraphEdge {
    pub from: NodeId,
    pub to: NodeId,
    pub length_km: f64,
    /// Resolved travel speed for the graph's mode, km/h (floored).
    pub speed_kmh: f64,
    /// Clamped volume/capacity ratio, with any impact override applied.
    pub vc: f64,
    /// Travel-time multiplier from an active impact, 1.0 otherwise.
    pub time_multiplier: f64,
    /// Interpolated pollution exposure, or the edge's own factor when no
    /// reading covers it.
    pub exposure: f64,
    pub geometry: LineString<f64>,
    pub link_id: Option<String>,
}

/// Mode-filtered, overlay-adjusted adjacency structure for one call.
#[derive(Debug)]
pub struct RouteGraph {
    pub graph: DiGraph<GraphNode, GraphEdge>,
    node_index: HashMap<NodeId, NodeIndex>,
    pub mode: TravelMode,
    /// Largest resolved edge speed in the graph, km/h. Upper-bounds any
    /// travel-time lower bound derived from geometry.
    max_speed_kmh: f64,
}

impl RouteGraph {
    /// Build the search graph.
    ///
    /// Blocked impacts remove a segment in both directions before ordinary
    /// admissibility is consulted. Edges touching a node outside
    /// `valid_nodes` (or absent from the node table) are dropped silently.
    pub fn build(
        net: &NetworkData,
        mode: TravelMode,
        impacts: &TrafficImpacts,
        exposure: &ExposureField,
        method: ExposureMethod,
        valid_nodes: Option<&HashSet<NodeId>>,
    ) -> Self {
        let mut graph = DiGraph::with_capacity(net.nodes.len(), net.edges.len() * 2);
        let mut node_index = HashMap::with_capacity(net.nodes.len());
        let mut node_lookup: HashMap<NodeId, (NodeIndex, Point<f64>)> =
            HashMap::with_capacity(net.nodes.len());

        for node in &net.nodes {
            if valid_nodes.is_some_and(|valid| !valid.contains(&node.id)) {
                continue;
            }
            let idx = graph.add_node(GraphNode {
                id: node.id,
                geometry: node.point(),
            });
            node_index.insert(node.id, idx);
            node_lookup.insert(node.id, (idx, node.point()));
        }

        // Resolve admissibility, congestion and exposure per record in a
        // parallel pre-pass; insertion stays sequential and deterministic.
        let prepared: Vec<Option<PreparedEdge>> = net
            .edges
            .par_iter()
            .map(|record| prepare_edge(record, mode, impacts, exposure, method, &node_lookup))
            .collect();

        let mut dropped = 0usize;
        let mut max_speed_kmh = SPEED_FLOOR_KMH;
        for (record, prepared) in net.edges.iter().zip(prepared) {
            let Some(edge) = prepared else {
                dropped += 1;
                trace!(
                    "dropping edge {} -> {} for mode {mode}",
                    record.from_node, record.to_node
                );
                continue;
            };
            max_speed_kmh = max_speed_kmh.max(edge.forward.speed_kmh);
            graph.add_edge(edge.from_idx, edge.to_idx, edge.forward);
            if let Some(reverse) = edge.reverse {
                graph.add_edge(edge.to_idx, edge.from_idx, reverse);
            }
        }

        info!(
            "built {mode} graph: {} nodes, {} directed edges ({dropped} records dropped)",
            graph.node_count(),
            graph.edge_count()
        );

        Self {
            graph,
            node_index,
            mode,
            max_speed_kmh,
        }
    }

    /// Largest resolved edge speed present in the graph, km/h.
    pub fn max_speed_kmh(&self) -> f64 {
        self.max_speed_kmh
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Graph index of an external node id.
    pub fn index_of(&self, id: NodeId) -> Option<NodeIndex> {
        self.node_index.get(&id).copied()
    }

    pub fn node(&self, idx: NodeIndex) -> &GraphNode {
        &self.graph[idx]
    }

    pub fn node_id(&self, idx: NodeIndex) -> NodeId {
        self.graph[idx].id
    }

    /// Cheapest directed edge between two adjacent nodes under `cost_of`.
    /// Parallel edges are legal in the table; search relaxation always uses
    /// the cheapest one, so reconstruction must too.
    pub fn cheapest_edge_between(
        &self,
        from: NodeIndex,
        to: NodeIndex,
        mut cost_of: impl FnMut(&GraphEdge) -> f64,
    ) -> Option<EdgeIndex> {
        self.graph
            .edges_connecting(from, to)
            .min_by(|a, b| cost_of(a.weight()).total_cmp(&cost_of(b.weight())))
            .map(|edge| edge.id())
    }
}

struct PreparedEdge {
    from_idx: NodeIndex,
    to_idx: NodeIndex,
    forward: GraphEdge,
    reverse: Option<GraphEdge>,
}

fn prepare_edge(
    record: &EdgeRecord,
    mode: TravelMode,
    impacts: &TrafficImpacts,
    exposure: &ExposureField,
    method: ExposureMethod,
    node_lookup: &HashMap<NodeId, (NodeIndex, Point<f64>)>,
) -> Option<PreparedEdge> {
    let &(from_idx, from_point) = node_lookup.get(&record.from_node)?;
    let &(to_idx, to_point) = node_lookup.get(&record.to_node)?;

    let impact = impacts.get(record.from_node, record.to_node);
    // Blocking wins over everything else, in both directions.
    if impact.is_some_and(|i| i.is_blocked) {
        debug!(
            "segment {} -> {} blocked by simulated impact",
            record.from_node, record.to_node
        );
        return None;
    }

    if !record.allows(mode) {
        return None;
    }

    let geometry = record
        .geometry
        .clone()
        .filter(|line| line.0.len() >= 2)
        .unwrap_or_else(|| {
            // Synthesized from the endpoint coordinates.
            line_string![
                (x: from_point.x(), y: from_point.y()),
                (x: to_point.x(), y: to_point.y()),
            ]
        });

    let edge_exposure = exposure
        .exposure_for_edge(&geometry, method)
        .unwrap_or(record.pollution_factor);

    let forward = GraphEdge {
        from: record.from_node,
        to: record.to_node,
        length_km: record.length_km.max(MIN_EDGE_LENGTH_KM),
        speed_kmh: resolve_speed(record, mode),
        vc: resolve_vc(record, impact),
        time_multiplier: impact
            .and_then(|i| i.travel_time_multiplier)
            .unwrap_or(1.0),
        exposure: edge_exposure,
        geometry,
        link_id: record.link_id.clone(),
    };

    let reverse = (!record.one_way).then(|| {
        let mut reverse = forward.clone();
        reverse.from = forward.to;
        reverse.to = forward.from;
        reverse.geometry = LineString::from(
            forward.geometry.0.iter().rev().copied().collect::<Vec<_>>(),
        );
        reverse
    });

    Some(PreparedEdge {
        from_idx,
        to_idx,
        forward,
        reverse,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::overlay::TrafficImpact;

    fn tiny_network() -> NetworkData {
        NetworkData {
            nodes: vec![
                Node::new(1, 0.00, 0.00),
                Node::new(2, 0.01, 0.00),
                Node::new(3, 0.02, 0.00),
            ],
            edges: vec![
                EdgeRecord::new(1, 2, 1.0),
                EdgeRecord {
                    mode_tag: "bike".into(),
                    ..EdgeRecord::new(2, 3, 1.0)
                },
            ],
        }
    }

    fn build(
        net: &NetworkData,
        mode: TravelMode,
        impacts: &TrafficImpacts,
    ) -> RouteGraph {
        RouteGraph::build(
            net,
            mode,
            impacts,
            &ExposureField::new(&[]),
            ExposureMethod::IdwMidpoint,
            None,
        )
    }

    #[test]
    fn untagged_edge_open_bike_edge_closed_to_driving() {
        let net = tiny_network();
        let graph = build(&net, TravelMode::Driving, &TrafficImpacts::new());
        // Only 1<->2 survives, as a forward/reverse pair.
        assert_eq!(graph.edge_count(), 2);

        let graph = build(&net, TravelMode::Cycling, &TrafficImpacts::new());
        assert_eq!(graph.edge_count(), 4);
    }

    #[test]
    fn blocked_impact_removes_both_directions() {
        let net = tiny_network();
        let mut impacts = TrafficImpacts::new();
        impacts.insert(
            2,
            1, // reverse key must still block 1 -> 2
            TrafficImpact {
                is_blocked: true,
                ..TrafficImpact::default()
            },
        );
        let graph = build(&net, TravelMode::Driving, &impacts);
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn edge_with_unknown_endpoint_dropped_silently() {
        let mut net = tiny_network();
        net.edges.push(EdgeRecord::new(1, 99, 1.0));
        let graph = build(&net, TravelMode::Driving, &TrafficImpacts::new());
        assert_eq!(graph.edge_count(), 2);
    }

    #[test]
    fn valid_node_set_filters_edges() {
        let net = tiny_network();
        let valid: HashSet<NodeId> = [2, 3].into_iter().collect();
        let graph = RouteGraph::build(
            &net,
            TravelMode::Cycling,
            &TrafficImpacts::new(),
            &ExposureField::new(&[]),
            ExposureMethod::IdwMidpoint,
            Some(&valid),
        );
        // Node 1 is out of bounds, so only 2<->3 remains.
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.edge_count(), 2);
        assert!(graph.index_of(1).is_none());
    }

    #[test]
    fn reverse_edge_has_reversed_geometry() {
        let net = tiny_network();
        let graph = build(&net, TravelMode::Driving, &TrafficImpacts::new());
        let a = graph.index_of(1).unwrap();
        let b = graph.index_of(2).unwrap();

        let forward = &graph.graph[graph.graph.find_edge(a, b).unwrap()];
        let reverse = &graph.graph[graph.graph.find_edge(b, a).unwrap()];
        assert_eq!(forward.geometry.0.first(), reverse.geometry.0.last());
        assert_eq!(forward.geometry.0.last(), reverse.geometry.0.first());
    }

    #[test]
    fn one_way_edge_gets_no_reverse() {
        let mut net = tiny_network();
        net.edges[0].one_way = true;
        let graph = build(&net, TravelMode::Driving, &TrafficImpacts::new());
        let a = graph.index_of(1).unwrap();
        let b = graph.index_of(2).unwrap();
        assert!(graph.graph.find_edge(a, b).is_some());
        assert!(graph.graph.find_edge(b, a).is_none());
    }

    #[test]
    fn max_speed_tracks_fastest_resolved_edge() {
        let mut net = tiny_network();
        net.edges[0].free_flow_kmh = Some(130.0);
        let graph = build(&net, TravelMode::Driving, &TrafficImpacts::new());
        assert_eq!(graph.max_speed_kmh(), 130.0);
    }

    #[test]
    fn degenerate_length_clamped() {
        let mut net = tiny_network();
        net.edges[0].length_km = 0.0;
        let graph = build(&net, TravelMode::Driving, &TrafficImpacts::new());
        let a = graph.index_of(1).unwrap();
        let b = graph.index_of(2).unwrap();
        let edge = &graph.graph[graph.graph.find_edge(a, b).unwrap()];
        assert!(edge.length_km >= MIN_EDGE_LENGTH_KM);
    }
}
