//! Route records and route-level evaluation
//!
//! Turns an accepted node path into a [`Route`]: per-segment metrics,
//! aggregate totals, and a re-scoring of the same route under every
//! criteria profile so callers can compare routes without re-running the
//! search.

mod to_geojson;

use std::collections::BTreeMap;

use geo::LineString;
use itertools::Itertools;
use petgraph::graph::NodeIndex;
use serde::Serialize;

use crate::NodeId;
use crate::cost::{blended_cost, edge_cost, travel_time_min};
use crate::health::{ModeGroup, health_score};
use crate::model::criteria::Criteria;
use crate::model::mode::TravelMode;
use crate::model::network::RouteGraph;

/// Walking is only suggested for routes up to this long, km.
const SUGGEST_WALK_MAX_KM: f64 = 2.0;

/// One traversed edge of a route with its computed metrics.
#[derive(Debug, Clone, Serialize)]
pub struct RouteSegment {
    pub from: NodeId,
    pub to: NodeId,
    pub link_id: Option<String>,
    pub distance_km: f64,
    pub time_min: f64,
    pub speed_kmh: f64,
    pub vc: f64,
    pub exposure: f64,
    pub emission: f64,
    pub health: f64,
    /// Cost of this segment under the search's active profile.
    pub cost: f64,
    /// Segment geometry; exported through GeoJSON, not plain serde.
    #[serde(skip)]
    pub geometry: LineString<f64>,
}

/// Aggregate metrics of one route. Pollution is the distance-weighted mean
/// exposure; the other fields are sums over segments.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct RouteMetrics {
    pub distance_km: f64,
    pub time_min: f64,
    pub pollution: f64,
    pub emission: f64,
    pub health: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Route {
    /// Ordered node ids, loopless.
    pub path: Vec<NodeId>,
    /// `segments.len() == path.len() - 1` (or both empty for no route).
    pub segments: Vec<RouteSegment>,
    pub metrics: RouteMetrics,
    /// Total cost under the search's active profile.
    pub total_cost: f64,
    /// The same route re-scored under every criteria profile.
    pub criteria_costs: BTreeMap<&'static str, f64>,
    /// Human-readable vehicle suggestion derived from the cheapest profile.
    pub suggested_mode: TravelMode,
    /// Per-group mode plan, present on healthiest-criterion routes only.
    pub mode_plan: Option<Vec<ModeGroup>>,
}

/// Result of a multi-route request: up to K routes sorted ascending by the
/// active profile's cost, plus the index of the selected best route.
#[derive(Debug, Clone, Serialize)]
pub struct RouteSet {
    pub routes: Vec<Route>,
    pub best: Option<usize>,
}

impl RouteSet {
    pub fn empty() -> Self {
        Self {
            routes: Vec::new(),
            best: None,
        }
    }

    pub fn best_route(&self) -> Option<&Route> {
        self.best.and_then(|i| self.routes.get(i))
    }
}

/// Evaluate one accepted node path into a full [`Route`] record.
pub(crate) fn evaluate_route(
    graph: &RouteGraph,
    criteria: Criteria,
    node_path: &[NodeIndex],
) -> Route {
    let mode = graph.mode;
    let weights = criteria.weights();
    let path: Vec<NodeId> = node_path.iter().map(|&idx| graph.node_id(idx)).collect();

    let mut segments = Vec::with_capacity(node_path.len().saturating_sub(1));
    for (&a, &b) in node_path.iter().tuple_windows() {
        // The search relaxes over the cheapest parallel edge; reconstruction
        // must pick the same one.
        let edge_idx = graph
            .cheapest_edge_between(a, b, |e| edge_cost(e, mode, &weights))
            .expect("adjacent path nodes are connected");
        let edge = &graph.graph[edge_idx];

        segments.push(RouteSegment {
            from: edge.from,
            to: edge.to,
            link_id: edge.link_id.clone(),
            distance_km: edge.length_km,
            time_min: travel_time_min(edge),
            speed_kmh: edge.speed_kmh,
            vc: edge.vc,
            exposure: edge.exposure,
            emission: mode.profile().emission_per_km * edge.length_km,
            health: health_score(mode, edge.length_km, edge.exposure),
            cost: edge_cost(edge, mode, &weights),
            geometry: edge.geometry.clone(),
        });
    }

    let metrics = aggregate(&segments);
    let total_cost = segments.iter().map(|s| s.cost).sum();
    let criteria_costs = criteria_costs(&segments);
    let suggested_mode = suggest_mode(&criteria_costs, metrics.distance_km);

    Route {
        path,
        segments,
        metrics,
        total_cost,
        criteria_costs,
        suggested_mode,
        mode_plan: None,
    }
}

fn aggregate(segments: &[RouteSegment]) -> RouteMetrics {
    let mut metrics = RouteMetrics::default();
    let mut weighted_exposure = 0.0;
    for segment in segments {
        metrics.distance_km += segment.distance_km;
        metrics.time_min += segment.time_min;
        metrics.emission += segment.emission;
        metrics.health += segment.health;
        weighted_exposure += segment.exposure * segment.distance_km;
    }
    if metrics.distance_km > 0.0 {
        metrics.pollution = weighted_exposure / metrics.distance_km;
    }
    metrics
}

/// Re-sum the segment costs under every profile. Uses the exact same term
/// blend as the search-time cost, so the active profile's entry equals
/// `total_cost`.
fn criteria_costs(segments: &[RouteSegment]) -> BTreeMap<&'static str, f64> {
    Criteria::ALL
        .into_iter()
        .map(|criteria| {
            let weights = criteria.weights();
            let cost = segments
                .iter()
                .map(|s| {
                    blended_cost(
                        &weights,
                        s.time_min,
                        s.distance_km,
                        s.vc,
                        s.exposure,
                        s.emission,
                        s.health,
                    )
                })
                .sum();
            (criteria.key(), cost)
        })
        .collect()
}

/// Map the cheapest profile to a vehicle suggestion: emission/health
/// winners suggest active travel, everything else suggests driving.
fn suggest_mode(criteria_costs: &BTreeMap<&'static str, f64>, distance_km: f64) -> TravelMode {
    let cheapest = criteria_costs
        .iter()
        .min_by(|a, b| a.1.total_cmp(b.1))
        .map(|(key, _)| *key);

    match cheapest {
        Some("least_emission") | Some("healthiest") => {
            if distance_km <= SUGGEST_WALK_MAX_KM {
                TravelMode::Walking
            } else {
                TravelMode::Cycling
            }
        }
        Some("shortest") => TravelMode::Cycling,
        _ => TravelMode::Driving,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn costs(entries: &[(&'static str, f64)]) -> BTreeMap<&'static str, f64> {
        entries.iter().copied().collect()
    }

    #[test]
    fn suggests_walking_for_short_low_emission_routes() {
        let costs = costs(&[("least_emission", 0.1), ("fastest", 5.0)]);
        assert_eq!(suggest_mode(&costs, 1.5), TravelMode::Walking);
        assert_eq!(suggest_mode(&costs, 6.0), TravelMode::Cycling);
    }

    #[test]
    fn suggests_driving_when_time_dominates() {
        let costs = costs(&[("least_emission", 9.0), ("fastest", 1.0)]);
        assert_eq!(suggest_mode(&costs, 3.0), TravelMode::Driving);
    }
}
