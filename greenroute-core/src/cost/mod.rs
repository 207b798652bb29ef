//! Edge cost model
//!
//! One pure function of the edge record, the travel mode and the weight
//! vector, used identically during search and during post-hoc re-scoring,
//! so a route's `criteria_costs` are exactly what the search would have
//! produced under each profile.

use crate::health::health_score;
use crate::model::mode::{SPEED_FLOOR_KMH, TravelMode};
use crate::model::network::{EdgeRecord, GraphEdge};
use crate::model::overlay::TrafficImpact;
use crate::model::criteria::CostWeights;

/// Lower bound on any edge cost. Keeps every cost strictly positive so
/// Dijkstra's relaxation invariant holds even under health discounts.
pub const MIN_EDGE_COST: f64 = 0.001;

/// Clamp range of the volume/capacity ratio: outliers must not dominate.
pub const VC_MIN: f64 = 0.01;
pub const VC_MAX: f64 = 3.0;

/// Ceiling used to normalize AQI exposure in blended profiles.
pub const AQI_CEILING: f64 = 500.0;

/// Resolve the travel speed for `mode` on `record`, km/h.
///
/// Named fallback policy: observed per-mode speed, then the edge's generic
/// free-flow speed, then the mode default, floored at [`SPEED_FLOOR_KMH`].
pub fn resolve_speed(record: &EdgeRecord, mode: TravelMode) -> f64 {
    record
        .mode_speeds
        .get(mode)
        .or(record.free_flow_kmh)
        .unwrap_or(mode.profile().default_speed_kmh)
        .max(SPEED_FLOOR_KMH)
}

/// Resolve the congestion term: an active impact's override first, then the
/// record's VC ratio, then volume/capacity, clamped to `[VC_MIN, VC_MAX]`.
pub fn resolve_vc(record: &EdgeRecord, impact: Option<&TrafficImpact>) -> f64 {
    let raw = impact
        .and_then(|i| i.vc_override)
        .or(record.vc_ratio)
        .or_else(|| match (record.volume, record.capacity) {
            (Some(volume), Some(capacity)) if capacity > 0.0 => Some(volume / capacity),
            _ => None,
        })
        .unwrap_or(VC_MIN);
    raw.clamp(VC_MIN, VC_MAX)
}

/// Travel time along a graph edge, minutes.
pub fn travel_time_min(edge: &GraphEdge) -> f64 {
    edge.length_km / edge.speed_kmh * 60.0 * edge.time_multiplier
}

/// Scalar cost of one graph edge under `weights`, strictly positive.
pub fn edge_cost(edge: &GraphEdge, mode: TravelMode, weights: &CostWeights) -> f64 {
    let emission = mode.profile().emission_per_km * edge.length_km;
    let health = health_score(mode, edge.length_km, edge.exposure);
    blended_cost(
        weights,
        travel_time_min(edge),
        edge.length_km,
        edge.vc,
        edge.exposure,
        emission,
        health,
    )
}

/// Weighted blend of the six terms. Health is the only subtractive term;
/// the result is floored at [`MIN_EDGE_COST`].
pub fn blended_cost(
    weights: &CostWeights,
    time_min: f64,
    distance_km: f64,
    vc: f64,
    exposure: f64,
    emission: f64,
    health: f64,
) -> f64 {
    let pollution = if weights.normalize_pollution {
        exposure / AQI_CEILING
    } else {
        exposure
    };

    let cost = weights.time * time_min
        + weights.distance * distance_km
        + weights.traffic * vc
        + weights.pollution * pollution
        + weights.emission * emission
        - weights.health * health;

    cost.max(MIN_EDGE_COST)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::criteria::Criteria;
    use geo::line_string;

    fn edge(length_km: f64, speed_kmh: f64, vc: f64, exposure: f64) -> GraphEdge {
        GraphEdge {
            from: 1,
            to: 2,
            length_km,
            speed_kmh,
            vc,
            time_multiplier: 1.0,
            exposure,
            geometry: line_string![(x: 0.0, y: 0.0), (x: 0.01, y: 0.0)],
            link_id: None,
        }
    }

    #[test]
    fn speed_resolution_order() {
        let mut record = EdgeRecord::new(1, 2, 1.0);
        assert_eq!(
            resolve_speed(&record, TravelMode::Driving),
            TravelMode::Driving.profile().default_speed_kmh
        );

        record.free_flow_kmh = Some(60.0);
        assert_eq!(resolve_speed(&record, TravelMode::Driving), 60.0);

        record.mode_speeds.driving = Some(25.0);
        assert_eq!(resolve_speed(&record, TravelMode::Driving), 25.0);

        // Floor applies last.
        record.mode_speeds.driving = Some(1.0);
        assert_eq!(resolve_speed(&record, TravelMode::Driving), SPEED_FLOOR_KMH);
    }

    #[test]
    fn vc_prefers_override_then_ratio_then_derived() {
        let mut record = EdgeRecord::new(1, 2, 1.0);
        record.volume = Some(900.0);
        record.capacity = Some(600.0);
        assert!((resolve_vc(&record, None) - 1.5).abs() < 1e-9);

        record.vc_ratio = Some(0.8);
        assert!((resolve_vc(&record, None) - 0.8).abs() < 1e-9);

        let impact = TrafficImpact {
            vc_override: Some(9.0),
            ..TrafficImpact::default()
        };
        // Override wins but is still clamped.
        assert_eq!(resolve_vc(&record, Some(&impact)), VC_MAX);
    }

    #[test]
    fn cost_strictly_positive_for_every_profile() {
        // Zero-length, zero-pollution edge with a huge health score: the
        // floor must still hold.
        let edge = edge(1e-4, 5.0, 0.01, 0.0);
        for criteria in Criteria::ALL {
            for mode in TravelMode::ALL {
                let cost = edge_cost(&edge, mode, &criteria.weights());
                assert!(cost >= MIN_EDGE_COST, "{criteria}/{mode}: {cost}");
            }
        }
    }

    #[test]
    fn fastest_cost_is_travel_time() {
        let edge = edge(10.0, 40.0, 1.0, 50.0);
        let cost = edge_cost(&edge, TravelMode::Driving, &Criteria::Fastest.weights());
        assert!((cost - 15.0).abs() < 1e-9); // 10 km at 40 km/h = 15 min
    }

    #[test]
    fn impact_multiplier_scales_time() {
        let mut e = edge(10.0, 40.0, 1.0, 0.0);
        e.time_multiplier = 2.0;
        assert!((travel_time_min(&e) - 30.0).abs() < 1e-9);
    }
}
