//! Multi-criteria route finding over a road/path network with live
//! traffic and air-quality overlays.
//!
//! Given node/edge tables and per-call overlay snapshots (simulated traffic
//! incidents, simulated and real AQI readings), the engine builds a
//! mode-filtered graph, runs an A* / Yen's-algorithm search under a
//! user-selected cost profile, and returns ranked [`Route`]s with
//! per-segment metrics. For the health-oriented profile each route is
//! post-processed into per-group transport mode assignments.
//!
//! Units at the API boundary: distances in kilometers, travel times in
//! minutes, speeds in km/h, pollution in the readings' native units (AQI or
//! µg/m³). Coordinates are `[longitude, latitude]` (`x = lon`, `y = lat`),
//! matching the GeoJSON convention.
//!
//! One call is one pure computation over its inputs: the engine never
//! mutates the supplied tables or overlays, so independent calls may run
//! concurrently from separate threads.

pub mod cost;
pub mod distance;
pub mod engine;
pub mod error;
pub mod eval;
pub mod health;
pub mod model;
pub mod pollution;
pub mod prelude;
pub mod routing;

pub use engine::{RouteQuery, find_route, find_routes};
pub use error::Error;
pub use eval::{Route, RouteMetrics, RouteSegment, RouteSet};
pub use model::{
    AqiReading, CostWeights, Criteria, EdgeRecord, NetworkData, Node, OverlaySnapshot,
    RouteGraph, TrafficImpact, TrafficImpacts, TravelMode,
};
pub use pollution::{ExposureField, ExposureMethod};

/// External (stable) identifier of a network node.
pub type NodeId = i64;
