//! Data model for multi-criteria route finding
//!
//! Raw node/edge tables, travel modes and cost profiles, overlay snapshots
//! and the mode-filtered search graph built from all of them.

pub mod criteria;
pub mod mode;
pub mod network;
pub mod overlay;

pub use criteria::{CostWeights, Criteria};
pub use mode::{ModeProfile, SPEED_FLOOR_KMH, TravelMode};
pub use network::{EdgeRecord, GraphEdge, GraphNode, ModeSpeeds, NetworkData, Node, RouteGraph};
pub use overlay::{AqiReading, OverlaySnapshot, TrafficImpact, TrafficImpacts, segment_key};
