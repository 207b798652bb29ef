// Re-export key components

pub use crate::engine::{RouteQuery, find_route, find_routes};
pub use crate::error::Error;
pub use crate::eval::{Route, RouteMetrics, RouteSegment, RouteSet};
pub use crate::health::{ModeGroup, assign_modes, health_score};
pub use crate::model::{
    AqiReading, CostWeights, Criteria, EdgeRecord, ModeSpeeds, NetworkData, Node,
    OverlaySnapshot, TrafficImpact, TrafficImpacts, TravelMode,
};
pub use crate::pollution::{ExposureField, ExposureMethod};

// Core scalar types
pub use crate::NodeId;
