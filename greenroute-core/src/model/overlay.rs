//! Per-call overlay snapshots: simulated traffic incidents and AQI readings.
//!
//! Overlays are read-only borrows for the duration of one routing call;
//! the engine never mutates them.

use geo::Point;
use hashbrown::HashMap;
use log::warn;

use crate::NodeId;

/// Default radius of influence of an AQI reading, km.
pub const DEFAULT_READING_RADIUS_KM: f64 = 2.0;

/// Canonical overlay key for the directed segment `from -> to`.
pub fn segment_key(from: NodeId, to: NodeId) -> String {
    format!("{from}-{to}")
}

/// A simulated traffic incident pinned to one segment.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrafficImpact {
    /// Overrides the edge's volume/capacity ratio while active.
    pub vc_override: Option<f64>,
    /// Removes the segment (both directions) from the graph entirely.
    pub is_blocked: bool,
    /// Scales the travel-time term of the cost.
    pub travel_time_multiplier: Option<f64>,
}

/// Active traffic impacts keyed by `"from-to"`.
///
/// At most one impact is honored per segment: the forward key wins over the
/// reverse one, and inserting twice under the same key keeps the newer
/// impact.
#[derive(Debug, Clone, Default)]
pub struct TrafficImpacts {
    map: HashMap<String, TrafficImpact>,
}

impl TrafficImpacts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap a caller-supplied map already keyed by `"from-to"` strings.
    pub fn from_keyed(map: HashMap<String, TrafficImpact>) -> Self {
        Self { map }
    }

    pub fn insert(&mut self, from: NodeId, to: NodeId, impact: TrafficImpact) {
        self.map.insert(segment_key(from, to), impact);
    }

    /// Look up the impact for a segment, forward key first, then reverse.
    pub fn get(&self, from: NodeId, to: NodeId) -> Option<&TrafficImpact> {
        self.map
            .get(segment_key(from, to).as_str())
            .or_else(|| self.map.get(segment_key(to, from).as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }
}

/// One air-quality reading, real or simulated.
#[derive(Debug, Clone, PartialEq)]
pub struct AqiReading {
    /// Reading location, `x = lon`, `y = lat`.
    pub location: Point<f64>,
    /// AQI value; preferred over `pm25` when both are present.
    pub aqi: Option<f64>,
    /// PM2.5 concentration in µg/m³, used when `aqi` is absent.
    pub pm25: Option<f64>,
    /// Radius of influence for the geometry-aware exposure method, km.
    pub radius_km: f64,
}

impl AqiReading {
    pub fn new(location: Point<f64>, aqi: f64) -> Self {
        Self {
            location,
            aqi: Some(aqi),
            pm25: None,
            radius_km: DEFAULT_READING_RADIUS_KM,
        }
    }

    /// Pollution magnitude of the reading: `aqi` if present, else `pm25`.
    pub fn magnitude(&self) -> Option<f64> {
        self.aqi.or(self.pm25)
    }

    /// A reading with malformed coordinates or no magnitude is skipped,
    /// never an abort of the whole computation.
    pub fn is_usable(&self) -> bool {
        let ok = self.location.x().is_finite()
            && self.location.y().is_finite()
            && self.magnitude().is_some_and(f64::is_finite);
        if !ok {
            warn!("skipping malformed AQI reading at {:?}", self.location);
        }
        ok
    }
}

/// Everything a call may overlay on top of the static network tables.
#[derive(Debug, Clone, Default)]
pub struct OverlaySnapshot {
    pub impacts: TrafficImpacts,
    pub readings: Vec<AqiReading>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::point;

    #[test]
    fn forward_key_wins_over_reverse() {
        let mut impacts = TrafficImpacts::new();
        impacts.insert(
            1,
            2,
            TrafficImpact {
                vc_override: Some(2.0),
                ..TrafficImpact::default()
            },
        );
        impacts.insert(
            2,
            1,
            TrafficImpact {
                vc_override: Some(0.5),
                ..TrafficImpact::default()
            },
        );

        assert_eq!(impacts.get(1, 2).unwrap().vc_override, Some(2.0));
        assert_eq!(impacts.get(2, 1).unwrap().vc_override, Some(0.5));
        // A segment with only a reverse-keyed impact still resolves.
        assert!(impacts.get(3, 4).is_none());
    }

    #[test]
    fn reading_magnitude_prefers_aqi() {
        let mut reading = AqiReading::new(point!(x: 0.0, y: 0.0), 120.0);
        reading.pm25 = Some(35.0);
        assert_eq!(reading.magnitude(), Some(120.0));

        reading.aqi = None;
        assert_eq!(reading.magnitude(), Some(35.0));
    }

    #[test]
    fn malformed_reading_is_unusable() {
        let reading = AqiReading::new(point!(x: f64::NAN, y: 0.0), 50.0);
        assert!(!reading.is_usable());

        let empty = AqiReading {
            aqi: None,
            pm25: None,
            ..AqiReading::new(point!(x: 0.0, y: 0.0), 0.0)
        };
        assert!(!empty.is_usable());
    }
}
