//! Pollution exposure estimation
//!
//! Interpolates AQI readings onto network geometry. The default method
//! samples the edge midpoint with inverse-distance weighting over all
//! readings within a fixed cutoff; the alternate method measures each
//! reading's distance to the edge's full line geometry and averages the
//! readings whose own radius covers the edge.
//!
//! Readings are indexed in an R-tree so the per-edge radius query is not a
//! linear scan over the whole reading list.

use geo::{LineString, Point};
use log::debug;
use rstar::{AABB, PointDistance, RTree, RTreeObject};
use serde::{Deserialize, Serialize};

use crate::distance::{haversine_km, line_midpoint, point_to_line_km};
use crate::model::AqiReading;

/// Readings farther than this from the sampled point never contribute.
pub const EXPOSURE_CUTOFF_KM: f64 = 5.0;

/// IDW exponent: weight = 1 / (distance_m + 1)^2.
const IDW_POWER: i32 = 2;

/// Approximate kilometers per degree of latitude, used only to size the
/// R-tree query envelope (candidates are re-checked with exact distances).
const KM_PER_DEGREE: f64 = 111.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExposureMethod {
    /// IDW over readings within [`EXPOSURE_CUTOFF_KM`] of the edge midpoint.
    #[default]
    IdwMidpoint,
    /// Unweighted mean of readings whose own radius reaches the edge's
    /// line geometry.
    GeometryRadius,
}

#[derive(Debug, Clone)]
struct ReadingEntry {
    position: [f64; 2], // [lon, lat]
    value: f64,
    radius_km: f64,
}

impl RTreeObject for ReadingEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.position)
    }
}

impl PointDistance for ReadingEntry {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dx = self.position[0] - point[0];
        let dy = self.position[1] - point[1];
        dx * dx + dy * dy
    }
}

/// Immutable snapshot of all usable AQI readings for one routing call.
#[derive(Debug)]
pub struct ExposureField {
    tree: RTree<ReadingEntry>,
    /// Largest per-reading radius, bounds the envelope of geometry queries.
    max_radius_km: f64,
}

impl ExposureField {
    /// Index the usable readings; malformed ones are skipped, not fatal.
    pub fn new(readings: &[AqiReading]) -> Self {
        let entries: Vec<ReadingEntry> = readings
            .iter()
            .filter(|r| r.is_usable())
            .map(|r| ReadingEntry {
                position: [r.location.x(), r.location.y()],
                value: r.magnitude().unwrap_or_default(),
                radius_km: r.radius_km,
            })
            .collect();

        if entries.len() < readings.len() {
            debug!(
                "exposure field: indexed {} of {} readings",
                entries.len(),
                readings.len()
            );
        }

        let max_radius_km = entries
            .iter()
            .map(|e| e.radius_km)
            .fold(0.0_f64, f64::max);

        Self {
            tree: RTree::bulk_load(entries),
            max_radius_km,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    /// Inverse-distance-weighted exposure at a point, or `None` when no
    /// reading lies within the cutoff.
    pub fn exposure_at(&self, point: Point<f64>) -> Option<f64> {
        let mut weight_sum = 0.0;
        let mut value_sum = 0.0;

        for entry in self.candidates_near(point, EXPOSURE_CUTOFF_KM) {
            let distance_km = haversine_km(point, Point::new(entry.position[0], entry.position[1]));
            if distance_km > EXPOSURE_CUTOFF_KM {
                continue;
            }
            let weight = 1.0 / (distance_km * 1000.0 + 1.0).powi(IDW_POWER);
            weight_sum += weight;
            value_sum += weight * entry.value;
        }

        (weight_sum > 0.0).then(|| value_sum / weight_sum)
    }

    /// Geometry-aware exposure: unweighted mean of the readings whose own
    /// radius reaches the line, or `None` when none qualify.
    pub fn exposure_along(&self, line: &LineString<f64>) -> Option<f64> {
        let Some(anchor) = line.0.first().copied() else {
            return None;
        };
        let reach_km = self.max_radius_km + line_span_km(line);

        let mut count = 0usize;
        let mut sum = 0.0;
        for entry in self.candidates_near(Point::from(anchor), reach_km) {
            let d = point_to_line_km(Point::new(entry.position[0], entry.position[1]), line);
            if d <= entry.radius_km {
                count += 1;
                sum += entry.value;
            }
        }

        (count > 0).then(|| sum / count as f64)
    }

    /// Exposure sample for one edge under the chosen method.
    pub fn exposure_for_edge(
        &self,
        geometry: &LineString<f64>,
        method: ExposureMethod,
    ) -> Option<f64> {
        match method {
            ExposureMethod::IdwMidpoint => self.exposure_at(line_midpoint(geometry)),
            ExposureMethod::GeometryRadius => self.exposure_along(geometry),
        }
    }

    /// Candidate entries within `radius_km` of `point`, by envelope query;
    /// callers re-check with exact great-circle distances.
    fn candidates_near(
        &self,
        point: Point<f64>,
        radius_km: f64,
    ) -> impl Iterator<Item = &ReadingEntry> {
        let dlat = radius_km / KM_PER_DEGREE;
        let dlon = dlat / point.y().to_radians().cos().max(0.05);
        let envelope = AABB::from_corners(
            [point.x() - dlon, point.y() - dlat],
            [point.x() + dlon, point.y() + dlat],
        );
        self.tree.locate_in_envelope(&envelope)
    }
}

/// Rough length of a line's bounding span, to size the query envelope.
fn line_span_km(line: &LineString<f64>) -> f64 {
    match (line.0.first(), line.0.last()) {
        (Some(&a), Some(&b)) => haversine_km(Point::from(a), Point::from(b)),
        _ => 0.0,
    }
}
