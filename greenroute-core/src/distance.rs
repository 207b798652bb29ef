//! Great-circle math used by the graph builder, the exposure estimator and
//! the A* heuristic.

use geo::{LineString, Point};

/// Mean radius of Earth, in kilometers.
const EARTH_RADIUS_KM: f64 = 6371.0088;

/// Great-circle distance between two lon/lat points, in kilometers,
/// via the haversine formula.
pub fn haversine_km(a: Point<f64>, b: Point<f64>) -> f64 {
    let lat1 = a.y().to_radians();
    let lat2 = b.y().to_radians();

    let sin_dlat_half = ((lat2 - lat1) * 0.5).sin();
    let sin_dlon_half = ((b.x() - a.x()).to_radians() * 0.5).sin();

    let h = sin_dlat_half * sin_dlat_half
        + lat1.cos() * lat2.cos() * sin_dlon_half * sin_dlon_half;

    2.0 * EARTH_RADIUS_KM * h.sqrt().asin()
}

/// Minimum great-circle distance from `p` to the polyline `line`, in
/// kilometers.
///
/// Each segment is evaluated in a local equirectangular projection centered
/// on `p`, which is accurate to well under a percent at the few-kilometer
/// scales the exposure estimator works with.
pub fn point_to_line_km(p: Point<f64>, line: &LineString<f64>) -> f64 {
    let coords = &line.0;
    if coords.is_empty() {
        return f64::INFINITY;
    }
    if coords.len() == 1 {
        return haversine_km(p, Point::from(coords[0]));
    }

    let cos_lat = p.y().to_radians().cos();
    let project = |c: geo::Coord<f64>| -> (f64, f64) {
        (
            (c.x - p.x()).to_radians() * cos_lat * EARTH_RADIUS_KM,
            (c.y - p.y()).to_radians() * EARTH_RADIUS_KM,
        )
    };

    let mut best = f64::INFINITY;
    for pair in coords.windows(2) {
        let (ax, ay) = project(pair[0]);
        let (bx, by) = project(pair[1]);
        let (dx, dy) = (bx - ax, by - ay);
        let len2 = dx * dx + dy * dy;
        // Projection parameter of the origin (= p) onto the segment.
        let t = if len2 > 0.0 {
            ((-ax * dx - ay * dy) / len2).clamp(0.0, 1.0)
        } else {
            0.0
        };
        let (cx, cy) = (ax + t * dx, ay + t * dy);
        best = best.min((cx * cx + cy * cy).sqrt());
    }
    best
}

/// Midpoint of a polyline by coordinate index. Used to attach a single
/// exposure sample to an edge.
pub fn line_midpoint(line: &LineString<f64>) -> Point<f64> {
    let coords = &line.0;
    Point::from(coords[coords.len() / 2])
}
