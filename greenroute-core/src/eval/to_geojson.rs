//! GeoJSON export of a route, one LineString feature per segment.

use geojson::{Feature, FeatureCollection, Geometry};
use serde_json::json;

use crate::error::Error;

use super::{Route, RouteSegment};

impl Route {
    /// Converts the route to a `GeoJSON` `FeatureCollection`.
    pub fn to_geojson(&self) -> Result<FeatureCollection, Error> {
        let mut features = Vec::with_capacity(self.segments.len());
        for (idx, segment) in self.segments.iter().enumerate() {
            features.push(segment_feature(segment, idx)?);
        }

        Ok(FeatureCollection {
            features,
            bbox: None,
            foreign_members: None,
        })
    }

    pub fn to_geojson_string(&self) -> Result<String, Error> {
        serde_json::to_string(&self.to_geojson()?).map_err(|e| Error::GeoJsonError(e.to_string()))
    }
}

fn segment_feature(segment: &RouteSegment, idx: usize) -> Result<Feature, Error> {
    let value = json!({
        "type": "Feature",
        "geometry": Geometry::new((&segment.geometry).into()),
        "properties": {
            "segment_index": idx,
            "from": segment.from,
            "to": segment.to,
            "link_id": segment.link_id,
            "distance_km": segment.distance_km,
            "time_min": segment.time_min,
            "exposure": segment.exposure,
            "emission": segment.emission,
            "health": segment.health,
        }
    });

    serde_json::from_value::<Feature>(value).map_err(|e| Error::GeoJsonError(e.to_string()))
}
