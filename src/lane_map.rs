// src/lane_map.rs
//
// Lane centerlines and their GeoJSON form.
//
// A Lane is immutable once built: the polyline is de-duplicated, validated
// and paired with a cumulative arc-length table so station lookups are
// O(log n). LaneMap owns every lane and is handed to the prediction
// pipeline read-only.
//
// File format: FeatureCollection of LineString features, each carrying a
// unique `lane_id` property. Features that fail to parse or carry degenerate
// geometry are skipped individually; an unreadable file is fatal.

use crate::error::{ConfigurationError, GeometryError};
use crate::geometry::{
    cumulative_lengths, dedup_consecutive, point_at_station, project_onto_polyline, Point,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

// ============================================================================
// LANE
// ============================================================================

#[derive(Debug, Clone)]
pub struct Lane {
    id: String,
    points: Vec<Point>,
    cumulative: Vec<f64>,
    source_tracks: Vec<u64>,
}

/// Closest point of a lane to a query position, with local geometry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LaneProjection {
    pub point: Point,
    pub distance: f64,
    pub station: f64,
    /// Unit tangent of the segment holding `point`, in polyline order
    pub tangent: Point,
}

impl Lane {
    pub fn new(id: impl Into<String>, points: Vec<Point>) -> Result<Self, GeometryError> {
        if points.iter().any(|p| !p.is_finite()) {
            return Err(GeometryError::NonFiniteCoordinate);
        }
        let points = dedup_consecutive(&points);
        if points.len() < 2 {
            return Err(GeometryError::TooFewPoints {
                count: points.len(),
            });
        }
        let cumulative = cumulative_lengths(&points);
        Ok(Self {
            id: id.into(),
            points,
            cumulative,
            source_tracks: Vec::new(),
        })
    }

    pub fn with_source_tracks(mut self, tracks: Vec<u64>) -> Self {
        self.source_tracks = tracks;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn source_tracks(&self) -> &[u64] {
        &self.source_tracks
    }

    pub fn length(&self) -> f64 {
        self.cumulative.last().copied().unwrap_or(0.0)
    }

    pub fn project(&self, p: &Point) -> Option<LaneProjection> {
        let proj = project_onto_polyline(p, &self.points, &self.cumulative)?;
        let a = self.points[proj.segment];
        let b = self.points[proj.segment + 1];
        let tangent = (b - a).normalized()?;
        Some(LaneProjection {
            point: proj.point,
            distance: proj.distance,
            station: proj.station,
            tangent,
        })
    }

    /// Point at arc length `station`, clamped to [0, length].
    pub fn point_at(&self, station: f64) -> Point {
        point_at_station(&self.points, &self.cumulative, station).unwrap_or(self.points[0])
    }
}

// ============================================================================
// LANE MAP
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct LaneMap {
    lanes: Vec<Lane>,
    index: HashMap<String, usize>,
}

impl LaneMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, lane: Lane) -> Result<(), GeometryError> {
        if self.index.contains_key(lane.id()) {
            return Err(GeometryError::DuplicateLaneId(lane.id().to_string()));
        }
        self.index.insert(lane.id().to_string(), self.lanes.len());
        self.lanes.push(lane);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&Lane> {
        self.index.get(id).map(|&i| &self.lanes[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Lane> {
        self.lanes.iter()
    }

    pub fn len(&self) -> usize {
        self.lanes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lanes.is_empty()
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigurationError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigurationError::Unreadable {
            path: path.to_path_buf(),
            source,
        })?;
        let map = Self::from_geojson_str(&contents).map_err(|source| {
            ConfigurationError::MalformedLaneFile {
                path: path.to_path_buf(),
                source,
            }
        })?;
        info!("🛣️  Loaded {} lane polylines from {}", map.len(), path.display());
        Ok(map)
    }

    /// Parse a FeatureCollection. Only the envelope must be well formed;
    /// individual features that do not describe a usable lane are skipped.
    pub fn from_geojson_str(contents: &str) -> Result<Self, serde_json::Error> {
        let collection: RawCollection = serde_json::from_str(contents)?;
        let mut map = LaneMap::new();

        for (i, raw) in collection.features.into_iter().enumerate() {
            let feature: LaneFeature = match serde_json::from_value(raw) {
                Ok(f) => f,
                Err(e) => {
                    warn!("Skipping lane feature #{}: {}", i, e);
                    continue;
                }
            };
            if feature.geometry.kind != "LineString" {
                warn!(
                    "Skipping lane feature #{}: geometry type {} is not LineString",
                    i, feature.geometry.kind
                );
                continue;
            }

            let id = feature.properties.lane_id.into_string();
            let points = feature.geometry.coordinates;
            let sources = feature.properties.source_tracks.unwrap_or_default();
            let result = Lane::new(id.clone(), points)
                .map(|lane| lane.with_source_tracks(sources))
                .and_then(|lane| map.insert(lane));
            if let Err(e) = result {
                warn!("Skipping lane {}: {}", id, e);
            }
        }

        Ok(map)
    }

    pub fn to_geojson_value(&self) -> serde_json::Value {
        let features: Vec<LaneFeature> = self
            .lanes
            .iter()
            .map(|lane| LaneFeature {
                kind: "Feature".to_string(),
                geometry: LineGeometry {
                    kind: "LineString".to_string(),
                    coordinates: lane.points.clone(),
                },
                properties: LaneProperties {
                    lane_id: LaneId::Text(lane.id.clone()),
                    length: Some(lane.length()),
                    point_count: Some(lane.points.len()),
                    source_tracks: Some(lane.source_tracks.clone()),
                },
            })
            .collect();

        serde_json::json!({
            "type": "FeatureCollection",
            "features": features,
            "properties": { "total_lanes": self.lanes.len() },
        })
    }

    pub fn write_geojson(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(&self.to_geojson_value())?;
        fs::write(path, json)?;
        info!("💾 Wrote {} lanes to {}", self.len(), path.display());
        Ok(())
    }
}

// ============================================================================
// GEOJSON SCHEMA
// ============================================================================

#[derive(Debug, Deserialize)]
struct RawCollection {
    features: Vec<serde_json::Value>,
}

#[derive(Debug, Serialize, Deserialize)]
struct LaneFeature {
    #[serde(rename = "type", default = "feature_kind")]
    kind: String,
    geometry: LineGeometry,
    properties: LaneProperties,
}

#[derive(Debug, Serialize, Deserialize)]
struct LineGeometry {
    #[serde(rename = "type")]
    kind: String,
    coordinates: Vec<Point>,
}

#[derive(Debug, Serialize, Deserialize)]
struct LaneProperties {
    lane_id: LaneId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    length: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    point_count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    source_tracks: Option<Vec<u64>>,
}

/// Older lane files use integer ids.
#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum LaneId {
    Text(String),
    Integer(i64),
}

impl LaneId {
    fn into_string(self) -> String {
        match self {
            LaneId::Text(s) => s,
            LaneId::Integer(n) => n.to_string(),
        }
    }
}

fn feature_kind() -> String {
    "Feature".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn straight(id: &str, y: f64) -> Lane {
        Lane::new(id, vec![Point::new(0.0, y), Point::new(100.0, y)]).unwrap()
    }

    #[test]
    fn test_lane_rejects_degenerate_polylines() {
        assert_eq!(
            Lane::new("a", vec![Point::new(1.0, 1.0)]).unwrap_err(),
            GeometryError::TooFewPoints { count: 1 }
        );
        assert_eq!(
            Lane::new("b", vec![Point::new(1.0, 1.0), Point::new(1.0, 1.0)]).unwrap_err(),
            GeometryError::TooFewPoints { count: 1 }
        );
        assert_eq!(
            Lane::new("c", vec![Point::new(f64::NAN, 1.0), Point::new(1.0, 1.0)]).unwrap_err(),
            GeometryError::NonFiniteCoordinate
        );
    }

    #[test]
    fn test_lane_projection_and_tangent() {
        let lane = Lane::new(
            "bend",
            vec![Point::new(0.0, 0.0), Point::new(10.0, 0.0), Point::new(10.0, 10.0)],
        )
        .unwrap();
        assert_eq!(lane.length(), 20.0);

        let proj = lane.project(&Point::new(3.0, 2.0)).unwrap();
        assert_eq!(proj.point, Point::new(3.0, 0.0));
        assert_eq!(proj.tangent, Point::new(1.0, 0.0));
        assert!((proj.station - 3.0).abs() < 1e-12);

        let proj = lane.project(&Point::new(12.0, 7.0)).unwrap();
        assert_eq!(proj.tangent, Point::new(0.0, 1.0));
        assert!((proj.station - 17.0).abs() < 1e-12);
        assert_eq!(lane.point_at(17.0), Point::new(10.0, 7.0));
    }

    #[test]
    fn test_duplicate_lane_id_rejected() {
        let mut map = LaneMap::new();
        map.insert(straight("x", 0.0)).unwrap();
        assert_eq!(
            map.insert(straight("x", 5.0)),
            Err(GeometryError::DuplicateLaneId("x".to_string()))
        );
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_parse_skips_bad_features() {
        let doc = r#"{
            "type": "FeatureCollection",
            "features": [
                {"type": "Feature", "geometry": {"type": "LineString", "coordinates": [[0,0],[10,0]]}, "properties": {"lane_id": "a"}},
                {"type": "Feature", "geometry": {"type": "LineString", "coordinates": [[5,5]]}, "properties": {"lane_id": "short"}},
                {"type": "Feature", "geometry": {"type": "Point", "coordinates": [[5,5],[6,6]]}, "properties": {"lane_id": "pt"}},
                {"type": "Feature", "geometry": {"type": "LineString", "coordinates": [[0,5],[10,5]]}, "properties": {"lane_id": 7}},
                {"type": "Feature", "geometry": {"type": "LineString", "coordinates": [[0,9],[10,9]]}, "properties": {}}
            ]
        }"#;
        let map = LaneMap::from_geojson_str(doc).unwrap();
        assert_eq!(map.len(), 2);
        assert!(map.get("a").is_some());
        assert!(map.get("7").is_some());
        assert!(map.get("short").is_none());
    }

    #[test]
    fn test_geojson_round_trip_keeps_ids_and_geometry() {
        let mut map = LaneMap::new();
        map.insert(straight("lane_0", 0.0).with_source_tracks(vec![3, 9]))
            .unwrap();
        map.insert(straight("lane_1", 20.0)).unwrap();

        let value = map.to_geojson_value();
        assert_eq!(value["properties"]["total_lanes"], 2);
        assert_eq!(value["features"][0]["properties"]["length"], 100.0);

        let back = LaneMap::from_geojson_str(&value.to_string()).unwrap();
        assert_eq!(back.len(), 2);
        let lane = back.get("lane_0").unwrap();
        assert_eq!(lane.points(), map.get("lane_0").unwrap().points());
        assert_eq!(lane.source_tracks(), &[3, 9]);
    }

    #[test]
    fn test_missing_lane_file_is_configuration_error() {
        let path = std::env::temp_dir().join("lane_forecast_no_such_lanes.geojson");
        let _ = fs::remove_file(&path);
        assert!(matches!(
            LaneMap::load(&path),
            Err(ConfigurationError::Unreadable { .. })
        ));
    }

    #[test]
    fn test_malformed_lane_file_is_configuration_error() {
        let path = std::env::temp_dir().join("lane_forecast_bad_lanes.geojson");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            LaneMap::load(&path),
            Err(ConfigurationError::MalformedLaneFile { .. })
        ));
        let _ = fs::remove_file(&path);
    }
}
