//! `GeoJSON` conversion for drawn geometries.
//!
//! Overlays are always pushed to the map view as a full
//! [`FeatureCollection`]; these helpers build the pieces.

use field_map_geometry_models::{Geometry, Point};
use geojson::{Feature, FeatureCollection, JsonObject, Value, feature::Id};

/// Converts a drawn geometry into a `GeoJSON` geometry.
///
/// Polygon rings are emitted closed, as `GeoJSON` requires.
#[must_use]
pub fn to_geojson_geometry(geometry: &Geometry) -> geojson::Geometry {
    let value = match geometry {
        Geometry::Point(point) => Value::Point(position(*point)),
        Geometry::LineString(points) => {
            Value::LineString(points.iter().copied().map(position).collect())
        }
        Geometry::Polygon(_) => {
            let ring = geometry.closed_ring().unwrap_or_default();
            Value::Polygon(vec![ring.into_iter().map(position).collect()])
        }
    };

    geojson::Geometry::new(value)
}

/// Builds a `GeoJSON` feature from a geometry, an optional string id and a
/// property map.
#[must_use]
pub fn feature(geometry: &Geometry, id: Option<String>, properties: JsonObject) -> Feature {
    Feature {
        bbox: None,
        geometry: Some(to_geojson_geometry(geometry)),
        id: id.map(Id::String),
        properties: Some(properties),
        foreign_members: None,
    }
}

/// Builds a point feature with a single string property, used for labels
/// and vertex markers.
#[must_use]
pub fn labelled_point(point: Point, key: &str, label: Option<String>) -> Feature {
    let mut properties = JsonObject::new();
    if let Some(label) = label {
        properties.insert(key.to_string(), serde_json::Value::String(label));
    }
    feature(&Geometry::Point(point), None, properties)
}

/// Wraps features in a collection.
#[must_use]
pub const fn collection(features: Vec<Feature>) -> FeatureCollection {
    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

/// An empty collection, used to clear an overlay without removing it.
#[must_use]
pub const fn empty_collection() -> FeatureCollection {
    collection(Vec::new())
}

fn position(point: Point) -> Vec<f64> {
    vec![point.longitude, point.latitude]
}
