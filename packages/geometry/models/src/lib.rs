#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Geometry value types for the field map core.
//!
//! Everything here is plain data: a WGS84 [`Point`], the [`Geometry`]
//! union drawn by users (point, open line, implicitly closed polygon), and
//! the length/area units used when presenting measurements. No math lives
//! in this crate; see `field_map_geometry` for that.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// A `(longitude, latitude)` pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Point {
    /// Longitude in decimal degrees, east positive.
    pub longitude: f64,
    /// Latitude in decimal degrees, north positive.
    pub latitude: f64,
}

impl Point {
    /// Creates a point from longitude and latitude (x, y order).
    #[must_use]
    pub const fn new(longitude: f64, latitude: f64) -> Self {
        Self {
            longitude,
            latitude,
        }
    }

    /// Whether both coordinates are finite numbers.
    #[must_use]
    pub const fn is_finite(&self) -> bool {
        self.longitude.is_finite() && self.latitude.is_finite()
    }

    /// Whether the point is finite and inside the WGS84 coordinate range.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.is_finite()
            && (-180.0..=180.0).contains(&self.longitude)
            && (-90.0..=90.0).contains(&self.latitude)
    }

    /// Arithmetic midpoint of two points, used to anchor segment labels.
    #[must_use]
    pub fn midpoint(&self, other: &Self) -> Self {
        Self::new(
            f64::midpoint(self.longitude, other.longitude),
            f64::midpoint(self.latitude, other.latitude),
        )
    }
}

impl std::fmt::Display for Point {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.6}, {:.6}", self.longitude, self.latitude)
    }
}

/// The three kinds of geometry a user can draw.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum GeometryKind {
    /// A single position.
    Point,
    /// An open path of two or more positions.
    Line,
    /// A ring of three or more positions, implicitly closed.
    Polygon,
}

impl GeometryKind {
    /// Minimum number of distinct vertices a finished geometry of this kind
    /// must have.
    #[must_use]
    pub const fn min_vertices(self) -> usize {
        match self {
            Self::Point => 1,
            Self::Line => 2,
            Self::Polygon => 3,
        }
    }

    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Point, Self::Line, Self::Polygon]
    }
}

/// A drawn geometry.
///
/// Polygon rings are stored open: a trailing vertex equal to the first is
/// dropped by [`Geometry::polygon`] and the ring is closed implicitly by
/// anything that needs a closed ring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "coordinates")]
pub enum Geometry {
    /// A single position.
    Point(Point),
    /// An ordered, open path.
    LineString(Vec<Point>),
    /// An ordered ring, implicitly closed.
    Polygon(Vec<Point>),
}

impl Geometry {
    /// Builds a polygon, dropping an explicit closing vertex if present.
    #[must_use]
    pub fn polygon(mut ring: Vec<Point>) -> Self {
        if ring.len() > 1 && ring.first() == ring.last() {
            ring.pop();
        }
        Self::Polygon(ring)
    }

    /// The kind of this geometry.
    #[must_use]
    pub const fn kind(&self) -> GeometryKind {
        match self {
            Self::Point(_) => GeometryKind::Point,
            Self::LineString(_) => GeometryKind::Line,
            Self::Polygon(_) => GeometryKind::Polygon,
        }
    }

    /// The stored vertices, in order. A polygon's closing vertex is not
    /// repeated.
    #[must_use]
    pub fn vertices(&self) -> &[Point] {
        match self {
            Self::Point(point) => std::slice::from_ref(point),
            Self::LineString(points) | Self::Polygon(points) => points,
        }
    }

    /// Number of pairwise-distinct vertices.
    #[must_use]
    pub fn distinct_vertex_count(&self) -> usize {
        distinct_count(self.vertices())
    }

    /// Whether the geometry meets the minimum vertex count for its kind.
    ///
    /// A line below the minimum has zero length and a polygon below it has
    /// zero area.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.distinct_vertex_count() >= self.kind().min_vertices()
    }

    /// The polygon ring with its first vertex repeated at the end, or
    /// `None` for other geometries.
    #[must_use]
    pub fn closed_ring(&self) -> Option<Vec<Point>> {
        let Self::Polygon(ring) = self else {
            return None;
        };
        let mut closed = ring.clone();
        if let Some(first) = ring.first() {
            closed.push(*first);
        }
        Some(closed)
    }
}

/// Counts pairwise-distinct points. Vertex lists are tens of entries long,
/// so the quadratic scan is fine.
#[must_use]
pub fn distinct_count(points: &[Point]) -> usize {
    let mut seen: Vec<&Point> = Vec::with_capacity(points.len());
    for point in points {
        if !seen.contains(&point) {
            seen.push(point);
        }
    }
    seen.len()
}

/// Units for distances.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum LengthUnit {
    /// SI metres.
    Meters,
    /// Kilometres.
    Kilometers,
    /// International feet.
    Feet,
    /// International yards.
    Yards,
    /// Statute miles.
    Miles,
}

impl LengthUnit {
    /// How many metres one of this unit spans.
    #[must_use]
    pub const fn meters_per_unit(self) -> f64 {
        match self {
            Self::Meters => 1.0,
            Self::Kilometers => 1000.0,
            Self::Feet => 0.3048,
            Self::Yards => 0.9144,
            Self::Miles => 1609.344,
        }
    }

    /// Converts a distance in metres to this unit.
    #[must_use]
    pub fn from_meters(self, meters: f64) -> f64 {
        meters / self.meters_per_unit()
    }

    /// Converts a distance expressed in `from` into this unit.
    #[must_use]
    pub fn convert(self, value: f64, from: Self) -> f64 {
        self.from_meters(value * from.meters_per_unit())
    }

    /// Short label used in readouts (e.g. `yd`).
    #[must_use]
    pub const fn abbreviation(self) -> &'static str {
        match self {
            Self::Meters => "m",
            Self::Kilometers => "km",
            Self::Feet => "ft",
            Self::Yards => "yd",
            Self::Miles => "mi",
        }
    }
}

/// Units for enclosed areas.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum AreaUnit {
    /// Square metres.
    SquareMeters,
    /// Hectares.
    Hectares,
    /// International acres.
    Acres,
    /// Square kilometres.
    SquareKilometers,
    /// Square statute miles.
    SquareMiles,
}

impl AreaUnit {
    /// Multiplicative factor from square metres to this unit.
    #[must_use]
    pub const fn per_square_meter(self) -> f64 {
        match self {
            Self::SquareMeters => 1.0,
            Self::Hectares => 0.000_1,
            Self::Acres => 0.000_247_105,
            Self::SquareKilometers => 0.000_001,
            Self::SquareMiles => 1.0 / 2_589_988.110_336,
        }
    }

    /// Converts an area in square metres to this unit.
    #[must_use]
    pub fn from_square_meters(self, square_meters: f64) -> f64 {
        square_meters * self.per_square_meter()
    }

    /// Short label used in readouts (e.g. `acres`).
    #[must_use]
    pub const fn abbreviation(self) -> &'static str {
        match self {
            Self::SquareMeters => "m²",
            Self::Hectares => "ha",
            Self::Acres => "acres",
            Self::SquareKilometers => "km²",
            Self::SquareMiles => "mi²",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn polygon_drops_explicit_closing_vertex() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(1.0, 0.0);
        let c = Point::new(1.0, 1.0);
        let geometry = Geometry::polygon(vec![a, b, c, a]);
        assert_eq!(geometry.vertices(), &[a, b, c]);
        assert_eq!(geometry.closed_ring().unwrap(), vec![a, b, c, a]);
    }

    #[test]
    fn completeness_uses_distinct_vertices() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(0.0, 0.01);

        assert!(!Geometry::LineString(vec![a]).is_complete());
        assert!(!Geometry::LineString(vec![a, a]).is_complete());
        assert!(Geometry::LineString(vec![a, b]).is_complete());
        assert!(!Geometry::Polygon(vec![a, b, a]).is_complete());
        assert!(Geometry::Point(a).is_complete());
    }

    #[test]
    fn min_vertices_per_kind() {
        assert_eq!(GeometryKind::Point.min_vertices(), 1);
        assert_eq!(GeometryKind::Line.min_vertices(), 2);
        assert_eq!(GeometryKind::Polygon.min_vertices(), 3);
    }

    #[test]
    fn rejects_out_of_range_points() {
        assert!(Point::new(-74.5, 40.0).is_valid());
        assert!(!Point::new(181.0, 0.0).is_valid());
        assert!(!Point::new(0.0, -90.5).is_valid());
        assert!(!Point::new(f64::NAN, 0.0).is_valid());
    }

    #[test]
    fn length_conversions() {
        let yards = LengthUnit::Yards.convert(1.0, LengthUnit::Miles);
        assert!((yards - 1760.0).abs() < 1e-9);
        assert!((LengthUnit::Kilometers.from_meters(1500.0) - 1.5).abs() < 1e-12);
    }

    #[test]
    fn kinds_parse_case_insensitively() {
        assert_eq!("Polygon".parse::<GeometryKind>().unwrap(), GeometryKind::Polygon);
        assert_eq!("yards".parse::<LengthUnit>().unwrap(), LengthUnit::Yards);
        assert_eq!(AreaUnit::Acres.to_string(), "acres");
    }

    #[test]
    fn geometry_serializes_as_tagged_coordinates() {
        let json = serde_json::to_value(Geometry::Point(Point::new(1.0, 2.0))).unwrap();
        assert_eq!(json["type"], "Point");
        assert_eq!(json["coordinates"]["longitude"], 1.0);
    }
}
