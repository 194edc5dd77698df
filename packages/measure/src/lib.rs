#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Live measurement of the geometry being drawn.
//!
//! [`MeasurementEngine::measure`] turns a (possibly partial) geometry into
//! a [`MeasurementSnapshot`]: per-segment distances, the running total for
//! a line, and perimeter plus enclosed area for a polygon. Snapshots are
//! recomputed from scratch on every change and never persisted.
//!
//! [`LivePreview`] subscribes to a draw session, recomputes on every event,
//! and writes the live preview overlays and readout sinks.

mod preview;

pub use preview::{LatestMeasurement, LivePreview, MeasurementSink};

use std::sync::Arc;

use field_map_geometry::{GeometryError, GeometryMath};
use field_map_geometry_models::{AreaUnit, Geometry, GeometryKind, LengthUnit, Point};
use serde::{Deserialize, Serialize};

/// Units and display switch-over used for readouts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeasurementConfig {
    /// Unit segment distances and running totals are computed in.
    pub small_unit: LengthUnit,
    /// Unit distances are displayed in once they reach the threshold.
    pub large_unit: LengthUnit,
    /// Distance, in `small_unit`, at which display switches to
    /// `large_unit`. Inclusive.
    pub large_unit_threshold: f64,
    /// Unit enclosed areas are displayed in.
    pub area_unit: AreaUnit,
}

impl Default for MeasurementConfig {
    fn default() -> Self {
        Self {
            small_unit: LengthUnit::Yards,
            large_unit: LengthUnit::Miles,
            large_unit_threshold: 1760.0,
            area_unit: AreaUnit::Acres,
        }
    }
}

impl MeasurementConfig {
    /// Formats a distance given in `small_unit`, e.g. `412.3 yd` or
    /// `1.27 mi`.
    #[must_use]
    pub fn format_length(&self, value: f64) -> String {
        if value >= self.large_unit_threshold {
            let large = self.large_unit.convert(value, self.small_unit);
            format!("{large:.2} {}", self.large_unit.abbreviation())
        } else {
            format!("{value:.1} {}", self.small_unit.abbreviation())
        }
    }

    /// Formats a segment distance given in `small_unit`. Segments never
    /// switch to `large_unit`.
    #[must_use]
    pub fn format_segment(&self, value: f64) -> String {
        format!("{value:.1} {}", self.small_unit.abbreviation())
    }

    /// Formats an area given in `area_unit`, e.g. `3.05 acres`.
    #[must_use]
    pub fn format_area(&self, value: f64) -> String {
        format!("{value:.2} {}", self.area_unit.abbreviation())
    }
}

/// One edge of the measured geometry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    /// Start vertex.
    pub from: Point,
    /// End vertex.
    pub to: Point,
    /// Great-circle length in the configured small unit.
    pub distance: f64,
}

impl Segment {
    /// Where the segment's distance label is anchored.
    #[must_use]
    pub fn midpoint(&self) -> Point {
        self.from.midpoint(&self.to)
    }
}

/// Derived measurements of one geometry.
#[derive(Debug, Clone, PartialEq)]
pub struct MeasurementSnapshot {
    /// Kind of the measured geometry, `None` when nothing was drawn.
    pub kind: Option<GeometryKind>,
    /// Edges in drawing order. A polygon with three or more vertices
    /// includes its closing edge.
    pub segments: Vec<Segment>,
    /// Line: running distance in `units.small_unit`. Polygon: enclosed
    /// area in `units.area_unit`. Otherwise zero.
    pub total: f64,
    /// Polygon perimeter in `units.small_unit`.
    pub perimeter: Option<f64>,
    /// Units the values are expressed in.
    pub units: MeasurementConfig,
}

impl MeasurementSnapshot {
    /// A snapshot with no segments and zero totals.
    #[must_use]
    pub const fn empty(units: MeasurementConfig) -> Self {
        Self {
            kind: None,
            segments: Vec::new(),
            total: 0.0,
            perimeter: None,
            units,
        }
    }

    /// Whether there is nothing to show.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty() && self.total.abs() < f64::EPSILON
    }

    /// Display label of each segment, in order, always in the small unit.
    #[must_use]
    pub fn segment_labels(&self) -> Vec<String> {
        self.segments
            .iter()
            .map(|segment| self.units.format_segment(segment.distance))
            .collect()
    }

    /// Display label of the total: distance for lines, area for polygons.
    #[must_use]
    pub fn total_label(&self) -> String {
        match self.kind {
            Some(GeometryKind::Polygon) => self.units.format_area(self.total),
            _ => self.units.format_length(self.total),
        }
    }

    /// Display label of the perimeter, for polygons.
    #[must_use]
    pub fn perimeter_label(&self) -> Option<String> {
        self.perimeter.map(|value| self.units.format_length(value))
    }
}

impl std::fmt::Display for MeasurementSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.kind, self.perimeter_label()) {
            (Some(GeometryKind::Polygon), Some(perimeter)) => {
                write!(f, "Area: {} (perimeter {perimeter})", self.total_label())
            }
            (Some(GeometryKind::Line), _) => write!(f, "Total: {}", self.total_label()),
            _ => f.write_str("No measurement"),
        }
    }
}

/// Computes [`MeasurementSnapshot`]s through a [`GeometryMath`].
#[derive(Clone)]
pub struct MeasurementEngine {
    math: Arc<dyn GeometryMath>,
    config: MeasurementConfig,
}

impl std::fmt::Debug for MeasurementEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MeasurementEngine")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl MeasurementEngine {
    /// Creates an engine measuring through `math` in `config`'s units.
    #[must_use]
    pub const fn new(math: Arc<dyn GeometryMath>, config: MeasurementConfig) -> Self {
        Self { math, config }
    }

    /// Units and thresholds used for readouts.
    #[must_use]
    pub const fn config(&self) -> &MeasurementConfig {
        &self.config
    }

    /// A zeroed snapshot in this engine's units.
    #[must_use]
    pub const fn empty(&self) -> MeasurementSnapshot {
        MeasurementSnapshot::empty(self.config)
    }

    /// Measures `geometry`. Never fails: a geometry math error is logged
    /// and yields a zeroed snapshot.
    #[must_use]
    pub fn measure(&self, geometry: Option<&Geometry>) -> MeasurementSnapshot {
        self.try_measure(geometry).unwrap_or_else(|e| {
            log::warn!("Measurement failed, showing zero: {e}");
            self.empty()
        })
    }

    /// Measures `geometry`, surfacing geometry math errors.
    ///
    /// # Errors
    ///
    /// * [`GeometryError`] if a vertex is outside the valid coordinate
    ///   range
    pub fn try_measure(
        &self,
        geometry: Option<&Geometry>,
    ) -> Result<MeasurementSnapshot, GeometryError> {
        let Some(geometry) = geometry else {
            return Ok(self.empty());
        };

        let mut snapshot = MeasurementSnapshot {
            kind: Some(geometry.kind()),
            ..self.empty()
        };

        match geometry {
            Geometry::Point(_) => {}
            Geometry::LineString(points) => {
                snapshot.segments = self.segments(points)?;
                snapshot.total = snapshot.segments.iter().map(|s| s.distance).sum();
            }
            Geometry::Polygon(ring) => {
                let edges = if ring.len() >= 3 {
                    geometry.closed_ring().unwrap_or_default()
                } else {
                    ring.clone()
                };
                snapshot.segments = self.segments(&edges)?;
                snapshot.perimeter = Some(snapshot.segments.iter().map(|s| s.distance).sum());
                snapshot.total = self
                    .config
                    .area_unit
                    .from_square_meters(self.math.area_of(ring)?);
            }
        }

        Ok(snapshot)
    }

    fn segments(&self, points: &[Point]) -> Result<Vec<Segment>, GeometryError> {
        points
            .windows(2)
            .map(|pair| {
                Ok(Segment {
                    from: pair[0],
                    to: pair[1],
                    distance: self.math.length_of(pair, self.config.small_unit)?,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use field_map_geometry::SphericalMath;
    use pretty_assertions::assert_eq;

    use super::*;

    fn engine(config: MeasurementConfig) -> MeasurementEngine {
        MeasurementEngine::new(Arc::new(SphericalMath), config)
    }

    fn p(lon: f64, lat: f64) -> Point {
        Point::new(lon, lat)
    }

    #[test]
    fn line_segments_and_total() {
        let metric = MeasurementConfig {
            small_unit: LengthUnit::Meters,
            large_unit: LengthUnit::Kilometers,
            large_unit_threshold: 1000.0,
            ..MeasurementConfig::default()
        };
        let line = Geometry::LineString(vec![p(0.0, 0.0), p(0.0, 0.01), p(0.01, 0.01)]);

        let snapshot = engine(metric).measure(Some(&line));

        assert_eq!(snapshot.kind, Some(GeometryKind::Line));
        assert_eq!(snapshot.segments.len(), 2);
        for segment in &snapshot.segments {
            assert!((segment.distance - 1112.0).abs() < 2.0, "got {}", segment.distance);
        }
        assert!((snapshot.total - 2224.0).abs() < 3.0, "got {}", snapshot.total);
        assert_eq!(snapshot.total_label(), "2.22 km");
        assert_eq!(snapshot.perimeter, None);
    }

    #[test]
    fn display_switches_to_large_unit_at_threshold() {
        let units = MeasurementConfig::default();
        assert_eq!(units.format_length(1760.0), "1.00 mi");
        assert_eq!(units.format_length(1759.9), "1759.9 yd");
        assert_eq!(units.format_length(0.0), "0.0 yd");
        assert_eq!(units.format_area(3.0), "3.00 acres");
    }

    #[test]
    fn segment_labels_stay_in_small_unit_past_threshold() {
        let line = Geometry::LineString(vec![p(0.0, 0.0), p(0.0, 0.02), p(0.0, 0.03)]);

        let snapshot = engine(MeasurementConfig::default()).measure(Some(&line));
        let labels = snapshot.segment_labels();

        assert!(snapshot.segments[0].distance > 1760.0);
        assert!(labels[0].ends_with(" yd"), "got {}", labels[0]);
        assert!(labels[0].starts_with("243"), "got {}", labels[0]);
        assert!(labels[1].ends_with(" yd"), "got {}", labels[1]);
        assert!(snapshot.total_label().ends_with(" mi"), "got {}", snapshot.total_label());
        assert_eq!(snapshot.total_label(), "2.07 mi");
    }

    #[test]
    fn polygon_includes_closing_edge_and_area() {
        let square = Geometry::Polygon(vec![
            p(0.0, 0.0),
            p(0.01, 0.0),
            p(0.01, 0.01),
            p(0.0, 0.01),
        ]);

        let snapshot = engine(MeasurementConfig::default()).measure(Some(&square));

        assert_eq!(snapshot.segments.len(), 4);
        assert_eq!(snapshot.segments[3].to, p(0.0, 0.0));
        // ~1,236,431 m² is ~305.5 acres.
        assert!((snapshot.total - 305.5).abs() < 3.0, "got {}", snapshot.total);
        let perimeter = snapshot.perimeter.unwrap();
        assert!((perimeter - 4.0 * 1216.0).abs() < 10.0, "got {perimeter}");
        assert!(snapshot.total_label().ends_with(" acres"));
    }

    #[test]
    fn partial_polygon_has_open_segments_and_no_area() {
        let partial = Geometry::Polygon(vec![p(0.0, 0.0), p(0.01, 0.0)]);
        let snapshot = engine(MeasurementConfig::default()).measure(Some(&partial));

        assert_eq!(snapshot.segments.len(), 1);
        assert!(snapshot.total.abs() < f64::EPSILON);
    }

    #[test]
    fn degenerate_inputs_are_zero() {
        let engine = engine(MeasurementConfig::default());

        assert!(engine.measure(None).is_empty());
        assert!(engine.measure(Some(&Geometry::Point(p(1.0, 1.0)))).is_empty());
        assert!(
            engine
                .measure(Some(&Geometry::LineString(vec![p(1.0, 1.0)])))
                .is_empty()
        );
    }

    #[test]
    fn invalid_coordinates_yield_zeroed_snapshot() {
        let engine = engine(MeasurementConfig::default());
        let bad = Geometry::LineString(vec![p(0.0, 0.0), p(0.0, 120.0)]);

        assert!(engine.try_measure(Some(&bad)).is_err());
        assert_eq!(engine.measure(Some(&bad)), engine.empty());
    }

    #[test]
    fn config_deserializes_with_defaults() {
        let config: MeasurementConfig =
            toml::from_str("large_unit = \"kilometers\"\nsmall_unit = \"meters\"").unwrap();
        assert_eq!(config.large_unit, LengthUnit::Kilometers);
        assert_eq!(config.area_unit, AreaUnit::Acres);
        assert!((config.large_unit_threshold - 1760.0).abs() < f64::EPSILON);
    }
}
