#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Geometry math for the field map core.
//!
//! The [`GeometryMath`] trait is the only way the rest of the workspace
//! measures anything: path length in a requested unit and enclosed ring
//! area in square metres. [`SphericalMath`] implements it on top of the
//! `geo` crate: haversine distances on a sphere of mean Earth radius and
//! Chamberlain-Duquette spherical area.
//!
//! The [`geo_json`] module converts drawn geometries into
//! `GeoJSON` for the map view overlays.

pub mod geo_json;

use field_map_geometry_models::{LengthUnit, Point, distinct_count};
use geo::{ChamberlainDuquetteArea, Distance, Haversine, LineString, Polygon};
use thiserror::Error;

/// Errors produced by geometry math.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeometryError {
    /// A coordinate was non-finite or outside the WGS84 range.
    #[error("Invalid coordinate at index {index}: {point}")]
    InvalidCoordinate {
        /// Position of the offending point in the input.
        index: usize,
        /// The offending point.
        point: Point,
    },
}

/// Length and area computations over WGS84 points.
///
/// Implementations must be `Send + Sync` so a single instance can be shared
/// behind an `Arc` by every consumer.
pub trait GeometryMath: Send + Sync {
    /// Great-circle length of the path through `points`, in `unit`.
    ///
    /// Paths with fewer than two points have zero length.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::InvalidCoordinate`] if any point is outside
    /// the valid coordinate range.
    fn length_of(&self, points: &[Point], unit: LengthUnit) -> Result<f64, GeometryError>;

    /// Enclosed area of the (implicitly closed) ring, in square metres.
    ///
    /// Rings with fewer than three distinct points have zero area. The
    /// result is never negative.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::InvalidCoordinate`] if any point is outside
    /// the valid coordinate range.
    fn area_of(&self, ring: &[Point]) -> Result<f64, GeometryError>;
}

/// [`GeometryMath`] on a sphere: haversine segment lengths and
/// Chamberlain-Duquette area.
#[derive(Debug, Clone, Copy, Default)]
pub struct SphericalMath;

impl GeometryMath for SphericalMath {
    fn length_of(&self, points: &[Point], unit: LengthUnit) -> Result<f64, GeometryError> {
        validate(points)?;

        let meters: f64 = points
            .windows(2)
            .map(|pair| Haversine.distance(to_geo(pair[0]), to_geo(pair[1])))
            .sum();

        Ok(unit.from_meters(meters))
    }

    fn area_of(&self, ring: &[Point]) -> Result<f64, GeometryError> {
        validate(ring)?;

        if distinct_count(ring) < 3 {
            return Ok(0.0);
        }

        let exterior: LineString<f64> = ring
            .iter()
            .map(|p| (p.longitude, p.latitude))
            .collect::<Vec<_>>()
            .into();

        // `Polygon::new` closes the exterior ring if needed.
        Ok(Polygon::new(exterior, vec![]).chamberlain_duquette_unsigned_area())
    }
}

fn validate(points: &[Point]) -> Result<(), GeometryError> {
    points
        .iter()
        .enumerate()
        .find(|(_, p)| !p.is_valid())
        .map_or(Ok(()), |(index, point)| {
            Err(GeometryError::InvalidCoordinate {
                index,
                point: *point,
            })
        })
}

fn to_geo(point: Point) -> geo::Point<f64> {
    geo::Point::new(point.longitude, point.latitude)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(lon: f64, lat: f64) -> Point {
        Point::new(lon, lat)
    }

    #[test]
    fn hundredth_degree_at_equator_is_about_1112_meters() {
        let meters = SphericalMath
            .length_of(&[p(0.0, 0.0), p(0.0, 0.01)], LengthUnit::Meters)
            .unwrap();
        assert!((meters - 1111.95).abs() < 1.0, "got {meters}");
    }

    #[test]
    fn length_is_sum_of_segments_and_reversible() {
        let path = [p(-74.5, 40.0), p(-74.49, 40.01), p(-74.47, 40.0), p(-74.46, 40.03)];

        let total = SphericalMath.length_of(&path, LengthUnit::Yards).unwrap();
        let summed: f64 = path
            .windows(2)
            .map(|pair| SphericalMath.length_of(pair, LengthUnit::Yards).unwrap())
            .sum();
        assert!((total - summed).abs() < 1e-6);

        let mut reversed = path;
        reversed.reverse();
        let back = SphericalMath.length_of(&reversed, LengthUnit::Yards).unwrap();
        assert!((total - back).abs() < 1e-6);
    }

    #[test]
    fn degenerate_paths_have_zero_length() {
        assert!(SphericalMath.length_of(&[], LengthUnit::Miles).unwrap().abs() < f64::EPSILON);
        assert!(
            SphericalMath
                .length_of(&[p(1.0, 1.0)], LengthUnit::Miles)
                .unwrap()
                .abs()
                < f64::EPSILON
        );
    }

    #[test]
    fn area_is_non_negative_and_shift_invariant() {
        let ring = vec![p(0.0, 0.0), p(0.01, 0.0), p(0.01, 0.01), p(0.0, 0.01)];
        let area = SphericalMath.area_of(&ring).unwrap();
        // Roughly 1.112 km on each side.
        assert!((area - 1_236_431.0).abs() / 1_236_431.0 < 0.01, "got {area}");

        for shift in 1..ring.len() {
            let mut rotated = ring.clone();
            rotated.rotate_left(shift);
            let shifted = SphericalMath.area_of(&rotated).unwrap();
            assert!((area - shifted).abs() < 1e-3);
        }

        let mut clockwise = ring;
        clockwise.reverse();
        let reversed = SphericalMath.area_of(&clockwise).unwrap();
        assert!(reversed >= 0.0);
        assert!((area - reversed).abs() < 1e-3);
    }

    #[test]
    fn rings_below_three_distinct_points_have_zero_area() {
        let area = SphericalMath
            .area_of(&[p(0.0, 0.0), p(1.0, 1.0), p(0.0, 0.0)])
            .unwrap();
        assert!(area.abs() < f64::EPSILON);
    }

    #[test]
    fn invalid_coordinates_are_rejected() {
        let err = SphericalMath
            .length_of(&[p(0.0, 0.0), p(0.0, 95.0)], LengthUnit::Meters)
            .unwrap_err();
        assert_eq!(
            err,
            GeometryError::InvalidCoordinate {
                index: 1,
                point: p(0.0, 95.0)
            }
        );
        assert!(SphericalMath.area_of(&[p(f64::NAN, 0.0)]).is_err());
    }
}
