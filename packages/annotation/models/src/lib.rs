#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Committed annotation types.
//!
//! A [`Feature`] is a named, coloured, annotated geometry the user saved.
//! Features are partitioned by [`FeatureKind`] (waypoints, lines, areas)
//! because each partition renders on its own overlay.

use chrono::{DateTime, Utc};
use field_map_geometry_models::{Geometry, GeometryKind, Point};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use thiserror::Error;
use uuid::Uuid;

/// Stable unique identifier of a committed feature. Generated once at
/// commit and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureId(Uuid);

impl FeatureId {
    /// Generates a fresh random id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for FeatureId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for FeatureId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.0, f)
    }
}

impl std::str::FromStr for FeatureId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Partition of the annotation store.
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
pub enum FeatureKind {
    /// A single named point.
    Waypoint,
    /// A measured path.
    Line,
    /// A measured enclosed area.
    Area,
}

impl FeatureKind {
    /// The geometry kind a feature of this kind is drawn as.
    #[must_use]
    pub const fn geometry_kind(self) -> GeometryKind {
        match self {
            Self::Waypoint => GeometryKind::Point,
            Self::Line => GeometryKind::Line,
            Self::Area => GeometryKind::Polygon,
        }
    }

    /// The feature kind a geometry kind is stored as.
    #[must_use]
    pub const fn from_geometry_kind(kind: GeometryKind) -> Self {
        match kind {
            GeometryKind::Point => Self::Waypoint,
            GeometryKind::Line => Self::Line,
            GeometryKind::Polygon => Self::Area,
        }
    }

    /// Capitalised label used in default names and prompts.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Waypoint => "Waypoint",
            Self::Line => "Line",
            Self::Area => "Area",
        }
    }

    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Waypoint, Self::Line, Self::Area]
    }
}

/// Builds the label given to a feature saved with a blank name, e.g.
/// `Line 10/19/2026`.
#[must_use]
pub fn default_label(kind: FeatureKind, at: DateTime<Utc>) -> String {
    format!("{} {}", kind.label(), at.format("%-m/%-d/%Y"))
}

/// Fixed colour swatches offered by the editor.
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
pub enum PaletteColor {
    /// `#e53935`
    Red,
    /// `#1976d2`
    Blue,
    /// `#43a047`
    Green,
    /// `#fbc02d`
    Yellow,
    /// `#8e24aa`
    Purple,
    /// `#222222`
    Black,
}

impl PaletteColor {
    /// Hex value of the swatch.
    #[must_use]
    pub const fn hex(self) -> &'static str {
        match self {
            Self::Red => "#e53935",
            Self::Blue => "#1976d2",
            Self::Green => "#43a047",
            Self::Yellow => "#fbc02d",
            Self::Purple => "#8e24aa",
            Self::Black => "#222222",
        }
    }

    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Red,
            Self::Blue,
            Self::Green,
            Self::Yellow,
            Self::Purple,
            Self::Black,
        ]
    }
}

/// Error returned when a string is neither a palette name nor a hex colour.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid color {value:?}: expected a palette name or #rgb/#rrggbb")]
pub struct ColorError {
    /// The rejected input.
    pub value: String,
}

/// A display colour, stored as a lowercase `#rrggbb` or `#rgb` string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color(String);

impl Color {
    /// Parses a palette name (case insensitive) or a hex colour.
    ///
    /// # Errors
    ///
    /// Returns [`ColorError`] if the input is neither.
    pub fn parse(value: &str) -> Result<Self, ColorError> {
        let trimmed = value.trim();

        if let Ok(palette) = trimmed.parse::<PaletteColor>() {
            return Ok(palette.into());
        }

        let is_hex = trimmed.strip_prefix('#').is_some_and(|digits| {
            matches!(digits.len(), 3 | 6) && digits.chars().all(|c| c.is_ascii_hexdigit())
        });

        if is_hex {
            Ok(Self(trimmed.to_ascii_lowercase()))
        } else {
            Err(ColorError {
                value: value.to_string(),
            })
        }
    }

    /// The colour as a hex string.
    #[must_use]
    pub fn hex(&self) -> &str {
        &self.0
    }

    /// The palette swatch with this value, if any.
    #[must_use]
    pub fn palette(&self) -> Option<PaletteColor> {
        PaletteColor::all()
            .iter()
            .copied()
            .find(|swatch| swatch.hex() == self.0)
    }
}

impl From<PaletteColor> for Color {
    fn from(value: PaletteColor) -> Self {
        Self(value.hex().to_string())
    }
}

impl TryFrom<String> for Color {
    type Error = ColorError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Color> for String {
    fn from(value: Color) -> Self {
        value.0
    }
}

impl std::fmt::Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A committed, named, coloured geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Feature {
    /// Unique id.
    pub id: FeatureId,
    /// Committed geometry. Only waypoint positions change after commit.
    pub geometry: Geometry,
    /// Display colour.
    pub color: Color,
    /// Display name; never blank.
    pub name: String,
    /// Free-text notes, possibly empty.
    pub notes: String,
    /// When the feature was committed.
    pub created_at: DateTime<Utc>,
}

impl Feature {
    /// The partition this feature belongs to.
    #[must_use]
    pub const fn kind(&self) -> FeatureKind {
        FeatureKind::from_geometry_kind(self.geometry.kind())
    }

    /// Position of a waypoint; `None` for lines and areas.
    #[must_use]
    pub const fn position(&self) -> Option<Point> {
        match self.geometry {
            Geometry::Point(point) => Some(point),
            Geometry::LineString(_) | Geometry::Polygon(_) => None,
        }
    }
}

/// Partial update of a committed feature. `None` fields are left alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeaturePatch {
    /// New name.
    pub name: Option<String>,
    /// New colour.
    pub color: Option<Color>,
    /// New notes.
    pub notes: Option<String>,
    /// New position; accepted for waypoints only.
    pub position: Option<Point>,
}

impl FeaturePatch {
    /// Sets the name.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the colour.
    #[must_use]
    pub fn color(mut self, color: Color) -> Self {
        self.color = Some(color);
        self
    }

    /// Sets the notes.
    #[must_use]
    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Sets the position.
    #[must_use]
    pub const fn position(mut self, position: Point) -> Self {
        self.position = Some(position);
        self
    }

    /// Whether the patch changes nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.color.is_none()
            && self.notes.is_none()
            && self.position.is_none()
    }
}
