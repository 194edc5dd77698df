#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Feature editing on top of the draw session and the annotation store.
//!
//! [`FeatureEditor`] runs the create/edit lifecycle of one feature at a
//! time: a draft of name, colour and notes plus the pending geometry,
//! committed into the [`AnnotationStore`](field_map_annotation::AnnotationStore)
//! on save or discarded on cancel. Saving and cancelling non-trivial work
//! goes through a yes/no [`Prompt`] first.
//!
//! [`Workspace`] binds one map view, one store and one editor for the
//! lifetime of a map session.

mod editor;
mod workspace;

pub use editor::{Clock, Draft, DraftField, EditorMode, EditorOutcome, FeatureEditor, Prompt};
pub use workspace::Workspace;

use field_map_annotation::AnnotationError;
use field_map_annotation_models::{Color, FeatureKind, PaletteColor};
use field_map_draw::DrawError;
use field_map_geometry_models::GeometryKind;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors returned by [`FeatureEditor`] and [`Workspace`] operations.
///
/// None of them close the editor: the draft survives every error.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EditorError {
    /// The operation is not allowed in the editor's current state.
    #[error("Cannot {operation} while the editor is {state}")]
    InvalidState {
        /// The rejected operation.
        operation: &'static str,
        /// What the editor is doing instead.
        state: &'static str,
    },
    /// Save was attempted before the geometry reached its minimum size.
    #[error("A {kind} needs at least {required} distinct vertices, got {actual}")]
    IncompleteGeometry {
        /// Kind being drawn.
        kind: GeometryKind,
        /// Minimum distinct vertex count.
        required: usize,
        /// Distinct vertices placed.
        actual: usize,
    },
    /// [`FeatureEditor::answer`] was called with no prompt showing.
    #[error("No confirmation is pending")]
    NoPendingConfirmation,
    #[error(transparent)]
    Draw(#[from] DrawError),
    #[error(transparent)]
    Annotation(#[from] AnnotationError),
}

/// Colour a new feature of each kind starts with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultColors {
    /// Colour of new waypoints.
    pub waypoint: Color,
    /// Colour of new lines.
    pub line: Color,
    /// Colour of new areas.
    pub area: Color,
}

impl Default for DefaultColors {
    fn default() -> Self {
        Self {
            waypoint: PaletteColor::Red.into(),
            line: PaletteColor::Red.into(),
            area: PaletteColor::Blue.into(),
        }
    }
}

impl DefaultColors {
    /// The starting colour for a feature of `kind`.
    #[must_use]
    pub const fn for_kind(&self, kind: FeatureKind) -> &Color {
        match kind {
            FeatureKind::Waypoint => &self.waypoint,
            FeatureKind::Line => &self.line,
            FeatureKind::Area => &self.area,
        }
    }
}
