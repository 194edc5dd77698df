#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! The map view boundary.
//!
//! The core never touches the rendering engine directly. It writes
//! `GeoJSON` into named overlays through the [`MapView`] trait, asks for the
//! viewport centre, and subscribes to clicks on rendered features. Every
//! overlay has exactly one writer, recorded by [`OverlayName::owner`]:
//!
//! | Overlay | Writer |
//! |---|---|
//! | `waypoints`, `lines`, `areas` | annotation store |
//! | `live-preview`, `live-preview-vertices`, `live-preview-labels` | live preview |
//!
//! [`InMemoryMapView`] is a complete adapter that keeps overlay data in
//! memory; the CLI and the tests drive the core through it.

mod in_memory;

pub use in_memory::InMemoryMapView;

use field_map_geometry_models::Point;
use geojson::FeatureCollection;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Named overlay sources on the map.
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
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum OverlayName {
    /// Committed waypoints.
    Waypoints,
    /// Committed lines.
    Lines,
    /// Committed areas.
    Areas,
    /// The geometry being drawn (line, polygon fill/outline or point).
    LivePreview,
    /// Vertex markers of the geometry being drawn.
    LivePreviewVertices,
    /// Segment and total distance labels of the geometry being drawn.
    LivePreviewLabels,
}

/// The component allowed to write an overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum OverlayOwner {
    /// The annotation store (persisted features).
    AnnotationStore,
    /// The live preview attached to a draw session.
    LivePreview,
}

impl OverlayName {
    /// The single component that writes this overlay.
    #[must_use]
    pub const fn owner(self) -> OverlayOwner {
        match self {
            Self::Waypoints | Self::Lines | Self::Areas => OverlayOwner::AnnotationStore,
            Self::LivePreview | Self::LivePreviewVertices | Self::LivePreviewLabels => {
                OverlayOwner::LivePreview
            }
        }
    }

    /// Overlays holding persisted features.
    #[must_use]
    pub const fn persisted() -> &'static [Self] {
        &[Self::Waypoints, Self::Lines, Self::Areas]
    }

    /// Overlays mirroring an uncommitted draw session.
    #[must_use]
    pub const fn live_preview() -> &'static [Self] {
        &[
            Self::LivePreview,
            Self::LivePreviewVertices,
            Self::LivePreviewLabels,
        ]
    }

    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Waypoints,
            Self::Lines,
            Self::Areas,
            Self::LivePreview,
            Self::LivePreviewVertices,
            Self::LivePreviewLabels,
        ]
    }
}

/// Callback invoked with the `GeoJSON` id of a clicked feature.
pub type FeatureClickHandler = Box<dyn Fn(&str) + Send + Sync>;

/// Handle returned by [`MapView::on_feature_click`], used to unregister
/// the handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClickSubscription(u64);

impl ClickSubscription {
    /// Wraps an adapter-assigned handle. Adapters must not reuse a value
    /// while its handler is registered.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }
}

/// The core's only way to make geometry visible.
///
/// Methods take `&self`; adapters use interior mutability so one instance
/// can be shared behind an `Arc` by the store, the live preview and the
/// workspace.
pub trait MapView: Send + Sync {
    /// Replaces the full contents of an overlay, creating it if needed.
    fn set_overlay_data(&self, overlay: OverlayName, data: FeatureCollection);

    /// Removes an overlay and its data. Removing a missing overlay is a
    /// no-op.
    fn remove_overlay(&self, overlay: OverlayName);

    /// Current centre of the viewport.
    fn viewport_center(&self) -> Point;

    /// Registers a handler for clicks on features rendered in `overlay`.
    /// The handler stays registered until removed, across reloads.
    fn on_feature_click(
        &self,
        overlay: OverlayName,
        handler: FeatureClickHandler,
    ) -> ClickSubscription;

    /// Unregisters a click handler. Returns `false` if it was not
    /// registered.
    fn remove_feature_click(&self, subscription: ClickSubscription) -> bool;
}
