#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! The annotation store.
//!
//! [`AnnotationStore`] is the single source of truth for committed
//! features during a map session. Features are kept in insertion order in
//! one partition per [`FeatureKind`], and every mutation pushes the full
//! partition to its overlay on the [`MapView`]. The map never holds
//! anything the store does not.

use std::sync::Arc;

use field_map_annotation_models::{Feature, FeatureId, FeatureKind, FeaturePatch};
use field_map_geometry::geo_json;
use field_map_geometry_models::{Geometry, GeometryKind};
use field_map_map_view::{MapView, OverlayName};
use geojson::{FeatureCollection, JsonObject};
use indexmap::IndexMap;
use thiserror::Error;

/// Errors returned by [`AnnotationStore`] operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnnotationError {
    /// No feature with this id exists.
    #[error("Feature {0} not found")]
    NotFound(FeatureId),
    /// A feature with this id is already stored.
    #[error("Feature {0} already exists")]
    DuplicateId(FeatureId),
    /// A position patch was applied to a line or area.
    #[error("Feature {id} is a {kind} and cannot be repositioned")]
    GeometryNotEditable {
        /// The feature that was patched.
        id: FeatureId,
        /// Its geometry kind.
        kind: GeometryKind,
    },
}

/// Committed features, partitioned by kind and mirrored to the map.
pub struct AnnotationStore {
    waypoints: IndexMap<FeatureId, Feature>,
    lines: IndexMap<FeatureId, Feature>,
    areas: IndexMap<FeatureId, Feature>,
    map_view: Arc<dyn MapView>,
}

impl std::fmt::Debug for AnnotationStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnnotationStore")
            .field("waypoints", &self.waypoints.len())
            .field("lines", &self.lines.len())
            .field("areas", &self.areas.len())
            .finish_non_exhaustive()
    }
}

/// The overlay a partition is rendered on.
#[must_use]
pub const fn overlay_for(kind: FeatureKind) -> OverlayName {
    match kind {
        FeatureKind::Waypoint => OverlayName::Waypoints,
        FeatureKind::Line => OverlayName::Lines,
        FeatureKind::Area => OverlayName::Areas,
    }
}

/// The partition rendered on a persisted overlay, or `None` for live
/// preview overlays.
#[must_use]
pub const fn kind_for(overlay: OverlayName) -> Option<FeatureKind> {
    match overlay {
        OverlayName::Waypoints => Some(FeatureKind::Waypoint),
        OverlayName::Lines => Some(FeatureKind::Line),
        OverlayName::Areas => Some(FeatureKind::Area),
        OverlayName::LivePreview
        | OverlayName::LivePreviewVertices
        | OverlayName::LivePreviewLabels => None,
    }
}

impl AnnotationStore {
    /// Creates an empty store writing to `map_view`.
    ///
    /// Nothing is pushed until the first mutation or [`Self::refresh_all`].
    #[must_use]
    pub fn new(map_view: Arc<dyn MapView>) -> Self {
        Self {
            waypoints: IndexMap::new(),
            lines: IndexMap::new(),
            areas: IndexMap::new(),
            map_view,
        }
    }

    const fn partition(&self, kind: FeatureKind) -> &IndexMap<FeatureId, Feature> {
        match kind {
            FeatureKind::Waypoint => &self.waypoints,
            FeatureKind::Line => &self.lines,
            FeatureKind::Area => &self.areas,
        }
    }

    const fn partition_mut(&mut self, kind: FeatureKind) -> &mut IndexMap<FeatureId, Feature> {
        match kind {
            FeatureKind::Waypoint => &mut self.waypoints,
            FeatureKind::Line => &mut self.lines,
            FeatureKind::Area => &mut self.areas,
        }
    }

    fn kind_of(&self, id: &FeatureId) -> Option<FeatureKind> {
        FeatureKind::all()
            .iter()
            .copied()
            .find(|kind| self.partition(*kind).contains_key(id))
    }

    /// Stores a new feature and pushes its partition to the map.
    ///
    /// # Errors
    ///
    /// * [`AnnotationError::DuplicateId`] if the id is already stored in
    ///   any partition
    pub fn add(&mut self, feature: Feature) -> Result<&Feature, AnnotationError> {
        let id = feature.id;

        if self.kind_of(&id).is_some() {
            log::error!("Refusing to add feature {id}: id already stored");
            return Err(AnnotationError::DuplicateId(id));
        }

        let kind = feature.kind();
        log::info!("Adding {kind} {id} ({:?})", feature.name);
        self.partition_mut(kind).insert(id, feature);
        self.refresh(kind);

        self.get(&id).ok_or(AnnotationError::NotFound(id))
    }

    /// Merges `patch` into an existing feature and pushes its partition.
    ///
    /// Position patches are accepted for waypoints only; committed lines
    /// and areas keep their geometry.
    ///
    /// # Errors
    ///
    /// * [`AnnotationError::NotFound`] if no feature has this id
    /// * [`AnnotationError::GeometryNotEditable`] if the patch carries a
    ///   position and the feature is not a waypoint
    pub fn update(
        &mut self,
        id: &FeatureId,
        patch: FeaturePatch,
    ) -> Result<&Feature, AnnotationError> {
        let kind = self.kind_of(id).ok_or(AnnotationError::NotFound(*id))?;
        let feature = self
            .partition_mut(kind)
            .get_mut(id)
            .ok_or(AnnotationError::NotFound(*id))?;

        if patch.position.is_some() && kind != FeatureKind::Waypoint {
            return Err(AnnotationError::GeometryNotEditable {
                id: *id,
                kind: feature.geometry.kind(),
            });
        }

        if let Some(name) = patch.name {
            feature.name = name;
        }
        if let Some(color) = patch.color {
            feature.color = color;
        }
        if let Some(notes) = patch.notes {
            feature.notes = notes;
        }
        if let Some(position) = patch.position {
            feature.geometry = Geometry::Point(position);
        }

        log::info!("Updated {kind} {id}");
        self.refresh(kind);

        self.get(id).ok_or(AnnotationError::NotFound(*id))
    }

    /// Removes a feature and pushes its partition.
    ///
    /// # Errors
    ///
    /// * [`AnnotationError::NotFound`] if no feature has this id
    pub fn remove(&mut self, id: &FeatureId) -> Result<Feature, AnnotationError> {
        let kind = self.kind_of(id).ok_or(AnnotationError::NotFound(*id))?;
        let feature = self
            .partition_mut(kind)
            .shift_remove(id)
            .ok_or(AnnotationError::NotFound(*id))?;

        log::info!("Removed {kind} {id}");
        self.refresh(kind);

        Ok(feature)
    }

    /// Looks up a feature in any partition.
    #[must_use]
    pub fn get(&self, id: &FeatureId) -> Option<&Feature> {
        FeatureKind::all()
            .iter()
            .find_map(|kind| self.partition(*kind).get(id))
    }

    /// Features of one kind, in insertion order.
    #[must_use]
    pub fn get_all(&self, kind: FeatureKind) -> Vec<&Feature> {
        self.partition(kind).values().collect()
    }

    /// Total number of stored features.
    #[must_use]
    pub fn len(&self) -> usize {
        self.waypoints.len() + self.lines.len() + self.areas.len()
    }

    /// Whether no features are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The `GeoJSON` rendering of one partition.
    #[must_use]
    pub fn feature_collection(&self, kind: FeatureKind) -> FeatureCollection {
        geo_json::collection(self.partition(kind).values().map(to_geojson).collect())
    }

    /// Pushes one partition to its overlay.
    pub fn refresh(&self, kind: FeatureKind) {
        let data = self.feature_collection(kind);
        log::debug!("Pushing {} {kind} features", data.features.len());
        self.map_view.set_overlay_data(overlay_for(kind), data);
    }

    /// Pushes every partition, e.g. after the map dropped its sources on a
    /// basemap change.
    pub fn refresh_all(&self) {
        for kind in FeatureKind::all() {
            self.refresh(*kind);
        }
    }

    /// Removes every feature and every persisted overlay.
    pub fn clear(&mut self) {
        for kind in FeatureKind::all() {
            self.partition_mut(*kind).clear();
            self.map_view.remove_overlay(overlay_for(*kind));
        }
    }
}

fn to_geojson(feature: &Feature) -> geojson::Feature {
    let mut properties = JsonObject::new();
    properties.insert("name".to_string(), feature.name.clone().into());
    properties.insert("color".to_string(), feature.color.hex().into());
    properties.insert("notes".to_string(), feature.notes.clone().into());
    properties.insert("kind".to_string(), feature.kind().as_ref().into());
    properties.insert(
        "createdAt".to_string(),
        feature.created_at.to_rfc3339().into(),
    );

    geo_json::feature(
        &feature.geometry,
        Some(feature.id.to_string()),
        properties,
    )
}
