//! One map session: a map view, the annotation store and the editor.
//!
//! Clicks on persisted features arrive on the map view's callback and are
//! queued on a channel; [`Workspace::poll_clicks`] drains the queue and
//! opens the editor on the clicked feature.

use std::sync::{Arc, mpsc};

use field_map_annotation::{AnnotationStore, kind_for};
use field_map_annotation_models::{Feature, FeatureId, FeatureKind};
use field_map_map_view::{ClickSubscription, MapView, OverlayName};
use field_map_measure::MeasurementEngine;

use crate::{DefaultColors, EditorError, EditorMode, EditorOutcome, FeatureEditor};

/// A feature click as delivered by the map view.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Click {
    overlay: OverlayName,
    feature_id: String,
}

/// Owns everything tied to one map session.
pub struct Workspace {
    map_view: Arc<dyn MapView>,
    store: AnnotationStore,
    editor: FeatureEditor,
    clicks: mpsc::Receiver<Click>,
    subscriptions: Vec<ClickSubscription>,
}

impl std::fmt::Debug for Workspace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workspace")
            .field("store", &self.store)
            .field("editor", &self.editor)
            .finish_non_exhaustive()
    }
}

impl Workspace {
    /// Creates a workspace on `map_view`, pushing the (empty) persisted
    /// overlays and subscribing to clicks on them.
    #[must_use]
    pub fn new(
        map_view: Arc<dyn MapView>,
        engine: MeasurementEngine,
        defaults: DefaultColors,
    ) -> Self {
        let editor = FeatureEditor::new(Arc::clone(&map_view), engine, defaults);
        Self::with_editor(map_view, editor)
    }

    /// Creates a workspace around an already configured editor.
    #[must_use]
    pub fn with_editor(map_view: Arc<dyn MapView>, editor: FeatureEditor) -> Self {
        let (sender, clicks) = mpsc::channel();
        let mut subscriptions = Vec::with_capacity(OverlayName::persisted().len());

        for overlay in OverlayName::persisted() {
            let sender = sender.clone();
            let overlay = *overlay;
            let subscription = map_view.on_feature_click(
                overlay,
                Box::new(move |feature_id| {
                    let click = Click {
                        overlay,
                        feature_id: feature_id.to_string(),
                    };
                    if sender.send(click).is_err() {
                        log::trace!("Dropping click on {overlay}: workspace is gone");
                    }
                }),
            );
            subscriptions.push(subscription);
        }

        let store = AnnotationStore::new(Arc::clone(&map_view));
        store.refresh_all();

        Self {
            map_view,
            store,
            editor,
            clicks,
            subscriptions,
        }
    }

    #[must_use]
    pub const fn store(&self) -> &AnnotationStore {
        &self.store
    }

    #[must_use]
    pub const fn editor(&self) -> &FeatureEditor {
        &self.editor
    }

    /// The editor, for drawing passthroughs and draft updates.
    pub const fn editor_mut(&mut self) -> &mut FeatureEditor {
        &mut self.editor
    }

    /// Opens the editor for a new feature.
    ///
    /// # Errors
    ///
    /// See [`FeatureEditor::open_for_create`].
    pub fn open_for_create(&mut self, kind: FeatureKind) -> Result<(), EditorError> {
        self.editor.open_for_create(kind)
    }

    /// Opens the editor on a committed feature.
    ///
    /// # Errors
    ///
    /// See [`FeatureEditor::open_for_edit`].
    pub fn open_for_edit(&mut self, id: FeatureId) -> Result<(), EditorError> {
        self.editor.open_for_edit(&self.store, id)
    }

    /// The save button.
    ///
    /// # Errors
    ///
    /// See [`FeatureEditor::request_save`].
    pub fn request_save(&mut self) -> Result<EditorOutcome, EditorError> {
        self.editor.request_save(&mut self.store)
    }

    /// The cancel button.
    pub fn request_cancel(&mut self) -> EditorOutcome {
        self.editor.request_cancel()
    }

    /// Answers the editor's pending prompt.
    ///
    /// # Errors
    ///
    /// See [`FeatureEditor::answer`].
    pub fn answer(&mut self, yes: bool) -> Result<EditorOutcome, EditorError> {
        self.editor.answer(&mut self.store, yes)
    }

    /// Deletes the feature open in the editor.
    ///
    /// # Errors
    ///
    /// See [`FeatureEditor::delete_edited`].
    pub fn delete_edited(&mut self) -> Result<FeatureId, EditorError> {
        self.editor.delete_edited(&mut self.store)
    }

    /// Deletes any committed feature. An editor open on it is closed
    /// first.
    ///
    /// # Errors
    ///
    /// * [`EditorError::Annotation`] if the feature does not exist
    pub fn delete_feature(&mut self, id: FeatureId) -> Result<Feature, EditorError> {
        if self.editor.mode() == Some(EditorMode::Edit(id)) {
            self.editor.cancel();
        }
        Ok(self.store.remove(&id)?)
    }

    /// Handles queued feature clicks. While the editor is closed, a click
    /// on a known feature opens it for editing; every other click is
    /// dropped. Returns the feature opened, if any.
    ///
    /// # Errors
    ///
    /// See [`FeatureEditor::open_for_edit`].
    pub fn poll_clicks(&mut self) -> Result<Option<FeatureId>, EditorError> {
        let mut opened = None;

        while let Ok(click) = self.clicks.try_recv() {
            if self.editor.is_open() {
                log::debug!("Ignoring click on {}: editor is open", click.overlay);
                continue;
            }

            let Ok(id) = click.feature_id.parse::<FeatureId>() else {
                log::warn!("Ignoring click with malformed id {:?}", click.feature_id);
                continue;
            };

            let known = self
                .store
                .get(&id)
                .is_some_and(|feature| kind_for(click.overlay) == Some(feature.kind()));
            if !known {
                log::warn!("Ignoring click on unknown feature {id} in {}", click.overlay);
                continue;
            }

            self.editor.open_for_edit(&self.store, id)?;
            opened = Some(id);
        }

        Ok(opened)
    }

    /// Restores every overlay after the map dropped its sources, as it
    /// does on a basemap style change.
    pub fn handle_map_reload(&mut self) {
        log::info!("Map reloaded, re-pushing overlays");
        self.store.refresh_all();
        self.editor.refresh_preview();
    }

    /// Ends the session: discards any draft, removes every overlay and
    /// unregisters the click handlers.
    pub fn shutdown(mut self) {
        self.editor.cancel();
        self.store.clear();
        for overlay in OverlayName::all() {
            self.map_view.remove_overlay(*overlay);
        }
        self.unsubscribe_clicks();
        log::info!("Workspace shut down");
    }

    fn unsubscribe_clicks(&mut self) {
        for subscription in self.subscriptions.drain(..) {
            if !self.map_view.remove_feature_click(subscription) {
                log::debug!("Click handler {subscription:?} was already removed");
            }
        }
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        self.unsubscribe_clicks();
    }
}

#[cfg(test)]
mod tests {
    use field_map_geometry::SphericalMath;
    use field_map_geometry_models::Point;
    use field_map_map_view::InMemoryMapView;
    use field_map_measure::MeasurementConfig;

    use super::*;

    fn setup() -> (Arc<InMemoryMapView>, Workspace) {
        let view = Arc::new(InMemoryMapView::new(Point::new(-74.5, 40.0)));
        let engine = MeasurementEngine::new(Arc::new(SphericalMath), MeasurementConfig::default());
        let workspace = Workspace::new(view.clone(), engine, DefaultColors::default());
        (view, workspace)
    }

    fn add_waypoint(workspace: &mut Workspace) -> FeatureId {
        workspace.open_for_create(FeatureKind::Waypoint).unwrap();
        let EditorOutcome::Committed(id) = workspace.request_save().unwrap() else {
            panic!("expected a commit");
        };
        id
    }

    #[test]
    fn new_workspace_pushes_empty_persisted_overlays() {
        let (view, _workspace) = setup();
        for overlay in OverlayName::persisted() {
            assert!(view.has_overlay(*overlay));
            assert_eq!(view.feature_count(*overlay), 0);
        }
    }

    #[test]
    fn click_opens_editor_on_feature() {
        let (view, mut workspace) = setup();
        let id = add_waypoint(&mut workspace);

        assert_eq!(view.click(OverlayName::Waypoints, &id.to_string()), 1);
        assert_eq!(workspace.poll_clicks().unwrap(), Some(id));
        assert_eq!(workspace.editor().mode(), Some(EditorMode::Edit(id)));

        view.click(OverlayName::Waypoints, &id.to_string());
        assert_eq!(workspace.poll_clicks().unwrap(), None);
    }

    #[test]
    fn clicks_on_unknown_or_malformed_ids_are_ignored() {
        let (view, mut workspace) = setup();
        let id = add_waypoint(&mut workspace);

        view.click(OverlayName::Waypoints, "not-an-id");
        view.click(OverlayName::Waypoints, &FeatureId::new().to_string());
        view.click(OverlayName::Lines, &id.to_string());

        assert_eq!(workspace.poll_clicks().unwrap(), None);
        assert!(!workspace.editor().is_open());
    }

    #[test]
    fn map_reload_restores_persisted_and_preview_overlays() {
        let (view, mut workspace) = setup();
        add_waypoint(&mut workspace);
        workspace.open_for_create(FeatureKind::Line).unwrap();
        workspace.editor_mut().add_vertex(Point::new(0.0, 0.0)).unwrap();
        workspace.editor_mut().add_vertex(Point::new(0.0, 0.01)).unwrap();

        view.reload();
        assert!(!view.has_overlay(OverlayName::Waypoints));
        assert!(!view.has_overlay(OverlayName::LivePreview));

        workspace.handle_map_reload();

        assert_eq!(view.feature_count(OverlayName::Waypoints), 1);
        assert!(view.has_overlay(OverlayName::Lines));
        assert_eq!(view.feature_count(OverlayName::LivePreview), 1);
        assert_eq!(view.feature_count(OverlayName::LivePreviewVertices), 2);
    }

    #[test]
    fn deleting_the_edited_feature_closes_editor() {
        let (view, mut workspace) = setup();
        let id = add_waypoint(&mut workspace);
        workspace.open_for_edit(id).unwrap();

        let removed = workspace.delete_feature(id).unwrap();

        assert_eq!(removed.id, id);
        assert!(!workspace.editor().is_open());
        assert_eq!(view.feature_count(OverlayName::Waypoints), 0);
        assert!(workspace.delete_feature(id).is_err());
    }

    #[test]
    fn shutdown_removes_every_overlay() {
        let (view, mut workspace) = setup();
        add_waypoint(&mut workspace);
        workspace.open_for_create(FeatureKind::Area).unwrap();
        workspace.editor_mut().add_vertex(Point::new(0.0, 0.0)).unwrap();

        workspace.shutdown();

        for overlay in OverlayName::all() {
            assert!(!view.has_overlay(*overlay), "{overlay} left behind");
        }
        assert_eq!(view.click(OverlayName::Waypoints, "x"), 0);
    }

    #[test]
    fn workspaces_on_one_view_do_not_accumulate_handlers() {
        let view = Arc::new(InMemoryMapView::new(Point::new(-74.5, 40.0)));
        let engine = MeasurementEngine::new(Arc::new(SphericalMath), MeasurementConfig::default());

        for _ in 0..3 {
            let mut workspace =
                Workspace::new(view.clone(), engine.clone(), DefaultColors::default());
            add_waypoint(&mut workspace);
            assert_eq!(view.click(OverlayName::Waypoints, "x"), 1);
            workspace.shutdown();
        }
        assert_eq!(view.click(OverlayName::Waypoints, "x"), 0);

        let dropped = Workspace::new(view.clone(), engine, DefaultColors::default());
        drop(dropped);
        assert_eq!(view.click(OverlayName::Lines, "x"), 0);
    }
}
