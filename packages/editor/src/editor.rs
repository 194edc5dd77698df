use std::sync::Arc;

use chrono::{DateTime, Utc};
use field_map_annotation::{AnnotationError, AnnotationStore};
use field_map_annotation_models::{
    Color, Feature, FeatureId, FeatureKind, FeaturePatch, default_label,
};
use field_map_draw::{DrawError, DrawSession, SubscriptionId};
use field_map_geometry_models::{Geometry, Point};
use field_map_map_view::MapView;
use field_map_measure::{LatestMeasurement, LivePreview, MeasurementEngine, MeasurementSnapshot};

use crate::{DefaultColors, EditorError};

/// Source of commit timestamps and default-label dates.
pub type Clock = Box<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// What the open editor is doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorMode {
    /// Creating a new feature of this kind.
    Create(FeatureKind),
    /// Editing a committed feature.
    Edit(FeatureId),
}

/// The form values of the feature being created or edited.
#[derive(Debug, Clone, PartialEq)]
pub struct Draft {
    /// Name as typed; may be blank.
    pub name: String,
    pub color: Color,
    /// Free-text notes.
    pub notes: String,
    /// Waypoint position; `None` for lines and areas.
    pub position: Option<Point>,
    /// Name used when `name` is left blank.
    pub placeholder: String,
}

impl Draft {
    /// The name the feature will be saved with.
    #[must_use]
    pub fn resolved_name(&self) -> String {
        let name = self.name.trim();
        if name.is_empty() {
            self.placeholder.clone()
        } else {
            name.to_string()
        }
    }
}

/// One form field change.
#[derive(Debug, Clone, PartialEq)]
pub enum DraftField {
    Name(String),
    Color(Color),
    Notes(String),
}

/// A yes/no question the user must answer before the editor proceeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prompt {
    /// Throw away the draft?
    DiscardDraft {
        /// Kind of the feature.
        kind: FeatureKind,
        /// Whether a committed feature is being edited.
        editing: bool,
    },
    /// Save the new feature? Answering no discards it.
    CommitDraft {
        /// Kind of the feature.
        kind: FeatureKind,
    },
}

impl Prompt {
    /// Text shown to the user.
    #[must_use]
    pub fn message(self) -> String {
        match self {
            Self::DiscardDraft {
                kind: FeatureKind::Waypoint,
                editing: false,
            } => "Are you sure you want to cancel waypoint placement?".to_string(),
            Self::DiscardDraft {
                kind,
                editing: false,
            } => format!("Are you sure you want to cancel {kind} drawing?"),
            Self::DiscardDraft {
                kind,
                editing: true,
            } => format!("Discard your changes to this {kind}?"),
            Self::CommitDraft { kind } => format!("Save this {kind}?"),
        }
    }
}

/// Result of a save, cancel or prompt answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorOutcome {
    /// The feature was written to the store.
    Committed(FeatureId),
    /// The draft was thrown away and the editor closed.
    Discarded,
    /// The user must answer this prompt via [`FeatureEditor::answer`].
    NeedsConfirmation(Prompt),
    /// The prompt was declined; editing continues.
    Resumed,
}

struct Session {
    mode: EditorMode,
    kind: FeatureKind,
    draft: Draft,
    baseline: Draft,
    preview: Option<SubscriptionId>,
    pending: Option<Prompt>,
}

/// Create/edit lifecycle of one feature at a time.
///
/// Lines and areas are drawn through an owned [`DrawSession`] with a
/// [`LivePreview`] subscribed for as long as the editor is open. Waypoints
/// are placed by position: new ones start at the viewport centre, and a
/// committed one enters the draw session's editing state while it is
/// dragged.
pub struct FeatureEditor {
    draw: DrawSession,
    map_view: Arc<dyn MapView>,
    engine: MeasurementEngine,
    defaults: DefaultColors,
    latest: Arc<LatestMeasurement>,
    clock: Clock,
    session: Option<Session>,
}

impl std::fmt::Debug for FeatureEditor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeatureEditor")
            .field("draw", &self.draw)
            .field("mode", &self.mode())
            .field("draft", &self.draft())
            .finish_non_exhaustive()
    }
}

impl FeatureEditor {
    /// Creates a closed editor drawing on `map_view`.
    #[must_use]
    pub fn new(
        map_view: Arc<dyn MapView>,
        engine: MeasurementEngine,
        defaults: DefaultColors,
    ) -> Self {
        Self {
            draw: DrawSession::new(),
            map_view,
            engine,
            defaults,
            latest: Arc::new(LatestMeasurement::new()),
            clock: Box::new(Utc::now),
            session: None,
        }
    }

    /// Replaces the clock used for timestamps and default labels.
    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Whether a feature is being created or edited.
    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.session.is_some()
    }

    /// What the open editor is doing, `None` when closed.
    #[must_use]
    pub fn mode(&self) -> Option<EditorMode> {
        self.session.as_ref().map(|session| session.mode)
    }

    /// Form values of the open editor.
    #[must_use]
    pub fn draft(&self) -> Option<&Draft> {
        self.session.as_ref().map(|session| &session.draft)
    }

    /// The prompt awaiting [`Self::answer`], if any.
    #[must_use]
    pub fn pending_prompt(&self) -> Option<Prompt> {
        self.session.as_ref().and_then(|session| session.pending)
    }

    /// The owned draw session, for inspecting the geometry in progress.
    #[must_use]
    pub const fn draw_session(&self) -> &DrawSession {
        &self.draw
    }

    /// The latest live measurement, for the readout.
    #[must_use]
    pub fn measurement(&self) -> MeasurementSnapshot {
        self.latest.get().unwrap_or_else(|| self.engine.empty())
    }

    fn session(&self, operation: &'static str) -> Result<&Session, EditorError> {
        self.session.as_ref().ok_or(EditorError::InvalidState {
            operation,
            state: "closed",
        })
    }

    fn session_mut(&mut self, operation: &'static str) -> Result<&mut Session, EditorError> {
        self.session.as_mut().ok_or(EditorError::InvalidState {
            operation,
            state: "closed",
        })
    }

    const fn require_closed(&self, operation: &'static str) -> Result<(), EditorError> {
        if self.session.is_some() {
            return Err(EditorError::InvalidState {
                operation,
                state: "open",
            });
        }
        Ok(())
    }

    fn attach_preview(&mut self) -> SubscriptionId {
        let preview = LivePreview::new(self.engine.clone(), Arc::clone(&self.map_view))
            .with_sink(self.latest.clone());
        self.draw.subscribe(Box::new(preview))
    }

    fn open(
        &mut self,
        mode: EditorMode,
        kind: FeatureKind,
        draft: Draft,
        preview: Option<SubscriptionId>,
    ) {
        log::info!("Opened editor: {mode:?}");
        self.session = Some(Session {
            mode,
            kind,
            baseline: draft.clone(),
            draft,
            preview,
            pending: None,
        });
    }

    /// Opens the editor for a new feature.
    ///
    /// Lines and areas start a draw session with the live preview
    /// attached. Waypoints start at the viewport centre.
    ///
    /// # Errors
    ///
    /// * [`EditorError::InvalidState`] if the editor is already open
    pub fn open_for_create(&mut self, kind: FeatureKind) -> Result<(), EditorError> {
        self.require_closed("open a new feature")?;

        let position = match kind {
            FeatureKind::Waypoint => Some(self.map_view.viewport_center()),
            FeatureKind::Line | FeatureKind::Area => None,
        };

        let preview = if position.is_some() {
            None
        } else {
            let preview = self.attach_preview();
            if let Err(e) = self.draw.start_drawing(kind.geometry_kind()) {
                self.draw.unsubscribe(preview);
                return Err(e.into());
            }
            Some(preview)
        };

        let draft = Draft {
            name: String::new(),
            color: self.defaults.for_kind(kind).clone(),
            notes: String::new(),
            position,
            placeholder: default_label(kind, (self.clock)()),
        };

        self.open(EditorMode::Create(kind), kind, draft, preview);
        Ok(())
    }

    /// Opens the editor on a committed feature.
    ///
    /// # Errors
    ///
    /// * [`EditorError::InvalidState`] if the editor is already open
    /// * [`AnnotationError::NotFound`] if the feature does not exist
    pub fn open_for_edit(
        &mut self,
        store: &AnnotationStore,
        id: FeatureId,
    ) -> Result<(), EditorError> {
        self.require_closed("edit a feature")?;

        let feature = store.get(&id).ok_or(AnnotationError::NotFound(id))?;
        let kind = feature.kind();
        let draft = Draft {
            name: feature.name.clone(),
            color: feature.color.clone(),
            notes: feature.notes.clone(),
            position: feature.position(),
            placeholder: default_label(kind, (self.clock)()),
        };

        self.open(EditorMode::Edit(id), kind, draft, None);
        Ok(())
    }

    /// Sets one form field. A blank name gets a fresh default label.
    ///
    /// # Errors
    ///
    /// * [`EditorError::InvalidState`] if the editor is closed
    pub fn update_draft_field(&mut self, field: DraftField) -> Result<(), EditorError> {
        let now = (self.clock)();
        let session = self.session_mut("update the draft")?;

        match field {
            DraftField::Name(name) => session.draft.name = name,
            DraftField::Color(color) => session.draft.color = color,
            DraftField::Notes(notes) => session.draft.notes = notes,
        }

        if session.draft.name.trim().is_empty() {
            session.draft.placeholder = default_label(session.kind, now);
        }

        Ok(())
    }

    /// Places a vertex. For a waypoint this sets its position.
    ///
    /// # Errors
    ///
    /// * [`EditorError::InvalidState`] if the editor is closed
    /// * [`EditorError::Draw`] if the draw session rejects the vertex
    pub fn add_vertex(&mut self, point: Point) -> Result<(), EditorError> {
        if self.session("add a vertex")?.kind == FeatureKind::Waypoint {
            return self.set_draft_position(point);
        }

        Ok(self.draw.add_vertex(point)?)
    }

    /// Drags a vertex of the geometry being drawn. Index 0 of a waypoint
    /// is its position.
    ///
    /// # Errors
    ///
    /// * [`EditorError::InvalidState`] if the editor is closed
    /// * [`EditorError::Draw`] if the draw session rejects the move
    pub fn move_vertex(&mut self, index: usize, point: Point) -> Result<(), EditorError> {
        if self.session("move a vertex")?.kind == FeatureKind::Waypoint {
            if index != 0 {
                return Err(DrawError::VertexOutOfRange { index, len: 1 }.into());
            }
            return self.set_draft_position(point);
        }

        Ok(self.draw.move_vertex(index, point)?)
    }

    /// Undoes the latest vertex of a line or area being drawn.
    pub fn remove_last_vertex(&mut self) -> Option<Point> {
        if self.session.is_none() {
            return None;
        }
        self.draw.remove_last_vertex()
    }

    /// Moves the waypoint being created or edited.
    ///
    /// Editing a committed waypoint enters the draw session's editing
    /// state, so the new position is previewed until save or cancel.
    ///
    /// # Errors
    ///
    /// * [`EditorError::InvalidState`] if the editor is closed or is not
    ///   editing a waypoint
    /// * [`EditorError::Draw`] if the point is not a valid coordinate
    pub fn set_draft_position(&mut self, point: Point) -> Result<(), EditorError> {
        let session = self.session("place a waypoint")?;
        if session.kind != FeatureKind::Waypoint {
            return Err(EditorError::InvalidState {
                operation: "place a waypoint",
                state: "open on a line or area",
            });
        }
        if !point.is_valid() {
            return Err(DrawError::InvalidCoordinate { point }.into());
        }

        if let (EditorMode::Edit(id), Some(start)) = (session.mode, session.draft.position) {
            if self.draw.is_idle() {
                let preview = self.attach_preview();
                if let Err(e) = self.draw.begin_editing(id, &Geometry::Point(start)) {
                    self.draw.unsubscribe(preview);
                    return Err(e.into());
                }
                self.session_mut("place a waypoint")?.preview = Some(preview);
            }
            self.draw.move_vertex(0, point)?;
        }

        log::debug!("Waypoint position {point}");
        self.session_mut("place a waypoint")?.draft.position = Some(point);
        Ok(())
    }

    /// Whether the draft has the minimum geometry to be saved.
    #[must_use]
    pub fn can_save(&self) -> bool {
        let Some(session) = &self.session else {
            return false;
        };

        match session.mode {
            EditorMode::Edit(_) => true,
            EditorMode::Create(FeatureKind::Waypoint) => session.draft.position.is_some(),
            EditorMode::Create(FeatureKind::Line | FeatureKind::Area) => self
                .draw
                .current_geometry()
                .is_some_and(|geometry| geometry.is_complete()),
        }
    }

    fn is_dirty(&self) -> bool {
        let Some(session) = &self.session else {
            return false;
        };

        let placed = matches!(session.mode, EditorMode::Create(_)) && self.draw.vertex_count() > 0;

        placed
            || session.draft.name.trim() != session.baseline.name.trim()
            || session.draft.color != session.baseline.color
            || session.draft.notes.trim() != session.baseline.notes.trim()
            || session.draft.position != session.baseline.position
    }

    fn incomplete(&self, kind: FeatureKind) -> EditorError {
        let kind = kind.geometry_kind();
        EditorError::IncompleteGeometry {
            kind,
            required: kind.min_vertices(),
            actual: self
                .draw
                .current_geometry()
                .map_or(0, |geometry| geometry.distinct_vertex_count()),
        }
    }

    /// Saves the draft without asking.
    ///
    /// A new feature gets a fresh id and timestamp and is added to
    /// `store`; an edited one is patched in place. The editor closes on
    /// success and stays open on error.
    ///
    /// # Errors
    ///
    /// * [`EditorError::InvalidState`] if the editor is closed
    /// * [`EditorError::IncompleteGeometry`] if a new feature's geometry is
    ///   below its minimum vertex count
    /// * [`EditorError::Annotation`] if the store rejects the change
    pub fn confirm(&mut self, store: &mut AnnotationStore) -> Result<FeatureId, EditorError> {
        let id = match self.session("save")?.mode {
            EditorMode::Create(kind) => self.commit_new(store, kind)?,
            EditorMode::Edit(id) => self.commit_edit(store, id)?,
        };

        self.close();
        Ok(id)
    }

    fn commit_new(
        &mut self,
        store: &mut AnnotationStore,
        kind: FeatureKind,
    ) -> Result<FeatureId, EditorError> {
        let geometry = match kind {
            FeatureKind::Waypoint => Geometry::Point(
                self.session("save")?
                    .draft
                    .position
                    .ok_or_else(|| self.incomplete(kind))?,
            ),
            FeatureKind::Line | FeatureKind::Area => {
                self.draw.finish().map_err(|e| match e {
                    DrawError::EmptyGeometry {
                        kind,
                        required,
                        actual,
                    } => EditorError::IncompleteGeometry {
                        kind,
                        required,
                        actual,
                    },
                    other => other.into(),
                })?
            }
        };

        let draft = &self.session("save")?.draft;
        let feature = Feature {
            id: FeatureId::new(),
            geometry,
            color: draft.color.clone(),
            name: draft.resolved_name(),
            notes: draft.notes.clone(),
            created_at: (self.clock)(),
        };
        let id = feature.id;

        store.add(feature)?;
        Ok(id)
    }

    fn commit_edit(
        &self,
        store: &mut AnnotationStore,
        id: FeatureId,
    ) -> Result<FeatureId, EditorError> {
        let session = self.session("save")?;
        let draft = &session.draft;

        let mut patch = FeaturePatch::default()
            .name(draft.resolved_name())
            .color(draft.color.clone())
            .notes(draft.notes.clone());

        if draft.position != session.baseline.position
            && let Some(position) = draft.position
        {
            patch = patch.position(position);
        }

        store.update(&id, patch)?;
        Ok(id)
    }

    fn close(&mut self) {
        if let Some(session) = self.session.take() {
            self.draw.cancel();
            if let Some(preview) = session.preview {
                self.draw.unsubscribe(preview);
            }
            log::debug!("Closed editor: {:?}", session.mode);
        }
    }

    /// Discards the draft and any geometry in progress, clearing the live
    /// preview. Does nothing when the editor is closed.
    pub fn cancel(&mut self) {
        if let Some(session) = &self.session {
            log::info!("Discarding draft: {:?}", session.mode);
        }
        self.close();
    }

    /// Deletes the feature being edited and closes the editor.
    ///
    /// # Errors
    ///
    /// * [`EditorError::InvalidState`] unless a committed feature is open
    /// * [`EditorError::Annotation`] if the store no longer has it
    pub fn delete_edited(&mut self, store: &mut AnnotationStore) -> Result<FeatureId, EditorError> {
        let EditorMode::Edit(id) = self.session("delete")?.mode else {
            return Err(EditorError::InvalidState {
                operation: "delete",
                state: "creating a new feature",
            });
        };

        store.remove(&id)?;
        self.close();
        Ok(id)
    }

    /// The save button. Saving a new feature with work in it asks first.
    ///
    /// # Errors
    ///
    /// Same as [`Self::confirm`].
    pub fn request_save(
        &mut self,
        store: &mut AnnotationStore,
    ) -> Result<EditorOutcome, EditorError> {
        let EditorMode::Create(kind) = self.session("save")?.mode else {
            return self.confirm(store).map(EditorOutcome::Committed);
        };

        if !self.can_save() {
            return Err(self.incomplete(kind));
        }

        if self.is_dirty() {
            return Ok(self.ask(Prompt::CommitDraft { kind }));
        }

        self.confirm(store).map(EditorOutcome::Committed)
    }

    /// The cancel/close button. Discarding work asks first.
    pub fn request_cancel(&mut self) -> EditorOutcome {
        let Some(session) = &self.session else {
            return EditorOutcome::Discarded;
        };

        let prompt = Prompt::DiscardDraft {
            kind: session.kind,
            editing: matches!(session.mode, EditorMode::Edit(_)),
        };

        if self.is_dirty() {
            return self.ask(prompt);
        }

        self.cancel();
        EditorOutcome::Discarded
    }

    fn ask(&mut self, prompt: Prompt) -> EditorOutcome {
        if let Some(session) = &mut self.session {
            session.pending = Some(prompt);
        }
        EditorOutcome::NeedsConfirmation(prompt)
    }

    /// Answers the pending prompt.
    ///
    /// Declining a discard resumes editing. Declining a commit discards
    /// the draft and its geometry.
    ///
    /// # Errors
    ///
    /// * [`EditorError::NoPendingConfirmation`] if no prompt is showing
    /// * errors of [`Self::confirm`] when a commit is accepted
    pub fn answer(
        &mut self,
        store: &mut AnnotationStore,
        yes: bool,
    ) -> Result<EditorOutcome, EditorError> {
        let prompt = self
            .session
            .as_mut()
            .and_then(|session| session.pending.take())
            .ok_or(EditorError::NoPendingConfirmation)?;

        match (prompt, yes) {
            (Prompt::DiscardDraft { .. }, true) | (Prompt::CommitDraft { .. }, false) => {
                self.cancel();
                Ok(EditorOutcome::Discarded)
            }
            (Prompt::DiscardDraft { .. }, false) => Ok(EditorOutcome::Resumed),
            (Prompt::CommitDraft { .. }, true) => self.confirm(store).map(EditorOutcome::Committed),
        }
    }

    /// Re-pushes the live preview, e.g. after the map dropped its sources.
    pub fn refresh_preview(&mut self) {
        if !self.draw.is_idle() {
            self.draw.refresh();
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use field_map_annotation_models::PaletteColor;
    use field_map_geometry::SphericalMath;
    use field_map_geometry_models::GeometryKind;
    use field_map_map_view::{InMemoryMapView, OverlayName};
    use field_map_measure::MeasurementConfig;
    use pretty_assertions::assert_eq;

    use super::*;

    fn setup() -> (Arc<InMemoryMapView>, AnnotationStore, FeatureEditor) {
        let view = Arc::new(InMemoryMapView::new(Point::new(-74.5, 40.0)));
        let store = AnnotationStore::new(view.clone());
        let engine = MeasurementEngine::new(Arc::new(SphericalMath), MeasurementConfig::default());
        let editor = FeatureEditor::new(view.clone(), engine, DefaultColors::default())
            .with_clock(Box::new(|| Utc.with_ymd_and_hms(2026, 10, 19, 9, 30, 0).unwrap()));
        (view, store, editor)
    }

    fn draw_triangle(editor: &mut FeatureEditor) {
        editor.add_vertex(Point::new(0.0, 0.0)).unwrap();
        editor.add_vertex(Point::new(0.01, 0.0)).unwrap();
        editor.add_vertex(Point::new(0.01, 0.01)).unwrap();
    }

    fn preview_is_clear(view: &InMemoryMapView) -> bool {
        OverlayName::live_preview()
            .iter()
            .all(|overlay| view.feature_count(*overlay) == 0)
    }

    #[test]
    fn blank_waypoint_name_gets_date_label() {
        let (_view, mut store, mut editor) = setup();
        editor.open_for_create(FeatureKind::Waypoint).unwrap();
        editor
            .update_draft_field(DraftField::Name("   ".to_string()))
            .unwrap();

        let EditorOutcome::Committed(id) = editor.request_save(&mut store).unwrap() else {
            panic!("expected a commit");
        };
        let saved = store.get(&id).unwrap();
        assert_eq!(saved.name, "Waypoint 10/19/2026");
        assert_eq!(saved.position(), Some(Point::new(-74.5, 40.0)));
        assert_eq!(saved.color, PaletteColor::Red.into());
        assert!(!editor.is_open());
    }

    #[test]
    fn moved_waypoint_asks_before_saving() {
        let (view, mut store, mut editor) = setup();
        editor.open_for_create(FeatureKind::Waypoint).unwrap();
        editor.add_vertex(Point::new(-74.45, 40.02)).unwrap();

        assert_eq!(
            editor.request_save(&mut store).unwrap(),
            EditorOutcome::NeedsConfirmation(Prompt::CommitDraft {
                kind: FeatureKind::Waypoint
            })
        );
        assert!(matches!(
            editor.answer(&mut store, true).unwrap(),
            EditorOutcome::Committed(_)
        ));
        assert_eq!(view.feature_count(OverlayName::Waypoints), 1);
        assert_eq!(
            store.get_all(FeatureKind::Waypoint)[0].position(),
            Some(Point::new(-74.45, 40.02))
        );
    }

    #[test]
    fn declining_polygon_save_discards_everything() {
        let (view, mut store, mut editor) = setup();
        editor.open_for_create(FeatureKind::Area).unwrap();
        draw_triangle(&mut editor);
        assert_eq!(view.feature_count(OverlayName::LivePreview), 1);

        let outcome = editor.request_save(&mut store).unwrap();
        assert_eq!(
            outcome,
            EditorOutcome::NeedsConfirmation(Prompt::CommitDraft {
                kind: FeatureKind::Area
            })
        );

        assert_eq!(editor.answer(&mut store, false).unwrap(), EditorOutcome::Discarded);

        assert!(store.is_empty());
        assert!(editor.draw_session().is_idle());
        assert_eq!(editor.draw_session().listener_count(), 0);
        assert!(preview_is_clear(&view));
        assert!(!editor.is_open());
        assert!(editor.measurement().is_empty());
    }

    #[test]
    fn accepting_polygon_save_commits_area() {
        let (view, mut store, mut editor) = setup();
        editor.open_for_create(FeatureKind::Area).unwrap();
        draw_triangle(&mut editor);
        editor
            .update_draft_field(DraftField::Name("Field".to_string()))
            .unwrap();
        editor.request_save(&mut store).unwrap();

        let EditorOutcome::Committed(id) = editor.answer(&mut store, true).unwrap() else {
            panic!("expected a commit");
        };

        let area = store.get(&id).unwrap();
        assert_eq!(area.kind(), FeatureKind::Area);
        assert_eq!(area.name, "Field");
        assert_eq!(area.color, PaletteColor::Blue.into());
        assert_eq!(view.feature_count(OverlayName::Areas), 1);
        assert!(preview_is_clear(&view));
    }

    #[test]
    fn incomplete_line_cannot_be_saved() {
        let (_view, mut store, mut editor) = setup();
        editor.open_for_create(FeatureKind::Line).unwrap();
        editor.add_vertex(Point::new(0.0, 0.0)).unwrap();

        assert!(!editor.can_save());
        let expected = EditorError::IncompleteGeometry {
            kind: GeometryKind::Line,
            required: 2,
            actual: 1,
        };
        assert_eq!(editor.request_save(&mut store).unwrap_err(), expected);
        assert_eq!(editor.confirm(&mut store).unwrap_err(), expected);

        assert!(editor.is_open());
        assert_eq!(editor.draw_session().vertex_count(), 1);
        assert!(store.is_empty());
    }

    #[test]
    fn declining_discard_resumes_drawing() {
        let (_view, mut store, mut editor) = setup();
        editor.open_for_create(FeatureKind::Line).unwrap();
        editor.add_vertex(Point::new(0.0, 0.0)).unwrap();

        let outcome = editor.request_cancel();
        let EditorOutcome::NeedsConfirmation(prompt) = outcome else {
            panic!("expected a prompt, got {outcome:?}");
        };
        assert_eq!(prompt.message(), "Are you sure you want to cancel line drawing?");

        assert_eq!(editor.answer(&mut store, false).unwrap(), EditorOutcome::Resumed);
        assert_eq!(editor.draw_session().vertex_count(), 1);
        assert_eq!(editor.pending_prompt(), None);

        editor.request_cancel();
        assert_eq!(editor.answer(&mut store, true).unwrap(), EditorOutcome::Discarded);
        assert!(editor.draw_session().is_idle());
    }

    #[test]
    fn trivial_cancel_needs_no_prompt_and_is_idempotent() {
        let (_view, _store, mut editor) = setup();
        editor.open_for_create(FeatureKind::Line).unwrap();

        assert_eq!(editor.request_cancel(), EditorOutcome::Discarded);
        editor.cancel();
        assert_eq!(editor.request_cancel(), EditorOutcome::Discarded);
        assert_eq!(editor.draw_session().listener_count(), 0);
    }

    #[test]
    fn answer_without_prompt_fails() {
        let (_view, mut store, mut editor) = setup();
        assert_eq!(
            editor.answer(&mut store, true).unwrap_err(),
            EditorError::NoPendingConfirmation
        );
    }

    #[test]
    fn opening_twice_is_rejected() {
        let (_view, _store, mut editor) = setup();
        editor.open_for_create(FeatureKind::Line).unwrap();
        assert!(matches!(
            editor.open_for_create(FeatureKind::Area),
            Err(EditorError::InvalidState { .. })
        ));
        assert_eq!(editor.mode(), Some(EditorMode::Create(FeatureKind::Line)));
    }

    #[test]
    fn edit_updates_metadata_only() {
        let (_view, mut store, mut editor) = setup();
        editor.open_for_create(FeatureKind::Line).unwrap();
        editor.add_vertex(Point::new(0.0, 0.0)).unwrap();
        editor.add_vertex(Point::new(0.0, 0.01)).unwrap();
        editor.confirm(&mut store).unwrap();
        let id = store.get_all(FeatureKind::Line)[0].id;
        let before = store.get(&id).unwrap().clone();

        editor.open_for_edit(&store, id).unwrap();
        editor
            .update_draft_field(DraftField::Notes("Steep".to_string()))
            .unwrap();
        assert_eq!(editor.request_save(&mut store).unwrap(), EditorOutcome::Committed(id));

        assert_eq!(
            store.get(&id).unwrap(),
            &Feature {
                notes: "Steep".to_string(),
                ..before
            }
        );
    }

    #[test]
    fn editing_waypoint_previews_and_saves_new_position() {
        let (view, mut store, mut editor) = setup();
        editor.open_for_create(FeatureKind::Waypoint).unwrap();
        let id = editor.confirm(&mut store).unwrap();

        editor.open_for_edit(&store, id).unwrap();
        editor.set_draft_position(Point::new(-74.4, 40.1)).unwrap();
        assert_eq!(view.feature_count(OverlayName::LivePreview), 1);

        editor.confirm(&mut store).unwrap();

        assert_eq!(store.get(&id).unwrap().position(), Some(Point::new(-74.4, 40.1)));
        assert!(preview_is_clear(&view));
        assert!(editor.draw_session().is_idle());
    }

    #[test]
    fn lines_reject_waypoint_positions() {
        let (_view, _store, mut editor) = setup();
        editor.open_for_create(FeatureKind::Line).unwrap();
        assert!(matches!(
            editor.set_draft_position(Point::new(0.0, 0.0)),
            Err(EditorError::InvalidState { .. })
        ));
    }

    #[test]
    fn out_of_range_positions_are_rejected() {
        let (_view, mut store, mut editor) = setup();

        editor.open_for_create(FeatureKind::Waypoint).unwrap();
        for point in [Point::new(0.0, 95.0), Point::new(181.0, 0.0)] {
            assert_eq!(
                editor.set_draft_position(point).unwrap_err(),
                EditorError::Draw(DrawError::InvalidCoordinate { point })
            );
        }
        assert_eq!(editor.draft().unwrap().position, Some(Point::new(-74.5, 40.0)));
        editor.cancel();

        editor.open_for_create(FeatureKind::Line).unwrap();
        editor.add_vertex(Point::new(0.0, 0.0)).unwrap();
        for point in [Point::new(0.0, 95.0), Point::new(181.0, 0.0)] {
            assert_eq!(
                editor.add_vertex(point).unwrap_err(),
                EditorError::Draw(DrawError::InvalidCoordinate { point })
            );
        }
        assert!(matches!(
            editor.confirm(&mut store),
            Err(EditorError::IncompleteGeometry { .. })
        ));
        assert!(store.is_empty());
    }

    #[test]
    fn color_change_asks_before_discarding_edit() {
        let (_view, mut store, mut editor) = setup();
        editor.open_for_create(FeatureKind::Waypoint).unwrap();
        let EditorOutcome::Committed(id) = editor.request_save(&mut store).unwrap() else {
            panic!("expected a commit");
        };

        editor.open_for_edit(&store, id).unwrap();
        editor
            .update_draft_field(DraftField::Color(PaletteColor::Green.into()))
            .unwrap();

        assert_eq!(
            editor.request_cancel(),
            EditorOutcome::NeedsConfirmation(Prompt::DiscardDraft {
                kind: FeatureKind::Waypoint,
                editing: true,
            })
        );
        assert_eq!(editor.answer(&mut store, false).unwrap(), EditorOutcome::Resumed);
        assert!(editor.is_open());
    }

    #[test]
    fn delete_edited_removes_feature() {
        let (view, mut store, mut editor) = setup();
        editor.open_for_create(FeatureKind::Waypoint).unwrap();
        let id = editor.confirm(&mut store).unwrap();

        editor.open_for_edit(&store, id).unwrap();
        assert_eq!(editor.delete_edited(&mut store).unwrap(), id);

        assert!(store.is_empty());
        assert_eq!(view.feature_count(OverlayName::Waypoints), 0);
        assert!(!editor.is_open());
    }

    #[test]
    fn measurement_follows_drawing() {
        let (_view, _store, mut editor) = setup();
        editor.open_for_create(FeatureKind::Line).unwrap();
        editor.add_vertex(Point::new(0.0, 0.0)).unwrap();
        editor.add_vertex(Point::new(0.0, 0.01)).unwrap();

        assert_eq!(editor.measurement().total_label(), "1216.0 yd");
        assert_eq!(editor.remove_last_vertex(), Some(Point::new(0.0, 0.01)));
        assert!(editor.measurement().is_empty());
    }
}
