//! Interactive annotation session.
//!
//! Drives a [`Workspace`] over an [`InMemoryMapView`] with `dialoguer`
//! menus. Vertices are typed in as coordinates; the live readout is printed
//! after every change.

use std::sync::Arc;

use dialoguer::{Input, Select};
use field_map_annotation::{AnnotationStore, overlay_for};
use field_map_annotation_models::{Color, Feature, FeatureId, FeatureKind, PaletteColor};
use field_map_cli_utils::{confirm, prompt_point, prompt_text};
use field_map_config::AppConfig;
use field_map_editor::{DraftField, EditorError, EditorMode, EditorOutcome, Workspace};
use field_map_geometry::SphericalMath;
use field_map_geometry_models::{GeometryKind, Point};
use field_map_map_view::{InMemoryMapView, OverlayName};
use field_map_measure::MeasurementEngine;

type BoxError = Box<dyn std::error::Error>;

/// Top-level actions in the session menu.
enum SessionAction {
    AddWaypoint,
    DrawLine,
    DrawArea,
    EditFeature,
    DeleteFeature,
    ListFeatures,
    SwitchBasemap,
    ShowOverlays,
    Quit,
}

impl SessionAction {
    const ALL: &[Self] = &[
        Self::AddWaypoint,
        Self::DrawLine,
        Self::DrawArea,
        Self::EditFeature,
        Self::DeleteFeature,
        Self::ListFeatures,
        Self::SwitchBasemap,
        Self::ShowOverlays,
        Self::Quit,
    ];

    #[must_use]
    const fn label(&self) -> &'static str {
        match self {
            Self::AddWaypoint => "Add a waypoint",
            Self::DrawLine => "Draw a line",
            Self::DrawArea => "Draw an area",
            Self::EditFeature => "Edit a feature",
            Self::DeleteFeature => "Delete a feature",
            Self::ListFeatures => "List features",
            Self::SwitchBasemap => "Switch basemap",
            Self::ShowOverlays => "Show overlays (GeoJSON)",
            Self::Quit => "Quit",
        }
    }
}

/// Actions available while the editor is open.
#[derive(Clone, Copy)]
enum DraftAction {
    AddVertex,
    UndoVertex,
    MoveWaypoint,
    Details,
    Save,
    Cancel,
    Delete,
}

impl DraftAction {
    #[must_use]
    const fn label(self) -> &'static str {
        match self {
            Self::AddVertex => "Add a vertex",
            Self::UndoVertex => "Undo last vertex",
            Self::MoveWaypoint => "Move waypoint",
            Self::Details => "Edit name, color and notes",
            Self::Save => "Save",
            Self::Cancel => "Cancel",
            Self::Delete => "Delete feature",
        }
    }

    /// The actions offered for a draft of `kind` in `mode`.
    fn available(mode: EditorMode, kind: FeatureKind) -> Vec<Self> {
        let mut actions = match (mode, kind) {
            (_, FeatureKind::Waypoint) => vec![Self::MoveWaypoint],
            (EditorMode::Create(_), _) => vec![Self::AddVertex, Self::UndoVertex],
            (EditorMode::Edit(_), _) => Vec::new(),
        };
        actions.extend([Self::Details, Self::Save, Self::Cancel]);
        if matches!(mode, EditorMode::Edit(_)) {
            actions.push(Self::Delete);
        }
        actions
    }
}

/// State of one interactive session.
struct Session<'a> {
    config: &'a AppConfig,
    view: Arc<InMemoryMapView>,
    workspace: Workspace,
    basemap: String,
}

/// Runs the interactive session until the user quits.
///
/// # Errors
///
/// Returns an error if a prompt fails or an editor operation fails
/// unexpectedly.
pub fn run(config: &AppConfig) -> Result<(), BoxError> {
    let view = Arc::new(InMemoryMapView::new(config.map.initial_center));
    let engine = MeasurementEngine::new(Arc::new(SphericalMath), config.measurement);
    let workspace = Workspace::new(view.clone(), engine, config.defaults.clone());

    let mut session = Session {
        config,
        view,
        workspace,
        basemap: config.map.initial_basemap.clone(),
    };

    println!("Field Map");
    session.print_basemap();

    let labels: Vec<&str> = SessionAction::ALL.iter().map(SessionAction::label).collect();

    loop {
        println!();
        let idx = Select::new()
            .with_prompt("What would you like to do?")
            .items(&labels)
            .default(0)
            .interact()?;

        match SessionAction::ALL[idx] {
            SessionAction::AddWaypoint => session.create(FeatureKind::Waypoint)?,
            SessionAction::DrawLine => session.create(FeatureKind::Line)?,
            SessionAction::DrawArea => session.create(FeatureKind::Area)?,
            SessionAction::EditFeature => session.edit()?,
            SessionAction::DeleteFeature => session.delete()?,
            SessionAction::ListFeatures => session.list(),
            SessionAction::SwitchBasemap => session.switch_basemap()?,
            SessionAction::ShowOverlays => session.show_overlays()?,
            SessionAction::Quit => break,
        }
    }

    session.workspace.shutdown();
    Ok(())
}

impl Session<'_> {
    fn create(&mut self, kind: FeatureKind) -> Result<(), BoxError> {
        self.workspace.open_for_create(kind)?;
        if kind == FeatureKind::Waypoint {
            self.move_waypoint()?;
        }
        self.draft_loop()
    }

    /// Picks a feature and opens it the way a map click would.
    fn edit(&mut self) -> Result<(), BoxError> {
        let Some((id, kind)) = pick_feature(self.workspace.store(), "Edit which feature?")? else {
            return Ok(());
        };

        self.view.click(overlay_for(kind), &id.to_string());
        if self.workspace.poll_clicks()?.is_none() {
            println!("That feature can no longer be edited.");
            return Ok(());
        }

        self.draft_loop()
    }

    fn delete(&mut self) -> Result<(), BoxError> {
        let Some((id, _)) = pick_feature(self.workspace.store(), "Delete which feature?")? else {
            return Ok(());
        };

        if confirm("Delete this feature?")? {
            let removed = self.workspace.delete_feature(id)?;
            println!("Deleted {}", removed.name);
        }

        Ok(())
    }

    fn list(&self) {
        let store = self.workspace.store();
        if store.is_empty() {
            println!("No features yet.");
            return;
        }

        for kind in FeatureKind::all() {
            for feature in store.get_all(*kind) {
                println!("{}", describe(feature));
                if !feature.notes.is_empty() {
                    println!("    {}", feature.notes);
                }
            }
        }
    }

    fn switch_basemap(&mut self) -> Result<(), BoxError> {
        let labels: Vec<&str> = self
            .config
            .basemaps
            .iter()
            .map(|basemap| basemap.name.as_str())
            .collect();
        let current = self
            .config
            .basemaps
            .iter()
            .position(|basemap| basemap.id == self.basemap)
            .unwrap_or(0);

        let idx = Select::new()
            .with_prompt("Basemap")
            .items(&labels)
            .default(current)
            .interact()?;

        let Some(basemap) = self.config.basemaps.get(idx) else {
            return Ok(());
        };
        if basemap.id == self.basemap {
            return Ok(());
        }

        log::info!("Switching basemap to {}", basemap.id);
        self.basemap.clone_from(&basemap.id);
        self.view.reload();
        self.workspace.handle_map_reload();
        self.print_basemap();

        Ok(())
    }

    fn show_overlays(&self) -> Result<(), BoxError> {
        for overlay in OverlayName::all() {
            let Some(data) = self.view.overlay(*overlay) else {
                continue;
            };
            println!("// {overlay}");
            println!("{}", serde_json::to_string_pretty(&data)?);
        }
        Ok(())
    }

    fn print_basemap(&self) {
        if let Some(basemap) = self.config.basemap(&self.basemap) {
            let terrain = basemap
                .terrain_exaggeration
                .map(|exaggeration| format!(", terrain x{exaggeration}"))
                .unwrap_or_default();
            println!("Basemap: {} ({}{terrain})", basemap.name, basemap.url);
        }
    }

    /// Kind of the feature open in the editor.
    fn open_kind(&self, mode: EditorMode) -> Option<FeatureKind> {
        match mode {
            EditorMode::Create(kind) => Some(kind),
            EditorMode::Edit(id) => self.workspace.store().get(&id).map(Feature::kind),
        }
    }

    /// Runs the editor until the draft is saved, discarded or deleted.
    fn draft_loop(&mut self) -> Result<(), BoxError> {
        while let Some(mode) = self.workspace.editor().mode() {
            let Some(kind) = self.open_kind(mode) else {
                self.workspace.editor_mut().cancel();
                break;
            };

            self.print_draft(kind);

            let actions = DraftAction::available(mode, kind);
            let labels: Vec<&str> = actions.iter().map(|action| action.label()).collect();
            let idx = Select::new()
                .with_prompt(format!("Editing {kind}"))
                .items(&labels)
                .default(0)
                .interact()?;

            match actions[idx] {
                DraftAction::AddVertex => {
                    let default = self.last_vertex().unwrap_or(self.config.map.initial_center);
                    let point = prompt_point("Vertex", default)?;
                    report(self.workspace.editor_mut().add_vertex(point))?;
                }
                DraftAction::UndoVertex => {
                    if self.workspace.editor_mut().remove_last_vertex().is_none() {
                        println!("Nothing to undo.");
                    }
                }
                DraftAction::MoveWaypoint => self.move_waypoint()?,
                DraftAction::Details => self.edit_details()?,
                DraftAction::Save => match self.workspace.request_save() {
                    Ok(outcome) => self.resolve(outcome)?,
                    Err(e @ EditorError::IncompleteGeometry { .. }) => println!("{e}"),
                    Err(e) => return Err(e.into()),
                },
                DraftAction::Cancel => {
                    let outcome = self.workspace.request_cancel();
                    self.resolve(outcome)?;
                }
                DraftAction::Delete => {
                    if confirm(&format!("Delete this {kind}?"))? {
                        let id = self.workspace.delete_edited()?;
                        println!("Deleted {id}");
                    }
                }
            }
        }

        Ok(())
    }

    /// Answers prompts until the editor settles.
    fn resolve(&mut self, mut outcome: EditorOutcome) -> Result<(), BoxError> {
        while let EditorOutcome::NeedsConfirmation(prompt) = outcome {
            let yes = confirm(&prompt.message())?;
            outcome = self.workspace.answer(yes)?;
        }

        match outcome {
            EditorOutcome::Committed(id) => {
                if let Some(feature) = self.workspace.store().get(&id) {
                    println!("Saved {}", describe(feature));
                }
            }
            EditorOutcome::Discarded => println!("Discarded."),
            EditorOutcome::Resumed | EditorOutcome::NeedsConfirmation(_) => {}
        }

        Ok(())
    }

    fn move_waypoint(&mut self) -> Result<(), BoxError> {
        let current = self
            .workspace
            .editor()
            .draft()
            .and_then(|draft| draft.position)
            .unwrap_or(self.config.map.initial_center);
        let point = prompt_point("Position", current)?;
        report(self.workspace.editor_mut().set_draft_position(point))
    }

    fn edit_details(&mut self) -> Result<(), BoxError> {
        let Some(draft) = self.workspace.editor().draft().cloned() else {
            return Ok(());
        };

        let name = prompt_text(&format!("Name (blank for {:?})", draft.placeholder), &draft.name)?;
        let color = prompt_color(&draft.color)?;
        let notes = prompt_text("Notes", &draft.notes)?;

        let editor = self.workspace.editor_mut();
        editor.update_draft_field(DraftField::Name(name))?;
        editor.update_draft_field(DraftField::Color(color))?;
        editor.update_draft_field(DraftField::Notes(notes))?;

        Ok(())
    }

    fn last_vertex(&self) -> Option<Point> {
        self.workspace
            .editor()
            .draw_session()
            .current_geometry()
            .and_then(|geometry| geometry.vertices().last().copied())
    }

    fn print_draft(&self, kind: FeatureKind) {
        let editor = self.workspace.editor();
        let Some(draft) = editor.draft() else {
            return;
        };

        println!();
        println!("{} [{}]", draft.resolved_name(), draft.color);
        if let Some(position) = draft.position {
            println!("  at {position}");
        }

        if kind.geometry_kind() == GeometryKind::Point {
            return;
        }

        let snapshot = editor.measurement();
        println!("  {} vertices", editor.draw_session().vertex_count());
        for label in snapshot.segment_labels() {
            println!("  - {label}");
        }
        if !snapshot.is_empty() {
            println!("  {snapshot}");
        }
    }
}

/// Prints a rejected editor operation and carries on; anything else
/// propagates.
fn report(result: Result<(), EditorError>) -> Result<(), BoxError> {
    match result {
        Ok(()) => Ok(()),
        Err(e @ (EditorError::Draw(_) | EditorError::Annotation(_))) => {
            println!("{e}");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

fn describe(feature: &Feature) -> String {
    format!(
        "{:<8} {} [{}] {}",
        feature.kind().label(),
        feature.name,
        feature.color,
        feature.created_at.format("%Y-%m-%d %H:%M"),
    )
}

fn pick_feature(
    store: &AnnotationStore,
    prompt: &str,
) -> Result<Option<(FeatureId, FeatureKind)>, BoxError> {
    let features: Vec<&Feature> = FeatureKind::all()
        .iter()
        .flat_map(|kind| store.get_all(*kind))
        .collect();

    if features.is_empty() {
        println!("No features yet.");
        return Ok(None);
    }

    let labels: Vec<String> = features.iter().map(|feature| describe(feature)).collect();
    let idx = Select::new()
        .with_prompt(prompt)
        .items(&labels)
        .default(0)
        .interact()?;

    Ok(features.get(idx).map(|feature| (feature.id, feature.kind())))
}

fn prompt_color(current: &Color) -> Result<Color, BoxError> {
    let mut labels: Vec<String> = PaletteColor::all()
        .iter()
        .map(|swatch| format!("{swatch} ({})", swatch.hex()))
        .collect();
    labels.push("Custom hex".to_string());

    let default = current
        .palette()
        .and_then(|palette| PaletteColor::all().iter().position(|swatch| *swatch == palette))
        .unwrap_or(labels.len() - 1);

    let idx = Select::new()
        .with_prompt("Color")
        .items(&labels)
        .default(default)
        .interact()?;

    if let Some(swatch) = PaletteColor::all().get(idx) {
        return Ok((*swatch).into());
    }

    let hex: String = Input::new()
        .with_prompt("Hex color")
        .with_initial_text(current.hex())
        .validate_with(|input: &String| {
            Color::parse(input).map(|_| ()).map_err(|e| e.to_string())
        })
        .interact_text()?;

    Ok(Color::parse(&hex)?)
}
