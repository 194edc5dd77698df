//! The live preview: the draw session's view onto the map and readout.

use std::sync::{Arc, Mutex, PoisonError};

use field_map_draw::{DrawEvent, DrawListener};
use field_map_geometry::geo_json;
use field_map_geometry_models::{Geometry, GeometryKind};
use field_map_map_view::{MapView, OverlayName};
use geojson::{Feature, FeatureCollection, JsonObject};

use crate::{MeasurementEngine, MeasurementSnapshot};

/// Receives every snapshot the live preview computes.
pub trait MeasurementSink: Send + Sync {
    /// Called synchronously after each recomputation.
    fn on_measurement(&self, snapshot: &MeasurementSnapshot);
}

/// Keeps the most recent snapshot for the readout.
#[derive(Debug, Default)]
pub struct LatestMeasurement {
    latest: Mutex<Option<MeasurementSnapshot>>,
}

impl LatestMeasurement {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The last snapshot received, if any.
    #[must_use]
    pub fn get(&self) -> Option<MeasurementSnapshot> {
        self.latest
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl MeasurementSink for LatestMeasurement {
    fn on_measurement(&self, snapshot: &MeasurementSnapshot) {
        *self.latest.lock().unwrap_or_else(PoisonError::into_inner) = Some(snapshot.clone());
    }
}

/// Mirrors a draw session onto the live preview overlays.
///
/// On every draw event the geometry is re-measured and all three live
/// preview overlays are replaced: the geometry itself, one marker per
/// vertex, and one label per segment plus a total label at the last
/// vertex. A finished or cancelled session leaves the overlays empty.
pub struct LivePreview {
    engine: MeasurementEngine,
    map_view: Arc<dyn MapView>,
    sinks: Vec<Arc<dyn MeasurementSink>>,
}

impl std::fmt::Debug for LivePreview {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LivePreview")
            .field("engine", &self.engine)
            .field("sinks", &self.sinks.len())
            .finish_non_exhaustive()
    }
}

impl LivePreview {
    /// Creates a preview writing to `map_view`, with no sinks.
    #[must_use]
    pub fn new(engine: MeasurementEngine, map_view: Arc<dyn MapView>) -> Self {
        Self {
            engine,
            map_view,
            sinks: Vec::new(),
        }
    }

    /// Adds a sink notified with every snapshot.
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn MeasurementSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Measures `geometry`, pushes the preview overlays and notifies the
    /// sinks. Returns the snapshot.
    pub fn render(&self, geometry: Option<&Geometry>) -> MeasurementSnapshot {
        let snapshot = self.engine.measure(geometry);

        self.map_view
            .set_overlay_data(OverlayName::LivePreview, shape_overlay(geometry));
        self.map_view
            .set_overlay_data(OverlayName::LivePreviewVertices, vertex_overlay(geometry));
        self.map_view.set_overlay_data(
            OverlayName::LivePreviewLabels,
            label_overlay(geometry, &snapshot),
        );

        self.notify(&snapshot);
        snapshot
    }

    /// Empties every preview overlay and publishes a zeroed snapshot.
    pub fn clear(&self) {
        for overlay in OverlayName::live_preview() {
            self.map_view
                .set_overlay_data(*overlay, geo_json::empty_collection());
        }
        self.notify(&self.engine.empty());
    }

    fn notify(&self, snapshot: &MeasurementSnapshot) {
        for sink in &self.sinks {
            sink.on_measurement(snapshot);
        }
    }
}

impl DrawListener for LivePreview {
    fn on_draw_event(&mut self, event: &DrawEvent, current: Option<&Geometry>) {
        match event {
            DrawEvent::Finished { .. } | DrawEvent::Cancelled => self.clear(),
            _ => {
                let snapshot = self.render(current);
                log::trace!("Live preview: {snapshot}");
            }
        }
    }
}

fn kind_properties(kind: GeometryKind) -> JsonObject {
    let mut properties = JsonObject::new();
    properties.insert("kind".to_string(), kind.as_ref().into());
    properties
}

fn shape_overlay(geometry: Option<&Geometry>) -> FeatureCollection {
    let Some(geometry) = geometry else {
        return geo_json::empty_collection();
    };

    // An unfinished polygon is outlined as a path until it can enclose
    // anything.
    let shape = match geometry {
        Geometry::Point(_) => Some(geometry.clone()),
        Geometry::LineString(points) | Geometry::Polygon(points) if points.len() < 2 => None,
        Geometry::Polygon(ring) if ring.len() < 3 => Some(Geometry::LineString(ring.clone())),
        Geometry::LineString(_) | Geometry::Polygon(_) => Some(geometry.clone()),
    };

    let features: Vec<Feature> = shape
        .iter()
        .map(|shape| geo_json::feature(shape, None, kind_properties(geometry.kind())))
        .collect();

    geo_json::collection(features)
}

fn vertex_overlay(geometry: Option<&Geometry>) -> FeatureCollection {
    let vertices = geometry.map_or(&[][..], Geometry::vertices);

    geo_json::collection(
        vertices
            .iter()
            .enumerate()
            .map(|(index, point)| geo_json::labelled_point(*point, "index", Some(index.to_string())))
            .collect(),
    )
}

fn label_overlay(geometry: Option<&Geometry>, snapshot: &MeasurementSnapshot) -> FeatureCollection {
    let Some(geometry) = geometry else {
        return geo_json::empty_collection();
    };
    if snapshot.segments.is_empty() {
        return geo_json::empty_collection();
    }

    let mut features: Vec<Feature> = snapshot
        .segments
        .iter()
        .zip(snapshot.segment_labels())
        .map(|(segment, label)| geo_json::labelled_point(segment.midpoint(), "label", Some(label)))
        .collect();

    if let Some(last) = geometry.vertices().last() {
        let total = match geometry.kind() {
            GeometryKind::Polygon => format!("Area: {}", snapshot.total_label()),
            GeometryKind::Line | GeometryKind::Point => {
                format!("Total: {}", snapshot.total_label())
            }
        };
        features.push(geo_json::labelled_point(*last, "label", Some(total)));
    }

    geo_json::collection(features)
}

#[cfg(test)]
mod tests {
    use field_map_draw::DrawSession;
    use field_map_geometry::SphericalMath;
    use field_map_geometry_models::Point;
    use field_map_map_view::InMemoryMapView;

    use super::*;
    use crate::MeasurementConfig;

    fn setup() -> (Arc<InMemoryMapView>, Arc<LatestMeasurement>, DrawSession) {
        let view = Arc::new(InMemoryMapView::new(Point::new(0.0, 0.0)));
        let latest = Arc::new(LatestMeasurement::new());
        let engine = MeasurementEngine::new(Arc::new(SphericalMath), MeasurementConfig::default());
        let preview = LivePreview::new(engine, view.clone()).with_sink(latest.clone());

        let mut session = DrawSession::new();
        session.subscribe(Box::new(preview));

        (view, latest, session)
    }

    fn label_texts(view: &InMemoryMapView) -> Vec<String> {
        view.overlay(OverlayName::LivePreviewLabels)
            .unwrap()
            .features
            .iter()
            .filter_map(|f| f.property("label").and_then(|v| v.as_str()).map(str::to_string))
            .collect()
    }

    #[test]
    fn line_preview_tracks_every_vertex() {
        let (view, latest, mut session) = setup();
        session.start_drawing(GeometryKind::Line).unwrap();
        session.add_vertex(Point::new(0.0, 0.0)).unwrap();
        session.add_vertex(Point::new(0.0, 0.01)).unwrap();
        session.add_vertex(Point::new(0.01, 0.01)).unwrap();

        assert_eq!(view.feature_count(OverlayName::LivePreview), 1);
        assert_eq!(view.feature_count(OverlayName::LivePreviewVertices), 3);
        let labels = label_texts(&view);
        assert_eq!(labels.len(), 3);
        assert_eq!(labels[0], "1216.0 yd");
        assert_eq!(labels[2], "Total: 1.38 mi");

        let snapshot = latest.get().unwrap();
        assert_eq!(snapshot.segments.len(), 2);
    }

    #[test]
    fn single_vertex_shows_marker_only() {
        let (view, _latest, mut session) = setup();
        session.start_drawing(GeometryKind::Polygon).unwrap();
        session.add_vertex(Point::new(0.0, 0.0)).unwrap();

        assert_eq!(view.feature_count(OverlayName::LivePreview), 0);
        assert_eq!(view.feature_count(OverlayName::LivePreviewVertices), 1);
        assert_eq!(view.feature_count(OverlayName::LivePreviewLabels), 0);
    }

    #[test]
    fn polygon_preview_labels_area() {
        let (view, latest, mut session) = setup();
        session.start_drawing(GeometryKind::Polygon).unwrap();
        session.add_vertex(Point::new(0.0, 0.0)).unwrap();
        session.add_vertex(Point::new(0.01, 0.0)).unwrap();
        session.add_vertex(Point::new(0.01, 0.01)).unwrap();

        let labels = label_texts(&view);
        assert_eq!(labels.len(), 4);
        assert!(labels[3].starts_with("Area: "), "got {}", labels[3]);
        assert!(latest.get().unwrap().perimeter.is_some());
    }

    #[test]
    fn cancel_clears_overlays_and_readout() {
        let (view, latest, mut session) = setup();
        session.start_drawing(GeometryKind::Line).unwrap();
        session.add_vertex(Point::new(0.0, 0.0)).unwrap();
        session.add_vertex(Point::new(0.0, 0.01)).unwrap();

        session.cancel();

        for overlay in OverlayName::live_preview() {
            assert!(view.has_overlay(*overlay));
            assert_eq!(view.feature_count(*overlay), 0);
        }
        assert!(latest.get().unwrap().is_empty());
    }

    #[test]
    fn refresh_restores_preview_after_reload() {
        let (view, _latest, mut session) = setup();
        session.start_drawing(GeometryKind::Line).unwrap();
        session.add_vertex(Point::new(0.0, 0.0)).unwrap();
        session.add_vertex(Point::new(0.0, 0.01)).unwrap();

        view.reload();
        assert!(!view.has_overlay(OverlayName::LivePreview));

        session.refresh();
        assert_eq!(view.feature_count(OverlayName::LivePreview), 1);
        assert_eq!(view.feature_count(OverlayName::LivePreviewVertices), 2);
    }
}
