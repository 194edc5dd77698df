//! In-memory [`MapView`] adapter.
//!
//! Holds overlay data in a map keyed by [`OverlayName`]. [`reload`]
//! behaves like a basemap style swap in a real renderer: every overlay
//! source is dropped while click subscriptions survive.
//!
//! [`reload`]: InMemoryMapView::reload

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use field_map_geometry_models::Point;
use geojson::FeatureCollection;

use crate::{ClickSubscription, FeatureClickHandler, MapView, OverlayName};

type SharedHandler = Arc<dyn Fn(&str) + Send + Sync>;

#[derive(Default)]
struct ViewState {
    overlays: BTreeMap<OverlayName, FeatureCollection>,
    handlers: BTreeMap<OverlayName, Vec<(ClickSubscription, SharedHandler)>>,
    writes: BTreeMap<OverlayName, usize>,
    center: Option<Point>,
    reloads: usize,
    next_subscription: u64,
}

/// A [`MapView`] that keeps everything in memory.
pub struct InMemoryMapView {
    state: Mutex<ViewState>,
}

impl InMemoryMapView {
    /// Creates a view centred on `center` with no overlays.
    #[must_use]
    pub fn new(center: Point) -> Self {
        Self {
            state: Mutex::new(ViewState {
                center: Some(center),
                ..ViewState::default()
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ViewState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Moves the viewport.
    pub fn set_viewport_center(&self, center: Point) {
        self.lock().center = Some(center);
    }

    /// Current data of an overlay, if it exists.
    #[must_use]
    pub fn overlay(&self, overlay: OverlayName) -> Option<FeatureCollection> {
        self.lock().overlays.get(&overlay).cloned()
    }

    /// Whether the overlay currently exists.
    #[must_use]
    pub fn has_overlay(&self, overlay: OverlayName) -> bool {
        self.lock().overlays.contains_key(&overlay)
    }

    /// Number of features in an overlay (zero when it does not exist).
    #[must_use]
    pub fn feature_count(&self, overlay: OverlayName) -> usize {
        self.lock()
            .overlays
            .get(&overlay)
            .map_or(0, |data| data.features.len())
    }

    /// How many times an overlay has been written since creation.
    #[must_use]
    pub fn write_count(&self, overlay: OverlayName) -> usize {
        self.lock().writes.get(&overlay).copied().unwrap_or(0)
    }

    /// How many times [`Self::reload`] has run.
    #[must_use]
    pub fn reload_count(&self) -> usize {
        self.lock().reloads
    }

    /// Simulates a user click on the feature with `feature_id` in
    /// `overlay`, returning how many handlers ran.
    ///
    /// Handlers run after the internal lock is released so they may call
    /// back into the view.
    pub fn click(&self, overlay: OverlayName, feature_id: &str) -> usize {
        let handlers: Vec<SharedHandler> = self
            .lock()
            .handlers
            .get(&overlay)
            .map(|registered| {
                registered
                    .iter()
                    .map(|(_, handler)| Arc::clone(handler))
                    .collect()
            })
            .unwrap_or_default();

        for handler in &handlers {
            handler(feature_id);
        }

        handlers.len()
    }

    /// Drops every overlay source, as a basemap style change does.
    pub fn reload(&self) {
        let mut state = self.lock();
        state.overlays.clear();
        state.reloads += 1;
        log::debug!("Map view reloaded ({} reloads)", state.reloads);
    }
}

impl MapView for InMemoryMapView {
    fn set_overlay_data(&self, overlay: OverlayName, data: FeatureCollection) {
        let mut state = self.lock();
        log::trace!("Overlay {overlay}: {} features", data.features.len());
        state.overlays.insert(overlay, data);
        *state.writes.entry(overlay).or_insert(0) += 1;
    }

    fn remove_overlay(&self, overlay: OverlayName) {
        self.lock().overlays.remove(&overlay);
    }

    fn viewport_center(&self) -> Point {
        self.lock().center.unwrap_or(Point::new(0.0, 0.0))
    }

    fn on_feature_click(
        &self,
        overlay: OverlayName,
        handler: FeatureClickHandler,
    ) -> ClickSubscription {
        let mut state = self.lock();
        let subscription = ClickSubscription::new(state.next_subscription);
        state.next_subscription += 1;
        state
            .handlers
            .entry(overlay)
            .or_default()
            .push((subscription, Arc::from(handler)));
        subscription
    }

    fn remove_feature_click(&self, subscription: ClickSubscription) -> bool {
        let mut state = self.lock();
        for registered in state.handlers.values_mut() {
            if let Some(index) = registered.iter().position(|(id, _)| *id == subscription) {
                registered.remove(index);
                return true;
            }
        }
        false
    }
}
