#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! The draw session.
//!
//! A [`DrawSession`] owns the vertices of the one geometry currently being
//! drawn (or the one waypoint being repositioned) until it is finished or
//! cancelled. Every mutation synchronously notifies the subscribed
//! [`DrawListener`]s with a [`DrawEvent`] and the current partial geometry,
//! so measurement and preview are up to date when the mutating call
//! returns.
//!
//! ```text
//! Idle --start_drawing--> Drawing --finish/cancel--> Idle
//! Idle --begin_editing--> Editing --finish/cancel--> Idle
//! ```

use field_map_annotation_models::FeatureId;
use field_map_geometry_models::{Geometry, GeometryKind, Point, distinct_count};
use thiserror::Error;

/// What the session is doing.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawState {
    /// No geometry in progress.
    Idle,
    /// A new geometry of `kind` is being drawn.
    Drawing {
        /// Kind being drawn.
        kind: GeometryKind,
        /// Vertices placed so far.
        vertices: Vec<Point>,
    },
    /// A committed waypoint is being repositioned.
    Editing {
        /// The feature being repositioned.
        feature_id: FeatureId,
        /// Its working vertices (a single point).
        vertices: Vec<Point>,
    },
}

impl DrawState {
    /// Short name for logs and errors.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Drawing { .. } => "drawing",
            Self::Editing { .. } => "editing",
        }
    }
}

/// A change to the session.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawEvent {
    /// Drawing of a new geometry started.
    Started {
        /// Kind being drawn.
        kind: GeometryKind,
    },
    /// Repositioning of a committed waypoint started.
    EditingStarted {
        /// The feature being repositioned.
        feature_id: FeatureId,
    },
    /// A vertex was appended.
    VertexAdded {
        /// Index of the new vertex.
        index: usize,
        /// Its position.
        point: Point,
    },
    /// A vertex was dragged.
    VertexMoved {
        /// Index of the vertex.
        index: usize,
        /// Previous position.
        from: Point,
        /// New position.
        to: Point,
    },
    /// The latest vertex was removed.
    VertexRemoved {
        /// Index it had.
        index: usize,
        /// Its position.
        point: Point,
    },
    /// The geometry was completed and handed off.
    Finished {
        /// The completed geometry.
        geometry: Geometry,
    },
    /// The geometry was discarded.
    Cancelled,
    /// The current state was re-emitted on request.
    Refreshed,
}

/// Receives every [`DrawEvent`] of the session it is subscribed to.
pub trait DrawListener {
    /// Called after each change. `current` is the partial geometry after
    /// the change, or `None` when nothing is being drawn.
    fn on_draw_event(&mut self, event: &DrawEvent, current: Option<&Geometry>);
}

/// Handle returned by [`DrawSession::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Errors returned by [`DrawSession`] operations. The session state is
/// unchanged when an error is returned.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DrawError {
    /// The operation is not allowed in the current state.
    #[error("Cannot {operation} while {state}")]
    InvalidState {
        /// The rejected operation.
        operation: &'static str,
        /// Name of the current state.
        state: &'static str,
    },
    /// Not enough distinct vertices to finish.
    #[error("A {kind} needs at least {required} distinct vertices, got {actual}")]
    EmptyGeometry {
        /// Kind being drawn.
        kind: GeometryKind,
        /// Minimum distinct vertex count.
        required: usize,
        /// Distinct vertices placed.
        actual: usize,
    },
    /// No vertex at this index.
    #[error("Vertex index {index} out of range ({len} vertices)")]
    VertexOutOfRange {
        /// Requested index.
        index: usize,
        /// Number of vertices.
        len: usize,
    },
    /// Only points can be repositioned after commit.
    #[error("A committed {kind} cannot be edited")]
    GeometryNotEditable {
        /// Kind of the rejected geometry.
        kind: GeometryKind,
    },
    /// A coordinate was not finite or was outside the WGS84 range
    /// (|longitude| > 180, |latitude| > 90).
    #[error("Invalid coordinate {point}")]
    InvalidCoordinate {
        /// The rejected point.
        point: Point,
    },
}

/// The state machine for one in-progress geometry.
pub struct DrawSession {
    state: DrawState,
    listeners: Vec<(SubscriptionId, Box<dyn DrawListener>)>,
    next_subscription: u64,
}

impl std::fmt::Debug for DrawSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DrawSession")
            .field("state", &self.state)
            .field("listeners", &self.listeners.len())
            .finish_non_exhaustive()
    }
}

impl Default for DrawSession {
    fn default() -> Self {
        Self::new()
    }
}

impl DrawSession {
    /// Creates an idle session with no listeners.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: DrawState::Idle,
            listeners: Vec::new(),
            next_subscription: 0,
        }
    }

    /// Subscribes a listener to every subsequent event.
    pub fn subscribe(&mut self, listener: Box<dyn DrawListener>) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.listeners.push((id, listener));
        id
    }

    /// Drops a listener. Returns `false` if it was not subscribed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(subscription, _)| *subscription != id);
        self.listeners.len() != before
    }

    /// Number of subscribed listeners.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> &DrawState {
        &self.state
    }

    /// Whether nothing is in progress.
    #[must_use]
    pub const fn is_idle(&self) -> bool {
        matches!(self.state, DrawState::Idle)
    }

    /// Number of vertices placed (zero when idle).
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.vertices().map_or(0, <[Point]>::len)
    }

    fn vertices(&self) -> Option<&[Point]> {
        match &self.state {
            DrawState::Idle => None,
            DrawState::Drawing { vertices, .. } | DrawState::Editing { vertices, .. } => {
                Some(vertices)
            }
        }
    }

    const fn vertices_mut(&mut self) -> Option<&mut Vec<Point>> {
        match &mut self.state {
            DrawState::Idle => None,
            DrawState::Drawing { vertices, .. } | DrawState::Editing { vertices, .. } => {
                Some(vertices)
            }
        }
    }

    /// The geometry currently drawn or edited, possibly incomplete.
    ///
    /// Returns `None` when idle or when no vertex has been placed yet.
    #[must_use]
    pub fn current_geometry(&self) -> Option<Geometry> {
        match &self.state {
            DrawState::Idle => None,
            DrawState::Drawing { kind, vertices } => partial_geometry(*kind, vertices),
            DrawState::Editing { vertices, .. } => {
                partial_geometry(GeometryKind::Point, vertices)
            }
        }
    }

    /// Starts drawing a new geometry.
    ///
    /// # Errors
    ///
    /// * [`DrawError::InvalidState`] unless the session is idle
    pub fn start_drawing(&mut self, kind: GeometryKind) -> Result<(), DrawError> {
        self.require_idle("start drawing")?;

        log::debug!("Start drawing {kind}");
        self.state = DrawState::Drawing {
            kind,
            vertices: Vec::new(),
        };
        self.emit(&DrawEvent::Started { kind });
        Ok(())
    }

    /// Starts repositioning a committed feature.
    ///
    /// # Errors
    ///
    /// * [`DrawError::InvalidState`] unless the session is idle
    /// * [`DrawError::GeometryNotEditable`] unless the geometry is a point
    pub fn begin_editing(
        &mut self,
        feature_id: FeatureId,
        geometry: &Geometry,
    ) -> Result<(), DrawError> {
        self.require_idle("begin editing")?;

        let Geometry::Point(point) = geometry else {
            return Err(DrawError::GeometryNotEditable {
                kind: geometry.kind(),
            });
        };

        log::debug!("Begin editing {feature_id}");
        self.state = DrawState::Editing {
            feature_id,
            vertices: vec![*point],
        };
        self.emit(&DrawEvent::EditingStarted { feature_id });
        Ok(())
    }

    /// Places a vertex.
    ///
    /// For a point the first call places it and later calls move it. For
    /// lines and polygons the vertex is appended unless it equals the
    /// previous one, in which case nothing happens.
    ///
    /// # Errors
    ///
    /// * [`DrawError::InvalidState`] unless drawing
    /// * [`DrawError::InvalidCoordinate`] if the point is not a valid
    ///   coordinate
    pub fn add_vertex(&mut self, point: Point) -> Result<(), DrawError> {
        let state = self.state.name();
        let DrawState::Drawing { kind, vertices } = &mut self.state else {
            return Err(DrawError::InvalidState {
                operation: "add a vertex",
                state,
            });
        };

        if !point.is_valid() {
            return Err(DrawError::InvalidCoordinate { point });
        }

        let event = match (*kind, vertices.last().copied()) {
            (GeometryKind::Point, Some(from)) => {
                vertices[0] = point;
                DrawEvent::VertexMoved {
                    index: 0,
                    from,
                    to: point,
                }
            }
            (_, Some(last)) if last == point => {
                log::trace!("Ignoring repeated vertex {point}");
                return Ok(());
            }
            _ => {
                vertices.push(point);
                DrawEvent::VertexAdded {
                    index: vertices.len() - 1,
                    point,
                }
            }
        };

        log::debug!("{event:?}");
        self.emit(&event);
        Ok(())
    }

    /// Drags an existing vertex.
    ///
    /// # Errors
    ///
    /// * [`DrawError::InvalidState`] when idle
    /// * [`DrawError::VertexOutOfRange`] if there is no vertex at `index`
    /// * [`DrawError::InvalidCoordinate`] if the point is not a valid
    ///   coordinate
    pub fn move_vertex(&mut self, index: usize, point: Point) -> Result<(), DrawError> {
        let state = self.state.name();
        let vertices = self.vertices_mut().ok_or(DrawError::InvalidState {
            operation: "move a vertex",
            state,
        })?;

        let len = vertices.len();
        let slot = vertices
            .get_mut(index)
            .ok_or(DrawError::VertexOutOfRange { index, len })?;

        if !point.is_valid() {
            return Err(DrawError::InvalidCoordinate { point });
        }

        let from = std::mem::replace(slot, point);
        let event = DrawEvent::VertexMoved {
            index,
            from,
            to: point,
        };

        log::debug!("{event:?}");
        self.emit(&event);
        Ok(())
    }

    /// Removes the latest vertex while drawing. Returns it, or `None` if
    /// there was nothing to remove.
    pub fn remove_last_vertex(&mut self) -> Option<Point> {
        let DrawState::Drawing { vertices, .. } = &mut self.state else {
            return None;
        };

        let point = vertices.pop()?;
        let event = DrawEvent::VertexRemoved {
            index: vertices.len(),
            point,
        };

        log::debug!("{event:?}");
        self.emit(&event);
        Some(point)
    }

    /// Discards the geometry in progress and returns to idle. Does nothing
    /// when already idle.
    pub fn cancel(&mut self) {
        if self.is_idle() {
            return;
        }

        log::debug!("Cancel {} session", self.state.name());
        self.state = DrawState::Idle;
        self.emit(&DrawEvent::Cancelled);
    }

    /// Completes the geometry in progress and returns to idle.
    ///
    /// # Errors
    ///
    /// * [`DrawError::InvalidState`] when idle
    /// * [`DrawError::EmptyGeometry`] when fewer distinct vertices than the
    ///   kind requires have been placed; drawing continues
    pub fn finish(&mut self) -> Result<Geometry, DrawError> {
        let (kind, vertices) = match &self.state {
            DrawState::Idle => {
                return Err(DrawError::InvalidState {
                    operation: "finish",
                    state: self.state.name(),
                });
            }
            DrawState::Drawing { kind, vertices } => (*kind, vertices),
            DrawState::Editing { vertices, .. } => (GeometryKind::Point, vertices),
        };

        let required = kind.min_vertices();
        let actual = distinct_count(vertices);
        if actual < required {
            return Err(DrawError::EmptyGeometry {
                kind,
                required,
                actual,
            });
        }

        let geometry = partial_geometry(kind, vertices).ok_or(DrawError::EmptyGeometry {
            kind,
            required,
            actual,
        })?;

        log::debug!("Finished {kind} with {} vertices", vertices.len());
        self.state = DrawState::Idle;
        self.emit(&DrawEvent::Finished {
            geometry: geometry.clone(),
        });
        Ok(geometry)
    }

    /// Re-emits the current state to every listener.
    pub fn refresh(&mut self) {
        self.emit(&DrawEvent::Refreshed);
    }

    fn require_idle(&self, operation: &'static str) -> Result<(), DrawError> {
        if self.is_idle() {
            Ok(())
        } else {
            Err(DrawError::InvalidState {
                operation,
                state: self.state.name(),
            })
        }
    }

    fn emit(&mut self, event: &DrawEvent) {
        let current = self.current_geometry();
        for (_, listener) in &mut self.listeners {
            listener.on_draw_event(event, current.as_ref());
        }
    }
}

fn partial_geometry(kind: GeometryKind, vertices: &[Point]) -> Option<Geometry> {
    let first = *vertices.first()?;
    Some(match kind {
        GeometryKind::Point => Geometry::Point(first),
        GeometryKind::Line => Geometry::LineString(vertices.to_vec()),
        GeometryKind::Polygon => Geometry::polygon(vertices.to_vec()),
    })
}
