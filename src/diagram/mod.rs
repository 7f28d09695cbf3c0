//! Vector canvas with selection, gestures and undo/redo.
//!
//! The model keeps two views of the canvas: the committed history and the
//! live shape list shown to the learner. They differ only while a transform
//! or freehand gesture is open; intermediate gesture updates touch the live
//! list, and the settled result is committed as exactly one history entry.

pub mod export;
pub mod history;

use tracing::debug;

use crate::models::answer::{AnswerValue, DiagramPayload, ExportFormat};
use crate::models::shape::{Geometry, Point, Shape};
use crate::Result;

use self::history::HistoryStack;

#[derive(Debug, Clone)]
enum Gesture {
    Transform { id: String, original: Geometry },
    Freehand { id: String },
}

/// One diagram question's editable canvas.
#[derive(Debug, Clone)]
pub struct DiagramModel {
    history: HistoryStack<Vec<Shape>>,
    live: Vec<Shape>,
    gesture: Option<Gesture>,
    selected: Option<String>,
}

impl DiagramModel {
    /// Empty canvas keeping at most `history_limit` snapshots.
    #[must_use]
    pub fn new(history_limit: usize) -> Self {
        Self {
            history: HistoryStack::new(Vec::new(), history_limit),
            live: Vec::new(),
            gesture: None,
            selected: None,
        }
    }

    /// Shapes as currently displayed, including any open gesture.
    #[must_use]
    pub fn shapes(&self) -> &[Shape] {
        &self.live
    }

    /// Whether [`Self::undo`] would change anything.
    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.gesture_commits() || self.history.can_undo()
    }

    /// Whether [`Self::redo`] would change anything.
    #[must_use]
    pub fn can_redo(&self) -> bool {
        !self.gesture_commits() && self.history.can_redo()
    }

    /// Whether a transform or freehand gesture is open.
    #[must_use]
    pub fn gesture_open(&self) -> bool {
        self.gesture.is_some()
    }

    /// Append `shape` as one undoable step.
    pub fn add_shape(&mut self, shape: Shape) {
        self.settle_gesture();
        debug!(shape_id = %shape.id, kind = ?shape.kind(), "shape added");
        self.live.push(shape);
        self.commit();
    }

    /// Replace the geometry of shape `id` as one undoable step.
    ///
    /// Returns `false` when the shape is unknown or `geometry` is of a
    /// different kind.
    pub fn move_or_transform(&mut self, id: &str, geometry: Geometry) -> bool {
        self.settle_gesture();
        let Some(index) = self.position(id) else {
            return false;
        };
        if self.live[index].kind() != geometry.kind() {
            debug!(shape_id = id, "transform with mismatched geometry kind ignored");
            return false;
        }
        if self.live[index].geometry == geometry {
            return true;
        }
        self.live[index] = self.live[index].with_geometry(geometry);
        self.commit();
        true
    }

    /// Translate shape `id` by `(dx, dy)` as one undoable step.
    pub fn move_by(&mut self, id: &str, dx: f64, dy: f64) -> bool {
        let Some(geometry) = self.find(id).map(|s| s.geometry.translated(dx, dy)) else {
            return false;
        };
        self.move_or_transform(id, geometry)
    }

    /// Start dragging or resizing shape `id`.
    pub fn begin_transform(&mut self, id: &str) -> bool {
        self.settle_gesture();
        let Some(shape) = self.find(id) else {
            return false;
        };
        self.gesture = Some(Gesture::Transform {
            id: id.to_owned(),
            original: shape.geometry.clone(),
        });
        true
    }

    /// Apply an intermediate geometry to the live canvas only.
    ///
    /// Ignored when no transform is open or the kind does not match.
    pub fn update_transform(&mut self, geometry: Geometry) -> bool {
        let Some(Gesture::Transform { id, .. }) = &self.gesture else {
            return false;
        };
        let Some(index) = self.live.iter().position(|s| &s.id == id) else {
            return false;
        };
        if self.live[index].kind() != geometry.kind() {
            return false;
        }
        self.live[index] = self.live[index].with_geometry(geometry);
        true
    }

    /// Commit the settled transform. Returns whether history changed.
    pub fn end_transform(&mut self) -> bool {
        matches!(self.gesture, Some(Gesture::Transform { .. })) && self.settle_gesture()
    }

    /// Put the pen down at `point`, starting a freehand stroke.
    pub fn begin_freehand(&mut self, point: Point, stroke: impl Into<String>, stroke_width: f64) {
        self.settle_gesture();
        let shape = Shape::new(
            Geometry::Freehand {
                points: vec![point],
            },
            stroke,
            stroke_width,
        );
        self.gesture = Some(Gesture::Freehand {
            id: shape.id.clone(),
        });
        self.live.push(shape);
    }

    /// Add a sampled pointer position to the open stroke.
    pub fn extend_freehand(&mut self, point: Point) -> bool {
        let Some(Gesture::Freehand { id }) = &self.gesture else {
            return false;
        };
        let Some(shape) = self.live.iter_mut().find(|s| &s.id == id) else {
            return false;
        };
        if let Geometry::Freehand { points } = &mut shape.geometry {
            points.push(point);
            return true;
        }
        false
    }

    /// Lift the pen. Commits the stroke as one history entry; strokes with
    /// fewer than two points are discarded.
    pub fn end_freehand(&mut self) -> bool {
        matches!(self.gesture, Some(Gesture::Freehand { .. })) && self.settle_gesture()
    }

    /// Step back one history entry. An open gesture is settled first.
    pub fn undo(&mut self) -> bool {
        self.settle_gesture();
        let moved = self.history.undo();
        if moved {
            self.restore();
        }
        moved
    }

    /// Step forward one history entry.
    pub fn redo(&mut self) -> bool {
        self.settle_gesture();
        let moved = self.history.redo();
        if moved {
            self.restore();
        }
        moved
    }

    /// Remove every shape as one undoable step. No-op on an empty canvas.
    pub fn clear(&mut self) -> bool {
        self.settle_gesture();
        if self.live.is_empty() {
            return false;
        }
        self.live.clear();
        self.selected = None;
        self.commit();
        true
    }

    /// Remove shape `id` as one undoable step.
    pub fn delete_selected(&mut self, id: &str) -> bool {
        self.settle_gesture();
        let Some(index) = self.position(id) else {
            return false;
        };
        self.live.remove(index);
        if self.selected.as_deref() == Some(id) {
            self.selected = None;
        }
        self.commit();
        true
    }

    /// Select shape `id`. Unknown ids leave the selection unchanged.
    pub fn select(&mut self, id: &str) -> bool {
        if self.position(id).is_none() {
            return false;
        }
        self.selected = Some(id.to_owned());
        true
    }

    /// Drop the selection.
    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    /// The selected shape, if it still exists.
    #[must_use]
    pub fn selected(&self) -> Option<&Shape> {
        self.selected.as_deref().and_then(|id| self.find(id))
    }

    /// SVG document of the live canvas.
    #[must_use]
    pub fn export_svg(&self, width: u32, height: u32) -> String {
        export::to_svg(&self.live, width, height)
    }

    /// PNG bytes of the live canvas.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Export` for an empty canvas size or encoder failure.
    pub fn export_png(&self, width: u32, height: u32) -> Result<Vec<u8>> {
        export::to_png(&self.live, width, height)
    }

    /// Diagram answer carrying the exported canvas.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Export` if rasterization fails.
    pub fn to_answer_payload(
        &self,
        format: ExportFormat,
        width: u32,
        height: u32,
    ) -> Result<AnswerValue> {
        let data = match format {
            ExportFormat::Svg => self.export_svg(width, height),
            ExportFormat::Png => export::png_data_url(&self.export_png(width, height)?),
        };
        Ok(AnswerValue::Diagram(DiagramPayload { format, data }))
    }

    /// Close any open gesture, committing its result. Returns whether a
    /// history entry was written.
    fn settle_gesture(&mut self) -> bool {
        let commits = self.gesture_commits();
        match self.gesture.take() {
            None => {}
            Some(_) if commits => self.commit(),
            Some(Gesture::Transform { .. }) => {}
            Some(Gesture::Freehand { id }) => {
                self.live.retain(|s| s.id != id);
                debug!(shape_id = %id, "freehand stroke too short, discarded");
            }
        }
        commits
    }

    /// Whether settling the open gesture would write a history entry.
    fn gesture_commits(&self) -> bool {
        match &self.gesture {
            None => false,
            Some(Gesture::Transform { id, original }) => {
                self.find(id).is_some_and(|s| s.geometry != *original)
            }
            Some(Gesture::Freehand { id }) => self.find(id).is_some_and(|s| {
                matches!(&s.geometry, Geometry::Freehand { points } if points.len() >= 2)
            }),
        }
    }

    fn commit(&mut self) {
        self.history.push(self.live.clone());
    }

    fn restore(&mut self) {
        self.live = self.history.current().clone();
        if self.selected.as_deref().is_some_and(|id| self.position(id).is_none()) {
            self.selected = None;
        }
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.live.iter().position(|s| s.id == id)
    }

    fn find(&self, id: &str) -> Option<&Shape> {
        self.live.iter().find(|s| s.id == id)
    }
}
