//! Drag gesture to tag rectangle translation

use log::debug;

use super::store::{TagDraft, TagRect};

/// Drags smaller than this on either axis are treated as clicks.
pub const DEFAULT_MIN_DRAG_PX: f32 = 10.0;

/// A point in screen or layer coordinates
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Convert an absolute pointer position into coordinates local to a
    /// layer whose top-left corner sits at `origin` on screen.
    #[must_use]
    pub fn relative_to(self, origin: Point) -> Point {
        Point::new(self.x - origin.x, self.y - origin.y)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum GestureState {
    #[default]
    Idle,
    Dragging {
        origin: Point,
    },
}

/// Result of releasing the pointer
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum DragOutcome {
    /// No drag was in progress
    Ignored,
    /// Drag was below the threshold on at least one axis
    Degenerate { width: f32, height: f32 },
    /// A tag-sized drag
    Tag(TagDraft),
}

/// Two-state drag machine. All coordinates are layer-local.
#[derive(Clone, Debug)]
pub struct GestureTranslator {
    state: GestureState,
    min_drag: f32,
}

impl Default for GestureTranslator {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_DRAG_PX)
    }
}

impl GestureTranslator {
    #[must_use]
    pub fn new(min_drag: f32) -> Self {
        Self {
            state: GestureState::Idle,
            min_drag,
        }
    }

    #[must_use]
    pub fn state(&self) -> GestureState {
        self.state
    }

    #[must_use]
    pub fn is_dragging(&self) -> bool {
        matches!(self.state, GestureState::Dragging { .. })
    }

    /// Start a drag. A second pointer-down restarts from the new point.
    pub fn pointer_down(&mut self, point: Point) {
        if let GestureState::Dragging { origin } = self.state {
            debug!("Pointer down while dragging from {origin:?}, restarting");
        }
        self.state = GestureState::Dragging { origin: point };
    }

    /// Finish a drag on `page`, drawn against the viewport of `scale`.
    pub fn pointer_up(&mut self, point: Point, page: usize, scale: f32) -> DragOutcome {
        let GestureState::Dragging { origin } = std::mem::take(&mut self.state) else {
            return DragOutcome::Ignored;
        };

        let rect = TagRect::from_corners(origin, point);
        if rect.width < self.min_drag || rect.height < self.min_drag {
            debug!(
                "Dropping {}x{} drag (minimum {})",
                rect.width, rect.height, self.min_drag
            );
            return DragOutcome::Degenerate {
                width: rect.width,
                height: rect.height,
            };
        }

        DragOutcome::Tag(TagDraft { page, rect, scale })
    }

    /// Abandon any drag in progress
    pub fn cancel(&mut self) {
        self.state = GestureState::Idle;
    }
}
