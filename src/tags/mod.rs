//! Page tags: the record store and the drag gesture that creates them

mod gesture;
mod store;

pub use gesture::{DEFAULT_MIN_DRAG_PX, DragOutcome, GestureState, GestureTranslator, Point};
pub use store::{Tag, TagDraft, TagRect, TagStore};
