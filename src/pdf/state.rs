//! Render target state and its transition table
//!
//! `RenderState` is what the controller is *trying* to show: the page and zoom
//! of the newest request. What is actually on screen lives in `ViewState` and
//! only changes when a render completes.

use super::zoom::Zoom;
use crate::view_state::ViewState;

/// Requested page, zoom, and page count of the current document
#[derive(Clone, Debug)]
pub struct RenderState {
    /// Target page (1-based), 0 when no document is loaded
    pub page: usize,

    /// Page count of the current document
    pub page_count: usize,

    /// Target zoom
    pub zoom: Zoom,
}

impl RenderState {
    #[must_use]
    pub fn new(zoom: Zoom) -> Self {
        Self {
            page: 0,
            page_count: 0,
            zoom,
        }
    }

    #[must_use]
    pub fn has_document(&self) -> bool {
        self.page_count > 0
    }

    #[must_use]
    pub fn scale(&self) -> f32 {
        self.zoom.factor()
    }

    /// Apply a command and return resulting effects
    #[must_use]
    pub fn apply(&mut self, cmd: Command) -> Vec<Effect> {
        match cmd {
            Command::DocumentLoaded { page_count } => {
                self.page_count = page_count;
                self.page = 1;
                vec![
                    Effect::CancelCurrent,
                    Effect::InvalidateCache,
                    Effect::RenderCurrentPage,
                ]
            }

            Command::GoToPage(page) => {
                if !self.has_document() || page == 0 || page > self.page_count {
                    return vec![];
                }
                if self.page == page {
                    return vec![];
                }
                self.page = page;
                vec![Effect::CancelCurrent, Effect::RenderCurrentPage]
            }

            Command::NextPage => self.apply(Command::GoToPage(self.page + 1)),

            Command::PrevPage => match self.page.checked_sub(1) {
                Some(page) => self.apply(Command::GoToPage(page)),
                None => vec![],
            },

            Command::ChangeScale(delta) => {
                if self.zoom.change(delta) && self.has_document() {
                    vec![Effect::CancelCurrent, Effect::RenderCurrentPage]
                } else {
                    vec![]
                }
            }

            Command::SetScale(scale) => {
                if self.zoom.set(scale) && self.has_document() {
                    vec![Effect::CancelCurrent, Effect::RenderCurrentPage]
                } else {
                    vec![]
                }
            }

            Command::Rerender => {
                if self.has_document() {
                    vec![Effect::CancelCurrent, Effect::RenderCurrentPage]
                } else {
                    vec![]
                }
            }
        }
    }

    /// Point the target back at what is on screen after a request was
    /// abandoned or failed.
    pub fn rollback(&mut self, view: &ViewState) {
        if !self.has_document() {
            return;
        }
        if view.is_loaded() {
            self.page = view.current_page().clamp(1, self.page_count);
            self.zoom.set(view.scale());
        } else {
            self.page = 1;
        }
    }
}

/// Named events that may require a re-render
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Command {
    /// A new document replaced the current one
    DocumentLoaded { page_count: usize },
    /// Go to a specific page (1-based); out of range is a no-op
    GoToPage(usize),
    NextPage,
    PrevPage,
    /// Adjust the zoom by a delta
    ChangeScale(f32),
    /// Set an absolute zoom
    SetScale(f32),
    /// Render the current target again
    Rerender,
}

/// Effects produced by state changes
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Effect {
    /// Cancel the in-flight render, if any
    CancelCurrent,
    /// Drop cached surfaces of superseded documents
    InvalidateCache,
    /// Render the target page at the target zoom
    RenderCurrentPage,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loaded_state(page_count: usize) -> RenderState {
        let mut state = RenderState::new(Zoom::default());
        let _ = state.apply(Command::DocumentLoaded { page_count });
        state
    }

    #[test]
    fn document_loaded_cancels_invalidates_and_renders_first_page() {
        let mut state = RenderState::new(Zoom::default());
        let effects = state.apply(Command::DocumentLoaded { page_count: 3 });

        assert_eq!(state.page, 1);
        assert_eq!(
            effects,
            vec![
                Effect::CancelCurrent,
                Effect::InvalidateCache,
                Effect::RenderCurrentPage
            ]
        );
    }

    #[test]
    fn go_to_page_renders() {
        let mut state = loaded_state(10);
        let effects = state.apply(Command::GoToPage(5));

        assert_eq!(state.page, 5);
        assert_eq!(effects, vec![Effect::CancelCurrent, Effect::RenderCurrentPage]);
    }

    #[test]
    fn go_to_page_out_of_range_is_noop() {
        let mut state = loaded_state(2);

        assert!(state.apply(Command::GoToPage(0)).is_empty());
        assert!(state.apply(Command::GoToPage(3)).is_empty());
        assert_eq!(state.page, 1);
    }

    #[test]
    fn prev_on_first_and_next_on_last_are_noops() {
        let mut state = loaded_state(2);
        assert!(state.apply(Command::PrevPage).is_empty());

        assert!(!state.apply(Command::NextPage).is_empty());
        assert_eq!(state.page, 2);
        assert!(state.apply(Command::NextPage).is_empty());
        assert_eq!(state.page, 2);
    }

    #[test]
    fn same_page_does_not_rerender() {
        let mut state = loaded_state(4);
        assert!(state.apply(Command::GoToPage(1)).is_empty());
    }

    #[test]
    fn navigation_without_document_is_noop() {
        let mut state = RenderState::new(Zoom::default());
        assert!(state.apply(Command::NextPage).is_empty());
        assert!(state.apply(Command::GoToPage(1)).is_empty());
        assert!(state.apply(Command::Rerender).is_empty());
    }

    #[test]
    fn scale_change_without_document_updates_zoom_only() {
        let mut state = RenderState::new(Zoom::default());
        assert!(state.apply(Command::ChangeScale(0.25)).is_empty());
        assert_eq!(state.scale(), 1.75);
    }

    #[test]
    fn scale_change_rerenders_current_page() {
        let mut state = loaded_state(2);
        let effects = state.apply(Command::ChangeScale(-0.25));

        assert_eq!(state.scale(), 1.25);
        assert_eq!(effects, vec![Effect::CancelCurrent, Effect::RenderCurrentPage]);
    }

    #[test]
    fn scale_change_at_floor_is_noop() {
        let mut state = RenderState::new(Zoom::new(0.5, 0.5));
        let _ = state.apply(Command::DocumentLoaded { page_count: 1 });
        assert!(state.apply(Command::ChangeScale(-0.25)).is_empty());
        assert_eq!(state.scale(), 0.5);
    }

    #[test]
    fn rollback_restores_committed_view() {
        let mut state = loaded_state(5);
        let mut view = ViewState::new(1.5);
        view.commit_render(2, 1.5, 5, 1);

        let _ = state.apply(Command::GoToPage(4));
        let _ = state.apply(Command::ChangeScale(0.5));
        state.rollback(&view);

        assert_eq!(state.page, 2);
        assert_eq!(state.scale(), 1.5);
    }

    #[test]
    fn rollback_clamps_to_new_document() {
        let mut state = loaded_state(10);
        let mut view = ViewState::new(1.0);
        view.commit_render(8, 1.0, 10, 1);

        let _ = state.apply(Command::DocumentLoaded { page_count: 3 });
        state.rollback(&view);
        assert_eq!(state.page, 3);
    }
}
