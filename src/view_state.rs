//! What the viewer is currently showing
//!
//! Only changes on a completed render (page, scale, document) or on a
//! selection action. The page's filtered tag list is derived from
//! `current_page`, so any change to it drops the selection.

/// Committed page, zoom, and tag selection
#[derive(Clone, Debug, PartialEq)]
pub struct ViewState {
    current_page: usize,
    page_count: usize,
    scale: f32,
    generation: u64,
    selected: Option<usize>,
}

impl ViewState {
    /// Empty view at the given starting scale
    #[must_use]
    pub fn new(scale: f32) -> Self {
        Self {
            current_page: 0,
            page_count: 0,
            scale,
            generation: 0,
            selected: None,
        }
    }

    /// True once any page has been displayed
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.page_count > 0
    }

    /// Page on screen (1-based), 0 before the first render
    #[must_use]
    pub fn current_page(&self) -> usize {
        self.current_page
    }

    #[must_use]
    pub fn page_count(&self) -> usize {
        self.page_count
    }

    /// Scale of the page on screen
    #[must_use]
    pub fn scale(&self) -> f32 {
        self.scale
    }

    /// Document generation the displayed page came from
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Index into the current page's filtered tag list
    #[must_use]
    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    pub fn select(&mut self, filtered_index: usize) {
        self.selected = Some(filtered_index);
    }

    pub fn invalidate_selection(&mut self) {
        self.selected = None;
    }

    /// Record a completed render. Returns true if the page (and so the
    /// filtered tag list) changed.
    pub fn commit_render(
        &mut self,
        page: usize,
        scale: f32,
        page_count: usize,
        generation: u64,
    ) -> bool {
        let page_changed = self.current_page != page || self.generation != generation;

        self.page_count = page_count;
        self.scale = scale;
        self.generation = generation;
        self.current_page = page;

        if page_changed {
            self.selected = None;
        }
        page_changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_unloaded() {
        let view = ViewState::new(1.5);
        assert!(!view.is_loaded());
        assert_eq!(view.current_page(), 0);
        assert_eq!(view.scale(), 1.5);
    }

    #[test]
    fn page_change_invalidates_selection() {
        let mut view = ViewState::new(1.5);
        view.commit_render(1, 1.5, 2, 1);
        view.select(0);

        assert!(view.commit_render(2, 1.5, 2, 1));
        assert_eq!(view.selected(), None);
    }

    #[test]
    fn zoom_on_same_page_keeps_selection() {
        let mut view = ViewState::new(1.5);
        view.commit_render(1, 1.5, 2, 1);
        view.select(0);

        assert!(!view.commit_render(1, 1.75, 2, 1));
        assert_eq!(view.selected(), Some(0));
        assert_eq!(view.scale(), 1.75);
    }

    #[test]
    fn new_document_invalidates_selection_even_on_same_page() {
        let mut view = ViewState::new(1.0);
        view.commit_render(1, 1.0, 3, 1);
        view.select(2);

        assert!(view.commit_render(1, 1.0, 5, 2));
        assert_eq!(view.selected(), None);
        assert_eq!(view.page_count(), 5);
    }
}
