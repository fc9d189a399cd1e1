//! The viewer's event handler
//!
//! Every input (document loaded, navigation, zoom, pointer, selection, render
//! settled) is one method call that runs to completion. Rendering is the only
//! work that leaves this thread; its results come back through [`Viewer::pump`]
//! or [`Viewer::wait_for_render`].

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, info, warn};

use crate::notification::NotificationManager;
use crate::pdf::{
    Command, DecodeError, DocumentSession, RasterBackend, RenderController, RenderEvent,
    RequestId,
};
use crate::presentation::Presentation;
use crate::settings::Settings;
use crate::tags::{DragOutcome, GestureTranslator, Point, Tag, TagStore};
use crate::view_state::ViewState;

/// What a pointer-down on the tag layer turned into
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointerDown {
    /// Landed on a tag; the filtered index is now selected
    Selected(usize),
    /// Started a drag
    DragStarted,
    /// Nothing is displayed yet
    Ignored,
}

pub struct Viewer<B: RasterBackend> {
    session: DocumentSession<B>,
    controller: RenderController<B>,
    tags: TagStore,
    gesture: GestureTranslator,
    view: ViewState,
    layer_origin: Point,
    zoom_step: f32,
    notifications: NotificationManager,
}

impl<B: RasterBackend> Viewer<B> {
    #[must_use]
    pub fn new(backend: Arc<B>, settings: &Settings) -> Self {
        let zoom = settings.zoom();
        Self {
            session: DocumentSession::new(backend.clone()),
            controller: RenderController::with_cache_size(backend, zoom, settings.cache_pages),
            tags: TagStore::new(),
            gesture: GestureTranslator::new(settings.min_drag_px),
            view: ViewState::new(zoom.factor()),
            layer_origin: Point::default(),
            zoom_step: settings.zoom_step,
            notifications: NotificationManager::with_default_duration(Duration::from_secs(
                settings.notification_secs,
            )),
        }
    }

    /// Decode `bytes` and start rendering its first page.
    ///
    /// A bad document is reported and leaves the current one on screen.
    pub fn load(&mut self, bytes: Vec<u8>) -> Result<Option<RequestId>, DecodeError> {
        let handle = match self.session.load(bytes) {
            Ok(handle) => handle,
            Err(e) => {
                error!("Failed to load document: {e}");
                self.notifications.error(format!("Could not open document: {e}"));
                return Err(e);
            }
        };

        self.gesture.cancel();
        self.view.invalidate_selection();
        Ok(self.controller.load_document(handle))
    }

    pub fn next_page(&mut self) -> Option<RequestId> {
        self.controller.apply(Command::NextPage)
    }

    pub fn prev_page(&mut self) -> Option<RequestId> {
        self.controller.apply(Command::PrevPage)
    }

    /// Go to `page` (1-based); out of range does nothing
    pub fn go_to_page(&mut self, page: usize) -> Option<RequestId> {
        self.controller.apply(Command::GoToPage(page))
    }

    pub fn change_scale(&mut self, delta: f32) -> Option<RequestId> {
        self.controller.apply(Command::ChangeScale(delta))
    }

    pub fn set_scale(&mut self, scale: f32) -> Option<RequestId> {
        self.controller.apply(Command::SetScale(scale))
    }

    pub fn zoom_in(&mut self) -> Option<RequestId> {
        self.change_scale(self.zoom_step)
    }

    pub fn zoom_out(&mut self) -> Option<RequestId> {
        self.change_scale(-self.zoom_step)
    }

    pub fn rerender(&mut self) -> Option<RequestId> {
        self.controller.apply(Command::Rerender)
    }

    /// Abandon the render in flight; the page on screen stays
    pub fn cancel_render(&mut self) {
        self.controller.cancel_current(&self.view);
    }

    /// On-screen position of the tag layer's top-left corner
    pub fn set_layer_origin(&mut self, origin: Point) {
        self.layer_origin = origin;
    }

    pub fn pointer_down(&mut self, client: Point) -> PointerDown {
        if !self.view.is_loaded() {
            return PointerDown::Ignored;
        }

        let point = client.relative_to(self.layer_origin);
        let page = self.view.current_page();
        if let Some(index) = self.tags.hit_test(page, point, self.view.scale()) {
            self.gesture.cancel();
            self.view.select(index);
            debug!("Selected tag {index} on page {page}");
            return PointerDown::Selected(index);
        }

        self.gesture.pointer_down(point);
        PointerDown::DragStarted
    }

    /// Finish a drag; returns the new tag if the drag was large enough
    pub fn pointer_up(&mut self, client: Point) -> Option<&Tag> {
        let point = client.relative_to(self.layer_origin);
        let outcome = self
            .gesture
            .pointer_up(point, self.view.current_page(), self.view.scale());

        match outcome {
            DragOutcome::Tag(draft) => {
                // The current page's filtered list grows, so indices shift meaning.
                self.view.invalidate_selection();
                let tag = self.tags.append(draft);
                info!("Created tag {} on page {}", tag.label, tag.page);
                Some(tag)
            }
            DragOutcome::Degenerate { .. } | DragOutcome::Ignored => None,
        }
    }

    /// Select element `filtered_index` of the current page's tag list
    pub fn select(&mut self, filtered_index: usize) {
        self.view.select(filtered_index);
    }

    #[must_use]
    pub fn selected_tag(&self) -> Option<&Tag> {
        let index = self.view.selected()?;
        self.tags.get_for_page(self.view.current_page(), index)
    }

    /// Tags of the page on screen, in creation order
    pub fn tags_on_page(&self) -> impl Iterator<Item = &Tag> + '_ {
        self.tags.list_for_page(self.view.current_page())
    }

    /// Handle every render that has settled so far
    pub fn pump(&mut self) -> Vec<RenderEvent> {
        self.notifications.update();
        let scale_before = self.view.scale();
        let events = self.controller.poll(&mut self.view);
        for event in &events {
            self.handle_render_event(event, scale_before);
        }
        events
    }

    /// Block until the render in flight settles, up to `timeout`
    pub fn wait_for_render(&mut self, timeout: Duration) -> Option<RenderEvent> {
        self.notifications.update();
        let scale_before = self.view.scale();
        let event = self.controller.wait(&mut self.view, timeout)?;
        self.handle_render_event(&event, scale_before);
        Some(event)
    }

    fn handle_render_event(&mut self, event: &RenderEvent, scale_before: f32) {
        match event {
            RenderEvent::Completed { page_changed, .. } => {
                // A drag must not span two layouts.
                if *page_changed || self.view.scale() != scale_before {
                    self.gesture.cancel();
                }
            }
            RenderEvent::Failed { page, error } => {
                warn!("Keeping page {} after failed render", self.view.current_page());
                self.notifications
                    .error(format!("Could not render page {page}: {error}"));
            }
        }
    }

    /// Write the page on screen with its tags outlined to a PNG
    pub fn snapshot(&self, path: &Path) -> anyhow::Result<()> {
        self.controller.presentation().save_png(
            path,
            self.tags_on_page(),
            self.view.selected(),
            self.view.scale(),
        )
    }

    #[must_use]
    pub fn view(&self) -> &ViewState {
        &self.view
    }

    #[must_use]
    pub fn presentation(&self) -> &Presentation {
        self.controller.presentation()
    }

    #[must_use]
    pub fn tags(&self) -> &TagStore {
        &self.tags
    }

    #[must_use]
    pub fn is_rendering(&self) -> bool {
        self.controller.is_in_flight()
    }

    #[must_use]
    pub fn notifications(&self) -> &NotificationManager {
        &self.notifications
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::Viewport;
    use crate::test_utils::{FakeBackend, LETTER, fake_document};
    use crate::tags::TagRect;

    const WAIT: Duration = Duration::from_secs(5);

    fn viewer_with(backend: FakeBackend, pages: &[(f32, f32)]) -> Viewer<FakeBackend> {
        let mut viewer = Viewer::new(Arc::new(backend), &Settings::default());
        viewer.load(fake_document(pages)).unwrap();
        viewer.wait_for_render(WAIT);
        viewer
    }

    fn drag(viewer: &mut Viewer<FakeBackend>, from: (f32, f32), to: (f32, f32)) -> Option<Tag> {
        viewer.pointer_down(Point::new(from.0, from.1));
        viewer.pointer_up(Point::new(to.0, to.1)).cloned()
    }

    #[test]
    fn gestures_before_first_render_are_ignored() {
        let mut viewer = Viewer::new(Arc::new(FakeBackend::new()), &Settings::default());
        assert_eq!(viewer.pointer_down(Point::new(5.0, 5.0)), PointerDown::Ignored);
        assert!(viewer.pointer_up(Point::new(50.0, 50.0)).is_none());
        assert!(viewer.tags().is_empty());
    }

    #[test]
    fn bad_document_is_reported_and_keeps_current_page() {
        let mut viewer = viewer_with(FakeBackend::new(), &[LETTER, LETTER]);
        viewer.next_page();
        viewer.wait_for_render(WAIT);

        assert!(viewer.load(b"not a document".to_vec()).is_err());
        assert_eq!(viewer.view().current_page(), 2);
        assert!(!viewer.is_rendering());
        assert_eq!(viewer.notifications().count(), 1);
    }

    #[test]
    fn layer_origin_is_subtracted() {
        let mut viewer = viewer_with(FakeBackend::new(), &[LETTER]);
        viewer.set_layer_origin(Point::new(100.0, 50.0));

        let tag = drag(&mut viewer, (120.0, 70.0), (220.0, 170.0)).unwrap();
        assert_eq!(tag.rect, TagRect::new(20.0, 20.0, 100.0, 100.0));
    }

    #[test]
    fn click_on_tag_selects_instead_of_dragging() {
        let mut viewer = viewer_with(FakeBackend::new(), &[LETTER]);
        drag(&mut viewer, (20.0, 20.0), (120.0, 120.0)).unwrap();

        assert_eq!(viewer.pointer_down(Point::new(50.0, 50.0)), PointerDown::Selected(0));
        assert!(viewer.pointer_up(Point::new(300.0, 300.0)).is_none());
        assert_eq!(viewer.tags().len(), 1);
        assert_eq!(viewer.selected_tag().unwrap().label, "P1");
    }

    #[test]
    fn append_to_current_page_invalidates_selection() {
        let mut viewer = viewer_with(FakeBackend::new(), &[LETTER]);
        drag(&mut viewer, (20.0, 20.0), (120.0, 120.0)).unwrap();
        viewer.select(0);

        drag(&mut viewer, (200.0, 200.0), (260.0, 260.0)).unwrap();
        assert_eq!(viewer.view().selected(), None);
    }

    #[test]
    fn select_does_not_validate_index() {
        let mut viewer = viewer_with(FakeBackend::new(), &[LETTER]);
        viewer.select(7);
        assert_eq!(viewer.view().selected(), Some(7));
        assert!(viewer.selected_tag().is_none());
    }

    #[test]
    fn page_change_drops_selection_and_pending_drag() {
        let mut viewer = viewer_with(FakeBackend::new(), &[LETTER, LETTER]);
        drag(&mut viewer, (20.0, 20.0), (120.0, 120.0)).unwrap();
        viewer.select(0);

        viewer.pointer_down(Point::new(300.0, 300.0));
        viewer.next_page();
        viewer.wait_for_render(WAIT);

        assert_eq!(viewer.view().selected(), None);
        assert!(viewer.pointer_up(Point::new(400.0, 400.0)).is_none());
        assert_eq!(viewer.tags_on_page().count(), 0);
    }

    #[test]
    fn drag_during_render_uses_committed_page() {
        let (backend, gate) = FakeBackend::gated();
        let mut viewer = Viewer::new(Arc::new(backend), &Settings::default());
        viewer.load(fake_document(&[LETTER, LETTER])).unwrap();
        gate.release();
        viewer.wait_for_render(WAIT);

        viewer.next_page();
        let tag = drag(&mut viewer, (20.0, 20.0), (120.0, 120.0)).unwrap();
        assert_eq!(tag.page, 1);
        assert_eq!(tag.scale, 1.5);

        gate.release();
        viewer.wait_for_render(WAIT);
        assert_eq!(viewer.view().current_page(), 2);
    }

    #[test]
    fn tags_follow_zoom_on_screen() {
        let mut viewer = viewer_with(FakeBackend::new(), &[LETTER]);
        drag(&mut viewer, (20.0, 20.0), (120.0, 120.0)).unwrap();

        viewer.set_scale(3.0);
        viewer.wait_for_render(WAIT);
        assert_eq!(viewer.presentation().viewport(), Some(Viewport::new(1836, 2376)));

        // The stored rectangle is untouched; hit testing uses its projection.
        let tag = viewer.tags_on_page().next().unwrap();
        assert_eq!(tag.rect, TagRect::new(20.0, 20.0, 100.0, 100.0));
        assert_eq!(viewer.pointer_down(Point::new(230.0, 230.0)), PointerDown::Selected(0));
    }

    #[test]
    fn failed_render_notifies() {
        let mut viewer = viewer_with(FakeBackend::new().failing_on(2), &[LETTER, LETTER]);
        viewer.next_page();

        let event = viewer.wait_for_render(WAIT);
        assert!(matches!(event, Some(RenderEvent::Failed { page: 2, .. })));
        assert_eq!(viewer.view().current_page(), 1);
        assert_eq!(viewer.notifications().count(), 1);

        // Still usable afterwards.
        assert!(drag(&mut viewer, (20.0, 20.0), (120.0, 120.0)).is_some());
    }

    #[test]
    fn expired_notifications_are_dropped_on_pump() {
        let settings = Settings {
            notification_secs: 0,
            ..Settings::default()
        };
        let mut viewer = Viewer::new(Arc::new(FakeBackend::new().failing_on(2)), &settings);
        viewer.load(fake_document(&[LETTER, LETTER])).unwrap();
        viewer.wait_for_render(WAIT);

        viewer.next_page();
        let event = viewer.wait_for_render(WAIT);
        assert!(matches!(event, Some(RenderEvent::Failed { page: 2, .. })));
        assert_eq!(viewer.notifications().count(), 1);

        std::thread::sleep(Duration::from_millis(20));
        viewer.pump();
        assert_eq!(viewer.notifications().count(), 0);
    }

    #[test]
    fn zoom_steps_use_configured_step() {
        let settings = Settings {
            zoom_step: 0.5,
            ..Settings::default()
        };
        let mut viewer = Viewer::new(Arc::new(FakeBackend::new()), &settings);
        viewer.load(fake_document(&[LETTER])).unwrap();
        viewer.wait_for_render(WAIT);

        viewer.zoom_in();
        viewer.wait_for_render(WAIT);
        assert_eq!(viewer.view().scale(), 2.0);

        for _ in 0..5 {
            viewer.zoom_out();
            viewer.wait_for_render(WAIT);
        }
        assert_eq!(viewer.view().scale(), 0.5);
    }
}
