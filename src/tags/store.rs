//! Tag records and the ordered store that owns them

use log::debug;
use serde::Serialize;

use super::gesture::Point;

/// Axis-aligned rectangle in layer-local pixels
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct TagRect {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl TagRect {
    #[must_use]
    pub const fn new(left: f32, top: f32, width: f32, height: f32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// Bounding box of two corner points
    #[must_use]
    pub fn from_corners(a: Point, b: Point) -> Self {
        Self {
            left: a.x.min(b.x),
            top: a.y.min(b.y),
            width: (a.x - b.x).abs(),
            height: (a.y - b.y).abs(),
        }
    }

    #[must_use]
    pub fn right(&self) -> f32 {
        self.left + self.width
    }

    #[must_use]
    pub fn bottom(&self) -> f32 {
        self.top + self.height
    }

    /// Edges inclusive
    #[must_use]
    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.left
            && point.x <= self.right()
            && point.y >= self.top
            && point.y <= self.bottom()
    }

    #[must_use]
    pub fn scaled(&self, factor: f32) -> Self {
        Self {
            left: self.left * factor,
            top: self.top * factor,
            width: self.width * factor,
            height: self.height * factor,
        }
    }
}

/// A tag that passed the gesture filter but has no label yet
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TagDraft {
    /// Page the tag belongs to (1-based)
    pub page: usize,
    /// Rectangle in the layer coordinates of the viewport active when drawn
    pub rect: TagRect,
    /// Scale of that viewport
    pub scale: f32,
}

/// A labeled rectangle bound to one page. Never mutated once stored.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Tag {
    pub page: usize,
    #[serde(flatten)]
    pub rect: TagRect,
    pub label: String,
    /// Scale of the viewport the rectangle was captured at
    pub scale: f32,
}

impl Tag {
    /// The rectangle projected into the viewport of `scale`.
    ///
    /// Identity at the capture scale, so stored geometry is returned as-is.
    #[must_use]
    pub fn rect_at(&self, scale: f32) -> TagRect {
        if (scale - self.scale).abs() <= f32::EPSILON || self.scale <= 0.0 {
            self.rect
        } else {
            self.rect.scaled(scale / self.scale)
        }
    }
}

/// Ordered, append-only collection of tags for the whole session
#[derive(Debug, Default)]
pub struct TagStore {
    tags: Vec<Tag>,
    next_seq: usize,
}

impl TagStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            tags: Vec::new(),
            next_seq: 1,
        }
    }

    /// Store a draft under the next sequence label (`P1`, `P2`, ...)
    pub fn append(&mut self, draft: TagDraft) -> &Tag {
        let seq = self.next_seq.max(1);
        self.next_seq = seq + 1;

        let tag = Tag {
            page: draft.page,
            rect: draft.rect,
            label: format!("P{seq}"),
            scale: draft.scale,
        };
        debug!("Appending tag {} on page {}: {:?}", tag.label, tag.page, tag.rect);

        self.tags.push(tag);
        &self.tags[self.tags.len() - 1]
    }

    /// Tags on `page` in append order
    pub fn list_for_page(&self, page: usize) -> impl Iterator<Item = &Tag> + '_ {
        self.tags.iter().filter(move |tag| tag.page == page)
    }

    /// Element `filtered_index` of the page's filtered list
    #[must_use]
    pub fn get_for_page(&self, page: usize, filtered_index: usize) -> Option<&Tag> {
        self.list_for_page(page).nth(filtered_index)
    }

    /// Filtered index of the topmost tag on `page` under `point`, with tag
    /// rectangles projected to `scale`.
    #[must_use]
    pub fn hit_test(&self, page: usize, point: Point, scale: f32) -> Option<usize> {
        self.list_for_page(page)
            .enumerate()
            .filter(|(_, tag)| tag.rect_at(scale).contains(point))
            .map(|(i, _)| i)
            .last()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Tag> + '_ {
        self.tags.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tags.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(page: usize, left: f32) -> TagDraft {
        TagDraft {
            page,
            rect: TagRect::new(left, 10.0, 20.0, 20.0),
            scale: 1.0,
        }
    }

    #[test]
    fn labels_are_global_sequence() {
        let mut store = TagStore::new();
        assert_eq!(store.append(draft(1, 0.0)).label, "P1");
        assert_eq!(store.append(draft(2, 0.0)).label, "P2");
        assert_eq!(store.append(draft(1, 0.0)).label, "P3");
    }

    #[test]
    fn default_store_also_starts_at_p1() {
        let mut store = TagStore::default();
        assert_eq!(store.append(draft(1, 0.0)).label, "P1");
        assert_eq!(store.append(draft(1, 0.0)).label, "P2");
    }

    #[test]
    fn list_for_page_filters_in_append_order() {
        let mut store = TagStore::new();
        store.append(draft(1, 1.0));
        store.append(draft(2, 2.0));
        store.append(draft(1, 3.0));
        store.append(draft(3, 4.0));
        store.append(draft(1, 5.0));

        let lefts: Vec<f32> = store.list_for_page(1).map(|t| t.rect.left).collect();
        assert_eq!(lefts, vec![1.0, 3.0, 5.0]);

        let labels: Vec<&str> = store.list_for_page(2).map(|t| t.label.as_str()).collect();
        assert_eq!(labels, vec!["P2"]);
        assert_eq!(store.list_for_page(4).count(), 0);
        assert_eq!(store.len(), 5);
    }

    #[test]
    fn get_for_page_uses_filtered_index() {
        let mut store = TagStore::new();
        store.append(draft(2, 0.0));
        store.append(draft(1, 0.0));
        store.append(draft(2, 0.0));

        assert_eq!(store.get_for_page(2, 1).unwrap().label, "P3");
        assert!(store.get_for_page(1, 1).is_none());
    }

    #[test]
    fn hit_test_prefers_topmost() {
        let mut store = TagStore::new();
        store.append(draft(1, 0.0));
        store.append(draft(1, 10.0));

        assert_eq!(store.hit_test(1, Point::new(15.0, 15.0), 1.0), Some(1));
        assert_eq!(store.hit_test(1, Point::new(5.0, 15.0), 1.0), Some(0));
        assert_eq!(store.hit_test(1, Point::new(500.0, 500.0), 1.0), None);
        assert_eq!(store.hit_test(2, Point::new(15.0, 15.0), 1.0), None);
    }

    #[test]
    fn rect_is_projected_to_display_scale() {
        let tag = Tag {
            page: 1,
            rect: TagRect::new(20.0, 20.0, 100.0, 100.0),
            label: "P1".into(),
            scale: 1.5,
        };

        assert_eq!(tag.rect_at(1.5), tag.rect);
        let doubled = tag.rect_at(3.0);
        assert_eq!(doubled, TagRect::new(40.0, 40.0, 200.0, 200.0));
    }

    #[test]
    fn from_corners_normalizes_direction() {
        let rect = TagRect::from_corners(Point::new(120.0, 20.0), Point::new(20.0, 120.0));
        assert_eq!(rect, TagRect::new(20.0, 20.0, 100.0, 100.0));
    }

    #[test]
    fn serializes_flat_record() {
        let mut store = TagStore::new();
        let tag = store.append(TagDraft {
            page: 1,
            rect: TagRect::new(20.0, 20.0, 100.0, 100.0),
            scale: 1.5,
        });

        let json = serde_json::to_value(tag).unwrap();
        assert_eq!(json["page"], 1);
        assert_eq!(json["left"], 20.0);
        assert_eq!(json["height"], 100.0);
        assert_eq!(json["label"], "P1");
    }
}
