use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use pagetag::Settings;
use pagetag::Viewer;
use pagetag::pdf::{RenderEvent, Viewport};
use pagetag::script::{ScriptRunner, parse_script};
use pagetag::tags::{Point, TagRect};
use pagetag::test_utils::{FakeBackend, LETTER, fake_document};

const WAIT: Duration = Duration::from_secs(5);

fn open(backend: FakeBackend, pages: &[(f32, f32)]) -> Viewer<FakeBackend> {
    let mut viewer = Viewer::new(Arc::new(backend), &Settings::default());
    viewer.load(fake_document(pages)).expect("fake document loads");
    let event = viewer.wait_for_render(WAIT);
    assert!(matches!(event, Some(RenderEvent::Completed { page: 1, .. })));
    viewer
}

fn settle(viewer: &mut Viewer<FakeBackend>) {
    viewer.wait_for_render(WAIT);
    assert!(!viewer.is_rendering());
}

#[test]
fn tag_stays_on_its_page_across_navigation() {
    let mut viewer = open(FakeBackend::new(), &[LETTER, LETTER]);
    assert_eq!(viewer.view().scale(), 1.5);

    viewer.pointer_down(Point::new(20.0, 20.0));
    let tag = viewer.pointer_up(Point::new(120.0, 120.0)).cloned().unwrap();
    assert_eq!(tag.page, 1);
    assert_eq!(tag.rect, TagRect::new(20.0, 20.0, 100.0, 100.0));
    assert_eq!(tag.label, "P1");

    viewer.next_page();
    settle(&mut viewer);
    assert_eq!(viewer.view().current_page(), 2);
    assert_eq!(viewer.tags_on_page().count(), 0);

    viewer.prev_page();
    settle(&mut viewer);
    let on_page: Vec<_> = viewer.tags_on_page().cloned().collect();
    assert_eq!(on_page, vec![tag]);
}

#[test]
fn zoom_round_trip_restores_surface_and_layer() {
    let mut viewer = open(FakeBackend::new(), &[LETTER]);
    let original = viewer.presentation().viewport();
    assert_eq!(original, Some(Viewport::new(918, 1188)));

    viewer.change_scale(0.25);
    settle(&mut viewer);
    assert_eq!(viewer.view().scale(), 1.75);
    assert_eq!(viewer.presentation().viewport(), Some(Viewport::new(1071, 1386)));
    assert_eq!(viewer.presentation().layer(), viewer.presentation().viewport());

    viewer.change_scale(-0.25);
    settle(&mut viewer);
    assert_eq!(viewer.presentation().viewport(), original);
    assert_eq!(viewer.presentation().layer(), original);
}

#[test]
fn zoom_never_goes_below_floor() {
    let mut viewer = open(FakeBackend::new(), &[LETTER]);

    viewer.change_scale(-10.0);
    settle(&mut viewer);
    assert_eq!(viewer.view().scale(), 0.5);
    assert_eq!(viewer.presentation().viewport(), Some(Viewport::new(306, 396)));

    assert!(viewer.change_scale(-0.25).is_none());
}

#[test]
fn only_last_of_rapid_requests_lands() {
    let (backend, gate) = FakeBackend::gated();
    let mut viewer = Viewer::new(Arc::new(backend), &Settings::default());
    viewer
        .load(fake_document(&[LETTER, (100.0, 100.0), (200.0, 100.0)]))
        .unwrap();

    viewer.go_to_page(2);
    viewer.go_to_page(3);
    viewer.change_scale(0.5);
    for _ in 0..4 {
        gate.release();
    }

    let event = viewer.wait_for_render(WAIT);
    assert!(matches!(event, Some(RenderEvent::Completed { page: 3, .. })));
    assert_eq!(viewer.view().current_page(), 3);
    assert_eq!(viewer.view().scale(), 2.0);
    assert_eq!(viewer.presentation().viewport(), Some(Viewport::new(400, 200)));

    std::thread::sleep(Duration::from_millis(50));
    assert!(viewer.pump().is_empty());
    assert_eq!(viewer.view().current_page(), 3);
}

#[test]
fn degenerate_drags_create_nothing() {
    let mut viewer = open(FakeBackend::new(), &[LETTER]);

    viewer.pointer_down(Point::new(10.0, 10.0));
    assert!(viewer.pointer_up(Point::new(19.0, 110.0)).is_none());
    viewer.pointer_down(Point::new(10.0, 10.0));
    assert!(viewer.pointer_up(Point::new(10.0, 10.0)).is_none());
    assert!(viewer.tags().is_empty());

    viewer.pointer_down(Point::new(30.0, 30.0));
    let tag = viewer.pointer_up(Point::new(20.0, 20.0)).unwrap();
    assert_eq!(tag.rect, TagRect::new(20.0, 20.0, 10.0, 10.0));
    assert_eq!(tag.label, "P1");
}

#[test]
fn page_lists_stay_exact_after_mixed_events() {
    let pages = [(200.0, 200.0); 3];
    let mut viewer = open(FakeBackend::new(), &pages);
    let mut expected: Vec<Vec<String>> = vec![Vec::new(); pages.len() + 1];
    let mut rng = StdRng::seed_from_u64(0x2545_F491_4F6C_DD1D);

    for _ in 0..200 {
        match rng.gen_range(0..5) {
            0 => {
                viewer.next_page();
            }
            1 => {
                viewer.prev_page();
            }
            2 => {
                let delta = if rng.gen_bool(0.5) { 0.25 } else { -0.25 };
                viewer.change_scale(delta);
            }
            _ => {
                let x = f32::from(rng.gen_range(0..400u16));
                let y = f32::from(rng.gen_range(0..400u16));
                let w = f32::from(rng.gen_range(0..40u16));
                let h = f32::from(rng.gen_range(0..40u16));
                viewer.pointer_down(Point::new(x, y));
                if let Some(tag) = viewer.pointer_up(Point::new(x + w, y + h)) {
                    expected[tag.page].push(tag.label.clone());
                }
            }
        }
        viewer.wait_for_render(WAIT);
    }

    for (page, labels) in expected.iter().enumerate().skip(1) {
        let listed: Vec<_> = viewer
            .tags()
            .list_for_page(page)
            .map(|t| t.label.clone())
            .collect();
        assert_eq!(&listed, labels, "page {page}");
    }
    assert_eq!(
        viewer.tags().len(),
        expected.iter().map(Vec::len).sum::<usize>()
    );
}

#[test]
fn script_drives_a_full_session() {
    let mut viewer = open(FakeBackend::new(), &[LETTER, LETTER]);
    let dir = tempfile::tempdir().unwrap();
    let snapshot = dir.path().join("page.png");

    let script = format!(
        "origin 10 10\n\
         drag 30 30 130 130\n\
         click 50 50\n\
         next\n\
         tags\n\
         prev\n\
         snapshot {}\n\
         all\n",
        snapshot.display()
    );
    let commands = parse_script(&script).unwrap();

    let mut out = Vec::new();
    ScriptRunner::new(&mut viewer, &mut out, WAIT)
        .run(&commands)
        .unwrap();

    let output = String::from_utf8(out).unwrap();
    let lines: Vec<_> = output.lines().collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(
        lines[0],
        r#"{"page":1,"left":20.0,"top":20.0,"width":100.0,"height":100.0,"label":"P1","scale":1.5}"#
    );
    assert_eq!(lines[1], "[]");
    assert!(lines[2].contains(r#""label":"P1""#));

    assert!(snapshot.exists());
    let image = image::open(&snapshot).unwrap();
    assert_eq!((image.width(), image.height()), (918, 1188));
}
