use folio::document::{
    ChannelOrder, DocumentSession, FitPolicy, MAX_ZOOM, MIN_ZOOM, OpenOptions, ViewerError,
    Viewport,
};
use folio::test_utils::test_helpers::{
    FAKE_PADDING, FakeBackend, FakeDocument, FakePageSpec, book_outline,
};

const PATH: &str = "fixtures/manual.pdf";

fn open(backend: &FakeBackend) -> DocumentSession<FakeDocument> {
    DocumentSession::open(backend, PATH, None, OpenOptions::default()).unwrap()
}

#[test]
fn test_page_cursor_is_clamped() {
    let backend = FakeBackend::with_pages(10);
    let mut session = open(&backend);

    assert_eq!(session.set_current_page(0).unwrap(), 1);
    assert_eq!(session.set_current_page(-5).unwrap(), 1);
    assert_eq!(session.set_current_page(999).unwrap(), 10);
    assert_eq!(session.next_page().unwrap(), 10);
    assert_eq!(session.set_current_page(1).unwrap(), 1);
    assert_eq!(session.previous_page().unwrap(), 1);
    assert_eq!(session.next_page().unwrap(), 2);
}

#[test]
fn test_open_options_are_clamped() {
    let backend = FakeBackend::with_pages(10);
    let options = OpenOptions {
        page: 99,
        zoom: 9.0,
        rotation: -90,
        viewport: Viewport::new(640, 480),
    };
    let session = DocumentSession::open(&backend, PATH, None, options).unwrap();

    assert_eq!(session.current_page().unwrap(), 10);
    assert_eq!(session.zoom().unwrap(), 3.0);
    assert_eq!(session.rotation().unwrap(), 270);
    assert_eq!(session.viewport().unwrap(), Viewport::new(640, 480));
}

#[test]
fn test_title_falls_back_to_file_name() {
    let session = open(&FakeBackend::with_pages(1));
    assert_eq!(session.title().unwrap(), "manual.pdf");

    let session = open(&FakeBackend::with_pages(1).title("  User Manual "));
    assert_eq!(session.title().unwrap(), "User Manual");
}

#[test]
fn test_password_handling() {
    let backend = FakeBackend::with_pages(10).password("secret");

    let err = DocumentSession::open(&backend, PATH, Some("guess"), OpenOptions::default())
        .unwrap_err();
    assert!(matches!(err, ViewerError::AuthenticationFailed));

    let err = DocumentSession::open(&backend, PATH, None, OpenOptions::default()).unwrap_err();
    assert!(matches!(err, ViewerError::AuthenticationRequired));

    let err = DocumentSession::open(&backend, PATH, Some(""), OpenOptions::default()).unwrap_err();
    assert!(matches!(err, ViewerError::AuthenticationRequired));

    let session =
        DocumentSession::open(&backend, PATH, Some("secret"), OpenOptions::default()).unwrap();
    assert_eq!(session.page_count().unwrap(), 10);
}

#[test]
fn test_corrupt_document_is_repaired_once() {
    let backend = FakeBackend::with_pages(3).corrupt();
    let counters = backend.counters();

    let session = open(&backend);
    assert_eq!(session.page_count().unwrap(), 3);
    assert_eq!(counters.opens.get(), 1);
    assert_eq!(counters.repairs.get(), 1);
}

#[test]
fn test_unrepairable_document_fails_to_open() {
    let backend = FakeBackend::with_pages(3).unrepairable();
    let counters = backend.counters();

    let err = DocumentSession::open(&backend, PATH, None, OpenOptions::default()).unwrap_err();
    assert!(matches!(err, ViewerError::Open { ref path, .. } if path == PATH));
    assert_eq!(counters.repairs.get(), 1);
}

#[test]
fn test_empty_document_fails_to_open() {
    let backend = FakeBackend::with_pages(0);
    let err = DocumentSession::open(&backend, PATH, None, OpenOptions::default()).unwrap_err();
    assert!(matches!(err, ViewerError::Open { .. }));
}

#[test]
fn test_same_page_two_viewports_loads_page_once() {
    let backend = FakeBackend::with_pages(10);
    let counters = backend.counters();
    let mut session = open(&backend);

    let small = session
        .render_page(3, Viewport::new(400, 600), FitPolicy::ContainWithinViewport)
        .unwrap();
    let small_dims = (small.width(), small.height());
    let small_order = small.channel_order();

    let large = session
        .render_page(3, Viewport::new(1200, 1800), FitPolicy::ContainWithinViewport)
        .unwrap();
    let large_dims = (large.width(), large.height());

    assert_ne!(small_dims, large_dims);
    assert!(large_dims.0 > small_dims.0 && large_dims.1 > small_dims.1);
    assert_eq!(small_order, ChannelOrder::Argb);
    assert_eq!(large.channel_order(), ChannelOrder::Argb);
    assert_eq!(counters.page_loads.get(), 1);
    assert_eq!(counters.renders.get(), 2);
    assert_eq!(session.viewport().unwrap(), Viewport::new(1200, 1800));
}

#[test]
fn test_contain_and_cover_sizes() {
    let backend = FakeBackend::with_pages(1);
    let mut session = open(&backend);

    let contained = session
        .render_page(1, Viewport::new(400, 600), FitPolicy::ContainWithinViewport)
        .unwrap();
    assert!(contained.width() <= 401 && contained.height() <= 601);
    assert!(contained.width() >= 399 || contained.height() >= 599);

    let covered = session
        .render_page(1, Viewport::new(300, 300), FitPolicy::CoverViewport)
        .unwrap();
    assert!(covered.width() >= 300 && covered.height() >= 300);
}

#[test]
fn test_rendered_samples_are_argb() {
    let backend = FakeBackend::with_pages(1);
    let mut session = open(&backend);

    let buffer = session
        .render_page(1, Viewport::new(100, 100), FitPolicy::ContainWithinViewport)
        .unwrap();
    assert_eq!(buffer.pixel(0, 0), Some(&[0xFF, 0x30, 0x20, 0x10][..]));
    let row_end = buffer.width() as usize * 4;
    assert_eq!(buffer.samples()[row_end], FAKE_PADDING);
}

#[test]
fn test_rotation_reuses_loaded_page() {
    let backend = FakeBackend::with_pages(2);
    let counters = backend.counters();
    let mut session = open(&backend);
    let viewport = Viewport::new(400, 600);

    let upright = session
        .render_page(2, viewport, FitPolicy::ContainWithinViewport)
        .unwrap();
    assert!(upright.height() > upright.width());

    session.rotate_by(90).unwrap();
    let turned = session
        .render_page(2, viewport, FitPolicy::ContainWithinViewport)
        .unwrap();
    assert!(turned.width() > turned.height());
    assert!(turned.width() <= 401);

    assert_eq!(counters.page_loads.get(), 1);
    assert_eq!(session.rotation().unwrap(), 90);
}

#[test]
fn test_intrinsic_page_rotation_is_applied() {
    let backend = FakeBackend::with_page_specs(vec![FakePageSpec::new(612.0, 792.0).rotated(90)]);
    let mut session = open(&backend);

    let buffer = session
        .render_page(1, Viewport::new(800, 800), FitPolicy::ContainWithinViewport)
        .unwrap();
    assert!(buffer.width() > buffer.height());
}

#[test]
fn test_fixed_zoom_render() {
    let backend = FakeBackend::with_pages(2);
    let mut session = open(&backend);
    session.set_zoom(2.0).unwrap();

    let buffer = session.render_page_at_zoom(1).unwrap();
    assert_eq!((buffer.width(), buffer.height()), (1224, 1584));
    assert_eq!(session.zoom().unwrap(), 2.0);
}

#[test]
fn test_fit_render_updates_zoom_and_cursor() {
    let backend = FakeBackend::with_pages(10);
    let mut session = open(&backend);

    session
        .render_page(5, Viewport::new(306, 1000), FitPolicy::ContainWithinViewport)
        .unwrap();
    assert!((session.zoom().unwrap() - 0.5).abs() < 1e-6);
    assert_eq!(session.current_page().unwrap(), 5);
    assert_eq!(session.loaded_page().unwrap(), Some(5));

    session.next_page().unwrap();
    session
        .render_current(Viewport::new(306, 1000), FitPolicy::ContainWithinViewport)
        .unwrap();
    assert_eq!(session.loaded_page().unwrap(), Some(6));
}

#[test]
fn test_stored_fit_zoom_stays_in_range() {
    let backend = FakeBackend::with_pages(2);
    let mut session = open(&backend);

    session
        .render_page(1, Viewport::new(10, 10), FitPolicy::ContainWithinViewport)
        .unwrap();
    assert_eq!(session.zoom().unwrap(), MIN_ZOOM);

    let fixed = session.render_page_at_zoom(1).unwrap();
    assert!((61..=63).contains(&fixed.width()));
    assert!((79..=81).contains(&fixed.height()));

    session
        .render_page(2, Viewport::new(2000, 2000), FitPolicy::CoverViewport)
        .unwrap();
    assert_eq!(session.zoom().unwrap(), MAX_ZOOM);
}

#[test]
fn test_page_load_failure_leaves_nothing_loaded() {
    let backend = FakeBackend::with_pages(5).failing_page(3);
    let counters = backend.counters();
    let mut session = open(&backend);
    let viewport = Viewport::new(200, 200);

    session
        .render_page(2, viewport, FitPolicy::ContainWithinViewport)
        .unwrap();

    let err = session
        .render_page(3, viewport, FitPolicy::ContainWithinViewport)
        .unwrap_err();
    assert!(matches!(err, ViewerError::PageLoad { page: 3, .. }));
    assert_eq!(session.loaded_page().unwrap(), None);
    assert!(session.current_buffer().unwrap().is_none());
    assert_eq!(counters.pages_alive.get(), 0);
    assert_eq!(session.current_page().unwrap(), 2);
}

#[test]
fn test_out_of_range_render_is_a_page_load_error() {
    let backend = FakeBackend::with_pages(5);
    let counters = backend.counters();
    let mut session = open(&backend);
    let viewport = Viewport::new(200, 200);

    for page in [0, 6] {
        let err = session
            .render_page(page, viewport, FitPolicy::ContainWithinViewport)
            .unwrap_err();
        assert!(matches!(err, ViewerError::PageLoad { .. }));
    }
    assert_eq!(counters.page_loads.get(), 0);
}

#[test]
fn test_render_failure_keeps_page_but_no_buffer() {
    let backend = FakeBackend::with_pages(5).failing_render(2);
    let mut session = open(&backend);
    let viewport = Viewport::new(200, 200);

    session
        .render_page(1, viewport, FitPolicy::ContainWithinViewport)
        .unwrap();
    let err = session
        .render_page(2, viewport, FitPolicy::ContainWithinViewport)
        .unwrap_err();

    assert!(matches!(err, ViewerError::Render { page: 2, .. }));
    assert_eq!(session.loaded_page().unwrap(), Some(2));
    assert!(session.current_buffer().unwrap().is_none());
}

#[test]
fn test_backend_is_flushed_before_each_page_load() {
    let backend = FakeBackend::with_pages(5);
    let counters = backend.counters();
    let mut session = open(&backend);
    let viewport = Viewport::new(200, 200);

    for page in [1, 1, 2, 2, 1] {
        session
            .render_page(page, viewport, FitPolicy::ContainWithinViewport)
            .unwrap();
    }
    assert_eq!(counters.page_loads.get(), 3);
    assert_eq!(counters.flushes.get(), 3);
    assert_eq!(counters.pages_alive.get(), 1);
}

#[test]
fn test_navigation_tree_from_session() {
    let backend = FakeBackend::with_pages(6).outline(book_outline());
    let session = open(&backend);

    let tree = session.navigation_tree().unwrap();
    assert_eq!(tree.title, "Index");
    let titles: Vec<&str> = tree.children.iter().map(|c| c.title.as_str()).collect();
    assert_eq!(titles, vec!["Part I", "Part II", "Colophon"]);

    // Part II points past the last page and resolves to nothing
    assert_eq!(tree.children[1].page_number, None);
    assert_eq!(tree.children[0].children[1].children[0].page_number, Some(6));
}

#[test]
fn test_navigation_tree_without_outline() {
    let session = open(&FakeBackend::with_pages(2));
    let tree = session.navigation_tree().unwrap();
    assert_eq!(tree.title, "Index");
    assert!(tree.children.is_empty());
}

#[test]
fn test_every_operation_fails_after_close() {
    let backend = FakeBackend::with_pages(10).outline(book_outline());
    let counters = backend.counters();
    let mut session = open(&backend);
    let viewport = Viewport::new(200, 200);
    let fit = FitPolicy::ContainWithinViewport;

    session.render_page(4, viewport, fit).unwrap();
    assert_eq!(counters.pages_alive.get(), 1);

    session.close();
    assert!(!session.is_open());
    assert_eq!(counters.pages_alive.get(), 0);

    fn closed<T: std::fmt::Debug>(result: folio::document::Result<T>) {
        assert!(matches!(result, Err(ViewerError::UseAfterClose)), "{result:?}");
    }

    closed(session.title());
    closed(session.page_count());
    closed(session.current_page());
    closed(session.set_current_page(2));
    closed(session.next_page());
    closed(session.previous_page());
    closed(session.zoom());
    closed(session.set_zoom(1.5));
    closed(session.rotation());
    closed(session.set_rotation(90));
    closed(session.rotate_by(90));
    closed(session.viewport());
    closed(session.loaded_page());
    closed(session.current_buffer());
    closed(session.navigation_tree());
    closed(session.render_page(1, viewport, fit).map(|_| ()));
    closed(session.render_current(viewport, fit).map(|_| ()));
    closed(session.render_page_at_zoom(1).map(|_| ()));

    session.close();
    assert!(!session.is_open());
}
