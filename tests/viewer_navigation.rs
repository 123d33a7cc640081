use folio::document::ManifestDocument;
use folio::view::{SpecialZoomLevel, ZoomLevel};
use folio::{
    Destination, RotateDirection, ScrollMode, Size, ViewMode, Viewer, ViewerError, ViewerOptions,
};

/// Ten 100x200 pages in a 300x300 viewport, 10px gaps
fn viewer() -> Viewer {
    let doc = ManifestDocument::uniform(10, Size::new(100.0, 200.0));
    Viewer::new(
        Box::new(doc),
        ViewerOptions {
            container: Size::new(300.0, 300.0),
            ..ViewerOptions::default()
        },
    )
    .unwrap()
}

#[test]
fn opens_at_first_page() {
    let viewer = viewer();
    assert_eq!(viewer.current_page(), 0);
    assert_eq!(viewer.page_count(), 10);
    assert_eq!(viewer.visible_pages(), Some((0, 1)));
    assert_eq!(viewer.scroll().main, 0.0);
}

#[test]
fn jump_scrolls_page_to_top() {
    let mut viewer = viewer();
    viewer.jump_to_page(5).unwrap();

    assert_eq!(viewer.current_page(), 5);
    // Page 5 starts at 10 + 5 * 210; the gap above it stays visible
    assert_eq!(viewer.scroll().main, 1050.0);
    assert_eq!(viewer.visible_pages(), Some((5, 6)));
}

#[test]
fn jump_out_of_range_is_an_error() {
    let mut viewer = viewer();
    let err = viewer.jump_to_page(10).unwrap_err();
    assert!(matches!(
        err,
        ViewerError::PageOutOfRange {
            page: 10,
            page_count: 10
        }
    ));
    assert_eq!(viewer.current_page(), 0);
}

#[test]
fn last_page_jump_is_clamped_to_content_end() {
    let mut viewer = viewer();
    viewer.jump_to_page(9).unwrap();

    // Content is 2110 high, so the offset stops at 2110 - 300
    assert_eq!(viewer.scroll().main, 1810.0);
    assert_eq!(viewer.current_page(), 9);
}

#[test]
fn scrolling_follows_the_most_visible_page() {
    let mut viewer = viewer();
    viewer.scroll_to(400.0, 0.0);

    // Page 1 covers 220..420 and page 2 covers 430..630
    assert_eq!(viewer.current_page(), 2);
    assert_eq!(viewer.visible_pages(), Some((1, 3)));
}

#[test]
fn history_walks_back_and_forward() {
    let mut viewer = viewer();
    viewer.jump_to_page(5).unwrap();
    viewer.jump_to_page(8).unwrap();

    assert!(viewer.jump_to_previous_destination());
    assert_eq!(viewer.current_page(), 5);
    assert!(viewer.jump_to_previous_destination());
    assert_eq!(viewer.current_page(), 0);
    assert!(!viewer.jump_to_previous_destination());

    assert!(viewer.jump_to_next_destination());
    assert_eq!(viewer.current_page(), 5);
}

#[test]
fn history_returns_to_the_position_left() {
    let mut viewer = viewer();
    // Page 3 covers 640..840, so the viewport starts 20px into it
    viewer.scroll_to(660.0, 0.0);
    assert_eq!(viewer.current_page(), 3);

    viewer.jump_to_page(8).unwrap();
    assert!(viewer.jump_to_previous_destination());
    assert_eq!(viewer.current_page(), 3);
    assert!((viewer.scroll().main - 660.0).abs() < 1e-3);
}

#[test]
fn destination_with_zoom_changes_scale() {
    let mut viewer = viewer();
    let dest = Destination::page(3).with_zoom(ZoomLevel::Scale(2.0));
    viewer.jump_to_destination(dest).unwrap();

    assert_eq!(viewer.current_page(), 3);
    assert_eq!(viewer.scale(), 2.0);
}

#[test]
fn fragment_destinations_are_one_based() {
    let mut viewer = viewer();
    viewer.jump_to_named_destination("#page=4").unwrap();
    assert_eq!(viewer.current_page(), 3);

    assert!(matches!(
        viewer.jump_to_named_destination("nowhere"),
        Err(ViewerError::UnknownDestination(_))
    ));
}

#[test]
fn zoom_keeps_the_current_page() {
    let mut viewer = viewer();
    viewer.jump_to_page(4).unwrap();
    viewer.zoom(ZoomLevel::Scale(1.5));

    assert_eq!(viewer.scale(), 1.5);
    assert_eq!(viewer.current_page(), 4);
    let rect = viewer.layout().page_rects[4];
    assert_eq!(rect.height, 300.0);
    assert!(viewer.scroll().main < rect.y && rect.y - viewer.scroll().main <= 16.0);
}

#[test]
fn page_fit_uses_the_viewport() {
    let mut viewer = viewer();
    viewer.zoom(ZoomLevel::Special(SpecialZoomLevel::PageFit));

    assert_eq!(
        viewer.zoom_level(),
        ZoomLevel::Special(SpecialZoomLevel::PageFit)
    );
    // Height is limiting: (300 - 2 * 10) / 200
    assert!((viewer.scale() - 1.4).abs() < 1e-4);
}

#[test]
fn zoom_in_and_out_step_the_scale() {
    let mut viewer = viewer();
    viewer.zoom_in();
    assert!(viewer.scale() > 1.0);
    viewer.zoom_out();
    viewer.zoom_out();
    assert!(viewer.scale() < 1.0);
}

#[test]
fn rotation_swaps_page_extents() {
    let mut viewer = viewer();
    viewer.rotate(RotateDirection::Forward);

    assert_eq!(viewer.rotation().degrees(), 90);
    let rect = viewer.layout().page_rects[0];
    assert_eq!((rect.width, rect.height), (200.0, 100.0));

    viewer.rotate(RotateDirection::Backward);
    assert_eq!(viewer.rotation().degrees(), 0);
}

#[test]
fn single_page_rotation_only_touches_that_page() {
    let mut viewer = viewer();
    viewer.rotate_page(2, RotateDirection::Forward).unwrap();

    assert_eq!(viewer.page_rotation(2).degrees(), 90);
    assert_eq!(viewer.page_rotation(1).degrees(), 0);
    assert!(viewer.rotate_page(12, RotateDirection::Forward).is_err());
}

#[test]
fn dual_view_pairs_pages() {
    let mut viewer = viewer();
    viewer.switch_view_mode(ViewMode::DualPage);

    let layout = viewer.layout();
    assert_eq!(layout.rows.len(), 5);
    assert_eq!(layout.page_rows[0], layout.page_rows[1]);
    assert_ne!(layout.page_rows[1], layout.page_rows[2]);
}

#[test]
fn cover_view_keeps_first_page_alone() {
    let mut viewer = viewer();
    viewer.switch_view_mode(ViewMode::DualPageWithCover);

    let layout = viewer.layout();
    assert_eq!(layout.rows.len(), 6);
    assert_eq!(layout.rows[0].pages, 0..1);
    assert_eq!(layout.rows[1].pages, 1..3);
}

#[test]
fn wrapped_scrolling_forces_single_pages() {
    let mut viewer = viewer();
    viewer.switch_view_mode(ViewMode::DualPage);
    viewer.switch_scroll_mode(ScrollMode::Wrapped);

    assert_eq!(viewer.scroll_mode(), ScrollMode::Wrapped);
    assert_eq!(viewer.view_mode(), ViewMode::SinglePage);
}

#[test]
fn horizontal_scrolling_lays_pages_side_by_side() {
    let mut viewer = viewer();
    viewer.switch_scroll_mode(ScrollMode::Horizontal);

    let rects = &viewer.layout().page_rects;
    assert_eq!(rects[0].y, rects[1].y);
    assert!(rects[1].x > rects[0].x);
    // 300px wide viewport shows pages 0 (10..110) and 1 (120..220) and part of 2
    assert_eq!(viewer.visible_pages(), Some((0, 2)));
}

#[test]
fn page_mode_moves_one_row_at_a_time() {
    let mut viewer = viewer();
    viewer.switch_scroll_mode(ScrollMode::Page);
    assert_eq!(viewer.visible_pages(), Some((0, 0)));

    for page in 1..10 {
        viewer.scroll_by(1.0, 0.0);
        assert_eq!(viewer.current_page(), page);
        assert_eq!(viewer.visible_pages(), Some((page, page)));
    }
    // The last rows share the clamped end offset
    assert_eq!(viewer.scroll().main, 1810.0);
    viewer.scroll_by(1.0, 0.0);
    assert_eq!(viewer.current_page(), 9);

    for page in (0..9).rev() {
        viewer.scroll_by(-1.0, 0.0);
        assert_eq!(viewer.current_page(), page);
    }
    assert_eq!(viewer.scroll().main, 0.0);
}

#[test]
fn resize_keeps_the_current_page() {
    let mut viewer = viewer();
    viewer.jump_to_page(6).unwrap();
    viewer.resize(Size::new(600.0, 900.0));

    assert_eq!(viewer.current_page(), 6);
    assert_eq!(viewer.frame().viewport, Size::new(600.0, 900.0));
}

#[test]
fn empty_documents_are_rejected() {
    let doc = ManifestDocument::uniform(0, Size::new(100.0, 100.0));
    let result = Viewer::new(Box::new(doc), ViewerOptions::default());
    assert!(matches!(result, Err(ViewerError::EmptyDocument)));
}

#[test]
fn reload_clamps_to_the_new_page_count() {
    let mut viewer = viewer();
    viewer.jump_to_page(8).unwrap();

    let shorter = ManifestDocument::uniform(4, Size::new(100.0, 200.0));
    viewer.reload(Box::new(shorter)).unwrap();

    assert_eq!(viewer.page_count(), 4);
    assert!(viewer.current_page() < 4);
    // Reloading starts a fresh history
    assert!(!viewer.jump_to_previous_destination());
}
