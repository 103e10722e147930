use std::collections::HashSet;

use tracelens::scroll_manager::ScrollManager;
use tracelens::types::{SpanId, SpanRow};

use test_helpers::*;

const ROW_HEIGHT: f32 = 2.0;
const TRACE_START: f64 = 1000.0;
const TRACE_DURATION: f64 = 2000.0;

/// Ten spans on one node, all starting at the trace start with a tiny
/// duration, mirroring a trace where everything sits at the left edge.
fn test_rows() -> Vec<SpanRow> {
    let node = create_test_node("test_node");
    (0..10u8)
        .map(|i| SpanRow {
            span: create_test_span(
                "span",
                node.clone(),
                TRACE_START,
                TRACE_START + 1.0,
                &[i],
            ),
            depth: 0,
        })
        .collect()
}

fn test_manager() -> ScrollManager<RecordingScroller, TestAccessors> {
    let mut manager = ScrollManager::new(RecordingScroller::default());
    manager.set_trace(&test_rows(), TRACE_START, TRACE_DURATION);
    manager
}

#[test]
fn test_scroll_page_down_and_up() {
    let mut manager = test_manager();
    let accessors = TestAccessors::new(10, ROW_HEIGHT);
    let view_height = accessors.view_height;
    manager.set_accessors(accessors);

    manager.scroll_page_down();
    manager.scroll_page_up();

    assert_eq!(
        manager.scroller_mut().calls,
        vec![
            ScrollCall::By(0.95 * view_height),
            ScrollCall::By(-0.95 * view_height),
        ]
    );
}

#[test]
fn test_scrolling_down_centers_the_found_row() {
    let mut manager = test_manager();
    let mut accessors = TestAccessors::new(10, ROW_HEIGHT);
    accessors.top_row = 5;
    accessors.bottom_row = 5;
    let view_height = accessors.view_height;
    manager.set_accessors(accessors);

    manager.scroll_to_next_visible_span();

    // Row 6 is the next visible one; approach from above puts its bottom
    // edge half a viewport up.
    let expected = 6.0 * ROW_HEIGHT + ROW_HEIGHT - 0.5 * view_height;
    assert_eq!(manager.scroller_mut().calls, vec![ScrollCall::To(expected)]);
}

#[test]
fn test_scrolling_up_centers_the_found_row() {
    let mut manager = test_manager();
    let mut accessors = TestAccessors::new(10, ROW_HEIGHT);
    accessors.top_row = 5;
    accessors.bottom_row = 5;
    let view_height = accessors.view_height;
    manager.set_accessors(accessors);

    manager.scroll_to_prev_visible_span();

    let expected = 4.0 * ROW_HEIGHT - 0.5 * view_height;
    assert_eq!(manager.scroller_mut().calls, vec![ScrollCall::To(expected)]);
}

#[test]
fn test_does_nothing_at_the_boundaries() {
    let mut manager = test_manager();
    let accessors = TestAccessors::new(10, ROW_HEIGHT);
    // top_row = 0, bottom_row = 9: everything already on screen.
    manager.set_accessors(accessors);

    manager.scroll_to_prev_visible_span();
    manager.scroll_to_next_visible_span();

    assert!(manager.scroller_mut().calls.is_empty());
}

#[test]
fn test_skips_spans_outside_the_view_range() {
    let node = create_test_node("test_node");
    let mut rows = test_rows();
    // Row 4 sits in the middle of the trace; the view range is narrowed to
    // the middle fifth, so it is the only reachable row.
    rows[4] = SpanRow {
        span: create_test_span(
            "centered",
            node,
            TRACE_START + TRACE_DURATION * 0.5,
            TRACE_START + TRACE_DURATION * 0.5 + 1.0,
            &[4],
        ),
        depth: 0,
    };
    let mut manager = ScrollManager::new(RecordingScroller::default());
    manager.set_trace(&rows, TRACE_START, TRACE_DURATION);

    let mut accessors = TestAccessors::new(10, ROW_HEIGHT);
    accessors.view_range = [0.4, 0.6];
    accessors.top_row = 9;
    accessors.bottom_row = 0;
    let view_height = accessors.view_height;
    manager.set_accessors(accessors);

    manager.scroll_to_next_visible_span();
    manager.scroll_to_prev_visible_span();

    assert_eq!(
        manager.scroller_mut().calls,
        vec![
            ScrollCall::To(4.0 * ROW_HEIGHT + ROW_HEIGHT - 0.5 * view_height),
            ScrollCall::To(4.0 * ROW_HEIGHT - 0.5 * view_height),
        ]
    );
}

#[test]
fn test_skips_spans_not_matching_the_search() {
    let mut manager = test_manager();
    let mut accessors = TestAccessors::new(10, ROW_HEIGHT);
    accessors.top_row = 9;
    accessors.bottom_row = 0;
    let mut searched: HashSet<SpanId> = HashSet::new();
    searched.insert(vec![4]);
    accessors.searched = Some(searched);
    let view_height = accessors.view_height;
    manager.set_accessors(accessors);

    manager.scroll_to_next_visible_span();
    manager.scroll_to_prev_visible_span();

    assert_eq!(
        manager.scroller_mut().calls,
        vec![
            ScrollCall::To(4.0 * ROW_HEIGHT + ROW_HEIGHT - 0.5 * view_height),
            ScrollCall::To(4.0 * ROW_HEIGHT - 0.5 * view_height),
        ]
    );
}

#[test]
fn test_skips_spans_hidden_under_a_collapsed_parent() {
    let node = create_test_node("test_node");
    // Rows 0 and 4 are parents; every other row is a child of the nearest
    // parent above it. Both parents are collapsed.
    let mut rows = Vec::new();
    let mut parent_id: Vec<u8> = vec![];
    for i in 0..10u8 {
        let span = match i {
            0 | 4 => {
                let span = create_test_span("parent", node.clone(), TRACE_START, TRACE_START + 1.0, &[i]);
                parent_id = vec![i];
                span
            }
            _ => create_test_span_with_parent(
                "child",
                node.clone(),
                TRACE_START,
                TRACE_START + 1.0,
                &[i],
                &parent_id,
            ),
        };
        rows.push(SpanRow { span, depth: 0 });
    }
    let mut manager = ScrollManager::new(RecordingScroller::default());
    manager.set_trace(&rows, TRACE_START, TRACE_DURATION);

    let mut accessors = TestAccessors::new(10, ROW_HEIGHT);
    accessors.top_row = 9;
    accessors.bottom_row = 0;
    let mut collapsed: HashSet<SpanId> = HashSet::new();
    collapsed.insert(vec![0]);
    collapsed.insert(vec![4]);
    accessors.collapsed = Some(collapsed);
    let view_height = accessors.view_height;
    manager.set_accessors(accessors);

    manager.scroll_to_next_visible_span();
    manager.scroll_to_prev_visible_span();

    // Only row 4 (the second parent) is visible between the boundaries.
    assert_eq!(
        manager.scroller_mut().calls,
        vec![
            ScrollCall::To(4.0 * ROW_HEIGHT + ROW_HEIGHT - 0.5 * view_height),
            ScrollCall::To(4.0 * ROW_HEIGHT - 0.5 * view_height),
        ]
    );
}

#[test]
fn test_no_trace_is_a_silent_no_op() {
    let mut manager: ScrollManager<RecordingScroller, TestAccessors> =
        ScrollManager::new(RecordingScroller::default());
    manager.set_accessors(TestAccessors::new(0, ROW_HEIGHT));

    manager.scroll_to_next_visible_span();
    manager.scroll_to_prev_visible_span();

    assert!(manager.scroller_mut().calls.is_empty());
}

#[test]
fn test_clear_trace_stops_navigation() {
    let mut manager = test_manager();
    let mut accessors = TestAccessors::new(10, ROW_HEIGHT);
    accessors.top_row = 5;
    accessors.bottom_row = 5;
    manager.set_accessors(accessors);
    manager.clear_trace();

    manager.scroll_to_next_visible_span();

    assert!(manager.scroller_mut().calls.is_empty());
}

#[test]
#[should_panic(expected = "accessors are not configured")]
fn test_scrolling_without_accessors_panics() {
    let mut manager = test_manager();
    manager.scroll_to_next_visible_span();
}

#[test]
#[should_panic(expected = "accessors are not configured")]
fn test_page_scroll_without_accessors_panics() {
    let mut manager = test_manager();
    manager.scroll_page_down();
}
