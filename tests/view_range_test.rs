use approx::assert_relative_eq;

use tracelens::view_range::{ReframeState, ViewRangeTime, ViewRangeTimeUpdate};

#[test]
fn test_map_from_view_uses_the_visible_sub_range() {
    let view = ViewRangeTime {
        current: [0.25, 0.9],
        ..ViewRangeTime::default()
    };
    assert_eq!(view.map_from_view(0.0), 0.25);
    assert_eq!(view.map_from_view(1.0), 0.9);
    let mid = view.map_from_view(0.5);
    assert_relative_eq!(mid, 0.575, epsilon = 1e-9);
}

#[test]
fn test_apply_update_is_merge_style() {
    let mut view = ViewRangeTime::default();

    view.apply_update(ViewRangeTimeUpdate::Cursor(Some(0.3)));
    assert_eq!(view.cursor, Some(0.3));

    // A reframe patch does not clear the stale cursor; rendering mutual
    // exclusion deals with the overlap.
    view.apply_update(ViewRangeTimeUpdate::Reframe {
        anchor: 0.4,
        shift: 0.6,
    });
    assert_eq!(
        view.reframe,
        Some(ReframeState {
            anchor: 0.4,
            shift: 0.6
        })
    );
    assert_eq!(view.cursor, Some(0.3));

    view.apply_update(ViewRangeTimeUpdate::ShiftStart(0.1));
    view.apply_update(ViewRangeTimeUpdate::ShiftEnd(0.8));
    assert_eq!(view.shift_start, Some(0.1));
    assert_eq!(view.shift_end, Some(0.8));

    view.apply_update(ViewRangeTimeUpdate::Cursor(None));
    assert_eq!(view.cursor, None);
}

#[test]
fn test_commit_sorts_clamps_and_clears() {
    let mut view = ViewRangeTime::default();
    view.apply_update(ViewRangeTimeUpdate::Cursor(Some(0.3)));
    view.apply_update(ViewRangeTimeUpdate::Reframe {
        anchor: 0.7,
        shift: 0.2,
    });

    // A reversed drag arrives reversed; commit normalizes.
    view.commit(0.7, 0.2);
    assert_eq!(view.current, [0.2, 0.7]);
    assert_eq!(view.cursor, None);
    assert_eq!(view.reframe, None);
    assert_eq!(view.shift_start, None);
    assert_eq!(view.shift_end, None);

    view.commit(-0.5, 1.5);
    assert_eq!(view.current, [0.0, 1.0]);
}

#[test]
fn test_is_drag_pending_ignores_the_cursor() {
    let mut view = ViewRangeTime::default();
    assert!(!view.is_drag_pending());

    view.cursor = Some(0.5);
    assert!(!view.is_drag_pending());

    view.shift_start = Some(0.5);
    assert!(view.is_drag_pending());

    view.clear_transient();
    view.reframe = Some(ReframeState {
        anchor: 0.1,
        shift: 0.2,
    });
    assert!(view.is_drag_pending());
}
