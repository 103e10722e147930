//! Keyboard-driven scrolling among the timeline's span rows: page up/down
//! and jump-to-next/previous visible span. "Visible" means the span
//! overlaps the current view range, matches the active search (when one is
//! set) and is not hidden underneath a collapsed ancestor.
//!
//! The manager is decoupled from egui through two seams: a [Scroller] it
//! pushes scroll requests into, and [ScrollAccessors] describing the
//! current viewport, configured by the owner each frame.

use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use crate::types::{Span, SpanId, SpanRow, TimePoint};

/// Receiver for scroll requests, in scroll-area points.
pub trait Scroller {
    fn scroll_to(&mut self, y: f32);
    fn scroll_by(&mut self, dy: f32);
}

/// Vertical placement of one row within the scroll area.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RowPosition {
    pub y: f32,
    pub height: f32,
}

/// Viewport state the scrolling decisions need. Configured per frame via
/// [ScrollManager::set_accessors]; scrolling before that is a wiring bug
/// and panics.
pub trait ScrollAccessors {
    /// Currently visible sub-range of the trace, as fractions.
    fn view_range(&self) -> [f64; 2];
    fn searched_span_ids(&self) -> Option<&HashSet<SpanId>>;
    fn collapsed_span_ids(&self) -> Option<&HashSet<SpanId>>;
    /// Height of the scroll viewport in points.
    fn view_height(&self) -> f32;
    fn top_row_index_visible(&self) -> usize;
    fn bottom_row_index_visible(&self) -> usize;
    fn row_position(&self, index: usize) -> RowPosition;
}

/// Fraction of the viewport height a page scroll covers.
const PAGE_FRACTION: f32 = 0.95;

struct TraceRows {
    rows: Vec<Rc<Span>>,
    parent_by_id: HashMap<SpanId, SpanId>,
    trace_start: TimePoint,
    duration: TimePoint,
}

pub struct ScrollManager<S: Scroller, A: ScrollAccessors> {
    scroller: S,
    trace: Option<TraceRows>,
    accessors: Option<A>,
}

impl<S: Scroller, A: ScrollAccessors> ScrollManager<S, A> {
    pub fn new(scroller: S) -> Self {
        ScrollManager {
            scroller,
            trace: None,
            accessors: None,
        }
    }

    /// Replace the row list the manager navigates. Rows come in display
    /// order (the flattened tree); parent links are rebuilt here so hidden
    /// rows can be detected.
    pub fn set_trace(&mut self, rows: &[SpanRow], trace_start: TimePoint, duration: TimePoint) {
        let parent_by_id = rows
            .iter()
            .filter(|row| !row.span.parent_span_id.is_empty())
            .map(|row| (row.span.span_id.clone(), row.span.parent_span_id.clone()))
            .collect();
        self.trace = Some(TraceRows {
            rows: rows.iter().map(|row| row.span.clone()).collect(),
            parent_by_id,
            trace_start,
            duration,
        });
    }

    pub fn clear_trace(&mut self) {
        self.trace = None;
    }

    pub fn set_accessors(&mut self, accessors: A) {
        self.accessors = Some(accessors);
    }

    pub fn scroll_page_down(&mut self) {
        let dy = PAGE_FRACTION * self.accessors().view_height();
        self.scroller.scroll_by(dy);
    }

    pub fn scroll_page_up(&mut self) {
        let dy = -PAGE_FRACTION * self.accessors().view_height();
        self.scroller.scroll_by(dy);
    }

    pub fn scroll_to_next_visible_span(&mut self) {
        self.scroll_to_visible_span(1);
    }

    pub fn scroll_to_prev_visible_span(&mut self) {
        self.scroll_to_visible_span(-1);
    }

    fn scroll_to_visible_span(&mut self, direction: i64) {
        let accessors = self
            .accessors
            .as_ref()
            .expect("scroll manager accessors are not configured");
        // No trace loaded is a normal runtime condition, not a bug.
        let Some(trace) = &self.trace else {
            return;
        };
        if trace.rows.is_empty() || trace.duration <= 0.0 {
            return;
        }

        let boundary_row = if direction > 0 {
            accessors.bottom_row_index_visible()
        } else {
            accessors.top_row_index_visible()
        };
        // Already showing the first/last row: nothing to jump to.
        if (direction > 0 && boundary_row >= trace.rows.len() - 1)
            || (direction < 0 && boundary_row == 0)
        {
            return;
        }

        let [view_start, view_end] = accessors.view_range();
        let searched = accessors.searched_span_ids();
        let collapsed = accessors.collapsed_span_ids();

        let mut index = boundary_row as i64;
        let found = loop {
            index += direction;
            if index < 0 || index as usize >= trace.rows.len() {
                break None;
            }
            let span = &trace.rows[index as usize];
            if trace.is_span_visible(span, view_start, view_end, searched, collapsed) {
                break Some(index as usize);
            }
        };

        if let Some(index) = found {
            self.scroll_past(index, direction);
        }
    }

    /// Scroll so the given row ends up roughly centered, approaching from
    /// the given direction.
    fn scroll_past(&mut self, row_index: usize, direction: i64) {
        let accessors = self
            .accessors
            .as_ref()
            .expect("scroll manager accessors are not configured");
        let RowPosition { y, height } = accessors.row_position(row_index);
        let half_view = 0.5 * accessors.view_height();
        let to = if direction > 0 {
            y + height - half_view
        } else {
            y - half_view
        };
        self.scroller.scroll_to(to);
    }

    fn accessors(&self) -> &A {
        self.accessors
            .as_ref()
            .expect("scroll manager accessors are not configured")
    }

    /// Access to the scroller, e.g. to drain pending requests in tests.
    pub fn scroller_mut(&mut self) -> &mut S {
        &mut self.scroller
    }
}

impl TraceRows {
    fn is_span_visible(
        &self,
        span: &Rc<Span>,
        view_start: f64,
        view_end: f64,
        searched: Option<&HashSet<SpanId>>,
        collapsed: Option<&HashSet<SpanId>>,
    ) -> bool {
        if let Some(searched) = searched {
            if !searched.contains(&span.span_id) {
                return false;
            }
        }

        // Span must overlap the visible window, in trace fractions.
        let span_start = (span.start_time - self.trace_start) / self.duration;
        let span_end = (span.end_time - self.trace_start) / self.duration;
        if span_end < view_start || span_start > view_end {
            return false;
        }

        // Walk up the parent chain; any collapsed ancestor hides the row.
        if let Some(collapsed) = collapsed {
            let mut current = &span.span_id;
            while let Some(parent_id) = self.parent_by_id.get(current) {
                if collapsed.contains(parent_id) {
                    return false;
                }
                current = parent_id;
            }
        }

        true
    }
}
