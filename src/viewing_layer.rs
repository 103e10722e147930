//! The interactive overlay spanning the visible time axis. Two drag
//! gestures live here:
//!
//! - "reframe": click-drag anywhere in the overlay to select a new
//!   sub-range of the visible window,
//! - "shift": drag one of the edge handles to resize the window from that
//!   side.
//!
//! The layer never mutates the view range itself. Each [draw] call returns
//! the partial updates and the (at most one) commit the gestures produced
//! this frame; the owner applies them.

use eframe::egui::{CursorIcon, Pos2, Rect, Sense, Ui, Vec2};

use crate::colors;
use crate::draggable::{DragBounds, DragCallbacks, DragUpdate, DraggableManager};
use crate::view_range::{ViewRangeTime, ViewRangeTimeUpdate};

/// What a single frame of interaction asked the owner to do.
#[derive(Debug, Default)]
pub struct ViewingLayerResponse {
    /// Partial view-range updates, in the order the gestures produced them.
    pub updates: Vec<ViewRangeTimeUpdate>,
    /// Final range of a gesture that completed this frame, unordered: a
    /// reversed drag arrives reversed. Ordering is the owner's business.
    pub committed: Option<(f64, f64)>,
}

/// Per-frame target for the drag callbacks. Holds a copy of the view-range
/// state the overlay was drawn with, the host rectangle for the bounds
/// provider, and the outputs being collected.
pub struct GestureFrame {
    view: ViewRangeTime,
    host: Option<DragBounds>,
    out: ViewingLayerResponse,
}

impl GestureFrame {
    pub fn new(view: ViewRangeTime, host: Option<DragBounds>) -> Self {
        GestureFrame {
            view,
            host,
            out: ViewingLayerResponse::default(),
        }
    }

    pub fn into_response(self) -> ViewingLayerResponse {
        self.out
    }

    fn push_update(&mut self, update: ViewRangeTimeUpdate) {
        // Mirror the update locally so a drag whose start and end land in
        // the same frame still sees its own anchor.
        self.view.apply_update(update);
        self.out.updates.push(update);
    }
}

fn frame_host(frame: &GestureFrame) -> Option<DragBounds> {
    frame.host
}

pub struct TimelineViewingLayer {
    dragger_reframe: DraggableManager<GestureFrame>,
    dragger_shift_start: DraggableManager<GestureFrame>,
    dragger_shift_end: DraggableManager<GestureFrame>,
    handle_width: f32,
    last_area: Option<Rect>,
    hovered_last_frame: bool,
}

impl Default for TimelineViewingLayer {
    fn default() -> Self {
        TimelineViewingLayer::new()
    }
}

impl TimelineViewingLayer {
    pub fn new() -> Self {
        TimelineViewingLayer {
            dragger_reframe: DraggableManager::new(
                frame_host,
                DragCallbacks {
                    on_mouse_move: Some(handle_reframe_mouse_move),
                    on_mouse_leave: Some(handle_reframe_mouse_leave),
                    on_drag_start: Some(handle_reframe_drag_start),
                    on_drag_move: Some(handle_reframe_drag_move),
                    on_drag_end: Some(handle_reframe_drag_end),
                },
            ),
            dragger_shift_start: DraggableManager::new(
                frame_host,
                DragCallbacks {
                    on_drag_start: Some(handle_shift_start_drag_update),
                    on_drag_move: Some(handle_shift_start_drag_update),
                    on_drag_end: Some(handle_shift_start_drag_end),
                    ..DragCallbacks::default()
                },
            ),
            dragger_shift_end: DraggableManager::new(
                frame_host,
                DragCallbacks {
                    on_drag_start: Some(handle_shift_end_drag_update),
                    on_drag_move: Some(handle_shift_end_drag_update),
                    on_drag_end: Some(handle_shift_end_drag_end),
                    ..DragCallbacks::default()
                },
            ),
            handle_width: 8.0,
            last_area: None,
            hovered_last_frame: false,
        }
    }

    pub fn dragger_reframe(&self) -> &DraggableManager<GestureFrame> {
        &self.dragger_reframe
    }

    pub fn dragger_shift_start(&self) -> &DraggableManager<GestureFrame> {
        &self.dragger_shift_start
    }

    pub fn dragger_shift_end(&self) -> &DraggableManager<GestureFrame> {
        &self.dragger_shift_end
    }

    /// Run one frame of the overlay: route pointer input into the gesture
    /// machines, paint the current overlay state, and return what the
    /// gestures asked for.
    pub fn draw(
        &mut self,
        area: Rect,
        view_range: &ViewRangeTime,
        ui: &mut Ui,
    ) -> ViewingLayerResponse {
        // The host moved or resized since last frame: cached gesture bounds
        // are stale. Only reset between gestures; mid-gesture the cache must
        // stay fixed or the values already reported would be remapped.
        if self.last_area != Some(area) {
            if self.active_manager().is_none() {
                self.dragger_reframe.reset_bounds();
                self.dragger_shift_start.reset_bounds();
                self.dragger_shift_end.reset_bounds();
            }
            self.last_area = Some(area);
        }

        // Transparent interactive region on top of the axis. Claims the
        // area so widgets underneath don't also react to the drag.
        let _overlay = ui.interact(
            area,
            ui.id().with("timeline viewing layer"),
            Sense::click_and_drag(),
        );

        let mut frame = GestureFrame {
            view: *view_range,
            host: Some(DragBounds {
                client_x_left: area.min.x,
                width: area.width(),
            }),
            out: ViewingLayerResponse::default(),
        };

        let (pointer_pos, pointer_moved, pressed, released) = ui.input(|i| {
            (
                i.pointer.latest_pos(),
                i.pointer.delta() != Vec2::ZERO,
                i.pointer.primary_pressed(),
                i.pointer.primary_released(),
            )
        });

        let handle_start_rect = self.shift_handle_rect(area, area.min.x);
        let handle_end_rect = self.shift_handle_rect(area, area.max.x - self.handle_width);
        let hovered = pointer_pos.is_some_and(|pos| area.contains(pos));

        if let Some(pos) = pointer_pos {
            let x = pos.x;
            if let Some(active) = self.active_manager() {
                // An active gesture tracks the pointer wherever it goes;
                // the window-level input stream stands in for the
                // document-level listeners a browser would use.
                if pointer_moved {
                    active.handle_pointer_move(&mut frame, x);
                }
                if released {
                    active.handle_pointer_up(&mut frame, x);
                }
            } else if pressed && hovered {
                if handle_start_rect.contains(pos) {
                    self.dragger_shift_start.handle_pointer_down(&mut frame, x);
                } else if handle_end_rect.contains(pos) {
                    self.dragger_shift_end.handle_pointer_down(&mut frame, x);
                } else {
                    self.dragger_reframe.handle_pointer_down(&mut frame, x);
                }
            } else if hovered {
                if pointer_moved {
                    self.dragger_reframe.handle_pointer_move(&mut frame, x);
                }
            } else if self.hovered_last_frame {
                self.dragger_reframe.handle_pointer_leave(&mut frame, x);
            }

            if self.dragger_shift_start.is_gesture_active()
                || self.dragger_shift_end.is_gesture_active()
                || handle_start_rect.contains(pos)
                || handle_end_rect.contains(pos)
            {
                ui.ctx().set_cursor_icon(CursorIcon::ResizeHorizontal);
            } else if hovered {
                ui.ctx().set_cursor_icon(CursorIcon::Crosshair);
            }
        } else if self.hovered_last_frame {
            // Pointer left the window entirely.
            self.dragger_reframe.handle_pointer_leave(&mut frame, area.min.x);
        }
        self.hovered_last_frame = hovered;

        self.paint(area, handle_start_rect, handle_end_rect, view_range, ui);

        frame.out
    }

    fn shift_handle_rect(&self, area: Rect, left_x: f32) -> Rect {
        Rect::from_min_size(
            Pos2::new(left_x, area.min.y),
            Vec2::new(self.handle_width, area.height()),
        )
    }

    fn active_manager(&self) -> Option<&DraggableManager<GestureFrame>> {
        [
            &self.dragger_reframe,
            &self.dragger_shift_start,
            &self.dragger_shift_end,
        ]
        .into_iter()
        .find(|dragger| dragger.is_gesture_active())
    }

    fn paint(
        &self,
        area: Rect,
        handle_start_rect: Rect,
        handle_end_rect: Rect,
        view: &ViewRangeTime,
        ui: &Ui,
    ) {
        ui.painter()
            .rect_filled(handle_start_rect, 2.0, colors::GRAY_180);
        ui.painter()
            .rect_filled(handle_end_rect, 2.0, colors::GRAY_180);

        if let Some(fraction) = cursor_guide(view) {
            let x = area.min.x + fraction as f32 * area.width();
            ui.painter().rect_filled(
                Rect::from_min_size(Pos2::new(x, area.min.y), Vec2::new(1.0, area.height())),
                0.0,
                colors::CURSOR_GUIDE,
            );
        }

        for visual in drag_visuals(view) {
            let left = area.min.x + visual.layout.left as f32 * area.width();
            let width = visual.layout.width as f32 * area.width();
            let color = match (visual.kind, visual.layout.is_dragging_left) {
                (DragKind::Reframe, true) => colors::reframe_drag_left(),
                (DragKind::Reframe, false) => colors::reframe_drag_right(),
                (DragKind::Shift, true) => colors::shift_drag_left(),
                (DragKind::Shift, false) => colors::shift_drag_right(),
            };
            ui.painter().rect_filled(
                Rect::from_min_size(
                    Pos2::new(left, area.min.y),
                    Vec2::new(width.max(1.0), area.height()),
                ),
                0.0,
                color,
            );
        }
    }
}

// Reframe gesture: the whole overlay is the drag surface.

fn handle_reframe_mouse_move(frame: &mut GestureFrame, update: &DragUpdate<'_, GestureFrame>) {
    let cursor = frame.view.map_from_view(update.value);
    frame.push_update(ViewRangeTimeUpdate::Cursor(Some(cursor)));
}

fn handle_reframe_mouse_leave(frame: &mut GestureFrame, _update: &DragUpdate<'_, GestureFrame>) {
    frame.push_update(ViewRangeTimeUpdate::Cursor(None));
}

fn handle_reframe_drag_start(frame: &mut GestureFrame, update: &DragUpdate<'_, GestureFrame>) {
    let shift = frame.view.map_from_view(update.value);
    frame.push_update(ViewRangeTimeUpdate::Reframe {
        anchor: shift,
        shift,
    });
}

fn handle_reframe_drag_move(frame: &mut GestureFrame, update: &DragUpdate<'_, GestureFrame>) {
    // No anchor means no drag-start reached the owner; leave the range
    // alone rather than inventing one.
    let Some(reframe) = frame.view.reframe else {
        return;
    };
    let shift = frame.view.map_from_view(update.value);
    frame.push_update(ViewRangeTimeUpdate::Reframe {
        anchor: reframe.anchor,
        shift,
    });
}

fn handle_reframe_drag_end(frame: &mut GestureFrame, update: &DragUpdate<'_, GestureFrame>) {
    update.manager.reset_bounds();
    let Some(reframe) = frame.view.reframe else {
        return;
    };
    let shift = frame.view.map_from_view(update.value);
    frame.out.committed = Some((reframe.anchor, shift));
}

// Shift gesture: one callback set per edge handle. Drag-start and drag-move
// report the same thing, the live position of the dragged edge.

fn handle_shift_start_drag_update(frame: &mut GestureFrame, update: &DragUpdate<'_, GestureFrame>) {
    let value = frame.view.map_from_view(update.value);
    frame.push_update(ViewRangeTimeUpdate::ShiftStart(value));
}

fn handle_shift_start_drag_end(frame: &mut GestureFrame, update: &DragUpdate<'_, GestureFrame>) {
    update.manager.reset_bounds();
    if frame.view.shift_start.is_none() {
        return;
    }
    let value = frame.view.map_from_view(update.value);
    frame.out.committed = Some((value, frame.view.current[1]));
}

fn handle_shift_end_drag_update(frame: &mut GestureFrame, update: &DragUpdate<'_, GestureFrame>) {
    let value = frame.view.map_from_view(update.value);
    frame.push_update(ViewRangeTimeUpdate::ShiftEnd(value));
}

fn handle_shift_end_drag_end(frame: &mut GestureFrame, update: &DragUpdate<'_, GestureFrame>) {
    update.manager.reset_bounds();
    if frame.view.shift_end.is_none() {
        return;
    }
    let value = frame.view.map_from_view(update.value);
    frame.out.committed = Some((frame.view.current[0], value));
}

// Pure overlay-state helpers. Kept free of egui so the rendering policy is
// testable headlessly.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragKind {
    Reframe,
    Shift,
}

/// Placement of a drag highlight within the visible window, as fractions of
/// the overlay width.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GestureLayout {
    /// The dragged edge sits left of its fixed point.
    pub is_dragging_left: bool,
    pub left: f64,
    pub width: f64,
}

/// Layout for a highlight from `from` to `to` (both in trace fractions)
/// within the visible window. `None` when the region lies entirely outside
/// the window or the window is degenerate.
pub fn gesture_layout(current: [f64; 2], from: f64, to: f64) -> Option<GestureLayout> {
    let window = current[1] - current[0];
    if window <= 0.0 {
        return None;
    }
    let from_fraction = (from - current[0]) / window;
    let to_fraction = (to - current[0]) / window;
    let is_dragging_left = to_fraction < from_fraction;
    let (left, right) = if from_fraction <= to_fraction {
        (from_fraction, to_fraction)
    } else {
        (to_fraction, from_fraction)
    };
    if right < 0.0 || left > 1.0 {
        return None;
    }
    let left = left.max(0.0);
    let right = right.min(1.0);
    Some(GestureLayout {
        is_dragging_left,
        left,
        width: right - left,
    })
}

/// Position of the hover cursor guide as a fraction of the overlay width.
/// The guide only renders when the cursor is the sole transient field; any
/// in-flight drag suppresses it.
pub fn cursor_guide(view: &ViewRangeTime) -> Option<f64> {
    if view.is_drag_pending() {
        return None;
    }
    let cursor = view.cursor?;
    let window = view.current[1] - view.current[0];
    if window <= 0.0 {
        return None;
    }
    let fraction = (cursor - view.current[0]) / window;
    (0.0..=1.0).contains(&fraction).then_some(fraction)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragVisual {
    pub kind: DragKind,
    pub layout: GestureLayout,
}

/// The drag highlights to render for the current state. Shift highlights
/// stretch from the edge's committed position to its live dragged position.
pub fn drag_visuals(view: &ViewRangeTime) -> Vec<DragVisual> {
    let mut visuals = Vec::new();
    if let Some(reframe) = view.reframe {
        if let Some(layout) = gesture_layout(view.current, reframe.anchor, reframe.shift) {
            visuals.push(DragVisual {
                kind: DragKind::Reframe,
                layout,
            });
        }
    }
    if let Some(shift_start) = view.shift_start {
        if let Some(layout) = gesture_layout(view.current, view.current[0], shift_start) {
            visuals.push(DragVisual {
                kind: DragKind::Shift,
                layout,
            });
        }
    }
    if let Some(shift_end) = view.shift_end {
        if let Some(layout) = gesture_layout(view.current, view.current[1], shift_end) {
            visuals.push(DragVisual {
                kind: DragKind::Shift,
                layout,
            });
        }
    }
    visuals
}
