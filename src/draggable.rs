//! A reusable drag-gesture state machine. It is fed raw pointer events for
//! a host region, tracks one drag at a time, converts pointer positions
//! into normalized [0, 1] values along the horizontal axis of the host and
//! reports each phase of the gesture through a caller-supplied callback
//! bundle.
//!
//! The manager itself knows nothing about what is being dragged. Consumers
//! construct one per gesture kind (see `viewing_layer`) and interpret the
//! normalized values themselves.

use std::cell::Cell;

/// Horizontal extent of the host region, captured once when a gesture
/// starts and cached until the gesture ends. The cache is deliberately not
/// refreshed mid-drag: remapping against a moving rectangle would corrupt
/// the values already reported for this gesture.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragBounds {
    pub client_x_left: f32,
    pub width: f32,
}

impl DragBounds {
    /// Remap a pointer x position into [0, 1] relative to these bounds.
    /// Positions outside the host clamp to the nearest edge. A degenerate
    /// zero-width host maps everything to 0.
    pub fn map_to_value(&self, client_x: f32) -> f64 {
        if self.width <= 0.0 {
            return 0.0;
        }
        ((client_x as f64 - self.client_x_left as f64) / self.width as f64).clamp(0.0, 1.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DragPhase {
    Idle,
    /// Pointer is down on the host but has not moved yet.
    Armed,
    Dragging,
}

/// What the manager passes to every callback: the normalized position, the
/// raw pointer x, and the manager itself so a callback can call
/// [DraggableManager::reset_bounds].
pub struct DragUpdate<'a, T> {
    pub value: f64,
    pub client_x: f32,
    pub manager: &'a DraggableManager<T>,
}

pub type DragCallback<T> = fn(&mut T, &DragUpdate<'_, T>);

/// Optional callbacks for each phase. A missing callback is simply not
/// invoked.
pub struct DragCallbacks<T> {
    /// Pointer moved over the host while no gesture is active.
    pub on_mouse_move: Option<DragCallback<T>>,
    /// Pointer left the host while no gesture is active.
    pub on_mouse_leave: Option<DragCallback<T>>,
    pub on_drag_start: Option<DragCallback<T>>,
    pub on_drag_move: Option<DragCallback<T>>,
    pub on_drag_end: Option<DragCallback<T>>,
}

impl<T> Default for DragCallbacks<T> {
    fn default() -> Self {
        DragCallbacks {
            on_mouse_move: None,
            on_mouse_leave: None,
            on_drag_start: None,
            on_drag_move: None,
            on_drag_end: None,
        }
    }
}

/// The gesture controller. Stateless between gestures apart from the cached
/// bounds; all mutable state lives in `Cell`s so every handler takes
/// `&self` and callbacks can hold a manager reference while their target is
/// borrowed mutably.
pub struct DraggableManager<T> {
    get_bounds: fn(&T) -> Option<DragBounds>,
    callbacks: DragCallbacks<T>,
    phase: Cell<DragPhase>,
    bounds: Cell<Option<DragBounds>>,
}

impl<T> DraggableManager<T> {
    /// `get_bounds` resolves the host region's rectangle from the callback
    /// target. Returning `None` while a gesture needs bounds means the
    /// owner wired the manager to nothing, which panics rather than
    /// silently producing garbage values.
    pub fn new(get_bounds: fn(&T) -> Option<DragBounds>, callbacks: DragCallbacks<T>) -> Self {
        DraggableManager {
            get_bounds,
            callbacks,
            phase: Cell::new(DragPhase::Idle),
            bounds: Cell::new(None),
        }
    }

    /// Drop the cached bounds so the next access recomputes them. Called
    /// between gestures, typically from a drag-end callback, because the
    /// gesture's own result may have moved the host region.
    pub fn reset_bounds(&self) {
        self.bounds.set(None);
    }

    /// True from pointer-down until the matching pointer-up. While active,
    /// pointer events must keep being routed here even if the pointer
    /// leaves the host region.
    pub fn is_gesture_active(&self) -> bool {
        self.phase.get() != DragPhase::Idle
    }

    pub fn is_dragging(&self) -> bool {
        self.phase.get() == DragPhase::Dragging
    }

    /// Pointer pressed on the host: arm a gesture and capture fresh bounds.
    /// No callback fires until the pointer actually moves.
    pub fn handle_pointer_down(&self, target: &mut T, _client_x: f32) {
        self.bounds.set(None);
        self.current_bounds(target);
        self.phase.set(DragPhase::Armed);
    }

    pub fn handle_pointer_move(&self, target: &mut T, client_x: f32) {
        let value = self.current_bounds(target).map_to_value(client_x);
        match self.phase.get() {
            DragPhase::Idle => self.dispatch(self.callbacks.on_mouse_move, target, value, client_x),
            DragPhase::Armed => {
                self.phase.set(DragPhase::Dragging);
                self.dispatch(self.callbacks.on_drag_start, target, value, client_x);
            }
            DragPhase::Dragging => {
                self.dispatch(self.callbacks.on_drag_move, target, value, client_x)
            }
        }
    }

    /// Pointer left the host region. Only meaningful while idle (hover
    /// cleanup); during an active gesture the pointer is free to leave and
    /// come back, the drag keeps tracking.
    pub fn handle_pointer_leave(&self, target: &mut T, client_x: f32) {
        if self.phase.get() != DragPhase::Idle {
            return;
        }
        let value = self.current_bounds(target).map_to_value(client_x);
        self.dispatch(self.callbacks.on_mouse_leave, target, value, client_x);
    }

    /// Pointer released anywhere. Ends a drag with `on_drag_end`; a press
    /// that never moved is a click and ends silently.
    pub fn handle_pointer_up(&self, target: &mut T, client_x: f32) {
        match self.phase.get() {
            DragPhase::Idle => {}
            DragPhase::Armed => self.phase.set(DragPhase::Idle),
            DragPhase::Dragging => {
                let value = self.current_bounds(target).map_to_value(client_x);
                self.phase.set(DragPhase::Idle);
                self.dispatch(self.callbacks.on_drag_end, target, value, client_x);
            }
        }
    }

    fn current_bounds(&self, target: &T) -> DragBounds {
        if let Some(bounds) = self.bounds.get() {
            return bounds;
        }
        let bounds = (self.get_bounds)(target)
            .expect("draggable manager is not wired to a host region (bounds unavailable)");
        self.bounds.set(Some(bounds));
        bounds
    }

    fn dispatch(
        &self,
        callback: Option<DragCallback<T>>,
        target: &mut T,
        value: f64,
        client_x: f32,
    ) {
        if let Some(callback) = callback {
            callback(
                target,
                &DragUpdate {
                    value,
                    client_x,
                    manager: self,
                },
            );
        }
    }
}
