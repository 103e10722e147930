pub mod colors;
pub mod draggable;
pub mod persistent;
pub mod scroll_manager;
pub mod search;
pub mod task_timer;
pub mod trace_loader;
pub mod types;
pub mod view_range;
pub mod viewing_layer;

pub use draggable::{DragBounds, DragCallbacks, DragUpdate, DraggableManager};
pub use types::{Node, Span, TimePoint};
pub use view_range::{ViewRangeTime, ViewRangeTimeUpdate};
