//! State describing which part of a trace the timeline viewer shows, plus
//! the transient per-gesture fields the viewing layer asks the owner to set
//! while a drag is in flight.

/// Which sub-range of the trace is displayed, as fractions of the whole
/// trace duration. `current[0] <= current[1]`, both within [0, 1].
///
/// At most one of the transient fields (`cursor`, `shift_start`,
/// `shift_end`, `reframe`) is meaningful at a time; whichever is present
/// selects the overlay the viewing layer draws. The owner applies updates
/// merge-style and clears all transient fields when a gesture commits.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewRangeTime {
    pub current: [f64; 2],
    pub cursor: Option<f64>,
    pub shift_start: Option<f64>,
    pub shift_end: Option<f64>,
    pub reframe: Option<ReframeState>,
}

/// Live state of a click-drag range selection. `anchor` is fixed where the
/// drag started, `shift` follows the pointer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReframeState {
    pub anchor: f64,
    pub shift: f64,
}

/// A partial update to [ViewRangeTime], produced by the viewing layer many
/// times per gesture. Applying one sets a single field and leaves the rest,
/// mirroring how the drag callbacks report only the value they track.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ViewRangeTimeUpdate {
    Cursor(Option<f64>),
    ShiftStart(f64),
    ShiftEnd(f64),
    Reframe { anchor: f64, shift: f64 },
}

impl Default for ViewRangeTime {
    fn default() -> Self {
        ViewRangeTime {
            current: [0.0, 1.0],
            cursor: None,
            shift_start: None,
            shift_end: None,
            reframe: None,
        }
    }
}

impl ViewRangeTime {
    /// Map a normalized [0, 1] position within the host region onto the
    /// currently visible sub-range.
    pub fn map_from_view(&self, value: f64) -> f64 {
        let [view_start, view_end] = self.current;
        view_start + value * (view_end - view_start)
    }

    /// Merge a partial update into this state. Only the field the update
    /// names changes; overlapping leftovers are resolved at render time,
    /// not here.
    pub fn apply_update(&mut self, update: ViewRangeTimeUpdate) {
        match update {
            ViewRangeTimeUpdate::Cursor(cursor) => self.cursor = cursor,
            ViewRangeTimeUpdate::ShiftStart(value) => self.shift_start = Some(value),
            ViewRangeTimeUpdate::ShiftEnd(value) => self.shift_end = Some(value),
            ViewRangeTimeUpdate::Reframe { anchor, shift } => {
                self.reframe = Some(ReframeState { anchor, shift })
            }
        }
    }

    /// Commit a completed gesture. The viewing layer hands the pair over
    /// unordered (a reversed drag arrives reversed); ordering and clamping
    /// happen here, and every transient field is cleared.
    pub fn commit(&mut self, start: f64, end: f64) {
        let (start, end) = if start <= end { (start, end) } else { (end, start) };
        self.current = [start.clamp(0.0, 1.0), end.clamp(0.0, 1.0)];
        self.clear_transient();
    }

    pub fn clear_transient(&mut self) {
        self.cursor = None;
        self.shift_start = None;
        self.shift_end = None;
        self.reframe = None;
    }

    /// True while some drag gesture is being reported through the transient
    /// fields (the hover cursor does not count).
    pub fn is_drag_pending(&self) -> bool {
        self.shift_start.is_some() || self.shift_end.is_some() || self.reframe.is_some()
    }
}
