use eframe::egui::Color32;

pub const GRAY_30: Color32 = Color32::from_gray(30);
pub const GRAY_180: Color32 = Color32::from_gray(180);
pub const GRAY_240: Color32 = Color32::from_gray(240);

pub const LIGHT_BLUE: Color32 = Color32::from_rgb(134, 202, 227);
pub const BLUE_DARK_GRAY: Color32 = Color32::from_rgb(60, 60, 70);

pub const DARK_YELLOW: Color32 = Color32::from_rgb(242, 176, 34);
pub const MILD_RED: Color32 = Color32::from_rgb(220, 50, 50);

/// Hover cursor guide over the time axis.
pub const CURSOR_GUIDE: Color32 = Color32::from_gray(200);

// Overlay fills for an active drag. The hue tells the gesture apart, the
// intensity tells the direction (the dragged edge left or right of its
// fixed point).
pub fn reframe_drag_left() -> Color32 {
    Color32::from_rgba_unmultiplied(216, 90, 25, 140)
}

pub fn reframe_drag_right() -> Color32 {
    Color32::from_rgba_unmultiplied(255, 128, 64, 140)
}

pub fn shift_drag_left() -> Color32 {
    Color32::from_rgba_unmultiplied(40, 98, 160, 140)
}

pub fn shift_drag_right() -> Color32 {
    Color32::from_rgba_unmultiplied(64, 145, 225, 140)
}
