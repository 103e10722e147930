use std::cell::Cell;
use std::collections::HashSet;
use std::path::PathBuf;
use std::rc::Rc;

use anyhow::Result;
use eframe::egui::scroll_area::ScrollBarVisibility;
use eframe::egui::{
    self, Align2, Button, Color32, ComboBox, FontId, Key, Label, Modal, PointerButton, Pos2, Rect,
    ScrollArea, Sense, TextEdit, Ui, UiBuilder, Vec2, Widget,
};

use tracelens::{colors, persistent, scroll_manager, search, trace_loader, types, view_range};

use scroll_manager::{RowPosition, ScrollAccessors, ScrollManager, Scroller};
use search::SpanSearch;
use trace_loader::get_min_max_time;
use types::{
    flatten_visible_rows, time_point_to_utc_string, value_to_text, Span, SpanId, SpanRow, TimePoint,
};
use tracelens::viewing_layer::TimelineViewingLayer;
use view_range::ViewRangeTime;

fn main() -> eframe::Result {
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size([1280.0, 800.0]),
        ..Default::default()
    };
    eframe::run_native(
        "tracelens",
        options,
        Box::new(|_cc| Ok(Box::<App>::default())),
    )
}

struct Layout {
    top_bar_height: f32,
    axis_height: f32,
    node_name_width: f32,
    row_height: f32,
    row_indent: f32,
}

struct LoadedTrace {
    roots: Vec<Rc<Span>>,
    /// Every span of the trace, flattened, for search.
    all_spans: Vec<Rc<Span>>,
    /// The rows currently displayed (children of collapsed spans omitted).
    rows: Vec<SpanRow>,
    start_time: TimePoint,
    end_time: TimePoint,
}

impl LoadedTrace {
    fn duration(&self) -> TimePoint {
        self.end_time - self.start_time
    }
}

#[derive(Debug, Clone, Copy)]
enum ScrollRequest {
    To(f32),
    By(f32),
}

/// Scroller that parks the request until the scroll area is drawn on the
/// next frame.
#[derive(Clone, Default)]
struct PendingScroll {
    request: Rc<Cell<Option<ScrollRequest>>>,
}

impl Scroller for PendingScroll {
    fn scroll_to(&mut self, y: f32) {
        self.request.set(Some(ScrollRequest::To(y)));
    }

    fn scroll_by(&mut self, dy: f32) {
        self.request.set(Some(ScrollRequest::By(dy)));
    }
}

/// Per-dispatch viewport snapshot handed to the scroll manager.
struct TimelineAccessors {
    view_range: [f64; 2],
    searched: Option<HashSet<SpanId>>,
    collapsed: Option<HashSet<SpanId>>,
    view_height: f32,
    top_row: usize,
    bottom_row: usize,
    row_height: f32,
}

impl ScrollAccessors for TimelineAccessors {
    fn view_range(&self) -> [f64; 2] {
        self.view_range
    }

    fn searched_span_ids(&self) -> Option<&HashSet<SpanId>> {
        self.searched.as_ref()
    }

    fn collapsed_span_ids(&self) -> Option<&HashSet<SpanId>> {
        self.collapsed.as_ref()
    }

    fn view_height(&self) -> f32 {
        self.view_height
    }

    fn top_row_index_visible(&self) -> usize {
        self.top_row
    }

    fn bottom_row_index_visible(&self) -> usize {
        self.bottom_row
    }

    fn row_position(&self, index: usize) -> RowPosition {
        RowPosition {
            y: index as f32 * self.row_height,
            height: self.row_height,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NavAction {
    NextResult,
    PrevResult,
    PageDown,
    PageUp,
}

struct App {
    layout: Layout,
    view_range: ViewRangeTime,
    trace: Option<LoadedTrace>,
    viewing_layer: TimelineViewingLayer,
    scroll_manager: ScrollManager<PendingScroll, TimelineAccessors>,
    pending_scroll: PendingScroll,
    last_scroll_offset: f32,
    pending_nav: Option<NavAction>,
    search: SpanSearch,
    search_match_count: usize,
    search_error: Option<String>,
    recent_searches: Vec<String>,
    clicked_span: Option<Rc<Span>>,
}

impl Default for App {
    fn default() -> Self {
        let pending_scroll = PendingScroll::default();
        let mut res = Self {
            layout: Layout {
                top_bar_height: 30.0,
                axis_height: 50.0,
                node_name_width: 250.0,
                row_height: 22.0,
                row_indent: 14.0,
            },
            view_range: ViewRangeTime::default(),
            trace: None,
            viewing_layer: TimelineViewingLayer::new(),
            scroll_manager: ScrollManager::new(pending_scroll.clone()),
            pending_scroll,
            last_scroll_offset: 0.0,
            pending_nav: None,
            search: SpanSearch::default(),
            search_match_count: 0,
            search_error: None,
            recent_searches: Vec::new(),
            clicked_span: None,
        };

        match persistent::load_persistent_data() {
            Ok(recent) => res.recent_searches = recent,
            Err(e) => println!("Error loading persistent data: {e}"),
        }

        // If a file path is provided as the first argument, try to load it.
        if let Some(first_arg) = std::env::args().nth(1) {
            println!("Trying to open file: {first_arg}");
            if let Err(err) = res.load_file(&PathBuf::from(first_arg)) {
                println!("Error loading file: {err}");
            }
        }

        res
    }
}

impl eframe::App for App {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        egui::CentralPanel::default()
            .frame(eframe::egui::Frame::new())
            .show(ctx, |ui| {
                let window_width = ui.max_rect().width();
                let window_height = ui.max_rect().height();

                self.draw_top_bar(ui);

                let axis_area = Rect::from_min_size(
                    Pos2::new(
                        self.layout.node_name_width,
                        self.layout.top_bar_height,
                    ),
                    Vec2::new(
                        window_width - self.layout.node_name_width,
                        self.layout.axis_height,
                    ),
                );
                self.draw_time_axis(axis_area, ui);
                let layer_response = self.viewing_layer.draw(axis_area, &self.view_range, ui);
                for update in layer_response.updates {
                    self.view_range.apply_update(update);
                }
                if let Some((start, end)) = layer_response.committed {
                    self.view_range.commit(start, end);
                }

                let spans_area = Rect::from_min_size(
                    Pos2::new(0.0, self.layout.top_bar_height + self.layout.axis_height),
                    Vec2::new(
                        window_width,
                        window_height - self.layout.top_bar_height - self.layout.axis_height,
                    ),
                );
                self.draw_spans(spans_area, ui);

                self.handle_nav_keys(ctx);
                self.draw_clicked_span(ctx, window_width - 200.0, window_height - 200.0);

                // If Ctrl+Q clicked, quit the app
                if ctx.input(|i| i.key_down(Key::Q) && i.modifiers.ctrl) {
                    std::process::exit(0);
                }
            });
    }
}

impl App {
    fn draw_top_bar(&mut self, ui: &mut Ui) {
        ui.horizontal(|ui| {
            let open_file_button = ui.button("Open file");
            if open_file_button.clicked() {
                if let Some(path) = rfd::FileDialog::new().pick_file() {
                    println!("Loading file: {path:?}...");
                    match self.load_file(&path) {
                        Ok(()) => println!("Successfully loaded file."),
                        Err(e) => println!("Error loading file: {e}"),
                    }
                }
            }

            let search_box = TextEdit::singleline(&mut self.search.query)
                .hint_text("search spans (regex)")
                .desired_width(240.0)
                .ui(ui);
            let search_submitted =
                search_box.lost_focus() && ui.input(|i| i.key_pressed(Key::Enter));
            if ui.button("Search").clicked() || search_submitted {
                self.run_search();
            }

            let mut selected_recent: Option<String> = None;
            ComboBox::new("recent searches", "")
                .selected_text("Recent")
                .width(70.0)
                .show_ui(ui, |ui| {
                    for recent in &self.recent_searches {
                        if ui.selectable_label(false, recent).clicked() {
                            selected_recent = Some(recent.clone());
                        }
                    }
                });
            if let Some(query) = selected_recent {
                self.search.query = query;
                self.run_search();
            }

            if let Some(error) = &self.search_error {
                ui.colored_label(colors::MILD_RED, error);
            } else if self.search.active {
                ui.label(format!("{} matches", self.search_match_count));
                if ui.button("Prev").clicked() {
                    self.pending_nav = Some(NavAction::PrevResult);
                }
                if ui.button("Next").clicked() {
                    self.pending_nav = Some(NavAction::NextResult);
                }
                if ui.button("Clear").clicked() {
                    self.search.clear();
                    self.search_match_count = 0;
                }
            }

            ui.separator();
            if ui.button("Reset view").clicked() {
                self.view_range.commit(0.0, 1.0);
            }
            let [view_start, view_end] = self.view_range.current;
            ui.label(format!(
                "view: {:.1}% - {:.1}%",
                view_start * 100.0,
                view_end * 100.0
            ));
        });
    }

    fn run_search(&mut self) {
        let Some(trace) = &self.trace else {
            return;
        };
        match self.search.run(&trace.all_spans) {
            Ok(count) => {
                self.search_match_count = count;
                self.search_error = None;
                persistent::remember_search(&mut self.recent_searches, &self.search.query);
                if let Err(e) = persistent::save_persistent_data(&self.recent_searches) {
                    println!("Error saving persistent data: {e}");
                }
            }
            Err(e) => self.search_error = Some(format!("{e}")),
        }
    }

    fn load_file(&mut self, path: &PathBuf) -> Result<()> {
        let roots = trace_loader::load_trace_file(path)?;
        let (min_time, max_time) = get_min_max_time(&roots)
            .ok_or_else(|| anyhow::anyhow!("trace file contains no spans"))?;

        let mut all_spans = Vec::new();
        for root in &roots {
            collect_spans(root, &mut all_spans);
        }
        let rows = flatten_visible_rows(&roots);

        self.view_range = ViewRangeTime::default();
        self.search.clear();
        self.search_match_count = 0;
        self.search_error = None;
        self.clicked_span = None;
        self.last_scroll_offset = 0.0;
        self.scroll_manager
            .set_trace(&rows, min_time, max_time - min_time);

        self.trace = Some(LoadedTrace {
            roots,
            all_spans,
            rows,
            start_time: min_time,
            end_time: max_time,
        });
        Ok(())
    }

    /// Rebuild the row list after a collapse toggle.
    fn rebuild_rows(&mut self) {
        let Some(trace) = &mut self.trace else {
            return;
        };
        trace.rows = flatten_visible_rows(&trace.roots);
        self.scroll_manager
            .set_trace(&trace.rows, trace.start_time, trace.duration());
    }

    /// Absolute time window currently displayed, per the normalized view
    /// range.
    fn visible_time_window(&self, trace: &LoadedTrace) -> (TimePoint, TimePoint) {
        let [view_start, view_end] = self.view_range.current;
        (
            trace.start_time + view_start * trace.duration(),
            trace.start_time + view_end * trace.duration(),
        )
    }

    fn draw_time_axis(&self, area: Rect, ui: &mut Ui) {
        ui.painter().rect_filled(area, 0.0, colors::BLUE_DARK_GRAY);
        let Some(trace) = &self.trace else {
            return;
        };
        let (visible_start, visible_end) = self.visible_time_window(trace);

        let mut cur_pos = area.min.x;
        while cur_pos < area.max.x {
            let cur_time = screen_to_time(cur_pos, area.min.x, area.max.x, visible_start, visible_end);
            ui.painter().rect_filled(
                Rect::from_min_size(Pos2::new(cur_pos, area.min.y), Vec2::new(2.0, 12.0)),
                0.0,
                colors::GRAY_240,
            );
            let text_rect = ui.painter().text(
                Pos2::new(cur_pos + 4.0, area.min.y),
                Align2::LEFT_TOP,
                time_point_to_utc_string(cur_time),
                FontId::default(),
                colors::GRAY_240,
            );
            ui.painter().text(
                Pos2::new(text_rect.min.x, text_rect.max.y + 4.0),
                Align2::LEFT_TOP,
                format!("{:.3} s", cur_time - trace.start_time),
                FontId::default(),
                colors::GRAY_180,
            );
            cur_pos += text_rect.width() + 50.0;
        }
    }

    fn draw_spans(&mut self, area: Rect, ui: &mut Ui) {
        ui.painter().rect_filled(area, 0.0, colors::GRAY_30);
        let Some(trace) = &self.trace else {
            ui.put(
                Rect::from_center_size(area.center(), Vec2::new(300.0, 60.0)),
                Label::new("No spans to display.\nOpen a trace file."),
            );
            return;
        };

        let (visible_start, visible_end) = self.visible_time_window(trace);
        let bars_min_x = area.min.x + self.layout.node_name_width;
        let bars_max_x = area.max.x;
        let row_height = self.layout.row_height;
        let rows = trace.rows.clone();
        let search = &self.search;
        let layout = &self.layout;

        // Dragging the background with RMB pans the visible window.
        let background_response = ui.interact(
            area,
            ui.id().with("spans background"),
            Sense::drag(),
        );
        let mut pan_fraction: Option<f64> = None;
        if background_response.dragged_by(PointerButton::Secondary) {
            let dx = background_response.drag_delta().x;
            if dx != 0.0 && bars_max_x > bars_min_x {
                pan_fraction = Some(-dx as f64 / (bars_max_x - bars_min_x) as f64);
            }
        }

        let mut clicked_row: Option<usize> = None;
        let mut toggled_row: Option<usize> = None;
        let mut viewport_height = area.height();
        let mut top_row = 0usize;
        let mut bottom_row = rows.len().saturating_sub(1);

        let mut scroll_area = ScrollArea::vertical()
            .auto_shrink(false)
            .animated(false)
            .scroll_bar_visibility(ScrollBarVisibility::AlwaysVisible);
        if let Some(request) = self.pending_scroll.request.take() {
            let offset = match request {
                ScrollRequest::To(y) => y,
                ScrollRequest::By(dy) => self.last_scroll_offset + dy,
            };
            scroll_area = scroll_area.vertical_scroll_offset(offset.max(0.0));
        }

        let output = ui
            .allocate_new_ui(UiBuilder::new().max_rect(area), |ui| {
                scroll_area.show_viewport(ui, |ui, viewport| {
                    let total_height = rows.len() as f32 * row_height;
                    ui.set_height(total_height);
                    ui.set_width(area.width());

                    viewport_height = viewport.height();
                    top_row = (viewport.min.y / row_height).floor().max(0.0) as usize;
                    bottom_row = ((viewport.max.y / row_height).ceil() as usize)
                        .min(rows.len())
                        .saturating_sub(1);

                    let content_top = ui.min_rect().top();
                    let first = top_row.min(rows.len());
                    let last = (bottom_row + 1).min(rows.len());
                    for (i, row) in rows.iter().enumerate().take(last).skip(first) {
                        let row_top = content_top + i as f32 * row_height;
                        let span = &row.span;

                        // Name cell, indented by tree depth, with a
                        // collapse marker for spans that have children.
                        let has_children = !span.children.borrow().is_empty();
                        let marker = if !has_children {
                            " "
                        } else if span.collapse_children.get() {
                            "▸"
                        } else {
                            "▾"
                        };
                        let name_rect = Rect::from_min_size(
                            Pos2::new(area.min.x, row_top),
                            Vec2::new(layout.node_name_width, row_height),
                        );
                        ui.painter().with_clip_rect(name_rect).text(
                            Pos2::new(
                                area.min.x + 4.0 + row.depth as f32 * layout.row_indent,
                                row_top + row_height / 2.0,
                            ),
                            Align2::LEFT_CENTER,
                            format!("{marker} {}", span.name),
                            FontId::default(),
                            colors::GRAY_240,
                        );

                        // Span bar, clipped to the visible window.
                        let bar_start = time_to_screen(
                            span.start_time,
                            bars_min_x,
                            bars_max_x,
                            visible_start,
                            visible_end,
                        );
                        let bar_end = time_to_screen(
                            span.end_time,
                            bars_min_x,
                            bars_max_x,
                            visible_start,
                            visible_end,
                        );
                        if bar_end >= bars_min_x && bar_start <= bars_max_x {
                            let bar_rect = Rect::from_min_max(
                                Pos2::new(bar_start.max(bars_min_x), row_top + 3.0),
                                Pos2::new(bar_end.min(bars_max_x), row_top + row_height - 3.0),
                            );
                            let is_match = search.is_match(&span.span_id);
                            let color = if is_match {
                                colors::DARK_YELLOW
                            } else {
                                colors::LIGHT_BLUE
                            };
                            ui.painter().rect_filled(bar_rect, 2.0, color);
                        }

                        let row_rect = Rect::from_min_size(
                            Pos2::new(area.min.x, row_top),
                            Vec2::new(area.width(), row_height),
                        );
                        let row_response =
                            ui.interact(row_rect, ui.id().with(("span row", i)), Sense::click());
                        if row_response.clicked() {
                            if has_children && name_rect.contains(
                                row_response.interact_pointer_pos().unwrap_or(name_rect.min),
                            ) {
                                toggled_row = Some(i);
                            } else {
                                clicked_row = Some(i);
                            }
                        }
                    }
                })
            })
            .inner;
        self.last_scroll_offset = output.state.offset.y;

        if let Some(i) = toggled_row {
            let span = &rows[i].span;
            span.collapse_children.set(!span.collapse_children.get());
            self.rebuild_rows();
        } else if let Some(i) = clicked_row {
            self.clicked_span = Some(rows[i].span.clone());
        }

        if let Some(delta) = pan_fraction {
            self.pan_view(delta);
        }

        // Scroll requests need the viewport geometry, so they are serviced
        // here rather than where the key/button was seen.
        if let Some(action) = self.pending_nav.take() {
            let collapsed: HashSet<SpanId> = rows
                .iter()
                .filter(|row| row.span.collapse_children.get())
                .map(|row| row.span.span_id.clone())
                .collect();
            self.scroll_manager.set_accessors(TimelineAccessors {
                view_range: self.view_range.current,
                searched: self
                    .search
                    .active
                    .then(|| self.search.matching_span_ids.clone()),
                collapsed: (!collapsed.is_empty()).then_some(collapsed),
                view_height: viewport_height,
                top_row,
                bottom_row,
                row_height,
            });
            match action {
                NavAction::NextResult => self.scroll_manager.scroll_to_next_visible_span(),
                NavAction::PrevResult => self.scroll_manager.scroll_to_prev_visible_span(),
                NavAction::PageDown => self.scroll_manager.scroll_page_down(),
                NavAction::PageUp => self.scroll_manager.scroll_page_up(),
            }
            ui.ctx().request_repaint();
        }
    }

    /// Shift the visible window sideways by a fraction of its own width,
    /// clamped to the trace.
    fn pan_view(&mut self, delta: f64) {
        let [view_start, view_end] = self.view_range.current;
        let width = view_end - view_start;
        let shift = (delta * width)
            .clamp(-view_start, 1.0 - view_end);
        self.view_range
            .commit(view_start + shift, view_end + shift);
    }

    fn handle_nav_keys(&mut self, ctx: &egui::Context) {
        // Don't steal keys from the search box.
        if self.trace.is_none() || ctx.wants_keyboard_input() {
            return;
        }
        ctx.input(|i| {
            if i.key_pressed(Key::S) {
                self.pending_nav = Some(NavAction::PageDown);
            }
            if i.key_pressed(Key::W) {
                self.pending_nav = Some(NavAction::PageUp);
            }
            if i.key_pressed(Key::F) {
                self.pending_nav = Some(NavAction::NextResult);
            }
            if i.key_pressed(Key::B) {
                self.pending_nav = Some(NavAction::PrevResult);
            }
        });
    }

    fn draw_clicked_span(&mut self, ctx: &egui::Context, max_width: f32, max_height: f32) {
        let Some(span) = self.clicked_span.clone() else {
            return;
        };
        let mut close = false;
        Modal::new("clicked span".into()).show(ctx, |ui| {
            ui.set_max_width(max_width);
            ui.set_max_height(max_height);
            ui.heading(&span.name);
            ui.label(format!("node: {}", span.node.name));
            ui.label(format!(
                "span id: {:x?}, trace id: {:x?}",
                span.span_id, span.trace_id
            ));
            ui.label(format!(
                "start: {}\nend: {}\nduration: {:.3} ms",
                time_point_to_utc_string(span.start_time),
                time_point_to_utc_string(span.end_time),
                (span.end_time - span.start_time) * 1000.0,
            ));
            ui.separator();
            ScrollArea::vertical().max_height(max_height - 200.0).show(ui, |ui| {
                for (key, value) in &span.attributes {
                    ui.label(format!("{key} = {}", value_to_text(value)));
                }
                if !span.events.is_empty() {
                    ui.separator();
                    for event in &span.events {
                        ui.label(format!(
                            "event {} at {}",
                            event.name,
                            time_point_to_utc_string(event.time)
                        ));
                    }
                }
            });
            if Button::new("Close").fill(Color32::DARK_GRAY).ui(ui).clicked() {
                close = true;
            }
        });
        if close {
            self.clicked_span = None;
        }
    }
}

fn collect_spans(span: &Rc<Span>, collected: &mut Vec<Rc<Span>>) {
    collected.push(span.clone());
    for child in span.children.borrow().iter() {
        collect_spans(child, collected);
    }
}

fn screen_to_time(
    screen_x: f32,
    start_x: f32,
    end_x: f32,
    start_time: TimePoint,
    end_time: TimePoint,
) -> TimePoint {
    start_time + ((screen_x - start_x) / (end_x - start_x)) as f64 * (end_time - start_time)
}

fn time_to_screen(
    time: TimePoint,
    start_x: f32,
    end_x: f32,
    start_time: TimePoint,
    end_time: TimePoint,
) -> f32 {
    start_x + ((time - start_time) / (end_time - start_time)) as f32 * (end_x - start_x)
}
