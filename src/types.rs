use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;

use opentelemetry_proto::tonic::common::v1::any_value::Value;

/// Seconds since epoch.
pub type TimePoint = f64;

pub fn time_point_from_unix_nano(unix_nano: u64) -> TimePoint {
    unix_nano as f64 / 1_000_000_000.0
}

pub fn time_point_to_utc_string(time: TimePoint) -> String {
    let date_time = chrono::DateTime::from_timestamp_nanos((time * 1e9) as i64);
    date_time.format("%Y-%m-%d %H:%M:%S%.3f").to_string()
}

pub type SpanId = Vec<u8>;

#[derive(Debug, Clone)]
pub struct Span {
    pub name: String,
    pub span_id: SpanId,
    pub trace_id: Vec<u8>,
    pub parent_span_id: SpanId,
    pub start_time: TimePoint,
    pub end_time: TimePoint,
    pub attributes: BTreeMap<String, Option<Value>>,
    pub events: Vec<Event>,
    pub node: Rc<Node>,

    pub children: RefCell<Vec<Rc<Span>>>,
    /// Earliest start time in this span's subtree, including the span itself.
    pub min_start_time: Cell<TimePoint>,
    /// Latest end time in this span's subtree, including the span itself.
    pub max_end_time: Cell<TimePoint>,

    pub collapse_children: Cell<bool>,
}

#[derive(Debug, Clone)]
pub struct Event {
    pub name: String,
    pub time: TimePoint,
    pub attributes: BTreeMap<String, Option<Value>>,
}

/// The process/service a span was emitted by.
#[derive(Debug, Clone)]
pub struct Node {
    pub name: String,
    pub attributes: BTreeMap<String, Option<Value>>,
}

/// One horizontal strip of the timeline: a span together with its depth in
/// the span tree (used for indentation).
#[derive(Debug, Clone)]
pub struct SpanRow {
    pub span: Rc<Span>,
    pub depth: usize,
}

/// Flatten span trees into the list of rows the timeline displays, in DFS
/// order. Children of a collapsed span are omitted.
pub fn flatten_visible_rows(roots: &[Rc<Span>]) -> Vec<SpanRow> {
    let mut rows = Vec::new();
    for root in roots {
        flatten_visible_rows_rek(root, 0, &mut rows);
    }
    rows
}

fn flatten_visible_rows_rek(span: &Rc<Span>, depth: usize, rows: &mut Vec<SpanRow>) {
    rows.push(SpanRow {
        span: span.clone(),
        depth,
    });
    if span.collapse_children.get() {
        return;
    }
    for child in span.children.borrow().iter() {
        flatten_visible_rows_rek(child, depth + 1, rows);
    }
}

pub fn value_to_text(value_opt: &Option<Value>) -> String {
    let Some(value) = value_opt else {
        return "empty".to_string();
    };

    match value {
        Value::StringValue(s) => s.clone(),
        Value::BoolValue(b) => b.to_string(),
        Value::IntValue(i) => i.to_string(),
        Value::DoubleValue(d) => d.to_string(),
        Value::ArrayValue(a) => format!(
            "[{}]",
            a.values
                .iter()
                .map(|v| value_to_text(&v.value))
                .collect::<Vec<_>>()
                .join(", ")
        ),
        Value::KvlistValue(kv) => format!(
            "{{{}}}",
            kv.values
                .iter()
                .map(|v| format!(
                    "{}: {}",
                    v.key,
                    value_to_text(match &v.value {
                        Some(opt) => &opt.value,
                        None => &None,
                    })
                ))
                .collect::<Vec<_>>()
                .join(", ")
        ),
        Value::BytesValue(b) => format!("{:x?}", b),
    }
}

pub fn stringify_attributes(attributes: &BTreeMap<String, Option<Value>>) -> String {
    let mut s = "{".to_string();
    for (key, value) in attributes {
        s.push_str(&format!("\n {} = {},", key, value_to_text(value)));
    }
    s.push('}');
    s
}

/// Convert a span to a single string for text-based search. Covers the span
/// name, the node name and all attributes. Not meant to be human readable.
pub fn stringify_span_for_search(span: &Span) -> String {
    format!(
        "{}\n{}\n{}",
        span.name,
        span.node.name,
        stringify_attributes(&span.attributes),
    )
}
