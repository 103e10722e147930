//! Loading OTLP trace dumps from disk. Accepts the JSON encoding of
//! `ExportTraceServiceRequest` (a single request or an array of them),
//! optionally gzip-compressed, and builds the span trees the timeline
//! displays.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;
use std::rc::Rc;

use anyhow::{Context, Result};
use opentelemetry_proto::tonic::collector::trace::v1::ExportTraceServiceRequest;

use crate::task_timer::TaskTimer;
use crate::types::{time_point_from_unix_nano, Event, Node, Span, TimePoint};

pub fn load_trace_file(path: &Path) -> Result<Vec<Rc<Span>>> {
    let timer = TaskTimer::new("Loading trace file");

    let mut file_bytes = Vec::new();
    std::fs::File::open(path)
        .with_context(|| format!("cannot open {}", path.display()))?
        .read_to_end(&mut file_bytes)?;

    let requests = parse_trace_bytes(&file_bytes)?;
    let roots = build_span_trees(&requests);

    println!(
        "Loaded {} root spans from {} in {}ms",
        roots.len(),
        path.display(),
        timer.finish(),
    );
    Ok(roots)
}

/// Parse raw file bytes, gunzipping first when the gzip magic is present.
pub fn parse_trace_bytes(file_bytes: &[u8]) -> Result<Vec<ExportTraceServiceRequest>> {
    let decompressed;
    let json_bytes = if file_bytes.starts_with(&[0x1f, 0x8b]) {
        let mut decoder = flate2::read::GzDecoder::new(file_bytes);
        let mut buffer = Vec::new();
        decoder
            .read_to_end(&mut buffer)
            .context("failed to decompress gzip trace file")?;
        decompressed = buffer;
        &decompressed[..]
    } else {
        file_bytes
    };

    let json_str = std::str::from_utf8(json_bytes).context("trace file is not UTF8")?;

    // Either one export request or an array of them.
    if let Ok(requests) = serde_json::from_str::<Vec<ExportTraceServiceRequest>>(json_str) {
        return Ok(requests);
    }
    let single: ExportTraceServiceRequest =
        serde_json::from_str(json_str).context("trace file is not OTLP JSON")?;
    Ok(vec![single])
}

/// Turn the raw OTLP data into span trees: resolve parent links within each
/// trace, propagate subtree min/max times, return the roots sorted by start
/// time.
pub fn build_span_trees(requests: &[ExportTraceServiceRequest]) -> Vec<Rc<Span>> {
    let mut spans_by_id: BTreeMap<Vec<u8>, Rc<Span>> = BTreeMap::new();

    for request in requests {
        for rs in &request.resource_spans {
            let node = match &rs.resource {
                Some(resource) => {
                    let attributes = attributes_to_map(&resource.attributes);
                    let name = match attributes.get("service.name") {
                        Some(Some(
                            opentelemetry_proto::tonic::common::v1::any_value::Value::StringValue(
                                service_name,
                            ),
                        )) => service_name.clone(),
                        _ => "unknown".to_string(),
                    };
                    Rc::new(Node { name, attributes })
                }
                None => Rc::new(Node {
                    name: "no resource".to_string(),
                    attributes: BTreeMap::new(),
                }),
            };

            for ss in &rs.scope_spans {
                for span in &ss.spans {
                    let start_time = time_point_from_unix_nano(span.start_time_unix_nano);
                    let end_time = time_point_from_unix_nano(span.end_time_unix_nano);

                    let events = span
                        .events
                        .iter()
                        .map(|event| Event {
                            name: event.name.clone(),
                            time: time_point_from_unix_nano(event.time_unix_nano),
                            attributes: attributes_to_map(&event.attributes),
                        })
                        .collect();

                    spans_by_id.insert(
                        span.span_id.clone(),
                        Rc::new(Span {
                            name: span.name.clone(),
                            span_id: span.span_id.clone(),
                            trace_id: span.trace_id.clone(),
                            parent_span_id: span.parent_span_id.clone(),
                            start_time,
                            end_time,
                            attributes: attributes_to_map(&span.attributes),
                            events,
                            node: node.clone(),
                            children: RefCell::new(Vec::new()),
                            min_start_time: Cell::new(start_time),
                            max_end_time: Cell::new(end_time),
                            collapse_children: Cell::new(false),
                        }),
                    );
                }
            }
        }
    }

    let mut roots = Vec::new();
    for span in spans_by_id.values() {
        match spans_by_id.get(&span.parent_span_id) {
            // A span pointing at itself would otherwise recurse forever.
            Some(parent) if parent.span_id != span.span_id => {
                parent.children.borrow_mut().push(span.clone());
            }
            _ => roots.push(span.clone()),
        }
    }

    for root in &roots {
        sort_children_by_start_time(root);
    }
    set_min_max_time(&roots);
    roots.sort_by(|a, b| {
        a.start_time
            .partial_cmp(&b.start_time)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    roots
}

fn attributes_to_map(
    attributes: &[opentelemetry_proto::tonic::common::v1::KeyValue],
) -> BTreeMap<String, Option<opentelemetry_proto::tonic::common::v1::any_value::Value>> {
    let mut map = BTreeMap::new();
    for attribute in attributes {
        map.insert(
            attribute.key.clone(),
            attribute.value.clone().and_then(|v| v.value),
        );
    }
    map
}

fn sort_children_by_start_time(span: &Rc<Span>) {
    let mut children = span.children.borrow_mut();
    children.sort_by(|a, b| {
        a.start_time
            .partial_cmp(&b.start_time)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    for child in children.iter() {
        sort_children_by_start_time(child);
    }
}

/// Propagate subtree min/max times bottom-up.
pub fn set_min_max_time(spans: &[Rc<Span>]) {
    for span in spans {
        let mut min_start_time = span.start_time;
        let mut max_end_time = span.end_time;

        let children = span.children.borrow();
        set_min_max_time(children.as_slice());

        for child in children.iter() {
            min_start_time = min_start_time.min(child.min_start_time.get());
            max_end_time = max_end_time.max(child.max_end_time.get());
        }

        span.min_start_time.set(min_start_time);
        span.max_end_time.set(max_end_time);
    }
}

pub fn get_min_max_time(spans: &[Rc<Span>]) -> Option<(TimePoint, TimePoint)> {
    let mut min_max: Option<(TimePoint, TimePoint)> = None;

    for span in spans {
        match &mut min_max {
            Some((min_time, max_time)) => {
                *min_time = min_time.min(span.min_start_time.get());
                *max_time = max_time.max(span.max_end_time.get());
            }
            None => {
                min_max = Some((span.min_start_time.get(), span.max_end_time.get()));
            }
        }
    }

    min_max
}
