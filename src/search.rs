//! Text search over the loaded spans. The query is a case-insensitive
//! regular expression matched against each span's name, node name and
//! attributes; results feed row highlighting and the scroll manager's
//! next/prev-result navigation.

use std::collections::HashSet;
use std::rc::Rc;

use anyhow::{Context, Result};
use regex::RegexBuilder;

use crate::types::{stringify_span_for_search, Span, SpanId};

#[derive(Default)]
pub struct SpanSearch {
    pub query: String,
    /// Ids of the spans matching the last executed query. Empty set with
    /// `active == false` means no search is in effect.
    pub matching_span_ids: HashSet<SpanId>,
    pub active: bool,
}

impl SpanSearch {
    /// Run the current query over the spans (a flattened list, not trees).
    /// An empty query clears the search. An invalid pattern is reported to
    /// the caller and leaves the previous results in place.
    pub fn run(&mut self, spans: &[Rc<Span>]) -> Result<usize> {
        if self.query.trim().is_empty() {
            self.clear();
            return Ok(0);
        }

        let regex = RegexBuilder::new(&self.query)
            .case_insensitive(true)
            .build()
            .with_context(|| format!("invalid search pattern: {:?}", self.query))?;

        let mut matching = HashSet::new();
        for span in spans {
            if regex.is_match(&stringify_span_for_search(span)) {
                matching.insert(span.span_id.clone());
            }
        }

        let count = matching.len();
        self.matching_span_ids = matching;
        self.active = true;
        Ok(count)
    }

    pub fn clear(&mut self) {
        self.matching_span_ids.clear();
        self.active = false;
    }

    pub fn is_match(&self, span_id: &[u8]) -> bool {
        self.active && self.matching_span_ids.contains(span_id)
    }
}
