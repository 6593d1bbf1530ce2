//! Trace processing pipeline: document → display spans → laid-out rows.
//!
//! Both stages are pure functions of their input and run synchronously on
//! the calling thread. [`TracePipeline`] memoizes them per document.

pub mod flatten;
pub mod layout;
pub mod status;

pub use flatten::flatten;
pub use layout::layout;
pub use status::classify_decision;

use crate::core::{LayoutSpan, TraceDocument, TraceSpan};
use chrono::{DateTime, Utc};

/// Flattened and laid-out spans for one trace document.
#[derive(Debug, Clone, Default)]
pub struct TracePipeline {
    spans: Vec<TraceSpan>,
    rows: Vec<LayoutSpan>,
    started_at: Option<DateTime<Utc>>,
}

impl TracePipeline {
    /// Run both stages for `document`.
    pub fn new(document: &TraceDocument) -> Self {
        let mut pipeline = Self::from_spans(flatten(document));
        pipeline.started_at = wall_clock(document.start_time_unix_nano);
        pipeline
    }

    /// Lay out spans that were flattened elsewhere.
    pub fn from_spans(spans: Vec<TraceSpan>) -> Self {
        let rows = layout(&spans);
        Self {
            spans,
            rows,
            started_at: None,
        }
    }

    /// Wall-clock time the evaluation started, when the root was timed
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    /// Display spans in flattening order
    pub fn spans(&self) -> &[TraceSpan] {
        &self.spans
    }

    /// Laid-out spans ordered by row
    pub fn rows(&self) -> &[LayoutSpan] {
        &self.rows
    }

    /// The row showing `span_id`, if any
    pub fn row_of(&self, span_id: &str) -> Option<&LayoutSpan> {
        self.rows.iter().find(|l| l.span.span_id == span_id)
    }

    /// Latest end time across all spans, in microseconds
    pub fn extent(&self) -> u64 {
        self.spans.iter().map(TraceSpan::end_time).max().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

fn wall_clock(unix_nanos: u64) -> Option<DateTime<Utc>> {
    if unix_nanos == 0 {
        return None;
    }
    let secs = i64::try_from(unix_nanos / 1_000_000_000).ok()?;
    let nanos = u32::try_from(unix_nanos % 1_000_000_000).ok()?;
    DateTime::from_timestamp(secs, nanos)
}
