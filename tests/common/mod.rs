//! Common test utilities and fixtures.

#![allow(dead_code)]

use hookscope_lib::core::{
    EvaluationResult, LayoutSpan, PolicyPhase, SignalExecution, SignalsPhase, TraceDocument, TraceSpan,
};
use std::collections::HashMap;

/// Trace start used by every fixture, in Unix nanoseconds.
pub const T0: u64 = 1_700_000_000_000_000_000;

/// Absolute nanoseconds for an offset in microseconds from [`T0`].
pub fn at_us(offset_us: u64) -> u64 {
    T0 + offset_us * 1_000
}

/// Builds trace documents with sensible defaults: a 10ms root and no phases.
pub struct TraceBuilder {
    doc: TraceDocument,
}

impl TraceBuilder {
    pub fn new() -> Self {
        Self {
            doc: TraceDocument {
                span_id: Some("root".to_string()),
                trace_id: Some("trace-1".to_string()),
                start_time_unix_nano: T0,
                end_time_unix_nano: at_us(10_000),
                ..Default::default()
            },
        }
    }

    /// Root bounds as raw nanoseconds.
    pub fn timed(mut self, start_nano: u64, end_nano: u64) -> Self {
        self.doc.start_time_unix_nano = start_nano;
        self.doc.end_time_unix_nano = end_nano;
        self
    }

    pub fn phase(mut self, phase: PolicyPhase) -> Self {
        self.doc.phases.push(phase);
        self
    }

    pub fn error(mut self, message: &str) -> Self {
        self.doc.errors.push(message.to_string());
        self
    }

    pub fn build(self) -> TraceDocument {
        self.doc
    }
}

impl Default for TraceBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A phase spanning `[start_us, end_us)` relative to [`T0`].
pub fn phase(name: &str, start_us: u64, end_us: u64) -> PolicyPhase {
    PolicyPhase {
        span_id: Some(format!("phase-{name}")),
        name: name.to_string(),
        start_time_unix_nano: at_us(start_us),
        end_time_unix_nano: at_us(end_us),
        ..Default::default()
    }
}

pub fn signals(start_us: u64, end_us: u64, executions: Vec<SignalExecution>) -> SignalsPhase {
    SignalsPhase {
        start_time_unix_nano: at_us(start_us),
        end_time_unix_nano: at_us(end_us),
        signals: executions,
        ..Default::default()
    }
}

pub fn signal(name: &str, duration_ms: Option<f64>, exit_code: Option<i32>) -> SignalExecution {
    SignalExecution {
        name: name.to_string(),
        command: Some(format!("./{name}.sh")),
        duration_ms,
        exit_code,
        ..Default::default()
    }
}

pub fn decision(decision_type: &str) -> EvaluationResult {
    EvaluationResult {
        routed: true,
        matched_policies: vec!["policy.builtin".to_string()],
        final_decision_type: Some(decision_type.to_string()),
        ..Default::default()
    }
}

/// Spans keyed by id.
pub fn by_id(spans: &[TraceSpan]) -> HashMap<&str, &TraceSpan> {
    spans.iter().map(|s| (s.span_id.as_str(), s)).collect()
}

/// Rows of every descendant of `root_id`, following parent links.
pub fn descendant_rows(rows: &[LayoutSpan], root_id: &str) -> Vec<usize> {
    let mut found = Vec::new();
    let mut frontier = vec![root_id.to_string()];
    while let Some(parent) = frontier.pop() {
        for layout in rows {
            if layout.span.parent_id.as_deref() == Some(parent.as_str()) && layout.span.span_id != root_id {
                found.push(layout.row);
                frontier.push(layout.span.span_id.clone());
            }
        }
    }
    found.sort_unstable();
    found
}
