//! Flattening engine: trace document tree → ordered display spans.
//!
//! Output order is root, enrich, then each phase followed by its signals
//! block, the individual signals and finally the evaluation. All times are
//! microseconds relative to the trace start and every duration is at least 1.

use crate::core::{
    EnrichPhase, EvaluationResult, PolicyPhase, ServiceClass, SignalsPhase, SpanStatus,
    TraceDocument, TraceSpan,
};
use crate::trace::status::{classify_decision, decision_type, evaluation_decision};
use ahash::AHashSet;
use serde_json::{json, Value};

/// Share of a phase given to its synthetic evaluation span.
const EVALUATION_SHARE: f64 = 0.2;

/// Maximum characters of an exit reason shown in an evaluation label.
const EXIT_REASON_CHARS: usize = 20;

/// Converts absolute nanosecond timestamps into offsets from the trace start.
struct Clock {
    origin_nanos: u64,
}

impl Clock {
    /// Offset of `nanos` in microseconds, `None` when the timestamp is missing.
    fn offset(&self, nanos: u64) -> Option<u64> {
        if nanos == 0 {
            return None;
        }
        Some(nanos_to_micros(nanos.saturating_sub(self.origin_nanos)))
    }

    /// Offset and duration of a `[start, end]` pair when both are usable.
    fn interval(&self, start: u64, end: u64) -> Option<(u64, u64)> {
        if start == 0 || end <= start {
            return None;
        }
        let offset = self.offset(start)?;
        Some((offset, nanos_to_micros(end - start).max(1)))
    }
}

fn nanos_to_micros(nanos: u64) -> u64 {
    (nanos as f64 / 1000.0).round() as u64
}

fn millis_to_micros(ms: f64) -> Option<u64> {
    if ms.is_finite() && ms >= 0.0 {
        Some(((ms * 1000.0).round() as u64).max(1))
    } else {
        None
    }
}

/// Hands out span ids, suffixing duplicates so every id is unique.
#[derive(Default)]
struct IdAllocator {
    seen: AHashSet<String>,
}

impl IdAllocator {
    fn claim(&mut self, preferred: Option<&str>, fallback: impl FnOnce() -> String) -> String {
        let base = match preferred.map(str::trim) {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => fallback(),
        };
        if self.seen.insert(base.clone()) {
            return base;
        }
        let mut n = 2;
        loop {
            let candidate = format!("{base}#{n}");
            if self.seen.insert(candidate.clone()) {
                return candidate;
            }
            n += 1;
        }
    }
}

/// Flatten a trace document into display spans.
///
/// Pure and deterministic: the same document always yields the same list.
pub fn flatten(trace: &TraceDocument) -> Vec<TraceSpan> {
    let mut ids = IdAllocator::default();
    let root_id = ids.claim(trace.span_id.as_deref(), || match trace.trace_id.as_deref() {
        Some(trace_id) if !trace_id.is_empty() => format!("{trace_id}:root"),
        _ => "root".to_string(),
    });

    let clock = Clock {
        origin_nanos: origin_nanos(trace),
    };
    let root_interval = clock
        .interval(trace.start_time_unix_nano, trace.end_time_unix_nano)
        .map(|(_, duration)| duration);
    let root_duration = root_interval.unwrap_or(1);

    let mut spans = Vec::with_capacity(estimate_span_count(trace));
    spans.push(TraceSpan {
        span_id: root_id.clone(),
        parent_id: None,
        name: root_label(trace),
        service_name: ServiceClass::Root,
        start_time: 0,
        duration: root_duration,
        status: root_status(trace),
        timing_is_approximate: root_interval.is_none(),
        data: root_data(trace),
    });

    if let Some(enrich) = &trace.enrich {
        spans.push(enrich_span(enrich, &clock, &root_id, &mut ids));
    }

    for (index, phase) in trace.phases.iter().enumerate() {
        push_phase(&mut spans, phase, index, &clock, root_duration, &root_id, &mut ids);
    }

    // The root bar must cover every child, even when child clocks overrun it.
    let latest_end = spans.iter().skip(1).map(TraceSpan::end_time).max().unwrap_or(0);
    if latest_end > spans[0].duration {
        spans[0].duration = latest_end;
    }

    tracing::debug!(
        spans = spans.len(),
        phases = trace.phases.len(),
        root_duration_us = spans[0].duration,
        "Flattened trace"
    );
    spans
}

/// Timestamp all offsets are measured from.
///
/// Normally the trace start. When the root carries no start time the
/// earliest child timestamp stands in, so child offsets stay meaningful.
fn origin_nanos(trace: &TraceDocument) -> u64 {
    if trace.start_time_unix_nano > 0 {
        return trace.start_time_unix_nano;
    }

    let enrich = trace.enrich.iter().map(|e| e.start_time_unix_nano);
    let phases = trace.phases.iter().flat_map(|p| {
        let signals = p.signals.as_ref().map_or(0, |s| s.start_time_unix_nano);
        [p.start_time_unix_nano, signals]
    });
    enrich.chain(phases).filter(|&t| t > 0).min().unwrap_or(0)
}

fn estimate_span_count(trace: &TraceDocument) -> usize {
    let per_phase: usize = trace
        .phases
        .iter()
        .map(|p| 2 + p.signals.as_ref().map_or(0, |s| 1 + s.signals.len()))
        .sum();
    2 + per_phase
}

fn root_label(trace: &TraceDocument) -> String {
    let field = |camel: &str, snake: &str| {
        trace.raw_event.as_ref().and_then(|event| {
            event
                .get(camel)
                .or_else(|| event.get(snake))
                .and_then(Value::as_str)
                .map(str::to_string)
        })
    };

    match (field("hookEventName", "hook_event_name"), field("toolName", "tool_name")) {
        (Some(event), Some(tool)) => format!("{event}: {tool}"),
        (Some(event), None) => event,
        _ => harness_label(trace).unwrap_or_else(|| "Evaluation".to_string()),
    }
}

fn harness_label(trace: &TraceDocument) -> Option<String> {
    match trace.harness.as_ref()? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Object(map) => match (map.get("type").or_else(|| map.get("name")), map.len()) {
            (Some(Value::String(s)), _) => Some(s.clone()),
            (_, 1) => map.keys().next().cloned(),
            _ => None,
        },
        _ => None,
    }
}

/// Worst of: recorded errors, the response decision and every phase decision.
fn root_status(trace: &TraceDocument) -> SpanStatus {
    let from_errors = if trace.errors.is_empty() {
        SpanStatus::Ok
    } else {
        SpanStatus::Error
    };
    let from_response = classify_decision(trace.response.as_ref().and_then(decision_type));
    let from_phases = trace
        .phases
        .iter()
        .map(phase_status)
        .max()
        .unwrap_or_default();

    from_errors.worst(from_response).worst(from_phases)
}

fn phase_status(phase: &PolicyPhase) -> SpanStatus {
    classify_decision(phase.evaluation.as_ref().and_then(evaluation_decision))
}

fn root_data(trace: &TraceDocument) -> Value {
    json!({
        "traceId": trace.trace_id,
        "harness": trace.harness,
        "rawEvent": trace.raw_event,
        "response": trace.response,
        "errors": trace.errors,
        "totalDurationMs": trace.total_duration_ms,
    })
}

fn enrich_span(
    enrich: &EnrichPhase,
    clock: &Clock,
    root_id: &str,
    ids: &mut IdAllocator,
) -> TraceSpan {
    let start = clock.offset(enrich.start_time_unix_nano);
    let reported = enrich
        .duration_us
        .map(|us| us.max(1))
        .or_else(|| enrich.duration_ms.and_then(millis_to_micros));
    let measured = clock
        .interval(enrich.start_time_unix_nano, enrich.end_time_unix_nano)
        .map(|(_, duration)| duration);
    let duration = reported.or(measured);

    TraceSpan {
        span_id: ids.claim(enrich.span_id.as_deref(), || format!("{root_id}:enrich")),
        parent_id: Some(root_id.to_string()),
        name: "Enrich".to_string(),
        service_name: ServiceClass::Enrich,
        start_time: start.unwrap_or(0),
        duration: duration.unwrap_or(1),
        status: SpanStatus::Ok,
        timing_is_approximate: start.is_none() || duration.is_none(),
        data: json!({
            "operations": enrich.operations,
            "enrichedEvent": enrich.enriched_event,
        }),
    }
}

fn push_phase(
    spans: &mut Vec<TraceSpan>,
    phase: &PolicyPhase,
    index: usize,
    clock: &Clock,
    root_duration: u64,
    root_id: &str,
    ids: &mut IdAllocator,
) {
    let measured = clock.interval(phase.start_time_unix_nano, phase.end_time_unix_nano);
    let start = measured
        .map(|(start, _)| start)
        .or_else(|| clock.offset(phase.start_time_unix_nano));
    let phase_start = start.unwrap_or(0);
    let duration = measured
        .map(|(_, duration)| duration)
        .or_else(|| phase.duration_ms.and_then(millis_to_micros));
    let phase_duration = duration.unwrap_or_else(|| root_duration.saturating_sub(phase_start).max(1));
    let status = phase_status(phase);

    let phase_id = ids.claim(phase.span_id.as_deref(), || format!("{root_id}:phase:{index}"));
    spans.push(TraceSpan {
        span_id: phase_id.clone(),
        parent_id: Some(root_id.to_string()),
        name: if phase.name.is_empty() {
            format!("phase {index}")
        } else {
            phase.name.clone()
        },
        service_name: ServiceClass::for_phase(&phase.name),
        start_time: phase_start,
        duration: phase_duration,
        status,
        timing_is_approximate: start.is_none() || duration.is_none(),
        data: json!({
            "name": phase.name,
            "durationMs": phase.duration_ms,
            "evaluation": phase.evaluation,
        }),
    });

    if let Some(signals) = &phase.signals {
        push_signals(spans, signals, &phase_id, phase_start, phase_duration, clock, ids);
    }

    if let Some(evaluation) = &phase.evaluation {
        spans.push(evaluation_span(evaluation, &phase_id, phase_start, phase_duration, status, ids));
    }
}

fn push_signals(
    spans: &mut Vec<TraceSpan>,
    block: &SignalsPhase,
    phase_id: &str,
    phase_start: u64,
    phase_duration: u64,
    clock: &Clock,
    ids: &mut IdAllocator,
) {
    let measured = clock.interval(block.start_time_unix_nano, block.end_time_unix_nano);
    let start = measured
        .map(|(start, _)| start)
        .or_else(|| clock.offset(block.start_time_unix_nano));
    let block_start = start.unwrap_or(phase_start);
    let duration = measured
        .map(|(_, duration)| duration)
        .or_else(|| block.duration_ms.and_then(millis_to_micros));
    let block_duration = duration.unwrap_or(phase_duration);

    let count = block.signals.len();
    let equal_share = (block_duration / count.max(1) as u64).max(1);
    let signals_id = ids.claim(block.span_id.as_deref(), || format!("{phase_id}:signals"));

    let mut children = Vec::with_capacity(count);
    let mut cursor = block_start;
    for (index, signal) in block.signals.iter().enumerate() {
        let reported = signal.duration_ms.and_then(millis_to_micros);
        let signal_duration = reported.unwrap_or(equal_share);
        let status = match signal.exit_code {
            Some(code) if code != 0 => SpanStatus::Error,
            _ => SpanStatus::Ok,
        };

        children.push(TraceSpan {
            span_id: ids.claim(None, || format!("{signals_id}:signal:{index}")),
            parent_id: Some(signals_id.clone()),
            name: if signal.name.is_empty() {
                format!("signal {index}")
            } else {
                signal.name.clone()
            },
            service_name: ServiceClass::Signal,
            start_time: cursor,
            duration: signal_duration,
            status,
            timing_is_approximate: reported.is_none(),
            data: json!({
                "name": signal.name,
                "command": signal.command,
                "result": signal.result,
                "durationMs": signal.duration_ms,
                "exitCode": signal.exit_code,
            }),
        });
        cursor = cursor.saturating_add(signal_duration);
    }

    let block_status = children
        .iter()
        .map(|c| c.status)
        .max()
        .unwrap_or_default();
    spans.push(TraceSpan {
        span_id: signals_id,
        parent_id: Some(phase_id.to_string()),
        name: format!("Signals ({count})"),
        service_name: ServiceClass::Signals,
        start_time: block_start,
        duration: block_duration,
        status: block_status,
        timing_is_approximate: start.is_none() || duration.is_none(),
        data: json!({
            "count": count,
            "durationMs": block.duration_ms,
        }),
    });
    spans.extend(children);
}

fn evaluation_span(
    evaluation: &EvaluationResult,
    phase_id: &str,
    phase_start: u64,
    phase_duration: u64,
    status: SpanStatus,
    ids: &mut IdAllocator,
) -> TraceSpan {
    let duration = ((phase_duration as f64 * EVALUATION_SHARE).floor() as u64).max(1);
    let start = phase_start + phase_duration.saturating_sub(duration);

    TraceSpan {
        span_id: ids.claim(None, || format!("{phase_id}:evaluation")),
        parent_id: Some(phase_id.to_string()),
        name: evaluation_label(evaluation),
        service_name: ServiceClass::Evaluation,
        start_time: start,
        duration,
        status,
        timing_is_approximate: true,
        data: serde_json::to_value(evaluation).unwrap_or(Value::Null),
    }
}

fn evaluation_label(evaluation: &EvaluationResult) -> String {
    if let Some(decision) = evaluation_decision(evaluation) {
        return format!("Eval: {decision}");
    }
    if let Some(reason) = evaluation.exit_reason.as_deref().filter(|r| !r.is_empty()) {
        let truncated: String = reason.chars().take(EXIT_REASON_CHARS).collect();
        return format!("Exit: {truncated}");
    }
    "Evaluation".to_string()
}
