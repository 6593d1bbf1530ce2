//! Trace document model and the render-ready span types derived from it.
//!
//! Documents are accepted in either camelCase (what the console backend
//! serves) or snake_case (what the policy engine writes to disk).

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

/// Accepts a timestamp written as a number, a numeric string, or null.
fn nanos<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Int(u64),
        Float(f64),
        Text(String),
        Null,
        Other(Value),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Int(v) => v,
        Raw::Float(v) if v.is_finite() && v > 0.0 => v as u64,
        Raw::Text(s) => s.trim().parse().unwrap_or(0),
        Raw::Float(_) | Raw::Null | Raw::Other(_) => 0,
    })
}

/// `null` reads as the type's default instead of failing the document.
fn or_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// A number written as a number or a numeric string. Anything else,
/// including non-finite values, is treated as absent.
fn loose_number<'de, D>(deserializer: D) -> std::result::Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Loose {
        Number(f64),
        Text(String),
        Other(Value),
    }

    let value = match Loose::deserialize(deserializer)? {
        Loose::Number(v) => Some(v),
        Loose::Text(s) => s.trim().parse().ok(),
        Loose::Other(_) => None,
    };
    Ok(value.filter(|v: &f64| v.is_finite()))
}

fn loose_f64<'de, D>(deserializer: D) -> std::result::Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    loose_number(deserializer)
}

/// Negative values are dropped; fractions are rounded.
fn loose_u64<'de, D>(deserializer: D) -> std::result::Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(loose_number(deserializer)?
        .filter(|v| *v >= 0.0)
        .map(|v| v.round() as u64))
}

fn loose_i32<'de, D>(deserializer: D) -> std::result::Result<Option<i32>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(loose_number(deserializer)?
        .filter(|v| v.fract() == 0.0 && *v >= f64::from(i32::MIN) && *v <= f64::from(i32::MAX))
        .map(|v| v as i32))
}

/// Root of one recorded policy evaluation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TraceDocument {
    /// Root span identifier; synthesized during flattening when absent
    #[serde(alias = "span_id", skip_serializing_if = "Option::is_none")]
    pub span_id: Option<String>,
    /// Trace identifier for correlation
    #[serde(alias = "trace_id", skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
    /// Which agent harness sent the event
    #[serde(skip_serializing_if = "Option::is_none")]
    pub harness: Option<Value>,
    /// Start time in nanoseconds since Unix epoch, 0 when unknown
    #[serde(alias = "start_time_unix_nano", deserialize_with = "nanos")]
    pub start_time_unix_nano: u64,
    /// End time in nanoseconds since Unix epoch, 0 when unknown
    #[serde(alias = "end_time_unix_nano", deserialize_with = "nanos")]
    pub end_time_unix_nano: u64,
    /// The event exactly as received from the agent
    #[serde(alias = "raw_event", skip_serializing_if = "Option::is_none")]
    pub raw_event: Option<Value>,
    /// Preprocessing phase
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enrich: Option<EnrichPhase>,
    /// Policy evaluation phases in execution order
    #[serde(deserialize_with = "or_default")]
    pub phases: Vec<PolicyPhase>,
    /// Final decision payload sent back to the agent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<Value>,
    /// Errors encountered during processing
    #[serde(deserialize_with = "or_default")]
    pub errors: Vec<String>,
    /// Wall-clock evaluation duration reported by the engine
    #[serde(alias = "total_duration_ms", deserialize_with = "loose_u64", skip_serializing_if = "Option::is_none")]
    pub total_duration_ms: Option<u64>,
}

/// Event preprocessing (symlink resolution, whitespace normalization, ...).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EnrichPhase {
    #[serde(alias = "span_id", skip_serializing_if = "Option::is_none")]
    pub span_id: Option<String>,
    #[serde(alias = "start_time_unix_nano", deserialize_with = "nanos")]
    pub start_time_unix_nano: u64,
    #[serde(alias = "end_time_unix_nano", deserialize_with = "nanos")]
    pub end_time_unix_nano: u64,
    /// Operations applied, in order
    #[serde(deserialize_with = "or_default")]
    pub operations: Vec<String>,
    /// The event after preprocessing
    #[serde(alias = "enriched_event", skip_serializing_if = "Option::is_none")]
    pub enriched_event: Option<Value>,
    /// Reported duration in microseconds
    #[serde(alias = "duration_us", deserialize_with = "loose_u64", skip_serializing_if = "Option::is_none")]
    pub duration_us: Option<u64>,
    /// Reported duration in milliseconds (older engines)
    #[serde(alias = "duration_ms", deserialize_with = "loose_f64", skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<f64>,
}

/// One policy layer: `global`, `catalog:<name>` or `project`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PolicyPhase {
    #[serde(alias = "span_id", skip_serializing_if = "Option::is_none")]
    pub span_id: Option<String>,
    #[serde(deserialize_with = "or_default")]
    pub name: String,
    #[serde(alias = "start_time_unix_nano", deserialize_with = "nanos")]
    pub start_time_unix_nano: u64,
    #[serde(alias = "end_time_unix_nano", deserialize_with = "nanos")]
    pub end_time_unix_nano: u64,
    #[serde(alias = "duration_ms", deserialize_with = "loose_f64", skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signals: Option<SignalsPhase>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evaluation: Option<EvaluationResult>,
}

/// Signal collection sub-phase of a policy phase.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SignalsPhase {
    #[serde(alias = "span_id", skip_serializing_if = "Option::is_none")]
    pub span_id: Option<String>,
    #[serde(alias = "start_time_unix_nano", deserialize_with = "nanos")]
    pub start_time_unix_nano: u64,
    #[serde(alias = "end_time_unix_nano", deserialize_with = "nanos")]
    pub end_time_unix_nano: u64,
    #[serde(alias = "duration_ms", deserialize_with = "loose_f64", skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<f64>,
    /// Individual executions in the order they ran
    #[serde(deserialize_with = "or_default")]
    pub signals: Vec<SignalExecution>,
}

/// A single external command run to gather decision inputs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SignalExecution {
    #[serde(deserialize_with = "or_default")]
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(alias = "duration_ms", deserialize_with = "loose_f64", skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<f64>,
    #[serde(alias = "exit_code", deserialize_with = "loose_i32", skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
}

/// Routing and decision outcome of a phase. Carries no timing of its own.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EvaluationResult {
    #[serde(deserialize_with = "or_default")]
    pub routed: bool,
    #[serde(alias = "matched_policies", deserialize_with = "or_default")]
    pub matched_policies: Vec<String>,
    #[serde(alias = "exit_reason", skip_serializing_if = "Option::is_none")]
    pub exit_reason: Option<String>,
    #[serde(alias = "wasm_decision_set", skip_serializing_if = "Option::is_none")]
    pub wasm_decision_set: Option<Value>,
    #[serde(alias = "final_decision", skip_serializing_if = "Option::is_none")]
    pub final_decision: Option<Value>,
    /// Flattened decision type some backends send instead of `finalDecision`
    #[serde(alias = "final_decision_type", skip_serializing_if = "Option::is_none")]
    pub final_decision_type: Option<String>,
}

/// Display status of a span, ordered from best to worst.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpanStatus {
    #[default]
    Ok,
    Warning,
    Error,
}

impl SpanStatus {
    /// The worse of two statuses (error > warning > ok)
    pub fn worst(self, other: Self) -> Self {
        self.max(other)
    }

    pub fn is_error(self) -> bool {
        self == SpanStatus::Error
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SpanStatus::Ok => "ok",
            SpanStatus::Warning => "warning",
            SpanStatus::Error => "error",
        }
    }
}

/// Classification tag used for color and grouping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ServiceClass {
    Root,
    Enrich,
    Global,
    Project,
    Catalog,
    Phase,
    Signals,
    Signal,
    Evaluation,
}

impl ServiceClass {
    /// Classify a policy phase by its name
    pub fn for_phase(name: &str) -> Self {
        if name == "global" {
            ServiceClass::Global
        } else if name == "project" {
            ServiceClass::Project
        } else if name.starts_with("catalog:") {
            ServiceClass::Catalog
        } else {
            ServiceClass::Phase
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ServiceClass::Root => "Root",
            ServiceClass::Enrich => "Enrich",
            ServiceClass::Global => "Global",
            ServiceClass::Project => "Project",
            ServiceClass::Catalog => "Catalog",
            ServiceClass::Phase => "Phase",
            ServiceClass::Signals => "Signals",
            ServiceClass::Signal => "Signal",
            ServiceClass::Evaluation => "Evaluation",
        }
    }
}

impl fmt::Display for ServiceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A render-ready span. Times are microseconds relative to trace start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceSpan {
    pub span_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    pub name: String,
    pub service_name: ServiceClass,
    pub start_time: u64,
    /// Always at least 1
    pub duration: u64,
    pub status: SpanStatus,
    /// True when start or duration was inferred rather than measured
    pub timing_is_approximate: bool,
    /// Source fragment shown in the details panel
    pub data: Value,
}

impl TraceSpan {
    /// End of the span, relative to trace start
    pub fn end_time(&self) -> u64 {
        self.start_time.saturating_add(self.duration)
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

/// A display span placed on the waterfall.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutSpan {
    #[serde(flatten)]
    pub span: TraceSpan,
    /// Dense 0-based row index
    pub row: usize,
    /// 0 for root-level spans
    pub depth: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_camel_case_document() {
        let doc: TraceDocument = serde_json::from_value(json!({
            "spanId": "abc",
            "traceId": "t-1",
            "startTimeUnixNano": 1_000_000,
            "endTimeUnixNano": "3000000",
            "phases": [{"name": "global", "evaluation": {"finalDecisionType": "Allow"}}]
        }))
        .unwrap();

        assert_eq!(doc.span_id.as_deref(), Some("abc"));
        assert_eq!(doc.start_time_unix_nano, 1_000_000);
        assert_eq!(doc.end_time_unix_nano, 3_000_000);
        assert_eq!(doc.phases.len(), 1);
        assert!(doc.errors.is_empty());
    }

    #[test]
    fn test_snake_case_document() {
        let doc: TraceDocument = serde_json::from_value(json!({
            "span_id": "abc",
            "start_time_unix_nano": 5,
            "end_time_unix_nano": null,
            "phases": [{
                "name": "project",
                "signals": {"signals": [{"name": "git", "duration_ms": 4, "exit_code": 1}]},
                "evaluation": {"exit_reason": "no match"}
            }]
        }))
        .unwrap();

        assert_eq!(doc.end_time_unix_nano, 0);
        let phase = &doc.phases[0];
        let signal = &phase.signals.as_ref().unwrap().signals[0];
        assert_eq!(signal.duration_ms, Some(4.0));
        assert_eq!(signal.exit_code, Some(1));
        assert_eq!(
            phase.evaluation.as_ref().unwrap().exit_reason.as_deref(),
            Some("no match")
        );
    }

    #[test]
    fn test_null_and_loosely_typed_fields_are_recovered() {
        let doc: TraceDocument = serde_json::from_value(json!({
            "spanId": "r",
            "errors": null,
            "totalDurationMs": 12.5,
            "enrich": {"operations": null, "durationUs": "40", "durationMs": true},
            "phases": [
                {
                    "name": null,
                    "durationMs": "50",
                    "signals": {"signals": null, "durationMs": "NaN"},
                    "evaluation": {"routed": null, "matchedPolicies": null, "finalDecisionType": "Allow"}
                },
                {
                    "name": "global",
                    "signals": {"signals": [{"name": null, "durationMs": "1.5", "exitCode": "2"}]}
                }
            ]
        }))
        .unwrap();

        assert!(doc.errors.is_empty());
        assert_eq!(doc.total_duration_ms, Some(13));
        let enrich = doc.enrich.as_ref().unwrap();
        assert!(enrich.operations.is_empty());
        assert_eq!(enrich.duration_us, Some(40));
        assert_eq!(enrich.duration_ms, None);

        let first = &doc.phases[0];
        assert_eq!(first.name, "");
        assert_eq!(first.duration_ms, Some(50.0));
        let signals = first.signals.as_ref().unwrap();
        assert!(signals.signals.is_empty());
        assert_eq!(signals.duration_ms, None);
        let evaluation = first.evaluation.as_ref().unwrap();
        assert!(!evaluation.routed);
        assert!(evaluation.matched_policies.is_empty());

        let signal = &doc.phases[1].signals.as_ref().unwrap().signals[0];
        assert_eq!(signal.name, "");
        assert_eq!(signal.duration_ms, Some(1.5));
        assert_eq!(signal.exit_code, Some(2));

        let doc: TraceDocument = serde_json::from_value(json!({"spanId": "r", "phases": null})).unwrap();
        assert!(doc.phases.is_empty());
    }

    #[test]
    fn test_status_ordering() {
        assert_eq!(SpanStatus::Ok.worst(SpanStatus::Warning), SpanStatus::Warning);
        assert_eq!(SpanStatus::Error.worst(SpanStatus::Warning), SpanStatus::Error);
        assert_eq!(SpanStatus::Ok.worst(SpanStatus::Ok), SpanStatus::Ok);
    }

    #[test]
    fn test_phase_classification() {
        assert_eq!(ServiceClass::for_phase("global"), ServiceClass::Global);
        assert_eq!(ServiceClass::for_phase("project"), ServiceClass::Project);
        assert_eq!(ServiceClass::for_phase("catalog:security"), ServiceClass::Catalog);
        assert_eq!(ServiceClass::for_phase("Global"), ServiceClass::Phase);
    }

    #[test]
    fn test_trace_span_serializes_camel_case() {
        let span = TraceSpan {
            span_id: "s".into(),
            parent_id: None,
            name: "root".into(),
            service_name: ServiceClass::Root,
            start_time: 0,
            duration: 1,
            status: SpanStatus::Warning,
            timing_is_approximate: false,
            data: Value::Null,
        };
        let value = serde_json::to_value(&span).unwrap();
        assert_eq!(value["serviceName"], "Root");
        assert_eq!(value["status"], "warning");
        assert!(value.get("parentId").is_none());
    }
}
