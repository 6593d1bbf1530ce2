//! Decision classification.
//!
//! Every status shown on the timeline comes from [`classify_decision`];
//! color lookup keys off the resulting [`SpanStatus`], never off raw strings.

use crate::core::{EvaluationResult, SpanStatus};
use serde_json::Value;

/// Map a decision type to a display status.
///
/// `Block`, `Halt` and `Deny` are errors, `Ask` is a warning, anything
/// else (including no decision at all) is ok. Matching ignores ASCII case
/// because engine responses use lowercase (`{"decision": "deny"}`).
pub fn classify_decision(decision: Option<&str>) -> SpanStatus {
    let Some(decision) = decision.map(str::trim) else {
        return SpanStatus::Ok;
    };

    if ["block", "halt", "deny"]
        .iter()
        .any(|d| decision.eq_ignore_ascii_case(d))
    {
        SpanStatus::Error
    } else if decision.eq_ignore_ascii_case("ask") {
        SpanStatus::Warning
    } else {
        SpanStatus::Ok
    }
}

/// Decision names an externally tagged payload may be keyed by.
const DECISION_NAMES: [&str; 6] = ["allow", "ask", "block", "halt", "deny", "modify"];

/// Extract a decision type from a loosely shaped decision payload.
///
/// Accepts a bare string (`"Block"`), an object carrying a `type`,
/// `decision` or `finalDecisionType` field, or an externally tagged enum
/// keyed by a known decision name (`{"Block": {"reason": ".."}}`).
pub fn decision_type(value: &Value) -> Option<&str> {
    match value {
        Value::String(s) => Some(s.as_str()),
        Value::Object(map) => {
            for key in ["type", "decision", "finalDecisionType", "final_decision_type"] {
                match map.get(key) {
                    Some(Value::String(s)) => return Some(s.as_str()),
                    Some(nested @ Value::Object(_)) => return decision_type(nested),
                    _ => {},
                }
            }
            if map.len() != 1 {
                return None;
            }
            map.keys()
                .next()
                .map(String::as_str)
                .filter(|key| DECISION_NAMES.iter().any(|d| key.eq_ignore_ascii_case(d)))
        },
        _ => None,
    }
}

/// The final decision type recorded on an evaluation, if any.
pub fn evaluation_decision(evaluation: &EvaluationResult) -> Option<&str> {
    evaluation
        .final_decision_type
        .as_deref()
        .or_else(|| evaluation.final_decision.as_ref().and_then(decision_type))
}
