//! End-to-end flattening scenarios and document-level properties.

mod common;

use common::{at_us, by_id, decision, phase, signal, signals, TraceBuilder, T0};
use hookscope_lib::core::{ServiceClass, SpanStatus, TraceDocument, TraceSpan};
use hookscope_lib::trace::flatten;
use pretty_assertions::assert_eq;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn classes(spans: &[TraceSpan]) -> Vec<ServiceClass> {
    spans.iter().map(|s| s.service_name).collect()
}

fn global_with_signal(exit_code: i32, decision_type: &str) -> TraceDocument {
    let mut global = phase("global", 100, 5_100);
    global.signals = Some(signals(200, 300, vec![signal("git_status", Some(50.0), Some(exit_code))]));
    global.evaluation = Some(decision(decision_type));
    TraceBuilder::new().phase(global).build()
}

#[test]
fn test_single_phase_with_signal_and_allow() {
    let spans = flatten(&global_with_signal(0, "Allow"));

    assert_eq!(
        classes(&spans),
        vec![
            ServiceClass::Root,
            ServiceClass::Global,
            ServiceClass::Signals,
            ServiceClass::Signal,
            ServiceClass::Evaluation,
        ]
    );
    assert!(spans.iter().all(|s| s.status == SpanStatus::Ok));
    assert_eq!(spans[2].name, "Signals (1)");
    assert_eq!(spans[3].duration, 50_000);
    assert_eq!(spans[4].name, "Eval: Allow");
}

#[test]
fn test_failing_signal_does_not_change_phase_status() {
    let spans = flatten(&global_with_signal(1, "Allow"));

    assert_eq!(spans[3].service_name, ServiceClass::Signal);
    assert_eq!(spans[3].status, SpanStatus::Error);
    assert_eq!(spans[0].status, SpanStatus::Ok);
    assert_eq!(spans[1].status, SpanStatus::Ok);
    assert_eq!(spans[4].status, SpanStatus::Ok);
}

#[test]
fn test_blocking_decision_marks_phase_and_root() {
    let spans = flatten(&global_with_signal(0, "Block"));

    assert_eq!(spans[0].status, SpanStatus::Error);
    assert_eq!(spans[1].status, SpanStatus::Error);
    let evaluation = &spans[4];
    assert_eq!(evaluation.name, "Eval: Block");
    assert_eq!(evaluation.status, SpanStatus::Error);
    assert!(evaluation.timing_is_approximate);
    // Tail 20% of the 5000µs phase
    assert_eq!(evaluation.duration, 1_000);
    assert_eq!(evaluation.start_time, 100 + 4_000);
}

#[test]
fn test_untimed_root_gets_unit_duration() {
    let document = TraceBuilder::new().timed(0, 0).build();
    let spans = flatten(&document);

    assert_eq!(spans.len(), 1);
    assert_eq!(spans[0].start_time, 0);
    assert_eq!(spans[0].duration, 1);
    assert!(spans[0].timing_is_approximate);
}

#[test]
fn test_untimed_signals_share_the_block_equally() {
    let mut project = phase("project", 0, 1_000);
    project.signals = Some(signals(
        0,
        300,
        vec![signal("a", None, None), signal("b", None, None), signal("c", None, None)],
    ));
    let spans = flatten(&TraceBuilder::new().phase(project).build());

    let executions: Vec<(u64, u64)> = spans
        .iter()
        .filter(|s| s.service_name == ServiceClass::Signal)
        .map(|s| (s.start_time, s.end_time()))
        .collect();
    assert_eq!(executions, vec![(0, 100), (100, 200), (200, 300)]);
    assert!(spans
        .iter()
        .filter(|s| s.service_name == ServiceClass::Signal)
        .all(|s| s.timing_is_approximate));
}

#[test]
fn test_ask_makes_root_warning() {
    let mut global = phase("global", 0, 100);
    global.evaluation = Some(decision("Ask"));
    let mut catalog = phase("catalog:security", 100, 200);
    catalog.evaluation = Some(decision("Allow"));
    let spans = flatten(&TraceBuilder::new().phase(global).phase(catalog).build());

    assert_eq!(spans[0].status, SpanStatus::Warning);
    let catalog_span = spans
        .iter()
        .find(|s| s.service_name == ServiceClass::Catalog)
        .unwrap();
    assert_eq!(catalog_span.status, SpanStatus::Ok);
}

#[test]
fn test_recorded_errors_fail_the_root() {
    let spans = flatten(&TraceBuilder::new().error("policy compile failed").build());
    assert_eq!(spans[0].status, SpanStatus::Error);
}

#[test]
fn test_snake_case_document_from_disk() {
    let json = format!(
        r#"{{
            "span_id": "abc",
            "start_time_unix_nano": "{start}",
            "end_time_unix_nano": {end},
            "phases": [{{
                "name": "global",
                "start_time_unix_nano": {start},
                "end_time_unix_nano": {end},
                "evaluation": {{"final_decision": {{"Deny": {{"reason": "rm -rf"}}}}}}
            }}]
        }}"#,
        start = T0,
        end = at_us(2_000)
    );
    let document: TraceDocument = serde_json::from_str(&json).unwrap();
    let spans = flatten(&document);

    assert_eq!(spans[0].span_id, "abc");
    assert_eq!(spans[0].duration, 2_000);
    assert_eq!(spans[1].status, SpanStatus::Error);
    assert_eq!(spans[0].status, SpanStatus::Error);
}

const DECISIONS: [Option<&str>; 6] = [None, Some("Allow"), Some("Ask"), Some("Block"), Some("Deny"), Some("Halt")];

/// Random documents with partial timing, missing durations and mixed decisions.
fn random_document(rng: &mut StdRng) -> TraceDocument {
    let extent: u64 = rng.gen_range(0..50_000);
    let mut builder = if rng.gen_bool(0.1) {
        TraceBuilder::new().timed(0, 0)
    } else {
        TraceBuilder::new().timed(T0, at_us(extent))
    };

    for index in 0..rng.gen_range(0..5) {
        let start = rng.gen_range(0..60_000);
        let end = start + rng.gen_range(0..20_000);
        let mut p = phase(&format!("catalog:{index}"), start, end);
        if rng.gen_bool(0.2) {
            p.start_time_unix_nano = 0;
        }
        if rng.gen_bool(0.5) {
            let count = rng.gen_range(0..4);
            let executions = (0..count)
                .map(|i| {
                    let duration = rng.gen_bool(0.5).then(|| rng.gen_range(0.0..5.0));
                    signal(&format!("s{i}"), duration, Some(rng.gen_range(0..2)))
                })
                .collect();
            p.signals = Some(signals(start, end, executions));
        }
        if let Some(kind) = DECISIONS[rng.gen_range(0..DECISIONS.len())] {
            p.evaluation = Some(decision(kind));
        }
        builder = builder.phase(p);
    }
    builder.build()
}

#[test]
fn test_document_properties_hold_for_random_traces() {
    let mut rng = StdRng::seed_from_u64(0x5eed);

    for _ in 0..300 {
        let document = random_document(&mut rng);
        let spans = flatten(&document);
        let root = &spans[0];

        // Idempotence
        assert_eq!(spans, flatten(&document));

        // Duration floor and root coverage
        for span in &spans {
            assert!(span.duration >= 1, "{} has zero duration", span.span_id);
            assert!(span.end_time() <= root.end_time(), "{} overruns the root", span.span_id);
        }
        assert_eq!(root.start_time, 0);

        // Unique ids and resolvable parents
        let ids = by_id(&spans);
        assert_eq!(ids.len(), spans.len());
        for span in spans.iter().skip(1) {
            assert!(ids.contains_key(span.parent_id.as_deref().unwrap()));
        }

        // Status monotonicity
        let phase_decisions: Vec<Option<&str>> = document
            .phases
            .iter()
            .map(|p| p.evaluation.as_ref().and_then(|e| e.final_decision_type.as_deref()))
            .collect();
        let phase_spans: Vec<&TraceSpan> = spans
            .iter()
            .filter(|s| s.service_name == ServiceClass::Catalog)
            .collect();
        for (decision, span) in phase_decisions.iter().zip(&phase_spans) {
            if matches!(decision, Some("Block" | "Deny" | "Halt")) {
                assert_eq!(span.status, SpanStatus::Error);
            }
        }
        if phase_decisions.iter().any(|d| matches!(d, Some("Block" | "Deny" | "Halt"))) {
            assert_eq!(root.status, SpanStatus::Error);
        } else if phase_decisions.iter().any(|d| *d == Some("Ask")) {
            assert_eq!(root.status, SpanStatus::Warning);
        }
    }
}
