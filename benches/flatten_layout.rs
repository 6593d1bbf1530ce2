//! Pipeline benchmarks: flattening, layout and scene rendering for large
//! evaluations.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use hookscope_lib::core::config::ZoomConfig;
use hookscope_lib::core::{EvaluationResult, PolicyPhase, SignalExecution, SignalsPhase, TraceDocument};
use hookscope_lib::timeline::{ColorTable, Theme, TimelineGeometry, TimelineRenderer, Viewport};
use hookscope_lib::trace::{flatten, layout, TracePipeline};
use hookscope_lib::view::TimelineController;
use std::time::Duration;

const T0: u64 = 1_700_000_000_000_000_000;

/// A document with `phases` phases of `signals` signals each.
fn generate_document(phases: usize, signals: usize) -> TraceDocument {
    let phase_len = 100_000u64;
    let phases = (0..phases)
        .map(|p| {
            let start = T0 + p as u64 * phase_len;
            PolicyPhase {
                name: format!("catalog:pack-{p}"),
                start_time_unix_nano: start,
                end_time_unix_nano: start + phase_len,
                signals: Some(SignalsPhase {
                    start_time_unix_nano: start,
                    end_time_unix_nano: start + phase_len / 2,
                    signals: (0..signals)
                        .map(|s| SignalExecution {
                            name: format!("signal-{s}"),
                            duration_ms: (s % 3 != 0).then_some(0.002),
                            exit_code: Some((s % 7 == 0) as i32),
                            ..Default::default()
                        })
                        .collect(),
                    ..Default::default()
                }),
                evaluation: Some(EvaluationResult {
                    routed: true,
                    final_decision_type: Some(if p % 5 == 0 { "Ask" } else { "Allow" }.to_string()),
                    ..Default::default()
                }),
                ..Default::default()
            }
        })
        .collect::<Vec<_>>();

    TraceDocument {
        span_id: Some("bench".to_string()),
        start_time_unix_nano: T0,
        end_time_unix_nano: T0 + phases.len() as u64 * phase_len,
        phases,
        ..Default::default()
    }
}

fn bench_flatten(c: &mut Criterion) {
    let mut group = c.benchmark_group("flatten");
    for phases in [10, 100, 1_000] {
        let document = generate_document(phases, 10);
        let spans = flatten(&document).len();
        group.throughput(Throughput::Elements(spans as u64));
        group.bench_with_input(BenchmarkId::from_parameter(spans), &document, |b, doc| {
            b.iter(|| flatten(black_box(doc)));
        });
    }
    group.finish();
}

fn bench_layout(c: &mut Criterion) {
    let mut group = c.benchmark_group("layout");
    for phases in [10, 100, 1_000] {
        let spans = flatten(&generate_document(phases, 10));
        group.throughput(Throughput::Elements(spans.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(spans.len()), &spans, |b, spans| {
            b.iter(|| layout(black_box(spans)));
        });
    }
    group.finish();
}

/// One frame of a zoomed, scrolled view; cost should track the viewport,
/// not the trace size.
fn bench_render_frame(c: &mut Criterion) {
    let mut group = c.benchmark_group("render_frame");
    for phases in [100, 1_000] {
        let pipeline = TracePipeline::new(&generate_document(phases, 10));
        let renderer = TimelineRenderer::new(
            TimelineGeometry::default(),
            Theme::Dark.palette(),
            ColorTable::default(),
        );
        let mut controller =
            TimelineController::new(renderer, ZoomConfig::default(), Duration::from_millis(16));
        controller.resize(Viewport::new(1_600.0, 900.0));
        controller.load(pipeline.len(), pipeline.extent());
        controller.zoom_at(800.0, 8.0);
        controller.scroll_to(controller.max_scroll() / 2.0);

        group.bench_with_input(
            BenchmarkId::from_parameter(pipeline.len()),
            &pipeline,
            |b, pipeline| {
                b.iter(|| controller.render(black_box(pipeline.rows()), Some("bench")));
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_flatten, bench_layout, bench_render_frame);
criterion_main!(benches);
