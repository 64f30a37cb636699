use std::hint::black_box;
use std::sync::Arc;

use chart_reflow::api::{
    InvalidationScheduler, StepContext, bar_chart_mutations, standard_steps,
};
use chart_reflow::core::{BoundingBox, Viewport};
use chart_reflow::error::ChartResult;
use chart_reflow::labels::{
    CandidatePosition, LabelAnchor, LabelCandidate, OccupancyGrid, PlacementOptions, place,
};
use criterion::{Criterion, criterion_group, criterion_main};
use serde_json::json;

fn bar_labels(count: usize) -> Vec<LabelCandidate> {
    let positions = [
        CandidatePosition::new(LabelAnchor::Top, 4.0),
        CandidatePosition::new(LabelAnchor::Bottom, 4.0),
        CandidatePosition::new(LabelAnchor::Top, -4.0),
    ];
    (0..count)
        .map(|i| {
            let x = 20.0 + (i % 180) as f64 * 10.0;
            let top = 100.0 + ((i * 37) % 700) as f64;
            LabelCandidate::new(
                format!("bar-{i}"),
                BoundingBox::new(x, top, x + 8.0, 1000.0),
                28.0,
                12.0,
            )
            .with_positions(positions)
        })
        .collect()
}

fn bench_full_placement_2k(c: &mut Criterion) {
    let viewport = Viewport::new(1920, 1080);
    let labels = bar_labels(2_000);
    let grid = OccupancyGrid::for_viewport(viewport).expect("grid");

    c.bench_function("label_full_placement_2k", |b| {
        b.iter(|| {
            let _ = place(
                black_box(&labels),
                grid.clone(),
                &[],
                PlacementOptions::full(),
            )
            .expect("placement should succeed");
        })
    });
}

fn bench_hide_only_recheck_2k(c: &mut Criterion) {
    let viewport = Viewport::new(1920, 1080);
    let labels = bar_labels(2_000);
    let grid = OccupancyGrid::for_viewport(viewport).expect("grid");
    let placed = place(&labels, grid, &[], PlacementOptions::full())
        .expect("placement should succeed")
        .grid;

    c.bench_function("label_hide_only_recheck_2k", |b| {
        b.iter(|| {
            let _ = place(
                black_box(&labels),
                placed.clone(),
                &[],
                PlacementOptions::hide_only(),
            )
            .expect("recheck should succeed");
        })
    });
}

fn bench_scheduler_burst_flush(c: &mut Criterion) {
    let mutations = Arc::new(bar_chart_mutations().expect("bar table"));
    let steps = Arc::new(standard_steps().expect("standard steps"));
    let names = mutations.names().map(str::to_owned).collect::<Vec<_>>();
    let mut scheduler = InvalidationScheduler::new(mutations, steps).expect("scheduler");

    c.bench_function("scheduler_burst_flush", |b| {
        b.iter(|| {
            for name in &names {
                scheduler
                    .mutate(black_box(name), &json!(0), &json!(1))
                    .expect("known input");
            }
            let _ = scheduler
                .flush(&mut |_: &mut StepContext<'_>| -> ChartResult<()> { Ok(()) })
                .expect("flush should succeed");
        })
    });
}

criterion_group!(
    benches,
    bench_full_placement_2k,
    bench_hide_only_recheck_2k,
    bench_scheduler_burst_flush
);
criterion_main!(benches);
