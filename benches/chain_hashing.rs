//! Benchmark for chain hashing and verification.
//!
//! Run with: cargo bench --bench chain_hashing

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use game_integrity::{
    chain::HashChain,
    core::{chain_hash, fold_events, genesis_hash},
    Checkpoint, GameEvent, IntegrityConfig, ManualClock, NullSink, Position, Verifier,
};

fn movement_events(count: u64) -> Vec<GameEvent> {
    (0..count)
        .map(|i| GameEvent::movement(i * 100, "bench_player", Position::new(i as f64, 0.0, 0.0)))
        .collect()
}

fn recorded_session(events: u64, per_checkpoint: u64) -> Vec<Checkpoint> {
    let clock = Arc::new(ManualClock::new(0));
    let mut chain = HashChain::with_clock(IntegrityConfig::default(), clock).with_sink(Arc::new(NullSink));
    chain.start_chain("bench").expect("fresh chain");

    for (i, event) in movement_events(events).into_iter().enumerate() {
        chain.add_event(event).expect("active chain");
        if (i as u64 + 1) % per_checkpoint == 0 {
            chain.finalize_checkpoint().expect("non-empty buffer");
        }
    }
    chain.force_checkpoint();
    chain.checkpoints()
}

fn benchmark_single_link(c: &mut Criterion) {
    let previous = genesis_hash("bench");
    let event = GameEvent::movement(1_000, "bench_player", Position::new(1.0, 2.0, 3.0));

    c.bench_function("chain_hash_single_event", |b| {
        b.iter(|| black_box(chain_hash(black_box(&previous), black_box(&event))))
    });
}

fn benchmark_fold(c: &mut Criterion) {
    let mut group = c.benchmark_group("fold_events");

    for size in [50u64, 500, 5_000] {
        let events = movement_events(size);
        group.throughput(Throughput::Elements(size));
        group.bench_with_input(BenchmarkId::from_parameter(size), &events, |b, events| {
            b.iter(|| black_box(fold_events(genesis_hash("bench"), events.iter())))
        });
    }

    group.finish();
}

fn benchmark_full_verification(c: &mut Criterion) {
    let checkpoints = recorded_session(5_000, 50);
    let verifier = Verifier::default().with_sink(Arc::new(NullSink));

    let mut group = c.benchmark_group("verification");
    group.throughput(Throughput::Elements(5_000));
    group.bench_function("full_verification_5000_events", |b| {
        b.iter(|| black_box(verifier.full_verification(black_box(&checkpoints), "bench")))
    });
    group.finish();
}

criterion_group!(
    benches,
    benchmark_single_link,
    benchmark_fold,
    benchmark_full_verification
);
criterion_main!(benches);
