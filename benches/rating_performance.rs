//! Performance benchmarks for rating calculations

use chrono::{TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use padel_rating::config::RatingConfig;
use padel_rating::rating::{InMemoryPlayerStore, RatingEngine, RatingService};
use padel_rating::types::{DoublesMatch, MatchRecord, Player, TeamSide, TrialResult};
use std::sync::Arc;

fn create_bench_engine() -> RatingEngine {
    RatingEngine::new(RatingConfig::default()).unwrap()
}

fn bench_rating_change(c: &mut Criterion) {
    let engine = create_bench_engine();

    c.bench_function("calculate_rating_change", |b| {
        b.iter(|| {
            black_box(engine.calculate_rating_change(
                black_box(4.2),
                black_box(4.6),
                black_box(true),
            ))
        })
    });
}

fn bench_settle_match(c: &mut Criterion) {
    let engine = create_bench_engine();
    let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
    let template = DoublesMatch::new(
        vec![Player::new("p1", "", 4.5), Player::new("p2", "", 3.9)],
        vec![Player::new("p3", "", 4.1), Player::new("p4", "", 4.4)],
        TeamSide::Team2,
    );

    c.bench_function("settle_match_4_players", |b| {
        b.iter(|| {
            let mut game = template.clone();
            black_box(engine.settle_match_at(&mut game, now))
        })
    });
}

fn bench_initialize_rating(c: &mut Criterion) {
    let engine = create_bench_engine();
    let trials = [TrialResult::won(), TrialResult::lost(), TrialResult::won()];

    c.bench_function("initialize_rating", |b| {
        b.iter(|| black_box(engine.initialize_rating(black_box(&trials))))
    });
}

fn bench_record_match(c: &mut Criterion) {
    let roster: Vec<Player> = (0..64)
        .map(|i| Player::new(format!("p{}", i), "", 1.0 + (i % 50) as f64 / 10.0))
        .collect();
    let record = MatchRecord::new(["p1", "p2"], ["p3", "p4"], TeamSide::Team1);

    c.bench_function("record_match_in_memory", |b| {
        b.iter_batched(
            || {
                let store = Arc::new(InMemoryPlayerStore::with_players(roster.clone()));
                RatingService::new(Arc::new(create_bench_engine()), store)
            },
            |service| black_box(service.record_match(&record)),
            BatchSize::SmallInput,
        )
    });
}

criterion_group!(
    benches,
    bench_rating_change,
    bench_settle_match,
    bench_initialize_rating,
    bench_record_match
);
criterion_main!(benches);
