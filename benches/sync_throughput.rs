//! Throughput benchmarks for the sync core
//!
//! Measures the store/grid hot path at various population sizes to verify the
//! 1000+ concurrently moving agent target.
//!
//! Run with: cargo bench --bench sync_throughput

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::Rng;

use meridian_sync_server::util::vec3::Vec3;
use meridian_sync_server::world::store::WorldStore;

/// Populate a store with `count` identities spread across a square region
fn populate_store(count: usize, spread: f32) -> WorldStore {
    let store = WorldStore::new();
    let mut rng = rand::thread_rng();

    for i in 0..count {
        let position = Vec3::new(
            rng.gen_range(-spread..spread),
            0.0,
            rng.gen_range(-spread..spread),
        );
        store.move_player(&format!("agent-{i}"), position);
    }

    store
}

/// Pre-generate a wandering path so iterations measure the store, not the RNG
fn wander_path(len: usize, spread: f32) -> Vec<Vec3> {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| {
            Vec3::new(
                rng.gen_range(-spread..spread),
                0.0,
                rng.gen_range(-spread..spread),
            )
        })
        .collect()
}

/// Benchmark position updates against an existing population
fn bench_move_player(c: &mut Criterion) {
    let mut group = c.benchmark_group("move_player");
    group.sample_size(50);

    for count in [100, 1000, 5000] {
        let store = populate_store(count, 1000.0);
        let path = wander_path(1024, 1000.0);

        group.throughput(Throughput::Elements(1));
        group.bench_with_input(BenchmarkId::new("cell_crossing", count), &count, |b, _| {
            let mut step = 0usize;
            b.iter(|| {
                store.move_player("agent-0", path[step % path.len()]);
                step += 1;
            });
        });

        group.bench_with_input(BenchmarkId::new("same_cell", count), &count, |b, _| {
            let anchor = Vec3::new(10.0, 0.0, 10.0);
            store.move_player("agent-0", anchor);
            b.iter(|| {
                // Stays inside one cell: exercises the fast path
                store.move_player("agent-0", black_box(Vec3::new(12.0, 0.0, 9.0)));
            });
        });
    }

    group.finish();
}

/// Benchmark neighborhood queries at various population densities
fn bench_query_neighbors(c: &mut Criterion) {
    let mut group = c.benchmark_group("query_neighbors");
    group.sample_size(50);

    for count in [100, 1000, 5000] {
        let store = populate_store(count, 1000.0);
        let path = wander_path(1024, 1000.0);

        group.throughput(Throughput::Elements(1));
        group.bench_with_input(BenchmarkId::new("random_center", count), &count, |b, _| {
            let mut step = 0usize;
            b.iter(|| {
                let neighbors = store.query_neighbors(path[step % path.len()]);
                step += 1;
                black_box(neighbors)
            });
        });
    }

    group.finish();
}

/// Benchmark the per-agent inner loop of a batched update:
/// move, query, assemble observer states
fn bench_update_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("update_pipeline");
    group.sample_size(50);

    for count in [100, 1000, 5000] {
        let store = populate_store(count, 1000.0);
        let path = wander_path(1024, 1000.0);

        group.throughput(Throughput::Elements(1));
        group.bench_with_input(BenchmarkId::new("move_query_assemble", count), &count, |b, _| {
            let mut step = 0usize;
            b.iter(|| {
                let position = path[step % path.len()];
                step += 1;

                let state = store.move_player("agent-0", position);
                let observers = store.query_neighbors(position);
                let players: Vec<_> = observers
                    .iter()
                    .filter(|id| id.as_str() != "agent-0")
                    .filter_map(|id| store.get(id))
                    .chain(std::iter::once(state))
                    .collect();
                black_box(players)
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_move_player,
    bench_query_neighbors,
    bench_update_pipeline
);
criterion_main!(benches);
