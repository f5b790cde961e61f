//! Benchmarks comparing the four tree engines against `BTreeMap`.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use balanced_maps::{AvlLeafMap, AvlMap, OrderedMapEngine, RedBlackLeafMap, RedBlackMap};
use rand::rngs::StdRng;
use rand::{seq::SliceRandom, SeedableRng};
use std::collections::BTreeMap;

fn generate_shuffled_keys(n: usize) -> Vec<u64> {
    let mut keys: Vec<u64> = (0..n as u64).collect();
    let mut rng = StdRng::seed_from_u64(42);
    keys.shuffle(&mut rng);
    keys
}

fn fill<E: OrderedMapEngine<u64, u64>>(mut engine: E, keys: &[u64]) -> E {
    for (i, key) in keys.iter().enumerate() {
        engine.insert(*key, i as u64);
    }
    engine
}

fn bench_engine_insert<E: OrderedMapEngine<u64, u64>>(
    group: &mut criterion::BenchmarkGroup<'_, criterion::measurement::WallTime>,
    name: &str,
    size: usize,
    keys: &[u64],
    make: impl Fn() -> E,
) {
    group.bench_with_input(BenchmarkId::new(name, size), keys, |b, keys| {
        b.iter(|| black_box(fill(make(), keys)));
    });
}

fn bench_engine_lookup<E: OrderedMapEngine<u64, u64>>(
    group: &mut criterion::BenchmarkGroup<'_, criterion::measurement::WallTime>,
    name: &str,
    size: usize,
    keys: &[u64],
    make: impl Fn() -> E,
) {
    let engine = fill(make(), keys);
    group.bench_with_input(BenchmarkId::new(name, size), keys, |b, keys| {
        b.iter(|| {
            let mut sum = 0u64;
            for key in keys.iter() {
                if let Some(v) = engine.get(key) {
                    sum += *v;
                }
            }
            black_box(sum)
        });
    });
}

fn bench_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("insert");

    for size in [1_000, 10_000] {
        let keys = generate_shuffled_keys(size);

        bench_engine_insert(&mut group, "AvlMap", size, &keys, AvlMap::new);
        bench_engine_insert(&mut group, "AvlLeafMap", size, &keys, AvlLeafMap::new);
        bench_engine_insert(&mut group, "RedBlackMap", size, &keys, RedBlackMap::new);
        bench_engine_insert(&mut group, "RedBlackLeafMap", size, &keys, RedBlackLeafMap::new);

        group.bench_with_input(BenchmarkId::new("BTreeMap", size), &keys, |b, keys| {
            b.iter(|| {
                let mut map: BTreeMap<u64, u64> = BTreeMap::new();
                for (i, key) in keys.iter().enumerate() {
                    map.insert(*key, i as u64);
                }
                black_box(map)
            });
        });
    }

    group.finish();
}

fn bench_lookup(c: &mut Criterion) {
    let mut group = c.benchmark_group("lookup");

    for size in [1_000, 10_000] {
        let keys = generate_shuffled_keys(size);

        bench_engine_lookup(&mut group, "AvlMap", size, &keys, AvlMap::new);
        bench_engine_lookup(&mut group, "AvlLeafMap", size, &keys, AvlLeafMap::new);
        bench_engine_lookup(&mut group, "RedBlackMap", size, &keys, RedBlackMap::new);
        bench_engine_lookup(&mut group, "RedBlackLeafMap", size, &keys, RedBlackLeafMap::new);

        let mut btree: BTreeMap<u64, u64> = BTreeMap::new();
        for (i, key) in keys.iter().enumerate() {
            btree.insert(*key, i as u64);
        }
        group.bench_with_input(BenchmarkId::new("BTreeMap", size), &keys, |b, keys| {
            b.iter(|| {
                let mut sum = 0u64;
                for key in keys.iter() {
                    if let Some(v) = btree.get(key) {
                        sum += *v;
                    }
                }
                black_box(sum)
            });
        });
    }

    group.finish();
}

fn bench_churn(c: &mut Criterion) {
    let mut group = c.benchmark_group("churn");

    let size = 10_000;
    let keys = generate_shuffled_keys(size);

    fn churn<E: OrderedMapEngine<u64, u64>>(make: impl Fn() -> E, keys: &[u64]) -> E {
        let mut engine = fill(make(), keys);
        // Remove and re-insert the first half, exercising the delete fixups.
        for key in &keys[..keys.len() / 2] {
            engine.remove(key);
        }
        for key in &keys[..keys.len() / 2] {
            engine.insert(*key, 0);
        }
        engine
    }

    group.bench_function("AvlMap", |b| b.iter(|| black_box(churn(AvlMap::new, &keys))));
    group.bench_function("AvlLeafMap", |b| {
        b.iter(|| black_box(churn(AvlLeafMap::new, &keys)))
    });
    group.bench_function("RedBlackMap", |b| {
        b.iter(|| black_box(churn(RedBlackMap::new, &keys)))
    });
    group.bench_function("RedBlackLeafMap", |b| {
        b.iter(|| black_box(churn(RedBlackLeafMap::new, &keys)))
    });

    group.finish();
}

criterion_group!(benches, bench_insert, bench_lookup, bench_churn);
criterion_main!(benches);
