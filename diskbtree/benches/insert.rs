use std::io::Cursor;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use libdiskbtree::*;

fn insert_all(keys: &[i64], degree: u32, cache: Option<usize>) -> u64
{
    let config = TreeConfig {
        degree,
        sequence_length: 12,
        cache_capacity: cache,
    };
    let mut tree = BTree::create_in(Cursor::new(Vec::new()), &config).unwrap();
    for key in keys {
        tree.insert(*key).unwrap();
    }
    tree.flush_cache().unwrap();
    tree.store_stats().writes
}

fn criterion_benchmark(c: &mut Criterion)
{
    let mut rng = StdRng::seed_from_u64(42);
    // drawn from a small key space so repeats are common, as in a genome
    let keys: Vec<i64> = (0..20_000).map(|_| rng.gen_range(0..4_i64.pow(8))).collect();

    let mut group = c.benchmark_group("insert 20k");
    for cache in [None, Some(100), Some(1000)] {
        let label = match cache {
            Some(capacity) => format!("cache {capacity}"),
            None => "no cache".to_string(),
        };
        group.bench_with_input(BenchmarkId::new("degree 16", &label), &cache, |b, cache| {
            b.iter(|| insert_all(black_box(&keys), 16, *cache))
        });
    }
    group.finish();

    c.bench_function("search 20k, block sized nodes", |b| {
        let config = TreeConfig::new(0, 12).with_cache(500);
        let mut tree = BTree::create_in(Cursor::new(Vec::new()), &config).unwrap();
        for key in &keys {
            tree.insert(*key).unwrap();
        }
        b.iter(|| {
            for key in &keys {
                black_box(tree.frequency(*key).unwrap());
            }
        })
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
