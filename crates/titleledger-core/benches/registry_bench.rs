//! # Registry Benchmarks
//!
//! Performance benchmarks for titleledger-core registry operations.
//!
//! Run with: `cargo bench -p titleledger-core`

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use titleledger_core::{MemoryLedger, Registry, decode_index, encode_index};

fn title_args(id: &str) -> Vec<String> {
    [id, "1HGCM82633A004352", "Honda", "Civic", "ABC123", "Alice"]
        .iter()
        .map(|v| (*v).to_string())
        .collect()
}

/// A registry holding `size` titles.
fn populated_registry(size: usize) -> Registry<MemoryLedger> {
    let registry = Registry::new(MemoryLedger::new());
    registry.initialize(&["0".to_string()]).expect("init");
    for i in 0..size {
        registry
            .create_title(&title_args(&format!("V{}", i)))
            .expect("create");
    }
    registry
}

// =============================================================================
// BENCHMARKS
// =============================================================================

fn bench_create(c: &mut Criterion) {
    let mut group = c.benchmark_group("create_title");

    for size in [10, 100, 1000].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            b.iter(|| black_box(populated_registry(size)));
        });
    }

    group.finish();
}

fn bench_create_delete_cycle(c: &mut Criterion) {
    let mut group = c.benchmark_group("create_delete_cycle");

    for size in [100, 1000].iter() {
        let registry = populated_registry(*size);
        let args = title_args("cycle");
        let id = vec!["cycle".to_string()];
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| {
                registry.create_title(black_box(&args)).expect("create");
                registry.delete_title(black_box(&id)).expect("delete");
            });
        });
    }

    group.finish();
}

fn bench_index_codec(c: &mut Criterion) {
    let mut group = c.benchmark_group("index_codec");

    for size in [100, 1000, 10000].iter() {
        let ids: Vec<String> = (0..*size).map(|i| format!("V{}", i)).collect();
        let bytes = encode_index(&ids).expect("encode");
        group.bench_with_input(BenchmarkId::new("encode", size), &ids, |b, ids| {
            b.iter(|| encode_index(black_box(ids)).expect("encode"));
        });
        group.bench_with_input(BenchmarkId::new("decode", size), &bytes, |b, bytes| {
            b.iter(|| decode_index(black_box(bytes)).expect("decode"));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_create,
    bench_create_delete_cycle,
    bench_index_codec
);
criterion_main!(benches);
