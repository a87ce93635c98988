//! Benchmarks for Reed-Solomon erasure coding
//!
//! Run with: cargo bench --package fragvault-core

use bytes::Bytes;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use fragvault_core::{ProfileId, RedundancyProfile};

/// Generate test data of specified size
fn generate_data(size: usize) -> Vec<u8> {
    (0..size).map(|i| (i % 251) as u8).collect()
}

/// Encoding throughput per profile
fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("erasure_encode");

    for id in ProfileId::ALL {
        let encoder = RedundancyProfile::fallback(id).encoder().unwrap();
        for size in [64 * 1024, 1024 * 1024, 8 * 1024 * 1024] {
            let data = generate_data(size);
            group.throughput(Throughput::Bytes(size as u64));
            group.bench_with_input(
                BenchmarkId::new(id.as_str(), format!("{}KB", size / 1024)),
                &data,
                |b, data| b.iter(|| encoder.encode(black_box(data))),
            );
        }
    }

    group.finish();
}

/// Parallel vs sequential encode on larger inputs
fn bench_encode_parallel(c: &mut Criterion) {
    let encoder = RedundancyProfile::fallback(ProfileId::Medium)
        .encoder()
        .unwrap();
    let mut group = c.benchmark_group("erasure_encode_parallel");

    for size in [4 * 1024 * 1024, 32 * 1024 * 1024] {
        let data = generate_data(size);
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(
            BenchmarkId::new("parallel", format!("{}MB", size / (1024 * 1024))),
            &data,
            |b, data| b.iter(|| encoder.encode_parallel(black_box(data))),
        );
    }

    group.finish();
}

/// Reconstruction: data-only gather vs parity-dependent recovery
fn bench_reconstruct(c: &mut Criterion) {
    let profile = RedundancyProfile::fallback(ProfileId::High);
    let encoder = profile.encoder().unwrap();
    let size = 4 * 1024 * 1024;
    let data = generate_data(size);
    let fragments = encoder.encode(&data).unwrap();

    let all: Vec<(usize, Bytes)> = fragments
        .iter()
        .map(|f| (f.index, f.payload.clone()))
        .collect();
    let data_only = all[..profile.data_fragments()].to_vec();
    let parity_heavy = all[profile.parity_fragments()..].to_vec();

    let mut group = c.benchmark_group("erasure_reconstruct");
    group.throughput(Throughput::Bytes(size as u64));
    group.bench_function("data_only", |b| {
        b.iter(|| encoder.reconstruct(black_box(&data_only), size))
    });
    group.bench_function("parity_heavy", |b| {
        b.iter(|| encoder.reconstruct(black_box(&parity_heavy), size))
    });
    group.finish();
}

criterion_group!(benches, bench_encode, bench_encode_parallel, bench_reconstruct);
criterion_main!(benches);
