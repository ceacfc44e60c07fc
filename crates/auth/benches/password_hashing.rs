use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use wms_auth::password::{self, HashingParams};

/// Per-derivation latency at the production cost and at reduced memory.
///
/// Each derivation holds `memory_cost` KiB, so these numbers together with
/// `LoginSettings::max_concurrent_hashes` bound login throughput and RSS.
fn bench_verify_by_memory_cost(c: &mut Criterion) {
    let mut group = c.benchmark_group("verify_by_memory_cost");
    group.sample_size(10);

    for memory_cost in [16 * 1024, 32 * 1024, HashingParams::DEFAULT.memory_cost] {
        let params = HashingParams {
            memory_cost,
            ..HashingParams::DEFAULT
        };
        let encoded = password::hash_with("benchmark-password", &params).unwrap();

        group.bench_with_input(BenchmarkId::from_parameter(memory_cost), &encoded, |b, encoded| {
            b.iter(|| password::verify(black_box(encoded), black_box("benchmark-password")).unwrap());
        });
    }

    group.finish();
}

fn bench_decode(c: &mut Criterion) {
    let encoded = password::hash("benchmark-password").unwrap();
    c.bench_function("decode_encoded_hash", |b| {
        b.iter(|| password::decode(black_box(&encoded)).unwrap());
    });
}

criterion_group!(benches, bench_verify_by_memory_cost, bench_decode);
criterion_main!(benches);
