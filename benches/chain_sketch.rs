use criterion::{criterion_group, criterion_main, BatchSize, Criterion, Throughput};
use rand::{rngs::StdRng, Rng, SeedableRng};

use hh_sketch::{ChainSketch, HeavyHitterBackend};

fn bench_chain_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("chain_insert");
    let mut rng = StdRng::seed_from_u64(0xC0FFEE);
    let keys: Vec<u32> = (0..100_000).map(|_| rng.random_range(0..20_000)).collect();

    group.throughput(Throughput::Elements(keys.len() as u64));
    group.bench_function("500KB", |b| {
        b.iter_batched(
            || ChainSketch::from_memory(500 * 1024, 1).unwrap(),
            |mut sketch| {
                for &key in &keys {
                    sketch.insert(key, 1);
                }
                sketch
            },
            BatchSize::LargeInput,
        );
    });
    group.finish();
}

criterion_group!(benches, bench_chain_insert);
criterion_main!(benches);
