use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion, Throughput};
use rand::{rngs::StdRng, SeedableRng};
use rand_distr::{Distribution, Zipf};

use hh_sketch::{SketchConfig, TwoFaSketch};

fn zipf_stream(packets: usize, flows: u32, alpha: f64, seed: u64) -> Vec<u32> {
    let mut rng = StdRng::seed_from_u64(seed);
    let zipf = Zipf::new(flows as f64, alpha).unwrap();
    (0..packets).map(|_| zipf.sample(&mut rng) as u32).collect()
}

fn bench_two_phase_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("two_fa_insert");
    let packets = 100_000;
    let memory_kb = [100usize, 500];
    let alphas = [0.4f64, 1.0];

    for &alpha in &alphas {
        let stream = zipf_stream(packets, 100_000, alpha, 0xC0FFEE);
        for &kb in &memory_kb {
            group.throughput(Throughput::Elements(packets as u64));
            let bench_id = BenchmarkId::new(format!("alpha{alpha}"), format!("{kb}KB"));
            group.bench_with_input(bench_id, &kb, |b, &kb| {
                b.iter_batched(
                    || TwoFaSketch::from_config(SketchConfig::from_memory(kb * 1024, 5)).unwrap(),
                    |mut sketch| {
                        for &id in &stream {
                            sketch.insert(id, 1);
                        }
                        sketch
                    },
                    BatchSize::LargeInput,
                );
            });
        }
    }
    group.finish();
}

fn bench_two_phase_query(c: &mut Criterion) {
    let mut group = c.benchmark_group("two_fa_query");
    let stream = zipf_stream(100_000, 100_000, 1.0, 0xFACEFEED);
    let mut sketch = TwoFaSketch::from_config(SketchConfig::from_memory(500 * 1024, 5)).unwrap();
    for &id in &stream {
        sketch.insert(id, 1);
    }
    group.throughput(Throughput::Elements(stream.len() as u64));
    group.bench_function("500KB", |b| {
        b.iter(|| {
            for &id in &stream {
                std::hint::black_box(sketch.query(id));
            }
        });
    });
    group.bench_function("extract_500KB", |b| {
        b.iter(|| std::hint::black_box(sketch.extract_heavy_hitters(10, 1_000)));
    });
    group.finish();
}

criterion_group!(benches, bench_two_phase_insert, bench_two_phase_query);
criterion_main!(benches);
