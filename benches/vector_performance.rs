//! Lane vector operations and executor throughput

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use gen_compute::isa::{Destination, Encoder, EncoderConfig, RegType, Source};
use gen_compute::{ops, GenVec, Simulator};
use gen_sim::{GenF1, GenU16, Lanes, SupportedWidth};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn random_vec<const N: usize>(rng: &mut StdRng) -> GenVec<f32, N>
where
    Lanes<N>: SupportedWidth,
{
    GenVec::from_fn(|_| rng.gen_range(-100.0..100.0))
}

fn bench_width<const N: usize>(c: &mut Criterion, label: &str)
where
    Lanes<N>: SupportedWidth,
{
    let mut rng = StdRng::seed_from_u64(7);
    let (a, b) = (random_vec::<N>(&mut rng), random_vec::<N>(&mut rng));
    let scale = GenF1::new(0.5);

    let mut group = c.benchmark_group(format!("lanes_{label}"));
    group.throughput(Throughput::Elements(GenVec::<f32, N>::LANES as u64));

    group.bench_function("add", |bench| bench.iter(|| black_box(ops::add(black_box(&a), black_box(&b)))));
    group.bench_function("mul_broadcast", |bench| {
        bench.iter(|| black_box(ops::mul(black_box(&a), black_box(&scale))))
    });
    group.bench_function("lt_select", |bench| {
        bench.iter(|| {
            let mask = ops::lt(black_box(&a), black_box(&b));
            black_box(ops::select(&mask, &a, &b))
        })
    });
    group.bench_function("native_loop", |bench| {
        let (x, y) = (a.to_vec(), b.to_vec());
        bench.iter(|| {
            let sum: Vec<f32> = x.iter().zip(&y).map(|(p, q)| p + q).collect();
            black_box(sum)
        })
    });

    group.finish();
}

fn benchmark_elementwise(c: &mut Criterion) {
    bench_width::<1>(c, "simd4");
    bench_width::<2>(c, "simd8");
    bench_width::<4>(c, "simd16");
    bench_width::<8>(c, "simd32");
}

fn benchmark_gather(c: &mut Criterion) {
    let data: Vec<u8> = (0..4096u32).flat_map(u32::to_le_bytes).collect();
    let mut rng = StdRng::seed_from_u64(11);
    let offsets = GenU16::from_fn(|_| rng.gen_range(0..1024u32) * 4);
    let mut out = vec![0u8; data.len()];

    let mut group = c.benchmark_group("memory_simd16");
    group.throughput(Throughput::Elements(16));
    group.bench_function("gather", |b| {
        b.iter(|| black_box(GenVec::<u32, 4>::gather(black_box(&data), &offsets).unwrap()))
    });
    group.bench_function("scatter", |b| {
        let v = GenVec::<u32, 4>::splat(9);
        b.iter(|| v.scatter(black_box(&mut out), &offsets).unwrap())
    });
    group.finish();
}

fn benchmark_simulator(c: &mut Criterion) {
    let mut group = c.benchmark_group("simulator");

    for length in [8, 64, 512] {
        let mut encoder = Encoder::new(EncoderConfig::simd16()).unwrap();
        for i in 0..length {
            let nr = 2 + (i % 32) as u8 * 2;
            encoder
                .add(Destination::grf(nr, RegType::F), Source::vector(nr, RegType::F), Source::imm_f(1.0))
                .unwrap();
        }
        encoder.eot(127).unwrap();
        let stream = encoder.into_stream();

        group.throughput(Throughput::Elements(length as u64 * 16));
        group.bench_with_input(BenchmarkId::from_parameter(length), &stream, |b, stream| {
            b.iter(|| {
                let mut sim = Simulator::default();
                black_box(sim.run(stream).unwrap())
            })
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_elementwise, benchmark_gather, benchmark_simulator);
criterion_main!(benches);
