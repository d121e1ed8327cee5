use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::distributions::{Distribution, Uniform};
use sizedist::SizeDistribution;

fn criterion_benchmark(c: &mut Criterion) {
    let mut sd = SizeDistribution::new();
    let mut rng = rand::thread_rng();
    let between = Uniform::from(0..1000);

    c.bench_function("sizedist add", |b| {
        b.iter(|| {
            sd.add_observation(between.sample(&mut rng));
        })
    });

    c.bench_function("sizedist cdf after add", |b| {
        b.iter(|| {
            sd.add_observation(between.sample(&mut rng));
            black_box(sd.cdf(black_box(500)));
        })
    });

    sd.refresh();
    c.bench_function("sizedist fresh quantile", |b| {
        b.iter(|| black_box(sd.quantile(black_box(0.5))))
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
