use criterion::{criterion_group, criterion_main, Criterion};
use rand::rngs::StdRng;
use rand::SeedableRng;

use pvac::ops::{ct_add, ct_mul, ct_recrypt, dec_value, enc_value, make_evalkey};
use pvac::{keygen, Params};

fn bench_engine(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(0xbe9c);
    let (pk, sk) = keygen(&Params::default(), &mut rng).expect("keygen");
    let ek = make_evalkey(&pk, &sk, 8, 3, &mut rng);

    let x = enc_value(&pk, &sk, 2_016_733, &mut rng);
    let y = enc_value(&pk, &sk, 7_083_881, &mut rng);
    let p = ct_mul(&pk, &x, &y, &mut rng);
    let x2 = ct_mul(&pk, &x, &x, &mut rng);
    let x3 = ct_mul(&pk, &x2, &x, &mut rng);

    let mut group = c.benchmark_group("engine");
    group.sample_size(10);

    group.bench_function("enc", |b| {
        b.iter(|| enc_value(&pk, &sk, 42, &mut rng));
    });

    group.bench_function("add", |b| {
        b.iter(|| ct_add(&pk, &x, &y));
    });

    group.bench_function("mul", |b| {
        b.iter(|| ct_mul(&pk, &x, &y, &mut rng));
    });

    group.bench_function("dec", |b| {
        b.iter(|| dec_value(&pk, &sk, &p).expect("dec"));
    });

    group.bench_function("recrypt", |b| {
        b.iter(|| ct_recrypt(&pk, &ek, &x3, &mut rng));
    });

    group.finish();
}

criterion_group!(benches, bench_engine);
criterion_main!(benches);
