use criterion::{criterion_group, criterion_main, Criterion};
use okapi_core::normalize::normalize;

fn bench_normalize(c: &mut Criterion) {
    let text = include_str!("../README.md");
    c.bench_function("normalize_readme", |b| b.iter(|| normalize(text).count()));
}

criterion_group!(benches, bench_normalize);
criterion_main!(benches);
