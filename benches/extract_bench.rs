use criterion::{black_box, criterion_group, criterion_main, Criterion};
use driftmail::generator::extract_code;

fn bench_extract_code(c: &mut Criterion) {
    let labelled = "Welcome back! Your verification code is 482913. It expires in 10 minutes.";
    let fallback = "Thanks for signing up. Reference 583921 is attached to your request.";
    let miss = "Nothing to see here: no digits, no labels, just prose that keeps going on.";

    c.bench_function("extract_labelled", |b| {
        b.iter(|| extract_code(black_box(labelled)))
    });
    c.bench_function("extract_bare_fallback", |b| {
        b.iter(|| extract_code(black_box(fallback)))
    });
    c.bench_function("extract_miss", |b| b.iter(|| extract_code(black_box(miss))));
}

criterion_group!(benches, bench_extract_code);
criterion_main!(benches);
