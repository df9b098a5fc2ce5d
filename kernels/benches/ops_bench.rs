use criterion::{criterion_group, criterion_main, Criterion};
use recsys_rs_kernels::{cpu_index_select, cpu_matmul, cpu_sum_axis};
use std::hint::black_box;

fn benchmark_matmul(c: &mut Criterion) {
    let mut group = c.benchmark_group("matmul");

    // [batch, fields * embed] x [fields * embed, hidden], the shape of a deep tower input layer
    for &(batch, inputs, hidden) in &[(256, 360, 64), (1024, 360, 128), (1024, 1440, 256)] {
        let lhs = vec![0.5f32; batch * inputs];
        let rhs = vec![0.25f32; inputs * hidden];

        group.bench_function(format!("{batch}x{inputs}x{hidden}"), |b| {
            b.iter(|| {
                cpu_matmul(
                    black_box(&lhs),
                    black_box(&rhs),
                    black_box(&[batch, inputs]),
                    black_box(&[inputs, hidden]),
                )
                .unwrap()
            })
        });
    }
    group.finish();
}

fn benchmark_embedding_lookup(c: &mut Criterion) {
    let mut group = c.benchmark_group("index_select");
    let embed = 16;

    for &(rows, lookups) in &[(10_000, 4096), (100_000, 16_384)] {
        let table = vec![1.0f32; rows * embed];
        let ids: Vec<usize> = (0..lookups).map(|i| (i * 7919) % rows).collect();

        group.bench_function(format!("{rows}rows_{lookups}ids"), |b| {
            b.iter(|| cpu_index_select(black_box(&table), &[rows, embed], 0, black_box(&ids)).unwrap())
        });
    }
    group.finish();
}

fn benchmark_sum_axis(c: &mut Criterion) {
    let mut group = c.benchmark_group("sum_axis");
    let shape = [1024, 36, 16];
    let data = vec![1.0f32; shape.iter().product()];

    group.bench_function("fields", |b| {
        b.iter(|| cpu_sum_axis(black_box(&data), &shape, 1).unwrap())
    });
    group.finish();
}

criterion_group!(
    benches,
    benchmark_matmul,
    benchmark_embedding_lookup,
    benchmark_sum_axis
);
criterion_main!(benches);
