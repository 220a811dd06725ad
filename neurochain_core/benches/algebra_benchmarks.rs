//! Benchmarks for sparse vector dispatch and chain passes
//!
//! Run with: cargo bench --bench algebra_benchmarks

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use neurochain_core::neural::{Activation, Component, ComponentChain, Layer, SoftMaxUnit};
use neurochain_core::{Vector, VectorBatch};

/// Basis and zero operands against their materialized equivalents
fn bench_vector_add(c: &mut Criterion) {
    let mut group = c.benchmark_group("vector_add");

    for len in [64usize, 1024, 16384] {
        let dense = Vector::from_vec((0..len).map(|i| i as f64 * 0.5).collect());
        let basis = Vector::unit(len, len / 2).unwrap();
        let basis_dense = basis.to_full();
        let zero = Vector::zeros(len);

        group.bench_with_input(BenchmarkId::new("dense_plus_dense", len), &len, |b, _| {
            b.iter(|| black_box(dense.add(&basis_dense).unwrap()));
        });
        group.bench_with_input(BenchmarkId::new("dense_plus_basis", len), &len, |b, _| {
            b.iter(|| black_box(dense.add(&basis).unwrap()));
        });
        group.bench_with_input(BenchmarkId::new("basis_plus_basis", len), &len, |b, _| {
            b.iter(|| black_box(basis.add(&basis).unwrap()));
        });
        group.bench_with_input(BenchmarkId::new("dense_plus_zero", len), &len, |b, _| {
            b.iter(|| black_box(dense.add(&zero).unwrap()));
        });
    }

    group.finish();
}

/// One forward and backward pass through a softmax classifier
fn bench_chain_step(c: &mut Criterion) {
    let mut group = c.benchmark_group("chain_step");

    for batch_size in [1usize, 32, 256] {
        let mut chain = ComponentChain::new();
        chain.add_trainable(Layer::random(64, 32, Activation::Tanh, 1)).unwrap();
        chain.add_trainable(Layer::random(32, 10, Activation::Identity, 2)).unwrap();
        chain.add_fixed(SoftMaxUnit::new(10)).unwrap();

        let rows: Vec<Vec<f64>> = (0..batch_size)
            .map(|r| (0..64).map(|c| ((r * 64 + c) % 17) as f64 / 17.0).collect())
            .collect();
        let input = VectorBatch::from_rows(&rows).unwrap();
        let gradient = VectorBatch::from_rows(&vec![vec![0.1; 10]; batch_size]).unwrap();

        group.bench_with_input(BenchmarkId::from_parameter(batch_size), &batch_size, |b, _| {
            b.iter(|| {
                chain.run(black_box(&input)).unwrap();
                black_box(chain.back_propagate(&gradient).unwrap());
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_vector_add, bench_chain_step);
criterion_main!(benches);
