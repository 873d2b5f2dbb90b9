use criterion::{black_box, criterion_group, Criterion};

use cgmath::prelude::*;
use sphgrid2d::sph::smoothing_kernel::*;
use sphgrid2d::units::*;

fn bench_kernels(c: &mut Criterion) {
    let smoothing_length = black_box(4.0);

    let ri_to_rj = black_box(Vector::new(1.0, 1.0) - Vector::new(-1.5, 2.0));
    let r = black_box(ri_to_rj.magnitude());

    {
        let kernel = black_box(Poly6::new(smoothing_length));
        c.bench_function("Poly6.evaluate", |b| b.iter(|| kernel.evaluate(r)));
        c.bench_function("Poly6.gradient", |b| b.iter(|| kernel.gradient(r)));
    }
    {
        let kernel = black_box(Spiky::new(smoothing_length));
        c.bench_function("Spiky.evaluate", |b| b.iter(|| kernel.evaluate(r)));
        c.bench_function("Spiky.gradient", |b| b.iter(|| kernel.gradient(r)));
    }
    // Free functions recompute the normalizer on every call.
    c.bench_function("density_kernel", |b| b.iter(|| density_kernel(r, smoothing_length)));
    c.bench_function("pressure_kernel_gradient", |b| b.iter(|| pressure_kernel_gradient(r, smoothing_length)));
}

fn config() -> Criterion {
    Criterion::default()
        .warm_up_time(core::time::Duration::new(0, 100))
        .sample_size(1000)
        .significance_level(0.1)
}

criterion_group!(
    name = smoothing_kernel;
    config = config();
    targets = bench_kernels
);
