use cgmath::prelude::*;
use criterion::{black_box, criterion_group, Criterion};
use rand::prelude::*;

use sphgrid2d::sph::*;
use sphgrid2d::units::*;

fn bench_spatial_grid(c: &mut Criterion) {
    const NUM_PARTICLES: usize = 20000;
    const BOX_SIZE: Real = 400.0;
    let smooth_radius = black_box(4.0);

    let mut rng: rand::rngs::SmallRng = rand::SeedableRng::seed_from_u64(123456789);
    let particles: Vec<Particle> = std::iter::repeat_with(|| {
        Particle::new(ParticleDesc {
            radius: 1.0,
            position: Point::from_vec(rng.gen::<Vector>() * BOX_SIZE),
            velocity: Vector::zero(),
            smooth_radius,
            mass: 10.0,
            damping_factor: 1.0,
        })
        .unwrap()
    })
    .take(NUM_PARTICLES)
    .collect();

    let mut grid = SpatialGrid::for_box(BOX_SIZE, BOX_SIZE, smooth_radius);
    grid.rebuild(&particles);

    c.bench_function(
        &format!("spatial_grid.rebuild (warm), {} particles, {}x{} cells", NUM_PARTICLES, grid.width(), grid.height()),
        |b| b.iter(|| grid.rebuild(&particles)),
    );

    c.bench_function(
        &format!("spatial_grid.for_each_neighbor, {} particles, {} smooth_radius", NUM_PARTICLES, smooth_radius),
        |b| {
            let mut pindex = 0; // cycle through particles for a more balanced result
            b.iter(|| {
                let mut accum: Vector = Zero::zero();
                grid.for_each_neighbor(&particles, pindex, |j| {
                    accum += particles[j].position.to_vec();
                });
                pindex = (pindex + 1) % NUM_PARTICLES;
                accum
            })
        },
    );
}

fn config() -> Criterion {
    Criterion::default().sample_size(50)
}

criterion_group!(
    name = spatial_grid;
    config = config();
    targets = bench_spatial_grid
);
