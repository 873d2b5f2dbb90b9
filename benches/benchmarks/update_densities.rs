use criterion::{black_box, criterion_group, Criterion};

use sphgrid2d::sph::*;

fn solver(execution: ExecutionMode) -> FluidSolver {
    let config = SimulationConfig::default();
    let bounds = SimulationBox::new(config.solver.box_width, config.solver.box_height).unwrap();
    let block = FluidBlock {
        jitter: 0.1,
        ..FluidBlock::from(&config.scenario)
    };
    let solver_config = SolverConfig {
        execution,
        ..config.solver
    };
    let mut solver = FluidSolver::new(block.build(&bounds).unwrap(), &solver_config).unwrap();
    // Builds the grid, the benchmarks below use grid neighbor search.
    solver.simulation_step(0.08, 1, bounds.width, bounds.height);
    solver
}

fn bench_update_densities(c: &mut Criterion) {
    for &execution in [ExecutionMode::Sequential, ExecutionMode::Parallel].iter() {
        let mut solver = solver(execution);
        c.bench_function(
            &format!(
                "bench_update_densities - FluidSolver with {} particles, {:?}",
                solver.particles().len(),
                execution
            ),
            |b| b.iter(|| solver.update_densities()),
        );
    }
}

fn bench_simulation_step(c: &mut Criterion) {
    let mut solver = solver(ExecutionMode::Parallel);
    let bounds = solver.simulation_bounds();
    c.bench_function(
        &format!("bench_simulation_step - FluidSolver with {} particles, 1 substep", solver.particles().len()),
        |b| b.iter(|| solver.simulation_step(black_box(0.08), 1, bounds.width, bounds.height)),
    );
}

criterion_group!(update_densities, bench_update_densities, bench_simulation_step);
