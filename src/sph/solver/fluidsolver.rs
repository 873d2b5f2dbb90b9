use super::super::config::SolverConfig;
use super::super::particle::{Particle, SimulationBox};
use super::super::smoothing_kernel::{self, Kernel};
use super::super::spatial_grid::{ParticleIndex, SpatialGrid};
use super::execution::ExecutionMode;
use super::timings::StepTimings;
use super::Solver;
use crate::error::SphError;
use crate::units::*;
use cgmath::prelude::*;
use microprofile::scope;
use rayon::prelude::*;
use std::time::Instant;

/// Where neighbors come from.
///
/// The grid is only built at the end of the first step, so until then every particle is a neighbor of every other.
/// Transitions once, `Unindexed` -> `Indexed`, and never back.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum NeighborSearch {
    Unindexed,
    Indexed,
}

#[derive(Copy, Clone)]
struct Neighborhood<'a> {
    particles: &'a [Particle],
    grid: &'a SpatialGrid,
    search: NeighborSearch,
}

impl<'a> Neighborhood<'a> {
    #[inline(always)]
    fn for_each(&self, i: usize, mut f: impl FnMut(usize, &Particle)) {
        match self.search {
            NeighborSearch::Unindexed => {
                for (j, pj) in self.particles.iter().enumerate() {
                    f(j, pj);
                }
            }
            NeighborSearch::Indexed => {
                let particles = self.particles;
                self.grid.for_each_neighbor(particles, i, |j| f(j, &particles[j]));
            }
        }
    }
}

/// Density of a single particle at rest with no neighbors, `mass * W_spiky(0)`.
pub fn rest_density_for(mass: Real, smooth_radius: Real) -> Real {
    mass * smoothing_kernel::pressure_kernel(0.0, smooth_radius)
}

/// Weakly compressible SPH with an equation of state `p = k (ρ - ρ0)` clamped to >= 0,
/// spiky-kernel density, poly6-derivative viscosity and penalty boundary forces.
///
/// Each substep runs density -> pressure -> pressure & viscosity forces -> gravity -> integration -> grid rebuild.
/// Within a phase, particle i only writes its own fields and reads results of previous phases,
/// so the per-particle loops can run in parallel.
pub struct FluidSolver {
    particles: Vec<Particle>,
    grid: SpatialGrid,
    search: NeighborSearch,

    rest_density: Real,      // ρ0
    pressure_constant: Real, // k
    viscosity_constant: Real,
    gravity: Vector,
    simulation_box: SimulationBox,

    execution: ExecutionMode,
    verbose: bool,

    // Phase results before they are written back to the particles. Kept to avoid reallocation.
    densities: Vec<Real>,
    forces: Vec<Vector>,
}

impl FluidSolver {
    pub fn new(particles: Vec<Particle>, config: &SolverConfig) -> Result<FluidSolver, SphError> {
        let first = particles.first().ok_or(SphError::NoParticles)?;
        let smooth_radius = first.smooth_radius();
        if let Some(p) = particles.iter().find(|p| p.smooth_radius() != smooth_radius) {
            return Err(SphError::MixedSmoothRadius {
                expected: smooth_radius,
                found: p.smooth_radius(),
            });
        }

        let simulation_box = SimulationBox::new(config.box_width, config.box_height)?;
        let rest_density = config
            .rest_density
            .unwrap_or_else(|| rest_density_for(first.mass(), smooth_radius));
        if !rest_density.is_finite() {
            return Err(SphError::NonFinite("rest density"));
        }
        if !config.pressure_constant.is_finite() {
            return Err(SphError::NonFinite("pressure constant"));
        }
        if !config.viscosity_constant.is_finite() {
            return Err(SphError::NonFinite("viscosity constant"));
        }
        if !(config.gravity[0].is_finite() && config.gravity[1].is_finite()) {
            return Err(SphError::NonFinite("gravity"));
        }

        let grid = SpatialGrid::for_box(simulation_box.width, simulation_box.height, smooth_radius);
        log::debug!(
            "fluid solver with {} particles, {}x{} grid, rest density {}, execution {:?}",
            particles.len(),
            grid.width(),
            grid.height(),
            rest_density,
            config.execution
        );

        Ok(FluidSolver {
            particles,
            grid,
            search: NeighborSearch::Unindexed,

            rest_density,
            pressure_constant: config.pressure_constant,
            viscosity_constant: config.viscosity_constant,
            gravity: Vector::new(config.gravity[0], config.gravity[1]),
            simulation_box,

            execution: config.execution,
            verbose: config.verbose,

            densities: Vec::new(),
            forces: Vec::new(),
        })
    }

    pub fn rest_density(&self) -> Real {
        self.rest_density
    }

    pub fn neighbor_search(&self) -> NeighborSearch {
        self.search
    }

    pub fn grid(&self) -> &SpatialGrid {
        &self.grid
    }

    fn neighborhood(&self) -> Neighborhood<'_> {
        Neighborhood {
            particles: &self.particles,
            grid: &self.grid,
            search: self.search,
        }
    }

    /// Neighbor candidates of particle i, including i itself.
    /// All particles before the first step, afterwards the grid-pruned set within the smoothing radius.
    /// Empty for an index that is not a particle.
    pub fn query_neighborhood(&self, i: usize) -> Vec<ParticleIndex> {
        let mut neighbors = Vec::new();
        if i >= self.particles.len() {
            return neighbors;
        }
        self.neighborhood().for_each(i, |j, _| neighbors.push(j as ParticleIndex));
        neighbors
    }

    #[inline]
    fn density_at(neighborhood: &Neighborhood<'_>, i: usize) -> Real {
        let pi = &neighborhood.particles[i];
        let kernel = pi.pressure_kernel();
        let mut density = 0.0;
        // self-contribution included, W(0) > 0
        neighborhood.for_each(i, |_, pj| {
            let r = (pj.position - pi.position).magnitude();
            density += pj.mass() * kernel.evaluate(r);
        });
        density
    }

    // Equation of State (EOS). No negative pressure, i.e. no tension.
    #[inline]
    fn pressure_from_density(pressure_constant: Real, rest_density: Real, density: Real) -> Real {
        (pressure_constant * (density - rest_density)).max(0.0)
    }

    /// Pressure and viscosity force on particle i, merged to get away with a single neighbor scan.
    #[inline]
    fn interaction_force_at(neighborhood: &Neighborhood<'_>, viscosity_constant: Real, i: usize) -> Vector {
        let pi = &neighborhood.particles[i];
        let mut force = Vector::zero();

        neighborhood.for_each(i, |j, pj| {
            if j == i {
                return;
            }
            // A particle without density has no volume to interpolate with.
            if pj.density <= 0.0 {
                return;
            }
            let ri_to_rj = pj.position - pi.position;
            let r = ri_to_rj.magnitude();
            let volume_j = pj.mass() / pj.density;

            // Gradient is <= 0, so this pushes i away from j.
            let gradient = pi.pressure_kernel().gradient(r);
            if gradient != 0.0 {
                if let Ok(direction) = ri_to_rj.try_normalize() {
                    let pressure_middle = (pi.pressure + pj.pressure) / 2.0;
                    force += direction * (pressure_middle * gradient * volume_j);
                }
            }

            let laplacian = pi.density_kernel().gradient(r);
            force += (pj.velocity - pi.velocity) * (-viscosity_constant * laplacian * volume_j);
        });

        force
    }

    /// Density phase on its own, the remaining phases read its results.
    pub fn update_densities(&mut self) {
        microprofile::scope!("FluidSolver", "density");
        let neighborhood = Neighborhood {
            particles: &self.particles,
            grid: &self.grid,
            search: self.search,
        };
        self.execution
            .map_indexed(self.particles.len(), &mut self.densities, |i| Self::density_at(&neighborhood, i));
        self.execution
            .for_each_zip_mut(&mut self.particles, &self.densities, |p, &density| p.density = density);
    }

    fn pressure_pass(&mut self) {
        microprofile::scope!("FluidSolver", "pressure");
        let pressure_constant = self.pressure_constant;
        let rest_density = self.rest_density;
        self.execution.for_each_mut(&mut self.particles, |p| {
            p.pressure = Self::pressure_from_density(pressure_constant, rest_density, p.density);
        });
    }

    fn interaction_force_pass(&mut self) {
        microprofile::scope!("FluidSolver", "forces");
        let neighborhood = Neighborhood {
            particles: &self.particles,
            grid: &self.grid,
            search: self.search,
        };
        let viscosity_constant = self.viscosity_constant;
        self.execution.map_indexed(self.particles.len(), &mut self.forces, |i| {
            Self::interaction_force_at(&neighborhood, viscosity_constant, i)
        });
        self.execution
            .for_each_zip_mut(&mut self.particles, &self.forces, |p, &force| p.apply_force(force));
    }

    fn gravity_pass(&mut self) {
        microprofile::scope!("FluidSolver", "gravity");
        let gravity = self.gravity;
        self.execution.for_each_mut(&mut self.particles, |p| {
            let weight = gravity * p.mass();
            p.apply_force(weight);
        });
    }

    fn integration_pass(&mut self, dt: Real, bounds: &SimulationBox) {
        microprofile::scope!("FluidSolver", "integrate");
        self.execution.for_each_mut(&mut self.particles, |p| p.integrate(dt, bounds));
    }

    fn rebuild_grid(&mut self) {
        // Grid is empty before the first rebuild, clearing it is a no-op then.
        self.grid.rebuild(&self.particles);
        if self.search == NeighborSearch::Unindexed {
            log::debug!("spatial grid built, switching to grid neighbor search");
            self.search = NeighborSearch::Indexed;
        }
    }

    /// Runs the full pipeline once with a fixed `dt` inside `bounds`.
    pub fn substep(&mut self, dt: Real, bounds: &SimulationBox) -> StepTimings {
        microprofile::scope!("FluidSolver", "substep");
        let mut timings = StepTimings {
            substeps: 1,
            ..Default::default()
        };

        let start = Instant::now();
        self.update_densities();
        let density_done = Instant::now();
        self.pressure_pass();
        let pressure_done = Instant::now();
        self.interaction_force_pass();
        self.gravity_pass();
        let forces_done = Instant::now();
        self.integration_pass(dt, bounds);
        let integration_done = Instant::now();
        self.rebuild_grid();
        let rebuild_done = Instant::now();

        timings.density = density_done - start;
        timings.pressure = pressure_done - density_done;
        timings.forces = forces_done - pressure_done;
        timings.integration = integration_done - forces_done;
        timings.grid_rebuild = rebuild_done - integration_done;
        timings
    }

    /// Density field at an arbitrary point, `Σ m_j W_spiky(|x - x_j|)` over all particles.
    pub fn sample_density(&self, point: Point) -> Real {
        self.particles
            .iter()
            .map(|pj| pj.mass() * pj.pressure_kernel().evaluate((pj.position - point).magnitude()))
            .sum()
    }

    /// Samples the density field on integer coordinates, row-major `width * height`.
    pub fn density_field(&self, width: usize, height: usize) -> Vec<Real> {
        microprofile::scope!("FluidSolver", "density_field");
        let mut field = vec![0.0; width * height];
        if width == 0 {
            return field;
        }
        field.par_chunks_mut(width).enumerate().for_each(|(y, row)| {
            for (x, value) in row.iter_mut().enumerate() {
                *value = self.sample_density(Point::new(x as Real, y as Real));
            }
        });
        field
    }
}

impl Solver for FluidSolver {
    fn simulation_step(&mut self, dt: Real, substeps: usize, viewport_width: Real, viewport_height: Real) -> StepTimings {
        microprofile::scope!("FluidSolver", "simulation_step");
        // A collapsed viewport (e.g. a minimized window) has no room for the fluid, wait for it to come back.
        let viewport = match SimulationBox::new(viewport_width, viewport_height) {
            Ok(viewport) => viewport,
            Err(err) => {
                log::warn!("skipping simulation step: {}", err);
                return StepTimings::default();
            }
        };
        let bounds = self.simulation_box.clamped_to(viewport.width, viewport.height);

        let mut timings = StepTimings::default();
        for _ in 0..substeps {
            timings += self.substep(dt, &bounds);
        }

        if self.verbose {
            log::info!("{}", timings);
        }
        timings
    }

    fn particles(&self) -> &[Particle] {
        &self.particles
    }

    fn simulation_bounds(&self) -> SimulationBox {
        self.simulation_box
    }
}

#[cfg(test)]
mod tests {
    use super::super::super::particle::ParticleDesc;
    use super::super::super::scenario::FluidBlock;
    use super::*;
    use more_asserts::{assert_ge, assert_gt, assert_lt};

    fn particle(x: Real, y: Real) -> Particle {
        Particle::new(ParticleDesc {
            radius: 1.0,
            position: Point::new(x, y),
            velocity: Vector::zero(),
            smooth_radius: 4.0,
            mass: 10.0,
            damping_factor: 1.0,
        })
        .unwrap()
    }

    fn config(rest_density: Real) -> SolverConfig {
        SolverConfig {
            rest_density: Some(rest_density),
            pressure_constant: 100.0,
            viscosity_constant: 0.0,
            gravity: [0.0, 0.0],
            box_width: 100.0,
            box_height: 100.0,
            execution: ExecutionMode::Sequential,
            verbose: false,
        }
    }

    fn block_solver(execution: ExecutionMode) -> FluidSolver {
        let block = FluidBlock {
            particle_amount: 100,
            jitter: 0.3,
            ..Default::default()
        };
        let solver_config = SolverConfig {
            execution,
            ..Default::default()
        };
        let bounds = SimulationBox::new(solver_config.box_width, solver_config.box_height).unwrap();
        FluidSolver::new(block.build(&bounds).unwrap(), &solver_config).unwrap()
    }

    #[test]
    fn rejects_invalid_setup() {
        assert_eq!(FluidSolver::new(Vec::new(), &config(0.0)).err(), Some(SphError::NoParticles));

        let mut particles = vec![particle(1.0, 1.0)];
        particles.push(
            Particle::new(ParticleDesc {
                radius: 1.0,
                position: Point::new(5.0, 5.0),
                velocity: Vector::zero(),
                smooth_radius: 2.0,
                mass: 10.0,
                damping_factor: 1.0,
            })
            .unwrap(),
        );
        assert!(matches!(
            FluidSolver::new(particles, &config(0.0)),
            Err(SphError::MixedSmoothRadius { .. })
        ));

        let bad_box = SolverConfig {
            box_width: -1.0,
            ..config(0.0)
        };
        assert!(matches!(
            FluidSolver::new(vec![particle(1.0, 1.0)], &bad_box),
            Err(SphError::InvalidBox { .. })
        ));
    }

    #[test]
    fn default_rest_density_is_single_particle_density() {
        let solver = FluidSolver::new(vec![particle(1.0, 1.0)], &SolverConfig::default()).unwrap();
        let expected = 10.0 * 6.0 / (std::f64::consts::PI * 16.0);
        assert_lt!((solver.rest_density() - expected).abs(), 1e-12);
    }

    #[test]
    fn first_step_uses_all_particles() {
        let particles = vec![particle(1.0, 1.0), particle(50.0, 50.0), particle(90.0, 10.0)];
        let mut solver = FluidSolver::new(particles, &config(0.0)).unwrap();
        assert_eq!(solver.neighbor_search(), NeighborSearch::Unindexed);
        assert_eq!(solver.query_neighborhood(0), vec![0, 1, 2]);
        assert_eq!(solver.query_neighborhood(1), vec![0, 1, 2]);

        solver.simulation_step(0.01, 1, 1000.0, 1000.0);
        assert_eq!(solver.neighbor_search(), NeighborSearch::Indexed);
        assert_eq!(solver.query_neighborhood(0), vec![0]);
        assert_eq!(solver.query_neighborhood(1), vec![1]);
    }

    #[test]
    fn grid_neighborhood_matches_brute_force() {
        let mut solver = block_solver(ExecutionMode::Sequential);
        solver.simulation_step(0.05, 3, 1000.0, 1000.0);

        let particles = solver.particles();
        for i in 0..particles.len() {
            let h_sq = particles[i].smooth_radius() * particles[i].smooth_radius();
            let mut expected: Vec<ParticleIndex> = (0..particles.len())
                .filter(|&j| (particles[j].position - particles[i].position).magnitude2() <= h_sq)
                .map(|j| j as ParticleIndex)
                .collect();
            let mut found = solver.query_neighborhood(i);
            expected.sort_unstable();
            found.sort_unstable();
            assert_eq!(found, expected, "neighborhood of particle {}", i);
        }
    }

    #[test]
    fn density_is_positive() {
        let mut solver = block_solver(ExecutionMode::Parallel);
        solver.update_densities();
        for p in solver.particles() {
            assert_gt!(p.density, 0.0);
        }
    }

    #[test]
    fn pressure_is_never_negative() {
        let mut solver = block_solver(ExecutionMode::Sequential);
        solver.update_densities();
        let mean_density = solver.particles().iter().map(|p| p.density).sum::<Real>() / solver.particles().len() as Real;
        solver.rest_density = mean_density;
        solver.pressure_pass();

        let mut num_compressed = 0;
        for p in solver.particles() {
            assert_ge!(p.pressure, 0.0);
            if p.density <= mean_density {
                assert_eq!(p.pressure, 0.0);
            } else {
                assert_gt!(p.pressure, 0.0);
                num_compressed += 1;
            }
        }
        assert_gt!(num_compressed, 0);
    }

    #[test]
    fn pairwise_pressure_force_is_symmetric_and_repulsive() {
        let mut solver = FluidSolver::new(vec![particle(10.0, 10.0), particle(12.5, 11.0)], &config(0.0)).unwrap();
        solver.update_densities();
        solver.pressure_pass();
        assert_eq!(solver.particles()[0].density, solver.particles()[1].density);
        assert_gt!(solver.particles()[0].pressure, 0.0);

        let neighborhood = solver.neighborhood();
        let force_on_a = FluidSolver::interaction_force_at(&neighborhood, 0.0, 0);
        let force_on_b = FluidSolver::interaction_force_at(&neighborhood, 0.0, 1);

        assert_lt!((force_on_a + force_on_b).magnitude(), 1e-12);
        let a_to_b = solver.particles()[1].position - solver.particles()[0].position;
        assert_lt!(force_on_a.dot(a_to_b), 0.0);
        assert_gt!(force_on_b.dot(a_to_b), 0.0);
    }

    #[test]
    fn viscosity_pulls_velocities_together() {
        let mut particles = vec![particle(10.0, 10.0), particle(12.0, 10.0)];
        particles[1].velocity = Vector::new(0.0, 1.0);
        let solver_config = SolverConfig {
            rest_density: Some(1000.0), // no pressure
            viscosity_constant: 5.0,
            ..config(0.0)
        };
        let mut solver = FluidSolver::new(particles, &solver_config).unwrap();
        solver.update_densities();
        solver.pressure_pass();

        let neighborhood = solver.neighborhood();
        let force_on_a = FluidSolver::interaction_force_at(&neighborhood, 5.0, 0);
        let force_on_b = FluidSolver::interaction_force_at(&neighborhood, 5.0, 1);
        assert_gt!(force_on_a.y, 0.0);
        assert_lt!(force_on_b.y, 0.0);
        assert_eq!(force_on_a.x, 0.0);
    }

    #[test]
    fn zero_density_neighbor_is_skipped() {
        let mut solver = FluidSolver::new(vec![particle(10.0, 10.0), particle(12.0, 10.0)], &config(0.0)).unwrap();
        solver.update_densities();
        solver.pressure_pass();
        solver.particles[1].density = 0.0;

        let neighborhood = solver.neighborhood();
        let force = FluidSolver::interaction_force_at(&neighborhood, 5.0, 0);
        assert_eq!(force, Vector::zero());
    }

    #[test]
    fn overlapping_particles_stay_finite() {
        let mut solver = FluidSolver::new(vec![particle(10.0, 10.0), particle(10.0, 10.0)], &config(0.0)).unwrap();
        solver.simulation_step(0.01, 2, 100.0, 100.0);
        for p in solver.particles() {
            assert!(p.position.x.is_finite() && p.position.y.is_finite());
            assert!(p.velocity.x.is_finite() && p.velocity.y.is_finite());
        }
    }

    #[test]
    fn symmetric_square_keeps_center_of_mass_at_rest() {
        let particles = vec![
            particle(10.0, 10.0),
            particle(13.0, 10.0),
            particle(10.0, 13.0),
            particle(13.0, 13.0),
        ];
        let mut solver = FluidSolver::new(particles, &config(0.0)).unwrap();
        let timings = solver.simulation_step(0.01, 1, 1000.0, 1000.0);
        assert_eq!(timings.substeps, 1);

        let particles = solver.particles();
        let density = particles[0].density;
        assert_gt!(density, 0.0);
        for p in particles {
            assert_lt!((p.density - density).abs(), 1e-12 * density);
        }

        let momentum = particles
            .iter()
            .fold(Vector::zero(), |sum, p| sum + p.velocity * p.mass());
        assert_lt!(momentum.magnitude(), 1e-9);

        // pressure pushed the square apart
        assert_gt!((particles[1].position - particles[0].position).magnitude(), 3.0);
        assert_gt!((particles[2].position - particles[0].position).magnitude(), 3.0);
    }

    #[test]
    fn gravity_accelerates_uniformly() {
        let solver_config = SolverConfig {
            gravity: [0.0, 2.0],
            rest_density: Some(1000.0),
            ..config(0.0)
        };
        let mut solver = FluidSolver::new(vec![particle(50.0, 50.0)], &solver_config).unwrap();
        solver.simulation_step(0.1, 1, 100.0, 100.0);
        let p = &solver.particles()[0];
        assert_lt!((p.velocity.y - 0.2).abs(), 1e-12);
        assert_lt!((p.position.y - (50.0 + 0.5 * 2.0 * 0.01)).abs(), 1e-12);
    }

    #[test]
    fn viewport_limits_the_box() {
        // Right wall of the configured box is at 100, the viewport moves it to 20.
        let mut solver = FluidSolver::new(vec![particle(19.5, 50.0)], &config(1000.0)).unwrap();
        solver.simulation_step(0.01, 1, 20.0, 1000.0);
        assert_lt!(solver.particles()[0].velocity.x, 0.0);
        assert_eq!(solver.simulation_bounds(), SimulationBox::new(100.0, 100.0).unwrap());
    }

    #[test]
    fn sequential_and_parallel_agree() {
        let mut sequential = block_solver(ExecutionMode::Sequential);
        let mut parallel = block_solver(ExecutionMode::Parallel);
        for _ in 0..3 {
            sequential.simulation_step(0.08, 5, 200.0, 300.0);
            parallel.simulation_step(0.08, 5, 200.0, 300.0);
        }
        for (a, b) in sequential.particles().iter().zip(parallel.particles().iter()) {
            assert_eq!(a.position, b.position);
            assert_eq!(a.velocity, b.velocity);
            assert_eq!(a.density, b.density);
        }
    }

    #[test]
    fn density_field_sampling() {
        let solver = FluidSolver::new(vec![particle(2.0, 1.0)], &config(0.0)).unwrap();
        let field = solver.density_field(8, 4);
        assert_eq!(field.len(), 32);
        let at_particle = field[1 * 8 + 2];
        assert_lt!((at_particle - rest_density_for(10.0, 4.0)).abs(), 1e-12);
        assert_eq!(field[3 * 8 + 7], 0.0); // sqrt(29) away
        assert_eq!(solver.sample_density(Point::new(2.0, 1.0)), at_particle);
    }

    #[test]
    fn collapsed_viewport_skips_the_step() {
        let mut solver = FluidSolver::new(vec![particle(50.0, 50.0), particle(52.0, 50.0)], &config(0.0)).unwrap();
        let before: Vec<_> = solver.particles().iter().map(Particle::snapshot).collect();

        for &(width, height) in [(0.0, 0.0), (0.0, 100.0), (100.0, -1.0), (Real::NAN, 100.0)].iter() {
            let timings = solver.simulation_step(0.08, 25, width, height);
            assert_eq!(timings, StepTimings::default());
        }
        let after: Vec<_> = solver.particles().iter().map(Particle::snapshot).collect();
        assert_eq!(before, after);
        assert_eq!(solver.neighbor_search(), NeighborSearch::Unindexed);

        // still usable once the viewport is back
        assert_eq!(solver.simulation_step(0.01, 2, 100.0, 100.0).substeps, 2);
    }

    #[test]
    fn unknown_index_has_no_neighbors() {
        let mut solver = FluidSolver::new(vec![particle(10.0, 10.0), particle(12.0, 10.0)], &config(0.0)).unwrap();
        assert!(solver.query_neighborhood(7).is_empty());
        solver.simulation_step(0.01, 1, 100.0, 100.0);
        assert!(solver.query_neighborhood(7).is_empty());
        assert_eq!(solver.query_neighborhood(2), Vec::<ParticleIndex>::new());
    }
}
