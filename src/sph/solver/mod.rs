pub use execution::ExecutionMode;
pub use fluidsolver::{rest_density_for, FluidSolver, NeighborSearch};
pub use timings::StepTimings;

mod execution;
mod fluidsolver;
mod timings;

// ------------------------------------------------------

use super::particle::{Particle, SimulationBox};
use crate::units::Real;

pub trait Solver {
    /// Advances the simulation by `substeps` fixed steps of `dt`.
    /// The box used for collisions is the configured one clamped to the viewport.
    fn simulation_step(&mut self, dt: Real, substeps: usize, viewport_width: Real, viewport_height: Real) -> StepTimings;

    fn particles(&self) -> &[Particle];

    // configured box, not clamped to any viewport
    fn simulation_bounds(&self) -> SimulationBox;
}
