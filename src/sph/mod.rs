pub use self::config::*;
pub use self::particle::*;
pub use self::scenario::FluidBlock;
pub use self::solver::*;
pub use self::spatial_grid::{ParticleIndex, SpatialGrid};

pub mod config;
pub mod particle;
pub mod scenario;
pub mod smoothing_kernel;
pub mod spatial_grid;
mod solver;
