//! Error types for the solver and its configuration.

use crate::units::Real;
use thiserror::Error;

/// Precondition violations and defined error conditions of the solver.
///
/// None of these are raised in the middle of a simulation step, degenerate cases there are skipped.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SphError {
    #[error("particle mass must be positive and finite, got {0}")]
    InvalidMass(Real),

    #[error("smoothing radius must be positive and finite, got {0}")]
    InvalidSmoothRadius(Real),

    #[error("particle radius must be non-negative and finite, got {0}")]
    InvalidRadius(Real),

    #[error("damping factor must be non-negative and finite, got {0}")]
    InvalidDampingFactor(Real),

    #[error("{0} must be finite")]
    NonFinite(&'static str),

    #[error("solver needs at least one particle")]
    NoParticles,

    /// The grid cell size is the smoothing radius, so it has to be the same for every particle.
    #[error("all particles must share one smoothing radius, found {expected} and {found}")]
    MixedSmoothRadius { expected: Real, found: Real },

    #[error("simulation box must have positive, finite extent, got {width}x{height}")]
    InvalidBox { width: Real, height: Real },

    #[error("cell ({x}, {y}) is outside of the {width}x{height} grid")]
    CellOutOfBounds { x: usize, y: usize, width: usize, height: usize },

    #[error("cannot normalize zero vector")]
    ZeroLengthNormalize,
}

/// Errors while assembling a simulation configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid command line argument {argument}: {reason}")]
    InvalidArgument { argument: String, reason: String },

    #[error("invalid simulation setup: {0}")]
    Invalid(#[from] SphError),
}
