use crate::units::Real;

/// SPH smoothing kernel
///
/// Only radially symmetric kernels are supported, so everything is expressed in the distance `r` between two particles.
/// Support is `[0, h]`: outside of it every kernel returns exactly 0 (this is checked, unlike in many other SPH codes,
/// since the first step of the solver evaluates kernels for all particle pairs).
pub trait Kernel {
    /// The smoothing length h, i.e. the support radius.
    fn smoothing_length(&self) -> Real;

    /// Evaluates the kernel function for a given distance r.
    fn evaluate(&self, r: Real) -> Real;

    /// Evaluates the radial derivative of the kernel, i.e. dW/dr for a given distance r.
    /// Multiply with the normalized direction to get the gradient vector.
    fn gradient(&self, r: Real) -> Real;
}

// Generates support/continuity tests for a kernel type with a `new(smoothing_length)` constructor.
macro_rules! generate_kernel_tests {
    ($kernel_type:ident) => {
    };
}
