/// Smoothing Kernels.
#[macro_use]
mod kernel;
mod poly6;
mod spiky;

pub use self::kernel::Kernel;
pub use self::poly6::Poly6;
pub use self::spiky::Spiky;

use crate::units::Real;

// Scalar shorthands in the naming used by the solver pipeline.
// Density is accumulated with the spiky kernel, viscosity uses the poly6 derivative.

/// Poly6 value: `(h² - r²)³ / (π h⁸ / 4)`, zero outside `[0, h]`.
#[inline]
pub fn density_kernel(dist: Real, smooth_radius: Real) -> Real {
    Poly6::new(smooth_radius).evaluate(dist)
}

/// Poly6 radial derivative, used as the viscosity laplacian approximation.
#[inline]
pub fn density_kernel_gradient(dist: Real, smooth_radius: Real) -> Real {
    Poly6::new(smooth_radius).gradient(dist)
}

/// Spiky value: `(h - r)² / (π h⁴ / 6)`, zero outside `[0, h]`.
#[inline]
pub fn pressure_kernel(dist: Real, smooth_radius: Real) -> Real {
    Spiky::new(smooth_radius).evaluate(dist)
}

/// Spiky radial derivative: `12 / (π h⁴) * (r - h)`, zero for `r <= 0` and `r > h`. Never positive.
#[inline]
pub fn pressure_kernel_gradient(dist: Real, smooth_radius: Real) -> Real {
    Spiky::new(smooth_radius).gradient(dist)
}
