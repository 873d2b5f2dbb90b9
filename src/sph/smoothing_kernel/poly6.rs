use super::kernel::Kernel;
use crate::units::Real;

/// Poly6 smoothing kernel.
///
/// Refer to "Particle-Based Fluid Simulation for Interactive Applications", Müller et al.
/// Smooth everywhere, but its derivative vanishes at the center. The solver uses the derivative for viscosity only.
#[derive(Copy, Clone, Debug)]
pub struct Poly6 {
    h: Real,
    hsq: Real,
    volume: Real,
    normalizer_grad: Real,
}

impl Poly6 {
    pub fn new(smoothing_length: Real) -> Poly6 {
        Poly6 {
            h: smoothing_length,
            hsq: smoothing_length * smoothing_length,
            volume: std::f64::consts::PI * smoothing_length.powf(8.0) / 4.0,
            normalizer_grad: -24.0 / (std::f64::consts::PI * smoothing_length.powf(8.0)),
        }
    }
}

impl Kernel for Poly6 {
    #[inline]
    fn smoothing_length(&self) -> Real {
        self.h
    }

    #[inline]
    fn evaluate(&self, r: Real) -> Real {
        if r < 0.0 || r > self.h {
            return 0.0;
        }
        let dsq = self.hsq - r * r;
        dsq.powf(3.0) / self.volume
    }

    #[inline]
    fn gradient(&self, r: Real) -> Real {
        if r < 0.0 || r > self.h {
            return 0.0;
        }
        let hsq_sub_rsq = self.hsq - r * r;
        self.normalizer_grad * hsq_sub_rsq * hsq_sub_rsq * r
    }
}

generate_kernel_tests!(Poly6);
