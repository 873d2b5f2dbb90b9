use super::kernel::Kernel;
use crate::units::Real;

/// Debrun's "Spiky" smoothing kernel, quadratic 2D variant.
///
/// Refer to "Particle-Based Fluid Simulation for Interactive Applications", Müller et al.
/// Kernel well suited for pressure since its gradient doesn't vanish at the center.
/// It is also used for density, which keeps the self contribution of a particle strictly positive.
#[derive(Copy, Clone, Debug)]
pub struct Spiky {
    h: Real,
    volume: Real,
    normalizer_grad: Real,
}

impl Spiky {
    pub fn new(smoothing_length: Real) -> Spiky {
        Spiky {
            h: smoothing_length,
            volume: std::f64::consts::PI * smoothing_length.powf(4.0) / 6.0,
            normalizer_grad: 12.0 / (std::f64::consts::PI * smoothing_length.powf(4.0)),
        }
    }
}

impl Kernel for Spiky {
    #[inline]
    fn smoothing_length(&self) -> Real {
        self.h
    }

    #[inline]
    fn evaluate(&self, r: Real) -> Real {
        if r < 0.0 || r > self.h {
            return 0.0;
        }
        let hsubr = self.h - r;
        hsubr * hsubr / self.volume
    }

    // Zero at r == 0 as well: there is no direction to push into.
    #[inline]
    fn gradient(&self, r: Real) -> Real {
        if r <= 0.0 || r > self.h {
            return 0.0;
        }
        self.normalizer_grad * (r - self.h)
    }
}

generate_kernel_tests!(Spiky);
