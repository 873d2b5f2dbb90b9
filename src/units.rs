use crate::error::SphError;
use cgmath::prelude::*;

// For simulating
pub type Real = f64;
pub type Point = cgmath::Point2<Real>;
pub type Vector = cgmath::Vector2<Real>;

/// Additions to cgmath's vector ops that the solver relies on.
///
/// Plain add/scale/dot/magnitude come straight from cgmath (`+`, `*`, `dot`, `magnitude`, `magnitude2`).
pub trait VectorExt: Sized {
    /// In-place add, returns self for chaining.
    fn add_this(&mut self, other: Vector) -> &mut Self;

    /// In-place scale, returns self for chaining.
    fn scale_this(&mut self, scalar: Real) -> &mut Self;

    /// Unit vector in the same direction.
    /// A zero-length vector has no direction, normalizing it is an error instead of a NaN.
    fn try_normalize(self) -> Result<Self, SphError>;

    /// Like `try_normalize`, but reports the zero-length case and yields the zero vector.
    fn normalize_or_zero(self) -> Self;
}

impl VectorExt for Vector {
    #[inline]
    fn add_this(&mut self, other: Vector) -> &mut Self {
        *self += other;
        self
    }

    #[inline]
    fn scale_this(&mut self, scalar: Real) -> &mut Self {
        *self *= scalar;
        self
    }

    #[inline]
    fn try_normalize(self) -> Result<Self, SphError> {
        let magnitude = self.magnitude();
        if magnitude == 0.0 {
            Err(SphError::ZeroLengthNormalize)
        } else {
            Ok(self / magnitude)
        }
    }

    #[inline]
    fn normalize_or_zero(self) -> Self {
        match self.try_normalize() {
            Ok(direction) => direction,
            Err(err) => {
                log::trace!("{}", err);
                Vector::zero()
            }
        }
    }
}
