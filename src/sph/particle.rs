use super::smoothing_kernel::{Poly6, Spiky};
use crate::error::SphError;
use crate::units::*;
use cgmath::prelude::*;
use serde::{Deserialize, Serialize};

/// Axis aligned simulation box spanning `[0, width] x [0, height]`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SimulationBox {
    pub width: Real,
    pub height: Real,
}

impl SimulationBox {
    pub fn new(width: Real, height: Real) -> Result<SimulationBox, SphError> {
        if !(width > 0.0 && height > 0.0 && width.is_finite() && height.is_finite()) {
            return Err(SphError::InvalidBox { width, height });
        }
        Ok(SimulationBox { width, height })
    }

    /// Per axis minimum, e.g. to fit the box into a smaller viewport.
    pub fn clamped_to(&self, width: Real, height: Real) -> SimulationBox {
        SimulationBox {
            width: self.width.min(width),
            height: self.height.min(height),
        }
    }
}

/// Coordinate of a grid cell, i.e. `floor(position / smooth_radius)` clamped to >= 0.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct CellCoord {
    pub x: usize,
    pub y: usize,
}

impl CellCoord {
    pub fn new(x: usize, y: usize) -> CellCoord {
        CellCoord { x, y }
    }
}

/// Initial state of a particle.
#[derive(Copy, Clone, Debug)]
pub struct ParticleDesc {
    pub radius: Real,
    pub position: Point,
    pub velocity: Vector,
    pub smooth_radius: Real,
    pub mass: Real,
    pub damping_factor: Real,
}

/// A single fluid sample.
///
/// `radius`, `smooth_radius`, `mass` and `damping_factor` never change after construction.
#[derive(Clone, Debug)]
pub struct Particle {
    radius: Real,
    smooth_radius: Real,
    mass: Real,
    damping_factor: Real,

    pub position: Point,
    pub velocity: Vector,
    pub acceleration: Vector, // accumulated force / mass, zeroed by integrate
    pub density: Real,        // ρ, recomputed every step
    pub pressure: Real,       // recomputed every step, never negative

    cell: CellCoord,

    // Built once since the smoothing radius is fixed.
    density_kernel: Poly6,
    pressure_kernel: Spiky,
}

impl Particle {
    pub const BOUNDARY_STIFFNESS: Real = 1000.0;
    pub const BOUNDARY_DAMPING: Real = 50.0;

    pub fn new(desc: ParticleDesc) -> Result<Particle, SphError> {
        if !(desc.mass > 0.0 && desc.mass.is_finite()) {
            return Err(SphError::InvalidMass(desc.mass));
        }
        if !(desc.smooth_radius > 0.0 && desc.smooth_radius.is_finite()) {
            return Err(SphError::InvalidSmoothRadius(desc.smooth_radius));
        }
        if !(desc.radius >= 0.0 && desc.radius.is_finite()) {
            return Err(SphError::InvalidRadius(desc.radius));
        }
        if !(desc.damping_factor >= 0.0 && desc.damping_factor.is_finite()) {
            return Err(SphError::InvalidDampingFactor(desc.damping_factor));
        }
        if !(desc.position.x.is_finite() && desc.position.y.is_finite()) {
            return Err(SphError::NonFinite("position"));
        }
        if !(desc.velocity.x.is_finite() && desc.velocity.y.is_finite()) {
            return Err(SphError::NonFinite("velocity"));
        }

        let mut particle = Particle {
            radius: desc.radius,
            smooth_radius: desc.smooth_radius,
            mass: desc.mass,
            damping_factor: desc.damping_factor,

            position: desc.position,
            velocity: desc.velocity,
            acceleration: Vector::zero(),
            density: 0.0,
            pressure: 0.0,

            cell: CellCoord::default(),

            density_kernel: Poly6::new(desc.smooth_radius),
            pressure_kernel: Spiky::new(desc.smooth_radius),
        };
        particle.recompute_cell();
        Ok(particle)
    }

    pub fn radius(&self) -> Real {
        self.radius
    }

    pub fn smooth_radius(&self) -> Real {
        self.smooth_radius
    }

    pub fn mass(&self) -> Real {
        self.mass
    }

    pub fn damping_factor(&self) -> Real {
        self.damping_factor
    }

    pub fn cell(&self) -> CellCoord {
        self.cell
    }

    pub(crate) fn density_kernel(&self) -> &Poly6 {
        &self.density_kernel
    }

    pub(crate) fn pressure_kernel(&self) -> &Spiky {
        &self.pressure_kernel
    }

    /// Accumulates `force / mass` into the acceleration.
    #[inline]
    pub fn apply_force(&mut self, force: Vector) {
        self.acceleration += force / self.mass;
    }

    /// Spring-damper penalty force pushing the particle back into the box.
    ///
    /// Per axis, only the wall the particle's edge currently penetrates contributes:
    /// `stiffness * penetration - damping * velocity` (sign flipped for the far wall's spring).
    pub fn compute_boundary_force(&self, bounds: &SimulationBox) -> Vector {
        let mut force = Vector::zero();

        if self.position.x < self.radius {
            let penetration = self.radius - self.position.x;
            force.x = Self::BOUNDARY_STIFFNESS * penetration - Self::BOUNDARY_DAMPING * self.velocity.x;
        } else if self.position.x > bounds.width - self.radius {
            let penetration = self.position.x - (bounds.width - self.radius);
            force.x = -Self::BOUNDARY_STIFFNESS * penetration - Self::BOUNDARY_DAMPING * self.velocity.x;
        }

        if self.position.y < self.radius {
            let penetration = self.radius - self.position.y;
            force.y = Self::BOUNDARY_STIFFNESS * penetration - Self::BOUNDARY_DAMPING * self.velocity.y;
        } else if self.position.y > bounds.height - self.radius {
            let penetration = self.position.y - (bounds.height - self.radius);
            force.y = -Self::BOUNDARY_STIFFNESS * penetration - Self::BOUNDARY_DAMPING * self.velocity.y;
        }

        force
    }

    /// `cell = floor(position / smooth_radius)`, clamped to >= 0. There is no upper clamp here.
    pub fn recompute_cell(&mut self) {
        let x = (self.position.x / self.smooth_radius).floor();
        let y = (self.position.y / self.smooth_radius).floor();
        // `as` saturates, negative and NaN end up as 0.
        self.cell = CellCoord {
            x: x.max(0.0) as usize,
            y: y.max(0.0) as usize,
        };
    }

    /// Advances the particle by `dt`. The order of operations matters:
    /// boundary force, position, velocity, damping, reset acceleration, cell.
    pub fn integrate(&mut self, dt: Real, bounds: &SimulationBox) {
        let boundary_force = self.compute_boundary_force(bounds);
        self.apply_force(boundary_force);

        self.position += self.velocity * dt + self.acceleration * (0.5 * dt * dt);
        self.velocity += self.acceleration * dt;

        // Global dissipation, applied on every step and not only on wall contact.
        self.velocity *= self.damping_factor;
        self.acceleration = Vector::zero();

        self.recompute_cell();
    }

    pub fn snapshot(&self) -> ParticleSnapshot {
        ParticleSnapshot {
            position: [self.position.x, self.position.y],
            velocity: [self.velocity.x, self.velocity.y],
            radius: self.radius,
            density: self.density,
            pressure: self.pressure,
        }
    }
}

/// Plain copy of what a renderer or a dump needs from a particle.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ParticleSnapshot {
    pub position: [Real; 2],
    pub velocity: [Real; 2],
    pub radius: Real,
    pub density: Real,
    pub pressure: Real,
}
