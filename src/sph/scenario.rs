use super::config::ScenarioConfig;
use super::particle::{Particle, ParticleDesc, SimulationBox};
use crate::error::SphError;
use crate::units::*;
use cgmath::prelude::*;
use rand::{rngs::SmallRng, Rng, SeedableRng};

/// Square block of resting particles, stacked from the bottom left corner of the box upwards.
///
/// Remember that y points down: the first row sits on the floor at `height - radius`.
#[derive(Clone, Debug, PartialEq)]
pub struct FluidBlock {
    /// Rounded down to the next square number.
    pub particle_amount: usize,
    pub spacing: Real,
    pub radius: Real,
    pub mass: Real,
    pub smooth_radius: Real,
    pub damping_factor: Real,
    /// Random offset in multiples of `spacing`, deterministic for a given seed.
    pub jitter: Real,
    pub seed: u64,
}

impl Default for FluidBlock {
    fn default() -> Self {
        FluidBlock::from(&ScenarioConfig::default())
    }
}

impl From<&ScenarioConfig> for FluidBlock {
    fn from(config: &ScenarioConfig) -> Self {
        FluidBlock {
            particle_amount: config.particle_amount,
            spacing: config.spacing,
            radius: config.radius,
            mass: config.mass,
            smooth_radius: config.smooth_radius,
            damping_factor: config.damping_factor,
            jitter: config.jitter,
            seed: config.seed,
        }
    }
}

impl FluidBlock {
    pub fn particles_per_side(&self) -> usize {
        (self.particle_amount as Real).sqrt().floor() as usize
    }

    pub fn build(&self, bounds: &SimulationBox) -> Result<Vec<Particle>, SphError> {
        let per_side = self.particles_per_side();
        let mut rng = SmallRng::seed_from_u64(self.seed);
        let jitter_factor = self.spacing * self.jitter;

        let mut particles = Vec::with_capacity(per_side * per_side);
        for x in 0..per_side {
            for y in 0..per_side {
                let mut position = Point::new(
                    self.radius + x as Real * self.spacing,
                    bounds.height - (self.radius + y as Real * self.spacing),
                );
                if jitter_factor != 0.0 {
                    position += (rng.gen::<Vector>() - Vector::new(0.5, 0.5)) * jitter_factor;
                }
                particles.push(Particle::new(ParticleDesc {
                    radius: self.radius,
                    position,
                    velocity: Vector::zero(),
                    smooth_radius: self.smooth_radius,
                    mass: self.mass,
                    damping_factor: self.damping_factor,
                })?);
            }
        }

        log::debug!("fluid block with {}x{} particles", per_side, per_side);
        Ok(particles)
    }
}
