//! Simulation parameters.
//!
//! Everything can come from a JSON file, command line arguments override individual values.

use super::particle::SimulationBox;
use super::solver::ExecutionMode;
use crate::error::{ConfigError, SphError};
use crate::units::Real;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Parameters of the fluid solver itself.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Density at which pressure starts to build up.
    /// If absent, the self contribution of a single particle is used (see `rest_density_for`).
    pub rest_density: Option<Real>,
    pub pressure_constant: Real,
    pub viscosity_constant: Real,
    /// Acceleration in units/s². y points down.
    pub gravity: [Real; 2],
    /// Largest extent of the simulation box, the grid is sized for it.
    pub box_width: Real,
    pub box_height: Real,
    pub execution: ExecutionMode,
    /// Log per phase timings after every step.
    pub verbose: bool,
}

impl Default for SolverConfig {
    fn default() -> Self {
        SolverConfig {
            rest_density: None,
            pressure_constant: 100.0,
            viscosity_constant: 5.0,
            gravity: [0.0, 0.02],
            box_width: 200.0,
            box_height: 300.0,
            execution: ExecutionMode::Parallel,
            verbose: false,
        }
    }
}

/// Initial particle setup and how long to run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    /// Rounded down to the next square number.
    pub particle_amount: usize,
    pub spacing: Real,
    pub radius: Real,
    pub mass: Real,
    pub smooth_radius: Real,
    pub damping_factor: Real,
    /// Random offset in multiples of `spacing`. 0 for a perfect lattice.
    pub jitter: Real,
    pub seed: u64,

    pub dt: Real,
    pub substeps: usize,
    pub frames: usize,
    pub viewport_width: Real,
    pub viewport_height: Real,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        ScenarioConfig {
            particle_amount: 1600,
            spacing: 3.0,
            radius: 1.0,
            mass: 10.0,
            smooth_radius: 4.0,
            damping_factor: 1.0,
            jitter: 0.0,
            seed: 0x5eed,

            dt: 0.08,
            substeps: 25,
            frames: 300,
            viewport_width: 200.0,
            viewport_height: 300.0,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub solver: SolverConfig,
    pub scenario: ScenarioConfig,
}

impl SimulationConfig {
    pub fn from_json(json: &str) -> Result<SimulationConfig, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: &Path) -> Result<SimulationConfig, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        let config = Self::from_json(&json)?;
        log::info!("loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Box the scenario starts in: the solver box clamped to the viewport.
    /// Both have to be positive and finite.
    pub fn initial_bounds(&self) -> Result<SimulationBox, SphError> {
        let configured_box = SimulationBox::new(self.solver.box_width, self.solver.box_height)?;
        let viewport = SimulationBox::new(self.scenario.viewport_width, self.scenario.viewport_height)?;
        Ok(configured_box.clamped_to(viewport.width, viewport.height))
    }

    /// Applies `--key value` overrides. Unknown keys are reported and skipped.
    ///
    /// `--config`, `--dump` are handled by the caller and ignored here.
    pub fn apply_args(&mut self, args: &[String]) -> Result<(), ConfigError> {
        let mut i = 0;
        while i < args.len() {
            let key = args[i].as_str();
            match key {
                "--sequential" => {
                    self.solver.execution = ExecutionMode::Sequential;
                    i += 1;
                    continue;
                }
                "--verbose" => {
                    self.solver.verbose = true;
                    i += 1;
                    continue;
                }
                _ => (),
            }

            let value = args.get(i + 1).ok_or_else(|| ConfigError::InvalidArgument {
                argument: key.to_owned(),
                reason: "missing value".to_owned(),
            })?;
            match key {
                "--dt" => self.scenario.dt = parse_arg(key, value)?,
                "--substeps" => self.scenario.substeps = parse_arg(key, value)?,
                "--frames" => self.scenario.frames = parse_arg(key, value)?,
                "--mass" => self.scenario.mass = parse_arg(key, value)?,
                "--smoothradius" => self.scenario.smooth_radius = parse_arg(key, value)?,
                "--particleamount" => self.scenario.particle_amount = parse_arg(key, value)?,
                "--pressureconstant" => self.solver.pressure_constant = parse_arg(key, value)?,
                "--viscosityconstant" => self.solver.viscosity_constant = parse_arg(key, value)?,
                "--restdensity" => self.solver.rest_density = Some(parse_arg(key, value)?),
                "--config" | "--dump" => (),
                _ => log::warn!("ignoring unknown argument {} {}", key, value),
            }
            i += 2;
        }
        Ok(())
    }
}

fn parse_arg<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    value.parse().map_err(|err: T::Err| ConfigError::InvalidArgument {
        argument: key.to_owned(),
        reason: format!("{} ({})", err, value),
    })
}

/// Value of `--key value` in `args`, if present.
pub fn find_arg<'a>(args: &'a [String], key: &str) -> Option<&'a str> {
    args.iter().position(|arg| arg == key).and_then(|i| args.get(i + 1)).map(String::as_str)
}
