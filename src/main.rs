use cgmath::prelude::*;
use std::collections::VecDeque;
use std::path::Path;
use std::time::{Duration, Instant};
use microprofile::scope;

use sphgrid2d::error::ConfigError;
use sphgrid2d::sph::*;
use sphgrid2d::units::*;

fn main() -> Result<(), ConfigError> {
    env_logger::init();

    microprofile::init!();
    microprofile::set_enable_all_groups!(true);

    let args: Vec<String> = std::env::args().skip(1).collect();
    let mut config = match find_arg(&args, "--config") {
        Some(path) => SimulationConfig::load(Path::new(path))?,
        None => SimulationConfig::default(),
    };
    config.apply_args(&args)?;

    let mut state = MainState::new(&config)?;
    for frame in 0..config.scenario.frames {
        state.update(&config.scenario);
        if (frame + 1) % REPORT_INTERVAL == 0 {
            state.report(frame + 1);
        }
    }
    state.report(config.scenario.frames);

    if let Some(path) = find_arg(&args, "--dump") {
        state.dump(Path::new(path))?;
    }

    Ok(())
}

struct MainState {
    solver: Box<dyn Solver>,

    frame_duration_history: VecDeque<Duration>,
    last_timings: StepTimings,

    total_simulation_time: Real,
    total_simulation_processing_time: Duration,
}

const FRAME_HISTORY_LENGTH: usize = 80;
const REPORT_INTERVAL: usize = 50;

impl MainState {
    pub fn new(config: &SimulationConfig) -> Result<MainState, ConfigError> {
        let scenario = &config.scenario;
        let bounds = config.initial_bounds()?;

        let particles = FluidBlock::from(scenario).build(&bounds)?;
        log::info!(
            "{} particles, dt {}, {} substeps per frame, {} frames",
            particles.len(),
            scenario.dt,
            scenario.substeps,
            scenario.frames
        );
        let solver = FluidSolver::new(particles, &config.solver)?;

        Ok(MainState {
            solver: Box::new(solver),

            frame_duration_history: VecDeque::with_capacity(FRAME_HISTORY_LENGTH),
            last_timings: Default::default(),

            total_simulation_time: 0.0,
            total_simulation_processing_time: Default::default(),
        })
    }

    fn update(&mut self, scenario: &ScenarioConfig) {
        microprofile::scope!("MainState", "update");

        let frame_start = Instant::now();
        self.last_timings = self.solver.simulation_step(
            scenario.dt,
            scenario.substeps,
            scenario.viewport_width,
            scenario.viewport_height,
        );
        let frame_processing_time = frame_start.elapsed();

        self.total_simulation_processing_time += frame_processing_time;
        self.total_simulation_time += scenario.dt * scenario.substeps as Real;

        if self.frame_duration_history.len() == FRAME_HISTORY_LENGTH {
            self.frame_duration_history.pop_front();
        }
        self.frame_duration_history.push_back(frame_processing_time);

        microprofile::flip!();
    }

    fn report(&self, frame: usize) {
        let particles = self.solver.particles();
        let mean_density = particles.iter().map(|p| p.density).sum::<Real>() / particles.len().max(1) as Real;
        let max_speed = particles.iter().map(|p| p.velocity.magnitude()).fold(0.0, Real::max);
        let average_frame_duration = if self.frame_duration_history.is_empty() {
            Duration::default()
        } else {
            self.frame_duration_history.iter().sum::<Duration>() / self.frame_duration_history.len() as u32
        };

        log::info!(
            "frame {:4} | SimTime {:.2} | SimProcessingTime {:.2}s | frame (averaged) {:.2}ms | mean density {:.4}, max speed {:.4}",
            frame,
            self.total_simulation_time,
            self.total_simulation_processing_time.as_secs_f64(),
            average_frame_duration.as_secs_f64() * 1000.0,
            mean_density,
            max_speed,
        );
        log::debug!("last frame: {}", self.last_timings);
    }

    fn dump(&self, path: &Path) -> Result<(), ConfigError> {
        let snapshots: Vec<ParticleSnapshot> = self.solver.particles().iter().map(Particle::snapshot).collect();
        let json = serde_json::to_string_pretty(&snapshots)?;
        std::fs::write(path, json)?;
        log::info!("wrote {} particle states to {:?}", snapshots.len(), path);
        Ok(())
    }
}
