use std::fmt;
use std::ops::AddAssign;
use std::time::Duration;

/// Wall clock time spent per pipeline phase. Purely advisory.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct StepTimings {
    pub density: Duration,
    pub pressure: Duration,
    pub forces: Duration,
    pub integration: Duration,
    pub grid_rebuild: Duration,
    pub substeps: u32,
}

impl StepTimings {
    pub fn total(&self) -> Duration {
        self.density + self.pressure + self.forces + self.integration + self.grid_rebuild
    }
}

impl AddAssign for StepTimings {
    fn add_assign(&mut self, other: StepTimings) {
        self.density += other.density;
        self.pressure += other.pressure;
        self.forces += other.forces;
        self.integration += other.integration;
        self.grid_rebuild += other.grid_rebuild;
        self.substeps += other.substeps;
    }
}

impl fmt::Display for StepTimings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ms = |d: Duration| d.as_secs_f64() * 1000.0;
        write!(
            f,
            "{} substeps in {:.3}ms | density {:.3}ms, pressure {:.3}ms, forces {:.3}ms, integration {:.3}ms, grid rebuild {:.3}ms",
            self.substeps,
            ms(self.total()),
            ms(self.density),
            ms(self.pressure),
            ms(self.forces),
            ms(self.integration),
            ms(self.grid_rebuild),
        )
    }
}
