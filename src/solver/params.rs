use crate::error::{Result, SimError};

use super::dispatch::{Executor, Schedule, Sweep};

/// Solver parameters for the fluid simulation.
#[derive(Clone, Debug, PartialEq)]
pub struct SolverParams {
    /// Density diffusion rate.
    pub diff: f64,
    /// Velocity diffusion rate.
    pub visc: f64,
    /// Relaxation passes per diffusion and per pressure solve.
    pub iterations: usize,
    pub sweep: Sweep,
    pub executor: Executor,
}

/// Defaults keep a drop pushed across a 64x64 grid within 5% of its mass
/// over 100 ticks; fewer passes leak density through the approximate solves.
impl Default for SolverParams {
    fn default() -> Self {
        Self {
            diff: 0.0001,
            visc: 1.0,
            iterations: 150,
            sweep: Sweep::RedBlack,
            executor: Executor::Parallel,
        }
    }
}

impl SolverParams {
    pub fn schedule(&self) -> Schedule {
        Schedule::new(self.executor, self.sweep)
    }

    pub fn validate(&self) -> Result<()> {
        check_coefficient("diffusion", self.diff)?;
        check_coefficient("viscosity", self.visc)?;
        if self.iterations == 0 {
            return Err(SimError::InvalidIterations);
        }
        Ok(())
    }
}

pub(crate) fn check_timestep(dt: f64) -> Result<()> {
    if dt.is_finite() && dt > 0.0 {
        Ok(())
    } else {
        Err(SimError::InvalidTimestep(dt))
    }
}

pub(crate) fn check_coefficient(name: &'static str, value: f64) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(SimError::InvalidCoefficient { name, value })
    }
}
