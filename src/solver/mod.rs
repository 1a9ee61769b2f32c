mod boundary;
mod core;
pub mod diagnostics;
mod dispatch;
mod params;

// Re-export public API
pub use boundary::{set_bnd, FieldType};
pub use self::core::{advect, diffuse, lin_solve, project};
pub use dispatch::{Executor, Schedule, Sweep};
pub use params::SolverParams;

use crate::error::Result;
use crate::state::SimState;
use params::check_timestep;

/// Full fluid simulation step.
///
/// Diffuse and project the velocity, self-advect it, project again, then
/// diffuse and advect the density through the final velocity. The order is
/// fixed; each stage reads the buffer the previous one wrote.
pub fn fluid_step(state: &mut SimState, dt: f64) -> Result<()> {
    check_timestep(dt)?;
    let p = state.params().clone();
    let sched = p.schedule();
    let iter = p.iterations;

    // Diffuse velocity
    diffuse(FieldType::Vx, &mut state.vx0, &state.vx, p.visc, dt, iter, sched)?;
    diffuse(FieldType::Vy, &mut state.vy0, &state.vy, p.visc, dt, iter, sched)?;

    // Project the diffused velocity; vx/vy are free until advection refills them.
    project(&mut state.vx0, &mut state.vy0, &mut state.vx, &mut state.vy, iter, sched)?;

    // Advect velocity along itself
    advect(FieldType::Vx, &mut state.vx, &state.vx0, &state.vx0, &state.vy0, dt, sched.executor)?;
    advect(FieldType::Vy, &mut state.vy, &state.vy0, &state.vx0, &state.vy0, dt, sched.executor)?;

    // Project again; this time vx0/vy0 are the scratch pair.
    project(&mut state.vx, &mut state.vy, &mut state.vx0, &mut state.vy0, iter, sched)?;

    // Diffuse + advect density through the divergence-free velocity
    diffuse(FieldType::Scalar, &mut state.density_source, &state.density, p.diff, dt, iter, sched)?;
    advect(FieldType::Scalar, &mut state.density, &state.density_source, &state.vx, &state.vy, dt, sched.executor)?;

    if log::log_enabled!(log::Level::Trace) {
        log::trace!(
            "step={} mass={:.4} KE={:.6e} div={:.3e}",
            state.steps() + 1,
            diagnostics::total_mass(&state.density),
            diagnostics::kinetic_energy(&state.vx, &state.vy),
            diagnostics::divergence_l2(&state.vx, &state.vy),
        );
    }
    Ok(())
}
