use std::ops::Range;

use crate::error::{Result, SimError};
use crate::field::Field;
use crate::solver::{self, SolverParams};

/// Half side length, in cells, of the square stamped by `seed_velocity`.
pub const WIND_HALF_EXTENT: usize = 10;

/// Everything one simulation owns between ticks.
///
/// `density_source`, `vx0` and `vy0` are the "previous" halves of the
/// double-buffered pipeline; during projection the idle velocity pair doubles
/// as pressure and divergence scratch.
pub struct SimState {
    width: usize,
    height: usize,
    pub(crate) density: Field,
    pub(crate) density_source: Field,
    pub(crate) vx: Field,
    pub(crate) vy: Field,
    pub(crate) vx0: Field,
    pub(crate) vy0: Field,
    params: SolverParams,
    steps: u64,
}

/// Copy of the density field handed to a renderer.
#[derive(Clone, Debug)]
pub struct FrameSnapshot {
    pub density: Field,
    pub step: u64,
}

impl FrameSnapshot {
    /// Pre-allocate a snapshot buffer matching the given simulation dimensions.
    pub fn new_empty(width: usize, height: usize) -> Self {
        Self {
            density: Field::new(width, height),
            step: 0,
        }
    }
}

impl SimState {
    /// Allocate and zero-fill all fields.
    pub fn new(width: usize, height: usize, params: SolverParams) -> Result<Self> {
        if width <= 2 || height <= 2 {
            return Err(SimError::InvalidDimensions { width, height });
        }
        params.validate()?;
        log::debug!(
            "simulation grid {width}x{height}, {} iterations, {:?} sweep on {:?} executor",
            params.iterations,
            params.sweep,
            params.executor
        );
        Ok(Self {
            width,
            height,
            density: Field::new(width, height),
            density_source: Field::new(width, height),
            vx: Field::new(width, height),
            vy: Field::new(width, height),
            vx0: Field::new(width, height),
            vy0: Field::new(width, height),
            params,
            steps: 0,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn params(&self) -> &SolverParams {
        &self.params
    }

    /// Number of completed ticks.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Advance the simulation by `dt` seconds.
    pub fn tick(&mut self, dt: f64) -> Result<()> {
        solver::fluid_step(self, dt)?;
        self.steps += 1;
        Ok(())
    }

    pub fn density(&self) -> &Field {
        &self.density
    }

    pub fn velocity(&self) -> (&Field, &Field) {
        (&self.vx, &self.vy)
    }

    /// Zero every field, keeping dimensions and parameters.
    pub fn reset(&mut self) {
        for f in [
            &mut self.density,
            &mut self.density_source,
            &mut self.vx,
            &mut self.vy,
            &mut self.vx0,
            &mut self.vy0,
        ] {
            f.fill(0.0);
        }
        self.steps = 0;
    }

    /// Stamp a disc of constant density centred on `(x, y)`.
    /// Cells outside the interior are left to the boundary pass.
    pub fn seed_density(&mut self, x: f64, y: f64, radius: f64, value: f64) {
        let r2 = radius * radius;
        let cols = interior_span(x - radius, x + radius, self.width);
        let rows = interior_span(y - radius, y + radius, self.height);
        for j in rows {
            for i in cols.clone() {
                let (dx, dy) = (i as f64 - x, j as f64 - y);
                if dx * dx + dy * dy < r2 {
                    self.density.set(i, j, value);
                }
            }
        }
    }

    /// Stamp a square of constant velocity centred on `(x, y)`.
    pub fn seed_velocity(&mut self, x: f64, y: f64, dir_x: f64, dir_y: f64) {
        let half = WIND_HALF_EXTENT as f64;
        let (cx, cy) = (x.round(), y.round());
        // Half-open square [c - half, c + half)
        let cols = interior_span(cx - half, cx + half - 1.0, self.width);
        let rows = interior_span(cy - half, cy + half - 1.0, self.height);
        for j in rows {
            for i in cols.clone() {
                self.vx.set(i, j, dir_x);
                self.vy.set(i, j, dir_y);
            }
        }
    }

    /// Copy the density into a pre-allocated snapshot, avoiding allocation.
    pub fn snapshot_into(&self, dst: &mut FrameSnapshot) {
        dst.density.copy_from(&self.density);
        dst.step = self.steps;
    }
}

/// Interior indices covering the closed range `[lo, hi]`, clipped to `1..len-1`.
fn interior_span(lo: f64, hi: f64, len: usize) -> Range<usize> {
    let last = (len - 2) as f64;
    if !(lo.is_finite() && hi.is_finite()) || hi < 1.0 || lo > last {
        return 0..0;
    }
    let start = lo.ceil().max(1.0) as usize;
    let end = hi.floor().min(last) as usize + 1;
    start..end.max(start)
}
