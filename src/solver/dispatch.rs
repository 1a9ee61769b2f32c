use rayon::prelude::*;
use serde::Deserialize;

use crate::field::Field;

/// Where per-cell kernels run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Executor {
    /// Row by row on the calling thread.
    Serial,
    /// Interior rows split across the rayon thread pool.
    #[default]
    Parallel,
}

/// Update order of a relaxation pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sweep {
    /// In-place lexicographic sweep. Always runs on the calling thread.
    GaussSeidel,
    /// In-place sweep over cells with even `i + j`, then odd.
    #[default]
    RedBlack,
    /// Every cell reads the previous pass.
    Jacobi,
}

/// Execution choices threaded through every solver step.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Schedule {
    pub executor: Executor,
    pub sweep: Sweep,
}

impl Schedule {
    pub fn new(executor: Executor, sweep: Sweep) -> Self {
        Self { executor, sweep }
    }
}

impl Executor {
    /// Replace every interior cell of `dest` with `kernel(i, j, old)`.
    ///
    /// The kernel must not read `dest` itself; it sees only the captured
    /// read-only fields. Returns after all interior writes are done, so the
    /// caller may enforce boundaries right after.
    pub fn for_each_interior<K>(self, dest: &mut Field, kernel: K)
    where
        K: Fn(usize, usize, f64) -> f64 + Sync,
    {
        let (w, h) = dest.dims();
        if w <= 2 || h <= 2 {
            return;
        }
        let rows = h - 2;
        match self {
            Executor::Serial => {
                for (j, row) in dest.as_mut_slice().chunks_mut(w).enumerate().skip(1).take(rows) {
                    update_row(j, row, &kernel);
                }
            }
            Executor::Parallel => {
                dest.as_mut_slice()
                    .par_chunks_mut(w)
                    .enumerate()
                    .skip(1)
                    .take(rows)
                    .for_each(|(j, row)| update_row(j, row, &kernel));
            }
        }
    }
}

#[inline]
fn update_row<K>(j: usize, row: &mut [f64], kernel: &K)
where
    K: Fn(usize, usize, f64) -> f64,
{
    let w = row.len();
    for i in 1..(w - 1) {
        row[i] = kernel(i, j, row[i]);
    }
}
