use crate::error::{Result, SimError};
use crate::field::{idx, Field};

use super::boundary::{set_bnd, FieldType};
use super::dispatch::{Executor, Schedule, Sweep};
use super::params::{check_coefficient, check_timestep};

/// One relaxation update of the cell at flat index `k`.
#[inline(always)]
fn relax_cell(x: &[f64], x0: &[f64], k: usize, w: usize, a: f64, c_inv: f64) -> f64 {
    (x0[k] + a * (x[k + 1] + x[k - 1] + x[k + w] + x[k - w])) * c_inv
}

/// Fixed-iteration relaxation solver.
/// Solves: x[i,j] = (x0[i,j] + a * (neighbors)) / c
///
/// Runs exactly `iter` passes with no convergence check; each pass is
/// followed by `set_bnd(field_type, x)`.
pub fn lin_solve(
    field_type: FieldType,
    x: &mut Field,
    x0: &Field,
    a: f64,
    c: f64,
    iter: usize,
    sched: Schedule,
) -> Result<()> {
    x.expect_interior()?;
    let (w, h) = x.dims();
    x0.expect_dims(w, h)?;
    if !(c.is_finite() && c > 0.0) {
        return Err(SimError::InvalidDivisor(c));
    }
    if iter == 0 {
        return Err(SimError::InvalidIterations);
    }
    let c_inv = 1.0 / c;

    match sched.sweep {
        Sweep::GaussSeidel => {
            for _ in 0..iter {
                let d = x.as_mut_slice();
                let s = x0.as_slice();
                for j in 1..(h - 1) {
                    for i in 1..(w - 1) {
                        let k = idx(i, j, w);
                        d[k] = relax_cell(d, s, k, w, a, c_inv);
                    }
                }
                set_bnd(field_type, x);
            }
        }
        Sweep::RedBlack => {
            // Cells of one colour only read the other colour, so a snapshot
            // taken before each half pass holds exactly the in-place values.
            let mut snapshot = match sched.executor {
                Executor::Parallel => Some(x.clone()),
                Executor::Serial => None,
            };
            for _ in 0..iter {
                for parity in 0..2 {
                    match snapshot.as_mut() {
                        Some(snap) => {
                            snap.copy_from(x);
                            let (sd, s) = (snap.as_slice(), x0.as_slice());
                            sched.executor.for_each_interior(x, |i, j, old| {
                                if (i + j) % 2 == parity {
                                    relax_cell(sd, s, idx(i, j, w), w, a, c_inv)
                                } else {
                                    old
                                }
                            });
                        }
                        None => {
                            let d = x.as_mut_slice();
                            let s = x0.as_slice();
                            for j in 1..(h - 1) {
                                let first = if (1 + j) % 2 == parity { 1 } else { 2 };
                                for i in (first..(w - 1)).step_by(2) {
                                    let k = idx(i, j, w);
                                    d[k] = relax_cell(d, s, k, w, a, c_inv);
                                }
                            }
                        }
                    }
                }
                set_bnd(field_type, x);
            }
        }
        Sweep::Jacobi => {
            let mut snap = x.clone();
            for _ in 0..iter {
                snap.copy_from(x);
                let (sd, s) = (snap.as_slice(), x0.as_slice());
                sched.executor.for_each_interior(x, |i, j, _| relax_cell(sd, s, idx(i, j, w), w, a, c_inv));
                set_bnd(field_type, x);
            }
        }
    }
    Ok(())
}

/// Diffusion step: spreads the field over time.
/// a = dt * diff * (2*width + 2*height), c = 1 + 4a
pub fn diffuse(
    field_type: FieldType,
    x: &mut Field,
    x0: &Field,
    diff: f64,
    dt: f64,
    iter: usize,
    sched: Schedule,
) -> Result<()> {
    check_timestep(dt)?;
    check_coefficient("diffusion rate", diff)?;
    x.expect_interior()?;
    let (w, h) = x.dims();
    x0.expect_dims(w, h)?;

    let a = dt * diff * (2 * w + 2 * h) as f64;
    // Initial guess is the source, not whatever the buffer held last tick.
    x.copy_from(x0);
    lin_solve(field_type, x, x0, a, 1.0 + 4.0 * a, iter, sched)
}

/// Semi-Lagrangian advection: traces particles backwards through velocity field.
pub fn advect(
    field_type: FieldType,
    d: &mut Field,
    d0: &Field,
    vx: &Field,
    vy: &Field,
    dt: f64,
    executor: Executor,
) -> Result<()> {
    check_timestep(dt)?;
    d.expect_interior()?;
    let (w, h) = d.dims();
    d0.expect_dims(w, h)?;
    vx.expect_dims(w, h)?;
    vy.expect_dims(w, h)?;

    let dtx = dt * (w - 2) as f64;
    let dty = dt * (h - 2) as f64;
    // N + 0.5 with N interior cells keeps floor(x) + 1 on the grid.
    let x_max = (w - 2) as f64 + 0.5;
    let y_max = (h - 2) as f64 + 0.5;

    executor.for_each_interior(d, |i, j, _| {
        let x = (i as f64 - dtx * vx.get(i, j)).clamp(0.5, x_max);
        let y = (j as f64 - dty * vy.get(i, j)).clamp(0.5, y_max);

        let i0 = x.floor() as usize;
        let j0 = y.floor() as usize;
        let i1 = i0 + 1;
        let j1 = j0 + 1;
        let s1 = x - i0 as f64;
        let s0 = 1.0 - s1;
        let t1 = y - j0 as f64;
        let t0 = 1.0 - t1;

        s0 * (t0 * d0.get(i0, j0) + t1 * d0.get(i0, j1))
            + s1 * (t0 * d0.get(i1, j0) + t1 * d0.get(i1, j1))
    });
    set_bnd(field_type, d);
    Ok(())
}

/// Pressure projection: enforces incompressibility (divergence-free velocity field).
///
/// `p` and `div` are scratch; their previous contents are discarded.
pub fn project(
    vx: &mut Field,
    vy: &mut Field,
    p: &mut Field,
    div: &mut Field,
    iter: usize,
    sched: Schedule,
) -> Result<()> {
    vx.expect_interior()?;
    let (w, h) = vx.dims();
    vy.expect_dims(w, h)?;
    p.expect_dims(w, h)?;
    div.expect_dims(w, h)?;
    let (wf, hf) = (w as f64, h as f64);

    // Calculate divergence
    {
        let (u, v) = (&*vx, &*vy);
        sched.executor.for_each_interior(div, |i, j, _| {
            -0.5 * ((u.get(i + 1, j) - u.get(i - 1, j)) / wf + (v.get(i, j + 1) - v.get(i, j - 1)) / hf)
        });
    }
    sched.executor.for_each_interior(p, |_, _, _| 0.0);
    set_bnd(FieldType::Scalar, div);
    set_bnd(FieldType::Scalar, p);

    // Solve for pressure
    lin_solve(FieldType::Scalar, p, div, 1.0, 4.0, iter, sched)?;
    set_bnd(FieldType::Scalar, p);

    // Subtract pressure gradient from velocity
    let pr = &*p;
    sched.executor.for_each_interior(vx, |i, j, u| u - 0.5 * (pr.get(i + 1, j) - pr.get(i - 1, j)) * wf);
    sched.executor.for_each_interior(vy, |i, j, v| v - 0.5 * (pr.get(i, j + 1) - pr.get(i, j - 1)) * hf);
    set_bnd(FieldType::Vx, vx);
    set_bnd(FieldType::Vy, vy);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::diagnostics::{divergence_l2, total_mass};

    const N: usize = 40;

    fn all_schedules() -> Vec<Schedule> {
        let mut out = Vec::new();
        for executor in [Executor::Serial, Executor::Parallel] {
            for sweep in [Sweep::GaussSeidel, Sweep::RedBlack, Sweep::Jacobi] {
                out.push(Schedule::new(executor, sweep));
            }
        }
        out
    }

    fn spike(value: f64) -> Field {
        let mut f = Field::new(N, N);
        f.set(N / 2, N / 2, value);
        f
    }

    /// Radially outward Gaussian jet: strongly divergent.
    fn divergent_velocity() -> (Field, Field) {
        let c = (N / 2) as f64;
        let sigma = (N * N) as f64 / 32.0;
        let gauss = |i: usize, j: usize| {
            let (dx, dy) = (i as f64 - c, j as f64 - c);
            (-(dx * dx + dy * dy) / sigma).exp()
        };
        let mut vx = Field::from_fn(N, N, |i, j| (i as f64 - c) * 0.01 * gauss(i, j));
        let mut vy = Field::from_fn(N, N, |i, j| (j as f64 - c) * 0.01 * gauss(i, j));
        set_bnd(FieldType::Vx, &mut vx);
        set_bnd(FieldType::Vy, &mut vy);
        (vx, vy)
    }

    #[test]
    fn test_lin_solve_converges() {
        for sched in all_schedules() {
            let x0 = spike(100.0);
            let mut x = x0.clone();
            lin_solve(FieldType::Scalar, &mut x, &x0, 1.0, 5.0, 20, sched).unwrap();

            let center = x.get(N / 2, N / 2);
            let neighbor = x.get(N / 2 + 1, N / 2);
            assert!(center > 0.0, "{sched:?}: center should still be positive");
            assert!(neighbor > 0.0, "{sched:?}: neighbors should get some value");
            assert!(center > neighbor, "{sched:?}: center should be larger than neighbor");
        }
    }

    #[test]
    fn test_lin_solve_single_pass_gauss_seidel_reads_updated_neighbour() {
        // In-place lexicographic order: (2,1) sees the new value of (1,1).
        let mut x0 = Field::new(4, 3);
        x0.set(1, 1, 4.0);
        let mut x = Field::new(4, 3);
        let sched = Schedule::new(Executor::Serial, Sweep::GaussSeidel);
        lin_solve(FieldType::Scalar, &mut x, &x0, 1.0, 4.0, 1, sched).unwrap();
        assert_eq!(x.get(1, 1), 1.0);
        assert_eq!(x.get(2, 1), 0.25);

        let mut x = Field::new(4, 3);
        let sched = Schedule::new(Executor::Serial, Sweep::Jacobi);
        lin_solve(FieldType::Scalar, &mut x, &x0, 1.0, 4.0, 1, sched).unwrap();
        assert_eq!(x.get(1, 1), 1.0);
        assert_eq!(x.get(2, 1), 0.0);
    }

    #[test]
    fn test_lin_solve_red_black_matches_across_executors() {
        let x0 = Field::from_fn(N, N, |i, j| ((i * 13 + j * 7) % 17) as f64);
        for sweep in [Sweep::RedBlack, Sweep::Jacobi] {
            let mut serial = Field::new(N, N);
            let mut parallel = Field::new(N, N);
            lin_solve(FieldType::Vy, &mut serial, &x0, 0.7, 3.8, 9, Schedule::new(Executor::Serial, sweep)).unwrap();
            lin_solve(FieldType::Vy, &mut parallel, &x0, 0.7, 3.8, 9, Schedule::new(Executor::Parallel, sweep)).unwrap();
            assert_eq!(serial, parallel, "{sweep:?} should not depend on the executor");
        }
    }

    #[test]
    fn test_lin_solve_rejects_bad_divisor() {
        let x0 = Field::new(5, 5);
        let mut x = Field::new(5, 5);
        let sched = Schedule::default();
        assert_eq!(
            lin_solve(FieldType::Scalar, &mut x, &x0, 1.0, 0.0, 4, sched),
            Err(SimError::InvalidDivisor(0.0))
        );
        assert!(lin_solve(FieldType::Scalar, &mut x, &x0, 1.0, f64::NAN, 4, sched).is_err());
        assert_eq!(
            lin_solve(FieldType::Scalar, &mut x, &x0, 1.0, 4.0, 0, sched),
            Err(SimError::InvalidIterations)
        );
    }

    #[test]
    fn test_lin_solve_rejects_mismatched_source() {
        let x0 = Field::new(6, 5);
        let mut x = Field::new(5, 5);
        assert_eq!(
            lin_solve(FieldType::Scalar, &mut x, &x0, 1.0, 4.0, 1, Schedule::default()),
            Err(SimError::DimensionMismatch { expected: (5, 5), found: (6, 5) })
        );
    }

    #[test]
    fn test_diffuse_smooths() {
        for sched in all_schedules() {
            let x0 = spike(100.0);
            let mut x = Field::new(N, N);
            diffuse(FieldType::Scalar, &mut x, &x0, 0.1, 0.1, 4, sched).unwrap();

            let center = x.get(N / 2, N / 2);
            let neighbor = x.get(N / 2 + 1, N / 2);
            assert!(center < 100.0, "{sched:?}: center should be less than original spike");
            assert!(neighbor > 0.0, "{sched:?}: neighbors should gain some value");
        }
    }

    #[test]
    fn test_diffuse_keeps_mass_roughly_constant() {
        let sched = Schedule::new(Executor::Serial, Sweep::GaussSeidel);
        let mut x0 = spike(100.0);
        let mut x = Field::new(N, N);
        let before = total_mass(&x0);
        for _ in 0..10 {
            diffuse(FieldType::Scalar, &mut x, &x0, 0.01, 0.1, 20, sched).unwrap();
            std::mem::swap(&mut x, &mut x0);
        }
        let after = total_mass(&x0);
        assert!(x0.get(N / 2, N / 2) < 50.0, "spike should spread out");
        assert!(x0.get(N / 2 + 3, N / 2) > 0.0, "spread should reach a few cells out");
        assert!(
            (after - before).abs() / before < 0.02,
            "interior mass should be nearly preserved: before={before}, after={after}"
        );
    }

    #[test]
    fn test_diffuse_rejects_bad_timestep() {
        let x0 = spike(1.0);
        let mut x = Field::new(N, N);
        for dt in [0.0, -0.016, f64::NAN] {
            let err = diffuse(FieldType::Scalar, &mut x, &x0, 0.1, dt, 4, Schedule::default()).unwrap_err();
            assert!(matches!(err, SimError::InvalidTimestep(_)), "dt={dt} gave {err:?}");
        }
        let err = diffuse(FieldType::Scalar, &mut x, &x0, -1.0, 0.1, 4, Schedule::default()).unwrap_err();
        assert!(matches!(err, SimError::InvalidCoefficient { .. }));
    }

    #[test]
    fn test_advect_zero_velocity_preserves() {
        for executor in [Executor::Serial, Executor::Parallel] {
            let mut d0 = Field::from_fn(N, N, |i, j| (i as f64) / N as f64 + (j * j) as f64 * 0.001);
            set_bnd(FieldType::Scalar, &mut d0);
            let mut d = Field::new(N, N);
            let vx = Field::new(N, N);
            let vy = Field::new(N, N);

            advect(FieldType::Scalar, &mut d, &d0, &vx, &vy, 0.1, executor).unwrap();

            for (i, j) in d0.interior() {
                let orig = d0.get(i, j);
                let advected = d.get(i, j);
                assert!(
                    (orig - advected).abs() < 1e-12,
                    "Zero velocity should preserve field at ({}, {}): {} vs {}",
                    i, j, orig, advected
                );
            }
        }
    }

    #[test]
    fn test_advect_uniform_field_unchanged() {
        let d0 = Field::filled(N, N, 5.0);
        let mut d = Field::new(N, N);
        let vx = Field::filled(N, N, 0.01);
        let vy = Field::filled(N, N, -0.02);

        advect(FieldType::Scalar, &mut d, &d0, &vx, &vy, 0.1, Executor::Parallel).unwrap();

        for j in 0..N {
            for i in 0..N {
                let val = d.get(i, j);
                assert!(
                    (val - 5.0).abs() < 1e-9,
                    "Uniform field should stay uniform: got {} at ({}, {})",
                    val, i, j
                );
            }
        }
    }

    #[test]
    fn test_advect_shifts_by_whole_cells() {
        // dt * (N - 2) * vx == 1 moves the profile one cell to the right.
        let d0 = Field::from_fn(N, N, |i, _| i as f64);
        let mut d = Field::new(N, N);
        let dt = 0.1;
        let vx = Field::filled(N, N, 1.0 / (dt * (N - 2) as f64));
        let vy = Field::new(N, N);

        advect(FieldType::Scalar, &mut d, &d0, &vx, &vy, dt, Executor::Serial).unwrap();

        for j in 1..(N - 1) {
            for i in 2..(N - 1) {
                assert!((d.get(i, j) - (i - 1) as f64).abs() < 1e-9, "({i}, {j}) = {}", d.get(i, j));
            }
        }
    }

    #[test]
    fn test_advect_huge_velocity_stays_on_grid() {
        let d0 = Field::filled(N, N, 1.0);
        let mut d = Field::new(N, N);
        let vx = Field::filled(N, N, -1.0e6);
        let vy = Field::filled(N, N, 1.0e6);

        advect(FieldType::Scalar, &mut d, &d0, &vx, &vy, 0.1, Executor::Parallel).unwrap();

        for (i, j) in d.interior() {
            let val = d.get(i, j);
            assert!(
                (0.0..=1.0 + 1e-10).contains(&val),
                "Advected value should be in [0,1] at ({},{}): got {}",
                i, j, val
            );
        }
    }

    #[test]
    fn test_advect_rejects_mismatched_velocity() {
        let d0 = Field::new(N, N);
        let mut d = Field::new(N, N);
        let vx = Field::new(N, N - 1);
        let vy = Field::new(N, N);
        assert!(matches!(
            advect(FieldType::Scalar, &mut d, &d0, &vx, &vy, 0.1, Executor::Serial),
            Err(SimError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_project_reduces_divergence() {
        for sched in all_schedules() {
            for iter in [1, 4, 40] {
                let (mut vx, mut vy) = divergent_velocity();
                let mut p = Field::new(N, N);
                let mut div = Field::new(N, N);

                let before = divergence_l2(&vx, &vy);
                assert!(before > 0.0, "Should have some initial divergence");

                project(&mut vx, &mut vy, &mut p, &mut div, iter, sched).unwrap();

                let after = divergence_l2(&vx, &vy);
                assert!(
                    after < before,
                    "{sched:?} iter={iter}: divergence should be reduced: before={}, after={}",
                    before, after
                );
            }
        }
    }

    #[test]
    fn test_project_leaves_divergence_free_field_alone() {
        // Uniform flow has zero central-difference divergence in the interior.
        let mut vx = Field::filled(N, N, 0.3);
        let mut vy = Field::new(N, N);
        let mut p = Field::filled(N, N, 9.0);
        let mut div = Field::filled(N, N, 9.0);
        project(&mut vx, &mut vy, &mut p, &mut div, 10, Schedule::default()).unwrap();
        for j in 2..(N - 2) {
            for i in 2..(N - 2) {
                assert!(p.get(i, j).abs() < 1e-12, "pressure should stay zero at ({i}, {j})");
                assert!((vx.get(i, j) - 0.3).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn test_project_applies_velocity_boundaries() {
        let (mut vx, mut vy) = divergent_velocity();
        let mut p = Field::new(N, N);
        let mut div = Field::new(N, N);
        project(&mut vx, &mut vy, &mut p, &mut div, 8, Schedule::default()).unwrap();
        for j in 1..(N - 1) {
            assert_eq!(vx.get(0, j), -vx.get(1, j));
            assert_eq!(vy.get(0, j), vy.get(1, j));
        }
        for i in 1..(N - 1) {
            assert_eq!(vy.get(i, N - 1), -vy.get(i, N - 2));
            assert_eq!(vx.get(i, N - 1), vx.get(i, N - 2));
        }
    }

    #[test]
    fn test_steps_reject_grid_without_interior() {
        let sched = Schedule::new(Executor::Serial, Sweep::GaussSeidel);
        let tiny = Field::new(1, 1);
        let mut out = Field::new(1, 1);
        assert_eq!(
            advect(FieldType::Scalar, &mut out, &tiny, &tiny, &tiny, 0.1, Executor::Parallel),
            Err(SimError::InvalidDimensions { width: 1, height: 1 })
        );

        let thin = Field::new(2, 5);
        let mut x = Field::new(2, 5);
        assert_eq!(
            lin_solve(FieldType::Scalar, &mut x, &thin, 1.0, 4.0, 3, sched),
            Err(SimError::InvalidDimensions { width: 2, height: 5 })
        );
        assert_eq!(
            diffuse(FieldType::Vx, &mut x, &thin, 0.1, 0.1, 3, sched),
            Err(SimError::InvalidDimensions { width: 2, height: 5 })
        );

        let (mut vx, mut vy, mut p, mut div) = (Field::new(0, 0), Field::new(0, 0), Field::new(0, 0), Field::new(0, 0));
        assert_eq!(
            project(&mut vx, &mut vy, &mut p, &mut div, 3, sched),
            Err(SimError::InvalidDimensions { width: 0, height: 0 })
        );
    }
}
