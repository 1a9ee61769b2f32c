use crate::field::Field;

/// Sum of a field over interior cells.
pub fn total_mass(f: &Field) -> f64 {
    f.interior().map(|(i, j)| f.get(i, j)).sum()
}

/// Mass-weighted mean column of a non-negative field, or `None` when empty.
pub fn centroid_x(f: &Field) -> Option<f64> {
    let (mut mass, mut moment) = (0.0, 0.0);
    for (i, j) in f.interior() {
        let v = f.get(i, j);
        mass += v;
        moment += v * i as f64;
    }
    if mass > 0.0 { Some(moment / mass) } else { None }
}

/// Interior sum of a field restricted to columns `i < column`.
pub fn mass_left_of(f: &Field, column: usize) -> f64 {
    f.interior()
        .filter(|&(i, _)| i < column)
        .map(|(i, j)| f.get(i, j))
        .sum()
}

/// L2 norm of the central-difference divergence over interior cells,
/// scaled the same way as the projection's divergence field.
pub fn divergence_l2(vx: &Field, vy: &Field) -> f64 {
    let (w, h) = vx.dims();
    let (wf, hf) = (w as f64, h as f64);
    vx.interior()
        .map(|(i, j)| {
            let d = -0.5
                * ((vx.get(i + 1, j) - vx.get(i - 1, j)) / wf + (vy.get(i, j + 1) - vy.get(i, j - 1)) / hf);
            d * d
        })
        .sum::<f64>()
        .sqrt()
}

/// Volume-averaged kinetic energy: KE = 0.5 * <vx² + vy²>.
pub fn kinetic_energy(vx: &Field, vy: &Field) -> f64 {
    let mut sum = 0.0;
    let mut count = 0usize;
    for (i, j) in vx.interior() {
        let (u, v) = (vx.get(i, j), vy.get(i, j));
        sum += u * u + v * v;
        count += 1;
    }
    if count > 0 { 0.5 * sum / count as f64 } else { 0.0 }
}
