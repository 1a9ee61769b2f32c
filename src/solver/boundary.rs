use crate::field::{idx, Field};

/// Field type for boundary condition dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    /// Density, pressure, divergence: copy the neighbour (zero flux).
    Scalar,
    /// X velocity: negated at the left/right walls (no penetration).
    Vx,
    /// Y velocity: negated at the top/bottom walls (no penetration).
    Vy,
}

/// Boundary condition handler for a closed box.
///
/// Edges copy their interior neighbour, negating it for the velocity
/// component normal to that wall. Corners take the mean of their two edge
/// neighbours, so they must be written after the edges. A field without
/// interior cells has nothing to mirror and is left as is.
pub fn set_bnd(field_type: FieldType, x: &mut Field) {
    let (w, h) = x.dims();
    if w <= 2 || h <= 2 {
        return;
    }
    let d = x.as_mut_slice();

    let flip_y = if field_type == FieldType::Vy { -1.0 } else { 1.0 };
    for i in 1..(w - 1) {
        d[idx(i, 0, w)] = flip_y * d[idx(i, 1, w)];
        d[idx(i, h - 1, w)] = flip_y * d[idx(i, h - 2, w)];
    }

    let flip_x = if field_type == FieldType::Vx { -1.0 } else { 1.0 };
    for j in 1..(h - 1) {
        d[idx(0, j, w)] = flip_x * d[idx(1, j, w)];
        d[idx(w - 1, j, w)] = flip_x * d[idx(w - 2, j, w)];
    }

    d[idx(0, 0, w)] = 0.5 * (d[idx(1, 0, w)] + d[idx(0, 1, w)]);
    d[idx(0, h - 1, w)] = 0.5 * (d[idx(1, h - 1, w)] + d[idx(0, h - 2, w)]);
    d[idx(w - 1, 0, w)] = 0.5 * (d[idx(w - 2, 0, w)] + d[idx(w - 1, 1, w)]);
    d[idx(w - 1, h - 1, w)] = 0.5 * (d[idx(w - 2, h - 1, w)] + d[idx(w - 1, h - 2, w)]);
}
