use crate::error::{Result, SimError};

/// Convert 2D coordinates to a row-major index.
/// Use only when 0 <= i < width and 0 <= j < height.
#[inline(always)]
pub const fn idx(i: usize, j: usize, width: usize) -> usize {
    j * width + i
}

/// Fixed-size 2D grid of `f64` values, stored row-major.
///
/// Cells with `i` in `1..width-1` and `j` in `1..height-1` are interior; the
/// outer ring belongs to the boundary enforcer.
#[derive(Clone, Debug, PartialEq)]
pub struct Field {
    width: usize,
    height: usize,
    data: Vec<f64>,
}

impl Field {
    /// Zero-filled field.
    pub fn new(width: usize, height: usize) -> Self {
        Self::filled(width, height, 0.0)
    }

    pub fn filled(width: usize, height: usize, value: f64) -> Self {
        Self {
            width,
            height,
            data: vec![value; width * height],
        }
    }

    pub fn from_fn(width: usize, height: usize, f: impl Fn(usize, usize) -> f64) -> Self {
        let data = (0..width * height)
            .map(|k| f(k % width, k / width))
            .collect();
        Self { width, height, data }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn dims(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    #[inline]
    pub fn get(&self, i: usize, j: usize) -> f64 {
        debug_assert!(i < self.width && j < self.height, "({i}, {j}) outside {}x{}", self.width, self.height);
        self.data[idx(i, j, self.width)]
    }

    #[inline]
    pub fn set(&mut self, i: usize, j: usize, value: f64) {
        debug_assert!(i < self.width && j < self.height, "({i}, {j}) outside {}x{}", self.width, self.height);
        self.data[idx(i, j, self.width)] = value;
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.data
    }

    pub fn fill(&mut self, value: f64) {
        self.data.fill(value);
    }

    /// Overwrite every cell (boundary included) with `other`'s values.
    pub fn copy_from(&mut self, other: &Field) {
        debug_assert_eq!(self.dims(), other.dims());
        self.data.copy_from_slice(&other.data);
    }

    /// Interior cells in row-major order.
    pub fn interior(&self) -> impl Iterator<Item = (usize, usize)> {
        let (w, h) = (self.width, self.height);
        (1..h.saturating_sub(1)).flat_map(move |j| (1..w.saturating_sub(1)).map(move |i| (i, j)))
    }

    pub fn is_interior(&self, i: usize, j: usize) -> bool {
        i >= 1 && j >= 1 && i + 1 < self.width && j + 1 < self.height
    }

    /// Fails with `InvalidDimensions` unless the field has at least one interior cell.
    pub fn expect_interior(&self) -> Result<()> {
        if self.width <= 2 || self.height <= 2 {
            Err(SimError::InvalidDimensions {
                width: self.width,
                height: self.height,
            })
        } else {
            Ok(())
        }
    }

    /// Fails with `DimensionMismatch` unless this field is `width x height`.
    pub fn expect_dims(&self, width: usize, height: usize) -> Result<()> {
        if self.dims() == (width, height) {
            Ok(())
        } else {
            Err(SimError::DimensionMismatch {
                expected: (width, height),
                found: self.dims(),
            })
        }
    }
}
