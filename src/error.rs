use thiserror::Error;

/// Errors raised at the solver's call boundaries.
///
/// Inner loops never fail: shapes and coefficients are checked once when a
/// step is entered, so a bad value is reported before it can turn into NaN.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SimError {
    #[error("grid must be at least 3x3 to have interior cells, got {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },

    #[error("field is {found:?} but the simulation grid is {expected:?}")]
    DimensionMismatch {
        expected: (usize, usize),
        found: (usize, usize),
    },

    #[error("timestep must be finite and positive, got {0}")]
    InvalidTimestep(f64),

    #[error("{name} must be finite and non-negative, got {value}")]
    InvalidCoefficient { name: &'static str, value: f64 },

    #[error("relaxation divisor must be positive, got {0}")]
    InvalidDivisor(f64),

    #[error("iteration count must be at least 1")]
    InvalidIterations,

    #[error("config error: {0}")]
    Config(String),

    #[error("render error: {0}")]
    Render(String),
}

pub type Result<T> = std::result::Result<T, SimError>;
