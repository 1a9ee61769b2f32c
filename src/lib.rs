pub mod config;
pub mod error;
pub mod field;
pub mod palette;
pub mod physics;
pub mod renderer;
pub mod sixel;
pub mod solver;
pub mod state;

pub use error::{Result, SimError};
pub use field::Field;
pub use palette::Palette;
pub use solver::{Executor, FieldType, SolverParams, Sweep};
pub use state::{FrameSnapshot, SimState};
