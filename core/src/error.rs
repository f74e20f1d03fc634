use thiserror::Error;

use crate::Coord2;

#[derive(Error, Debug, Copy, Clone, PartialEq)]
pub enum FieldError {
    #[error("Invalid coordinates")]
    InvalidCoords,
    #[error("Grid must have at least one row and one column")]
    InvalidSize,
    #[error("Mine fraction {0} is outside [0, 1)")]
    InvalidMineFraction(f32),
    #[error("Grid size {actual:?} does not match expected {expected:?}")]
    SizeMismatch { expected: Coord2, actual: Coord2 },
    #[error("No layout yet, reset the environment first")]
    NotStarted,
    #[error("No layout with a zero-count start cell after {attempts} attempts")]
    NoSafeStart { attempts: u32 },
}

pub type Result<T> = core::result::Result<T, FieldError>;
