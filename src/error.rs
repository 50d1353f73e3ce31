//! Error types for race construction
//!
//! Only configuration can fail. Once a race is built, stepping never errors.

use thiserror::Error;

/// Errors raised while turning a grid (or a prebuilt index list) into a loop.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TrackError {
    #[error("track has no track cells")]
    Empty,
    #[error("grid row {row} has a different width than row 0")]
    RaggedGrid { row: usize },
    #[error("unknown cell character {ch:?} at row {row}, column {col}")]
    UnknownCell { ch: char, row: usize, col: usize },
    #[error("track cell {index} is a dead end")]
    DeadEnd { index: usize },
    #[error("track cell {index} branches ({neighbors} track neighbors)")]
    Branch { index: usize, neighbors: usize },
    #[error("track is not one closed loop (visited {visited} of {total} cells)")]
    Disconnected { visited: usize, total: usize },
    #[error("loop cell {index} appears more than once")]
    DuplicateCell { index: usize },
    #[error("loop cells {from} and {to} are not adjacent")]
    NotAdjacent { from: usize, to: usize },
}

/// Errors raised when race configuration invariants are violated.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("field size {size} exceeds the cap of {cap}")]
    FieldTooLarge { size: usize, cap: usize },
    #[error("{seats} team seats do not fit in a field of {field}")]
    TooManySeats { seats: usize, field: usize },
    #[error("lap target must be at least 1")]
    ZeroLaps,
    #[error("{field} must be greater than zero (got {value:.3})")]
    NotPositive { field: &'static str, value: f32 },
    #[error("{field} must be between {min:.2} and {max:.2} (got {value:.2})")]
    RangeViolation {
        field: &'static str,
        min: f32,
        max: f32,
        value: f32,
    },
    #[error("invalid race config JSON: {0}")]
    Json(String),
}

/// Anything that can reject race construction.
#[derive(Debug, Error, PartialEq)]
pub enum RaceError {
    #[error(transparent)]
    Track(#[from] TrackError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}
