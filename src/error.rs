//! Error types for the Proxima library.
//!
//! All failures surface synchronously through the [`ProximaError`] enum.
//! Mutating operations are atomic with respect to a single index instance:
//! a call that returns an error leaves the index in its prior valid state.

use std::io;

use thiserror::Error;

/// The main error type for Proxima operations.
#[derive(Error, Debug)]
pub enum ProximaError {
    /// I/O errors (index save/load).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Input vector length does not match the index dimensionality.
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// An `add` with an internal id that is already present.
    #[error("Duplicate id: {0}")]
    DuplicateId(u64),

    /// A `remove` or lookup of an internal id that is not present.
    #[error("Id not found: {0}")]
    NotFound(u64),

    /// Malformed parameter (bad k/ef/M, non-finite vector values, etc.).
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Search over an index with zero live vectors.
    ///
    /// The indexes in this crate never produce this themselves — `search`
    /// on an empty index returns an empty result. The variant exists for
    /// embedding layers that want to signal emptiness as an error.
    #[error("Index is empty")]
    EmptyIndex,

    /// Load-time structural inconsistency in a persisted index.
    #[error("Corrupt index: {0}")]
    CorruptIndex(String),
}

/// Result type alias for operations that may fail with [`ProximaError`].
pub type Result<T> = std::result::Result<T, ProximaError>;

impl ProximaError {
    /// Create a new invalid argument error.
    pub fn invalid_argument<S: Into<String>>(msg: S) -> Self {
        ProximaError::InvalidArgument(msg.into())
    }

    /// Create a new corrupt index error.
    pub fn corrupt<S: Into<String>>(msg: S) -> Self {
        ProximaError::CorruptIndex(msg.into())
    }
}
