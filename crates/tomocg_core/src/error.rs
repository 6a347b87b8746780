//! Error types for the reconstruction layer

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TomoError {
    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("volume depth {nz} is not an exact multiple of partition size {pnz}")]
    PartitionMismatch { nz: usize, pnz: usize },

    #[error("shape mismatch: expected {expected} elements, got {actual}")]
    ShapeMismatch { expected: usize, actual: usize },

    #[error("device resource exhausted: {0}")]
    ResourceExhausted(String),

    #[error("transform binding error: {0}")]
    Binding(String),
}

impl TomoError {
    /// Whether retrying with a smaller partition size can succeed.
    ///
    /// Resource exhaustion is the only retryable condition; every other
    /// variant is a precondition or binding failure that a retry cannot fix.
    pub fn is_retryable(&self) -> bool {
        matches!(self, TomoError::ResourceExhausted(_))
    }
}

pub type Result<T> = std::result::Result<T, TomoError>;
