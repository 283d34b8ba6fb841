//! Error types for labeled grid operations.

use thiserror::Error;

/// Errors that can occur while reshaping a labeled grid.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GridError {
    /// The named dimension does not exist.
    #[error("unknown dimension: {0}")]
    UnknownDimension(String),

    /// The named coordinate does not exist.
    #[error("unknown coordinate: {0}")]
    UnknownCoordinate(String),

    /// The target name is already taken by another dimension or field.
    #[error("name conflict: {0}")]
    NameConflict(String),

    /// Array shape does not agree with the declared dimensions.
    #[error("shape mismatch for '{name}': expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        name: String,
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    /// Operation not supported for this layout.
    #[error("unsupported operation: {0}")]
    Unsupported(String),
}

impl GridError {
    /// Create a NameConflict error.
    pub fn name_conflict(msg: impl Into<String>) -> Self {
        Self::NameConflict(msg.into())
    }

    /// Create an Unsupported error.
    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported(msg.into())
    }

    /// Create a ShapeMismatch error.
    pub fn shape_mismatch(name: impl Into<String>, expected: &[usize], actual: &[usize]) -> Self {
        Self::ShapeMismatch {
            name: name.into(),
            expected: expected.to_vec(),
            actual: actual.to_vec(),
        }
    }
}

impl From<ndarray::ShapeError> for GridError {
    fn from(err: ndarray::ShapeError) -> Self {
        Self::Unsupported(format!("reshape failed: {}", err))
    }
}

/// Result type for grid operations.
pub type Result<T> = std::result::Result<T, GridError>;
