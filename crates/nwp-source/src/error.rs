//! Error types for the NWP source crate.

use chrono::{DateTime, Utc};
use thiserror::Error;

use labeled_grid::GridError;
use nwp_common::TimeError;

/// Errors that can occur while configuring or opening a data source.
#[derive(Error, Debug)]
pub enum NwpError {
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("{0}")]
    DataUnavailable(String),

    #[error(
        "The given parameters: {context} returned {count} datasets that cannot be \
         concatenated, please review your selected pattern: {pattern}"
    )]
    AmbiguousPattern {
        pattern: String,
        count: usize,
        context: String,
    },

    #[error(
        "Data not available for the requested forecast lead time for {context}, \
         requested: {requested_start} - {requested_end}, \
         available: {available_start} - {available_end}"
    )]
    Coverage {
        context: String,
        requested_start: DateTime<Utc>,
        requested_end: DateTime<Utc>,
        available_start: DateTime<Utc>,
        available_end: DateTime<Utc>,
    },

    #[error("Retrieval failed: {0}")]
    Retrieval(String),

    #[error("Grid operation failed: {0}")]
    Grid(#[from] GridError),

    #[error("Failed to read catalog: {0}")]
    CatalogRead(#[from] std::io::Error),

    #[error("Invalid catalog: {0}")]
    Catalog(String),
}

impl NwpError {
    /// Create a Configuration error.
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create a DataUnavailable error.
    pub fn data_unavailable(msg: impl Into<String>) -> Self {
        Self::DataUnavailable(msg.into())
    }

    /// Create a Catalog error.
    pub fn catalog(msg: impl Into<String>) -> Self {
        Self::Catalog(msg.into())
    }
}

impl From<TimeError> for NwpError {
    fn from(err: TimeError) -> Self {
        Self::Configuration(err.to_string())
    }
}

/// Result type for data source operations.
pub type Result<T> = std::result::Result<T, NwpError>;
