//! Labeled grid abstraction for NWP datasets.
//!
//! Decoded model output is a set of data variables laid out along named
//! dimensions (`step`, `latitude`, `longitude`, ...) with coordinate labels.
//! Data sources only need a handful of reshaping operations on such a
//! dataset, captured by the [`LabeledGrid`] trait:
//!
//! - **Reindex**: replace the labels of a dimension
//! - **Drop / rename**: remove fields, rename dimensions and variables
//! - **Stack**: flatten two dimensions into one
//! - **Sort**: reorder a dimension by its coordinate
//!
//! [`GridDataset`] is an in-memory implementation backed by `ndarray`.
//!
//! # Example
//!
//! ```ignore
//! use labeled_grid::{CoordValues, Coordinate, GridDataset, LabeledGrid, Variable};
//!
//! let ds = GridDataset::new()
//!     .with_coord("step", Coordinate::new(&["step"], CoordValues::step_hours(&[0, 3, 6])))?
//!     .with_variable("t2m", Variable::new(&["step"], data))?;
//!
//! let ds = ds.rename_dim("step", "lead")?.sort_by("lead")?;
//! ```

pub mod coord;
pub mod dataset;
pub mod error;
pub mod grid;

// Re-export commonly used types at crate root
pub use coord::{CoordValues, Coordinate};
pub use dataset::{GridDataset, Variable};
pub use error::{GridError, Result};
pub use grid::LabeledGrid;
