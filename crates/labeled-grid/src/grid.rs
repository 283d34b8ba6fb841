//! The labeled grid capability trait.

use std::collections::BTreeMap;

use crate::coord::{CoordValues, Coordinate};
use crate::error::Result;

/// Narrow interface over a labeled multidimensional dataset.
///
/// Reshaping operations consume the grid and return the reshaped one, so a
/// pipeline reads as a chain of `?`-propagating calls. Any array-library
/// binding that can express these operations can back a data source.
pub trait LabeledGrid: Sized {
    /// Dimension names in order.
    fn dims(&self) -> Vec<String>;

    /// Length of a dimension.
    fn dim_len(&self, dim: &str) -> Option<usize>;

    /// Names of every coordinate (dimension and auxiliary).
    fn coord_names(&self) -> Vec<String>;

    /// Names of the data variables.
    fn variable_names(&self) -> Vec<String>;

    /// A copy of the named coordinate.
    fn coordinate(&self, name: &str) -> Option<Coordinate>;

    /// Replace the labels of dimension `dim` (reindex in place).
    fn assign_coord(self, dim: &str, values: CoordValues) -> Result<Self>;

    /// Drop coordinates or variables by name. Absent names are ignored.
    fn drop_fields(self, names: &[&str]) -> Result<Self>;

    /// Rename a dimension, along with its index coordinate.
    fn rename_dim(self, from: &str, to: &str) -> Result<Self>;

    /// Flatten dimensions `dims[0]` × `dims[1]` into `new_dim` (C order),
    /// labelled by `labels`.
    fn stack(self, dims: [&str; 2], new_dim: &str, labels: CoordValues) -> Result<Self>;

    /// Reorder data so coordinate `name` is ascending.
    fn sort_by(self, name: &str) -> Result<Self>;

    /// Rename data variables (old name -> new name).
    fn rename_variables(self, mapping: &BTreeMap<String, String>) -> Result<Self>;

    /// Set a dataset-level attribute.
    fn set_attr(&mut self, key: &str, value: serde_json::Value);

    /// Coordinates that index a dimension of the same name.
    fn dim_coord_names(&self) -> Vec<String> {
        self.coord_names()
            .into_iter()
            .filter(|name| {
                self.coordinate(name)
                    .map_or(false, |c| c.is_dimension_coord(name))
            })
            .collect()
    }
}
