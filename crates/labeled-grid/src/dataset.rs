//! In-memory labeled dataset backed by `ndarray`.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use ndarray::{ArrayD, Axis, IxDyn};
use serde_json::Value;
use tracing::debug;

use crate::coord::{CoordValues, Coordinate};
use crate::error::{GridError, Result};
use crate::grid::LabeledGrid;

/// A data variable: values laid out along named dimensions.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub dims: Vec<String>,
    pub data: ArrayD<f32>,
    pub attrs: BTreeMap<String, Value>,
}

impl Variable {
    pub fn new(dims: &[&str], data: ArrayD<f32>) -> Self {
        Self {
            dims: dims.iter().map(|d| d.to_string()).collect(),
            data,
            attrs: BTreeMap::new(),
        }
    }

    pub fn with_attr(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.attrs.insert(key.to_string(), value.into());
        self
    }
}

/// Dimensions, coordinates and data variables held in memory.
///
/// Insertion order of every map is preserved so that reshaping keeps the
/// layout produced by the decoder.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GridDataset {
    dims: IndexMap<String, usize>,
    coords: IndexMap<String, Coordinate>,
    variables: IndexMap<String, Variable>,
    attrs: BTreeMap<String, Value>,
}

impl GridDataset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) a coordinate, registering its dimensions.
    pub fn add_coord(&mut self, name: &str, coord: Coordinate) -> Result<()> {
        if self.variables.contains_key(name) {
            return Err(GridError::name_conflict(format!(
                "'{}' is already a data variable",
                name
            )));
        }
        self.register_dims(name, &coord.dims, coord.values.shape())?;
        self.coords.insert(name.to_string(), coord);
        Ok(())
    }

    /// Add (or replace) a data variable, registering its dimensions.
    pub fn add_variable(&mut self, name: &str, variable: Variable) -> Result<()> {
        if self.coords.contains_key(name) {
            return Err(GridError::name_conflict(format!(
                "'{}' is already a coordinate",
                name
            )));
        }
        self.register_dims(name, &variable.dims, variable.data.shape())?;
        self.variables.insert(name.to_string(), variable);
        Ok(())
    }

    /// Builder form of [`GridDataset::add_coord`].
    pub fn with_coord(mut self, name: &str, coord: Coordinate) -> Result<Self> {
        self.add_coord(name, coord)?;
        Ok(self)
    }

    /// Builder form of [`GridDataset::add_variable`].
    pub fn with_variable(mut self, name: &str, variable: Variable) -> Result<Self> {
        self.add_variable(name, variable)?;
        Ok(self)
    }

    pub fn coord(&self, name: &str) -> Option<&Coordinate> {
        self.coords.get(name)
    }

    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.variables.get(name)
    }

    pub fn attrs(&self) -> &BTreeMap<String, Value> {
        &self.attrs
    }

    /// Timestamps of a time-valued coordinate, in logical order.
    pub fn times(&self, name: &str) -> Option<Vec<DateTime<Utc>>> {
        self.coords.get(name).and_then(|c| c.values.time_vec())
    }

    fn register_dims(&mut self, name: &str, dims: &[String], shape: &[usize]) -> Result<()> {
        let declared: Vec<usize> = dims
            .iter()
            .zip(shape)
            .map(|(d, n)| self.dims.get(d).copied().unwrap_or(*n))
            .collect();
        if dims.len() != shape.len() || declared != shape {
            return Err(GridError::shape_mismatch(name, &declared, shape));
        }
        for (d, n) in dims.iter().zip(shape) {
            self.dims.entry(d.clone()).or_insert(*n);
        }
        Ok(())
    }
}

impl LabeledGrid for GridDataset {
    fn dims(&self) -> Vec<String> {
        self.dims.keys().cloned().collect()
    }

    fn dim_len(&self, dim: &str) -> Option<usize> {
        self.dims.get(dim).copied()
    }

    fn coord_names(&self) -> Vec<String> {
        self.coords.keys().cloned().collect()
    }

    fn variable_names(&self) -> Vec<String> {
        self.variables.keys().cloned().collect()
    }

    fn coordinate(&self, name: &str) -> Option<Coordinate> {
        self.coords.get(name).cloned()
    }

    fn assign_coord(mut self, dim: &str, values: CoordValues) -> Result<Self> {
        let len = self
            .dim_len(dim)
            .ok_or_else(|| GridError::UnknownDimension(dim.to_string()))?;
        if values.ndim() != 1 || values.len() != len {
            return Err(GridError::shape_mismatch(dim, &[len], values.shape()));
        }
        self.coords.insert(
            dim.to_string(),
            Coordinate {
                dims: vec![dim.to_string()],
                values,
            },
        );
        Ok(self)
    }

    fn drop_fields(mut self, names: &[&str]) -> Result<Self> {
        for name in names {
            self.coords.shift_remove(*name);
            self.variables.shift_remove(*name);
        }
        Ok(self)
    }

    fn rename_dim(mut self, from: &str, to: &str) -> Result<Self> {
        if !self.dims.contains_key(from) {
            return Err(GridError::UnknownDimension(from.to_string()));
        }
        if from == to {
            return Ok(self);
        }
        if self.dims.contains_key(to) || self.coords.contains_key(to) || self.variables.contains_key(to) {
            return Err(GridError::name_conflict(format!(
                "cannot rename dimension '{}' to existing name '{}'",
                from, to
            )));
        }

        self.dims = rename_key(self.dims, from, to);
        self.coords = rename_key(self.coords, from, to);
        for coord in self.coords.values_mut() {
            rename_in(&mut coord.dims, from, to);
        }
        for var in self.variables.values_mut() {
            rename_in(&mut var.dims, from, to);
        }
        Ok(self)
    }

    fn stack(mut self, dims: [&str; 2], new_dim: &str, labels: CoordValues) -> Result<Self> {
        let [a, b] = dims;
        if a == b {
            return Err(GridError::unsupported(format!("cannot stack '{}' with itself", a)));
        }
        let len_a = self
            .dim_len(a)
            .ok_or_else(|| GridError::UnknownDimension(a.to_string()))?;
        let len_b = self
            .dim_len(b)
            .ok_or_else(|| GridError::UnknownDimension(b.to_string()))?;
        let flat = len_a * len_b;
        if labels.ndim() != 1 || labels.len() != flat {
            return Err(GridError::shape_mismatch(new_dim, &[flat], labels.shape()));
        }
        if new_dim != a && new_dim != b && self.dims.contains_key(new_dim) {
            return Err(GridError::name_conflict(format!(
                "dimension '{}' already exists",
                new_dim
            )));
        }
        if self.variables.contains_key(new_dim) {
            return Err(GridError::name_conflict(format!(
                "'{}' is already a data variable",
                new_dim
            )));
        }

        let mut variables = IndexMap::with_capacity(self.variables.len());
        for (name, var) in std::mem::take(&mut self.variables) {
            let pa = var.dims.iter().position(|d| d == a);
            let pb = var.dims.iter().position(|d| d == b);
            let var = match (pa, pb) {
                (Some(pa), Some(pb)) => {
                    let (dims, data) = stack_axes(&var.dims, var.data, pa, pb, new_dim, flat)?;
                    Variable { dims, data, attrs: var.attrs }
                }
                (None, None) => var,
                _ => {
                    return Err(GridError::unsupported(format!(
                        "variable '{}' spans only one of '{}' and '{}'",
                        name, a, b
                    )))
                }
            };
            variables.insert(name, var);
        }

        let mut coords = IndexMap::with_capacity(self.coords.len() + 1);
        for (name, coord) in std::mem::take(&mut self.coords) {
            let touches = coord.dims.iter().any(|d| d == a || d == b);
            if !touches {
                coords.insert(name, coord);
            } else if coord.dims == [a, b] {
                let values = coord.values.reshape(&[flat])?;
                coords.insert(name, Coordinate { dims: vec![new_dim.to_string()], values });
            } else {
                debug!(coordinate = %name, "Dropping coordinate consumed by stack");
            }
        }
        if coords.contains_key(new_dim) {
            return Err(GridError::name_conflict(format!(
                "coordinate '{}' already exists",
                new_dim
            )));
        }
        coords.insert(
            new_dim.to_string(),
            Coordinate {
                dims: vec![new_dim.to_string()],
                values: labels,
            },
        );

        let mut new_dims = IndexMap::with_capacity(self.dims.len() - 1);
        for (name, len) in std::mem::take(&mut self.dims) {
            if name == a {
                new_dims.insert(new_dim.to_string(), flat);
            } else if name != b {
                new_dims.insert(name, len);
            }
        }

        self.dims = new_dims;
        self.coords = coords;
        self.variables = variables;
        Ok(self)
    }

    fn sort_by(mut self, name: &str) -> Result<Self> {
        let (dim, order) = {
            let coord = self
                .coords
                .get(name)
                .ok_or_else(|| GridError::UnknownCoordinate(name.to_string()))?;
            if coord.dims.is_empty() {
                return Ok(self);
            }
            (coord.dims[0].clone(), coord.values.argsort()?)
        };
        if order.iter().enumerate().all(|(i, &j)| i == j) {
            return Ok(self);
        }

        for coord in self.coords.values_mut() {
            if let Some(axis) = coord.dims.iter().position(|d| *d == dim) {
                coord.values = coord.values.select(axis, &order);
            }
        }
        for var in self.variables.values_mut() {
            if let Some(axis) = var.dims.iter().position(|d| *d == dim) {
                var.data = var.data.select(Axis(axis), &order);
            }
        }
        Ok(self)
    }

    fn rename_variables(mut self, mapping: &BTreeMap<String, String>) -> Result<Self> {
        for key in mapping.keys().filter(|k| !self.variables.contains_key(*k)) {
            debug!(variable = %key, "Rename skipped, variable not present");
        }

        let mut renamed = IndexMap::with_capacity(self.variables.len());
        for (name, var) in std::mem::take(&mut self.variables) {
            let target = mapping.get(&name).cloned().unwrap_or(name);
            if renamed.contains_key(&target) || self.coords.contains_key(&target) {
                return Err(GridError::name_conflict(format!(
                    "rename target '{}' collides with an existing field",
                    target
                )));
            }
            renamed.insert(target, var);
        }
        self.variables = renamed;
        Ok(self)
    }

    fn set_attr(&mut self, key: &str, value: Value) {
        self.attrs.insert(key.to_string(), value);
    }
}

impl fmt::Display for GridDataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dims: Vec<String> = self
            .dims
            .iter()
            .map(|(name, len)| format!("{}: {}", name, len))
            .collect();
        writeln!(f, "<GridDataset>")?;
        writeln!(f, "Dimensions:  ({})", dims.join(", "))?;
        writeln!(f, "Coordinates:")?;
        for (name, coord) in &self.coords {
            let marker = if coord.is_dimension_coord(name) { "*" } else { " " };
            writeln!(
                f,
                "  {} {:<16} ({}) {}",
                marker,
                name,
                coord.dims.join(", "),
                coord.values.kind()
            )?;
        }
        writeln!(f, "Data variables:")?;
        for (name, var) in &self.variables {
            writeln!(f, "    {:<16} ({}) f32", name, var.dims.join(", "))?;
        }
        if !self.attrs.is_empty() {
            writeln!(f, "Attributes:")?;
            for (key, value) in &self.attrs {
                writeln!(f, "    {}: {}", key, value)?;
            }
        }
        Ok(())
    }
}

fn rename_key<V>(map: IndexMap<String, V>, from: &str, to: &str) -> IndexMap<String, V> {
    map.into_iter()
        .map(|(k, v)| if k == from { (to.to_string(), v) } else { (k, v) })
        .collect()
}

fn rename_in(dims: &mut [String], from: &str, to: &str) {
    for d in dims.iter_mut().filter(|d| d.as_str() == from) {
        *d = to.to_string();
    }
}

/// Merge axes `pa` and `pb` of `data` into one axis of length `flat`,
/// placed where `pa` was. Axis `pb` is moved directly after `pa` first so
/// the flattening is `pa`-major.
fn stack_axes<T: Clone>(
    dims: &[String],
    data: ArrayD<T>,
    pa: usize,
    pb: usize,
    new_dim: &str,
    flat: usize,
) -> Result<(Vec<String>, ArrayD<T>)> {
    let shape = data.shape().to_vec();

    let mut order: Vec<usize> = (0..dims.len()).filter(|&i| i != pb).collect();
    let pos_a = if pb < pa { pa - 1 } else { pa };
    order.insert(pos_a + 1, pb);

    let mut new_dims = Vec::with_capacity(dims.len() - 1);
    let mut new_shape = Vec::with_capacity(dims.len() - 1);
    for &i in &order {
        if i == pa {
            new_dims.push(new_dim.to_string());
            new_shape.push(flat);
        } else if i != pb {
            new_dims.push(dims[i].clone());
            new_shape.push(shape[i]);
        }
    }

    let permuted = data.permuted_axes(order);
    let reshaped = permuted
        .as_standard_layout()
        .into_owned()
        .into_shape(IxDyn(&new_shape))?;
    Ok((new_dims, reshaped))
}
