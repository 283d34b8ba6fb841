//! Dataset assembly.
//!
//! Turns the raw decoded grid returned by the archive into a dataset with a
//! single absolute `time` dimension, then applies coverage checks, sorting,
//! variable renames and metadata.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::{debug, info, instrument};

use labeled_grid::{CoordValues, LabeledGrid};

use crate::config::{Metadata, SourceOptions};
use crate::error::{NwpError, Result};
use crate::lead_time::LeadTimeSet;
use crate::retrieval::{RetrievalError, RetrievalRequest, Retrieved, Retriever};

/// Name of the output time dimension and of the decoder's reference-time field.
pub const TIME: &str = "time";
/// Forecast offset dimension produced by the decoder.
pub const STEP: &str = "step";
/// Per-message valid time produced by the decoder.
pub const VALID_TIME: &str = "valid_time";

/// A grid ready for consumers, plus what was asked for to build it.
#[derive(Debug, Clone)]
pub struct AssembledDataset<G> {
    grid: G,
    cycles: Vec<DateTime<Utc>>,
    lead_times: LeadTimeSet,
    metadata: Metadata,
}

impl<G: LabeledGrid> AssembledDataset<G> {
    pub fn grid(&self) -> &G {
        &self.grid
    }

    pub fn into_grid(self) -> G {
        self.grid
    }

    /// Cycles the data was read from.
    pub fn cycles(&self) -> &[DateTime<Utc>] {
        &self.cycles
    }

    pub fn lead_times(&self) -> &LeadTimeSet {
        &self.lead_times
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Absolute times of the `time` dimension, in dataset order.
    pub fn times(&self) -> Vec<DateTime<Utc>> {
        self.grid
            .coordinate(TIME)
            .and_then(|c| c.values.time_vec())
            .unwrap_or_default()
    }

    pub fn schema(&self) -> DatasetSchema {
        DatasetSchema {
            dims: self
                .grid
                .dims()
                .into_iter()
                .map(|d| {
                    let len = self.grid.dim_len(&d).unwrap_or_default();
                    (d, len)
                })
                .collect(),
            coords: self.grid.coord_names(),
            data_vars: self.grid.variable_names(),
            metadata: self.metadata.clone(),
        }
    }
}

/// Structural description of an assembled dataset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetSchema {
    pub dims: Vec<(String, usize)>,
    pub coords: Vec<String>,
    pub data_vars: Vec<String>,
    pub metadata: Metadata,
}

impl fmt::Display for DatasetSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dims: Vec<String> = self.dims.iter().map(|(d, n)| format!("{}: {}", d, n)).collect();
        writeln!(f, "Dimensions: ({})", dims.join(", "))?;
        writeln!(f, "Coordinates: {}", self.coords.join(", "))?;
        write!(f, "Data variables: {}", self.data_vars.join(", "))
    }
}

/// Retrieves and reshapes the data for one set of cycles and lead times.
pub struct DatasetAssembler<'a> {
    options: &'a SourceOptions,
    context: String,
}

impl<'a> DatasetAssembler<'a> {
    /// `context` names the requesting source in errors and logs.
    pub fn new(options: &'a SourceOptions, context: impl Into<String>) -> Self {
        Self {
            options,
            context: context.into(),
        }
    }

    #[instrument(skip_all, fields(cycles = cycles.len(), leads = lead_times.len()))]
    pub fn assemble<R: Retriever>(
        &self,
        retriever: &R,
        cycles: Vec<DateTime<Utc>>,
        lead_times: &LeadTimeSet,
    ) -> Result<AssembledDataset<R::Grid>> {
        let request = RetrievalRequest::new(self.options, cycles, lead_times.clone());
        for object in request.objects() {
            debug!(object = %object, "Requesting object");
        }

        let inventory = retriever.inventory(&request).map_err(|e| self.retrieval_error(e))?;
        if inventory.is_empty() {
            return Err(self.no_data());
        }
        debug!(messages = inventory.len(), "Inventory:\n{}", inventory.join("\n"));

        let grid = match retriever.fetch(&request).map_err(|e| self.retrieval_error(e))? {
            Retrieved::Single(grid) => grid,
            Retrieved::Multiple(grids) if grids.is_empty() => return Err(self.no_data()),
            Retrieved::Multiple(mut grids) if grids.len() == 1 => grids.remove(0),
            Retrieved::Multiple(grids) => {
                return Err(NwpError::AmbiguousPattern {
                    pattern: self.options.pattern.clone(),
                    count: grids.len(),
                    context: self.context.clone(),
                })
            }
        };

        let grid = if grid.dim_len(TIME).is_some() {
            merge_cycles(grid, &request.cycles)?
        } else {
            let fallback = request.cycles.first().copied().ok_or_else(|| self.no_data())?;
            merge_single_cycle(grid, fallback)?
        };

        self.check_coverage(&grid, lead_times)?;

        let mut grid = if self.options.sorted {
            sort_dimensions(grid)?
        } else {
            grid
        };
        if !self.options.mapping.is_empty() {
            grid = grid.rename_variables(&self.options.mapping)?;
        }
        for (key, value) in &self.options.metadata {
            grid.set_attr(key, value.clone());
        }

        info!(
            model = %self.options.model,
            dims = ?grid.dims(),
            variables = ?grid.variable_names(),
            "Assembled dataset"
        );

        Ok(AssembledDataset {
            grid,
            cycles: request.cycles,
            lead_times: request.lead_times,
            metadata: self.options.metadata.clone(),
        })
    }

    /// The first time plus the horizon must not run past the last time.
    fn check_coverage<G: LabeledGrid>(&self, grid: &G, lead_times: &LeadTimeSet) -> Result<()> {
        let times = grid
            .coordinate(TIME)
            .and_then(|c| c.values.time_vec())
            .unwrap_or_default();
        let (first, last) = match (times.first(), times.last()) {
            (Some(first), Some(last)) => (*first, *last),
            _ => return Err(self.no_data()),
        };

        let requested_end = first + Duration::hours(i64::from(lead_times.horizon()));
        if requested_end > last {
            return Err(NwpError::Coverage {
                context: self.context.clone(),
                requested_start: first,
                requested_end,
                available_start: first,
                available_end: last,
            });
        }
        Ok(())
    }

    fn no_data(&self) -> NwpError {
        NwpError::data_unavailable(format!("No data found for the given parameters: {}", self.context))
    }

    fn retrieval_error(&self, err: RetrievalError) -> NwpError {
        match err {
            RetrievalError::NoData(_) => self.no_data(),
            RetrievalError::Backend(msg) => NwpError::Retrieval(msg),
        }
    }
}

/// One cycle: relabel `step` with absolute valid times and call it `time`.
fn merge_single_cycle<G: LabeledGrid>(grid: G, fallback_cycle: DateTime<Utc>) -> Result<G> {
    let cycle = grid
        .coordinate(TIME)
        .and_then(|c| c.values.time_vec())
        .and_then(|t| t.first().copied())
        .unwrap_or(fallback_cycle);
    let steps = step_offsets(&grid)?;
    let valid: Vec<DateTime<Utc>> = steps.iter().map(|s| cycle + *s).collect();

    Ok(grid
        .assign_coord(STEP, CoordValues::times(valid))?
        .drop_fields(&[TIME, VALID_TIME])?
        .rename_dim(STEP, TIME)?)
}

/// Many cycles: flatten `time` × `step` into a single `time` axis.
fn merge_cycles<G: LabeledGrid>(grid: G, requested: &[DateTime<Utc>]) -> Result<G> {
    let cycles = grid
        .coordinate(TIME)
        .and_then(|c| c.values.time_vec())
        .unwrap_or_else(|| requested.to_vec());
    let steps = step_offsets(&grid)?;

    let mut labels = Vec::with_capacity(cycles.len() * steps.len());
    for cycle in &cycles {
        for step in &steps {
            labels.push(*cycle + *step);
        }
    }

    Ok(grid
        .drop_fields(&[VALID_TIME])?
        .stack([TIME, STEP], TIME, CoordValues::times(labels))?)
}

fn step_offsets<G: LabeledGrid>(grid: &G) -> Result<Vec<Duration>> {
    let coord = grid
        .coordinate(STEP)
        .filter(|c| c.is_dimension_coord(STEP))
        .ok_or_else(|| labeled_grid::GridError::UnknownDimension(STEP.to_string()))?;
    coord.values.step_vec().ok_or_else(|| {
        NwpError::Grid(labeled_grid::GridError::unsupported(format!(
            "'{}' holds {} values, expected time offsets",
            STEP,
            coord.values.kind()
        )))
    })
}

fn sort_dimensions<G: LabeledGrid>(mut grid: G) -> Result<G> {
    for name in grid.dim_coord_names() {
        grid = grid.sort_by(&name)?;
    }
    Ok(grid)
}
