//! Test data generators for creating synthetic decoded forecast grids.
//!
//! The grids mimic what a GRIB decoder returns: a scalar `time` reference
//! for one cycle or a `time` dimension for several, a `step` dimension of
//! forecast offsets, a `valid_time` auxiliary coordinate and latitude
//! running north to south.
//!
//! Every value is predictable, see [`expected_value`].

use chrono::{DateTime, Duration, Utc};
use ndarray::{ArrayD, IxDyn};

use labeled_grid::{CoordValues, Coordinate, GridDataset, Variable};

use crate::fixtures::grid::{CELLS, LATITUDES, LONGITUDES};

/// Value stored for a variable at `(cycle, lead, cell)` indices.
///
/// `cell` is the row-major index in decoder order (latitude north to south,
/// then longitude).
///
/// # Example
///
/// ```
/// use test_utils::expected_value;
///
/// assert_eq!(expected_value(0, 0, 0, 0), 0.0);
/// assert_eq!(expected_value(1, 2, 3, 4), 12034.0);
/// ```
pub fn expected_value(variable: usize, cycle: usize, lead: usize, cell: usize) -> f32 {
    (variable * 10_000 + cycle * 1_000 + lead * 10 + cell) as f32
}

/// Decoded grid for a single cycle: dims `(step, latitude, longitude)`.
pub fn forecast_grid(cycle: DateTime<Utc>, lead_hours: &[u32], variables: &[&str]) -> GridDataset {
    let steps: Vec<i64> = lead_hours.iter().map(|h| i64::from(*h)).collect();
    let valid: Vec<DateTime<Utc>> = steps.iter().map(|h| cycle + Duration::hours(*h)).collect();

    let mut grid = spatial_coords()
        .with_coord("time", Coordinate::scalar(CoordValues::scalar_time(cycle)))
        .and_then(|g| g.with_coord("step", Coordinate::new(&["step"], CoordValues::step_hours(&steps))))
        .and_then(|g| g.with_coord("valid_time", Coordinate::new(&["step"], CoordValues::times(valid))))
        .expect("fixture coordinates are consistent");

    for (v, name) in variables.iter().enumerate() {
        let mut data = Vec::with_capacity(steps.len() * CELLS);
        for lead in 0..steps.len() {
            for cell in 0..CELLS {
                data.push(expected_value(v, 0, lead, cell));
            }
        }
        let data = ArrayD::from_shape_vec(IxDyn(&[steps.len(), LATITUDES.len(), LONGITUDES.len()]), data)
            .expect("fixture data matches its shape");
        grid.add_variable(name, Variable::new(&["step", "latitude", "longitude"], data))
            .expect("fixture variables are consistent");
    }
    grid
}

/// Decoded grid for several cycles: dims `(time, step, latitude, longitude)`.
pub fn nowcast_grid(cycles: &[DateTime<Utc>], lead_hours: &[u32], variables: &[&str]) -> GridDataset {
    let steps: Vec<i64> = lead_hours.iter().map(|h| i64::from(*h)).collect();
    let mut valid = Vec::with_capacity(cycles.len() * steps.len());
    for cycle in cycles {
        for h in &steps {
            valid.push(*cycle + Duration::hours(*h));
        }
    }
    let valid = ArrayD::from_shape_vec(IxDyn(&[cycles.len(), steps.len()]), valid)
        .expect("valid times match their shape");

    let mut grid = spatial_coords()
        .with_coord("time", Coordinate::new(&["time"], CoordValues::times(cycles.to_vec())))
        .and_then(|g| g.with_coord("step", Coordinate::new(&["step"], CoordValues::step_hours(&steps))))
        .and_then(|g| g.with_coord("valid_time", Coordinate::new(&["time", "step"], CoordValues::Time(valid))))
        .expect("fixture coordinates are consistent");

    for (v, name) in variables.iter().enumerate() {
        let mut data = Vec::with_capacity(cycles.len() * steps.len() * CELLS);
        for c in 0..cycles.len() {
            for lead in 0..steps.len() {
                for cell in 0..CELLS {
                    data.push(expected_value(v, c, lead, cell));
                }
            }
        }
        let shape = [cycles.len(), steps.len(), LATITUDES.len(), LONGITUDES.len()];
        let data = ArrayD::from_shape_vec(IxDyn(&shape), data).expect("fixture data matches its shape");
        grid.add_variable(name, Variable::new(&["time", "step", "latitude", "longitude"], data))
            .expect("fixture variables are consistent");
    }
    grid
}

fn spatial_coords() -> GridDataset {
    GridDataset::new()
        .with_coord(
            "latitude",
            Coordinate::new(&["latitude"], CoordValues::floats(LATITUDES.to_vec())),
        )
        .and_then(|g| {
            g.with_coord(
                "longitude",
                Coordinate::new(&["longitude"], CoordValues::floats(LONGITUDES.to_vec())),
            )
        })
        .expect("spatial coordinates are consistent")
}
