//! Coordinate labels attached to grid dimensions.

use chrono::{DateTime, Duration, Utc};
use ndarray::{Array1, ArrayD, Axis, IxDyn};

use crate::error::{GridError, Result};

/// Label values of a coordinate.
///
/// Values are stored n-dimensional so that auxiliary coordinates such as a
/// `(time, step)` shaped `valid_time` can be represented alongside plain
/// 1-D dimension coordinates and 0-D scalars.
#[derive(Debug, Clone, PartialEq)]
pub enum CoordValues {
    /// Absolute timestamps
    Time(ArrayD<DateTime<Utc>>),
    /// Time offsets (forecast steps)
    Step(ArrayD<Duration>),
    /// Plain numeric labels (latitude, longitude, levels)
    Float(ArrayD<f64>),
}

impl CoordValues {
    /// 1-D timestamps.
    pub fn times(values: Vec<DateTime<Utc>>) -> Self {
        Self::Time(vec_1d(values))
    }

    /// 0-D timestamp.
    pub fn scalar_time(value: DateTime<Utc>) -> Self {
        Self::Time(ArrayD::from_elem(IxDyn(&[]), value))
    }

    /// 1-D forecast steps given in whole hours.
    pub fn step_hours(hours: &[i64]) -> Self {
        let steps: Vec<Duration> = hours.iter().map(|h| Duration::hours(*h)).collect();
        Self::Step(vec_1d(steps))
    }

    /// 1-D numeric labels.
    pub fn floats(values: Vec<f64>) -> Self {
        Self::Float(vec_1d(values))
    }

    pub fn shape(&self) -> &[usize] {
        match self {
            Self::Time(a) => a.shape(),
            Self::Step(a) => a.shape(),
            Self::Float(a) => a.shape(),
        }
    }

    pub fn ndim(&self) -> usize {
        self.shape().len()
    }

    /// Total number of labels.
    pub fn len(&self) -> usize {
        self.shape().iter().product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Time(_) => "time",
            Self::Step(_) => "step",
            Self::Float(_) => "float",
        }
    }

    pub fn as_times(&self) -> Option<&ArrayD<DateTime<Utc>>> {
        match self {
            Self::Time(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_steps(&self) -> Option<&ArrayD<Duration>> {
        match self {
            Self::Step(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_floats(&self) -> Option<&ArrayD<f64>> {
        match self {
            Self::Float(a) => Some(a),
            _ => None,
        }
    }

    /// Timestamps flattened in logical (C) order.
    pub fn time_vec(&self) -> Option<Vec<DateTime<Utc>>> {
        self.as_times().map(|a| a.iter().copied().collect())
    }

    /// Steps flattened in logical (C) order.
    pub fn step_vec(&self) -> Option<Vec<Duration>> {
        self.as_steps().map(|a| a.iter().copied().collect())
    }

    /// Take `indices` along `axis`.
    pub(crate) fn select(&self, axis: usize, indices: &[usize]) -> Self {
        match self {
            Self::Time(a) => Self::Time(a.select(Axis(axis), indices)),
            Self::Step(a) => Self::Step(a.select(Axis(axis), indices)),
            Self::Float(a) => Self::Float(a.select(Axis(axis), indices)),
        }
    }

    /// Reshape in logical order.
    pub(crate) fn reshape(&self, shape: &[usize]) -> Result<Self> {
        Ok(match self {
            Self::Time(a) => Self::Time(a.as_standard_layout().into_owned().into_shape(IxDyn(shape))?),
            Self::Step(a) => Self::Step(a.as_standard_layout().into_owned().into_shape(IxDyn(shape))?),
            Self::Float(a) => {
                Self::Float(a.as_standard_layout().into_owned().into_shape(IxDyn(shape))?)
            }
        })
    }

    /// Permutation that sorts a 1-D coordinate ascending (stable).
    pub(crate) fn argsort(&self) -> Result<Vec<usize>> {
        if self.ndim() != 1 {
            return Err(GridError::unsupported(format!(
                "cannot sort by a {}-dimensional coordinate",
                self.ndim()
            )));
        }
        let mut order: Vec<usize> = (0..self.len()).collect();
        match self {
            Self::Time(a) => {
                let v: Vec<_> = a.iter().copied().collect();
                order.sort_by_key(|&i| v[i]);
            }
            Self::Step(a) => {
                let v: Vec<_> = a.iter().copied().collect();
                order.sort_by_key(|&i| v[i]);
            }
            Self::Float(a) => {
                let v: Vec<_> = a.iter().copied().collect();
                order.sort_by(|&i, &j| v[i].total_cmp(&v[j]));
            }
        }
        Ok(order)
    }

    /// Whether a 1-D coordinate is non-decreasing.
    pub fn is_monotonic_increasing(&self) -> bool {
        fn check<T: PartialOrd>(a: &ArrayD<T>) -> bool {
            let values: Vec<&T> = a.iter().collect();
            values.windows(2).all(|w| w[0] <= w[1])
        }
        match self {
            Self::Time(a) => check(a),
            Self::Step(a) => check(a),
            Self::Float(a) => check(a),
        }
    }
}

/// A coordinate: labels plus the dimensions they run along.
#[derive(Debug, Clone, PartialEq)]
pub struct Coordinate {
    pub dims: Vec<String>,
    pub values: CoordValues,
}

impl Coordinate {
    pub fn new(dims: &[&str], values: CoordValues) -> Self {
        Self {
            dims: dims.iter().map(|d| d.to_string()).collect(),
            values,
        }
    }

    /// Scalar coordinate with no dimensions.
    pub fn scalar(values: CoordValues) -> Self {
        Self {
            dims: Vec::new(),
            values,
        }
    }

    /// True if this is the index coordinate of dimension `name`.
    pub fn is_dimension_coord(&self, name: &str) -> bool {
        self.dims.len() == 1 && self.dims[0] == name
    }
}

fn vec_1d<T>(values: Vec<T>) -> ArrayD<T> {
    Array1::from(values).into_dyn()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_argsort_float() {
        let c = CoordValues::floats(vec![30.0, 10.0, 20.0, 10.0]);
        assert_eq!(c.argsort().unwrap(), vec![1, 3, 2, 0]);
    }

    #[test]
    fn test_argsort_rejects_2d() {
        let c = CoordValues::floats(vec![1.0, 2.0, 3.0, 4.0])
            .reshape(&[2, 2])
            .unwrap();
        assert!(matches!(c.argsort(), Err(GridError::Unsupported(_))));
    }

    #[test]
    fn test_monotonic() {
        assert!(CoordValues::step_hours(&[0, 1, 1, 3]).is_monotonic_increasing());
        assert!(!CoordValues::step_hours(&[0, 3, 1]).is_monotonic_increasing());
    }

    #[test]
    fn test_scalar_time() {
        let t = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        let c = CoordValues::scalar_time(t);
        assert_eq!(c.ndim(), 0);
        assert_eq!(c.len(), 1);
        assert_eq!(c.time_vec(), Some(vec![t]));
    }
}
