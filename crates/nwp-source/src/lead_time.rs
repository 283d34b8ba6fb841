//! Forecast lead-time expansion.
//!
//! Lead times (`fxx`) are given either as an explicit list of hours or as a
//! half-open `{start, stop, step}` range. Nowcast sources derive theirs from
//! the cycle interval and the output time step.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{NwpError, Result};

/// Lead-time specification as written in a source configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LeadTimeSpec {
    /// Explicit hours, used verbatim
    List(Vec<u32>),
    /// Half-open range of hours
    Range(LeadTimeRange),
}

/// Half-open `[start, stop)` range with a positive step.
///
/// Values may be fractional; every generated value is truncated to whole
/// hours.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LeadTimeRange {
    #[serde(default)]
    pub start: f64,
    pub stop: f64,
    #[serde(default = "default_step")]
    pub step: f64,
}

fn default_step() -> f64 {
    1.0
}

impl LeadTimeSpec {
    /// Explicit list shorthand.
    pub fn list(hours: &[u32]) -> Self {
        Self::List(hours.to_vec())
    }

    /// Integer range shorthand.
    pub fn range(start: u32, stop: u32, step: u32) -> Self {
        Self::Range(LeadTimeRange {
            start: start as f64,
            stop: stop as f64,
            step: step as f64,
        })
    }

    /// Expand into an explicit ascending set.
    pub fn expand(&self) -> Result<LeadTimeSet> {
        match self {
            Self::List(hours) => LeadTimeSet::from_list(hours.clone()),
            Self::Range(range) => LeadTimeSet::from_range(range),
        }
    }
}

impl From<Vec<u32>> for LeadTimeSpec {
    fn from(hours: Vec<u32>) -> Self {
        Self::List(hours)
    }
}

/// Ascending (non-decreasing) non-empty list of lead hours.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct LeadTimeSet(Vec<u32>);

impl LeadTimeSet {
    /// Use an explicit list as is, after checking it is usable.
    pub fn from_list(hours: Vec<u32>) -> Result<Self> {
        if hours.is_empty() {
            return Err(NwpError::configuration("lead time list is empty"));
        }
        if hours.windows(2).any(|w| w[0] > w[1]) {
            return Err(NwpError::configuration(format!(
                "lead times must be ascending, got {:?}",
                hours
            )));
        }
        Ok(Self(hours))
    }

    /// Expand a `{start, stop, step}` range.
    pub fn from_range(range: &LeadTimeRange) -> Result<Self> {
        let LeadTimeRange { start, stop, step } = *range;
        if !(start.is_finite() && stop.is_finite() && step.is_finite()) {
            return Err(NwpError::configuration(format!(
                "lead time range must be finite, got {:?}",
                range
            )));
        }
        if step <= 0.0 {
            return Err(NwpError::configuration(format!(
                "lead time step must be positive, got {}",
                step
            )));
        }
        if start < 0.0 {
            return Err(NwpError::configuration(format!(
                "lead time start must be non-negative, got {}",
                start
            )));
        }

        let count = ((stop - start) / step).ceil().max(0.0);
        if count == 0.0 {
            return Err(NwpError::configuration(format!(
                "lead time range {}..{} step {} is empty",
                start, stop, step
            )));
        }

        // Reject before allocating: the last value bounds every other one.
        let last = (start + (count - 1.0) * step).trunc();
        if count > u32::MAX as f64 || last > u32::MAX as f64 {
            return Err(NwpError::configuration(format!(
                "lead time range {}..{} step {} exceeds {} hours",
                start,
                stop,
                step,
                u32::MAX
            )));
        }

        let mut hours = Vec::new();
        for i in 0..count as u32 {
            hours.push((start + f64::from(i) * step).trunc() as u32);
        }
        Ok(Self(hours))
    }

    /// Nowcast lead times: `0, time_step, 2*time_step, ... < cycle_step`.
    pub fn nowcast(cycle_step: u32, time_step: u32) -> Result<Self> {
        if time_step == 0 || time_step > cycle_step {
            return Err(NwpError::configuration(format!(
                "time_step ({}) must be positive and no larger than cycle_step ({})",
                time_step, cycle_step
            )));
        }
        if cycle_step % time_step != 0 {
            return Err(NwpError::configuration(format!(
                "cycle_step ({}) must be divisible by time_step ({})",
                cycle_step, time_step
            )));
        }
        Ok(Self((0..cycle_step).step_by(time_step as usize).collect()))
    }

    /// The last lead time; the horizon a dataset must cover.
    pub fn horizon(&self) -> u32 {
        self.0.last().copied().unwrap_or_default()
    }

    pub fn hours(&self) -> &[u32] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.0.iter().copied()
    }
}

impl fmt::Display for LeadTimeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_expansion() {
        let set = LeadTimeSpec::range(0, 6, 2).expand().unwrap();
        assert_eq!(set.hours(), &[0, 2, 4]);
        assert_eq!(set.horizon(), 4);
    }

    #[test]
    fn test_list_is_identity() {
        let set = LeadTimeSpec::list(&[0, 1, 2]).expand().unwrap();
        assert_eq!(set.hours(), &[0, 1, 2]);
    }

    #[test]
    fn test_list_with_duplicates() {
        let set = LeadTimeSet::from_list(vec![0, 3, 3, 6]).unwrap();
        assert_eq!(set.horizon(), 6);
    }

    #[test]
    fn test_list_rejects_descending() {
        assert!(matches!(
            LeadTimeSet::from_list(vec![6, 3, 0]),
            Err(NwpError::Configuration(_))
        ));
    }

    #[test]
    fn test_list_rejects_empty() {
        assert!(matches!(
            LeadTimeSet::from_list(vec![]),
            Err(NwpError::Configuration(_))
        ));
    }

    #[test]
    fn test_fractional_range_truncates() {
        let range = LeadTimeRange {
            start: 0.0,
            stop: 6.0,
            step: 1.5,
        };
        let set = LeadTimeSet::from_range(&range).unwrap();
        assert_eq!(set.hours(), &[0, 1, 3, 4]);
    }

    #[test]
    fn test_range_invalid_step() {
        let range = LeadTimeRange {
            start: 0.0,
            stop: 6.0,
            step: 0.0,
        };
        assert!(LeadTimeSet::from_range(&range).is_err());
    }

    #[test]
    fn test_range_empty() {
        assert!(LeadTimeSpec::range(6, 6, 1).expand().is_err());
        assert!(LeadTimeSpec::range(6, 0, 1).expand().is_err());
    }

    #[test]
    fn test_range_beyond_u32_is_rejected() {
        let huge: LeadTimeSpec = serde_yaml::from_str("{stop: 1.0e19}").unwrap();
        assert!(matches!(huge.expand(), Err(NwpError::Configuration(_))));

        let sparse: LeadTimeSpec = serde_yaml::from_str("{stop: 1.0e12, step: 1.0e11}").unwrap();
        assert!(matches!(sparse.expand(), Err(NwpError::Configuration(_))));
    }

    #[test]
    fn test_nowcast_lead_times() {
        assert_eq!(LeadTimeSet::nowcast(6, 2).unwrap().hours(), &[0, 2, 4]);
        assert_eq!(LeadTimeSet::nowcast(6, 6).unwrap().hours(), &[0]);
        assert_eq!(
            LeadTimeSet::nowcast(6, 1).unwrap().hours(),
            &[0, 1, 2, 3, 4, 5]
        );
    }

    #[test]
    fn test_nowcast_not_divisible() {
        assert!(matches!(
            LeadTimeSet::nowcast(6, 4),
            Err(NwpError::Configuration(_))
        ));
    }

    #[test]
    fn test_nowcast_step_too_large() {
        assert!(LeadTimeSet::nowcast(6, 12).is_err());
        assert!(LeadTimeSet::nowcast(6, 0).is_err());
    }

    #[test]
    fn test_spec_deserializes_both_forms() {
        let list: LeadTimeSpec = serde_yaml::from_str("[0, 3, 6]").unwrap();
        assert_eq!(list, LeadTimeSpec::List(vec![0, 3, 6]));

        let range: LeadTimeSpec = serde_yaml::from_str("{start: 0, stop: 12, step: 3}").unwrap();
        assert_eq!(range.expand().unwrap().hours(), &[0, 3, 6, 9]);

        let stop_only: LeadTimeSpec = serde_yaml::from_str("{stop: 3}").unwrap();
        assert_eq!(stop_only.expand().unwrap().hours(), &[0, 1, 2]);
    }
}
