//! Model cycle resolution.
//!
//! Finds the most recent published cycle by probing the archive, starting
//! at the reference time rounded down to the cycle interval and stepping
//! back one interval at a time up to a fixed number of steps.

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, instrument, warn};

use nwp_common::{format_cycle, round_time};

use crate::config::SourceOptions;
use crate::error::{NwpError, Result};
use crate::retrieval::{ProbeRequest, RetrievalError, Retriever};

/// Where a resolver stands.
///
/// `Resolved` and `Exhausted` are terminal: once reached, further calls to
/// [`CycleResolver::resolve`] do not probe again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleState {
    /// Next cycle to probe and the number of step backs taken so far
    Unresolved { candidate: DateTime<Utc>, steps: u32 },
    Resolved(DateTime<Utc>),
    /// Every allowed cycle was probed without success
    Exhausted { candidate: DateTime<Utc>, steps: u32 },
}

impl CycleState {
    pub fn resolved(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Resolved(cycle) => Some(*cycle),
            _ => None,
        }
    }

    pub fn steps(&self) -> u32 {
        match self {
            Self::Unresolved { steps, .. } | Self::Exhausted { steps, .. } => *steps,
            Self::Resolved(_) => 0,
        }
    }
}

/// Resolves the cycle a source reads from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleResolver {
    cycle_step: u32,
    max_steps: u32,
    probe_lead: u32,
    state: CycleState,
}

impl CycleResolver {
    /// Start from `now` rounded down to the cycle interval.
    pub fn latest(cycle_step: u32, max_steps: u32, now: DateTime<Utc>) -> Result<Self> {
        let candidate = round_time(now, i64::from(cycle_step))?;
        Ok(Self {
            cycle_step,
            max_steps,
            probe_lead: 0,
            state: CycleState::Unresolved { candidate, steps: 0 },
        })
    }

    /// A cycle given by the user; never probed.
    pub fn explicit(cycle: DateTime<Utc>) -> Self {
        Self {
            cycle_step: 0,
            max_steps: 0,
            probe_lead: 0,
            state: CycleState::Resolved(cycle),
        }
    }

    /// Lead hour whose object must exist for a cycle to count as published.
    pub fn with_probe_lead(mut self, lead_hours: u32) -> Self {
        self.probe_lead = lead_hours;
        self
    }

    pub fn state(&self) -> CycleState {
        self.state
    }

    pub fn probe_lead(&self) -> u32 {
        self.probe_lead
    }

    /// Resolve the cycle, probing the archive if needed.
    ///
    /// `context` describes the requesting source in error messages.
    #[instrument(skip(self, retriever, options, context), fields(model = %options.model))]
    pub fn resolve<R: Retriever>(
        &mut self,
        retriever: &R,
        options: &SourceOptions,
        context: &str,
    ) -> Result<DateTime<Utc>> {
        loop {
            match self.state {
                CycleState::Resolved(cycle) => return Ok(cycle),
                CycleState::Exhausted { .. } => {
                    return Err(NwpError::data_unavailable(format!(
                        "No data found after {} stepbacks for the given parameters: {}",
                        self.max_steps, context
                    )));
                }
                CycleState::Unresolved { candidate, steps } => {
                    let probe = ProbeRequest::new(options, candidate, self.probe_lead);
                    debug!(probe = %probe, lead = self.probe_lead, steps, "Probing archive");

                    let found = match retriever.exists(&probe) {
                        Ok(found) => found,
                        Err(RetrievalError::NoData(_)) => false,
                        Err(e) => return Err(NwpError::Retrieval(e.to_string())),
                    };

                    self.state = if found {
                        info!(cycle = %format_cycle(&candidate), steps, "Resolved model cycle");
                        CycleState::Resolved(candidate)
                    } else if steps >= self.max_steps {
                        warn!(
                            cycle = %format_cycle(&candidate),
                            max_steps = self.max_steps,
                            "No published cycle found"
                        );
                        CycleState::Exhausted { candidate, steps }
                    } else {
                        let previous = candidate - Duration::hours(i64::from(self.cycle_step));
                        warn!(
                            cycle = %format_cycle(&candidate),
                            previous = %format_cycle(&previous),
                            "Cycle not published, stepping back"
                        );
                        CycleState::Unresolved {
                            candidate: previous,
                            steps: steps + 1,
                        }
                    };
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use labeled_grid::GridDataset;
    use std::cell::RefCell;

    use crate::retrieval::{RetrievalRequest, Retrieved};

    /// Publishes a fixed set of cycles and records every probe.
    struct Published {
        cycles: Vec<DateTime<Utc>>,
        probes: RefCell<Vec<ProbeRequest>>,
        fail: bool,
    }

    impl Published {
        fn new(cycles: Vec<DateTime<Utc>>) -> Self {
            Self {
                cycles,
                probes: RefCell::new(Vec::new()),
                fail: false,
            }
        }
    }

    impl Retriever for Published {
        type Grid = GridDataset;

        fn exists(&self, probe: &ProbeRequest) -> std::result::Result<bool, RetrievalError> {
            self.probes.borrow_mut().push(probe.clone());
            if self.fail {
                return Err(RetrievalError::Backend("connection reset".to_string()));
            }
            Ok(self.cycles.contains(&probe.cycle))
        }

        fn inventory(&self, _: &RetrievalRequest) -> std::result::Result<Vec<String>, RetrievalError> {
            Ok(Vec::new())
        }

        fn fetch(&self, _: &RetrievalRequest) -> std::result::Result<Retrieved<GridDataset>, RetrievalError> {
            Err(RetrievalError::NoData("unused".to_string()))
        }
    }

    fn options() -> SourceOptions {
        SourceOptions::new("gfs", "pgrb2.0p25", ":TMP:")
    }

    fn at(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, h, 0, 0).unwrap()
    }

    #[test]
    fn test_resolves_latest_without_stepback() {
        let archive = Published::new(vec![at(12)]);
        let now = Utc.with_ymd_and_hms(2024, 1, 15, 14, 37, 0).unwrap();
        let mut resolver = CycleResolver::latest(6, 0, now).unwrap();

        assert_eq!(resolver.resolve(&archive, &options(), "gfs").unwrap(), at(12));
        assert_eq!(archive.probes.borrow().len(), 1);
        assert_eq!(archive.probes.borrow()[0].lead_hours, 0);
    }

    #[test]
    fn test_steps_back_one_interval() {
        let archive = Published::new(vec![at(6)]);
        let mut resolver = CycleResolver::latest(6, 1, at(12)).unwrap();

        assert_eq!(resolver.resolve(&archive, &options(), "gfs").unwrap(), at(6));
        let probed: Vec<_> = archive.probes.borrow().iter().map(|p| p.cycle).collect();
        assert_eq!(probed, vec![at(12), at(6)]);
    }

    #[test]
    fn test_exhaustion_is_terminal() {
        let archive = Published::new(vec![]);
        let mut resolver = CycleResolver::latest(6, 2, at(12)).unwrap();

        let err = resolver.resolve(&archive, &options(), "gfs").unwrap_err();
        assert!(matches!(err, NwpError::DataUnavailable(_)));
        assert!(err.to_string().contains("after 2 stepbacks"));
        assert_eq!(archive.probes.borrow().len(), 3);

        // No further probes once exhausted
        assert!(resolver.resolve(&archive, &options(), "gfs").is_err());
        assert_eq!(archive.probes.borrow().len(), 3);
    }

    #[test]
    fn test_resolution_is_cached() {
        let archive = Published::new(vec![at(12)]);
        let mut resolver = CycleResolver::latest(6, 0, at(12)).unwrap();

        resolver.resolve(&archive, &options(), "gfs").unwrap();
        resolver.resolve(&archive, &options(), "gfs").unwrap();
        assert_eq!(archive.probes.borrow().len(), 1);
        assert_eq!(resolver.state(), CycleState::Resolved(at(12)));
    }

    #[test]
    fn test_explicit_cycle_never_probes() {
        let archive = Published::new(vec![]);
        let mut resolver = CycleResolver::explicit(at(18));

        assert_eq!(resolver.resolve(&archive, &options(), "gfs").unwrap(), at(18));
        assert!(archive.probes.borrow().is_empty());
    }

    #[test]
    fn test_backend_error_propagates() {
        let mut archive = Published::new(vec![at(6)]);
        archive.fail = true;
        let mut resolver = CycleResolver::latest(6, 3, at(12)).unwrap();

        let err = resolver.resolve(&archive, &options(), "gfs").unwrap_err();
        assert!(matches!(err, NwpError::Retrieval(_)));
        assert_eq!(archive.probes.borrow().len(), 1);
    }

    #[test]
    fn test_probe_lead_is_used() {
        let archive = Published::new(vec![at(12)]);
        let mut resolver = CycleResolver::latest(6, 0, at(12)).unwrap().with_probe_lead(48);

        resolver.resolve(&archive, &options(), "gfs").unwrap();
        assert_eq!(archive.probes.borrow()[0].lead_hours, 48);
    }

    #[test]
    fn test_invalid_cycle_step() {
        assert!(matches!(
            CycleResolver::latest(0, 0, at(12)),
            Err(NwpError::Configuration(_))
        ));
    }
}
