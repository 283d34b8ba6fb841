use std::fmt;

use chrono::{DateTime, Utc};
use tracing::instrument;

use crate::assembler::AssembledDataset;
use crate::config::{ForecastConfig, SourceOptions};
use crate::cycle::{CycleResolver, CycleState};
use crate::error::Result;
use crate::lead_time::LeadTimeSet;
use crate::retrieval::Retriever;

use super::{DataSource, SingleCycle};

/// Lead times from the latest cycle that already covers the whole horizon.
///
/// Archives publish lead times progressively, so a cycle only counts once
/// the object for the last requested lead time exists.
#[derive(Debug)]
pub struct ForecastSource<R> {
    inner: SingleCycle<R>,
}

impl<R: Retriever> ForecastSource<R> {
    pub fn new(config: ForecastConfig, retriever: R) -> Result<Self> {
        Self::with_reference_time(config, retriever, Utc::now())
    }

    pub fn with_reference_time(config: ForecastConfig, retriever: R, now: DateTime<Utc>) -> Result<Self> {
        let lead_times = config.fxx.expand()?;
        let horizon = lead_times.horizon();
        let (cycle_step, stepback) = (config.cycle_step, config.stepback);
        let inner = SingleCycle::new(
            config.options,
            lead_times,
            config.cycle,
            || Ok(CycleResolver::latest(cycle_step, stepback, now)?.with_probe_lead(horizon)),
            retriever,
        )?;
        Ok(Self { inner })
    }

    pub fn lead_times(&self) -> &LeadTimeSet {
        &self.inner.lead_times
    }

    pub fn retriever(&self) -> &R {
        &self.inner.retriever
    }
}

impl<R: Retriever> DataSource for ForecastSource<R> {
    type Grid = R::Grid;

    fn name(&self) -> &'static str {
        "forecast"
    }

    fn cycle(&self) -> CycleState {
        self.inner.resolver.state()
    }

    fn options(&self) -> &SourceOptions {
        &self.inner.options
    }

    #[instrument(skip(self), fields(model = %self.inner.options.model))]
    fn open(&mut self) -> Result<AssembledDataset<R::Grid>> {
        let context = self.to_string();
        self.inner.open(context)
    }
}

impl<R: Retriever> fmt::Display for ForecastSource<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.inner.describe(f, "ForecastSource")
    }
}
