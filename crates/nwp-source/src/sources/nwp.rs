use std::fmt;

use chrono::{DateTime, Utc};
use tracing::instrument;

use crate::assembler::AssembledDataset;
use crate::config::{NwpConfig, SourceOptions};
use crate::cycle::{CycleResolver, CycleState};
use crate::error::Result;
use crate::lead_time::LeadTimeSet;
use crate::retrieval::Retriever;

use super::{DataSource, SingleCycle};

/// Lead times from the latest published cycle of a model.
///
/// A cycle counts as published once its analysis (lead 0) exists. With the
/// default `stepback` of 0 only the cycle containing the reference time is
/// tried.
#[derive(Debug)]
pub struct NwpSource<R> {
    inner: SingleCycle<R>,
}

impl<R: Retriever> NwpSource<R> {
    pub fn new(config: NwpConfig, retriever: R) -> Result<Self> {
        Self::with_reference_time(config, retriever, Utc::now())
    }

    /// Build with `now` as the reference time for latest-cycle lookup.
    pub fn with_reference_time(config: NwpConfig, retriever: R, now: DateTime<Utc>) -> Result<Self> {
        let lead_times = config.fxx.expand()?;
        let (cycle_step, stepback) = (config.cycle_step, config.stepback);
        let inner = SingleCycle::new(
            config.options,
            lead_times,
            config.cycle,
            || CycleResolver::latest(cycle_step, stepback, now),
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

impl<R: Retriever> DataSource for NwpSource<R> {
    type Grid = R::Grid;

    fn name(&self) -> &'static str {
        "nwp"
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

impl<R: Retriever> fmt::Display for NwpSource<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.inner.describe(f, "NwpSource")
    }
}
