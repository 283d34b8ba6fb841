use std::fmt;

use chrono::{DateTime, Utc};
use tracing::{info, instrument};

use nwp_common::{cycle_range, format_cycle};

use crate::assembler::{AssembledDataset, DatasetAssembler};
use crate::config::{NowcastConfig, SourceOptions};
use crate::cycle::{CycleResolver, CycleState};
use crate::error::{NwpError, Result};
use crate::lead_time::LeadTimeSet;
use crate::retrieval::Retriever;

use super::{display_cycle, DataSource};

/// The first `cycle_step` hours of every cycle from `start` to `stop`,
/// stitched into one continuous time series.
///
/// Without an explicit `stop` the latest cycle whose whole interval is
/// published is used, stepping back at most `stepback` cycles.
#[derive(Debug)]
pub struct NowcastSource<R> {
    options: SourceOptions,
    start: DateTime<Utc>,
    cycle_step: u32,
    lead_times: LeadTimeSet,
    stop: CycleResolver,
    retriever: R,
}

impl<R: Retriever> NowcastSource<R> {
    pub fn new(config: NowcastConfig, retriever: R) -> Result<Self> {
        Self::with_reference_time(config, retriever, Utc::now())
    }

    pub fn with_reference_time(config: NowcastConfig, retriever: R, now: DateTime<Utc>) -> Result<Self> {
        let lead_times = LeadTimeSet::nowcast(config.cycle_step, config.time_step)?;
        let stop = match config.stop {
            Some(stop) => {
                ensure_ordered(config.start, stop)?;
                CycleResolver::explicit(stop)
            }
            None => CycleResolver::latest(config.cycle_step, config.stepback, now)?
                .with_probe_lead(config.cycle_step),
        };

        Ok(Self {
            options: config.options,
            start: config.start,
            cycle_step: config.cycle_step,
            lead_times,
            stop,
            retriever,
        })
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn lead_times(&self) -> &LeadTimeSet {
        &self.lead_times
    }

    pub fn retriever(&self) -> &R {
        &self.retriever
    }
}

impl<R: Retriever> DataSource for NowcastSource<R> {
    type Grid = R::Grid;

    fn name(&self) -> &'static str {
        "nowcast"
    }

    fn cycle(&self) -> CycleState {
        self.stop.state()
    }

    fn options(&self) -> &SourceOptions {
        &self.options
    }

    #[instrument(skip(self), fields(model = %self.options.model, start = %format_cycle(&self.start)))]
    fn open(&mut self) -> Result<AssembledDataset<R::Grid>> {
        let context = self.to_string();
        let stop = self.stop.resolve(&self.retriever, &self.options, &context)?;
        ensure_ordered(self.start, stop)?;

        let cycles = cycle_range(self.start, stop, i64::from(self.cycle_step))?;
        info!(
            cycles = cycles.len(),
            stop = %format_cycle(&stop),
            "Assembling nowcast series"
        );

        DatasetAssembler::new(&self.options, context).assemble(&self.retriever, cycles, &self.lead_times)
    }
}

fn ensure_ordered(start: DateTime<Utc>, stop: DateTime<Utc>) -> Result<()> {
    if start > stop {
        return Err(NwpError::configuration(format!(
            "nowcast start {} is after stop {}",
            format_cycle(&start),
            format_cycle(&stop)
        )));
    }
    Ok(())
}

impl<R: Retriever> fmt::Display for NowcastSource<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<NowcastSource: start='{}', stop={}, ",
            format_cycle(&self.start),
            display_cycle(self.stop.state())
        )?;
        self.options.describe(f, &self.lead_times)?;
        write!(f, ">")
    }
}
