//! Data source implementations.
//!
//! - [`NwpSource`]: the latest (or an explicit) analysis cycle
//! - [`ForecastSource`]: the latest cycle covering every requested lead time
//! - [`NowcastSource`]: the first hours of many consecutive cycles stitched
//!   into one continuous series

mod forecast;
mod nowcast;
mod nwp;

use std::fmt;

use chrono::{DateTime, Utc};

use labeled_grid::LabeledGrid;

use crate::assembler::{AssembledDataset, DatasetAssembler, DatasetSchema};
use crate::config::SourceOptions;
use crate::cycle::{CycleResolver, CycleState};
use crate::error::Result;
use crate::lead_time::LeadTimeSet;
use crate::retrieval::Retriever;

pub use forecast::ForecastSource;
pub use nowcast::NowcastSource;
pub use nwp::NwpSource;

/// A configured, openable dataset.
pub trait DataSource: fmt::Display {
    type Grid: LabeledGrid;

    /// Driver name as used in catalogs.
    fn name(&self) -> &'static str;

    fn options(&self) -> &SourceOptions;

    /// Where cycle resolution stands.
    fn cycle(&self) -> CycleState;

    /// Resolve cycles, retrieve and assemble the dataset.
    ///
    /// The resolved cycle is kept, so later calls do not probe again.
    fn open(&mut self) -> Result<AssembledDataset<Self::Grid>>;

    /// Open the dataset and describe its structure.
    fn schema(&mut self) -> Result<DatasetSchema> {
        Ok(self.open()?.schema())
    }
}

/// Shared state of the sources that read a single cycle.
#[derive(Debug)]
struct SingleCycle<R> {
    options: SourceOptions,
    lead_times: LeadTimeSet,
    resolver: CycleResolver,
    retriever: R,
}

impl<R: Retriever> SingleCycle<R> {
    fn new(
        options: SourceOptions,
        lead_times: LeadTimeSet,
        explicit: Option<DateTime<Utc>>,
        latest: impl FnOnce() -> Result<CycleResolver>,
        retriever: R,
    ) -> Result<Self> {
        let resolver = match explicit {
            Some(cycle) => CycleResolver::explicit(cycle),
            None => latest()?,
        };
        Ok(Self {
            options,
            lead_times,
            resolver,
            retriever,
        })
    }

    fn open(&mut self, context: String) -> Result<AssembledDataset<R::Grid>> {
        let cycle = self.resolver.resolve(&self.retriever, &self.options, &context)?;
        DatasetAssembler::new(&self.options, context).assemble(&self.retriever, vec![cycle], &self.lead_times)
    }

    fn describe(&self, f: &mut fmt::Formatter<'_>, kind: &str) -> fmt::Result {
        write!(f, "<{}: cycle={}, ", kind, display_cycle(self.resolver.state()))?;
        self.options.describe(f, &self.lead_times)?;
        write!(f, ">")
    }
}

/// `'2024-01-15T12:00:00Z'` once resolved, `None` before.
fn display_cycle(state: CycleState) -> String {
    match state.resolved() {
        Some(cycle) => format!("'{}'", nwp_common::format_cycle(&cycle)),
        None => "None".to_string(),
    }
}
