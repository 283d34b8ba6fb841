//! Contract with the external archive that locates and decodes forecast files.
//!
//! The archive client (index lookups, byte-range downloads, GRIB decoding) is
//! supplied by the caller. Sources only talk to it through [`Retriever`].

use std::fmt;

use chrono::{DateTime, Utc};
use thiserror::Error;

use labeled_grid::LabeledGrid;
use nwp_common::{format_cycle, ValidTime};

use crate::config::SourceOptions;
use crate::lead_time::LeadTimeSet;

/// Default archive preference order.
pub const DEFAULT_PRIORITY: &[&str] = &["google", "aws", "nomads", "azure"];

/// Failure reported by a retrieval backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RetrievalError {
    /// The archive has nothing matching the request
    #[error("no data found: {0}")]
    NoData(String),

    /// Transport or decoding failure
    #[error("backend failure: {0}")]
    Backend(String),
}

/// Existence check for one `(cycle, lead)` object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeRequest {
    pub model: String,
    pub cycle: DateTime<Utc>,
    pub lead_hours: u32,
    pub product: String,
    pub pattern: String,
    pub priority: Vec<String>,
}

impl ProbeRequest {
    pub fn new(options: &SourceOptions, cycle: DateTime<Utc>, lead_hours: u32) -> Self {
        Self {
            model: options.model.clone(),
            cycle,
            lead_hours,
            product: options.product.clone(),
            pattern: options.pattern.clone(),
            priority: options.priority.clone(),
        }
    }
}

impl fmt::Display for ProbeRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} f{:03} product='{}' pattern='{}'",
            self.model,
            format_cycle(&self.cycle),
            self.lead_hours,
            self.product,
            self.pattern
        )
    }
}

/// Bulk request for every `(cycle, lead)` combination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrievalRequest {
    pub model: String,
    pub cycles: Vec<DateTime<Utc>>,
    pub lead_times: LeadTimeSet,
    pub product: String,
    pub pattern: String,
    pub priority: Vec<String>,
    /// Delete local GRIB files once decoded
    pub remove_grib: bool,
}

impl RetrievalRequest {
    pub fn new(options: &SourceOptions, cycles: Vec<DateTime<Utc>>, lead_times: LeadTimeSet) -> Self {
        Self {
            model: options.model.clone(),
            cycles,
            lead_times,
            product: options.product.clone(),
            pattern: options.pattern.clone(),
            priority: options.priority.clone(),
            remove_grib: options.remove_grib,
        }
    }

    /// Every requested object, cycle-major.
    pub fn objects(&self) -> impl Iterator<Item = ValidTime> + '_ {
        self.cycles
            .iter()
            .flat_map(move |c| self.lead_times.iter().map(move |h| ValidTime::new(*c, h)))
    }

    pub fn object_count(&self) -> usize {
        self.cycles.len() * self.lead_times.len()
    }
}

impl fmt::Display for RetrievalRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cycles: Vec<String> = self.cycles.iter().map(format_cycle).collect();
        write!(
            f,
            "{} cycles={:?} fxx={} product='{}' pattern='{}'",
            self.model, cycles, self.lead_times, self.product, self.pattern
        )
    }
}

/// Result of a bulk fetch.
///
/// Decoders split messages with incompatible coordinates into separate
/// datasets, so a loose pattern can yield more than one.
#[derive(Debug, Clone, PartialEq)]
pub enum Retrieved<G> {
    Single(G),
    Multiple(Vec<G>),
}

/// Client for an NWP archive.
pub trait Retriever {
    type Grid: LabeledGrid;

    /// Whether the object for a single cycle and lead time is published.
    fn exists(&self, probe: &ProbeRequest) -> Result<bool, RetrievalError>;

    /// Index lines of the messages a request would download.
    fn inventory(&self, request: &RetrievalRequest) -> Result<Vec<String>, RetrievalError>;

    /// Download and decode every object of a request.
    fn fetch(&self, request: &RetrievalRequest) -> Result<Retrieved<Self::Grid>, RetrievalError>;
}

impl<R: Retriever + ?Sized> Retriever for &R {
    type Grid = R::Grid;

    fn exists(&self, probe: &ProbeRequest) -> Result<bool, RetrievalError> {
        (**self).exists(probe)
    }

    fn inventory(&self, request: &RetrievalRequest) -> Result<Vec<String>, RetrievalError> {
        (**self).inventory(request)
    }

    fn fetch(&self, request: &RetrievalRequest) -> Result<Retrieved<Self::Grid>, RetrievalError> {
        (**self).fetch(request)
    }
}
