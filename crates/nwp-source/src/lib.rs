//! NWP forecast data sources.
//!
//! Locates the most recent published model cycle, retrieves the requested
//! lead times through a pluggable archive client and reshapes the decoded
//! grid so that forecast hours lie on one absolute `time` axis.
//!
//! # Architecture
//!
//! - [`Retriever`]: the archive client (index lookup, download, decoding),
//!   supplied by the caller
//! - [`CycleResolver`]: latest-cycle lookup with bounded step back
//! - [`DatasetAssembler`]: time-axis merge, coverage check, sort, rename
//! - [`NwpSource`], [`ForecastSource`], [`NowcastSource`]: the source kinds
//! - [`Catalog`]: named source definitions loaded from YAML

pub mod assembler;
pub mod catalog;
pub mod config;
pub mod cycle;
pub mod error;
pub mod lead_time;
pub mod retrieval;
pub mod sources;

// Re-exports
pub use assembler::{AssembledDataset, DatasetAssembler, DatasetSchema};
pub use catalog::{Catalog, CatalogEntry, Driver, SourceDefinition};
pub use config::{ForecastConfig, Metadata, NowcastConfig, NwpConfig, SourceOptions};
pub use cycle::{CycleResolver, CycleState};
pub use error::{NwpError, Result};
pub use lead_time::{LeadTimeRange, LeadTimeSet, LeadTimeSpec};
pub use retrieval::{
    ProbeRequest, RetrievalError, RetrievalRequest, Retrieved, Retriever, DEFAULT_PRIORITY,
};
pub use sources::{DataSource, ForecastSource, NowcastSource, NwpSource};
