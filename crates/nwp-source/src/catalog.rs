//! YAML catalogs of named sources.
//!
//! ```yaml
//! metadata:
//!   provider: noaa
//! sources:
//!   gfs_t2m:
//!     description: GFS 2 m temperature
//!     driver: forecast
//!     metadata:
//!       units: K
//!     args:
//!       model: gfs
//!       product: pgrb2.0p25
//!       pattern: ":TMP:2 m above ground:"
//!       fxx: {start: 0, stop: 25, step: 6}
//!       priority: ["${NWP_PRIORITY:-aws}"]
//! ```
//!
//! `${VAR}` and `${VAR:-default}` are substituted from the environment
//! before parsing. Metadata flows from catalog to entry to source args, the
//! more specific level winning.

use std::fmt;
use std::path::Path;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::{ForecastConfig, Metadata, NowcastConfig, NwpConfig, SourceOptions};
use crate::error::{NwpError, Result};
use crate::lead_time::LeadTimeSet;
use crate::retrieval::Retriever;
use crate::sources::{DataSource, ForecastSource, NowcastSource, NwpSource};

/// Source kind of a catalog entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Driver {
    Nwp,
    Forecast,
    Nowcast,
}

impl fmt::Display for Driver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Nwp => "nwp",
            Self::Forecast => "forecast",
            Self::Nowcast => "nowcast",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    metadata: Metadata,
    #[serde(default)]
    sources: IndexMap<String, EntryFile>,
}

#[derive(Debug, Deserialize)]
struct EntryFile {
    #[serde(default)]
    description: String,
    driver: Driver,
    #[serde(default)]
    metadata: Metadata,
    args: serde_yaml::Value,
}

/// Parsed arguments of a catalog entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SourceDefinition {
    Nwp(NwpConfig),
    Forecast(ForecastConfig),
    Nowcast(NowcastConfig),
}

impl SourceDefinition {
    pub fn driver(&self) -> Driver {
        match self {
            Self::Nwp(_) => Driver::Nwp,
            Self::Forecast(_) => Driver::Forecast,
            Self::Nowcast(_) => Driver::Nowcast,
        }
    }

    pub fn options(&self) -> &SourceOptions {
        match self {
            Self::Nwp(c) => &c.options,
            Self::Forecast(c) => &c.options,
            Self::Nowcast(c) => &c.options,
        }
    }

    fn options_mut(&mut self) -> &mut SourceOptions {
        match self {
            Self::Nwp(c) => &mut c.options,
            Self::Forecast(c) => &mut c.options,
            Self::Nowcast(c) => &mut c.options,
        }
    }

    /// Lead times the source will request.
    pub fn lead_times(&self) -> Result<LeadTimeSet> {
        match self {
            Self::Nwp(c) => c.fxx.expand(),
            Self::Forecast(c) => c.fxx.expand(),
            Self::Nowcast(c) => LeadTimeSet::nowcast(c.cycle_step, c.time_step),
        }
    }

    /// The configured cycle (the stop cycle for nowcasts), if pinned.
    pub fn explicit_cycle(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Nwp(c) => c.cycle,
            Self::Forecast(c) => c.cycle,
            Self::Nowcast(c) => c.stop,
        }
    }

    /// Hours between model cycles.
    pub fn cycle_step(&self) -> u32 {
        match self {
            Self::Nwp(c) => c.cycle_step,
            Self::Forecast(c) => c.cycle_step,
            Self::Nowcast(c) => c.cycle_step,
        }
    }

    fn parse(driver: Driver, args: serde_yaml::Value) -> std::result::Result<Self, serde_yaml::Error> {
        Ok(match driver {
            Driver::Nwp => Self::Nwp(serde_yaml::from_value(args)?),
            Driver::Forecast => Self::Forecast(serde_yaml::from_value(args)?),
            Driver::Nowcast => Self::Nowcast(serde_yaml::from_value(args)?),
        })
    }
}

/// A named source definition.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogEntry {
    pub name: String,
    pub description: String,
    pub definition: SourceDefinition,
}

impl CatalogEntry {
    pub fn driver(&self) -> Driver {
        self.definition.driver()
    }

    /// Instantiate the source against `retriever`.
    pub fn build<R>(&self, retriever: R) -> Result<Box<dyn DataSource<Grid = R::Grid>>>
    where
        R: Retriever + 'static,
    {
        self.build_with_reference_time(retriever, Utc::now())
    }

    /// Instantiate with `now` as the reference time for latest-cycle lookup.
    pub fn build_with_reference_time<R>(
        &self,
        retriever: R,
        now: DateTime<Utc>,
    ) -> Result<Box<dyn DataSource<Grid = R::Grid>>>
    where
        R: Retriever + 'static,
    {
        debug!(source = %self.name, driver = %self.driver(), "Building source");
        let source: Box<dyn DataSource<Grid = R::Grid>> = match &self.definition {
            SourceDefinition::Nwp(c) => Box::new(NwpSource::with_reference_time(c.clone(), retriever, now)?),
            SourceDefinition::Forecast(c) => {
                Box::new(ForecastSource::with_reference_time(c.clone(), retriever, now)?)
            }
            SourceDefinition::Nowcast(c) => {
                Box::new(NowcastSource::with_reference_time(c.clone(), retriever, now)?)
            }
        };
        Ok(source)
    }
}

/// Named sources loaded from YAML.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    pub metadata: Metadata,
    entries: IndexMap<String, CatalogEntry>,
}

impl Catalog {
    /// Load a catalog file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let catalog = Self::from_yaml_str(&content).map_err(|e| match e {
            NwpError::Catalog(msg) => NwpError::catalog(format!("{}: {}", path.display(), msg)),
            other => other,
        })?;
        info!(path = %path.display(), sources = catalog.len(), "Loaded catalog");
        Ok(catalog)
    }

    /// Parse catalog YAML, expanding environment variables first.
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let expanded = expand_env_vars(content)?;
        let file: CatalogFile =
            serde_yaml::from_str(&expanded).map_err(|e| NwpError::catalog(e.to_string()))?;

        let mut entries = IndexMap::with_capacity(file.sources.len());
        for (name, raw) in file.sources {
            if name.trim().is_empty() {
                return Err(NwpError::catalog("source names cannot be empty"));
            }
            let mut definition = SourceDefinition::parse(raw.driver, raw.args)
                .map_err(|e| NwpError::catalog(format!("source '{}': {}", name, e)))?;

            let options = definition.options_mut();
            options.merge_metadata(&raw.metadata);
            options.merge_metadata(&file.metadata);

            entries.insert(
                name.clone(),
                CatalogEntry {
                    name,
                    description: raw.description,
                    definition,
                },
            );
        }

        Ok(Self {
            metadata: file.metadata,
            entries,
        })
    }

    /// Source names in file order.
    pub fn names(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }

    pub fn entry(&self, name: &str) -> Result<&CatalogEntry> {
        self.entries.get(name).ok_or_else(|| {
            NwpError::catalog(format!(
                "no source named '{}' (available: {})",
                name,
                self.names().join(", ")
            ))
        })
    }

    pub fn entries(&self) -> impl Iterator<Item = &CatalogEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Expand `${VAR}` and `${VAR:-default}` references.
fn expand_env_vars(content: &str) -> Result<String> {
    let mut result = String::with_capacity(content.len());
    let mut chars = content.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && chars.peek() == Some(&'{') {
            chars.next();

            let mut var_expr = String::new();
            let mut depth = 1;
            while depth > 0 {
                match chars.next() {
                    Some('{') => {
                        depth += 1;
                        var_expr.push('{');
                    }
                    Some('}') => {
                        depth -= 1;
                        if depth > 0 {
                            var_expr.push('}');
                        }
                    }
                    Some(c) => var_expr.push(c),
                    None => {
                        return Err(NwpError::catalog(format!(
                            "unclosed variable substitution: ${{{}",
                            var_expr
                        )))
                    }
                }
            }

            result.push_str(&resolve_var_expr(&var_expr)?);
        } else {
            result.push(ch);
        }
    }

    Ok(result)
}

fn resolve_var_expr(expr: &str) -> Result<String> {
    if let Some((var_name, default)) = expr.split_once(":-") {
        match std::env::var(var_name.trim()) {
            Ok(val) if !val.is_empty() => Ok(val),
            _ => Ok(default.to_string()),
        }
    } else {
        std::env::var(expr.trim())
            .map_err(|_| NwpError::catalog(format!("environment variable {} not set", expr.trim())))
    }
}
