//! Source configuration.
//!
//! Each source kind has a config struct deserializable from catalog YAML.
//! Options shared by every kind live in [`SourceOptions`] and are flattened
//! into the kind-specific structs.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use nwp_common::time::{deserialize_cycle, deserialize_optional_cycle};

use crate::lead_time::LeadTimeSpec;
use crate::retrieval::DEFAULT_PRIORITY;

/// Free-form metadata attached to a source and copied into its dataset.
pub type Metadata = BTreeMap<String, serde_json::Value>;

/// Options common to every source kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceOptions {
    /// Model identifier understood by the archive (e.g. "gfs", "hrrr")
    pub model: String,

    /// Model product (e.g. "pgrb2.0p25", "sfc")
    pub product: String,

    /// Regular expression selecting messages from the GRIB index
    pub pattern: String,

    /// Archive preference order
    #[serde(default = "default_priority")]
    pub priority: Vec<String>,

    /// Variable renames applied to the assembled dataset
    #[serde(default)]
    pub mapping: BTreeMap<String, String>,

    /// Sort every dimension coordinate ascending
    #[serde(default)]
    pub sorted: bool,

    #[serde(default)]
    pub metadata: Metadata,

    /// Delete local GRIB files once decoded
    #[serde(default = "default_remove_grib")]
    pub remove_grib: bool,
}

fn default_priority() -> Vec<String> {
    DEFAULT_PRIORITY.iter().map(|s| s.to_string()).collect()
}

fn default_remove_grib() -> bool {
    true
}

fn default_cycle_step() -> u32 {
    6
}

fn default_time_step() -> u32 {
    1
}

fn default_stepback() -> u32 {
    1
}

impl SourceOptions {
    pub fn new(model: impl Into<String>, product: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            product: product.into(),
            pattern: pattern.into(),
            priority: default_priority(),
            mapping: BTreeMap::new(),
            sorted: false,
            metadata: Metadata::new(),
            remove_grib: true,
        }
    }

    pub fn with_mapping(mut self, from: &str, to: &str) -> Self {
        self.mapping.insert(from.to_string(), to.to_string());
        self
    }

    pub fn with_metadata(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }

    pub fn sorted(mut self, sorted: bool) -> Self {
        self.sorted = sorted;
        self
    }

    pub fn with_priority(mut self, priority: &[&str]) -> Self {
        self.priority = priority.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Fill in metadata keys that are not already set.
    pub fn merge_metadata(&mut self, defaults: &Metadata) {
        for (key, value) in defaults {
            self.metadata.entry(key.clone()).or_insert_with(|| value.clone());
        }
    }

    /// `model='..', fxx=.., product='..', pattern='..', priority=[..]` fragment
    /// shared by the source representations.
    pub(crate) fn describe(&self, f: &mut fmt::Formatter<'_>, fxx: &dyn fmt::Display) -> fmt::Result {
        write!(
            f,
            "model='{}', fxx={}, product='{}', pattern='{}', priority={:?}",
            self.model, fxx, self.product, self.pattern, self.priority
        )
    }
}

/// Latest (or explicit) analysis cycle of a model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NwpConfig {
    #[serde(flatten)]
    pub options: SourceOptions,

    /// Lead times to retrieve
    pub fxx: LeadTimeSpec,

    /// Explicit cycle; the latest published cycle is used when absent
    #[serde(default, deserialize_with = "deserialize_optional_cycle")]
    pub cycle: Option<DateTime<Utc>>,

    /// Hours between model cycles
    #[serde(default = "default_cycle_step")]
    pub cycle_step: u32,

    /// Earlier cycles to try when the latest one is not published
    #[serde(default)]
    pub stepback: u32,
}

impl NwpConfig {
    pub fn new(options: SourceOptions, fxx: impl Into<LeadTimeSpec>) -> Self {
        Self {
            options,
            fxx: fxx.into(),
            cycle: None,
            cycle_step: default_cycle_step(),
            stepback: 0,
        }
    }

    pub fn with_cycle(mut self, cycle: DateTime<Utc>) -> Self {
        self.cycle = Some(cycle);
        self
    }

    pub fn with_cycle_step(mut self, hours: u32) -> Self {
        self.cycle_step = hours;
        self
    }

    pub fn with_stepback(mut self, stepback: u32) -> Self {
        self.stepback = stepback;
        self
    }
}

/// Latest cycle that covers every requested lead time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastConfig {
    #[serde(flatten)]
    pub options: SourceOptions,

    pub fxx: LeadTimeSpec,

    #[serde(default, deserialize_with = "deserialize_optional_cycle")]
    pub cycle: Option<DateTime<Utc>>,

    #[serde(default = "default_cycle_step")]
    pub cycle_step: u32,

    #[serde(default = "default_stepback")]
    pub stepback: u32,
}

impl ForecastConfig {
    pub fn new(options: SourceOptions, fxx: impl Into<LeadTimeSpec>) -> Self {
        Self {
            options,
            fxx: fxx.into(),
            cycle: None,
            cycle_step: default_cycle_step(),
            stepback: default_stepback(),
        }
    }

    pub fn with_cycle(mut self, cycle: DateTime<Utc>) -> Self {
        self.cycle = Some(cycle);
        self
    }

    pub fn with_cycle_step(mut self, hours: u32) -> Self {
        self.cycle_step = hours;
        self
    }

    pub fn with_stepback(mut self, stepback: u32) -> Self {
        self.stepback = stepback;
        self
    }
}

/// Continuous series stitched from the short-range leads of many cycles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NowcastConfig {
    #[serde(flatten)]
    pub options: SourceOptions,

    /// First cycle of the series
    #[serde(deserialize_with = "deserialize_cycle")]
    pub start: DateTime<Utc>,

    /// Last cycle; the latest cycle covering a full interval when absent
    #[serde(default, deserialize_with = "deserialize_optional_cycle")]
    pub stop: Option<DateTime<Utc>>,

    #[serde(default = "default_cycle_step")]
    pub cycle_step: u32,

    /// Hours between output times
    #[serde(default = "default_time_step")]
    pub time_step: u32,

    #[serde(default = "default_stepback")]
    pub stepback: u32,
}

impl NowcastConfig {
    pub fn new(options: SourceOptions, start: DateTime<Utc>) -> Self {
        Self {
            options,
            start,
            stop: None,
            cycle_step: default_cycle_step(),
            time_step: default_time_step(),
            stepback: default_stepback(),
        }
    }

    pub fn with_stop(mut self, stop: DateTime<Utc>) -> Self {
        self.stop = Some(stop);
        self
    }

    pub fn with_cycle_step(mut self, hours: u32) -> Self {
        self.cycle_step = hours;
        self
    }

    pub fn with_time_step(mut self, hours: u32) -> Self {
        self.time_step = hours;
        self
    }

    pub fn with_stepback(mut self, stepback: u32) -> Self {
        self.stepback = stepback;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_nwp_defaults() {
        let yaml = r#"
model: gfs
product: pgrb2.0p25
pattern: ":TMP:2 m above ground:"
fxx: [0, 3, 6]
"#;
        let config: NwpConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.options.model, "gfs");
        assert_eq!(config.options.priority, vec!["google", "aws", "nomads", "azure"]);
        assert!(config.options.remove_grib);
        assert!(!config.options.sorted);
        assert!(config.cycle.is_none());
        assert_eq!(config.cycle_step, 6);
        assert_eq!(config.stepback, 0);
    }

    #[test]
    fn test_forecast_defaults_and_range() {
        let yaml = r#"
model: hrrr
product: sfc
pattern: ":TMP:"
fxx: {start: 0, stop: 18, step: 6}
cycle: "2024-01-15T12:00:00"
mapping:
  t2m: temperature
"#;
        let config: ForecastConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.stepback, 1);
        assert_eq!(config.fxx.expand().unwrap().hours(), &[0, 6, 12]);
        assert_eq!(
            config.cycle,
            Some(Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap())
        );
        assert_eq!(config.options.mapping.get("t2m").map(String::as_str), Some("temperature"));
    }

    #[test]
    fn test_nowcast_defaults() {
        let yaml = r#"
model: hrrr
product: sfc
pattern: ":TMP:"
start: "2024-01-15 00:00"
"#;
        let config: NowcastConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.start, Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap());
        assert!(config.stop.is_none());
        assert_eq!(config.cycle_step, 6);
        assert_eq!(config.time_step, 1);
        assert_eq!(config.stepback, 1);
    }

    #[test]
    fn test_nowcast_requires_start() {
        let yaml = "model: hrrr\nproduct: sfc\npattern: ':TMP:'\n";
        assert!(serde_yaml::from_str::<NowcastConfig>(yaml).is_err());
    }

    #[test]
    fn test_merge_metadata_keeps_existing() {
        let mut options = SourceOptions::new("gfs", "pgrb2.0p25", ":TMP:").with_metadata("units", "K");
        let mut defaults = Metadata::new();
        defaults.insert("units".to_string(), "degC".into());
        defaults.insert("provider".to_string(), "noaa".into());

        options.merge_metadata(&defaults);
        assert_eq!(options.metadata["units"], "K");
        assert_eq!(options.metadata["provider"], "noaa");
    }
}
