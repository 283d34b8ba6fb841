//! Time handling utilities for model cycles and lead times.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Timelike, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// A forecast valid time.
///
/// Combines the model initialisation (cycle) time and a lead-time offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ValidTime {
    /// Model initialisation time
    pub cycle: DateTime<Utc>,
    /// Lead time offset from the cycle, in hours
    pub lead_hours: u32,
}

impl ValidTime {
    pub fn new(cycle: DateTime<Utc>, lead_hours: u32) -> Self {
        Self { cycle, lead_hours }
    }

    /// Create from analysis time (lead_hours = 0)
    pub fn analysis(cycle: DateTime<Utc>) -> Self {
        Self { cycle, lead_hours: 0 }
    }

    /// The actual valid time (cycle + lead offset).
    pub fn valid_datetime(&self) -> DateTime<Utc> {
        self.cycle + Duration::hours(self.lead_hours as i64)
    }
}

impl std::fmt::Display for ValidTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} f{:03}", format_cycle(&self.cycle), self.lead_hours)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TimeError {
    #[error("Invalid hour resolution {0}: must be greater than zero")]
    InvalidResolution(i64),

    #[error("Invalid time format: {0}")]
    InvalidFormat(String),

    #[error("Cycle range start {start} is after stop {stop}")]
    InvertedRange { start: String, stop: String },
}

/// Round a timestamp down to the latest multiple of `hour_resolution` hours.
///
/// The boundary is counted from midnight of the same day, and minutes,
/// seconds and sub-second components are zeroed.
pub fn round_time(
    time: DateTime<Utc>,
    hour_resolution: i64,
) -> Result<DateTime<Utc>, TimeError> {
    if hour_resolution <= 0 {
        return Err(TimeError::InvalidResolution(hour_resolution));
    }

    let hour = time.hour() as i64;
    let floored = (hour / hour_resolution) * hour_resolution;

    let excess = Duration::hours(hour - floored)
        + Duration::minutes(time.minute() as i64)
        + Duration::seconds(time.second() as i64)
        + Duration::nanoseconds(time.nanosecond() as i64);
    Ok(time - excess)
}

/// Parse a cycle timestamp.
///
/// Accepted forms (all interpreted as UTC unless an offset is given):
/// - RFC 3339: `2024-01-15T12:00:00Z`
/// - `2024-01-15T12:00:00`, `2024-01-15 12:00:00`, `2024-01-15 12:00`
/// - `2024-01-15T12`
/// - `2024011512`
/// - `2024-01-15` (midnight)
pub fn parse_cycle(s: &str) -> Result<DateTime<Utc>, TimeError> {
    let s = s.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    const FORMATS: &[&str] = &[
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
    ];
    for fmt in FORMATS {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(Utc.from_utc_datetime(&ndt));
        }
    }

    // Hour-only forms are not handled by chrono's parser without minutes
    if let Ok(ndt) = NaiveDateTime::parse_from_str(&format!("{}:00", s), "%Y-%m-%dT%H:%M") {
        return Ok(Utc.from_utc_datetime(&ndt));
    }
    if s.len() == 10 && s.chars().all(|c| c.is_ascii_digit()) {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(&format!("{}00", s), "%Y%m%d%H%M") {
            return Ok(Utc.from_utc_datetime(&ndt));
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        if let Some(ndt) = date.and_hms_opt(0, 0, 0) {
            return Ok(Utc.from_utc_datetime(&ndt));
        }
    }

    Err(TimeError::InvalidFormat(s.to_string()))
}

/// Format a cycle timestamp for display and logging.
pub fn format_cycle(cycle: &DateTime<Utc>) -> String {
    cycle.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// Every cycle from `start` to `stop` inclusive, `step_hours` apart.
pub fn cycle_range(
    start: DateTime<Utc>,
    stop: DateTime<Utc>,
    step_hours: i64,
) -> Result<Vec<DateTime<Utc>>, TimeError> {
    if step_hours <= 0 {
        return Err(TimeError::InvalidResolution(step_hours));
    }
    if start > stop {
        return Err(TimeError::InvertedRange {
            start: format_cycle(&start),
            stop: format_cycle(&stop),
        });
    }

    let step = Duration::hours(step_hours);
    let mut cycles = Vec::new();
    let mut current = start;
    while current <= stop {
        cycles.push(current);
        current += step;
    }
    Ok(cycles)
}

/// Serde helper: deserialize an optional cycle through [`parse_cycle`].
pub fn deserialize_optional_cycle<'de, D>(
    deserializer: D,
) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    raw.map(|s| parse_cycle(&s).map_err(serde::de::Error::custom))
        .transpose()
}

/// Serde helper: deserialize a required cycle through [`parse_cycle`].
pub fn deserialize_cycle<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_cycle(&raw).map_err(serde::de::Error::custom)
}
