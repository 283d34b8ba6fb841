//! Common test fixtures for NWP source tests.
//!
//! Pre-defined cycles, spatial grids and source options representing common
//! scenarios.

/// Common time values for testing.
pub mod time {
    use chrono::{DateTime, TimeZone, Utc};

    /// A fixed reference time for tests (2024-01-15T14:37:00Z)
    pub const REFERENCE_TIME: &str = "2024-01-15T14:37:00Z";

    /// GFS model run hours
    pub const GFS_CYCLES: [u32; 4] = [0, 6, 12, 18];

    /// Common forecast hours
    pub const FORECAST_HOURS: [u32; 8] = [0, 1, 3, 6, 12, 24, 48, 120];

    /// [`REFERENCE_TIME`] as a timestamp.
    pub fn reference_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 14, 37, 0).unwrap()
    }

    /// A cycle on the reference day.
    pub fn cycle(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, hour, 0, 0).unwrap()
    }

    /// `hours` after 2024-01-15T00:00:00Z; negative values reach into the
    /// previous day.
    pub fn hours_from_day_start(hours: i64) -> DateTime<Utc> {
        cycle(0) + chrono::Duration::hours(hours)
    }
}

/// Small spatial grid used by the generators.
pub mod grid {
    /// Latitudes in decoder order (north to south)
    pub const LATITUDES: [f64; 2] = [45.0, 44.0];

    /// Longitudes, ascending
    pub const LONGITUDES: [f64; 3] = [260.0, 261.0, 262.0];

    /// Number of spatial cells per field.
    pub const CELLS: usize = LATITUDES.len() * LONGITUDES.len();
}

/// Common source options.
pub mod options {
    use nwp_source::SourceOptions;

    /// GFS 2 m temperature
    pub fn gfs_t2m() -> SourceOptions {
        SourceOptions::new("gfs", "pgrb2.0p25", ":TMP:2 m above ground:")
    }

    /// HRRR surface temperature
    pub fn hrrr_t2m() -> SourceOptions {
        SourceOptions::new("hrrr", "sfc", ":TMP:2 m above ground:")
    }
}

/// Sample catalog with one source per driver.
pub const SAMPLE_CATALOG: &str = r#"
metadata:
  provider: noaa
sources:
  gfs_analysis:
    description: Latest GFS analysis
    driver: nwp
    args:
      model: gfs
      product: pgrb2.0p25
      pattern: ":TMP:2 m above ground:"
      fxx: [0]
  gfs_forecast:
    description: GFS 2 m temperature, next day
    driver: forecast
    metadata:
      units: K
    args:
      model: gfs
      product: pgrb2.0p25
      pattern: ":TMP:2 m above ground:"
      fxx: {start: 0, stop: 25, step: 6}
      mapping:
        t2m: temperature
      metadata:
        units: degC
  hrrr_nowcast:
    description: HRRR stitched nowcast
    driver: nowcast
    args:
      model: hrrr
      product: sfc
      pattern: ":TMP:2 m above ground:"
      start: "2024-01-14T12:00:00"
      stop: "2024-01-15T00:00:00"
      time_step: 2
      sorted: true
"#;
