//! Nowcast stitching across consecutive cycles.

use chrono::Duration;
use labeled_grid::LabeledGrid;
use nwp_source::{CycleState, DataSource, NowcastConfig, NowcastSource, NwpError};
use test_utils::fixtures::options::hrrr_t2m;
use test_utils::fixtures::time::{cycle, hours_from_day_start, reference_time};
use test_utils::{assert_err, expected_value, ScriptedArchive};

#[test]
fn test_explicit_range_is_continuous() {
    let archive = ScriptedArchive::new().serve_generated(&["t2m"]);
    let config = NowcastConfig::new(hrrr_t2m(), hours_from_day_start(-12))
        .with_stop(cycle(0))
        .with_time_step(2);
    let mut source = NowcastSource::with_reference_time(config, archive.clone(), reference_time()).unwrap();

    assert_eq!(source.lead_times().hours(), &[0, 2, 4]);
    let dataset = source.open().unwrap();

    assert_eq!(
        dataset.cycles(),
        &[hours_from_day_start(-12), hours_from_day_start(-6), cycle(0)]
    );
    let times = dataset.times();
    assert_eq!(times.len(), 9);
    assert_eq!(times[0], hours_from_day_start(-12));
    assert!(times.windows(2).all(|w| w[1] - w[0] == Duration::hours(2)));
    assert!(archive.probes().is_empty());

    let grid = dataset.grid();
    assert!(grid.coord("step").is_none());
    assert!(grid.coord("valid_time").is_none());
    let t2m = grid.variable("t2m").unwrap();
    assert_eq!(t2m.dims, vec!["time", "latitude", "longitude"]);
    // Second cycle, second lead
    assert_eq!(t2m.data[&[4, 1, 0][..]], expected_value(0, 1, 1, 3));
}

#[test]
fn test_latest_stop_requires_full_interval() {
    let archive = ScriptedArchive::new()
        .publish(cycle(12), 3)
        .publish(cycle(6), 18)
        .serve_generated(&["t2m"]);
    let config = NowcastConfig::new(hrrr_t2m(), cycle(0));
    let mut source = NowcastSource::with_reference_time(config, archive.clone(), reference_time()).unwrap();

    let dataset = source.open().unwrap();
    assert_eq!(dataset.cycles(), &[cycle(0), cycle(6)]);
    assert_eq!(archive.probed_cycles(), vec![cycle(12), cycle(6)]);
    assert!(archive.probes().iter().all(|p| p.lead_hours == 6));
    assert_eq!(source.cycle(), CycleState::Resolved(cycle(6)));

    let times = dataset.times();
    assert_eq!(times.len(), 12);
    assert_eq!(times.last().copied(), Some(cycle(11)));
}

#[test]
fn test_single_cycle_range() {
    let archive = ScriptedArchive::new().serve_generated(&["t2m"]);
    let config = NowcastConfig::new(hrrr_t2m(), cycle(6))
        .with_stop(cycle(6))
        .with_time_step(3);
    let mut source = NowcastSource::with_reference_time(config, archive, reference_time()).unwrap();

    let dataset = source.open().unwrap();
    assert_eq!(dataset.times(), vec![cycle(6), cycle(9)]);
    assert_eq!(dataset.grid().dim_len("time"), Some(2));
}

#[test]
fn test_start_after_explicit_stop() {
    let config = NowcastConfig::new(hrrr_t2m(), cycle(12)).with_stop(cycle(6));
    let result = NowcastSource::with_reference_time(config, ScriptedArchive::new(), reference_time());
    assert_err!(result, NwpError::Configuration(_));
}

#[test]
fn test_start_after_resolved_stop() {
    let archive = ScriptedArchive::new()
        .publish(cycle(12), 6)
        .serve_generated(&["t2m"]);
    let config = NowcastConfig::new(hrrr_t2m(), cycle(18));
    let mut source = NowcastSource::with_reference_time(config, archive.clone(), reference_time()).unwrap();

    assert_err!(source.open(), NwpError::Configuration(_));
    assert!(archive.requests().is_empty());
}

#[test]
fn test_time_step_must_divide_cycle_step() {
    let config = NowcastConfig::new(hrrr_t2m(), cycle(0)).with_time_step(4);
    let result = NowcastSource::with_reference_time(config, ScriptedArchive::new(), reference_time());
    assert_err!(result, NwpError::Configuration(_));
}

#[test]
fn test_unpublished_stop_exhausts() {
    let archive = ScriptedArchive::new().serve_generated(&["t2m"]);
    let config = NowcastConfig::new(hrrr_t2m(), cycle(0)).with_stepback(2);
    let mut source = NowcastSource::with_reference_time(config, archive.clone(), reference_time()).unwrap();

    assert_err!(source.open(), NwpError::DataUnavailable(_));
    assert_eq!(archive.probed_cycles(), vec![cycle(12), cycle(6), cycle(0)]);
}

#[test]
fn test_repr() {
    let config = NowcastConfig::new(hrrr_t2m(), hours_from_day_start(-12))
        .with_stop(cycle(0))
        .with_time_step(2);
    let source = NowcastSource::with_reference_time(config, ScriptedArchive::new(), reference_time()).unwrap();

    assert_eq!(source.name(), "nowcast");
    assert_eq!(
        source.to_string(),
        "<NowcastSource: start='2024-01-14T12:00:00Z', stop='2024-01-15T00:00:00Z', model='hrrr', \
         fxx=[0, 2, 4], product='sfc', pattern=':TMP:2 m above ground:', \
         priority=[\"google\", \"aws\", \"nomads\", \"azure\"]>"
    );
}
