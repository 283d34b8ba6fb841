//! Time-axis merge, coverage checks and post-processing of opened datasets.

use chrono::Duration;
use labeled_grid::{GridDataset, GridError, LabeledGrid};
use nwp_source::{DataSource, LeadTimeSpec, NwpConfig, NwpError, NwpSource, SourceOptions};
use test_utils::fixtures::options::gfs_t2m;
use test_utils::fixtures::time::{cycle, reference_time};
use test_utils::{assert_err, expected_value, forecast_grid, ScriptedArchive};

/// Source reading the 12Z cycle with `hours` lead times.
fn source_at_12z(options: SourceOptions, hours: &[u32], archive: &ScriptedArchive) -> NwpSource<ScriptedArchive> {
    NwpSource::with_reference_time(
        NwpConfig::new(options, LeadTimeSpec::list(hours)).with_cycle(cycle(12)),
        archive.clone(),
        reference_time(),
    )
    .unwrap()
}

// ============================================================================
// Time axis
// ============================================================================

#[test]
fn test_single_cycle_steps_become_valid_times() {
    let archive = ScriptedArchive::new().serve_generated(&["t2m"]);
    let mut source = source_at_12z(gfs_t2m(), &[0, 3, 6], &archive);

    let dataset = source.open().unwrap();
    let grid = dataset.grid();

    assert_eq!(
        dataset.times(),
        vec![cycle(12), cycle(15), cycle(18)]
    );
    assert_eq!(grid.dim_len("time"), Some(3));
    assert!(grid.dim_len("step").is_none());
    assert!(grid.coord("step").is_none());
    assert!(grid.coord("valid_time").is_none());

    let t2m = grid.variable("t2m").unwrap();
    assert_eq!(t2m.dims, vec!["time", "latitude", "longitude"]);
    assert_eq!(t2m.data[&[2, 0, 1][..]], expected_value(0, 0, 2, 1));
}

#[test]
fn test_time_is_strictly_increasing() {
    let archive = ScriptedArchive::new().serve_generated(&["t2m"]);
    let mut source = source_at_12z(gfs_t2m(), &[0, 1, 2, 3, 6, 12], &archive);

    let times = source.open().unwrap().times();
    assert!(times.windows(2).all(|w| w[0] < w[1]));
    assert_eq!(times[0], cycle(12));
    assert_eq!(*times.last().unwrap() - times[0], Duration::hours(12));
}

#[test]
fn test_request_carries_options() {
    let archive = ScriptedArchive::new().serve_generated(&["t2m"]);
    let mut options = gfs_t2m().with_priority(&["aws"]);
    options.remove_grib = false;
    let mut source = source_at_12z(options, &[0, 6], &archive);

    source.open().unwrap();
    let request = &archive.requests()[0];
    assert_eq!(request.cycles, vec![cycle(12)]);
    assert_eq!(request.lead_times.hours(), &[0, 6]);
    assert_eq!(request.priority, vec!["aws"]);
    assert!(!request.remove_grib);
}

// ============================================================================
// Retrieval failures
// ============================================================================

#[test]
fn test_coverage_shortfall() {
    let archive = ScriptedArchive::new().serve(forecast_grid(cycle(12), &[0, 3, 6], &["t2m"]));
    let mut source = source_at_12z(gfs_t2m(), &[0, 3, 6, 9], &archive);

    match source.open() {
        Err(NwpError::Coverage {
            requested_start,
            requested_end,
            available_end,
            ..
        }) => {
            assert_eq!(requested_start, cycle(12));
            assert_eq!(requested_end, cycle(21));
            assert_eq!(available_end, cycle(18));
        }
        other => panic!("expected coverage error, got {:?}", other.map(|d| d.times())),
    }
}

#[test]
fn test_coverage_uses_retrieval_order() {
    // Decoder delivered the last step first
    let archive = ScriptedArchive::new().serve(forecast_grid(cycle(12), &[3, 0, 1, 2], &["t2m"]));
    let mut source = source_at_12z(gfs_t2m(), &[0, 1, 2, 3], &archive);

    match source.open() {
        Err(NwpError::Coverage {
            requested_start,
            requested_end,
            available_end,
            ..
        }) => {
            assert_eq!(requested_start, cycle(15));
            assert_eq!(requested_end, cycle(18));
            assert_eq!(available_end, cycle(14));
        }
        other => panic!("expected coverage error, got {:?}", other.map(|d| d.times())),
    }
}

#[test]
fn test_multiple_datasets_are_rejected() {
    let archive = ScriptedArchive::new().serve_many(vec![
        forecast_grid(cycle(12), &[0], &["t2m"]),
        forecast_grid(cycle(12), &[0], &["u10"]),
    ]);
    let mut source = source_at_12z(gfs_t2m(), &[0], &archive);

    let err = source.open().unwrap_err();
    match &err {
        NwpError::AmbiguousPattern { pattern, count, .. } => {
            assert_eq!(pattern, ":TMP:2 m above ground:");
            assert_eq!(*count, 2);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(err.to_string().contains("please review your selected pattern"));
}

fn two_datasets() -> ScriptedArchive {
    ScriptedArchive::new().serve_many(vec![
        forecast_grid(cycle(12), &[0], &["t2m"]),
        forecast_grid(cycle(12), &[0], &["u10"]),
    ])
}

#[test]
fn test_multiple_datasets_rejected_when_sorted() {
    let archive = two_datasets();
    let mut source = source_at_12z(gfs_t2m().sorted(true), &[0], &archive);

    assert_err!(source.open(), NwpError::AmbiguousPattern { count: 2, .. });
}

#[test]
fn test_multiple_datasets_rejected_with_mapping() {
    let archive = two_datasets();
    let options = gfs_t2m().with_mapping("t2m", "temperature");
    let mut source = source_at_12z(options, &[0], &archive);

    assert_err!(source.open(), NwpError::AmbiguousPattern { count: 2, .. });
}

#[test]
fn test_single_element_list_is_accepted() {
    let archive = ScriptedArchive::new().serve_many(vec![forecast_grid(cycle(12), &[0, 3], &["t2m"])]);
    let mut source = source_at_12z(gfs_t2m(), &[0, 3], &archive);

    let dataset = source.open().unwrap();
    assert_eq!(dataset.times(), vec![cycle(12), cycle(15)]);
    assert_eq!(dataset.grid().variable_names(), vec!["t2m"]);
}

#[test]
fn test_empty_list_is_unavailable() {
    let archive = ScriptedArchive::new().serve_many(Vec::new());
    let mut source = source_at_12z(gfs_t2m(), &[0], &archive);

    assert_err!(source.open(), NwpError::DataUnavailable(_));
}

#[test]
fn test_empty_inventory_is_unavailable() {
    let archive = ScriptedArchive::new()
        .serve_generated(&["t2m"])
        .with_empty_inventory();
    let mut source = source_at_12z(gfs_t2m(), &[0], &archive);

    assert_err!(source.open(), NwpError::DataUnavailable(_));
    assert!(archive.requests().is_empty());
}

#[test]
fn test_nothing_served_is_unavailable() {
    let archive = ScriptedArchive::new();
    let mut source = source_at_12z(gfs_t2m(), &[0], &archive);

    let err = source.open().unwrap_err();
    assert!(matches!(err, NwpError::DataUnavailable(_)));
    assert!(err.to_string().contains("NwpSource"), "{err}");
}

// ============================================================================
// Post-processing
// ============================================================================

#[test]
fn test_mapping_renames_present_variables() {
    let archive = ScriptedArchive::new().serve_generated(&["t2m", "u10"]);
    let options = gfs_t2m()
        .with_mapping("t2m", "temperature")
        .with_mapping("absent", "ignored");
    let mut source = source_at_12z(options, &[0], &archive);

    let grid = source.open().unwrap().into_grid();
    assert_eq!(grid.variable_names(), vec!["temperature", "u10"]);
}

#[test]
fn test_mapping_collision() {
    let archive = ScriptedArchive::new().serve_generated(&["t2m", "temperature"]);
    let options = gfs_t2m().with_mapping("t2m", "temperature");
    let mut source = source_at_12z(options, &[0], &archive);

    assert_err!(source.open(), NwpError::Grid(GridError::NameConflict(_)));
}

#[test]
fn test_unsorted_keeps_decoder_order() {
    let archive = ScriptedArchive::new().serve_generated(&["t2m"]);
    let mut source = source_at_12z(gfs_t2m(), &[0], &archive);

    let grid: GridDataset = source.open().unwrap().into_grid();
    let lat = grid.coord("latitude").unwrap().values.as_floats().unwrap().clone();
    assert_eq!(lat.iter().copied().collect::<Vec<_>>(), vec![45.0, 44.0]);
}

#[test]
fn test_sorted_orders_every_dimension() {
    let archive = ScriptedArchive::new().serve_generated(&["t2m"]);
    let mut source = source_at_12z(gfs_t2m().sorted(true), &[0, 3], &archive);

    let grid = source.open().unwrap().into_grid();
    for name in grid.dim_coord_names() {
        assert!(
            grid.coord(&name).unwrap().values.is_monotonic_increasing(),
            "{name} not sorted"
        );
    }

    // Southern row now comes first
    let t2m = grid.variable("t2m").unwrap();
    assert_eq!(t2m.data[&[0, 0, 0][..]], expected_value(0, 0, 0, 3));
    assert_eq!(t2m.data[&[1, 1, 2][..]], expected_value(0, 0, 1, 2));
}

#[test]
fn test_metadata_lands_in_attributes() {
    let archive = ScriptedArchive::new().serve_generated(&["t2m"]);
    let options = gfs_t2m().with_metadata("units", "K").with_metadata("level", 2);
    let mut source = source_at_12z(options, &[0], &archive);

    let dataset = source.open().unwrap();
    assert_eq!(dataset.metadata()["units"], "K");
    assert_eq!(dataset.grid().attrs()["units"], "K");
    assert_eq!(dataset.grid().attrs()["level"], 2);
}

#[test]
fn test_schema_describes_dataset() {
    let archive = ScriptedArchive::new().serve_generated(&["t2m"]);
    let mut source = source_at_12z(gfs_t2m(), &[0, 6], &archive);

    let schema = source.schema().unwrap();
    assert!(schema.dims.contains(&("time".to_string(), 2)));
    assert_eq!(schema.data_vars, vec!["t2m"]);
    assert!(schema.coords.contains(&"time".to_string()));
    assert!(schema.to_string().starts_with("Dimensions: ("));
}
