use std::path::PathBuf;

use dispviz_sensor_model::{AxisBounds, ChannelSelection, SampleTable};

fn fixture_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
        .join("fixtures")
        .join("gauges-sample.csv")
}

#[test]
fn fixture_loads_with_every_gauge() {
    let table = SampleTable::from_path(fixture_path()).expect("fixture should load");
    assert_eq!(table.rows(), 120);
    assert_eq!(table.names().len(), 14);
    assert_eq!(table.time_column(), Some("Time"));
    for name in ChannelSelection::default().channel_names() {
        assert!(table.has_column(name), "missing {name}");
    }
}

#[test]
fn fixture_sample_rate_is_fifty_hz() {
    let table = SampleTable::from_path(fixture_path()).unwrap();
    assert_eq!(table.sample_rate_hz(), Some(50.0));
}

#[test]
fn fixture_bounds_cover_selected_channels() {
    let table = SampleTable::from_path(fixture_path()).unwrap();
    let selection = ChannelSelection::default();
    let bounds = AxisBounds::for_selection(&table, &selection).unwrap();
    for column in selection.resolve(&table).unwrap() {
        assert!(column.iter().all(|v| bounds.contains(*v)));
    }
    assert!(bounds.span() > 0.0);
}

#[test]
fn fixture_baseline_starts_every_gauge_at_zero() {
    let table = SampleTable::from_path(fixture_path())
        .unwrap()
        .normalized_to_baseline();
    for name in ChannelSelection::default().channel_names() {
        assert_eq!(table.column(name).unwrap()[0], 0.0);
    }
    assert_eq!(table.column("Time").unwrap()[1], 0.02);
}
