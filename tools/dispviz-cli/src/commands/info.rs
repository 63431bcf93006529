//! Show sample table information.

use std::path::PathBuf;

use dispviz_common::clock::FrameClock;
use dispviz_common::config::AppConfig;
use dispviz_sensor_model::{AxisBounds, ChannelSelection, SampleTable};

use crate::DEFAULT_INPUT;

pub fn run(input: Option<PathBuf>, json: bool, config: &AppConfig) -> anyhow::Result<()> {
    let path = input.unwrap_or_else(|| PathBuf::from(DEFAULT_INPUT));
    let table = SampleTable::from_path(&path)
        .map_err(|e| anyhow::anyhow!("Failed to load sample table: {e}"))?;

    let selection = ChannelSelection::default();
    let bounds = AxisBounds::for_selection(&table, &selection);
    let clock = FrameClock::new(config.render.interval_ms, config.render.fps);
    let frames = config.render.frames;

    if json {
        let report = serde_json::json!({
            "path": path,
            "rows": table.rows(),
            "columns": table.names(),
            "time_column": table.time_column(),
            "sample_rate_hz": table.sample_rate_hz(),
            "bounds": bounds.as_ref().ok(),
            "bounds_error": bounds.as_ref().err().map(ToString::to_string),
            "video_secs": clock.duration_secs(frames),
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Sample table: {}", path.display());
    println!("  Rows: {}", table.rows());
    match table.sample_rate_hz() {
        Some(rate) => println!("  Sample rate: {rate:.1} Hz"),
        None => println!("  Sample rate: unknown (no time column)"),
    }
    println!();

    println!("Columns ({}):", table.names().len());
    for name in table.names() {
        let marker = if selection.channel_names().contains(&name.as_str()) {
            " *"
        } else {
            ""
        };
        println!("  {name}{marker}");
    }
    println!();

    println!("Default selection:");
    for assignment in selection.assignments() {
        println!(
            "  ({}, {}) {} [{:?}]",
            assignment.target_area.row,
            assignment.target_area.col,
            assignment.channel_name,
            assignment.mode
        );
    }
    match &bounds {
        Ok(b) => println!("  Y range: {} .. {}", b.min, b.max),
        Err(e) => println!("  Y range: unavailable ({e})"),
    }
    println!();

    println!("Render defaults:");
    println!(
        "  {frames} frames @ {}fps ({:.2}s of video)",
        clock.fps(),
        clock.duration_secs(frames)
    );
    if frames > table.rows() {
        println!(
            "  [WARN] only {} rows; a fixed {frames}-frame render will fail at frame {}",
            table.rows(),
            table.rows()
        );
    }

    Ok(())
}
