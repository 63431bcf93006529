use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use dispviz_common::clock::FrameClock;
use dispviz_common::config::RenderDefaults;
use dispviz_common::error::DispvizError;
use dispviz_render_engine::{
    render_animation, Animation, FfmpegBackend, FigureSize, FrameCount, ProgressCallback,
    RawVideoBackend, RenderBackend, RenderJob, RenderProgress, RenderStage, Scene,
};
use dispviz_sensor_model::{AxisBounds, ChannelSelection, GridCell, SampleTable};

const CHANNELS: [&str; 4] = [
    "Displacement 6",
    "Displacement 9",
    "Displacement 10",
    "Displacement 13",
];

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("dispviz-it-{name}-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

/// Writes a gauge CSV whose four channels all read `0, 1, ..., rows - 1`.
fn write_ramp_csv(dir: &Path, rows: usize) -> PathBuf {
    let mut csv = format!("Time,{}\n", CHANNELS.join(","));
    for i in 0..rows {
        let t = i as f64 * 0.02;
        let v = i as f64;
        csv.push_str(&format!("{t},{v},{v},{v},{v}\n"));
    }
    let path = dir.join("gauges.csv");
    std::fs::write(&path, csv).unwrap();
    path
}

fn small_job(input: &Path, output: &Path) -> RenderJob {
    let mut job = RenderJob::new(input, output, &RenderDefaults::default());
    job.figure = FigureSize {
        width_in: 3.2,
        height_in: 2.4,
        dpi: 50,
    };
    job
}

#[test]
fn test_raw_render_is_reproducible() {
    let dir = scratch_dir("repro");
    let input = write_ramp_csv(&dir, 50);

    let first = dir.join("first.rgb");
    let second = dir.join("second.rgb");
    let summary =
        render_animation(&small_job(&input, &first), &mut RawVideoBackend, None).unwrap();
    render_animation(&small_job(&input, &second), &mut RawVideoBackend, None).unwrap();

    assert_eq!(summary.frames, 50);
    assert_eq!(summary.bounds, AxisBounds { min: 0.0, max: 49.0 });
    assert_eq!(summary.backend, "raw");

    let a = std::fs::read(&first).unwrap();
    let b = std::fs::read(&second).unwrap();
    assert_eq!(a.len(), 50 * 160 * 120 * 3);
    assert!(a == b, "identical input must produce identical bytes");

    let frame_len = 160 * 120 * 3;
    assert_ne!(&a[..frame_len], &a[25 * frame_len..26 * frame_len]);
}

#[test]
fn test_short_table_fails_at_frame_ten() {
    let dir = scratch_dir("short");
    let input = write_ramp_csv(&dir, 10);
    let output = dir.join("short.rgb");

    let err =
        render_animation(&small_job(&input, &output), &mut RawVideoBackend, None).unwrap_err();
    assert!(matches!(
        err,
        DispvizError::FrameOutOfRange { frame: 10, len: 10 }
    ));
    assert!(err.is_out_of_range());

    // Frames written before the failure are left in place.
    let partial = std::fs::read(&output).unwrap();
    assert_eq!(partial.len(), 10 * 160 * 120 * 3);
}

#[test]
fn test_truncate_policy_renders_available_rows() {
    let dir = scratch_dir("truncate");
    let input = write_ramp_csv(&dir, 10);
    let output = dir.join("truncate.rgb");

    let mut job = small_job(&input, &output);
    job.frames = FrameCount::Truncate(50);
    let summary = render_animation(&job, &mut RawVideoBackend, None).unwrap();
    assert_eq!(summary.frames, 10);
}

#[test]
fn test_missing_ffmpeg_is_encoding_error() {
    let dir = scratch_dir("noffmpeg");
    let input = write_ramp_csv(&dir, 50);
    let output = dir.join("sim.mp4");

    let mut backend = FfmpegBackend::with_binary("/nonexistent/dispviz-ffmpeg");
    let err = render_animation(&small_job(&input, &output), &mut backend, None).unwrap_err();
    assert!(matches!(err, DispvizError::Encoding { .. }));
    assert!(!output.exists());
}

#[test]
fn test_output_without_extension_is_unsupported() {
    let dir = scratch_dir("noext");
    let input = write_ramp_csv(&dir, 50);

    // Any resolvable binary passes the availability check.
    let mut backend = FfmpegBackend::with_binary("sh");
    let job = small_job(&input, &dir.join("sim"));
    let err = render_animation(&job, &mut backend, None).unwrap_err();
    assert!(matches!(err, DispvizError::Unsupported { .. }));
}

#[test]
fn test_missing_input_is_file_not_found() {
    let dir = scratch_dir("noinput");
    let job = small_job(&dir.join("absent.csv"), &dir.join("out.rgb"));
    let err = render_animation(&job, &mut RawVideoBackend, None).unwrap_err();
    assert!(matches!(err, DispvizError::FileNotFound { .. }));
}

#[test]
fn test_missing_input_is_reported_before_missing_ffmpeg() {
    let dir = scratch_dir("noinput-noffmpeg");
    let job = small_job(&dir.join("absent.csv"), &dir.join("sim.mp4"));
    let mut backend = FfmpegBackend::with_binary("/nonexistent/dispviz-ffmpeg");
    let err = render_animation(&job, &mut backend, None).unwrap_err();
    assert!(matches!(err, DispvizError::FileNotFound { .. }));
}

/// Writes an executable shell script standing in for ffmpeg.
#[cfg(unix)]
fn fake_encoder(dir: &Path, body: &str) -> FfmpegBackend {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join("fake-ffmpeg");
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    FfmpegBackend::with_binary(path.to_string_lossy())
}

#[cfg(unix)]
#[test]
fn test_frame_error_stops_encoder() {
    let dir = scratch_dir("encoder-frame");
    let input = write_ramp_csv(&dir, 10);
    let mut backend = fake_encoder(&dir, "cat >/dev/null");

    let err = render_animation(&small_job(&input, &dir.join("sim.mp4")), &mut backend, None)
        .unwrap_err();
    assert!(matches!(
        err,
        DispvizError::FrameOutOfRange { frame: 10, len: 10 }
    ));
}

#[cfg(unix)]
#[test]
fn test_encoder_exit_is_encoding_error() {
    let dir = scratch_dir("encoder-exit");
    let input = write_ramp_csv(&dir, 50);
    let mut backend = fake_encoder(&dir, "exit 1");

    let seen: Arc<Mutex<Vec<RenderStage>>> = Arc::default();
    let sink = Arc::clone(&seen);
    let callback: ProgressCallback = Box::new(move |p: RenderProgress| {
        sink.lock().unwrap().push(p.stage);
    });

    let job = small_job(&input, &dir.join("sim.mp4"));
    let err = render_animation(&job, &mut backend, Some(callback)).unwrap_err();
    assert!(matches!(err, DispvizError::Encoding { .. }));
    assert_eq!(seen.lock().unwrap().last(), Some(&RenderStage::Failed));
}

#[test]
fn test_progress_reports_every_frame() {
    let dir = scratch_dir("progress");
    let input = write_ramp_csv(&dir, 50);
    let output = dir.join("progress.rgb");

    let seen: Arc<Mutex<Vec<RenderProgress>>> = Arc::default();
    let sink = Arc::clone(&seen);
    let callback: ProgressCallback =
        Box::new(move |p: RenderProgress| sink.lock().unwrap().push(p));

    render_animation(&small_job(&input, &output), &mut RawVideoBackend, Some(callback)).unwrap();

    let seen = seen.lock().unwrap();
    assert_eq!(seen.first().map(|p| p.stage), Some(RenderStage::Preparing));
    assert_eq!(seen.last().map(|p| p.stage), Some(RenderStage::Complete));
    let rendering: Vec<u64> = seen
        .iter()
        .filter(|p| p.stage == RenderStage::Rendering)
        .map(|p| p.frames_rendered)
        .collect();
    assert_eq!(rendering, (1..=50).collect::<Vec<u64>>());
    assert!(seen
        .iter()
        .all(|p| p.total_frames == 50 || p.stage == RenderStage::Preparing));
}

#[test]
fn test_frame_twenty_five_moves_tracked_markers() {
    let dir = scratch_dir("frame25");
    let input = write_ramp_csv(&dir, 50);
    let table = SampleTable::from_path(&input).unwrap();
    let selection = ChannelSelection::default();

    let bounds = AxisBounds::for_selection(&table, &selection).unwrap();
    assert_eq!(bounds, AxisBounds { min: 0.0, max: 49.0 });

    let mut scene =
        Scene::build(&table, &selection, bounds, FigureSize::default(), "Sensor Displacement")
            .unwrap();
    let animation =
        Animation::new(&table, &selection, FrameCount::default(), FrameClock::new(20, 30)).unwrap();
    scene.apply(&animation.frame(25).unwrap()).unwrap();

    for cell in [GridCell::new(0, 0), GridCell::new(0, 1)] {
        assert_eq!(scene.panel(cell).unwrap().marker.position, (0.0, 25.0));
    }
    for cell in [GridCell::new(1, 0), GridCell::new(1, 1)] {
        assert_eq!(scene.panel(cell).unwrap().marker.position, (0.0, 0.0));
    }
}

#[test]
fn test_ffmpeg_writes_video_when_installed() {
    let mut backend = FfmpegBackend::new();
    if !backend.is_available() {
        eprintln!("ffmpeg not found; skipping");
        return;
    }

    let dir = scratch_dir("ffmpeg");
    let input = write_ramp_csv(&dir, 50);
    let output = dir.join("nested").join("sim.avi");

    let summary = render_animation(&small_job(&input, &output), &mut backend, None).unwrap();
    assert_eq!(summary.frames, 50);
    assert!(std::fs::metadata(&output).unwrap().len() > 0);
}
