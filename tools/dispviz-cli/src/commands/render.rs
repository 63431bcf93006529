//! Render a sample table to video.

use std::path::PathBuf;

use clap::Args;

use dispviz_common::config::AppConfig;
use dispviz_render_engine::{
    render_animation, FfmpegBackend, FrameCount, ProgressCallback, RawVideoBackend,
    RenderBackend, RenderJob, RenderProgress,
};

use crate::{DEFAULT_INPUT, DEFAULT_OUTPUT};

#[derive(Args, Debug, Default)]
pub struct RenderArgs {
    /// Path to the CSV file [default: input/gauges.csv]
    pub input: Option<PathBuf>,

    /// Output video path [default: output/sim.mp4]
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Number of frames (from config, 50 unless set)
    #[arg(long)]
    pub frames: Option<usize>,

    /// How the frame count meets the data length: fixed|truncate|all
    #[arg(long)]
    pub frame_policy: Option<String>,

    /// Output frame rate
    #[arg(long)]
    pub fps: Option<u32>,

    /// Simulated time between frames (ms)
    #[arg(long)]
    pub interval_ms: Option<u64>,

    /// Pixel density of the figure
    #[arg(long)]
    pub dpi: Option<u32>,

    /// Figure title
    #[arg(long)]
    pub title: Option<String>,

    /// Animate all four channels instead of the top row only
    #[arg(long)]
    pub animate_all: bool,

    /// Plot each channel relative to its first sample
    #[arg(long)]
    pub zero_baseline: bool,

    /// Write raw RGB24 frames instead of running ffmpeg
    #[arg(long)]
    pub raw: bool,

    /// Print the render summary as JSON
    #[arg(long)]
    pub json: bool,
}

impl RenderArgs {
    fn into_job(self, config: &AppConfig) -> anyhow::Result<RenderJob> {
        let defaults = &config.render;
        let input = self.input.unwrap_or_else(|| PathBuf::from(DEFAULT_INPUT));
        let output = self.output.unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT));

        let mut job = RenderJob::new(input, output, defaults);
        job.frames = FrameCount::from_policy(
            self.frame_policy.as_deref().unwrap_or("fixed"),
            self.frames.unwrap_or(defaults.frames),
        )?;
        if let Some(fps) = self.fps {
            job.fps = fps;
        }
        if let Some(interval_ms) = self.interval_ms {
            job.interval_ms = interval_ms;
        }
        if let Some(dpi) = self.dpi {
            if dpi == 0 {
                anyhow::bail!("--dpi must be positive");
            }
            job.figure.dpi = dpi;
        }
        if let Some(title) = self.title {
            job.title = title;
        }
        if self.animate_all {
            job.selection = job.selection.all_animated();
        }
        job.zero_baseline = self.zero_baseline;
        Ok(job)
    }
}

pub fn run(args: RenderArgs, config: &AppConfig) -> anyhow::Result<()> {
    let raw = args.raw;
    let json = args.json;
    let job = args.into_job(config)?;

    let mut backend: Box<dyn RenderBackend> = if raw {
        Box::new(RawVideoBackend)
    } else {
        Box::new(FfmpegBackend::new())
    };

    eprintln!("Rendering: {}", job.input_path.display());
    eprintln!("  Output: {}", job.output_path.display());
    eprintln!("  Frames: {:?} @ {}fps", job.frames, job.fps);
    eprintln!("  Backend: {}", backend.name());

    let progress_cb: ProgressCallback = Box::new(|p: RenderProgress| {
        eprint!(
            "\r  Progress: {:.1}% ({}/{} frames, ETA: {:.0}s)  ",
            p.progress * 100.0,
            p.frames_rendered,
            p.total_frames,
            p.eta_secs,
        );
    });

    let result = render_animation(&job, backend.as_mut(), Some(progress_cb));
    eprintln!();
    let summary = result?;

    eprintln!("Render complete: {}", summary.output.display());
    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("{}", summary.elapsed_secs);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use dispviz_sensor_model::MarkerMode;

    #[test]
    fn test_defaults_render_input_gauges_to_sim_mp4() {
        let job = RenderArgs::default()
            .into_job(&AppConfig::default())
            .unwrap();
        assert_eq!(job.input_path, PathBuf::from("input/gauges.csv"));
        assert_eq!(job.output_path, PathBuf::from("output/sim.mp4"));
        assert_eq!(job.frames, FrameCount::Fixed(50));
        assert_eq!(job.fps, 30);
    }

    #[test]
    fn test_flags_override_config() {
        let args = RenderArgs {
            frames: Some(20),
            frame_policy: Some("truncate".into()),
            fps: Some(12),
            dpi: Some(100),
            animate_all: true,
            ..Default::default()
        };
        let job = args.into_job(&AppConfig::default()).unwrap();
        assert_eq!(job.frames, FrameCount::Truncate(20));
        assert_eq!(job.fps, 12);
        assert_eq!(job.figure.pixels(), (640, 480));
        assert!(job
            .selection
            .assignments()
            .iter()
            .all(|a| a.mode == MarkerMode::Animated));
    }

    #[test]
    fn test_unknown_policy_is_rejected() {
        let args = RenderArgs {
            frame_policy: Some("loop".into()),
            ..Default::default()
        };
        assert!(args.into_job(&AppConfig::default()).is_err());
    }
}
