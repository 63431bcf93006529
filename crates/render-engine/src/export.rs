//! Render jobs, encoder backends, and the frame pipeline driver.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

use serde::Serialize;

use dispviz_common::clock::{FrameClock, RunClock};
use dispviz_common::config::RenderDefaults;
use dispviz_common::error::{DispvizError, DispvizResult};
use dispviz_sensor_model::{AxisBounds, ChannelSelection, SampleTable};

use crate::animation::{Animation, FrameCount};
use crate::compositor::Compositor;
use crate::layout::{FigureSize, Scene};

/// Environment variable naming the ffmpeg binary to run.
pub const FFMPEG_ENV: &str = "DISPVIZ_FFMPEG";

/// A render job ready to be executed.
#[derive(Debug, Clone)]
pub struct RenderJob {
    /// Sample table to read.
    pub input_path: PathBuf,

    /// Video file to write.
    pub output_path: PathBuf,

    /// Channels and their plot areas.
    pub selection: ChannelSelection,

    /// Frame count policy.
    pub frames: FrameCount,

    /// Output frame rate.
    pub fps: u32,

    /// Simulated pacing between frames (ms).
    pub interval_ms: u64,

    pub figure: FigureSize,

    pub title: String,

    /// Subtract each channel's first sample before plotting.
    pub zero_baseline: bool,
}

impl RenderJob {
    pub fn new(
        input_path: impl Into<PathBuf>,
        output_path: impl Into<PathBuf>,
        defaults: &RenderDefaults,
    ) -> Self {
        Self {
            input_path: input_path.into(),
            output_path: output_path.into(),
            selection: ChannelSelection::default(),
            frames: FrameCount::Fixed(defaults.frames),
            fps: defaults.fps,
            interval_ms: defaults.interval_ms,
            figure: FigureSize::from_defaults(defaults),
            title: defaults.title.clone(),
            zero_baseline: false,
        }
    }
}

/// Progress callback for rendering.
pub type ProgressCallback = Box<dyn Fn(RenderProgress) + Send>;

/// Render progress report.
#[derive(Debug, Clone)]
pub struct RenderProgress {
    /// Current progress [0.0, 1.0].
    pub progress: f64,

    /// Frames handed to the encoder so far.
    pub frames_rendered: u64,

    /// Total frames to render.
    pub total_frames: u64,

    /// Estimated time remaining in seconds.
    pub eta_secs: f64,

    pub stage: RenderStage,
}

/// Stages of a render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderStage {
    Preparing,
    Rendering,
    Finalizing,
    Complete,
    Failed,
}

/// What the encoder needs to know about the frames it receives.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoSpec {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub total_frames: usize,
    pub title: String,
}

impl VideoSpec {
    /// Bytes per RGB24 frame.
    pub fn frame_len(&self) -> usize {
        self.width as usize * self.height as usize * 3
    }
}

/// Pull-based source of rendered frames.
///
/// Each call to [`FrameStream::next_frame`] advances the animation by one
/// frame, applies it to the scene, and rasterizes it into a buffer that
/// is reused for the next frame.
pub struct FrameStream<'a> {
    animation: Animation<'a>,
    scene: Scene,
    compositor: &'a Compositor,
    buffer: Vec<u8>,
    progress: Option<&'a ProgressCallback>,
    rendered: usize,
    draw_time: Duration,
    started: Instant,
}

impl<'a> FrameStream<'a> {
    pub fn new(
        animation: Animation<'a>,
        scene: Scene,
        compositor: &'a Compositor,
        progress: Option<&'a ProgressCallback>,
    ) -> Self {
        Self {
            animation,
            scene,
            compositor,
            buffer: compositor.blank_frame(),
            progress,
            rendered: 0,
            draw_time: Duration::ZERO,
            started: Instant::now(),
        }
    }

    /// Render the next frame. Returns `None` when the animation is done
    /// or after the first error.
    pub fn next_frame(&mut self) -> Option<DispvizResult<&[u8]>> {
        let update = match self.animation.next()? {
            Ok(update) => update,
            Err(err) => return Some(Err(err)),
        };

        let drawing = Instant::now();
        let drawn = self
            .scene
            .apply(&update)
            .and_then(|()| self.compositor.render(&self.scene, &mut self.buffer));
        if let Err(err) = drawn {
            return Some(Err(err));
        }
        self.draw_time += drawing.elapsed();
        self.rendered += 1;

        if let Some(cb) = self.progress {
            cb(self.report());
        }
        Some(Ok(self.buffer.as_slice()))
    }

    pub fn total_frames(&self) -> usize {
        self.animation.total_frames()
    }

    /// Frames rendered so far.
    pub fn rendered(&self) -> usize {
        self.rendered
    }

    /// Time spent applying updates and rasterizing.
    pub fn draw_time(&self) -> Duration {
        self.draw_time
    }

    fn report(&self) -> RenderProgress {
        let total = self.total_frames().max(1);
        let progress = (self.rendered as f64 / total as f64).clamp(0.0, 1.0);
        let elapsed = self.started.elapsed().as_secs_f64();
        let eta_secs = if progress > 0.0 {
            (elapsed / progress - elapsed).max(0.0)
        } else {
            0.0
        };
        RenderProgress {
            progress,
            frames_rendered: self.rendered as u64,
            total_frames: self.total_frames() as u64,
            eta_secs,
            stage: RenderStage::Rendering,
        }
    }
}

/// Trait for encoder backends.
pub trait RenderBackend: Send {
    /// Drain `frames` into a video at `output`.
    fn encode(
        &mut self,
        output: &Path,
        spec: &VideoSpec,
        frames: &mut FrameStream<'_>,
    ) -> DispvizResult<()>;

    /// Check if this backend is available on the system.
    fn is_available(&self) -> bool;

    /// Backend name.
    fn name(&self) -> &str;
}

/// Container picked from the output file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoFormat {
    Mp4,
    Webm,
    Gif,
    Avi,
    /// Unknown extension; ffmpeg picks its default encoder.
    Other,
}

impl VideoFormat {
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("mp4") => VideoFormat::Mp4,
            Some("webm") => VideoFormat::Webm,
            Some("gif") => VideoFormat::Gif,
            Some("avi") => VideoFormat::Avi,
            _ => VideoFormat::Other,
        }
    }

    fn codec_args(self) -> Vec<String> {
        let args: &[&str] = match self {
            VideoFormat::Mp4 => &[
                "-c:v",
                "libx264",
                "-preset",
                "medium",
                "-pix_fmt",
                "yuv420p",
                "-movflags",
                "+faststart",
            ],
            VideoFormat::Webm => &[
                "-c:v",
                "libvpx-vp9",
                "-b:v",
                "0",
                "-crf",
                "32",
                "-pix_fmt",
                "yuv420p",
            ],
            VideoFormat::Gif => &[
                "-vf",
                "split[s0][s1];[s0]palettegen[p];[s1][p]paletteuse",
            ],
            VideoFormat::Avi => &["-c:v", "mpeg4", "-q:v", "3"],
            VideoFormat::Other => &[],
        };
        args.iter().map(|a| a.to_string()).collect()
    }
}

/// Encodes through an `ffmpeg` child process fed raw frames on stdin.
#[derive(Debug, Clone)]
pub struct FfmpegBackend {
    binary: String,
}

enum PipeFailure {
    Frame(DispvizError),
    Write(std::io::Error),
}

impl FfmpegBackend {
    /// Uses `$DISPVIZ_FFMPEG`, or `ffmpeg` from `PATH`.
    pub fn new() -> Self {
        Self::with_binary(std::env::var(FFMPEG_ENV).unwrap_or_else(|_| "ffmpeg".into()))
    }

    pub fn with_binary(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    pub fn binary(&self) -> &str {
        &self.binary
    }

    fn pipe_frames(
        stdin: &mut impl Write,
        frames: &mut FrameStream<'_>,
    ) -> Result<(), PipeFailure> {
        while let Some(frame) = frames.next_frame() {
            let frame = frame.map_err(PipeFailure::Frame)?;
            stdin.write_all(frame).map_err(PipeFailure::Write)?;
        }
        stdin.flush().map_err(PipeFailure::Write)
    }

    fn wait_with_stderr(
        &self,
        mut child: Child,
        stderr_task: std::thread::JoinHandle<String>,
    ) -> DispvizResult<()> {
        let status = child
            .wait()
            .map_err(|e| DispvizError::encoding(format!("Failed to wait on ffmpeg: {e}")))?;
        let stderr_output = stderr_task
            .join()
            .unwrap_or_else(|_| "<failed to join stderr reader>".to_string());

        if !status.success() {
            return Err(DispvizError::encoding(format!(
                "ffmpeg encoding failed (status {}): {}",
                status,
                stderr_output.trim()
            )));
        }
        Ok(())
    }
}

impl Default for FfmpegBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderBackend for FfmpegBackend {
    fn encode(
        &mut self,
        output: &Path,
        spec: &VideoSpec,
        frames: &mut FrameStream<'_>,
    ) -> DispvizResult<()> {
        if output.extension().is_none() {
            return Err(DispvizError::unsupported(format!(
                "{} has no file extension; cannot pick a container",
                output.display()
            )));
        }

        let args = ffmpeg_args(output, spec);
        tracing::debug!(binary = %self.binary, args = ?args, "Running ffmpeg");

        let mut child = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                DispvizError::encoding(format!("Failed to start {}: {e}", self.binary))
            })?;

        tracing::info!(
            pid = child.id(),
            width = spec.width,
            height = spec.height,
            fps = spec.fps,
            total_frames = spec.total_frames,
            "ffmpeg process started"
        );

        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| DispvizError::encoding("Failed to capture ffmpeg stderr"))?;

        // Drain stderr concurrently so ffmpeg never blocks on a full pipe.
        let stderr_task = std::thread::spawn(move || -> String {
            let mut reader = BufReader::new(stderr);
            let mut output = String::new();
            match reader.read_to_string(&mut output) {
                Ok(_) => output,
                Err(err) => format!("<failed to read ffmpeg stderr: {err}>"),
            }
        });

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| DispvizError::encoding("Failed to open ffmpeg stdin"))?;
        let piped = Self::pipe_frames(&mut stdin, frames);
        drop(stdin);

        match piped {
            Ok(()) => self.wait_with_stderr(child, stderr_task),
            Err(PipeFailure::Frame(err)) => {
                tracing::warn!(
                    error = %err,
                    rendered = frames.rendered(),
                    "Frame failed, stopping ffmpeg"
                );
                if let Err(kill_err) = child.kill() {
                    tracing::debug!(error = %kill_err, "ffmpeg already exited");
                }
                let _ = child.wait();
                let _ = stderr_task.join();
                Err(err)
            }
            Err(PipeFailure::Write(write_err)) => {
                // ffmpeg closed its input; its exit status explains why.
                self.wait_with_stderr(child, stderr_task)?;
                Err(DispvizError::encoding(format!(
                    "Failed to write frame {} to ffmpeg: {write_err}",
                    frames.rendered()
                )))
            }
        }
    }

    fn is_available(&self) -> bool {
        command_exists(&self.binary)
    }

    fn name(&self) -> &str {
        "ffmpeg"
    }
}

/// Writes concatenated RGB24 frames with no container.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawVideoBackend;

impl RenderBackend for RawVideoBackend {
    fn encode(
        &mut self,
        output: &Path,
        _spec: &VideoSpec,
        frames: &mut FrameStream<'_>,
    ) -> DispvizResult<()> {
        let write_err = |e: std::io::Error| {
            DispvizError::encoding(format!("Failed to write {}: {e}", output.display()))
        };

        let file = File::create(output).map_err(write_err)?;
        let mut writer = BufWriter::new(file);
        while let Some(frame) = frames.next_frame() {
            writer.write_all(frame?).map_err(write_err)?;
        }
        writer.flush().map_err(write_err)
    }

    fn is_available(&self) -> bool {
        true
    }

    fn name(&self) -> &str {
        "raw"
    }
}

/// Outcome of a finished render.
#[derive(Debug, Clone, Serialize)]
pub struct RenderSummary {
    pub frames: usize,
    pub bounds: AxisBounds,
    pub draw_ms: u64,
    pub encode_ms: u64,
    pub elapsed_secs: f64,
    pub output: PathBuf,
    pub backend: String,
    /// Wall-clock start of the run (RFC 3339).
    pub started_at: String,
}

fn notify(progress: &Option<ProgressCallback>, stage: RenderStage, done: usize, total: usize) {
    if let Some(cb) = progress {
        let fraction = match stage {
            RenderStage::Complete => 1.0,
            _ if total == 0 => 0.0,
            _ => done as f64 / total as f64,
        };
        cb(RenderProgress {
            progress: fraction,
            frames_rendered: done as u64,
            total_frames: total as u64,
            eta_secs: 0.0,
            stage,
        });
    }
}

/// Render the job's sample table to a video.
///
/// This is the main entry point for rendering.
pub fn render_animation(
    job: &RenderJob,
    backend: &mut dyn RenderBackend,
    progress: Option<ProgressCallback>,
) -> DispvizResult<RenderSummary> {
    let clock = RunClock::start();
    tracing::info!(
        input = %job.input_path.display(),
        output = %job.output_path.display(),
        backend = backend.name(),
        frames = ?job.frames,
        "Starting render"
    );
    notify(&progress, RenderStage::Preparing, 0, 0);

    let mut table = SampleTable::from_path(&job.input_path)?;
    if job.zero_baseline {
        table = table.normalized_to_baseline();
    }
    let bounds = AxisBounds::for_selection(&table, &job.selection)?;
    let scene = Scene::build(&table, &job.selection, bounds, job.figure, job.title.clone())?;
    let compositor = Compositor::new(&scene)?;

    let frame_clock = FrameClock::new(job.interval_ms, job.fps);
    let animation = Animation::new(&table, &job.selection, job.frames, frame_clock)?;
    let (width, height) = compositor.dimensions();
    let spec = VideoSpec {
        width,
        height,
        fps: frame_clock.fps(),
        total_frames: animation.total_frames(),
        title: job.title.clone(),
    };
    tracing::info!(
        width,
        height,
        total_frames = spec.total_frames,
        duration_secs = frame_clock.duration_secs(spec.total_frames),
        prepare_ms = clock.elapsed_ms(),
        "Scene prepared"
    );

    if !backend.is_available() {
        return Err(DispvizError::encoding(format!(
            "Render backend '{}' is not available (is ffmpeg installed?)",
            backend.name()
        )));
    }

    if let Some(parent) = job.output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| {
            DispvizError::encoding(format!("Cannot create {}: {e}", parent.display()))
        })?;
    }

    let mut stream = FrameStream::new(animation, scene, &compositor, progress.as_ref());
    let encode_started = Instant::now();
    if let Err(err) = backend.encode(&job.output_path, &spec, &mut stream) {
        tracing::error!(error = %err, rendered = stream.rendered(), "Render failed");
        notify(&progress, RenderStage::Failed, stream.rendered(), spec.total_frames);
        return Err(err);
    }
    notify(&progress, RenderStage::Finalizing, stream.rendered(), spec.total_frames);

    let encode_wall = encode_started.elapsed();
    let draw_time = stream.draw_time();
    let summary = RenderSummary {
        frames: stream.rendered(),
        bounds,
        draw_ms: draw_time.as_millis() as u64,
        encode_ms: encode_wall.saturating_sub(draw_time).as_millis() as u64,
        elapsed_secs: clock.elapsed_secs(),
        output: job.output_path.clone(),
        backend: backend.name().to_string(),
        started_at: clock.epoch_wall().to_string(),
    };
    notify(&progress, RenderStage::Complete, summary.frames, spec.total_frames);

    tracing::info!(
        frames = summary.frames,
        draw_ms = summary.draw_ms,
        encode_ms = summary.encode_ms,
        elapsed_secs = summary.elapsed_secs,
        "Render finished"
    );
    Ok(summary)
}

fn ffmpeg_args(output: &Path, spec: &VideoSpec) -> Vec<String> {
    let mut args: Vec<String> = [
        "-hide_banner",
        "-loglevel",
        "error",
        "-y",
        "-f",
        "rawvideo",
        "-pix_fmt",
        "rgb24",
        "-s",
    ]
    .iter()
    .map(|a| a.to_string())
    .collect();
    args.push(format!("{}x{}", spec.width, spec.height));
    args.push("-r".into());
    args.push(spec.fps.to_string());
    args.extend(["-i", "pipe:0", "-an"].map(String::from));
    args.extend(VideoFormat::from_path(output).codec_args());
    args.extend(
        [
            "-fflags",
            "+bitexact",
            "-flags:v",
            "+bitexact",
            "-map_metadata",
            "-1",
        ]
        .map(String::from),
    );
    args.push("-metadata".into());
    args.push(format!("title={}", spec.title));
    args.push(output.to_string_lossy().into_owned());
    args
}

/// Whether `binary` resolves to an executable.
pub fn command_exists(binary: &str) -> bool {
    Command::new("sh")
        .arg("-c")
        .arg(format!("command -v '{binary}' >/dev/null 2>&1"))
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec() -> VideoSpec {
        VideoSpec {
            width: 960,
            height: 720,
            fps: 30,
            total_frames: 50,
            title: "Sensor Displacement".into(),
        }
    }

    fn has_pair(args: &[String], flag: &str, value: &str) -> bool {
        args.windows(2).any(|w| w[0] == flag && w[1] == value)
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(VideoFormat::from_path(Path::new("out/sim.mp4")), VideoFormat::Mp4);
        assert_eq!(VideoFormat::from_path(Path::new("SIM.WEBM")), VideoFormat::Webm);
        assert_eq!(VideoFormat::from_path(Path::new("a.gif")), VideoFormat::Gif);
        assert_eq!(VideoFormat::from_path(Path::new("a.avi")), VideoFormat::Avi);
        assert_eq!(VideoFormat::from_path(Path::new("a.mkv")), VideoFormat::Other);
        assert_eq!(VideoFormat::from_path(Path::new("noext")), VideoFormat::Other);
    }

    #[test]
    fn test_ffmpeg_args_describe_raw_input() {
        let args = ffmpeg_args(Path::new("output/sim.mp4"), &spec());
        assert!(has_pair(&args, "-f", "rawvideo"));
        assert!(has_pair(&args, "-pix_fmt", "rgb24"));
        assert!(has_pair(&args, "-s", "960x720"));
        assert!(has_pair(&args, "-r", "30"));
        assert!(has_pair(&args, "-i", "pipe:0"));
        assert!(args.iter().any(|a| a == "-an"));
        assert_eq!(args.last().map(String::as_str), Some("output/sim.mp4"));
    }

    #[test]
    fn test_mp4_uses_h264_yuv420p() {
        let args = ffmpeg_args(Path::new("sim.mp4"), &spec());
        assert!(has_pair(&args, "-c:v", "libx264"));
        assert!(has_pair(&args, "-pix_fmt", "yuv420p"));
        assert!(has_pair(&args, "-fflags", "+bitexact"));
    }

    #[test]
    fn test_codec_per_container() {
        assert!(has_pair(&VideoFormat::Webm.codec_args(), "-c:v", "libvpx-vp9"));
        assert!(has_pair(&VideoFormat::Avi.codec_args(), "-c:v", "mpeg4"));
        assert!(VideoFormat::Gif.codec_args()[1].contains("palettegen"));
        assert!(VideoFormat::Other.codec_args().is_empty());
    }

    #[test]
    fn test_missing_binary_is_unavailable() {
        let backend = FfmpegBackend::with_binary("/nonexistent/dispviz-ffmpeg");
        assert!(!backend.is_available());
        assert!(RawVideoBackend.is_available());
    }

    #[test]
    fn test_job_uses_defaults() {
        let job = RenderJob::new("in.csv", "out.mp4", &RenderDefaults::default());
        assert_eq!(job.frames, FrameCount::Fixed(50));
        assert_eq!(job.fps, 30);
        assert_eq!(job.interval_ms, 20);
        assert_eq!(job.figure.pixels(), (960, 720));
        assert!(!job.zero_baseline);
    }

    #[test]
    fn test_video_spec_frame_len() {
        assert_eq!(spec().frame_len(), 960 * 720 * 3);
    }
}
