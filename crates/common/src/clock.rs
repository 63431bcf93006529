//! Clock and timing utilities for a render run.
//!
//! A run is anchored to a monotonic epoch captured when it starts. This
//! module provides:
//! - The run clock used for elapsed wall-clock reporting
//! - Frame timing: simulated animation pacing and presentation timestamps

use std::time::Instant;

/// A run clock that provides monotonic timings relative to
/// a fixed epoch (the moment the run started).
#[derive(Debug, Clone)]
pub struct RunClock {
    /// The instant the run started.
    epoch: Instant,

    /// Wall-clock time at epoch (RFC 3339 string).
    epoch_wall: String,
}

impl RunClock {
    /// Create a new run clock anchored to now.
    pub fn start() -> Self {
        Self {
            epoch: Instant::now(),
            epoch_wall: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Get milliseconds elapsed since the run started.
    pub fn elapsed_ms(&self) -> u128 {
        self.epoch.elapsed().as_millis()
    }

    /// Get seconds elapsed since the run started.
    pub fn elapsed_secs(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64()
    }

    /// Wall-clock time at run start.
    pub fn epoch_wall(&self) -> &str {
        &self.epoch_wall
    }
}

/// Timing of animation frames.
///
/// Two clocks describe the same frame index: the animation's pacing
/// interval (how far apart frames are in the simulated animation) and
/// the output frame rate (where a frame lands in the encoded video).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameClock {
    interval_ms: u64,
    fps: u32,
}

impl FrameClock {
    /// Create a clock with the given pacing interval and output rate.
    /// A zero fps is treated as 1.
    pub fn new(interval_ms: u64, fps: u32) -> Self {
        Self {
            interval_ms,
            fps: fps.max(1),
        }
    }

    /// Simulated animation time of a frame in milliseconds.
    pub fn pacing_ms(&self, frame: usize) -> u64 {
        frame as u64 * self.interval_ms
    }

    /// Presentation time of a frame in the output video, in seconds.
    pub fn presentation_secs(&self, frame: usize) -> f64 {
        frame as f64 / self.fps as f64
    }

    /// Total video duration for `frames` frames, in seconds.
    pub fn duration_secs(&self, frames: usize) -> f64 {
        self.presentation_secs(frames)
    }

    pub fn fps(&self) -> u32 {
        self.fps
    }
}
