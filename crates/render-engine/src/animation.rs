//! Frame-by-frame marker animation.
//!
//! [`Animation`] is a lazy, finite, non-restartable sequence of frame
//! updates. The encoder pulls frames one at a time; each frame moves
//! every animated marker to that frame's sample.

use std::iter::FusedIterator;

use serde::{Deserialize, Serialize};

use dispviz_common::clock::FrameClock;
use dispviz_common::error::{DispvizError, DispvizResult};
use dispviz_sensor_model::{ChannelSelection, GridCell, SampleTable};

/// How many frames an animation produces relative to the data length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameCount {
    /// Exactly `n` frames. A table with fewer rows fails at the first
    /// missing frame.
    Fixed(usize),
    /// At most `n` frames, stopping early when the data runs out.
    Truncate(usize),
    /// One frame per row.
    All,
}

impl FrameCount {
    /// Number of frames to produce for a table with `rows` rows.
    pub fn resolve(self, rows: usize) -> usize {
        match self {
            FrameCount::Fixed(n) => n,
            FrameCount::Truncate(n) => n.min(rows),
            FrameCount::All => rows,
        }
    }

    /// Build a policy from its CLI name and a frame budget.
    pub fn from_policy(policy: &str, frames: usize) -> DispvizResult<Self> {
        match policy {
            "fixed" => Ok(FrameCount::Fixed(frames)),
            "truncate" => Ok(FrameCount::Truncate(frames)),
            "all" => Ok(FrameCount::All),
            other => Err(DispvizError::config(format!(
                "Unknown frame policy: {other}. Use: fixed, truncate, all"
            ))),
        }
    }
}

impl Default for FrameCount {
    fn default() -> Self {
        FrameCount::Fixed(50)
    }
}

/// New position of one marker.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarkerUpdate {
    pub area: GridCell,
    pub position: (f64, f64),
}

/// Everything that changed in one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameUpdate {
    /// Zero-based frame index.
    pub index: usize,
    /// Simulated animation time of this frame.
    pub time_ms: u64,
    /// Markers that moved, one per animated channel.
    pub changed: Vec<MarkerUpdate>,
}

#[derive(Debug, Clone, Copy)]
struct Track<'t> {
    area: GridCell,
    samples: &'t [f64],
}

/// Frame sequence over the animated channels of a selection.
#[derive(Debug, Clone)]
pub struct Animation<'t> {
    tracks: Vec<Track<'t>>,
    clock: FrameClock,
    total: usize,
    next: usize,
    failed: bool,
}

impl<'t> Animation<'t> {
    pub fn new(
        table: &'t SampleTable,
        selection: &ChannelSelection,
        count: FrameCount,
        clock: FrameClock,
    ) -> DispvizResult<Self> {
        let tracks = selection
            .animated()
            .map(|a| {
                Ok(Track {
                    area: a.target_area,
                    samples: table.column(&a.channel_name)?,
                })
            })
            .collect::<DispvizResult<Vec<_>>>()?;

        let total = count.resolve(table.rows());
        if total > table.rows() {
            tracing::warn!(
                frames = total,
                rows = table.rows(),
                "Frame count exceeds the sample table; rendering will fail at frame {}",
                table.rows()
            );
        }

        Ok(Self {
            tracks,
            clock,
            total,
            next: 0,
            failed: false,
        })
    }

    /// Number of frames this animation produces when nothing fails.
    pub fn total_frames(&self) -> usize {
        self.total
    }

    /// Marker positions for frame `index`.
    ///
    /// Depends only on the table, the selection, and `index`.
    pub fn frame(&self, index: usize) -> DispvizResult<FrameUpdate> {
        let changed = self
            .tracks
            .iter()
            .map(|track| {
                let y = *track
                    .samples
                    .get(index)
                    .ok_or(DispvizError::FrameOutOfRange {
                        frame: index,
                        len: track.samples.len(),
                    })?;
                Ok(MarkerUpdate {
                    area: track.area,
                    position: (0.0, y),
                })
            })
            .collect::<DispvizResult<Vec<_>>>()?;

        Ok(FrameUpdate {
            index,
            time_ms: self.clock.pacing_ms(index),
            changed,
        })
    }
}

impl Iterator for Animation<'_> {
    type Item = DispvizResult<FrameUpdate>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.next >= self.total {
            return None;
        }

        let index = self.next;
        self.next += 1;
        let frame = self.frame(index);
        match &frame {
            Ok(update) => tracing::trace!(
                frame = index,
                time_ms = update.time_ms,
                presentation_secs = self.clock.presentation_secs(index),
                "Frame updated"
            ),
            Err(_) => self.failed = true,
        }
        Some(frame)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.failed {
            return (0, Some(0));
        }
        let remaining = self.total - self.next;
        (0, Some(remaining))
    }
}

impl FusedIterator for Animation<'_> {}
