//! Channel-to-plot-area assignment.
//!
//! The figure is a fixed 2×2 grid. Each cell shows one displacement
//! channel with one marker. A channel is either animated (its marker
//! follows the samples frame by frame) or static (its marker stays at the
//! frame-0 value for the whole run).

use serde::{Deserialize, Serialize};

use dispviz_common::error::{DispvizError, DispvizResult};

use crate::table::SampleTable;

/// Rows in the plot grid.
pub const GRID_ROWS: usize = 2;

/// Columns in the plot grid.
pub const GRID_COLS: usize = 2;

/// Number of plotted channels, one per grid cell.
pub const CHANNEL_COUNT: usize = GRID_ROWS * GRID_COLS;

/// Position of a plot area in the grid (zero-based).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridCell {
    pub row: usize,
    pub col: usize,
}

impl GridCell {
    pub const fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    /// Row-major index into the grid.
    pub fn index(self) -> usize {
        self.row * GRID_COLS + self.col
    }

    fn in_grid(self) -> bool {
        self.row < GRID_ROWS && self.col < GRID_COLS
    }
}

/// How a channel's marker behaves during the animation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerMode {
    /// Marker moves to the current frame's sample.
    Animated,
    /// Marker stays at the frame-0 sample.
    Static,
}

/// Visual style of a marker.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarkerStyle {
    /// RGB fill color.
    pub color: [u8; 3],
    /// Marker diameter in points (1/72 inch).
    pub size_pt: f64,
}

impl MarkerStyle {
    /// Filled red dot, used for live markers.
    pub const RED_DOT: Self = Self {
        color: [255, 0, 0],
        size_pt: 6.0,
    };

    /// Default series blue dot, used for static markers.
    pub const BLUE_DOT: Self = Self {
        color: [31, 119, 180],
        size_pt: 6.0,
    };

    /// Marker radius in pixels at the given density.
    pub fn radius_px(&self, dpi: u32) -> i32 {
        ((self.size_pt * dpi as f64 / 72.0) / 2.0).round().max(1.0) as i32
    }
}

/// One channel assigned to one plot area.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelAssignment {
    /// Column name in the sample table.
    pub channel_name: String,

    /// Grid cell the channel is drawn in.
    pub target_area: GridCell,

    /// Marker appearance.
    pub marker_style: MarkerStyle,

    /// Whether the marker follows the samples.
    pub mode: MarkerMode,
}

impl ChannelAssignment {
    pub fn new(
        channel_name: impl Into<String>,
        target_area: GridCell,
        marker_style: MarkerStyle,
        mode: MarkerMode,
    ) -> Self {
        Self {
            channel_name: channel_name.into(),
            target_area,
            marker_style,
            mode,
        }
    }

    pub fn is_animated(&self) -> bool {
        self.mode == MarkerMode::Animated
    }
}

/// The four channels plotted in the figure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SelectionFile")]
pub struct ChannelSelection {
    assignments: Vec<ChannelAssignment>,
}

/// Unvalidated form of a deserialized selection.
#[derive(Deserialize)]
struct SelectionFile {
    assignments: Vec<ChannelAssignment>,
}

impl TryFrom<SelectionFile> for ChannelSelection {
    type Error = DispvizError;

    fn try_from(file: SelectionFile) -> DispvizResult<Self> {
        Self::new(file.assignments)
    }
}

impl ChannelSelection {
    /// Build a selection. Requires exactly one assignment per grid cell.
    pub fn new(assignments: Vec<ChannelAssignment>) -> DispvizResult<Self> {
        if assignments.len() != CHANNEL_COUNT {
            return Err(DispvizError::config(format!(
                "expected {CHANNEL_COUNT} channel assignments, got {}",
                assignments.len()
            )));
        }

        let mut taken = [false; CHANNEL_COUNT];
        for assignment in &assignments {
            let cell = assignment.target_area;
            if !cell.in_grid() {
                return Err(DispvizError::config(format!(
                    "channel {:?} targets cell ({}, {}) outside the {GRID_ROWS}x{GRID_COLS} grid",
                    assignment.channel_name, cell.row, cell.col
                )));
            }
            if std::mem::replace(&mut taken[cell.index()], true) {
                return Err(DispvizError::config(format!(
                    "grid cell ({}, {}) is assigned more than once",
                    cell.row, cell.col
                )));
            }
        }

        Ok(Self { assignments })
    }

    /// The gauge layout of the reference test rig:
    ///
    /// ```text
    /// 06 | 09
    /// ---+---
    /// 10 | 13
    /// ```
    ///
    /// Only the top row is live; the bottom row keeps its frame-0 marker.
    pub fn displacement_default() -> Self {
        let live = |name: &str, cell| {
            ChannelAssignment::new(name, cell, MarkerStyle::RED_DOT, MarkerMode::Animated)
        };
        let fixed = |name: &str, cell| {
            ChannelAssignment::new(name, cell, MarkerStyle::BLUE_DOT, MarkerMode::Static)
        };

        Self {
            assignments: vec![
                live("Displacement 6", GridCell::new(0, 0)),
                live("Displacement 9", GridCell::new(0, 1)),
                fixed("Displacement 10", GridCell::new(1, 0)),
                fixed("Displacement 13", GridCell::new(1, 1)),
            ],
        }
    }

    /// Every channel animated with a red marker.
    pub fn all_animated(mut self) -> Self {
        for assignment in &mut self.assignments {
            assignment.mode = MarkerMode::Animated;
            assignment.marker_style = MarkerStyle::RED_DOT;
        }
        self
    }

    pub fn assignments(&self) -> &[ChannelAssignment] {
        &self.assignments
    }

    /// Assignments whose markers follow the data.
    pub fn animated(&self) -> impl Iterator<Item = &ChannelAssignment> {
        self.assignments.iter().filter(|a| a.is_animated())
    }

    pub fn channel_names(&self) -> Vec<&str> {
        self.assignments
            .iter()
            .map(|a| a.channel_name.as_str())
            .collect()
    }

    /// Look up every selected channel in the table, in assignment order.
    pub fn resolve<'t>(&self, table: &'t SampleTable) -> DispvizResult<Vec<&'t [f64]>> {
        self.assignments
            .iter()
            .map(|a| table.column(&a.channel_name))
            .collect()
    }
}

impl Default for ChannelSelection {
    fn default() -> Self {
        Self::displacement_default()
    }
}
