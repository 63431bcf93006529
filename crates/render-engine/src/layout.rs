//! Figure layout: the explicit scene every drawing and update goes through.

use serde::{Deserialize, Serialize};

use dispviz_common::config::RenderDefaults;
use dispviz_common::error::{DispvizError, DispvizResult};
use dispviz_sensor_model::{
    AxisBounds, ChannelSelection, GridCell, MarkerMode, MarkerStyle, SampleTable, GRID_COLS,
    GRID_ROWS,
};

use crate::animation::FrameUpdate;

/// Physical figure size and pixel density.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FigureSize {
    pub width_in: f64,
    pub height_in: f64,
    pub dpi: u32,
}

impl FigureSize {
    pub fn from_defaults(defaults: &RenderDefaults) -> Self {
        Self {
            width_in: defaults.width_in,
            height_in: defaults.height_in,
            dpi: defaults.dpi,
        }
    }

    /// Pixel dimensions, rounded down to even values so yuv420p encoders
    /// accept the frames.
    pub fn pixels(&self) -> (u32, u32) {
        let to_px = |inches: f64| {
            let px = (inches * self.dpi as f64).round().max(2.0) as u32;
            px & !1
        };
        (to_px(self.width_in), to_px(self.height_in))
    }
}

impl Default for FigureSize {
    fn default() -> Self {
        Self::from_defaults(&RenderDefaults::default())
    }
}

/// A marker drawn in one plot area.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Marker {
    pub style: MarkerStyle,
    /// Data-space position; x is always 0.
    pub position: (f64, f64),
}

/// One plot area of the figure.
#[derive(Debug, Clone, PartialEq)]
pub struct Panel {
    pub area: GridCell,
    pub channel: String,
    pub mode: MarkerMode,
    pub marker: Marker,
}

/// The figure: title, grid of panels, and the shared y range.
#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    title: String,
    figure: FigureSize,
    bounds: AxisBounds,
    panels: Vec<Panel>,
}

impl Scene {
    /// Lay out one panel per selected channel, each marker at the
    /// channel's frame-0 sample.
    pub fn build(
        table: &SampleTable,
        selection: &ChannelSelection,
        bounds: AxisBounds,
        figure: FigureSize,
        title: impl Into<String>,
    ) -> DispvizResult<Self> {
        let mut panels = Vec::with_capacity(GRID_ROWS * GRID_COLS);
        for assignment in selection.assignments() {
            let samples = table.column(&assignment.channel_name)?;
            let first = *samples.first().ok_or_else(|| DispvizError::EmptyChannel {
                name: assignment.channel_name.clone(),
            })?;
            panels.push(Panel {
                area: assignment.target_area,
                channel: assignment.channel_name.clone(),
                mode: assignment.mode,
                marker: Marker {
                    style: assignment.marker_style,
                    position: (0.0, first),
                },
            });
        }
        panels.sort_by_key(|p| p.area.index());

        let scene = Self {
            title: title.into(),
            figure,
            bounds,
            panels,
        };
        tracing::debug!(
            title = %scene.title,
            panels = scene.panels.len(),
            live = scene.panels.iter().filter(|p| p.mode == MarkerMode::Animated).count(),
            "Scene built"
        );
        Ok(scene)
    }

    /// Move the markers named in a frame update.
    pub fn apply(&mut self, update: &FrameUpdate) -> DispvizResult<()> {
        for change in &update.changed {
            let panel = self
                .panels
                .iter_mut()
                .find(|p| p.area == change.area)
                .ok_or_else(|| {
                    DispvizError::render(format!(
                        "frame {} updates cell ({}, {}) which has no panel",
                        update.index, change.area.row, change.area.col
                    ))
                })?;
            panel.marker.position = change.position;
        }
        Ok(())
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn figure(&self) -> FigureSize {
        self.figure
    }

    pub fn bounds(&self) -> AxisBounds {
        self.bounds
    }

    /// Panels in row-major grid order.
    pub fn panels(&self) -> &[Panel] {
        &self.panels
    }

    pub fn panel(&self, area: GridCell) -> Option<&Panel> {
        self.panels.iter().find(|p| p.area == area)
    }

    pub fn grid(&self) -> (usize, usize) {
        (GRID_ROWS, GRID_COLS)
    }
}
