//! Frame compositor: rasterizes the scene into RGB24 frames.
//!
//! Everything that never changes during a run (title, panel captions,
//! frames, grid lines, tick labels, static markers) is drawn once into a
//! background buffer. Each frame starts as a copy of that
//! buffer and only the animated markers are drawn on top.

use std::ops::Range;
use std::sync::OnceLock;

use plotters::coord::types::RangedCoordf64;
use plotters::coord::{CoordTranslate, Shift};
use plotters::drawing::DrawingAreaErrorKind;
use plotters::prelude::*;

use dispviz_common::error::{DispvizError, DispvizResult};
use dispviz_sensor_model::{AxisBounds, GridCell, MarkerMode, MarkerStyle};

use crate::layout::{Marker, Panel, Scene};

type PanelCoord = Cartesian2d<RangedCoordf64, RangedCoordf64>;

/// Horizontal data range of every panel; markers sit at x = 0.
const X_RANGE: Range<f64> = -0.1..0.1;

/// Horizontal grid divisions per panel.
const GRID_DIVISIONS: usize = 5;

/// Figure title size (points).
const TITLE_PT: f64 = 12.0;

const PANEL_MARGIN_PT: f64 = 6.0;

const GRID_COLOR: RGBColor = RGBColor(222, 222, 222);

/// Family name every text style refers to.
const FONT_FAMILY: &str = "sans-serif";

/// Bundled so output never depends on the fonts installed on the host.
const FONT_DATA: &[u8] = include_bytes!("../assets/DejaVuSans.ttf");

/// Pixel geometry of a panel whose marker is redrawn every frame.
struct LivePanel {
    area: GridCell,
    coord: PanelCoord,
}

/// Rasterizer for one scene layout.
pub struct Compositor {
    width: u32,
    height: u32,
    dpi: u32,
    background: Vec<u8>,
    live: Vec<LivePanel>,
}

impl Compositor {
    /// Lay out the figure and draw its static background.
    pub fn new(scene: &Scene) -> DispvizResult<Self> {
        let (width, height) = scene.figure().pixels();
        let dpi = scene.figure().dpi;
        let y = y_range(scene.bounds());
        register_font()?;

        let mut background = vec![0u8; frame_len(width, height)];
        let mut live = Vec::new();
        {
            let root = BitMapBackend::with_buffer(&mut background, (width, height))
                .into_drawing_area();
            root.fill(&WHITE).map_err(draw_err)?;

            let grid = title_area(&root, scene.title(), dpi)?;
            let areas = grid.split_evenly(scene.grid());

            for panel in scene.panels() {
                let area = areas.get(panel.area.index()).ok_or_else(|| {
                    DispvizError::render(format!(
                        "panel cell ({}, {}) is outside the grid",
                        panel.area.row, panel.area.col
                    ))
                })?;
                let mut chart = panel_chart(area, panel, y.clone(), dpi)?;
                draw_axes(&mut chart, &y, dpi)?;

                match panel.mode {
                    MarkerMode::Static => {
                        chart
                            .draw_series(std::iter::once(marker_element(&panel.marker, dpi)))
                            .map_err(draw_err)?;
                    }
                    MarkerMode::Animated => live.push(LivePanel {
                        area: panel.area,
                        coord: chart.as_coord_spec().clone(),
                    }),
                }
            }

            root.present().map_err(draw_err)?;
        }

        tracing::debug!(
            width,
            height,
            dpi,
            live_panels = live.len(),
            "Compositor background drawn"
        );

        Ok(Self {
            width,
            height,
            dpi,
            background,
            live,
        })
    }

    /// Draw the scene's current marker positions into `frame`.
    ///
    /// `frame` must be exactly [`Compositor::frame_len`] bytes.
    pub fn render(&self, scene: &Scene, frame: &mut [u8]) -> DispvizResult<()> {
        if frame.len() != self.background.len() {
            return Err(DispvizError::render(format!(
                "frame buffer holds {} bytes, expected {}",
                frame.len(),
                self.background.len()
            )));
        }
        frame.copy_from_slice(&self.background);

        let root = BitMapBackend::with_buffer(frame, (self.width, self.height)).into_drawing_area();
        for live in &self.live {
            let panel = scene.panel(live.area).ok_or_else(|| {
                DispvizError::render(format!(
                    "scene has no panel at cell ({}, {})",
                    live.area.row, live.area.col
                ))
            })?;
            let center = live.coord.translate(&panel.marker.position);
            let radius = panel.marker.style.radius_px(self.dpi);
            root.draw(&Circle::new(
                center,
                radius,
                marker_color(&panel.marker.style).filled(),
            ))
            .map_err(draw_err)?;
        }
        root.present().map_err(draw_err)?;
        Ok(())
    }

    /// A frame buffer holding only the static background.
    pub fn blank_frame(&self) -> Vec<u8> {
        self.background.clone()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Bytes per RGB24 frame.
    pub fn frame_len(&self) -> usize {
        self.background.len()
    }
}

fn frame_len(width: u32, height: u32) -> usize {
    width as usize * height as usize * 3
}

fn pt_to_px(pt: f64, dpi: u32) -> u32 {
    (pt * dpi as f64 / 72.0).round() as u32
}

/// The y range drawn for the given bounds. A flat dataset is widened so
/// the coordinate mapping stays finite.
fn y_range(bounds: AxisBounds) -> Range<f64> {
    let span = bounds.span();
    if span.is_finite() && span > 0.0 {
        bounds.min..bounds.max
    } else {
        (bounds.min - 0.5)..(bounds.max + 0.5)
    }
}

fn draw_err<E: std::error::Error + Send + Sync>(err: DrawingAreaErrorKind<E>) -> DispvizError {
    DispvizError::render(format!("failed to draw frame: {err}"))
}

fn marker_color(style: &MarkerStyle) -> RGBColor {
    let [r, g, b] = style.color;
    RGBColor(r, g, b)
}

fn marker_element(marker: &Marker, dpi: u32) -> Circle<(f64, f64), i32> {
    Circle::new(
        marker.position,
        marker.style.radius_px(dpi),
        marker_color(&marker.style).filled(),
    )
}

/// Register the bundled font once per process.
fn register_font() -> DispvizResult<()> {
    static REGISTERED: OnceLock<bool> = OnceLock::new();
    let registered = *REGISTERED.get_or_init(|| {
        plotters::style::register_font(FONT_FAMILY, FontStyle::Normal, FONT_DATA).is_ok()
    });
    if registered {
        Ok(())
    } else {
        Err(DispvizError::render("bundled font could not be loaded"))
    }
}

/// Draw the title strip and return the area left for the grid.
fn title_area<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    title: &str,
    dpi: u32,
) -> DispvizResult<DrawingArea<DB, Shift>> {
    root.titled(title, (FONT_FAMILY, title_px(dpi) as f64)).map_err(draw_err)
}

fn title_px(dpi: u32) -> u32 {
    pt_to_px(TITLE_PT, dpi)
}

/// Chart for one panel. Background and frame passes must build it the
/// same way so their pixel geometry matches.
fn panel_chart<'a, DB: DrawingBackend>(
    area: &'a DrawingArea<DB, Shift>,
    panel: &Panel,
    y: Range<f64>,
    dpi: u32,
) -> DispvizResult<ChartContext<'a, DB, PanelCoord>> {
    let font_px = pt_to_px(9.0, dpi);
    ChartBuilder::on(area)
        .margin(pt_to_px(PANEL_MARGIN_PT, dpi))
        .caption(&panel.channel, (FONT_FAMILY, font_px as f64))
        .x_label_area_size(font_px * 2)
        .y_label_area_size(font_px * 4)
        .build_cartesian_2d(X_RANGE, y)
        .map_err(draw_err)
}

fn draw_axes<DB: DrawingBackend>(
    chart: &mut ChartContext<'_, DB, PanelCoord>,
    y: &Range<f64>,
    dpi: u32,
) -> DispvizResult<()> {
    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(1)
        .y_labels(GRID_DIVISIONS + 1)
        .bold_line_style(GRID_COLOR.stroke_width(1))
        .light_line_style(TRANSPARENT)
        .label_style((FONT_FAMILY, pt_to_px(7.0, dpi) as f64))
        .draw()
        .map_err(draw_err)?;

    chart
        .draw_series(std::iter::once(Rectangle::new(
            [(X_RANGE.start, y.start), (X_RANGE.end, y.end)],
            BLACK.stroke_width(1),
        )))
        .map_err(draw_err)?;
    Ok(())
}
