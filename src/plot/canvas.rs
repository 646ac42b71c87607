//! Bitmap canvases and Plotters drawing.
//!
//! Each chart slot owns one `Canvas`: a fixed-size RGB buffer plus the id of the
//! chart instance currently bound to it. Binding is exclusive; a canvas must be
//! released before another instance can draw on it.
//!
//! Charts carry no text (Plotters runs without a font backend here); titles and
//! legends stay in the `ChartSpec` for whoever presents the image.

use std::io::Cursor;

use plotters::coord::types::RangedCoordf64;
use plotters::prelude::*;

use crate::config::ChartSize;
use crate::error::AppError;
use crate::plot::spec::{ChartKind, ChartSpec, Rgb, Series};

const BACKGROUND: RGBColor = WHITE;
const GRID: RGBColor = RGBColor(226, 232, 240);
const AXIS: RGBColor = RGBColor(148, 163, 184);
const GRID_LINES: usize = 5;
const DASH_PIECES: usize = 8;

pub struct Canvas {
    id: &'static str,
    size: ChartSize,
    pixels: Vec<u8>,
    bound: Option<u64>,
}

impl std::fmt::Debug for Canvas {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Canvas")
            .field("id", &self.id)
            .field("size", &self.size)
            .field("bound", &self.bound)
            .finish()
    }
}

impl Canvas {
    pub fn new(id: &'static str, size: ChartSize) -> Self {
        Self {
            id,
            size,
            pixels: blank(size),
            bound: None,
        }
    }

    pub fn id(&self) -> &'static str {
        self.id
    }

    pub fn size(&self) -> ChartSize {
        self.size
    }

    /// Id of the chart instance drawing on this canvas, if any.
    pub fn bound_instance(&self) -> Option<u64> {
        self.bound
    }

    /// Raw RGB8 pixels, row-major.
    pub fn rgb(&self) -> &[u8] {
        &self.pixels
    }

    pub(crate) fn bind(&mut self, instance: u64) -> Result<(), AppError> {
        if let Some(existing) = self.bound {
            return Err(AppError::render(format!(
                "Canvas '{}' is still bound to chart #{existing}.",
                self.id
            )));
        }
        self.bound = Some(instance);
        Ok(())
    }

    /// Unbind and wipe the canvas.
    pub(crate) fn release(&mut self) {
        self.bound = None;
        self.pixels.fill(255);
    }

    pub(crate) fn draw(&mut self, spec: &ChartSpec) -> Result<(), AppError> {
        draw_spec(&mut self.pixels, self.size, spec)
    }

    /// Encode the current pixels as PNG.
    pub fn to_png(&self) -> Result<Vec<u8>, AppError> {
        let image = image::RgbImage::from_raw(self.size.width, self.size.height, self.pixels.clone())
            .ok_or_else(|| AppError::render(format!("Canvas '{}' has an invalid pixel buffer.", self.id)))?;
        let mut out = Cursor::new(Vec::new());
        image
            .write_to(&mut out, image::ImageFormat::Png)
            .map_err(|e| AppError::render(format!("Failed to encode '{}' as PNG: {e}", self.id)))?;
        Ok(out.into_inner())
    }
}

fn blank(size: ChartSize) -> Vec<u8> {
    vec![255; size.width as usize * size.height as usize * 3]
}

fn draw_err(e: impl std::fmt::Display) -> AppError {
    AppError::render(format!("Chart drawing failed: {e}"))
}

fn color(rgb: Rgb) -> RGBColor {
    RGBColor(rgb.0, rgb.1, rgb.2)
}

fn draw_spec(pixels: &mut [u8], size: ChartSize, spec: &ChartSpec) -> Result<(), AppError> {
    let root = BitMapBackend::with_buffer(pixels, (size.width, size.height)).into_drawing_area();
    root.fill(&BACKGROUND).map_err(draw_err)?;

    let n = spec.labels.len().max(1) as f64;
    let x_range = -0.5..(n - 0.5);
    let (y0, y1) = y_bounds(spec);

    let mut chart = ChartBuilder::on(&root)
        .margin(16)
        .build_cartesian_2d(x_range.clone(), y0..y1)
        .map_err(draw_err)?;

    // Horizontal grid + baseline.
    for k in 0..GRID_LINES {
        let y = y0 + (y1 - y0) * k as f64 / (GRID_LINES - 1) as f64;
        let style = if k == 0 { AXIS } else { GRID };
        chart
            .draw_series(LineSeries::new([(x_range.start, y), (x_range.end, y)], &style))
            .map_err(draw_err)?;
    }

    match spec.kind {
        ChartKind::Line => {
            for series in &spec.series {
                draw_line_series(&mut chart, series)?;
            }
        }
        ChartKind::Bar => {
            let count = spec.series.len().max(1);
            let baseline = 0.0_f64.clamp(y0, y1);
            for (s_idx, series) in spec.series.iter().enumerate() {
                let fill = color(series.style.color).filled();
                let bars = series.values.iter().enumerate().filter_map(|(i, v)| {
                    let v = (*v)?;
                    let (left, right) = bar_span(i, s_idx, count);
                    Some(Rectangle::new([(left, baseline), (right, v)], fill))
                });
                chart.draw_series(bars).map_err(draw_err)?;
            }
        }
    }

    root.present().map_err(draw_err)?;
    Ok(())
}

type Chart2d<'a, 'b> = ChartContext<'a, BitMapBackend<'b>, Cartesian2d<RangedCoordf64, RangedCoordf64>>;

fn draw_line_series(chart: &mut Chart2d<'_, '_>, series: &Series) -> Result<(), AppError> {
    let stroke = color(series.style.color).stroke_width(series.style.stroke_width.max(1));

    for run in contiguous_runs(&series.values) {
        if series.style.dashed {
            for piece in dash_pieces(&run) {
                chart.draw_series(LineSeries::new(piece, stroke)).map_err(draw_err)?;
            }
        } else {
            chart.draw_series(LineSeries::new(run.iter().copied(), stroke)).map_err(draw_err)?;
        }

        if series.style.point_radius > 0 {
            let marker = color(series.style.color).filled();
            let radius = series.style.point_radius as i32;
            chart
                .draw_series(run.iter().map(|&p| Circle::new(p, radius, marker)))
                .map_err(draw_err)?;
        }
    }
    Ok(())
}

/// Y range padded so lines never touch the frame; bar charts always include zero.
fn y_bounds(spec: &ChartSpec) -> (f64, f64) {
    let (mut lo, mut hi) = spec.value_range().unwrap_or((0.0, 1.0));
    if spec.kind == ChartKind::Bar {
        lo = lo.min(0.0);
        hi = hi.max(0.0);
    }
    if (hi - lo).abs() < 1e-9 {
        lo -= 1.0;
        hi += 1.0;
    }
    let pad = (hi - lo) * 0.05;
    let lo = if spec.kind == ChartKind::Bar && lo >= 0.0 { lo } else { lo - pad };
    (lo, hi + pad)
}

/// Horizontal extent of bar `i` of series `s` out of `count` side-by-side series.
fn bar_span(i: usize, s: usize, count: usize) -> (f64, f64) {
    let group = 0.8;
    let width = group / count as f64;
    let left = i as f64 - group / 2.0 + s as f64 * width;
    (left, left + width)
}

/// Split a series into runs of consecutive defined values, indexed by position.
fn contiguous_runs(values: &[Option<f64>]) -> Vec<Vec<(f64, f64)>> {
    let mut runs = Vec::new();
    let mut current = Vec::new();
    for (i, v) in values.iter().enumerate() {
        match v {
            Some(v) => current.push((i as f64, *v)),
            None => {
                if !current.is_empty() {
                    runs.push(std::mem::take(&mut current));
                }
            }
        }
    }
    if !current.is_empty() {
        runs.push(current);
    }
    runs
}

/// Every other piece of each segment, producing a dashed look.
fn dash_pieces(run: &[(f64, f64)]) -> Vec<[(f64, f64); 2]> {
    let mut pieces = Vec::new();
    for pair in run.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        for k in (0..DASH_PIECES).step_by(2) {
            let t0 = k as f64 / DASH_PIECES as f64;
            let t1 = (k + 1) as f64 / DASH_PIECES as f64;
            pieces.push([lerp(a, b, t0), lerp(a, b, t1)]);
        }
    }
    pieces
}

fn lerp(a: (f64, f64), b: (f64, f64), t: f64) -> (f64, f64) {
    (a.0 + (b.0 - a.0) * t, a.1 + (b.1 - a.1) * t)
}
