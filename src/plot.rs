//! Static image output for the visualization and evaluation paths
//!
//! The timeline is split into two steps. [`TimelinePlot::build`] turns a time
//! axis and its records into plain geometry (line points and event bands, with
//! x measured in seconds from the start time), and [`render_timeline`] draws
//! that geometry with plotters. The interactive viewer draws the same geometry,
//! so both outputs always agree.
//!
//! Images are drawn into an RGB buffer, encoded as PNG, written to a temporary
//! file next to the destination and renamed into place. A failed render never
//! leaves a truncated image at the destination path.

use crate::error::{AnalysisError, Result};
use crate::metrics::ConfusionMatrix;
use crate::record::{CrowdRecord, max_crowd_count};
use crate::timeline::{TimeAxis, shift_by_seconds};
use chrono::NaiveDateTime;
use image::{ImageOutputFormat, RgbImage};
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use regex::Regex;
use std::error::Error;
use std::fs;
use std::ops::Range;
use std::path::Path;
use std::sync::LazyLock;
use tempfile::NamedTempFile;
use tracing::info;

pub const TIMELINE_TITLE: &str = "Crowd Data versus Time";

const CROWD_COLOR: RGBColor = RGBColor(255, 127, 14);
const VIOLATION_COLOR: RGBColor = RGBColor(31, 119, 180);
const RESTRICTED_COLOR: RGBColor = RED;
const ABNORMAL_COLOR: RGBColor = BLUE;

/// Fraction of the max crowd count used as the height of each event band
pub const RESTRICTED_BAND_FRACTION: f64 = 1.0 / 10.0;
pub const ABNORMAL_BAND_FRACTION: f64 = 1.0 / 20.0;

/// A filled interval `[start, end)` from zero up to `height`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Band {
    pub start: f64,
    pub end: f64,
    pub height: f64,
}

/// Everything needed to draw a crowd timeline, independent of the backend
#[derive(Debug, Clone, PartialEq)]
pub struct TimelinePlot {
    pub start_time: NaiveDateTime,
    pub step_secs: f64,
    pub crowd: Vec<(f64, f64)>,
    pub violations: Vec<(f64, f64)>,
    pub restricted_bands: Vec<Band>,
    pub abnormal_bands: Vec<Band>,
    /// Largest crowd count over the whole run, at least 1
    pub max_crowd: u32,
}

impl TimelinePlot {
    /// Lay out lines and event bands for records placed on `axis`
    ///
    /// Fails with `AxisLengthMismatch` if the axis was built for a different number of records.
    pub fn build(axis: &TimeAxis, records: &[CrowdRecord]) -> Result<Self> {
        if axis.len() != records.len() {
            return Err(AnalysisError::AxisLengthMismatch { axis: axis.len(), records: records.len() });
        }

        let max_crowd = max_crowd_count(records);
        let step = axis.step_secs();
        let restricted_height = max_crowd as f64 * RESTRICTED_BAND_FRACTION;
        let abnormal_height = max_crowd as f64 * ABNORMAL_BAND_FRACTION;

        let mut plot = TimelinePlot {
            start_time: axis.start_time(),
            step_secs: step,
            crowd: Vec::with_capacity(records.len()),
            violations: Vec::with_capacity(records.len()),
            restricted_bands: Vec::new(),
            abnormal_bands: Vec::new(),
            max_crowd,
        };

        for (i, record) in records.iter().enumerate() {
            let x = axis.seconds_from_start(i);
            plot.crowd.push((x, record.human_count as f64));
            plot.violations.push((x, record.violate_count as f64));

            if record.restricted_entry {
                plot.restricted_bands.push(Band { start: x, end: x + step, height: restricted_height });
            }
            if record.abnormal_activity {
                plot.abnormal_bands.push(Band { start: x, end: x + step, height: abnormal_height });
            }
        }

        Ok(plot)
    }

    /// Horizontal extent in seconds: from the start time to the end of the last record's interval
    pub fn x_range(&self) -> Range<f64> {
        0.0..(self.crowd.len() as f64 + 1.0) * self.step_secs
    }

    /// Upper bound of the count axis with some headroom above the tallest line
    pub fn y_max(&self) -> f64 {
        let tallest = self.violations.iter().map(|&(_, y)| y).fold(self.max_crowd as f64, f64::max);
        tallest * 1.1
    }

    /// `HH:MM:SS` label for a position on the x axis
    ///
    /// Positions past the representable date range get an empty label.
    pub fn time_label(&self, secs: f64) -> String {
        shift_by_seconds(self.start_time, secs).map(|t| t.format("%H:%M:%S").to_string()).unwrap_or_default()
    }
}

/// Draw `plot` and publish it as a PNG at `path`
pub fn render_timeline(plot: &TimelinePlot, path: &Path, size: (u32, u32)) -> Result<()> {
    render_png(path, size, |root| {
        root.fill(&WHITE)?;

        let mut chart = ChartBuilder::on(root)
            .caption(TIMELINE_TITLE, ("sans-serif", 24))
            .margin(15)
            .x_label_area_size(40)
            .y_label_area_size(50)
            .build_cartesian_2d(plot.x_range(), 0.0..plot.y_max())?;

        chart
            .configure_mesh()
            .x_desc("Time")
            .y_desc("Count")
            .x_label_formatter(&|x| plot.time_label(*x))
            .draw()?;

        chart
            .draw_series(plot.restricted_bands.iter().map(|b| Rectangle::new([(b.start, 0.0), (b.end, b.height)], RESTRICTED_COLOR.filled())))?
            .label("Restricted Entry Detected")
            .legend(|(x, y)| Rectangle::new([(x, y - 5), (x + 20, y + 5)], RESTRICTED_COLOR.filled()));

        chart
            .draw_series(plot.abnormal_bands.iter().map(|b| Rectangle::new([(b.start, 0.0), (b.end, b.height)], ABNORMAL_COLOR.filled())))?
            .label("Abnormal Crowd Activity Detected")
            .legend(|(x, y)| Rectangle::new([(x, y - 5), (x + 20, y + 5)], ABNORMAL_COLOR.filled()));

        chart
            .draw_series(LineSeries::new(plot.violations.iter().copied(), VIOLATION_COLOR.stroke_width(3)))?
            .label("Violation Count")
            .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], VIOLATION_COLOR.stroke_width(3)));

        chart
            .draw_series(LineSeries::new(plot.crowd.iter().copied(), CROWD_COLOR.stroke_width(3)))?
            .label("Crowd Count")
            .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], CROWD_COLOR.stroke_width(3)));

        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperRight)
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()?;

        Ok(())
    })?;

    info!("Saved timeline plot to {}", path.display());
    Ok(())
}

/// File name for a category's confusion-matrix image, e.g. `confusion_matrix_restricted_entry.png`
pub fn confusion_matrix_file_name(label: &str) -> String {
    static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));
    format!("confusion_matrix_{}.png", WHITESPACE.replace_all(label.trim(), "_").to_lowercase())
}

/// Row and column names of the confusion grid, index 0 first
pub const OUTCOME_NAMES: [&str; 2] = ["Normal", "Abnormal"];

/// Draw a 2×2 heatmap of `confusion` (rows = true label, columns = predicted label)
pub fn render_confusion_matrix(confusion: &ConfusionMatrix, label: &str, path: &Path, size: u32) -> Result<()> {
    let rows = confusion.rows();
    let peak = confusion.grid().iter().copied().max().unwrap_or(0);
    let threshold = peak as f64 / 2.0;

    render_png(path, (size, size), |root| {
        root.fill(&WHITE)?;

        let mut chart = ChartBuilder::on(root)
            .caption(format!("Confusion Matrix - {}", label), ("sans-serif", 22))
            .margin(15)
            .x_label_area_size(50)
            .y_label_area_size(90)
            .build_cartesian_2d(0.0..2.0, 0.0..2.0)?;

        // Numeric ticks mean nothing here; outcome names are drawn at cell centers below.
        chart
            .configure_mesh()
            .disable_mesh()
            .x_desc("Predicted Label")
            .y_desc("True Label")
            .x_label_formatter(&|_| String::new())
            .y_label_formatter(&|_| String::new())
            .draw()?;

        // First row (true Normal) is drawn at the top.
        for (i, row) in rows.iter().enumerate() {
            for (j, &count) in row.iter().enumerate() {
                let (x, y) = cell_origin(i, j);
                chart.draw_series(std::iter::once(Rectangle::new([(x, y), (x + 1.0, y + 1.0)], blues(count, peak).filled())))?;

                let text_color = if count as f64 > threshold { WHITE } else { BLACK };
                let style = ("sans-serif", 28).into_font().color(&text_color).pos(Pos::new(HPos::Center, VPos::Center));
                chart.draw_series(std::iter::once(Text::new(count.to_string(), (x + 0.5, y + 0.5), style)))?;
            }
        }

        let tick_style = ("sans-serif", 16).into_font().color(&BLACK);
        for (k, name) in OUTCOME_NAMES.iter().enumerate() {
            let (px, py) = chart.backend_coord(&(k as f64 + 0.5, 0.0));
            root.draw(&Text::new(*name, (px, py + 10), tick_style.pos(Pos::new(HPos::Center, VPos::Top))))?;

            let (px, py) = chart.backend_coord(&(0.0, cell_origin(k, 0).1 + 0.5));
            root.draw(&Text::new(*name, (px - 10, py), tick_style.pos(Pos::new(HPos::Right, VPos::Center))))?;
        }

        Ok(())
    })?;

    info!("Saved confusion matrix for {} to {}", label, path.display());
    Ok(())
}

/// Lower-left chart corner of grid cell (`row`, `col`)
fn cell_origin(row: usize, col: usize) -> (f64, f64) {
    (col as f64, 1.0 - row as f64)
}

/// Sequential blue scale from near-white (0) to dark blue (`peak`)
fn blues(value: u64, peak: u64) -> RGBColor {
    let t = if peak > 0 { value as f64 / peak as f64 } else { 0.0 };
    let lerp = |lo: u8, hi: u8| (lo as f64 + (hi as f64 - lo as f64) * t).round() as u8;
    RGBColor(lerp(247, 8), lerp(251, 48), lerp(255, 107))
}

type DrawResult = std::result::Result<(), Box<dyn Error>>;

/// Run `draw` on an in-memory bitmap and atomically publish the result as a PNG
fn render_png<F>(path: &Path, (width, height): (u32, u32), draw: F) -> Result<()>
where
    F: FnOnce(&DrawingArea<BitMapBackend<'_>, Shift>) -> DrawResult,
{
    let mut buf = vec![0u8; width as usize * height as usize * 3];
    {
        let root = BitMapBackend::with_buffer(&mut buf, (width, height)).into_drawing_area();
        draw(&root).map_err(|e| AnalysisError::write_failure(path, e))?;
        root.present().map_err(|e| AnalysisError::write_failure(path, e))?;
    }

    let image = RgbImage::from_raw(width, height, buf).ok_or_else(|| AnalysisError::write_failure(path, "pixel buffer does not match image size"))?;

    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).map_err(|e| AnalysisError::write_failure(path, e))?;

    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| AnalysisError::write_failure(path, e))?;
    image.write_to(&mut tmp, ImageOutputFormat::Png).map_err(|e| AnalysisError::write_failure(path, e))?;
    tmp.persist(path).map_err(|e| AnalysisError::write_failure(path, e.error))?;
    Ok(())
}
