//! SVG charts for evaluation reports

use crate::error::{Result, WineError};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

const WIDTH: f64 = 800.0;
const HEIGHT: f64 = 600.0;
const MARGIN: f64 = 70.0;
const BAR_COLOR: &str = "#4c72b0";

/// Number of bins in the residual histogram
pub const RESIDUAL_BINS: usize = 20;

/// Linear map from a data range onto a pixel range
#[derive(Debug, Clone, Copy)]
struct Scale {
    lo: f64,
    hi: f64,
    out_lo: f64,
    out_hi: f64,
}

impl Scale {
    fn new(lo: f64, hi: f64, out_lo: f64, out_hi: f64) -> Self {
        // Pad a degenerate range so every point still lands inside the plot.
        let (lo, hi) = if (hi - lo).abs() < f64::EPSILON {
            (lo - 0.5, hi + 0.5)
        } else {
            (lo, hi)
        };
        Self { lo, hi, out_lo, out_hi }
    }

    fn map(&self, v: f64) -> f64 {
        self.out_lo + (v - self.lo) / (self.hi - self.lo) * (self.out_hi - self.out_lo)
    }
}

fn create_writer(path: &Path) -> Result<BufWriter<File>> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(BufWriter::new(File::create(path)?))
}

fn write_header<W: Write>(w: &mut W, title: &str) -> Result<()> {
    writeln!(w, r#"<?xml version="1.0" encoding="UTF-8"?>"#)?;
    writeln!(
        w,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{}" height="{}" style="background-color: white;">"#,
        WIDTH, HEIGHT
    )?;
    writeln!(w, r#"<style type="text/css">"#)?;
    writeln!(
        w,
        r#"text {{ font-family: Verdana, sans-serif; font-size: 12px; fill: #222; }} .title {{ font-size: 16px; font-weight: bold; }}"#
    )?;
    writeln!(w, r#"</style>"#)?;
    writeln!(
        w,
        r#"<text class="title" x="{}" y="30" text-anchor="middle">{}</text>"#,
        WIDTH / 2.0,
        escape(title)
    )?;
    Ok(())
}

fn write_axes<W: Write>(w: &mut W, x_label: &str, y_label: &str) -> Result<()> {
    let bottom = HEIGHT - MARGIN;
    writeln!(
        w,
        r#"<line x1="{m}" y1="{b}" x2="{r}" y2="{b}" stroke="black"/>"#,
        m = MARGIN,
        b = bottom,
        r = WIDTH - MARGIN
    )?;
    writeln!(
        w,
        r#"<line x1="{m}" y1="{t}" x2="{m}" y2="{b}" stroke="black"/>"#,
        m = MARGIN,
        t = MARGIN,
        b = bottom
    )?;
    writeln!(
        w,
        r#"<text x="{}" y="{}" text-anchor="middle">{}</text>"#,
        WIDTH / 2.0,
        HEIGHT - 20.0,
        escape(x_label)
    )?;
    writeln!(
        w,
        r#"<text x="20" y="{y}" text-anchor="middle" transform="rotate(-90 20 {y})">{}</text>"#,
        escape(y_label),
        y = HEIGHT / 2.0
    )?;
    Ok(())
}

fn write_tick_labels<W: Write>(w: &mut W, x: Scale, y: Scale) -> Result<()> {
    let bottom = HEIGHT - MARGIN;
    for i in 0..=4 {
        let frac = i as f64 / 4.0;
        let xv = x.lo + frac * (x.hi - x.lo);
        let yv = y.lo + frac * (y.hi - y.lo);
        writeln!(
            w,
            r#"<text x="{:.1}" y="{:.1}" text-anchor="middle">{:.2}</text>"#,
            x.map(xv),
            bottom + 18.0,
            xv
        )?;
        writeln!(
            w,
            r#"<text x="{:.1}" y="{:.1}" text-anchor="end">{:.2}</text>"#,
            MARGIN - 6.0,
            y.map(yv) + 4.0,
            yv
        )?;
    }
    Ok(())
}

fn min_max(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    values
        .filter(|v| v.is_finite())
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}

/// Scatter of actual against predicted values, with the identity line
pub fn render_actual_vs_predicted<W: Write>(w: &mut W, actual: &[f64], predicted: &[f64]) -> Result<()> {
    if actual.len() != predicted.len() {
        return Err(WineError::ShapeError {
            expected: format!("{} predictions", actual.len()),
            actual: format!("{} predictions", predicted.len()),
        });
    }
    let (lo, hi) = min_max(actual.iter().chain(predicted.iter()).copied()).unwrap_or((0.0, 1.0));
    let x = Scale::new(lo, hi, MARGIN, WIDTH - MARGIN);
    let y = Scale::new(lo, hi, HEIGHT - MARGIN, MARGIN);

    write_header(w, "Actual vs Predicted Wine Quality")?;
    write_axes(w, "Actual Quality", "Predicted Quality")?;
    write_tick_labels(w, x, y)?;

    writeln!(
        w,
        r##"<line x1="{:.1}" y1="{:.1}" x2="{:.1}" y2="{:.1}" stroke="#999" stroke-dasharray="4 4"/>"##,
        x.map(x.lo),
        y.map(y.lo),
        x.map(x.hi),
        y.map(y.hi)
    )?;
    for (a, p) in actual.iter().zip(predicted.iter()) {
        writeln!(
            w,
            r#"<circle cx="{:.1}" cy="{:.1}" r="4" fill="{}" fill-opacity="0.7"/>"#,
            x.map(*a),
            y.map(*p),
            BAR_COLOR
        )?;
    }
    writeln!(w, "</svg>")?;
    Ok(())
}

/// Equal-width bin counts over the finite values.
///
/// Returns the lower edge, the bin width and the counts.
pub fn histogram(values: &[f64], bins: usize) -> (f64, f64, Vec<usize>) {
    let bins = bins.max(1);
    let Some((lo, hi)) = min_max(values.iter().copied()) else {
        return (0.0, 1.0, vec![0; bins]);
    };
    let width = if hi > lo { (hi - lo) / bins as f64 } else { 1.0 };

    let mut counts = vec![0usize; bins];
    for v in values.iter().filter(|v| v.is_finite()) {
        let idx = (((v - lo) / width) as usize).min(bins - 1);
        counts[idx] += 1;
    }
    (lo, width, counts)
}

/// Histogram of residuals
pub fn render_residual_histogram<W: Write>(w: &mut W, residuals: &[f64], bins: usize) -> Result<()> {
    let (lo, width, counts) = histogram(residuals, bins);
    let max_count = counts.iter().copied().max().unwrap_or(0).max(1);

    let x = Scale::new(lo, lo + width * counts.len() as f64, MARGIN, WIDTH - MARGIN);
    let y = Scale::new(0.0, max_count as f64, HEIGHT - MARGIN, MARGIN);

    write_header(w, "Residual Distribution")?;
    write_axes(w, "Residuals", "Frequency")?;
    write_tick_labels(w, x, y)?;

    for (i, &count) in counts.iter().enumerate() {
        let left = x.map(lo + width * i as f64);
        let right = x.map(lo + width * (i + 1) as f64);
        let top = y.map(count as f64);
        writeln!(
            w,
            r#"<rect x="{:.1}" y="{:.1}" width="{:.1}" height="{:.1}" fill="{}" stroke="white"><title>{}</title></rect>"#,
            left,
            top,
            (right - left).max(0.0),
            (HEIGHT - MARGIN - top).max(0.0),
            BAR_COLOR,
            count
        )?;
    }
    writeln!(w, "</svg>")?;
    Ok(())
}

/// Bar chart of importances, largest first
pub fn render_feature_importance<W: Write>(w: &mut W, importances: &[(String, f64)]) -> Result<()> {
    let mut sorted: Vec<&(String, f64)> = importances.iter().collect();
    sorted.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    let max_value = sorted.first().map(|(_, v)| *v).unwrap_or(0.0).max(f64::EPSILON);
    let y = Scale::new(0.0, max_value, HEIGHT - MARGIN, MARGIN);
    let slot = (WIDTH - 2.0 * MARGIN) / sorted.len().max(1) as f64;

    write_header(w, "Feature Importance")?;
    write_axes(w, "Feature", "Importance")?;

    for (i, (name, value)) in sorted.iter().enumerate() {
        let left = MARGIN + slot * i as f64 + slot * 0.1;
        let top = y.map(*value);
        writeln!(
            w,
            r#"<rect x="{:.1}" y="{:.1}" width="{:.1}" height="{:.1}" fill="{}"><title>{}: {:.4}</title></rect>"#,
            left,
            top,
            slot * 0.8,
            (HEIGHT - MARGIN - top).max(0.0),
            BAR_COLOR,
            escape(name),
            value
        )?;
        let label_x = left + slot * 0.4;
        let label_y = HEIGHT - MARGIN + 12.0;
        writeln!(
            w,
            r#"<text x="{x:.1}" y="{y:.1}" font-size="10" text-anchor="end" transform="rotate(-45 {x:.1} {y:.1})">{}</text>"#,
            escape(name),
            x = label_x,
            y = label_y
        )?;
    }
    writeln!(w, "</svg>")?;
    Ok(())
}

pub fn write_actual_vs_predicted(path: &Path, actual: &[f64], predicted: &[f64]) -> Result<()> {
    let mut writer = create_writer(path)?;
    render_actual_vs_predicted(&mut writer, actual, predicted)?;
    writer.flush()?;
    Ok(())
}

pub fn write_residual_histogram(path: &Path, residuals: &[f64]) -> Result<()> {
    let mut writer = create_writer(path)?;
    render_residual_histogram(&mut writer, residuals, RESIDUAL_BINS)?;
    writer.flush()?;
    Ok(())
}

pub fn write_feature_importance(path: &Path, importances: &[(String, f64)]) -> Result<()> {
    let mut writer = create_writer(path)?;
    render_feature_importance(&mut writer, importances)?;
    writer.flush()?;
    Ok(())
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
