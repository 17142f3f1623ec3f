//! Terminal visualization using braille graphics
//!
//! Histograms and radial scatter plots are drawn with drawille, where each
//! character cell holds a 2x4 block of pixels.

use drawille::Canvas;
use nalgebra::Vector2;

use crate::core::analyzer::{Histogram, SpecLimits};
use crate::core::chain::WorstCase;

/// Default canvas size for histograms (pixels)
pub const HISTOGRAM_WIDTH: u32 = 120;
pub const HISTOGRAM_HEIGHT: u32 = 48;

/// Default canvas size for radial scatter plots (pixels)
pub const SCATTER_SIZE: u32 = 64;

/// Maximum points plotted in a scatter
const SCATTER_MAX_POINTS: usize = 4000;

/// Render a histogram as braille columns, with dashed limit markers
///
/// # Example Output
/// ```text
/// ⠀⠀⠀⠀⠀⠀⡇⠀⠀⣠⣾⣷⣄⠀⠀⠀⠀⡇
/// ⠀⠀⠀⠀⠀⠀⡇⣠⣾⣿⣿⣿⣿⣷⣄⠀⠀⡇
/// 4.9012                  5.0988
/// ```
pub fn render_histogram(
    hist: &Histogram,
    limits: Option<&SpecLimits>,
    width: u32,
    height: u32,
) -> String {
    let bins = hist.bin_count();
    let (Some(&lo), Some(&hi)) = (hist.edges.first(), hist.edges.last()) else {
        return "  (empty histogram)".to_string();
    };
    if bins == 0 || width < 2 || height < 2 {
        return "  (empty histogram)".to_string();
    }

    // Widen the view so limits just outside the data stay visible
    let (mut view_lo, mut view_hi) = (lo, hi);
    if let Some(l) = limits {
        for v in [l.lower, l.upper].into_iter().flatten() {
            view_lo = view_lo.min(v);
            view_hi = view_hi.max(v);
        }
    }
    let span = (view_hi - view_lo).max(f64::EPSILON);
    let to_px = |x: f64| (((x - view_lo) / span) * (width - 1) as f64).round() as u32;

    let max_count = hist.counts.iter().copied().max().unwrap_or(0).max(1);
    let mut canvas = Canvas::new(width, height);

    for (i, &count) in hist.counts.iter().enumerate() {
        if count == 0 {
            continue;
        }
        let bar = ((count as f64 / max_count as f64) * (height - 1) as f64).ceil() as u32;
        let x0 = to_px(hist.edges[i]);
        let x1 = to_px(hist.edges[i + 1]).max(x0);
        for x in x0..=x1 {
            for y in (height - 1 - bar)..height {
                canvas.set(x, y);
            }
        }
    }

    if let Some(l) = limits {
        for v in [l.lower, l.upper].into_iter().flatten() {
            let x = to_px(v);
            for y in (0..height).step_by(2) {
                canvas.set(x, y);
            }
        }
    }

    let frame = canvas.frame();
    let cols = (width as usize).div_ceil(2);
    let left = format!("{:.4}", view_lo);
    let right = format!("{:.4}", view_hi);
    let pad = cols.saturating_sub(left.len() + right.len()).max(1);

    let mut output = frame;
    output.push('\n');
    output.push_str(&left);
    output.push_str(&" ".repeat(pad));
    output.push_str(&right);
    output
}

/// Render radial outcomes as a scatter around the origin
///
/// The circle marks `radius` (e.g. an eccentricity limit) when given.
pub fn render_radial_scatter(points: &[Vector2<f64>], radius: Option<f64>, size: u32) -> String {
    let mut canvas = Canvas::new(size, size);
    let center = (size / 2) as f64;

    let extent = points
        .iter()
        .map(|p| p.x.abs().max(p.y.abs()))
        .fold(radius.unwrap_or(0.0), f64::max)
        .max(f64::EPSILON);
    let scale = (size as f64 * 0.45) / extent;
    let plot = |canvas: &mut Canvas, x: f64, y: f64| {
        let px = center + x * scale;
        let py = center - y * scale; // Y inverted
        if px >= 0.0 && py >= 0.0 && px < size as f64 && py < size as f64 {
            canvas.set(px as u32, py as u32);
        }
    };

    for i in 0..size {
        canvas.set(size / 2, i);
        canvas.set(i, size / 2);
    }

    let step = points.len().div_ceil(SCATTER_MAX_POINTS).max(1);
    for p in points.iter().step_by(step) {
        plot(&mut canvas, p.x, p.y);
    }

    if let Some(r) = radius {
        let steps = 96;
        for i in 0..steps {
            let theta = std::f64::consts::TAU * i as f64 / steps as f64;
            plot(&mut canvas, r * theta.cos(), r * theta.sin());
        }
    }

    let mut output = canvas.frame();
    output.push_str(&format!("\n  extent: ±{:.4}", extent));
    if let Some(r) = radius {
        output.push_str(&format!("  circle: r = {:.4}", r));
    }
    output
}

/// Render the worst-case range against two-sided limits
pub fn render_range_bar(worst_case: &WorstCase, lower_limit: f64, upper_limit: f64) -> String {
    let bar_width = 60usize;

    // 10% margin outside the limits, widened to fit the range
    let margin = (upper_limit - lower_limit) * 0.1;
    let view_min = (lower_limit - margin).min(worst_case.min);
    let view_max = (upper_limit + margin).max(worst_case.max);
    let view_range = (view_max - view_min).max(f64::EPSILON);

    let pos = |v: f64| (((v - view_min) / view_range * bar_width as f64) as usize).min(bar_width - 1);
    let (pos_lower, pos_upper) = (pos(lower_limit), pos(upper_limit));
    let (pos_min, pos_max) = (pos(worst_case.min), pos(worst_case.max));

    let mut bar = vec!['─'; bar_width];
    bar[pos_lower] = '│';
    bar[pos_upper] = '│';
    for c in &mut bar[pos_min..=pos_max] {
        *c = if *c == '│' { '╋' } else { '═' };
    }
    bar[pos_min] = if bar[pos_min] == '╋' { '╟' } else { '[' };
    bar[pos_max] = if bar[pos_max] == '╋' { '╢' } else { ']' };

    format!(
        "  LSL={:.3}  USL={:.3}\n  {}\n  Min={:.4}  Max={:.4}",
        lower_limit,
        upper_limit,
        bar.into_iter().collect::<String>(),
        worst_case.min,
        worst_case.max
    )
}
