//! Chart rendering using plotters (SVG output)
//!
//! Uses the SVG backend to avoid system font dependencies; a `.png` path is
//! written next to it as `.svg`.

use anyhow::{Context, Result};
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::series::DashedLineSeries;
use plotters_svg::SVGBackend;
use std::path::{Path, PathBuf};

use crate::metrics::IntensityStats;
use crate::stats::{GaussianKde, Histogram, LinearFit};

const SIZE: (u32, u32) = (1000, 600);
const TEAL: RGBColor = RGBColor(0, 128, 128);
const PURPLE: RGBColor = RGBColor(128, 0, 128);
const KDE_POINTS: usize = 200;

/// Path actually written for a requested chart path.
pub fn svg_path(path: &Path) -> PathBuf {
    if path.extension().map(|e| e == "png").unwrap_or(false) {
        path.with_extension("svg")
    } else {
        path.to_path_buf()
    }
}

fn padded(lo: f64, hi: f64) -> (f64, f64) {
    if hi > lo {
        let pad = (hi - lo) * 0.05;
        (lo - pad, hi + pad)
    } else {
        (lo - 1.0, hi + 1.0)
    }
}

fn draw_placeholder(root: &DrawingArea<SVGBackend<'_>, Shift>, msg: &str) -> Result<()> {
    root.draw(&Text::new(
        msg.to_string(),
        ((SIZE.0 / 2 - 80) as i32, (SIZE.1 / 2) as i32),
        ("sans-serif", 20).into_font().color(&BLACK),
    ))?;
    Ok(())
}

/// Histogram of update intensity with a density overlay and a dashed
/// reference line `sigma` standard deviations above the mean.
pub fn intensity_histogram(
    path: &Path,
    intensities: &[f64],
    stats: &IntensityStats,
    bins: usize,
    sigma: f64,
) -> Result<PathBuf> {
    let out = svg_path(path);
    draw_intensity_histogram(&out, intensities, stats, bins, sigma)
        .with_context(|| format!("writing {}", out.display()))?;
    Ok(out)
}

fn draw_intensity_histogram(
    out: &Path,
    intensities: &[f64],
    stats: &IntensityStats,
    bins: usize,
    sigma: f64,
) -> Result<()> {
    let root = SVGBackend::new(out, SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let Some(hist) = Histogram::new(intensities, bins) else {
        draw_placeholder(&root, "No intensity data")?;
        root.present()?;
        return Ok(());
    };

    let threshold = stats.threshold(sigma);
    let scale = intensities.len() as f64 * hist.bin_width;
    let curve: Vec<(f64, f64)> = GaussianKde::new(intensities, stats.std)
        .map(|kde| {
            let step = (hist.end() - hist.start) / (KDE_POINTS - 1) as f64;
            (0..KDE_POINTS)
                .map(|i| {
                    let x = hist.start + i as f64 * step;
                    (x, kde.density(x) * scale)
                })
                .collect()
        })
        .unwrap_or_default();

    let max_count = hist.counts.iter().copied().max().unwrap_or(0) as f64;
    let max_curve = curve.iter().map(|p| p.1).fold(0.0, f64::max);
    let y_max = max_count.max(max_curve).max(1.0) * 1.1;
    let (x_lo, x_hi) = padded(hist.start.min(threshold), hist.end().max(threshold));

    let mut chart = ChartBuilder::on(&root)
        .caption(
            "Update Intensity Distribution (Red Line = High Stress Zones)",
            ("sans-serif", 20),
        )
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(x_lo..x_hi, 0f64..y_max)?;

    chart
        .configure_mesh()
        .x_desc("Updates per 1000 Enrolments")
        .y_desc("Count")
        .draw()?;

    chart.draw_series(hist.bars().map(|(left, right, count)| {
        Rectangle::new([(left, 0.0), (right, count as f64)], TEAL.mix(0.5).filled())
    }))?;

    if !curve.is_empty() {
        chart.draw_series(LineSeries::new(curve, TEAL.stroke_width(2)))?;
    }

    chart.draw_series(DashedLineSeries::new(
        [(threshold, 0.0), (threshold, y_max)],
        10,
        6,
        RED.stroke_width(2),
    ))?;

    root.present()?;
    Ok(())
}

/// Scatter of `(total_enrolment, total_bio_updates)` with a least-squares
/// fit and its confidence band.
pub fn enrolment_vs_biometric(path: &Path, points: &[(f64, f64)]) -> Result<PathBuf> {
    let out = svg_path(path);
    draw_enrolment_vs_biometric(&out, points)
        .with_context(|| format!("writing {}", out.display()))?;
    Ok(out)
}

fn draw_enrolment_vs_biometric(out: &Path, points: &[(f64, f64)]) -> Result<()> {
    let root = SVGBackend::new(out, SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    if points.is_empty() {
        draw_placeholder(&root, "No regions to display")?;
        root.present()?;
        return Ok(());
    }

    let (x_min, x_max) = points
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| (lo.min(p.0), hi.max(p.0)));
    let fit = LinearFit::new(points);

    let mut y_min = points.iter().map(|p| p.1).fold(f64::INFINITY, f64::min);
    let mut y_max = points.iter().map(|p| p.1).fold(f64::NEG_INFINITY, f64::max);
    let band: Vec<(f64, f64, f64)> = fit
        .map(|fit| {
            let step = (x_max - x_min) / 99.0;
            (0..100)
                .map(|i| {
                    let x = x_min + i as f64 * step;
                    let y = fit.predict(x);
                    let hw = fit.confidence_half_width(x);
                    (x, y - hw, y + hw)
                })
                .collect()
        })
        .unwrap_or_default();
    for &(_, lo, hi) in &band {
        y_min = y_min.min(lo);
        y_max = y_max.max(hi);
    }

    let (x_lo, x_hi) = padded(x_min, x_max);
    let (y_lo, y_hi) = padded(y_min, y_max);

    let mut chart = ChartBuilder::on(&root)
        .caption(
            "Predictive Model: Enrolment vs Future Biometric Demand",
            ("sans-serif", 20),
        )
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(70)
        .build_cartesian_2d(x_lo..x_hi, y_lo..y_hi)?;

    chart
        .configure_mesh()
        .x_desc("Total Enrolment")
        .y_desc("Biometric Updates")
        .draw()?;

    chart.draw_series(
        points
            .iter()
            .map(|&(x, y)| Circle::new((x, y), 3, PURPLE.mix(0.5).filled())),
    )?;

    if !band.is_empty() {
        let mut outline: Vec<(f64, f64)> = band.iter().map(|&(x, _, hi)| (x, hi)).collect();
        outline.extend(band.iter().rev().map(|&(x, lo, _)| (x, lo)));
        chart.draw_series(std::iter::once(Polygon::new(outline, PURPLE.mix(0.15).filled())))?;
        chart.draw_series(LineSeries::new(
            band.iter().map(|&(x, lo, hi)| (x, (lo + hi) / 2.0)),
            PURPLE.stroke_width(2),
        ))?;
    }

    root.present()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn png_paths_are_written_as_svg() {
        assert_eq!(svg_path(Path::new("a/Chart1.png")), PathBuf::from("a/Chart1.svg"));
        assert_eq!(svg_path(Path::new("Chart1.svg")), PathBuf::from("Chart1.svg"));
    }

    #[test]
    fn writes_both_charts() -> Result<()> {
        let tmp = tempdir()?;
        let intensities = [120.0, 340.0, 560.0, 410.0, 2900.0, 380.0];
        let stats = IntensityStats {
            count: intensities.len(),
            mean: 785.0,
            std: 1050.0,
        };
        let hist = intensity_histogram(&tmp.path().join("c1.png"), &intensities, &stats, 50, 3.0)?;
        assert!(hist.ends_with("c1.svg"));
        assert!(fs::read_to_string(&hist)?.contains("<svg"));

        let points = [(100.0, 10.0), (250.0, 30.0), (400.0, 38.0), (800.0, 90.0)];
        let scatter = enrolment_vs_biometric(&tmp.path().join("c2.svg"), &points)?;
        assert!(fs::metadata(&scatter)?.len() > 0);
        Ok(())
    }

    #[test]
    fn empty_data_still_produces_a_file() -> Result<()> {
        let tmp = tempdir()?;
        let out = enrolment_vs_biometric(&tmp.path().join("empty.svg"), &[])?;
        assert!(out.exists());
        Ok(())
    }
}
