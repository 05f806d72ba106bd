//! Chart geometry: histogram bins, kernel density and the regression line.

use std::f64::consts::PI;

/// Equal-width histogram over the data range; the last bin is closed on the right.
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    pub start: f64,
    pub bin_width: f64,
    pub counts: Vec<u32>,
}

impl Histogram {
    pub fn new(values: &[f64], bins: usize) -> Option<Self> {
        if values.is_empty() || bins == 0 {
            return None;
        }
        let (mut lo, mut hi) = values
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            });
        if lo == hi {
            lo -= 0.5;
            hi += 0.5;
        }
        let bin_width = (hi - lo) / bins as f64;
        let mut counts = vec![0u32; bins];
        for &v in values {
            let idx = (((v - lo) / bin_width) as usize).min(bins - 1);
            counts[idx] += 1;
        }
        Some(Self {
            start: lo,
            bin_width,
            counts,
        })
    }

    pub fn end(&self) -> f64 {
        self.start + self.bin_width * self.counts.len() as f64
    }

    /// `(left, right, count)` for every bin.
    pub fn bars(&self) -> impl Iterator<Item = (f64, f64, u32)> + '_ {
        self.counts.iter().enumerate().map(move |(i, &c)| {
            let left = self.start + i as f64 * self.bin_width;
            (left, left + self.bin_width, c)
        })
    }
}

/// Gaussian kernel density estimate with Scott's bandwidth.
#[derive(Debug, Clone)]
pub struct GaussianKde<'a> {
    values: &'a [f64],
    bandwidth: f64,
}

impl<'a> GaussianKde<'a> {
    /// `std` is the sample standard deviation of `values`.
    pub fn new(values: &'a [f64], std: f64) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let bandwidth = std * (values.len() as f64).powf(-0.2);
        (bandwidth > 0.0).then_some(Self { values, bandwidth })
    }

    pub fn bandwidth(&self) -> f64 {
        self.bandwidth
    }

    pub fn density(&self, x: f64) -> f64 {
        let norm = 1.0 / (self.values.len() as f64 * self.bandwidth * (2.0 * PI).sqrt());
        self.values
            .iter()
            .map(|v| (-0.5 * ((x - v) / self.bandwidth).powi(2)).exp())
            .sum::<f64>()
            * norm
    }
}

/// Ordinary least-squares line `y = intercept + slope·x`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
    n: usize,
    x_mean: f64,
    sxx: f64,
    residual_std: f64,
}

impl LinearFit {
    /// `None` when there are fewer than two points or every x is equal.
    pub fn new(points: &[(f64, f64)]) -> Option<Self> {
        let n = points.len();
        if n < 2 {
            return None;
        }
        let x_mean = points.iter().map(|p| p.0).sum::<f64>() / n as f64;
        let y_mean = points.iter().map(|p| p.1).sum::<f64>() / n as f64;
        let sxx: f64 = points.iter().map(|p| (p.0 - x_mean).powi(2)).sum();
        if sxx == 0.0 {
            return None;
        }
        let sxy: f64 = points
            .iter()
            .map(|p| (p.0 - x_mean) * (p.1 - y_mean))
            .sum();
        let slope = sxy / sxx;
        let intercept = y_mean - slope * x_mean;
        let residual_std = if n > 2 {
            let sse: f64 = points
                .iter()
                .map(|p| (p.1 - (intercept + slope * p.0)).powi(2))
                .sum();
            (sse / (n - 2) as f64).sqrt()
        } else {
            0.0
        };
        Some(Self {
            slope,
            intercept,
            n,
            x_mean,
            sxx,
            residual_std,
        })
    }

    pub fn predict(&self, x: f64) -> f64 {
        self.intercept + self.slope * x
    }

    /// Half-width of the ~95% confidence band of the fitted mean at `x`.
    pub fn confidence_half_width(&self, x: f64) -> f64 {
        1.96 * self.residual_std * (1.0 / self.n as f64 + (x - self.x_mean).powi(2) / self.sxx).sqrt()
    }
}

#[cfg(test)]
pub(crate) fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-9 * a.abs().max(b.abs()).max(1.0)
}
