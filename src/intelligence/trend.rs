//! Trend statistics over a measurement window.
//!
//! The slope is an ordinary least-squares fit against sample index, not
//! elapsed time: samples count as equally spaced whatever their timestamps.

use serde::Serialize;

use super::helpers::mean;

/// Dead zone for the glucose first-to-last trend, in mmol/L.
pub const GLUCOSE_TREND_DEAD_ZONE: f64 = 0.2;

/// OLS slope of `values` against their index. Fewer than two samples, or a
/// degenerate denominator, yield 0.
pub fn trend(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return 0.0;
    }
    let n_f = n as f64;
    let x_mean = (n_f - 1.0) / 2.0;
    let y_mean = values.iter().sum::<f64>() / n_f;

    let mut num = 0.0;
    let mut den = 0.0;
    for (i, y) in values.iter().enumerate() {
        let dx = i as f64 - x_mean;
        num += dx * (y - y_mean);
        den += dx * dx;
    }
    if den.abs() <= f64::EPSILON {
        return 0.0;
    }
    num / den
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Rising,
    Falling,
    Stable,
}

impl Direction {
    /// Classify a raw delta with a symmetric dead zone.
    pub fn from_delta(delta: f64, dead_zone: f64) -> Self {
        if delta > dead_zone {
            Direction::Rising
        } else if delta < -dead_zone {
            Direction::Falling
        } else {
            Direction::Stable
        }
    }
}

/// Summary statistics of one window, oldest sample first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendSummary {
    pub count: usize,
    pub mean: f64,
    pub first: f64,
    pub last: f64,
    pub min: f64,
    pub max: f64,
    pub slope: f64,
}

impl TrendSummary {
    /// `None` for an empty window.
    pub fn from_values(values: &[f64]) -> Option<Self> {
        let first = *values.first()?;
        let last = *values.last()?;
        Some(Self {
            count: values.len(),
            mean: mean(values)?,
            first,
            last,
            min: values.iter().copied().fold(f64::INFINITY, f64::min),
            max: values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            slope: trend(values),
        })
    }

    /// Last value minus first value.
    pub fn raw_delta(&self) -> f64 {
        self.last - self.first
    }
}
