//! Statistics helpers shared by the analytics engines
//!
//! Every helper returns `None` for degenerate input (empty slices, a single
//! point where a spread is needed, zero variance where a ratio is needed)
//! rather than letting `NaN` or `Infinity` leak into results.

use serde::{Deserialize, Serialize};

use crate::models::TrendDirection;

/// Slopes smaller than this (relative to the series scale) count as flat
const FLAT_SLOPE_EPSILON: f64 = 1e-9;

/// Least-squares line fitted over an evenly spaced series
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Trend {
    pub slope: f64,
    pub intercept: f64,
    /// Coefficient of determination (0.0-1.0); 1.0 for a perfectly flat series
    pub r_squared: f64,
    pub direction: TrendDirection,
    /// `|slope| / mean(values)`; 0.0 when the mean is zero
    pub strength: f64,
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Population variance
pub fn variance(values: &[f64]) -> Option<f64> {
    let m = mean(values)?;
    Some(values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64)
}

/// Population standard deviation
pub fn std_dev(values: &[f64]) -> Option<f64> {
    variance(values).map(f64::sqrt)
}

/// `std_dev / mean`; `None` when the mean is zero
pub fn coefficient_of_variation(values: &[f64]) -> Option<f64> {
    let m = mean(values)?;
    if m.abs() < f64::EPSILON {
        return None;
    }
    Some(std_dev(values)? / m.abs())
}

/// Fit `y = slope * x + intercept` with `x = 0, 1, 2, ...`
///
/// Needs at least two points.
pub fn linear_trend(values: &[f64]) -> Option<Trend> {
    if values.len() < 2 {
        return None;
    }

    let n = values.len() as f64;
    let x_mean = (n - 1.0) / 2.0;
    let y_mean = mean(values)?;

    let mut sxy = 0.0;
    let mut sxx = 0.0;
    let mut syy = 0.0;
    for (i, y) in values.iter().enumerate() {
        let dx = i as f64 - x_mean;
        let dy = y - y_mean;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }

    let slope = sxy / sxx;
    let intercept = y_mean - slope * x_mean;
    let r_squared = if syy == 0.0 {
        1.0
    } else {
        ((sxy * sxy) / (sxx * syy)).clamp(0.0, 1.0)
    };

    let scale = 1.0 + y_mean.abs();
    let direction = if slope.abs() <= FLAT_SLOPE_EPSILON * scale {
        TrendDirection::Stable
    } else if slope > 0.0 {
        TrendDirection::Increasing
    } else {
        TrendDirection::Decreasing
    };

    let strength = if y_mean.abs() < f64::EPSILON {
        0.0
    } else {
        slope.abs() / y_mean.abs()
    };

    Some(Trend {
        slope,
        intercept,
        r_squared,
        direction,
        strength,
    })
}

/// Pearson correlation of two equally long series
pub fn correlation(a: &[f64], b: &[f64]) -> Option<f64> {
    if a.len() != b.len() || a.len() < 2 {
        return None;
    }

    let ma = mean(a)?;
    let mb = mean(b)?;

    let mut cov = 0.0;
    let mut va = 0.0;
    let mut vb = 0.0;
    for (x, y) in a.iter().zip(b) {
        cov += (x - ma) * (y - mb);
        va += (x - ma).powi(2);
        vb += (y - mb).powi(2);
    }

    if va == 0.0 || vb == 0.0 {
        return None;
    }

    Some(cov / (va.sqrt() * vb.sqrt()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_and_spread() {
        assert_eq!(mean(&[]), None);
        assert_eq!(mean(&[2.0, 4.0, 6.0]), Some(4.0));
        assert_eq!(variance(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]), Some(4.0));
        assert_eq!(std_dev(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]), Some(2.0));
        assert_eq!(std_dev(&[5.0]), Some(0.0));
    }

    #[test]
    fn test_coefficient_of_variation_guards_zero_mean() {
        assert_eq!(coefficient_of_variation(&[0.0, 0.0]), None);
        assert_eq!(coefficient_of_variation(&[10.0, 10.0]), Some(0.0));
    }

    #[test]
    fn test_linear_trend_increasing() {
        let trend = linear_trend(&[10.0, 20.0, 30.0, 40.0]).unwrap();
        assert!((trend.slope - 10.0).abs() < 1e-9);
        assert!((trend.intercept - 10.0).abs() < 1e-9);
        assert!((trend.r_squared - 1.0).abs() < 1e-9);
        assert_eq!(trend.direction, TrendDirection::Increasing);
        assert!((trend.strength - 0.4).abs() < 1e-9);
    }

    #[test]
    fn test_linear_trend_flat_and_degenerate() {
        let flat = linear_trend(&[7.0, 7.0, 7.0]).unwrap();
        assert_eq!(flat.direction, TrendDirection::Stable);
        assert_eq!(flat.strength, 0.0);

        let down = linear_trend(&[9.0, 6.0, 3.0]).unwrap();
        assert_eq!(down.direction, TrendDirection::Decreasing);

        assert!(linear_trend(&[1.0]).is_none());
        assert!(linear_trend(&[]).is_none());
    }

    #[test]
    fn test_correlation() {
        let a = [1.0, 2.0, 3.0, 4.0];
        let b = [2.0, 4.0, 6.0, 8.0];
        let c = [8.0, 6.0, 4.0, 2.0];
        assert!((correlation(&a, &b).unwrap() - 1.0).abs() < 1e-9);
        assert!((correlation(&a, &c).unwrap() + 1.0).abs() < 1e-9);
        assert_eq!(correlation(&a, &[1.0, 1.0, 1.0, 1.0]), None);
        assert_eq!(correlation(&a, &b[..3]), None);
    }
}
