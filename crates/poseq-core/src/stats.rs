//! Statistical helper functions shared by the pipeline stages.
//!
//! - Basic statistics (mean, median)
//! - Confidence-weighted median
//! - Least-squares line fitting for trend prediction

use std::cmp::Ordering;

// === Statistical Functions ===

/// Calculate the arithmetic mean of a slice of values.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Calculate the median of a slice of values.
pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Weighted median of `(value, weight)` samples.
///
/// Samples are sorted by value; the result is the first value at which the
/// cumulative weight reaches half the total. When the cumulative weight lands
/// exactly on half, the result is the midpoint with the next value, so equal
/// weights reduce to the ordinary median. Returns `None` when the total weight
/// is not positive.
pub fn weighted_median(samples: &[(f64, f64)]) -> Option<f64> {
    let total: f64 = samples.iter().map(|&(_, w)| w.max(0.0)).sum();
    if total <= 0.0 {
        return None;
    }

    let mut sorted: Vec<(f64, f64)> = samples
        .iter()
        .filter(|&&(_, w)| w > 0.0)
        .copied()
        .collect();
    sorted.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));

    let half = total / 2.0;
    let mut cumulative = 0.0;
    for (i, &(value, weight)) in sorted.iter().enumerate() {
        cumulative += weight;
        if (cumulative - half).abs() <= 1e-12 * total {
            return Some(match sorted.get(i + 1) {
                Some(&(next, _)) => (value + next) / 2.0,
                None => value,
            });
        }
        if cumulative > half {
            return Some(value);
        }
    }
    sorted.last().map(|&(v, _)| v)
}

/// Least-squares line `y = slope * x + intercept`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineFit {
    pub slope: f64,
    pub intercept: f64,
}

impl LineFit {
    #[inline]
    pub fn predict(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

/// Fit a line through `(x, y)` points by ordinary least squares.
///
/// A single point, or points sharing one `x`, yield a flat line through the
/// mean of `y`. Returns `None` for an empty input.
pub fn linear_fit(points: &[(f64, f64)]) -> Option<LineFit> {
    if points.is_empty() {
        return None;
    }
    let n = points.len() as f64;
    let mean_x = points.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_y = points.iter().map(|p| p.1).sum::<f64>() / n;

    let mut sxx = 0.0;
    let mut sxy = 0.0;
    for &(x, y) in points {
        sxx += (x - mean_x) * (x - mean_x);
        sxy += (x - mean_x) * (y - mean_y);
    }

    if sxx <= f64::EPSILON {
        return Some(LineFit {
            slope: 0.0,
            intercept: mean_y,
        });
    }
    let slope = sxy / sxx;
    Some(LineFit {
        slope,
        intercept: mean_y - slope * mean_x,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_median() {
        assert_eq!(mean(&[]), 0.0);
        assert_eq!(mean(&[1.0, 2.0, 3.0]), 2.0);
        assert_eq!(median(&[3.0, 1.0, 2.0]), 2.0);
        assert_eq!(median(&[4.0, 1.0, 2.0, 3.0]), 2.5);
    }

    #[test]
    fn test_weighted_median_equal_weights_matches_median() {
        let samples = [(5.0, 1.0), (1.0, 1.0), (3.0, 1.0)];
        assert_eq!(weighted_median(&samples), Some(3.0));

        let even = [(1.0, 1.0), (2.0, 1.0), (3.0, 1.0), (4.0, 1.0)];
        assert_eq!(weighted_median(&even), Some(2.5));
    }

    #[test]
    fn test_weighted_median_heavy_sample_dominates() {
        let samples = [(0.0, 0.1), (10.0, 0.9), (20.0, 0.1)];
        assert_eq!(weighted_median(&samples), Some(10.0));
    }

    #[test]
    fn test_weighted_median_rejects_zero_weight() {
        assert_eq!(weighted_median(&[]), None);
        assert_eq!(weighted_median(&[(1.0, 0.0)]), None);
    }

    #[test]
    fn test_linear_fit_exact_line() {
        let points = [(0.0, 1.0), (1.0, 3.0), (2.0, 5.0)];
        let fit = linear_fit(&points).unwrap();
        assert!((fit.slope - 2.0).abs() < 1e-12);
        assert!((fit.intercept - 1.0).abs() < 1e-12);
        assert!((fit.predict(3.0) - 7.0).abs() < 1e-12);
    }

    #[test]
    fn test_linear_fit_degenerate_x() {
        let fit = linear_fit(&[(2.0, 4.0), (2.0, 6.0)]).unwrap();
        assert_eq!(fit.slope, 0.0);
        assert_eq!(fit.predict(10.0), 5.0);
        assert!(linear_fit(&[]).is_none());
    }
}
