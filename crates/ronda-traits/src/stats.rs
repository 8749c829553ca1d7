//! Statistical utility functions.
//!
//! Shared by the normalizer, the IC engine and the combiners: moments,
//! correlations, tie-aware ranks, quantiles and z-score standardization.
//! Functions that can be undefined return `Option` instead of NaN.

use std::cmp::Ordering;

use ndarray::Array1;

/// Minimum threshold for standard deviation to avoid division by zero.
/// Values below this threshold are treated as zero variance.
pub const MIN_STD_THRESHOLD: f64 = 1e-10;

/// Consistency constant turning a MAD into a normal-equivalent sigma.
pub const MAD_SCALE: f64 = 1.4826;

/// Arithmetic mean, `None` for empty input.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample standard deviation (N-1 denominator), `None` when fewer than 2 values.
pub fn sample_std(values: &[f64]) -> Option<f64> {
    let n = values.len();
    if n < 2 {
        return None;
    }
    let m = mean(values)?;
    let variance = values.iter().map(|x| (x - m).powi(2)).sum::<f64>() / (n - 1) as f64;
    Some(variance.sqrt())
}

/// Whether the values cannot support a correlation: fewer than 2 or (near) constant.
pub fn is_degenerate(values: &[f64]) -> bool {
    sample_std(values).is_none_or(|s| s <= MIN_STD_THRESHOLD)
}

/// Sample Pearson correlation.
///
/// Returns `None` for mismatched lengths, fewer than 2 pairs, or when either
/// side is constant. A constant side has no defined correlation and must not
/// be reported as 0.
pub fn pearson(x: &[f64], y: &[f64]) -> Option<f64> {
    let n = x.len();
    if n != y.len() || n < 2 || is_degenerate(x) || is_degenerate(y) {
        return None;
    }
    let mx = mean(x)?;
    let my = mean(y)?;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (a, b) in x.iter().zip(y) {
        let dx = a - mx;
        let dy = b - my;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    let r = cov / (var_x.sqrt() * var_y.sqrt());
    Some(r.clamp(-1.0, 1.0))
}

/// Spearman correlation: Pearson on average ranks.
pub fn spearman(x: &[f64], y: &[f64]) -> Option<f64> {
    if x.len() != y.len() {
        return None;
    }
    pearson(&average_ranks(x), &average_ranks(y))
}

/// 1-based ranks with ties sharing the average rank of their group.
///
/// # Examples
///
/// ```
/// use ronda_traits::stats::average_ranks;
///
/// assert_eq!(average_ranks(&[1.0, 2.0, 2.0, 3.0]), vec![1.0, 2.5, 2.5, 4.0]);
/// ```
pub fn average_ranks(values: &[f64]) -> Vec<f64> {
    let n = values.len();
    let mut indexed: Vec<(usize, f64)> = values.iter().copied().enumerate().collect();
    indexed.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal));

    let mut ranks = vec![0.0; n];
    let mut i = 0;
    while i < n {
        let mut j = i;
        while j < n && indexed[j].1 == indexed[i].1 {
            j += 1;
        }
        // positions i..j hold ranks i+1..=j
        let avg_rank = (i + 1 + j) as f64 / 2.0;
        for item in &indexed[i..j] {
            ranks[item.0] = avg_rank;
        }
        i = j;
    }
    ranks
}

/// Average ranks divided by the count: percentile ranks in (0, 1].
pub fn percentile_ranks(values: &[f64]) -> Vec<f64> {
    let n = values.len() as f64;
    average_ranks(values).into_iter().map(|r| r / n).collect()
}

/// Quantile with linear interpolation between order statistics.
///
/// `q` is clamped to `[0, 1]`. Returns `None` for empty input.
pub fn quantile(values: &[f64], q: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    Some(quantile_sorted(&sorted, q))
}

fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    sorted[lo] + frac * (sorted[hi] - sorted[lo])
}

/// Median, `None` for empty input.
pub fn median(values: &[f64]) -> Option<f64> {
    quantile(values, 0.5)
}

/// Unscaled median absolute deviation from the median.
pub fn mad(values: &[f64]) -> Option<f64> {
    let m = median(values)?;
    let deviations: Vec<f64> = values.iter().map(|x| (x - m).abs()).collect();
    median(&deviations)
}

/// Z-score standardization result containing computed statistics.
#[derive(Debug, Clone, Copy)]
pub struct StandardizeResult {
    /// The computed mean of the input values.
    pub mean: f64,
    /// The computed sample standard deviation (N-1 denominator).
    pub std: f64,
    /// Whether the standardization was applied (false if variance was too low).
    pub applied: bool,
}

/// Standardize values to z-scores (mean=0, std=1).
///
/// Uses sample standard deviation. If the standard deviation is at or below
/// [`MIN_STD_THRESHOLD`] the values are returned unchanged: zeroing them
/// would manufacture a signal that was never there.
///
/// # Examples
///
/// ```
/// use ronda_traits::stats::standardize;
///
/// let (z, result) = standardize(&[1.0, 2.0, 3.0, 4.0, 5.0]);
/// assert!(result.applied);
/// assert!((z[2]).abs() < 1e-12);
///
/// let (same, result) = standardize(&[7.0, 7.0, 7.0]);
/// assert!(!result.applied);
/// assert_eq!(same, vec![7.0, 7.0, 7.0]);
/// ```
pub fn standardize(values: &[f64]) -> (Vec<f64>, StandardizeResult) {
    let mean_v = mean(values).unwrap_or(f64::NAN);
    let std = sample_std(values).unwrap_or(0.0);
    let applied = std > MIN_STD_THRESHOLD;

    let out = if applied {
        values.iter().map(|x| (x - mean_v) / std).collect()
    } else {
        values.to_vec()
    };

    (
        out,
        StandardizeResult {
            mean: mean_v,
            std,
            applied,
        },
    )
}

/// Standardize an ndarray column for model input.
///
/// Unlike [`standardize`], a constant column becomes all zeros so it carries
/// no weight in a fitted model.
pub fn standardize_array(scores: &Array1<f64>) -> (Array1<f64>, StandardizeResult) {
    if scores.is_empty() {
        return (
            Array1::zeros(0),
            StandardizeResult {
                mean: f64::NAN,
                std: f64::NAN,
                applied: false,
            },
        );
    }

    let mean = scores.mean().unwrap_or(0.0);
    let std = if scores.len() > 1 { scores.std(1.0) } else { 0.0 };
    let applied = std > MIN_STD_THRESHOLD;

    let standardized = if applied {
        (scores - mean) / std
    } else {
        Array1::zeros(scores.len())
    };

    (standardized, StandardizeResult { mean, std, applied })
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use rstest::rstest;

    use super::*;

    #[test]
    fn test_mean_and_std() {
        assert_eq!(mean(&[]), None);
        assert_abs_diff_eq!(mean(&[1.0, 2.0, 3.0]).unwrap(), 2.0);
        assert_eq!(sample_std(&[1.0]), None);
        assert_abs_diff_eq!(sample_std(&[1.0, 2.0, 3.0, 4.0]).unwrap(), 1.2909944487358056, epsilon = 1e-12);
    }

    #[test]
    fn test_pearson_perfect() {
        let r = pearson(&[1.0, 2.0, 3.0], &[2.0, 4.0, 6.0]).unwrap();
        assert_abs_diff_eq!(r, 1.0, epsilon = 1e-12);
        let r = pearson(&[1.0, 2.0, 3.0], &[3.0, 2.0, 1.0]).unwrap();
        assert_abs_diff_eq!(r, -1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_pearson_undefined_for_constant() {
        assert_eq!(pearson(&[1.0, 1.0, 1.0], &[1.0, 2.0, 3.0]), None);
        assert_eq!(pearson(&[1.0, 2.0, 3.0], &[5.0, 5.0, 5.0]), None);
        assert_eq!(pearson(&[1.0], &[1.0]), None);
        assert_eq!(pearson(&[1.0, 2.0], &[1.0]), None);
    }

    #[rstest]
    #[case(vec![3.0, 1.0, 2.0, 5.0, 4.0], vec![3.0, 1.0, 2.0, 5.0, 4.0])]
    #[case(vec![1.0, 2.0, 2.0, 3.0], vec![1.0, 2.5, 2.5, 4.0])]
    #[case(vec![7.0, 7.0, 7.0], vec![2.0, 2.0, 2.0])]
    #[case(vec![2.0, 1.0, 2.0, 1.0], vec![3.5, 1.5, 3.5, 1.5])]
    fn test_average_ranks(#[case] values: Vec<f64>, #[case] expected: Vec<f64>) {
        assert_eq!(average_ranks(&values), expected);
    }

    #[test]
    fn test_percentile_ranks_in_unit_interval() {
        let p = percentile_ranks(&[10.0, 30.0, 20.0, 20.0]);
        assert_eq!(p, vec![0.25, 1.0, 0.625, 0.625]);
        assert!(p.iter().all(|&v| v > 0.0 && v <= 1.0));
    }

    #[rstest]
    #[case(vec![1.0, 2.0, 3.0, 4.0, 5.0], vec![5.0, 6.0, 7.0, 8.0, 7.0])]
    #[case(vec![1.0, 1.0, 2.0, 2.0, 3.0], vec![0.3, 0.1, 0.1, 0.2, 0.5])]
    #[case(vec![0.0, 1.0, 0.0, 1.0, 1.0, 0.0], vec![-1.0, 2.0, 0.5, 0.5, 3.0, -2.0])]
    fn test_spearman_equals_pearson_on_ranks(#[case] x: Vec<f64>, #[case] y: Vec<f64>) {
        let s = spearman(&x, &y).unwrap();
        let p = pearson(&average_ranks(&x), &average_ranks(&y)).unwrap();
        assert_abs_diff_eq!(s, p, epsilon = 1e-12);
    }

    #[test]
    fn test_quantile_linear() {
        let v = [1.0, 2.0, 3.0, 4.0];
        assert_abs_diff_eq!(quantile(&v, 0.0).unwrap(), 1.0);
        assert_abs_diff_eq!(quantile(&v, 1.0).unwrap(), 4.0);
        assert_abs_diff_eq!(quantile(&v, 0.5).unwrap(), 2.5);
        assert_abs_diff_eq!(quantile(&v, 0.25).unwrap(), 1.75);
        assert_eq!(quantile(&[], 0.5), None);
    }

    #[test]
    fn test_median_and_mad() {
        let v = [1.0, 2.0, 3.0, 4.0, 100.0];
        assert_abs_diff_eq!(median(&v).unwrap(), 3.0);
        assert_abs_diff_eq!(mad(&v).unwrap(), 1.0);
    }

    #[test]
    fn test_standardize_basic() {
        let (z, result) = standardize(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        assert!(result.applied);
        assert_abs_diff_eq!(result.mean, 3.0);
        assert_abs_diff_eq!(mean(&z).unwrap(), 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(sample_std(&z).unwrap(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_standardize_constant_passes_through() {
        let (z, result) = standardize(&[5.0, 5.0, 5.0]);
        assert!(!result.applied);
        assert_eq!(z, vec![5.0, 5.0, 5.0]);
    }

    #[test]
    fn test_min_std_threshold() {
        let values = [1.0, 1.0 + 1e-12, 1.0 - 1e-12, 1.0 + 2e-12, 1.0 - 2e-12];
        let (_, result) = standardize(&values);
        assert!(!result.applied);
        assert!(is_degenerate(&values));
    }

    #[test]
    fn test_standardize_array_constant_zeroed() {
        let (z, result) = standardize_array(&Array1::from_vec(vec![5.0, 5.0, 5.0, 5.0]));
        assert!(!result.applied);
        assert!(z.iter().all(|&x| x == 0.0));
    }
}
