// ============================================================
// Layer 4b: Summary Statistics
// ============================================================
// The small numeric kernels every feature builder shares.
//
//   mean        → arithmetic mean, None for an empty slice
//   sample_std  → n-1 standard deviation, 0 below two values
//   quantile    → linear interpolation between order statistics:
//                 position = (n - 1) * q, blend the two
//                 neighbouring sorted values
//   top_n_mean  → mean of the last n values after an ascending sort
//   bucket_fractions → share of values in each right-closed
//                 (lo, hi] interval, over ALL values given

use crate::domain::{FeatureError, FeatureResult};

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Sample standard deviation. Fewer than two values have no spread.
pub fn sample_std(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return 0.0;
    }
    let m = values.iter().sum::<f64>() / n as f64;
    let ss: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    (ss / (n - 1) as f64).sqrt()
}

/// Sort a copy of `values` ascending. NaNs sort last.
pub fn sorted(values: &[f64]) -> Vec<f64> {
    let mut v = values.to_vec();
    v.sort_by(|a, b| a.total_cmp(b));
    v
}

/// Quantile `q` in [0, 1] of an ascending-sorted slice.
pub fn quantile_sorted(sorted: &[f64], q: f64) -> FeatureResult<f64> {
    if sorted.is_empty() {
        return Err(FeatureError::EmptyInput("quantile of an empty set".to_string()));
    }
    if !(0.0..=1.0).contains(&q) {
        return Err(FeatureError::InvalidParameter(format!(
            "quantile {q} outside [0, 1]"
        )));
    }

    let pos = (sorted.len() - 1) as f64 * q;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    Ok(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

pub fn quantile(values: &[f64], q: f64) -> FeatureResult<f64> {
    quantile_sorted(&sorted(values), q)
}

/// Mean of the `n` largest entries of an ascending-sorted slice
/// (all of them when there are fewer than `n`).
pub fn top_n_mean(sorted: &[f64], n: usize) -> Option<f64> {
    let start = sorted.len().saturating_sub(n);
    mean(&sorted[start..])
}

/// Fraction of `values` falling in each (edges[i], edges[i+1]] interval.
///
/// The denominator is every value passed in, so values outside all
/// intervals make the fractions sum to less than one. An empty input
/// yields all-zero fractions.
pub fn bucket_fractions(values: &[f64], edges: &[f64]) -> Vec<f64> {
    let n_buckets = edges.len().saturating_sub(1);
    let mut counts = vec![0usize; n_buckets];

    for &v in values {
        if let Some(b) = edges.windows(2).position(|w| v > w[0] && v <= w[1]) {
            counts[b] += 1;
        }
    }

    if values.is_empty() {
        return vec![0.0; n_buckets];
    }
    counts
        .into_iter()
        .map(|c| c as f64 / values.len() as f64)
        .collect()
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_mean_and_std() {
        let v = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert!(close(mean(&v).unwrap(), 5.0));
        // sample (n-1) standard deviation
        assert!(close(sample_std(&v), (32.0f64 / 7.0).sqrt()));
        assert_eq!(mean(&[]), None);
        assert_eq!(sample_std(&[3.0]), 0.0);
    }

    #[test]
    fn test_quantile_interpolates() {
        let v = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert!(close(quantile(&v, 0.0).unwrap(), 1.0));
        assert!(close(quantile(&v, 0.5).unwrap(), 3.0));
        assert!(close(quantile(&v, 0.2).unwrap(), 1.8));
        assert!(close(quantile(&[5.0, 1.0, 3.0, 2.0, 4.0], 0.8).unwrap(), 4.2));
    }

    #[test]
    fn test_quantile_of_empty_is_error() {
        assert!(matches!(quantile(&[], 0.5), Err(FeatureError::EmptyInput(_))));
        assert!(matches!(quantile(&[1.0], 1.5), Err(FeatureError::InvalidParameter(_))));
    }

    #[test]
    fn test_top_n_mean_takes_the_tail() {
        let v = [1.0, 2.0, 3.0, 10.0];
        assert!(close(top_n_mean(&v, 2).unwrap(), 6.5));
        assert!(close(top_n_mean(&v, 20).unwrap(), 4.0));
    }

    #[test]
    fn test_bucket_fractions_are_right_closed() {
        let edges = [1.0, 5.0, 7.0, 10.0, 100.0];
        let f = bucket_fractions(&[4.0, 5.0, 6.0, 7.0, 8.0, 200.0], &edges);
        // 4,5 | 6,7 | 8 | - ; 200 falls outside every bucket
        assert_eq!(f.len(), 4);
        assert!(close(f[0], 2.0 / 6.0));
        assert!(close(f[1], 2.0 / 6.0));
        assert!(close(f[2], 1.0 / 6.0));
        assert!(close(f[3], 0.0));
        assert!(f.iter().sum::<f64>() <= 1.0);
    }

    #[test]
    fn test_bucket_fractions_empty_input() {
        assert_eq!(bucket_fractions(&[], &[0.0, 1.0, 2.0]), vec![0.0, 0.0]);
    }
}
