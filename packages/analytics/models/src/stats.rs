//! Order statistics over price-per-m² samples.
//!
//! All functions expect values sorted ascending with [`f64::total_cmp`]
//! where noted.

/// Sorts values ascending in place.
pub fn sort_values(values: &mut [f64]) {
    values.sort_by(f64::total_cmp);
}

/// Nearest-rank quantile: the sample at `round(q * (n - 1))`.
///
/// Halfway ranks round away from zero. `q` is clamped to `[0, 1]`. Returns
/// `None` for an empty slice.
#[must_use]
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn quantile(sorted: &[f64], q: f64) -> Option<f64> {
    let last = sorted.len().checked_sub(1)?;
    let rank = (q.clamp(0.0, 1.0) * last as f64).round() as usize;
    sorted.get(rank.min(last)).copied()
}

/// Median; the average of the two middle values for even counts.
#[must_use]
pub fn median(sorted: &[f64]) -> Option<f64> {
    let n = sorted.len();
    if n == 0 {
        return None;
    }
    let mid = n / 2;
    if n.is_multiple_of(2) {
        Some(f64::midpoint(sorted[mid - 1], sorted[mid]))
    } else {
        Some(sorted[mid])
    }
}

/// Arithmetic mean. Returns `None` for an empty slice.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn median_of_even_count_averages_middle_pair() {
        let values: Vec<f64> = (0..12).map(|i| 3000.0 + 100.0 * f64::from(i)).collect();
        assert!(close(median(&values).unwrap(), 3550.0));
        assert!(close(median(&[1.0, 2.0, 10.0]).unwrap(), 2.0));
        assert_eq!(median(&[]), None);
    }

    #[test]
    fn nearest_rank_quantiles() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert!(close(quantile(&values, 0.25).unwrap(), 2.0));
        assert!(close(quantile(&values, 0.1).unwrap(), 1.0));
        assert!(close(quantile(&values, 0.9).unwrap(), 5.0));
        assert!(close(quantile(&values, 1.0).unwrap(), 5.0));
        assert!(close(quantile(&[7.0], 0.9).unwrap(), 7.0));
        assert_eq!(quantile(&[], 0.5), None);
    }

    #[test]
    fn quantiles_pick_samples_not_interpolations() {
        let values: Vec<f64> = (0..12).map(|i| 3000.0 + 100.0 * f64::from(i)).collect();
        assert!(close(quantile(&values, 0.25).unwrap(), 3300.0));
        assert!(close(quantile(&values, 0.75).unwrap(), 3800.0));
        assert!(close(quantile(&values, 0.1).unwrap(), 3100.0));
        assert!(close(quantile(&values, 0.9).unwrap(), 4000.0));
    }

    #[test]
    fn halfway_rank_rounds_up() {
        let values = [3.0, 5.0, 8.0, 13.0];
        assert!(close(quantile(&values, 0.5).unwrap(), 8.0));
        assert!(close(median(&values).unwrap(), 6.5));
    }

    #[test]
    fn mean_and_sort() {
        let mut values = vec![4.0, 1.0, 3.0];
        sort_values(&mut values);
        assert_eq!(values, vec![1.0, 3.0, 4.0]);
        assert!(close(mean(&values).unwrap(), 8.0 / 3.0));
        assert_eq!(mean(&[]), None);
    }
}
