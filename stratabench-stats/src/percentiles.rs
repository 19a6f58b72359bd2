//! Percentile Computation
//!
//! Two definitions are provided. Linear interpolation gives the usual median
//! (mean of the two middle values for even counts). Nearest-rank always
//! returns an observed value, which is what the category tables print for the
//! 90th percentile.

fn sorted(samples: &[f64]) -> Vec<f64> {
    let mut sorted: Vec<f64> = samples.iter().copied().filter(|x| !x.is_nan()).collect();
    sorted.sort_by(f64::total_cmp);
    sorted
}

/// Percentile by linear interpolation between closest ranks
///
/// Returns `None` for an empty sample set. `percentile` is clamped to `0..=100`.
///
/// ```
/// # use stratabench_stats::compute_percentile;
/// assert_eq!(compute_percentile(&[4.0, 1.0, 3.0, 2.0], 50.0), Some(2.5));
/// ```
pub fn compute_percentile(samples: &[f64], percentile: f64) -> Option<f64> {
    let sorted = sorted(samples);
    percentile_of_sorted(&sorted, percentile)
}

pub(crate) fn percentile_of_sorted(sorted: &[f64], percentile: f64) -> Option<f64> {
    let n = sorted.len();
    match n {
        0 => None,
        1 => Some(sorted[0]),
        _ => {
            let p = percentile.clamp(0.0, 100.0) / 100.0;
            let rank = p * (n - 1) as f64;
            let lower = rank.floor() as usize;
            let upper = (lower + 1).min(n - 1);
            let fraction = rank - lower as f64;
            Some(sorted[lower] + fraction * (sorted[upper] - sorted[lower]))
        }
    }
}

/// Percentile by the nearest-rank method: the value at index `ceil(p*n) - 1`
///
/// ```
/// # use stratabench_stats::nearest_rank_percentile;
/// let ms: Vec<f64> = (1..=10).map(f64::from).collect();
/// assert_eq!(nearest_rank_percentile(&ms, 90.0), Some(9.0));
/// ```
pub fn nearest_rank_percentile(samples: &[f64], percentile: f64) -> Option<f64> {
    let sorted = sorted(samples);
    nearest_rank_of_sorted(&sorted, percentile)
}

pub(crate) fn nearest_rank_of_sorted(sorted: &[f64], percentile: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let rank = (percentile.clamp(0.0, 100.0) * sorted.len() as f64 / 100.0).ceil() as usize;
    Some(sorted[rank.saturating_sub(1).min(sorted.len() - 1)])
}
