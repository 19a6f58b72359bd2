//! Summary Statistics
//!
//! Latency summary for a set of elapsed times (milliseconds). All values come
//! from the full sample set; solve times are heavy-tailed and the tail is the
//! interesting part.

use crate::TAIL_PERCENTILE;
use crate::percentiles::{nearest_rank_of_sorted, percentile_of_sorted};
use serde::{Deserialize, Serialize};

/// Summary of a non-empty sample set
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SummaryStatistics {
    /// Number of samples
    pub count: usize,
    /// Smallest sample
    pub min: f64,
    /// Largest sample
    pub max: f64,
    /// Arithmetic mean
    pub mean: f64,
    /// Linear-interpolated median
    pub median: f64,
    /// Nearest-rank tail percentile (90th)
    pub p90: f64,
}

/// Summarize `samples`, or `None` when there is nothing to summarize
pub fn compute_summary(samples: &[f64]) -> Option<SummaryStatistics> {
    let mut sorted: Vec<f64> = samples.iter().copied().filter(|x| !x.is_nan()).collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_by(f64::total_cmp);

    let count = sorted.len();
    let mean = sorted.iter().sum::<f64>() / count as f64;

    Some(SummaryStatistics {
        count,
        min: sorted[0],
        max: sorted[count - 1],
        mean,
        median: percentile_of_sorted(&sorted, 50.0)?,
        p90: nearest_rank_of_sorted(&sorted, TAIL_PERCENTILE)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary() {
        let samples = [24.0, 396.0, 31.0, 1200.0, 55.0];
        let s = compute_summary(&samples).unwrap();
        assert_eq!(s.count, 5);
        assert_eq!(s.min, 24.0);
        assert_eq!(s.max, 1200.0);
        assert_eq!(s.median, 55.0);
        assert_eq!(s.p90, 1200.0);
        assert!((s.mean - 341.2).abs() < 1e-9);
    }

    #[test]
    fn test_single_sample() {
        let s = compute_summary(&[42.0]).unwrap();
        assert_eq!((s.min, s.median, s.p90, s.max), (42.0, 42.0, 42.0, 42.0));
    }

    #[test]
    fn test_empty() {
        assert!(compute_summary(&[]).is_none());
    }
}
