#![warn(missing_docs)]
//! StrataBench Statistics
//!
//! Percentiles and latency summaries over per-query elapsed times:
//! - Linear-interpolated percentiles (median)
//! - Nearest-rank percentiles (tail columns in category tables)
//! - Count/min/max/mean summaries that return `None` on empty input

mod percentiles;
mod summary;

pub use percentiles::{compute_percentile, nearest_rank_percentile};
pub use summary::{SummaryStatistics, compute_summary};

/// Percentile reported as the tail column in tables
pub const TAIL_PERCENTILE: f64 = 90.0;
