//! Report Data Structures
//!
//! Aggregation is a pure function of the result records: same records in,
//! same report out, regardless of the order they were written in.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use stratabench_core::{QueryResult, QueryStatus};
use stratabench_stats::{SummaryStatistics, compute_summary};

/// Label of the row summarising every category
pub const OVERALL_LABEL: &str = "All";

/// A histogram column: one tier as seen in the log
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TierColumn {
    /// 1-based position in the tier order
    pub rank: usize,
    /// Tier name as recorded in the log
    pub name: String,
}

/// Statistics for one category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryStatistics {
    /// Category name, or [`OVERALL_LABEL`] for the summary row
    pub category: String,
    /// Queries in the category
    pub queries: usize,
    /// Queries some tier proved
    pub proved: usize,
    /// Queries that ran out of tiers
    pub exhausted: usize,
    /// Queries stopped by a prover error
    pub aborted: usize,
    /// Proved share in percent
    pub success_rate: f64,
    /// Elapsed-time summary over proved queries only (ms)
    pub proved_ms: Option<SummaryStatistics>,
    /// Winning-tier counts, aligned with [`AggregateReport::tiers`]
    pub tier_histogram: Vec<usize>,
}

/// Whole-log aggregate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateReport {
    /// Histogram columns, ordered by rank
    pub tiers: Vec<TierColumn>,
    /// Sorted by category name
    pub categories: Vec<CategoryStatistics>,
    /// All categories together
    pub overall: CategoryStatistics,
}

impl AggregateReport {
    /// Total number of queries covered
    pub fn total_queries(&self) -> usize {
        self.overall.queries
    }
}

fn tier_columns(results: &[QueryResult]) -> Vec<TierColumn> {
    // Tiers are always tried from rank 1, so trace position gives the rank.
    let mut seen = BTreeSet::new();
    for r in results {
        for (i, t) in r.trace().iter().enumerate() {
            seen.insert(TierColumn {
                rank: i + 1,
                name: t.tier.clone(),
            });
        }
        if let Some(w) = r.winner() {
            seen.insert(TierColumn {
                rank: w.rank,
                name: w.name.clone(),
            });
        }
    }
    seen.into_iter().collect()
}

fn category_statistics(
    category: &str,
    results: &[&QueryResult],
    tiers: &[TierColumn],
) -> CategoryStatistics {
    let count = |status: QueryStatus| results.iter().filter(|r| r.status() == status).count();
    let proved = count(QueryStatus::Proved);

    let proved_ms: Vec<f64> = results
        .iter()
        .filter(|r| r.status() == QueryStatus::Proved)
        .map(|r| r.total_ms())
        .collect();

    let mut tier_histogram = vec![0; tiers.len()];
    for w in results.iter().filter_map(|r| r.winner()) {
        if let Some(i) = tiers
            .iter()
            .position(|t| t.rank == w.rank && t.name == w.name)
        {
            tier_histogram[i] += 1;
        }
    }

    CategoryStatistics {
        category: category.to_string(),
        queries: results.len(),
        proved,
        exhausted: count(QueryStatus::Exhausted),
        aborted: count(QueryStatus::Aborted),
        success_rate: if results.is_empty() {
            0.0
        } else {
            proved as f64 * 100.0 / results.len() as f64
        },
        proved_ms: compute_summary(&proved_ms),
        tier_histogram,
    }
}

/// Group results by category and compute per-category statistics
pub fn aggregate(results: &[QueryResult]) -> AggregateReport {
    let tiers = tier_columns(results);

    let mut by_category: BTreeMap<&str, Vec<&QueryResult>> = BTreeMap::new();
    for r in results {
        by_category.entry(r.category()).or_default().push(r);
    }

    let categories = by_category
        .iter()
        .map(|(category, rs)| category_statistics(category, rs, &tiers))
        .collect();

    let all: Vec<&QueryResult> = results.iter().collect();
    let overall = category_statistics(OVERALL_LABEL, &all, &tiers);

    AggregateReport {
        tiers,
        categories,
        overall,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stratabench_core::{AttemptOutcome, TierTrace, Winner};

    fn tt(tier: &str, outcome: AttemptOutcome, ms: u64) -> TierTrace {
        TierTrace {
            tier: tier.to_string(),
            outcome,
            szs_status: String::new(),
            elapsed_us: ms * 1000,
        }
    }

    fn sample_results() -> Vec<QueryResult> {
        let win = |rank: usize, name: &str| {
            Some(Winner {
                rank,
                name: name.to_string(),
            })
        };
        vec![
            QueryResult::new(
                "test_wk_1",
                "Weekday",
                QueryStatus::Proved,
                win(1, "Best0"),
                vec![tt("Best0", AttemptOutcome::Proved, 20)],
            ),
            QueryResult::new(
                "test_wk_2",
                "Weekday",
                QueryStatus::Proved,
                win(2, "Best1"),
                vec![
                    tt("Best0", AttemptOutcome::TimedOut, 1000),
                    tt("Best1", AttemptOutcome::Proved, 40),
                ],
            ),
            QueryResult::new(
                "test_wk_3",
                "Weekday",
                QueryStatus::Exhausted,
                None,
                vec![
                    tt("Best0", AttemptOutcome::TimedOut, 1000),
                    tt("Best1", AttemptOutcome::Indeterminate, 5),
                ],
            ),
            QueryResult::new(
                "test_add_1",
                "Core arithmetic",
                QueryStatus::Aborted,
                None,
                vec![tt("Best0", AttemptOutcome::Error, 3)],
            ),
        ]
    }

    #[test]
    fn test_categories_sorted_with_counts() {
        let report = aggregate(&sample_results());
        let names: Vec<_> = report.categories.iter().map(|c| c.category.as_str()).collect();
        assert_eq!(names, ["Core arithmetic", "Weekday"]);

        let wk = &report.categories[1];
        assert_eq!((wk.queries, wk.proved, wk.exhausted, wk.aborted), (3, 2, 1, 0));
        assert!((wk.success_rate - 200.0 / 3.0).abs() < 1e-9);

        let ms = wk.proved_ms.unwrap();
        assert_eq!(ms.count, 2);
        assert_eq!(ms.median, 530.0);
        assert_eq!(ms.max, 1040.0);
    }

    #[test]
    fn test_histogram_by_rank() {
        let report = aggregate(&sample_results());
        let cols: Vec<_> = report.tiers.iter().map(|t| (t.rank, t.name.as_str())).collect();
        assert_eq!(cols, [(1, "Best0"), (2, "Best1")]);
        assert_eq!(report.categories[1].tier_histogram, [1, 1]);
        assert_eq!(report.categories[0].tier_histogram, [0, 0]);
        assert_eq!(report.overall.tier_histogram, [1, 1]);
    }

    #[test]
    fn test_no_proofs_gives_no_latency() {
        let report = aggregate(&sample_results());
        let core = &report.categories[0];
        assert_eq!(core.proved, 0);
        assert!(core.proved_ms.is_none());
        assert_eq!(core.success_rate, 0.0);
    }

    #[test]
    fn test_order_independent() {
        let mut results = sample_results();
        let forward = aggregate(&results);
        results.reverse();
        assert_eq!(aggregate(&results), forward);
    }

    #[test]
    fn test_overall_row() {
        let report = aggregate(&sample_results());
        assert_eq!(report.overall.category, OVERALL_LABEL);
        assert_eq!(report.total_queries(), 4);
        assert_eq!(report.overall.proved, 2);
    }
}
