//! Query Planner
//!
//! Selects which queries of a suite a run covers.
//!
//! Filtering options:
//! - Regex pattern matching on query ID
//! - Category filtering
//!
//! Ordering: queries keep their suite order (file order, or sorted file names
//! for directory suites), which is already deterministic.

use fxhash::FxHashSet;
use regex::Regex;
use stratabench_core::{Query, QuerySuite};

/// Queries selected for a run
pub struct QueryPlan<'a> {
    /// Selected queries in suite order
    pub queries: Vec<&'a Query>,
    /// Ids of selected queries already present in the result log
    pub completed: FxHashSet<&'a str>,
}

impl<'a> QueryPlan<'a> {
    /// Selected queries the log does not have yet
    pub fn pending(&self) -> impl Iterator<Item = &'a Query> + '_ {
        self.queries
            .iter()
            .copied()
            .filter(|q| !self.completed.contains(q.id.as_str()))
    }

    pub fn pending_count(&self) -> usize {
        self.queries.len() - self.completed.len()
    }
}

/// Build the plan for `suite`
pub fn build_plan<'a>(
    suite: &'a QuerySuite,
    filter: Option<&Regex>,
    category: Option<&str>,
    logged: &FxHashSet<String>,
) -> QueryPlan<'a> {
    let queries: Vec<&Query> = suite
        .iter()
        .filter(|q| filter.is_none_or(|re| re.is_match(&q.id)))
        .filter(|q| category.is_none_or(|c| q.category.eq_ignore_ascii_case(c)))
        .collect();
    let completed = queries
        .iter()
        .filter(|q| logged.contains(&q.id))
        .map(|q| q.id.as_str())
        .collect();
    QueryPlan { queries, completed }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::{Path, PathBuf};

    fn suite() -> QuerySuite {
        let q = |id: &str, category: &str| Query {
            id: id.to_string(),
            category: category.to_string(),
            formula: format!("fof({id}, conjecture, $true)."),
            source: PathBuf::from("suite.p"),
        };
        QuerySuite::new(
            vec![
                q("test_wk_2", "Weekday"),
                q("test_add_1", "Core arithmetic"),
                q("test_wk_1", "Weekday"),
            ],
            Path::new("suite.p"),
        )
        .unwrap()
    }

    #[test]
    fn test_no_filter_keeps_suite_order() {
        let suite = suite();
        let plan = build_plan(&suite, None, None, &FxHashSet::default());
        let ids: Vec<&str> = plan.queries.iter().map(|q| q.id.as_str()).collect();
        assert_eq!(ids, ["test_wk_2", "test_add_1", "test_wk_1"]);
        assert_eq!(plan.pending_count(), 3);
    }

    #[test]
    fn test_regex_and_category_filters() {
        let suite = suite();
        let re = Regex::new("_wk_").unwrap();
        let plan = build_plan(&suite, Some(&re), None, &FxHashSet::default());
        assert_eq!(plan.queries.len(), 2);

        let plan = build_plan(&suite, None, Some("core arithmetic"), &FxHashSet::default());
        assert_eq!(plan.queries.len(), 1);
        assert_eq!(plan.queries[0].id, "test_add_1");
    }

    #[test]
    fn test_completed_ids_counted_within_selection() {
        let suite = suite();
        let logged: FxHashSet<String> = ["test_wk_1", "test_other"].iter().map(|s| s.to_string()).collect();
        let plan = build_plan(&suite, None, None, &logged);
        assert_eq!(plan.completed.len(), 1);
        let pending: Vec<&str> = plan.pending().map(|q| q.id.as_str()).collect();
        assert_eq!(pending, ["test_wk_2", "test_add_1"]);
    }
}
