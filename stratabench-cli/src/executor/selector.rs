//! Tier Selector
//!
//! Drives one query through the tiers in configured order until a tier proves
//! it, policy stops it, or the tiers run out. All bookkeeping lives in
//! [`QueryProgress`]; this module only feeds it attempts.

use super::batch::BatchError;
use crate::runner::{AttemptRunner, is_spawn_failure};
use crate::shutdown::CancelToken;
use std::time::Duration;
use stratabench_core::{AttemptOutcome, ErrorPolicy, Query, QueryProgress, QueryResult, TierSet};
use tracing::debug;

/// How a query left the selector
#[derive(Debug)]
pub enum Selection {
    /// Terminal record, ready to persist
    Finished(QueryResult),
    /// The batch is shutting down; nothing is persisted for this query
    Interrupted,
}

/// First-success-wins tier iteration
pub struct TierSelector<'a, R: AttemptRunner> {
    runner: &'a R,
    tiers: &'a TierSet,
    policy: ErrorPolicy,
    query_ceiling: Option<Duration>,
}

impl<'a, R: AttemptRunner> TierSelector<'a, R> {
    pub fn new(runner: &'a R, tiers: &'a TierSet, policy: ErrorPolicy) -> Self {
        Self {
            runner,
            tiers,
            policy,
            query_ceiling: None,
        }
    }

    /// Cap the wall time one query may spend across all of its tiers
    pub fn with_query_ceiling(mut self, ceiling: Option<Duration>) -> Self {
        self.query_ceiling = ceiling;
        self
    }

    /// Try the tiers for `query` in order
    pub fn solve(&self, query: &Query, cancel: &CancelToken) -> Result<Selection, BatchError> {
        let mut progress = QueryProgress::new(query, self.tiers.len(), self.policy);
        let mut spent = Duration::ZERO;

        while let Some(index) = progress.next_tier() {
            let tier = self
                .tiers
                .get(index)
                .ok_or_else(|| BatchError::Internal(format!("tier index {index} out of range")))?;

            let mut limit = tier.time_limit();
            if let Some(ceiling) = self.query_ceiling {
                let remaining = ceiling.saturating_sub(spent);
                if remaining.is_zero() {
                    debug!(query = %query.id, ?ceiling, "query budget spent");
                    progress.exhaust();
                    break;
                }
                limit = limit.min(remaining);
            }

            if cancel.is_cancelled() {
                return Ok(Selection::Interrupted);
            }
            let attempt = self.runner.run_attempt(query, tier, limit, cancel)?;

            if is_spawn_failure(&attempt) {
                return Err(BatchError::Spawn {
                    query: query.id.clone(),
                    tier: tier.name().to_string(),
                    detail: attempt.detail.unwrap_or_default(),
                });
            }
            if attempt.outcome == AttemptOutcome::Interrupted {
                return Ok(Selection::Interrupted);
            }

            spent += attempt.elapsed;
            let state = progress.record(&attempt)?;
            debug!(query = %query.id, tier = tier.name(), outcome = %attempt.outcome, ?state, "tier done");
        }

        progress
            .into_result()
            .map(Selection::Finished)
            .ok_or_else(|| BatchError::Internal(format!("query {} did not finish", query.id)))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::runner::{RunnerError, SPAWN_ERROR};
    use std::collections::HashMap;
    use std::path::PathBuf;
    use std::sync::Mutex;
    use std::time::Instant;
    use stratabench_core::{Attempt, QueryStatus, Tier};

    /// Replays scripted outcomes keyed by (query, tier name)
    #[derive(Default)]
    pub(crate) struct ScriptedRunner {
        pub script: HashMap<(String, String), (AttemptOutcome, &'static str, u64)>,
        pub calls: Mutex<Vec<(String, String, Duration)>>,
    }

    impl ScriptedRunner {
        pub fn on(
            mut self,
            query: &str,
            tier: &str,
            outcome: AttemptOutcome,
            szs: &'static str,
            ms: u64,
        ) -> Self {
            self.script
                .insert((query.to_string(), tier.to_string()), (outcome, szs, ms));
            self
        }

        pub fn calls(&self) -> Vec<(String, String, Duration)> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl AttemptRunner for ScriptedRunner {
        fn run_attempt(
            &self,
            query: &Query,
            tier: &Tier,
            limit: Duration,
            _cancel: &CancelToken,
        ) -> Result<Attempt, RunnerError> {
            self.calls
                .lock()
                .unwrap()
                .push((query.id.clone(), tier.name().to_string(), limit));
            let (outcome, szs, ms) = self
                .script
                .get(&(query.id.clone(), tier.name().to_string()))
                .copied()
                .unwrap_or((AttemptOutcome::TimedOut, "Timeout", limit.as_millis() as u64));
            Ok(Attempt {
                tier_rank: tier.rank(),
                tier_name: tier.name().to_string(),
                started: Instant::now(),
                deadline: limit,
                outcome,
                szs_status: szs.to_string(),
                elapsed: Duration::from_millis(ms).min(limit),
                exit_code: Some(0),
                output: String::new(),
                detail: (szs == SPAWN_ERROR).then(|| "failed to spawn /missing".to_string()),
            })
        }
    }

    pub(crate) fn tiers(limit_s: u64) -> TierSet {
        let names = ["Best0", "Best1", "SafeHeavy"];
        TierSet::new(
            names
                .iter()
                .map(|&n| {
                    Tier::new(
                        n,
                        PathBuf::from(format!("{n}.p")),
                        "fof(a, axiom, p).",
                        Duration::from_secs(limit_s),
                    )
                })
                .collect(),
        )
        .unwrap()
    }

    pub(crate) fn query(id: &str) -> Query {
        Query {
            id: id.to_string(),
            category: "Weekday".to_string(),
            formula: format!("fof({id}, conjecture, p)."),
            source: PathBuf::from("suite.p"),
        }
    }

    fn finished(selection: Selection) -> QueryResult {
        match selection {
            Selection::Finished(r) => r,
            Selection::Interrupted => panic!("unexpected interruption"),
        }
    }

    #[test]
    fn test_first_tier_short_circuits() {
        let runner = ScriptedRunner::default().on("q1", "Best0", AttemptOutcome::Proved, "Theorem", 24);
        let tiers = tiers(61);
        let selector = TierSelector::new(&runner, &tiers, ErrorPolicy::AbortQuery);

        let result = finished(selector.solve(&query("q1"), &CancelToken::new()).unwrap());
        assert_eq!(result.status(), QueryStatus::Proved);
        assert_eq!(result.winner().unwrap().rank, 1);
        assert_eq!(result.total_ms(), 24.0);
        assert_eq!(runner.calls().len(), 1);
    }

    #[test]
    fn test_timeouts_then_proof_sum_all_tiers() {
        let runner = ScriptedRunner::default()
            .on("q2", "Best0", AttemptOutcome::TimedOut, "Timeout", 61_000)
            .on("q2", "Best1", AttemptOutcome::TimedOut, "Timeout", 61_000)
            .on("q2", "SafeHeavy", AttemptOutcome::Proved, "Theorem", 396);
        let tiers = tiers(61);
        let selector = TierSelector::new(&runner, &tiers, ErrorPolicy::AbortQuery);

        let result = finished(selector.solve(&query("q2"), &CancelToken::new()).unwrap());
        assert_eq!(result.status(), QueryStatus::Proved);
        assert_eq!(result.winner().unwrap().name, "SafeHeavy");
        assert_eq!(result.total_ms(), 122_396.0);
        assert_eq!(result.attempts(), 3);
        // Each tier gets its own full limit.
        assert!(runner.calls().iter().all(|c| c.2 == Duration::from_secs(61)));
    }

    #[test]
    fn test_all_tiers_exhausted() {
        let runner = ScriptedRunner::default();
        let tiers = tiers(61);
        let selector = TierSelector::new(&runner, &tiers, ErrorPolicy::AbortQuery);

        let result = finished(selector.solve(&query("q3"), &CancelToken::new()).unwrap());
        assert_eq!(result.status(), QueryStatus::Exhausted);
        assert!(result.winner().is_none());
        assert_eq!(result.total_ms(), 183_000.0);
    }

    #[test]
    fn test_error_policy() {
        let runner = ScriptedRunner::default()
            .on("q4", "Best0", AttemptOutcome::Error, "InputError", 5)
            .on("q4", "Best1", AttemptOutcome::Proved, "Theorem", 7);
        let tiers = tiers(61);

        let abort = TierSelector::new(&runner, &tiers, ErrorPolicy::AbortQuery);
        let result = finished(abort.solve(&query("q4"), &CancelToken::new()).unwrap());
        assert_eq!(result.status(), QueryStatus::Aborted);
        assert_eq!(result.attempts(), 1);

        let next = TierSelector::new(&runner, &tiers, ErrorPolicy::NextTier);
        let result = finished(next.solve(&query("q4"), &CancelToken::new()).unwrap());
        assert_eq!(result.status(), QueryStatus::Proved);
        assert_eq!(result.winner().unwrap().rank, 2);
    }

    #[test]
    fn test_disproof_advances() {
        let runner = ScriptedRunner::default()
            .on("q5", "Best0", AttemptOutcome::Disproved, "CounterSatisfiable", 10)
            .on("q5", "Best1", AttemptOutcome::Proved, "Theorem", 10);
        let tiers = tiers(61);
        let selector = TierSelector::new(&runner, &tiers, ErrorPolicy::AbortQuery);

        let result = finished(selector.solve(&query("q5"), &CancelToken::new()).unwrap());
        assert_eq!(result.winner().unwrap().name, "Best1");
    }

    #[test]
    fn test_spawn_failure_is_fatal() {
        let runner = ScriptedRunner::default().on("q6", "Best0", AttemptOutcome::Error, SPAWN_ERROR, 0);
        let tiers = tiers(61);
        let selector = TierSelector::new(&runner, &tiers, ErrorPolicy::NextTier);

        let err = selector.solve(&query("q6"), &CancelToken::new()).unwrap_err();
        assert!(matches!(err, BatchError::Spawn { ref tier, .. } if tier == "Best0"));
    }

    #[test]
    fn test_query_ceiling_caps_limits() {
        let runner = ScriptedRunner::default();
        let tiers = tiers(61);
        let selector = TierSelector::new(&runner, &tiers, ErrorPolicy::AbortQuery)
            .with_query_ceiling(Some(Duration::from_secs(100)));

        let result = finished(selector.solve(&query("q7"), &CancelToken::new()).unwrap());
        assert_eq!(result.status(), QueryStatus::Exhausted);
        let limits: Vec<Duration> = runner.calls().iter().map(|c| c.2).collect();
        assert_eq!(limits, [Duration::from_secs(61), Duration::from_secs(39)]);
        assert_eq!(result.total_ms(), 100_000.0);
    }

    #[test]
    fn test_cancelled_before_start() {
        let runner = ScriptedRunner::default();
        let tiers = tiers(61);
        let selector = TierSelector::new(&runner, &tiers, ErrorPolicy::AbortQuery);
        let cancel = CancelToken::new();
        cancel.cancel();

        assert!(matches!(selector.solve(&query("q8"), &cancel).unwrap(), Selection::Interrupted));
        assert!(runner.calls().is_empty());
    }
}
