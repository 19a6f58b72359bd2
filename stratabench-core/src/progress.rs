//! Per-query state machine
//!
//! `Pending -> Attempting(k) -> ... -> Finished`. Attempts must be recorded in
//! tier order, and a finished query accepts nothing further.

use crate::outcome::{Attempt, AttemptOutcome, QueryResult, QueryStatus, TierTrace, Winner};
use crate::query::Query;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// What a tier error does to the query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorPolicy {
    /// Stop the query with status `aborted`
    #[default]
    AbortQuery,
    /// Treat the error like any other non-proof and try the next tier
    NextTier,
}

impl fmt::Display for ErrorPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ErrorPolicy::AbortQuery => "abort-query",
            ErrorPolicy::NextTier => "next-tier",
        })
    }
}

impl FromStr for ErrorPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "abort-query" => Ok(ErrorPolicy::AbortQuery),
            "next-tier" => Ok(ErrorPolicy::NextTier),
            other => Err(format!(
                "unknown error policy '{other}' (expected abort-query or next-tier)"
            )),
        }
    }
}

/// Where a query currently stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryState {
    Pending,
    /// Waiting on the attempt for the tier at this 0-based index
    Attempting(usize),
    Finished(QueryStatus),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProgressError {
    #[error("query '{query}' is already finished")]
    AlreadyFinished { query: String },

    #[error("query '{query}' expected tier rank {expected}, got {got}")]
    OutOfOrder {
        query: String,
        expected: usize,
        got: usize,
    },

    #[error("interrupted attempts are not recorded")]
    Interrupted,
}

/// Tracks one query through its tiers
#[derive(Debug, Clone)]
pub struct QueryProgress {
    query_id: String,
    category: String,
    tier_count: usize,
    policy: ErrorPolicy,
    state: QueryState,
    trace: Vec<TierTrace>,
    winner: Option<Winner>,
}

impl QueryProgress {
    pub fn new(query: &Query, tier_count: usize, policy: ErrorPolicy) -> Self {
        Self {
            query_id: query.id.clone(),
            category: query.category.clone(),
            tier_count,
            policy,
            state: QueryState::Pending,
            trace: Vec::with_capacity(tier_count),
            winner: None,
        }
    }

    pub fn state(&self) -> QueryState {
        self.state
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.state, QueryState::Finished(_))
    }

    /// Index of the next tier to attempt, moving out of `Pending` if needed
    pub fn next_tier(&mut self) -> Option<usize> {
        match self.state {
            QueryState::Pending if self.tier_count == 0 => {
                self.state = QueryState::Finished(QueryStatus::Exhausted);
                None
            }
            QueryState::Pending => {
                self.state = QueryState::Attempting(0);
                Some(0)
            }
            QueryState::Attempting(k) => Some(k),
            QueryState::Finished(_) => None,
        }
    }

    /// Record a finalized attempt and apply the selection rules
    pub fn record(&mut self, attempt: &Attempt) -> Result<QueryState, ProgressError> {
        let index = match self.state {
            QueryState::Finished(_) => {
                return Err(ProgressError::AlreadyFinished {
                    query: self.query_id.clone(),
                });
            }
            QueryState::Pending => 0,
            QueryState::Attempting(k) => k,
        };
        if attempt.tier_rank != index + 1 {
            return Err(ProgressError::OutOfOrder {
                query: self.query_id.clone(),
                expected: index + 1,
                got: attempt.tier_rank,
            });
        }
        if attempt.outcome == AttemptOutcome::Interrupted {
            return Err(ProgressError::Interrupted);
        }

        self.trace.push(attempt.trace());
        let is_last = index + 1 >= self.tier_count;

        self.state = match attempt.outcome {
            AttemptOutcome::Proved => {
                self.winner = Some(Winner {
                    rank: attempt.tier_rank,
                    name: attempt.tier_name.clone(),
                });
                QueryState::Finished(QueryStatus::Proved)
            }
            AttemptOutcome::Error if self.policy == ErrorPolicy::AbortQuery => {
                QueryState::Finished(QueryStatus::Aborted)
            }
            _ if is_last => QueryState::Finished(QueryStatus::Exhausted),
            _ => QueryState::Attempting(index + 1),
        };
        Ok(self.state)
    }

    /// Give up on the remaining tiers (per-query budget spent)
    pub fn exhaust(&mut self) {
        if !self.is_finished() {
            self.state = QueryState::Finished(QueryStatus::Exhausted);
        }
    }

    /// The terminal record, once finished
    pub fn into_result(self) -> Option<QueryResult> {
        match self.state {
            QueryState::Finished(status) => Some(QueryResult::new(
                self.query_id,
                self.category,
                status,
                self.winner,
                self.trace,
            )),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::time::{Duration, Instant};

    fn query() -> Query {
        Query {
            id: "test_wk_1".to_string(),
            category: "Weekday".to_string(),
            formula: "tff(test_wk_1, conjecture, $true).".to_string(),
            source: PathBuf::from("suite.p"),
        }
    }

    fn attempt(rank: usize, outcome: AttemptOutcome, ms: u64) -> Attempt {
        Attempt {
            tier_rank: rank,
            tier_name: format!("T{rank}"),
            started: Instant::now(),
            deadline: Duration::from_secs(60),
            outcome,
            szs_status: String::new(),
            elapsed: Duration::from_millis(ms),
            exit_code: Some(0),
            output: String::new(),
            detail: None,
        }
    }

    #[test]
    fn test_first_tier_proof_short_circuits() {
        let mut p = QueryProgress::new(&query(), 3, ErrorPolicy::AbortQuery);
        assert_eq!(p.state(), QueryState::Pending);
        assert_eq!(p.next_tier(), Some(0));
        let state = p.record(&attempt(1, AttemptOutcome::Proved, 24)).unwrap();
        assert_eq!(state, QueryState::Finished(QueryStatus::Proved));
        assert_eq!(p.next_tier(), None);

        let result = p.into_result().unwrap();
        assert_eq!(result.attempts(), 1);
        assert_eq!(result.winner().unwrap().rank, 1);
    }

    #[test]
    fn test_non_proofs_advance_then_exhaust() {
        let mut p = QueryProgress::new(&query(), 3, ErrorPolicy::AbortQuery);
        p.next_tier();
        p.record(&attempt(1, AttemptOutcome::TimedOut, 100)).unwrap();
        assert_eq!(p.next_tier(), Some(1));
        p.record(&attempt(2, AttemptOutcome::Disproved, 5)).unwrap();
        let state = p.record(&attempt(3, AttemptOutcome::Indeterminate, 7)).unwrap();
        assert_eq!(state, QueryState::Finished(QueryStatus::Exhausted));

        let result = p.into_result().unwrap();
        assert!(result.winner().is_none());
        assert_eq!(result.total_us(), 112_000);
    }

    #[test]
    fn test_error_policy() {
        let mut abort = QueryProgress::new(&query(), 3, ErrorPolicy::AbortQuery);
        abort.next_tier();
        let state = abort.record(&attempt(1, AttemptOutcome::Error, 1)).unwrap();
        assert_eq!(state, QueryState::Finished(QueryStatus::Aborted));

        let mut next = QueryProgress::new(&query(), 3, ErrorPolicy::NextTier);
        next.next_tier();
        let state = next.record(&attempt(1, AttemptOutcome::Error, 1)).unwrap();
        assert_eq!(state, QueryState::Attempting(1));
        let state = next.record(&attempt(2, AttemptOutcome::Proved, 1)).unwrap();
        assert_eq!(state, QueryState::Finished(QueryStatus::Proved));
    }

    #[test]
    fn test_out_of_order_and_after_finish_rejected() {
        let mut p = QueryProgress::new(&query(), 2, ErrorPolicy::AbortQuery);
        p.next_tier();
        assert!(matches!(
            p.record(&attempt(2, AttemptOutcome::TimedOut, 1)),
            Err(ProgressError::OutOfOrder { expected: 1, got: 2, .. })
        ));
        assert_eq!(
            p.record(&attempt(1, AttemptOutcome::Interrupted, 1)),
            Err(ProgressError::Interrupted)
        );
        p.record(&attempt(1, AttemptOutcome::Proved, 1)).unwrap();
        assert!(matches!(
            p.record(&attempt(2, AttemptOutcome::Proved, 1)),
            Err(ProgressError::AlreadyFinished { .. })
        ));
    }

    #[test]
    fn test_exhaust_early() {
        let mut p = QueryProgress::new(&query(), 3, ErrorPolicy::AbortQuery);
        p.next_tier();
        p.record(&attempt(1, AttemptOutcome::TimedOut, 10)).unwrap();
        p.exhaust();
        let result = p.into_result().unwrap();
        assert_eq!(result.status(), QueryStatus::Exhausted);
        assert_eq!(result.attempts(), 1);
    }

    #[test]
    fn test_unfinished_has_no_result() {
        let mut p = QueryProgress::new(&query(), 2, ErrorPolicy::AbortQuery);
        p.next_tier();
        assert!(p.into_result().is_none());
    }

    #[test]
    fn test_policy_parse() {
        assert_eq!("next-tier".parse::<ErrorPolicy>(), Ok(ErrorPolicy::NextTier));
        assert!("skip".parse::<ErrorPolicy>().is_err());
        assert_eq!(ErrorPolicy::default().to_string(), "abort-query");
    }
}
