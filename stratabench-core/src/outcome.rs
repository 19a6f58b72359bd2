//! Attempt and Query Outcomes
//!
//! An [`Attempt`] is one prover invocation for a (query, tier) pair. A
//! [`QueryResult`] is the terminal record for a query across every attempt it
//! made. Elapsed times are kept as integer microseconds so that the total of a
//! query is always the exact sum of its per-tier entries, including after a
//! round trip through the result log.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Error returned when parsing an outcome or status keyword
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} '{value}'")]
pub struct UnknownKeyword {
    /// What was being parsed
    pub kind: &'static str,
    /// The offending text
    pub value: String,
}

/// Classified result of a single prover invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AttemptOutcome {
    /// The prover found a proof of the conjecture
    Proved,
    /// The prover found a counter-model
    Disproved,
    /// Deadline expired (ours or the prover's own time limit)
    TimedOut,
    /// Spawn failure, input error, crash or contradictory axioms
    Error,
    /// Output could not be mapped to a known status
    Indeterminate,
    /// Killed because the batch is shutting down; never persisted
    Interrupted,
}

impl AttemptOutcome {
    /// Stable keyword used in the result log
    pub fn as_str(self) -> &'static str {
        match self {
            AttemptOutcome::Proved => "proved",
            AttemptOutcome::Disproved => "disproved",
            AttemptOutcome::TimedOut => "timeout",
            AttemptOutcome::Error => "error",
            AttemptOutcome::Indeterminate => "indeterminate",
            AttemptOutcome::Interrupted => "interrupted",
        }
    }

    /// Whether this outcome wins the query
    pub fn is_proof(self) -> bool {
        matches!(self, AttemptOutcome::Proved)
    }
}

impl fmt::Display for AttemptOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AttemptOutcome {
    type Err = UnknownKeyword;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "proved" => Ok(AttemptOutcome::Proved),
            "disproved" => Ok(AttemptOutcome::Disproved),
            "timeout" => Ok(AttemptOutcome::TimedOut),
            "error" => Ok(AttemptOutcome::Error),
            "indeterminate" => Ok(AttemptOutcome::Indeterminate),
            "interrupted" => Ok(AttemptOutcome::Interrupted),
            other => Err(UnknownKeyword {
                kind: "attempt outcome",
                value: other.to_string(),
            }),
        }
    }
}

/// Terminal status of a query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QueryStatus {
    /// Some tier produced a proof
    Proved,
    /// Every tier was tried without a proof (a valid, expected outcome)
    Exhausted,
    /// A tier reported an error and the error policy stopped the query
    Aborted,
}

impl QueryStatus {
    /// Stable keyword used in the result log
    pub fn as_str(self) -> &'static str {
        match self {
            QueryStatus::Proved => "proved",
            QueryStatus::Exhausted => "exhausted",
            QueryStatus::Aborted => "aborted",
        }
    }
}

impl fmt::Display for QueryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QueryStatus {
    type Err = UnknownKeyword;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "proved" => Ok(QueryStatus::Proved),
            "exhausted" => Ok(QueryStatus::Exhausted),
            "aborted" => Ok(QueryStatus::Aborted),
            other => Err(UnknownKeyword {
                kind: "query status",
                value: other.to_string(),
            }),
        }
    }
}

/// One finalized prover invocation
#[derive(Debug, Clone)]
pub struct Attempt {
    /// 1-based rank of the tier used
    pub tier_rank: usize,
    /// Tier name
    pub tier_name: String,
    /// When the process was launched
    pub started: Instant,
    /// Wall-clock limit enforced for this attempt
    pub deadline: Duration,
    /// Classified outcome
    pub outcome: AttemptOutcome,
    /// SZS status word reported by the prover, or a synthetic one
    pub szs_status: String,
    /// Measured wall-clock time
    pub elapsed: Duration,
    /// Exit code, `None` when killed by a signal
    pub exit_code: Option<i32>,
    /// Captured stdout+stderr (size-bounded)
    pub output: String,
    /// Extra context, e.g. the spawn error message
    pub detail: Option<String>,
}

impl Attempt {
    /// Per-tier entry that gets persisted for this attempt
    pub fn trace(&self) -> TierTrace {
        TierTrace {
            tier: self.tier_name.clone(),
            outcome: self.outcome,
            szs_status: self.szs_status.clone(),
            elapsed_us: duration_to_micros(self.elapsed),
        }
    }
}

/// Persisted summary of one attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierTrace {
    /// Tier name
    pub tier: String,
    /// Classified outcome of the attempt
    pub outcome: AttemptOutcome,
    /// SZS status word, or a synthetic one such as `Timeout`
    pub szs_status: String,
    /// Wall-clock time in microseconds
    pub elapsed_us: u64,
}

impl TierTrace {
    pub fn elapsed(&self) -> Duration {
        Duration::from_micros(self.elapsed_us)
    }
}

/// The tier that produced the proof
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Winner {
    /// 1-based tier rank
    pub rank: usize,
    /// Tier name
    pub name: String,
}

/// Terminal, immutable record for one query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryResult {
    query_id: String,
    category: String,
    status: QueryStatus,
    winner: Option<Winner>,
    trace: Vec<TierTrace>,
}

impl QueryResult {
    /// Build a result; the total elapsed time is derived from `trace`
    pub fn new(
        query_id: impl Into<String>,
        category: impl Into<String>,
        status: QueryStatus,
        winner: Option<Winner>,
        trace: Vec<TierTrace>,
    ) -> Self {
        Self {
            query_id: query_id.into(),
            category: category.into(),
            status,
            winner,
            trace,
        }
    }

    pub fn query_id(&self) -> &str {
        &self.query_id
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn status(&self) -> QueryStatus {
        self.status
    }

    pub fn winner(&self) -> Option<&Winner> {
        self.winner.as_ref()
    }

    pub fn trace(&self) -> &[TierTrace] {
        &self.trace
    }

    /// Sum of all attempt times, failed tiers included
    pub fn total_us(&self) -> u64 {
        self.trace.iter().map(|t| t.elapsed_us).sum()
    }

    pub fn total_elapsed(&self) -> Duration {
        Duration::from_micros(self.total_us())
    }

    /// Total in milliseconds (for statistics)
    pub fn total_ms(&self) -> f64 {
        self.total_us() as f64 / 1000.0
    }

    /// Elapsed time spent on the named tier, if it was attempted
    pub fn tier_elapsed(&self, tier: &str) -> Option<Duration> {
        self.trace
            .iter()
            .find(|t| t.tier == tier)
            .map(TierTrace::elapsed)
    }

    /// Number of attempts made
    pub fn attempts(&self) -> usize {
        self.trace.len()
    }
}

/// Truncate to whole microseconds, saturating
pub fn duration_to_micros(d: Duration) -> u64 {
    u64::try_from(d.as_micros()).unwrap_or(u64::MAX)
}
