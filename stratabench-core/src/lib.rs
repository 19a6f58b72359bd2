#![warn(missing_docs)]
//! StrataBench Core - Query and Tier Model
//!
//! This crate holds everything that does not touch a process or a file handle
//! beyond loading inputs:
//! - `QuerySuite` / `TierSet` for the conjectures and the ordered axiom tiers
//! - SZS-based classification of prover output into `AttemptOutcome`
//! - `QueryProgress`, the per-query state machine that applies the tier rules
//! - Category naming rules and a bounded output buffer

mod capture;
mod category;
mod classify;
mod outcome;
mod progress;
mod query;
mod tier;

pub use capture::{BoundedOutput, DEFAULT_OUTPUT_LIMIT};
pub use category::{CategoryRule, CategoryRules, DEFAULT_CATEGORY, default_rules};
pub use classify::{Verdict, classify_output, outcome_for_status};
pub use outcome::{
    Attempt, AttemptOutcome, QueryResult, QueryStatus, TierTrace, UnknownKeyword, Winner,
    duration_to_micros,
};
pub use progress::{ErrorPolicy, ProgressError, QueryProgress, QueryState};
pub use query::{Query, QuerySuite, SuiteError, extract_conjectures, strip_conjectures};
pub use tier::{Tier, TierError, TierSet, TierSpec, merge_payload};
