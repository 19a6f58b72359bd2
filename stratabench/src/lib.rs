#![warn(missing_docs)]
//! # StrataBench
//!
//! Stratified portfolio runner for external first-order theorem provers.
//!
//! StrataBench tries a fixed, ordered list of axiom tiers against each query
//! of a TPTP conjecture suite:
//! - **First success wins**: tiers run strictly in order, one at a time per query
//! - **Hard deadlines**: every attempt has its own wall-clock limit, and the
//!   prover's whole process tree is killed when it expires
//! - **Durable results**: one record per query, appended and synced as soon as
//!   the query finishes, so an interrupted run resumes where it stopped
//! - **Category reports**: success rates, median/p90/max solve times and
//!   winning-tier histograms as terminal, Markdown, CSV or JSON tables
//!
//! ## Quick Start
//!
//! ```text
//! stratabench init > strata.toml
//! stratabench run --jobs 4
//! stratabench report --format markdown
//! ```
//!
//! ## Library Use
//!
//! ```no_run
//! use stratabench::{CategoryRules, QuerySuite, aggregate};
//! use std::path::Path;
//!
//! let suite = QuerySuite::load(Path::new("conjectures.p"), &CategoryRules::default())?;
//! println!("{} queries in {} categories", suite.len(), suite.categories().len());
//!
//! let log = stratabench::read_log(Path::new("results/strata_results.tsv"))?;
//! let report = aggregate(&log.results);
//! print!("{}", stratabench::render_human(&report));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

// Re-export the data model
pub use stratabench_core::{
    Attempt, AttemptOutcome, BoundedOutput, CategoryRule, CategoryRules, ErrorPolicy, Query,
    QueryProgress, QueryResult, QueryState, QueryStatus, QuerySuite, SuiteError, Tier, TierError,
    TierSet, TierSpec, TierTrace, Verdict, Winner, classify_output, merge_payload,
};

// Re-export the result log
pub use stratabench_log::{LogContents, LogError, LogWriter, completed_ids, read_log};

// Re-export statistics
pub use stratabench_stats::{
    SummaryStatistics, compute_percentile, compute_summary, nearest_rank_percentile,
};

// Re-export reporting
pub use stratabench_report::{
    AggregateReport, CategoryStatistics, OutputFormat, aggregate, aggregate_log, render,
    render_csv, render_human, render_markdown,
};

// Re-export the orchestrator
pub use stratabench_cli::{
    AttemptRunner, BatchCoordinator, BatchError, BatchOptions, BatchSummary, CancelToken,
    ProcEntry, ProcessRunner, ProverCommand, RunnerError, RunnerOptions, SPAWN_ERROR, Selection,
    StrataConfig, TierSelector, is_spawn_failure, parse_stat, report_error,
};

/// Run the StrataBench CLI with the process arguments.
///
/// ```ignore
/// fn main() {
///     if let Err(e) = stratabench::run() {
///         std::process::exit(stratabench::report_error(&e));
///     }
/// }
/// ```
pub use stratabench_cli::run;
