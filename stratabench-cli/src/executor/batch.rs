//! Batch Coordinator
//!
//! Runs every pending query through the [`TierSelector`] and appends each
//! finished record to the result log the moment it exists. Queries run on a
//! rayon pool; tiers inside a query never overlap. The first fatal error
//! cancels the batch, and so does SIGINT/SIGTERM.

use super::formatting::format_result_line;
use super::selector::{Selection, TierSelector};
use crate::runner::{AttemptRunner, RunnerError};
use crate::shutdown::CancelToken;
use indicatif::{ProgressBar, ProgressStyle};
use rayon::ThreadPoolBuilder;
use rayon::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use stratabench_core::{ErrorPolicy, ProgressError, Query, QueryResult, QueryStatus, TierSet};
use stratabench_log::{LogError, LogWriter, completed_ids};
use thiserror::Error;
use tracing::{info, warn};

/// Batch-level failures; all of them end the run with a non-zero exit
#[derive(Debug, Error)]
pub enum BatchError {
    #[error("cannot start prover for {query} on tier {tier}: {detail}")]
    Spawn {
        query: String,
        tier: String,
        detail: String,
    },

    #[error(transparent)]
    Runner(#[from] RunnerError),

    #[error("result log: {0}")]
    Log(#[from] LogError),

    #[error(transparent)]
    Progress(#[from] ProgressError),

    #[error("failed to build worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("interrupted with {remaining} of {pending} queries unfinished; rerun to resume")]
    Interrupted { pending: usize, remaining: usize },
}

/// Knobs for one batch
#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Concurrent queries
    pub jobs: usize,
    pub policy: ErrorPolicy,
    pub query_ceiling: Option<Duration>,
    /// Draw an indicatif bar (hidden anyway when stderr is not a terminal)
    pub show_progress: bool,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            jobs: 1,
            policy: ErrorPolicy::default(),
            query_ceiling: None,
            show_progress: true,
        }
    }
}

/// Counts for the end-of-run summary
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    /// Queries handed to the batch
    pub total: usize,
    /// Already in the log, not run again
    pub skipped: usize,
    pub proved: usize,
    pub exhausted: usize,
    pub aborted: usize,
}

impl BatchSummary {
    /// Queries finished during this run
    pub fn completed(&self) -> usize {
        self.proved + self.exhausted + self.aborted
    }

    /// Queries this run was supposed to finish
    pub fn pending(&self) -> usize {
        self.total - self.skipped
    }
}

#[derive(Default)]
struct Tally {
    proved: AtomicUsize,
    exhausted: AtomicUsize,
    aborted: AtomicUsize,
}

impl Tally {
    fn record(&self, result: &QueryResult) {
        let counter = match result.status() {
            QueryStatus::Proved => &self.proved,
            QueryStatus::Exhausted => &self.exhausted,
            QueryStatus::Aborted => &self.aborted,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn summary(&self, total: usize, skipped: usize) -> BatchSummary {
        BatchSummary {
            total,
            skipped,
            proved: self.proved.load(Ordering::Relaxed),
            exhausted: self.exhausted.load(Ordering::Relaxed),
            aborted: self.aborted.load(Ordering::Relaxed),
        }
    }
}

/// Drives a whole suite against a tier set
pub struct BatchCoordinator<'a, R: AttemptRunner> {
    runner: &'a R,
    tiers: &'a TierSet,
    log: &'a LogWriter,
    options: BatchOptions,
}

impl<'a, R: AttemptRunner> BatchCoordinator<'a, R> {
    pub fn new(runner: &'a R, tiers: &'a TierSet, log: &'a LogWriter, options: BatchOptions) -> Self {
        Self {
            runner,
            tiers,
            log,
            options,
        }
    }

    /// Run every query not yet in the log
    pub fn run(&self, queries: &[&Query], cancel: &CancelToken) -> Result<BatchSummary, BatchError> {
        let done = completed_ids(self.log.path())?;
        let pending: Vec<&Query> = queries
            .iter()
            .copied()
            .filter(|q| !done.contains(&q.id))
            .collect();
        let skipped = queries.len() - pending.len();
        if skipped > 0 {
            info!(skipped, pending = pending.len(), "resuming from result log");
        }

        let selector = TierSelector::new(self.runner, self.tiers, self.options.policy)
            .with_query_ceiling(self.options.query_ceiling);
        let tally = Tally::default();
        let pb = self.progress_bar(pending.len());

        let work = |query: &&Query| self.run_one(query, &selector, cancel, &pb, &tally);
        let outcome = if self.options.jobs <= 1 {
            pending.iter().try_for_each(&work)
        } else {
            let pool = ThreadPoolBuilder::new()
                .num_threads(self.options.jobs)
                .thread_name(|i| format!("strata-worker-{i}"))
                .build()?;
            pool.install(|| pending.par_iter().try_for_each(&work))
        };
        pb.finish_and_clear();

        let summary = tally.summary(queries.len(), skipped);
        if let Err(e) = outcome {
            self.mark_best_effort(&format!("run aborted: {e}"));
            return Err(e);
        }

        let remaining = summary.pending() - summary.completed();
        if remaining > 0 && cancel.is_cancelled() {
            self.mark_best_effort(&format!("run interrupted, {remaining} queries unfinished"));
            return Err(BatchError::Interrupted {
                pending: summary.pending(),
                remaining,
            });
        }
        self.log.mark(&format!(
            "run complete: {} proved, {} exhausted, {} aborted",
            summary.proved, summary.exhausted, summary.aborted
        ))?;
        Ok(summary)
    }

    fn run_one(
        &self,
        query: &Query,
        selector: &TierSelector<'_, R>,
        cancel: &CancelToken,
        pb: &ProgressBar,
        tally: &Tally,
    ) -> Result<(), BatchError> {
        if cancel.is_cancelled() {
            return Ok(());
        }
        pb.set_message(query.id.clone());

        let result = match selector.solve(query, cancel) {
            Ok(Selection::Finished(result)) => result,
            Ok(Selection::Interrupted) => return Ok(()),
            Err(e) => {
                cancel.cancel();
                return Err(e);
            }
        };
        if let Err(e) = self.log.append(&result) {
            cancel.cancel();
            return Err(e.into());
        }

        tally.record(&result);
        emit(pb, &format_result_line(&result, self.tiers.len()));
        pb.inc(1);
        Ok(())
    }

    fn progress_bar(&self, len: usize) -> ProgressBar {
        if !self.options.show_progress {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new(len as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        pb
    }

    fn mark_best_effort(&self, event: &str) {
        if let Err(e) = self.log.mark(event) {
            warn!(error = %e, "failed to write log marker");
        }
    }
}

/// Print above the bar when it is drawn, plainly otherwise
fn emit(pb: &ProgressBar, line: &str) {
    if pb.is_hidden() {
        println!("{line}");
    } else {
        pb.println(line);
    }
}
