//! Run Metadata
//!
//! What a run was started with, stamped into the result log as a `#` marker
//! so a log can be traced back to its prover and tier order.

use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use stratabench_core::TierSet;

/// Run-level facts recorded at start-up
#[derive(Debug, Clone)]
pub struct RunMetadata {
    pub version: String,
    pub started: DateTime<Utc>,
    pub prover: PathBuf,
    /// `name@seconds` in tier order
    pub tiers: Vec<String>,
    pub jobs: usize,
    pub os: String,
    pub cpu_cores: usize,
}

impl RunMetadata {
    pub fn collect(prover: &Path, tiers: &TierSet, jobs: usize) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            started: Utc::now(),
            prover: prover.to_path_buf(),
            tiers: tiers
                .iter()
                .map(|t| format!("{}@{}s", t.name(), t.time_limit().as_secs_f64()))
                .collect(),
            jobs,
            os: format!("{}-{}", std::env::consts::OS, std::env::consts::ARCH),
            cpu_cores: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
        }
    }

    /// Single-line marker for the result log
    pub fn marker(&self, pending: usize, skipped: usize) -> String {
        format!(
            "run start: stratabench {} prover={} tiers={} jobs={} pending={} skipped={} host={} cores={}",
            self.version,
            self.prover.display(),
            self.tiers.join(","),
            self.jobs,
            pending,
            skipped,
            self.os,
            self.cpu_cores
        )
    }

    /// Time since [`collect`](Self::collect)
    pub fn elapsed(&self) -> chrono::TimeDelta {
        Utc::now() - self.started
    }
}
