//! Portfolio Executor
//!
//! Turns a query plan into persisted results.
//!
//! ## Pipeline Overview
//!
//! ```text
//! QueryPlan (suite minus completed ids)
//!       │
//!       ▼
//! ┌─────────────┐
//! │    batch    │  Worker pool, resume, append to result log
//! └──────┬──────┘
//!        │ one query at a time per worker
//!        ▼
//! ┌─────────────┐
//! │  selector   │  Tiers in order, first proof wins
//! └──────┬──────┘
//!        │ one attempt at a time per query
//!        ▼
//! ┌─────────────┐
//! │   runner    │  Spawn, deadline, hardkill, classify
//! └─────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`batch`] - Batch coordination and result persistence
//! - [`selector`] - Tier iteration for a single query
//! - [`formatting`] - Console lines and summaries
//! - [`metadata`] - Run marker written to the log

mod batch;
mod formatting;
mod metadata;
mod selector;

pub use batch::{BatchCoordinator, BatchError, BatchOptions, BatchSummary};
pub use formatting::{ORCHESTRATION_ERROR, format_batch_error, format_result_line, format_summary};
pub use metadata::RunMetadata;
pub use selector::{Selection, TierSelector};
