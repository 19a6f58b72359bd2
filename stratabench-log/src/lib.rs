#![warn(missing_docs)]
//! StrataBench Result Log
//!
//! Durable, append-only, line-oriented record of finished queries. The log is
//! the source of truth for resuming an interrupted run and for building
//! reports; both only ever read it.

mod journal;
mod record;

pub use journal::{
    FORMAT_LINE, LogContents, LogError, LogWriter, completed_ids, parse_log, read_log,
};
pub use record::{COLUMN_HEADER, COLUMNS, RecordError, decode, encode, format_ms, parse_ms};
