//! Append-Only Result Journal
//!
//! The journal is the durable record of a run. Each finished query is written
//! as one complete line and synced before `append` returns, so a crash can at
//! worst leave a torn final line. Readers drop such a line with a warning;
//! any other malformed line is an error.

use crate::record::{self, COLUMN_HEADER, RecordError};
use chrono::Utc;
use fxhash::FxHashSet;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use stratabench_core::QueryResult;
use thiserror::Error;

/// First line of every journal
pub const FORMAT_LINE: &str = "# stratabench results v1";

/// Errors from reading or writing a journal
#[derive(Debug, Error)]
pub enum LogError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path} is not a stratabench results log (first line: {found:?})")]
    UnknownFormat { path: PathBuf, found: String },

    #[error("{path}:{line}: {source}")]
    Malformed {
        path: PathBuf,
        line: usize,
        #[source]
        source: RecordError,
    },

    #[error("cannot record query '{query}': {source}")]
    Unencodable {
        query: String,
        #[source]
        source: RecordError,
    },

    #[error("journal lock poisoned")]
    Poisoned,
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> LogError + '_ {
    move |source| LogError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Single writer for a journal file; safe to share between worker threads
#[derive(Debug)]
pub struct LogWriter {
    path: PathBuf,
    file: Mutex<File>,
}

impl LogWriter {
    /// Open (or create) a journal for appending
    ///
    /// A torn final line left by an earlier crash is truncated away so new
    /// records start on a fresh line.
    pub fn open(path: &Path) -> Result<Self, LogError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err(parent))?;
        }

        let mut file = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(path)
            .map_err(io_err(path))?;

        let mut existing = Vec::new();
        file.read_to_end(&mut existing).map_err(io_err(path))?;

        if existing.is_empty() {
            let header = format!("{FORMAT_LINE}\n{COLUMN_HEADER}\n");
            file.write_all(header.as_bytes()).map_err(io_err(path))?;
            file.sync_data().map_err(io_err(path))?;
        } else {
            check_format_line(path, &String::from_utf8_lossy(&existing))?;
            if existing.last() != Some(&b'\n') {
                let keep = existing
                    .iter()
                    .rposition(|b| *b == b'\n')
                    .map(|i| i + 1)
                    .unwrap_or(0);
                tracing::warn!(
                    path = %path.display(),
                    dropped_bytes = existing.len() - keep,
                    "Truncating torn final line in results log"
                );
                file.set_len(keep as u64).map_err(io_err(path))?;
                file.seek(SeekFrom::End(0)).map_err(io_err(path))?;
                file.sync_data().map_err(io_err(path))?;
            }
        }

        Ok(Self {
            path: path.to_path_buf(),
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Durably append one finished query
    pub fn append(&self, result: &QueryResult) -> Result<(), LogError> {
        let mut line = record::encode(result).map_err(|source| LogError::Unencodable {
            query: result.query_id().to_string(),
            source,
        })?;
        line.push('\n');
        self.write_line(&line)
    }

    /// Write a timestamped `#` marker line (run start, resume, interruption)
    pub fn mark(&self, event: &str) -> Result<(), LogError> {
        let line = format!(
            "# {} {}\n",
            Utc::now().format("%Y-%m-%dT%H:%M:%SZ"),
            event.replace(['\n', '\r'], " ")
        );
        self.write_line(&line)
    }

    fn write_line(&self, line: &str) -> Result<(), LogError> {
        let mut file = self.file.lock().map_err(|_| LogError::Poisoned)?;
        file.write_all(line.as_bytes()).map_err(io_err(&self.path))?;
        file.flush().map_err(io_err(&self.path))?;
        file.sync_data().map_err(io_err(&self.path))?;
        Ok(())
    }
}

fn check_format_line(path: &Path, text: &str) -> Result<(), LogError> {
    let first = text.lines().next().unwrap_or_default();
    if first != FORMAT_LINE {
        return Err(LogError::UnknownFormat {
            path: path.to_path_buf(),
            found: first.chars().take(80).collect(),
        });
    }
    Ok(())
}

/// Everything recovered from a journal
#[derive(Debug, Clone, Default)]
pub struct LogContents {
    /// Results in file order, first occurrence of each query id only
    pub results: Vec<QueryResult>,
    /// Whether an unterminated final line was dropped
    pub torn_tail: bool,
    /// Number of later duplicates ignored
    pub duplicates: usize,
}

impl LogContents {
    /// Ids of every query with a terminal record
    pub fn completed_ids(&self) -> FxHashSet<String> {
        self.results
            .iter()
            .map(|r| r.query_id().to_string())
            .collect()
    }
}

/// Parse journal text
pub fn parse_log(path: &Path, text: &str) -> Result<LogContents, LogError> {
    let mut contents = LogContents::default();
    if text.is_empty() {
        return Ok(contents);
    }
    check_format_line(path, text)?;

    let mut seen = FxHashSet::default();
    let terminated = text.ends_with('\n');
    let lines: Vec<&str> = text.lines().collect();
    let last = lines.len().saturating_sub(1);

    for (i, line) in lines.iter().enumerate() {
        if !terminated && i == last {
            tracing::warn!(
                path = %path.display(),
                line = i + 1,
                "Ignoring torn final line in results log"
            );
            contents.torn_tail = true;
            break;
        }
        let trimmed = line.trim_end_matches('\r');
        if trimmed.trim().is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let result = record::decode(trimmed).map_err(|source| LogError::Malformed {
            path: path.to_path_buf(),
            line: i + 1,
            source,
        })?;
        if !seen.insert(result.query_id().to_string()) {
            tracing::warn!(query = result.query_id(), "Duplicate record in results log ignored");
            contents.duplicates += 1;
            continue;
        }
        contents.results.push(result);
    }
    Ok(contents)
}

/// Read a journal from disk; a missing file reads as empty
pub fn read_log(path: &Path) -> Result<LogContents, LogError> {
    match fs::read_to_string(path) {
        Ok(text) => parse_log(path, &text),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(LogContents::default()),
        Err(source) => Err(LogError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Ids already recorded in a journal (for resume)
pub fn completed_ids(path: &Path) -> Result<FxHashSet<String>, LogError> {
    Ok(read_log(path)?.completed_ids())
}
