//! Result Record Encoding
//!
//! One query per line, tab separated:
//!
//! ```text
//! query_id  category  status  winning_tier  winning_rank  total_ms  trace
//! ```
//!
//! `winning_tier` and `winning_rank` are `-` unless the status is `proved`.
//! The trace lists every attempt in tier order as `tier=outcome/szs@ms`,
//! joined by `;`. Milliseconds are written with exactly three decimals from
//! integer microseconds, so `total_ms` always equals the sum of the trace.

use stratabench_core::{AttemptOutcome, QueryResult, QueryStatus, TierTrace, Winner};
use thiserror::Error;

/// Number of tab-separated columns in a record
pub const COLUMNS: usize = 7;

/// Column header written after the format line
pub const COLUMN_HEADER: &str =
    "# query_id\tcategory\tstatus\twinning_tier\twinning_rank\ttotal_ms\ttrace";

const NONE: &str = "-";

/// Problems with a single record
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    #[error("expected 7 columns, found {0}")]
    ColumnCount(usize),

    #[error("{field} contains a separator character: {value:?}")]
    Unencodable { field: &'static str, value: String },

    #[error("invalid {field}: {value:?}")]
    InvalidField { field: &'static str, value: String },

    #[error("total_ms {total} does not match trace sum {sum}")]
    TotalMismatch { total: String, sum: String },

    #[error("status '{status}' is inconsistent with winner {winner:?}")]
    Inconsistent { status: String, winner: Option<String> },
}

/// Render integer microseconds as milliseconds with three decimals
pub fn format_ms(us: u64) -> String {
    format!("{}.{:03}", us / 1000, us % 1000)
}

/// Parse a millisecond value written by [`format_ms`] back to microseconds
pub fn parse_ms(text: &str) -> Option<u64> {
    let (whole, frac) = match text.split_once('.') {
        Some((w, f)) => (w, f),
        None => (text, ""),
    };
    if whole.is_empty() || frac.len() > 3 || !frac.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let ms: u64 = whole.parse().ok()?;
    let mut micros = 0u64;
    for (i, b) in frac.bytes().enumerate() {
        micros += u64::from(b - b'0') * 10u64.pow(2 - i as u32);
    }
    ms.checked_mul(1000)?.checked_add(micros)
}

fn check_field(field: &'static str, value: &str) -> Result<(), RecordError> {
    check_chars(field, value, &['\t', '\n', '\r'])
}

fn check_chars(field: &'static str, value: &str, forbidden: &[char]) -> Result<(), RecordError> {
    if value.contains(forbidden) {
        return Err(RecordError::Unencodable {
            field,
            value: value.to_string(),
        });
    }
    Ok(())
}

/// Encode a result as one log line (without the trailing newline)
pub fn encode(result: &QueryResult) -> Result<String, RecordError> {
    check_field("query_id", result.query_id())?;
    check_field("category", result.category())?;

    let (tier, rank) = match result.winner() {
        Some(w) => (w.name.clone(), w.rank.to_string()),
        None => (NONE.to_string(), NONE.to_string()),
    };

    let trace = if result.trace().is_empty() {
        NONE.to_string()
    } else {
        result
            .trace()
            .iter()
            .map(|t| -> Result<String, RecordError> {
                let szs = if t.szs_status.is_empty() {
                    NONE
                } else {
                    t.szs_status.as_str()
                };
                check_chars("trace tier", &t.tier, &['\t', '\n', '\r', '=', ';', '@'])?;
                check_chars("szs status", szs, &['\t', '\n', '\r', '/', ';', '@'])?;
                Ok(format!(
                    "{}={}/{}@{}",
                    t.tier,
                    t.outcome,
                    szs,
                    format_ms(t.elapsed_us)
                ))
            })
            .collect::<Result<Vec<_>, _>>()?
            .join(";")
    };

    Ok([
        result.query_id(),
        result.category(),
        result.status().as_str(),
        tier.as_str(),
        rank.as_str(),
        format_ms(result.total_us()).as_str(),
        trace.as_str(),
    ]
    .join("\t"))
}

fn invalid(field: &'static str, value: &str) -> RecordError {
    RecordError::InvalidField {
        field,
        value: value.to_string(),
    }
}

fn decode_trace_entry(entry: &str) -> Result<TierTrace, RecordError> {
    let (tier, rest) = entry
        .split_once('=')
        .ok_or_else(|| invalid("trace entry", entry))?;
    let (verdict, ms) = rest
        .rsplit_once('@')
        .ok_or_else(|| invalid("trace entry", entry))?;
    let (outcome, szs) = verdict
        .split_once('/')
        .ok_or_else(|| invalid("trace entry", entry))?;

    if tier.is_empty() {
        return Err(invalid("trace tier", entry));
    }
    let outcome: AttemptOutcome = outcome.parse().map_err(|_| invalid("outcome", outcome))?;
    if outcome == AttemptOutcome::Interrupted {
        return Err(invalid("outcome", outcome.as_str()));
    }
    let elapsed_us = parse_ms(ms).ok_or_else(|| invalid("trace ms", ms))?;

    Ok(TierTrace {
        tier: tier.to_string(),
        outcome,
        szs_status: if szs == NONE { String::new() } else { szs.to_string() },
        elapsed_us,
    })
}

/// Decode one log line
pub fn decode(line: &str) -> Result<QueryResult, RecordError> {
    let cols: Vec<&str> = line.split('\t').collect();
    if cols.len() != COLUMNS {
        return Err(RecordError::ColumnCount(cols.len()));
    }
    let [id, category, status, tier, rank, total, trace] = [
        cols[0], cols[1], cols[2], cols[3], cols[4], cols[5], cols[6],
    ];

    if id.is_empty() {
        return Err(invalid("query_id", id));
    }
    let status: QueryStatus = status.parse().map_err(|_| invalid("status", status))?;

    let winner = match (tier, rank) {
        (NONE, NONE) => None,
        (name, rank) => Some(Winner {
            rank: rank
                .parse()
                .ok()
                .filter(|r| *r >= 1)
                .ok_or_else(|| invalid("winning_rank", rank))?,
            name: name.to_string(),
        }),
    };

    let trace = if trace == NONE {
        Vec::new()
    } else {
        trace
            .split(';')
            .map(decode_trace_entry)
            .collect::<Result<Vec<_>, _>>()?
    };

    let consistent = match (&winner, status) {
        (Some(w), QueryStatus::Proved) => trace
            .last()
            .is_some_and(|t| t.tier == w.name && t.outcome == AttemptOutcome::Proved),
        (None, QueryStatus::Exhausted | QueryStatus::Aborted) => {
            !trace.iter().any(|t| t.outcome == AttemptOutcome::Proved)
        }
        _ => false,
    };
    if !consistent {
        return Err(RecordError::Inconsistent {
            status: status.to_string(),
            winner: winner.map(|w| w.name),
        });
    }

    let total_us = parse_ms(total).ok_or_else(|| invalid("total_ms", total))?;
    let sum: u64 = trace.iter().map(|t| t.elapsed_us).sum();
    if total_us != sum {
        return Err(RecordError::TotalMismatch {
            total: total.to_string(),
            sum: format_ms(sum),
        });
    }

    Ok(QueryResult::new(id, category, status, winner, trace))
}
