//! Console Formatting
//!
//! One line per finished query, plus the end-of-run summary. Exhausting every
//! tier is a normal result and reads as such; orchestration failures get a
//! loud `ORCHESTRATION ERROR` banner so the two are never confused.

use super::batch::{BatchError, BatchSummary};
use stratabench_core::{QueryResult, QueryStatus};

/// Banner prefix for batch-level failures
pub const ORCHESTRATION_ERROR: &str = "ORCHESTRATION ERROR";

fn trace_summary(result: &QueryResult) -> String {
    result
        .trace()
        .iter()
        .map(|t| format!("{}:{}@{:.0}ms", t.tier, t.szs_status, t.elapsed_us as f64 / 1000.0))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Format a finished query for the console
pub fn format_result_line(result: &QueryResult, tier_count: usize) -> String {
    match (result.status(), result.winner()) {
        (QueryStatus::Proved, Some(winner)) => format!(
            "  ✓ {:<30} PROVED     T{} {} in {:.1} ms",
            result.query_id(),
            winner.rank,
            winner.name,
            result.total_ms()
        ),
        (QueryStatus::Aborted, _) => format!(
            "  ✗ {:<30} ABORTED    after {} tier(s): {}",
            result.query_id(),
            result.attempts(),
            trace_summary(result)
        ),
        _ => format!(
            "  · {:<30} EXHAUSTED  {}/{} tiers in {:.1} ms: {}",
            result.query_id(),
            result.attempts(),
            tier_count,
            result.total_ms(),
            trace_summary(result)
        ),
    }
}

/// Closing summary for a finished batch
pub fn format_summary(summary: &BatchSummary, elapsed: chrono::TimeDelta) -> String {
    let mut output = String::new();
    output.push('\n');
    output.push_str(&"=".repeat(60));
    output.push('\n');
    output.push_str(&format!(
        "{} queries: {} run, {} already in log\n",
        summary.total,
        summary.completed(),
        summary.skipped
    ));
    output.push_str(&format!(
        "  proved {}  exhausted {}  aborted {}\n",
        summary.proved, summary.exhausted, summary.aborted
    ));
    output.push_str(&format!("Wall time: {}\n", format_wall(elapsed)));
    output
}

fn format_wall(elapsed: chrono::TimeDelta) -> String {
    let secs = elapsed.num_seconds().max(0);
    format!("{}h {:02}m {:02}s", secs / 3600, (secs / 60) % 60, secs % 60)
}

/// Banner for an aborted or interrupted batch
pub fn format_batch_error(err: &BatchError) -> String {
    match err {
        BatchError::Interrupted { .. } => format!("\nINTERRUPTED: {err}"),
        _ => format!("\n{ORCHESTRATION_ERROR}: {err}\nThe batch was aborted; results logged so far are kept."),
    }
}
