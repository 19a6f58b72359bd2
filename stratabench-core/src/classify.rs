//! Prover output classification
//!
//! Maps raw prover output onto an [`AttemptOutcome`] using the SZS ontology.
//! The SZS status line wins over everything else; without one we fall back to
//! well-known markers and finally to the exit status.

use crate::outcome::AttemptOutcome;
use regex::Regex;
use std::sync::LazyLock;

static SZS_STATUS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)SZS\s+status\s*:?\s*([A-Za-z]+)").expect("static regex")
});

const ERROR_MARKERS: &[&str] = &[
    "user error",
    "syntax error",
    "parsing error",
    "parse error",
    "type error",
    "segmentation fault",
    "core dumped",
];

/// Outcome plus the status word that justified it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    /// Classified outcome
    pub outcome: AttemptOutcome,
    /// Status word the outcome was derived from
    pub szs_status: String,
}

impl Verdict {
    fn new(outcome: AttemptOutcome, szs_status: &str) -> Self {
        Self {
            outcome,
            szs_status: szs_status.to_string(),
        }
    }
}

/// Outcome implied by an SZS status word, `None` for words we do not know
pub fn outcome_for_status(status: &str) -> Option<AttemptOutcome> {
    let outcome = match status {
        "Theorem" | "Unsatisfiable" => AttemptOutcome::Proved,
        "CounterSatisfiable" | "Satisfiable" | "CounterTheorem" => AttemptOutcome::Disproved,
        "Timeout" | "ResourceOut" | "MemoryOut" => AttemptOutcome::TimedOut,
        "ContradictoryAxioms" | "InputError" | "SyntaxError" | "TypeError" | "OSError"
        | "Error" | "UsageError" => AttemptOutcome::Error,
        "GaveUp" | "Unknown" | "Inappropriate" | "Incomplete" => AttemptOutcome::Indeterminate,
        _ => return None,
    };
    Some(outcome)
}

/// Classify prover output
///
/// `exit_code` is `None` when the process died from a signal we did not send.
/// Attempts killed at the deadline never reach this function.
pub fn classify_output(output: &str, exit_code: Option<i32>) -> Verdict {
    // Last status line wins; some provers print an intermediate one per strategy.
    if let Some(caps) = SZS_STATUS.captures_iter(output).last() {
        let word = &caps[1];
        return match outcome_for_status(word) {
            Some(outcome) => Verdict::new(outcome, word),
            None => Verdict::new(AttemptOutcome::Indeterminate, word),
        };
    }

    if output.contains("Refutation found") || output.contains("Termination reason: Refutation") {
        return Verdict::new(AttemptOutcome::Proved, "Theorem");
    }
    if output.contains("Termination reason: Satisfiable") || output.contains("Finite model found") {
        return Verdict::new(AttemptOutcome::Disproved, "CounterSatisfiable");
    }
    if output.contains("Termination reason: Time limit") || output.contains("Time limit reached") {
        return Verdict::new(AttemptOutcome::TimedOut, "Timeout");
    }
    let lower = output.to_ascii_lowercase();
    if let Some(marker) = ERROR_MARKERS.iter().find(|m| lower.contains(*m)) {
        let word = if marker.contains("fault") || marker.contains("core") {
            "Crash"
        } else {
            "InputError"
        };
        return Verdict::new(AttemptOutcome::Error, word);
    }

    match exit_code {
        None => Verdict::new(AttemptOutcome::Error, "Crash"),
        Some(_) => Verdict::new(AttemptOutcome::Indeterminate, "Unknown"),
    }
}
