#![warn(missing_docs)]
//! StrataBench Report - Aggregation and Tables
//!
//! Turns a result log into per-category statistics and renders them:
//! - Human (aligned terminal table)
//! - Markdown (paper drafts, CI summaries)
//! - CSV (spreadsheets)
//! - JSON (machine-readable)

mod json;
mod report;
mod tables;

pub use json::{REPORT_SCHEMA, ReportSchema, generate_json_report};
pub use report::{AggregateReport, CategoryStatistics, OVERALL_LABEL, TierColumn, aggregate};
pub use tables::{render_csv, render_human, render_markdown};

use std::path::Path;
use stratabench_log::{LogError, read_log};

/// Output format selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable terminal output
    #[default]
    Human,
    /// Markdown table
    Markdown,
    /// CSV for spreadsheets
    Csv,
    /// JSON with schema envelope
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "human" | "text" => Ok(OutputFormat::Human),
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            "csv" => Ok(OutputFormat::Csv),
            "json" => Ok(OutputFormat::Json),
            other => Err(format!("Unknown output format: {}", other)),
        }
    }
}

/// Render a report in the requested format
pub fn render(report: &AggregateReport, format: OutputFormat) -> Result<String, serde_json::Error> {
    Ok(match format {
        OutputFormat::Human => render_human(report),
        OutputFormat::Markdown => render_markdown(report),
        OutputFormat::Csv => render_csv(report),
        OutputFormat::Json => generate_json_report(report)?,
    })
}

/// Read a result log and aggregate it
pub fn aggregate_log(path: &Path) -> Result<AggregateReport, LogError> {
    let contents = read_log(path)?;
    Ok(aggregate(&contents.results))
}
