//! JSON Output

use crate::report::AggregateReport;
use serde::{Deserialize, Serialize};

/// Schema identifier embedded in JSON output
pub const REPORT_SCHEMA: &str = "stratabench-report";

/// Schema envelope around the aggregate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportSchema {
    /// Always [`REPORT_SCHEMA`]
    pub schema: String,
    /// Bumped when the layout of `report` changes
    pub version: u32,
    /// The aggregate itself
    pub report: AggregateReport,
}

/// Generate a prettified JSON report.
pub fn generate_json_report(report: &AggregateReport) -> Result<String, serde_json::Error> {
    let envelope = ReportSchema {
        schema: REPORT_SCHEMA.to_string(),
        version: 1,
        report: report.clone(),
    };
    let mut out = serde_json::to_string_pretty(&envelope)?;
    out.push('\n');
    Ok(out)
}
