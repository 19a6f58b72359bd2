//! Table Renderers
//!
//! Human, Markdown and CSV renderings of an [`AggregateReport`]. All three
//! share one row layout; only cell formatting and delimiters differ. Output
//! carries no timestamps, so an unchanged log always renders identically.

use crate::report::{AggregateReport, CategoryStatistics};

const NA: &str = "N/A";

fn header(report: &AggregateReport) -> Vec<String> {
    let mut cols: Vec<String> = [
        "Category", "N", "Proved", "Exhausted", "Aborted", "Success", "Median ms", "P90 ms",
        "Max ms",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();
    cols.extend(report.tiers.iter().map(|t| format!("T{} {}", t.rank, t.name)));
    cols
}

/// Cell values for one row; `raw` drops units and uses empty cells for N/A
fn row(stats: &CategoryStatistics, raw: bool) -> Vec<String> {
    let na = if raw { "" } else { NA };
    let ms = |f: fn(&stratabench_stats::SummaryStatistics) -> f64| {
        stats
            .proved_ms
            .as_ref()
            .map(|s| format!("{:.1}", f(s)))
            .unwrap_or_else(|| na.to_string())
    };
    let rate = if raw {
        format!("{:.2}", stats.success_rate)
    } else {
        format!("{:.1}%", stats.success_rate)
    };

    let mut cells = vec![
        stats.category.clone(),
        stats.queries.to_string(),
        stats.proved.to_string(),
        stats.exhausted.to_string(),
        stats.aborted.to_string(),
        rate,
        ms(|s| s.median),
        ms(|s| s.p90),
        ms(|s| s.max),
    ];
    cells.extend(stats.tier_histogram.iter().map(|n| n.to_string()));
    cells
}

fn body(report: &AggregateReport, raw: bool) -> Vec<Vec<String>> {
    report
        .categories
        .iter()
        .chain(std::iter::once(&report.overall))
        .map(|c| row(c, raw))
        .collect()
}

/// Aligned plain-text table for the terminal
pub fn render_human(report: &AggregateReport) -> String {
    let header = header(report);
    let rows = body(report, false);

    let mut widths: Vec<usize> = header.iter().map(|h| h.chars().count()).collect();
    for r in &rows {
        for (w, cell) in widths.iter_mut().zip(r) {
            *w = (*w).max(cell.chars().count());
        }
    }
    let line = |cells: &[String]| {
        cells
            .iter()
            .zip(&widths)
            .enumerate()
            .map(|(i, (cell, &w))| {
                if i == 0 {
                    format!("{cell:<w$}")
                } else {
                    format!("{cell:>w$}")
                }
            })
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };
    let total_width = widths.iter().sum::<usize>() + 2 * widths.len().saturating_sub(1);

    let mut out = String::new();
    out.push_str("Stratified Portfolio Results\n");
    out.push_str(&"=".repeat(total_width));
    out.push('\n');
    out.push_str(&line(&header));
    out.push('\n');
    out.push_str(&"-".repeat(total_width));
    out.push('\n');
    let Some((overall, categories)) = rows.split_last() else {
        return out;
    };
    for r in categories {
        out.push_str(&line(r));
        out.push('\n');
    }
    out.push_str(&"-".repeat(total_width));
    out.push('\n');
    out.push_str(&line(overall));
    out.push('\n');
    out
}

/// GitHub-flavoured Markdown table
pub fn render_markdown(report: &AggregateReport) -> String {
    let header = header(report);
    let rows = body(report, false);
    let escape = |s: &String| s.replace('|', "\\|");

    let mut out = String::new();
    out.push_str("| ");
    out.push_str(&header.iter().map(escape).collect::<Vec<_>>().join(" | "));
    out.push_str(" |\n|");
    for i in 0..header.len() {
        out.push_str(if i == 0 { "---|" } else { "---:|" });
    }
    out.push('\n');
    let last = rows.len().saturating_sub(1);
    for (i, r) in rows.iter().enumerate() {
        let mut cells: Vec<String> = r.iter().map(escape).collect();
        if i == last {
            cells[0] = format!("**{}**", cells[0]);
        }
        out.push_str("| ");
        out.push_str(&cells.join(" | "));
        out.push_str(" |\n");
    }
    out
}

fn csv_field(s: &str) -> String {
    if s.contains([',', '"', '\n']) {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

/// RFC 4180 CSV with raw numbers
pub fn render_csv(report: &AggregateReport) -> String {
    let mut header = header(report);
    header[5] = "success_pct".to_string();
    let mut out = String::new();
    for r in std::iter::once(header).chain(body(report, true)) {
        out.push_str(&r.iter().map(|c| csv_field(c)).collect::<Vec<_>>().join(","));
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::aggregate;
    use stratabench_core::{AttemptOutcome, QueryResult, QueryStatus, TierTrace, Winner};

    fn report() -> AggregateReport {
        let trace = |tier: &str, outcome, ms: u64| TierTrace {
            tier: tier.to_string(),
            outcome,
            szs_status: String::new(),
            elapsed_us: ms * 1000,
        };
        aggregate(&[
            QueryResult::new(
                "test_time_1",
                "Time",
                QueryStatus::Proved,
                Some(Winner {
                    rank: 1,
                    name: "Best0".to_string(),
                }),
                vec![trace("Best0", AttemptOutcome::Proved, 24)],
            ),
            QueryResult::new(
                "test_comb_1",
                "Combined",
                QueryStatus::Exhausted,
                None,
                vec![trace("Best0", AttemptOutcome::TimedOut, 61_000)],
            ),
        ])
    }

    #[test]
    fn test_human_table() {
        let out = render_human(&report());
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "Stratified Portfolio Results");
        assert!(lines[2].starts_with("Category"));
        assert!(lines[2].ends_with("T1 Best0"));
        assert!(lines[4].starts_with("Combined"));
        assert!(lines[4].contains("N/A"));
        assert!(lines[5].starts_with("Time"));
        assert!(lines[5].contains("24.0"));
        assert!(lines[7].starts_with("All"));
    }

    #[test]
    fn test_markdown_table() {
        let out = render_markdown(&report());
        let lines: Vec<&str> = out.lines().collect();
        assert!(lines[0].starts_with("| Category | N | Proved"));
        assert!(lines[1].starts_with("|---|---:|"));
        assert_eq!(lines.len(), 5);
        assert!(lines[4].starts_with("| **All** | 2 | 1 | 1 | 0 | 50.0% |"));
    }

    #[test]
    fn test_csv_uses_empty_for_missing() {
        let out = render_csv(&report());
        let lines: Vec<&str> = out.lines().collect();
        assert!(lines[0].starts_with("Category,N,Proved,Exhausted,Aborted,success_pct,"));
        assert_eq!(lines[1], "Combined,1,0,1,0,0.00,,,,0");
        assert_eq!(lines[2], "Time,1,1,0,0,100.00,24.0,24.0,24.0,1");
    }

    #[test]
    fn test_csv_quoting() {
        assert_eq!(csv_field("Century/leap edge"), "Century/leap edge");
        assert_eq!(csv_field("a,b"), "\"a,b\"");
        assert_eq!(csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn test_rendering_is_deterministic() {
        assert_eq!(render_human(&report()), render_human(&report()));
        assert_eq!(render_csv(&report()), render_csv(&report()));
    }
}
