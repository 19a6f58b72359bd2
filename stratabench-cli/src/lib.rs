//! StrataBench CLI Library
//!
//! Command-line front end of the stratified portfolio orchestrator: loads
//! `strata.toml`, plans the queries, runs them tier by tier against the
//! external prover and renders reports from the result log.
//!
//! # Example
//!
//! ```ignore
//! fn main() {
//!     if let Err(e) = stratabench_cli::run() {
//!         std::process::exit(stratabench_cli::report_error(&e));
//!     }
//! }
//! ```

mod config;
mod executor;
mod planner;
mod runner;
mod shutdown;

pub use config::*;
pub use executor::{
    BatchCoordinator, BatchError, BatchOptions, BatchSummary, ORCHESTRATION_ERROR, RunMetadata,
    Selection, TierSelector, format_batch_error, format_result_line, format_summary,
};
pub use planner::{QueryPlan, build_plan};
pub use runner::{
    AttemptRunner, DescendantWatch, KillReport, POLL_TICK, ProcEntry, ProcessRunner,
    ProverCommand, RunnerError, RunnerOptions, SPAWN_ERROR, descendants, hardkill,
    is_spawn_failure, parse_stat, process_table, timeout_arg,
};
pub use shutdown::{CancelToken, install_signal_handlers, shutdown_requested};

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use regex::Regex;
use std::path::{Path, PathBuf};
use stratabench_core::{ErrorPolicy, QuerySuite, TierSet};
use stratabench_log::{LogWriter, completed_ids};
use stratabench_report::{OutputFormat, aggregate_log, render};
use tracing_subscriber::EnvFilter;

/// Exit code for a batch stopped by SIGINT/SIGTERM
pub const EXIT_INTERRUPTED: i32 = 130;

/// StrataBench CLI arguments
#[derive(Parser, Debug)]
#[command(name = "stratabench")]
#[command(author, version, about = "StrataBench - stratified theorem-prover portfolio runner")]
pub struct Cli {
    /// Optional subcommand (Run, List, Report, Init); defaults to Run
    #[command(subcommand)]
    pub command: Option<Commands>,

    #[command(flatten)]
    pub run: RunArgs,
}

/// Options shared by every subcommand
#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// Configuration file (default: strata.toml found by walking up)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Prover binary (overrides $STRATA_PROVER and prover.path)
    #[arg(long, global = true)]
    pub prover: Option<PathBuf>,

    /// Query suite: a conjecture file or a directory of problems
    #[arg(long, global = true)]
    pub suite: Option<PathBuf>,

    /// Tier as NAME=PATH[@TIMEOUT]; repeat in the order to try them
    #[arg(long = "tier", global = true, value_name = "NAME=PATH[@TIMEOUT]")]
    pub tiers: Vec<String>,

    /// Number of queries run concurrently
    #[arg(long, short = 'j', global = true)]
    pub jobs: Option<usize>,

    /// Result log (also the resume source)
    #[arg(long, global = true)]
    pub log: Option<PathBuf>,

    /// Time limit for tiers without their own (e.g. 61s)
    #[arg(long, global = true)]
    pub timeout: Option<String>,

    /// Wall budget per query across all tiers (e.g. 190s)
    #[arg(long, global = true)]
    pub query_ceiling: Option<String>,

    /// What a prover error does: abort-query or next-tier
    #[arg(long, global = true)]
    pub on_error: Option<ErrorPolicy>,

    /// Only queries whose id matches this regex
    #[arg(long, global = true)]
    pub filter: Option<String>,

    /// Only queries in this category
    #[arg(long, global = true)]
    pub category: Option<String>,

    /// Save raw output of unproved attempts in this directory
    #[arg(long, global = true)]
    pub raw_log_dir: Option<PathBuf>,

    /// Do not draw a progress bar
    #[arg(long, global = true)]
    pub no_progress: bool,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the portfolio over the suite (default)
    Run,
    /// Show the plan: queries, categories, tiers, what the log already has
    List,
    /// Aggregate the result log into per-category statistics
    Report {
        /// Output format: human, markdown, csv, json
        #[arg(long)]
        format: Option<String>,
        /// Output file (stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print a default strata.toml
    Init,
}

/// Run the StrataBench CLI with the process arguments.
pub fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    run_with_cli(cli)
}

/// Run the StrataBench CLI with pre-parsed arguments.
pub fn run_with_cli(cli: Cli) -> anyhow::Result<()> {
    init_tracing(cli.run.verbose);

    match cli.command {
        Some(Commands::Init) => {
            print!("{}", StrataConfig::default_toml());
            Ok(())
        }
        Some(Commands::Report { format, output }) => {
            let config = load_config(&cli.run)?;
            write_report(&cli.run, &config, format.as_deref(), output.as_deref())
        }
        Some(Commands::List) => {
            let config = load_config(&cli.run)?;
            list_plan(&cli.run, &config)
        }
        Some(Commands::Run) | None => {
            let config = load_config(&cli.run)?;
            run_portfolio(&cli.run, &config)
        }
    }
}

/// Print a failure the way the console expects and return the exit code
pub fn report_error(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<BatchError>() {
        Some(batch) => {
            eprintln!("{}", format_batch_error(batch));
            match batch {
                BatchError::Interrupted { .. } => EXIT_INTERRUPTED,
                _ => 1,
            }
        }
        None => {
            eprintln!("\n{ORCHESTRATION_ERROR}: {err:#}");
            1
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "stratabench=debug,stratabench_cli=debug,stratabench_core=debug,stratabench_log=debug"
    } else {
        "warn,stratabench_cli=info,stratabench_log=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    // A second initialisation (tests driving the CLI repeatedly) keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn absolute(path: &Path) -> anyhow::Result<PathBuf> {
    std::path::absolute(path).with_context(|| format!("cannot resolve {}", path.display()))
}

/// Layer: strata.toml (explicit or discovered) → CLI overrides.
fn load_config(args: &RunArgs) -> anyhow::Result<StrataConfig> {
    let mut config = match &args.config {
        Some(path) => StrataConfig::load(path)?,
        None => StrataConfig::discover()?.unwrap_or_default(),
    };

    // CLI paths are relative to the working directory, not the config file.
    if let Some(suite) = &args.suite {
        config.suite.path = Some(absolute(suite)?);
    }
    if !args.tiers.is_empty() {
        config.tiers = args
            .tiers
            .iter()
            .map(|arg| -> anyhow::Result<TierConfig> {
                let mut tier = StrataConfig::parse_tier_arg(arg)?;
                tier.axioms = absolute(&tier.axioms)?;
                Ok(tier)
            })
            .collect::<anyhow::Result<Vec<_>>>()?;
    }
    if let Some(jobs) = args.jobs {
        config.runner.jobs = jobs;
    }
    if let Some(log) = &args.log {
        config.output.log = absolute(log)?;
    }
    if let Some(timeout) = &args.timeout {
        config.runner.timeout = timeout.clone();
    }
    if let Some(ceiling) = &args.query_ceiling {
        config.runner.query_ceiling = Some(ceiling.clone());
    }
    if let Some(policy) = args.on_error {
        config.runner.on_error = policy;
    }
    if let Some(dir) = &args.raw_log_dir {
        config.runner.raw_log_dir = Some(absolute(dir)?);
    }
    Ok(config)
}

fn load_inputs(config: &StrataConfig) -> anyhow::Result<(QuerySuite, TierSet)> {
    let suite_path = config.suite_path()?;
    let suite = QuerySuite::load(&suite_path, &config.categories)
        .with_context(|| format!("loading query suite {}", suite_path.display()))?;
    let tiers = TierSet::load(&config.tier_specs()?)?;
    Ok((suite, tiers))
}

fn filter_regex(args: &RunArgs) -> anyhow::Result<Option<Regex>> {
    args.filter
        .as_deref()
        .map(|f| Regex::new(f).with_context(|| format!("invalid --filter pattern {f:?}")))
        .transpose()
}

fn describe_tiers(tiers: &TierSet) -> String {
    tiers
        .iter()
        .map(|t| format!("{} ({}s)", t.name(), t.time_limit().as_secs_f64()))
        .collect::<Vec<_>>()
        .join(" → ")
}

fn list_plan(args: &RunArgs, config: &StrataConfig) -> anyhow::Result<()> {
    let (suite, tiers) = load_inputs(config)?;
    let filter = filter_regex(args)?;
    let log_path = config.log_path();
    let logged = completed_ids(&log_path)?;
    let plan = build_plan(&suite, filter.as_ref(), args.category.as_deref(), &logged);

    println!("StrataBench Plan:");
    println!("├── suite: {} ({} queries)", suite.source().display(), suite.len());
    println!("├── tiers: {}", describe_tiers(&tiers));
    match config.resolve_prover(args.prover.as_deref()) {
        Ok(p) => println!("├── prover: {}", p.display()),
        Err(e) => println!("├── prover: {e}"),
    }
    println!("├── log: {}", log_path.display());

    let mut categories: std::collections::BTreeMap<&str, (usize, usize)> =
        std::collections::BTreeMap::new();
    for q in &plan.queries {
        let entry = categories.entry(q.category.as_str()).or_default();
        entry.0 += 1;
        if plan.completed.contains(q.id.as_str()) {
            entry.1 += 1;
        }
    }
    for (category, (total, done)) in &categories {
        println!("│   ├── {category}: {total} queries, {done} done");
    }
    println!(
        "{} queries selected, {} already in log, {} pending.",
        plan.queries.len(),
        plan.completed.len(),
        plan.pending_count()
    );
    Ok(())
}

fn run_portfolio(args: &RunArgs, config: &StrataConfig) -> anyhow::Result<()> {
    install_signal_handlers();

    let (suite, tiers) = load_inputs(config)?;
    let filter = filter_regex(args)?;
    let prover = config.resolve_prover(args.prover.as_deref())?;
    let query_ceiling = config.query_ceiling()?;
    let jobs = config.runner.jobs.max(1);

    let log_path = config.log_path();
    let log = LogWriter::open(&log_path)?;
    let logged = completed_ids(&log_path)?;
    let plan = build_plan(&suite, filter.as_ref(), args.category.as_deref(), &logged);

    let runner = ProcessRunner::new(
        ProverCommand::new(&prover, config.prover.args.clone()),
        RunnerOptions {
            output_limit: config.runner.output_limit,
            scratch_dir: config.runner.scratch_dir.as_deref().map(|p| config.resolve_path(p)),
            raw_log_dir: config.runner.raw_log_dir.as_deref().map(|p| config.resolve_path(p)),
        },
    );

    let meta = RunMetadata::collect(&prover, &tiers, jobs);
    log.mark(&meta.marker(plan.pending_count(), plan.completed.len()))?;

    println!("{}", "=".repeat(60));
    println!(
        "STRATIFIED PORTFOLIO RUN - {} queries ({} already in log)",
        plan.queries.len(),
        plan.completed.len()
    );
    println!("Tiers: {}", describe_tiers(&tiers));
    println!("Prover: {}", prover.display());
    println!("Log: {}", log_path.display());
    println!("{}", "=".repeat(60));

    let options = BatchOptions {
        jobs,
        policy: config.runner.on_error,
        query_ceiling,
        show_progress: !args.no_progress,
    };
    let cancel = CancelToken::new();
    let summary = BatchCoordinator::new(&runner, &tiers, &log, options).run(&plan.queries, &cancel)?;

    print!("{}", format_summary(&summary, meta.elapsed()));
    println!("Report: stratabench report --log {}", log_path.display());
    Ok(())
}

fn write_report(
    args: &RunArgs,
    config: &StrataConfig,
    format: Option<&str>,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    let format: OutputFormat = format
        .unwrap_or(config.output.format.as_str())
        .parse()
        .map_err(anyhow::Error::msg)?;
    let log_path = match &args.log {
        Some(path) => path.clone(),
        None => config.log_path(),
    };
    if !log_path.exists() {
        tracing::warn!(path = %log_path.display(), "result log not found; reporting nothing");
    }

    let report = aggregate_log(&log_path)?;
    let text = render(&report, format)?;
    match output {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, text)
                .with_context(|| format!("writing report to {}", path.display()))?;
            eprintln!("Report written to {}", path.display());
        }
        None => print!("{text}"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_run_flags() {
        let cli = Cli::try_parse_from([
            "stratabench",
            "--suite",
            "conj.p",
            "--tier",
            "Best0=b0.p@30s",
            "--tier",
            "Best1=b1.p",
            "--jobs",
            "4",
            "--on-error",
            "next-tier",
        ])
        .unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.run.tiers.len(), 2);
        assert_eq!(cli.run.jobs, Some(4));
        assert_eq!(cli.run.on_error, Some(ErrorPolicy::NextTier));
    }

    #[test]
    fn test_cli_report_subcommand() {
        let cli = Cli::try_parse_from([
            "stratabench",
            "report",
            "--log",
            "r.tsv",
            "--format",
            "csv",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Some(Commands::Report { ref format, .. }) if format.as_deref() == Some("csv")
        ));
        assert_eq!(cli.run.log, Some(PathBuf::from("r.tsv")));
    }

    #[test]
    fn test_cli_rejects_bad_policy() {
        assert!(Cli::try_parse_from(["stratabench", "--on-error", "retry"]).is_err());
    }

    #[test]
    fn test_overrides_replace_config_tiers() {
        let args = RunArgs {
            config: Some(PathBuf::from("/nonexistent/strata.toml")),
            ..RunArgs::default()
        };
        assert!(load_config(&args).is_err());

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("strata.toml");
        std::fs::write(
            &path,
            "[[tiers]]\nname = \"Best0\"\naxioms = \"b0.p\"\n\n[runner]\njobs = 2\n",
        )
        .unwrap();

        let args = RunArgs {
            config: Some(path.clone()),
            ..RunArgs::default()
        };
        let config = load_config(&args).unwrap();
        assert_eq!(config.runner.jobs, 2);
        assert_eq!(config.tier_specs().unwrap()[0].axioms, dir.path().join("b0.p"));

        let args = RunArgs {
            config: Some(path),
            tiers: vec!["Heavy=/ax/heavy.p@5s".to_string()],
            jobs: Some(8),
            ..RunArgs::default()
        };
        let config = load_config(&args).unwrap();
        assert_eq!(config.runner.jobs, 8);
        let specs = config.tier_specs().unwrap();
        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0].name, "Heavy");
        assert_eq!(specs[0].axioms, PathBuf::from("/ax/heavy.p"));
    }
}
