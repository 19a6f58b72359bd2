//! Configuration loading from strata.toml
//!
//! A `strata.toml` in the project root describes the prover, the tiers and the
//! suite. The file is discovered by walking up from the current directory;
//! relative paths inside it are resolved against the directory it lives in.

use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;
use stratabench_core::{CategoryRules, DEFAULT_OUTPUT_LIMIT, ErrorPolicy, TierSpec};
use thiserror::Error;

/// File name searched for by [`StrataConfig::discover`]
pub const CONFIG_FILE: &str = "strata.toml";

/// Environment variable naming the prover binary
pub const PROVER_ENV: &str = "STRATA_PROVER";

/// Binaries looked up on `PATH` when nothing else names the prover
pub const PROVER_CANDIDATES: &[&str] = &["vampire-main", "vampire"];

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid duration {0:?}")]
    InvalidDuration(String),

    #[error("invalid tier {0:?}: expected NAME=PATH[@TIMEOUT]")]
    InvalidTier(String),

    #[error("no tiers configured: add [[tiers]] to strata.toml or pass --tier")]
    NoTiers,

    #[error("no query suite configured: set [suite] path or pass --suite")]
    NoSuite,

    #[error("prover binary not found (tried {tried})")]
    ProverNotFound { tried: String },
}

/// Top-level configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StrataConfig {
    /// External prover
    #[serde(default)]
    pub prover: ProverConfig,
    /// Attempt execution
    #[serde(default)]
    pub runner: RunnerConfig,
    /// Query suite
    #[serde(default)]
    pub suite: SuiteConfig,
    /// Axiom tiers in the order they are tried
    #[serde(default)]
    pub tiers: Vec<TierConfig>,
    /// Category taxonomy
    #[serde(default)]
    pub categories: CategoryRules,
    /// Result log and report output
    #[serde(default)]
    pub output: OutputConfig,
    /// Directory relative paths are resolved against
    #[serde(skip)]
    pub base_dir: Option<PathBuf>,
}

/// Prover binary and its argument template
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProverConfig {
    /// Explicit binary path
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// Arguments; `{input}` is the problem file, `{timeout}` whole seconds
    #[serde(default = "default_prover_args")]
    pub args: Vec<String>,
}

impl Default for ProverConfig {
    fn default() -> Self {
        Self {
            path: None,
            args: default_prover_args(),
        }
    }
}

fn default_prover_args() -> Vec<String> {
    ["--mode", "casc", "-qa", "plain", "--time_limit", "{timeout}", "{input}"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// Runner configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Concurrent queries
    #[serde(default = "default_jobs")]
    pub jobs: usize,
    /// Time limit for tiers that do not set their own (e.g. "61s")
    #[serde(default = "default_timeout")]
    pub timeout: String,
    /// Bytes of stdout and of stderr kept per attempt
    #[serde(default = "default_output_limit")]
    pub output_limit: usize,
    /// Where scratch problem files are created (system temp dir if unset)
    #[serde(default)]
    pub scratch_dir: Option<PathBuf>,
    /// Save raw prover output of unproved attempts here
    #[serde(default)]
    pub raw_log_dir: Option<PathBuf>,
    /// What a prover error does to the query
    #[serde(default)]
    pub on_error: ErrorPolicy,
    /// Wall budget shared by all tiers of one query
    #[serde(default)]
    pub query_ceiling: Option<String>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            jobs: default_jobs(),
            timeout: default_timeout(),
            output_limit: default_output_limit(),
            scratch_dir: None,
            raw_log_dir: None,
            on_error: ErrorPolicy::default(),
            query_ceiling: None,
        }
    }
}

fn default_jobs() -> usize {
    1
}
fn default_timeout() -> String {
    "61s".to_string()
}
fn default_output_limit() -> usize {
    DEFAULT_OUTPUT_LIMIT
}

/// Query suite location
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SuiteConfig {
    /// A TPTP file of conjectures or a directory of problem files
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// One `[[tiers]]` entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierConfig {
    pub name: String,
    pub axioms: PathBuf,
    /// Overrides `runner.timeout`
    #[serde(default)]
    pub timeout: Option<String>,
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Result log path
    #[serde(default = "default_log")]
    pub log: PathBuf,
    /// Report format: human, markdown, csv, json
    #[serde(default = "default_format")]
    pub format: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            log: default_log(),
            format: default_format(),
        }
    }
}

fn default_log() -> PathBuf {
    PathBuf::from("results/strata_results.tsv")
}
fn default_format() -> String {
    "human".to_string()
}

impl StrataConfig {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: Self = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.base_dir = path.parent().map(Path::to_path_buf);
        Ok(config)
    }

    /// Find `strata.toml` by walking up from the current directory
    pub fn discover_path() -> Option<PathBuf> {
        let mut dir = std::env::current_dir().ok()?;
        loop {
            let config_path = dir.join(CONFIG_FILE);
            if config_path.is_file() {
                return Some(config_path);
            }
            if !dir.pop() {
                return None;
            }
        }
    }

    /// Discover and load configuration; `None` when no file exists
    pub fn discover() -> Result<Option<Self>, ConfigError> {
        Self::discover_path().map(Self::load).transpose()
    }

    /// Resolve a configured path against the config file's directory
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        match &self.base_dir {
            Some(base) if path.is_relative() && !base.as_os_str().is_empty() => base.join(path),
            _ => path.to_path_buf(),
        }
    }

    /// Per-tier limit for tiers without their own timeout
    pub fn default_time_limit(&self) -> Result<Duration, ConfigError> {
        Self::parse_duration(&self.runner.timeout)
    }

    /// Optional per-query budget
    pub fn query_ceiling(&self) -> Result<Option<Duration>, ConfigError> {
        self.runner
            .query_ceiling
            .as_deref()
            .map(Self::parse_duration)
            .transpose()
    }

    /// Tier specs in configured order, paths resolved
    pub fn tier_specs(&self) -> Result<Vec<TierSpec>, ConfigError> {
        if self.tiers.is_empty() {
            return Err(ConfigError::NoTiers);
        }
        let fallback = self.default_time_limit()?;
        self.tiers
            .iter()
            .map(|t| {
                let time_limit = match &t.timeout {
                    Some(s) => Self::parse_duration(s)?,
                    None => fallback,
                };
                Ok(TierSpec {
                    name: t.name.clone(),
                    axioms: self.resolve_path(&t.axioms),
                    time_limit,
                })
            })
            .collect()
    }

    /// Suite path, resolved
    pub fn suite_path(&self) -> Result<PathBuf, ConfigError> {
        self.suite
            .path
            .as_deref()
            .map(|p| self.resolve_path(p))
            .ok_or(ConfigError::NoSuite)
    }

    /// Result log path, resolved
    pub fn log_path(&self) -> PathBuf {
        self.resolve_path(&self.output.log)
    }

    /// Locate the prover binary.
    ///
    /// Order: explicit flag, `STRATA_PROVER`, `prover.path`, `PATH` lookup of
    /// `vampire-main` then `vampire`, and finally `./vampire`.
    pub fn resolve_prover(&self, flag: Option<&Path>) -> Result<PathBuf, ConfigError> {
        let configured = self.prover.path.as_deref().map(|p| self.resolve_path(p));
        let cwd = std::env::current_dir().unwrap_or_default();
        resolve_prover_from(
            flag,
            std::env::var_os(PROVER_ENV),
            configured.as_deref(),
            std::env::var_os("PATH"),
            &cwd,
        )
    }

    /// Parse a `--tier NAME=PATH[@TIMEOUT]` argument
    pub fn parse_tier_arg(arg: &str) -> Result<TierConfig, ConfigError> {
        let invalid = || ConfigError::InvalidTier(arg.to_string());
        let (name, rest) = arg.split_once('=').ok_or_else(invalid)?;
        let name = name.trim();
        if name.is_empty() || rest.is_empty() {
            return Err(invalid());
        }
        // A trailing `@61s` is a timeout only if it parses as one; paths may contain '@'.
        let (axioms, timeout) = match rest.rsplit_once('@') {
            Some((path, t)) if !path.is_empty() && Self::parse_duration(t).is_ok() => {
                (path, Some(t.to_string()))
            }
            _ => (rest, None),
        };
        Ok(TierConfig {
            name: name.to_string(),
            axioms: PathBuf::from(axioms),
            timeout,
        })
    }

    /// Generate a default configuration as TOML string
    pub fn default_toml() -> String {
        r#"# StrataBench Configuration

[prover]
# Prover binary (otherwise $STRATA_PROVER, then vampire-main/vampire on PATH, then ./vampire)
# path = "/usr/local/bin/vampire"
# Argument template: {input} is the problem file, {timeout} the tier limit in seconds
args = ["--mode", "casc", "-qa", "plain", "--time_limit", "{timeout}", "{input}"]

[runner]
# Queries run concurrently; tiers within a query are always sequential
jobs = 1
# Time limit for tiers without their own timeout
timeout = "61s"
# Bytes of stdout and stderr kept per attempt
output_limit = 65536
# What a prover error does: "abort-query" or "next-tier"
on_error = "abort-query"
# Wall budget shared by all tiers of one query (uncomment to enable)
# query_ceiling = "190s"
# Scratch directory for problem files (uncomment to enable)
# scratch_dir = "/tmp/strata"
# Keep raw output of unproved attempts (uncomment to enable)
# raw_log_dir = "raw_logs"

[suite]
# TPTP file of conjectures, or a directory with one problem per file
path = "conjectures.p"

[[tiers]]
name = "Best0"
axioms = "axioms/best0.p"

[[tiers]]
name = "Best1"
axioms = "axioms/best1.p"

[[tiers]]
name = "SafeHeavy"
axioms = "axioms/safe_heavy.p"
timeout = "61s"

[categories]
# Category of queries matching no rule
default = "Core arithmetic"
# Custom rules replace the built-in taxonomy; first match wins
# [[categories.rules]]
# name = "Weekday"
# prefixes = ["test_wk_"]

[output]
# Append-only result log (also the resume source)
log = "results/strata_results.tsv"
# Report format: human, markdown, csv, json
format = "human"
"#
        .to_string()
    }

    /// Parse duration string (e.g., "61s", "500ms", "2m"); a bare number is seconds
    pub fn parse_duration(s: &str) -> Result<Duration, ConfigError> {
        let invalid = || ConfigError::InvalidDuration(s.to_string());
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(invalid());
        }

        let (num_part, unit_part) = trimmed
            .char_indices()
            .find(|(_, c)| c.is_alphabetic() || *c == 'µ')
            .map(|(i, _)| trimmed.split_at(i))
            .unwrap_or((trimmed, "s"));

        let value: f64 = num_part.trim().parse().map_err(|_| invalid())?;
        if !value.is_finite() || value < 0.0 {
            return Err(invalid());
        }

        let multiplier: f64 = match unit_part.trim().to_lowercase().as_str() {
            "ns" => 1e-9,
            "us" | "µs" => 1e-6,
            "ms" => 1e-3,
            "s" | "" => 1.0,
            "m" | "min" => 60.0,
            "h" => 3600.0,
            _ => return Err(invalid()),
        };

        Duration::try_from_secs_f64(value * multiplier).map_err(|_| invalid())
    }
}

fn resolve_prover_from(
    flag: Option<&Path>,
    env: Option<OsString>,
    configured: Option<&Path>,
    path_var: Option<OsString>,
    cwd: &Path,
) -> Result<PathBuf, ConfigError> {
    let mut tried = Vec::new();

    // Explicit choices are taken as given; a bad one fails at spawn with a clear error.
    if let Some(p) = flag {
        return Ok(p.to_path_buf());
    }
    if let Some(p) = env.filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(p));
    }
    if let Some(p) = configured {
        return Ok(p.to_path_buf());
    }

    if let Some(paths) = path_var {
        for dir in std::env::split_paths(&paths) {
            for name in PROVER_CANDIDATES {
                let candidate = dir.join(name);
                if is_executable(&candidate) {
                    return Ok(candidate);
                }
            }
        }
    }
    tried.extend(PROVER_CANDIDATES.iter().map(|n| format!("{n} on PATH")));

    let local = cwd.join("vampire");
    if is_executable(&local) {
        return Ok(local);
    }
    tried.push(local.display().to_string());

    Err(ConfigError::ProverNotFound {
        tried: tried.join(", "),
    })
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = StrataConfig::default();
        assert_eq!(config.runner.jobs, 1);
        assert_eq!(config.runner.timeout, "61s");
        assert_eq!(config.runner.on_error, ErrorPolicy::AbortQuery);
        assert_eq!(config.prover.args.last().map(String::as_str), Some("{input}"));
        assert_eq!(config.output.log, PathBuf::from("results/strata_results.tsv"));
        assert!(config.runner.query_ceiling.is_none());
    }

    #[test]
    fn test_parse_duration() {
        let d = StrataConfig::parse_duration;
        assert_eq!(d("61s").unwrap(), Duration::from_secs(61));
        assert_eq!(d("500ms").unwrap(), Duration::from_millis(500));
        assert_eq!(d("100us").unwrap(), Duration::from_micros(100));
        assert_eq!(d("2m").unwrap(), Duration::from_secs(120));
        assert_eq!(d("1.5s").unwrap(), Duration::from_millis(1500));
        assert_eq!(d("30").unwrap(), Duration::from_secs(30));
        assert!(d("").is_err());
        assert!(d("fast").is_err());
        assert!(d("-1s").is_err());
        assert!(d("3 weeks").is_err());
    }

    #[test]
    fn test_parse_toml() {
        let toml_str = r#"
            [runner]
            jobs = 4
            on_error = "next-tier"
            query_ceiling = "190s"

            [[tiers]]
            name = "Best0"
            axioms = "ax/best0.p"

            [[tiers]]
            name = "SafeHeavy"
            axioms = "/abs/heavy.p"
            timeout = "120s"
        "#;

        let mut config: StrataConfig = toml::from_str(toml_str).unwrap();
        config.base_dir = Some(PathBuf::from("/proj"));
        assert_eq!(config.runner.jobs, 4);
        assert_eq!(config.runner.on_error, ErrorPolicy::NextTier);
        assert_eq!(config.query_ceiling().unwrap(), Some(Duration::from_secs(190)));
        // Defaults should still apply
        assert_eq!(config.runner.timeout, "61s");
        assert_eq!(config.output.format, "human");
        assert_eq!(config.categories, CategoryRules::default());

        let specs = config.tier_specs().unwrap();
        assert_eq!(specs.len(), 2);
        assert_eq!(specs[0].axioms, PathBuf::from("/proj/ax/best0.p"));
        assert_eq!(specs[0].time_limit, Duration::from_secs(61));
        assert_eq!(specs[1].axioms, PathBuf::from("/abs/heavy.p"));
        assert_eq!(specs[1].time_limit, Duration::from_secs(120));
    }

    #[test]
    fn test_default_toml_parses() {
        let config: StrataConfig = toml::from_str(&StrataConfig::default_toml()).unwrap();
        assert_eq!(config.tiers.len(), 3);
        assert_eq!(config.tiers[0].name, "Best0");
        assert_eq!(config.prover.args, default_prover_args());
        assert_eq!(config.runner.output_limit, DEFAULT_OUTPUT_LIMIT);
    }

    #[test]
    fn test_missing_sections() {
        let config = StrataConfig::default();
        assert!(matches!(config.tier_specs(), Err(ConfigError::NoTiers)));
        assert!(matches!(config.suite_path(), Err(ConfigError::NoSuite)));
    }

    #[test]
    fn test_parse_tier_arg() {
        let t = StrataConfig::parse_tier_arg("Best0=axioms/best0.p@30s").unwrap();
        assert_eq!(t.name, "Best0");
        assert_eq!(t.axioms, PathBuf::from("axioms/best0.p"));
        assert_eq!(t.timeout.as_deref(), Some("30s"));

        let t = StrataConfig::parse_tier_arg("Heavy=/data/v@2/heavy.p").unwrap();
        assert_eq!(t.axioms, PathBuf::from("/data/v@2/heavy.p"));
        assert!(t.timeout.is_none());

        assert!(StrataConfig::parse_tier_arg("axioms.p").is_err());
        assert!(StrataConfig::parse_tier_arg("=axioms.p").is_err());
        assert!(StrataConfig::parse_tier_arg("Best0=").is_err());
    }

    #[test]
    fn test_prover_resolution_order() {
        let dir = tempfile::tempdir().unwrap();
        let flag = Path::new("/opt/flag-vampire");
        let configured = Path::new("/opt/config-vampire");

        let p = resolve_prover_from(Some(flag), Some("/env".into()), Some(configured), None, dir.path());
        assert_eq!(p.unwrap(), flag);

        let p = resolve_prover_from(None, Some("/env".into()), Some(configured), None, dir.path());
        assert_eq!(p.unwrap(), PathBuf::from("/env"));

        let p = resolve_prover_from(None, Some("".into()), Some(configured), None, dir.path());
        assert_eq!(p.unwrap(), configured);
    }

    #[cfg(unix)]
    #[test]
    fn test_prover_path_search() {
        use std::os::unix::fs::PermissionsExt;

        let bin = tempfile::tempdir().unwrap();
        let cwd = tempfile::tempdir().unwrap();
        let err = resolve_prover_from(None, None, None, Some(bin.path().into()), cwd.path());
        assert!(matches!(err, Err(ConfigError::ProverNotFound { .. })));

        let vampire = bin.path().join("vampire");
        std::fs::write(&vampire, "#!/bin/sh\n").unwrap();
        std::fs::set_permissions(&vampire, std::fs::Permissions::from_mode(0o755)).unwrap();
        let found = resolve_prover_from(None, None, None, Some(bin.path().into()), cwd.path());
        assert_eq!(found.unwrap(), vampire);

        let main = bin.path().join("vampire-main");
        std::fs::write(&main, "#!/bin/sh\n").unwrap();
        std::fs::set_permissions(&main, std::fs::Permissions::from_mode(0o644)).unwrap();
        let found = resolve_prover_from(None, None, None, Some(bin.path().into()), cwd.path());
        assert_eq!(found.unwrap(), vampire, "non-executable candidates are skipped");
    }
}
