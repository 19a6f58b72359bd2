//! Query suites
//!
//! A suite is either one TPTP file holding many conjecture formulas, or a
//! directory with one query per file. Single-file suites keep only the
//! conjecture blocks; tier axioms are merged in later, at attempt time.

use crate::category::CategoryRules;
use regex::Regex;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use thiserror::Error;

static CONJECTURE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)\b(?:tff|fof|thf|cnf)\s*\(\s*(\w+)\s*,\s*conjecture\s*,.*?\)\.")
        .expect("static regex")
});

/// Errors raised while loading a suite
#[derive(Debug, Error)]
pub enum SuiteError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no conjecture found in {0}")]
    NoConjecture(PathBuf),

    #[error("duplicate query id '{id}' in {path}")]
    DuplicateQuery { id: String, path: PathBuf },

    #[error("suite {0} contains no queries")]
    Empty(PathBuf),
}

/// One conjecture to be proved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    /// Unique id (conjecture name, or file stem for directory suites)
    pub id: String,
    /// Category from the naming rules
    pub category: String,
    /// Formula text: the conjecture block, or the whole file in directory suites
    pub formula: String,
    /// File the formula came from
    pub source: PathBuf,
}

/// Ordered, duplicate-free collection of queries
#[derive(Debug, Clone)]
pub struct QuerySuite {
    queries: Vec<Query>,
    source: PathBuf,
}

impl QuerySuite {
    /// Load a suite from a file or directory
    pub fn load(path: &Path, rules: &CategoryRules) -> Result<Self, SuiteError> {
        let queries = if path.is_dir() {
            load_directory(path, rules)?
        } else {
            let text = read(path)?;
            extract_conjectures(&text)
                .into_iter()
                .map(|(id, formula)| Query {
                    category: rules.classify(&id).to_string(),
                    id,
                    formula,
                    source: path.to_path_buf(),
                })
                .collect()
        };
        tracing::debug!(path = %path.display(), queries = queries.len(), "Loaded query suite");
        Self::new(queries, path)
    }

    /// Build a suite from already extracted queries
    pub fn new(queries: Vec<Query>, source: &Path) -> Result<Self, SuiteError> {
        if queries.is_empty() {
            return Err(SuiteError::Empty(source.to_path_buf()));
        }
        let mut seen = fxhash::FxHashSet::default();
        for q in &queries {
            if !seen.insert(q.id.as_str()) {
                return Err(SuiteError::DuplicateQuery {
                    id: q.id.clone(),
                    path: q.source.clone(),
                });
            }
        }
        Ok(Self {
            queries,
            source: source.to_path_buf(),
        })
    }

    pub fn queries(&self) -> &[Query] {
        &self.queries
    }

    pub fn iter(&self) -> impl Iterator<Item = &Query> {
        self.queries.iter()
    }

    pub fn len(&self) -> usize {
        self.queries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Look up a query by id
    pub fn get(&self, id: &str) -> Option<&Query> {
        self.queries.iter().find(|q| q.id == id)
    }

    /// Query count per category, sorted by category name
    pub fn categories(&self) -> BTreeMap<&str, usize> {
        let mut counts = BTreeMap::new();
        for q in &self.queries {
            *counts.entry(q.category.as_str()).or_insert(0) += 1;
        }
        counts
    }
}

fn read(path: &Path) -> Result<String, SuiteError> {
    fs::read_to_string(path).map_err(|source| SuiteError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn load_directory(dir: &Path, rules: &CategoryRules) -> Result<Vec<Query>, SuiteError> {
    let entries = fs::read_dir(dir).map_err(|source| SuiteError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| SuiteError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if path.is_file() && matches!(path.extension().and_then(|e| e.to_str()), Some("p" | "tptp" | "ax")) {
            files.push(path);
        }
    }
    files.sort();

    let mut queries = Vec::with_capacity(files.len());
    for path in files {
        let text = read(&path)?;
        if extract_conjectures(&text).is_empty() {
            return Err(SuiteError::NoConjecture(path));
        }
        let id = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        queries.push(Query {
            category: rules.classify(&id).to_string(),
            id,
            formula: text,
            source: path,
        });
    }
    Ok(queries)
}

/// Find every conjecture block in `text`, as `(name, formula)` pairs
///
/// Blocks on `%` comment lines are skipped.
pub fn extract_conjectures(text: &str) -> Vec<(String, String)> {
    CONJECTURE
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            if is_commented(text, whole.start()) {
                return None;
            }
            Some((caps[1].to_string(), whole.as_str().to_string()))
        })
        .collect()
}

/// Remove every (uncommented) conjecture block from `text`
pub fn strip_conjectures(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for m in CONJECTURE.find_iter(text) {
        if is_commented(text, m.start()) {
            continue;
        }
        out.push_str(&text[last..m.start()]);
        last = m.end();
    }
    out.push_str(&text[last..]);
    out
}

fn is_commented(text: &str, at: usize) -> bool {
    let line_start = text[..at].rfind('\n').map(|i| i + 1).unwrap_or(0);
    text[line_start..at].trim_start().starts_with('%')
}
