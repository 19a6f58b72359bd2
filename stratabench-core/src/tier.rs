//! Axiom tiers
//!
//! A tier is a named axiom set with a time limit. Tiers are tried in their
//! configured order, so a [`TierSet`] is immutable once built and ranks are
//! assigned from position (rank 1 is tried first).

use crate::query::strip_conjectures;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TierError {
    #[error("cannot read axioms for tier '{tier}' from {path}: {source}")]
    Io {
        tier: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no tiers configured")]
    Empty,

    #[error("duplicate tier name '{0}'")]
    DuplicateName(String),

    #[error("tier '{0}' has a zero time limit")]
    ZeroTimeLimit(String),

    #[error("tier name '{0}' is not usable (empty, or contains whitespace, '=', ';' or '@')")]
    InvalidName(String),
}

/// Unresolved tier definition, as written in configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TierSpec {
    /// Tier name
    pub name: String,
    /// Axiom file
    pub axioms: PathBuf,
    /// Per-attempt wall-clock limit
    pub time_limit: Duration,
}

/// A loaded axiom tier
#[derive(Debug, Clone)]
pub struct Tier {
    rank: usize,
    name: String,
    axioms_path: PathBuf,
    axioms: Arc<str>,
    time_limit: Duration,
}

impl Tier {
    /// Tier with in-memory axioms; rank is assigned by [`TierSet::new`]
    pub fn new(
        name: impl Into<String>,
        axioms_path: impl Into<PathBuf>,
        axioms: &str,
        time_limit: Duration,
    ) -> Self {
        Self {
            rank: 0,
            name: name.into(),
            axioms_path: axioms_path.into(),
            axioms: Arc::from(axioms),
            time_limit,
        }
    }

    /// Load the axiom file, dropping any conjectures it carries
    pub fn load(spec: &TierSpec) -> Result<Self, TierError> {
        let raw = fs::read_to_string(&spec.axioms).map_err(|source| TierError::Io {
            tier: spec.name.clone(),
            path: spec.axioms.clone(),
            source,
        })?;
        let axioms = strip_conjectures(&raw);
        if axioms.len() != raw.len() {
            tracing::warn!(tier = %spec.name, "Dropped conjecture blocks from axiom file");
        }
        Ok(Self::new(
            spec.name.clone(),
            spec.axioms.clone(),
            &axioms,
            spec.time_limit,
        ))
    }

    pub fn rank(&self) -> usize {
        self.rank
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn axioms_path(&self) -> &Path {
        &self.axioms_path
    }

    pub fn axioms(&self) -> &str {
        &self.axioms
    }

    pub fn time_limit(&self) -> Duration {
        self.time_limit
    }

    /// Full problem text for `formula` under this tier
    pub fn payload(&self, formula: &str) -> String {
        merge_payload(&self.axioms, formula)
    }
}

/// Axioms, a blank line, then the conjecture block; both copied byte for byte
pub fn merge_payload(axioms: &str, formula: &str) -> String {
    let mut out = String::with_capacity(axioms.len() + formula.len() + 3);
    out.push_str(axioms);
    out.push_str("\n\n");
    out.push_str(formula);
    out.push('\n');
    out
}

/// Ordered, validated tier list
#[derive(Debug, Clone)]
pub struct TierSet {
    tiers: Vec<Tier>,
}

impl TierSet {
    /// Validate and rank tiers in the given order
    pub fn new(mut tiers: Vec<Tier>) -> Result<Self, TierError> {
        if tiers.is_empty() {
            return Err(TierError::Empty);
        }
        let mut seen = fxhash::FxHashSet::default();
        for (i, tier) in tiers.iter_mut().enumerate() {
            if !valid_name(&tier.name) {
                return Err(TierError::InvalidName(tier.name.clone()));
            }
            if tier.time_limit.is_zero() {
                return Err(TierError::ZeroTimeLimit(tier.name.clone()));
            }
            if !seen.insert(tier.name.clone()) {
                return Err(TierError::DuplicateName(tier.name.clone()));
            }
            tier.rank = i + 1;
        }
        Ok(Self { tiers })
    }

    /// Read every axiom file and build the set
    pub fn load(specs: &[TierSpec]) -> Result<Self, TierError> {
        let tiers = specs.iter().map(Tier::load).collect::<Result<Vec<_>, _>>()?;
        Self::new(tiers)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Tier> {
        self.tiers.iter()
    }

    pub fn len(&self) -> usize {
        self.tiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiers.is_empty()
    }

    /// Tier by 0-based position
    pub fn get(&self, index: usize) -> Option<&Tier> {
        self.tiers.get(index)
    }

    pub fn by_name(&self, name: &str) -> Option<&Tier> {
        self.tiers.iter().find(|t| t.name == name)
    }

    /// Tier names in rank order
    pub fn names(&self) -> Vec<&str> {
        self.tiers.iter().map(|t| t.name.as_str()).collect()
    }

    /// Worst-case wall time for one query
    pub fn total_time_limit(&self) -> Duration {
        self.tiers.iter().map(|t| t.time_limit).sum()
    }
}

impl<'a> IntoIterator for &'a TierSet {
    type Item = &'a Tier;
    type IntoIter = std::slice::Iter<'a, Tier>;

    fn into_iter(self) -> Self::IntoIter {
        self.tiers.iter()
    }
}

// Names end up in the log trace column, so they must not collide with its separators.
fn valid_name(name: &str) -> bool {
    !name.is_empty()
        && !name
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '=' | ';' | '@'))
}
