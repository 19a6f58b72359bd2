//! Category assignment
//!
//! Categories are derived from query identifiers by an ordered list of rules.
//! The first rule that matches wins; unmatched ids land in the default
//! category. Rules are plain data so they can be overridden from config.

use serde::{Deserialize, Serialize};

/// Category used when no rule matches
pub const DEFAULT_CATEGORY: &str = "Core arithmetic";

/// One naming rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRule {
    /// Category name assigned on match
    pub name: String,
    /// Id starts with one of these
    #[serde(default)]
    pub prefixes: Vec<String>,
    /// Id ends with one of these
    #[serde(default)]
    pub suffixes: Vec<String>,
    /// Id contains one of these
    #[serde(default)]
    pub contains: Vec<String>,
    /// Id equals one of these
    #[serde(default)]
    pub exact: Vec<String>,
    /// Substrings that veto an otherwise matching rule
    #[serde(default)]
    pub excludes: Vec<String>,
}

impl CategoryRule {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            prefixes: Vec::new(),
            suffixes: Vec::new(),
            contains: Vec::new(),
            exact: Vec::new(),
            excludes: Vec::new(),
        }
    }

    fn with(mut self, field: fn(&mut Self) -> &mut Vec<String>, values: &[&str]) -> Self {
        field(&mut self).extend(values.iter().map(|v| v.to_string()));
        self
    }

    /// Whether `query_id` falls under this rule
    pub fn matches(&self, query_id: &str) -> bool {
        let hit = self.prefixes.iter().any(|p| query_id.starts_with(p.as_str()))
            || self.suffixes.iter().any(|s| query_id.ends_with(s.as_str()))
            || self.contains.iter().any(|c| query_id.contains(c.as_str()))
            || self.exact.iter().any(|e| query_id == e);
        hit && !self.excludes.iter().any(|x| query_id.contains(x.as_str()))
    }
}

/// Ordered rule list plus the fallback category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRules {
    /// Category for ids no rule matches
    #[serde(default = "default_category")]
    pub default: String,
    /// Tried in order, first match wins
    #[serde(default = "default_rules")]
    pub rules: Vec<CategoryRule>,
}

fn default_category() -> String {
    DEFAULT_CATEGORY.to_string()
}

/// Built-in taxonomy for the calendar benchmark suites
///
/// Backward arithmetic takes two entries: the `test_sub_` prefix always
/// matches, while the looser `back` substring is vetoed by `wk` and `comb`.
pub fn default_rules() -> Vec<CategoryRule> {
    vec![
        CategoryRule::new("Time normalization")
            .with(|r| &mut r.prefixes, &["test_time_"])
            .with(|r| &mut r.suffixes, &["_time"])
            .with(|r| &mut r.contains, &["time_"]),
        CategoryRule::new("Weekday")
            .with(|r| &mut r.prefixes, &["test_wk_", "test_week"])
            .with(|r| &mut r.contains, &["_wk_"]),
        CategoryRule::new("Scheduling (nth weekday)")
            .with(|r| &mut r.prefixes, &["test_sch_"])
            .with(|r| &mut r.contains, &["_sch_", "nth_"]),
        CategoryRule::new("Accelerators")
            .with(|r| &mut r.prefixes, &["test_accel_"])
            .with(|r| &mut r.contains, &["accel"]),
        CategoryRule::new("Scalability microbench").with(|r| &mut r.prefixes, &["test_scale_"]),
        CategoryRule::new("Backward arithmetic").with(|r| &mut r.prefixes, &["test_sub_"]),
        CategoryRule::new("Backward arithmetic")
            .with(|r| &mut r.contains, &["back"])
            .with(|r| &mut r.excludes, &["wk", "comb"]),
        CategoryRule::new("Combined queries").with(|r| &mut r.prefixes, &["test_comb"]),
        CategoryRule::new("Century/leap edge")
            .with(|r| &mut r.prefixes, &["test_cent_"])
            .with(|r| &mut r.exact, &["test_1900", "test_2000", "test_1600"]),
    ]
}

impl Default for CategoryRules {
    fn default() -> Self {
        Self {
            default: default_category(),
            rules: default_rules(),
        }
    }
}

impl CategoryRules {
    /// Category for a query id
    pub fn classify(&self, query_id: &str) -> &str {
        self.rules
            .iter()
            .find(|rule| rule.matches(query_id))
            .map(|rule| rule.name.as_str())
            .unwrap_or(self.default.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_taxonomy() {
        let rules = CategoryRules::default();
        assert_eq!(rules.classify("test_time_noon"), "Time normalization");
        assert_eq!(rules.classify("midnight_time"), "Time normalization");
        assert_eq!(rules.classify("test_wk_monday"), "Weekday");
        assert_eq!(rules.classify("test_sch_third_friday"), "Scheduling (nth weekday)");
        assert_eq!(rules.classify("test_accel_year"), "Accelerators");
        assert_eq!(rules.classify("test_scale_10k"), "Scalability microbench");
        assert_eq!(rules.classify("test_sub_days"), "Backward arithmetic");
        assert_eq!(rules.classify("go_back_month"), "Backward arithmetic");
        assert_eq!(rules.classify("test_comb_1"), "Combined queries");
        assert_eq!(rules.classify("test_2000"), "Century/leap edge");
        assert_eq!(rules.classify("test_add_days"), DEFAULT_CATEGORY);
    }

    #[test]
    fn test_first_match_wins() {
        let rules = CategoryRules::default();
        // Matches both Time ("time_") and Weekday ("_wk_"); Time comes first.
        assert_eq!(rules.classify("time_wk_x"), "Time normalization");
    }

    #[test]
    fn test_excludes_veto() {
        let rules = CategoryRules::default();
        assert_eq!(rules.classify("comb_back_1"), DEFAULT_CATEGORY);
        assert_eq!(rules.classify("go_back_wk"), DEFAULT_CATEGORY);
    }

    #[test]
    fn test_sub_prefix_ignores_back_veto() {
        let rules = CategoryRules::default();
        assert_eq!(rules.classify("test_sub_wkday_1"), "Backward arithmetic");
        assert_eq!(rules.classify("test_sub_comb_2"), "Backward arithmetic");
    }

    #[test]
    fn test_custom_rules() {
        let rules = custom_rules();
        assert_eq!(rules.classify("lemma_3"), "Lemmas");
        assert_eq!(rules.classify("other"), "Misc");
    }

    fn custom_rules() -> CategoryRules {
        CategoryRules {
            default: "Misc".to_string(),
            rules: vec![CategoryRule::new("Lemmas").with(|r| &mut r.prefixes, &["lemma_"])],
        }
    }
}
