//! Categorization rule domain entity

use std::collections::HashMap;

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

/// What a matching rule assigns to a transaction
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "name", rename_all = "snake_case")]
pub enum RuleTarget {
    Category(String),
    /// Marks the transaction as a transfer to the named account
    Transfer(String),
    /// Labels are additive: every matching label rule applies
    Label(String),
}

impl RuleTarget {
    pub fn name(&self) -> &str {
        match self {
            RuleTarget::Category(n) | RuleTarget::Transfer(n) | RuleTarget::Label(n) => n,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    /// Case-insensitive regex search anywhere in the description
    #[default]
    Regex,
    /// Whole description, trimmed and lowercased
    Exact,
}

/// A categorization rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    pub pattern: String,
    /// Lower values are evaluated first
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub kind: MatchKind,
    pub target: RuleTarget,
}

impl Rule {
    pub fn regex(pattern: impl Into<String>, priority: i32, target: RuleTarget) -> Self {
        Self {
            pattern: pattern.into(),
            priority,
            kind: MatchKind::Regex,
            target,
        }
    }

    pub fn exact(description: impl Into<String>, target: RuleTarget) -> Self {
        Self {
            pattern: description.into(),
            priority: 0,
            kind: MatchKind::Exact,
            target,
        }
    }

    /// Compile this rule's pattern as the rule set would
    pub fn compile(&self) -> std::result::Result<Regex, regex::Error> {
        RegexBuilder::new(&self.pattern).case_insensitive(true).build()
    }
}

/// A rule whose pattern could not be compiled
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedRule {
    pub pattern: String,
    pub error: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchSource {
    Exact,
    Regex,
    None,
}

/// Outcome of categorizing one description
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Categorization {
    /// Category or transfer target, first match wins
    pub target: Option<RuleTarget>,
    pub source: MatchSource,
    pub labels: Vec<String>,
}

impl Categorization {
    fn uncategorized() -> Self {
        Self {
            target: None,
            source: MatchSource::None,
            labels: Vec::new(),
        }
    }

    pub fn is_categorized(&self) -> bool {
        self.target.is_some()
    }
}

struct CompiledRule {
    regex: Regex,
    target: RuleTarget,
}

/// Rules compiled and ordered for evaluation
///
/// Exact matches are checked before regex rules; regex rules run in
/// ascending priority, ties keeping their stored order.
pub struct RuleSet {
    exact: HashMap<String, RuleTarget>,
    /// Exact-match labels, keyed like `exact`, in rule order
    exact_labels: HashMap<String, Vec<String>>,
    compiled: Vec<CompiledRule>,
    failed: Vec<FailedRule>,
}

impl RuleSet {
    /// Compile `rules`, collecting bad patterns instead of failing
    pub fn compile(rules: &[Rule]) -> Self {
        let mut ordered: Vec<&Rule> = rules.iter().collect();
        ordered.sort_by_key(|r| r.priority);

        let mut exact = HashMap::new();
        let mut exact_labels: HashMap<String, Vec<String>> = HashMap::new();
        let mut compiled = Vec::new();
        let mut failed = Vec::new();

        for rule in ordered {
            match rule.kind {
                MatchKind::Exact => {
                    let key = rule.pattern.trim().to_lowercase();
                    match &rule.target {
                        RuleTarget::Label(name) => {
                            let labels = exact_labels.entry(key).or_default();
                            if !labels.contains(name) {
                                labels.push(name.clone());
                            }
                        }
                        target => {
                            exact.entry(key).or_insert_with(|| target.clone());
                        }
                    }
                }
                MatchKind::Regex => match rule.compile() {
                    Ok(regex) => compiled.push(CompiledRule {
                        regex,
                        target: rule.target.clone(),
                    }),
                    Err(e) => {
                        tracing::warn!(pattern = %rule.pattern, error = %e, "Skipping invalid rule");
                        failed.push(FailedRule {
                            pattern: rule.pattern.clone(),
                            error: e.to_string(),
                        });
                    }
                },
            }
        }

        Self {
            exact,
            exact_labels,
            compiled,
            failed,
        }
    }

    pub fn failed_rules(&self) -> &[FailedRule] {
        &self.failed
    }

    pub fn len(&self) -> usize {
        self.exact.len() + self.exact_labels.values().map(Vec::len).sum::<usize>() + self.compiled.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn categorize(&self, description: &str) -> Categorization {
        if description.trim().is_empty() {
            return Categorization::uncategorized();
        }

        let mut result = Categorization::uncategorized();

        let key = description.trim().to_lowercase();
        if let Some(target) = self.exact.get(&key) {
            result.target = Some(target.clone());
            result.source = MatchSource::Exact;
        }
        if let Some(labels) = self.exact_labels.get(&key) {
            result.labels.extend(labels.iter().cloned());
        }

        for rule in &self.compiled {
            if !rule.regex.is_match(description) {
                continue;
            }
            match &rule.target {
                RuleTarget::Label(name) => {
                    if !result.labels.contains(name) {
                        result.labels.push(name.clone());
                    }
                }
                target => {
                    if result.target.is_none() {
                        result.target = Some(target.clone());
                        result.source = MatchSource::Regex;
                    }
                }
            }
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn category(name: &str) -> RuleTarget {
        RuleTarget::Category(name.to_string())
    }

    #[test]
    fn test_lower_priority_wins() {
        let rules = vec![
            Rule::regex("priority_test", 10, category("Second")),
            Rule::regex("priority_test", 5, category("First")),
        ];
        let set = RuleSet::compile(&rules);
        let result = set.categorize("xx PRIORITY_TEST yy");
        assert_eq!(result.target, Some(category("First")));
        assert_eq!(result.source, MatchSource::Regex);
    }

    #[test]
    fn test_invalid_pattern_is_reported_not_fatal() {
        let rules = vec![
            Rule::regex("(unclosed", 0, category("Broken")),
            Rule::regex("coffee", 1, category("Food")),
        ];
        let set = RuleSet::compile(&rules);
        assert_eq!(set.failed_rules().len(), 1);
        assert_eq!(set.failed_rules()[0].pattern, "(unclosed");
        assert_eq!(set.categorize("COFFEE SHOP").target, Some(category("Food")));
    }

    #[test]
    fn test_exact_match_checked_first() {
        let rules = vec![
            Rule::regex("amazon", 0, category("Shopping")),
            Rule::exact("  Amazon Prime ", category("Subscriptions")),
        ];
        let set = RuleSet::compile(&rules);
        let result = set.categorize("AMAZON PRIME");
        assert_eq!(result.target, Some(category("Subscriptions")));
        assert_eq!(result.source, MatchSource::Exact);
    }

    #[test]
    fn test_labels_do_not_block_categories() {
        let rules = vec![
            Rule::regex("uber", 0, RuleTarget::Label("Travel".to_string())),
            Rule::regex("uber eats", 1, category("Food")),
            Rule::regex("eats", 2, RuleTarget::Label("Delivery".to_string())),
            Rule::regex("uber", 3, RuleTarget::Label("Travel".to_string())),
        ];
        let set = RuleSet::compile(&rules);
        let result = set.categorize("UBER EATS 1234");
        assert_eq!(result.target, Some(category("Food")));
        assert_eq!(result.labels, vec!["Travel", "Delivery"]);
    }

    #[test]
    fn test_exact_label_applies_without_shadowing_category() {
        let rules = vec![
            Rule::exact("netflix", RuleTarget::Label("Streaming".to_string())),
            Rule::exact("Netflix", category("Subscriptions")),
            Rule::regex("net", 1, RuleTarget::Label("Streaming".to_string())),
            Rule::regex("flix", 2, RuleTarget::Label("Video".to_string())),
        ];
        let set = RuleSet::compile(&rules);
        let result = set.categorize(" NETFLIX ");
        assert_eq!(result.target, Some(category("Subscriptions")));
        assert_eq!(result.source, MatchSource::Exact);
        assert_eq!(result.labels, vec!["Streaming", "Video"]);
        assert_eq!(set.len(), 4);
    }

    #[test]
    fn test_transfer_target_and_empty_description() {
        let rules = vec![Rule::regex(
            r"transfer to savings",
            0,
            RuleTarget::Transfer("savings".to_string()),
        )];
        let set = RuleSet::compile(&rules);
        assert_eq!(
            set.categorize("Online Transfer to Savings").target,
            Some(RuleTarget::Transfer("savings".to_string()))
        );
        assert!(!set.categorize("   ").is_categorized());
    }
}
