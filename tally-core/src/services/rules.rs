//! Rule service - categorization rules and the category tree

use std::sync::Arc;

use anyhow::Result;
use serde::Serialize;

use crate::domain::{
    Categorization, CategoryTree, Error, FailedRule, MatchKind, NormalizedTransaction, Rule,
    RuleSet, RuleTarget,
};
use crate::ports::ConfigStore;

/// Category assigned to one transaction
#[derive(Debug, Clone, Serialize)]
pub struct CategorizedTransaction {
    pub fingerprint: String,
    #[serde(flatten)]
    pub categorization: Categorization,
    /// Root-first category path, for category targets
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_path: Option<String>,
}

/// Result of categorizing a batch
#[derive(Debug, Clone, Serialize)]
pub struct CategorizeResult {
    pub results: Vec<CategorizedTransaction>,
    pub categorized: usize,
    pub uncategorized: usize,
    pub failed_rules: Vec<FailedRule>,
}

/// Rule service for transaction categorization
pub struct RuleService {
    store: Arc<dyn ConfigStore>,
}

impl RuleService {
    pub fn new(store: Arc<dyn ConfigStore>) -> Self {
        Self { store }
    }

    /// Stored rules in evaluation order
    pub fn list(&self) -> Result<Vec<Rule>> {
        let mut rules = self.store.load()?.rules;
        rules.sort_by_key(|r| r.priority);
        Ok(rules)
    }

    /// Add a rule; a regex rule whose pattern does not compile is refused
    pub fn add(&self, rule: Rule) -> Result<()> {
        if rule.kind == MatchKind::Regex {
            rule.compile().map_err(|e| Error::InvalidRule {
                pattern: rule.pattern.clone(),
                message: e.to_string(),
            })?;
        }

        let mut pending = Some(rule);
        self.store.update(&mut |config| {
            if let Some(rule) = pending.take() {
                config.rules.push(rule);
            }
            Ok(())
        })?;
        Ok(())
    }

    /// Remove every rule with `pattern`, returning how many were removed
    pub fn remove(&self, pattern: &str) -> Result<usize> {
        let mut removed = 0;
        self.store.update(&mut |config| {
            let before = config.rules.len();
            config.rules.retain(|r| r.pattern != pattern);
            removed = before - config.rules.len();
            if removed == 0 {
                return Err(Error::not_found(format!("Rule '{}'", pattern)));
            }
            Ok(())
        })?;
        Ok(removed)
    }

    pub fn rule_set(&self) -> Result<RuleSet> {
        let config = self.store.load()?;
        Ok(RuleSet::compile(&config.rules))
    }

    pub fn category_tree(&self) -> Result<CategoryTree> {
        let config = self.store.load()?;
        Ok(CategoryTree::new(&config.categories))
    }

    /// Categorize a single description
    pub fn test(&self, description: &str) -> Result<(Categorization, Vec<FailedRule>)> {
        let set = self.rule_set()?;
        Ok((set.categorize(description), set.failed_rules().to_vec()))
    }

    /// Categorize a batch of transactions
    ///
    /// Rules are compiled once for the batch. Broken patterns are reported
    /// in the result instead of failing it.
    pub fn categorize(&self, transactions: &[NormalizedTransaction]) -> Result<CategorizeResult> {
        let set = self.rule_set()?;
        let tree = self.category_tree()?;

        let results: Vec<CategorizedTransaction> = transactions
            .iter()
            .map(|tx| {
                let categorization = set.categorize(&tx.description);
                let category_path = match &categorization.target {
                    Some(RuleTarget::Category(name)) => Some(tree.display_path(name)),
                    _ => None,
                };
                CategorizedTransaction {
                    fingerprint: tx.fingerprint.clone(),
                    categorization,
                    category_path,
                }
            })
            .collect();

        let categorized = results
            .iter()
            .filter(|r| r.categorization.is_categorized())
            .count();
        let uncategorized = results.len() - categorized;

        tracing::debug!(
            rules = set.len(),
            failed = set.failed_rules().len(),
            categorized,
            uncategorized,
            "Categorized transactions"
        );

        Ok(CategorizeResult {
            results,
            categorized,
            uncategorized,
            failed_rules: set.failed_rules().to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::MemoryConfigStore;
    use crate::config::Config;
    use crate::domain::{Category, MatchSource};
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    fn tx(description: &str) -> NormalizedTransaction {
        NormalizedTransaction::new(
            NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            description.to_string(),
            Decimal::new(-500, 2),
            "checking".to_string(),
            2,
        )
    }

    #[test]
    fn test_add_rejects_bad_regex() {
        let service = RuleService::new(Arc::new(MemoryConfigStore::default()));
        let err = service
            .add(Rule::regex("[a-", 0, RuleTarget::Category("X".to_string())))
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::InvalidRule { .. })
        ));
        assert!(service.list().unwrap().is_empty());
    }

    #[test]
    fn test_list_sorted_and_remove() {
        let service = RuleService::new(Arc::new(MemoryConfigStore::default()));
        service
            .add(Rule::regex("b", 10, RuleTarget::Category("B".to_string())))
            .unwrap();
        service
            .add(Rule::regex("a", 1, RuleTarget::Category("A".to_string())))
            .unwrap();

        let patterns: Vec<String> = service.list().unwrap().into_iter().map(|r| r.pattern).collect();
        assert_eq!(patterns, vec!["a", "b"]);

        assert_eq!(service.remove("a").unwrap(), 1);
        assert!(service.remove("a").is_err());
    }

    #[test]
    fn test_categorize_batch_with_paths_and_stored_bad_rule() {
        // a broken pattern written by hand into settings must not stop the batch
        let mut config = Config::default();
        config.rules = vec![
            Rule::regex("(broken", 0, RuleTarget::Category("Nope".to_string())),
            Rule::regex("coffee", 1, RuleTarget::Category("Coffee".to_string())),
        ];
        config.categories = vec![
            Category {
                id: 1,
                name: "Food".to_string(),
                parent_id: None,
            },
            Category {
                id: 2,
                name: "Coffee".to_string(),
                parent_id: Some(1),
            },
        ];
        let service = RuleService::new(Arc::new(MemoryConfigStore::new(config)));

        let result = service
            .categorize(&[tx("COFFEE SHOP"), tx("RENT")])
            .unwrap();
        assert_eq!(result.categorized, 1);
        assert_eq!(result.uncategorized, 1);
        assert_eq!(result.failed_rules.len(), 1);
        assert_eq!(result.results[0].category_path.as_deref(), Some("Food > Coffee"));
        assert_eq!(result.results[0].categorization.source, MatchSource::Regex);
        assert!(result.results[1].category_path.is_none());
    }
}
