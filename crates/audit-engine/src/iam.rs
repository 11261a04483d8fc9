//! IAM policy scan
//!
//! Audits the IAM policy bindings of organizations, folders and projects.
//! Actual bindings come from [`IamPolicyBindings`](crate::providers::IamPolicyBindings)
//! or any other [`BindingsProvider`](crate::providers::BindingsProvider).

use audit_rules::RuleResult;

use crate::config::ScannerConfig;
use crate::definitions::RuleDefinition;
use crate::engine::{RuleSource, RulesEngine};
use crate::error::EngineResult;
use crate::rule_book::RuleBook;

/// Rules engine for IAM policies.
///
/// # Example
///
/// ```
/// use audit_engine::definitions::RuleDefinition;
/// use audit_engine::{IamRulesEngine, RuleSource, RulesEngine};
///
/// let definitions = vec![RuleDefinition {
///     name: Some("no public projects".to_string()),
///     mode: Some("blacklist".to_string()),
///     applies_to: Some("children".to_string()),
///     scope_resource_id: Some("org-1".to_string()),
///     ..Default::default()
/// }];
///
/// let engine = IamRulesEngine::with_definitions(
///     RuleSource::new("inline").unwrap(),
///     &definitions,
/// )
/// .unwrap();
/// assert_eq!(engine.rule_book().len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct IamRulesEngine {
    source: RuleSource,
    rule_book: RuleBook,
}

impl IamRulesEngine {
    /// Load rules from the file at `rules_path`.
    ///
    /// The path is trimmed; a blank path, an unreadable file, an empty rule
    /// list or an invalid definition all fail.
    pub fn new(rules_path: &str) -> EngineResult<Self> {
        let source = RuleSource::new(rules_path)?;
        let definitions = source.load()?;
        Self::with_definitions(source, &definitions)
    }

    /// Load rules from the configured `AUDIT_RULES_PATH`.
    pub fn from_config(config: &ScannerConfig) -> EngineResult<Self> {
        Self::new(config.rules_path()?)
    }

    /// Build the engine from definitions already in memory.
    pub fn with_definitions(source: RuleSource, definitions: &[RuleDefinition]) -> EngineResult<Self> {
        let mut engine = Self {
            source,
            rule_book: RuleBook::new(),
        };
        engine.install_rule_book(definitions)?;
        Ok(engine)
    }
}

impl RulesEngine for IamRulesEngine {
    fn kind(&self) -> &'static str {
        "iam_policy"
    }

    fn rule_source(&self) -> &RuleSource {
        &self.source
    }

    fn build_rule_book(&self, definitions: &[RuleDefinition]) -> RuleResult<RuleBook> {
        RuleBook::from_definitions(definitions)
    }

    fn rule_book(&self) -> &RuleBook {
        &self.rule_book
    }

    fn set_rule_book(&mut self, book: RuleBook) {
        self.rule_book = book;
    }
}
