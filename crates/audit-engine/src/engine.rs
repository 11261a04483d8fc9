//! Rules engine contract
//!
//! Each scan kind (IAM policies, bucket ACLs, ...) is a [`RulesEngine`]: it
//! knows how to turn rule definitions into a [`RuleBook`] and owns that book
//! for the duration of a scan. Finding violations is shared: resolve the
//! applicable rules, evaluate each, concatenate in rule-index order.

use std::path::{Path, PathBuf};

use audit_resources::Resource;
use audit_rules::{Binding, Rule, RuleError, RuleResult, RuleViolation};

use crate::definitions::{load_rule_definitions, RuleDefinition};
use crate::error::EngineResult;
use crate::evaluator::evaluate;
use crate::rule_book::RuleBook;

/// Where an engine's rule definitions come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleSource {
    path: PathBuf,
}

impl RuleSource {
    /// Create a rule source from a path, trimmed of surrounding whitespace.
    ///
    /// Fails with [`RuleError::InvalidRuleDefinition`] when the path is blank.
    ///
    /// ```
    /// use audit_engine::RuleSource;
    ///
    /// let source = RuleSource::new("  rules/iam.yaml  ").unwrap();
    /// assert_eq!(source.path().to_str(), Some("rules/iam.yaml"));
    /// assert!(RuleSource::new("   ").is_err());
    /// ```
    pub fn new(path: &str) -> RuleResult<Self> {
        let trimmed = path.trim();
        if trimmed.is_empty() {
            return Err(RuleError::invalid("no rule source path given"));
        }
        Ok(Self {
            path: PathBuf::from(trimmed),
        })
    }

    /// The trimmed path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and parse the definitions at this source.
    pub fn load(&self) -> EngineResult<Vec<RuleDefinition>> {
        load_rule_definitions(&self.path)
    }
}

/// A scan kind: rule loading plus the shared violation search.
pub trait RulesEngine: Send + Sync {
    /// Short name of the scan kind, used in logs and reports.
    fn kind(&self) -> &'static str;

    /// Where this engine's rules were loaded from.
    fn rule_source(&self) -> &RuleSource;

    /// Build a rule book from definitions.
    ///
    /// Must fail with [`RuleError::InvalidRuleDefinition`] when no
    /// definitions are given or one does not describe a valid rule.
    fn build_rule_book(&self, definitions: &[RuleDefinition]) -> RuleResult<RuleBook>;

    /// The rule book built for this engine.
    fn rule_book(&self) -> &RuleBook;

    /// Swap in a rule book that [`build_rule_book`](Self::build_rule_book)
    /// accepted.
    fn set_rule_book(&mut self, book: RuleBook);

    /// Build a rule book from `definitions` and make it the active one.
    ///
    /// On failure nothing is logged and the current book is kept.
    fn install_rule_book(&mut self, definitions: &[RuleDefinition]) -> EngineResult<()> {
        let book = self.build_rule_book(definitions)?;
        tracing::info!(
            engine = self.kind(),
            path = %self.rule_source().path().display(),
            rules = book.len(),
            scopes = book.scope_count(),
            "Accepted rule book"
        );
        self.set_rule_book(book);
        Ok(())
    }

    /// Re-read the rule source and replace the rule book.
    ///
    /// On failure the previous rule book is kept.
    fn reload(&mut self) -> EngineResult<()> {
        let definitions = self.rule_source().load()?;
        self.install_rule_book(&definitions)
    }

    /// Violations of all applicable rules for one resource.
    ///
    /// The returned sequence is lazy. Cloning it and iterating the clone
    /// re-runs evaluation and yields the same violations.
    fn find_violations<'a>(&'a self, resource: &'a Resource, bindings: &'a [Binding]) -> Violations<'a> {
        Violations::new(self.rule_book(), resource, bindings)
    }
}

/// Lazily evaluated violations for one resource, in rule-index order.
#[derive(Debug, Clone)]
pub struct Violations<'a> {
    resource: &'a Resource,
    bindings: &'a [Binding],
    rules: std::vec::IntoIter<&'a Rule>,
    current: std::vec::IntoIter<RuleViolation>,
}

impl<'a> Violations<'a> {
    /// Resolve the applicable rules for `resource`; evaluation happens on
    /// iteration.
    pub fn new(book: &'a RuleBook, resource: &'a Resource, bindings: &'a [Binding]) -> Self {
        Self {
            resource,
            bindings,
            rules: book.find_applicable(resource).into_iter(),
            current: Vec::new().into_iter(),
        }
    }
}

impl Iterator for Violations<'_> {
    type Item = RuleViolation;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(violation) = self.current.next() {
                return Some(violation);
            }
            let rule = self.rules.next()?;
            self.current = evaluate(rule, self.resource, self.bindings).into_iter();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use audit_resources::ResourceType;
    use audit_rules::{Member, RuleAppliesTo, RuleBinding, RuleMode, ViolationType};

    struct FixedEngine {
        source: RuleSource,
        book: RuleBook,
    }

    impl RulesEngine for FixedEngine {
        fn kind(&self) -> &'static str {
            "fixed"
        }

        fn rule_source(&self) -> &RuleSource {
            &self.source
        }

        fn build_rule_book(&self, definitions: &[RuleDefinition]) -> RuleResult<RuleBook> {
            RuleBook::from_definitions(definitions)
        }

        fn rule_book(&self) -> &RuleBook {
            &self.book
        }

        fn set_rule_book(&mut self, book: RuleBook) {
            self.book = book;
        }
    }

    fn engine() -> FixedEngine {
        let rules = vec![
            Rule::new(
                "org needs admins",
                1,
                vec![RuleBinding::new("owner", vec![Member::new("GROUP", "admins@x.com", "x.com")])],
                RuleMode::Required,
                RuleAppliesTo::SelfAndChildren,
                "org-1",
            )
            .unwrap(),
            Rule::new(
                "only alice owns",
                0,
                vec![RuleBinding::new("owner", vec![Member::new("USER", "alice@x.com", "*")])],
                RuleMode::Whitelist,
                RuleAppliesTo::SelfOnly,
                "proj-1",
            )
            .unwrap(),
        ];
        FixedEngine {
            source: RuleSource::new("rules.yaml").unwrap(),
            book: RuleBook::from_rules(rules).unwrap(),
        }
    }

    fn project() -> Resource {
        Resource::new("proj-1", ResourceType::Project).with_ancestry(vec!["org-1".to_string()])
    }

    #[test]
    fn test_rule_source_trims() {
        let source = RuleSource::new("  path/to/rules   ").unwrap();
        assert_eq!(source.path(), Path::new("path/to/rules"));
        assert!(matches!(
            RuleSource::new(""),
            Err(RuleError::InvalidRuleDefinition(_))
        ));
    }

    #[test]
    fn test_find_violations_in_rule_order() {
        let engine = engine();
        let resource = project();
        let bindings = vec![
            Binding::new("owner", Member::new("USER", "alice@x.com", "x.com")),
            Binding::new("owner", Member::new("USER", "bob@x.com", "x.com")),
        ];

        let v: Vec<RuleViolation> = engine.find_violations(&resource, &bindings).collect();
        assert_eq!(v.len(), 2);
        assert_eq!(v[0].rule_index, 0);
        assert_eq!(v[0].violation_type, ViolationType::Added);
        assert_eq!(v[1].rule_index, 1);
        assert_eq!(v[1].violation_type, ViolationType::Removed);
    }

    #[test]
    fn test_violations_are_restartable() {
        let engine = engine();
        let resource = project();
        let bindings = vec![Binding::new("owner", Member::new("USER", "bob@x.com", "x.com"))];

        let violations = engine.find_violations(&resource, &bindings);
        let first: Vec<RuleViolation> = violations.clone().collect();
        let second: Vec<RuleViolation> = violations.collect();
        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
    }

    #[test]
    fn test_no_applicable_rules() {
        let engine = engine();
        let elsewhere = Resource::new("proj-9", ResourceType::Project)
            .with_ancestry(vec!["org-9".to_string()]);
        let bindings = vec![Binding::new("owner", Member::new("USER", "bob@x.com", "x.com"))];
        assert_eq!(engine.find_violations(&elsewhere, &bindings).count(), 0);
    }

    #[test]
    fn test_install_rule_book() {
        let mut engine = engine();
        assert!(engine.install_rule_book(&[]).is_err());
        assert_eq!(engine.rule_book().len(), 2);

        let defs = vec![RuleDefinition {
            name: Some("one".to_string()),
            mode: Some("required".to_string()),
            scope_resource_id: Some("org-1".to_string()),
            ..Default::default()
        }];
        engine.install_rule_book(&defs).unwrap();
        assert_eq!(engine.rule_book().len(), 1);
        assert_eq!(engine.rule_book().scope_count(), 1);
    }

    #[test]
    fn test_reload_from_missing_file_keeps_book() {
        let mut engine = engine();
        assert!(engine.reload().is_err());
        assert_eq!(engine.rule_book().len(), 2);
    }

    #[test]
    fn test_build_rule_book_rejects_empty() {
        let engine = engine();
        assert!(matches!(
            engine.build_rule_book(&[]),
            Err(RuleError::InvalidRuleDefinition(_))
        ));
    }
}
