//! # Rule Book
//!
//! Indexes the rules of one loaded rule set by the resource they are
//! declared against, and resolves which of them apply to a given resource
//! by walking its ancestry.
//!
//! A rule book is built once (single writer) and then only read, so a built
//! book can be shared across threads behind an `Arc` without locking.

use std::collections::{BTreeMap, HashMap};

use audit_resources::Resource;
use audit_rules::{Rule, RuleError, RuleResult};

use crate::definitions::RuleDefinition;

/// Indexed, read-only collection of rules.
///
/// # Example
///
/// ```
/// use audit_engine::RuleBook;
/// use audit_resources::{Resource, ResourceType};
/// use audit_rules::{Member, Rule, RuleAppliesTo, RuleBinding, RuleMode};
///
/// let rule = Rule::new(
///     "org owners",
///     0,
///     vec![RuleBinding::new("owner", vec![Member::any()])],
///     RuleMode::Required,
///     RuleAppliesTo::Children,
///     "org-1",
/// )
/// .unwrap();
///
/// let mut book = RuleBook::new();
/// book.add_rule(rule).unwrap();
///
/// let project = Resource::new("proj-1", ResourceType::Project)
///     .with_ancestry(vec!["org-1".to_string()]);
/// assert_eq!(book.find_applicable(&project).len(), 1);
///
/// let org = Resource::new("org-1", ResourceType::Organization);
/// assert!(book.find_applicable(&org).is_empty());
/// ```
#[derive(Debug, Clone, Default)]
pub struct RuleBook {
    /// scope_resource_id -> rules declared against it
    by_scope: HashMap<String, Vec<Rule>>,
    /// rule index -> rule name, for duplicate detection
    names_by_index: HashMap<usize, String>,
}

impl RuleBook {
    /// Create an empty rule book.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a rule book from rule definitions, assigning indices in order.
    ///
    /// Fails with [`RuleError::InvalidRuleDefinition`] when `definitions` is
    /// empty or when any definition does not describe a valid rule.
    pub fn from_definitions(definitions: &[RuleDefinition]) -> RuleResult<Self> {
        if definitions.is_empty() {
            return Err(RuleError::invalid("no rule definitions provided"));
        }

        let rules = definitions
            .iter()
            .enumerate()
            .map(|(index, def)| def.into_rule(index))
            .collect::<RuleResult<Vec<_>>>()?;

        Self::from_rules(rules)
    }

    /// Build a rule book from already constructed rules.
    pub fn from_rules<I>(rules: I) -> RuleResult<Self>
    where
        I: IntoIterator<Item = Rule>,
    {
        let mut book = Self::new();
        for rule in rules {
            book.add_rule(rule)?;
        }
        Ok(book)
    }

    /// Add a rule to the index.
    ///
    /// Fails with [`RuleError::DuplicateRuleIndex`] if a rule with the same
    /// index is already present; the book is left unchanged.
    pub fn add_rule(&mut self, rule: Rule) -> RuleResult<()> {
        if let Some(existing) = self.names_by_index.get(&rule.index) {
            return Err(RuleError::DuplicateRuleIndex {
                index: rule.index,
                existing: existing.clone(),
                duplicate: rule.name,
            });
        }

        self.names_by_index.insert(rule.index, rule.name.clone());
        self.by_scope
            .entry(rule.scope_resource_id.clone())
            .or_default()
            .push(rule);
        Ok(())
    }

    /// Rules that apply to `resource`, in ascending index order.
    ///
    /// The resource itself is checked first, then each ancestor from the
    /// nearest parent outward. A rule anchored at the resource applies when
    /// it covers `self`; a rule anchored at an ancestor applies when it covers
    /// `children`. Rules anchored anywhere else never apply.
    pub fn find_applicable(&self, resource: &Resource) -> Vec<&Rule> {
        let mut applicable: BTreeMap<usize, &Rule> = BTreeMap::new();

        for (depth, scope_id) in resource.lineage().enumerate() {
            let Some(rules) = self.by_scope.get(scope_id) else {
                continue;
            };
            for rule in rules {
                let in_scope = if depth == 0 {
                    rule.applies_to.includes_self()
                } else {
                    rule.applies_to.includes_children()
                };
                if in_scope {
                    applicable.entry(rule.index).or_insert(rule);
                }
            }
        }

        applicable.into_values().collect()
    }

    /// Rules declared against one resource id, in insertion order.
    pub fn rules_for_scope(&self, scope_resource_id: &str) -> &[Rule] {
        self.by_scope
            .get(scope_resource_id)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// All rules, in ascending index order.
    pub fn rules(&self) -> Vec<&Rule> {
        let mut all: Vec<&Rule> = self.by_scope.values().flatten().collect();
        all.sort_by_key(|r| r.index);
        all
    }

    /// Get the count of rules.
    pub fn len(&self) -> usize {
        self.names_by_index.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.names_by_index.is_empty()
    }

    /// Number of distinct resources rules are declared against.
    pub fn scope_count(&self) -> usize {
        self.by_scope.len()
    }
}
