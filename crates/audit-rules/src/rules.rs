//! # Rules
//!
//! A rule declares, once and at one point of the resource hierarchy, which
//! members may, must not, or must hold a role. Rules are immutable values;
//! the rule book indexes them and the evaluator applies them.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::error::{RuleError, RuleResult};
use crate::members::Member;

/// How a rule's bindings are interpreted.
///
/// - **Whitelist**: only the listed members may hold the role
/// - **Blacklist**: the listed members must never hold the role
/// - **Required**: the listed members must always hold the role
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RuleMode {
    /// Only listed identities are allowed.
    Whitelist,
    /// Listed identities are forbidden.
    Blacklist,
    /// Listed identities are mandatory.
    Required,
}

impl RuleMode {
    /// Get the string representation of the mode.
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleMode::Whitelist => "whitelist",
            RuleMode::Blacklist => "blacklist",
            RuleMode::Required => "required",
        }
    }

    /// Parse a mode. Only the exact lowercase spellings are accepted, the
    /// same ones serde accepts.
    ///
    /// # Example
    ///
    /// ```
    /// use audit_rules::rules::RuleMode;
    ///
    /// assert_eq!(RuleMode::parse("whitelist").unwrap(), RuleMode::Whitelist);
    /// assert!(RuleMode::parse("REQUIRED").is_err());
    /// assert!(RuleMode::parse("superlist").is_err());
    /// ```
    pub fn parse(s: &str) -> RuleResult<Self> {
        match s {
            "whitelist" => Ok(RuleMode::Whitelist),
            "blacklist" => Ok(RuleMode::Blacklist),
            "required" => Ok(RuleMode::Required),
            other => Err(RuleError::invalid(format!("Invalid rule mode: {other}"))),
        }
    }

    /// Get all modes.
    pub fn all() -> [Self; 3] {
        [RuleMode::Whitelist, RuleMode::Blacklist, RuleMode::Required]
    }
}

impl fmt::Display for RuleMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which part of the hierarchy a rule covers, relative to its scope resource.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum RuleAppliesTo {
    /// Only the scope resource itself.
    #[default]
    #[serde(rename = "self")]
    SelfOnly,
    /// Only descendants of the scope resource.
    Children,
    /// The scope resource and all of its descendants.
    SelfAndChildren,
}

impl RuleAppliesTo {
    /// Get the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleAppliesTo::SelfOnly => "self",
            RuleAppliesTo::Children => "children",
            RuleAppliesTo::SelfAndChildren => "self_and_children",
        }
    }

    /// Parse an applies-to value.
    ///
    /// # Example
    ///
    /// ```
    /// use audit_rules::rules::RuleAppliesTo;
    ///
    /// assert_eq!(RuleAppliesTo::parse("self").unwrap(), RuleAppliesTo::SelfOnly);
    /// assert_eq!(
    ///     RuleAppliesTo::parse("self_and_children").unwrap(),
    ///     RuleAppliesTo::SelfAndChildren
    /// );
    /// assert!(RuleAppliesTo::parse("grandchildren").is_err());
    /// ```
    pub fn parse(s: &str) -> RuleResult<Self> {
        match s {
            "self" => Ok(RuleAppliesTo::SelfOnly),
            "children" => Ok(RuleAppliesTo::Children),
            "self_and_children" => Ok(RuleAppliesTo::SelfAndChildren),
            other => Err(RuleError::invalid(format!("Invalid applies_to: {other}"))),
        }
    }

    /// Whether a rule anchored at a resource covers that resource.
    pub fn includes_self(&self) -> bool {
        matches!(self, RuleAppliesTo::SelfOnly | RuleAppliesTo::SelfAndChildren)
    }

    /// Whether a rule anchored at a resource covers its descendants.
    pub fn includes_children(&self) -> bool {
        matches!(self, RuleAppliesTo::Children | RuleAppliesTo::SelfAndChildren)
    }
}

impl fmt::Display for RuleAppliesTo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A role plus the identity patterns a rule cares about for that role.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct RuleBinding {
    /// Role name or `*`.
    pub role: String,
    /// Ordered identity patterns.
    pub members: Vec<Member>,
}

impl RuleBinding {
    /// Create a rule binding.
    pub fn new(role: impl Into<String>, members: Vec<Member>) -> Self {
        Self {
            role: role.into(),
            members,
        }
    }
}

/// A declared policy constraint.
///
/// Equality compares every field. The hash only covers `index`, which is
/// unique within one loaded rule set, so rules with equal indices land in the
/// same bucket but are still compared field by field.
///
/// # Example
///
/// ```
/// use audit_rules::members::Member;
/// use audit_rules::rules::{Rule, RuleAppliesTo, RuleBinding, RuleMode};
///
/// let rule = Rule::new(
///     "only alice owns",
///     0,
///     vec![RuleBinding::new("owner", vec![Member::new("user", "alice@x.com", "*")])],
///     RuleMode::Whitelist,
///     RuleAppliesTo::SelfOnly,
///     "proj-1",
/// )
/// .unwrap();
/// assert_eq!(rule.index, 0);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(try_from = "RawRule")]
pub struct Rule {
    /// Human label, not unique.
    pub name: String,
    /// Position in the rule source; the rule's identity.
    pub index: usize,
    /// Evaluation mode.
    pub mode: RuleMode,
    /// Declared bindings.
    pub bindings: Vec<RuleBinding>,
    /// Hierarchy scope relative to `scope_resource_id`.
    pub applies_to: RuleAppliesTo,
    /// Resource the rule was declared against.
    pub scope_resource_id: String,
}

impl Rule {
    /// Create a rule from already-typed parts.
    ///
    /// Fails with [`RuleError::InvalidRuleDefinition`] if the name or the
    /// scope resource id is blank.
    pub fn new(
        name: impl Into<String>,
        index: usize,
        bindings: Vec<RuleBinding>,
        mode: RuleMode,
        applies_to: RuleAppliesTo,
        scope_resource_id: impl Into<String>,
    ) -> RuleResult<Self> {
        let name = name.into();
        let scope_resource_id = scope_resource_id.into();

        if name.trim().is_empty() {
            return Err(RuleError::invalid(format!("rule {index} has no name")));
        }
        if scope_resource_id.trim().is_empty() {
            return Err(RuleError::invalid(format!(
                "rule {index} (`{name}`) has no scope resource id"
            )));
        }

        Ok(Self {
            name,
            index,
            mode,
            bindings,
            applies_to,
            scope_resource_id,
        })
    }

    /// Create a rule from string mode and applies-to values.
    ///
    /// `applies_to` defaults to `self` when `None`. Unknown spellings fail
    /// with [`RuleError::InvalidRuleDefinition`] naming the rule.
    pub fn from_parts(
        name: impl Into<String>,
        index: usize,
        bindings: Vec<RuleBinding>,
        mode: &str,
        applies_to: Option<&str>,
        scope_resource_id: impl Into<String>,
    ) -> RuleResult<Self> {
        let name = name.into();
        let with_rule = |e: RuleError| match e {
            RuleError::InvalidRuleDefinition(msg) => {
                RuleError::invalid(format!("rule {index} (`{name}`): {msg}"))
            }
            other => other,
        };

        let mode = RuleMode::parse(mode).map_err(with_rule)?;
        let applies_to = match applies_to {
            Some(value) => RuleAppliesTo::parse(value).map_err(with_rule)?,
            None => RuleAppliesTo::default(),
        };

        Self::new(name, index, bindings, mode, applies_to, scope_resource_id)
    }
}

/// Unchecked wire form of [`Rule`]; deserialized rules pass through
/// [`Rule::new`].
#[derive(Deserialize)]
struct RawRule {
    name: String,
    index: usize,
    mode: RuleMode,
    #[serde(default)]
    bindings: Vec<RuleBinding>,
    #[serde(default)]
    applies_to: RuleAppliesTo,
    scope_resource_id: String,
}

impl TryFrom<RawRule> for Rule {
    type Error = RuleError;

    fn try_from(raw: RawRule) -> RuleResult<Self> {
        Rule::new(
            raw.name,
            raw.index,
            raw.bindings,
            raw.mode,
            raw.applies_to,
            raw.scope_resource_id,
        )
    }
}

impl Hash for Rule {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.index.hash(state);
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Rule <{}, name={}, mode={}, applies_to={}, scope={}>",
            self.index, self.name, self.mode, self.applies_to, self.scope_resource_id
        )
    }
}
