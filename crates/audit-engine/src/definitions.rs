//! Rule definition files
//!
//! A rule file is a JSON or YAML document with a top-level `rules` list.
//! Every definition field is optional at this layer. A missing field is
//! reported as an invalid rule definition naming the rule, not as a parser
//! error.
//!
//! ```yaml
//! rules:
//!   - name: only corp owners
//!     mode: whitelist
//!     applies_to: self_and_children
//!     resource_id: org-1
//!     bindings:
//!       - role: roles/owner
//!         members: ["user:*@corp.com"]
//!         identities:
//!           - { type: serviceAccount, domain: corp.iam.gserviceaccount.com }
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use audit_rules::{Member, Rule, RuleBinding, RuleError, RuleResult, WILDCARD};

use crate::error::{EngineError, EngineResult};

fn wildcard() -> String {
    WILDCARD.to_string()
}

/// Root of a rule file.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RuleFile {
    /// Definitions in file order; the order assigns rule indices.
    #[serde(default)]
    pub rules: Vec<RuleDefinition>,
}

/// One rule as written in a rule file.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RuleDefinition {
    /// Rule name.
    pub name: Option<String>,
    /// `whitelist`, `blacklist` or `required`.
    pub mode: Option<String>,
    /// `self`, `children` or `self_and_children`; defaults to `self`.
    #[serde(default)]
    pub applies_to: Option<String>,
    /// Resource the rule is declared against.
    #[serde(alias = "resource_id")]
    pub scope_resource_id: Option<String>,
    /// Role bindings the rule constrains.
    #[serde(default)]
    pub bindings: Vec<BindingDefinition>,
}

/// A role and its identity patterns, as written in a rule file.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct BindingDefinition {
    /// Role name or `*`.
    pub role: Option<String>,
    /// Structured identity patterns.
    #[serde(default)]
    pub identities: Vec<IdentityDefinition>,
    /// IAM member strings such as `user:alice@corp.com`.
    #[serde(default)]
    pub members: Vec<String>,
}

/// Structured identity pattern; omitted fields are wildcards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IdentityDefinition {
    /// Member type.
    #[serde(rename = "type", default = "wildcard")]
    pub member_type: String,
    /// Member name.
    #[serde(default = "wildcard")]
    pub name: String,
    /// Member domain.
    #[serde(default = "wildcard")]
    pub domain: String,
}

impl Default for IdentityDefinition {
    fn default() -> Self {
        Self {
            member_type: wildcard(),
            name: wildcard(),
            domain: wildcard(),
        }
    }
}

impl From<&IdentityDefinition> for Member {
    fn from(def: &IdentityDefinition) -> Self {
        Member::new(def.member_type.clone(), def.name.clone(), def.domain.clone())
    }
}

impl RuleDefinition {
    /// Construct the [`Rule`] this definition describes, at `index`.
    ///
    /// Fails with [`RuleError::InvalidRuleDefinition`] on a missing name,
    /// mode, scope or role, or on an unknown mode or applies-to spelling.
    pub fn into_rule(&self, index: usize) -> RuleResult<Rule> {
        let name = self
            .name
            .as_deref()
            .ok_or_else(|| RuleError::invalid(format!("rule {index} is missing `name`")))?;
        let mode = self.mode.as_deref().ok_or_else(|| {
            RuleError::invalid(format!("rule {index} (`{name}`) is missing `mode`"))
        })?;
        let scope = self.scope_resource_id.as_deref().ok_or_else(|| {
            RuleError::invalid(format!("rule {index} (`{name}`) is missing `resource_id`"))
        })?;

        let bindings = self
            .bindings
            .iter()
            .enumerate()
            .map(|(position, binding)| binding.to_rule_binding(index, name, position))
            .collect::<RuleResult<Vec<_>>>()?;

        Rule::from_parts(name, index, bindings, mode, self.applies_to.as_deref(), scope)
    }
}

impl BindingDefinition {
    fn to_rule_binding(&self, index: usize, name: &str, position: usize) -> RuleResult<RuleBinding> {
        let role = self.role.as_deref().ok_or_else(|| {
            RuleError::invalid(format!(
                "rule {index} (`{name}`) binding {position} is missing `role`"
            ))
        })?;

        let mut members: Vec<Member> = self.identities.iter().map(Member::from).collect();
        for member in &self.members {
            let parsed = Member::parse(member).map_err(|e| {
                RuleError::invalid(format!("rule {index} (`{name}`) binding {position}: {e}"))
            })?;
            members.push(parsed);
        }

        Ok(RuleBinding::new(role, members))
    }
}

/// Parse rule definitions from a string, JSON or YAML.
pub fn parse_rule_definitions(
    contents: &str,
    format: RuleFormat,
    origin: &str,
) -> EngineResult<Vec<RuleDefinition>> {
    let file: RuleFile = match format {
        RuleFormat::Json => serde_json::from_str(contents).map_err(|e| EngineError::Parse {
            path: origin.to_string(),
            message: e.to_string(),
        })?,
        RuleFormat::Yaml => serde_yaml::from_str(contents).map_err(|e| EngineError::Parse {
            path: origin.to_string(),
            message: e.to_string(),
        })?,
    };
    Ok(file.rules)
}

/// Supported rule file encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleFormat {
    /// `.json`
    Json,
    /// `.yaml` / `.yml`
    Yaml,
}

impl RuleFormat {
    /// Pick the format from a file extension.
    pub fn from_path(path: &Path) -> EngineResult<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase);
        match ext.as_deref() {
            Some("json") => Ok(RuleFormat::Json),
            Some("yaml") | Some("yml") => Ok(RuleFormat::Yaml),
            _ => Err(EngineError::UnsupportedFormat(path.display().to_string())),
        }
    }
}

/// Read and parse a rule file.
///
/// An empty `rules` list is returned as-is; rejecting it is the rule book
/// builder's job.
pub fn load_rule_definitions(path: &Path) -> EngineResult<Vec<RuleDefinition>> {
    let format = RuleFormat::from_path(path)?;
    let contents = std::fs::read_to_string(path).map_err(|source| EngineError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let definitions = parse_rule_definitions(&contents, format, &path.display().to_string())?;

    tracing::debug!(
        path = %path.display(),
        definitions = definitions.len(),
        "Loaded rule definitions"
    );

    Ok(definitions)
}
