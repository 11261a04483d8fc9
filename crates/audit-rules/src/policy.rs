//! IAM policy documents
//!
//! Deserializes the standard IAM policy shape and flattens it into the
//! per-member [`Binding`] list the evaluator consumes.

use serde::{Deserialize, Serialize};

use crate::error::RuleResult;
use crate::members::Binding;

/// An IAM policy as returned by the cloud provider.
///
/// # Example
///
/// ```
/// use audit_rules::policy::IamPolicy;
///
/// let policy: IamPolicy = serde_json::from_str(r#"{
///     "bindings": [
///         {"role": "roles/owner", "members": ["user:alice@x.com", "group:ops@x.com"]}
///     ],
///     "etag": "BwWKmjvelug="
/// }"#).unwrap();
///
/// let bindings = policy.flatten().unwrap();
/// assert_eq!(bindings.len(), 2);
/// assert_eq!(bindings[1].member.member_type, "group");
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct IamPolicy {
    /// Role-to-members bindings.
    #[serde(default)]
    pub bindings: Vec<IamPolicyBinding>,
    /// Concurrency tag, carried through untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
    /// Policy format version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u32>,
}

/// One role and its members inside an [`IamPolicy`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IamPolicyBinding {
    /// Role name.
    pub role: String,
    /// IAM member strings such as `user:alice@x.com`.
    #[serde(default)]
    pub members: Vec<String>,
}

impl IamPolicy {
    /// Flatten into one [`Binding`] per (role, member), in document order.
    ///
    /// Fails on the first member string that cannot be parsed.
    pub fn flatten(&self) -> RuleResult<Vec<Binding>> {
        let mut out = Vec::new();
        for binding in &self.bindings {
            for member in &binding.members {
                out.push(Binding::parse(binding.role.clone(), member)?);
            }
        }
        Ok(out)
    }
}
