//! # Audit Rules
//!
//! This crate provides the value types of the access-policy audit engine:
//! the members that hold roles, the rules that constrain them, and the
//! violations reported when a resource deviates.
//!
//! ## Overview
//!
//! The audit-rules crate handles:
//! - **Members**: `(type, name, domain)` identities with `*` wildcards
//! - **Bindings**: concrete role grants observed on a resource
//! - **Rules**: mode + bindings + hierarchy scope, declared once
//! - **Violations**: `ADDED` / `REMOVED` records
//! - **IAM Policies**: flattening policy documents into bindings
//!
//! ## Architecture
//!
//! ```text
//! Rule = name + index + mode + [RuleBinding] + applies_to + scope_resource_id
//! RuleBinding = role + [Member pattern]
//!
//! Modes:
//!   whitelist  - only the listed members may hold the role
//!   blacklist  - the listed members must never hold the role
//!   required   - the listed members must always hold the role
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use audit_rules::{Member, Rule, RuleAppliesTo, RuleBinding, RuleMode};
//!
//! let rule = Rule::new(
//!     "no public buckets",
//!     0,
//!     vec![RuleBinding::new("*", vec![Member::parse("allUsers").unwrap()])],
//!     RuleMode::Blacklist,
//!     RuleAppliesTo::SelfAndChildren,
//!     "org-1",
//! )
//! .unwrap();
//!
//! assert!(rule.applies_to.includes_children());
//! ```

pub mod error;
pub mod members;
pub mod policy;
pub mod rules;
pub mod violations;

// Re-export main types for convenience
pub use error::{RuleError, RuleResult};
pub use members::{role_matches, Binding, Member, WILDCARD};
pub use policy::{IamPolicy, IamPolicyBinding};
pub use rules::{Rule, RuleAppliesTo, RuleBinding, RuleMode};
pub use violations::{RuleViolation, ViolationType};
