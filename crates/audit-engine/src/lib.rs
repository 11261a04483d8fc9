//! # Audit Engine
//!
//! This crate evaluates access-control bindings against hierarchy-aware
//! rules and reports violations.
//!
//! ## Overview
//!
//! The audit-engine crate handles:
//! - **Rule Definitions**: loading JSON/YAML rule files
//! - **Rule Book**: indexing rules by anchor and resolving applicability
//! - **Evaluator**: whitelist / blacklist / required semantics
//! - **Engines**: IAM policy and bucket ACL scan kinds
//! - **Scanner**: fetching ancestry and bindings, assembling reports
//! - **Export**: flat violation rows (generic and bucket ACL) as JSON lines
//!
//! ## Architecture
//!
//! ```text
//! rule file ──► RuleDefinition ──► RuleBook (per engine)
//!                                      │
//! AncestryProvider ─┐                  ▼
//!                   ├──► Scanner ──► find_violations ──► ScanReport
//! BindingsProvider ─┘
//! ```
//!
//! A rule anchored at resource `R` applies to `R` itself when it covers
//! `self`, and to every descendant of `R` when it covers `children`.
//! Violations for one resource come out in ascending rule-index order.
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use audit_engine::definitions::{parse_rule_definitions, RuleFormat};
//! use audit_engine::{IamRulesEngine, InMemoryBindings, RuleSource, ScanTarget, Scanner};
//! use audit_resources::{ResourceHierarchy, ResourceType};
//! use audit_rules::Binding;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let yaml = r#"
//! rules:
//!   - name: corp owners only
//!     mode: whitelist
//!     applies_to: children
//!     resource_id: org-1
//!     bindings:
//!       - role: roles/owner
//!         members: ["user:*@corp.com"]
//! "#;
//! let definitions = parse_rule_definitions(yaml, RuleFormat::Yaml, "inline").unwrap();
//! let engine = IamRulesEngine::with_definitions(RuleSource::new("inline").unwrap(), &definitions)
//!     .unwrap();
//!
//! let mut tree = ResourceHierarchy::new();
//! tree.add_root("org-1", ResourceType::Organization).unwrap();
//! tree.add_child("proj-1", ResourceType::Project, "org-1").unwrap();
//!
//! let mut bindings = InMemoryBindings::new();
//! bindings.insert("proj-1", Binding::parse("roles/owner", "user:eve@evil.com").unwrap());
//!
//! let scanner = Scanner::new(Arc::new(engine), Arc::new(tree), Arc::new(bindings));
//! let report = scanner
//!     .scan(&[ScanTarget::new("proj-1", ResourceType::Project)])
//!     .await
//!     .unwrap();
//! assert_eq!(report.violations.len(), 1);
//! # }
//! ```

pub mod bucket_acl;
pub mod config;
pub mod definitions;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod export;
pub mod iam;
pub mod providers;
pub mod rule_book;
pub mod scanner;

// Re-export main types for convenience
pub use bucket_acl::{acl_entity, BucketAclBindings, BucketAclEntry, BucketAclRulesEngine};
pub use config::{ConfigError, ScannerConfig};
pub use definitions::{load_rule_definitions, RuleDefinition, RuleFile};
pub use engine::{RuleSource, RulesEngine, Violations};
pub use error::{EngineError, EngineResult, ProviderError, ProviderResult, ScanError};
pub use export::{
    flatten_bucket_acl_violations, flatten_violations, write_json_lines, BucketAclViolationRow,
    ViolationRow,
};
pub use iam::IamRulesEngine;
pub use providers::{AncestryProvider, BindingsProvider, IamPolicyBindings, InMemoryBindings};
pub use rule_book::RuleBook;
pub use scanner::{ScanFailure, ScanReport, ScanTarget, Scanner};
