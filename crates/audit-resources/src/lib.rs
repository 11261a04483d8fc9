//! # Audit Resources
//!
//! This crate models the resource hierarchy that access-policy rules are
//! declared against.
//!
//! ## Overview
//!
//! The audit-resources crate handles:
//! - **Resource Types**: Organization, Folder, Project, Bucket
//! - **Resources**: an id, a type and the ancestor chain
//! - **Hierarchy**: in-memory parent links answering ancestry queries
//!
//! ## Architecture
//!
//! ```text
//! Organization
//!   ├─ Folder
//!   │    ├─ Folder (nested)
//!   │    └─ Project
//!   │          └─ Bucket
//!   └─ Project
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use audit_resources::{ResourceHierarchy, ResourceType};
//!
//! let mut tree = ResourceHierarchy::new();
//! tree.add_root("org-1", ResourceType::Organization).unwrap();
//! tree.add_child("proj-1", ResourceType::Project, "org-1").unwrap();
//!
//! let project = tree.resource("proj-1").unwrap();
//! assert_eq!(project.ancestry, vec!["org-1"]);
//! ```

pub mod hierarchy;
pub mod resource;

// Re-export main types for convenience
pub use hierarchy::{HierarchyError, HierarchyResult, ResourceHierarchy};
pub use resource::{Resource, ResourceType};
