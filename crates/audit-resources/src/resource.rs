//! Resource domain models
//!
//! This module provides the [`Resource`] value scanned by the engine and the
//! [`ResourceType`] levels of the hierarchy it lives in.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Level of a resource in the hierarchy.
///
/// The hierarchy is: Organization → Folder (nestable) → Project → Bucket.
///
/// # Examples
///
/// ```
/// use audit_resources::ResourceType;
///
/// assert!(ResourceType::Organization.can_contain(ResourceType::Folder));
/// assert!(ResourceType::Folder.can_contain(ResourceType::Folder));
/// assert!(!ResourceType::Project.can_contain(ResourceType::Folder));
/// ```
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    /// Root of the hierarchy
    Organization,

    /// Grouping under an organization or another folder
    Folder,

    /// Workload container under an organization or folder
    Project,

    /// Storage bucket inside a project
    Bucket,
}

impl ResourceType {
    /// Get string representation of the type.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::Organization => "organization",
            ResourceType::Folder => "folder",
            ResourceType::Project => "project",
            ResourceType::Bucket => "bucket",
        }
    }

    /// Parse a resource type from string (case-insensitive).
    ///
    /// # Examples
    ///
    /// ```
    /// use audit_resources::ResourceType;
    ///
    /// assert_eq!(ResourceType::parse("PROJECT"), Some(ResourceType::Project));
    /// assert_eq!(ResourceType::parse("org"), Some(ResourceType::Organization));
    /// assert_eq!(ResourceType::parse("cluster"), None);
    /// ```
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "organization" | "org" => Some(Self::Organization),
            "folder" => Some(Self::Folder),
            "project" => Some(Self::Project),
            "bucket" => Some(Self::Bucket),
            _ => None,
        }
    }

    /// Check whether a resource of this type may be the direct parent of `child`.
    pub fn can_contain(&self, child: ResourceType) -> bool {
        match self {
            ResourceType::Organization | ResourceType::Folder => {
                matches!(child, ResourceType::Folder | ResourceType::Project)
            }
            ResourceType::Project => child == ResourceType::Bucket,
            ResourceType::Bucket => false,
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A resource to audit, with its ancestor chain.
///
/// `ancestry` runs from the immediate parent up to the root. The engine
/// never mutates a resource.
///
/// # Examples
///
/// ```
/// use audit_resources::{Resource, ResourceType};
///
/// let project = Resource::new("proj-1", ResourceType::Project)
///     .with_ancestry(vec!["folder-1".to_string(), "org-1".to_string()]);
///
/// assert_eq!(project.parent(), Some("folder-1"));
/// assert!(project.is_descendant_of("org-1"));
/// assert_eq!(project.lineage().collect::<Vec<_>>(), vec!["proj-1", "folder-1", "org-1"]);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Resource {
    /// Unique identifier
    pub resource_id: String,

    /// Hierarchy level
    pub resource_type: ResourceType,

    /// Ancestor ids, nearest parent first
    #[serde(default)]
    pub ancestry: Vec<String>,
}

impl Resource {
    /// Creates a resource with no ancestors.
    pub fn new(resource_id: impl Into<String>, resource_type: ResourceType) -> Self {
        Self {
            resource_id: resource_id.into(),
            resource_type,
            ancestry: Vec::new(),
        }
    }

    /// Set the ancestor chain (nearest parent first).
    pub fn with_ancestry(mut self, ancestry: Vec<String>) -> Self {
        self.ancestry = ancestry;
        self
    }

    /// Immediate parent id, if any.
    pub fn parent(&self) -> Option<&str> {
        self.ancestry.first().map(String::as_str)
    }

    /// Root ancestor id, or the resource itself when it has no ancestors.
    pub fn root(&self) -> &str {
        self.ancestry
            .last()
            .map(String::as_str)
            .unwrap_or(self.resource_id.as_str())
    }

    /// Check whether `ancestor_id` appears in this resource's ancestry.
    pub fn is_descendant_of(&self, ancestor_id: &str) -> bool {
        self.ancestry.iter().any(|id| id == ancestor_id)
    }

    /// The resource id followed by its ancestors, nearest first.
    pub fn lineage(&self) -> impl Iterator<Item = &str> + '_ {
        std::iter::once(self.resource_id.as_str()).chain(self.ancestry.iter().map(String::as_str))
    }
}
