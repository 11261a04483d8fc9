//! In-memory resource hierarchy
//!
//! Holds the parent links of an inventory snapshot and answers ancestry
//! queries. Parents must be registered before their children, so the tree is
//! acyclic by construction.

use std::collections::HashMap;
use thiserror::Error;

use crate::resource::{Resource, ResourceType};

/// Hierarchy error types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HierarchyError {
    /// Resource id was never registered
    #[error("Unknown resource: {0}")]
    UnknownResource(String),

    /// Resource id registered twice
    #[error("Duplicate resource: {0}")]
    DuplicateResource(String),

    /// Parent type cannot contain the child type
    #[error("A {parent_type} cannot contain a {child_type} (`{child_id}` under `{parent_id}`)")]
    InvalidParent {
        /// Child resource id.
        child_id: String,
        /// Child resource type.
        child_type: ResourceType,
        /// Parent resource id.
        parent_id: String,
        /// Parent resource type.
        parent_type: ResourceType,
    },
}

/// Result type for hierarchy operations.
pub type HierarchyResult<T> = Result<T, HierarchyError>;

#[derive(Debug, Clone)]
struct Node {
    resource_type: ResourceType,
    parent: Option<String>,
}

/// Parent links for every known resource.
///
/// # Examples
///
/// ```
/// use audit_resources::{ResourceHierarchy, ResourceType};
///
/// let mut tree = ResourceHierarchy::new();
/// tree.add_root("org-1", ResourceType::Organization).unwrap();
/// tree.add_child("folder-1", ResourceType::Folder, "org-1").unwrap();
/// tree.add_child("proj-1", ResourceType::Project, "folder-1").unwrap();
///
/// assert_eq!(tree.ancestry("proj-1").unwrap(), vec!["folder-1", "org-1"]);
/// assert!(tree.ancestry("proj-404").is_err());
/// ```
#[derive(Debug, Clone, Default)]
pub struct ResourceHierarchy {
    nodes: HashMap<String, Node>,
    /// Registration order, for deterministic iteration.
    order: Vec<String>,
}

impl ResourceHierarchy {
    /// Create an empty hierarchy.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a resource with no parent.
    pub fn add_root(
        &mut self,
        resource_id: impl Into<String>,
        resource_type: ResourceType,
    ) -> HierarchyResult<()> {
        self.insert(resource_id.into(), resource_type, None)
    }

    /// Register a resource under an already registered parent.
    pub fn add_child(
        &mut self,
        resource_id: impl Into<String>,
        resource_type: ResourceType,
        parent_id: impl Into<String>,
    ) -> HierarchyResult<()> {
        let resource_id = resource_id.into();
        let parent_id = parent_id.into();

        let parent = self
            .nodes
            .get(&parent_id)
            .ok_or_else(|| HierarchyError::UnknownResource(parent_id.clone()))?;

        if !parent.resource_type.can_contain(resource_type) {
            return Err(HierarchyError::InvalidParent {
                child_id: resource_id,
                child_type: resource_type,
                parent_id,
                parent_type: parent.resource_type,
            });
        }

        self.insert(resource_id, resource_type, Some(parent_id))
    }

    fn insert(
        &mut self,
        resource_id: String,
        resource_type: ResourceType,
        parent: Option<String>,
    ) -> HierarchyResult<()> {
        if self.nodes.contains_key(&resource_id) {
            return Err(HierarchyError::DuplicateResource(resource_id));
        }
        self.order.push(resource_id.clone());
        self.nodes.insert(
            resource_id,
            Node {
                resource_type,
                parent,
            },
        );
        Ok(())
    }

    /// Check if a resource is registered.
    pub fn contains(&self, resource_id: &str) -> bool {
        self.nodes.contains_key(resource_id)
    }

    /// Number of registered resources.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Ancestor ids of a resource, nearest parent first.
    pub fn ancestry(&self, resource_id: &str) -> HierarchyResult<Vec<String>> {
        let mut node = self
            .nodes
            .get(resource_id)
            .ok_or_else(|| HierarchyError::UnknownResource(resource_id.to_string()))?;

        let mut chain = Vec::new();
        while let Some(parent_id) = &node.parent {
            chain.push(parent_id.clone());
            node = self
                .nodes
                .get(parent_id)
                .ok_or_else(|| HierarchyError::UnknownResource(parent_id.clone()))?;
        }
        Ok(chain)
    }

    /// Build the full [`Resource`] value, ancestry included.
    pub fn resource(&self, resource_id: &str) -> HierarchyResult<Resource> {
        let node = self
            .nodes
            .get(resource_id)
            .ok_or_else(|| HierarchyError::UnknownResource(resource_id.to_string()))?;
        Ok(Resource::new(resource_id, node.resource_type).with_ancestry(self.ancestry(resource_id)?))
    }

    /// Type of a registered resource.
    pub fn resource_type(&self, resource_id: &str) -> Option<ResourceType> {
        self.nodes.get(resource_id).map(|n| n.resource_type)
    }

    /// All resources in registration order.
    pub fn resources(&self) -> Vec<Resource> {
        self.order
            .iter()
            .filter_map(|id| self.resource(id).ok())
            .collect()
    }

    /// Resources of one type, in registration order.
    pub fn resources_of_type(&self, resource_type: ResourceType) -> Vec<Resource> {
        self.resources()
            .into_iter()
            .filter(|r| r.resource_type == resource_type)
            .collect()
    }
}
