//! Collaborator interfaces
//!
//! The engine core never fetches data. Before a resource is evaluated, the
//! scan driver asks an [`AncestryProvider`] for the resource's ancestor chain
//! and a [`BindingsProvider`] for its current grants. Failures from either
//! are propagated as-is; nothing here retries.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use audit_resources::{Resource, ResourceHierarchy};
use audit_rules::{Binding, IamPolicy};

use crate::error::ProviderResult;

/// Resolves the ancestor chain of a resource.
#[async_trait]
pub trait AncestryProvider: Send + Sync {
    /// Ancestor ids of `resource_id`, nearest parent first.
    async fn ancestry(&self, resource_id: &str) -> ProviderResult<Vec<String>>;
}

/// Retrieves the actual bindings observed on a resource.
#[async_trait]
pub trait BindingsProvider: Send + Sync {
    /// Current bindings of `resource`, in a stable order.
    async fn bindings(&self, resource: &Resource) -> ProviderResult<Vec<Binding>>;
}

#[async_trait]
impl AncestryProvider for ResourceHierarchy {
    async fn ancestry(&self, resource_id: &str) -> ProviderResult<Vec<String>> {
        Ok(ResourceHierarchy::ancestry(self, resource_id)?)
    }
}

#[async_trait]
impl<T: AncestryProvider + ?Sized> AncestryProvider for Arc<T> {
    async fn ancestry(&self, resource_id: &str) -> ProviderResult<Vec<String>> {
        (**self).ancestry(resource_id).await
    }
}

#[async_trait]
impl<T: BindingsProvider + ?Sized> BindingsProvider for Arc<T> {
    async fn bindings(&self, resource: &Resource) -> ProviderResult<Vec<Binding>> {
        (**self).bindings(resource).await
    }
}

/// Bindings held in memory, keyed by resource id.
///
/// Resources with no entry have no bindings.
#[derive(Debug, Clone, Default)]
pub struct InMemoryBindings {
    by_resource: HashMap<String, Vec<Binding>>,
}

impl InMemoryBindings {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a binding for a resource.
    pub fn insert(&mut self, resource_id: impl Into<String>, binding: Binding) {
        self.by_resource
            .entry(resource_id.into())
            .or_default()
            .push(binding);
    }

    /// Replace all bindings of a resource.
    pub fn set(&mut self, resource_id: impl Into<String>, bindings: Vec<Binding>) {
        self.by_resource.insert(resource_id.into(), bindings);
    }
}

#[async_trait]
impl BindingsProvider for InMemoryBindings {
    async fn bindings(&self, resource: &Resource) -> ProviderResult<Vec<Binding>> {
        Ok(self
            .by_resource
            .get(&resource.resource_id)
            .cloned()
            .unwrap_or_default())
    }
}

/// Bindings derived from per-resource IAM policy documents.
///
/// A malformed member string in a policy fails that resource with
/// [`ProviderError::InvalidData`](crate::error::ProviderError::InvalidData).
#[derive(Debug, Clone, Default)]
pub struct IamPolicyBindings {
    policies: HashMap<String, IamPolicy>,
}

impl IamPolicyBindings {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the IAM policy of a resource.
    pub fn insert(&mut self, resource_id: impl Into<String>, policy: IamPolicy) {
        self.policies.insert(resource_id.into(), policy);
    }
}

#[async_trait]
impl BindingsProvider for IamPolicyBindings {
    async fn bindings(&self, resource: &Resource) -> ProviderResult<Vec<Binding>> {
        match self.policies.get(&resource.resource_id) {
            Some(policy) => Ok(policy.flatten()?),
            None => Ok(Vec::new()),
        }
    }
}
