//! # Scanner
//!
//! Drives a rules engine over a list of resources. For each target the
//! scanner resolves ancestry, fetches the actual bindings and collects the
//! engine's violations. Resources are scanned one after another, so a
//! report's violations are grouped by resource in target order.
//!
//! ## Failure handling
//!
//! A collaborator failure on one resource either aborts the whole scan
//! (`fail_fast`) or is logged, recorded in [`ScanReport::failures`] and
//! skipped. Engine evaluation itself cannot fail.
//!
//! ## Usage
//!
//! ```rust,ignore
//! let scanner = Scanner::new(Arc::new(engine), Arc::new(hierarchy), Arc::new(bindings))
//!     .with_config(ScannerConfig::from_env()?);
//! let report = scanner.scan(&targets).await?;
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use audit_resources::{Resource, ResourceType};
use audit_rules::RuleViolation;

use crate::config::ScannerConfig;
use crate::engine::RulesEngine;
use crate::error::ScanError;
use crate::providers::{AncestryProvider, BindingsProvider};

/// A resource to scan.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScanTarget {
    /// Resource id.
    pub resource_id: String,
    /// Resource type.
    pub resource_type: ResourceType,
}

impl ScanTarget {
    /// Create a scan target.
    pub fn new(resource_id: impl Into<String>, resource_type: ResourceType) -> Self {
        Self {
            resource_id: resource_id.into(),
            resource_type,
        }
    }
}

impl From<&Resource> for ScanTarget {
    fn from(resource: &Resource) -> Self {
        Self::new(resource.resource_id.clone(), resource.resource_type)
    }
}

/// A resource skipped because a collaborator failed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScanFailure {
    /// The skipped resource.
    pub resource_id: String,
    /// Collaborator error message.
    pub message: String,
}

impl From<&ScanError> for ScanFailure {
    fn from(err: &ScanError) -> Self {
        Self {
            resource_id: err.resource_id.clone(),
            message: err.source.to_string(),
        }
    }
}

/// Outcome of one scan run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanReport {
    /// Unique id of this run.
    pub scan_id: Uuid,
    /// Engine kind, e.g. `iam_policy`.
    pub engine: String,
    /// When the scan started.
    pub started_at: DateTime<Utc>,
    /// When the scan finished.
    pub finished_at: DateTime<Utc>,
    /// Resources fully evaluated.
    pub resources_scanned: usize,
    /// Violations, grouped by resource in scan order.
    pub violations: Vec<RuleViolation>,
    /// Resources skipped after a collaborator failure.
    pub failures: Vec<ScanFailure>,
    /// Whether violations were dropped because the cap was exceeded; the
    /// scan stops at the resource that exceeded it.
    pub truncated: bool,
}

impl ScanReport {
    /// Check if the scan found nothing wrong and skipped nothing.
    pub fn is_clean(&self) -> bool {
        self.violations.is_empty() && self.failures.is_empty()
    }
}

/// Runs a [`RulesEngine`] against resources fetched from collaborators.
pub struct Scanner<E: RulesEngine> {
    engine: Arc<E>,
    ancestry: Arc<dyn AncestryProvider>,
    bindings: Arc<dyn BindingsProvider>,
    config: ScannerConfig,
}

impl<E: RulesEngine> Scanner<E> {
    /// Create a scanner with default configuration.
    pub fn new(
        engine: Arc<E>,
        ancestry: Arc<dyn AncestryProvider>,
        bindings: Arc<dyn BindingsProvider>,
    ) -> Self {
        Self {
            engine,
            ancestry,
            bindings,
            config: ScannerConfig::default(),
        }
    }

    /// Set the scan configuration.
    pub fn with_config(mut self, config: ScannerConfig) -> Self {
        self.config = config;
        self
    }

    /// The engine driven by this scanner.
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Evaluate a single resource.
    pub async fn scan_resource(&self, target: &ScanTarget) -> Result<Vec<RuleViolation>, ScanError> {
        let ancestry = self
            .ancestry
            .ancestry(&target.resource_id)
            .await
            .map_err(|e| ScanError::new(&target.resource_id, e))?;

        let resource =
            Resource::new(target.resource_id.clone(), target.resource_type).with_ancestry(ancestry);

        let bindings = self
            .bindings
            .bindings(&resource)
            .await
            .map_err(|e| ScanError::new(&target.resource_id, e))?;

        let violations: Vec<RuleViolation> =
            self.engine.find_violations(&resource, &bindings).collect();

        tracing::debug!(
            engine = self.engine.kind(),
            resource_id = %resource.resource_id,
            resource_type = %resource.resource_type,
            bindings = bindings.len(),
            violations = violations.len(),
            "Scanned resource"
        );

        Ok(violations)
    }

    /// Evaluate every target in order.
    ///
    /// With `fail_fast` the first collaborator failure is returned as the
    /// error; otherwise it is logged and the resource is recorded in
    /// [`ScanReport::failures`].
    pub async fn scan(&self, targets: &[ScanTarget]) -> Result<ScanReport, ScanError> {
        let scan_id = Uuid::now_v7();
        let started_at = Utc::now();

        tracing::info!(
            scan_id = %scan_id,
            engine = self.engine.kind(),
            targets = targets.len(),
            rules = self.engine.rule_book().len(),
            "Starting scan"
        );

        let mut violations = Vec::new();
        let mut failures = Vec::new();
        let mut resources_scanned = 0;
        let mut truncated = false;

        for target in targets {
            match self.scan_resource(target).await {
                Ok(found) => {
                    resources_scanned += 1;
                    violations.extend(found);
                }
                Err(err) if self.config.fail_fast => {
                    tracing::error!(
                        scan_id = %scan_id,
                        resource_id = %err.resource_id,
                        error = %err.source,
                        "Aborting scan"
                    );
                    return Err(err);
                }
                Err(err) => {
                    tracing::warn!(
                        scan_id = %scan_id,
                        resource_id = %err.resource_id,
                        error = %err.source,
                        "Skipping resource"
                    );
                    failures.push(ScanFailure::from(&err));
                }
            }

            if let Some(max) = self.config.max_violations {
                if violations.len() > max.get() {
                    violations.truncate(max.get());
                    truncated = true;
                    tracing::warn!(
                        scan_id = %scan_id,
                        max_violations = max.get(),
                        "Violation cap reached, stopping scan"
                    );
                    break;
                }
            }
        }

        let report = ScanReport {
            scan_id,
            engine: self.engine.kind().to_string(),
            started_at,
            finished_at: Utc::now(),
            resources_scanned,
            violations,
            failures,
            truncated,
        };

        tracing::info!(
            scan_id = %scan_id,
            resources = report.resources_scanned,
            violations = report.violations.len(),
            failures = report.failures.len(),
            "Finished scan"
        );

        Ok(report)
    }
}
