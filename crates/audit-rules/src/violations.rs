//! # Violations
//!
//! Records emitted when a resource's bindings deviate from an applicable rule.
//! Field order and names form the schema consumed by exporters.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::members::Member;

/// Kind of deviation a violation reports.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ViolationType {
    /// A grant exists that should not.
    Added,
    /// A grant is missing that should exist.
    Removed,
    /// Unclassified deviation.
    Unspecified,
}

impl ViolationType {
    /// Get the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            ViolationType::Added => "ADDED",
            ViolationType::Removed => "REMOVED",
            ViolationType::Unspecified => "UNSPECIFIED",
        }
    }
}

impl fmt::Display for ViolationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One rule/resource mismatch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct RuleViolation {
    /// Type of the offending resource, e.g. `project`.
    pub resource_type: String,
    /// Id of the offending resource.
    pub resource_id: String,
    /// Name of the rule that was violated.
    pub rule_name: String,
    /// Index of the rule that was violated.
    pub rule_index: usize,
    /// Kind of deviation.
    pub violation_type: ViolationType,
    /// Role the violation concerns.
    pub role: String,
    /// Actual or required identities implicated.
    pub members: Vec<Member>,
}
