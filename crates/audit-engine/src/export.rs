//! Violation export
//!
//! Flattens violations to one row per implicated member and writes them as
//! newline-delimited JSON. Bucket ACL violations have their own row shape
//! that keeps the ACL entity, email, domain and bucket.

use serde::{Deserialize, Serialize};
use std::io::{self, Write};

use audit_rules::{Member, RuleViolation, ViolationType};

use crate::bucket_acl::acl_entity;

/// One exported violation record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ViolationRow {
    /// Offending resource id.
    pub resource_id: String,
    /// Offending resource type.
    pub resource_type: String,
    /// Violated rule index.
    pub rule_index: usize,
    /// Violated rule name.
    pub rule_name: String,
    /// `ADDED` or `REMOVED`.
    pub violation_type: ViolationType,
    /// Role concerned.
    pub role: String,
    /// Member rendered as `type:name`.
    pub member: String,
}

/// Expand violations into rows, one per member, keeping order.
pub fn flatten_violations(violations: &[RuleViolation]) -> Vec<ViolationRow> {
    violations
        .iter()
        .flat_map(|v| {
            v.members.iter().map(move |member| ViolationRow {
                resource_id: v.resource_id.clone(),
                resource_type: v.resource_type.clone(),
                rule_index: v.rule_index,
                rule_name: v.rule_name.clone(),
                violation_type: v.violation_type,
                role: v.role.clone(),
                member: member.to_string(),
            })
        })
        .collect()
}

/// One exported bucket ACL violation record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BucketAclViolationRow {
    /// Always `bucket`.
    pub resource_type: String,
    /// Bucket resource id.
    pub resource_id: String,
    /// Violated rule name.
    pub rule_name: String,
    /// Violated rule index.
    pub rule_index: usize,
    /// `ADDED` or `REMOVED`.
    pub violation_type: ViolationType,
    /// ACL role, e.g. `READER`.
    pub role: String,
    /// ACL entity, e.g. `user-alice@corp.com`.
    pub entity: String,
    /// Grantee email for user and group entities.
    pub email: Option<String>,
    /// Grantee domain, when known.
    pub domain: Option<String>,
    /// Bucket name.
    pub bucket: String,
}

impl BucketAclViolationRow {
    fn new(violation: &RuleViolation, member: &Member) -> Self {
        let email = matches!(member.member_type.as_str(), "user" | "group")
            .then(|| member.member_name.clone());
        let domain = Some(member.member_domain.clone()).filter(|d| !d.is_empty());

        Self {
            resource_type: violation.resource_type.clone(),
            resource_id: violation.resource_id.clone(),
            rule_name: violation.rule_name.clone(),
            rule_index: violation.rule_index,
            violation_type: violation.violation_type,
            role: violation.role.clone(),
            entity: acl_entity(member),
            email,
            domain,
            bucket: violation.resource_id.clone(),
        }
    }
}

/// Expand bucket ACL violations into rows, one per ACL entity, keeping order.
pub fn flatten_bucket_acl_violations(violations: &[RuleViolation]) -> Vec<BucketAclViolationRow> {
    violations
        .iter()
        .flat_map(|v| v.members.iter().map(move |m| BucketAclViolationRow::new(v, m)))
        .collect()
}

/// Write rows as JSON lines. Returns the number of rows written.
pub fn write_json_lines<T, W>(rows: &[T], mut writer: W) -> io::Result<usize>
where
    T: Serialize,
    W: Write,
{
    for row in rows {
        serde_json::to_writer(&mut writer, row)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;

    tracing::debug!(rows = rows.len(), "Exported violations");
    Ok(rows.len())
}
