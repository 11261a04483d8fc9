//! End-to-end tests for policy scans.
//!
//! These tests load rule files from disk, build a small organization tree
//! and run full scans through in-memory collaborators.
//!
//! Test scenarios:
//! 1. IAM scan over org → folder → project with all three rule modes
//! 2. Collaborator failures with and without fail-fast
//! 3. Bucket ACL scan under a project
//! 4. Violation export of a finished report
//! 5. Engine and scanner driven by environment configuration

use std::io::Write;
use std::num::NonZeroUsize;
use std::sync::Arc;

use async_trait::async_trait;
use audit_engine::{
    flatten_bucket_acl_violations, flatten_violations, write_json_lines, BindingsProvider, BucketAclBindings, BucketAclEntry,
    BucketAclRulesEngine, IamPolicyBindings, IamRulesEngine, InMemoryBindings, ProviderError,
    ProviderResult, RulesEngine, ScanTarget, Scanner, ScannerConfig,
};
use audit_resources::{Resource, ResourceHierarchy, ResourceType};
use audit_rules::{Binding, IamPolicy, IamPolicyBinding, ViolationType};

const IAM_RULES: &str = r#"
rules:
  - name: corp owners only
    mode: whitelist
    applies_to: children
    resource_id: org-1
    bindings:
      - role: roles/owner
        members: ["user:*@corp.com", "group:*@corp.com"]
  - name: no public access
    mode: blacklist
    applies_to: self_and_children
    resource_id: folder-1
    bindings:
      - role: "*"
        members: [allUsers, allAuthenticatedUsers]
  - name: security team audits projects
    mode: required
    resource_id: proj-1
    bindings:
      - role: roles/iam.securityReviewer
        identities:
          - { type: group, name: security@corp.com, domain: corp.com }
"#;

const ACL_RULES: &str = r#"{"rules": [
    {
        "name": "no world-readable buckets",
        "mode": "blacklist",
        "applies_to": "children",
        "resource_id": "proj-1",
        "bindings": [{"role": "*", "members": ["allUsers", "allAuthenticatedUsers"]}]
    }
]}"#;

/// Test fixture providing a rule file and an organization tree.
struct TestFixture {
    /// Rule file kept alive for the duration of the test.
    rules: tempfile::NamedTempFile,
    /// org-1 → folder-1 → proj-1 → logs, org-1 → proj-2
    hierarchy: Arc<ResourceHierarchy>,
}

impl TestFixture {
    fn new(contents: &str, suffix: &str) -> Self {
        let mut rules = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        rules.write_all(contents.as_bytes()).unwrap();

        let mut tree = ResourceHierarchy::new();
        tree.add_root("org-1", ResourceType::Organization).unwrap();
        tree.add_child("folder-1", ResourceType::Folder, "org-1").unwrap();
        tree.add_child("proj-1", ResourceType::Project, "folder-1").unwrap();
        tree.add_child("proj-2", ResourceType::Project, "org-1").unwrap();
        tree.add_child("logs", ResourceType::Bucket, "proj-1").unwrap();

        Self {
            rules,
            hierarchy: Arc::new(tree),
        }
    }

    fn rules_path(&self) -> String {
        self.rules.path().display().to_string()
    }

    /// Buckets only, or everything except buckets, in insertion order.
    fn targets(&self, buckets: bool) -> Vec<ScanTarget> {
        self.hierarchy
            .resources()
            .iter()
            .filter(|r| (r.resource_type == ResourceType::Bucket) == buckets)
            .map(ScanTarget::from)
            .collect()
    }
}

fn binding(role: &str, members: &[&str]) -> IamPolicyBinding {
    IamPolicyBinding {
        role: role.to_string(),
        members: members.iter().map(|m| m.to_string()).collect(),
    }
}

fn policy(bindings: Vec<IamPolicyBinding>) -> IamPolicy {
    IamPolicy {
        bindings,
        ..Default::default()
    }
}

fn iam_policies() -> IamPolicyBindings {
    let mut store = IamPolicyBindings::new();
    store.insert("org-1", policy(vec![binding("roles/owner", &["user:founder@gmail.com"])]));
    store.insert("folder-1", policy(vec![binding("roles/viewer", &["allAuthenticatedUsers"])]));
    store.insert(
        "proj-1",
        policy(vec![
            binding("roles/owner", &["user:alice@corp.com", "user:eve@evil.com"]),
            binding("roles/viewer", &["allUsers"]),
        ]),
    );
    store.insert("proj-2", policy(vec![binding("roles/owner", &["group:ops@corp.com"])]));
    store
}

struct FlakyBindings {
    inner: IamPolicyBindings,
    broken: &'static str,
}

#[async_trait]
impl BindingsProvider for FlakyBindings {
    async fn bindings(&self, resource: &Resource) -> ProviderResult<Vec<Binding>> {
        if resource.resource_id == self.broken {
            return Err(ProviderError::Unavailable("connection reset".to_string()));
        }
        self.inner.bindings(resource).await
    }
}

#[tokio::test]
async fn test_iam_scan_over_hierarchy() {
    let fixture = TestFixture::new(IAM_RULES, ".yaml");
    let engine = IamRulesEngine::new(&fixture.rules_path()).unwrap();
    assert_eq!(engine.rule_book().len(), 3);

    let scanner = Scanner::new(
        Arc::new(engine),
        fixture.hierarchy.clone(),
        Arc::new(iam_policies()),
    );
    let report = scanner
        .scan(&fixture.targets(false))
        .await
        .unwrap();

    assert_eq!(report.resources_scanned, 4);
    assert!(report.failures.is_empty());

    let found: Vec<(&str, usize, ViolationType, &str, String)> = report
        .violations
        .iter()
        .map(|v| {
            (
                v.resource_id.as_str(),
                v.rule_index,
                v.violation_type,
                v.role.as_str(),
                v.members[0].to_string(),
            )
        })
        .collect();

    assert_eq!(
        found,
        vec![
            // org-1: the whitelist only covers children
            ("folder-1", 1, ViolationType::Added, "roles/viewer", "allAuthenticatedUsers".to_string()),
            ("proj-1", 0, ViolationType::Added, "roles/owner", "user:eve@evil.com".to_string()),
            ("proj-1", 1, ViolationType::Added, "roles/viewer", "allUsers".to_string()),
            (
                "proj-1",
                2,
                ViolationType::Removed,
                "roles/iam.securityReviewer",
                "group:security@corp.com".to_string()
            ),
        ]
    );
}

#[tokio::test]
async fn test_failures_skip_or_abort() {
    let fixture = TestFixture::new(IAM_RULES, ".yml");
    let engine = Arc::new(IamRulesEngine::new(&fixture.rules_path()).unwrap());
    let bindings = Arc::new(FlakyBindings {
        inner: iam_policies(),
        broken: "folder-1",
    });
    let targets = fixture.targets(false);

    let lenient = Scanner::new(engine.clone(), fixture.hierarchy.clone(), bindings.clone());
    let report = lenient.scan(&targets).await.unwrap();
    assert_eq!(report.resources_scanned, 3);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].resource_id, "folder-1");
    assert_eq!(report.violations.len(), 3);

    let strict = Scanner::new(engine, fixture.hierarchy.clone(), bindings).with_config(
        ScannerConfig {
            fail_fast: true,
            ..Default::default()
        },
    );
    let err = strict.scan(&targets).await.unwrap_err();
    assert_eq!(err.resource_id, "folder-1");
}

#[tokio::test]
async fn test_bucket_acl_scan() {
    let fixture = TestFixture::new(ACL_RULES, ".json");
    let engine = BucketAclRulesEngine::new(&fixture.rules_path()).unwrap();

    let acls = BucketAclBindings::from_entries(vec![
        BucketAclEntry {
            bucket: "logs".to_string(),
            entity: "project-owners-1234".to_string(),
            email: None,
            domain: None,
            role: "OWNER".to_string(),
        },
        BucketAclEntry {
            bucket: "logs".to_string(),
            entity: "allUsers".to_string(),
            email: None,
            domain: None,
            role: "READER".to_string(),
        },
    ]);

    let scanner = Scanner::new(Arc::new(engine), fixture.hierarchy.clone(), Arc::new(acls));
    let report = scanner
        .scan(&fixture.targets(true))
        .await
        .unwrap();

    assert_eq!(report.engine, "bucket_acl");
    assert_eq!(report.resources_scanned, 1);
    assert_eq!(report.violations.len(), 1);
    assert_eq!(report.violations[0].resource_type, "bucket");
    assert_eq!(report.violations[0].role, "READER");

    let rows = flatten_bucket_acl_violations(&report.violations);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].entity, "allUsers");
    assert_eq!(rows[0].bucket, "logs");
    assert_eq!(rows[0].rule_name, "no world-readable buckets");
}

#[tokio::test]
async fn test_scan_from_config() {
    let fixture = TestFixture::new(IAM_RULES, ".yaml");
    let path = fixture.rules_path();
    let config = ScannerConfig::from_lookup(|key| match key {
        "AUDIT_RULES_PATH" => Some(path.clone()),
        "AUDIT_MAX_VIOLATIONS" => Some("2".to_string()),
        _ => None,
    })
    .unwrap();
    assert_eq!(config.max_violations, NonZeroUsize::new(2));

    let engine = IamRulesEngine::from_config(&config).unwrap();
    let scanner = Scanner::new(Arc::new(engine), fixture.hierarchy.clone(), Arc::new(iam_policies()))
        .with_config(config);
    let report = scanner.scan(&fixture.targets(false)).await.unwrap();

    // folder-1 contributes one violation, proj-1 three more
    assert!(report.truncated);
    assert_eq!(report.violations.len(), 2);
    assert_eq!(report.resources_scanned, 3);

    let zero_cap = ScannerConfig::from_lookup(|key| match key {
        "AUDIT_RULES_PATH" => Some(path.clone()),
        "AUDIT_MAX_VIOLATIONS" => Some("0".to_string()),
        _ => None,
    });
    assert!(zero_cap.is_err());

    assert!(BucketAclRulesEngine::from_config(&ScannerConfig::default()).is_err());
}

#[tokio::test]
async fn test_export_report() {
    let fixture = TestFixture::new(IAM_RULES, ".yaml");
    let engine = IamRulesEngine::new(&fixture.rules_path()).unwrap();

    let mut store = InMemoryBindings::new();
    store.insert("proj-2", Binding::parse("roles/owner", "user:eve@evil.com").unwrap());
    store.insert("proj-2", Binding::parse("roles/owner", "user:mal@evil.com").unwrap());

    let scanner = Scanner::new(Arc::new(engine), fixture.hierarchy.clone(), Arc::new(store));
    let report = scanner
        .scan(&[ScanTarget::new("proj-2", ResourceType::Project)])
        .await
        .unwrap();

    let rows = flatten_violations(&report.violations);
    let mut out = Vec::new();
    assert_eq!(write_json_lines(&rows, &mut out).unwrap(), 2);

    let text = String::from_utf8(out).unwrap();
    let lines: Vec<serde_json::Value> = text
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(lines[0]["member"], "user:eve@evil.com");
    assert_eq!(lines[1]["member"], "user:mal@evil.com");
    assert_eq!(lines[1]["rule_name"], "corp owners only");

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["engine"], "iam_policy");
    assert_eq!(json["violations"].as_array().unwrap().len(), 2);
}
