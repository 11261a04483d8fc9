//! # Bucket ACL scan
//!
//! Audits storage bucket access control lists with the same rule semantics
//! as the IAM scan. Each ACL entry becomes one [`Binding`]: the ACL role
//! (`READER`, `WRITER`, `OWNER`) is the role, and the entity string decides
//! the member type.
//!
//! | Entity                  | member_type             | member_name       |
//! |-------------------------|-------------------------|-------------------|
//! | `user-<email>`          | `user`                  | email             |
//! | `group-<email>`         | `group`                 | email             |
//! | `domain-<domain>`       | `domain`                | domain            |
//! | `project-<team>-<id>`   | `project`               | `<team>-<id>`     |
//! | `allUsers`              | `allUsers`              | (empty)           |
//! | `allAuthenticatedUsers` | `allAuthenticatedUsers` | (empty)           |

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use audit_resources::Resource;
use audit_rules::{Binding, Member, RuleError, RuleResult, WILDCARD};

use crate::config::ScannerConfig;
use crate::definitions::RuleDefinition;
use crate::engine::{RuleSource, RulesEngine};
use crate::error::{EngineResult, ProviderResult};
use crate::providers::BindingsProvider;
use crate::rule_book::RuleBook;

/// Roles a bucket ACL entry can carry.
pub const ACL_ROLES: [&str; 3] = ["READER", "WRITER", "OWNER"];

/// One access control entry on a bucket.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BucketAclEntry {
    /// Bucket name; also the resource id of the bucket.
    pub bucket: String,
    /// Grantee entity, e.g. `user-alice@corp.com` or `allUsers`.
    pub entity: String,
    /// Email of the grantee, when the entity is a user or group.
    #[serde(default)]
    pub email: Option<String>,
    /// Domain of the grantee, when known.
    #[serde(default)]
    pub domain: Option<String>,
    /// `READER`, `WRITER` or `OWNER`.
    pub role: String,
}

impl BucketAclEntry {
    /// The binding this entry grants.
    ///
    /// ```
    /// use audit_engine::bucket_acl::BucketAclEntry;
    ///
    /// let entry = BucketAclEntry {
    ///     bucket: "logs".to_string(),
    ///     entity: "user-alice@corp.com".to_string(),
    ///     email: None,
    ///     domain: None,
    ///     role: "OWNER".to_string(),
    /// };
    /// let binding = entry.to_binding().unwrap();
    /// assert_eq!(binding.role, "OWNER");
    /// assert_eq!(binding.member.member_type, "user");
    /// assert_eq!(binding.member.member_domain, "corp.com");
    /// ```
    pub fn to_binding(&self) -> RuleResult<Binding> {
        Ok(Binding::new(self.role.clone(), self.member()?))
    }

    /// Decode the entity string into a member.
    pub fn member(&self) -> RuleResult<Member> {
        let entity = self.entity.trim();
        if entity == "allUsers" || entity == "allAuthenticatedUsers" {
            return Ok(Member::new(entity, "", ""));
        }

        let (kind, rest) = entity
            .split_once('-')
            .filter(|(_, rest)| !rest.is_empty())
            .ok_or_else(|| {
                RuleError::InvalidMember(format!("`{entity}` is not a bucket ACL entity"))
            })?;

        match kind {
            "user" | "group" => {
                let name = self.email.as_deref().unwrap_or(rest);
                let domain = match self.domain.as_deref() {
                    Some(domain) => domain,
                    None => name.rsplit_once('@').map(|(_, d)| d).unwrap_or(""),
                };
                Ok(Member::new(kind, name, domain))
            }
            "domain" => Ok(Member::new(kind, rest, rest)),
            "project" => Ok(Member::new(kind, rest, self.domain.as_deref().unwrap_or(""))),
            _ => Err(RuleError::InvalidMember(format!(
                "`{entity}` has unknown entity kind `{kind}`"
            ))),
        }
    }
}

/// Render a member back into its ACL entity string, the inverse of
/// [`BucketAclEntry::member`].
///
/// ```
/// use audit_engine::bucket_acl::acl_entity;
/// use audit_rules::Member;
///
/// assert_eq!(acl_entity(&Member::new("user", "a@corp.com", "corp.com")), "user-a@corp.com");
/// assert_eq!(acl_entity(&Member::new("allUsers", "", "")), "allUsers");
/// ```
pub fn acl_entity(member: &Member) -> String {
    if member.member_name.is_empty() {
        member.member_type.clone()
    } else {
        format!("{}-{}", member.member_type, member.member_name)
    }
}

/// ACL entries held in memory, grouped by bucket.
#[derive(Debug, Clone, Default)]
pub struct BucketAclBindings {
    by_bucket: HashMap<String, Vec<BucketAclEntry>>,
}

impl BucketAclBindings {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Group entries by their bucket, keeping entry order.
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = BucketAclEntry>,
    {
        let mut store = Self::new();
        for entry in entries {
            store.insert(entry);
        }
        store
    }

    /// Append one entry.
    pub fn insert(&mut self, entry: BucketAclEntry) {
        self.by_bucket
            .entry(entry.bucket.clone())
            .or_default()
            .push(entry);
    }
}

#[async_trait]
impl BindingsProvider for BucketAclBindings {
    async fn bindings(&self, resource: &Resource) -> ProviderResult<Vec<Binding>> {
        let Some(entries) = self.by_bucket.get(&resource.resource_id) else {
            return Ok(Vec::new());
        };
        Ok(entries
            .iter()
            .map(BucketAclEntry::to_binding)
            .collect::<RuleResult<Vec<_>>>()?)
    }
}

/// Rules engine for bucket ACLs.
///
/// Rule roles are restricted to [`ACL_ROLES`] or `*`.
#[derive(Debug, Clone)]
pub struct BucketAclRulesEngine {
    source: RuleSource,
    rule_book: RuleBook,
}

impl BucketAclRulesEngine {
    /// Load rules from the file at `rules_path`.
    pub fn new(rules_path: &str) -> EngineResult<Self> {
        let source = RuleSource::new(rules_path)?;
        let definitions = source.load()?;
        Self::with_definitions(source, &definitions)
    }

    /// Load rules from the configured `AUDIT_RULES_PATH`.
    pub fn from_config(config: &ScannerConfig) -> EngineResult<Self> {
        Self::new(config.rules_path()?)
    }

    /// Build the engine from definitions already in memory.
    pub fn with_definitions(source: RuleSource, definitions: &[RuleDefinition]) -> EngineResult<Self> {
        let mut engine = Self {
            source,
            rule_book: RuleBook::new(),
        };
        engine.install_rule_book(definitions)?;
        Ok(engine)
    }
}

impl RulesEngine for BucketAclRulesEngine {
    fn kind(&self) -> &'static str {
        "bucket_acl"
    }

    fn rule_source(&self) -> &RuleSource {
        &self.source
    }

    fn build_rule_book(&self, definitions: &[RuleDefinition]) -> RuleResult<RuleBook> {
        let book = RuleBook::from_definitions(definitions)?;
        for rule in book.rules() {
            if let Some(binding) = rule
                .bindings
                .iter()
                .find(|b| b.role != WILDCARD && !ACL_ROLES.contains(&b.role.as_str()))
            {
                return Err(RuleError::invalid(format!(
                    "rule {} (`{}`): `{}` is not a bucket ACL role",
                    rule.index, rule.name, binding.role
                )));
            }
        }
        Ok(book)
    }

    fn rule_book(&self) -> &RuleBook {
        &self.rule_book
    }

    fn set_rule_book(&mut self, book: RuleBook) {
        self.rule_book = book;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigError, RULES_PATH_VAR};
    use crate::definitions::BindingDefinition;
    use crate::error::{EngineError, ProviderError};
    use audit_resources::ResourceType;
    use audit_rules::ViolationType;
    use std::fmt;
    use std::sync::{Arc, Mutex};
    use tracing::field::{Field, Visit};
    use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

    /// Collects the message of every event.
    #[derive(Clone, Default)]
    struct Messages(Arc<Mutex<Vec<String>>>);

    impl Messages {
        fn contains(&self, text: &str) -> bool {
            self.0.lock().unwrap().iter().any(|m| m.contains(text))
        }
    }

    struct MessageVisitor(Option<String>);

    impl Visit for MessageVisitor {
        fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
            if field.name() == "message" {
                self.0 = Some(format!("{value:?}"));
            }
        }
    }

    impl<S: tracing::Subscriber> Layer<S> for Messages {
        fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
            let mut visitor = MessageVisitor(None);
            event.record(&mut visitor);
            if let Some(message) = visitor.0 {
                self.0.lock().unwrap().push(message);
            }
        }
    }

    fn rule_file(contents: &str) -> tempfile::NamedTempFile {
        let file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        std::fs::write(file.path(), contents).unwrap();
        file
    }

    const READERS_RULE: &str = r#"{"rules": [{
        "name": "no public readers",
        "mode": "blacklist",
        "applies_to": "children",
        "resource_id": "proj-1",
        "bindings": [{"role": "READER", "members": ["allUsers"]}]
    }]}"#;

    fn entry(entity: &str, role: &str) -> BucketAclEntry {
        BucketAclEntry {
            bucket: "logs".to_string(),
            entity: entity.to_string(),
            email: None,
            domain: None,
            role: role.to_string(),
        }
    }

    fn definition(role: &str, members: &[&str]) -> RuleDefinition {
        RuleDefinition {
            name: Some("no public buckets".to_string()),
            mode: Some("blacklist".to_string()),
            applies_to: Some("children".to_string()),
            scope_resource_id: Some("proj-1".to_string()),
            bindings: vec![BindingDefinition {
                role: Some(role.to_string()),
                members: members.iter().map(|m| m.to_string()).collect(),
                ..Default::default()
            }],
        }
    }

    #[test]
    fn test_entity_decoding() {
        assert_eq!(
            entry("user-alice@corp.com", "READER").member().unwrap(),
            Member::new("user", "alice@corp.com", "corp.com")
        );
        assert_eq!(
            entry("group-ops@corp.com", "READER").member().unwrap(),
            Member::new("group", "ops@corp.com", "corp.com")
        );
        assert_eq!(
            entry("domain-corp.com", "READER").member().unwrap(),
            Member::new("domain", "corp.com", "corp.com")
        );
        assert_eq!(
            entry("project-owners-1234", "OWNER").member().unwrap(),
            Member::new("project", "owners-1234", "")
        );
        assert_eq!(
            entry("allUsers", "READER").member().unwrap(),
            Member::new("allUsers", "", "")
        );
    }

    #[test]
    fn test_entity_email_and_domain_fields_win() {
        let mut e = entry("user-00b4903a97", "WRITER");
        e.email = Some("bob@corp.com".to_string());
        e.domain = Some("corp.com".to_string());
        assert_eq!(e.member().unwrap(), Member::new("user", "bob@corp.com", "corp.com"));
    }

    #[test]
    fn test_bad_entities() {
        assert!(entry("robot-r2d2", "READER").member().is_err());
        assert!(entry("user-", "READER").member().is_err());
        assert!(entry("nobody", "READER").member().is_err());
    }

    #[test]
    fn test_rejects_non_acl_roles() {
        let err = BucketAclRulesEngine::with_definitions(
            RuleSource::new("inline").unwrap(),
            &[definition("roles/owner", &["allUsers"])],
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::Rule(RuleError::InvalidRuleDefinition(_))));

        assert!(BucketAclRulesEngine::with_definitions(
            RuleSource::new("inline").unwrap(),
            &[definition("*", &["allUsers"])],
        )
        .is_ok());
    }

    #[test]
    fn test_rejected_book_is_not_logged_as_accepted() {
        let messages = Messages::default();
        let subscriber = tracing_subscriber::registry().with(messages.clone());

        tracing::subscriber::with_default(subscriber, || {
            let result = BucketAclRulesEngine::with_definitions(
                RuleSource::new("inline").unwrap(),
                &[definition("roles/owner", &["allUsers"])],
            );
            assert!(result.is_err());
        });
        assert!(!messages.contains("Accepted rule book"));

        let subscriber = tracing_subscriber::registry().with(messages.clone());
        tracing::subscriber::with_default(subscriber, || {
            BucketAclRulesEngine::with_definitions(
                RuleSource::new("inline").unwrap(),
                &[definition("READER", &["allUsers"])],
            )
            .unwrap();
        });
        assert!(messages.contains("Accepted rule book"));
    }

    #[test]
    fn test_reload_validates_roles() {
        let file = rule_file(READERS_RULE);
        let mut engine = BucketAclRulesEngine::new(file.path().to_str().unwrap()).unwrap();
        assert_eq!(engine.rule_book().len(), 1);

        std::fs::write(file.path(), READERS_RULE.replace("READER", "roles/viewer")).unwrap();
        let err = engine.reload().unwrap_err();
        assert!(err.to_string().contains("not a bucket ACL role"));
        assert_eq!(engine.rule_book().rules()[0].bindings[0].role, "READER");

        let two = READERS_RULE.replace(
            "}]}",
            r#"}, {"name": "owners", "mode": "required", "resource_id": "proj-1",
                "bindings": [{"role": "OWNER", "members": ["project:owners-1234"]}]}]}"#,
        );
        std::fs::write(file.path(), two).unwrap();
        engine.reload().unwrap();
        assert_eq!(engine.rule_book().len(), 2);
    }

    #[test]
    fn test_from_config() {
        let file = rule_file(READERS_RULE);
        let path = format!(" {} ", file.path().display());
        let config = ScannerConfig::from_lookup(|key| (key == RULES_PATH_VAR).then(|| path.clone()))
            .unwrap();
        let engine = BucketAclRulesEngine::from_config(&config).unwrap();
        assert_eq!(engine.rule_source().path(), file.path());

        let err = BucketAclRulesEngine::from_config(&ScannerConfig::default()).unwrap_err();
        assert!(matches!(err, EngineError::Config(ConfigError::MissingEnvVar(_))));
    }

    #[test]
    fn test_acl_entity_round_trip() {
        for entity in [
            "user-alice@corp.com",
            "group-ops@corp.com",
            "domain-corp.com",
            "project-owners-1234",
            "allUsers",
            "allAuthenticatedUsers",
        ] {
            assert_eq!(acl_entity(&entry(entity, "READER").member().unwrap()), entity);
        }
    }

    #[tokio::test]
    async fn test_public_bucket_flagged() {
        let engine = BucketAclRulesEngine::with_definitions(
            RuleSource::new("inline").unwrap(),
            &[definition("READER", &["allUsers", "allAuthenticatedUsers"])],
        )
        .unwrap();
        assert_eq!(engine.kind(), "bucket_acl");

        let store = BucketAclBindings::from_entries(vec![
            entry("project-owners-1234", "OWNER"),
            entry("allUsers", "READER"),
            entry("user-alice@corp.com", "READER"),
        ]);
        let bucket = Resource::new("logs", ResourceType::Bucket).with_ancestry(vec![
            "proj-1".to_string(),
            "org-1".to_string(),
        ]);

        let bindings = store.bindings(&bucket).await.unwrap();
        assert_eq!(bindings.len(), 3);

        let violations: Vec<_> = engine.find_violations(&bucket, &bindings).collect();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].resource_type, "bucket");
        assert_eq!(violations[0].violation_type, ViolationType::Added);
        assert_eq!(violations[0].members[0].member_type, "allUsers");
    }

    #[tokio::test]
    async fn test_bad_entry_is_invalid_data() {
        let store = BucketAclBindings::from_entries(vec![entry("robot-r2d2", "READER")]);
        let bucket = Resource::new("logs", ResourceType::Bucket);
        assert!(matches!(
            store.bindings(&bucket).await,
            Err(ProviderError::InvalidData(_))
        ));

        let empty = Resource::new("other", ResourceType::Bucket);
        assert!(store.bindings(&empty).await.unwrap().is_empty());
    }
}
