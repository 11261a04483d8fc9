//! # Members
//!
//! Identities that hold roles on resources, and the matching rules used to
//! compare a declared identity pattern against a concrete grant.
//!
//! The same [`Member`] shape is used for both sides: an actual grantee
//! observed on a resource, and a pattern declared in a rule where any field
//! may be the wildcard `*`.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{RuleError, RuleResult};

/// Wildcard value matching any role or member field.
pub const WILDCARD: &str = "*";

/// Member types whose IAM string carries no name (`allUsers`).
const NAMELESS_TYPES: [&str; 2] = ["allUsers", "allAuthenticatedUsers"];

/// An access-grant identity: `(member_type, member_name, member_domain)`.
///
/// When used as a pattern, each field is either a literal or [`WILDCARD`].
///
/// # Example
///
/// ```
/// use audit_rules::members::Member;
///
/// let pattern = Member::new("user", "*", "example.com");
/// let alice = Member::parse("user:alice@example.com").unwrap();
/// let mallory = Member::parse("user:mallory@evil.com").unwrap();
///
/// assert!(pattern.matches(&alice));
/// assert!(!pattern.matches(&mallory));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Member {
    /// Member kind, e.g. `user`, `group`, `serviceAccount`, `domain`.
    pub member_type: String,
    /// Full member name, usually an email address.
    pub member_name: String,
    /// Domain the member belongs to.
    pub member_domain: String,
}

impl Member {
    /// Create a member from its three fields.
    pub fn new(
        member_type: impl Into<String>,
        member_name: impl Into<String>,
        member_domain: impl Into<String>,
    ) -> Self {
        Self {
            member_type: member_type.into(),
            member_name: member_name.into(),
            member_domain: member_domain.into(),
        }
    }

    /// Pattern `(*, *, *)` that matches every identity.
    pub fn any() -> Self {
        Self::new(WILDCARD, WILDCARD, WILDCARD)
    }

    /// Parse an IAM member string such as `user:alice@example.com`.
    ///
    /// - The type is everything before the first `:`.
    /// - The domain is taken from the part after `@` in the name, or is the
    ///   name itself for `domain:` members.
    /// - `allUsers` and `allAuthenticatedUsers` have an empty name and domain.
    /// - A name of `*` makes both name and domain wildcards, and `*@corp.com`
    ///   is shorthand for any name within `corp.com`.
    ///
    /// # Example
    ///
    /// ```
    /// use audit_rules::members::Member;
    ///
    /// let m = Member::parse("group:admins@corp.com").unwrap();
    /// assert_eq!(m.member_type, "group");
    /// assert_eq!(m.member_name, "admins@corp.com");
    /// assert_eq!(m.member_domain, "corp.com");
    ///
    /// let any_user = Member::parse("user:*@corp.com").unwrap();
    /// assert_eq!(any_user, Member::new("user", "*", "corp.com"));
    ///
    /// assert!(Member::parse("").is_err());
    /// ```
    pub fn parse(s: &str) -> RuleResult<Self> {
        let s = s.trim();
        let (member_type, name) = match s.split_once(':') {
            Some((t, n)) => (t, n),
            None => (s, ""),
        };

        if member_type.is_empty() {
            return Err(RuleError::InvalidMember(format!(
                "`{s}` has no member type"
            )));
        }

        if name.is_empty() {
            if NAMELESS_TYPES.contains(&member_type) || member_type == WILDCARD {
                let fill = if member_type == WILDCARD { WILDCARD } else { "" };
                return Ok(Self::new(member_type, fill, fill));
            }
            return Err(RuleError::InvalidMember(format!("`{s}` has no member name")));
        }

        if name == WILDCARD {
            return Ok(Self::new(member_type, WILDCARD, WILDCARD));
        }

        if let Some(domain) = name.strip_prefix("*@") {
            return Ok(Self::new(member_type, WILDCARD, domain));
        }

        let domain = if member_type == "domain" {
            name
        } else {
            name.rsplit_once('@').map(|(_, d)| d).unwrap_or("")
        };

        Ok(Self::new(member_type, name, domain))
    }

    /// Check whether this member, read as a pattern, matches an actual member.
    ///
    /// All three fields must match. A `*` field matches any value, including
    /// the empty string; otherwise comparison is exact and case-sensitive.
    pub fn matches(&self, actual: &Member) -> bool {
        field_matches(&self.member_type, &actual.member_type)
            && field_matches(&self.member_name, &actual.member_name)
            && field_matches(&self.member_domain, &actual.member_domain)
    }

    /// Check if any field of this member is a wildcard.
    pub fn is_pattern(&self) -> bool {
        self.member_type == WILDCARD || self.member_name == WILDCARD || self.member_domain == WILDCARD
    }
}

impl fmt::Display for Member {
    /// Renders `type:name`, or just `type` for nameless members.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.member_name.is_empty() {
            write!(f, "{}", self.member_type)
        } else {
            write!(f, "{}:{}", self.member_type, self.member_name)
        }
    }
}

/// Check whether a role pattern matches an actual role.
///
/// ```
/// use audit_rules::members::role_matches;
///
/// assert!(role_matches("*", "roles/owner"));
/// assert!(role_matches("roles/owner", "roles/owner"));
/// assert!(!role_matches("roles/owner", "roles/Owner"));
/// ```
pub fn role_matches(pattern: &str, actual: &str) -> bool {
    field_matches(pattern, actual)
}

fn field_matches(pattern: &str, actual: &str) -> bool {
    pattern == WILDCARD || pattern == actual
}

/// One concrete access grant observed on a resource.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Binding {
    /// Role granted, e.g. `roles/owner`.
    pub role: String,
    /// The grantee.
    pub member: Member,
}

impl Binding {
    /// Create a binding from a role and a member.
    pub fn new(role: impl Into<String>, member: Member) -> Self {
        Self {
            role: role.into(),
            member,
        }
    }

    /// Create a binding from a role and an IAM member string.
    ///
    /// # Example
    ///
    /// ```
    /// use audit_rules::members::Binding;
    ///
    /// let b = Binding::parse("roles/viewer", "serviceAccount:ci@proj.iam.gserviceaccount.com").unwrap();
    /// assert_eq!(b.member.member_domain, "proj.iam.gserviceaccount.com");
    /// ```
    pub fn parse(role: impl Into<String>, member: &str) -> RuleResult<Self> {
        Ok(Self::new(role, Member::parse(member)?))
    }
}
