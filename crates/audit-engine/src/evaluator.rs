//! Binding evaluator
//!
//! Compares a resource's actual bindings against one rule and reports the
//! differences. Output order follows the rule's bindings first, then the
//! actual bindings (whitelist/blacklist) or declared members (required).
//! Nothing is deduplicated.

use audit_resources::Resource;
use audit_rules::{role_matches, Binding, Member, Rule, RuleBinding, RuleMode, RuleViolation, ViolationType};

/// Violation type reported for each rule mode.
pub fn violation_type_for(mode: RuleMode) -> ViolationType {
    match mode {
        RuleMode::Whitelist | RuleMode::Blacklist => ViolationType::Added,
        RuleMode::Required => ViolationType::Removed,
    }
}

/// Evaluate one rule against the actual bindings of one resource.
///
/// # Example
///
/// ```
/// use audit_engine::evaluator::evaluate;
/// use audit_resources::{Resource, ResourceType};
/// use audit_rules::{Binding, Member, Rule, RuleAppliesTo, RuleBinding, RuleMode, ViolationType};
///
/// let rule = Rule::new(
///     "R0",
///     0,
///     vec![RuleBinding::new("owner", vec![Member::new("USER", "alice@x.com", "*")])],
///     RuleMode::Whitelist,
///     RuleAppliesTo::SelfOnly,
///     "proj-1",
/// )
/// .unwrap();
/// let project = Resource::new("proj-1", ResourceType::Project);
/// let actual = vec![
///     Binding::new("owner", Member::new("USER", "alice@x.com", "x.com")),
///     Binding::new("owner", Member::new("USER", "bob@x.com", "x.com")),
/// ];
///
/// let violations = evaluate(&rule, &project, &actual);
/// assert_eq!(violations.len(), 1);
/// assert_eq!(violations[0].violation_type, ViolationType::Added);
/// assert_eq!(violations[0].members[0].member_name, "bob@x.com");
/// ```
pub fn evaluate(rule: &Rule, resource: &Resource, bindings: &[Binding]) -> Vec<RuleViolation> {
    let mut violations = Vec::new();

    for rule_binding in &rule.bindings {
        match rule.mode {
            RuleMode::Whitelist => {
                for actual in matching_role(rule_binding, bindings) {
                    if !is_listed(rule_binding, &actual.member) {
                        violations.push(violation(rule, resource, &actual.role, actual.member.clone()));
                    }
                }
            }
            RuleMode::Blacklist => {
                for actual in matching_role(rule_binding, bindings) {
                    if is_listed(rule_binding, &actual.member) {
                        violations.push(violation(rule, resource, &actual.role, actual.member.clone()));
                    }
                }
            }
            RuleMode::Required => {
                for required in &rule_binding.members {
                    let present = matching_role(rule_binding, bindings)
                        .any(|actual| required.matches(&actual.member));
                    if !present {
                        violations.push(violation(rule, resource, &rule_binding.role, required.clone()));
                    }
                }
            }
        }
    }

    violations
}

fn matching_role<'a>(
    rule_binding: &'a RuleBinding,
    bindings: &'a [Binding],
) -> impl Iterator<Item = &'a Binding> + 'a {
    bindings
        .iter()
        .filter(move |b| role_matches(&rule_binding.role, &b.role))
}

fn is_listed(rule_binding: &RuleBinding, member: &Member) -> bool {
    rule_binding.members.iter().any(|pattern| pattern.matches(member))
}

fn violation(rule: &Rule, resource: &Resource, role: &str, member: Member) -> RuleViolation {
    RuleViolation {
        resource_type: resource.resource_type.as_str().to_string(),
        resource_id: resource.resource_id.clone(),
        rule_name: rule.name.clone(),
        rule_index: rule.index,
        violation_type: violation_type_for(rule.mode),
        role: role.to_string(),
        members: vec![member],
    }
}
