//! Error types for rule construction
//!
//! Rule errors are raised while a rule set is being built. Evaluation of an
//! already-built rule never fails, so nothing here is produced at scan time.

use thiserror::Error;

/// Rule construction error types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RuleError {
    /// Rule source missing or empty, or a definition has an invalid mode,
    /// applies-to value, or a missing required field.
    #[error("Invalid rule definition: {0}")]
    InvalidRuleDefinition(String),

    /// Two rules in the same rule book share an index.
    #[error("Duplicate rule index {index}: `{duplicate}` collides with `{existing}`")]
    DuplicateRuleIndex {
        /// The colliding index.
        index: usize,
        /// Name of the rule already in the book.
        existing: String,
        /// Name of the rule that was rejected.
        duplicate: String,
    },

    /// An IAM member string could not be parsed.
    #[error("Invalid member: {0}")]
    InvalidMember(String),
}

/// Result type for rule operations.
pub type RuleResult<T> = Result<T, RuleError>;

impl RuleError {
    /// Shorthand for an [`RuleError::InvalidRuleDefinition`].
    pub fn invalid(message: impl Into<String>) -> Self {
        RuleError::InvalidRuleDefinition(message.into())
    }

    /// Get a stable error code for reports.
    pub fn error_code(&self) -> &'static str {
        match self {
            RuleError::InvalidRuleDefinition(_) => "INVALID_RULE_DEFINITION",
            RuleError::DuplicateRuleIndex { .. } => "DUPLICATE_RULE_INDEX",
            RuleError::InvalidMember(_) => "INVALID_MEMBER",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(RuleError::invalid("x").error_code(), "INVALID_RULE_DEFINITION");
        assert_eq!(
            RuleError::DuplicateRuleIndex {
                index: 3,
                existing: "a".to_string(),
                duplicate: "b".to_string(),
            }
            .error_code(),
            "DUPLICATE_RULE_INDEX"
        );
        assert_eq!(RuleError::InvalidMember("".to_string()).error_code(), "INVALID_MEMBER");
    }

    #[test]
    fn test_duplicate_index_message_names_both_rules() {
        let err = RuleError::DuplicateRuleIndex {
            index: 7,
            existing: "owners".to_string(),
            duplicate: "editors".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("7"));
        assert!(msg.contains("owners"));
        assert!(msg.contains("editors"));
    }
}
