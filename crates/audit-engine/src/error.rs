//! Error types for the audit engine
//!
//! Rule-definition problems surface as [`EngineError`] at load time.
//! Collaborator failures surface as [`ProviderError`], and the scan driver
//! attaches the offending resource id via [`ScanError`].

use audit_resources::HierarchyError;
use audit_rules::RuleError;
use thiserror::Error;

use crate::config::ConfigError;

/// Engine construction and rule loading errors.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Rule definition invalid or duplicate index
    #[error(transparent)]
    Rule(#[from] RuleError),

    /// Rule file could not be read
    #[error("Failed to read rule file `{path}`: {source}")]
    Io {
        /// File path.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Rule file could not be parsed
    #[error("Failed to parse rule file `{path}`: {message}")]
    Parse {
        /// File path.
        path: String,
        /// Parser message.
        message: String,
    },

    /// Rule file extension not recognized
    #[error("Unsupported rule file format: {0}")]
    UnsupportedFormat(String),

    /// Configuration cannot build an engine
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

impl EngineError {
    /// Get error code for reports.
    pub fn error_code(&self) -> &'static str {
        match self {
            EngineError::Rule(e) => e.error_code(),
            EngineError::Io { .. } => "RULE_FILE_IO",
            EngineError::Parse { .. } => "RULE_FILE_PARSE",
            EngineError::UnsupportedFormat(_) => "UNSUPPORTED_FORMAT",
            EngineError::Config(_) => "CONFIG",
        }
    }
}

/// Failures reported by ancestry and bindings collaborators.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// Resource unknown to the collaborator
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Collaborator could not be reached or timed out
    #[error("Provider unavailable: {0}")]
    Unavailable(String),

    /// Collaborator returned data that could not be interpreted
    #[error("Invalid provider data: {0}")]
    InvalidData(String),
}

/// Result type for collaborator calls.
pub type ProviderResult<T> = Result<T, ProviderError>;

impl From<HierarchyError> for ProviderError {
    fn from(err: HierarchyError) -> Self {
        match err {
            HierarchyError::UnknownResource(id) => ProviderError::NotFound(id),
            other => ProviderError::InvalidData(other.to_string()),
        }
    }
}

impl From<RuleError> for ProviderError {
    fn from(err: RuleError) -> Self {
        ProviderError::InvalidData(err.to_string())
    }
}

/// A collaborator failure while scanning one resource.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Scan of `{resource_id}` failed: {source}")]
pub struct ScanError {
    /// The resource whose evaluation was aborted.
    pub resource_id: String,
    /// What the collaborator reported.
    #[source]
    pub source: ProviderError,
}

impl ScanError {
    /// Attach a resource id to a collaborator error.
    pub fn new(resource_id: impl Into<String>, source: ProviderError) -> Self {
        Self {
            resource_id: resource_id.into(),
            source,
        }
    }
}
