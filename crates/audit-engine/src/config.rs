//! Scanner configuration.
//!
//! Loaded from environment variables. Everything has a default except the
//! rule file path, which [`ScannerConfig::validate`] requires.

use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use thiserror::Error;

/// Env var naming the rule definition file.
pub const RULES_PATH_VAR: &str = "AUDIT_RULES_PATH";
/// Env var enabling fail-fast scans.
pub const FAIL_FAST_VAR: &str = "AUDIT_FAIL_FAST";
/// Env var capping violations kept in one report.
pub const MAX_VIOLATIONS_VAR: &str = "AUDIT_MAX_VIOLATIONS";

/// Configuration errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Missing required environment variable.
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    /// Invalid configuration value.
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue {
        /// Configuration key.
        key: String,
        /// Error message.
        message: String,
    },
}

/// How a scan run behaves.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScannerConfig {
    /// Rule definition file.
    pub rules_path: Option<String>,

    /// Abort the scan on the first collaborator failure instead of logging
    /// and skipping the resource.
    pub fail_fast: bool,

    /// Stop collecting violations once this many have been kept.
    pub max_violations: Option<NonZeroUsize>,
}

impl ScannerConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `AUDIT_RULES_PATH`: rule definition file (no default)
    /// - `AUDIT_FAIL_FAST`: `true`/`1` to abort on first failure (default: false)
    /// - `AUDIT_MAX_VIOLATIONS`: cap on reported violations, at least 1 (default: unlimited)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let default = Self::default();

        let rules_path = lookup(RULES_PATH_VAR)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        let fail_fast = match lookup(FAIL_FAST_VAR) {
            Some(raw) => parse_bool(FAIL_FAST_VAR, &raw)?,
            None => default.fail_fast,
        };

        let max_violations = match lookup(MAX_VIOLATIONS_VAR) {
            Some(raw) => Some(raw.trim().parse::<NonZeroUsize>().map_err(|e| {
                ConfigError::InvalidValue {
                    key: MAX_VIOLATIONS_VAR.to_string(),
                    message: e.to_string(),
                }
            })?),
            None => default.max_violations,
        };

        Ok(Self {
            rules_path,
            fail_fast,
            max_violations,
        })
    }

    /// The configured rule file, failing with `MissingEnvVar` when unset or
    /// blank.
    pub fn rules_path(&self) -> Result<&str, ConfigError> {
        self.rules_path
            .as_deref()
            .map(str::trim)
            .filter(|path| !path.is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar(RULES_PATH_VAR.to_string()))
    }

    /// Validate that the configuration can drive a scan.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.rules_path()?;
        Ok(())
    }
}

fn parse_bool(key: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" | "" => Ok(false),
        other => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("expected a boolean, got `{other}`"),
        }),
    }
}
