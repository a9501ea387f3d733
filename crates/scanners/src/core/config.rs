//! Audit configuration.
//!
//! Every field has a default so a config file only needs to name what it
//! changes. Name lists are matched case-insensitively by the detectors.

use crate::core::Severity;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AuditConfig {
    pub reentrancy_guards: Vec<String>,

    pub auth_modifiers: Vec<String>,

    pub sensitive_function_names: Vec<String>,

    pub sensitive_state_names: Vec<String>,

    pub disabled_detectors: Vec<String>,

    pub parallel: bool,

    pub file_extensions: Vec<String>,

    pub external: Option<ExternalToolConfig>,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            reentrancy_guards: vec!["nonReentrant".to_string()],
            auth_modifiers: ["onlyOwner", "onlyAdmin", "onlyRole", "adminOnly", "restricted"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            sensitive_function_names: ["mint", "withdraw", "setowner", "transfer"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            sensitive_state_names: vec!["owner".to_string(), "admin".to_string()],
            disabled_detectors: Vec::new(),
            parallel: true,
            file_extensions: vec!["sol".to_string()],
            external: None,
        }
    }
}

impl AuditConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Self = serde_json::from_str(&text)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        debug!("Loaded audit config from {}", path.display());
        Ok(config)
    }

    pub fn is_detector_enabled(&self, id: &str) -> bool {
        !self.disabled_detectors.iter().any(|d| d == id)
    }

    pub fn is_reentrancy_guard(&self, modifier: &str) -> bool {
        self.reentrancy_guards
            .iter()
            .any(|g| g.eq_ignore_ascii_case(modifier))
    }

    /// Configured authorization modifier, or anything following the `only*` convention.
    pub fn is_auth_modifier(&self, modifier: &str) -> bool {
        modifier.starts_with("only")
            || self
                .auth_modifiers
                .iter()
                .any(|m| m.eq_ignore_ascii_case(modifier))
    }

    pub fn is_sensitive_function(&self, name: &str) -> bool {
        let lower = name.to_ascii_lowercase();
        self.sensitive_function_names
            .iter()
            .any(|s| lower.contains(&s.to_ascii_lowercase()))
    }

    pub fn is_sensitive_state(&self, name: &str) -> bool {
        let lower = name.to_ascii_lowercase();
        self.sensitive_state_names
            .iter()
            .any(|s| lower.contains(&s.to_ascii_lowercase()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ExternalOutputFormat {
    /// One JSON object per line, already in the `ExternalFinding` shape.
    #[default]
    JsonLines,
    /// The document written by `slither --json -`.
    SlitherJson,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ExternalToolConfig {
    pub program: String,

    pub args: Vec<String>,

    pub timeout_secs: u64,

    pub format: ExternalOutputFormat,

    pub success_exit_codes: Vec<i32>,

    pub rule_map: Vec<RuleMapping>,
}

impl Default for ExternalToolConfig {
    fn default() -> Self {
        Self {
            program: "slither".to_string(),
            args: Vec::new(),
            timeout_secs: 120,
            format: ExternalOutputFormat::JsonLines,
            success_exit_codes: vec![0],
            rule_map: Vec::new(),
        }
    }
}

impl ExternalToolConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// One row of the external-to-internal rule table.
///
/// `severity` overrides the tool's own rating when set.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RuleMapping {
    pub external_id: String,

    pub rule_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<Severity>,
}

impl RuleMapping {
    pub fn new(external_id: &str, rule_id: &str, severity: Option<Severity>) -> Self {
        Self {
            external_id: external_id.to_string(),
            rule_id: rule_id.to_string(),
            severity,
        }
    }
}
