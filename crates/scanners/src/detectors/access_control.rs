//! Missing access control on privileged entry points.
//!
//! A public or external function is privileged when its name looks like a
//! privileged operation (`mint`, `withdraw`, `setOwner`, `transfer`) or when
//! it writes a sensitive state variable such as `owner`. Such a function is
//! flagged when its body checks nothing about `msg.sender` and none of its
//! modifiers follows an authorization naming convention.

use crate::core::{AuditConfig, Confidence, Detector, Finding, Severity};
use crate::detectors::{concrete_contracts, function_location};
use crate::model::{ContractKind, FunctionDef, FunctionKind, SourceUnit};
use anyhow::Result;

pub struct AccessControlDetector {
    config: AuditConfig,
}

impl AccessControlDetector {
    pub fn new() -> Self {
        Self::with_config(&AuditConfig::default())
    }

    pub fn with_config(config: &AuditConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// Why the function counts as privileged, if it does.
    fn privilege_reason(&self, function: &FunctionDef) -> Option<String> {
        if self.config.is_sensitive_function(&function.name) {
            return Some(format!("its name '{}' marks a privileged operation", function.name));
        }
        function
            .state_writes
            .iter()
            .find(|w| self.config.is_sensitive_state(&w.variable_name))
            .map(|w| format!("it writes the sensitive state variable '{}'", w.variable_name))
    }

    fn is_protected(&self, function: &FunctionDef) -> bool {
        !function.auth_guards.is_empty()
            || function
                .applied_modifiers
                .iter()
                .any(|m| self.config.is_auth_modifier(m))
    }
}

impl Default for AccessControlDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl Detector for AccessControlDetector {
    fn id(&self) -> &'static str {
        "access_control"
    }

    fn name(&self) -> &'static str {
        "Missing Access Control"
    }

    fn description(&self) -> &'static str {
        "Privileged public function without an authorization check or modifier"
    }

    fn severity(&self) -> Severity {
        Severity::High
    }

    fn confidence(&self) -> Confidence {
        Confidence::Likely
    }

    fn detect(&self, unit: &SourceUnit) -> Result<Vec<Finding>> {
        let mut findings = Vec::new();

        for contract in concrete_contracts(unit).filter(|c| c.kind != ContractKind::Library) {
            for function in &contract.functions {
                if function.kind != FunctionKind::Function
                    || !function.is_entry_point()
                    || function.is_read_only()
                    || self.is_protected(function)
                {
                    continue;
                }

                let Some(reason) = self.privilege_reason(function) else {
                    continue;
                };

                findings.push(
                    Finding::new(
                        self.id(),
                        self.severity(),
                        self.confidence(),
                        function_location(unit, contract, function, function.line, None)
                            .with_end_line(function.end_line),
                        format!(
                            "Function '{}' can be called by anyone although {}. No msg.sender \
                             check or authorization modifier was found.",
                            function.name, reason
                        ),
                    )
                    .with_title("Missing access control"),
                );
            }
        }

        Ok(findings)
    }
}
