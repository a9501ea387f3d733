//! Reentrancy: value sent to another account before the function finishes
//! updating its own state.
//!
//! The rule is the classic withdraw bug. A value-transferring call is followed,
//! later in source order, by a write to a state variable, and no reentrancy
//! guard modifier is applied. Only the first offending call per function is
//! reported.

use crate::core::{AuditConfig, Confidence, Detector, Finding, Severity};
use crate::detectors::{concrete_contracts, function_location};
use crate::model::{FunctionKind, SourceUnit};
use anyhow::Result;

pub struct ReentrancyDetector {
    config: AuditConfig,
}

impl ReentrancyDetector {
    pub fn new() -> Self {
        Self::with_config(&AuditConfig::default())
    }

    pub fn with_config(config: &AuditConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }
}

impl Default for ReentrancyDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl Detector for ReentrancyDetector {
    fn id(&self) -> &'static str {
        "reentrancy"
    }

    fn name(&self) -> &'static str {
        "Reentrancy"
    }

    fn description(&self) -> &'static str {
        "Value-transferring external call followed by a state write without a reentrancy guard"
    }

    fn severity(&self) -> Severity {
        Severity::High
    }

    fn confidence(&self) -> Confidence {
        Confidence::Likely
    }

    fn detect(&self, unit: &SourceUnit) -> Result<Vec<Finding>> {
        let mut findings = Vec::new();

        for contract in concrete_contracts(unit) {
            for function in &contract.functions {
                if function.kind == FunctionKind::Constructor
                    || function.applied_modifiers.iter().any(|m| self.config.is_reentrancy_guard(m))
                {
                    continue;
                }

                let offending = function
                    .external_call_sites
                    .iter()
                    .filter(|call| call.transfers_value)
                    .find_map(|call| {
                        function
                            .state_writes
                            .iter()
                            .find(|w| w.statement_index > call.statement_index)
                            .map(|write| (call, write))
                    });

                if let Some((call, write)) = offending {
                    let message = format!(
                        "Function '{}' sends value with {}.{}() at line {} and writes state \
                         variable '{}' afterwards at line {}. A re-entrant call observes the \
                         stale state.",
                        function.name,
                        call.target,
                        call.method,
                        call.line,
                        write.variable_name,
                        write.line
                    );
                    findings.push(
                        Finding::new(
                            self.id(),
                            self.severity(),
                            self.confidence(),
                            function_location(
                                unit,
                                contract,
                                function,
                                call.line,
                                Some(call.statement_index),
                            ),
                            message,
                        )
                        .with_title("Reentrancy: state written after external call"),
                    );
                }
            }
        }

        Ok(findings)
    }
}
