//! Authorization through `tx.origin`.

use crate::core::{Confidence, Finding, Severity};
use crate::detectors::{all_bodies, concrete_contracts, function_location};
use crate::impl_detector;
use crate::model::{AuthGuardKind, SourceUnit};
use anyhow::Result;

pub struct TxOriginDetector;

impl TxOriginDetector {
    pub fn new() -> Self {
        Self
    }

    fn detect_impl(&self, unit: &SourceUnit) -> Result<Vec<Finding>> {
        let mut findings = Vec::new();

        for contract in concrete_contracts(unit) {
            for body in all_bodies(contract) {
                // Applied modifiers show up as `Modifier` guards, so a tx.origin
                // modifier is reported once, at its declaration.
                let Some(guard) = body
                    .auth_guards
                    .iter()
                    .find(|g| g.kind == AuthGuardKind::TxOriginCheck)
                else {
                    continue;
                };

                findings.push(
                    Finding::new(
                        "tx_origin",
                        Severity::Medium,
                        Confidence::Confirmed,
                        function_location(unit, contract, body, guard.line, guard.statement_index),
                        format!(
                            "'{}' authorizes callers with tx.origin. Any contract the owner \
                             interacts with can pass this check; compare msg.sender instead.",
                            body.name
                        ),
                    )
                    .with_title("Authorization through tx.origin"),
                );
            }
        }

        Ok(findings)
    }
}

impl Default for TxOriginDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl_detector!(
    TxOriginDetector,
    id: "tx_origin",
    name: "tx.origin Authorization",
    severity: Severity::Medium,
    confidence: Confidence::Confirmed,
    description: "Caller authorization that compares against tx.origin"
);
