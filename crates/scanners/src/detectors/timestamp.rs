//! Control flow that depends on `block.timestamp` (or its alias `now`).
//!
//! Block producers can skew the timestamp by a few seconds. That matters when
//! the value decides a branch, guards a call or seeds randomness through `%`.
//! Merely recording the time is not reported.

use crate::analysis::patterns;
use crate::core::{Confidence, Finding, Severity};
use crate::detectors::{all_bodies, concrete_contracts, function_location};
use crate::impl_detector;
use crate::model::{SourceUnit, StatementKind};
use anyhow::Result;

pub struct TimestampDetector;

impl TimestampDetector {
    pub fn new() -> Self {
        Self
    }

    fn is_decision(kind: StatementKind, text: &str) -> bool {
        if kind.is_conditional() || patterns::is_guard_text(text) || text.contains('%') {
            return true;
        }
        let without_arrows = text.replace("=>", "");
        without_arrows.contains('<') || without_arrows.contains('>') || patterns::is_comparison(text)
    }

    fn detect_impl(&self, unit: &SourceUnit) -> Result<Vec<Finding>> {
        let mut findings = Vec::new();

        for contract in concrete_contracts(unit) {
            for body in all_bodies(contract) {
                let hit = body.recognized_statements().find(|(_, kind, text, _)| {
                    patterns::references_timestamp(text) && Self::is_decision(*kind, text)
                });

                if let Some((index, _, text, line)) = hit {
                    findings.push(
                        Finding::new(
                            "timestamp",
                            Severity::Low,
                            Confidence::Possible,
                            function_location(unit, contract, body, line, Some(index)),
                            format!(
                                "'{}' makes a decision on the block timestamp: `{}`. Miners \
                                 can shift it by several seconds.",
                                body.name,
                                text.trim()
                            ),
                        )
                        .with_title("Block timestamp dependence"),
                    );
                }
            }
        }

        Ok(findings)
    }
}

impl Default for TimestampDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl_detector!(
    TimestampDetector,
    id: "timestamp",
    name: "Timestamp Dependence",
    severity: Severity::Low,
    confidence: Confidence::Possible
);
