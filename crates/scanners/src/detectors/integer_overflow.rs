//! Integer overflow and underflow on compilers without checked arithmetic.
//!
//! Solidity 0.8.0 made `+`, `-` and `*` revert on wrap-around, so on those
//! versions this detector reports nothing. A missing or unreadable pragma is
//! treated as an old compiler.

use crate::analysis::patterns;
use crate::core::{Confidence, Finding, Severity};
use crate::detectors::{concrete_contracts, function_location};
use crate::impl_detector;
use crate::model::{ArithmeticOperator, SourceUnit};
use anyhow::Result;

pub struct IntegerOverflowDetector;

impl IntegerOverflowDetector {
    pub fn new() -> Self {
        Self
    }

    fn detect_impl(&self, unit: &SourceUnit) -> Result<Vec<Finding>> {
        if unit
            .version
            .map(|v| v.has_builtin_overflow_protection())
            .unwrap_or(false)
        {
            return Ok(Vec::new());
        }

        let mut findings = Vec::new();

        // The library implementing the checks is exempt from its own rule.
        for contract in concrete_contracts(unit).filter(|c| !c.name.contains("SafeMath")) {
            for function in &contract.functions {
                let candidate = function.arithmetic_ops.iter().find(|op| {
                    if op.within_unchecked_block || op.operator == ArithmeticOperator::Div {
                        return false;
                    }
                    let statement = function.statement_text(op.statement_index);
                    !patterns::uses_safe_math(statement) && !patterns::is_guard_text(statement)
                });

                if let Some(op) = candidate {
                    let version = unit
                        .version
                        .map(|v| v.to_string())
                        .unwrap_or_else(|| "an undeclared compiler version".to_string());
                    findings.push(
                        Finding::new(
                            "integer_overflow",
                            Severity::High,
                            Confidence::Possible,
                            function_location(
                                unit,
                                contract,
                                function,
                                op.line,
                                Some(op.statement_index),
                            ),
                            format!(
                                "Unchecked '{}' in '{}' can wrap around on {} (no built-in \
                                 overflow checks before 0.8.0).",
                                op.operands_text, function.name, version
                            ),
                        )
                        .with_title("Integer overflow or underflow"),
                    );
                }
            }
        }

        Ok(findings)
    }
}

impl Default for IntegerOverflowDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl_detector!(
    IntegerOverflowDetector,
    id: "integer_overflow",
    name: "Integer Overflow",
    severity: Severity::High,
    confidence: Confidence::Possible,
    description: "Arithmetic that can wrap around on compilers older than 0.8.0"
);
