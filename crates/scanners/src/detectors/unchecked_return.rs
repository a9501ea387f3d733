//! Success flags of low-level calls and token transfers that nobody checks.
//!
//! `call`, `delegatecall`, `staticcall` and `send` report failure through
//! their first return value instead of reverting, and so do many ERC-20
//! tokens for `transfer(to, amount)` and `transferFrom`. The flag counts as
//! checked when the call sits inside a `require`/`assert`, a condition or a
//! `return`, or when the variable it is bound to appears in a later one.

use crate::analysis::patterns;
use crate::core::{Confidence, Detector, Finding, Severity};
use crate::detectors::{concrete_contracts, function_location};
use crate::model::{CallSite, FunctionDef, ReturnUse, SourceUnit, StatementKind};
use anyhow::Result;

pub struct UncheckedReturnDetector;

impl UncheckedReturnDetector {
    pub fn new() -> Self {
        Self
    }

    fn is_unchecked(function: &FunctionDef, call: &CallSite) -> bool {
        match &call.return_use {
            ReturnUse::Checked => false,
            ReturnUse::Ignored => true,
            ReturnUse::Bound(variable) => !function
                .recognized_statements()
                .filter(|(index, _, _, _)| *index > call.statement_index)
                .any(|(_, kind, text, _)| {
                    let consuming = kind.is_conditional()
                        || kind == StatementKind::Return
                        || patterns::is_guard_text(text);
                    consuming && patterns::contains_word(text, variable)
                }),
        }
    }
}

impl Default for UncheckedReturnDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl Detector for UncheckedReturnDetector {
    fn id(&self) -> &'static str {
        "unchecked_return"
    }

    fn name(&self) -> &'static str {
        "Unchecked Return Value"
    }

    fn description(&self) -> &'static str {
        "Low-level call or token transfer whose success flag is never checked"
    }

    fn severity(&self) -> Severity {
        Severity::Medium
    }

    fn confidence(&self) -> Confidence {
        Confidence::Likely
    }

    fn detect(&self, unit: &SourceUnit) -> Result<Vec<Finding>> {
        let mut findings = Vec::new();

        for contract in concrete_contracts(unit) {
            for function in &contract.functions {
                let unchecked = function
                    .external_call_sites
                    .iter()
                    .filter(|call| call.is_low_level() || call.is_token_call())
                    .find(|call| Self::is_unchecked(function, call));

                if let Some(call) = unchecked {
                    let how = match &call.return_use {
                        ReturnUse::Bound(variable) => {
                            format!("is stored in '{}' but never checked", variable)
                        }
                        _ => "is discarded".to_string(),
                    };
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
                            format!(
                                "The result of {}.{}() in '{}' {}. A failed call goes unnoticed.",
                                call.target, call.method, function.name, how
                            ),
                        )
                        .with_title("Unchecked return value"),
                    );
                }
            }
        }

        Ok(findings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detectors::parse_unit;

    fn detect(source: &str) -> Vec<Finding> {
        UncheckedReturnDetector::new().detect(&parse_unit(source)).unwrap()
    }

    #[test]
    fn test_discarded_send_is_reported() {
        let findings = detect(
            r#"
            contract Payout {
                function pay(address payable to) public {
                    to.send(1 ether);
                }
            }
            "#,
        );
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].rule_id, "unchecked_return");
        assert_eq!(findings[0].severity, Severity::Medium);
        assert!(findings[0].message.contains("discarded"));
    }

    #[test]
    fn test_bound_flag_checked_later_is_fine() {
        let findings = detect(
            r#"
            contract Payout {
                function pay(address to, uint256 v) public {
                    (bool ok, ) = to.call{value: v}("");
                    require(ok, "failed");
                }
            }
            "#,
        );
        assert!(findings.is_empty());
    }

    #[test]
    fn test_bound_flag_never_checked_is_reported() {
        let findings = detect(
            r#"
            contract Payout {
                uint256 public paid;
                function pay(address to, uint256 v) public {
                    (bool ok, ) = to.call{value: v}("");
                    paid += v;
                }
            }
            "#,
        );
        assert_eq!(findings.len(), 1);
        assert!(findings[0].message.contains("'ok'"));
    }

    #[test]
    fn test_if_condition_consumes_flag() {
        let findings = detect(
            r#"
            contract Payout {
                function pay(address payable to) public {
                    bool sent = to.send(1);
                    if (!sent) {
                        revert("send failed");
                    }
                }
            }
            "#,
        );
        assert!(findings.is_empty());
    }

    #[test]
    fn test_token_transfer_inside_require_is_fine() {
        let findings = detect(
            r#"
            contract Distributor {
                IERC20 token;
                function drop(address to) public {
                    require(token.transfer(to, 10));
                    token.transferFrom(msg.sender, to, 5);
                }
            }
            "#,
        );
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].location.line, 6);
    }

    #[test]
    fn test_ether_transfer_reverts_on_its_own() {
        let findings = detect(
            r#"
            contract Payout {
                function pay(address payable to) public {
                    to.transfer(1);
                }
            }
            "#,
        );
        assert!(findings.is_empty());
    }
}
