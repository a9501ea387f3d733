//! Constructors that store their arguments without validating any of them.

use crate::analysis::patterns;
use crate::core::{Confidence, Finding, Severity};
use crate::detectors::{concrete_contracts, function_location};
use crate::impl_detector;
use crate::model::{FunctionDef, FunctionKind, SourceUnit, StatementKind};
use anyhow::Result;

pub struct ConstructorValidationDetector;

impl ConstructorValidationDetector {
    pub fn new() -> Self {
        Self
    }

    fn validates_input(constructor: &FunctionDef) -> bool {
        constructor.recognized_statements().any(|(_, kind, text, _)| {
            matches!(kind, StatementKind::If | StatementKind::Revert) || patterns::is_guard_text(text)
        })
    }

    fn detect_impl(&self, unit: &SourceUnit) -> Result<Vec<Finding>> {
        let mut findings = Vec::new();

        for contract in concrete_contracts(unit) {
            let unvalidated = contract.functions.iter().filter(|f| {
                f.kind == FunctionKind::Constructor
                    && !f.parameters.is_empty()
                    && !Self::validates_input(f)
            });

            for constructor in unvalidated {
                let names: Vec<&str> = constructor
                    .parameters
                    .iter()
                    .map(|p| p.name.as_str())
                    .filter(|n| !n.is_empty())
                    .collect();
                findings.push(
                    Finding::new(
                        "constructor_validation",
                        Severity::Medium,
                        Confidence::Possible,
                        function_location(unit, contract, constructor, constructor.line, None),
                        format!(
                            "The constructor of '{}' accepts ({}) without validating them. \
                             A zero address or out-of-range value is fixed at deployment.",
                            contract.name,
                            names.join(", ")
                        ),
                    )
                    .with_title("Constructor parameters not validated"),
                );
            }
        }

        Ok(findings)
    }
}

impl Default for ConstructorValidationDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl_detector!(
    ConstructorValidationDetector,
    id: "constructor_validation",
    name: "Constructor Validation",
    severity: Severity::Medium,
    confidence: Confidence::Possible,
    description: "Constructor parameters stored without any require or revert"
);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Detector;
    use crate::detectors::parse_unit;

    #[test]
    fn test_unvalidated_constructor() {
        let source = r#"
            contract Vault {
                address public owner;
                uint256 public fee;
                constructor(address _owner, uint256 _fee) {
                    owner = _owner;
                    fee = _fee;
                }
            }
        "#;
        let findings = ConstructorValidationDetector::new()
            .detect(&parse_unit(source))
            .unwrap();
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::Medium);
        assert!(findings[0].message.contains("_owner, _fee"));
    }

    #[test]
    fn test_validated_or_parameterless_constructor() {
        let source = r#"
            contract Vault {
                address public owner;
                constructor(address _owner) {
                    require(_owner != address(0), "zero owner");
                    owner = _owner;
                }
            }
            contract Plain {
                address public owner;
                constructor() { owner = msg.sender; }
            }
        "#;
        let findings = ConstructorValidationDetector::new()
            .detect(&parse_unit(source))
            .unwrap();
        assert!(findings.is_empty());
    }
}
