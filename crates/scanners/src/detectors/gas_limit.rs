//! Loops bounded by the length of a storage array.
//!
//! Anyone who can grow the array can push the loop past the block gas limit,
//! after which every call to the function fails.

use crate::core::{Confidence, Detector, Finding, Severity};
use crate::detectors::{all_bodies, concrete_contracts, function_location};
use crate::model::{ContractDef, SourceUnit};
use anyhow::Result;

pub struct GasLimitDetector;

impl GasLimitDetector {
    pub fn new() -> Self {
        Self
    }

    /// Storage arrays whose `.length` appears in a loop header.
    fn unbounded_collection(contract: &ContractDef, header: &str) -> Option<String> {
        header.match_indices(".length").find_map(|(at, _)| {
            let before = &header[..at];
            let start = before
                .char_indices()
                .rev()
                .find(|&(_, c)| !(c.is_ascii_alphanumeric() || c == '_' || c == '.'))
                .map(|(i, c)| i + c.len_utf8())
                .unwrap_or(0);
            let path = &before[start..];
            let root = path.split('.').next().unwrap_or("");
            let last = path.rsplit('.').next().unwrap_or("");
            [root, last]
                .into_iter()
                .find(|name| !name.is_empty() && contract.is_array_state(name))
                .map(str::to_string)
        })
    }
}

impl Default for GasLimitDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl Detector for GasLimitDetector {
    fn id(&self) -> &'static str {
        "gas_limit"
    }

    fn name(&self) -> &'static str {
        "Unbounded Loop"
    }

    fn description(&self) -> &'static str {
        "Loop over a storage array that can grow without bound"
    }

    fn severity(&self) -> Severity {
        Severity::Low
    }

    fn confidence(&self) -> Confidence {
        Confidence::Possible
    }

    fn detect(&self, unit: &SourceUnit) -> Result<Vec<Finding>> {
        let mut findings = Vec::new();

        for contract in concrete_contracts(unit) {
            for body in all_bodies(contract) {
                let hit = body
                    .recognized_statements()
                    .filter(|(_, kind, _, _)| kind.is_loop())
                    .find_map(|(index, _, text, line)| {
                        Self::unbounded_collection(contract, text).map(|array| (index, line, array))
                    });

                if let Some((index, line, array)) = hit {
                    findings.push(
                        Finding::new(
                            self.id(),
                            self.severity(),
                            self.confidence(),
                            function_location(unit, contract, body, line, Some(index)),
                            format!(
                                "'{}' loops over every element of the storage array '{}'. \
                                 Once the array is large enough the call runs out of gas.",
                                body.name, array
                            ),
                        )
                        .with_title("Loop over unbounded array"),
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

    #[test]
    fn test_loop_over_state_array() {
        let source = r#"
            contract Airdrop {
                address[] public recipients;
                mapping(address => uint256) public credit;

                function distribute() public {
                    for (uint256 i = 0; i < recipients.length; i++) {
                        credit[recipients[i]] += 1;
                    }
                }
            }
        "#;
        let findings = GasLimitDetector::new().detect(&parse_unit(source)).unwrap();
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].rule_id, "gas_limit");
        assert_eq!(findings[0].location.line, 7);
        assert!(findings[0].message.contains("recipients"));
    }

    #[test]
    fn test_loop_over_parameter_is_fine() {
        let source = r#"
            contract Batch {
                uint256 public total;
                function sum(uint256[] memory values) public {
                    for (uint256 i = 0; i < values.length; i++) {
                        total += values[i];
                    }
                }
            }
        "#;
        assert!(GasLimitDetector::new().detect(&parse_unit(source)).unwrap().is_empty());
    }

    #[test]
    fn test_while_loop_over_nested_array() {
        let source = r#"
            contract Queue {
                struct Data { uint256[] items; }
                uint256[] public items;
                function drain() public {
                    uint256 i = 0;
                    while (i < items.length) {
                        i++;
                    }
                }
            }
        "#;
        assert_eq!(GasLimitDetector::new().detect(&parse_unit(source)).unwrap().len(), 1);
    }

    #[test]
    fn test_multibyte_char_before_length_access() {
        let unit = parse_unit(
            r#"
            contract Airdrop {
                address[] public recipients;
            }
        "#,
        );
        let contract = &unit.contracts[0];
        assert_eq!(
            GasLimitDetector::unbounded_collection(contract, "for (uint256 i = 0; i < ¶recipients.length; i++)"),
            Some("recipients".to_string())
        );
        assert_eq!(
            GasLimitDetector::unbounded_collection(contract, "for (uint256 i = 0; i <¶.length; i++)"),
            None
        );
    }
}
