//! SafeMath on a compiler that already checks arithmetic.
//!
//! Since 0.8.0 the library only costs gas. Reported once per file, at the
//! first line that mentions it.

use crate::core::{Confidence, Detector, Finding, Location, Severity};
use crate::model::SourceUnit;
use anyhow::Result;

pub struct RedundantSafeMathDetector;

impl RedundantSafeMathDetector {
    pub fn new() -> Self {
        Self
    }

    fn first_mention(unit: &SourceUnit) -> Option<usize> {
        unit.raw_text
            .lines()
            .enumerate()
            .find(|(_, line)| {
                let code = line.trim_start();
                !(code.starts_with("//") || code.starts_with('*') || code.starts_with("/*"))
                    && code.contains("SafeMath")
            })
            .map(|(i, _)| i + 1)
    }
}

impl Default for RedundantSafeMathDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl Detector for RedundantSafeMathDetector {
    fn id(&self) -> &'static str {
        "redundant_safemath"
    }

    fn name(&self) -> &'static str {
        "Redundant SafeMath"
    }

    fn description(&self) -> &'static str {
        "SafeMath used on Solidity 0.8 or later"
    }

    fn severity(&self) -> Severity {
        Severity::Low
    }

    fn confidence(&self) -> Confidence {
        Confidence::Possible
    }

    fn detect(&self, unit: &SourceUnit) -> Result<Vec<Finding>> {
        let Some(version) = unit.version else {
            return Ok(Vec::new());
        };
        if !version.has_builtin_overflow_protection() {
            return Ok(Vec::new());
        }
        let Some(line) = Self::first_mention(unit) else {
            return Ok(Vec::new());
        };

        let mut location = Location::new(unit.path.clone(), line);
        if let Some(contract) = unit
            .contracts
            .iter()
            .find(|c| c.line <= line && line <= c.end_line)
        {
            location = location.with_contract(contract.name.clone());
        }

        Ok(vec![Finding::new(
            self.id(),
            self.severity(),
            self.confidence(),
            location,
            format!(
                "SafeMath is used although the file targets Solidity {}, which reverts on \
                 overflow by itself.",
                version
            ),
        )
        .with_title("Redundant SafeMath")])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detectors::parse_unit;

    const USING: &str = r#"
        pragma solidity PRAGMA;
        import "@openzeppelin/contracts/utils/math/SafeMath.sol";

        contract Token {
            using SafeMath for uint256;
            uint256 public total;
            function add(uint256 x) public {
                total = total.add(x);
            }
        }
    "#;

    #[test]
    fn test_reported_once_on_checked_compiler() {
        let unit = parse_unit(&USING.replace("PRAGMA", "^0.8.10"));
        let findings = RedundantSafeMathDetector::new().detect(&unit).unwrap();
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].location.line, 3);
        assert_eq!(findings[0].location.contract, None);
        assert_eq!(findings[0].location.function, None);
        assert_eq!(findings[0].severity, Severity::Low);
    }

    #[test]
    fn test_silent_on_old_compiler() {
        let unit = parse_unit(&USING.replace("PRAGMA", "^0.7.6"));
        assert!(RedundantSafeMathDetector::new().detect(&unit).unwrap().is_empty());
    }

    #[test]
    fn test_using_directive_inside_contract() {
        let source = r#"
            pragma solidity 0.8.19;
            contract Token {
                // SafeMath is not needed here
                using SafeMath for uint256;
            }
        "#;
        let findings = RedundantSafeMathDetector::new().detect(&parse_unit(source)).unwrap();
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].location.line, 5);
        assert_eq!(findings[0].location.contract.as_deref(), Some("Token"));
    }
}
