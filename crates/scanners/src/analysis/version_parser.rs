//! Solidity Version Parser
//!
//! Reads the `pragma solidity` directive so detectors can tell whether the
//! compiler inserts overflow checks. For ranges the lower bound is used, since
//! that is the oldest compiler the source admits.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SolidityVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl SolidityVersion {
    pub fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self { major, minor, patch }
    }

    pub fn is_at_least(&self, major: u32, minor: u32, patch: u32) -> bool {
        *self >= Self::new(major, minor, patch)
    }

    pub fn has_builtin_overflow_protection(&self) -> bool {
        self.is_at_least(0, 8, 0)
    }
}

impl fmt::Display for SolidityVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl PartialOrd for SolidityVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SolidityVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.major
            .cmp(&other.major)
            .then(self.minor.cmp(&other.minor))
            .then(self.patch.cmp(&other.patch))
    }
}

/// First `pragma solidity` directive outside comments, or `None`.
pub fn parse_solidity_version(source: &str) -> Option<SolidityVersion> {
    source
        .lines()
        .map(str::trim_start)
        .filter(|line| !line.starts_with("//") && !line.starts_with('*') && !line.starts_with("/*"))
        .find_map(|line| {
            let start = line.find("pragma solidity")?;
            let rest = &line[start + "pragma solidity".len()..];
            let directive = rest.split(';').next().unwrap_or(rest);
            parse_version_constraint(directive)
        })
}

fn parse_version_constraint(constraint: &str) -> Option<SolidityVersion> {
    // `a || b` admits either; the oldest alternative is the one that matters.
    constraint
        .split("||")
        .filter_map(|alternative| {
            alternative
                .split_whitespace()
                .filter(|part| !part.starts_with('<'))
                .find_map(parse_version_token)
        })
        .min()
}

fn parse_version_token(token: &str) -> Option<SolidityVersion> {
    let cleaned = token
        .trim()
        .trim_start_matches('^')
        .trim_start_matches('~')
        .trim_start_matches(">=")
        .trim_start_matches('>')
        .trim_start_matches('=')
        .trim();

    let mut parts = cleaned.split('.');
    let major = parts.next()?.parse::<u32>().ok()?;
    let minor = parts.next().and_then(|s| s.parse::<u32>().ok()).unwrap_or(0);
    let patch = parts.next().and_then(|s| s.parse::<u32>().ok()).unwrap_or(0);

    Some(SolidityVersion::new(major, minor, patch))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_exact_version() {
        let version = parse_solidity_version("pragma solidity 0.8.19;").unwrap();
        assert_eq!(version, SolidityVersion::new(0, 8, 19));
    }

    #[test]
    fn test_parse_caret_and_tilde() {
        assert_eq!(
            parse_solidity_version("pragma solidity ^0.8.0;"),
            Some(SolidityVersion::new(0, 8, 0))
        );
        assert_eq!(
            parse_solidity_version("pragma solidity ~0.7.6;"),
            Some(SolidityVersion::new(0, 7, 6))
        );
    }

    #[test]
    fn test_range_uses_lower_bound() {
        let version = parse_solidity_version("pragma solidity >=0.7.0 <0.9.0;").unwrap();
        assert_eq!(version, SolidityVersion::new(0, 7, 0));
        assert!(!version.has_builtin_overflow_protection());

        let version = parse_solidity_version("pragma solidity <0.9.0 >=0.8.4;").unwrap();
        assert_eq!(version, SolidityVersion::new(0, 8, 4));
    }

    #[test]
    fn test_alternatives_pick_oldest() {
        let version = parse_solidity_version("pragma solidity ^0.8.0 || ^0.6.12;").unwrap();
        assert_eq!(version, SolidityVersion::new(0, 6, 12));
    }

    #[test]
    fn test_commented_pragma_is_ignored() {
        let source = r#"
            // pragma solidity ^0.4.24;
            pragma solidity ^0.8.20;
            contract Token {}
        "#;
        assert_eq!(
            parse_solidity_version(source),
            Some(SolidityVersion::new(0, 8, 20))
        );
    }

    #[test]
    fn test_missing_or_garbled_pragma() {
        assert_eq!(parse_solidity_version("contract A {}"), None);
        assert_eq!(parse_solidity_version("pragma solidity latest;"), None);
    }

    #[test]
    fn test_is_at_least() {
        let v = SolidityVersion::new(0, 8, 19);
        assert!(v.is_at_least(0, 8, 0));
        assert!(v.is_at_least(0, 8, 19));
        assert!(!v.is_at_least(0, 9, 0));
        assert!(SolidityVersion::new(1, 0, 0).has_builtin_overflow_protection());
        assert!(!SolidityVersion::new(0, 7, 6).has_builtin_overflow_protection());
        assert_eq!(v.to_string(), "0.8.19");
    }
}
