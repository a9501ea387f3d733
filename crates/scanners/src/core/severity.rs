use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Three-level impact scale shared by internal detectors and external tools.
///
/// Ordering is ascending (`Low < Medium < High`) so `max()` picks the worst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::High => write!(f, "High"),
            Self::Medium => write!(f, "Medium"),
            Self::Low => write!(f, "Low"),
        }
    }
}

impl Severity {
    pub fn color(&self) -> &'static str {
        match self {
            Self::High => "bright red",
            Self::Medium => "yellow",
            Self::Low => "bright yellow",
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            Self::High => "🟠",
            Self::Medium => "🟡",
            Self::Low => "🟢",
        }
    }

    /// Maps a free-form severity label from an external tool onto the scale.
    ///
    /// Critical collapses into High; informational and optimization notes
    /// land on Low. Unknown labels are treated as Medium.
    pub fn from_tool_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "critical" | "high" => Self::High,
            "medium" | "moderate" => Self::Medium,
            "low" | "informational" | "info" | "optimization" | "note" => Self::Low,
            _ => Self::Medium,
        }
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" => Ok(Self::High),
            "medium" => Ok(Self::Medium),
            "low" => Ok(Self::Low),
            other => Err(format!("unknown severity '{}'", other)),
        }
    }
}

/// How much corroboration stands behind a finding.
///
/// `Confirmed` is only produced by the merger when an internal detector and
/// the external tool agree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Confidence {
    Possible,
    Likely,
    Confirmed,
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Confirmed => write!(f, "Confirmed"),
            Self::Likely => write!(f, "Likely"),
            Self::Possible => write!(f, "Possible"),
        }
    }
}

impl Confidence {
    /// Tool confidence labels: only `high` is trusted beyond a possibility.
    pub fn from_tool_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "high" => Self::Likely,
            _ => Self::Possible,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::High > Severity::Medium);
        assert!(Severity::Medium > Severity::Low);
        assert_eq!(
            [Severity::Low, Severity::High, Severity::Medium].iter().max(),
            Some(&Severity::High)
        );
    }

    #[test]
    fn test_tool_labels() {
        assert_eq!(Severity::from_tool_label("Informational"), Severity::Low);
        assert_eq!(Severity::from_tool_label("Optimization"), Severity::Low);
        assert_eq!(Severity::from_tool_label("HIGH"), Severity::High);
        assert_eq!(Severity::from_tool_label("weird"), Severity::Medium);
        assert_eq!(Confidence::from_tool_label("High"), Confidence::Likely);
        assert_eq!(Confidence::from_tool_label("Medium"), Confidence::Possible);
    }

    #[test]
    fn test_serde_uses_uppercase() {
        let json = serde_json::to_string(&Severity::High).unwrap();
        assert_eq!(json, "\"HIGH\"");
        let c: Confidence = serde_json::from_str("\"CONFIRMED\"").unwrap();
        assert_eq!(c, Confidence::Confirmed);
    }
}
