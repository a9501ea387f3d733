use crate::core::{Confidence, Severity};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a finding points.
///
/// `contract` and `function` are `None` for unit-level or contract-level
/// findings. `statement_index` is only known for internal findings; the
/// external tool reports lines.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Location {
    pub path: String,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub contract: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub function: Option<String>,

    pub line: usize,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub end_line: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub statement_index: Option<usize>,
}

impl Location {
    pub fn new(path: impl Into<String>, line: usize) -> Self {
        Self {
            path: path.into(),
            contract: None,
            function: None,
            line,
            end_line: None,
            statement_index: None,
        }
    }

    pub fn with_contract(mut self, contract: impl Into<String>) -> Self {
        self.contract = Some(contract.into());
        self
    }

    pub fn with_function(mut self, function: impl Into<String>) -> Self {
        self.function = Some(function.into());
        self
    }

    pub fn with_end_line(mut self, end_line: usize) -> Self {
        self.end_line = Some(end_line);
        self
    }

    pub fn with_statement_index(mut self, index: usize) -> Self {
        self.statement_index = Some(index);
        self
    }

    /// Number of lines covered; a point location has span 0.
    pub fn span(&self) -> usize {
        self.end_line
            .map(|end| end.saturating_sub(self.line))
            .unwrap_or(0)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.path, self.line)?;
        match (&self.contract, &self.function) {
            (Some(c), Some(func)) => write!(f, " ({}.{})", c, func),
            (Some(c), None) => write!(f, " ({})", c),
            _ => Ok(()),
        }
    }
}

/// Which analysis produced a finding.
///
/// Declaration order is the reliability ranking used by the merger:
/// corroborated findings first, then the external tool, then internal rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FindingSource {
    Both,
    External,
    Internal,
}

impl fmt::Display for FindingSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Both => write!(f, "both"),
            Self::External => write!(f, "external"),
            Self::Internal => write!(f, "internal"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Finding {
    pub rule_id: String,

    pub title: String,

    pub severity: Severity,

    pub confidence: Confidence,

    pub location: Location,

    pub message: String,

    pub remediation: String,

    pub source: FindingSource,

    /// Registration index of the producing detector. Stable tie-breaker only.
    #[serde(skip)]
    pub order: usize,
}

impl Finding {
    pub fn new(
        rule_id: impl Into<String>,
        severity: Severity,
        confidence: Confidence,
        location: Location,
        message: impl Into<String>,
    ) -> Self {
        let rule_id = rule_id.into();
        Self {
            title: rule_id.clone(),
            remediation: crate::core::remediation::advice_for(&rule_id).to_string(),
            rule_id,
            severity,
            confidence,
            location,
            message: message.into(),
            source: FindingSource::Internal,
            order: 0,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_source(mut self, source: FindingSource) -> Self {
        self.source = source;
        self
    }

    pub fn dedup_key(&self) -> DedupKey {
        DedupKey {
            rule_id: self.rule_id.clone(),
            path: self.location.path.clone(),
            contract: self.location.contract.clone(),
            function: self.location.function.clone(),
        }
    }
}

/// Coarse identity of a finding: rule plus enclosing function.
///
/// Deliberately ignores line and statement position so that the external
/// tool and internal rules meet on the same key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DedupKey {
    pub rule_id: String,
    pub path: String,
    pub contract: Option<String>,
    pub function: Option<String>,
}
