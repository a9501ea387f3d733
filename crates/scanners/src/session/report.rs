//! The immutable result of an audit session.

use crate::core::{Diagnostic, Finding, FindingSource, Severity};
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeveritySummary {
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub total: usize,
}

impl SeveritySummary {
    pub fn from_findings(findings: &[Finding]) -> Self {
        let mut summary = Self::default();
        for finding in findings {
            match finding.severity {
                Severity::High => summary.high += 1,
                Severity::Medium => summary.medium += 1,
                Severity::Low => summary.low += 1,
            }
            summary.total += 1;
        }
        summary
    }

    pub fn count(&self, severity: Severity) -> usize {
        match severity {
            Severity::High => self.high,
            Severity::Medium => self.medium,
            Severity::Low => self.low,
        }
    }

    /// Findings at `threshold` or above.
    pub fn at_least(&self, threshold: Severity) -> usize {
        [Severity::High, Severity::Medium, Severity::Low]
            .into_iter()
            .filter(|s| *s >= threshold)
            .map(|s| self.count(s))
            .sum()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditReport {
    findings: Vec<Finding>,
    summary: SeveritySummary,
    diagnostics: Vec<Diagnostic>,
    units_analyzed: usize,
    generated_at: DateTime<Utc>,
}

impl AuditReport {
    /// `findings` must already be ranked.
    pub fn new(findings: Vec<Finding>, diagnostics: Vec<Diagnostic>, units_analyzed: usize) -> Self {
        Self {
            summary: SeveritySummary::from_findings(&findings),
            findings,
            diagnostics,
            units_analyzed,
            generated_at: Utc::now(),
        }
    }

    pub fn findings(&self) -> &[Finding] {
        &self.findings
    }

    pub fn summary(&self) -> SeveritySummary {
        self.summary
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn units_analyzed(&self) -> usize {
        self.units_analyzed
    }

    pub fn generated_at(&self) -> DateTime<Utc> {
        self.generated_at
    }

    pub fn is_empty(&self) -> bool {
        self.findings.is_empty()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn to_markdown(&self) -> String {
        let mut md = String::from("# Security Audit Report\n\n");
        md.push_str(&format!(
            "**Generated**: {}\n",
            self.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
        ));
        md.push_str(&format!("**Files analyzed**: {}\n\n", self.units_analyzed));

        md.push_str("## Summary\n\n");
        md.push_str("| Severity | Count |\n|----------|-------|\n");
        md.push_str(&format!("| High | {} |\n", self.summary.high));
        md.push_str(&format!("| Medium | {} |\n", self.summary.medium));
        md.push_str(&format!("| Low | {} |\n", self.summary.low));
        md.push_str(&format!("| **Total** | {} |\n\n", self.summary.total));

        if self.findings.is_empty() {
            md.push_str("No issues found.\n\n");
        } else {
            md.push_str("## Findings\n\n");
            for (idx, finding) in self.findings.iter().enumerate() {
                md.push_str(&format!(
                    "### {}. {} {}: {}\n\n",
                    idx + 1,
                    finding.severity.emoji(),
                    finding.severity,
                    finding.title
                ));
                md.push_str(&format!("- **Rule**: `{}`\n", finding.rule_id));
                md.push_str(&format!("- **Location**: `{}`\n", finding.location));
                md.push_str(&format!("- **Confidence**: {}\n", finding.confidence));
                let source = match finding.source {
                    FindingSource::Both => "pattern detectors and external analysis",
                    FindingSource::External => "external analysis",
                    FindingSource::Internal => "pattern detectors",
                };
                md.push_str(&format!("- **Reported by**: {}\n\n", source));
                md.push_str(&format!("{}\n\n", finding.message));
                md.push_str(&format!("**Remediation**: {}\n\n", finding.remediation));
            }
        }

        if !self.diagnostics.is_empty() {
            md.push_str("## Diagnostics\n\n");
            for diagnostic in &self.diagnostics {
                md.push_str(&format!("- {}\n", diagnostic));
            }
            md.push('\n');
        }

        md
    }
}
