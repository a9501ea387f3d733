//! Reconciles internal detector findings with external tool findings.
//!
//! Findings are grouped on [`DedupKey`] (rule, path, contract, function). A
//! group holding both internal and external findings collapses into a single
//! `Both`/`Confirmed` finding; single-source groups keep their confidence and
//! collapse duplicates to the most severe entry.

use crate::core::{Confidence, DedupKey, Finding, FindingSource};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use tracing::debug;

#[derive(Debug, Default, Clone, Copy)]
pub struct FindingMerger;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MergeStats {
    pub input_count: usize,
    pub output_count: usize,
    pub corroborated: usize,
}

impl FindingMerger {
    pub fn new() -> Self {
        Self
    }

    pub fn merge(&self, internal: Vec<Finding>, external: Vec<Finding>) -> Vec<Finding> {
        self.merge_with_stats(internal, external).0
    }

    pub fn merge_with_stats(
        &self,
        internal: Vec<Finding>,
        external: Vec<Finding>,
    ) -> (Vec<Finding>, MergeStats) {
        let input_count = internal.len() + external.len();

        let mut groups: BTreeMap<DedupKey, Vec<Finding>> = BTreeMap::new();
        for finding in internal.into_iter().chain(external) {
            groups.entry(finding.dedup_key()).or_default().push(finding);
        }

        let mut corroborated = 0;
        let mut merged: Vec<Finding> = Vec::with_capacity(groups.len());

        for (_key, group) in groups {
            let (ours, theirs): (Vec<Finding>, Vec<Finding>) = group
                .into_iter()
                .partition(|f| f.source != FindingSource::External);

            let finding = match (best_of(&ours), best_of(&theirs)) {
                (Some(i), Some(e)) => {
                    corroborated += 1;
                    let worst = ours
                        .iter()
                        .chain(theirs.iter())
                        .map(|f| f.severity)
                        .max()
                        .unwrap_or(i.severity);
                    corroborate(i, e, worst)
                }
                (Some(only), None) | (None, Some(only)) => only.clone(),
                (None, None) => continue,
            };
            merged.push(finding);
        }

        rank(&mut merged);

        let stats = MergeStats {
            input_count,
            output_count: merged.len(),
            corroborated,
        };
        debug!(
            "Merged {} findings into {} ({} corroborated)",
            stats.input_count, stats.output_count, stats.corroborated
        );

        (merged, stats)
    }
}

/// Sorts findings into report order.
///
/// Severity descending, then source reliability (both, external, internal),
/// then path, line and statement position. The remaining keys only make the
/// order total.
pub fn rank(findings: &mut [Finding]) {
    findings.sort_by(report_order);
}

fn report_order(a: &Finding, b: &Finding) -> Ordering {
    b.severity
        .cmp(&a.severity)
        .then_with(|| a.source.cmp(&b.source))
        .then_with(|| a.location.path.cmp(&b.location.path))
        .then_with(|| a.location.line.cmp(&b.location.line))
        .then_with(|| a.location.statement_index.cmp(&b.location.statement_index))
        .then_with(|| a.order.cmp(&b.order))
        .then_with(|| a.rule_id.cmp(&b.rule_id))
        .then_with(|| a.location.contract.cmp(&b.location.contract))
        .then_with(|| a.location.function.cmp(&b.location.function))
        .then_with(|| a.message.cmp(&b.message))
}

/// Most severe, then most confident, then most specific, then earliest.
fn best_of(findings: &[Finding]) -> Option<&Finding> {
    findings.iter().min_by(|a, b| {
        b.severity
            .cmp(&a.severity)
            .then_with(|| b.confidence.cmp(&a.confidence))
            .then_with(|| a.location.span().cmp(&b.location.span()))
            .then_with(|| a.location.line.cmp(&b.location.line))
            .then_with(|| a.order.cmp(&b.order))
    })
}

fn corroborate(internal: &Finding, external: &Finding, severity: crate::core::Severity) -> Finding {
    // Ties on span go to the internal finding, which also knows the statement.
    let mut location = if external.location.span() < internal.location.span() {
        external.location.clone()
    } else {
        internal.location.clone()
    };
    if location.statement_index.is_none() {
        location.statement_index = internal.location.statement_index;
    }

    Finding {
        rule_id: internal.rule_id.clone(),
        title: internal.title.clone(),
        severity,
        confidence: Confidence::Confirmed,
        location,
        message: format!("{}\nExternal analysis: {}", internal.message, external.message),
        remediation: internal.remediation.clone(),
        source: FindingSource::Both,
        order: internal.order,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Location, Severity};

    fn internal(rule: &str, func: &str, severity: Severity, line: usize) -> Finding {
        Finding::new(
            rule,
            severity,
            Confidence::Likely,
            Location::new("Bank.sol", line)
                .with_contract("Bank")
                .with_function(func)
                .with_statement_index(line),
            format!("{} in {}", rule, func),
        )
    }

    fn external(rule: &str, func: &str, severity: Severity, line: usize, end: usize) -> Finding {
        Finding::new(
            rule,
            severity,
            Confidence::Possible,
            Location::new("Bank.sol", line)
                .with_contract("Bank")
                .with_function(func)
                .with_end_line(end),
            "tool says so",
        )
        .with_source(FindingSource::External)
    }

    #[test]
    fn test_corroborated_finding_is_confirmed() {
        let merger = FindingMerger::new();
        let (merged, stats) = merger.merge_with_stats(
            vec![internal("reentrancy", "withdraw", Severity::High, 10)],
            vec![external("reentrancy", "withdraw", Severity::Medium, 8, 20)],
        );

        assert_eq!(merged.len(), 1);
        assert_eq!(stats.corroborated, 1);
        let f = &merged[0];
        assert_eq!(f.source, FindingSource::Both);
        assert_eq!(f.confidence, Confidence::Confirmed);
        assert_eq!(f.severity, Severity::High);
        assert_eq!(f.location.line, 10);
        assert!(f.message.contains("reentrancy in withdraw"));
        assert!(f.message.contains("tool says so"));
    }

    #[test]
    fn test_more_specific_external_location_wins() {
        let merged = FindingMerger::new().merge(
            vec![{
                let mut f = internal("reentrancy", "withdraw", Severity::Medium, 10);
                f.location.end_line = Some(14);
                f
            }],
            vec![external("reentrancy", "withdraw", Severity::High, 12, 12)],
        );
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].location.line, 12);
        assert_eq!(merged[0].location.statement_index, Some(10));
        assert_eq!(merged[0].severity, Severity::High);
    }

    #[test]
    fn test_single_source_keeps_confidence() {
        let merged = FindingMerger::new().merge(
            vec![internal("tx_origin", "f", Severity::Medium, 3)],
            vec![external("reentrancy", "g", Severity::High, 9, 9)],
        );
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].rule_id, "reentrancy");
        assert_eq!(merged[0].confidence, Confidence::Possible);
        assert_eq!(merged[0].source, FindingSource::External);
        assert_eq!(merged[1].confidence, Confidence::Likely);
    }

    #[test]
    fn test_same_source_duplicates_collapse() {
        let merged = FindingMerger::new().merge(
            vec![
                internal("unchecked_return", "pay", Severity::Medium, 4),
                internal("unchecked_return", "pay", Severity::Medium, 6),
            ],
            vec![],
        );
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].location.line, 4);
    }

    #[test]
    fn test_ordering_severity_then_source_then_position() {
        let merged = FindingMerger::new().merge(
            vec![
                internal("timestamp", "a", Severity::Low, 1),
                internal("access_control", "b", Severity::High, 30),
                internal("reentrancy", "c", Severity::High, 20),
            ],
            vec![
                external("reentrancy", "c", Severity::High, 20, 20),
                external("external:foo", "d", Severity::High, 50, 50),
                external("tx_origin", "e", Severity::Medium, 2, 2),
            ],
        );

        let order: Vec<(&str, FindingSource)> = merged
            .iter()
            .map(|f| (f.rule_id.as_str(), f.source))
            .collect();
        assert_eq!(
            order,
            vec![
                ("reentrancy", FindingSource::Both),
                ("external:foo", FindingSource::External),
                ("access_control", FindingSource::Internal),
                ("tx_origin", FindingSource::External),
                ("timestamp", FindingSource::Internal),
            ]
        );
    }

    #[test]
    fn test_merge_is_deterministic() {
        let build = || {
            (
                vec![
                    internal("reentrancy", "w", Severity::High, 5),
                    internal("timestamp", "w", Severity::Low, 7),
                ],
                vec![external("reentrancy", "w", Severity::High, 5, 6)],
            )
        };
        let (i1, e1) = build();
        let (i2, e2) = build();
        let merger = FindingMerger::new();
        assert_eq!(merger.merge(i1, e1), merger.merge(i2, e2));
    }
}
