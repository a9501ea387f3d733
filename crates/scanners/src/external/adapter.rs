use crate::core::{Confidence, Finding, FindingSource, Location, RuleMapping, Severity};
use crate::external::ExternalFinding;
use crate::model::{ContractDef, FunctionDef, SourceUnit};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

/// Slither detector names that describe the same issue as a built-in rule.
const DEFAULT_RULE_MAP: &[(&str, &str, Option<Severity>)] = &[
    ("reentrancy-eth", "reentrancy", Some(Severity::High)),
    ("reentrancy-no-eth", "reentrancy", Some(Severity::Medium)),
    ("tx-origin", "tx_origin", None),
    ("unchecked-lowlevel", "unchecked_return", None),
    ("unchecked-send", "unchecked_return", None),
    ("unchecked-transfer", "unchecked_return", None),
    ("timestamp", "timestamp", None),
    ("calls-loop", "gas_limit", None),
    ("costly-loop", "gas_limit", None),
    ("suicidal", "access_control", None),
    ("arbitrary-send-eth", "access_control", None),
    ("unprotected-upgrade", "access_control", None),
];

/// Translates external records into [`Finding`]s.
///
/// Mapped rules take the internal rule id, and the mapped severity when the
/// table has one. Unmapped rules pass through as `external:<id>` with the
/// tool's own severity. Nothing is dropped.
pub struct ExternalFindingAdapter {
    mappings: BTreeMap<String, RuleMapping>,
}

impl ExternalFindingAdapter {
    pub fn new() -> Self {
        let mappings = DEFAULT_RULE_MAP
            .iter()
            .map(|(external, internal, severity)| {
                (
                    external.to_string(),
                    RuleMapping::new(external, internal, *severity),
                )
            })
            .collect();
        Self { mappings }
    }

    /// Defaults with `overrides` layered on top.
    pub fn with_rule_map(overrides: &[RuleMapping]) -> Self {
        let mut adapter = Self::new();
        for mapping in overrides {
            adapter
                .mappings
                .insert(mapping.external_id.clone(), mapping.clone());
        }
        adapter
    }

    pub fn mapping(&self, external_id: &str) -> Option<&RuleMapping> {
        self.mappings.get(external_id)
    }

    pub fn adapt(&self, records: Vec<ExternalFinding>, units: &[SourceUnit]) -> Vec<Finding> {
        records
            .into_iter()
            .map(|record| self.adapt_one(record, units))
            .collect()
    }

    fn adapt_one(&self, record: ExternalFinding, units: &[SourceUnit]) -> Finding {
        let tool_severity = Severity::from_tool_label(&record.severity);
        let (rule_id, severity) = match self.mappings.get(&record.rule_id) {
            Some(mapping) => (
                mapping.rule_id.clone(),
                mapping.severity.unwrap_or(tool_severity),
            ),
            None => (format!("external:{}", record.rule_id), tool_severity),
        };

        let location = resolve_location(&record, units);
        debug!(
            "External {} at {} mapped to {}",
            record.rule_id, location, rule_id
        );

        let tool = if record.tool.is_empty() {
            "external tool"
        } else {
            record.tool.as_str()
        };
        let description = record.description.trim();
        let message = if description.is_empty() {
            format!("{} reported '{}'.", tool, record.rule_id)
        } else {
            description.to_string()
        };

        Finding::new(
            rule_id,
            severity,
            Confidence::from_tool_label(&record.confidence),
            location,
            message,
        )
        .with_title(format!("{} ({})", record.rule_id, tool))
        .with_source(FindingSource::External)
    }
}

impl Default for ExternalFindingAdapter {
    fn default() -> Self {
        Self::new()
    }
}

/// Puts the record on the same path, contract and function names the
/// internal detectors use, so both sides meet on one dedup key.
fn resolve_location(record: &ExternalFinding, units: &[SourceUnit]) -> Location {
    let unit = find_unit(&record.path, units);
    let path = unit
        .map(|u| u.path.clone())
        .unwrap_or_else(|| record.path.clone());

    let mut location = Location::new(path, record.line);
    if let Some(end_line) = record.end_line {
        location = location.with_end_line(end_line);
    }

    let contract = unit.and_then(|u| {
        match &record.contract {
            Some(name) => u.contract(name),
            None => u.contracts.iter().find(|c| contains_line(c.line, c.end_line, record.line)),
        }
    });

    match (&record.contract, contract) {
        (_, Some(c)) => location = location.with_contract(c.name.clone()),
        (Some(name), None) => location = location.with_contract(name.clone()),
        (None, None) => {}
    }

    let function = contract.and_then(|c| find_function(c, record));
    match (&record.function, function) {
        (_, Some(f)) => {
            location = location.with_function(f.name.clone());
            if let Some(index) = f
                .body_statements
                .iter()
                .find(|s| s.line() == record.line)
                .map(|s| s.index())
            {
                location = location.with_statement_index(index);
            }
        }
        (Some(name), None) => location = location.with_function(name.clone()),
        (None, None) => {}
    }

    location
}

fn find_unit<'u>(record_path: &str, units: &'u [SourceUnit]) -> Option<&'u SourceUnit> {
    // An empty path is a suffix of every path.
    if record_path.trim().is_empty() {
        return None;
    }
    let wanted = Path::new(record_path);
    units
        .iter()
        .find(|u| u.path == record_path)
        .or_else(|| {
            units.iter().find(|u| {
                let have = Path::new(&u.path);
                have.ends_with(wanted) || wanted.ends_with(have)
            })
        })
}

fn find_function<'c>(contract: &'c ContractDef, record: &ExternalFinding) -> Option<&'c FunctionDef> {
    let mut bodies = contract.functions.iter().chain(contract.modifier_defs.iter());
    match &record.function {
        // Tools often print a signature such as `withdraw(uint256)`.
        Some(name) => {
            let bare = name.split('(').next().unwrap_or(name).trim();
            bodies.find(|f| f.name == bare)
        }
        None => bodies.find(|f| contains_line(f.line, f.end_line, record.line)),
    }
}

fn contains_line(start: usize, end: usize, line: usize) -> bool {
    start <= line && line <= end
}
