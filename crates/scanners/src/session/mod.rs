//! Audit orchestration.
//!
//! An [`AuditSession`] walks through `Init -> Parsing -> Detecting -> Merging
//! -> Done`. Any state can fall to `Failed`, but only for a missing input path
//! or a cancellation. Everything that goes wrong with a single file, detector
//! or the external tool is recorded as a diagnostic on the report and the
//! session carries on.
//!
//! Units are independent, so parsing and detection run on the rayon pool when
//! the config allows it. The external analyzer runs alongside detection.
//! Output order never depends on scheduling: the merger ranks findings and
//! diagnostics are sorted before the report is built.

pub mod discovery;
pub mod report;

pub use discovery::discover_sources;
pub use report::{AuditReport, SeveritySummary};

use crate::core::{
    AuditConfig, AuditError, Diagnostic, DiagnosticKind, Finding, FindingMerger,
};
use crate::external::{CommandAnalyzer, ExternalAnalyzer, ExternalFindingAdapter};
use crate::model::{SourceModelBuilder, SourceUnit};
use crate::runner::DetectorRegistry;
use anyhow::Result;
use parking_lot::Mutex;
use rayon::prelude::*;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Init,
    Parsing,
    Detecting,
    Merging,
    Done,
    Failed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Init => "INIT",
            Self::Parsing => "PARSING",
            Self::Detecting => "DETECTING",
            Self::Merging => "MERGING",
            Self::Done => "DONE",
            Self::Failed => "FAILED",
        };
        write!(f, "{}", name)
    }
}

/// Requests that a running session stop at the next unit boundary.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

pub struct AuditSession {
    config: AuditConfig,
    builder: SourceModelBuilder,
    registry: DetectorRegistry,
    analyzer: Option<Box<dyn ExternalAnalyzer>>,
    adapter: ExternalFindingAdapter,
    merger: FindingMerger,
    state: SessionState,
    cancel: CancelHandle,
}

impl AuditSession {
    pub fn new(config: AuditConfig) -> Result<Self> {
        let registry = DetectorRegistry::with_defaults(&config);
        let (analyzer, adapter) = match &config.external {
            Some(external) => (
                Some(Box::new(CommandAnalyzer::new(external.clone())) as Box<dyn ExternalAnalyzer>),
                ExternalFindingAdapter::with_rule_map(&external.rule_map),
            ),
            None => (None, ExternalFindingAdapter::new()),
        };

        Ok(Self {
            builder: SourceModelBuilder::new()?,
            registry,
            analyzer,
            adapter,
            merger: FindingMerger::new(),
            state: SessionState::Init,
            cancel: CancelHandle::default(),
            config,
        })
    }

    pub fn with_registry(mut self, registry: DetectorRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_analyzer(mut self, analyzer: Box<dyn ExternalAnalyzer>) -> Self {
        self.analyzer = Some(analyzer);
        self
    }

    pub fn with_adapter(mut self, adapter: ExternalFindingAdapter) -> Self {
        self.adapter = adapter;
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn registry(&self) -> &DetectorRegistry {
        &self.registry
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Audits files and directories on disk.
    ///
    /// Fails only when an input does not exist or cannot be read, or when
    /// the session is cancelled.
    pub fn run(&mut self, inputs: &[PathBuf]) -> Result<AuditReport, AuditError> {
        self.transition(SessionState::Init);
        self.transition(SessionState::Parsing);

        let mut files = Vec::new();
        let mut walk_diagnostics = Vec::new();
        for input in inputs {
            match discover_sources(input, &self.config.file_extensions) {
                Ok((found, skipped)) => {
                    files.extend(found);
                    walk_diagnostics.extend(skipped);
                }
                Err(e) => return Err(self.fail(e)),
            }
        }

        let diagnostics = Mutex::new(walk_diagnostics);
        let mut sources = Vec::with_capacity(files.len());
        for file in &files {
            match std::fs::read(file) {
                Ok(bytes) => sources.push((
                    file.display().to_string(),
                    String::from_utf8_lossy(&bytes).into_owned(),
                )),
                Err(e) if inputs.iter().any(|i| i == file) => {
                    return Err(self.fail(AuditError::FatalInput {
                        path: file.clone(),
                        reason: e.to_string(),
                    }));
                }
                Err(e) => {
                    warn!("Cannot read {}: {}", file.display(), e);
                    diagnostics.lock().push(
                        Diagnostic::new(DiagnosticKind::Input, format!("cannot read file: {}", e))
                            .with_path(file.display().to_string()),
                    );
                }
            }
        }

        self.audit(sources, inputs, diagnostics)
    }

    /// Audits in-memory sources given as `(path, text)` pairs.
    ///
    /// The external analyzer needs files on disk and is not invoked.
    pub fn run_sources(&mut self, sources: Vec<(String, String)>) -> Result<AuditReport, AuditError> {
        self.transition(SessionState::Init);
        self.transition(SessionState::Parsing);
        self.audit(sources, &[], Mutex::new(Vec::new()))
    }

    fn audit(
        &mut self,
        sources: Vec<(String, String)>,
        external_targets: &[PathBuf],
        diagnostics: Mutex<Vec<Diagnostic>>,
    ) -> Result<AuditReport, AuditError> {
        let units = self.parse_units(&sources, &diagnostics);
        if self.cancel.is_cancelled() {
            return Err(self.fail(AuditError::Cancelled));
        }
        info!("Parsed {} of {} source file(s)", units.len(), sources.len());
        {
            let mut diagnostics = diagnostics.lock();
            if units.is_empty() && diagnostics.is_empty() {
                warn!("No source files to audit");
                diagnostics.push(Diagnostic::new(
                    DiagnosticKind::Input,
                    "no source files to audit",
                ));
            }
        }

        self.transition(SessionState::Detecting);
        let (internal, external) = if self.config.parallel {
            rayon::join(
                || self.detect(&units, &diagnostics),
                || self.run_external(external_targets, &units, &diagnostics),
            )
        } else {
            (
                self.detect(&units, &diagnostics),
                self.run_external(external_targets, &units, &diagnostics),
            )
        };
        if self.cancel.is_cancelled() {
            return Err(self.fail(AuditError::Cancelled));
        }

        self.transition(SessionState::Merging);
        let (findings, stats) = self.merger.merge_with_stats(internal, external);
        info!(
            "Merged {} finding(s) into {} ({} corroborated)",
            stats.input_count, stats.output_count, stats.corroborated
        );

        let mut diagnostics = diagnostics.into_inner();
        diagnostics.sort();
        let report = AuditReport::new(findings, diagnostics, units.len());

        self.transition(SessionState::Done);
        Ok(report)
    }

    fn parse_units(
        &self,
        sources: &[(String, String)],
        diagnostics: &Mutex<Vec<Diagnostic>>,
    ) -> Vec<SourceUnit> {
        let parse = |(path, text): &(String, String)| -> Option<SourceUnit> {
            if self.cancel.is_cancelled() {
                return None;
            }
            match self.builder.build(path, text) {
                Ok(unit) => Some(unit),
                Err(e) => {
                    warn!("Skipping {}: {}", path, e);
                    diagnostics.lock().push(Diagnostic::from(&e));
                    None
                }
            }
        };

        if self.config.parallel {
            sources.par_iter().filter_map(parse).collect()
        } else {
            sources.iter().filter_map(parse).collect()
        }
    }

    fn detect(&self, units: &[SourceUnit], diagnostics: &Mutex<Vec<Diagnostic>>) -> Vec<Finding> {
        let run = |unit: &SourceUnit| -> Vec<Finding> {
            if self.cancel.is_cancelled() {
                return Vec::new();
            }
            let (findings, failures) = self.registry.run_all(unit);
            debug!("{}: {} finding(s)", unit.path, findings.len());
            if !failures.is_empty() {
                diagnostics.lock().extend(failures);
            }
            findings
        };

        if self.config.parallel {
            units.par_iter().flat_map_iter(run).collect()
        } else {
            units.iter().flat_map(run).collect()
        }
    }

    fn run_external(
        &self,
        targets: &[PathBuf],
        units: &[SourceUnit],
        diagnostics: &Mutex<Vec<Diagnostic>>,
    ) -> Vec<Finding> {
        let Some(analyzer) = &self.analyzer else {
            return Vec::new();
        };

        let mut findings = Vec::new();
        for target in targets {
            if self.cancel.is_cancelled() {
                break;
            }
            match analyzer.analyze(target) {
                Ok(records) => {
                    debug!("{} returned {} record(s) for {}", analyzer.name(), records.len(), target.display());
                    findings.extend(self.adapter.adapt(records, units));
                }
                Err(e) => {
                    warn!("External analysis of {} failed: {}", target.display(), e);
                    diagnostics
                        .lock()
                        .push(Diagnostic::from(&e).with_path(target.display().to_string()));
                }
            }
        }
        findings
    }

    fn transition(&mut self, next: SessionState) {
        if self.state != next {
            info!("Audit session {} -> {}", self.state, next);
        }
        self.state = next;
    }

    fn fail(&mut self, error: AuditError) -> AuditError {
        warn!("Audit session failed: {}", error);
        self.transition(SessionState::Failed);
        error
    }
}

/// Convenience wrapper: audits `path` with `config` in a fresh session.
pub fn audit_path(path: &Path, config: AuditConfig) -> Result<AuditReport> {
    let mut session = AuditSession::new(config)?;
    Ok(session.run(&[path.to_path_buf()])?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Confidence, FindingSource, Severity};
    use crate::external::ExternalFinding;
    use crate::core::ExternalToolError;

    const BANK: &str = r#"pragma solidity ^0.8.0;
contract Bank {
    mapping(address => uint256) public balances;

    function withdraw() public {
        uint256 amount = balances[msg.sender];
        (bool ok, ) = msg.sender.call{value: amount}("");
        require(ok);
        balances[msg.sender] = 0;
    }
}
"#;

    struct Canned(Vec<ExternalFinding>);

    impl ExternalAnalyzer for Canned {
        fn name(&self) -> &str {
            "canned"
        }

        fn analyze(&self, _target: &Path) -> Result<Vec<ExternalFinding>, ExternalToolError> {
            Ok(self.0.clone())
        }
    }

    struct Broken;

    impl ExternalAnalyzer for Broken {
        fn name(&self) -> &str {
            "broken"
        }

        fn analyze(&self, _target: &Path) -> Result<Vec<ExternalFinding>, ExternalToolError> {
            Err(ExternalToolError::Timeout {
                program: "broken".into(),
                timeout_secs: 1,
            })
        }
    }

    #[test]
    fn test_in_memory_session_reaches_done() {
        let mut session = AuditSession::new(AuditConfig::default()).unwrap();
        assert_eq!(session.state(), SessionState::Init);

        let report = session
            .run_sources(vec![("Bank.sol".into(), BANK.into())])
            .unwrap();
        assert_eq!(session.state(), SessionState::Done);
        assert_eq!(report.units_analyzed(), 1);
        assert!(report.findings().iter().any(|f| f.rule_id == "reentrancy"));
    }

    #[test]
    fn test_missing_input_fails_session() {
        let mut session = AuditSession::new(AuditConfig::default()).unwrap();
        let err = session.run(&[PathBuf::from("/no/such/contracts")]).unwrap_err();
        assert!(matches!(err, AuditError::FatalInput { .. }));
        assert_eq!(session.state(), SessionState::Failed);
    }

    #[test]
    fn test_cancelled_session_fails() {
        let mut session = AuditSession::new(AuditConfig::default()).unwrap();
        session.cancel_handle().cancel();
        let err = session
            .run_sources(vec![("Bank.sol".into(), BANK.into())])
            .unwrap_err();
        assert!(matches!(err, AuditError::Cancelled));
        assert_eq!(session.state(), SessionState::Failed);
    }

    #[test]
    fn test_external_corroboration_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("Bank.sol");
        std::fs::write(&file, BANK).unwrap();

        let record = ExternalFinding {
            tool: "slither".into(),
            rule_id: "reentrancy-eth".into(),
            severity: "High".into(),
            confidence: "Medium".into(),
            path: "Bank.sol".into(),
            line: 5,
            end_line: Some(10),
            contract: None,
            function: None,
            description: "Reentrancy in Bank.withdraw()".into(),
        };

        let mut session = AuditSession::new(AuditConfig::default())
            .unwrap()
            .with_analyzer(Box::new(Canned(vec![record])));
        let report = session.run(&[file]).unwrap();

        let reentrancy: Vec<_> = report
            .findings()
            .iter()
            .filter(|f| f.rule_id == "reentrancy")
            .collect();
        assert_eq!(reentrancy.len(), 1);
        assert_eq!(reentrancy[0].source, FindingSource::Both);
        assert_eq!(reentrancy[0].confidence, Confidence::Confirmed);
        assert_eq!(reentrancy[0].severity, Severity::High);
    }

    #[test]
    fn test_external_failure_degrades_to_internal_results() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("Bank.sol");
        std::fs::write(&file, BANK).unwrap();

        let mut session = AuditSession::new(AuditConfig::default())
            .unwrap()
            .with_analyzer(Box::new(Broken));
        let report = session.run(&[file]).unwrap();

        assert_eq!(session.state(), SessionState::Done);
        assert!(report.findings().iter().any(|f| f.rule_id == "reentrancy"));
        assert!(report
            .diagnostics()
            .iter()
            .any(|d| d.kind == DiagnosticKind::ExternalTool));
    }

    #[test]
    fn test_sequential_and_parallel_agree() {
        let sources = vec![
            ("Bank.sol".to_string(), BANK.to_string()),
            ("Other.sol".to_string(), BANK.replace("Bank", "Other")),
        ];
        let sequential = AuditSession::new(AuditConfig {
            parallel: false,
            ..AuditConfig::default()
        })
        .unwrap()
        .run_sources(sources.clone())
        .unwrap();
        let parallel = AuditSession::new(AuditConfig::default())
            .unwrap()
            .run_sources(sources)
            .unwrap();
        assert_eq!(sequential.findings(), parallel.findings());
    }
}
