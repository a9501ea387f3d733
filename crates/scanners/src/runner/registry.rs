use crate::core::{
    AuditConfig, Confidence, Detector, DetectorError, Diagnostic, Finding, Severity,
};
use crate::detectors::builtin_detectors;
use crate::model::SourceUnit;
use serde::Serialize;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, warn};

/// Ordered set of detectors.
///
/// Registration order is kept and copied into [`Finding::order`], where it
/// serves as the last tie-breaker when the merger ranks findings.
pub struct DetectorRegistry {
    detectors: Vec<Arc<dyn Detector>>,
}

impl DetectorRegistry {
    pub fn new() -> Self {
        Self {
            detectors: Vec::new(),
        }
    }

    /// Built-in detectors minus the ones the config disables.
    pub fn with_defaults(config: &AuditConfig) -> Self {
        let mut registry = Self::new();
        for detector in builtin_detectors(config) {
            if config.is_detector_enabled(detector.id()) {
                registry.register_arc(detector);
            } else {
                debug!("Detector {} disabled by configuration", detector.id());
            }
        }
        registry
    }

    pub fn register<D: Detector + 'static>(&mut self, detector: D) {
        self.register_arc(Arc::new(detector));
    }

    pub fn register_arc(&mut self, detector: Arc<dyn Detector>) {
        self.detectors.push(detector);
    }

    pub fn len(&self) -> usize {
        self.detectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.detectors.is_empty()
    }

    pub fn list_ids(&self) -> Vec<&'static str> {
        self.detectors.iter().map(|d| d.id()).collect()
    }

    pub fn describe(&self) -> Vec<DetectorInfo> {
        self.detectors
            .iter()
            .map(|d| DetectorInfo {
                id: d.id().to_string(),
                name: d.name().to_string(),
                description: d.description().to_string(),
                severity: d.severity(),
                confidence: d.confidence(),
            })
            .collect()
    }

    /// Runs every detector over `unit`.
    ///
    /// A detector that returns an error or panics contributes no findings for
    /// this unit and leaves a diagnostic instead; the others still run.
    pub fn run_all(&self, unit: &SourceUnit) -> (Vec<Finding>, Vec<Diagnostic>) {
        let mut findings = Vec::new();
        let mut diagnostics = Vec::new();

        for (order, detector) in self.detectors.iter().enumerate() {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| detector.detect(unit)));
            let failure = match outcome {
                Ok(Ok(found)) => {
                    debug!("{} reported {} finding(s) in {}", detector.id(), found.len(), unit.path);
                    findings.extend(found.into_iter().map(|mut f| {
                        f.order = order;
                        f
                    }));
                    continue;
                }
                Ok(Err(e)) => format!("{:#}", e),
                Err(payload) => format!("panicked: {}", panic_message(payload.as_ref())),
            };

            let error = DetectorError {
                detector: detector.id().to_string(),
                path: unit.path.clone(),
                message: failure,
            };
            warn!("{}", error);
            diagnostics.push(Diagnostic::from(&error));
        }

        (findings, diagnostics)
    }
}

impl Default for DetectorRegistry {
    fn default() -> Self {
        Self::with_defaults(&AuditConfig::default())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DetectorInfo {
    pub id: String,
    pub name: String,
    pub description: String,
    pub severity: Severity,
    pub confidence: Confidence,
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{DiagnosticKind, Location};
    use crate::model::SourceModelBuilder;
    use anyhow::Result;

    struct Failing;

    impl Detector for Failing {
        fn id(&self) -> &'static str {
            "failing"
        }
        fn name(&self) -> &'static str {
            "Failing"
        }
        fn severity(&self) -> Severity {
            Severity::Low
        }
        fn confidence(&self) -> Confidence {
            Confidence::Possible
        }
        fn detect(&self, _unit: &SourceUnit) -> Result<Vec<Finding>> {
            anyhow::bail!("model has no contracts")
        }
    }

    struct Panicking;

    impl Detector for Panicking {
        fn id(&self) -> &'static str {
            "panicking"
        }
        fn name(&self) -> &'static str {
            "Panicking"
        }
        fn severity(&self) -> Severity {
            Severity::Low
        }
        fn confidence(&self) -> Confidence {
            Confidence::Possible
        }
        fn detect(&self, _unit: &SourceUnit) -> Result<Vec<Finding>> {
            panic!("index out of bounds")
        }
    }

    struct Always(&'static str);

    impl Detector for Always {
        fn id(&self) -> &'static str {
            self.0
        }
        fn name(&self) -> &'static str {
            "Always"
        }
        fn severity(&self) -> Severity {
            Severity::Medium
        }
        fn confidence(&self) -> Confidence {
            Confidence::Likely
        }
        fn detect(&self, unit: &SourceUnit) -> Result<Vec<Finding>> {
            Ok(vec![Finding::new(
                self.0,
                Severity::Medium,
                Confidence::Likely,
                Location::new(unit.path.clone(), 1),
                "always",
            )])
        }
    }

    fn unit() -> SourceUnit {
        SourceModelBuilder::new()
            .unwrap()
            .build("a.sol", "contract A { function f() public {} }")
            .unwrap()
    }

    #[test]
    fn test_defaults_keep_registration_order() {
        let registry = DetectorRegistry::default();
        assert_eq!(
            registry.list_ids(),
            vec![
                "reentrancy",
                "integer_overflow",
                "access_control",
                "tx_origin",
                "unchecked_return",
                "timestamp",
                "gas_limit",
                "constructor_validation",
                "redundant_safemath",
            ]
        );
        assert_eq!(registry.describe()[0].severity, Severity::High);
    }

    #[test]
    fn test_disabled_detectors_are_skipped() {
        let config = AuditConfig {
            disabled_detectors: vec!["timestamp".to_string()],
            ..AuditConfig::default()
        };
        let registry = DetectorRegistry::with_defaults(&config);
        assert!(!registry.list_ids().contains(&"timestamp"));
        assert_eq!(registry.len(), 8);
    }

    #[test]
    fn test_failures_are_isolated() {
        let mut registry = DetectorRegistry::new();
        registry.register(Always("first"));
        registry.register(Failing);
        registry.register(Panicking);
        registry.register(Always("last"));

        let (findings, diagnostics) = registry.run_all(&unit());

        let ids: Vec<_> = findings.iter().map(|f| f.rule_id.as_str()).collect();
        assert_eq!(ids, vec!["first", "last"]);
        assert_eq!(findings[0].order, 0);
        assert_eq!(findings[1].order, 3);

        assert_eq!(diagnostics.len(), 2);
        assert!(diagnostics.iter().all(|d| d.kind == DiagnosticKind::Detector));
        assert_eq!(diagnostics[0].detector.as_deref(), Some("failing"));
        assert!(diagnostics[0].message.contains("model has no contracts"));
        assert!(diagnostics[1].message.contains("index out of bounds"));
    }
}
