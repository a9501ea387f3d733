//! Solaudit Scanners - pattern-based vulnerability detection for Solidity
//!
//! Source files are turned into a lightweight [`SourceUnit`] model, a fixed
//! set of detectors runs over every unit, and their findings are merged with
//! those of an optional external analyzer into one ranked [`AuditReport`].
//! [`AuditSession`] drives the whole pipeline.

pub mod analysis;
pub mod core;
pub mod detectors;
pub mod external;
pub mod model;
pub mod runner;
pub mod session;

pub use crate::core::{
    AuditConfig, AuditError, Confidence, Detector, Diagnostic, DiagnosticKind, Finding,
    FindingMerger, FindingSource, Location, Severity,
};
pub use external::{CommandAnalyzer, ExternalAnalyzer, ExternalFinding, ExternalFindingAdapter};
pub use model::{SourceModelBuilder, SourceUnit};
pub use runner::{DetectorInfo, DetectorRegistry};
pub use session::{audit_path, AuditReport, AuditSession, CancelHandle, SessionState, SeveritySummary};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
