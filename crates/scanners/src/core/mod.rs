pub mod config;
pub mod detector;
pub mod diagnostics;
pub mod error;
pub mod merger;
pub mod remediation;
pub mod result;
pub mod severity;

pub use config::{AuditConfig, ExternalOutputFormat, ExternalToolConfig, RuleMapping};
pub use detector::Detector;
pub use diagnostics::{Diagnostic, DiagnosticKind};
pub use error::{AuditError, DetectorError, ExternalToolError, ParseError};
pub use merger::FindingMerger;
pub use result::{DedupKey, Finding, FindingSource, Location};
pub use severity::{Confidence, Severity};
