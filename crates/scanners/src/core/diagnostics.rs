use crate::core::error::{DetectorError, ExternalToolError, ParseError};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    Parse,
    Detector,
    ExternalTool,
    Input,
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse => write!(f, "parse"),
            Self::Detector => write!(f, "detector"),
            Self::ExternalTool => write!(f, "external-tool"),
            Self::Input => write!(f, "input"),
        }
    }
}

/// A recoverable problem recorded during a session.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub path: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub detector: Option<String>,

    pub message: String,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            path: None,
            detector: None,
            message: message.into(),
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_detector(mut self, detector: impl Into<String>) -> Self {
        self.detector = Some(detector.into());
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.kind)?;
        if let Some(path) = &self.path {
            write!(f, " {}", path)?;
        }
        if let Some(detector) = &self.detector {
            write!(f, " ({})", detector)?;
        }
        write!(f, ": {}", self.message)
    }
}

impl From<&ParseError> for Diagnostic {
    fn from(e: &ParseError) -> Self {
        Diagnostic::new(DiagnosticKind::Parse, e.to_string()).with_path(e.path.clone())
    }
}

impl From<&DetectorError> for Diagnostic {
    fn from(e: &DetectorError) -> Self {
        Diagnostic::new(DiagnosticKind::Detector, e.message.clone())
            .with_path(e.path.clone())
            .with_detector(e.detector.clone())
    }
}

impl From<&ExternalToolError> for Diagnostic {
    fn from(e: &ExternalToolError) -> Self {
        Diagnostic::new(DiagnosticKind::ExternalTool, e.to_string())
    }
}
