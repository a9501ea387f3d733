use std::path::PathBuf;
use thiserror::Error;

/// A source unit could not be turned into any recognizable declaration.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{path}:{line}:{column}: {message}")]
pub struct ParseError {
    pub path: String,
    pub line: usize,
    pub column: usize,
    pub message: String,
}

/// A single detector failed on a single unit. Other detectors are unaffected.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("detector '{detector}' failed on {path}: {message}")]
pub struct DetectorError {
    pub detector: String,
    pub path: String,
    pub message: String,
}

/// The external analyzer could not deliver findings; the session carries on without them.
#[derive(Debug, Error)]
pub enum ExternalToolError {
    #[error("failed to start '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("'{program}' did not finish within {timeout_secs}s")]
    Timeout { program: String, timeout_secs: u64 },

    #[error("'{program}' exited with status {code:?}: {stderr}")]
    NonZeroExit {
        program: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("could not parse output of '{program}': {message}")]
    MalformedOutput { program: String, message: String },

    #[error("i/o error talking to '{program}': {source}")]
    Io {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// Errors that end a session. Everything else is a diagnostic.
#[derive(Debug, Error)]
pub enum AuditError {
    #[error("cannot audit {}: {reason}", path.display())]
    FatalInput { path: PathBuf, reason: String },

    #[error("audit cancelled")]
    Cancelled,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let e = ParseError {
            path: "a.sol".into(),
            line: 3,
            column: 7,
            message: "unexpected token".into(),
        };
        assert_eq!(e.to_string(), "a.sol:3:7: unexpected token");

        let e = AuditError::FatalInput {
            path: PathBuf::from("missing"),
            reason: "path does not exist".into(),
        };
        assert_eq!(e.to_string(), "cannot audit missing: path does not exist");

        let e = ExternalToolError::Timeout {
            program: "slither".into(),
            timeout_secs: 5,
        };
        assert!(e.to_string().contains("5s"));
    }
}
