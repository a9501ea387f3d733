use crate::core::{ExternalOutputFormat, ExternalToolConfig, ExternalToolError};
use crate::external::ExternalFinding;
use serde::Deserialize;
use std::io::{ErrorKind, Read};
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(20);
const STDERR_EXCERPT: usize = 512;

/// A static analyzer that runs outside the engine.
pub trait ExternalAnalyzer: Send + Sync {
    fn name(&self) -> &str;

    /// Analyzes `target` (a file or directory). Never retried by the caller.
    fn analyze(&self, target: &Path) -> Result<Vec<ExternalFinding>, ExternalToolError>;
}

/// Runs a configured program with the target path as its last argument and
/// reads findings from its stdout.
pub struct CommandAnalyzer {
    config: ExternalToolConfig,
}

impl CommandAnalyzer {
    pub fn new(config: ExternalToolConfig) -> Self {
        Self { config }
    }

    fn spawn(&self, target: &Path) -> Result<Child, ExternalToolError> {
        Command::new(&self.config.program)
            .args(&self.config.args)
            .arg(target)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| ExternalToolError::Spawn {
                program: self.config.program.clone(),
                source,
            })
    }

    fn io_error(&self, source: std::io::Error) -> ExternalToolError {
        ExternalToolError::Io {
            program: self.config.program.clone(),
            source,
        }
    }
}

impl ExternalAnalyzer for CommandAnalyzer {
    fn name(&self) -> &str {
        &self.config.program
    }

    fn analyze(&self, target: &Path) -> Result<Vec<ExternalFinding>, ExternalToolError> {
        let program = self.config.program.clone();
        info!("Running {} on {}", program, target.display());

        let mut child = self.spawn(target)?;
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let deadline = Instant::now() + self.config.timeout();
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) if Instant::now() >= deadline => {
                    warn!("{} exceeded {}s, killing it", program, self.config.timeout_secs);
                    // The process may have exited in between; either way it is gone.
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(ExternalToolError::Timeout {
                        program,
                        timeout_secs: self.config.timeout_secs,
                    });
                }
                Ok(None) => thread::sleep(POLL_INTERVAL),
                Err(e) => return Err(self.io_error(e)),
            }
        };

        let output = collect(stdout).map_err(|e| self.io_error(e))?;
        let errors = collect(stderr).map_err(|e| self.io_error(e))?;

        let code = status.code();
        if !code.map_or(false, |c| self.config.success_exit_codes.contains(&c)) {
            let mut excerpt = errors.trim().to_string();
            if excerpt.len() > STDERR_EXCERPT {
                let mut cut = STDERR_EXCERPT;
                while !excerpt.is_char_boundary(cut) {
                    cut -= 1;
                }
                excerpt.truncate(cut);
            }
            return Err(ExternalToolError::NonZeroExit {
                program,
                code,
                stderr: excerpt,
            });
        }

        let records = match self.config.format {
            ExternalOutputFormat::JsonLines => parse_json_lines(&program, &output)?,
            ExternalOutputFormat::SlitherJson => parse_slither_json(&program, &output)?,
        };
        debug!("{} produced {} record(s)", program, records.len());
        Ok(records)
    }
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Option<JoinHandle<std::io::Result<String>>> {
    pipe.map(|mut pipe| {
        thread::spawn(move || {
            let mut buffer = Vec::new();
            pipe.read_to_end(&mut buffer)?;
            Ok(String::from_utf8_lossy(&buffer).into_owned())
        })
    })
}

fn collect(handle: Option<JoinHandle<std::io::Result<String>>>) -> std::io::Result<String> {
    match handle {
        Some(handle) => handle
            .join()
            .unwrap_or_else(|_| Err(std::io::Error::new(ErrorKind::Other, "output reader panicked"))),
        None => Ok(String::new()),
    }
}

/// One JSON object per non-empty line.
pub fn parse_json_lines(program: &str, text: &str) -> Result<Vec<ExternalFinding>, ExternalToolError> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(number, line)| {
            let mut record: ExternalFinding =
                serde_json::from_str(line).map_err(|e| ExternalToolError::MalformedOutput {
                    program: program.to_string(),
                    message: format!("line {}: {}", number + 1, e),
                })?;
            if record.tool.is_empty() {
                record.tool = program.to_string();
            }
            Ok(record)
        })
        .collect()
}

#[derive(Deserialize)]
struct SlitherOutput {
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    results: SlitherResults,
}

#[derive(Deserialize, Default)]
struct SlitherResults {
    #[serde(default)]
    detectors: Vec<SlitherDetector>,
}

#[derive(Deserialize)]
struct SlitherDetector {
    check: String,
    #[serde(default)]
    impact: String,
    #[serde(default)]
    confidence: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    elements: Vec<SlitherElement>,
}

#[derive(Deserialize)]
struct SlitherElement {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    source_mapping: Option<SourceMapping>,
    #[serde(default)]
    type_specific_fields: Option<TypeSpecificFields>,
}

#[derive(Deserialize)]
struct SourceMapping {
    #[serde(default)]
    filename_relative: Option<String>,
    #[serde(default)]
    filename_absolute: Option<String>,
    #[serde(default)]
    filename_short: Option<String>,
    #[serde(default)]
    lines: Vec<usize>,
}

#[derive(Deserialize)]
struct TypeSpecificFields {
    #[serde(default)]
    parent: Option<Box<SlitherElement>>,
}

impl SlitherElement {
    fn parent(&self) -> Option<&SlitherElement> {
        self.type_specific_fields
            .as_ref()
            .and_then(|t| t.parent.as_deref())
    }

    /// Nearest enclosing element of `kind`, this one included.
    fn enclosing(&self, kind: &str) -> Option<&SlitherElement> {
        let mut current = Some(self);
        while let Some(element) = current {
            if element.kind == kind {
                return Some(element);
            }
            current = element.parent();
        }
        None
    }
}

/// The document written by `slither <target> --json -`.
pub fn parse_slither_json(program: &str, text: &str) -> Result<Vec<ExternalFinding>, ExternalToolError> {
    let malformed = |message: String| ExternalToolError::MalformedOutput {
        program: program.to_string(),
        message,
    };

    let output: SlitherOutput =
        serde_json::from_str(text.trim()).map_err(|e| malformed(e.to_string()))?;
    if output.success == Some(false) {
        return Err(malformed(
            output
                .error
                .unwrap_or_else(|| "analysis reported failure".to_string()),
        ));
    }

    let records = output
        .results
        .detectors
        .into_iter()
        .map(|detector| {
            let anchor = detector
                .elements
                .iter()
                .find(|e| e.kind == "function" || e.kind == "node")
                .or_else(|| detector.elements.first());

            let mapping = anchor.and_then(|e| e.source_mapping.as_ref());
            let path = mapping
                .and_then(|m| {
                    m.filename_relative
                        .clone()
                        .or_else(|| m.filename_absolute.clone())
                        .or_else(|| m.filename_short.clone())
                })
                .unwrap_or_default();
            let line = mapping.and_then(|m| m.lines.first().copied()).unwrap_or(0);
            let end_line = mapping.and_then(|m| m.lines.last().copied());

            ExternalFinding {
                tool: program.to_string(),
                rule_id: detector.check,
                severity: detector.impact,
                confidence: detector.confidence,
                path,
                line,
                end_line,
                contract: anchor
                    .and_then(|e| e.enclosing("contract"))
                    .map(|e| e.name.clone()),
                function: anchor
                    .and_then(|e| e.enclosing("function"))
                    .map(|e| e.name.clone()),
                description: detector.description.trim().to_string(),
            }
        })
        .collect();

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SLITHER: &str = r#"{
      "success": true,
      "error": null,
      "results": {
        "detectors": [
          {
            "check": "reentrancy-eth",
            "impact": "High",
            "confidence": "Medium",
            "description": "Reentrancy in Bank.withdraw() (contracts/Bank.sol#5-10)\n",
            "elements": [
              {
                "type": "function",
                "name": "withdraw",
                "source_mapping": {
                  "filename_relative": "contracts/Bank.sol",
                  "lines": [5, 6, 7, 8, 9, 10]
                },
                "type_specific_fields": {
                  "parent": { "type": "contract", "name": "Bank" },
                  "signature": "withdraw()"
                }
              }
            ]
          },
          {
            "check": "solc-version",
            "impact": "Informational",
            "confidence": "High",
            "description": "Pragma version ^0.8.0 allows old versions",
            "elements": []
          }
        ]
      }
    }"#;

    #[test]
    fn test_parse_slither_document() {
        let records = parse_slither_json("slither", SLITHER).unwrap();
        assert_eq!(records.len(), 2);

        let r = &records[0];
        assert_eq!(r.rule_id, "reentrancy-eth");
        assert_eq!(r.path, "contracts/Bank.sol");
        assert_eq!(r.line, 5);
        assert_eq!(r.end_line, Some(10));
        assert_eq!(r.contract.as_deref(), Some("Bank"));
        assert_eq!(r.function.as_deref(), Some("withdraw"));
        assert!(!r.description.ends_with('\n'));

        assert_eq!(records[1].line, 0);
        assert_eq!(records[1].function, None);
    }

    #[test]
    fn test_failed_slither_run_is_malformed() {
        let err = parse_slither_json("slither", r#"{"success": false, "error": "solc not found"}"#)
            .unwrap_err();
        assert!(err.to_string().contains("solc not found"));
    }

    #[test]
    fn test_parse_json_lines() {
        let text = r#"
{"check": "tx-origin", "impact": "Medium", "file": "a.sol", "line": 4, "message": "uses tx.origin"}

{"rule_id": "custom", "path": "b.sol", "tool": "mytool"}
"#;
        let records = parse_json_lines("scanner", text).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].rule_id, "tx-origin");
        assert_eq!(records[0].tool, "scanner");
        assert_eq!(records[0].description, "uses tx.origin");
        assert_eq!(records[1].tool, "mytool");
        assert_eq!(records[1].line, 0);
    }

    #[test]
    fn test_json_lines_error_names_the_line() {
        let err = parse_json_lines("scanner", "{\"check\": \"x\", \"path\": \"a\"}\nnot json").unwrap_err();
        assert!(matches!(err, ExternalToolError::MalformedOutput { .. }));
        assert!(err.to_string().contains("line 2"));
    }

    #[cfg(unix)]
    mod process {
        use super::*;
        use std::io::Write;

        fn shell(script: &str, timeout_secs: u64) -> CommandAnalyzer {
            CommandAnalyzer::new(ExternalToolConfig {
                program: "sh".to_string(),
                args: vec!["-c".to_string(), script.to_string(), "sh".to_string()],
                timeout_secs,
                ..ExternalToolConfig::default()
            })
        }

        #[test]
        fn test_reads_records_from_stdout() {
            let mut file = tempfile::NamedTempFile::new().unwrap();
            writeln!(file, r#"{{"check": "timestamp", "path": "a.sol", "line": 3}}"#).unwrap();

            let records = shell("cat \"$1\"", 10).analyze(file.path()).unwrap();
            assert_eq!(records.len(), 1);
            assert_eq!(records[0].rule_id, "timestamp");
            assert_eq!(records[0].tool, "sh");
        }

        #[test]
        fn test_non_zero_exit_is_reported() {
            let err = shell("echo boom >&2; exit 3", 10)
                .analyze(Path::new("a.sol"))
                .unwrap_err();
            match err {
                ExternalToolError::NonZeroExit { code, stderr, .. } => {
                    assert_eq!(code, Some(3));
                    assert_eq!(stderr, "boom");
                }
                other => panic!("unexpected error: {other}"),
            }
        }

        #[test]
        fn test_timeout_kills_the_process() {
            let started = Instant::now();
            let err = shell("sleep 30", 1).analyze(Path::new("a.sol")).unwrap_err();
            assert!(matches!(err, ExternalToolError::Timeout { timeout_secs: 1, .. }));
            assert!(started.elapsed() < Duration::from_secs(10));
        }

        #[test]
        fn test_missing_program_is_a_spawn_error() {
            let analyzer = CommandAnalyzer::new(ExternalToolConfig {
                program: "solaudit-no-such-tool".to_string(),
                ..ExternalToolConfig::default()
            });
            let err = analyzer.analyze(Path::new("a.sol")).unwrap_err();
            assert!(matches!(err, ExternalToolError::Spawn { .. }));
        }
    }
}
