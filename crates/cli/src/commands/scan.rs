//! The `scan` command: one audit session over the given inputs.
//!
//! The report goes to stdout in the chosen format; logs and diagnostics go
//! to stderr so JSON output stays machine-readable. With `--fail-on` the
//! exit status reflects whether anything at or above that severity was
//! found, which is what CI gates key on.

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use colored::*;
use solaudit_scanners::{
    core::{ExternalOutputFormat, ExternalToolConfig},
    AuditConfig, AuditReport, AuditSession, Severity,
};
use std::path::PathBuf;
use tracing::info;

#[derive(Args, Clone)]
pub struct ScanArgs {
    /// File or directory to audit; may be repeated
    #[arg(short, long, required = true)]
    pub input: Vec<PathBuf>,

    #[arg(short, long, value_enum, default_value_t = OutputFormat::Console)]
    pub format: OutputFormat,

    /// JSON config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Detector ids to skip, in addition to those in the config file
    #[arg(long = "disable")]
    pub disable: Vec<String>,

    /// Run detectors one unit at a time
    #[arg(long)]
    pub sequential: bool,

    /// External analyzer to run against each input
    #[arg(long)]
    pub external_cmd: Option<String>,

    /// Argument passed to the external analyzer before the target path
    #[arg(long = "external-arg", allow_hyphen_values = true)]
    pub external_args: Vec<String>,

    /// Seconds before the external analyzer is killed
    #[arg(long)]
    pub external_timeout: Option<u64>,

    /// Parse external output as a Slither JSON document instead of JSON lines.
    /// Exit status 255, which Slither uses when it reports findings, is then
    /// accepted as success.
    #[arg(long)]
    pub slither_json: bool,

    /// Exit with status 1 if any finding is at or above this severity
    /// (high, medium or low)
    #[arg(long)]
    pub fail_on: Option<Severity>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Console,
    Json,
    Markdown,
}

impl ScanArgs {
    fn build_config(&self) -> Result<AuditConfig> {
        let mut config = match &self.config {
            Some(path) => AuditConfig::from_file(path)?,
            None => AuditConfig::default(),
        };

        config.disabled_detectors.extend(self.disable.iter().cloned());
        if self.sequential {
            config.parallel = false;
        }

        if let Some(program) = &self.external_cmd {
            let mut tool = config.external.take().unwrap_or_default();
            tool.program = program.clone();
            if !self.external_args.is_empty() {
                tool.args = self.external_args.clone();
            }
            config.external = Some(tool);
        }
        if let Some(tool) = config.external.as_mut() {
            apply_tool_overrides(tool, self.external_timeout, self.slither_json);
        }

        Ok(config)
    }
}

/// Slither exits with this status whenever it reports findings.
const SLITHER_FINDINGS_EXIT: i32 = 255;

fn apply_tool_overrides(tool: &mut ExternalToolConfig, timeout: Option<u64>, slither_json: bool) {
    if let Some(secs) = timeout {
        tool.timeout_secs = secs;
    }
    if slither_json {
        tool.format = ExternalOutputFormat::SlitherJson;
        if !tool.success_exit_codes.contains(&SLITHER_FINDINGS_EXIT) {
            tool.success_exit_codes.push(SLITHER_FINDINGS_EXIT);
        }
    }
}

pub fn execute(args: ScanArgs, verbose: bool) -> Result<i32> {
    let config = args.build_config()?;
    let mut session = AuditSession::new(config)?;
    let report = session
        .run(&args.input)
        .context("Audit did not complete")?;
    info!(
        "Audited {} unit(s), {} finding(s)",
        report.units_analyzed(),
        report.findings().len()
    );

    output_report(&report, args.format, verbose)?;

    let code = match args.fail_on {
        Some(threshold) if report.summary().at_least(threshold) > 0 => 1,
        _ => 0,
    };
    Ok(code)
}

fn output_report(report: &AuditReport, format: OutputFormat, verbose: bool) -> Result<()> {
    match format {
        OutputFormat::Console => print_console(report, verbose),
        OutputFormat::Json => println!("{}", report.to_json()?),
        OutputFormat::Markdown => println!("{}", report.to_markdown()),
    }

    if format != OutputFormat::Console {
        for diagnostic in report.diagnostics() {
            eprintln!("warning: {}", diagnostic);
        }
    }
    Ok(())
}

fn print_console(report: &AuditReport, verbose: bool) {
    println!(
        "{}",
        format!("Audited {} source unit(s)", report.units_analyzed()).bold()
    );

    let findings = report.findings();
    if findings.is_empty() {
        println!("{}", "✅ No issues found".bright_green());
    } else {
        let summary = report.summary();
        println!(
            "⚠️  Found {} issue(s): {} high, {} medium, {} low",
            summary.total,
            summary.high.to_string().bright_red(),
            summary.medium.to_string().yellow(),
            summary.low.to_string().bright_yellow()
        );

        for (i, finding) in findings.iter().enumerate() {
            println!(
                "\n{}. {} {}: {}",
                i + 1,
                finding.severity.emoji(),
                finding.severity.to_string().color(finding.severity.color()).bold(),
                finding.title
            );
            println!("   {}", finding.location.to_string().dimmed());
            println!(
                "   Rule: {} | Confidence: {} | Reported by: {}",
                finding.rule_id, finding.confidence, finding.source
            );
            println!("   {}", finding.message);
            if verbose && !finding.remediation.is_empty() {
                println!("   Fix: {}", finding.remediation);
            }
        }
    }

    let diagnostics = report.diagnostics();
    if !diagnostics.is_empty() {
        println!(
            "\n{}",
            format!("{} diagnostic(s):", diagnostics.len()).yellow()
        );
        for diagnostic in diagnostics {
            println!("   - {}", diagnostic);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(input: &str) -> ScanArgs {
        ScanArgs {
            input: vec![PathBuf::from(input)],
            format: OutputFormat::Json,
            config: None,
            disable: Vec::new(),
            sequential: false,
            external_cmd: None,
            external_args: Vec::new(),
            external_timeout: None,
            slither_json: false,
            fail_on: None,
        }
    }

    #[test]
    fn test_flags_override_defaults() {
        let mut scan = args("contracts");
        scan.disable = vec!["timestamp".to_string()];
        scan.sequential = true;
        scan.external_cmd = Some("slither".to_string());
        scan.external_args = vec!["--json".to_string(), "-".to_string()];
        scan.external_timeout = Some(5);
        scan.slither_json = true;

        let config = scan.build_config().unwrap();
        assert!(!config.parallel);
        assert!(!config.is_detector_enabled("timestamp"));
        let tool = config.external.unwrap();
        assert_eq!(tool.program, "slither");
        assert_eq!(tool.args, vec!["--json", "-"]);
        assert_eq!(tool.timeout_secs, 5);
        assert_eq!(tool.format, ExternalOutputFormat::SlitherJson);
        assert_eq!(tool.success_exit_codes, vec![0, 255]);
    }

    #[test]
    fn test_json_lines_tool_keeps_strict_exit_codes() {
        let mut scan = args("contracts");
        scan.external_cmd = Some("mythril-lines".to_string());

        let tool = scan.build_config().unwrap().external.unwrap();
        assert_eq!(tool.format, ExternalOutputFormat::JsonLines);
        assert_eq!(tool.success_exit_codes, vec![0]);
    }

    #[test]
    fn test_no_external_tool_by_default() {
        let config = args("contracts").build_config().unwrap();
        assert!(config.external.is_none());
        assert!(config.parallel);
    }

    #[test]
    fn test_fail_on_parses_severity_names() {
        use clap::Parser;

        #[derive(Parser)]
        struct Harness {
            #[command(flatten)]
            scan: ScanArgs,
        }

        let parsed = Harness::try_parse_from(["scan", "-i", "contracts", "--fail-on", "Medium"]).unwrap();
        assert_eq!(parsed.scan.fail_on, Some(Severity::Medium));
        assert!(Harness::try_parse_from(["scan", "-i", "contracts", "--fail-on", "critical"]).is_err());
    }
}
