use anyhow::Result;
use clap::Args;
use colored::*;
use solaudit_scanners::{AuditConfig, DetectorRegistry};
use std::path::PathBuf;

#[derive(Args, Clone)]
pub struct DetectorsArgs {
    /// Config file whose `disabled_detectors` are honoured
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Print the list as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn execute(args: DetectorsArgs) -> Result<i32> {
    let config = match &args.config {
        Some(path) => AuditConfig::from_file(path)?,
        None => AuditConfig::default(),
    };
    let registry = DetectorRegistry::with_defaults(&config);
    let detectors = registry.describe();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&detectors)?);
        return Ok(0);
    }

    println!("{}", format!("{} detector(s) enabled", detectors.len()).bold());
    for info in &detectors {
        println!(
            "\n{} {} [{}]",
            info.severity.emoji(),
            info.id.bright_cyan().bold(),
            info.severity.to_string().color(info.severity.color())
        );
        println!("   {}", info.name);
        println!("   Confidence: {}", info.confidence);
        if !info.description.is_empty() {
            println!("   {}", info.description);
        }
    }
    Ok(0)
}
