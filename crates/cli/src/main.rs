use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

mod commands;
use commands::{detectors::DetectorsArgs, scan::ScanArgs};

#[derive(Parser)]
#[command(name = "solaudit")]
#[command(about = "Vulnerability scanner for Solidity smart contracts")]
#[command(version)]
struct Cli {
    /// Log pipeline progress to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Audit Solidity files or directories
    Scan(ScanArgs),

    /// List the built-in detectors
    Detectors(DetectorsArgs),
}

fn init_tracing(verbose: bool) -> Result<()> {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

fn run(cli: Cli) -> Result<i32> {
    init_tracing(cli.verbose)?;
    match cli.command {
        Commands::Scan(args) => commands::scan::execute(args, cli.verbose),
        Commands::Detectors(args) => commands::detectors::execute(args),
    }
}

fn main() {
    let cli = Cli::parse();
    let code = match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {:#}", e);
            2
        }
    };
    std::process::exit(code);
}
