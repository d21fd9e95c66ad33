//! trustcheck - verifies that every call site is trusted enough for its callee

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use tabled::{
    settings::{object::Rows, Alignment, Modify, Style},
    Table, Tabled,
};
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use trustcheck_core::{
    config::CONFIG_FILE, qual::QualifierKind, Program, ProgramOracle, TrustVerifier,
    VerificationReport, VerifierConfig,
};

/// Log levels
#[derive(Debug, Clone, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_filter_directive(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

#[derive(Parser, Debug)]
#[clap(
    name = "trustcheck",
    about = "Static verifier for trust-level annotations",
    version
)]
struct Cli {
    #[clap(subcommand)]
    command: Command,

    /// Set log level
    #[clap(long, default_value = "warn", global = true)]
    log_level: LogLevel,
}

#[derive(Parser, Debug)]
enum Command {
    /// Verify one or more program descriptions
    Check {
        /// Program description files (YAML)
        #[clap(required = true)]
        programs: Vec<PathBuf>,

        /// Verifier configuration file
        #[clap(long, default_value = CONFIG_FILE)]
        config: PathBuf,

        /// Output results as JSON
        #[clap(long)]
        json: bool,

        /// Only check receivers, not call arguments
        #[clap(long)]
        receiver_only: bool,

        /// Index declared method levels before checking calls
        #[clap(long)]
        index_methods: bool,
    },

    /// List the active qualifiers and where they may appear
    Qualifiers {
        /// Verifier configuration file
        #[clap(long, default_value = CONFIG_FILE)]
        config: PathBuf,

        /// Output results as JSON
        #[clap(long)]
        json: bool,
    },
}

/// Initialize tracing with CLI flags
fn initialize_tracing(log_level: &LogLevel) {
    let filter = EnvFilter::new(log_level.to_filter_directive());

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr) // Critical: logs to stderr, not stdout
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    initialize_tracing(&cli.log_level);

    match cli.command {
        Command::Check {
            programs,
            config,
            json,
            receiver_only,
            index_methods,
        } => check_command(programs, config, json, receiver_only, index_methods),
        Command::Qualifiers { config, json } => qualifiers_command(config, json),
    }
}

/// Outcome of checking one program file
enum Outcome {
    Verified(VerificationReport),
    Failed { path: PathBuf, message: String },
}

fn check_command(
    programs: Vec<PathBuf>,
    config_path: PathBuf,
    json: bool,
    receiver_only: bool,
    index_methods: bool,
) -> Result<()> {
    let mut config = VerifierConfig::load(&config_path)?;
    if receiver_only {
        config.check_arguments = false;
    }
    if index_methods {
        config.index_methods = true;
    }
    debug!("Verifier configuration: {:?}", config);

    info!("Checking {} program(s)", programs.len());

    let mut outcomes = Vec::with_capacity(programs.len());
    for path in programs {
        match Program::load(&path) {
            Ok(program) => {
                let oracle = ProgramOracle::new(&program);
                let report = TrustVerifier::new(&oracle, config.clone()).verify(&program);
                outcomes.push(Outcome::Verified(report));
            }
            Err(e) => {
                error!("Failed to load {}: {}", path.display(), e);
                outcomes.push(Outcome::Failed {
                    path,
                    message: format!("{:#}", anyhow::Error::from(e)),
                });
            }
        }
    }

    let total_violations: usize = outcomes
        .iter()
        .map(|o| match o {
            Outcome::Verified(report) => report.diagnostics.len(),
            Outcome::Failed { .. } => 0,
        })
        .sum();
    let failed_loads = outcomes
        .iter()
        .filter(|o| matches!(o, Outcome::Failed { .. }))
        .count();

    if json {
        let json_output = serde_json::json!({
            "total_programs": outcomes.len(),
            "total_violations": total_violations,
            "failed_loads": failed_loads,
            "programs": outcomes.iter().map(|o| match o {
                Outcome::Verified(report) => serde_json::to_value(report).unwrap_or_default(),
                Outcome::Failed { path, message } => serde_json::json!({
                    "path": path,
                    "error": message,
                }),
            }).collect::<Vec<_>>()
        });
        println!("{}", serde_json::to_string_pretty(&json_output)?);
    } else {
        print_check_results(&outcomes, total_violations);
    }

    // Exit with error code if verification failed
    if total_violations > 0 || failed_loads > 0 {
        std::process::exit(1);
    }

    Ok(())
}

fn print_check_results(outcomes: &[Outcome], total_violations: usize) {
    for outcome in outcomes {
        match outcome {
            Outcome::Verified(report) if report.passed() => {
                println!("✓ {}", report.program);
            }
            Outcome::Verified(report) => {
                println!("✗ {}", report.program);
                for diagnostic in &report.diagnostics {
                    println!("  {diagnostic}");
                }
            }
            Outcome::Failed { path, message } => {
                println!("✗ {}", path.display());
                println!("  ERROR: {message}");
            }
        }
    }

    // Summary
    println!();
    if total_violations == 0 && outcomes.iter().all(|o| matches!(o, Outcome::Verified(_))) {
        println!("✅ All programs passed trust verification!");
    } else {
        println!(
            "{} violations in {} programs",
            total_violations,
            outcomes.len()
        );
    }
}

// Table row structure for qualifier display
#[derive(Tabled)]
struct QualifierTableRow {
    #[tabled(rename = "Qualifier")]
    name: String,
    #[tabled(rename = "Config Key")]
    key: String,
    #[tabled(rename = "Applies To")]
    targets: String,
}

fn qualifiers_command(config_path: PathBuf, json: bool) -> Result<()> {
    let config = VerifierConfig::load(&config_path)
        .with_context(|| format!("Failed to load {}", config_path.display()))?;
    let registry = config.registry();
    let kinds: Vec<QualifierKind> = registry.kinds().collect();

    if json {
        let output = serde_json::json!({
            "root": registry.top().to_string(),
            "qualifiers": kinds.iter().map(|kind| serde_json::json!({
                "name": kind.to_string(),
                "key": kind,
                "targets": kind.targets(),
            })).collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    let rows: Vec<QualifierTableRow> = kinds
        .iter()
        .map(|kind| QualifierTableRow {
            name: kind.to_string(),
            key: serde_json::to_value(kind)
                .ok()
                .and_then(|v| v.as_str().map(String::from))
                .unwrap_or_default(),
            targets: kind
                .targets()
                .iter()
                .map(|t| t.to_string())
                .collect::<Vec<_>>()
                .join(", "),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Rows::first()).with(Alignment::center()))
        .to_string();
    println!("{table}");
    println!("Root qualifier: {}", registry.top());

    Ok(())
}
