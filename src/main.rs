//! `loadtest` command line entry point
//!
//! Loads the configuration, builds the catalog from its `[[scenarios]]`
//! entries, and runs the suite. The process exits non-zero when the
//! configuration cannot be loaded or any executed case fails.

use clap::Parser;
use loadtest_orchestrator::{
    config::{FailurePolicy, LoadTestConfig},
    logging::{self, LogFormat},
    scenarios, Orchestrator, RunFilter, BUILD_PROFILE, BUILD_TIMESTAMP, VERSION,
};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

#[derive(Debug, Parser)]
#[command(name = "loadtest", version, about = "Run the configured load-test suite")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "loadtest.toml")]
    config: PathBuf,

    /// Only run cases whose name matches this regular expression
    #[arg(long, value_name = "PATTERN")]
    run: Option<String>,

    /// Override the configured failure policy
    #[arg(long, value_enum)]
    policy: Option<FailurePolicy>,

    /// Override the configured log format
    #[arg(long, value_enum)]
    log_format: Option<LogFormat>,

    /// Write the suite report as JSON to this path
    #[arg(long, value_name = "PATH")]
    report: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> eyre::Result<ExitCode> {
    let cli = Cli::parse();

    let mut cfg = LoadTestConfig::load(&cli.config)?;
    if let Some(policy) = cli.policy {
        cfg.failure_policy = policy;
    }
    if let Some(format) = cli.log_format {
        cfg.logging.format = format;
    }

    logging::init_logging(&cfg.logging.level, cfg.logging.format)?;
    tracing::info!(
        version = VERSION,
        build_profile = BUILD_PROFILE,
        build_timestamp = BUILD_TIMESTAMP,
        config = %cli.config.display(),
        "Starting loadtest"
    );

    let registry = scenarios::registry_from_config(&cfg)?;
    if registry.is_empty() {
        tracing::warn!("No scenarios configured; nothing to run");
    }

    let orchestrator = Orchestrator::default().with_run_filter(RunFilter::new(cli.run.as_deref())?);
    let report = orchestrator.run(&registry, Arc::new(cfg)).await;

    if let Some(path) = &cli.report {
        std::fs::write(path, report.to_json()?)?;
        tracing::info!(path = %path.display(), "Wrote suite report");
    }

    Ok(if report.passed() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
