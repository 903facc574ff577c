//! Logging configuration and utilities for the load-test orchestrator
//!
//! Provides:
//! - Subscriber setup with text or JSON output
//! - Spans for suite and case execution

use serde::{Deserialize, Serialize};
use std::io;
use std::str::FromStr;
use tracing::Span;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Log line format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format `{}`", other)),
        }
    }
}

/// Initialize the global subscriber.
///
/// `RUST_LOG` wins over `level` when set.
pub fn init_logging(level: &str, format: LogFormat) -> eyre::Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(format!("{},loadtest_orchestrator=debug", level)))?;

    let registry = tracing_subscriber::registry().with(env_filter);

    match format {
        LogFormat::Text => registry
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_names(true)
                    .with_writer(io::stderr),
            )
            .try_init()?,
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .with_target(true)
                    .json()
                    .with_current_span(true)
                    .with_writer(io::stderr),
            )
            .try_init()?,
    }

    tracing::info!(format = ?format, "Load test logging initialized");
    Ok(())
}

/// Span wrapping a whole suite run
pub fn suite_span(run_id: &str, catalog_size: usize) -> Span {
    tracing::info_span!(
        "load_test_suite",
        run_id = %run_id,
        catalog_size = catalog_size,
        passed = tracing::field::Empty,
    )
}

/// Span wrapping one case; `result` and `duration_secs` are recorded on exit
pub fn case_span(case: &str) -> Span {
    tracing::info_span!(
        "load_test_case",
        case = %case,
        result = tracing::field::Empty,
        duration_secs = tracing::field::Empty,
    )
}
