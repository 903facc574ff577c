//! # Load Test Orchestrator
//!
//! Runs a catalog of named, long-running load-test cases under two nested
//! deadlines and reports how long each successful case took.
//!
//! - **Case selection**: a configured allow-list plus an invocation-time run filter
//! - **Deadline cascade**: every case scope is capped by what is left of the suite budget
//! - **Failure policy**: abort on the first failed case, or run everything and aggregate
//! - **Duration metrics**: `test_duration_seconds{test_name}` pushed to a Prometheus Pushgateway
//!
//! ## Usage
//!
//! ```rust,no_run
//! use loadtest_orchestrator::{CaseRegistry, CaseError, LoadTestConfig, Orchestrator};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> eyre::Result<()> {
//!     let registry = CaseRegistry::new()
//!         .with_case("mint", |ctx, _cfg| async move {
//!             ctx.sleep(Duration::from_secs(1)).await
//!         })?
//!         .with_case("send", |_ctx, _cfg| async { Err(CaseError::failed("no peers")) })?;
//!
//!     let cfg = Arc::new(LoadTestConfig::load("loadtest.toml")?);
//!     let report = Orchestrator::default().run(&registry, cfg).await;
//!     report.into_result()?;
//!     Ok(())
//! }
//! ```

pub mod catalog;
pub mod config;
pub mod context;
pub mod errors;
pub mod events;
pub mod logging;
pub mod metrics;
pub mod orchestrator;
pub mod scenarios;
pub mod selector;

pub use catalog::{CaseDescriptor, CaseFn, CaseFuture, CaseRegistry};
pub use config::{ConfigBuilder, FailurePolicy, GatewayConfig, LoadTestConfig, ScenarioConfig};
pub use context::{ContextGuard, ExecutionContext};
pub use errors::{
    CaseError, CaseResult, ConfigurationError, ErrorSeverity, LoadTestError, LoadTestResult,
    MetricsError,
};
pub use events::{RecordingObserver, RunEvent, RunObserver, TracingObserver};
pub use metrics::{GaugeVec, HttpPushGateway, MetricSample, MetricsPusher, MetricsReporter};
pub use orchestrator::{CaseOutcome, CaseStatus, MetricsStatus, Orchestrator, SuiteReport};
pub use selector::{should_run, RunFilter, SkipReason};

// Version and build information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const BUILD_TIMESTAMP: &str = env!("BUILD_TIMESTAMP");
pub const BUILD_PROFILE: &str = env!("BUILD_PROFILE");

// Re-export key dependencies for convenience
pub use eyre;
pub use tokio;
pub use tracing;
