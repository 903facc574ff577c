//! Configuration management for the load-test orchestrator
//!
//! This module provides:
//! - Suite and case timeouts
//! - Case allow-list selection
//! - Pushgateway settings for duration reporting
//! - Failure policy and logging options
//! - Command scenario definitions used by the `loadtest` binary
//!
//! Configuration is read from a TOML file, then overridden from `LOADTEST_*`
//! environment variables, then validated. A value that leaves the loader is
//! ready to use.

pub mod scenario;

pub use scenario::ScenarioConfig;

use crate::errors::ConfigurationError;
use crate::logging::LogFormat;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Prefix for environment variable overrides
pub const ENV_PREFIX: &str = "LOADTEST_";

/// Top-level load-test configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadTestConfig {
    /// Upper bound for the whole suite, e.g. `"2h"`
    #[serde(with = "humantime_serde", alias = "test_suite_timeout")]
    pub suite_timeout: Duration,
    /// Upper bound for a single case, e.g. `"10m"` or `"1500ms"`
    #[serde(with = "humantime_serde", alias = "test_timeout")]
    pub case_timeout: Duration,
    /// Cases to run; empty runs every catalog entry
    #[serde(alias = "test_cases")]
    pub selected_cases: Vec<String>,
    /// Pushgateway reporting
    #[serde(alias = "prometheus_gateway")]
    pub metrics_gateway: GatewayConfig,
    /// What happens after a case fails
    pub failure_policy: FailurePolicy,
    /// Log output settings
    pub logging: LoggingConfig,
    /// Command scenarios, in execution order
    pub scenarios: Vec<ScenarioConfig>,
}

/// Prometheus Pushgateway settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub enabled: bool,
    pub host: String,
    pub port: u16,
    /// Request timeout for a single push, in seconds
    pub push_timeout_secs: u64,
}

/// Suite behaviour after a case failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// Stop at the first failed case; later cases never start
    #[default]
    AbortOnFirstFailure,
    /// Run every selected case and fail the suite if any failed
    RunAll,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoadTestConfig {
    fn default() -> Self {
        Self {
            suite_timeout: Duration::from_secs(120 * 60),
            case_timeout: Duration::from_secs(10 * 60),
            selected_cases: Vec::new(),
            metrics_gateway: GatewayConfig::default(),
            failure_policy: FailurePolicy::default(),
            logging: LoggingConfig::default(),
            scenarios: Vec::new(),
        }
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            host: "localhost".to_string(),
            port: 9091,
            push_timeout_secs: 10,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
        }
    }
}

impl GatewayConfig {
    pub fn push_timeout(&self) -> Duration {
        Duration::from_secs(self.push_timeout_secs)
    }
}

impl FromStr for FailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "abort-on-first-failure" | "abort" | "fail-fast" => Ok(FailurePolicy::AbortOnFirstFailure),
            "run-all" | "all" => Ok(FailurePolicy::RunAll),
            other => Err(format!("unknown failure policy `{}`", other)),
        }
    }
}

impl LoadTestConfig {
    pub fn suite_timeout(&self) -> Duration {
        self.suite_timeout
    }

    pub fn case_timeout(&self) -> Duration {
        self.case_timeout
    }

    /// Load from a TOML file, apply environment overrides, and validate
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigurationError> {
        let mut config = Self::from_file_unvalidated(&path)?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file without environment overrides
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigurationError> {
        let config = Self::from_file_unvalidated(&path)?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults plus environment overrides
    pub fn from_env() -> Result<Self, ConfigurationError> {
        let mut config = Self::default();
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a TOML string and validate it
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigurationError> {
        let config: Self = toml::from_str(content).map_err(|e| ConfigurationError::ParsingFailed {
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    fn from_file_unvalidated<P: AsRef<Path>>(path: P) -> Result<Self, ConfigurationError> {
        let content = std::fs::read_to_string(&path).map_err(|_| ConfigurationError::FileNotFound {
            path: path.as_ref().to_string_lossy().to_string(),
        })?;

        toml::from_str(&content).map_err(|e| ConfigurationError::ParsingFailed {
            reason: e.to_string(),
        })
    }

    /// Apply `LOADTEST_*` overrides from the process environment
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigurationError> {
        self.apply_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from any key lookup, keyed by full variable name
    pub fn apply_overrides_from<F>(&mut self, lookup: F) -> Result<(), ConfigurationError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(&format!("{}{}", ENV_PREFIX, name));

        if let Some(value) = var("SUITE_TIMEOUT") {
            self.suite_timeout = parse_duration_env("SUITE_TIMEOUT", &value)?;
        }

        if let Some(value) = var("CASE_TIMEOUT") {
            self.case_timeout = parse_duration_env("CASE_TIMEOUT", &value)?;
        }

        if let Some(value) = var("TEST_CASES") {
            self.selected_cases = value
                .split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(str::to_string)
                .collect();
        }

        if let Some(value) = var("GATEWAY_ENABLED") {
            self.metrics_gateway.enabled = parse_env("GATEWAY_ENABLED", &value)?;
        }

        if let Some(value) = var("GATEWAY_HOST") {
            self.metrics_gateway.host = value;
        }

        if let Some(value) = var("GATEWAY_PORT") {
            self.metrics_gateway.port = parse_env("GATEWAY_PORT", &value)?;
        }

        if let Some(value) = var("FAILURE_POLICY") {
            self.failure_policy = parse_env("FAILURE_POLICY", &value)?;
        }

        if let Some(value) = var("LOG_LEVEL") {
            self.logging.level = value.trim().to_string();
        }

        if let Some(value) = var("LOG_FORMAT") {
            self.logging.format = parse_env("LOG_FORMAT", &value)?;
        }

        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.suite_timeout.is_zero() {
            return Err(ConfigurationError::InvalidValue {
                key: "suite_timeout".to_string(),
                value: "0s".to_string(),
                reason: "Suite timeout must be non-zero".to_string(),
            });
        }

        if self.case_timeout.is_zero() {
            return Err(ConfigurationError::InvalidValue {
                key: "case_timeout".to_string(),
                value: "0s".to_string(),
                reason: "Case timeout must be non-zero".to_string(),
            });
        }

        if self.metrics_gateway.enabled {
            if self.metrics_gateway.host.trim().is_empty() {
                return Err(ConfigurationError::MissingRequired {
                    key: "metrics_gateway.host".to_string(),
                });
            }
            if self.metrics_gateway.port == 0 {
                return Err(ConfigurationError::InvalidValue {
                    key: "metrics_gateway.port".to_string(),
                    value: "0".to_string(),
                    reason: "Port must be non-zero when the gateway is enabled".to_string(),
                });
            }
        }

        let mut seen = HashSet::new();
        for scenario in &self.scenarios {
            scenario.validate()?;
            if !seen.insert(scenario.name.as_str()) {
                return Err(ConfigurationError::InvalidValue {
                    key: "scenarios.name".to_string(),
                    value: scenario.name.clone(),
                    reason: "Scenario names must be unique".to_string(),
                });
            }
        }

        Ok(())
    }
}

fn parse_env<T: FromStr>(name: &str, value: &str) -> Result<T, ConfigurationError>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e: T::Err| ConfigurationError::EnvironmentVariable {
            var: format!("{}{}", ENV_PREFIX, name),
            error: e.to_string(),
        })
}

/// Duration override: a humantime string (`"90s"`, `"1500ms"`) or bare seconds
fn parse_duration_env(name: &str, value: &str) -> Result<Duration, ConfigurationError> {
    let value = value.trim();
    if let Ok(secs) = value.parse::<u64>() {
        return Ok(Duration::from_secs(secs));
    }
    humantime::parse_duration(value).map_err(|e| ConfigurationError::EnvironmentVariable {
        var: format!("{}{}", ENV_PREFIX, name),
        error: e.to_string(),
    })
}

/// Configuration builder for easier setup
pub struct ConfigBuilder {
    config: LoadTestConfig,
}

impl ConfigBuilder {
    /// Create a new builder with default config
    pub fn new() -> Self {
        Self {
            config: LoadTestConfig::default(),
        }
    }

    pub fn suite_timeout(mut self, timeout: Duration) -> Self {
        self.config.suite_timeout = timeout;
        self
    }

    pub fn case_timeout(mut self, timeout: Duration) -> Self {
        self.config.case_timeout = timeout;
        self
    }

    /// Restrict the run to the named cases
    pub fn selected_cases<I, S>(mut self, cases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.selected_cases = cases.into_iter().map(Into::into).collect();
        self
    }

    /// Enable pushing durations to `host:port`
    pub fn gateway(mut self, host: impl Into<String>, port: u16) -> Self {
        self.config.metrics_gateway.enabled = true;
        self.config.metrics_gateway.host = host.into();
        self.config.metrics_gateway.port = port;
        self
    }

    pub fn failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.config.failure_policy = policy;
        self
    }

    pub fn scenario(mut self, scenario: ScenarioConfig) -> Self {
        self.config.scenarios.push(scenario);
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<LoadTestConfig, ConfigurationError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
