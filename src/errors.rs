//! Error types and handling for the load-test orchestrator
//!
//! Errors are split by concern:
//! - Configuration loading and validation
//! - Case execution (scenario failures, deadlines, spawned commands)
//! - Metrics push to the aggregation gateway
//!
//! Only configuration and case errors are suite-fatal. Metrics errors are
//! logged and swallowed by the reporter.

use serde::Serialize;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Main error type for the orchestrator
#[derive(Error, Debug)]
pub enum LoadTestError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Case error: {0}")]
    Case(#[from] CaseError),

    #[error("Metrics error: {0}")]
    Metrics(#[from] MetricsError),

    #[error("Invalid run filter: {0}")]
    RunFilter(#[from] regex::Error),

    #[error("Invalid case registration: name={name:?}, reason={reason}")]
    InvalidCase { name: String, reason: String },

    #[error("Suite failed: {failed} of {executed} executed cases failed")]
    SuiteFailed { failed: usize, executed: usize },
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigurationError {
    #[error("Missing required configuration: {key}")]
    MissingRequired { key: String },

    #[error("Invalid configuration value: key={key}, value={value}, reason={reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },

    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },

    #[error("Configuration parsing failed: {reason}")]
    ParsingFailed { reason: String },

    #[error("Environment variable error: {var}, error={error}")]
    EnvironmentVariable { var: String, error: String },
}

/// Errors a case can report back to the orchestrator.
///
/// A fired deadline is an ordinary case failure, not a separate fault class.
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CaseError {
    #[error("Deadline exceeded after {elapsed:?}")]
    DeadlineExceeded { elapsed: Duration },

    #[error("Case cancelled")]
    Cancelled,

    #[error("Scenario failed: {reason}")]
    ScenarioFailed { reason: String },

    #[error("Failed to spawn command `{command}`: {reason}")]
    SpawnFailed { command: String, reason: String },

    #[error("Command `{command}` exited with status {status}")]
    CommandExited { command: String, status: String },
}

impl CaseError {
    /// Shorthand for a scenario body reporting its own failure
    pub fn failed(reason: impl Into<String>) -> Self {
        CaseError::ScenarioFailed {
            reason: reason.into(),
        }
    }

    /// True for failures caused by a context deadline or cancellation
    pub fn is_deadline(&self) -> bool {
        matches!(
            self,
            CaseError::DeadlineExceeded { .. } | CaseError::Cancelled
        )
    }
}

/// Metrics push errors
#[derive(Error, Debug)]
pub enum MetricsError {
    #[error("Invalid gateway endpoint: {endpoint}, reason={reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    #[error("Connection failed: endpoint={endpoint}, reason={reason}")]
    ConnectionFailed { endpoint: String, reason: String },

    #[error("HTTP error: status={status}, endpoint={endpoint}")]
    HttpError { status: u16, endpoint: String },
}

/// Result type aliases for convenience
pub type LoadTestResult<T> = Result<T, LoadTestError>;
pub type CaseResult<T = ()> = Result<T, CaseError>;
pub type MetricsResult<T> = Result<T, MetricsError>;

/// Severity used when logging errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl LoadTestError {
    /// Severity of the error for log routing
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            LoadTestError::Metrics(_) => ErrorSeverity::Low,
            LoadTestError::Case(_) | LoadTestError::SuiteFailed { .. } => ErrorSeverity::High,
            LoadTestError::Configuration(_)
            | LoadTestError::RunFilter(_)
            | LoadTestError::InvalidCase { .. } => ErrorSeverity::Critical,
        }
    }

    /// Whether the error stops the suite
    pub fn is_suite_fatal(&self) -> bool {
        !matches!(self, LoadTestError::Metrics(_))
    }
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorSeverity::Low => write!(f, "LOW"),
            ErrorSeverity::Medium => write!(f, "MEDIUM"),
            ErrorSeverity::High => write!(f, "HIGH"),
            ErrorSeverity::Critical => write!(f, "CRITICAL"),
        }
    }
}
