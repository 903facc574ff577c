//! Suite orchestration
//!
//! Runs catalog cases one at a time, in catalog order. Each selected case gets
//! a child scope of the suite context, so its deadline is the earlier of the
//! case timeout and whatever is left of the suite budget. Successful cases have
//! their wall-clock duration handed to the [`MetricsReporter`]. Under
//! [`FailurePolicy::AbortOnFirstFailure`] the first failed case ends the run.

use crate::catalog::{CaseDescriptor, CaseRegistry};
use crate::config::{FailurePolicy, LoadTestConfig};
use crate::context::ExecutionContext;
use crate::errors::{CaseError, LoadTestError, LoadTestResult};
use crate::events::{RunEvent, RunObserver, TracingObserver};
use crate::logging;
use crate::metrics::{MetricsReporter, ReportOutcome};
use crate::selector::{self, RunFilter, SkipReason};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::Instrument;
use uuid::Uuid;

/// Drives a catalog of cases under one suite deadline
pub struct Orchestrator {
    reporter: MetricsReporter,
    observer: Arc<dyn RunObserver>,
    run_filter: RunFilter,
}

/// What happened to one catalog entry
#[derive(Debug, Clone, Serialize)]
pub struct CaseOutcome {
    pub case: String,
    #[serde(flatten)]
    pub status: CaseStatus,
}

/// Result of one case
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CaseStatus {
    Skipped {
        reason: SkipReason,
    },
    Passed {
        duration_secs: f64,
        metrics: MetricsStatus,
    },
    Failed {
        duration_secs: f64,
        error: CaseError,
    },
}

/// Fate of a passed case's duration sample
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum MetricsStatus {
    Disabled,
    Pushed,
    PushFailed { error: String },
}

/// Aggregate result of a suite run
#[derive(Debug, Clone, Serialize)]
pub struct SuiteReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub elapsed_secs: f64,
    pub policy: FailurePolicy,
    /// Outcomes in execution order; cases after an abort are absent
    pub outcomes: Vec<CaseOutcome>,
    /// Case whose failure stopped the suite
    pub aborted_after: Option<String>,
}

impl CaseOutcome {
    pub fn is_passed(&self) -> bool {
        matches!(self.status, CaseStatus::Passed { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.status, CaseStatus::Failed { .. })
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self.status, CaseStatus::Skipped { .. })
    }
}

impl SuiteReport {
    /// True when no executed case failed
    pub fn passed(&self) -> bool {
        !self.outcomes.iter().any(CaseOutcome::is_failed)
    }

    pub fn executed(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.is_skipped()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_failed()).count()
    }

    pub fn skipped(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_skipped()).count()
    }

    pub fn outcome(&self, case: &str) -> Option<&CaseOutcome> {
        self.outcomes.iter().find(|o| o.case == case)
    }

    /// Names of cases that ran, in order
    pub fn executed_cases(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|o| !o.is_skipped())
            .map(|o| o.case.as_str())
            .collect()
    }

    /// `Err(SuiteFailed)` if any case failed
    pub fn into_result(self) -> LoadTestResult<SuiteReport> {
        if self.passed() {
            Ok(self)
        } else {
            Err(LoadTestError::SuiteFailed {
                failed: self.failed(),
                executed: self.executed(),
            })
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl Default for Orchestrator {
    fn default() -> Self {
        Self::new(MetricsReporter::http())
    }
}

impl Orchestrator {
    pub fn new(reporter: MetricsReporter) -> Self {
        Self {
            reporter,
            observer: Arc::new(TracingObserver),
            run_filter: RunFilter::all(),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn RunObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Invocation-time filter applied on top of the configured allow-list
    pub fn with_run_filter(mut self, filter: RunFilter) -> Self {
        self.run_filter = filter;
        self
    }

    pub fn reporter(&self) -> &MetricsReporter {
        &self.reporter
    }

    fn emit(&self, event: RunEvent) {
        self.observer.on_event(&event);
    }

    /// Run every selected case of `registry` under `cfg`
    pub async fn run(&self, registry: &CaseRegistry, cfg: Arc<LoadTestConfig>) -> SuiteReport {
        let run_id = Uuid::new_v4();
        let span = logging::suite_span(&run_id.to_string(), registry.len());
        let report = self.run_suite(run_id, registry, cfg).instrument(span.clone()).await;
        span.record("passed", report.passed());
        report
    }

    async fn run_suite(&self, run_id: Uuid, registry: &CaseRegistry, cfg: Arc<LoadTestConfig>) -> SuiteReport {
        let started_at = Utc::now();
        let clock = Instant::now();
        let suite = ExecutionContext::with_timeout(cfg.suite_timeout());

        self.emit(RunEvent::SuiteStarted {
            run_id,
            catalog_size: registry.len(),
            suite_timeout: cfg.suite_timeout(),
        });

        let mut outcomes = Vec::with_capacity(registry.len());
        let mut aborted_after = None;

        for descriptor in registry.iter() {
            if let Err(reason) =
                selector::selection(descriptor.name(), &cfg.selected_cases, &self.run_filter)
            {
                self.emit(RunEvent::CaseSkipped {
                    case: descriptor.name().to_string(),
                    reason,
                });
                outcomes.push(CaseOutcome {
                    case: descriptor.name().to_string(),
                    status: CaseStatus::Skipped { reason },
                });
                continue;
            }

            let outcome = self.run_case(descriptor, &suite, &cfg).await;
            let failed = outcome.is_failed();
            outcomes.push(outcome);

            if failed && cfg.failure_policy == FailurePolicy::AbortOnFirstFailure {
                self.emit(RunEvent::SuiteAborted {
                    failed_case: descriptor.name().to_string(),
                });
                aborted_after = Some(descriptor.name().to_string());
                break;
            }
        }

        drop(suite);

        let report = SuiteReport {
            run_id,
            started_at,
            elapsed_secs: clock.elapsed().as_secs_f64(),
            policy: cfg.failure_policy,
            outcomes,
            aborted_after,
        };

        self.emit(RunEvent::SuiteFinished {
            run_id,
            passed: report.passed(),
            executed: report.executed(),
            failed: report.failed(),
        });

        report
    }

    async fn run_case(
        &self,
        descriptor: &CaseDescriptor,
        suite: &ExecutionContext,
        cfg: &Arc<LoadTestConfig>,
    ) -> CaseOutcome {
        let case = descriptor.name().to_string();
        let span = logging::case_span(&case);
        let start_time = Instant::now();

        // The suite budget is already spent: fail without starting the body.
        if let Some(error) = suite.err() {
            return self.case_failed(case, Duration::ZERO, error, &span);
        }

        let scope = suite.child(cfg.case_timeout());
        self.emit(RunEvent::CaseStarted {
            case: case.clone(),
            budget: scope.remaining(),
        });

        let body = descriptor.invoke(scope.context(), cfg.clone());
        let result = match tokio::spawn(body.instrument(span.clone())).await {
            Ok(result) => result,
            Err(join_error) => Err(CaseError::failed(format!("case panicked: {}", join_error))),
        };
        drop(scope);

        let duration = start_time.elapsed();
        match result {
            Ok(()) => self.case_passed(case, duration, cfg, &span).await,
            Err(error) => self.case_failed(case, duration, error, &span),
        }
    }

    async fn case_passed(
        &self,
        case: String,
        duration: Duration,
        cfg: &LoadTestConfig,
        span: &tracing::Span,
    ) -> CaseOutcome {
        span.record("result", "passed");
        span.record("duration_secs", duration.as_secs_f64());
        self.emit(RunEvent::CasePassed {
            case: case.clone(),
            duration,
        });

        let metrics = match self.reporter.report(&case, duration, &cfg.metrics_gateway).await {
            ReportOutcome::Disabled => MetricsStatus::Disabled,
            ReportOutcome::Pushed { duration_secs } => {
                self.emit(RunEvent::MetricsPushed {
                    case: case.clone(),
                    duration_secs,
                });
                MetricsStatus::Pushed
            }
            ReportOutcome::PushFailed { error, .. } => {
                self.emit(RunEvent::MetricsPushFailed {
                    case: case.clone(),
                    error: error.to_string(),
                });
                MetricsStatus::PushFailed {
                    error: error.to_string(),
                }
            }
        };

        CaseOutcome {
            case,
            status: CaseStatus::Passed {
                duration_secs: duration.as_secs_f64(),
                metrics,
            },
        }
    }

    fn case_failed(&self, case: String, duration: Duration, error: CaseError, span: &tracing::Span) -> CaseOutcome {
        span.record("result", "failed");
        span.record("duration_secs", duration.as_secs_f64());
        self.emit(RunEvent::CaseFailed {
            case: case.clone(),
            error: error.clone(),
        });

        CaseOutcome {
            case,
            status: CaseStatus::Failed {
                duration_secs: duration.as_secs_f64(),
                error,
            },
        }
    }
}
