//! Suite progress events and the observers that consume them
//!
//! The orchestrator never writes status lines itself. It emits [`RunEvent`]s
//! to a [`RunObserver`]; [`TracingObserver`] turns them into log lines and
//! [`RecordingObserver`] keeps them for inspection.

use crate::errors::CaseError;
use crate::selector::SkipReason;
use parking_lot::Mutex;
use std::time::Duration;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Something that happened during a suite run
#[derive(Debug, Clone, PartialEq)]
pub enum RunEvent {
    SuiteStarted {
        run_id: Uuid,
        catalog_size: usize,
        suite_timeout: Duration,
    },
    CaseSkipped {
        case: String,
        reason: SkipReason,
    },
    CaseStarted {
        case: String,
        /// Budget granted to the case after capping at the suite deadline
        budget: Duration,
    },
    CasePassed {
        case: String,
        duration: Duration,
    },
    CaseFailed {
        case: String,
        error: CaseError,
    },
    MetricsPushed {
        case: String,
        duration_secs: f64,
    },
    MetricsPushFailed {
        case: String,
        error: String,
    },
    /// A failure stopped the suite; later cases were not attempted
    SuiteAborted {
        failed_case: String,
    },
    SuiteFinished {
        run_id: Uuid,
        passed: bool,
        executed: usize,
        failed: usize,
    },
}

impl RunEvent {
    /// Case the event refers to, if any
    pub fn case(&self) -> Option<&str> {
        match self {
            RunEvent::CaseSkipped { case, .. }
            | RunEvent::CaseStarted { case, .. }
            | RunEvent::CasePassed { case, .. }
            | RunEvent::CaseFailed { case, .. }
            | RunEvent::MetricsPushed { case, .. }
            | RunEvent::MetricsPushFailed { case, .. } => Some(case),
            RunEvent::SuiteAborted { failed_case } => Some(failed_case),
            RunEvent::SuiteStarted { .. } | RunEvent::SuiteFinished { .. } => None,
        }
    }
}

/// Sink for suite progress events
pub trait RunObserver: Send + Sync {
    fn on_event(&self, event: &RunEvent);
}

/// Writes every event as a structured log line
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl RunObserver for TracingObserver {
    fn on_event(&self, event: &RunEvent) {
        match event {
            RunEvent::SuiteStarted {
                run_id,
                catalog_size,
                suite_timeout,
            } => info!(
                run_id = %run_id,
                catalog_size = catalog_size,
                suite_timeout_secs = suite_timeout.as_secs_f64(),
                "Starting load test suite"
            ),
            RunEvent::CaseSkipped { case, reason } => info!(
                case = %case,
                reason = %reason,
                "Not running test case '{}' as {}", case, reason
            ),
            RunEvent::CaseStarted { case, budget } => info!(
                case = %case,
                budget_secs = budget.as_secs_f64(),
                "Running test case '{}'", case
            ),
            RunEvent::CasePassed { case, duration } => info!(
                case = %case,
                duration_secs = duration.as_secs_f64(),
                "Test case '{}' passed", case
            ),
            RunEvent::CaseFailed { case, error } => error!(
                case = %case,
                error = %error,
                "Test case '{}' failed", case
            ),
            RunEvent::MetricsPushed { case, duration_secs } => info!(
                case = %case,
                duration_secs = duration_secs,
                "Metrics pushed for test case '{}': duration = {} seconds", case, duration_secs
            ),
            RunEvent::MetricsPushFailed { case, error } => warn!(
                case = %case,
                error = %error,
                "Could not push metrics to Prometheus PushGateway"
            ),
            RunEvent::SuiteAborted { failed_case } => error!(
                case = %failed_case,
                "Aborting suite after test case '{}' failed", failed_case
            ),
            RunEvent::SuiteFinished {
                run_id,
                passed,
                executed,
                failed,
            } => {
                if *passed {
                    info!(run_id = %run_id, executed = executed, "Load test suite passed");
                } else {
                    error!(
                        run_id = %run_id,
                        executed = executed,
                        failed = failed,
                        "Load test suite failed"
                    );
                }
            }
        }
    }
}

/// Keeps every event in memory, in emission order
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<RunEvent>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<RunEvent> {
        self.events.lock().clone()
    }

    /// Names of cases that started, in order
    pub fn started_cases(&self) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .filter_map(|event| match event {
                RunEvent::CaseStarted { case, .. } => Some(case.clone()),
                _ => None,
            })
            .collect()
    }

    /// Names of skipped cases with the reason, in order
    pub fn skipped_cases(&self) -> Vec<(String, SkipReason)> {
        self.events
            .lock()
            .iter()
            .filter_map(|event| match event {
                RunEvent::CaseSkipped { case, reason } => Some((case.clone(), *reason)),
                _ => None,
            })
            .collect()
    }

    /// Number of events matching `predicate`
    pub fn count<F>(&self, predicate: F) -> usize
    where
        F: Fn(&RunEvent) -> bool,
    {
        self.events.lock().iter().filter(|event| predicate(event)).count()
    }
}

impl RunObserver for RecordingObserver {
    fn on_event(&self, event: &RunEvent) {
        self.events.lock().push(event.clone());
    }
}
