//! Records successful case durations and pushes them to the gateway

use super::push::{Grouping, HttpPushGateway, MetricsPusher};
use super::GaugeVec;
use crate::config::GatewayConfig;
use crate::errors::MetricsError;
use std::sync::Arc;
use std::time::Duration;

/// What happened to one case's duration sample
#[derive(Debug)]
pub enum ReportOutcome {
    /// Gateway reporting is off; nothing was recorded
    Disabled,
    /// Recorded and accepted by the gateway
    Pushed { duration_secs: f64 },
    /// Recorded, but the push failed
    PushFailed { duration_secs: f64, error: MetricsError },
}

impl ReportOutcome {
    pub fn is_pushed(&self) -> bool {
        matches!(self, ReportOutcome::Pushed { .. })
    }
}

/// Duration reporter over an injected collector and pusher
#[derive(Clone)]
pub struct MetricsReporter {
    gauge: Arc<GaugeVec>,
    pusher: Arc<dyn MetricsPusher>,
}

impl MetricsReporter {
    pub fn new(gauge: Arc<GaugeVec>, pusher: Arc<dyn MetricsPusher>) -> Self {
        Self { gauge, pusher }
    }

    /// Reporter with a fresh `test_duration_seconds` family and HTTP pusher
    pub fn http() -> Self {
        Self::new(
            Arc::new(GaugeVec::test_duration()),
            Arc::new(HttpPushGateway::new()),
        )
    }

    pub fn gauge(&self) -> &Arc<GaugeVec> {
        &self.gauge
    }

    /// Record `duration` under `case` and push the family.
    ///
    /// Push errors are returned in the outcome, never raised.
    pub async fn report(&self, case: &str, duration: Duration, gateway: &GatewayConfig) -> ReportOutcome {
        if !gateway.enabled {
            return ReportOutcome::Disabled;
        }

        let duration_secs = duration.as_secs_f64();
        self.gauge.set(case, duration_secs);

        let grouping = Grouping::for_case(case);
        match self.pusher.push(gateway, &grouping, self.gauge.encode()).await {
            Ok(()) => ReportOutcome::Pushed { duration_secs },
            Err(error) => ReportOutcome::PushFailed {
                duration_secs,
                error,
            },
        }
    }
}

impl std::fmt::Debug for MetricsReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricsReporter")
            .field("gauge", &self.gauge.name())
            .field("series", &self.gauge.len())
            .finish_non_exhaustive()
    }
}
