//! Shared fixtures for the integration suites

pub mod suite_tests;

/// Test utilities and helpers
pub mod utils {
    use async_trait::async_trait;
    use loadtest_orchestrator::metrics::Grouping;
    use loadtest_orchestrator::{
        CaseError, CaseRegistry, ExecutionContext, GatewayConfig, GaugeVec, MetricsError,
        MetricsPusher, MetricsReporter, Orchestrator, RecordingObserver,
    };
    use parking_lot::Mutex;
    use std::sync::Arc;
    use std::time::Duration;

    /// Initialize test logging with appropriate filters
    pub fn init_test_logging() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("debug,hyper=warn,reqwest=warn")
            .with_test_writer()
            .try_init();
    }

    /// How a scripted case behaves when invoked
    #[derive(Debug, Clone, Copy)]
    pub enum Script {
        /// Sleep on the case context, then succeed
        Succeed(Duration),
        /// Fail straight away
        Fail,
        /// Wait for the context to end and return its error
        Hang,
    }

    /// Pusher that records every call instead of talking HTTP
    #[derive(Default)]
    pub struct FakePusher {
        pub fail: bool,
        pub pushes: Mutex<Vec<(GatewayConfig, Grouping, String)>>,
    }

    impl FakePusher {
        pub fn failing() -> Self {
            Self {
                fail: true,
                ..Self::default()
            }
        }

        pub fn push_count(&self) -> usize {
            self.pushes.lock().len()
        }
    }

    #[async_trait]
    impl MetricsPusher for FakePusher {
        async fn push(
            &self,
            gateway: &GatewayConfig,
            grouping: &Grouping,
            payload: String,
        ) -> Result<(), MetricsError> {
            self.pushes
                .lock()
                .push((gateway.clone(), grouping.clone(), payload));
            if self.fail {
                return Err(MetricsError::ConnectionFailed {
                    endpoint: format!("http://{}:{}", gateway.host, gateway.port),
                    reason: "connection refused".to_string(),
                });
            }
            Ok(())
        }
    }

    /// Catalog built from scripted cases, plus the order they were invoked in
    pub fn scripted_registry(cases: &[(&str, Script)]) -> (CaseRegistry, Arc<Mutex<Vec<String>>>) {
        let invoked = Arc::new(Mutex::new(Vec::new()));
        let mut registry = CaseRegistry::new();

        for (name, script) in cases {
            let name = name.to_string();
            let script = *script;
            let invoked = invoked.clone();
            registry = registry
                .with_case(name.clone(), move |ctx: ExecutionContext, _| {
                    let name = name.clone();
                    let invoked = invoked.clone();
                    async move {
                        invoked.lock().push(name.clone());
                        match script {
                            Script::Succeed(d) => ctx.sleep(d).await,
                            Script::Fail => Err(CaseError::failed(format!("{} rejected", name))),
                            Script::Hang => {
                                ctx.cancelled().await;
                                Err(ctx.err().unwrap_or(CaseError::Cancelled))
                            }
                        }
                    }
                })
                .expect("unique case names");
        }

        (registry, invoked)
    }

    /// Orchestrator wired to a recording observer and the given pusher
    pub struct Harness {
        pub orchestrator: Orchestrator,
        pub observer: Arc<RecordingObserver>,
        pub gauge: Arc<GaugeVec>,
    }

    pub fn harness(pusher: Arc<dyn MetricsPusher>) -> Harness {
        let gauge = Arc::new(GaugeVec::test_duration());
        let observer = Arc::new(RecordingObserver::new());
        let orchestrator = Orchestrator::new(MetricsReporter::new(gauge.clone(), pusher))
            .with_observer(observer.clone());
        Harness {
            orchestrator,
            observer,
            gauge,
        }
    }
}
