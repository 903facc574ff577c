//! End-to-end suite runs against scripted cases

use super::utils::{harness, init_test_logging, scripted_registry, FakePusher, Script};
use loadtest_orchestrator::metrics::Grouping;
use loadtest_orchestrator::{
    CaseError, CaseStatus, ConfigBuilder, FailurePolicy, LoadTestConfig, LoadTestError,
    MetricsStatus, RunEvent, RunFilter, SkipReason,
};
use std::sync::Arc;
use std::time::Duration;

const QUICK: Script = Script::Succeed(Duration::from_millis(10));

#[tokio::test]
async fn test_all_cases_run_in_order_without_gateway() {
    init_test_logging();
    let (registry, invoked) = scripted_registry(&[("mint", QUICK), ("send", QUICK)]);
    let pusher = Arc::new(FakePusher::default());
    let h = harness(pusher.clone());

    let report = h
        .orchestrator
        .run(&registry, Arc::new(LoadTestConfig::default()))
        .await;

    assert!(report.passed());
    assert_eq!(*invoked.lock(), vec!["mint".to_string(), "send".to_string()]);
    assert_eq!(report.executed_cases(), vec!["mint", "send"]);
    assert_eq!(pusher.push_count(), 0);
    assert!(h.gauge.is_empty());
    assert!(matches!(
        report.outcome("mint").unwrap().status,
        CaseStatus::Passed { metrics: MetricsStatus::Disabled, .. }
    ));
}

#[tokio::test]
async fn test_allow_list_skips_unlisted_cases() {
    let (registry, invoked) = scripted_registry(&[("mint", QUICK), ("send", QUICK)]);
    let h = harness(Arc::new(FakePusher::default()));
    let cfg = ConfigBuilder::new().selected_cases(["send"]).build().unwrap();

    let report = h.orchestrator.run(&registry, Arc::new(cfg)).await;

    assert!(report.passed());
    assert_eq!(*invoked.lock(), vec!["send".to_string()]);
    assert_eq!(
        h.observer.skipped_cases(),
        vec![("mint".to_string(), SkipReason::NotConfigured)]
    );
    assert_eq!(report.skipped(), 1);
    assert_eq!(report.executed(), 1);
}

#[tokio::test]
async fn test_unknown_allow_list_names_are_ignored() {
    let (registry, invoked) = scripted_registry(&[("mint", QUICK)]);
    let h = harness(Arc::new(FakePusher::default()));
    let cfg = ConfigBuilder::new()
        .selected_cases(["mint", "does-not-exist"])
        .build()
        .unwrap();

    let report = h.orchestrator.run(&registry, Arc::new(cfg)).await;

    assert!(report.passed());
    assert_eq!(*invoked.lock(), vec!["mint".to_string()]);
    assert_eq!(report.outcomes.len(), 1);
}

#[tokio::test]
async fn test_first_failure_aborts_suite() {
    let (registry, invoked) = scripted_registry(&[("mint", Script::Fail), ("send", QUICK)]);
    let pusher = Arc::new(FakePusher::default());
    let h = harness(pusher.clone());
    let cfg = ConfigBuilder::new().gateway("localhost", 9091).build().unwrap();

    let report = h.orchestrator.run(&registry, Arc::new(cfg)).await;

    assert!(!report.passed());
    assert_eq!(*invoked.lock(), vec!["mint".to_string()]);
    assert_eq!(report.aborted_after.as_deref(), Some("mint"));
    assert!(report.outcome("send").is_none());
    // failed cases never produce a duration sample
    assert_eq!(pusher.push_count(), 0);
    assert!(h.gauge.get("mint").is_none());
    assert_eq!(
        h.observer
            .count(|e| matches!(e, RunEvent::SuiteAborted { failed_case } if failed_case == "mint")),
        1
    );

    match report.into_result() {
        Err(LoadTestError::SuiteFailed { failed, executed }) => {
            assert_eq!(failed, 1);
            assert_eq!(executed, 1);
        }
        other => panic!("expected SuiteFailed, got {:?}", other),
    }
}

#[tokio::test]
async fn test_run_all_policy_continues_after_failure() {
    let (registry, invoked) = scripted_registry(&[
        ("mint", Script::Fail),
        ("send", QUICK),
        ("burn", Script::Fail),
    ]);
    let h = harness(Arc::new(FakePusher::default()));
    let cfg = ConfigBuilder::new()
        .failure_policy(FailurePolicy::RunAll)
        .build()
        .unwrap();

    let report = h.orchestrator.run(&registry, Arc::new(cfg)).await;

    assert_eq!(invoked.lock().len(), 3);
    assert_eq!(report.failed(), 2);
    assert_eq!(report.executed(), 3);
    assert!(report.outcome("send").unwrap().is_passed());
    assert!(report.aborted_after.is_none());
    assert!(!report.passed());
    assert_eq!(
        h.observer.count(|e| matches!(e, RunEvent::SuiteAborted { .. })),
        0
    );
}

#[tokio::test(start_paused = true)]
async fn test_successful_case_duration_is_pushed() {
    let (registry, _) = scripted_registry(&[("mint", Script::Succeed(Duration::from_millis(3200)))]);
    let pusher = Arc::new(FakePusher::default());
    let h = harness(pusher.clone());
    let cfg = ConfigBuilder::new().gateway("pushgateway", 9091).build().unwrap();

    let report = h.orchestrator.run(&registry, Arc::new(cfg)).await;

    assert!(report.passed());
    let recorded = h.gauge.get("mint").expect("duration recorded");
    assert!((recorded - 3.2).abs() < 0.01, "recorded {}", recorded);

    let pushes = pusher.pushes.lock();
    assert_eq!(pushes.len(), 1);
    let (gateway, grouping, payload) = &pushes[0];
    assert_eq!(gateway.host, "pushgateway");
    assert_eq!(*grouping, Grouping::for_case("mint"));
    assert!(payload.contains("# TYPE test_duration_seconds gauge"));
    assert!(payload.contains("test_duration_seconds{test_name=\"mint\"}"));
    drop(pushes);

    assert_eq!(
        h.observer
            .count(|e| matches!(e, RunEvent::MetricsPushed { case, .. } if case == "mint")),
        1
    );
}

#[tokio::test]
async fn test_push_failure_does_not_fail_case() {
    let (registry, invoked) = scripted_registry(&[("mint", QUICK), ("send", QUICK)]);
    let pusher = Arc::new(FakePusher::failing());
    let h = harness(pusher.clone());
    let cfg = ConfigBuilder::new().gateway("localhost", 9091).build().unwrap();

    let report = h.orchestrator.run(&registry, Arc::new(cfg)).await;

    assert!(report.passed());
    assert_eq!(invoked.lock().len(), 2);
    assert_eq!(pusher.push_count(), 2);
    assert_eq!(
        h.observer
            .count(|e| matches!(e, RunEvent::MetricsPushFailed { case, .. } if case == "mint")),
        1
    );
    assert!(matches!(
        &report.outcome("mint").unwrap().status,
        CaseStatus::Passed { metrics: MetricsStatus::PushFailed { .. }, .. }
    ));
    // the sample stays in the collector even though the push failed
    assert!(h.gauge.get("mint").is_some());
}

#[tokio::test(start_paused = true)]
async fn test_case_deadline_fails_hung_case() {
    let (registry, invoked) = scripted_registry(&[("hang", Script::Hang), ("send", QUICK)]);
    let h = harness(Arc::new(FakePusher::default()));
    let cfg = ConfigBuilder::new()
        .case_timeout(Duration::from_secs(5))
        .build()
        .unwrap();

    let report = h.orchestrator.run(&registry, Arc::new(cfg)).await;

    assert_eq!(*invoked.lock(), vec!["hang".to_string()]);
    match &report.outcome("hang").unwrap().status {
        CaseStatus::Failed {
            error: CaseError::DeadlineExceeded { elapsed },
            ..
        } => assert!(*elapsed >= Duration::from_secs(5)),
        other => panic!("expected deadline failure, got {:?}", other),
    }
    assert_eq!(report.aborted_after.as_deref(), Some("hang"));
}

#[tokio::test(start_paused = true)]
async fn test_sub_second_case_timeout_is_honoured() {
    let (registry, _) = scripted_registry(&[("hang", Script::Hang)]);
    let h = harness(Arc::new(FakePusher::default()));
    let cfg = ConfigBuilder::new()
        .case_timeout(Duration::from_millis(500))
        .build()
        .unwrap();

    let report = h.orchestrator.run(&registry, Arc::new(cfg)).await;

    let budgets: Vec<Duration> = h
        .observer
        .events()
        .into_iter()
        .filter_map(|e| match e {
            RunEvent::CaseStarted { budget, .. } => Some(budget),
            _ => None,
        })
        .collect();
    assert_eq!(budgets, vec![Duration::from_millis(500)]);
    match &report.outcome("hang").unwrap().status {
        CaseStatus::Failed {
            duration_secs,
            error: CaseError::DeadlineExceeded { .. },
        } => assert!(*duration_secs < 0.6, "hang ran {}s", duration_secs),
        other => panic!("expected deadline failure, got {:?}", other),
    }
}

#[tokio::test(start_paused = true)]
async fn test_suite_deadline_caps_later_cases() {
    let (registry, _) = scripted_registry(&[
        ("mint", Script::Succeed(Duration::from_secs(6))),
        ("send", Script::Hang),
    ]);
    let h = harness(Arc::new(FakePusher::default()));
    let cfg = ConfigBuilder::new()
        .suite_timeout(Duration::from_secs(10))
        .case_timeout(Duration::from_secs(60))
        .build()
        .unwrap();

    let report = h.orchestrator.run(&registry, Arc::new(cfg)).await;

    assert!(report.outcome("mint").unwrap().is_passed());
    match &report.outcome("send").unwrap().status {
        CaseStatus::Failed {
            duration_secs,
            error: CaseError::DeadlineExceeded { .. },
        } => assert!(*duration_secs < 4.1, "send ran {}s", duration_secs),
        other => panic!("expected deadline failure, got {:?}", other),
    }
    assert!(report.elapsed_secs < 10.1);
}

#[tokio::test]
async fn test_run_filter_composes_with_allow_list() {
    let (registry, invoked) = scripted_registry(&[("mint", QUICK), ("send", QUICK), ("burn", QUICK)]);
    let h = harness(Arc::new(FakePusher::default()));
    let orchestrator = h
        .orchestrator
        .with_run_filter(RunFilter::new(Some("^(send|burn)$")).unwrap());
    let cfg = ConfigBuilder::new()
        .selected_cases(["mint", "send"])
        .build()
        .unwrap();

    let report = orchestrator.run(&registry, Arc::new(cfg)).await;

    assert!(report.passed());
    assert_eq!(*invoked.lock(), vec!["send".to_string()]);
    assert_eq!(
        h.observer.skipped_cases(),
        vec![
            ("mint".to_string(), SkipReason::FilteredOut),
            ("burn".to_string(), SkipReason::NotConfigured),
        ]
    );
}

#[tokio::test]
async fn test_suite_events_bracket_the_run() {
    let (registry, _) = scripted_registry(&[("mint", QUICK)]);
    let h = harness(Arc::new(FakePusher::default()));

    let report = h
        .orchestrator
        .run(&registry, Arc::new(LoadTestConfig::default()))
        .await;

    let events = h.observer.events();
    assert!(matches!(
        events.first(),
        Some(RunEvent::SuiteStarted { catalog_size: 1, .. })
    ));
    match events.last() {
        Some(RunEvent::SuiteFinished {
            run_id,
            passed,
            executed,
            failed,
        }) => {
            assert_eq!(*run_id, report.run_id);
            assert!(*passed);
            assert_eq!(*executed, 1);
            assert_eq!(*failed, 0);
        }
        other => panic!("expected SuiteFinished, got {:?}", other),
    }
}
