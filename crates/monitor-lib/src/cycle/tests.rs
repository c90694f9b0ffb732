//! Cycle tests against in-process collaborators
//!
//! Sources, autoscaler backends and notifiers are mocks that count calls; the
//! store is a real file in a temp directory.

#[cfg(test)]
mod cycle_tests {
    use crate::alert::{AlertChannel, AlertChannels, AlertEvaluator, Breach, Notifier};
    use crate::config::{AlertThresholds, CycleSettings, NamespaceSelection, ScalingPolicy};
    use crate::cycle::{
        LoopConfig, MonitorLoop, MonitoringCycle, NamespaceStatus, ReconcileOutcome,
    };
    use crate::error::{MonitorError, Result, TransportError};
    use crate::models::{PodSnapshot, ScalingDirection};
    use crate::recommend::{RecommendationEngine, REASON_INSUFFICIENT_DATA};
    use crate::reconcile::{HpaBackend, InMemoryHpaBackend, ReconcileResult, Reconciler};
    use crate::source::{parse_cpu_millicores, parse_memory_kib, MetricsSource, MockMetricsSource};
    use crate::store::UsageStore;
    use async_trait::async_trait;
    use k8s_openapi::api::autoscaling::v2::HorizontalPodAutoscaler;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::TempDir;

    /// Serves fixed pods per namespace; unknown namespaces are unreachable
    struct ScriptedSource {
        pods: HashMap<String, Vec<PodSnapshot>>,
        calls: AtomicUsize,
    }

    impl ScriptedSource {
        fn new(pods: Vec<(&str, Vec<PodSnapshot>)>) -> Self {
            Self {
                pods: pods
                    .into_iter()
                    .map(|(ns, pods)| (ns.to_string(), pods))
                    .collect(),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl MetricsSource for ScriptedSource {
        async fn snapshot(&self, namespace: &str) -> Result<Vec<PodSnapshot>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.pods
                .get(namespace)
                .cloned()
                .ok_or_else(|| MonitorError::SourceUnavailable(format!("{} unreachable", namespace)))
        }

        fn name(&self) -> &'static str {
            "scripted"
        }
    }

    /// Rejects lookups for one scale target, delegates the rest
    struct PartiallyFailingBackend {
        failing_name: String,
        inner: InMemoryHpaBackend,
    }

    #[async_trait]
    impl HpaBackend for PartiallyFailingBackend {
        async fn get(
            &self,
            name: &str,
            namespace: &str,
        ) -> Result<Option<HorizontalPodAutoscaler>> {
            if name == self.failing_name {
                return Err(MonitorError::reconcile(name, namespace, "forbidden"));
            }
            self.inner.get(name, namespace).await
        }

        async fn create(&self, namespace: &str, hpa: &HorizontalPodAutoscaler) -> Result<()> {
            self.inner.create(namespace, hpa).await
        }

        async fn replace(
            &self,
            name: &str,
            namespace: &str,
            hpa: &HorizontalPodAutoscaler,
        ) -> Result<()> {
            self.inner.replace(name, namespace, hpa).await
        }

        fn name(&self) -> &'static str {
            "partially-failing"
        }
    }

    struct CountingNotifier {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Notifier for CountingNotifier {
        async fn send(&self, _subject: &str, _body: &str) -> std::result::Result<(), TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn channel(&self) -> AlertChannel {
            AlertChannel::Chat
        }
    }

    fn pod(name: &str, cpu: Option<u64>, memory: Option<u64>) -> PodSnapshot {
        PodSnapshot {
            pod_name: name.to_string(),
            phase: "Running".to_string(),
            cpu_usage: cpu,
            memory_usage: memory,
            deployment: None,
        }
    }

    fn policy() -> ScalingPolicy {
        // Memory threshold in stored units so that CPU alone drives direction
        ScalingPolicy {
            memory_threshold: 1_000_000.0,
            ..ScalingPolicy::default()
        }
    }

    fn build(
        dir: &TempDir,
        source: Arc<dyn MetricsSource>,
        backend: Arc<dyn HpaBackend>,
        channels: AlertChannels,
        settings: CycleSettings,
    ) -> MonitoringCycle {
        MonitoringCycle::new(
            source,
            UsageStore::open(dir.path().join("usage.jsonl")),
            RecommendationEngine::new(policy()),
            Reconciler::new(backend),
            AlertEvaluator::new(AlertThresholds::default(), channels),
            settings,
        )
    }

    fn namespaces(names: &[&str]) -> NamespaceSelection {
        NamespaceSelection::new(names.iter().map(|s| s.to_string()).collect())
    }

    #[tokio::test]
    async fn test_mock_fixture_degrades_to_insufficient_data() {
        let dir = TempDir::new().unwrap();
        let backend = Arc::new(InMemoryHpaBackend::new());
        let cycle = build(
            &dir,
            Arc::new(MockMetricsSource::new()),
            backend.clone(),
            AlertChannels::default(),
            CycleSettings::default(),
        );

        let report = cycle.run(&NamespaceSelection::default()).await;

        assert_eq!(report.namespaces.len(), 1);
        assert_eq!(report.namespaces[0].status, NamespaceStatus::Ok);
        assert_eq!(report.pod_count(), 2);
        for pod in report.pods() {
            assert_eq!(pod.cpu_usage, None);
            assert!(pod.history.is_empty());
            assert_eq!(pod.recommendation.direction, ScalingDirection::None);
            assert_eq!(pod.recommendation.reason, REASON_INSUFFICIENT_DATA);
            assert!(matches!(pod.reconcile, ReconcileOutcome::Skipped(_)));
            assert!(pod.alert.is_none());
        }
        assert_eq!(backend.create_calls(), 0);

        // Absent usage still produces one persisted sample per pod
        let content = std::fs::read_to_string(dir.path().join("usage.jsonl")).unwrap();
        assert_eq!(content.lines().count(), 2);
        assert!(content.contains("N/A"));
    }

    #[tokio::test]
    async fn test_scale_up_creates_then_updates_autoscaler() {
        let dir = TempDir::new().unwrap();
        let backend = Arc::new(InMemoryHpaBackend::new());
        let mut api = pod("api-7c9d-x2b4q", Some(80), Some(50));
        api.deployment = Some("api".to_string());
        let source = Arc::new(ScriptedSource::new(vec![("default", vec![api])]));
        let cycle = build(
            &dir,
            source,
            backend.clone(),
            AlertChannels::default(),
            CycleSettings::default(),
        );

        let first = cycle.run(&NamespaceSelection::default()).await;
        let pod = first.pods().next().unwrap();
        assert_eq!(pod.recommendation.direction, ScalingDirection::Up);
        assert_eq!(pod.recommendation.magnitude, 2);
        assert_eq!(pod.scale_target, "api");
        assert_eq!(pod.reconcile, ReconcileOutcome::Applied(ReconcileResult::Created));

        let second = cycle.run(&NamespaceSelection::default()).await;
        let pod = second.pods().next().unwrap();
        assert_eq!(pod.history.len(), 2);
        assert_eq!(pod.reconcile, ReconcileOutcome::Applied(ReconcileResult::Updated));

        assert_eq!(backend.create_calls(), 1);
        assert_eq!(backend.replace_calls(), 1);

        let spec = backend.object("api-hpa", "default").unwrap().spec.unwrap();
        assert_eq!(spec.scale_target_ref.name, "api");
        let cpu = spec.metrics.unwrap()[0].resource.clone().unwrap();
        assert_eq!(cpu.target.average_utilization, Some(80));
    }

    #[tokio::test]
    async fn test_source_failure_aborts_only_that_namespace() {
        let dir = TempDir::new().unwrap();
        let source = Arc::new(ScriptedSource::new(vec![(
            "default",
            vec![pod("web", Some(30), Some(20))],
        )]));
        let cycle = build(
            &dir,
            source.clone(),
            Arc::new(InMemoryHpaBackend::new()),
            AlertChannels::default(),
            CycleSettings::default(),
        );

        let report = cycle.run(&namespaces(&["broken", "default"])).await;

        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
        match &report.namespaces[0].status {
            NamespaceStatus::Failed { kind, .. } => assert_eq!(kind, "source"),
            other => panic!("unexpected status: {:?}", other),
        }
        assert_eq!(report.namespaces[1].status, NamespaceStatus::Ok);
        assert_eq!(report.failed_namespaces().count(), 1);

        let web = report.pods().next().unwrap();
        assert_eq!(web.recommendation.direction, ScalingDirection::Down);
        assert_eq!(web.recommendation.magnitude, 3);
    }

    #[tokio::test]
    async fn test_storage_failure_aborts_each_namespace() {
        let dir = TempDir::new().unwrap();
        let source = Arc::new(ScriptedSource::new(vec![
            ("a", vec![pod("p", Some(1), Some(1))]),
            ("b", vec![pod("q", Some(1), Some(1))]),
        ]));
        // A directory where the log file should be
        let store_path = dir.path().join("usage.jsonl");
        std::fs::create_dir_all(&store_path).unwrap();

        let cycle = MonitoringCycle::new(
            source,
            UsageStore::open(store_path),
            RecommendationEngine::new(policy()),
            Reconciler::new(Arc::new(InMemoryHpaBackend::new())),
            AlertEvaluator::new(AlertThresholds::default(), AlertChannels::default()),
            CycleSettings::default(),
        );

        let report = cycle.run(&namespaces(&["a", "b"])).await;
        assert_eq!(report.failed_namespaces().count(), 2);
        for ns in &report.namespaces {
            assert!(ns.pods.is_empty());
            match &ns.status {
                NamespaceStatus::Failed { kind, .. } => assert_eq!(kind, "storage"),
                other => panic!("unexpected status: {:?}", other),
            }
        }
    }

    #[tokio::test]
    async fn test_reconcile_failure_does_not_abort_siblings() {
        let dir = TempDir::new().unwrap();
        let source = Arc::new(ScriptedSource::new(vec![(
            "default",
            vec![pod("bad", Some(90), Some(10)), pod("good", Some(90), Some(10))],
        )]));
        let backend = Arc::new(PartiallyFailingBackend {
            failing_name: "bad-hpa".to_string(),
            inner: InMemoryHpaBackend::new(),
        });
        let cycle = build(
            &dir,
            source,
            backend.clone(),
            AlertChannels::default(),
            CycleSettings::default(),
        );

        let report = cycle.run(&NamespaceSelection::default()).await;

        assert_eq!(report.namespaces[0].status, NamespaceStatus::Ok);
        let outcomes: Vec<_> = report.pods().map(|p| p.reconcile.clone()).collect();
        assert!(matches!(outcomes[0], ReconcileOutcome::Failed(_)));
        assert_eq!(outcomes[1], ReconcileOutcome::Applied(ReconcileResult::Created));
        assert_eq!(report.reconcile_failures(), 1);
        assert!(backend.inner.object("good-hpa", "default").is_some());
    }

    #[tokio::test]
    async fn test_empty_namespace_is_not_an_error() {
        let dir = TempDir::new().unwrap();
        let source = Arc::new(ScriptedSource::new(vec![("quiet", vec![])]));
        let cycle = build(
            &dir,
            source,
            Arc::new(InMemoryHpaBackend::new()),
            AlertChannels::default(),
            CycleSettings::default(),
        );

        let report = cycle.run(&namespaces(&["quiet"])).await;
        assert_eq!(report.namespaces[0].status, NamespaceStatus::Empty);
        assert_eq!(report.pod_count(), 0);
        assert_eq!(report.failed_namespaces().count(), 0);
    }

    #[tokio::test]
    async fn test_dry_run_never_touches_backend() {
        let dir = TempDir::new().unwrap();
        let backend = Arc::new(InMemoryHpaBackend::new());
        let source = Arc::new(ScriptedSource::new(vec![(
            "default",
            vec![pod("api", Some(95), Some(10))],
        )]));
        let settings = CycleSettings {
            reconcile: false,
            ..CycleSettings::default()
        };
        let cycle = build(&dir, source, backend.clone(), AlertChannels::default(), settings);

        let report = cycle.run(&NamespaceSelection::default()).await;
        let pod = report.pods().next().unwrap();
        assert_eq!(pod.recommendation.direction, ScalingDirection::Up);
        assert_eq!(pod.reconcile, ReconcileOutcome::Skipped("dry run".to_string()));
        assert_eq!(backend.create_calls(), 0);
        assert_eq!(backend.replace_calls(), 0);
    }

    #[tokio::test]
    async fn test_memory_alert_fires_on_chat_only() {
        let dir = TempDir::new().unwrap();
        let chat = Arc::new(CountingNotifier {
            calls: AtomicUsize::new(0),
        });
        let source = Arc::new(ScriptedSource::new(vec![(
            "default",
            vec![pod("api", Some(10), Some(102400))],
        )]));
        let cycle = build(
            &dir,
            source,
            Arc::new(InMemoryHpaBackend::new()),
            AlertChannels {
                email: None,
                chat: Some(chat.clone()),
            },
            CycleSettings::default(),
        );

        let report = cycle.run(&NamespaceSelection::default()).await;
        let alert = report.pods().next().unwrap().alert.clone().unwrap();
        assert!(alert.triggered());
        assert!(!alert.sent_email);
        assert!(alert.sent_chat);
        assert_eq!(chat.calls.load(Ordering::SeqCst), 1);

        // No cooldown: the next cycle alerts again
        cycle.run(&NamespaceSelection::default()).await;
        assert_eq!(chat.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_namespaces_keep_separate_series() {
        let dir = TempDir::new().unwrap();
        let source = Arc::new(ScriptedSource::new(vec![
            ("a", vec![pod("api", Some(90), Some(10))]),
            ("b", vec![pod("api", Some(20), Some(10))]),
        ]));
        let cycle = build(
            &dir,
            source,
            Arc::new(InMemoryHpaBackend::new()),
            AlertChannels::default(),
            CycleSettings::default(),
        );

        let report = cycle.run(&namespaces(&["a", "b"])).await;
        let directions: Vec<_> = report.pods().map(|p| p.recommendation.direction).collect();
        assert_eq!(directions, vec![ScalingDirection::Up, ScalingDirection::Down]);
    }

    #[tokio::test]
    async fn test_metrics_server_units_compared_raw_against_policy() {
        // Policy thresholds apply to millicores and KiB as stored, so a pod
        // at a quarter core and 100Mi is far over the default 60/60 policy
        let dir = TempDir::new().unwrap();
        let cpu = parse_cpu_millicores("250m");
        let memory = parse_memory_kib("102400Ki");
        assert_eq!((cpu, memory), (Some(250), Some(102400)));

        let mut api = pod("api-5d8f7c9b6-x2x4z", cpu, memory);
        api.deployment = Some("api".to_string());
        let source = Arc::new(ScriptedSource::new(vec![("default", vec![api])]));
        let cycle = MonitoringCycle::new(
            source,
            UsageStore::open(dir.path().join("usage.jsonl")),
            RecommendationEngine::new(ScalingPolicy::default()),
            Reconciler::new(Arc::new(InMemoryHpaBackend::new())),
            AlertEvaluator::new(AlertThresholds::default(), AlertChannels::default()),
            CycleSettings::default(),
        );

        let report = cycle.run(&NamespaceSelection::default()).await;
        let pod = report.pods().next().unwrap();
        assert_eq!(pod.cpu_usage, Some(250));
        assert_eq!(pod.memory_usage, Some(102400));
        assert_eq!(pod.recommendation.direction, ScalingDirection::Up);
        assert_eq!(pod.recommendation.magnitude, 5);

        // Alerts compare CPU raw and memory in Mi
        let alert = pod.alert.clone().unwrap();
        assert_eq!(
            alert.breaches,
            vec![
                Breach::Cpu {
                    value: 250.0,
                    threshold: 80.0
                },
                Breach::Memory {
                    value_mib: 100.0,
                    threshold_mib: 75.0
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_loop_publishes_reports_until_shutdown() {
        let dir = TempDir::new().unwrap();
        let cycle = Arc::new(build(
            &dir,
            Arc::new(MockMetricsSource::new()),
            Arc::new(InMemoryHpaBackend::new()),
            AlertChannels::default(),
            CycleSettings::default(),
        ));
        let (monitor_loop, mut reports) = MonitorLoop::new(
            cycle,
            NamespaceSelection::default(),
            LoopConfig {
                interval: Duration::from_millis(20),
                retention: Some(Duration::from_secs(3600)),
            },
        );

        let (shutdown_tx, shutdown_rx) = tokio::sync::broadcast::channel(1);
        let handle = tokio::spawn(monitor_loop.run(shutdown_rx));

        reports.changed().await.unwrap();
        let report = reports.borrow().clone().unwrap();
        assert_eq!(report.pod_count(), 2);

        shutdown_tx.send(()).unwrap();
        handle.await.unwrap();
    }
}
