use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use tokio::sync::{broadcast, Mutex, OnceCell};
use tracing::{debug, info, warn};

use crate::{
    asset::{AssetMaterializer, AssetStore, ModelAsset},
    config::{ConcurrencyPolicy, SessionConfig},
    engine::{EngineFactory, EngineHandle, EngineOptions},
    error::{Result, SessionError},
    metrics::{as_gib, MetricsCollector, MetricsSnapshot},
    types::{AnalysisOutcome, SessionEvent, SessionState},
};

use super::builder::SessionBuilder;
use super::prompt::compose_prompt;
use super::response::parse_json_response;

/// Owns at most one engine handle and serves prompt/response requests.
///
/// The handle is built on first use: the model asset is materialized into
/// the runtime directory, then the factory constructs the handle from it.
/// A failed initialization leaves the session `Uninitialized` and the next
/// call tries again; a successful one is never repeated.
pub struct SessionManager {
    config: SessionConfig,
    asset: ModelAsset,
    materializer: AssetMaterializer,
    factory: Arc<dyn EngineFactory>,

    // Runtime state
    engine: OnceCell<ReadyEngine>,
    gate: Mutex<()>,
    latest: RwLock<Latest>,
    metrics: MetricsCollector,
    events: broadcast::Sender<SessionEvent>,
}

struct ReadyEngine {
    handle: Arc<dyn EngineHandle>,
    options: EngineOptions,
    load_time: Duration,
}

#[derive(Default)]
struct Latest {
    response: Option<String>,
    error: Option<SessionError>,
}

impl SessionManager {
    /// Create a manager; no I/O happens until the first request.
    pub fn new(config: SessionConfig, store: Arc<dyn AssetStore>, factory: Arc<dyn EngineFactory>) -> Self {
        let asset = config.asset.model_asset();
        let runtime_dir = config.asset.resolved_runtime_dir(&config.app_name);
        let materializer = AssetMaterializer::new(store, runtime_dir).with_refresh(config.asset.refresh);
        let (events, _) = broadcast::channel(config.session.event_capacity.max(1));
        let metrics = MetricsCollector::new(config.monitoring.enable_metrics);

        Self {
            config,
            asset,
            materializer,
            factory,
            engine: OnceCell::new(),
            gate: Mutex::new(()),
            latest: RwLock::new(Latest::default()),
            metrics,
            events,
        }
    }

    /// Create a new session builder
    pub fn builder() -> SessionBuilder {
        SessionBuilder::new()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn asset(&self) -> &ModelAsset {
        &self.asset
    }

    pub fn state(&self) -> SessionState {
        if self.engine.initialized() {
            SessionState::Ready
        } else {
            SessionState::Uninitialized
        }
    }

    pub fn is_ready(&self) -> bool {
        self.state() == SessionState::Ready
    }

    /// Options the engine handle was constructed from, once `Ready`.
    pub fn options(&self) -> Option<&EngineOptions> {
        self.engine.get().map(|engine| &engine.options)
    }

    /// Text of the most recent successful generation.
    pub fn latest_response(&self) -> Option<String> {
        self.latest.read().response.clone()
    }

    /// Error of the most recent failed operation, cleared by the next success.
    pub fn latest_error(&self) -> Option<SessionError> {
        self.latest.read().error.clone()
    }

    /// Subscribe to readiness, response and failure notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Materialize the model and construct the engine handle if that has not
    /// happened yet. Safe to call any number of times and from concurrent
    /// tasks; only one construction ever succeeds.
    #[tracing::instrument(skip(self), fields(asset = %self.asset))]
    pub async fn ensure_ready(&self) -> Result<()> {
        match self.ready_engine().await {
            Ok(_) => Ok(()),
            Err(err) => Err(self.fail(err, false)),
        }
    }

    /// Compose the prompt, run it through the engine and return the text.
    ///
    /// On failure the latest response keeps its previous value.
    #[tracing::instrument(
        skip_all,
        fields(system_len = system_prompt.len(), payload_len = user_payload.len())
    )]
    pub async fn generate(&self, system_prompt: &str, user_payload: &str) -> Result<String> {
        let _permit = match self.config.session.concurrency {
            ConcurrencyPolicy::Queue => self.gate.lock().await,
            ConcurrencyPolicy::Reject => match self.gate.try_lock() {
                Ok(guard) => guard,
                Err(_) => return Err(self.fail(SessionError::Busy, false)),
            },
        };

        let engine = match self.ready_engine().await {
            Ok(engine) => engine,
            Err(cause) => {
                let err = SessionError::NotInitialized { cause: Box::new(cause) };
                return Err(self.fail(err, false));
            }
        };

        let prompt = compose_prompt(system_prompt, user_payload);
        let rss_before = self.metrics.sample_rss();
        let start = Instant::now();
        let result = match self.config.session.generation_timeout {
            Some(timeout) => match tokio::time::timeout(timeout, engine.handle.generate(&prompt)).await {
                Ok(result) => result.map_err(generation_error),
                Err(_) => Err(SessionError::GenerationTimeout { timeout }),
            },
            None => engine.handle.generate(&prompt).await.map_err(generation_error),
        };

        match result {
            Ok(text) => {
                let latency = start.elapsed();
                let rss_after = self.metrics.sample_rss();
                self.metrics.record_generation(latency, rss_before, rss_after);
                {
                    let mut latest = self.latest.write();
                    latest.response = Some(text.clone());
                    latest.error = None;
                }
                debug!(
                    latency_ms = latency.as_millis() as u64,
                    response_len = text.len(),
                    rss_before_gib = rss_before.map(as_gib),
                    rss_after_gib = rss_after.map(as_gib),
                    "Generation succeeded"
                );
                let _ = self.events.send(SessionEvent::Response {
                    text: text.clone(),
                    latency,
                });
                Ok(text)
            }
            Err(err) => Err(self.fail(err, true)),
        }
    }

    /// Caller-facing analysis call: the response and error as they stand
    /// after the request. A failure leaves the previous response in place.
    pub async fn generate_analysis(&self, system_prompt: &str, summary_data: &str) -> AnalysisOutcome {
        match self.generate(system_prompt, summary_data).await {
            Ok(text) => AnalysisOutcome {
                response: Some(text),
                error: None,
            },
            Err(err) => AnalysisOutcome {
                response: self.latest_response(),
                error: Some(err),
            },
        }
    }

    /// Generate and deserialize the JSON object embedded in the response.
    pub async fn generate_json<T: DeserializeOwned>(&self, system_prompt: &str, user_payload: &str) -> Result<T> {
        let text = self.generate(system_prompt, user_payload).await?;
        parse_json_response(&text).map_err(|err| self.fail(err, false))
    }

    async fn ready_engine(&self) -> Result<&ReadyEngine> {
        if let Some(engine) = self.engine.get() {
            return Ok(engine);
        }
        let mut constructed = false;
        let engine = self
            .engine
            .get_or_try_init(|| {
                constructed = true;
                self.initialize()
            })
            .await?;

        // Announced only once the cell holds the handle, so observers see `Ready`
        if constructed {
            let _ = self.events.send(SessionEvent::Ready {
                load_time: engine.load_time,
            });
        }
        Ok(engine)
    }

    async fn initialize(&self) -> Result<ReadyEngine> {
        let start = Instant::now();
        let model_path = self.materializer.materialize(&self.asset).await?;

        let options = self.config.generation.to_engine_options(model_path.clone());
        let handle = self
            .factory
            .construct(&options)
            .await
            .map_err(|e| SessionError::EngineConstruction {
                model_path: model_path.clone(),
                message: format!("{:#}", e),
            })?;

        let load_time = start.elapsed();
        let asset_bytes = tokio::fs::metadata(&model_path).await.ok().map(|m| m.len());
        let rss = self.metrics.sample_rss();
        self.metrics.record_model_load(load_time, asset_bytes, rss);
        self.latest.write().error = None;

        info!(
            path = %model_path.display(),
            load_ms = load_time.as_millis() as u64,
            max_tokens = options.max_tokens,
            rss_gib = rss.map(as_gib),
            "Engine ready"
        );

        Ok(ReadyEngine {
            handle,
            options,
            load_time,
        })
    }

    /// Record a failure everywhere it is observable and hand it back.
    fn fail(&self, err: SessionError, during_generation: bool) -> SessionError {
        warn!(kind = ?err.kind(), error = %err, "Session operation failed");
        self.metrics.record_error(err.kind(), during_generation);
        self.latest.write().error = Some(err.clone());
        let _ = self.events.send(SessionEvent::Failed {
            kind: err.kind(),
            message: err.to_string(),
        });
        err
    }
}

fn generation_error(err: anyhow::Error) -> SessionError {
    SessionError::Generation {
        message: format!("{:#}", err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::BundleAssetStore;
    use crate::error::ErrorKind;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;
    use tempfile::{tempdir, TempDir};
    use tokio::sync::Notify;
    use tokio_test::{assert_err, assert_ok};

    /// Echoes its input with a suffix; can be told to fail or stall.
    #[derive(Default)]
    struct MockEngine {
        constructions: AtomicUsize,
        calls: AtomicUsize,
        fail_construction: AtomicBool,
        fail_generation: AtomicBool,
        construct_delay: Option<Duration>,
        generate_delay: Option<Duration>,
        gate: Option<(Arc<Notify>, Arc<Notify>)>,
        last_options: parking_lot::Mutex<Option<EngineOptions>>,
    }

    struct MockHandle {
        engine: Arc<MockEngine>,
    }

    struct MockFactory(Arc<MockEngine>);

    #[async_trait::async_trait]
    impl EngineFactory for MockFactory {
        async fn construct(&self, options: &EngineOptions) -> anyhow::Result<Arc<dyn EngineHandle>> {
            if let Some(delay) = self.0.construct_delay {
                tokio::time::sleep(delay).await;
            }
            if self.0.fail_construction.load(Ordering::SeqCst) {
                anyhow::bail!("corrupt weights");
            }
            self.0.constructions.fetch_add(1, Ordering::SeqCst);
            *self.0.last_options.lock() = Some(options.clone());
            Ok(Arc::new(MockHandle { engine: Arc::clone(&self.0) }))
        }
    }

    #[async_trait::async_trait]
    impl EngineHandle for MockHandle {
        async fn generate(&self, input: &str) -> anyhow::Result<String> {
            self.engine.calls.fetch_add(1, Ordering::SeqCst);
            if let Some((started, release)) = &self.engine.gate {
                started.notify_one();
                release.notified().await;
            }
            if let Some(delay) = self.engine.generate_delay {
                tokio::time::sleep(delay).await;
            }
            if self.engine.fail_generation.load(Ordering::SeqCst) {
                anyhow::bail!("resource exhausted");
            }
            Ok(format!("{}-OK", input))
        }
    }

    struct Fixture {
        bundle: TempDir,
        runtime: TempDir,
        engine: Arc<MockEngine>,
    }

    impl Fixture {
        fn new(engine: MockEngine) -> Self {
            Self {
                bundle: tempdir().unwrap(),
                runtime: tempdir().unwrap(),
                engine: Arc::new(engine),
            }
        }

        fn ship_model(&self) {
            std::fs::write(self.bundle.path().join("model.task"), b"weights").unwrap();
        }

        fn config(&self) -> SessionConfig {
            let mut config = SessionConfig::default();
            config.asset.name = "model".to_string();
            config.asset.extension = "task".to_string();
            config.asset.bundle_dir = self.bundle.path().to_path_buf();
            config.asset.runtime_dir = Some(self.runtime.path().join("models"));
            config
        }

        fn manager_with(&self, config: SessionConfig) -> SessionManager {
            SessionManager::new(
                config,
                Arc::new(BundleAssetStore::new(self.bundle.path())),
                Arc::new(MockFactory(Arc::clone(&self.engine))),
            )
        }

        fn manager(&self) -> SessionManager {
            self.manager_with(self.config())
        }

        fn materialized(&self) -> std::path::PathBuf {
            self.runtime.path().join("models").join("model.task")
        }
    }

    #[tokio::test]
    async fn test_end_to_end_generate() {
        let fixture = Fixture::new(MockEngine::default());
        fixture.ship_model();
        let manager = fixture.manager();
        assert_eq!(manager.state(), SessionState::Uninitialized);

        let text = manager.generate("SYS", "{\"a\":1}").await.unwrap();

        assert_eq!(text, "<|system|>SYS\n<|user|>{\"a\":1}-OK");
        assert_eq!(manager.state(), SessionState::Ready);
        assert_eq!(manager.latest_response().as_deref(), Some(text.as_str()));
        assert!(manager.latest_error().is_none());
        assert!(fixture.materialized().is_file());
    }

    #[tokio::test]
    async fn test_single_construction_across_requests() {
        let fixture = Fixture::new(MockEngine::default());
        fixture.ship_model();
        let manager = fixture.manager();

        for i in 0..5 {
            assert_ok!(manager.generate("S", &i.to_string()).await);
        }

        assert_eq!(fixture.engine.constructions.load(Ordering::SeqCst), 1);
        assert_eq!(fixture.engine.calls.load(Ordering::SeqCst), 5);
        let metrics = manager.metrics();
        assert_eq!(metrics.model.constructions, 1);
        assert_eq!(metrics.processing.total_requests, 5);
        assert_eq!(metrics.model.asset_bytes, Some(b"weights".len() as u64));
        assert!(metrics.model.rss_after_load.is_some());
        assert!(metrics.processing.rss_before_last.is_some());
        assert!(metrics.processing.rss_after_last.unwrap() > 0);
    }

    #[tokio::test]
    async fn test_engine_receives_materialized_path_and_budget() {
        let fixture = Fixture::new(MockEngine::default());
        fixture.ship_model();
        let mut config = fixture.config();
        config.generation.max_tokens = 64;
        let manager = fixture.manager_with(config);

        manager.ensure_ready().await.unwrap();

        let options = fixture.engine.last_options.lock().clone().unwrap();
        assert_eq!(options.model_path, fixture.materialized());
        assert_eq!(options.max_tokens, 64);
        assert_eq!(manager.options(), Some(&options));
    }

    #[tokio::test]
    async fn test_retry_after_missing_asset() {
        let fixture = Fixture::new(MockEngine::default());
        let manager = fixture.manager();

        let err = manager.generate("S", "U").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EngineNotInitialized);
        assert_eq!(err.cause().map(SessionError::kind), Some(ErrorKind::AssetNotFound));
        assert_eq!(manager.state(), SessionState::Uninitialized);
        assert_eq!(fixture.engine.calls.load(Ordering::SeqCst), 0);
        assert_eq!(
            manager.latest_error().map(|e| e.kind()),
            Some(ErrorKind::EngineNotInitialized)
        );

        fixture.ship_model();
        let text = manager.generate("S", "U").await.unwrap();
        assert_eq!(text, "<|system|>S\n<|user|>U-OK");
        assert_eq!(manager.state(), SessionState::Ready);
        assert!(manager.latest_error().is_none());
    }

    #[tokio::test]
    async fn test_construction_failure_is_retryable() {
        let fixture = Fixture::new(MockEngine::default());
        fixture.ship_model();
        fixture.engine.fail_construction.store(true, Ordering::SeqCst);
        let manager = fixture.manager();

        let err = manager.ensure_ready().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EngineConstruction);
        assert!(err.to_string().contains("corrupt weights"));
        assert_eq!(manager.state(), SessionState::Uninitialized);
        assert_eq!(manager.latest_error().map(|e| e.kind()), Some(ErrorKind::EngineConstruction));

        fixture.engine.fail_construction.store(false, Ordering::SeqCst);
        assert_ok!(manager.ensure_ready().await);
        assert!(manager.is_ready());
        // Success discards the recorded construction error
        assert!(manager.latest_error().is_none());
    }

    #[tokio::test]
    async fn test_error_does_not_clobber_response() {
        let fixture = Fixture::new(MockEngine::default());
        fixture.ship_model();
        let manager = fixture.manager();

        let first = manager.generate("S", "R1").await.unwrap();
        fixture.engine.fail_generation.store(true, Ordering::SeqCst);

        let err = manager.generate("S", "R2").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EngineGeneration);
        assert_eq!(manager.latest_response(), Some(first));
        assert_eq!(manager.latest_error().map(|e| e.kind()), Some(ErrorKind::EngineGeneration));
        // The handle stays usable
        assert_eq!(manager.state(), SessionState::Ready);

        fixture.engine.fail_generation.store(false, Ordering::SeqCst);
        assert_ok!(manager.generate("S", "R3").await);
        assert!(manager.latest_error().is_none());
        assert_eq!(fixture.engine.constructions.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_generate_analysis_outcome() {
        let fixture = Fixture::new(MockEngine::default());
        fixture.ship_model();
        let manager = fixture.manager();

        let outcome = manager.generate_analysis("SYS", "summary").await;
        assert!(outcome.is_success());
        assert_eq!(outcome.response.as_deref(), Some("<|system|>SYS\n<|user|>summary-OK"));

        fixture.engine.fail_generation.store(true, Ordering::SeqCst);
        let outcome = manager.generate_analysis("SYS", "again").await;
        assert_eq!(outcome.error_kind(), Some(ErrorKind::EngineGeneration));
        assert_eq!(outcome.response.as_deref(), Some("<|system|>SYS\n<|user|>summary-OK"));
    }

    #[tokio::test]
    async fn test_concurrent_first_callers_construct_once() {
        let fixture = Fixture::new(MockEngine {
            construct_delay: Some(Duration::from_millis(50)),
            ..Default::default()
        });
        fixture.ship_model();
        let manager = fixture.manager();

        let results = futures::future::join_all((0..8).map(|_| manager.ensure_ready())).await;

        assert!(results.iter().all(|r| r.is_ok()));
        assert_eq!(fixture.engine.constructions.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_reject_policy_returns_busy() {
        let started = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        let fixture = Fixture::new(MockEngine {
            gate: Some((Arc::clone(&started), Arc::clone(&release))),
            ..Default::default()
        });
        fixture.ship_model();
        let mut config = fixture.config();
        config.session.concurrency = ConcurrencyPolicy::Reject;
        let manager = Arc::new(fixture.manager_with(config));

        let first = {
            let manager = Arc::clone(&manager);
            tokio::spawn(async move { manager.generate("S", "first").await })
        };
        started.notified().await;

        let err = manager.generate("S", "second").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Busy);

        release.notify_one();
        let text = first.await.unwrap().unwrap();
        assert_eq!(text, "<|system|>S\n<|user|>first-OK");
        // The in-flight success supersedes the rejection
        assert!(manager.latest_error().is_none());
    }

    #[tokio::test]
    async fn test_queue_policy_serializes_requests() {
        let fixture = Fixture::new(MockEngine {
            generate_delay: Some(Duration::from_millis(20)),
            ..Default::default()
        });
        fixture.ship_model();
        let manager = fixture.manager();

        let results = futures::future::join_all((0..3).map(|i| {
            let payload = i.to_string();
            let manager = &manager;
            async move { manager.generate("S", &payload).await }
        }))
        .await;

        assert!(results.iter().all(|r| r.is_ok()));
        assert_eq!(fixture.engine.calls.load(Ordering::SeqCst), 3);
        assert_eq!(fixture.engine.constructions.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_generation_timeout_keeps_session_ready() {
        let fixture = Fixture::new(MockEngine {
            generate_delay: Some(Duration::from_millis(500)),
            ..Default::default()
        });
        fixture.ship_model();
        let mut config = fixture.config();
        config.session.generation_timeout = Some(Duration::from_millis(20));
        let manager = fixture.manager_with(config);

        let err = manager.generate("S", "slow").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::GenerationTimeout);
        assert_eq!(manager.state(), SessionState::Ready);
        assert_eq!(manager.latest_response(), None);
    }

    #[tokio::test]
    async fn test_generate_json() {
        #[derive(serde::Deserialize, Debug, PartialEq)]
        struct Payload {
            a: u32,
        }

        struct JsonHandle;

        #[async_trait::async_trait]
        impl EngineHandle for JsonHandle {
            async fn generate(&self, _input: &str) -> anyhow::Result<String> {
                Ok("Here you go:\n```json\n{\"a\": 1}\n```".to_string())
            }
        }

        struct JsonFactory;

        #[async_trait::async_trait]
        impl EngineFactory for JsonFactory {
            async fn construct(&self, _options: &EngineOptions) -> anyhow::Result<Arc<dyn EngineHandle>> {
                Ok(Arc::new(JsonHandle))
            }
        }

        let bundle = tempdir().unwrap();
        let runtime = tempdir().unwrap();
        std::fs::write(bundle.path().join("model.gguf"), b"weights").unwrap();
        let mut config = SessionConfig::default();
        config.asset.bundle_dir = bundle.path().to_path_buf();
        config.asset.runtime_dir = Some(runtime.path().to_path_buf());

        let manager = SessionManager::builder()
            .with_config(config)
            .with_factory(Arc::new(JsonFactory))
            .build()
            .unwrap();

        let payload: Payload = manager.generate_json("S", "U").await.unwrap();
        assert_eq!(payload, Payload { a: 1 });
        assert!(runtime.path().join("model.gguf").is_file());

        // A shape mismatch is recorded but the raw response survives
        #[derive(serde::Deserialize, Debug)]
        struct Other {
            #[allow(dead_code)]
            b: String,
        }
        let err = assert_err!(manager.generate_json::<Other>("S", "U").await);
        assert_eq!(err.kind(), ErrorKind::ResponseParse);
        assert!(manager.latest_response().unwrap().contains("\"a\": 1"));
    }

    #[tokio::test]
    async fn test_events_are_published() {
        let fixture = Fixture::new(MockEngine::default());
        fixture.ship_model();
        let manager = fixture.manager();
        let mut events = manager.subscribe();

        manager.generate("S", "U").await.unwrap();
        fixture.engine.fail_generation.store(true, Ordering::SeqCst);
        let _ = manager.generate("S", "U").await;

        assert!(matches!(events.recv().await.unwrap(), SessionEvent::Ready { .. }));
        match events.recv().await.unwrap() {
            SessionEvent::Response { text, .. } => assert_eq!(text, "<|system|>S\n<|user|>U-OK"),
            other => panic!("unexpected event {:?}", other),
        }
        assert!(matches!(
            events.recv().await.unwrap(),
            SessionEvent::Failed { kind: ErrorKind::EngineGeneration, .. }
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_ready_event_follows_state_transition() {
        let fixture = Fixture::new(MockEngine::default());
        fixture.ship_model();
        let manager = Arc::new(fixture.manager());
        let mut events = manager.subscribe();

        let observer = {
            let manager = Arc::clone(&manager);
            tokio::spawn(async move {
                match events.recv().await.unwrap() {
                    SessionEvent::Ready { .. } => manager.state(),
                    other => panic!("unexpected event {:?}", other),
                }
            })
        };

        manager.ensure_ready().await.unwrap();
        assert_eq!(observer.await.unwrap(), SessionState::Ready);

        // Later calls do not announce readiness again
        let mut later = manager.subscribe();
        manager.ensure_ready().await.unwrap();
        assert!(matches!(
            later.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));
    }

    #[tokio::test]
    async fn test_existing_copy_is_reused_across_managers() {
        let fixture = Fixture::new(MockEngine::default());
        fixture.ship_model();

        fixture.manager().ensure_ready().await.unwrap();
        std::fs::write(fixture.materialized(), b"marker").unwrap();

        // A fresh manager (a process restart) keeps the existing copy
        fixture.manager().ensure_ready().await.unwrap();
        assert_eq!(std::fs::read(fixture.materialized()).unwrap(), b"marker");
    }
}
