//! Runtime orchestration.
//!
//! [`ConduitRuntime`] owns the configuration, a [`LocalBus`] and the
//! registered adapters. It builds adapters from their config sections,
//! registers them on the bus under their names and drives their lifecycle.
//!
//! ```rust,ignore
//! use conduit_runtime::ConduitRuntime;
//!
//! // Auto-loads conduit.toml from the current directory
//! let runtime = ConduitRuntime::new()?;
//!
//! // Custom configuration path
//! let runtime = ConduitRuntime::builder()
//!     .config_file("config/conduit.toml")
//!     .profile("production")
//!     .build()?;
//! ```

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use conduit_core::{BoxedAdapter, BoxedBus, ConfigurableAdapter, EnvelopeHandler};
use tokio::signal;
use tokio::sync::RwLock;
use tracing::{error, info, warn};

use crate::bus::LocalBus;
use crate::config::{ConduitConfig, ConfigLoader};
use crate::error::{RuntimeError, RuntimeResult};
use crate::logging;

/// Orchestrates adapters and the in-process bus.
pub struct ConduitRuntime {
    config: ConduitConfig,
    bus: Arc<LocalBus>,
    adapters: RwLock<Vec<BoxedAdapter>>,
    running: AtomicBool,
}

impl ConduitRuntime {
    /// Creates a runtime from configuration found in the default locations.
    pub fn new() -> RuntimeResult<Self> {
        Self::builder().build()
    }

    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    /// Creates a runtime from a loaded configuration and initializes logging.
    pub fn from_config(config: ConduitConfig) -> Self {
        logging::init_from_config(&config.logging);

        info!(
            log_level = %config.logging.level,
            log_format = ?config.logging.format,
            adapter_sections = config.adapters.len(),
            "Runtime initialized from configuration"
        );

        Self {
            config,
            bus: Arc::new(LocalBus::new()),
            adapters: RwLock::new(Vec::new()),
            running: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &ConduitConfig {
        &self.config
    }

    /// The bus shared by every adapter and handler.
    pub fn bus(&self) -> &Arc<LocalBus> {
        &self.bus
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub async fn adapter_count(&self) -> usize {
        self.adapters.read().await.len()
    }

    /// Registers a non-adapter handler, such as a session, on the bus.
    pub fn register_handler(
        &self,
        name: impl Into<String>,
        handler: Arc<dyn EnvelopeHandler>,
    ) -> RuntimeResult<()> {
        let name = name.into();
        if self.bus.contains(&name) {
            return Err(RuntimeError::NameTaken(name));
        }
        self.bus.register(name, handler);
        Ok(())
    }

    /// Builds an adapter from its config section and registers it.
    ///
    /// The section is read from `adapters.<config_key>`; when it is missing
    /// the adapter's default config is used. The adapter is addressed on the
    /// bus by its [`name`](conduit_core::Adapter::name).
    ///
    /// ```rust,ignore
    /// runtime.register_adapter::<TelegramAdapter>().await?;
    /// ```
    pub async fn register_adapter<A>(&self) -> RuntimeResult<Arc<A>>
    where
        A: ConfigurableAdapter + 'static,
    {
        let key = A::config_key();

        let config: A::Config = match self.config.adapters.get(key) {
            Some(section) => section.deserialize().map_err(|e| {
                RuntimeError::AdapterConfigDeserialize(format!(
                    "Failed to deserialize config for adapter '{key}': {e}"
                ))
            })?,
            None => {
                warn!(
                    adapter = key,
                    "No configuration found for adapter, using default"
                );
                Default::default()
            }
        };

        let bus: BoxedBus = self.bus.clone();
        let adapter = A::from_config(config, bus)?;
        let name = adapter.name().to_string();

        let mut adapters = self.adapters.write().await;
        if self.bus.contains(&name) {
            return Err(RuntimeError::NameTaken(name));
        }
        self.bus.register(name.clone(), adapter.clone());
        adapters.push(adapter.clone());

        info!(adapter = %name, "Registered adapter");
        Ok(adapter)
    }

    /// Starts every adapter in registration order.
    ///
    /// If one fails, the adapters already started are shut down in reverse
    /// order and the error is returned.
    pub async fn start(&self) -> RuntimeResult<()> {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("Runtime is already running");
            return Ok(());
        }

        info!("Starting Conduit runtime");
        self.bus.reopen();

        let adapters = self.adapters.read().await.clone();
        for (index, adapter) in adapters.iter().enumerate() {
            if let Err(source) = adapter.initialize().await {
                let name = adapter.name().to_string();
                error!(adapter = %name, error = %source, "Failed to start adapter");

                for started in adapters[..index].iter().rev() {
                    started.shutdown().await;
                }
                self.bus.close();
                self.running.store(false, Ordering::SeqCst);
                return Err(RuntimeError::AdapterStart { name, source });
            }
            info!(adapter = %adapter.name(), "Adapter started");
        }

        info!("Runtime started");
        Ok(())
    }

    /// Stops the runtime.
    ///
    /// Adapters first stop taking in platform events. In-flight handlers then
    /// get up to `runtime.shutdown_timeout_secs` to finish while the bus still
    /// routes their replies. Finally the bus is closed and every adapter is
    /// shut down concurrently.
    pub async fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            warn!("Runtime is not running");
            return;
        }

        info!("Stopping Conduit runtime");
        let adapters = self.adapters.read().await.clone();
        futures::future::join_all(adapters.iter().map(|adapter| adapter.stop_receiving())).await;

        self.bus.drain(self.config.runtime.shutdown_timeout()).await;
        self.bus.close();

        futures::future::join_all(adapters.iter().map(|adapter| adapter.shutdown())).await;

        info!("Runtime stopped");
    }

    /// Runs until Ctrl+C or SIGTERM.
    pub async fn run(&self) -> RuntimeResult<()> {
        self.start().await?;
        info!("Conduit runtime is now running. Press Ctrl+C to stop.");

        Self::wait_for_shutdown().await;

        self.stop().await;
        Ok(())
    }

    /// Runs until `shutdown` completes.
    pub async fn run_until<F>(&self, shutdown: F) -> RuntimeResult<()>
    where
        F: Future<Output = ()>,
    {
        self.start().await?;
        shutdown.await;
        self.stop().await;
        Ok(())
    }

    async fn wait_for_shutdown() {
        #[cfg(unix)]
        {
            match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    tokio::select! {
                        _ = Self::ctrl_c() => {}
                        _ = sigterm.recv() => {
                            info!("Received SIGTERM, shutting down");
                        }
                    }
                }
                Err(e) => {
                    warn!(error = %e, "Failed to register SIGTERM handler");
                    Self::ctrl_c().await;
                }
            }
        }

        #[cfg(not(unix))]
        Self::ctrl_c().await;
    }

    async fn ctrl_c() {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(e) => error!(error = %e, "Failed to listen for Ctrl+C, shutting down"),
        }
    }
}

// =============================================================================
// RuntimeBuilder
// =============================================================================

/// Builder for a [`ConduitRuntime`] with custom configuration sources.
pub struct RuntimeBuilder {
    config_loader: ConfigLoader,
}

impl RuntimeBuilder {
    pub fn new() -> Self {
        Self {
            config_loader: ConfigLoader::new(),
        }
    }

    /// Loads exactly this configuration file.
    pub fn config_file<P: AsRef<std::path::Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.file(path);
        self
    }

    /// Sets the configuration profile (e.g. "development", "production").
    pub fn profile(mut self, profile: impl AsRef<str>) -> Self {
        self.config_loader = self.config_loader.profile(profile);
        self
    }

    pub fn search_path<P: AsRef<std::path::Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.search_path(path);
        self
    }

    pub fn with_env(mut self) -> Self {
        self.config_loader = self.config_loader.with_env();
        self
    }

    pub fn without_env(mut self) -> Self {
        self.config_loader = self.config_loader.without_env();
        self
    }

    /// Merges a base configuration that files and environment refine.
    pub fn merge(mut self, config: ConduitConfig) -> Self {
        self.config_loader = self.config_loader.merge(config);
        self
    }

    pub fn build(self) -> RuntimeResult<ConduitRuntime> {
        let config = self.config_loader.load()?;
        Ok(ConduitRuntime::from_config(config))
    }
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use conduit_core::{Adapter, AdapterError, AdapterResult, Envelope, MessageBus, MessageType};
    use figment::value::Value;
    use parking_lot::Mutex;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    #[serde(default)]
    struct FakeConfig {
        name: String,
        fail_start: bool,
    }

    impl Default for FakeConfig {
        fn default() -> Self {
            Self {
                name: "fake".to_string(),
                fail_start: false,
            }
        }
    }

    struct FakeAdapter {
        config: FakeConfig,
        events: Mutex<Vec<String>>,
    }

    impl FakeAdapter {
        fn events(&self) -> Vec<String> {
            self.events.lock().clone()
        }
    }

    #[async_trait]
    impl EnvelopeHandler for FakeAdapter {
        async fn handle(&self, envelope: Envelope) {
            self.events
                .lock()
                .push(format!("handle:{}", envelope.message_type));
        }
    }

    #[async_trait]
    impl Adapter for FakeAdapter {
        fn name(&self) -> &str {
            &self.config.name
        }

        async fn initialize(&self) -> AdapterResult<()> {
            if self.config.fail_start {
                return Err(AdapterError::configuration("refusing to start"));
            }
            self.events.lock().push("initialize".to_string());
            Ok(())
        }

        async fn stop_receiving(&self) {
            self.events.lock().push("stop_receiving".to_string());
        }

        async fn shutdown(&self) {
            self.events.lock().push("shutdown".to_string());
        }
    }

    impl ConfigurableAdapter for FakeAdapter {
        type Config = FakeConfig;

        fn config_key() -> &'static str {
            "fake"
        }

        fn from_config(config: FakeConfig, _bus: BoxedBus) -> AdapterResult<Arc<Self>> {
            Ok(Arc::new(Self {
                config,
                events: Mutex::new(Vec::new()),
            }))
        }
    }

    /// Second adapter type so two adapters can be registered side by side.
    struct OtherAdapter(FakeAdapter);

    #[async_trait]
    impl EnvelopeHandler for OtherAdapter {
        async fn handle(&self, envelope: Envelope) {
            self.0.handle(envelope).await;
        }
    }

    #[async_trait]
    impl Adapter for OtherAdapter {
        fn name(&self) -> &str {
            self.0.name()
        }

        async fn initialize(&self) -> AdapterResult<()> {
            self.0.initialize().await
        }

        async fn stop_receiving(&self) {
            self.0.stop_receiving().await;
        }

        async fn shutdown(&self) {
            self.0.shutdown().await;
        }
    }

    impl ConfigurableAdapter for OtherAdapter {
        type Config = FakeConfig;

        fn config_key() -> &'static str {
            "other"
        }

        fn from_config(config: FakeConfig, bus: BoxedBus) -> AdapterResult<Arc<Self>> {
            let inner = FakeAdapter::from_config(config, bus)?;
            let inner = Arc::try_unwrap(inner)
                .map_err(|_| AdapterError::internal("adapter still shared"))?;
            Ok(Arc::new(Self(inner)))
        }
    }

    fn runtime_with(sections: serde_json::Value) -> ConduitRuntime {
        let mut config = ConduitConfig::default();
        if let serde_json::Value::Object(map) = sections {
            for (key, section) in map {
                config
                    .adapters
                    .insert(key, Value::serialize(section).unwrap());
            }
        }
        ConduitRuntime::from_config(config)
    }

    #[tokio::test]
    async fn test_register_adapter_reads_section() {
        let runtime = runtime_with(json!({"fake": {"name": "renamed"}}));
        let adapter = runtime.register_adapter::<FakeAdapter>().await.unwrap();

        assert_eq!(adapter.name(), "renamed");
        assert!(runtime.bus().contains("renamed"));
        assert_eq!(runtime.adapter_count().await, 1);
    }

    #[tokio::test]
    async fn test_register_adapter_defaults_without_section() {
        let runtime = runtime_with(json!({}));
        let adapter = runtime.register_adapter::<FakeAdapter>().await.unwrap();
        assert_eq!(adapter.name(), "fake");
    }

    #[tokio::test]
    async fn test_register_adapter_bad_section() {
        let runtime = runtime_with(json!({"fake": {"fail_start": "not a bool"}}));
        let result = runtime.register_adapter::<FakeAdapter>().await;
        assert!(matches!(result, Err(RuntimeError::AdapterConfigDeserialize(_))));
    }

    #[tokio::test]
    async fn test_duplicate_names_rejected() {
        let runtime = runtime_with(json!({"other": {"name": "fake"}}));
        runtime.register_adapter::<FakeAdapter>().await.unwrap();

        let result = runtime.register_adapter::<OtherAdapter>().await;
        assert!(matches!(result, Err(RuntimeError::NameTaken(name)) if name == "fake"));

        let session = FakeAdapter::from_config(FakeConfig::default(), runtime.bus().clone())
            .unwrap();
        let result = runtime.register_handler("fake", session);
        assert!(matches!(result, Err(RuntimeError::NameTaken(_))));
    }

    #[tokio::test]
    async fn test_lifecycle_and_routing() {
        let runtime = runtime_with(json!({}));
        let adapter = runtime.register_adapter::<FakeAdapter>().await.unwrap();

        runtime.start().await.unwrap();
        assert!(runtime.is_running());

        runtime
            .bus()
            .send("fake", Envelope::new("test", MessageType::BotResponse, json!({})))
            .await
            .unwrap();

        runtime.stop().await;
        assert!(!runtime.is_running());
        let events = adapter.events();
        assert_eq!(events.first().map(String::as_str), Some("initialize"));
        assert!(events.contains(&"handle:bot_response".to_string()));
        assert_eq!(events.last().map(String::as_str), Some("shutdown"));
        assert!(runtime.bus().is_closed());
    }

    /// Session handler that answers after a delay.
    struct SlowSession {
        bus: BoxedBus,
        reply_to: String,
        replies: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl EnvelopeHandler for SlowSession {
        async fn handle(&self, _envelope: Envelope) {
            tokio::time::sleep(std::time::Duration::from_millis(200)).await;
            let reply = Envelope::new(
                "user_session",
                MessageType::BotResponse,
                json!({"chat_id": 1, "text": "late answer"}),
            );
            let result = self.bus.send(&self.reply_to, reply).await;
            self.replies.lock().push(format!("{result:?}"));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_delivers_in_flight_replies() {
        let runtime = runtime_with(json!({}));
        let adapter = runtime.register_adapter::<FakeAdapter>().await.unwrap();
        let session = Arc::new(SlowSession {
            bus: runtime.bus().clone(),
            reply_to: "fake".to_string(),
            replies: Mutex::new(Vec::new()),
        });
        runtime
            .register_handler("user_session", session.clone())
            .unwrap();

        runtime.start().await.unwrap();
        runtime
            .bus()
            .send(
                "user_session",
                Envelope::new("fake", MessageType::UserMessage, json!({})),
            )
            .await
            .unwrap();
        runtime.stop().await;

        assert_eq!(*session.replies.lock(), vec!["Ok(())"]);
        assert_eq!(
            adapter.events(),
            vec![
                "initialize",
                "stop_receiving",
                "handle:bot_response",
                "shutdown"
            ]
        );
        assert_eq!(runtime.bus().in_flight(), 0);
        assert!(runtime.bus().is_closed());
    }

    #[tokio::test]
    async fn test_failed_start_rolls_back() {
        let runtime = runtime_with(json!({"other": {"name": "broken", "fail_start": true}}));
        let first = runtime.register_adapter::<FakeAdapter>().await.unwrap();
        let second = runtime.register_adapter::<OtherAdapter>().await.unwrap();

        let result = runtime.start().await;
        assert!(matches!(result, Err(RuntimeError::AdapterStart { name, .. }) if name == "broken"));
        assert!(!runtime.is_running());
        assert_eq!(first.events(), vec!["initialize", "shutdown"]);
        assert!(second.0.events().is_empty());
    }

    #[tokio::test]
    async fn test_run_until() {
        let runtime = runtime_with(json!({}));
        let adapter = runtime.register_adapter::<FakeAdapter>().await.unwrap();

        runtime.run_until(async {}).await.unwrap();
        assert_eq!(
            adapter.events(),
            vec!["initialize", "stop_receiving", "shutdown"]
        );
    }

    #[tokio::test]
    async fn test_stop_when_not_running_is_noop() {
        let runtime = runtime_with(json!({}));
        let adapter = runtime.register_adapter::<FakeAdapter>().await.unwrap();
        runtime.stop().await;
        assert!(adapter.events().is_empty());
    }
}
