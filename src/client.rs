use parking_lot::{Mutex, RwLock};
use serde::de::DeserializeOwned;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use crate::core::{
    ContinueCallback, EventBus, EventChannel, MessageCallback, PollCallback, PollingManager,
    PushMessage, PushTransport, RuntimeOptions, SnapshotCache, SnapshotFetcher,
    StreamErrorCallback, StreamingManager, StreamingState, Subscription,
};
use crate::error::{ErrorCode, FlagwiseError, Result};
use crate::http::{HttpClient, SseTransport};
use crate::types::{EvaluationContext, FlagEvaluationResult, FlagSnapshot, FlagValue};

/// Lifecycle of a [`FlagClient`].
///
/// `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeState {
    Uninitialized,
    Initializing,
    Ready,
    Closed,
}

struct Inner {
    options: RuntimeOptions,
    fetcher: Arc<dyn SnapshotFetcher>,
    transport: Option<Arc<dyn PushTransport>>,
    cache: SnapshotCache,
    context: RwLock<EvaluationContext>,
    events: EventBus,
    state: RwLock<RuntimeState>,
    /// Bumped by every cache write and context change. Only moves while the
    /// state write lock is held, so it also orders the writers.
    generation: AtomicU64,
    /// Bumped by context changes only.
    context_version: AtomicU64,
    polling: Mutex<Option<PollingManager>>,
    streaming: Mutex<Option<StreamingManager>>,
}

impl Inner {
    fn is_ready(&self) -> bool {
        *self.state.read() == RuntimeState::Ready
    }

    async fn fetch(&self, context: &EvaluationContext) -> Result<FlagSnapshot> {
        match tokio::time::timeout(self.options.timeout, self.fetcher.fetch_snapshot(context)).await
        {
            Ok(result) => result,
            Err(_) => Err(FlagwiseError::network_error(
                ErrorCode::HttpTimeout,
                format!("Snapshot fetch exceeded {:?}", self.options.timeout),
            )),
        }
    }

    /// One poll tick. Failures keep the cached snapshot.
    ///
    /// The result is dropped when anything wrote the cache or changed the
    /// context while the fetch was in flight.
    async fn refresh(&self) {
        let (context, generation) = {
            let state = self.state.read();
            if *state != RuntimeState::Ready {
                return;
            }
            (
                self.context.read().clone(),
                self.generation.load(Ordering::SeqCst),
            )
        };

        match self.fetch(&context).await {
            Ok(snapshot) => {
                let changed = {
                    let state = self.state.write();
                    if *state != RuntimeState::Ready {
                        return;
                    }
                    if self.generation.load(Ordering::SeqCst) != generation {
                        tracing::debug!("Discarding stale poll result");
                        return;
                    }
                    let changed = self.cache.replace_if_changed(snapshot);
                    if changed.is_some() {
                        self.generation.fetch_add(1, Ordering::SeqCst);
                    }
                    changed
                };

                if let Some(snapshot) = changed {
                    tracing::debug!(flags = snapshot.len(), "Flag snapshot changed");
                    self.events.emit_update(&snapshot);
                }
            }
            Err(err) => {
                if !self.is_ready() {
                    return;
                }
                tracing::warn!(error = %err, "Poll failed, keeping cached flags");
                self.events.emit_error(&err);
            }
        }
    }

    fn apply_push(&self, message: PushMessage) {
        match message {
            PushMessage::FlagUpdate(result) => {
                let flag_key = result.flag_key.clone();
                let snapshot = {
                    let state = self.state.write();
                    if *state != RuntimeState::Ready {
                        return;
                    }
                    self.generation.fetch_add(1, Ordering::SeqCst);
                    self.cache.patch(result)
                };

                tracing::debug!(flag_key = %flag_key, "Applied pushed flag update");
                self.events.emit_update(&snapshot);
            }
        }
    }

    fn push_failed(&self, err: FlagwiseError) {
        if self.is_ready() {
            self.events.emit_error(&err);
        }
    }
}

/// Client runtime holding an evaluated flag snapshot.
///
/// Cloning is cheap; clones share the same runtime. Dropping the last clone
/// stops background work.
///
/// ```no_run
/// use flagwise::{FlagClient, RuntimeOptions};
///
/// # async fn run() -> flagwise::Result<()> {
/// let client = FlagClient::new(RuntimeOptions::new("cli_your_key"))?;
/// client.initialize().await?;
///
/// let dark_mode = client.get_boolean_flag("dark-mode", false)?;
/// client.close();
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct FlagClient {
    inner: Arc<Inner>,
}

impl FlagClient {
    /// Creates a client that fetches over HTTP, and streams over SSE when
    /// streaming is enabled.
    pub fn new(options: RuntimeOptions) -> Result<Self> {
        Self::builder(options).build()
    }

    /// Create a builder, for injecting a custom fetcher or transport.
    pub fn builder(options: RuntimeOptions) -> FlagClientBuilder {
        FlagClientBuilder {
            options,
            fetcher: None,
            transport: None,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> RuntimeState {
        *self.inner.state.read()
    }

    /// Whether getters will answer.
    pub fn is_ready(&self) -> bool {
        self.inner.is_ready()
    }

    /// The options this client was built with.
    pub fn options(&self) -> &RuntimeOptions {
        &self.inner.options
    }

    /// The stored evaluation context.
    pub fn context(&self) -> EvaluationContext {
        self.inner.context.read().clone()
    }

    /// Push connection state, or `None` when no push connection is running.
    pub fn streaming_state(&self) -> Option<StreamingState> {
        self.inner
            .streaming
            .lock()
            .as_ref()
            .map(|streaming| streaming.state())
    }

    /// Fetches the first snapshot and starts background refresh.
    ///
    /// On failure the client stays uninitialized and may be initialized again.
    pub async fn initialize(&self) -> Result<()> {
        {
            let mut state = self.inner.state.write();
            match *state {
                RuntimeState::Closed => return Err(FlagwiseError::closed()),
                RuntimeState::Ready => return Ok(()),
                RuntimeState::Initializing => {
                    return Err(FlagwiseError::new(
                        ErrorCode::InitFailed,
                        "Initialization already in progress",
                    ))
                }
                RuntimeState::Uninitialized => *state = RuntimeState::Initializing,
            }
        }

        let context = self.context();
        let fetched = self.inner.fetch(&context).await;

        match fetched {
            Ok(snapshot) => {
                let flags = snapshot.len();
                {
                    let mut state = self.inner.state.write();
                    if *state != RuntimeState::Initializing {
                        return Err(FlagwiseError::closed());
                    }
                    self.inner.cache.replace(snapshot);
                    self.inner.generation.fetch_add(1, Ordering::SeqCst);
                    *state = RuntimeState::Ready;
                }

                tracing::info!(flags, "Flag client ready");
                self.inner.events.emit_ready();
                self.start_background();
                Ok(())
            }
            Err(err) => {
                {
                    let mut state = self.inner.state.write();
                    if *state == RuntimeState::Initializing {
                        *state = RuntimeState::Uninitialized;
                    }
                }

                tracing::warn!(error = %err, "Flag client initialization failed");
                self.inner.events.emit_error(&err);
                Err(err)
            }
        }
    }

    fn start_background(&self) {
        if self.inner.options.polling_enabled() {
            let weak = Arc::downgrade(&self.inner);
            let on_poll: PollCallback = Arc::new(move || {
                let weak = Weak::clone(&weak);
                Box::pin(async move {
                    if let Some(inner) = weak.upgrade() {
                        inner.refresh().await;
                    }
                })
            });

            // Checked under the slot lock so a concurrent close() cannot miss it.
            let mut slot = self.inner.polling.lock();
            if self.is_ready() {
                let mut manager = PollingManager::new(self.inner.options.polling_interval);
                manager.start(on_poll);
                *slot = Some(manager);
            }
        }

        if let Some(transport) = &self.inner.transport {
            let on_message: MessageCallback = {
                let weak = Arc::downgrade(&self.inner);
                Arc::new(move |message| {
                    if let Some(inner) = weak.upgrade() {
                        inner.apply_push(message);
                    }
                })
            };
            let on_error: StreamErrorCallback = {
                let weak = Arc::downgrade(&self.inner);
                Arc::new(move |err| {
                    if let Some(inner) = weak.upgrade() {
                        inner.push_failed(err);
                    }
                })
            };
            let should_continue: ContinueCallback = {
                let weak = Arc::downgrade(&self.inner);
                Arc::new(move || weak.upgrade().map(|inner| inner.is_ready()).unwrap_or(false))
            };

            let mut slot = self.inner.streaming.lock();
            if self.is_ready() {
                let mut manager = StreamingManager::new(
                    Arc::clone(transport),
                    self.inner.options.reconnect_delay,
                );
                manager.start(on_message, on_error, should_continue);
                *slot = Some(manager);
            }
        }
    }

    fn ensure_ready(&self) -> Result<()> {
        match self.state() {
            RuntimeState::Ready => Ok(()),
            _ => Err(FlagwiseError::not_initialized()),
        }
    }

    /// The cached result for `flag_key`.
    pub fn get_evaluation(&self, flag_key: &str) -> Result<Option<FlagEvaluationResult>> {
        self.ensure_ready()?;
        Ok(self.inner.cache.get(flag_key))
    }

    fn get_value(&self, flag_key: &str) -> Result<Option<FlagValue>> {
        Ok(self.get_evaluation(flag_key)?.map(|result| result.value))
    }

    /// Get a boolean flag value, or `default_value` when missing or not a boolean.
    pub fn get_boolean_flag(&self, flag_key: &str, default_value: bool) -> Result<bool> {
        Ok(self
            .get_value(flag_key)?
            .and_then(|v| v.as_bool())
            .unwrap_or(default_value))
    }

    /// Get a string flag value, or `default_value` when missing or not a string.
    pub fn get_string_flag(&self, flag_key: &str, default_value: &str) -> Result<String> {
        Ok(self
            .get_value(flag_key)?
            .and_then(|v| v.as_string().map(str::to_string))
            .unwrap_or_else(|| default_value.to_string()))
    }

    /// Get a number flag value, or `default_value` when missing or not a number.
    pub fn get_number_flag(&self, flag_key: &str, default_value: f64) -> Result<f64> {
        Ok(self
            .get_value(flag_key)?
            .and_then(|v| v.as_number())
            .unwrap_or(default_value))
    }

    /// Get a number flag value truncated to an integer.
    pub fn get_int_flag(&self, flag_key: &str, default_value: i64) -> Result<i64> {
        Ok(self
            .get_value(flag_key)?
            .and_then(|v| v.as_int())
            .unwrap_or(default_value))
    }

    /// Object or array values only; scalars return the default.
    pub fn get_json_flag(
        &self,
        flag_key: &str,
        default_value: serde_json::Value,
    ) -> Result<serde_json::Value> {
        Ok(self
            .get_value(flag_key)?
            .and_then(|v| v.as_json().cloned())
            .unwrap_or(default_value))
    }

    /// Decodes the cached value into `T`, or returns the default when it
    /// is missing or does not fit.
    pub fn get_flag<T: DeserializeOwned>(&self, flag_key: &str, default_value: T) -> Result<T> {
        let Some(value) = self.get_value(flag_key)? else {
            return Ok(default_value);
        };

        Ok(serde_json::to_value(value)
            .and_then(serde_json::from_value)
            .unwrap_or(default_value))
    }

    /// The whole cached snapshot.
    pub fn get_all_flags(&self) -> Result<Arc<FlagSnapshot>> {
        self.ensure_ready()?;
        Ok(self.inner.cache.snapshot())
    }

    /// Whether the snapshot contains `flag_key`.
    pub fn has_flag(&self, flag_key: &str) -> Result<bool> {
        self.ensure_ready()?;
        Ok(self.inner.cache.contains(flag_key))
    }

    /// Replaces the stored context. With `reevaluate`, a ready client
    /// re-fetches immediately and emits `update` with the result.
    ///
    /// Polls already in flight for the previous context are discarded. When
    /// a later call replaces the context before this fetch returns, this
    /// result is dropped and the later call wins.
    pub async fn update_context(&self, context: EvaluationContext, reevaluate: bool) -> Result<()> {
        let (ready, version) = {
            let state = self.inner.state.write();
            if *state == RuntimeState::Closed {
                return Err(FlagwiseError::closed());
            }
            *self.inner.context.write() = context.clone();
            self.inner.generation.fetch_add(1, Ordering::SeqCst);
            let version = self.inner.context_version.fetch_add(1, Ordering::SeqCst) + 1;
            (*state == RuntimeState::Ready, version)
        };

        if !reevaluate || !ready {
            return Ok(());
        }

        match self.inner.fetch(&context).await {
            Ok(snapshot) => {
                let snapshot = {
                    let state = self.inner.state.write();
                    if *state != RuntimeState::Ready {
                        return Err(FlagwiseError::closed());
                    }
                    if self.inner.context_version.load(Ordering::SeqCst) != version {
                        tracing::debug!("Context replaced during re-evaluation, dropping result");
                        return Ok(());
                    }
                    self.inner.generation.fetch_add(1, Ordering::SeqCst);
                    self.inner.cache.replace(snapshot)
                };

                tracing::debug!(flags = snapshot.len(), "Re-evaluated flags for new context");
                self.inner.events.emit_update(&snapshot);
                Ok(())
            }
            Err(err) => {
                tracing::warn!(error = %err, "Re-evaluation failed, keeping cached flags");
                self.inner.events.emit_error(&err);
                Err(err)
            }
        }
    }

    /// Subscribe to successful initialization.
    pub fn on_ready(&self, listener: impl Fn() + Send + Sync + 'static) -> Subscription {
        self.inner.events.on_ready(listener)
    }

    /// Subscribe to snapshot changes.
    pub fn on_update(
        &self,
        listener: impl Fn(&FlagSnapshot) + Send + Sync + 'static,
    ) -> Subscription {
        self.inner.events.on_update(listener)
    }

    /// Subscribe to fetch and push failures.
    pub fn on_error(
        &self,
        listener: impl Fn(&FlagwiseError) + Send + Sync + 'static,
    ) -> Subscription {
        self.inner.events.on_error(listener)
    }

    /// Number of live listeners on `channel`.
    pub fn listener_count(&self, channel: EventChannel) -> usize {
        self.inner.events.listener_count(channel)
    }

    /// Stops background work, drops the snapshot and every listener.
    ///
    /// Idempotent. No poll or reconnect runs after this returns.
    pub fn close(&self) {
        {
            let mut state = self.inner.state.write();
            if *state == RuntimeState::Closed {
                return;
            }
            *state = RuntimeState::Closed;
        }

        if let Some(mut polling) = self.inner.polling.lock().take() {
            polling.stop();
        }
        if let Some(mut streaming) = self.inner.streaming.lock().take() {
            streaming.stop();
        }

        self.inner.cache.clear();
        self.inner.events.clear();
        tracing::info!("Flag client closed");
    }
}

/// Builder for [`FlagClient`].
pub struct FlagClientBuilder {
    options: RuntimeOptions,
    fetcher: Option<Arc<dyn SnapshotFetcher>>,
    transport: Option<Arc<dyn PushTransport>>,
}

impl FlagClientBuilder {
    /// Replaces the HTTP snapshot fetcher.
    pub fn fetcher(mut self, fetcher: Arc<dyn SnapshotFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    /// Replaces the SSE transport. Only used when streaming is enabled.
    pub fn transport(mut self, transport: Arc<dyn PushTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Validate the options and build the client.
    pub fn build(self) -> Result<FlagClient> {
        self.options.validate()?;

        let fetcher: Arc<dyn SnapshotFetcher> = match self.fetcher {
            Some(fetcher) => fetcher,
            None => Arc::new(HttpClient::new(&self.options)?),
        };

        let transport: Option<Arc<dyn PushTransport>> = if self.options.streaming_enabled {
            match self.transport {
                Some(transport) => Some(transport),
                None => Some(Arc::new(SseTransport::new(&self.options)?)),
            }
        } else {
            None
        };

        let context = self.options.context.clone();

        Ok(FlagClient {
            inner: Arc::new(Inner {
                options: self.options,
                fetcher,
                transport,
                cache: SnapshotCache::new(),
                context: RwLock::new(context),
                events: EventBus::new(),
                state: RwLock::new(RuntimeState::Uninitialized),
                generation: AtomicU64::new(0),
                context_version: AtomicU64::new(0),
                polling: Mutex::new(None),
                streaming: Mutex::new(None),
            }),
        })
    }
}
