//! Fire-and-forget recording of evaluations.
//!
//! Evaluations hand events to a bounded channel without waiting; a background
//! task batches them and forwards each batch to an [`AnalyticsSink`]. A full
//! queue drops events instead of slowing the caller.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::error::Result;
use crate::types::FlagEvaluationResult;

/// Default number of events per batch.
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Default interval between automatic flushes.
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(10);

/// Default capacity of the pending-event queue.
pub const DEFAULT_MAX_QUEUE_SIZE: usize = 10_000;

#[derive(Debug, Clone)]
pub struct AnalyticsConfig {
    /// Events per batch before an early flush.
    pub batch_size: usize,

    /// Interval between automatic flushes.
    pub flush_interval: Duration,

    /// Events that may wait in the queue before new ones are dropped.
    pub max_queue_size: usize,

    pub enabled: bool,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            flush_interval: DEFAULT_FLUSH_INTERVAL,
            max_queue_size: DEFAULT_MAX_QUEUE_SIZE,
            enabled: true,
        }
    }
}

impl AnalyticsConfig {
    /// Create a builder with default values.
    pub fn builder() -> AnalyticsConfigBuilder {
        AnalyticsConfigBuilder::default()
    }
}

#[derive(Debug, Default)]
pub struct AnalyticsConfigBuilder {
    batch_size: Option<usize>,
    flush_interval: Option<Duration>,
    max_queue_size: Option<usize>,
    enabled: Option<bool>,
}

impl AnalyticsConfigBuilder {
    /// Set the batch size. Zero is raised to one.
    pub fn batch_size(mut self, size: usize) -> Self {
        self.batch_size = Some(size);
        self
    }

    /// Set the interval between automatic flushes.
    pub fn flush_interval(mut self, interval: Duration) -> Self {
        self.flush_interval = Some(interval);
        self
    }

    /// Set the queue capacity.
    pub fn max_queue_size(mut self, size: usize) -> Self {
        self.max_queue_size = Some(size);
        self
    }

    /// Enable or disable collection.
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = Some(enabled);
        self
    }

    /// Build the config.
    pub fn build(self) -> AnalyticsConfig {
        AnalyticsConfig {
            batch_size: self.batch_size.unwrap_or(DEFAULT_BATCH_SIZE).max(1),
            flush_interval: self.flush_interval.unwrap_or(DEFAULT_FLUSH_INTERVAL),
            max_queue_size: self.max_queue_size.unwrap_or(DEFAULT_MAX_QUEUE_SIZE).max(1),
            enabled: self.enabled.unwrap_or(true),
        }
    }
}

/// One recorded evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationEvent {
    pub flag_key: String,
    pub environment_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variation_key: Option<String>,
    pub reason: String,
    pub enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl EvaluationEvent {
    /// Build an event from an evaluation result.
    pub fn from_result(
        environment_id: impl Into<String>,
        result: &FlagEvaluationResult,
        user_id: Option<String>,
    ) -> Self {
        Self {
            flag_key: result.flag_key.clone(),
            environment_id: environment_id.into(),
            variation_key: result.variation_key.clone(),
            reason: result.reason.to_string(),
            enabled: result.enabled,
            user_id,
            timestamp: Utc::now(),
        }
    }
}

/// Destination for batches of evaluation events.
#[async_trait]
pub trait AnalyticsSink: Send + Sync {
    async fn record_batch(&self, events: Vec<EvaluationEvent>) -> Result<()>;
}

enum Command {
    Record(EvaluationEvent),
    Flush(oneshot::Sender<()>),
    Shutdown(oneshot::Sender<()>),
}

/// Batching queue in front of an [`AnalyticsSink`].
pub struct AnalyticsQueue {
    /// `None` when analytics are disabled.
    tx: Option<mpsc::Sender<Command>>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl AnalyticsQueue {
    /// Starts the background flush task. Must be called inside a tokio
    /// runtime unless `config.enabled` is false, in which case nothing is
    /// spawned and every call is a no-op.
    pub fn start(config: AnalyticsConfig, sink: Arc<dyn AnalyticsSink>) -> Self {
        if !config.enabled {
            tracing::debug!("Analytics disabled");
            return Self {
                tx: None,
                handle: Mutex::new(None),
            };
        }

        let (tx, rx) = mpsc::channel(config.max_queue_size);
        tracing::debug!(
            batch_size = config.batch_size,
            flush_interval = ?config.flush_interval,
            "Analytics queue started"
        );
        let handle = tokio::spawn(Self::run(config, sink, rx));

        Self {
            tx: Some(tx),
            handle: Mutex::new(Some(handle)),
        }
    }

    /// Whether events are being collected.
    pub fn is_enabled(&self) -> bool {
        self.tx.is_some()
    }

    /// Queues an event without waiting. Dropped when the queue is full.
    pub fn record(&self, event: EvaluationEvent) {
        let Some(tx) = &self.tx else {
            return;
        };

        match tx.try_send(Command::Record(event)) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::debug!("Analytics queue full, dropping evaluation event");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::debug!("Analytics queue closed, dropping evaluation event");
            }
        }
    }

    /// Sends everything queued so far to the sink.
    pub async fn flush(&self) {
        let Some(tx) = &self.tx else {
            return;
        };
        let (ack_tx, ack_rx) = oneshot::channel();
        if tx.send(Command::Flush(ack_tx)).await.is_ok() {
            let _ = ack_rx.await;
        }
    }

    /// Flushes remaining events and stops the background task.
    pub async fn shutdown(&self) {
        let Some(tx) = &self.tx else {
            return;
        };
        let (ack_tx, ack_rx) = oneshot::channel();
        if tx.send(Command::Shutdown(ack_tx)).await.is_ok() {
            let _ = ack_rx.await;
        }
        let handle = self.handle.lock().take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
        tracing::debug!("Analytics queue stopped");
    }

    async fn run(
        config: AnalyticsConfig,
        sink: Arc<dyn AnalyticsSink>,
        mut rx: mpsc::Receiver<Command>,
    ) {
        let mut buffer = Vec::with_capacity(config.batch_size);
        let mut ticker = interval_at(Instant::now() + config.flush_interval, config.flush_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                command = rx.recv() => match command {
                    Some(Command::Record(event)) => {
                        buffer.push(event);
                        if buffer.len() >= config.batch_size {
                            Self::send_batch(&sink, &mut buffer).await;
                        }
                    }
                    Some(Command::Flush(ack)) => {
                        Self::send_batch(&sink, &mut buffer).await;
                        let _ = ack.send(());
                    }
                    Some(Command::Shutdown(ack)) => {
                        Self::send_batch(&sink, &mut buffer).await;
                        let _ = ack.send(());
                        break;
                    }
                    None => {
                        Self::send_batch(&sink, &mut buffer).await;
                        break;
                    }
                },
                _ = ticker.tick() => {
                    Self::send_batch(&sink, &mut buffer).await;
                }
            }
        }
    }

    async fn send_batch(sink: &Arc<dyn AnalyticsSink>, buffer: &mut Vec<EvaluationEvent>) {
        if buffer.is_empty() {
            return;
        }

        let events = std::mem::take(buffer);
        let count = events.len();
        match sink.record_batch(events).await {
            Ok(()) => tracing::debug!(count, "Flushed evaluation events"),
            Err(err) => tracing::warn!(count, error = %err, "Analytics sink rejected batch"),
        }
    }
}

impl Drop for AnalyticsQueue {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.lock().take() {
            handle.abort();
        }
    }
}
