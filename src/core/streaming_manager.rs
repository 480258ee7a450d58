use async_trait::async_trait;
use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use parking_lot::RwLock;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::error::{ErrorCode, FlagwiseError, Result};
use crate::types::FlagEvaluationResult;

/// Connection states for streaming.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamingState {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
}

/// A message pushed by the server.
#[derive(Debug, Clone, PartialEq)]
pub enum PushMessage {
    /// One flag's new evaluated result.
    FlagUpdate(FlagEvaluationResult),
}

#[derive(Debug, Deserialize)]
struct RawPushMessage {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: serde_json::Value,
}

impl PushMessage {
    pub const FLAG_UPDATE: &'static str = "flag_update";

    /// Decodes one `{type, data}` message.
    ///
    /// `Ok(None)` for message types this runtime does not handle.
    pub fn parse(text: &str) -> Result<Option<Self>> {
        let raw: RawPushMessage = serde_json::from_str(text).map_err(|e| {
            FlagwiseError::with_source(
                ErrorCode::StreamingMessageInvalid,
                "Push message is not a {type, data} object",
                e,
            )
        })?;

        match raw.kind.as_str() {
            Self::FLAG_UPDATE => serde_json::from_value(raw.data)
                .map(|result| Some(Self::FlagUpdate(result)))
                .map_err(|e| {
                    FlagwiseError::with_source(
                        ErrorCode::StreamingMessageInvalid,
                        "Invalid flag_update payload",
                        e,
                    )
                }),
            other => {
                tracing::trace!(message_type = other, "Ignoring push message");
                Ok(None)
            }
        }
    }
}

/// Stream of decoded push messages for one connection.
pub type PushStream = BoxStream<'static, Result<PushMessage>>;

/// Opens a persistent push connection.
///
/// The stream ends when the connection drops. A malformed message is
/// yielded as an `Err` item and does not end the stream.
#[async_trait]
pub trait PushTransport: Send + Sync {
    async fn connect(&self) -> Result<PushStream>;
}

/// Receives each decoded push message.
pub type MessageCallback = Arc<dyn Fn(PushMessage) + Send + Sync>;
/// Receives connection failures and malformed messages.
pub type StreamErrorCallback = Arc<dyn Fn(FlagwiseError) + Send + Sync>;
/// Consulted before every (re)connect; returning `false` ends the task.
pub type ContinueCallback = Arc<dyn Fn() -> bool + Send + Sync>;

/// Keeps one push connection open, reconnecting after a fixed delay.
pub struct StreamingManager {
    transport: Arc<dyn PushTransport>,
    reconnect_delay: Duration,
    state: Arc<RwLock<StreamingState>>,
    handle: Option<JoinHandle<()>>,
}

impl StreamingManager {
    /// Create a stopped manager.
    pub fn new(transport: Arc<dyn PushTransport>, reconnect_delay: Duration) -> Self {
        Self {
            transport,
            reconnect_delay,
            state: Arc::new(RwLock::new(StreamingState::Disconnected)),
            handle: None,
        }
    }

    /// Current connection state.
    pub fn state(&self) -> StreamingState {
        *self.state.read()
    }

    /// Whether the connection task is alive.
    pub fn is_running(&self) -> bool {
        self.handle
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }

    /// Spawns the connection task. Must be called inside a tokio runtime.
    pub fn start(
        &mut self,
        on_message: MessageCallback,
        on_error: StreamErrorCallback,
        should_continue: ContinueCallback,
    ) {
        if self.is_running() {
            return;
        }

        let transport = Arc::clone(&self.transport);
        let state = Arc::clone(&self.state);
        let reconnect_delay = self.reconnect_delay;

        self.handle = Some(tokio::spawn(async move {
            while should_continue() {
                *state.write() = StreamingState::Connecting;

                match transport.connect().await {
                    Ok(mut stream) => {
                        *state.write() = StreamingState::Connected;
                        tracing::debug!("Push connection open");

                        while let Some(item) = stream.next().await {
                            match item {
                                Ok(message) => on_message(message),
                                Err(err) => {
                                    tracing::warn!(error = %err, "Dropping push message");
                                    on_error(err);
                                }
                            }
                        }
                        tracing::debug!("Push connection closed");
                    }
                    Err(err) => {
                        tracing::warn!(error = %err, "Push connection failed");
                        on_error(err);
                    }
                }

                if !should_continue() {
                    break;
                }

                *state.write() = StreamingState::Reconnecting;
                tracing::debug!(delay = ?reconnect_delay, "Scheduling push reconnect");
                tokio::time::sleep(reconnect_delay).await;
            }

            *state.write() = StreamingState::Disconnected;
        }));
    }

    /// Closes the connection and cancels any pending reconnect.
    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            tracing::debug!("Streaming manager stopped");
        }
        *self.state.write() = StreamingState::Disconnected;
    }
}

impl Drop for StreamingManager {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}
