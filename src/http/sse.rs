//! Server-sent events push transport.

use async_trait::async_trait;
use futures_util::{future, stream, StreamExt};
use reqwest::Client;

use super::client::{convert_error, status_to_error, USER_AGENT};
use crate::core::{PushMessage, PushStream, PushTransport, RuntimeOptions};
use crate::error::{ErrorCode, FlagwiseError, Result};

/// Push endpoint, relative to the base URL.
pub const STREAM_PATH: &str = "/sdk/stream";

/// Longest line, and largest event payload, the decoder will hold.
pub const MAX_EVENT_BYTES: usize = 1 << 20;

/// Incremental decoder for a `text/event-stream` body.
///
/// Only `data:` fields matter here; consecutive data lines are joined with
/// `\n` and emitted when a blank line ends the event.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    data: Vec<String>,
    data_len: usize,
}

impl SseDecoder {
    /// Create an empty decoder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds raw bytes and returns every event payload completed by them.
    ///
    /// Fails once a line or an event grows past [`MAX_EVENT_BYTES`]; the
    /// connection is not worth reading further after that.
    pub fn push(&mut self, chunk: &[u8]) -> Result<Vec<String>> {
        self.buffer.extend_from_slice(chunk);

        let mut events = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&line);
            let line = line.trim_end_matches(['\n', '\r']);

            if line.is_empty() {
                if !self.data.is_empty() {
                    events.push(self.data.join("\n"));
                    self.data.clear();
                    self.data_len = 0;
                }
            } else if let Some(value) = line.strip_prefix("data:") {
                let value = value.strip_prefix(' ').unwrap_or(value);
                self.data_len += value.len() + 1;
                if self.data_len > MAX_EVENT_BYTES {
                    return Err(oversized("event"));
                }
                self.data.push(value.to_string());
            }
            // Comments, `event:`, `id:` and `retry:` carry nothing we use.
        }

        if self.buffer.len() > MAX_EVENT_BYTES {
            return Err(oversized("line"));
        }
        Ok(events)
    }
}

fn oversized(what: &str) -> FlagwiseError {
    FlagwiseError::new(
        ErrorCode::StreamingMessageInvalid,
        format!("Event stream {} exceeds {} bytes", what, MAX_EVENT_BYTES),
    )
}

/// Push transport reading `GET {base_url}/sdk/stream`.
pub struct SseTransport {
    client: Client,
    url: String,
    sdk_key: String,
}

impl SseTransport {
    /// Create a transport from runtime options.
    pub fn new(options: &RuntimeOptions) -> Result<Self> {
        // Only the connect is bounded; the body stays open indefinitely.
        let client = Client::builder()
            .connect_timeout(options.timeout)
            .build()
            .map_err(|e| {
                FlagwiseError::with_source(ErrorCode::NetworkError, "Failed to create HTTP client", e)
            })?;

        Ok(Self {
            client,
            url: format!("{}{}", options.base_url, STREAM_PATH),
            sdk_key: options.sdk_key.clone(),
        })
    }
}

#[async_trait]
impl PushTransport for SseTransport {
    async fn connect(&self) -> Result<PushStream> {
        let response = self
            .client
            .get(&self.url)
            .header("X-API-Key", &self.sdk_key)
            .header("User-Agent", USER_AGENT)
            .header("Accept", "text/event-stream")
            .header("Cache-Control", "no-cache")
            .send()
            .await
            .map_err(|e| {
                let err = convert_error(e);
                FlagwiseError::new(ErrorCode::StreamingConnectionFailed, err.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let err = status_to_error(status, "");
            return Err(FlagwiseError::new(
                ErrorCode::StreamingConnectionFailed,
                err.message,
            ));
        }

        // The decoder is dropped after its first error, which ends the stream.
        let messages = response
            .bytes_stream()
            .scan(Some(SseDecoder::new()), |slot, chunk| {
                let Some(decoder) = slot.as_mut() else {
                    return future::ready(None);
                };
                future::ready(match chunk {
                    Ok(bytes) => match decoder.push(&bytes) {
                        Ok(events) => Some(events.into_iter().map(Ok).collect::<Vec<_>>()),
                        Err(err) => {
                            *slot = None;
                            Some(vec![Err(err)])
                        }
                    },
                    Err(err) => {
                        tracing::debug!(error = %err, "Event stream read failed");
                        None
                    }
                })
            })
            .flat_map(stream::iter)
            .filter_map(|item: Result<String>| {
                future::ready(match item {
                    Ok(data) => PushMessage::parse(&data).transpose(),
                    Err(err) => Some(Err(err)),
                })
            });

        Ok(messages.boxed())
    }
}
