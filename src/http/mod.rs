mod client;
mod sse;

pub use client::{HttpClient, FLAGS_PATH};
pub use sse::{SseDecoder, SseTransport, MAX_EVENT_BYTES, STREAM_PATH};
