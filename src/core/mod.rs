mod cache;
mod config;
mod events;
mod fetcher;
mod polling_manager;
mod streaming_manager;

pub use cache::{snapshot_differs, SnapshotCache};
pub use config::{
    RuntimeOptions, RuntimeOptionsBuilder, DEFAULT_BASE_URL, DEFAULT_POLLING_INTERVAL,
    DEFAULT_RECONNECT_DELAY, DEFAULT_TIMEOUT,
};
pub use events::{
    ErrorListener, EventBus, EventChannel, ReadyListener, Subscription, UpdateListener,
};
pub use fetcher::SnapshotFetcher;
pub use polling_manager::{PollCallback, PollingManager};
pub use streaming_manager::{
    ContinueCallback, MessageCallback, PushMessage, PushStream, PushTransport,
    StreamErrorCallback, StreamingManager, StreamingState,
};
