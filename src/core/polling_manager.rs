//! Fixed-interval background refresh.
//!
//! The manager owns one tokio task that invokes a callback on every tick.
//! A failed poll never stops the timer; the next tick simply tries again.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

/// Callback type for poll operations.
///
/// The callback reports its own failures; the manager only keeps time.
pub type PollCallback = Arc<dyn Fn() -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

/// Owns the polling task.
pub struct PollingManager {
    interval: Duration,
    handle: Option<JoinHandle<()>>,
}

impl PollingManager {
    /// Create a stopped manager ticking every `interval`.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            handle: None,
        }
    }

    /// Spawns the polling task. The first poll fires one full interval
    /// after this call. Must be called inside a tokio runtime.
    pub fn start(&mut self, on_poll: PollCallback) {
        if self.is_running() {
            return;
        }

        let interval = self.interval;
        self.handle = Some(tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + interval, interval);
            // A slow poll delays later ticks; missed ticks never bunch up.
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                on_poll().await;
            }
        }));

        tracing::debug!(interval = ?self.interval, "Polling manager started");
    }

    /// Cancels the task. No callback starts after this returns; one that is
    /// mid-flight is dropped at its next await point.
    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            tracing::debug!("Polling manager stopped");
        }
    }

    /// Whether the polling task is alive.
    pub fn is_running(&self) -> bool {
        self.handle
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }
}

impl Drop for PollingManager {
    fn drop(&mut self) {
        self.stop();
    }
}
