use std::time::Duration;

use crate::error::{ErrorCode, FlagwiseError, Result};
use crate::types::EvaluationContext;

/// Default API base URL.
pub const DEFAULT_BASE_URL: &str = "http://localhost:3000/api";
/// Default interval between snapshot polls.
pub const DEFAULT_POLLING_INTERVAL: Duration = Duration::from_secs(30);
/// Default wait before reopening a dropped push connection.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(5);
/// Default bound on a single snapshot fetch.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

const VALID_KEY_PREFIXES: [&str; 2] = ["cli_", "srv_"];

/// Client runtime settings.
#[derive(Debug, Clone)]
pub struct RuntimeOptions {
    pub sdk_key: String,
    pub base_url: String,
    /// Zero disables polling.
    pub polling_interval: Duration,
    pub streaming_enabled: bool,
    /// Delay before reopening a dropped push connection.
    pub reconnect_delay: Duration,
    /// Upper bound for every network fetch.
    pub timeout: Duration,
    pub context: EvaluationContext,
}

impl RuntimeOptions {
    /// Create options with defaults for the given SDK key.
    pub fn new(sdk_key: impl Into<String>) -> Self {
        RuntimeOptionsBuilder::new(sdk_key).build()
    }

    /// Create a builder for the given SDK key.
    pub fn builder(sdk_key: impl Into<String>) -> RuntimeOptionsBuilder {
        RuntimeOptionsBuilder::new(sdk_key)
    }

    /// Whether the runtime polls at all. A zero interval disables polling.
    pub fn polling_enabled(&self) -> bool {
        !self.polling_interval.is_zero()
    }

    /// Check the options before a runtime is built from them.
    pub fn validate(&self) -> Result<()> {
        if self.sdk_key.is_empty() {
            return Err(FlagwiseError::config_error(
                ErrorCode::ConfigInvalidSdkKey,
                "SDK key is required",
            ));
        }

        if !VALID_KEY_PREFIXES.iter().any(|p| self.sdk_key.starts_with(p)) {
            return Err(FlagwiseError::config_error(
                ErrorCode::ConfigInvalidSdkKey,
                "Invalid SDK key format",
            ));
        }

        if url::Url::parse(&self.base_url).is_err() {
            return Err(FlagwiseError::config_error(
                ErrorCode::ConfigInvalidBaseUrl,
                "Invalid base URL",
            ));
        }

        if self.timeout.is_zero() {
            return Err(FlagwiseError::config_error(
                ErrorCode::ConfigInvalidTimeout,
                "Timeout must be positive",
            ));
        }

        Ok(())
    }
}

/// Builder for [`RuntimeOptions`].
pub struct RuntimeOptionsBuilder {
    sdk_key: String,
    base_url: String,
    polling_interval: Duration,
    streaming_enabled: bool,
    reconnect_delay: Duration,
    timeout: Duration,
    context: EvaluationContext,
}

impl RuntimeOptionsBuilder {
    /// Create a builder with defaults.
    pub fn new(sdk_key: impl Into<String>) -> Self {
        Self {
            sdk_key: sdk_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            polling_interval: DEFAULT_POLLING_INTERVAL,
            streaming_enabled: false,
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            timeout: DEFAULT_TIMEOUT,
            context: EvaluationContext::default(),
        }
    }

    /// Set the API base URL. A trailing slash is dropped.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set the polling interval.
    pub fn polling_interval(mut self, interval: Duration) -> Self {
        self.polling_interval = interval;
        self
    }

    /// Turn polling off.
    pub fn disable_polling(mut self) -> Self {
        self.polling_interval = Duration::ZERO;
        self
    }

    /// Enable or disable the push connection.
    pub fn streaming_enabled(mut self, enabled: bool) -> Self {
        self.streaming_enabled = enabled;
        self
    }

    /// Set the delay before a dropped push connection is reopened.
    pub fn reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    /// Set the timeout for each snapshot fetch.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the initial evaluation context.
    pub fn context(mut self, context: EvaluationContext) -> Self {
        self.context = context;
        self
    }

    /// Build the options.
    pub fn build(self) -> RuntimeOptions {
        RuntimeOptions {
            sdk_key: self.sdk_key,
            base_url: self.base_url.trim_end_matches('/').to_string(),
            polling_interval: self.polling_interval,
            streaming_enabled: self.streaming_enabled,
            reconnect_delay: self.reconnect_delay,
            timeout: self.timeout,
            context: self.context,
        }
    }
}
