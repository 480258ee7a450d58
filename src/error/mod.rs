use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // Lifecycle errors
    InitFailed,
    SdkNotInitialized,
    SdkClosed,

    // Configuration errors
    ConfigInvalidSdkKey,
    ConfigInvalidBaseUrl,
    ConfigInvalidTimeout,

    // Network errors
    NetworkError,

    // HTTP errors
    HttpBadRequest,
    HttpUnauthorized,
    HttpForbidden,
    HttpNotFound,
    HttpRateLimited,
    HttpServerError,
    HttpTimeout,
    HttpNetworkError,
    HttpInvalidResponse,

    // Streaming errors
    StreamingConnectionFailed,
    StreamingMessageInvalid,

    // Evaluation errors
    EvalConfigurationError,

    // Evaluation service errors
    AuthInvalidKey,
    StoreError,
}

impl ErrorCode {
    /// Stable string form of the code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::InitFailed => "INIT_FAILED",
            ErrorCode::SdkNotInitialized => "SDK_NOT_INITIALIZED",
            ErrorCode::SdkClosed => "SDK_CLOSED",
            ErrorCode::ConfigInvalidSdkKey => "CONFIG_INVALID_SDK_KEY",
            ErrorCode::ConfigInvalidBaseUrl => "CONFIG_INVALID_BASE_URL",
            ErrorCode::ConfigInvalidTimeout => "CONFIG_INVALID_TIMEOUT",
            ErrorCode::NetworkError => "NETWORK_ERROR",
            ErrorCode::HttpBadRequest => "HTTP_BAD_REQUEST",
            ErrorCode::HttpUnauthorized => "HTTP_UNAUTHORIZED",
            ErrorCode::HttpForbidden => "HTTP_FORBIDDEN",
            ErrorCode::HttpNotFound => "HTTP_NOT_FOUND",
            ErrorCode::HttpRateLimited => "HTTP_RATE_LIMITED",
            ErrorCode::HttpServerError => "HTTP_SERVER_ERROR",
            ErrorCode::HttpTimeout => "HTTP_TIMEOUT",
            ErrorCode::HttpNetworkError => "HTTP_NETWORK_ERROR",
            ErrorCode::HttpInvalidResponse => "HTTP_INVALID_RESPONSE",
            ErrorCode::StreamingConnectionFailed => "STREAMING_CONNECTION_FAILED",
            ErrorCode::StreamingMessageInvalid => "STREAMING_MESSAGE_INVALID",
            ErrorCode::EvalConfigurationError => "EVAL_CONFIGURATION_ERROR",
            ErrorCode::AuthInvalidKey => "AUTH_INVALID_KEY",
            ErrorCode::StoreError => "STORE_ERROR",
        }
    }

    /// Whether a later retry of the same operation can reasonably succeed.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ErrorCode::NetworkError
                | ErrorCode::HttpTimeout
                | ErrorCode::HttpNetworkError
                | ErrorCode::HttpServerError
                | ErrorCode::HttpRateLimited
                | ErrorCode::StreamingConnectionFailed
                | ErrorCode::StoreError
        )
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Error, Debug)]
#[error("[{code}] {message}")]
pub struct FlagwiseError {
    pub code: ErrorCode,
    pub message: String,
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl FlagwiseError {
    /// Create an error with a code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Create an error wrapping an underlying cause.
    pub fn with_source(
        code: ErrorCode,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            code,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a configuration error.
    pub fn config_error(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::new(code, message)
    }

    /// Create a network or HTTP error.
    pub fn network_error(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::new(code, message)
    }

    /// Error for getters called before the runtime is ready.
    pub fn not_initialized() -> Self {
        Self::new(
            ErrorCode::SdkNotInitialized,
            "Client not initialized. Call FlagClient::initialize() first.",
        )
    }

    /// Error for calls on a closed runtime.
    pub fn closed() -> Self {
        Self::new(ErrorCode::SdkClosed, "Client has been closed.")
    }

    /// Whether retrying may succeed.
    pub fn is_recoverable(&self) -> bool {
        self.code.is_recoverable()
    }

    /// Whether this is a configuration error.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self.code,
            ErrorCode::ConfigInvalidSdkKey
                | ErrorCode::ConfigInvalidBaseUrl
                | ErrorCode::ConfigInvalidTimeout
        )
    }

    /// Whether this is a network or HTTP error.
    pub fn is_network_error(&self) -> bool {
        matches!(
            self.code,
            ErrorCode::NetworkError
                | ErrorCode::HttpBadRequest
                | ErrorCode::HttpUnauthorized
                | ErrorCode::HttpForbidden
                | ErrorCode::HttpNotFound
                | ErrorCode::HttpRateLimited
                | ErrorCode::HttpServerError
                | ErrorCode::HttpTimeout
                | ErrorCode::HttpNetworkError
                | ErrorCode::HttpInvalidResponse
        )
    }
}

/// Result type for flagwise operations.
pub type Result<T> = std::result::Result<T, FlagwiseError>;
