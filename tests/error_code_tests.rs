use flagwise::{ErrorCode, FlagwiseError};

#[test]
fn test_error_code_string_values() {
    assert_eq!(ErrorCode::InitFailed.as_str(), "INIT_FAILED");
    assert_eq!(ErrorCode::SdkNotInitialized.as_str(), "SDK_NOT_INITIALIZED");
    assert_eq!(ErrorCode::SdkClosed.as_str(), "SDK_CLOSED");

    assert_eq!(ErrorCode::ConfigInvalidSdkKey.as_str(), "CONFIG_INVALID_SDK_KEY");
    assert_eq!(ErrorCode::ConfigInvalidBaseUrl.as_str(), "CONFIG_INVALID_BASE_URL");

    assert_eq!(ErrorCode::HttpRateLimited.as_str(), "HTTP_RATE_LIMITED");
    assert_eq!(ErrorCode::HttpServerError.as_str(), "HTTP_SERVER_ERROR");
    assert_eq!(ErrorCode::HttpInvalidResponse.as_str(), "HTTP_INVALID_RESPONSE");

    assert_eq!(ErrorCode::StreamingMessageInvalid.as_str(), "STREAMING_MESSAGE_INVALID");
    assert_eq!(ErrorCode::AuthInvalidKey.as_str(), "AUTH_INVALID_KEY");
}

#[test]
fn test_recoverable_errors() {
    assert!(ErrorCode::NetworkError.is_recoverable());
    assert!(ErrorCode::HttpTimeout.is_recoverable());
    assert!(ErrorCode::HttpNetworkError.is_recoverable());
    assert!(ErrorCode::HttpServerError.is_recoverable());
    assert!(ErrorCode::HttpRateLimited.is_recoverable());
    assert!(ErrorCode::StreamingConnectionFailed.is_recoverable());
}

#[test]
fn test_non_recoverable_errors() {
    assert!(!ErrorCode::InitFailed.is_recoverable());
    assert!(!ErrorCode::AuthInvalidKey.is_recoverable());
    assert!(!ErrorCode::ConfigInvalidSdkKey.is_recoverable());
    assert!(!ErrorCode::SdkNotInitialized.is_recoverable());
    assert!(!ErrorCode::SdkClosed.is_recoverable());
    assert!(!ErrorCode::StreamingMessageInvalid.is_recoverable());
}

#[test]
fn test_error_creation() {
    let error = FlagwiseError::new(ErrorCode::InitFailed, "Test error");

    assert_eq!(error.code, ErrorCode::InitFailed);
    assert_eq!(error.message, "Test error");
    assert!(error.source.is_none());
}

#[test]
fn test_error_with_source() {
    let io = std::io::Error::new(std::io::ErrorKind::Other, "boom");
    let error = FlagwiseError::with_source(ErrorCode::NetworkError, "Wrapped", io);

    let source = std::error::Error::source(&error).map(|s| s.to_string());
    assert_eq!(source.as_deref(), Some("boom"));
}

#[test]
fn test_error_categories() {
    let config_error = FlagwiseError::config_error(ErrorCode::ConfigInvalidSdkKey, "Bad key");
    let network_error = FlagwiseError::network_error(ErrorCode::HttpTimeout, "Timeout");

    assert!(config_error.is_config_error());
    assert!(!config_error.is_network_error());
    assert!(network_error.is_network_error());
    assert!(!network_error.is_config_error());
    assert!(network_error.is_recoverable());
}

#[test]
fn test_lifecycle_errors() {
    assert_eq!(FlagwiseError::not_initialized().code, ErrorCode::SdkNotInitialized);
    assert_eq!(FlagwiseError::closed().code, ErrorCode::SdkClosed);
}

#[test]
fn test_error_display() {
    let error = FlagwiseError::new(ErrorCode::InitFailed, "Test message");

    assert_eq!(format!("{}", error), "[INIT_FAILED] Test message");
    assert_eq!(format!("{}", ErrorCode::HttpForbidden), "HTTP_FORBIDDEN");
}
