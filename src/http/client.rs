use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::core::{RuntimeOptions, SnapshotFetcher};
use crate::error::{ErrorCode, FlagwiseError, Result};
use crate::types::{EvaluationContext, FlagSnapshot};

pub(crate) const USER_AGENT: &str = concat!("flagwise-rust/", env!("CARGO_PKG_VERSION"));

/// Snapshot endpoint, relative to the base URL.
pub const FLAGS_PATH: &str = "/sdk/flags";

#[derive(Debug, Serialize)]
struct FlagsRequest<'a> {
    context: &'a EvaluationContext,
}

#[derive(Debug, Deserialize)]
struct FlagsResponse {
    flags: FlagSnapshot,
}

/// Fetches evaluated snapshots over HTTP.
pub struct HttpClient {
    client: Client,
    base_url: String,
    sdk_key: String,
}

impl HttpClient {
    /// Create a client from runtime options.
    pub fn new(options: &RuntimeOptions) -> Result<Self> {
        let client = Client::builder()
            .timeout(options.timeout)
            .build()
            .map_err(|e| {
                FlagwiseError::with_source(ErrorCode::NetworkError, "Failed to create HTTP client", e)
            })?;

        Ok(Self {
            client,
            base_url: options.base_url.clone(),
            sdk_key: options.sdk_key.clone(),
        })
    }

    /// The base URL requests go to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// POST `body` as JSON to `path` and decode the JSON response.
    pub async fn post<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);

        let response = self
            .client
            .post(&url)
            .header("X-API-Key", &self.sdk_key)
            .header("User-Agent", USER_AGENT)
            .json(body)
            .send()
            .await
            .map_err(convert_error)?;

        handle_response(response).await
    }
}

#[async_trait]
impl SnapshotFetcher for HttpClient {
    async fn fetch_snapshot(&self, context: &EvaluationContext) -> Result<FlagSnapshot> {
        let response: FlagsResponse = self.post(FLAGS_PATH, &FlagsRequest { context }).await?;
        tracing::debug!(flags = response.flags.len(), "Fetched flag snapshot");
        Ok(response.flags)
    }
}

async fn handle_response<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let status = response.status();

    if status.is_success() {
        let body = response.text().await.map_err(|e| {
            FlagwiseError::with_source(ErrorCode::HttpInvalidResponse, "Failed to read response", e)
        })?;

        serde_json::from_str(&body).map_err(|e| {
            FlagwiseError::with_source(
                ErrorCode::HttpInvalidResponse,
                format!("Failed to parse response: {}", e),
                e,
            )
        })
    } else {
        let body = response.text().await.unwrap_or_default();
        Err(status_to_error(status, &body))
    }
}

pub(crate) fn status_to_error(status: StatusCode, body: &str) -> FlagwiseError {
    let (code, category) = match status {
        StatusCode::BAD_REQUEST => (ErrorCode::HttpBadRequest, "Client Error"),
        StatusCode::UNAUTHORIZED => (ErrorCode::HttpUnauthorized, "Authentication Error"),
        StatusCode::FORBIDDEN => (ErrorCode::HttpForbidden, "Authorization Error"),
        StatusCode::NOT_FOUND => (ErrorCode::HttpNotFound, "Not Found"),
        StatusCode::TOO_MANY_REQUESTS => (ErrorCode::HttpRateLimited, "Rate Limited"),
        s if s.is_server_error() => (ErrorCode::HttpServerError, "Server Error"),
        s if s.is_client_error() => (ErrorCode::HttpBadRequest, "Client Error"),
        _ => (ErrorCode::HttpServerError, "Server Error"),
    };

    FlagwiseError::network_error(code, format!("{}: {} - {}", category, status.as_u16(), body))
}

pub(crate) fn convert_error(error: reqwest::Error) -> FlagwiseError {
    if error.is_timeout() {
        FlagwiseError::with_source(ErrorCode::HttpTimeout, "Request timed out", error)
    } else if error.is_connect() {
        FlagwiseError::with_source(ErrorCode::HttpNetworkError, "Connection failed", error)
    } else {
        FlagwiseError::with_source(ErrorCode::NetworkError, error.to_string(), error)
    }
}
