// crates/fast-fetch-runtime/src/http.rs
// ============================================================================
// Module: HTTP Creative Transport
// Description: Bounded async HTTP GET for ad requests.
// Purpose: Provide the production CreativeTransport.
// Dependencies: reqwest, fast-fetch-core
// ============================================================================

//! ## Overview
//! Issues one GET per ad request with a request timeout, no redirects, and a
//! hard body limit. Response headers are copied in arrival order; repeated
//! headers are joined.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use async_trait::async_trait;
use fast_fetch_core::CreativeResponse;
use fast_fetch_core::CreativeTransport;
use fast_fetch_core::NetworkFailure;
use fast_fetch_core::ResponseHeaders;
use reqwest::Client;
use reqwest::Response;
use reqwest::redirect::Policy;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Configuration for [`HttpCreativeTransport`].
///
/// # Invariants
/// - `max_response_bytes` is a hard upper bound on creative bodies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpCreativeTransportConfig {
    /// Request timeout in milliseconds.
    pub timeout_ms: u64,
    /// Maximum creative size, in bytes.
    pub max_response_bytes: usize,
    /// User agent string for ad requests.
    pub user_agent: String,
}

impl Default for HttpCreativeTransportConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 10_000,
            max_response_bytes: 1024 * 1024,
            user_agent: "fast-fetch/0.1".to_string(),
        }
    }
}

// ============================================================================
// SECTION: Transport
// ============================================================================

/// Creative transport backed by an async HTTP client.
pub struct HttpCreativeTransport {
    /// Body limit.
    max_response_bytes: usize,
    /// Shared HTTP client.
    client: Client,
}

impl HttpCreativeTransport {
    /// Creates a transport.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkFailure::Transport`] when the HTTP client cannot be
    /// built.
    pub fn new(config: &HttpCreativeTransportConfig) -> Result<Self, NetworkFailure> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .user_agent(config.user_agent.clone())
            .redirect(Policy::none())
            .build()
            .map_err(|err| NetworkFailure::Transport(format!("http client build failed: {err}")))?;
        Ok(Self {
            max_response_bytes: config.max_response_bytes,
            client,
        })
    }
}

#[async_trait]
impl CreativeTransport for HttpCreativeTransport {
    async fn get(&self, url: &str) -> Result<CreativeResponse, NetworkFailure> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|err| NetworkFailure::Transport(err.to_string()))?;
        let status = response.status().as_u16();
        let mut headers = ResponseHeaders::new();
        for (name, value) in response.headers() {
            if let Ok(value) = value.to_str() {
                headers.append(name.as_str(), value);
            }
        }
        let bytes = read_body_limited(response, self.max_response_bytes).await?;
        Ok(CreativeResponse::new(status, headers, bytes))
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Reads a response body while enforcing a byte limit.
async fn read_body_limited(mut response: Response, limit: usize) -> Result<Vec<u8>, NetworkFailure> {
    if let Some(expected) = response.content_length()
        && !usize::try_from(expected).is_ok_and(|expected| expected <= limit)
    {
        return Err(NetworkFailure::TooLarge {
            limit,
        });
    }
    let mut body = Vec::new();
    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|err| NetworkFailure::Transport(format!("failed to read body: {err}")))?
    {
        if body.len().saturating_add(chunk.len()) > limit {
            return Err(NetworkFailure::TooLarge {
                limit,
            });
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body)
}
