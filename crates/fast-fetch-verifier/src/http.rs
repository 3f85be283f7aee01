// crates/fast-fetch-verifier/src/http.rs
// ============================================================================
// Module: HTTP Keyset Fetcher
// Description: Bounded HTTP retrieval of provider keyset documents.
// Purpose: Fetch keysets with scheme restrictions and size limits.
// Dependencies: reqwest, url, crate::registry
// ============================================================================

//! ## Overview
//! Issues one GET per provider keyset. Redirects are not followed, cleartext
//! HTTP is refused unless enabled, embedded URL credentials are rejected, and
//! bodies larger than the configured limit fail closed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::Response;
use reqwest::redirect::Policy;
use url::Url;

use crate::keyset::KeysetError;
use crate::registry::KeyProvider;
use crate::registry::KeysetFetcher;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Configuration for [`HttpKeysetFetcher`].
///
/// # Invariants
/// - `allow_http = false` blocks cleartext `http://` URLs.
/// - `max_response_bytes` is a hard upper bound on keyset bodies.
/// - `timeout_ms` applies to the full request lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpKeysetFetcherConfig {
    /// Allow cleartext HTTP (disabled by default).
    pub allow_http: bool,
    /// Request timeout in milliseconds.
    pub timeout_ms: u64,
    /// Maximum keyset size, in bytes.
    pub max_response_bytes: usize,
    /// User agent string for outbound requests.
    pub user_agent: String,
}

impl Default for HttpKeysetFetcherConfig {
    fn default() -> Self {
        Self {
            allow_http: false,
            timeout_ms: 5_000,
            max_response_bytes: 64 * 1024,
            user_agent: "fast-fetch/0.1".to_string(),
        }
    }
}

// ============================================================================
// SECTION: Fetcher
// ============================================================================

/// Keyset fetcher backed by an async HTTP client.
pub struct HttpKeysetFetcher {
    /// Fetch limits and policy.
    config: HttpKeysetFetcherConfig,
    /// Shared HTTP client.
    client: Client,
}

impl HttpKeysetFetcher {
    /// Creates a fetcher.
    ///
    /// # Errors
    ///
    /// Returns [`KeysetError::Fetch`] when the HTTP client cannot be built.
    pub fn new(config: HttpKeysetFetcherConfig) -> Result<Self, KeysetError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .user_agent(config.user_agent.clone())
            .redirect(Policy::none())
            .build()
            .map_err(|err| KeysetError::Fetch {
                provider: String::new(),
                reason: format!("http client build failed: {err}"),
            })?;
        Ok(Self {
            config,
            client,
        })
    }
}

#[async_trait]
impl KeysetFetcher for HttpKeysetFetcher {
    async fn fetch_keyset(&self, provider: &KeyProvider) -> Result<Vec<u8>, KeysetError> {
        let fail = |reason: String| KeysetError::Fetch {
            provider: provider.name.clone(),
            reason,
        };
        validate_url(&provider.keyset_url, &self.config).map_err(fail)?;
        let response = self
            .client
            .get(provider.keyset_url.as_str())
            .send()
            .await
            .map_err(|err| fail(format!("request failed: {err}")))?;
        if response.url() != &provider.keyset_url {
            return Err(fail("redirect not allowed".to_string()));
        }
        let status = response.status();
        if !status.is_success() {
            return Err(fail(format!("unexpected status {}", status.as_u16())));
        }
        read_body_limited(response, self.config.max_response_bytes).await.map_err(fail)
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Validates URL scheme and credential policy.
fn validate_url(url: &Url, config: &HttpKeysetFetcherConfig) -> Result<(), String> {
    match url.scheme() {
        "https" => {}
        "http" if config.allow_http => {}
        _ => return Err("unsupported url scheme".to_string()),
    }
    if !url.username().is_empty() || url.password().is_some() {
        return Err("url credentials are not allowed".to_string());
    }
    if url.host_str().is_none() {
        return Err("url host required".to_string());
    }
    Ok(())
}

/// Reads a response body while enforcing a byte limit.
async fn read_body_limited(mut response: Response, limit: usize) -> Result<Vec<u8>, String> {
    if let Some(expected) = response.content_length()
        && !usize::try_from(expected).is_ok_and(|expected| expected <= limit)
    {
        return Err("keyset exceeds size limit".to_string());
    }
    let mut body = Vec::new();
    while let Some(chunk) =
        response.chunk().await.map_err(|err| format!("failed to read body: {err}"))?
    {
        if body.len().saturating_add(chunk.len()) > limit {
            return Err("keyset exceeds size limit".to_string());
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body)
}
