// crates/fast-fetch-runtime/src/fetcher.rs
// ============================================================================
// Module: Creative Fetcher
// Description: Ad request with source-origin assertion and outcome triage.
// Purpose: Turn a raw transport response into a creative or no-content.
// Dependencies: fast-fetch-core, url
// ============================================================================

//! ## Overview
//! Every ad request carries `__amp_source_origin=<origin>`. A successful
//! response must echo that origin in
//! `AMP-Access-Control-Allow-Source-Origin`; anything else is a network
//! failure. A 204 or an empty body is the no-content outcome.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use fast_fetch_core::CreativeResponse;
use fast_fetch_core::CreativeTransport;
use fast_fetch_core::NetworkFailure;
use fast_fetch_core::headers::ALLOW_SOURCE_ORIGIN_HEADER;
use fast_fetch_core::headers::SOURCE_ORIGIN_PARAM;
use url::Url;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Result of a successful ad request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// A creative body arrived.
    Creative(CreativeResponse),
    /// The server has no ad for this slot.
    NoContent,
}

/// Issues ad requests through a [`CreativeTransport`].
#[derive(Clone)]
pub struct CreativeFetcher {
    /// Underlying transport.
    transport: Arc<dyn CreativeTransport>,
}

impl CreativeFetcher {
    /// Creates a fetcher over `transport`.
    #[must_use]
    pub fn new(transport: Arc<dyn CreativeTransport>) -> Self {
        Self {
            transport,
        }
    }

    /// Fetches the creative at `ad_url` on behalf of `source_origin`.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkFailure`] for malformed URLs, transport errors,
    /// non-success statuses, and source-origin mismatches.
    pub async fn fetch(
        &self,
        ad_url: &str,
        source_origin: &str,
    ) -> Result<FetchOutcome, NetworkFailure> {
        let request_url = source_origin_url(ad_url, source_origin)?;
        let response = self.transport.get(&request_url).await?;
        if !response.is_success() {
            return Err(NetworkFailure::Status(response.status()));
        }
        match response.headers().get(ALLOW_SOURCE_ORIGIN_HEADER) {
            Some(echoed) if echoed == source_origin => {}
            other => {
                return Err(NetworkFailure::OriginMismatch {
                    expected: source_origin.to_string(),
                    actual: other.map(str::to_string),
                });
            }
        }
        if response.status() == 204 || response.bytes().is_empty() {
            return Ok(FetchOutcome::NoContent);
        }
        Ok(FetchOutcome::Creative(response))
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Appends the source-origin assertion to `ad_url`.
///
/// # Errors
///
/// Returns [`NetworkFailure::InvalidUrl`] when `ad_url` is not absolute.
pub fn source_origin_url(ad_url: &str, source_origin: &str) -> Result<String, NetworkFailure> {
    let mut url =
        Url::parse(ad_url).map_err(|err| NetworkFailure::InvalidUrl(format!("{ad_url}: {err}")))?;
    url.query_pairs_mut().append_pair(SOURCE_ORIGIN_PARAM, source_origin);
    Ok(url.into())
}
