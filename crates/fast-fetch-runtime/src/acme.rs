// crates/fast-fetch-runtime/src/acme.rs
// ============================================================================
// Module: Acme Ad Network
// Description: Bundled reference ad network.
// Purpose: Exercise the AdNetwork seam end to end with a concrete network.
// Dependencies: async-trait, fast-fetch-core
// ============================================================================

//! ## Overview
//! Acme serves creatives from `http://www.acme.com/_a4a/<src>` and signs them
//! through the `cloudflare` and `cloudflare-dev` providers. Its signatures
//! travel in the legacy `X-AmpAdSignature` header. A slot opts in with a
//! `src` attribute and `data-a4a="true"`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use async_trait::async_trait;
use fast_fetch_core::AdNetwork;
use fast_fetch_core::PipelineError;
use fast_fetch_core::VerifierSelection;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Network identifier.
pub const ACME_NETWORK_TYPE: &str = "acme";
/// Prefix every Acme ad URL starts with.
pub const ACME_AD_URL_PREFIX: &str = "http://www.acme.com/_a4a/";
/// Providers trusted to sign Acme creatives.
pub const ACME_SIGNING_PROVIDERS: [&str; 2] = ["cloudflare", "cloudflare-dev"];
/// Signature header Acme uses.
pub const ACME_VERIFIER_SELECTION: VerifierSelection = VerifierSelection::Legacy;

// ============================================================================
// SECTION: Network
// ============================================================================

/// Returns true when a slot with `attributes` should use the Acme pipeline.
#[must_use]
pub fn acme_is_enabled(attributes: &BTreeMap<String, String>) -> bool {
    attributes.get("src").is_some_and(|src| !src.is_empty())
        && attributes.get("data-a4a").is_some_and(|flag| flag == "true")
}

/// Reference ad network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcmeNetwork {
    /// Slot `src` attribute.
    src: String,
}

impl AcmeNetwork {
    /// Creates the network for a slot whose `src` is `src`.
    #[must_use]
    pub fn new(src: impl Into<String>) -> Self {
        Self {
            src: src.into(),
        }
    }

    /// Creates the network from slot attributes.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Configuration`] when the slot has not opted
    /// in.
    pub fn from_attributes(attributes: &BTreeMap<String, String>) -> Result<Self, PipelineError> {
        if !acme_is_enabled(attributes) {
            return Err(PipelineError::Configuration(
                "acme slots require src and data-a4a=\"true\"".to_string(),
            ));
        }
        Ok(Self::new(attributes.get("src").cloned().unwrap_or_default()))
    }

    /// Returns the ad request URL.
    #[must_use]
    pub fn ad_url(&self) -> String {
        format!("{ACME_AD_URL_PREFIX}{}", self.src.trim_start_matches('/'))
    }
}

#[async_trait]
impl AdNetwork for AcmeNetwork {
    fn network_type(&self) -> &str {
        ACME_NETWORK_TYPE
    }

    async fn build_request_url(&self) -> Result<String, PipelineError> {
        Ok(self.ad_url())
    }

    fn signing_provider_names(&self) -> Vec<String> {
        ACME_SIGNING_PROVIDERS.iter().map(ToString::to_string).collect()
    }

    fn verifier_selection(&self) -> Option<VerifierSelection> {
        Some(ACME_VERIFIER_SELECTION)
    }
}
