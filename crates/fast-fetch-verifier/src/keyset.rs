// crates/fast-fetch-verifier/src/keyset.rs
// ============================================================================
// Module: Keysets
// Description: JSON Web Key Set parsing for Ed25519 signing keys.
// Purpose: Turn a provider's keyset document into verifying keys.
// Dependencies: base64, ed25519-dalek, serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! Keyset documents follow the JWK Set shape `{"keys": [...]}`. Only
//! `kty = "OKP"`, `crv = "Ed25519"` signing keys are used; every other entry
//! is skipped so providers can publish mixed sets. A document that is not a
//! key set at all is rejected.

// ============================================================================
// SECTION: Imports
// ============================================================================

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use ed25519_dalek::PUBLIC_KEY_LENGTH;
use ed25519_dalek::VerifyingKey;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Keyset resolution errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
/// - Errors are cloneable so cached failures can be shared.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeysetError {
    /// No provider with this name is registered.
    #[error("unknown key provider: {0}")]
    UnknownProvider(String),
    /// A provider with this name is already registered.
    #[error("duplicate key provider: {0}")]
    DuplicateProvider(String),
    /// Fetching the keyset failed.
    #[error("keyset fetch failed for {provider}: {reason}")]
    Fetch {
        /// Provider name.
        provider: String,
        /// Failure description.
        reason: String,
    },
    /// The keyset document is not a key set.
    #[error("invalid keyset from {provider}: {reason}")]
    Invalid {
        /// Provider name.
        provider: String,
        /// Failure description.
        reason: String,
    },
    /// The fetch task ended without producing a result.
    #[error("keyset resolution abandoned for {0}")]
    Abandoned(String),
}

// ============================================================================
// SECTION: Key Info
// ============================================================================

/// One trusted public key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyInfo {
    /// Owning provider name.
    pub provider: String,
    /// Key identifier from the keyset, if any.
    pub key_id: Option<String>,
    /// Ed25519 verifying key.
    pub key: VerifyingKey,
}

// ============================================================================
// SECTION: Parsing
// ============================================================================

/// Raw JWK set document.
#[derive(Debug, Deserialize)]
struct JwkSet {
    /// Key entries; parsed individually so bad entries can be skipped.
    keys: Vec<Value>,
}

/// Fields of a JWK entry relevant to Ed25519 keys.
#[derive(Debug, Deserialize)]
struct Jwk {
    /// Key type.
    kty: Option<String>,
    /// Curve name.
    crv: Option<String>,
    /// Base64url public key.
    x: Option<String>,
    /// Key identifier.
    kid: Option<String>,
    /// Public key use.
    #[serde(rename = "use")]
    key_use: Option<String>,
}

/// Parses a keyset document for `provider`, keeping document order.
///
/// # Errors
///
/// Returns [`KeysetError::Invalid`] when the document is not JSON or has no
/// `keys` array.
pub fn parse_keyset(provider: &str, bytes: &[u8]) -> Result<Vec<KeyInfo>, KeysetError> {
    let set: JwkSet = serde_json::from_slice(bytes).map_err(|err| KeysetError::Invalid {
        provider: provider.to_string(),
        reason: err.to_string(),
    })?;
    Ok(set.keys.into_iter().filter_map(|entry| parse_entry(provider, entry)).collect())
}

/// Converts one JWK entry into a key, skipping unsupported entries.
fn parse_entry(provider: &str, entry: Value) -> Option<KeyInfo> {
    let jwk: Jwk = serde_json::from_value(entry).ok()?;
    if jwk.kty.as_deref() != Some("OKP") || jwk.crv.as_deref() != Some("Ed25519") {
        return None;
    }
    if jwk.key_use.as_deref().is_some_and(|key_use| key_use != "sig") {
        return None;
    }
    let raw = URL_SAFE_NO_PAD.decode(jwk.x?.trim_end_matches('=')).ok()?;
    let bytes: [u8; PUBLIC_KEY_LENGTH] = raw.as_slice().try_into().ok()?;
    let key = VerifyingKey::from_bytes(&bytes).ok()?;
    Some(KeyInfo {
        provider: provider.to_string(),
        key_id: jwk.kid,
        key,
    })
}
