// crates/fast-fetch-verifier/src/check.rs
// ============================================================================
// Module: Signature Checks
// Description: Single-key signature validation.
// Purpose: Isolate the cryptographic check behind an async seam.
// Dependencies: async-trait, ed25519-dalek
// ============================================================================

//! ## Overview
//! [`SignatureCheck`] validates one signature against one key. The default
//! [`Ed25519SignatureCheck`] uses strict verification so malleable signatures
//! are rejected.

use async_trait::async_trait;
use ed25519_dalek::Signature;

use crate::keyset::KeyInfo;

/// Validates a payload signature against one key.
#[async_trait]
pub trait SignatureCheck: Send + Sync {
    /// Returns true when `signature` over `payload` validates under `key`.
    async fn check(&self, key: &KeyInfo, payload: &[u8], signature: &[u8]) -> bool;
}

/// Strict Ed25519 signature check.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ed25519SignatureCheck;

#[async_trait]
impl SignatureCheck for Ed25519SignatureCheck {
    async fn check(&self, key: &KeyInfo, payload: &[u8], signature: &[u8]) -> bool {
        let Ok(signature) = Signature::try_from(signature) else {
            return false;
        };
        key.key.verify_strict(payload, &signature).is_ok()
    }
}
