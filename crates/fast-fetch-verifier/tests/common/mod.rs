// crates/fast-fetch-verifier/tests/common/mod.rs
// ============================================================================
// Module: Common Verifier Fixtures
// Description: Deterministic keys, scripted key sources, and counting checks.
// Purpose: Drive the verification race without network access.
// Dependencies: fast-fetch-core, fast-fetch-verifier, ed25519-dalek
// ============================================================================

//! ## Overview
//! Keys are derived from fixed seeds so signatures are reproducible. Scripted
//! sources and checks let tests control exactly when each provider resolves
//! and how each key behaves.

#![allow(dead_code, reason = "Shared test helpers may be unused in some cases.")]
#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only panic-based assertions are permitted."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use ed25519_dalek::Signer;
use ed25519_dalek::SigningKey;
use fast_fetch_core::ResponseHeaders;
use fast_fetch_core::VerifierSelection;
use fast_fetch_verifier::Ed25519SignatureCheck;
use fast_fetch_verifier::KeyInfo;
use fast_fetch_verifier::KeySender;
use fast_fetch_verifier::KeySource;
use fast_fetch_verifier::KeyStream;
use fast_fetch_verifier::KeysetError;
use fast_fetch_verifier::SignatureCheck;
use serde_json::Value;
use serde_json::json;

// ============================================================================
// SECTION: Keys
// ============================================================================

/// Deterministic signing key for `seed`.
pub fn signing_key(seed: u8) -> SigningKey {
    SigningKey::from_bytes(&[seed; 32])
}

/// Public key record for `seed` owned by `provider`.
pub fn key_info(provider: &str, kid: &str, seed: u8) -> KeyInfo {
    KeyInfo {
        provider: provider.to_string(),
        key_id: Some(kid.to_string()),
        key: signing_key(seed).verifying_key(),
    }
}

/// JWK entry for `seed`.
pub fn jwk(kid: &str, seed: u8) -> Value {
    json!({
        "kty": "OKP",
        "crv": "Ed25519",
        "x": URL_SAFE_NO_PAD.encode(signing_key(seed).verifying_key().to_bytes()),
        "kid": kid,
    })
}

/// Headers carrying a signature over `payload` by `seed`.
pub fn signed_headers(payload: &[u8], seed: u8, selection: VerifierSelection) -> ResponseHeaders {
    let signature = signing_key(seed).sign(payload);
    [(selection.signature_header(), URL_SAFE_NO_PAD.encode(signature.to_bytes()))]
        .into_iter()
        .collect()
}

// ============================================================================
// SECTION: Scripted Key Source
// ============================================================================

/// How a scripted provider resolves.
pub enum Script {
    /// Resolves immediately with these keys.
    Keys(Vec<KeyInfo>),
    /// Resolves with keys delivered through a channel the test controls.
    Channel(Mutex<Option<KeyStream>>),
    /// Fails to resolve.
    Fail,
    /// Never resolves.
    Hang,
}

/// Key source whose providers follow scripts.
#[derive(Default)]
pub struct ScriptedSource {
    /// Providers in registration order.
    order: Vec<String>,
    /// Scripts by provider name.
    scripts: BTreeMap<String, Script>,
    /// Number of `resolve` calls.
    pub resolves: AtomicUsize,
}

impl ScriptedSource {
    pub fn with(mut self, name: &str, script: Script) -> Self {
        self.order.push(name.to_string());
        self.scripts.insert(name.to_string(), script);
        self
    }

    /// Adds a channel-backed provider and returns its sender.
    pub fn with_channel(self, name: &str) -> (Self, KeySender) {
        let (sender, stream) = KeyStream::channel(8);
        (self.with(name, Script::Channel(Mutex::new(Some(stream)))), sender)
    }
}

#[async_trait]
impl KeySource for ScriptedSource {
    fn provider_names(&self) -> Vec<String> {
        self.order.clone()
    }

    async fn resolve(&self, provider: &str) -> Result<KeyStream, KeysetError> {
        self.resolves.fetch_add(1, Ordering::SeqCst);
        match self.scripts.get(provider) {
            Some(Script::Keys(keys)) => Ok(KeyStream::from_keys(keys.clone())),
            Some(Script::Channel(stream)) => stream
                .lock()
                .unwrap()
                .take()
                .ok_or_else(|| KeysetError::Abandoned(provider.to_string())),
            Some(Script::Hang) => std::future::pending().await,
            Some(Script::Fail) => Err(KeysetError::Fetch {
                provider: provider.to_string(),
                reason: "scripted failure".to_string(),
            }),
            None => Err(KeysetError::UnknownProvider(provider.to_string())),
        }
    }
}

// ============================================================================
// SECTION: Signature Checks
// ============================================================================

/// Real Ed25519 check that counts invocations.
#[derive(Default)]
pub struct CountingCheck {
    pub calls: AtomicUsize,
}

#[async_trait]
impl SignatureCheck for CountingCheck {
    async fn check(&self, key: &KeyInfo, payload: &[u8], signature: &[u8]) -> bool {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ed25519SignatureCheck.check(key, payload, signature).await
    }
}

/// Per-key behavior of a [`ScriptedCheck`].
#[derive(Clone, Copy)]
pub enum KeyBehavior {
    Pass,
    Fail,
    PassAfter(Duration),
    Hang,
}

/// Check whose outcome is scripted per key id.
#[derive(Default)]
pub struct ScriptedCheck {
    behaviors: BTreeMap<String, KeyBehavior>,
    pub checked: Mutex<Vec<String>>,
}

impl ScriptedCheck {
    pub fn with(mut self, kid: &str, behavior: KeyBehavior) -> Self {
        self.behaviors.insert(kid.to_string(), behavior);
        self
    }

    pub fn checked(&self) -> Vec<String> {
        self.checked.lock().unwrap().clone()
    }
}

#[async_trait]
impl SignatureCheck for ScriptedCheck {
    async fn check(&self, key: &KeyInfo, _payload: &[u8], _signature: &[u8]) -> bool {
        let kid = key.key_id.clone().unwrap_or_default();
        self.checked.lock().unwrap().push(kid.clone());
        match self.behaviors.get(&kid).copied().unwrap_or(KeyBehavior::Fail) {
            KeyBehavior::Pass => true,
            KeyBehavior::Fail => false,
            KeyBehavior::PassAfter(delay) => {
                tokio::time::sleep(delay).await;
                true
            }
            KeyBehavior::Hang => std::future::pending().await,
        }
    }
}

/// Shared handle helper.
pub fn shared<T>(value: T) -> Arc<T> {
    Arc::new(value)
}
