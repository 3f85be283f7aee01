// crates/fast-fetch-verifier/src/tests.rs
// ============================================================================
// Module: Verifier Test Lint Configuration
// Description: Shared test-only lint relaxations for verifier unit tests.
// Purpose: Allow panic-based assertions and debug output in tests.
// Dependencies: fast-fetch-verifier
// ============================================================================

//! ## Overview
//! Provides test-only lint relaxations and in-crate tests for key streams.

// ============================================================================
// SECTION: Lint Configuration
// ============================================================================

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

// ============================================================================
// SECTION: Key Streams
// ============================================================================

use ed25519_dalek::SigningKey;

use crate::keyset::KeyInfo;
use crate::stream::KeyStream;

fn key(kid: &str, seed: u8) -> KeyInfo {
    KeyInfo {
        provider: "alpha".to_string(),
        key_id: Some(kid.to_string()),
        key: SigningKey::from_bytes(&[seed; 32]).verifying_key(),
    }
}

#[tokio::test]
async fn from_keys_yields_in_order_then_ends() {
    let mut stream = KeyStream::from_keys(vec![key("a", 1), key("b", 2), key("c", 3)]);
    let mut seen = Vec::new();
    while let Some(next) = stream.next().await {
        seen.push(next.key_id.unwrap());
    }
    assert_eq!(seen, vec!["a", "b", "c"]);
}

#[tokio::test]
async fn empty_stream_ends_immediately() {
    let mut stream = KeyStream::from_keys(Vec::new());
    assert!(stream.next().await.is_none());
}

#[tokio::test]
async fn channel_stream_ends_when_sender_drops() {
    let (sender, mut stream) = KeyStream::channel(1);
    let feeder = tokio::spawn(async move {
        assert!(sender.send(key("a", 1)).await);
        assert!(sender.send(key("b", 2)).await);
    });
    assert_eq!(stream.next().await.unwrap().key_id.as_deref(), Some("a"));
    assert_eq!(stream.next().await.unwrap().key_id.as_deref(), Some("b"));
    feeder.await.unwrap();
    assert!(stream.next().await.is_none());
}
