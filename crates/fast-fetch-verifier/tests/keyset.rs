// crates/fast-fetch-verifier/tests/keyset.rs
// ============================================================================
// Module: Keyset Parsing Tests
// Description: JWK set parsing for Ed25519 keys.
// Purpose: Ensure unsupported entries are skipped and documents fail closed.
// ============================================================================

//! ## Overview
//! Feeds mixed and malformed keyset documents to [`parse_keyset`].

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

mod common;

use fast_fetch_verifier::KeysetError;
use fast_fetch_verifier::parse_keyset;
use serde_json::json;

use crate::common::jwk;
use crate::common::signing_key;

#[test]
fn keeps_supported_keys_in_document_order() {
    let document = json!({"keys": [jwk("first", 1), jwk("second", 2)]});
    let keys = parse_keyset("alpha", &serde_json::to_vec(&document).unwrap()).unwrap();
    let ids: Vec<Option<&str>> = keys.iter().map(|key| key.key_id.as_deref()).collect();
    assert_eq!(ids, vec![Some("first"), Some("second")]);
    assert_eq!(keys[1].key, signing_key(2).verifying_key());
    assert!(keys.iter().all(|key| key.provider == "alpha"));
}

#[test]
fn skips_unsupported_entries() {
    let document = json!({"keys": [
        {"kty": "RSA", "n": "AQAB", "e": "AQAB", "kid": "rsa"},
        {"kty": "OKP", "crv": "X25519", "x": "AAAA", "kid": "x25519"},
        {"kty": "OKP", "crv": "Ed25519", "x": "too-short", "kid": "short"},
        {"kty": "OKP", "crv": "Ed25519", "kid": "no-x"},
        {"kty": "OKP", "crv": "Ed25519", "use": "enc", "x": jwk("enc", 3)["x"], "kid": "enc"},
        "not an object",
        jwk("good", 4),
    ]});
    let keys = parse_keyset("alpha", &serde_json::to_vec(&document).unwrap()).unwrap();
    assert_eq!(keys.len(), 1);
    assert_eq!(keys[0].key_id.as_deref(), Some("good"));
}

#[test]
fn missing_kid_is_allowed() {
    let mut entry = jwk("ignored", 5);
    entry.as_object_mut().unwrap().remove("kid");
    let keys = parse_keyset("alpha", &serde_json::to_vec(&json!({"keys": [entry]})).unwrap()).unwrap();
    assert_eq!(keys[0].key_id, None);
}

#[test]
fn non_keyset_documents_fail_closed() {
    for document in [&b"not json"[..], br#"{"keys": {}}"#, br#"[]"#, br#"{}"#] {
        assert!(matches!(parse_keyset("alpha", document), Err(KeysetError::Invalid { .. })));
    }
}
