// crates/fast-fetch-verifier/src/lib.rs
// ============================================================================
// Module: Fast Fetch Verifier
// Description: Key provider registry and multi-key signature verification.
// Purpose: Decide whether a creative was signed by a trusted key provider.
// Dependencies: fast-fetch-core, ed25519-dalek, reqwest, tokio, serde_json
// ============================================================================

//! ## Overview
//! The verifier resolves named key providers to cached JSON Web Key Sets and
//! races every provider's keys against a creative signature. The first key to
//! validate wins; providers whose keys were never needed are reported.
//! Invariants:
//! - Each provider's keyset is fetched at most once per registry, failures
//!   included.
//! - Within a provider keys are tried in order; providers race each other.
//! - A missing signature is `Unverified` and contacts no provider.
//!
//! Security posture: keyset documents and signatures are untrusted input.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod check;
pub mod http;
pub mod keyset;
pub mod registry;
pub mod service;
pub mod stream;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use check::Ed25519SignatureCheck;
pub use check::SignatureCheck;
pub use http::HttpKeysetFetcher;
pub use http::HttpKeysetFetcherConfig;
pub use keyset::KeyInfo;
pub use keyset::KeysetError;
pub use keyset::parse_keyset;
pub use registry::KeyProvider;
pub use registry::KeyProviderRegistry;
pub use registry::KeysetFetcher;
pub use service::SignatureVerificationService;
pub use stream::KeySender;
pub use stream::KeySource;
pub use stream::KeyStream;

#[cfg(test)]
mod tests;
