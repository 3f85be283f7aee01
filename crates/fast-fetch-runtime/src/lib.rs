// crates/fast-fetch-runtime/src/lib.rs
// ============================================================================
// Module: Fast Fetch Runtime
// Description: Slot lifecycle controller and its concrete collaborators.
// Purpose: Drive fetch, verify, select, and render for one ad slot.
// Dependencies: fast-fetch-core, fast-fetch-verifier, fast-fetch-config,
//               reqwest, tokio, rand, serde_json
// ============================================================================

//! ## Overview
//! The runtime owns the per-slot state machine ([`AdLifecycleController`]),
//! the creative fetcher with its source-origin assertion, the HTTP creative
//! transport, the error reporter with production sampling, and JSON-line
//! lifecycle and diagnostic sinks. [`DocumentContext`] wires these together
//! from a validated [`fast_fetch_config::FastFetchConfig`].
//!
//! Security posture: creative responses are untrusted. Only verified
//! creatives are rendered same-origin; everything else is sandboxed.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod acme;
pub mod context;
pub mod controller;
pub mod fetcher;
pub mod http;
pub mod reporter;
pub mod sinks;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use acme::AcmeNetwork;
pub use acme::acme_is_enabled;
pub use context::ContextError;
pub use context::DocumentContext;
pub use context::SlotHost;
pub use controller::AdLifecycleController;
pub use controller::ControllerSettings;
pub use controller::LayoutOutcome;
pub use controller::SlotEnvironment;
pub use controller::UnlayoutOutcome;
pub use fetcher::CreativeFetcher;
pub use fetcher::FetchOutcome;
pub use fetcher::source_origin_url;
pub use http::HttpCreativeTransport;
pub use http::HttpCreativeTransportConfig;
pub use reporter::ErrorReporter;
pub use reporter::RandomSource;
pub use reporter::ReportedError;
pub use reporter::ThreadRandom;
pub use reporter::assign_ad_url_to_error;
pub use reporter::protect_callback;
pub use sinks::FileLifecycleSink;
pub use sinks::JsonLinesLifecycleSink;
pub use sinks::MemoryDiagnostics;
pub use sinks::MemoryLifecycleSink;
pub use sinks::NoopDiagnostics;
pub use sinks::NoopLifecycleSink;
pub use sinks::RecordedEvent;
pub use sinks::StderrDiagnostics;
pub use sinks::StderrLifecycleSink;
