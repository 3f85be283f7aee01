// crates/fast-fetch-core/src/lib.rs
// ============================================================================
// Module: Fast Fetch Core
// Description: Data model, header parsing, and render decisions for ad slots.
// Purpose: Provide the backend-agnostic contract of the creative pipeline.
// Dependencies: serde, serde_json, base64, tokio (sync), thiserror, async-trait
// ============================================================================

//! ## Overview
//! Fast Fetch core defines the data model shared by every stage of the
//! fetch, verify, select, render pipeline: response records, verification
//! verdicts, render decisions, creative metadata extraction, cooperative
//! cancellation, and the collaborator interfaces implemented by hosts and ad
//! networks.
//! Invariants:
//! - Header names are matched case-insensitively; header values are not.
//! - A verified creative always selects the trusted render mode.
//! - Malformed metadata yields no record rather than a partial one.
//!
//! Security posture: creative bytes and response headers are untrusted input.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use crate::core::cancel::CancellationToken;
pub use crate::core::cancel::Cancelled;
pub use crate::core::errors::LayoutError;
pub use crate::core::errors::NetworkFailure;
pub use crate::core::errors::PipelineError;
pub use crate::core::errors::RenderError;
pub use crate::core::events::LifecycleStage;
pub use crate::core::headers;
pub use crate::core::headers::ResponseHeaders;
pub use crate::core::metadata::CreativeMetadata;
pub use crate::core::metadata::CustomStylesheet;
pub use crate::core::metadata::extract_metadata;
pub use crate::core::render::RenderDecision;
pub use crate::core::render::RenderMode;
pub use crate::core::render::SafeframeVersion;
pub use crate::core::render::SlotSize;
pub use crate::core::render::select_render_mode;
pub use crate::core::response::CreativeResponse;
pub use crate::core::state::PipelineState;
pub use crate::core::verification::SignatureHeader;
pub use crate::core::verification::VerificationStatus;
pub use crate::core::verification::VerifierSelection;
pub use crate::interfaces::AdNetwork;
pub use crate::interfaces::CreativeTransport;
pub use crate::interfaces::CrossDomainRender;
pub use crate::interfaces::Diagnostic;
pub use crate::interfaces::DiagnosticLevel;
pub use crate::interfaces::DiagnosticSink;
pub use crate::interfaces::LifecycleEventSink;
pub use crate::interfaces::NetworkFailureDirective;
pub use crate::interfaces::ResourceScheduler;
pub use crate::interfaces::SlotLayout;
pub use crate::interfaces::SlotRenderer;
pub use crate::interfaces::TrustedRender;
pub use crate::interfaces::VisibilitySignal;

#[cfg(test)]
mod tests;
