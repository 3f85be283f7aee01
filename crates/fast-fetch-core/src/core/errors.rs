// crates/fast-fetch-core/src/core/errors.rs
// ============================================================================
// Module: Pipeline Errors
// Description: Error taxonomy for fetch, render, layout, and pipeline runs.
// Purpose: Classify failures so the controller can absorb or surface them.
// Dependencies: thiserror, crate::core::cancel
// ============================================================================

//! ## Overview
//! Network, verification, and metadata failures are absorbed into a
//! cross-domain render decision. Render failures are recovered once.
//! Cancellation and configuration errors always surface.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

use crate::core::cancel::Cancelled;

// ============================================================================
// SECTION: Network Failures
// ============================================================================

/// Classified ad request failure.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NetworkFailure {
    /// The request URL could not be built or parsed.
    #[error("invalid ad url: {0}")]
    InvalidUrl(String),
    /// The transport failed before a response arrived.
    #[error("transport error: {0}")]
    Transport(String),
    /// The server answered with a non-success status.
    #[error("unexpected http status {0}")]
    Status(u16),
    /// The access-control origin header did not echo the requesting origin.
    #[error("source origin mismatch: expected {expected}, got {}", actual.as_deref().unwrap_or("<missing>"))]
    OriginMismatch {
        /// Origin asserted by the request.
        expected: String,
        /// Origin echoed by the response, if any.
        actual: Option<String>,
    },
    /// The response body exceeded the configured limit.
    #[error("response exceeds size limit of {limit} bytes")]
    TooLarge {
        /// Configured limit in bytes.
        limit: usize,
    },
}

// ============================================================================
// SECTION: Collaborator Errors
// ============================================================================

/// Failure reported by a slot renderer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("render failed: {0}")]
pub struct RenderError(pub String);

/// Failure reported by slot layout.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LayoutError {
    /// The host refused the size change.
    #[error("size change rejected")]
    Rejected,
    /// The layout collaborator failed.
    #[error("layout error: {0}")]
    Failed(String),
}

// ============================================================================
// SECTION: Pipeline Errors
// ============================================================================

/// Error surfaced by a pipeline run.
///
/// # Invariants
/// - `Cancelled` is never reported through error sampling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    /// The run was superseded or the slot was unlaid out.
    #[error("CANCELLED")]
    Cancelled,
    /// The slot cannot host an ad, e.g. fixed positioning.
    #[error("configuration error: {0}")]
    Configuration(String),
    /// The ad request failed.
    #[error("network failure: {0}")]
    Network(#[from] NetworkFailure),
    /// Creative metadata was missing or malformed.
    #[error("invalid creative metadata")]
    MetadataInvalid,
    /// Rendering failed after the one allowed fallback.
    #[error("{0}")]
    Render(#[from] RenderError),
    /// An ad network hook or collaborator failed unexpectedly.
    #[error("{0}")]
    Unexpected(String),
}

impl PipelineError {
    /// Returns true for cancellation.
    #[must_use]
    pub const fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Returns a stable label for the error kind.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Cancelled => "cancelled",
            Self::Configuration(_) => "configuration",
            Self::Network(_) => "network",
            Self::MetadataInvalid => "metadata_invalid",
            Self::Render(_) => "render",
            Self::Unexpected(_) => "unexpected",
        }
    }
}

impl From<Cancelled> for PipelineError {
    fn from(_: Cancelled) -> Self {
        Self::Cancelled
    }
}
