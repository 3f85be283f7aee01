// crates/fast-fetch-core/src/interfaces/mod.rs
// ============================================================================
// Module: Fast Fetch Interfaces
// Description: Collaborator contracts for ad networks, hosts, and sinks.
// Purpose: Define the seams between the pipeline and its environment.
// Dependencies: async-trait, serde, serde_json, crate::core
// ============================================================================

//! ## Overview
//! The lifecycle controller never touches a document, a scheduler, or a
//! network directly. Ad networks implement [`AdNetwork`]; hosts implement the
//! slot, scheduling, and sink traits. Implementations receive untrusted
//! creative data and must not assume it is well formed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::core::errors::LayoutError;
use crate::core::errors::NetworkFailure;
use crate::core::errors::PipelineError;
use crate::core::errors::RenderError;
use crate::core::metadata::CreativeMetadata;
use crate::core::render::RenderMode;
use crate::core::render::SafeframeVersion;
use crate::core::render::SlotSize;
use crate::core::response::CreativeResponse;
use crate::core::verification::VerifierSelection;

// ============================================================================
// SECTION: Ad Network
// ============================================================================

/// What to do after the ad request failed at the network layer.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum NetworkFailureDirective {
    /// Render the original request URL in a cached-content iframe.
    #[default]
    RenderOriginal,
    /// Render this URL in a cached-content iframe instead.
    RenderUrl(String),
    /// Render nothing.
    Suppress,
}

/// Capabilities an ad network plugs into the lifecycle controller.
#[async_trait]
pub trait AdNetwork: Send + Sync + 'static {
    /// Short network identifier used in error messages.
    fn network_type(&self) -> &str;

    /// Builds the ad request URL.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] when the URL cannot be produced.
    async fn build_request_url(&self) -> Result<String, PipelineError>;

    /// Names of the key providers trusted to sign this network's creatives.
    fn signing_provider_names(&self) -> Vec<String>;

    /// Signature header this network signs with; `None` uses the document
    /// default.
    fn verifier_selection(&self) -> Option<VerifierSelection> {
        None
    }

    /// Chooses the fallback after a network failure.
    fn on_network_failure(&self, _failure: &NetworkFailure, _ad_url: &str) -> NetworkFailureDirective {
        NetworkFailureDirective::RenderOriginal
    }

    /// Called once a creative has been placed in the slot.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] when the network's bookkeeping fails; the
    /// controller reports the failure and keeps the render.
    fn on_creative_rendered(&self, _is_verified: bool) -> Result<(), PipelineError> {
        Ok(())
    }

    /// Whether the ad request waits until the slot is within render-ahead range.
    fn delay_ad_request_enabled(&self) -> bool {
        false
    }
}

// ============================================================================
// SECTION: Transport
// ============================================================================

/// Performs the ad request.
#[async_trait]
pub trait CreativeTransport: Send + Sync {
    /// Issues a GET for `url` and returns the raw response.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkFailure`] for transport errors and oversized bodies.
    async fn get(&self, url: &str) -> Result<CreativeResponse, NetworkFailure>;
}

// ============================================================================
// SECTION: Slot Renderer
// ============================================================================

/// Input for a trusted same-origin render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrustedRender {
    /// Ad request URL the creative came from.
    pub ad_url: String,
    /// Extracted creative metadata.
    pub metadata: CreativeMetadata,
}

/// Input for a sandboxed cross-domain render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrossDomainRender {
    /// Selected cross-domain mode.
    pub mode: RenderMode,
    /// Frame source URL for the cached-content iframe.
    pub src: String,
    /// Creative markup for safeframe and name-frame renders.
    pub creative: Option<String>,
    /// Safeframe version to load.
    pub safeframe_version: SafeframeVersion,
    /// Render box override.
    pub size: Option<SlotSize>,
}

/// Places creatives into the slot and tears them down.
///
/// Teardown calls must be idempotent.
#[async_trait]
pub trait SlotRenderer: Send + Sync {
    /// Embeds a verified creative; resolves after its initial load.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError`] when the embed cannot be created or loaded.
    async fn render_trusted(&self, render: &TrustedRender) -> Result<(), RenderError>;

    /// Creates a sandboxed frame; resolves once the frame is attached.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError`] when the frame cannot be created.
    async fn render_cross_domain(&self, render: &CrossDomainRender) -> Result<(), RenderError>;

    /// Destroys the trusted embed, if any.
    fn destroy_trusted(&self);

    /// Removes the cross-domain frame, if any.
    fn destroy_frame(&self);
}

// ============================================================================
// SECTION: Slot Layout
// ============================================================================

/// Layout operations on the slot element.
#[async_trait]
pub trait SlotLayout: Send + Sync {
    /// Current layout box.
    fn layout_box(&self) -> SlotSize;

    /// Whether the slot is fixed-positioned.
    fn is_fixed_position(&self) -> bool;

    /// Collapses the slot.
    ///
    /// Runs while the controller holds its slot state; must not call back
    /// into the controller synchronously.
    fn collapse(&self);

    /// Shows the host's no-content state. Same constraint as
    /// [`SlotLayout::collapse`].
    fn apply_no_content_ui(&self);

    /// Shows the host's unlaid-out state.
    fn apply_unlayout_ui(&self);

    /// Requests a size change; resolves when the host applies or refuses it.
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError`] when the host refuses the change.
    async fn attempt_change_size(&self, size: SlotSize) -> Result<(), LayoutError>;
}

// ============================================================================
// SECTION: Scheduling
// ============================================================================

/// Host resource scheduler view of the slot.
#[async_trait]
pub trait ResourceScheduler: Send + Sync {
    /// Whether the slot has been measured at least once.
    fn has_been_measured(&self) -> bool;

    /// Whether a measurement is currently requested.
    fn is_measure_requested(&self) -> bool;

    /// Whether the slot is within render-ahead distance of the viewport.
    fn is_within_render_ahead(&self) -> bool;

    /// Resolves once the slot is within render-ahead distance.
    async fn when_within_render_ahead(&self);

    /// Milliseconds between document start and slot upgrade.
    fn upgrade_delay_ms(&self) -> u64;
}

/// Document visibility signal.
#[async_trait]
pub trait VisibilitySignal: Send + Sync {
    /// Resolves once the document has been visible.
    async fn when_first_visible(&self);
}

// ============================================================================
// SECTION: Sinks
// ============================================================================

/// Receives named lifecycle events; fire and forget.
pub trait LifecycleEventSink: Send + Sync {
    /// Records `event` with its attributes.
    fn emit(&self, event: &str, attributes: &BTreeMap<String, Value>);
}

/// Diagnostic severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticLevel {
    /// Recoverable anomaly.
    Warn,
    /// Error surfaced to the developer.
    Error,
    /// Sampled production error report.
    ExpectedError,
}

impl DiagnosticLevel {
    /// Returns a stable label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Warn => "warn",
            Self::Error => "error",
            Self::ExpectedError => "expected_error",
        }
    }
}

/// One diagnostic record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Severity.
    pub level: DiagnosticLevel,
    /// Component tag.
    pub tag: String,
    /// Human-readable message.
    pub message: String,
    /// Structured arguments such as the ad URL query.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub args: BTreeMap<String, String>,
}

impl Diagnostic {
    /// Builds a diagnostic without arguments.
    #[must_use]
    pub fn new(level: DiagnosticLevel, tag: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level,
            tag: tag.into(),
            message: message.into(),
            args: BTreeMap::new(),
        }
    }

    /// Builds a warning.
    #[must_use]
    pub fn warn(tag: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(DiagnosticLevel::Warn, tag, message)
    }
}

/// Receives diagnostics; fire and forget.
pub trait DiagnosticSink: Send + Sync {
    /// Records one diagnostic.
    fn record(&self, diagnostic: Diagnostic);
}
