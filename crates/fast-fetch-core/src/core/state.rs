// crates/fast-fetch-core/src/core/state.rs
// ============================================================================
// Module: Pipeline State
// Description: Per-slot lifecycle states of the creative pipeline.
// Purpose: Name the states the lifecycle controller moves through.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! `Idle -> Measured -> Fetching -> Verifying -> ReadyToRender -> Rendered ->
//! UnlaidOut`, with `Collapsed` entered when the response carries no content.

use serde::Deserialize;
use serde::Serialize;

/// Lifecycle state of one ad slot.
///
/// # Invariants
/// - Variants are stable for serialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    /// Nothing requested yet.
    #[default]
    Idle,
    /// Slot measured and eligible; a run has been started.
    Measured,
    /// Ad request in flight.
    Fetching,
    /// Signature verification in flight.
    Verifying,
    /// Render decision made, waiting for layout.
    ReadyToRender,
    /// Creative placed in the slot.
    Rendered,
    /// Slot collapsed after a no-content response.
    Collapsed,
    /// Slot left the viewport and its render was torn down.
    UnlaidOut,
}

impl PipelineState {
    /// Returns a stable label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Measured => "measured",
            Self::Fetching => "fetching",
            Self::Verifying => "verifying",
            Self::ReadyToRender => "ready_to_render",
            Self::Rendered => "rendered",
            Self::Collapsed => "collapsed",
            Self::UnlaidOut => "unlaid_out",
        }
    }
}
