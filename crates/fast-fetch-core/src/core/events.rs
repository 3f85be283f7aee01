// crates/fast-fetch-core/src/core/events.rs
// ============================================================================
// Module: Lifecycle Stages
// Description: Named lifecycle events emitted while a slot is processed.
// Purpose: Keep event names stable across controller and sinks.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Event names mirror the timing marks consumed by ad analytics. Attributes
//! travel alongside as a JSON map; see the lifecycle sink interface.

use serde::Deserialize;
use serde::Serialize;

/// Lifecycle event names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LifecycleStage {
    /// Slot upgraded; carries `forced_delta`.
    #[serde(rename = "upgradeDelay")]
    UpgradeDelay,
    /// Ad request issued.
    #[serde(rename = "adRequestStart")]
    AdRequestStart,
    /// Ad request settled.
    #[serde(rename = "adRequestEnd")]
    AdRequestEnd,
    /// Ad request failed at the network layer.
    #[serde(rename = "networkError")]
    NetworkError,
    /// Signature verification started.
    #[serde(rename = "adResponseValidateStart")]
    AdResponseValidateStart,
    /// Signature verification settled; carries `signatureValidationResult`.
    #[serde(rename = "adResponseValidateEnd")]
    AdResponseValidateEnd,
    /// Trusted render started.
    #[serde(rename = "renderFriendlyStart")]
    RenderFriendlyStart,
    /// Trusted render finished its initial load.
    #[serde(rename = "friendlyIframeIniLoad")]
    FriendlyIframeIniLoad,
    /// Cross-domain render started.
    #[serde(rename = "renderCrossDomainStart")]
    RenderCrossDomainStart,
    /// Safeframe render started.
    #[serde(rename = "renderSafeFrameStart")]
    RenderSafeFrameStart,
    /// Name-frame render started.
    #[serde(rename = "renderNameFrameStart")]
    RenderNameFrameStart,
    /// Slot collapsed after a no-content response.
    #[serde(rename = "adSlotCollapsed")]
    AdSlotCollapsed,
    /// Slot render torn down.
    #[serde(rename = "adSlotCleared")]
    AdSlotCleared,
    /// A key provider was not needed for verification.
    #[serde(rename = "providerUnused")]
    ProviderUnused,
}

impl LifecycleStage {
    /// Returns the wire name of the event.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::UpgradeDelay => "upgradeDelay",
            Self::AdRequestStart => "adRequestStart",
            Self::AdRequestEnd => "adRequestEnd",
            Self::NetworkError => "networkError",
            Self::AdResponseValidateStart => "adResponseValidateStart",
            Self::AdResponseValidateEnd => "adResponseValidateEnd",
            Self::RenderFriendlyStart => "renderFriendlyStart",
            Self::FriendlyIframeIniLoad => "friendlyIframeIniLoad",
            Self::RenderCrossDomainStart => "renderCrossDomainStart",
            Self::RenderSafeFrameStart => "renderSafeFrameStart",
            Self::RenderNameFrameStart => "renderNameFrameStart",
            Self::AdSlotCollapsed => "adSlotCollapsed",
            Self::AdSlotCleared => "adSlotCleared",
            Self::ProviderUnused => "providerUnused",
        }
    }
}
