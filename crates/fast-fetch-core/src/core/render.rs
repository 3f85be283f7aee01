// crates/fast-fetch-core/src/core/render.rs
// ============================================================================
// Module: Render Strategy Selection
// Description: Render modes and the header-driven strategy selector.
// Purpose: Pick exactly one render mode per creative from its verdict.
// Dependencies: serde, crate::core::{headers, verification}, crate::interfaces
// ============================================================================

//! ## Overview
//! [`select_render_mode`] maps a verification verdict plus response headers to
//! a [`RenderDecision`]. A verified creative always renders trusted; anything
//! else is sandboxed according to `X-AmpAdRender`, with optional safeframe
//! version and render box overrides for the cross-domain path.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::core::headers::CREATIVE_SIZE_HEADER;
use crate::core::headers::RENDERING_TYPE_HEADER;
use crate::core::headers::ResponseHeaders;
use crate::core::headers::SAFEFRAME_VERSION_HEADER;
use crate::core::verification::VerificationStatus;
use crate::interfaces::Diagnostic;
use crate::interfaces::DiagnosticSink;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Safeframe version used when the response does not override it.
pub const DEFAULT_SAFEFRAME_VERSION: &str = "1-0-9";
/// Diagnostic tag for render selection warnings.
pub const RENDER_DIAGNOSTIC_TAG: &str = "amp-a4a";

// ============================================================================
// SECTION: Render Mode
// ============================================================================

/// How a creative is placed into its slot.
///
/// # Invariants
/// - Exactly one mode is active per slot at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderMode {
    /// Same-origin embed of a verified creative.
    TrustedFriendly,
    /// Sandboxed safeframe render.
    CrossDomainSafeframe,
    /// Sandboxed name-attribute frame render.
    CrossDomainNameframe,
    /// Plain cross-domain iframe pointing at the cached creative URL.
    CrossDomainCachedIframe,
    /// Slot collapsed because there was nothing to show.
    Collapsed,
}

impl RenderMode {
    /// Returns a stable label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TrustedFriendly => "friendly",
            Self::CrossDomainSafeframe => "safeframe",
            Self::CrossDomainNameframe => "nameframe",
            Self::CrossDomainCachedIframe => "cached_iframe",
            Self::Collapsed => "collapsed",
        }
    }

    /// Returns true for sandboxed frame modes.
    #[must_use]
    pub const fn is_cross_domain(self) -> bool {
        matches!(
            self,
            Self::CrossDomainSafeframe | Self::CrossDomainNameframe | Self::CrossDomainCachedIframe
        )
    }
}

impl fmt::Display for RenderMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Slot Size
// ============================================================================

/// Width and height of a slot or creative, in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SlotSize {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl SlotSize {
    /// Builds a size.
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
        }
    }

    /// Returns true when either dimension is zero.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Parses `<width>x<height>`, e.g. `320x50`.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        let (width, height) = value.trim().split_once('x')?;
        Some(Self::new(parse_dimension(width)?, parse_dimension(height)?))
    }
}

impl fmt::Display for SlotSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Parses one decimal dimension without sign or whitespace.
fn parse_dimension(value: &str) -> Option<u32> {
    if value.is_empty() || !value.bytes().all(|byte| byte.is_ascii_digit()) {
        return None;
    }
    value.parse().ok()
}

// ============================================================================
// SECTION: Safeframe Version
// ============================================================================

/// Numeric safeframe version such as `1-0-9` or `1.2.3`.
///
/// # Invariants
/// - Digit groups separated by single `-` or `.` characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SafeframeVersion(String);

impl SafeframeVersion {
    /// Parses a version, returning `None` for malformed input.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        let well_formed = !value.is_empty()
            && value
                .split(['-', '.'])
                .all(|group| !group.is_empty() && group.bytes().all(|b| b.is_ascii_digit()));
        well_formed.then(|| Self(value.to_string()))
    }

    /// Returns the version string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SafeframeVersion {
    fn default() -> Self {
        Self(DEFAULT_SAFEFRAME_VERSION.to_string())
    }
}

impl TryFrom<String> for SafeframeVersion {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value).ok_or_else(|| format!("invalid safeframe version: {value}"))
    }
}

impl From<SafeframeVersion> for String {
    fn from(value: SafeframeVersion) -> Self {
        value.0
    }
}

impl fmt::Display for SafeframeVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// SECTION: Render Decision
// ============================================================================

/// Output of render strategy selection.
///
/// # Invariants
/// - Overrides are only populated for cross-domain modes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderDecision {
    /// Selected render mode.
    pub mode: RenderMode,
    /// Safeframe version override from the response.
    pub safeframe_version: Option<SafeframeVersion>,
    /// Render box override from the response.
    pub creative_size: Option<SlotSize>,
}

impl RenderDecision {
    /// Decision for a verified creative.
    #[must_use]
    pub const fn trusted() -> Self {
        Self {
            mode: RenderMode::TrustedFriendly,
            safeframe_version: None,
            creative_size: None,
        }
    }

    /// Decision for a plain cached-content iframe with no overrides.
    #[must_use]
    pub const fn cached_iframe() -> Self {
        Self {
            mode: RenderMode::CrossDomainCachedIframe,
            safeframe_version: None,
            creative_size: None,
        }
    }

    /// Returns the safeframe version override or `default`.
    #[must_use]
    pub fn effective_safeframe_version<'a>(
        &'a self,
        default: &'a SafeframeVersion,
    ) -> &'a SafeframeVersion {
        self.safeframe_version.as_ref().unwrap_or(default)
    }
}

/// Selects the render mode for a creative.
///
/// Unrecognized `X-AmpAdRender` values fall back to the cached iframe and
/// record one warning carrying the literal value.
#[must_use]
pub fn select_render_mode(
    verification: VerificationStatus,
    headers: &ResponseHeaders,
    diagnostics: &dyn DiagnosticSink,
) -> RenderDecision {
    if verification.is_verified() {
        return RenderDecision::trusted();
    }
    let mode = match headers.get(RENDERING_TYPE_HEADER) {
        Some("safeframe") => RenderMode::CrossDomainSafeframe,
        Some("nameframe") => RenderMode::CrossDomainNameframe,
        Some(other) if !other.is_empty() => {
            diagnostics.record(Diagnostic::warn(
                RENDER_DIAGNOSTIC_TAG,
                format!("cross-origin render mode header {other}"),
            ));
            RenderMode::CrossDomainCachedIframe
        }
        _ => RenderMode::CrossDomainCachedIframe,
    };
    RenderDecision {
        mode,
        safeframe_version: headers.get(SAFEFRAME_VERSION_HEADER).and_then(SafeframeVersion::parse),
        creative_size: headers.get(CREATIVE_SIZE_HEADER).and_then(SlotSize::parse),
    }
}
