// crates/fast-fetch-core/src/core/verification.rs
// ============================================================================
// Module: Verification Model
// Description: Verification verdicts and signature header extraction.
// Purpose: Give every verification attempt exactly one stable outcome.
// Dependencies: base64, serde, crate::core::headers
// ============================================================================

//! ## Overview
//! [`VerificationStatus`] is the single verdict of one verification attempt.
//! [`SignatureHeader`] separates "no signature offered" from "signature
//! offered but undecodable", which map to different verdicts.

// ============================================================================
// SECTION: Imports
// ============================================================================

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::Deserialize;
use serde::Serialize;

use crate::core::headers::LEGACY_SIGNATURE_HEADER;
use crate::core::headers::ResponseHeaders;
use crate::core::headers::SIGNATURE_HEADER;

// ============================================================================
// SECTION: Verification Status
// ============================================================================

/// Verdict of one verification attempt.
///
/// # Invariants
/// - Numeric codes are stable and reported in lifecycle events.
/// - `Ok` implies at least one key validated the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    /// A trusted key validated the payload.
    Ok,
    /// No signature was offered.
    Unverified,
    /// No provider yielded a usable key.
    ErrorKeyNotFound,
    /// Keys were tried and none validated the payload.
    ErrorSignatureMismatch,
    /// Verification could not be carried out.
    ErrorUnknown,
}

impl VerificationStatus {
    /// Returns the stable numeric code.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Ok => 0,
            Self::Unverified => 1,
            Self::ErrorKeyNotFound => 2,
            Self::ErrorSignatureMismatch => 3,
            Self::ErrorUnknown => 4,
        }
    }

    /// Returns a stable label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Unverified => "unverified",
            Self::ErrorKeyNotFound => "error_key_not_found",
            Self::ErrorSignatureMismatch => "error_signature_mismatch",
            Self::ErrorUnknown => "error_unknown",
        }
    }

    /// Returns true when the creative may render with trusted privileges.
    #[must_use]
    pub const fn is_verified(self) -> bool {
        matches!(self, Self::Ok)
    }
}

// ============================================================================
// SECTION: Verifier Selection
// ============================================================================

/// Which signature header the verification service reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerifierSelection {
    /// Reads `AMP-Fast-Fetch-Signature`.
    #[default]
    Current,
    /// Reads `X-AmpAdSignature`.
    Legacy,
}

impl VerifierSelection {
    /// Returns the header name carrying the signature.
    #[must_use]
    pub const fn signature_header(self) -> &'static str {
        match self {
            Self::Current => SIGNATURE_HEADER,
            Self::Legacy => LEGACY_SIGNATURE_HEADER,
        }
    }

    /// Returns a stable label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Current => "current",
            Self::Legacy => "legacy",
        }
    }
}

// ============================================================================
// SECTION: Signature Header
// ============================================================================

/// Signature bytes extracted from a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignatureHeader {
    /// The header was not sent.
    Absent,
    /// The header decoded to signature bytes.
    Present(Vec<u8>),
    /// The header was sent but is not valid base64url.
    Malformed,
}

impl SignatureHeader {
    /// Extracts the signature selected by `selection` from `headers`.
    #[must_use]
    pub fn extract(headers: &ResponseHeaders, selection: VerifierSelection) -> Self {
        headers.get(selection.signature_header()).map_or(Self::Absent, Self::decode)
    }

    /// Decodes a base64url header value; trailing padding is tolerated.
    #[must_use]
    pub fn decode(value: &str) -> Self {
        let trimmed = value.trim().trim_end_matches('=');
        if trimmed.is_empty() {
            return Self::Malformed;
        }
        URL_SAFE_NO_PAD.decode(trimmed).map_or(Self::Malformed, Self::Present)
    }
}
