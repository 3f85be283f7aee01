// crates/fast-fetch-core/src/core/response.rs
// ============================================================================
// Module: Creative Response
// Description: Immutable record of one ad response.
// Purpose: Carry body bytes, headers, and status from transport to renderer.
// Dependencies: crate::core::headers
// ============================================================================

//! ## Overview
//! A [`CreativeResponse`] is produced once per fetch attempt and owned by the
//! pipeline run that requested it. It is never mutated after construction.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::core::headers::ResponseHeaders;

// ============================================================================
// SECTION: Response Record
// ============================================================================

/// Immutable ad response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreativeResponse {
    /// HTTP status code.
    status: u16,
    /// Response headers.
    headers: ResponseHeaders,
    /// Raw body bytes.
    bytes: Vec<u8>,
}

impl CreativeResponse {
    /// Builds a response record.
    #[must_use]
    pub const fn new(status: u16, headers: ResponseHeaders, bytes: Vec<u8>) -> Self {
        Self {
            status,
            headers,
            bytes,
        }
    }

    /// Returns the HTTP status code.
    #[must_use]
    pub const fn status(&self) -> u16 {
        self.status
    }

    /// Returns the response headers.
    #[must_use]
    pub const fn headers(&self) -> &ResponseHeaders {
        &self.headers
    }

    /// Returns the body bytes.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Returns true for a 2xx status.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    /// Returns the body decoded as UTF-8, replacing invalid sequences.
    #[must_use]
    pub fn text_lossy(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }
}
