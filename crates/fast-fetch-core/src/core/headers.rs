// crates/fast-fetch-core/src/core/headers.rs
// ============================================================================
// Module: Response Headers
// Description: Ordered, case-insensitive response header map.
// Purpose: Give the pipeline one header view independent of the transport.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! [`ResponseHeaders`] keeps headers in arrival order and resolves names
//! case-insensitively (ASCII). Values are stored verbatim; callers decide
//! whether a value comparison is case-sensitive.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Header Names
// ============================================================================

/// Signature header read by the current verifier.
pub const SIGNATURE_HEADER: &str = "AMP-Fast-Fetch-Signature";
/// Signature header read by the legacy verifier.
pub const LEGACY_SIGNATURE_HEADER: &str = "X-AmpAdSignature";
/// Cross-domain rendering strategy header.
pub const RENDERING_TYPE_HEADER: &str = "X-AmpAdRender";
/// Safeframe version override header.
pub const SAFEFRAME_VERSION_HEADER: &str = "X-AmpSafeFrameVersion";
/// Creative render box override header.
pub const CREATIVE_SIZE_HEADER: &str = "X-CreativeSize";
/// Access-control header echoing the requesting source origin.
pub const ALLOW_SOURCE_ORIGIN_HEADER: &str = "AMP-Access-Control-Allow-Source-Origin";
/// Query parameter carrying the source origin assertion.
pub const SOURCE_ORIGIN_PARAM: &str = "__amp_source_origin";

// ============================================================================
// SECTION: Header Map
// ============================================================================

/// Ordered header map with case-insensitive names.
///
/// # Invariants
/// - At most one entry exists per name (compared ASCII case-insensitively).
/// - Replacing a header keeps its original position.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResponseHeaders {
    /// Header entries in arrival order.
    entries: Vec<(String, String)>,
}

impl ResponseHeaders {
    /// Creates an empty header map.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Inserts or replaces a header, returning the previous value.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) -> Option<String> {
        let name = name.into();
        let value = value.into();
        if let Some(entry) = self.entries.iter_mut().find(|(key, _)| key.eq_ignore_ascii_case(&name))
        {
            return Some(std::mem::replace(&mut entry.1, value));
        }
        self.entries.push((name, value));
        None
    }

    /// Appends a value, joining repeated headers with `", "`.
    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(key, _)| key.eq_ignore_ascii_case(&name)) {
            Some(entry) => {
                entry.1.push_str(", ");
                entry.1.push_str(&value);
            }
            None => self.entries.push((name, value)),
        }
    }

    /// Returns the value for `name`, if present.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Returns true when `name` is present.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Removes `name`, returning its value.
    pub fn remove(&mut self, name: &str) -> Option<String> {
        let index = self.entries.iter().position(|(key, _)| key.eq_ignore_ascii_case(name))?;
        Some(self.entries.remove(index).1)
    }

    /// Iterates headers in arrival order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(name, value)| (name.as_str(), value.as_str()))
    }

    /// Returns the number of distinct headers.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when no headers are present.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for ResponseHeaders
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = Self::new();
        for (name, value) in iter {
            headers.insert(name, value);
        }
        headers
    }
}
