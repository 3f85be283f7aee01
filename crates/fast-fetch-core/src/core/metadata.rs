// crates/fast-fetch-core/src/core/metadata.rs
// ============================================================================
// Module: Creative Metadata
// Description: Extraction of the runtime metadata block from a creative.
// Purpose: Produce the minified creative and its extension requirements.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! A verified creative carries a JSON metadata block after its markup. The
//! block names the runtime script span (as UTF-16 offsets), the custom
//! elements to install, and the stylesheets to load. Extraction is strict:
//! any malformed or mistyped field yields `None` rather than a partial record.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Opening tag of the metadata block.
pub const METADATA_OPEN_TAG: &str = "<script type=\"application/json\" amp-ad-metadata>";
/// Tolerated opening tag without attribute quotes.
pub const METADATA_OPEN_TAG_UNQUOTED: &str = "<script type=application/json amp-ad-metadata>";
/// Closing tag of the metadata block.
const SCRIPT_CLOSE_TAG: &str = "</script>";
/// Field holding the runtime span offsets.
const OFFSETS_FIELD: &str = "ampRuntimeUtf16CharOffsets";
/// Field holding custom element names.
const EXTENSIONS_FIELD: &str = "customElementExtensions";
/// Field holding custom stylesheet descriptors.
const STYLESHEETS_FIELD: &str = "customStylesheets";

// ============================================================================
// SECTION: Types
// ============================================================================

/// Stylesheet requested by a creative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomStylesheet {
    /// Stylesheet URL.
    pub href: String,
}

/// Parsed creative metadata.
///
/// # Invariants
/// - `minified_creative` excludes the runtime span and the metadata block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreativeMetadata {
    /// Creative markup with runtime script and metadata removed.
    pub minified_creative: String,
    /// Custom element extensions in declaration order.
    pub custom_element_extensions: Vec<String>,
    /// Custom stylesheets in declaration order.
    pub custom_stylesheets: Vec<CustomStylesheet>,
}

// ============================================================================
// SECTION: Extraction
// ============================================================================

/// Extracts the metadata block from `creative`.
///
/// Returns `None` when the block is missing, uses an unsupported opening tag,
/// is unterminated, or fails schema validation.
#[must_use]
pub fn extract_metadata(creative: &str) -> Option<CreativeMetadata> {
    let (metadata_start, tag_len) = locate_open_tag(creative)?;
    let json_start = metadata_start + tag_len;
    let json_len = creative[json_start ..].find(SCRIPT_CLOSE_TAG)?;
    let Value::Object(fields) =
        serde_json::from_str::<Value>(&creative[json_start .. json_start + json_len]).ok()?
    else {
        return None;
    };

    let (start, end) = parse_offsets(fields.get(OFFSETS_FIELD)?)?;
    let start = utf16_to_byte_offset(creative, start)?;
    let end = utf16_to_byte_offset(creative, end)?;
    if start > end || end > metadata_start {
        return None;
    }

    let custom_element_extensions = parse_extensions(&fields)?;
    let custom_stylesheets = parse_stylesheets(&fields)?;

    let mut minified_creative = String::with_capacity(start + (metadata_start - end));
    minified_creative.push_str(&creative[.. start]);
    minified_creative.push_str(&creative[end .. metadata_start]);
    Some(CreativeMetadata {
        minified_creative,
        custom_element_extensions,
        custom_stylesheets,
    })
}

/// Finds the last metadata opening tag, preferring the quoted form.
fn locate_open_tag(creative: &str) -> Option<(usize, usize)> {
    creative
        .rfind(METADATA_OPEN_TAG)
        .map(|index| (index, METADATA_OPEN_TAG.len()))
        .or_else(|| {
            creative
                .rfind(METADATA_OPEN_TAG_UNQUOTED)
                .map(|index| (index, METADATA_OPEN_TAG_UNQUOTED.len()))
        })
}

/// Parses the `[start, end]` UTF-16 offset pair.
fn parse_offsets(value: &Value) -> Option<(usize, usize)> {
    let Value::Array(items) = value else {
        return None;
    };
    let [start, end] = items.as_slice() else {
        return None;
    };
    let start = usize::try_from(start.as_u64()?).ok()?;
    let end = usize::try_from(end.as_u64()?).ok()?;
    Some((start, end))
}

/// Parses the optional extension name array.
fn parse_extensions(fields: &Map<String, Value>) -> Option<Vec<String>> {
    match fields.get(EXTENSIONS_FIELD) {
        None | Some(Value::Null) => Some(Vec::new()),
        Some(Value::Array(items)) => {
            items.iter().map(|item| item.as_str().map(str::to_string)).collect()
        }
        Some(_) => None,
    }
}

/// Parses the optional stylesheet descriptor array.
fn parse_stylesheets(fields: &Map<String, Value>) -> Option<Vec<CustomStylesheet>> {
    match fields.get(STYLESHEETS_FIELD) {
        None | Some(Value::Null) => Some(Vec::new()),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| {
                let href = item.as_object()?.get("href")?.as_str()?;
                Some(CustomStylesheet {
                    href: href.to_string(),
                })
            })
            .collect(),
        Some(_) => None,
    }
}

/// Converts a UTF-16 code unit offset into a byte offset of `text`.
///
/// Returns `None` when the offset is past the end or splits a surrogate pair.
pub(crate) fn utf16_to_byte_offset(text: &str, units: usize) -> Option<usize> {
    let mut consumed = 0usize;
    for (byte_index, ch) in text.char_indices() {
        if consumed == units {
            return Some(byte_index);
        }
        consumed += ch.len_utf16();
        if consumed > units {
            return None;
        }
    }
    (consumed == units).then_some(text.len())
}
