// crates/fast-fetch-core/src/tests.rs
// ============================================================================
// Module: Core Test Lint Configuration
// Description: Shared test-only lint relaxations for core unit tests.
// Purpose: Allow panic-based assertions and debug output in tests.
// Dependencies: fast-fetch-core
// ============================================================================

//! ## Overview
//! Provides test-only lint relaxations for core unit tests.

// ============================================================================
// SECTION: Lint Configuration
// ============================================================================

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

// ============================================================================
// SECTION: Offset Conversion
// ============================================================================

use crate::core::metadata::utf16_to_byte_offset;

#[test]
fn utf16_offsets_map_across_surrogate_pairs() {
    let text = "a\u{1F600}b";
    assert_eq!(utf16_to_byte_offset(text, 0), Some(0));
    assert_eq!(utf16_to_byte_offset(text, 1), Some(1));
    assert_eq!(utf16_to_byte_offset(text, 3), Some(5));
    assert_eq!(utf16_to_byte_offset(text, 4), Some(6));
}

#[test]
fn utf16_offsets_reject_split_surrogates_and_overflow() {
    let text = "a\u{1F600}b";
    assert_eq!(utf16_to_byte_offset(text, 2), None);
    assert_eq!(utf16_to_byte_offset(text, 5), None);
}
