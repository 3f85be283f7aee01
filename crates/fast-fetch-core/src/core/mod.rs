// crates/fast-fetch-core/src/core/mod.rs
// ============================================================================
// Module: Fast Fetch Core Model
// Description: Data model for creative responses, verdicts, and render choices.
// Purpose: Group the pure, I/O-free building blocks of the pipeline.
// Dependencies: serde, serde_json, base64, tokio (sync)
// ============================================================================

//! ## Overview
//! Pure model types and parsers. Nothing in this module performs I/O; the
//! cancellation token is the only type carrying shared state.

pub mod cancel;
pub mod errors;
pub mod events;
pub mod headers;
pub mod metadata;
pub mod render;
pub mod response;
pub mod state;
pub mod verification;
