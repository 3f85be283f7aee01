// crates/fast-fetch-config/src/lib.rs
// ============================================================================
// Module: Fast Fetch Config Library
// Description: Canonical config model, validation, and example generation.
// Purpose: Single source of truth for fast-fetch.toml semantics.
// Dependencies: fast-fetch-core, serde, toml, url
// ============================================================================

//! ## Overview
//! `fast-fetch-config` defines the configuration of one document context:
//! the source origin, the trusted key providers, fetch limits, render
//! defaults, error sampling, and sink selection. Validation is strict and
//! fails closed.
//!
//! Security posture: config inputs are untrusted.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;
pub mod examples;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
pub use examples::config_toml_example;
