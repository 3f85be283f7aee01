// crates/fast-fetch-runtime/src/reporter.rs
// ============================================================================
// Module: Error Reporter
// Description: Routing and sampling for unexpected pipeline errors.
// Purpose: Surface errors to developers and sample them in production.
// Dependencies: rand, fast-fetch-core
// ============================================================================

//! ## Overview
//! Errors that reach the top of a slot run are prefixed with the component
//! tag and network type and annotated with the ad URL query. Development
//! routing records an error. Production routing records a warning and, when
//! a uniform draw falls below the sampling threshold, an expected-error
//! report. Cancellation is never reported.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;

use fast_fetch_core::Diagnostic;
use fast_fetch_core::DiagnosticLevel;
use fast_fetch_core::DiagnosticSink;
use fast_fetch_core::PipelineError;
use rand::Rng;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Tag prefixed to every reported message.
pub const ERROR_TAG: &str = "amp-a4a";
/// Argument key carrying the ad URL query.
pub const AD_URL_ARG: &str = "au";
/// Maximum characters of the ad URL query attached to an error.
const MAX_AD_QUERY_CHARS: usize = 250;

// ============================================================================
// SECTION: Randomness
// ============================================================================

/// Uniform random source in `[0, 1)`.
pub trait RandomSource: Send + Sync {
    /// Returns the next draw.
    fn next_f64(&self) -> f64;
}

/// Thread-local RNG draws.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn next_f64(&self) -> f64 {
        rand::thread_rng().gen_range(0.0 .. 1.0)
    }
}

// ============================================================================
// SECTION: Reported Errors
// ============================================================================

/// Error annotated for reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportedError {
    /// Prefixed message.
    pub message: String,
    /// Structured arguments; `au` carries the ad URL query.
    pub args: BTreeMap<String, String>,
}

impl ReportedError {
    /// Creates a report without arguments.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            args: BTreeMap::new(),
        }
    }
}

/// Attaches the query of `ad_url` to `error` as the `au` argument.
///
/// The query is truncated to 250 characters. An existing `au` argument is
/// never overwritten, and URLs without a query leave the error untouched.
pub fn assign_ad_url_to_error(error: &mut ReportedError, ad_url: &str) {
    if error.args.contains_key(AD_URL_ARG) {
        return;
    }
    let Some((_, query)) = ad_url.split_once('?') else {
        return;
    };
    let truncated: String = query.chars().take(MAX_AD_QUERY_CHARS).collect();
    error.args.insert(AD_URL_ARG.to_string(), truncated);
}

// ============================================================================
// SECTION: Reporter
// ============================================================================

/// Routes unexpected errors to the diagnostic sink.
#[derive(Clone)]
pub struct ErrorReporter {
    /// Network type used in the message prefix.
    network_type: String,
    /// Development routing flag.
    development: bool,
    /// Production sampling probability.
    sample_threshold: f64,
    /// Draw source for sampling.
    random: Arc<dyn RandomSource>,
    /// Destination for reports.
    diagnostics: Arc<dyn DiagnosticSink>,
}

impl ErrorReporter {
    /// Creates a reporter.
    #[must_use]
    pub fn new(
        network_type: impl Into<String>,
        development: bool,
        sample_threshold: f64,
        random: Arc<dyn RandomSource>,
        diagnostics: Arc<dyn DiagnosticSink>,
    ) -> Self {
        Self {
            network_type: network_type.into(),
            development,
            sample_threshold,
            random,
            diagnostics,
        }
    }

    /// Reports `error`; returns the annotated report, or `None` when the
    /// error is a cancellation.
    pub fn handle(&self, error: &PipelineError, ad_url: Option<&str>) -> Option<ReportedError> {
        if error.is_cancellation() {
            return None;
        }
        let mut reported =
            ReportedError::new(format!("{ERROR_TAG}: {}: {error}", self.network_type));
        if let Some(ad_url) = ad_url {
            assign_ad_url_to_error(&mut reported, ad_url);
        }
        if self.development {
            self.record(DiagnosticLevel::Error, &reported);
        } else {
            self.record(DiagnosticLevel::Warn, &reported);
            if self.random.next_f64() < self.sample_threshold {
                self.record(DiagnosticLevel::ExpectedError, &reported);
            }
        }
        Some(reported)
    }

    /// Sends one diagnostic for `reported`.
    fn record(&self, level: DiagnosticLevel, reported: &ReportedError) {
        let mut diagnostic = Diagnostic::new(level, ERROR_TAG, reported.message.clone());
        diagnostic.args.clone_from(&reported.args);
        self.diagnostics.record(diagnostic);
    }
}

// ============================================================================
// SECTION: Protected Callbacks
// ============================================================================

/// Runs a host callback, routing its failure to `on_error`.
///
/// A failing `on_error` is swallowed; this never propagates.
pub fn protect_callback<T, F, H>(callback: F, on_error: H) -> Option<T>
where
    F: FnOnce() -> Result<T, PipelineError>,
    H: FnOnce(&PipelineError) -> Result<(), PipelineError>,
{
    match callback() {
        Ok(value) => Some(value),
        Err(error) => {
            let _ = on_error(&error);
            None
        }
    }
}
