// crates/fast-fetch-runtime/src/context.rs
// ============================================================================
// Module: Document Context
// Description: Document-scoped wiring of registry, transport, and sinks.
// Purpose: Build slot controllers from a validated configuration.
// Dependencies: fast-fetch-config, fast-fetch-verifier, thiserror
// ============================================================================

//! ## Overview
//! A [`DocumentContext`] holds everything shared by the slots of one
//! document: the key provider registry (and therefore its keyset cache), the
//! creative transport, the sinks, and the controller settings. Two contexts
//! never share keysets.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use fast_fetch_config::ConfigError;
use fast_fetch_config::DiagnosticSinkKind;
use fast_fetch_config::FastFetchConfig;
use fast_fetch_config::LifecycleSinkKind;
use fast_fetch_core::AdNetwork;
use fast_fetch_core::CreativeTransport;
use fast_fetch_core::DiagnosticSink;
use fast_fetch_core::LifecycleEventSink;
use fast_fetch_core::NetworkFailure;
use fast_fetch_core::ResourceScheduler;
use fast_fetch_core::SlotLayout;
use fast_fetch_core::SlotRenderer;
use fast_fetch_core::VerifierSelection;
use fast_fetch_core::VisibilitySignal;
use fast_fetch_verifier::HttpKeysetFetcher;
use fast_fetch_verifier::HttpKeysetFetcherConfig;
use fast_fetch_verifier::KeyProvider;
use fast_fetch_verifier::KeyProviderRegistry;
use fast_fetch_verifier::KeysetError;
use fast_fetch_verifier::KeysetFetcher;
use fast_fetch_verifier::SignatureVerificationService;
use thiserror::Error;

use crate::controller::AdLifecycleController;
use crate::controller::ControllerSettings;
use crate::controller::DEFAULT_RELEASE_TYPE;
use crate::controller::SlotEnvironment;
use crate::http::HttpCreativeTransport;
use crate::http::HttpCreativeTransportConfig;
use crate::sinks::FileLifecycleSink;
use crate::sinks::NoopDiagnostics;
use crate::sinks::NoopLifecycleSink;
use crate::sinks::StderrDiagnostics;
use crate::sinks::StderrLifecycleSink;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised while building a document context.
#[derive(Debug, Error)]
pub enum ContextError {
    /// Configuration failed validation.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// A key provider could not be registered.
    #[error(transparent)]
    Keyset(#[from] KeysetError),
    /// The creative transport could not be built.
    #[error(transparent)]
    Transport(#[from] NetworkFailure),
    /// A sink could not be opened.
    #[error("sink error: {0}")]
    Sink(String),
}

// ============================================================================
// SECTION: Slot Host
// ============================================================================

/// Per-slot host collaborators.
#[derive(Clone)]
pub struct SlotHost {
    /// Creative placement.
    pub renderer: Arc<dyn SlotRenderer>,
    /// Slot element layout.
    pub layout: Arc<dyn SlotLayout>,
    /// Resource scheduler view.
    pub scheduler: Arc<dyn ResourceScheduler>,
    /// Document visibility.
    pub visibility: Arc<dyn VisibilitySignal>,
}

// ============================================================================
// SECTION: Context
// ============================================================================

/// Document-scoped shared state.
pub struct DocumentContext {
    /// Registry shared by every slot in the document.
    registry: KeyProviderRegistry,
    /// Signature header selection.
    selection: VerifierSelection,
    /// Settings applied to every controller.
    settings: ControllerSettings,
    /// Ad request transport.
    transport: Arc<dyn CreativeTransport>,
    /// Lifecycle event sink.
    lifecycle: Arc<dyn LifecycleEventSink>,
    /// Diagnostic sink.
    diagnostics: Arc<dyn DiagnosticSink>,
}

impl DocumentContext {
    /// Builds a context with HTTP keyset fetching.
    ///
    /// # Errors
    ///
    /// Returns [`ContextError`] when the config is invalid or a collaborator
    /// cannot be built.
    pub fn from_config(config: &FastFetchConfig) -> Result<Self, ContextError> {
        let fetcher = HttpKeysetFetcher::new(HttpKeysetFetcherConfig {
            allow_http: config.keyset_fetch.allow_http,
            timeout_ms: config.keyset_fetch.timeout_ms,
            max_response_bytes: config.keyset_fetch.max_response_bytes,
            user_agent: config.keyset_fetch.user_agent.clone(),
        })?;
        Self::with_keyset_fetcher(config, Arc::new(fetcher))
    }

    /// Builds a context with a caller-supplied keyset fetcher.
    ///
    /// # Errors
    ///
    /// Returns [`ContextError`] when the config is invalid or a collaborator
    /// cannot be built.
    pub fn with_keyset_fetcher(
        config: &FastFetchConfig,
        fetcher: Arc<dyn KeysetFetcher>,
    ) -> Result<Self, ContextError> {
        config.validate()?;
        let mut registry = KeyProviderRegistry::new(fetcher);
        for provider in &config.key_providers {
            registry.register(KeyProvider {
                name: provider.name.clone(),
                keyset_url: provider.parsed_url(config.keyset_fetch.allow_http)?,
            })?;
        }
        let transport = HttpCreativeTransport::new(&HttpCreativeTransportConfig {
            timeout_ms: config.creative_fetch.timeout_ms,
            max_response_bytes: config.creative_fetch.max_response_bytes,
            user_agent: config.creative_fetch.user_agent.clone(),
        })?;
        let label = config.document.source_origin.clone();
        let lifecycle: Arc<dyn LifecycleEventSink> = match config.sinks.lifecycle {
            LifecycleSinkKind::None => Arc::new(NoopLifecycleSink),
            LifecycleSinkKind::Stderr => Arc::new(StderrLifecycleSink::stderr(label)),
            LifecycleSinkKind::File => {
                let path = config.sinks.lifecycle_path.as_deref().ok_or_else(|| {
                    ContextError::Sink("lifecycle file sink requires a path".to_string())
                })?;
                let sink = FileLifecycleSink::open_append(path, label)
                    .map_err(|err| ContextError::Sink(err.to_string()))?;
                Arc::new(sink)
            }
        };
        let diagnostics: Arc<dyn DiagnosticSink> = match config.sinks.diagnostics {
            DiagnosticSinkKind::None => Arc::new(NoopDiagnostics),
            DiagnosticSinkKind::Stderr => Arc::new(StderrDiagnostics),
        };
        let settings = ControllerSettings {
            source_origin: config.document.source_origin.clone(),
            default_safeframe_version: config.render.default_safeframe_version.clone(),
            delay_ad_request: config.render.delay_ad_request,
            development: config.document.development,
            sample_threshold: config.errors.sample_threshold,
            release_type: DEFAULT_RELEASE_TYPE.to_string(),
        };
        Ok(Self {
            registry,
            selection: config.verifier.selection,
            settings,
            transport: Arc::new(transport),
            lifecycle,
            diagnostics,
        })
    }

    /// Replaces the creative transport.
    #[must_use]
    pub fn with_transport(mut self, transport: Arc<dyn CreativeTransport>) -> Self {
        self.transport = transport;
        self
    }

    /// Replaces the lifecycle and diagnostic sinks.
    #[must_use]
    pub fn with_sinks(
        mut self,
        lifecycle: Arc<dyn LifecycleEventSink>,
        diagnostics: Arc<dyn DiagnosticSink>,
    ) -> Self {
        self.lifecycle = lifecycle;
        self.diagnostics = diagnostics;
        self
    }

    /// Returns the document registry.
    #[must_use]
    pub const fn registry(&self) -> &KeyProviderRegistry {
        &self.registry
    }

    /// Returns the controller settings.
    #[must_use]
    pub const fn settings(&self) -> &ControllerSettings {
        &self.settings
    }

    /// Returns a verification service over every registered provider.
    #[must_use]
    pub fn verification_service(&self) -> SignatureVerificationService {
        SignatureVerificationService::new(Arc::new(self.registry.clone()), self.selection)
    }

    /// Returns a verification service scoped to `network`'s providers and
    /// signature header.
    #[must_use]
    pub fn verification_service_for<N: AdNetwork>(
        &self,
        network: &N,
    ) -> SignatureVerificationService {
        let scoped = self.registry.scoped(&network.signing_provider_names());
        let selection = network.verifier_selection().unwrap_or(self.selection);
        SignatureVerificationService::new(Arc::new(scoped), selection)
    }

    /// Builds a controller for one slot.
    #[must_use]
    pub fn controller<N: AdNetwork>(
        &self,
        network: N,
        host: SlotHost,
    ) -> Arc<AdLifecycleController<N>> {
        let verifier = Arc::new(self.verification_service_for(&network));
        let env = SlotEnvironment {
            transport: Arc::clone(&self.transport),
            renderer: host.renderer,
            layout: host.layout,
            scheduler: host.scheduler,
            visibility: host.visibility,
            lifecycle: Arc::clone(&self.lifecycle),
            diagnostics: Arc::clone(&self.diagnostics),
        };
        Arc::new(AdLifecycleController::new(Arc::new(network), env, verifier, self.settings.clone()))
    }
}
