// crates/fast-fetch-runtime/src/controller.rs
// ============================================================================
// Module: Ad Lifecycle Controller
// Description: Per-slot state machine from measurement to teardown.
// Purpose: Drive fetch, verify, render selection, and render for one slot.
// Dependencies: fast-fetch-core, fast-fetch-verifier, tokio, serde_json
// ============================================================================

//! ## Overview
//! One controller owns one slot. Measurement starts a run on a background
//! task that fetches, verifies, and selects a render mode; layout waits for
//! that run and renders. Each run carries a fresh [`CancellationToken`];
//! unlayout and refresh cancel it. A cancelled run surfaces exactly
//! [`PipelineError::Cancelled`] and mutates nothing further.
//!
//! Invariants:
//! - At most one run exists per measurement; repeated measurement is a no-op.
//! - A trusted render that fails falls back once to a cached-iframe render of
//!   the same creative bytes.
//! - A fully loaded trusted render survives unlayout.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;

use fast_fetch_core::AdNetwork;
use fast_fetch_core::CancellationToken;
use fast_fetch_core::CreativeMetadata;
use fast_fetch_core::CreativeTransport;
use fast_fetch_core::CrossDomainRender;
use fast_fetch_core::Diagnostic;
use fast_fetch_core::DiagnosticSink;
use fast_fetch_core::LayoutError;
use fast_fetch_core::LifecycleEventSink;
use fast_fetch_core::LifecycleStage;
use fast_fetch_core::NetworkFailure;
use fast_fetch_core::NetworkFailureDirective;
use fast_fetch_core::PipelineError;
use fast_fetch_core::PipelineState;
use fast_fetch_core::RenderDecision;
use fast_fetch_core::RenderMode;
use fast_fetch_core::ResourceScheduler;
use fast_fetch_core::SafeframeVersion;
use fast_fetch_core::SlotLayout;
use fast_fetch_core::SlotRenderer;
use fast_fetch_core::SlotSize;
use fast_fetch_core::TrustedRender;
use fast_fetch_core::VisibilitySignal;
use fast_fetch_core::extract_metadata;
use fast_fetch_core::select_render_mode;
use fast_fetch_verifier::SignatureVerificationService;
use serde_json::Value;
use serde_json::json;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::fetcher::CreativeFetcher;
use crate::fetcher::FetchOutcome;
use crate::reporter::ERROR_TAG;
use crate::reporter::ErrorReporter;
use crate::reporter::RandomSource;
use crate::reporter::ThreadRandom;
use crate::reporter::protect_callback;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Release type reported on render-start events.
pub const DEFAULT_RELEASE_TYPE: &str = "pr";

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Host collaborators for one slot.
#[derive(Clone)]
pub struct SlotEnvironment {
    /// Ad request transport.
    pub transport: Arc<dyn CreativeTransport>,
    /// Creative placement.
    pub renderer: Arc<dyn SlotRenderer>,
    /// Slot element layout.
    pub layout: Arc<dyn SlotLayout>,
    /// Resource scheduler view.
    pub scheduler: Arc<dyn ResourceScheduler>,
    /// Document visibility.
    pub visibility: Arc<dyn VisibilitySignal>,
    /// Lifecycle event sink.
    pub lifecycle: Arc<dyn LifecycleEventSink>,
    /// Diagnostic sink.
    pub diagnostics: Arc<dyn DiagnosticSink>,
}

/// Document-level settings applied to every slot.
#[derive(Debug, Clone, PartialEq)]
pub struct ControllerSettings {
    /// Origin asserted on ad requests.
    pub source_origin: String,
    /// Safeframe version used when a response does not override it.
    pub default_safeframe_version: SafeframeVersion,
    /// Wait for render-ahead range before requesting.
    pub delay_ad_request: bool,
    /// Development error routing.
    pub development: bool,
    /// Production error sampling probability.
    pub sample_threshold: f64,
    /// Release type reported on render events.
    pub release_type: String,
}

impl ControllerSettings {
    /// Creates settings for `source_origin` with defaults elsewhere.
    #[must_use]
    pub fn new(source_origin: impl Into<String>) -> Self {
        Self {
            source_origin: source_origin.into(),
            default_safeframe_version: SafeframeVersion::default(),
            delay_ad_request: false,
            development: false,
            sample_threshold: 0.01,
            release_type: DEFAULT_RELEASE_TYPE.to_string(),
        }
    }
}

// ============================================================================
// SECTION: Outcomes
// ============================================================================

/// Result of [`AdLifecycleController::layout`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutOutcome {
    /// No run was started.
    Idle,
    /// The slot collapsed on a no-content response.
    Collapsed,
    /// The ad network suppressed rendering after a network failure.
    Suppressed,
    /// A creative was placed.
    Rendered {
        /// Mode actually used.
        mode: RenderMode,
        /// Whether the trusted render failed and this is its fallback.
        fallback: bool,
    },
}

/// Result of [`AdLifecycleController::unlayout`].
#[derive(Debug)]
pub struct UnlayoutOutcome {
    /// False when a loaded trusted render was kept in place.
    pub torn_down: bool,
    /// Pending slot size restoration, if one was started.
    pub restore: Option<JoinHandle<()>>,
}

// ============================================================================
// SECTION: Internal State
// ============================================================================

/// What a run decided to render.
#[derive(Debug)]
enum Prepared {
    /// Verified creative with valid metadata.
    Trusted {
        /// Ad request URL.
        ad_url: String,
        /// Creative text, kept for the fallback.
        creative: String,
        /// Extracted metadata.
        metadata: CreativeMetadata,
    },
    /// Sandboxed render.
    CrossDomain(CrossDomainPlan),
    /// Nothing to render by network choice.
    Suppressed,
    /// No-content response; the slot is collapsed.
    Collapsed,
}

/// Inputs for a cross-domain render.
#[derive(Debug, Clone)]
struct CrossDomainPlan {
    /// Frame source URL.
    src: String,
    /// Creative text, when a response was fetched.
    creative: Option<String>,
    /// Selected mode and overrides.
    decision: RenderDecision,
    /// Whether the creative was verified.
    is_amp_creative: bool,
}

/// Run result shared with `layout`.
type RunOutcome = Option<Result<Arc<Prepared>, PipelineError>>;

/// One in-flight or finished pipeline run.
struct PipelineRun {
    /// Cancels this run only.
    token: CancellationToken,
    /// Settles once when the run finishes.
    outcome: watch::Receiver<RunOutcome>,
}

/// Render currently in the slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RenderedSlot {
    /// Mode used.
    mode: RenderMode,
    /// Whether it was the trusted-render fallback.
    fallback: bool,
}

/// Mutable slot bookkeeping.
#[derive(Default)]
struct SlotState {
    /// Current lifecycle state.
    phase: PipelineState,
    /// Current run, if any.
    run: Option<PipelineRun>,
    /// Current render, if any.
    rendered: Option<RenderedSlot>,
    /// A trusted render finished its initial load.
    trusted_loaded: bool,
    /// A cross-domain render happened; resume may re-measure.
    relayout_needed: bool,
    /// Slot size before the first collapse or size change.
    original_slot_size: Option<SlotSize>,
    /// Ad request URL of the current run.
    ad_url: Option<String>,
    /// Refresh re-entrancy guard.
    is_refreshing: bool,
}

// ============================================================================
// SECTION: Controller
// ============================================================================

/// Lifecycle controller for one ad slot.
///
/// # Invariants
/// - Methods taking `self: &Arc<Self>` spawn Tokio tasks and must run inside
///   a Tokio runtime.
pub struct AdLifecycleController<N: AdNetwork> {
    /// Ad network capabilities.
    network: Arc<N>,
    /// Host collaborators.
    env: SlotEnvironment,
    /// Signature verification scoped to the network's providers.
    verifier: Arc<SignatureVerificationService>,
    /// Ad request issuer.
    fetcher: CreativeFetcher,
    /// Top-level error routing.
    reporter: ErrorReporter,
    /// Document settings.
    settings: ControllerSettings,
    /// Slot bookkeeping.
    state: Mutex<SlotState>,
}

impl<N: AdNetwork> AdLifecycleController<N> {
    /// Creates a controller.
    #[must_use]
    pub fn new(
        network: Arc<N>,
        env: SlotEnvironment,
        verifier: Arc<SignatureVerificationService>,
        settings: ControllerSettings,
    ) -> Self {
        let reporter = build_reporter(network.as_ref(), &env, &settings, Arc::new(ThreadRandom));
        let fetcher = CreativeFetcher::new(Arc::clone(&env.transport));
        Self {
            network,
            env,
            verifier,
            fetcher,
            reporter,
            settings,
            state: Mutex::new(SlotState::default()),
        }
    }

    /// Replaces the random source used for error sampling.
    #[must_use]
    pub fn with_random_source(mut self, random: Arc<dyn RandomSource>) -> Self {
        self.reporter = build_reporter(self.network.as_ref(), &self.env, &self.settings, random);
        self
    }

    /// Returns the ad network.
    #[must_use]
    pub fn network(&self) -> &N {
        &self.network
    }

    /// Returns the error reporter.
    #[must_use]
    pub const fn reporter(&self) -> &ErrorReporter {
        &self.reporter
    }

    /// Returns the current lifecycle state.
    #[must_use]
    pub fn state(&self) -> PipelineState {
        self.lock_state().phase
    }

    /// Returns the mode of the render currently in the slot.
    #[must_use]
    pub fn rendered_mode(&self) -> Option<RenderMode> {
        self.lock_state().rendered.map(|rendered| rendered.mode)
    }

    /// Returns the recorded pre-change slot size, if any.
    #[must_use]
    pub fn original_slot_size(&self) -> Option<SlotSize> {
        self.lock_state().original_slot_size
    }

    /// Returns the ad request URL of the current run.
    #[must_use]
    pub fn ad_url(&self) -> Option<String> {
        self.lock_state().ad_url.clone()
    }

    /// Records the upgrade delay once the slot element is built.
    pub fn on_upgrade(&self) {
        self.emit(
            LifecycleStage::UpgradeDelay,
            attributes([("forced_delta", json!(self.env.scheduler.upgrade_delay_ms()))]),
        );
    }

    // ------------------------------------------------------------------------
    // Measurement
    // ------------------------------------------------------------------------

    /// Starts a run when the slot is eligible; returns whether one started.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Configuration`] for fixed-position slots.
    pub fn on_layout_measure(self: &Arc<Self>) -> Result<bool, PipelineError> {
        let mut state = self.lock_state();
        if state.run.is_some() {
            return Ok(false);
        }
        if self.env.layout.layout_box().is_empty() {
            return Ok(false);
        }
        if self.env.layout.is_fixed_position() {
            drop(state);
            let error =
                PipelineError::Configuration("fixed-position ad slots are not allowed".to_string());
            self.env.diagnostics.record(Diagnostic::warn(ERROR_TAG, error.to_string()));
            return Err(error);
        }
        let token = CancellationToken::new();
        let (sender, outcome) = watch::channel(None);
        state.run = Some(PipelineRun {
            token: token.clone(),
            outcome,
        });
        state.phase = PipelineState::Measured;
        state.relayout_needed = false;
        drop(state);

        let controller = Arc::clone(self);
        tokio::spawn(async move {
            let result = controller.prepare(&token).await;
            if let Err(error) = &result {
                controller.report(error);
            }
            sender.send_replace(Some(result.map(Arc::new)));
        });
        Ok(true)
    }

    /// Re-measures after a cross-domain render was unlaid out.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Configuration`] for fixed-position slots.
    pub fn resume(self: &Arc<Self>) -> Result<bool, PipelineError> {
        {
            let state = self.lock_state();
            if !state.relayout_needed || state.run.is_some() {
                return Ok(false);
            }
            if !self.env.scheduler.has_been_measured() || self.env.scheduler.is_measure_requested()
            {
                return Ok(false);
            }
        }
        self.on_layout_measure()
    }

    /// Tears down the current render and starts a new run.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Configuration`] for fixed-position slots.
    pub fn refresh(self: &Arc<Self>) -> Result<bool, PipelineError> {
        let rendered = {
            let mut state = self.lock_state();
            if state.is_refreshing {
                return Ok(false);
            }
            state.is_refreshing = true;
            if let Some(run) = state.run.take() {
                run.token.cancel();
            }
            state.trusted_loaded = false;
            state.relayout_needed = false;
            state.ad_url = None;
            state.phase = PipelineState::Idle;
            state.rendered.take()
        };
        if rendered.is_some() {
            self.env.renderer.destroy_trusted();
            self.env.renderer.destroy_frame();
            self.emit(LifecycleStage::AdSlotCleared, BTreeMap::new());
        }
        let started = self.on_layout_measure();
        self.lock_state().is_refreshing = false;
        started
    }

    // ------------------------------------------------------------------------
    // Layout
    // ------------------------------------------------------------------------

    /// Waits for the current run and renders its decision.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Cancelled`] when the run was superseded, the
    /// run's own error, or [`PipelineError::Render`] when the fallback render
    /// also failed.
    pub async fn layout(&self) -> Result<LayoutOutcome, PipelineError> {
        let (token, mut outcome) = {
            let state = self.lock_state();
            if let Some(rendered) = state.rendered {
                return Ok(LayoutOutcome::Rendered {
                    mode: rendered.mode,
                    fallback: rendered.fallback,
                });
            }
            match &state.run {
                Some(run) => (run.token.clone(), run.outcome.clone()),
                None => return Ok(LayoutOutcome::Idle),
            }
        };
        let prepared = token.guard(wait_for_outcome(&mut outcome)).await??;
        let rendered = match prepared.as_ref() {
            Prepared::Collapsed => return Ok(LayoutOutcome::Collapsed),
            Prepared::Suppressed => return Ok(LayoutOutcome::Suppressed),
            Prepared::Trusted {
                ad_url,
                creative,
                metadata,
            } => self.render_trusted(&token, ad_url, creative, metadata).await,
            Prepared::CrossDomain(plan) => self.render_cross_domain(&token, plan, false).await,
        };
        if let Err(error) = &rendered {
            self.report(error);
        }
        rendered
    }

    /// Tears down the slot when it leaves the viewport.
    ///
    /// A loaded trusted render is kept and `torn_down` is false.
    pub fn unlayout(self: &Arc<Self>) -> UnlayoutOutcome {
        let restore_size = {
            let mut state = self.lock_state();
            if state.trusted_loaded {
                return UnlayoutOutcome {
                    torn_down: false,
                    restore: None,
                };
            }
            if let Some(run) = state.run.take() {
                run.token.cancel();
            }
            state.rendered = None;
            state.ad_url = None;
            state.phase = PipelineState::UnlaidOut;
            state.original_slot_size
        };
        self.env.renderer.destroy_trusted();
        self.env.renderer.destroy_frame();
        self.env.layout.apply_unlayout_ui();
        self.emit(LifecycleStage::AdSlotCleared, BTreeMap::new());
        let restore = restore_size.map(|size| {
            let controller = Arc::clone(self);
            tokio::spawn(async move { controller.restore_slot_size(size).await })
        });
        UnlayoutOutcome {
            torn_down: true,
            restore,
        }
    }

    /// Requests a slot size change, recording the pre-change size once.
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError`] when the host refuses the change.
    pub async fn attempt_change_size(&self, size: SlotSize) -> Result<(), LayoutError> {
        let current = self.env.layout.layout_box();
        {
            let mut state = self.lock_state();
            if state.original_slot_size.is_none() {
                state.original_slot_size = Some(current);
            }
        }
        self.env.layout.attempt_change_size(size).await
    }

    // ------------------------------------------------------------------------
    // Pipeline
    // ------------------------------------------------------------------------

    /// Fetches, verifies, and decides how to render.
    async fn prepare(&self, token: &CancellationToken) -> Result<Prepared, PipelineError> {
        token.guard(self.env.visibility.when_first_visible()).await?;
        let delay = self.settings.delay_ad_request || self.network.delay_ad_request_enabled();
        if delay && !self.env.scheduler.is_within_render_ahead() {
            token.guard(self.env.scheduler.when_within_render_ahead()).await?;
        }
        let ad_url = token.guard(self.network.build_request_url()).await??;
        self.with_live_state(token, |state| {
            state.phase = PipelineState::Fetching;
            state.ad_url = Some(ad_url.clone());
        })?;

        self.emit(LifecycleStage::AdRequestStart, BTreeMap::new());
        let fetched =
            token.guard(self.fetcher.fetch(&ad_url, &self.settings.source_origin)).await?;
        self.emit(LifecycleStage::AdRequestEnd, BTreeMap::new());
        let response = match fetched {
            Ok(FetchOutcome::Creative(response)) => response,
            Ok(FetchOutcome::NoContent) => return self.collapse_no_content(token),
            Err(failure) => return self.absorb_network_failure(token, &failure, &ad_url),
        };

        self.with_live_state(token, |state| state.phase = PipelineState::Verifying)?;
        self.emit(LifecycleStage::AdResponseValidateStart, BTreeMap::new());
        let mut unused = Vec::new();
        let status = token
            .guard(self.verifier.verify(response.bytes(), response.headers(), |provider: &str| {
                unused.push(provider.to_string());
            }))
            .await?;
        for provider in unused {
            self.emit(LifecycleStage::ProviderUnused, attributes([("provider", json!(provider))]));
        }
        self.emit(
            LifecycleStage::AdResponseValidateEnd,
            attributes([("signatureValidationResult", json!(status.code()))]),
        );

        let decision = select_render_mode(status, response.headers(), self.env.diagnostics.as_ref());
        let creative = response.text_lossy();
        let prepared = if decision.mode == RenderMode::TrustedFriendly {
            match extract_metadata(&creative) {
                Some(metadata) => Prepared::Trusted {
                    ad_url,
                    creative,
                    metadata,
                },
                None => {
                    self.env.diagnostics.record(Diagnostic::warn(
                        ERROR_TAG,
                        PipelineError::MetadataInvalid.to_string(),
                    ));
                    Prepared::CrossDomain(CrossDomainPlan {
                        src: ad_url,
                        creative: Some(creative),
                        decision: RenderDecision::cached_iframe(),
                        is_amp_creative: true,
                    })
                }
            }
        } else {
            Prepared::CrossDomain(CrossDomainPlan {
                src: ad_url,
                creative: Some(creative),
                decision,
                is_amp_creative: false,
            })
        };
        self.with_live_state(token, |state| state.phase = PipelineState::ReadyToRender)?;
        Ok(prepared)
    }

    /// Collapses the slot after a no-content response.
    ///
    /// The host calls run under the state lock so a concurrent unlayout
    /// either cancels before the collapse or restores after it.
    fn collapse_no_content(&self, token: &CancellationToken) -> Result<Prepared, PipelineError> {
        let size = self.env.layout.layout_box();
        self.with_live_state(token, |state| {
            if state.original_slot_size.is_none() {
                state.original_slot_size = Some(size);
            }
            state.phase = PipelineState::Collapsed;
            self.env.layout.collapse();
            self.env.layout.apply_no_content_ui();
        })?;
        self.emit(LifecycleStage::AdSlotCollapsed, BTreeMap::new());
        Ok(Prepared::Collapsed)
    }

    /// Converts a network failure into the network's chosen fallback.
    fn absorb_network_failure(
        &self,
        token: &CancellationToken,
        failure: &NetworkFailure,
        ad_url: &str,
    ) -> Result<Prepared, PipelineError> {
        self.emit(LifecycleStage::NetworkError, attributes([("error", json!(failure.to_string()))]));
        let directive = self.network.on_network_failure(failure, ad_url);
        self.with_live_state(token, |state| state.phase = PipelineState::ReadyToRender)?;
        let src = match directive {
            NetworkFailureDirective::Suppress => return Ok(Prepared::Suppressed),
            NetworkFailureDirective::RenderOriginal => ad_url.to_string(),
            NetworkFailureDirective::RenderUrl(url) => url,
        };
        Ok(Prepared::CrossDomain(CrossDomainPlan {
            src,
            creative: None,
            decision: RenderDecision::cached_iframe(),
            is_amp_creative: false,
        }))
    }

    // ------------------------------------------------------------------------
    // Rendering
    // ------------------------------------------------------------------------

    /// Embeds a verified creative, falling back once on failure.
    async fn render_trusted(
        &self,
        token: &CancellationToken,
        ad_url: &str,
        creative: &str,
        metadata: &CreativeMetadata,
    ) -> Result<LayoutOutcome, PipelineError> {
        self.emit(LifecycleStage::RenderFriendlyStart, self.render_attributes(true));
        let render = TrustedRender {
            ad_url: ad_url.to_string(),
            metadata: metadata.clone(),
        };
        let result = self.env.renderer.render_trusted(&render).await;
        if token.is_cancelled() {
            self.env.renderer.destroy_trusted();
            return Err(PipelineError::Cancelled);
        }
        match result {
            Ok(()) => {
                let committed = self.with_live_state(token, |state| {
                    state.rendered = Some(RenderedSlot {
                        mode: RenderMode::TrustedFriendly,
                        fallback: false,
                    });
                    state.trusted_loaded = true;
                    state.phase = PipelineState::Rendered;
                });
                if let Err(error) = committed {
                    self.env.renderer.destroy_trusted();
                    return Err(error);
                }
                self.emit(LifecycleStage::FriendlyIframeIniLoad, BTreeMap::new());
                self.notify_rendered(true);
                Ok(LayoutOutcome::Rendered {
                    mode: RenderMode::TrustedFriendly,
                    fallback: false,
                })
            }
            Err(error) => {
                self.env.renderer.destroy_trusted();
                self.env.diagnostics.record(Diagnostic::warn(
                    ERROR_TAG,
                    format!("trusted render failed, using cross-domain fallback: {error}"),
                ));
                let plan = CrossDomainPlan {
                    src: ad_url.to_string(),
                    creative: Some(creative.to_string()),
                    decision: RenderDecision::cached_iframe(),
                    is_amp_creative: true,
                };
                self.render_cross_domain(token, &plan, true).await
            }
        }
    }

    /// Creates a sandboxed frame for `plan`.
    async fn render_cross_domain(
        &self,
        token: &CancellationToken,
        plan: &CrossDomainPlan,
        fallback: bool,
    ) -> Result<LayoutOutcome, PipelineError> {
        let mode = if plan.decision.mode.is_cross_domain() {
            plan.decision.mode
        } else {
            RenderMode::CrossDomainCachedIframe
        };
        let event_attributes = self.render_attributes(plan.is_amp_creative);
        self.emit(LifecycleStage::RenderCrossDomainStart, event_attributes.clone());
        match mode {
            RenderMode::CrossDomainSafeframe => {
                self.emit(LifecycleStage::RenderSafeFrameStart, event_attributes);
            }
            RenderMode::CrossDomainNameframe => {
                self.emit(LifecycleStage::RenderNameFrameStart, event_attributes);
            }
            _ => {}
        }
        let render = CrossDomainRender {
            mode,
            src: plan.src.clone(),
            creative: plan.creative.clone(),
            safeframe_version: plan
                .decision
                .effective_safeframe_version(&self.settings.default_safeframe_version)
                .clone(),
            size: plan.decision.creative_size,
        };
        let result = self.env.renderer.render_cross_domain(&render).await;
        if token.is_cancelled() {
            self.env.renderer.destroy_frame();
            return Err(PipelineError::Cancelled);
        }
        result?;
        let committed = self.with_live_state(token, |state| {
            state.rendered = Some(RenderedSlot {
                mode,
                fallback,
            });
            state.relayout_needed = true;
            state.phase = PipelineState::Rendered;
        });
        if let Err(error) = committed {
            self.env.renderer.destroy_frame();
            return Err(error);
        }
        self.notify_rendered(plan.is_amp_creative);
        Ok(LayoutOutcome::Rendered {
            mode,
            fallback,
        })
    }

    /// Tells the network a creative was placed; failures are reported.
    fn notify_rendered(&self, is_verified: bool) {
        protect_callback(
            || self.network.on_creative_rendered(is_verified),
            |error| {
                self.report(error);
                Ok(())
            },
        );
    }

    /// Restores the recorded slot size; clears the record on success.
    async fn restore_slot_size(&self, size: SlotSize) {
        match self.env.layout.attempt_change_size(size).await {
            Ok(()) => {
                let mut state = self.lock_state();
                if state.original_slot_size == Some(size) {
                    state.original_slot_size = None;
                }
            }
            Err(error) => {
                self.env
                    .diagnostics
                    .record(Diagnostic::warn(ERROR_TAG, format!("slot size restore failed: {error}")));
            }
        }
    }

    // ------------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------------

    /// Locks slot state, recovering from poisoning.
    fn lock_state(&self) -> MutexGuard<'_, SlotState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Mutates state only while `token` is live.
    ///
    /// Cancellation happens under the same lock, so a successful check
    /// cannot race with unlayout or refresh.
    fn with_live_state<T>(
        &self,
        token: &CancellationToken,
        mutate: impl FnOnce(&mut SlotState) -> T,
    ) -> Result<T, PipelineError> {
        let mut state = self.lock_state();
        token.check()?;
        Ok(mutate(&mut state))
    }

    /// Reports an error through the reporter with the current ad URL.
    fn report(&self, error: &PipelineError) {
        let ad_url = self.lock_state().ad_url.clone();
        self.reporter.handle(error, ad_url.as_deref());
    }

    /// Emits a lifecycle event.
    fn emit(&self, stage: LifecycleStage, attributes: BTreeMap<String, Value>) {
        self.env.lifecycle.emit(stage.as_str(), &attributes);
    }

    /// Attributes carried by render-start events.
    fn render_attributes(&self, is_amp_creative: bool) -> BTreeMap<String, Value> {
        attributes([
            ("isAmpCreative", json!(is_amp_creative)),
            ("releaseType", json!(self.settings.release_type)),
        ])
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Builds the reporter for a controller.
fn build_reporter<N: AdNetwork>(
    network: &N,
    env: &SlotEnvironment,
    settings: &ControllerSettings,
    random: Arc<dyn RandomSource>,
) -> ErrorReporter {
    ErrorReporter::new(
        network.network_type(),
        settings.development,
        settings.sample_threshold,
        random,
        Arc::clone(&env.diagnostics),
    )
}

/// Waits until the run settles.
async fn wait_for_outcome(
    outcome: &mut watch::Receiver<RunOutcome>,
) -> Result<Arc<Prepared>, PipelineError> {
    loop {
        let current = outcome.borrow_and_update().clone();
        if let Some(result) = current {
            return result;
        }
        if outcome.changed().await.is_err() {
            return Err(PipelineError::Cancelled);
        }
    }
}

/// Builds an attribute map from fixed pairs.
fn attributes<const COUNT: usize>(pairs: [(&str, Value); COUNT]) -> BTreeMap<String, Value> {
    pairs.into_iter().map(|(key, value)| (key.to_string(), value)).collect()
}
