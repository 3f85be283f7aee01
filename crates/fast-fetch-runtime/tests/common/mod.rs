// crates/fast-fetch-runtime/tests/common/mod.rs
// ============================================================================
// Module: Common Runtime Fixtures
// Description: In-memory hosts, transports, networks, and key sources.
// Purpose: Drive the lifecycle controller without a browser or network.
// Dependencies: fast-fetch-core, fast-fetch-verifier, fast-fetch-runtime
// ============================================================================

//! ## Overview
//! Every collaborator the controller consumes has a recording fake here.
//! Gates built on `tokio::sync::Notify` let tests hold a run at a specific
//! suspension point.

#![allow(dead_code, reason = "Shared test helpers may be unused in some cases.")]
#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only panic-based assertions are permitted."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use ed25519_dalek::Signer;
use ed25519_dalek::SigningKey;
use fast_fetch_core::AdNetwork;
use fast_fetch_core::CreativeResponse;
use fast_fetch_core::CreativeTransport;
use fast_fetch_core::CrossDomainRender;
use fast_fetch_core::DiagnosticSink;
use fast_fetch_core::LayoutError;
use fast_fetch_core::LifecycleEventSink;
use fast_fetch_core::NetworkFailure;
use fast_fetch_core::NetworkFailureDirective;
use fast_fetch_core::PipelineError;
use fast_fetch_core::RenderError;
use fast_fetch_core::ResourceScheduler;
use fast_fetch_core::ResponseHeaders;
use fast_fetch_core::SlotLayout;
use fast_fetch_core::SlotRenderer;
use fast_fetch_core::SlotSize;
use fast_fetch_core::TrustedRender;
use fast_fetch_core::VerifierSelection;
use fast_fetch_core::VisibilitySignal;
use fast_fetch_core::headers::ALLOW_SOURCE_ORIGIN_HEADER;
use fast_fetch_runtime::AdLifecycleController;
use fast_fetch_runtime::ControllerSettings;
use fast_fetch_runtime::MemoryDiagnostics;
use fast_fetch_runtime::MemoryLifecycleSink;
use fast_fetch_runtime::RandomSource;
use fast_fetch_runtime::SlotEnvironment;
use fast_fetch_verifier::KeyInfo;
use fast_fetch_verifier::KeySource;
use fast_fetch_verifier::KeyStream;
use fast_fetch_verifier::KeysetError;
use fast_fetch_verifier::SignatureVerificationService;
use tokio::sync::Notify;

// ============================================================================
// SECTION: Constants and Creatives
// ============================================================================

/// Source origin used by every fixture.
pub const ORIGIN: &str = "https://publisher.example";
/// Ad request URL used by the test network.
pub const AD_URL: &str = "https://ads.example/creative?slot=top&size=300x250";
/// Slot size used by the fake layout.
pub const SLOT: SlotSize = SlotSize::new(300, 250);

/// AMP creative with a well-formed metadata block.
pub fn amp_creative() -> String {
    let head = "<html amp4ads><head>";
    let runtime = "<script async src=\"https://cdn.ampproject.org/amp4ads-v0.js\"></script>";
    let body = "</head><body>Buy now</body></html>";
    let start = head.encode_utf16().count();
    let end = start + runtime.encode_utf16().count();
    format!(
        "{head}{runtime}{body}<script type=\"application/json\" amp-ad-metadata>\
         {{\"ampRuntimeUtf16CharOffsets\":[{start},{end}],\"customElementExtensions\":[\"amp-vine\"]}}\
         </script>"
    )
}

/// Deterministic signing key for `seed`.
pub fn signing_key(seed: u8) -> SigningKey {
    SigningKey::from_bytes(&[seed; 32])
}

/// Public key record for `seed`.
pub fn key_info(provider: &str, seed: u8) -> KeyInfo {
    KeyInfo {
        provider: provider.to_string(),
        key_id: Some(format!("{provider}-{seed}")),
        key: signing_key(seed).verifying_key(),
    }
}

/// Successful response echoing the origin, optionally signed by `seed`.
pub fn creative_response(body: &str, signer: Option<u8>) -> CreativeResponse {
    match signer {
        Some(seed) => signed_response(body, seed, VerifierSelection::Current),
        None => {
            let mut headers = ResponseHeaders::new();
            headers.insert(ALLOW_SOURCE_ORIGIN_HEADER, ORIGIN);
            CreativeResponse::new(200, headers, body.as_bytes().to_vec())
        }
    }
}

/// Successful response signed by `seed` in the header `selection` reads.
pub fn signed_response(body: &str, seed: u8, selection: VerifierSelection) -> CreativeResponse {
    let mut headers = ResponseHeaders::new();
    headers.insert(ALLOW_SOURCE_ORIGIN_HEADER, ORIGIN);
    let signature = signing_key(seed).sign(body.as_bytes());
    headers.insert(selection.signature_header(), URL_SAFE_NO_PAD.encode(signature.to_bytes()));
    CreativeResponse::new(200, headers, body.as_bytes().to_vec())
}

/// Response with extra headers appended.
pub fn with_header(response: CreativeResponse, name: &str, value: &str) -> CreativeResponse {
    let mut headers = response.headers().clone();
    headers.insert(name, value);
    CreativeResponse::new(response.status(), headers, response.bytes().to_vec())
}

// ============================================================================
// SECTION: Transport
// ============================================================================

/// Scripted transport reply.
#[derive(Clone)]
pub enum Reply {
    /// Return this response.
    Respond(CreativeResponse),
    /// Fail with this network error.
    Fail(NetworkFailure),
}

/// Transport returning a fixed reply, optionally held behind a gate.
pub struct FakeTransport {
    /// Reply for every request.
    reply: Mutex<Reply>,
    /// Requested URLs in order.
    requests: Mutex<Vec<String>>,
    /// Optional gate each request waits on.
    gate: Option<Arc<Notify>>,
}

impl FakeTransport {
    pub fn new(reply: Reply) -> Self {
        Self {
            reply: Mutex::new(reply),
            requests: Mutex::new(Vec::new()),
            gate: None,
        }
    }

    /// Transport whose requests block until the returned gate is notified.
    pub fn gated(reply: Reply) -> (Self, Arc<Notify>) {
        let gate = Arc::new(Notify::new());
        let transport = Self {
            reply: Mutex::new(reply),
            requests: Mutex::new(Vec::new()),
            gate: Some(Arc::clone(&gate)),
        };
        (transport, gate)
    }

    pub fn set_reply(&self, reply: Reply) {
        *self.reply.lock().unwrap() = reply;
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl CreativeTransport for FakeTransport {
    async fn get(&self, url: &str) -> Result<CreativeResponse, NetworkFailure> {
        self.requests.lock().unwrap().push(url.to_string());
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        let reply = self.reply.lock().unwrap().clone();
        match reply {
            Reply::Respond(response) => Ok(response),
            Reply::Fail(failure) => Err(failure),
        }
    }
}

// ============================================================================
// SECTION: Renderer
// ============================================================================

/// Recording renderer with switchable failures.
#[derive(Default)]
pub struct FakeRenderer {
    pub fail_trusted: AtomicBool,
    pub fail_cross_domain: AtomicBool,
    pub trusted_renders: Mutex<Vec<TrustedRender>>,
    pub cross_domain_renders: Mutex<Vec<CrossDomainRender>>,
    pub trusted_destroys: AtomicUsize,
    pub frame_destroys: AtomicUsize,
}

impl FakeRenderer {
    pub fn trusted_count(&self) -> usize {
        self.trusted_renders.lock().unwrap().len()
    }

    pub fn cross_domain(&self) -> Vec<CrossDomainRender> {
        self.cross_domain_renders.lock().unwrap().clone()
    }
}

#[async_trait]
impl SlotRenderer for FakeRenderer {
    async fn render_trusted(&self, render: &TrustedRender) -> Result<(), RenderError> {
        self.trusted_renders.lock().unwrap().push(render.clone());
        if self.fail_trusted.load(Ordering::SeqCst) {
            return Err(RenderError("embed failed".to_string()));
        }
        Ok(())
    }

    async fn render_cross_domain(&self, render: &CrossDomainRender) -> Result<(), RenderError> {
        self.cross_domain_renders.lock().unwrap().push(render.clone());
        if self.fail_cross_domain.load(Ordering::SeqCst) {
            return Err(RenderError("frame failed".to_string()));
        }
        Ok(())
    }

    fn destroy_trusted(&self) {
        self.trusted_destroys.fetch_add(1, Ordering::SeqCst);
    }

    fn destroy_frame(&self) {
        self.frame_destroys.fetch_add(1, Ordering::SeqCst);
    }
}

// ============================================================================
// SECTION: Layout
// ============================================================================

/// Recording slot layout.
pub struct FakeLayout {
    pub layout_box: Mutex<SlotSize>,
    pub fixed_position: AtomicBool,
    pub reject_size_changes: AtomicBool,
    pub collapses: AtomicUsize,
    pub no_content_ui: AtomicUsize,
    pub unlayout_ui: AtomicUsize,
    pub size_changes: Mutex<Vec<SlotSize>>,
    /// Host calls in the order they arrived.
    pub calls: Mutex<Vec<&'static str>>,
    /// Runs once inside the next `collapse`.
    pub on_collapse: Mutex<Option<Box<dyn FnOnce() + Send>>>,
}

impl FakeLayout {
    pub fn new(size: SlotSize) -> Self {
        Self {
            layout_box: Mutex::new(size),
            fixed_position: AtomicBool::new(false),
            reject_size_changes: AtomicBool::new(false),
            collapses: AtomicUsize::new(0),
            no_content_ui: AtomicUsize::new(0),
            unlayout_ui: AtomicUsize::new(0),
            size_changes: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
            on_collapse: Mutex::new(None),
        }
    }

    pub fn size_changes(&self) -> Vec<SlotSize> {
        self.size_changes.lock().unwrap().clone()
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: &'static str) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl SlotLayout for FakeLayout {
    fn layout_box(&self) -> SlotSize {
        *self.layout_box.lock().unwrap()
    }

    fn is_fixed_position(&self) -> bool {
        self.fixed_position.load(Ordering::SeqCst)
    }

    fn collapse(&self) {
        let hook = self.on_collapse.lock().unwrap().take();
        if let Some(hook) = hook {
            hook();
        }
        self.record("collapse");
        self.collapses.fetch_add(1, Ordering::SeqCst);
    }

    fn apply_no_content_ui(&self) {
        self.record("no_content_ui");
        self.no_content_ui.fetch_add(1, Ordering::SeqCst);
    }

    fn apply_unlayout_ui(&self) {
        self.record("unlayout_ui");
        self.unlayout_ui.fetch_add(1, Ordering::SeqCst);
    }

    async fn attempt_change_size(&self, size: SlotSize) -> Result<(), LayoutError> {
        self.record("change_size");
        self.size_changes.lock().unwrap().push(size);
        if self.reject_size_changes.load(Ordering::SeqCst) {
            return Err(LayoutError::Rejected);
        }
        *self.layout_box.lock().unwrap() = size;
        Ok(())
    }
}

// ============================================================================
// SECTION: Scheduling
// ============================================================================

/// Scheduler with settable flags and a render-ahead gate.
pub struct FakeScheduler {
    pub measured: AtomicBool,
    pub measure_requested: AtomicBool,
    pub within_render_ahead: AtomicBool,
    pub render_ahead: Notify,
}

impl Default for FakeScheduler {
    fn default() -> Self {
        Self {
            measured: AtomicBool::new(true),
            measure_requested: AtomicBool::new(false),
            within_render_ahead: AtomicBool::new(true),
            render_ahead: Notify::new(),
        }
    }
}

#[async_trait]
impl ResourceScheduler for FakeScheduler {
    fn has_been_measured(&self) -> bool {
        self.measured.load(Ordering::SeqCst)
    }

    fn is_measure_requested(&self) -> bool {
        self.measure_requested.load(Ordering::SeqCst)
    }

    fn is_within_render_ahead(&self) -> bool {
        self.within_render_ahead.load(Ordering::SeqCst)
    }

    async fn when_within_render_ahead(&self) {
        self.render_ahead.notified().await;
    }

    fn upgrade_delay_ms(&self) -> u64 {
        42
    }
}

/// Document that is already visible.
pub struct Visible;

#[async_trait]
impl VisibilitySignal for Visible {
    async fn when_first_visible(&self) {}
}

// ============================================================================
// SECTION: Network
// ============================================================================

/// Configurable ad network.
pub struct TestNetwork {
    pub ad_url: String,
    pub providers: Vec<String>,
    pub directive: Mutex<NetworkFailureDirective>,
    pub delay_request: bool,
    pub fail_on_rendered: AtomicBool,
    pub rendered: Mutex<Vec<bool>>,
}

impl Default for TestNetwork {
    fn default() -> Self {
        Self {
            ad_url: AD_URL.to_string(),
            providers: vec!["alpha".to_string(), "beta".to_string()],
            directive: Mutex::new(NetworkFailureDirective::RenderOriginal),
            delay_request: false,
            fail_on_rendered: AtomicBool::new(false),
            rendered: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl AdNetwork for TestNetwork {
    fn network_type(&self) -> &str {
        "test"
    }

    async fn build_request_url(&self) -> Result<String, PipelineError> {
        Ok(self.ad_url.clone())
    }

    fn signing_provider_names(&self) -> Vec<String> {
        self.providers.clone()
    }

    fn on_network_failure(&self, _failure: &NetworkFailure, _ad_url: &str) -> NetworkFailureDirective {
        self.directive.lock().unwrap().clone()
    }

    fn on_creative_rendered(&self, is_verified: bool) -> Result<(), PipelineError> {
        self.rendered.lock().unwrap().push(is_verified);
        if self.fail_on_rendered.load(Ordering::SeqCst) {
            return Err(PipelineError::Unexpected("bookkeeping failed".to_string()));
        }
        Ok(())
    }

    fn delay_ad_request_enabled(&self) -> bool {
        self.delay_request
    }
}

// ============================================================================
// SECTION: Keys
// ============================================================================

/// Key source serving fixed keysets per provider.
pub struct StaticKeys {
    /// Providers in registration order with their keys.
    providers: Vec<(String, Vec<KeyInfo>)>,
}

impl StaticKeys {
    pub fn new(providers: Vec<(&str, Vec<KeyInfo>)>) -> Self {
        Self {
            providers: providers
                .into_iter()
                .map(|(name, keys)| (name.to_string(), keys))
                .collect(),
        }
    }
}

#[async_trait]
impl KeySource for StaticKeys {
    fn provider_names(&self) -> Vec<String> {
        self.providers.iter().map(|(name, _)| name.clone()).collect()
    }

    async fn resolve(&self, provider: &str) -> Result<KeyStream, KeysetError> {
        self.providers
            .iter()
            .find(|(name, _)| name == provider)
            .map(|(_, keys)| KeyStream::from_keys(keys.clone()))
            .ok_or_else(|| KeysetError::UnknownProvider(provider.to_string()))
    }
}

/// Polls `condition` until it holds, failing after about two seconds.
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0 .. 2_000 {
        if condition() {
            return;
        }
        tokio::time::sleep(std::time::Duration::from_millis(1)).await;
    }
    panic!("condition not reached");
}

/// Fixed random draw.
pub struct FixedRandom(pub f64);

impl RandomSource for FixedRandom {
    fn next_f64(&self) -> f64 {
        self.0
    }
}

// ============================================================================
// SECTION: Harness
// ============================================================================

/// Controller plus handles on every fake.
pub struct Harness {
    pub controller: Arc<AdLifecycleController<TestNetwork>>,
    pub network: Arc<TestNetwork>,
    pub transport: Arc<FakeTransport>,
    pub renderer: Arc<FakeRenderer>,
    pub layout: Arc<FakeLayout>,
    pub scheduler: Arc<FakeScheduler>,
    pub events: Arc<MemoryLifecycleSink>,
    pub diagnostics: Arc<MemoryDiagnostics>,
}

/// Harness builder.
pub struct HarnessBuilder {
    network: TestNetwork,
    transport: FakeTransport,
    settings: ControllerSettings,
    keys: StaticKeys,
    random: f64,
}

impl HarnessBuilder {
    pub fn new(transport: FakeTransport) -> Self {
        Self {
            network: TestNetwork::default(),
            transport,
            settings: ControllerSettings::new(ORIGIN),
            keys: StaticKeys::new(vec![("alpha", vec![key_info("alpha", 1)]), ("beta", vec![])]),
            random: 0.5,
        }
    }

    pub fn network(mut self, network: TestNetwork) -> Self {
        self.network = network;
        self
    }

    pub fn settings(mut self, settings: ControllerSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn keys(mut self, keys: StaticKeys) -> Self {
        self.keys = keys;
        self
    }

    pub fn random(mut self, draw: f64) -> Self {
        self.random = draw;
        self
    }

    pub fn build(self) -> Harness {
        let network = Arc::new(self.network);
        let transport = Arc::new(self.transport);
        let renderer = Arc::new(FakeRenderer::default());
        let layout = Arc::new(FakeLayout::new(SLOT));
        let scheduler = Arc::new(FakeScheduler::default());
        let events = Arc::new(MemoryLifecycleSink::new());
        let diagnostics = Arc::new(MemoryDiagnostics::new());
        let env = SlotEnvironment {
            transport: Arc::clone(&transport) as Arc<dyn CreativeTransport>,
            renderer: Arc::clone(&renderer) as Arc<dyn SlotRenderer>,
            layout: Arc::clone(&layout) as Arc<dyn SlotLayout>,
            scheduler: Arc::clone(&scheduler) as Arc<dyn ResourceScheduler>,
            visibility: Arc::new(Visible),
            lifecycle: Arc::clone(&events) as Arc<dyn LifecycleEventSink>,
            diagnostics: Arc::clone(&diagnostics) as Arc<dyn DiagnosticSink>,
        };
        let verifier =
            Arc::new(SignatureVerificationService::new(Arc::new(self.keys), VerifierSelection::Current));
        let controller = AdLifecycleController::new(Arc::clone(&network), env, verifier, self.settings)
            .with_random_source(Arc::new(FixedRandom(self.random)));
        Harness {
            controller: Arc::new(controller),
            network,
            transport,
            renderer,
            layout,
            scheduler,
            events,
            diagnostics,
        }
    }
}

/// Harness whose transport returns `response`.
pub fn harness(response: CreativeResponse) -> Harness {
    HarnessBuilder::new(FakeTransport::new(Reply::Respond(response))).build()
}
