// crates/fast-fetch-verifier/src/service.rs
// ============================================================================
// Module: Signature Verification Service
// Description: Races signature checks across all trusted key providers.
// Purpose: Produce exactly one verification verdict per creative.
// Dependencies: fast-fetch-core, tokio (rt), crate::{check, stream}
// ============================================================================

//! ## Overview
//! Every provider gets its own task. A task resolves its provider's keys and
//! checks them in order; the first task to validate the signature sets the
//! shared winner token, which every other task observes before its next key.
//! Each task publishes its progress in a shared `AttemptProgress` slot.
//! When a winner is found, providers that resolved their keys but never
//! started a check are reported through the unused-provider callback.
//! Providers with a check in flight or already finished are not.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::AtomicU8;
use std::sync::atomic::Ordering;

use fast_fetch_core::CancellationToken;
use fast_fetch_core::ResponseHeaders;
use fast_fetch_core::SignatureHeader;
use fast_fetch_core::VerificationStatus;
use fast_fetch_core::VerifierSelection;
use tokio::task::JoinSet;

use crate::check::Ed25519SignatureCheck;
use crate::check::SignatureCheck;
use crate::stream::KeySource;

// ============================================================================
// SECTION: Service
// ============================================================================

/// Multi-provider signature verification.
///
/// # Invariants
/// - A missing signature contacts no provider.
/// - The first validating key ends verification; later keys are not checked.
pub struct SignatureVerificationService {
    /// Key providers to race.
    keys: Arc<dyn KeySource>,
    /// Single-key signature check.
    checker: Arc<dyn SignatureCheck>,
    /// Signature header to read.
    selection: VerifierSelection,
}

impl SignatureVerificationService {
    /// Creates a service using strict Ed25519 checks.
    #[must_use]
    pub fn new(keys: Arc<dyn KeySource>, selection: VerifierSelection) -> Self {
        Self::with_checker(keys, Arc::new(Ed25519SignatureCheck), selection)
    }

    /// Creates a service with a custom signature check.
    #[must_use]
    pub fn with_checker(
        keys: Arc<dyn KeySource>,
        checker: Arc<dyn SignatureCheck>,
        selection: VerifierSelection,
    ) -> Self {
        Self {
            keys,
            checker,
            selection,
        }
    }

    /// Returns the configured verifier selection.
    #[must_use]
    pub const fn selection(&self) -> VerifierSelection {
        self.selection
    }

    /// Verifies `payload` against the signature carried in `headers`.
    ///
    /// `on_provider_unused` is called once per provider whose keys were
    /// resolved but never reached because another provider won the race.
    pub async fn verify<F>(
        &self,
        payload: &[u8],
        headers: &ResponseHeaders,
        mut on_provider_unused: F,
    ) -> VerificationStatus
    where
        F: FnMut(&str) + Send,
    {
        let signature: Arc<[u8]> = match SignatureHeader::extract(headers, self.selection) {
            SignatureHeader::Absent => return VerificationStatus::Unverified,
            SignatureHeader::Malformed => return VerificationStatus::ErrorUnknown,
            SignatureHeader::Present(bytes) => Arc::from(bytes),
        };
        let providers = self.keys.provider_names();
        let payload: Arc<[u8]> = Arc::from(payload);
        let winner = CancellationToken::new();
        let progress: Arc<[AttemptProgress]> =
            providers.iter().map(|_| AttemptProgress::default()).collect();

        let mut tasks = JoinSet::new();
        for (index, name) in providers.iter().enumerate() {
            let attempt = ProviderAttempt {
                index,
                name: name.clone(),
                keys: Arc::clone(&self.keys),
                checker: Arc::clone(&self.checker),
                payload: Arc::clone(&payload),
                signature: Arc::clone(&signature),
                winner: winner.clone(),
                progress: Arc::clone(&progress),
            };
            tasks.spawn(attempt.run());
        }

        let mut keys_tried = false;
        let mut task_failed = false;
        while let Some(joined) = tasks.join_next().await {
            let Ok(verdict) = joined else {
                task_failed = true;
                continue;
            };
            match verdict {
                ProviderVerdict::Verified => {
                    let unused: Vec<&String> = providers
                        .iter()
                        .zip(progress.iter())
                        .filter(|(_, progress)| progress.get() == AttemptStage::Resolved)
                        .map(|(name, _)| name)
                        .collect();
                    winner.cancel();
                    tasks.abort_all();
                    for name in unused {
                        on_provider_unused(name);
                    }
                    return VerificationStatus::Ok;
                }
                ProviderVerdict::Exhausted => keys_tried = true,
                ProviderVerdict::Unavailable | ProviderVerdict::Abandoned => {}
            }
        }
        if keys_tried {
            VerificationStatus::ErrorSignatureMismatch
        } else if task_failed {
            VerificationStatus::ErrorUnknown
        } else {
            VerificationStatus::ErrorKeyNotFound
        }
    }
}

// ============================================================================
// SECTION: Provider Attempts
// ============================================================================

/// How one provider's attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ProviderVerdict {
    /// One of the provider's keys validated the signature.
    Verified,
    /// Every key was tried without success.
    Exhausted,
    /// The provider yielded no keys.
    Unavailable,
    /// Another provider won first.
    Abandoned,
}

/// How far one provider's attempt has progressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
enum AttemptStage {
    /// Keys are still being resolved.
    Resolving = 0,
    /// Keys resolved; no key has been checked yet.
    Resolved = 1,
    /// At least one key check has started.
    Checking = 2,
    /// The attempt returned a verdict.
    Finished = 3,
}

/// Progress slot written by a provider task and read by the service.
#[derive(Debug, Default)]
struct AttemptProgress(AtomicU8);

impl AttemptProgress {
    /// Records a new stage.
    fn set(&self, stage: AttemptStage) {
        self.0.store(stage as u8, Ordering::SeqCst);
    }

    /// Returns the current stage.
    fn get(&self) -> AttemptStage {
        match self.0.load(Ordering::SeqCst) {
            0 => AttemptStage::Resolving,
            1 => AttemptStage::Resolved,
            2 => AttemptStage::Checking,
            _ => AttemptStage::Finished,
        }
    }
}

/// State owned by one provider task.
struct ProviderAttempt {
    /// Provider position in registration order.
    index: usize,
    /// Provider name.
    name: String,
    /// Key source resolving the provider.
    keys: Arc<dyn KeySource>,
    /// Signature check.
    checker: Arc<dyn SignatureCheck>,
    /// Signed payload.
    payload: Arc<[u8]>,
    /// Decoded signature.
    signature: Arc<[u8]>,
    /// Set once any provider validates the signature.
    winner: CancellationToken,
    /// Per-provider progress shared with the service.
    progress: Arc<[AttemptProgress]>,
}

impl ProviderAttempt {
    /// Tries the provider's keys in order until one validates.
    async fn run(self) -> ProviderVerdict {
        let verdict = self.try_keys().await;
        if verdict != ProviderVerdict::Abandoned {
            self.progress[self.index].set(AttemptStage::Finished);
        }
        verdict
    }

    /// Resolves the provider and checks each key.
    async fn try_keys(&self) -> ProviderVerdict {
        let Ok(resolution) = self.winner.guard(self.keys.resolve(&self.name)).await else {
            return ProviderVerdict::Abandoned;
        };
        let Ok(mut stream) = resolution else {
            return ProviderVerdict::Unavailable;
        };
        self.progress[self.index].set(AttemptStage::Resolved);

        let mut tried = 0usize;
        loop {
            let Ok(next) = self.winner.guard(stream.next()).await else {
                return ProviderVerdict::Abandoned;
            };
            let Some(key) = next else {
                break;
            };
            tried += 1;
            self.progress[self.index].set(AttemptStage::Checking);
            let Ok(valid) =
                self.winner.guard(self.checker.check(&key, &self.payload, &self.signature)).await
            else {
                return ProviderVerdict::Abandoned;
            };
            if valid {
                return ProviderVerdict::Verified;
            }
        }
        if tried == 0 { ProviderVerdict::Unavailable } else { ProviderVerdict::Exhausted }
    }
}
