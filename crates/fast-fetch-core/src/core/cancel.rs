// crates/fast-fetch-core/src/core/cancel.rs
// ============================================================================
// Module: Cancellation
// Description: Cooperative cancellation token for pipeline runs.
// Purpose: Let a superseded run stop at its next suspension point.
// Dependencies: tokio (sync, macros), thiserror
// ============================================================================

//! ## Overview
//! Each pipeline run owns a fresh [`CancellationToken`]. Superseding the run
//! or unlaying the slot cancels it; every suspension point either checks the
//! token or races the awaited future against it with [`CancellationToken::guard`].
//! Tokens are one-shot: once cancelled they never reset.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::future::Future;
use std::pin::pin;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

use thiserror::Error;
use tokio::sync::Notify;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Marker error for work abandoned after cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("operation cancelled")]
pub struct Cancelled;

// ============================================================================
// SECTION: Token
// ============================================================================

/// Shared cancellation flag with async wake-up.
#[derive(Debug, Default)]
struct TokenState {
    /// Set once when the token is cancelled.
    cancelled: AtomicBool,
    /// Wakes tasks waiting in [`CancellationToken::cancelled`].
    notify: Notify,
}

/// One-shot cooperative cancellation token.
///
/// # Invariants
/// - Clones observe the same state.
/// - Cancellation is permanent.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    /// Shared token state.
    inner: Arc<TokenState>,
}

impl CancellationToken {
    /// Creates an uncancelled token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancels the token and wakes all waiters. Repeated calls are no-ops.
    pub fn cancel(&self) {
        if !self.inner.cancelled.swap(true, Ordering::SeqCst) {
            self.inner.notify.notify_waiters();
        }
    }

    /// Returns true once the token has been cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Returns `Err(Cancelled)` once the token has been cancelled.
    ///
    /// # Errors
    ///
    /// Returns [`Cancelled`] when the token is cancelled.
    pub fn check(&self) -> Result<(), Cancelled> {
        if self.is_cancelled() { Err(Cancelled) } else { Ok(()) }
    }

    /// Resolves when the token is cancelled.
    pub async fn cancelled(&self) {
        loop {
            let mut notified = pin!(self.inner.notify.notified());
            notified.as_mut().enable();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }

    /// Awaits `future` unless the token is cancelled first.
    ///
    /// A future that completes after cancellation still yields `Cancelled`.
    ///
    /// # Errors
    ///
    /// Returns [`Cancelled`] when the token is cancelled before or while
    /// `future` completes.
    pub async fn guard<F>(&self, future: F) -> Result<F::Output, Cancelled>
    where
        F: Future,
    {
        tokio::select! {
            biased;
            () = self.cancelled() => Err(Cancelled),
            output = future => {
                self.check()?;
                Ok(output)
            }
        }
    }
}
