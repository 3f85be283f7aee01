// crates/fast-fetch-verifier/src/stream.rs
// ============================================================================
// Module: Key Streams
// Description: Ordered asynchronous key delivery and the key source seam.
// Purpose: Let verification start on a provider's first key before the rest.
// Dependencies: async-trait, tokio (sync)
// ============================================================================

//! ## Overview
//! A [`KeyStream`] yields one provider's keys in order. Keys may arrive all at
//! once (cached keysets) or one at a time (channel-fed sources); verification
//! awaits each key independently so a slow key never blocks a fast provider.

// ============================================================================
// SECTION: Imports
// ============================================================================

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::keyset::KeyInfo;
use crate::keyset::KeysetError;

// ============================================================================
// SECTION: Key Stream
// ============================================================================

/// Order-preserving asynchronous sequence of keys.
#[derive(Debug)]
pub struct KeyStream {
    /// Receiving side of the key channel.
    receiver: mpsc::Receiver<KeyInfo>,
}

impl KeyStream {
    /// Builds a stream that yields `keys` and then ends.
    #[must_use]
    pub fn from_keys<I>(keys: I) -> Self
    where
        I: IntoIterator<Item = KeyInfo>,
    {
        let keys: Vec<KeyInfo> = keys.into_iter().collect();
        let (sender, receiver) = mpsc::channel(keys.len().max(1));
        for key in keys {
            if sender.try_send(key).is_err() {
                break;
            }
        }
        Self {
            receiver,
        }
    }

    /// Builds a stream fed by the returned sender; it ends when the sender drops.
    #[must_use]
    pub fn channel(capacity: usize) -> (KeySender, Self) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (
            KeySender {
                sender,
            },
            Self {
                receiver,
            },
        )
    }

    /// Returns the next key, or `None` once the provider has no more keys.
    pub async fn next(&mut self) -> Option<KeyInfo> {
        self.receiver.recv().await
    }
}

/// Feeding side of a channel-backed [`KeyStream`].
#[derive(Debug, Clone)]
pub struct KeySender {
    /// Sending side of the key channel.
    sender: mpsc::Sender<KeyInfo>,
}

impl KeySender {
    /// Delivers a key; returns false when the stream was dropped.
    pub async fn send(&self, key: KeyInfo) -> bool {
        self.sender.send(key).await.is_ok()
    }
}

// ============================================================================
// SECTION: Key Source
// ============================================================================

/// Resolves provider names to key streams.
#[async_trait]
pub trait KeySource: Send + Sync {
    /// Provider names in registration order.
    fn provider_names(&self) -> Vec<String>;

    /// Resolves `provider` to its keys.
    ///
    /// # Errors
    ///
    /// Returns [`KeysetError`] when the provider is unknown or its keyset
    /// cannot be obtained.
    async fn resolve(&self, provider: &str) -> Result<KeyStream, KeysetError>;
}
