// crates/fast-fetch-verifier/src/registry.rs
// ============================================================================
// Module: Key Provider Registry
// Description: Named key providers with per-registry keyset caching.
// Purpose: Resolve trust providers to keysets fetched at most once.
// Dependencies: async-trait, tokio (sync, rt), url
// ============================================================================

//! ## Overview
//! A [`KeyProviderRegistry`] belongs to one document context. The first
//! request for a provider's keyset starts a background fetch; concurrent and
//! later requests join the same result, including a failed one. Scoped views
//! restrict the provider list for one ad network while sharing the cache.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::watch;
use url::Url;

use crate::keyset::KeyInfo;
use crate::keyset::KeysetError;
use crate::keyset::parse_keyset;
use crate::stream::KeySource;
use crate::stream::KeyStream;

// ============================================================================
// SECTION: Types
// ============================================================================

/// A named trust root publishing a keyset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyProvider {
    /// Unique provider name.
    pub name: String,
    /// Keyset document location.
    pub keyset_url: Url,
}

/// Fetches raw keyset documents.
#[async_trait]
pub trait KeysetFetcher: Send + Sync {
    /// Fetches the keyset document for `provider`.
    ///
    /// # Errors
    ///
    /// Returns [`KeysetError::Fetch`] when the document cannot be retrieved.
    async fn fetch_keyset(&self, provider: &KeyProvider) -> Result<Vec<u8>, KeysetError>;
}

/// Settled keyset for one provider.
type KeysetResult = Result<Arc<[KeyInfo]>, KeysetError>;
/// Watch slot that is `None` while the fetch is in flight.
type KeysetSlot = watch::Receiver<Option<KeysetResult>>;

// ============================================================================
// SECTION: Registry
// ============================================================================

/// Key provider registry with a per-instance keyset cache.
///
/// # Invariants
/// - Provider names are unique; registration order is preserved.
/// - Each provider's keyset is fetched at most once; failures are cached.
/// - Clones and scoped views share one cache.
#[derive(Clone)]
pub struct KeyProviderRegistry {
    /// Providers visible through this view, in registration order.
    providers: Arc<Vec<KeyProvider>>,
    /// Keyset document fetcher.
    fetcher: Arc<dyn KeysetFetcher>,
    /// Keyset slots keyed by provider name.
    cache: Arc<Mutex<BTreeMap<String, KeysetSlot>>>,
}

impl KeyProviderRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new(fetcher: Arc<dyn KeysetFetcher>) -> Self {
        Self {
            providers: Arc::new(Vec::new()),
            fetcher,
            cache: Arc::new(Mutex::new(BTreeMap::new())),
        }
    }

    /// Registers a provider.
    ///
    /// # Errors
    ///
    /// Returns [`KeysetError::DuplicateProvider`] when the name is taken.
    pub fn register(&mut self, provider: KeyProvider) -> Result<(), KeysetError> {
        if self.providers.iter().any(|existing| existing.name == provider.name) {
            return Err(KeysetError::DuplicateProvider(provider.name));
        }
        Arc::make_mut(&mut self.providers).push(provider);
        Ok(())
    }

    /// Returns registered providers in registration order.
    #[must_use]
    pub fn providers(&self) -> &[KeyProvider] {
        &self.providers
    }

    /// Returns a view limited to `names`, keeping registration order and
    /// sharing this registry's cache. Unknown names are ignored.
    #[must_use]
    pub fn scoped(&self, names: &[String]) -> Self {
        let providers = self
            .providers
            .iter()
            .filter(|provider| names.iter().any(|name| name == &provider.name))
            .cloned()
            .collect();
        Self {
            providers: Arc::new(providers),
            fetcher: Arc::clone(&self.fetcher),
            cache: Arc::clone(&self.cache),
        }
    }

    /// Returns true once a fetch for `name` has been started.
    #[must_use]
    pub fn is_fetch_started(&self, name: &str) -> bool {
        self.cache.lock().is_ok_and(|cache| cache.contains_key(name))
    }

    /// Resolves the keyset for `name`, joining any in-flight fetch.
    ///
    /// # Errors
    ///
    /// Returns [`KeysetError`] when the provider is unknown or its (cached)
    /// fetch failed.
    pub async fn keyset(&self, name: &str) -> Result<Arc<[KeyInfo]>, KeysetError> {
        let provider = self
            .providers
            .iter()
            .find(|provider| provider.name == name)
            .ok_or_else(|| KeysetError::UnknownProvider(name.to_string()))?;
        let slot = self.slot_for(provider)?;
        wait_for_keyset(slot, name).await
    }

    /// Returns the cache slot for `provider`, starting its fetch on first use.
    fn slot_for(&self, provider: &KeyProvider) -> Result<KeysetSlot, KeysetError> {
        let mut cache =
            self.cache.lock().map_err(|_| KeysetError::Abandoned(provider.name.clone()))?;
        if let Some(slot) = cache.get(&provider.name) {
            return Ok(slot.clone());
        }
        let (sender, receiver) = watch::channel(None);
        cache.insert(provider.name.clone(), receiver.clone());
        drop(cache);

        let fetcher = Arc::clone(&self.fetcher);
        let provider = provider.clone();
        tokio::spawn(async move {
            let result = fetcher
                .fetch_keyset(&provider)
                .await
                .and_then(|bytes| parse_keyset(&provider.name, &bytes))
                .map(Arc::from);
            sender.send_replace(Some(result));
        });
        Ok(receiver)
    }
}

/// Waits until `slot` settles and clones its result.
async fn wait_for_keyset(mut slot: KeysetSlot, name: &str) -> KeysetResult {
    let settled = {
        let guard = slot
            .wait_for(Option::is_some)
            .await
            .map_err(|_| KeysetError::Abandoned(name.to_string()))?;
        guard.clone()
    };
    settled.unwrap_or_else(|| Err(KeysetError::Abandoned(name.to_string())))
}

#[async_trait]
impl KeySource for KeyProviderRegistry {
    fn provider_names(&self) -> Vec<String> {
        self.providers.iter().map(|provider| provider.name.clone()).collect()
    }

    async fn resolve(&self, provider: &str) -> Result<KeyStream, KeysetError> {
        let keys = self.keyset(provider).await?;
        Ok(KeyStream::from_keys(keys.iter().cloned()))
    }
}
