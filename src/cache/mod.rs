//! Translation caching.
//!
//! Only fully concrete scopes are cached. Writes through wildcard or union
//! scopes evict every concrete key the scope expands to.

/// In-process cache store
mod memory;

use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

pub use memory::MemoryCache;

use crate::address::Scope;
use crate::dot::Translations;
use crate::error::StoreError;
use crate::pattern::Pattern;

/// Name under which [`MemoryCache`] is always registered.
pub const MEMORY_CACHE: &str = "memory";

/// Key-value cache capability shared between stores.
pub trait CacheStore: Debug + Send + Sync {
    fn get(&self, key: &str) -> Option<Translations>;

    /// Stores a value. `None` keeps it until forgotten.
    fn put(&self, key: &str, translations: Translations, ttl: Option<Duration>);

    /// Evicts one key. Returns whether an entry was present.
    fn forget(&self, key: &str) -> bool;

    /// Returns the cached value, or computes, stores and returns it.
    ///
    /// # Errors
    /// - `compute` failed; nothing is stored in that case
    fn remember(
        &self,
        key: &str,
        ttl: Option<Duration>,
        compute: &mut dyn FnMut() -> Result<Translations, StoreError>,
    ) -> Result<Translations, StoreError> {
        if let Some(hit) = self.get(key) {
            tracing::trace!(key, "Cache hit");
            return Ok(hit);
        }
        let translations = compute()?;
        self.put(key, translations.clone(), ttl);
        Ok(translations)
    }
}

/// Something that maps to at most one cache key suffix.
pub trait CacheScope {
    /// `None` when the scope is not fully concrete.
    fn cache_suffix(&self) -> Option<String>;
}

impl CacheScope for Scope {
    fn cache_suffix(&self) -> Option<String> {
        self.concrete().map(|address| address.cache_suffix())
    }
}

/// Flat stores are keyed by locale alone.
impl CacheScope for Pattern {
    fn cache_suffix(&self) -> Option<String> {
        self.as_exact().map(str::to_string)
    }
}

/// Per-store view of a cache: store handle, key prefix and lifetime.
#[derive(Debug, Clone, Default)]
pub struct TranslationCache {
    /// `None` disables caching
    store: Option<Arc<dyn CacheStore>>,
    prefix: String,
    lifetime: Option<Duration>,
}

impl TranslationCache {
    /// A cache that never stores anything.
    #[must_use]
    pub fn disabled() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn new(store: Arc<dyn CacheStore>, prefix: impl Into<String>, lifetime: Option<Duration>) -> Self {
        Self { store: Some(store), prefix: prefix.into(), lifetime }
    }

    /// Full cache key for a suffix (`prefix.suffix`).
    #[must_use]
    pub fn key(&self, suffix: &str) -> String {
        format!("{}.{suffix}", self.prefix)
    }

    /// Reads through the cache when `scope` is concrete, otherwise calls
    /// `compute` directly.
    ///
    /// # Errors
    /// - `compute` failed
    pub fn remember<S, F>(&self, scope: &S, mut compute: F) -> Result<Translations, StoreError>
    where
        S: CacheScope + ?Sized,
        F: FnMut() -> Result<Translations, StoreError>,
    {
        match (&self.store, scope.cache_suffix()) {
            (Some(store), Some(suffix)) => store.remember(&self.key(&suffix), self.lifetime, &mut compute),
            _ => compute(),
        }
    }

    /// Evicts every key `scope` stands for.
    ///
    /// A concrete scope evicts its own key; otherwise `expand` supplies the
    /// suffixes. `expand` is not called when the cache is disabled.
    ///
    /// # Errors
    /// - `expand` failed
    pub fn forget<S, F>(&self, scope: &S, expand: F) -> Result<usize, StoreError>
    where
        S: CacheScope + ?Sized,
        F: FnOnce() -> Result<Vec<String>, StoreError>,
    {
        let Some(store) = &self.store else {
            return Ok(0);
        };

        let suffixes = match scope.cache_suffix() {
            Some(suffix) => vec![suffix],
            None => expand()?,
        };

        let mut evicted = 0;
        for suffix in &suffixes {
            if store.forget(&self.key(suffix)) {
                evicted += 1;
            }
        }
        tracing::debug!(prefix = %self.prefix, keys = suffixes.len(), evicted, "Invalidated cached translations");
        Ok(evicted)
    }
}
