//! In-process cache store.

use std::time::{
    Duration,
    Instant,
};

use dashmap::DashMap;

use super::CacheStore;
use crate::dot::Translations;

/// 有効期限付きのキャッシュ値
#[derive(Debug, Clone)]
struct CachedValue {
    translations: Translations,
    /// `None` なら無期限
    expires_at: Option<Instant>,
}

impl CachedValue {
    /// 期限切れかどうか
    fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at <= Instant::now())
    }
}

/// `DashMap` backed cache with optional per-entry expiry.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: DashMap<String, CachedValue>,
}

impl MemoryCache {
    /// 空のキャッシュを作成
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a live (non-expired) entry exists for `key`.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Whether no entries are stored, expired ones included until touched.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl CacheStore for MemoryCache {
    fn get(&self, key: &str) -> Option<Translations> {
        let entry = self.entries.get(key)?;
        if entry.is_expired() {
            // 読み取りガードを外してから削除する
            drop(entry);
            self.entries.remove(key);
            return None;
        }
        Some(entry.translations.clone())
    }

    fn put(&self, key: &str, translations: Translations, ttl: Option<Duration>) {
        let expires_at = ttl.and_then(|ttl| Instant::now().checked_add(ttl));
        self.entries.insert(key.to_string(), CachedValue { translations, expires_at });
    }

    fn forget(&self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }
}
