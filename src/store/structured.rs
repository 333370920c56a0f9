//! Structured store engine.
//!
//! Pattern resolution, fallbacks, upsert targets and cache invalidation live
//! here; the backend only lists, reads, writes and deletes documents.

use std::collections::BTreeSet;

use serde_json::Value;

use super::{
    Fallback,
    LocaleContext,
    Store,
    StructuredStore,
    require_object,
};
use crate::address::{
    Address,
    Scope,
    TranslationKey,
};
use crate::backend::{
    DocumentBackend,
    Entry,
};
use crate::cache::TranslationCache;
use crate::dot::{
    self,
    TranslationValue,
    Translations,
};
use crate::error::StoreError;
use crate::pattern::{
    NamespaceSelector,
    Pattern,
};
use crate::structure::StoreStructure;

/// [`StructuredStore`] over any [`DocumentBackend`].
#[derive(Debug)]
pub struct StructuredEngine<B> {
    /// Where documents live
    backend: B,
    cache: TranslationCache,
    context: LocaleContext,
}

impl<B: DocumentBackend> StructuredEngine<B> {
    #[must_use]
    pub fn new(backend: B, context: LocaleContext) -> Self {
        Self { backend, cache: TranslationCache::disabled(), context }
    }

    #[must_use]
    pub fn with_cache(mut self, cache: TranslationCache) -> Self {
        self.cache = cache;
        self
    }

    fn scope(&self, group: &str, namespace: Option<&str>, locale: Option<&str>) -> Result<Scope, StoreError> {
        Ok(Scope::parse(group, namespace, self.context.resolve(locale))?)
    }

    /// Merged translations of every document inside `scope`, read through the
    /// cache when the scope is concrete.
    fn load(&self, scope: &Scope) -> Result<Translations, StoreError> {
        self.cache.remember(scope, || {
            let mut translations = Translations::new();
            for entry in self.backend.list(scope)? {
                translations.extend(self.backend.read(&entry)?);
            }
            Ok(translations)
        })
    }

    /// Loads `scope` and fills gaps from the fallback locale.
    fn get_all_in(&self, scope: &Scope, fallback: &Fallback) -> Result<Translations, StoreError> {
        let translations = self.load(scope)?;

        match fallback.locale(&self.context) {
            Some(fallback) if scope.locale.to_string() != fallback => {
                let fallback_scope =
                    Scope { locale: Pattern::parse(fallback)?, ..scope.clone() };
                Ok(dot::overlay(self.load(&fallback_scope)?, translations))
            }
            _ => Ok(translations),
        }
    }

    /// Existing documents a write to `scope` lands in, plus a new one for
    /// each concrete sub-target that has none.
    fn upsert_targets(&self, scope: &Scope) -> Result<Vec<Entry<B::Location>>, StoreError> {
        let mut targets = Vec::new();
        for target in scope.write_targets() {
            let existing = self.backend.list(&target)?;
            match target.concrete() {
                Some(address) if existing.is_empty() => {
                    tracing::debug!(%address, "Creating translation document");
                    targets.push(Entry { location: self.backend.locate(&address)?, address });
                }
                _ => targets.extend(existing),
            }
        }
        Ok(targets)
    }

    /// Merges `upserts` into every upsert target of `scope`.
    ///
    /// Addresses are recorded in `touched` before the write, so a batch that
    /// fails partway still gets its written documents evicted.
    fn upsert_in(
        &self,
        scope: &Scope,
        upserts: &Translations,
        touched: &mut Vec<Address>,
    ) -> Result<(), StoreError> {
        let mut batch = Vec::new();
        for entry in self.upsert_targets(scope)? {
            let merged = dot::overlay(self.backend.read(&entry)?, upserts.clone());
            batch.push((entry, merged));
        }

        touched.extend(batch.iter().map(|(entry, _)| entry.address.clone()));
        self.backend.write(&batch)?;
        tracing::debug!(%scope, documents = batch.len(), keys = upserts.len(), "Updated translations");
        Ok(())
    }

    /// Removes `items` from every existing document in `scope`, recording each
    /// document in `touched` before it is changed.
    fn remove_in(&self, scope: &Scope, items: &[&str], touched: &mut Vec<Address>) -> Result<(), StoreError> {
        let mut batch = Vec::new();

        for entry in self.backend.list(scope)? {
            let mut translations = self.backend.read(&entry)?;
            let mut changed = false;
            for item in items {
                changed |= dot::forget(&mut translations, item);
            }

            touched.push(entry.address.clone());
            if translations.is_empty() {
                self.backend.delete(&entry)?;
            } else if changed {
                batch.push((entry, translations));
            }
        }

        self.backend.write(&batch)?;
        tracing::debug!(%scope, keys = items.len(), "Removed translations");
        Ok(())
    }

    /// Deletes every document in `scope`.
    fn flush_in(&self, scope: &Scope, touched: &mut Vec<Address>) -> Result<(), StoreError> {
        for entry in self.backend.list(scope)? {
            touched.push(entry.address.clone());
            self.backend.delete(&entry)?;
        }
        tracing::debug!(%scope, documents = touched.len(), "Flushed translations");
        Ok(())
    }

    /// Invalidates whatever `outcome`'s mutation touched, then returns the
    /// mutation's own result.
    fn settle(
        &self,
        scope: &Scope,
        touched: Vec<Address>,
        outcome: Result<(), StoreError>,
    ) -> Result<(), StoreError> {
        if let Err(err) = &outcome {
            tracing::warn!(%scope, %err, documents = touched.len(), "Translation write stopped partway");
        }
        let invalidated = self.invalidate(scope, touched);
        outcome.and(invalidated)
    }

    /// Evicts cached entries for `scope` after a mutation.
    ///
    /// Non-concrete scopes expand through a fresh listing; `touched` adds the
    /// documents that were just deleted and no longer show up in it.
    fn invalidate(&self, scope: &Scope, touched: Vec<Address>) -> Result<(), StoreError> {
        self.cache.forget(scope, || {
            let mut addresses: BTreeSet<Address> =
                self.structure()?.matching(scope).into_iter().collect();
            addresses.extend(touched);
            Ok(addresses.iter().map(Address::cache_suffix).collect())
        })?;
        Ok(())
    }
}

impl<B: DocumentBackend> Store for StructuredEngine<B> {
    fn locale_context(&self) -> &LocaleContext {
        &self.context
    }

    fn get(
        &self,
        key: &str,
        locale: Option<&str>,
        fallback: &Fallback,
    ) -> Result<Option<TranslationValue>, StoreError> {
        let parsed = TranslationKey::parse(key)?;
        let requested = self.context.resolve(locale);
        let scope = Scope {
            group: Pattern::parse_group(&parsed.group)?,
            namespace: NamespaceSelector::single(parsed.namespace),
            locale: Pattern::parse(requested)?,
        };

        let translations = self.get_all_in(&scope, &Fallback::Disabled)?;
        let value = dot::lookup(&translations, parsed.item.as_deref());

        if value.is_none()
            && let Some(fallback) = fallback.locale(&self.context)
            && fallback != requested
        {
            tracing::trace!(key, locale = requested, fallback, "Falling back");
            return self.get(key, Some(fallback), &Fallback::Disabled);
        }

        Ok(value)
    }
}

impl<B: DocumentBackend> StructuredStore for StructuredEngine<B> {
    fn get_all(
        &self,
        group: &str,
        namespace: Option<&str>,
        locale: Option<&str>,
        fallback: &Fallback,
    ) -> Result<Translations, StoreError> {
        let scope = self.scope(group, namespace, locale)?;
        self.get_all_in(&scope, fallback)
    }

    fn structure(&self) -> Result<StoreStructure, StoreError> {
        Ok(self.backend.list(&Scope::everything())?.into_iter().map(|entry| entry.address).collect())
    }

    fn update(
        &self,
        translations: &Value,
        group: &str,
        namespace: Option<&str>,
        locale: Option<&str>,
    ) -> Result<(), StoreError> {
        require_object(translations)?;
        let scope = self.scope(group, namespace, locale)?;
        let (upserts, removals) = dot::partition(translations);
        let mut touched = Vec::new();

        let mut outcome = Ok(());
        if !upserts.is_empty() {
            outcome = self.upsert_in(&scope, &upserts, &mut touched);
        }
        if outcome.is_ok() && !removals.is_empty() {
            let items: Vec<&str> = removals.iter().map(String::as_str).collect();
            outcome = self.remove_in(&scope, &items, &mut touched);
        }

        self.settle(&scope, touched, outcome)
    }

    fn remove(
        &self,
        items: &[&str],
        group: &str,
        namespace: Option<&str>,
        locale: Option<&str>,
    ) -> Result<(), StoreError> {
        let scope = self.scope(group, namespace, locale)?;
        let mut touched = Vec::new();
        let outcome = self.remove_in(&scope, items, &mut touched);
        self.settle(&scope, touched, outcome)
    }

    fn flush(&self, group: &str, namespace: Option<&str>, locale: Option<&str>) -> Result<(), StoreError> {
        let scope = self.scope(group, namespace, locale)?;
        let mut touched = Vec::new();
        let outcome = self.flush_in(&scope, &mut touched);
        self.settle(&scope, touched, outcome)
    }
}
