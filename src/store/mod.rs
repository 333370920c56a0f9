//! Store contracts and the engines implementing them.
//!
//! A store is either flat (one document per locale, literal keys) or
//! structured (documents per namespace, locale and group, dotted item paths).

/// Flat per-locale file store
mod flat;
/// Structured store engine over a [`DocumentBackend`](crate::backend::DocumentBackend)
mod structured;

use std::fmt::Debug;

pub use flat::FlatFileStore;
use serde_json::Value;
pub use structured::StructuredEngine;

use crate::dot::{
    TranslationValue,
    Translations,
};
use crate::error::StoreError;
use crate::structure::StoreStructure;

/// Which locale, if any, fills in translations missing from the requested one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Fallback {
    /// No fallback.
    Disabled,
    /// The store's configured fallback locale.
    #[default]
    Default,
    /// An explicit fallback locale.
    Locale(String),
}

impl Fallback {
    /// Fallback locale to use, if any.
    #[must_use]
    pub fn locale<'a>(&'a self, context: &'a LocaleContext) -> Option<&'a str> {
        match self {
            Self::Disabled => None,
            Self::Default => Some(&context.fallback),
            Self::Locale(locale) => Some(locale),
        }
    }
}

/// Current and fallback locale a store resolves omitted locales against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocaleContext {
    pub locale: String,
    pub fallback: String,
}

impl LocaleContext {
    #[must_use]
    pub fn new(locale: impl Into<String>, fallback: impl Into<String>) -> Self {
        Self { locale: locale.into(), fallback: fallback.into() }
    }

    /// The requested locale spec, or the current locale when omitted.
    #[must_use]
    pub fn resolve<'a>(&'a self, locale: Option<&'a str>) -> &'a str {
        locale.unwrap_or(&self.locale)
    }
}

impl Default for LocaleContext {
    fn default() -> Self {
        Self::new("en", "en")
    }
}

/// Operations shared by every store.
pub trait Store: Debug + Send + Sync {
    fn locale_context(&self) -> &LocaleContext;

    /// Looks up one translation (or a sub-tree of them).
    ///
    /// Flat stores take the key literally; structured stores decompose it
    /// into `[namespace::]group[.item]`.
    ///
    /// # Errors
    /// - Malformed key or locale spec
    /// - Backend failure
    fn get(
        &self,
        key: &str,
        locale: Option<&str>,
        fallback: &Fallback,
    ) -> Result<Option<TranslationValue>, StoreError>;

    /// # Errors
    /// - Same as [`Store::get`]
    fn has(&self, key: &str, locale: Option<&str>) -> Result<bool, StoreError> {
        Ok(self.get(key, locale, &Fallback::Disabled)?.is_some())
    }
}

/// One document per locale.
pub trait FlatStore: Store {
    /// # Errors
    /// - Malformed locale spec
    /// - Backend failure
    fn get_all(&self, locale: Option<&str>, fallback: &Fallback) -> Result<Translations, StoreError>;

    /// Locales that currently have a document.
    ///
    /// # Errors
    /// - Backend failure
    fn locales(&self) -> Result<Vec<String>, StoreError>;

    /// Same as [`FlatStore::update`].
    ///
    /// # Errors
    /// - Same as [`FlatStore::update`]
    fn add(&self, translations: &Value, locale: Option<&str>) -> Result<(), StoreError> {
        self.update(translations, locale)
    }

    /// Upserts `translations`; `null` values remove their key.
    ///
    /// # Errors
    /// - `translations` is not an object
    /// - Malformed locale spec
    /// - Backend failure
    fn update(&self, translations: &Value, locale: Option<&str>) -> Result<(), StoreError>;

    /// # Errors
    /// - Malformed locale spec
    /// - Backend failure
    fn remove(&self, keys: &[&str], locale: Option<&str>) -> Result<(), StoreError>;

    /// Deletes every document matching `locale`.
    ///
    /// # Errors
    /// - Malformed locale spec
    /// - Backend failure
    fn flush(&self, locale: Option<&str>) -> Result<(), StoreError>;
}

/// Documents per namespace, locale and group.
///
/// `namespace` is `None` for every namespace and `Some("*")` for the default
/// one.
pub trait StructuredStore: Store {
    /// # Errors
    /// - Malformed group, namespace or locale spec
    /// - Backend failure
    fn get_all(
        &self,
        group: &str,
        namespace: Option<&str>,
        locale: Option<&str>,
        fallback: &Fallback,
    ) -> Result<Translations, StoreError>;

    /// Every existing `(namespace, locale, group)`.
    ///
    /// # Errors
    /// - Backend failure
    fn structure(&self) -> Result<StoreStructure, StoreError>;

    /// Same as [`StructuredStore::update`].
    ///
    /// # Errors
    /// - Same as [`StructuredStore::update`]
    fn add(
        &self,
        translations: &Value,
        group: &str,
        namespace: Option<&str>,
        locale: Option<&str>,
    ) -> Result<(), StoreError> {
        self.update(translations, group, namespace, locale)
    }

    /// Upserts nested `translations`; `null` leaves remove their key.
    ///
    /// # Errors
    /// - `translations` is not an object
    /// - Malformed group, namespace or locale spec
    /// - Backend failure
    fn update(
        &self,
        translations: &Value,
        group: &str,
        namespace: Option<&str>,
        locale: Option<&str>,
    ) -> Result<(), StoreError>;

    /// Removes items (and everything nested below them).
    ///
    /// # Errors
    /// - Malformed group, namespace or locale spec
    /// - Backend failure
    fn remove(
        &self,
        items: &[&str],
        group: &str,
        namespace: Option<&str>,
        locale: Option<&str>,
    ) -> Result<(), StoreError>;

    /// Deletes every matching document.
    ///
    /// # Errors
    /// - Malformed group, namespace or locale spec
    /// - Backend failure
    fn flush(&self, group: &str, namespace: Option<&str>, locale: Option<&str>) -> Result<(), StoreError>;
}

/// Rejects write requests that are not JSON objects.
fn require_object(translations: &Value) -> Result<(), StoreError> {
    let kind = match translations {
        Value::Object(_) => return Ok(()),
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
    };
    Err(StoreError::InvalidDocument(kind.to_string()))
}

#[cfg(test)]
mod tests {
    use googletest::prelude::*;
    use rstest::rstest;
    use serde_json::json;

    use super::*;

    #[rstest]
    #[case::disabled(Fallback::Disabled, None)]
    #[case::default(Fallback::Default, Some("en"))]
    #[case::explicit(Fallback::Locale("fr".to_string()), Some("fr"))]
    fn fallback_locale(#[case] fallback: Fallback, #[case] expected: Option<&str>) {
        let context = LocaleContext::new("de", "en");

        assert_that!(fallback.locale(&context), eq(expected));
    }

    #[rstest]
    fn resolve_omitted_locale() {
        let context = LocaleContext::new("de", "en");

        assert_that!(context.resolve(None), eq("de"));
        assert_that!(context.resolve(Some("en|fr")), eq("en|fr"));
    }

    #[rstest]
    fn require_object_rejects_arrays() {
        assert_that!(require_object(&json!({})), ok(anything()));
        assert_that!(
            require_object(&json!(["a"])),
            err(displays_as(contains_substring("an array")))
        );
    }
}
