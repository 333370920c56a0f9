//! Flat file store: one `{locale}.{ext}` document per locale, literal keys.

use std::collections::BTreeSet;
use std::path::PathBuf;

use serde_json::{
    Map,
    Value,
};

use super::{
    Fallback,
    FlatStore,
    LocaleContext,
    Store,
    require_object,
};
use crate::backend::fs::{
    self,
    FileEntry,
};
use crate::cache::TranslationCache;
use crate::codec::{
    Codec,
    FormatOptions,
};
use crate::dot::{
    self,
    TranslationValue,
    Translations,
};
use crate::error::StoreError;
use crate::pattern::{
    Pattern,
    name_matcher,
};

/// Flat translation files directly under one or more base directories.
///
/// Reads merge every base directory in order; new files go to the first one.
#[derive(Debug)]
pub struct FlatFileStore<C> {
    /// 翻訳ファイルを置くディレクトリ
    paths: Vec<PathBuf>,
    codec: C,
    options: FormatOptions,
    cache: TranslationCache,
    context: LocaleContext,
}

impl<C: Codec> FlatFileStore<C> {
    #[must_use]
    pub fn new(paths: Vec<PathBuf>, codec: C, options: FormatOptions, context: LocaleContext) -> Self {
        Self { paths, codec, options, cache: TranslationCache::disabled(), context }
    }

    #[must_use]
    pub fn with_cache(mut self, cache: TranslationCache) -> Self {
        self.cache = cache;
        self
    }

    fn pattern(&self, locale: Option<&str>) -> Result<Pattern, StoreError> {
        Ok(Pattern::parse(self.context.resolve(locale))?)
    }

    /// `locale` に一致するロケールファイル
    fn files(&self, locale: &Pattern) -> Result<Vec<FileEntry>, StoreError> {
        let matcher = name_matcher(&locale.glob(), self.codec.extensions())?;
        Ok(fs::list_files(&self.paths, &matcher, Some(1)))
    }

    /// ファイル名の stem がロケール
    fn locale_of(file: &FileEntry) -> Option<String> {
        file.path.file_stem().and_then(|stem| stem.to_str()).map(str::to_string)
    }

    /// まだ存在しないロケールファイルの置き場所
    fn new_file(&self, locale: &str) -> Result<FileEntry, StoreError> {
        let base = self.paths.first().ok_or_else(|| StoreError::NoBaseDirectory(locale.to_string()))?;
        let extension = self.codec.extensions().first().copied().unwrap_or("json");
        let path = base.join(format!("{locale}.{extension}"));
        Ok(FileEntry::new(base.clone(), path))
    }

    fn read(&self, file: &FileEntry) -> Translations {
        let Some(bytes) = fs::read(&file.path) else {
            return Translations::new();
        };
        match self.codec.decode(&bytes) {
            Ok(document) => dot::literal(&document),
            Err(err) => {
                tracing::warn!(
                    path = %file.path.display(),
                    %err,
                    "Failed to decode translation file, treating it as empty"
                );
                Translations::new()
            }
        }
    }

    fn write(&self, file: &FileEntry, translations: &Translations) -> Result<(), StoreError> {
        let document: Map<String, Value> = translations
            .iter()
            .map(|(key, value)| (key.clone(), Value::String(value.clone())))
            .collect();
        let bytes = self.codec.encode(&Value::Object(document), self.options)?;
        fs::write(&file.path, &bytes)?;
        tracing::debug!(path = %file.path.display(), "Wrote translation file");
        Ok(())
    }

    /// Reads through the cache.
    fn load(&self, locale: &Pattern) -> Result<Translations, StoreError> {
        self.cache.remember(locale, || {
            let mut translations = Translations::new();
            for file in self.files(locale)? {
                translations.extend(self.read(&file));
            }
            Ok(translations)
        })
    }

    fn get_all_in(&self, locale: &Pattern, fallback: &Fallback) -> Result<Translations, StoreError> {
        let translations = self.load(locale)?;

        match fallback.locale(&self.context) {
            Some(fallback) if locale.to_string() != fallback => {
                Ok(dot::overlay(self.load(&Pattern::parse(fallback)?)?, translations))
            }
            _ => Ok(translations),
        }
    }

    /// Existing files for `locale`, plus a new one per exact member that has none.
    fn upsert_targets(&self, locale: &Pattern) -> Result<Vec<FileEntry>, StoreError> {
        let mut targets = Vec::new();
        for member in locale.split() {
            let existing = self.files(&member)?;
            match member.as_exact() {
                Some(locale) if existing.is_empty() => targets.push(self.new_file(locale)?),
                _ => targets.extend(existing),
            }
        }
        Ok(targets)
    }

    /// Merges `upserts` into each target file. Locales are recorded in
    /// `touched` before their file is written.
    fn upsert_in(
        &self,
        locale: &Pattern,
        upserts: &Translations,
        touched: &mut Vec<String>,
    ) -> Result<(), StoreError> {
        for file in self.upsert_targets(locale)? {
            let merged = dot::overlay(self.read(&file), upserts.clone());
            touched.extend(Self::locale_of(&file));
            self.write(&file, &merged)?;
        }
        Ok(())
    }

    /// ファイルからキーを削除し、空になったファイルは消す
    fn remove_in(&self, locale: &Pattern, keys: &[&str], touched: &mut Vec<String>) -> Result<(), StoreError> {
        for file in self.files(locale)? {
            let mut translations = self.read(&file);
            let before = translations.len();
            for key in keys {
                translations.shift_remove(*key);
            }

            touched.extend(Self::locale_of(&file));
            if translations.is_empty() {
                fs::delete(&file.path, &file.base);
            } else if translations.len() != before {
                self.write(&file, &translations)?;
            }
        }
        Ok(())
    }

    /// Invalidates the touched locales even when the write failed partway.
    fn settle(
        &self,
        locale: &Pattern,
        touched: Vec<String>,
        outcome: Result<(), StoreError>,
    ) -> Result<(), StoreError> {
        if let Err(err) = &outcome {
            tracing::warn!(%locale, %err, files = touched.len(), "Flat translation write stopped partway");
        }
        let invalidated = self.invalidate(locale, touched);
        outcome.and(invalidated)
    }

    fn invalidate(&self, locale: &Pattern, touched: Vec<String>) -> Result<(), StoreError> {
        self.cache.forget(locale, || {
            let mut locales: BTreeSet<String> =
                self.locales()?.into_iter().filter(|known| locale.matches(known)).collect();
            locales.extend(touched);
            Ok(locales.into_iter().collect())
        })?;
        Ok(())
    }
}

impl<C: Codec> Store for FlatFileStore<C> {
    fn locale_context(&self) -> &LocaleContext {
        &self.context
    }

    fn get(
        &self,
        key: &str,
        locale: Option<&str>,
        fallback: &Fallback,
    ) -> Result<Option<TranslationValue>, StoreError> {
        let requested = self.context.resolve(locale);
        let translations = self.get_all_in(&Pattern::parse(requested)?, &Fallback::Disabled)?;
        let value = translations.get(key).cloned().map(TranslationValue::Text);

        if value.is_none()
            && let Some(fallback) = fallback.locale(&self.context)
            && fallback != requested
        {
            return self.get(key, Some(fallback), &Fallback::Disabled);
        }

        Ok(value)
    }
}

impl<C: Codec> FlatStore for FlatFileStore<C> {
    fn get_all(&self, locale: Option<&str>, fallback: &Fallback) -> Result<Translations, StoreError> {
        let locale = self.pattern(locale)?;
        self.get_all_in(&locale, fallback)
    }

    fn locales(&self) -> Result<Vec<String>, StoreError> {
        let mut locales: Vec<String> = Vec::new();
        for file in self.files(&Pattern::Wildcard)? {
            if let Some(locale) = Self::locale_of(&file)
                && !locales.contains(&locale)
            {
                locales.push(locale);
            }
        }
        Ok(locales)
    }

    fn update(&self, translations: &Value, locale: Option<&str>) -> Result<(), StoreError> {
        require_object(translations)?;
        let locale = self.pattern(locale)?;
        let (upserts, removals) = dot::partition_literal(translations);
        let mut touched = Vec::new();

        let mut outcome = Ok(());
        if !upserts.is_empty() {
            outcome = self.upsert_in(&locale, &upserts, &mut touched);
        }
        if outcome.is_ok() && !removals.is_empty() {
            let keys: Vec<&str> = removals.iter().map(String::as_str).collect();
            outcome = self.remove_in(&locale, &keys, &mut touched);
        }

        tracing::debug!(%locale, upserts = upserts.len(), removals = removals.len(), "Updated flat translations");
        self.settle(&locale, touched, outcome)
    }

    fn remove(&self, keys: &[&str], locale: Option<&str>) -> Result<(), StoreError> {
        let locale = self.pattern(locale)?;
        let mut touched = Vec::new();
        let outcome = self.remove_in(&locale, keys, &mut touched);
        self.settle(&locale, touched, outcome)
    }

    fn flush(&self, locale: Option<&str>) -> Result<(), StoreError> {
        let locale = self.pattern(locale)?;
        let mut touched = Vec::new();
        for file in self.files(&locale)? {
            fs::delete(&file.path, &file.base);
            touched.extend(Self::locale_of(&file));
        }
        tracing::debug!(%locale, files = touched.len(), "Flushed flat translations");
        self.invalidate(&locale, touched)
    }
}
