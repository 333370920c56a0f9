//! Named store resolution and multi-store loading.

/// Driver registry
mod registry;

use std::collections::HashMap;
use std::path::{
    Path,
    PathBuf,
};
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::Mutex;
pub use registry::{
    DriverContext,
    DriverFactory,
    DriverRegistry,
};

use crate::backend::fs;
use crate::cache::{
    CacheStore,
    MEMORY_CACHE,
    MemoryCache,
    TranslationCache,
};
use crate::codec::{
    Codec,
    JsonCodec,
};
use crate::config::{
    ConfigError,
    StoreConfig,
    StoreSettings,
};
use crate::dot::{
    self,
    TranslationValue,
    Translations,
};
use crate::error::StoreError;
use crate::pattern::WILDCARD;
use crate::store::{
    Fallback,
    FlatStore,
    LocaleContext,
    Store,
    StructuredStore,
};

/// A resolved store of either shape.
#[derive(Debug, Clone)]
pub enum AnyStore {
    Flat(Arc<dyn FlatStore>),
    Structured(Arc<dyn StructuredStore>),
}

impl AnyStore {
    #[must_use]
    pub fn as_flat(&self) -> Option<&Arc<dyn FlatStore>> {
        match self {
            Self::Flat(store) => Some(store),
            Self::Structured(_) => None,
        }
    }

    #[must_use]
    pub fn as_structured(&self) -> Option<&Arc<dyn StructuredStore>> {
        match self {
            Self::Structured(store) => Some(store),
            Self::Flat(_) => None,
        }
    }

    /// # Errors
    /// - See [`Store::get`]
    pub fn get(
        &self,
        key: &str,
        locale: Option<&str>,
        fallback: &Fallback,
    ) -> Result<Option<TranslationValue>, StoreError> {
        match self {
            Self::Flat(store) => store.get(key, locale, fallback),
            Self::Structured(store) => store.get(key, locale, fallback),
        }
    }

    /// # Errors
    /// - See [`Store::has`]
    pub fn has(&self, key: &str, locale: Option<&str>) -> Result<bool, StoreError> {
        match self {
            Self::Flat(store) => store.has(key, locale),
            Self::Structured(store) => store.has(key, locale),
        }
    }
}

/// Resolves stores by name from [`StoreSettings`] and merges them on load.
///
/// Stores are built on first use and kept until forgotten.
#[derive(Debug)]
pub struct TranslationManager {
    settings: StoreSettings,
    registry: DriverRegistry,
    /// Cache stores by name (`memory` is always present)
    caches: HashMap<String, Arc<dyn CacheStore>>,
    /// Resolved (or explicitly added) stores
    stores: Mutex<IndexMap<String, AnyStore>>,
    /// Package directories holding flat `{locale}.json` files
    json_paths: Vec<PathBuf>,
    /// Package directory per namespace, holding `{locale}/{group}.json`
    namespaces: IndexMap<String, PathBuf>,
}

impl TranslationManager {
    #[must_use]
    pub fn new(settings: StoreSettings) -> Self {
        let memory: Arc<dyn CacheStore> = Arc::new(MemoryCache::new());
        Self {
            settings,
            registry: DriverRegistry::new(),
            caches: HashMap::from([(MEMORY_CACHE.to_string(), memory)]),
            stores: Mutex::new(IndexMap::new()),
            json_paths: Vec::new(),
            namespaces: IndexMap::new(),
        }
    }

    #[must_use]
    pub const fn settings(&self) -> &StoreSettings {
        &self.settings
    }

    #[must_use]
    pub fn default_store(&self) -> &str {
        &self.settings.default_store
    }

    pub fn set_default_store(&mut self, name: impl Into<String>) -> &mut Self {
        self.settings.default_store = name.into();
        self
    }

    /// Registers a custom driver.
    pub fn extend<F>(&mut self, driver: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn(&DriverContext<'_>) -> Result<AnyStore, StoreError> + Send + Sync + 'static,
    {
        self.registry.extend(driver, factory);
        self
    }

    /// Registers a cache store that store settings can refer to by name.
    pub fn register_cache(&mut self, name: impl Into<String>, cache: Arc<dyn CacheStore>) -> &mut Self {
        self.caches.insert(name.into(), cache);
        self
    }

    /// Registers a package directory of flat `{locale}.json` files.
    ///
    /// Package files are loaded underneath every store.
    pub fn add_json_path(&mut self, path: impl Into<PathBuf>) -> &mut Self {
        self.json_paths.push(path.into());
        self
    }

    /// Registers the package directory backing `namespace` (`*` for the
    /// default namespace). A later registration replaces the earlier one.
    pub fn add_namespace_path(&mut self, namespace: impl Into<String>, path: impl Into<PathBuf>) -> &mut Self {
        self.namespaces.insert(namespace.into(), path.into());
        self
    }

    /// 登録済みの名前空間とそのパス
    #[must_use]
    pub const fn namespaces(&self) -> &IndexMap<String, PathBuf> {
        &self.namespaces
    }

    /// Adds (or replaces) a store under `name`.
    pub fn add_store(&self, name: impl Into<String>, store: AnyStore) {
        self.stores.lock().insert(name.into(), store);
    }

    /// Drops a resolved store; it is rebuilt from the settings on next use.
    pub fn forget_store(&self, name: &str) {
        self.stores.lock().shift_remove(name);
    }

    pub fn forget_stores(&self) {
        self.stores.lock().clear();
    }

    /// The store named `name`, or the default store.
    ///
    /// # Errors
    /// - `name` is neither added nor configured
    /// - The store's driver is unsupported or misconfigured
    pub fn store(&self, name: Option<&str>) -> Result<AnyStore, StoreError> {
        let name = name.unwrap_or(&self.settings.default_store);

        if let Some(store) = self.stores.lock().get(name) {
            return Ok(store.clone());
        }

        let config = self
            .settings
            .stores
            .get(name)
            .ok_or_else(|| ConfigError::UnknownStore(name.to_string()))?;
        let store = self.resolve(name, config)?;

        // 並行に解決された場合は先に登録された方を使う
        Ok(self.stores.lock().entry(name.to_string()).or_insert(store).clone())
    }

    /// Every store: configured ones in configuration order, then added ones.
    ///
    /// # Errors
    /// - Any configured store fails to resolve
    pub fn stores(&self) -> Result<Vec<(String, AnyStore)>, StoreError> {
        let mut stores = Vec::new();
        for name in self.settings.stores.keys() {
            stores.push((name.clone(), self.store(Some(name))?));
        }

        let resolved = self.stores.lock();
        for (name, store) in resolved.iter() {
            if !self.settings.stores.contains_key(name) {
                stores.push((name.clone(), store.clone()));
            }
        }
        Ok(stores)
    }

    /// Loads merged translations from every store of the matching shape.
    ///
    /// The `*` group in the default namespace reads package JSON files, then
    /// flat stores; anything else reads the namespace's package directory,
    /// then structured stores. Later sources win.
    ///
    /// # Errors
    /// - A store fails to resolve or read
    pub fn load(&self, locale: &str, group: &str, namespace: Option<&str>) -> Result<Translations, StoreError> {
        let namespace = namespace.unwrap_or(WILDCARD);

        let mut loaded;
        if group == WILDCARD && namespace == WILDCARD {
            loaded = self.load_package_json(locale);
            for (_, store) in self.stores()? {
                if let AnyStore::Flat(store) = store {
                    loaded = dot::overlay(loaded, store.get_all(Some(locale), &Fallback::Disabled)?);
                }
            }
        } else {
            loaded = self.load_package_group(locale, group, namespace);
            for (_, store) in self.stores()? {
                if let AnyStore::Structured(store) = store {
                    let translations =
                        store.get_all(group, Some(namespace), Some(locale), &Fallback::Disabled)?;
                    loaded = dot::overlay(loaded, translations);
                }
            }
        }

        tracing::debug!(locale, group, namespace, keys = loaded.len(), "Loaded translations");
        Ok(loaded)
    }

    /// `{path}/{locale}.json` of every registered JSON path, in order.
    fn load_package_json(&self, locale: &str) -> Translations {
        let mut loaded = Translations::new();
        for path in &self.json_paths {
            let file = path.join(format!("{locale}.json"));
            if let Some(document) = read_package_file(&file) {
                loaded = dot::overlay(loaded, dot::literal(&document));
            }
        }
        loaded
    }

    /// `{path}/{locale}/{group}.json` of the namespace's package directory.
    fn load_package_group(&self, locale: &str, group: &str, namespace: &str) -> Translations {
        self.namespaces
            .get(namespace)
            .map(|path| path.join(locale).join(format!("{group}.json")))
            .and_then(|file| read_package_file(&file))
            .map(|document| dot::flatten(&document))
            .unwrap_or_default()
    }

    /// 設定からストアを構築する
    fn resolve(&self, name: &str, config: &StoreConfig) -> Result<AnyStore, StoreError> {
        let context = DriverContext {
            name,
            config,
            locales: LocaleContext::new(&self.settings.locale, &self.settings.fallback_locale),
            cache: self.cache_for(name, config)?,
        };
        self.registry.create(&context)
    }

    /// ストアに適用するキャッシュ設定を解決する
    ///
    /// Stores inheriting the global settings get `{prefix}.{store}` so they do
    /// not share keys; a per-store override uses its prefix as is.
    fn cache_for(&self, name: &str, config: &StoreConfig) -> Result<TranslationCache, ConfigError> {
        let settings = self.settings.cache_for(config);
        if !settings.enabled {
            return Ok(TranslationCache::disabled());
        }

        let store = self
            .caches
            .get(&settings.store)
            .ok_or_else(|| ConfigError::UnknownCache(settings.store.clone()))?;
        let prefix = match config.cache {
            Some(_) => settings.prefix.clone(),
            None => format!("{}.{name}", settings.prefix),
        };
        Ok(TranslationCache::new(Arc::clone(store), prefix, settings.lifetime()))
    }
}

/// Decodes a package translation file. Missing or broken files are skipped.
fn read_package_file(file: &Path) -> Option<serde_json::Value> {
    let bytes = fs::read(file)?;
    match JsonCodec.decode(&bytes) {
        Ok(document) => Some(document),
        Err(err) => {
            tracing::warn!(path = %file.display(), %err, "Failed to decode package translations");
            None
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use std::fs;

    use googletest::prelude::*;
    use rstest::{
        fixture,
        rstest,
    };
    use serde_json::json;
    use tempfile::TempDir;

    use super::*;
    use crate::config::{
        CacheSettings,
        IN_MEMORY_DATABASE,
        JSON_DRIVER,
        SQLITE_DRIVER,
        STRUCTURED_JSON_DRIVER,
    };

    struct Fixture {
        temp_dir: TempDir,
        manager: TranslationManager,
    }

    #[fixture]
    fn workspace() -> Fixture {
        let temp_dir = TempDir::new().unwrap();
        let lang = temp_dir.path().join("lang");
        fs::create_dir_all(lang.join("en")).unwrap();
        fs::write(lang.join("en.json"), r#"{"Hello": "Hello"}"#).unwrap();
        fs::write(lang.join("en/messages.json"), r#"{"a": "files", "b": "files"}"#).unwrap();

        let mut settings = StoreSettings::default();
        settings.stores.insert(
            "files".to_string(),
            StoreConfig::new(STRUCTURED_JSON_DRIVER).with_paths([lang]),
        );
        settings
            .stores
            .insert("db".to_string(), StoreConfig::new(SQLITE_DRIVER).with_database(IN_MEMORY_DATABASE));
        settings.resolve_paths(temp_dir.path());

        Fixture { temp_dir, manager: TranslationManager::new(settings) }
    }

    #[rstest]
    fn store_is_resolved_once(workspace: Fixture) {
        let first = workspace.manager.store(Some("db")).unwrap();
        let second = workspace.manager.store(Some("db")).unwrap();

        let (AnyStore::Structured(first), AnyStore::Structured(second)) = (first, second) else {
            panic!("sqlite store must be structured");
        };
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[rstest]
    fn default_store_and_unknown_store(workspace: Fixture) {
        assert!(workspace.manager.store(None).unwrap().as_flat().is_some());
        assert_that!(
            workspace.manager.store(Some("nope")),
            err(displays_as(contains_substring("'nope' is not defined")))
        );
    }

    #[rstest]
    fn load_merges_structured_stores_in_order(workspace: Fixture) {
        let db = workspace.manager.store(Some("db")).unwrap();
        db.as_structured()
            .unwrap()
            .update(&json!({"b": "db"}), "messages", Some("*"), Some("en"))
            .unwrap();

        let loaded = workspace.manager.load("en", "messages", None).unwrap();

        assert_that!(loaded.get("a"), some(eq("files")));
        assert_that!(loaded.get("b"), some(eq("db")));
    }

    #[rstest]
    fn load_flat_for_wildcard_group(workspace: Fixture) {
        let loaded = workspace.manager.load("en", "*", Some("*")).unwrap();

        assert_that!(loaded.get("Hello"), some(eq("Hello")));
        assert_that!(loaded, len(eq(1)));
    }

    #[rstest]
    fn package_json_is_loaded_underneath_flat_stores(mut workspace: Fixture) {
        let package = workspace.temp_dir.path().join("package-lang");
        fs::create_dir_all(&package).unwrap();
        fs::write(package.join("en.json"), r#"{"Hello": "Package hello", "Only.": "Package"}"#).unwrap();
        workspace.manager.add_json_path(&package);

        let loaded = workspace.manager.load("en", "*", None).unwrap();

        assert_that!(loaded.get("Hello"), some(eq("Hello")));
        assert_that!(loaded.get("Only."), some(eq("Package")));
        assert_that!(workspace.manager.load("fr", "*", None).unwrap(), is_empty());
    }

    #[rstest]
    fn namespace_path_is_loaded_underneath_structured_stores(mut workspace: Fixture) {
        let package = workspace.temp_dir.path().join("package-lang");
        fs::create_dir_all(package.join("en")).unwrap();
        fs::write(package.join("en/messages.json"), r#"{"a": "package", "c": {"d": "nested"}}"#).unwrap();
        workspace.manager.add_namespace_path("pkg", &package);
        workspace
            .manager
            .store(Some("db"))
            .unwrap()
            .as_structured()
            .unwrap()
            .update(&json!({"a": "db"}), "messages", Some("pkg"), Some("en"))
            .unwrap();

        let loaded = workspace.manager.load("en", "messages", Some("pkg")).unwrap();

        assert_that!(loaded.get("a"), some(eq("db")));
        assert_that!(loaded.get("c.d"), some(eq("nested")));
        assert_that!(workspace.manager.namespaces().get("pkg"), some(eq(&package)));
        assert_that!(workspace.manager.load("en", "auth", Some("pkg")).unwrap(), is_empty());
    }

    #[rstest]
    fn forget_store_rebuilds(workspace: Fixture) {
        let flat = workspace.manager.store(Some(JSON_DRIVER)).unwrap();
        workspace.manager.forget_store(JSON_DRIVER);
        let rebuilt = workspace.manager.store(Some(JSON_DRIVER)).unwrap();

        assert!(!Arc::ptr_eq(flat.as_flat().unwrap(), rebuilt.as_flat().unwrap()));
    }

    #[rstest]
    fn added_store_is_loaded_last(workspace: Fixture) {
        let extra = workspace.manager.store(Some("db")).unwrap();
        workspace.manager.forget_stores();
        workspace.manager.add_store("extra", extra);

        let names: Vec<String> =
            workspace.manager.stores().unwrap().into_iter().map(|(name, _)| name).collect();

        assert_that!(names, elements_are![eq("json"), eq("files"), eq("db"), eq("extra")]);
    }

    #[rstest]
    fn unknown_cache_store_is_an_error() {
        let settings = StoreSettings {
            cache: CacheSettings { enabled: true, store: "redis".to_string(), ..CacheSettings::default() },
            ..StoreSettings::default()
        };
        let manager = TranslationManager::new(settings);

        assert_that!(manager.store(None), err(displays_as(contains_substring("'redis'"))));
    }

    #[rstest]
    fn inherited_cache_is_scoped_per_store() {
        let temp_dir = TempDir::new().unwrap();
        let memory = Arc::new(MemoryCache::new());
        let mut settings = StoreSettings {
            cache: CacheSettings { enabled: true, store: "shared".to_string(), ..CacheSettings::default() },
            ..StoreSettings::default()
        };
        settings.stores.insert(
            "files".to_string(),
            StoreConfig::new(STRUCTURED_JSON_DRIVER).with_paths([temp_dir.path().to_path_buf()]),
        );
        settings
            .stores
            .insert("db".to_string(), StoreConfig::new(SQLITE_DRIVER).with_database(IN_MEMORY_DATABASE));
        let mut manager = TranslationManager::new(settings);
        manager.register_cache("shared", memory.clone());

        for (name, value) in [("files", "from files"), ("db", "from db")] {
            let store = manager.store(Some(name)).unwrap();
            store
                .as_structured()
                .unwrap()
                .update(&json!({ "a": value }), "messages", Some("*"), Some("en"))
                .unwrap();
        }
        let loaded = manager.load("en", "messages", None).unwrap();

        assert_that!(loaded.get("a"), some(eq("from db")));
        assert!(memory.contains("translations.files.*.en.messages"));
        assert!(memory.contains("translations.db.*.en.messages"));
    }

    #[rstest]
    fn custom_driver_via_manager() {
        let mut settings = StoreSettings::default();
        settings.stores.insert("custom".to_string(), StoreConfig::new("in-memory-sqlite"));
        let mut manager = TranslationManager::new(settings);
        manager.extend("in-memory-sqlite", |context: &DriverContext<'_>| {
            let config = StoreConfig::new(SQLITE_DRIVER).with_database(IN_MEMORY_DATABASE);
            DriverRegistry::new().create(&DriverContext {
                name: context.name,
                config: &config,
                locales: context.locales.clone(),
                cache: context.cache.clone(),
            })
        });

        manager.set_default_store("custom");

        assert!(manager.store(None).unwrap().as_structured().is_some());
    }
}
