//! Driver tag -> store factory.

use std::collections::HashMap;
use std::fmt;
use std::path::{
    Path,
    PathBuf,
};
use std::sync::Arc;

use super::AnyStore;
use crate::backend::{
    SqliteBackend,
    StructuredFileBackend,
};
use crate::cache::TranslationCache;
use crate::codec::{
    FormatOptions,
    JsonCodec,
};
use crate::config::{
    ConfigError,
    IN_MEMORY_DATABASE,
    JSON_DRIVER,
    SQLITE_DRIVER,
    STRUCTURED_JSON_DRIVER,
    StoreConfig,
};
use crate::error::StoreError;
use crate::store::{
    FlatFileStore,
    LocaleContext,
    StructuredEngine,
};

/// Everything a driver factory gets to build one named store.
#[derive(Debug)]
pub struct DriverContext<'a> {
    pub name: &'a str,
    pub config: &'a StoreConfig,
    pub locales: LocaleContext,
    /// Cache view configured for this store (possibly disabled).
    pub cache: TranslationCache,
}

/// Builds a store from its configuration.
pub type DriverFactory =
    Arc<dyn Fn(&DriverContext<'_>) -> Result<AnyStore, StoreError> + Send + Sync>;

/// Built-in drivers plus custom ones registered with [`DriverRegistry::extend`].
///
/// Custom drivers shadow built-ins of the same name.
#[derive(Clone, Default)]
pub struct DriverRegistry {
    custom: HashMap<String, DriverFactory>,
}

impl fmt::Debug for DriverRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut drivers: Vec<&String> = self.custom.keys().collect();
        drivers.sort();
        f.debug_struct("DriverRegistry").field("custom", &drivers).finish()
    }
}

impl DriverRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a factory for `driver`.
    pub fn extend<F>(&mut self, driver: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn(&DriverContext<'_>) -> Result<AnyStore, StoreError> + Send + Sync + 'static,
    {
        self.custom.insert(driver.into(), Arc::new(factory));
        self
    }

    #[must_use]
    pub fn supports(&self, driver: &str) -> bool {
        self.custom.contains_key(driver)
            || [JSON_DRIVER, STRUCTURED_JSON_DRIVER, SQLITE_DRIVER].contains(&driver)
    }

    /// Builds the store described by `context`.
    ///
    /// # Errors
    /// - Unsupported driver
    /// - Missing driver option
    /// - Store construction failure
    pub fn create(&self, context: &DriverContext<'_>) -> Result<AnyStore, StoreError> {
        let driver = context.config.driver.as_str();
        tracing::debug!(store = context.name, driver, "Resolving translation store");

        if let Some(factory) = self.custom.get(driver) {
            return factory(context);
        }

        match driver {
            JSON_DRIVER => create_json_store(context),
            STRUCTURED_JSON_DRIVER => create_structured_json_store(context),
            SQLITE_DRIVER => create_sqlite_store(context),
            _ => Err(ConfigError::UnsupportedDriver {
                store: context.name.to_string(),
                driver: driver.to_string(),
            }
            .into()),
        }
    }
}

fn format_options(config: &StoreConfig) -> FormatOptions {
    FormatOptions { pretty: config.pretty }
}

/// File drivers need at least one base directory.
fn require_paths(context: &DriverContext<'_>) -> Result<Vec<PathBuf>, ConfigError> {
    if context.config.paths.is_empty() {
        return Err(ConfigError::MissingOption { store: context.name.to_string(), option: "paths" });
    }
    Ok(context.config.paths.clone())
}

/// `json` driver: one flat file per locale.
fn create_json_store(context: &DriverContext<'_>) -> Result<AnyStore, StoreError> {
    let store = FlatFileStore::new(
        require_paths(context)?,
        JsonCodec,
        format_options(context.config),
        context.locales.clone(),
    )
    .with_cache(context.cache.clone());
    Ok(AnyStore::Flat(Arc::new(store)))
}

fn create_structured_json_store(context: &DriverContext<'_>) -> Result<AnyStore, StoreError> {
    let backend =
        StructuredFileBackend::new(require_paths(context)?, JsonCodec, format_options(context.config));
    let store = StructuredEngine::new(backend, context.locales.clone()).with_cache(context.cache.clone());
    Ok(AnyStore::Structured(Arc::new(store)))
}

/// `sqlite` driver. `:memory:` opens a private in-memory database.
fn create_sqlite_store(context: &DriverContext<'_>) -> Result<AnyStore, StoreError> {
    let config = context.config;
    let database = config.database.as_deref().ok_or_else(|| ConfigError::MissingOption {
        store: context.name.to_string(),
        option: "database",
    })?;

    let backend = if database == Path::new(IN_MEMORY_DATABASE) {
        SqliteBackend::open_in_memory(&config.table, config.columns.clone())?
    } else {
        SqliteBackend::open(database, &config.table, config.columns.clone())?
    };

    let store = StructuredEngine::new(backend, context.locales.clone()).with_cache(context.cache.clone());
    Ok(AnyStore::Structured(Arc::new(store)))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use googletest::prelude::*;
    use rstest::rstest;

    use super::*;

    fn context(config: &StoreConfig) -> DriverContext<'_> {
        DriverContext {
            name: "test",
            config,
            locales: LocaleContext::default(),
            cache: TranslationCache::disabled(),
        }
    }

    #[rstest]
    #[case::json(StoreConfig::new(JSON_DRIVER).with_paths(["lang"]), true)]
    #[case::structured(StoreConfig::new(STRUCTURED_JSON_DRIVER).with_paths(["lang"]), false)]
    #[case::sqlite(StoreConfig::new(SQLITE_DRIVER).with_database(IN_MEMORY_DATABASE), false)]
    fn builtin_drivers(#[case] config: StoreConfig, #[case] flat: bool) {
        let store = DriverRegistry::new().create(&context(&config)).unwrap();

        assert_that!(store.as_flat().is_some(), eq(flat));
        assert_that!(store.as_structured().is_some(), eq(!flat));
    }

    #[rstest]
    fn unsupported_driver() {
        let config = StoreConfig::new("yaml");

        let result = DriverRegistry::new().create(&context(&config));

        assert_that!(result, err(displays_as(contains_substring("'yaml'"))));
    }

    #[rstest]
    fn sqlite_without_database() {
        let config = StoreConfig::new(SQLITE_DRIVER);

        let result = DriverRegistry::new().create(&context(&config));

        assert_that!(result, err(displays_as(contains_substring("'database'"))));
    }

    #[rstest]
    #[case::json(JSON_DRIVER)]
    #[case::structured(STRUCTURED_JSON_DRIVER)]
    fn file_driver_without_paths(#[case] driver: &str) {
        let config = StoreConfig::new(driver);

        let result = DriverRegistry::new().create(&context(&config));

        assert_that!(result, err(displays_as(contains_substring("'paths'"))));
    }

    #[rstest]
    fn custom_driver_shadows_builtin() {
        let mut registry = DriverRegistry::new();
        registry.extend(JSON_DRIVER, |context: &DriverContext<'_>| {
            create_sqlite_store(&DriverContext {
                name: context.name,
                config: &StoreConfig::new(SQLITE_DRIVER).with_database(IN_MEMORY_DATABASE),
                locales: context.locales.clone(),
                cache: context.cache.clone(),
            })
        });
        let config = StoreConfig::new(JSON_DRIVER).with_paths(["lang"]);

        let store = registry.create(&context(&config)).unwrap();

        assert!(store.as_structured().is_some());
        assert!(registry.supports("json") && !registry.supports("yaml"));
    }
}
