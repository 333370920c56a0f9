use std::path::{
    Path,
    PathBuf,
};
use std::time::Duration;

use indexmap::IndexMap;
use serde::{
    Deserialize,
    Serialize,
};
use thiserror::Error;

use crate::backend::ColumnNames;

/// Driver tag of the built-in flat JSON file store.
pub const JSON_DRIVER: &str = "json";
/// Driver tag of the built-in structured JSON file store.
pub const STRUCTURED_JSON_DRIVER: &str = "structured-json";
/// Driver tag of the built-in SQLite store.
pub const SQLITE_DRIVER: &str = "sqlite";

/// Database spelling for a private in-memory SQLite database.
pub const IN_MEMORY_DATABASE: &str = ":memory:";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Configuration error in '{field_path}': {message}")]
pub struct ValidationError {
    /// JSON path to the field (e.g., "stores.db.table")
    pub field_path: String,
    pub message: String,
}

impl ValidationError {
    #[must_use]
    pub fn new(field_path: impl Into<String>, message: impl Into<String>) -> Self {
        Self { field_path: field_path.into(), message: message.into() }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration validation failed:\n{}", format_validation_errors(.0))]
    ValidationErrors(Vec<ValidationError>),

    #[error("Failed to load configuration file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse configuration: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("Translation store '{0}' is not defined")]
    UnknownStore(String),

    #[error("Driver '{driver}' of store '{store}' is not supported")]
    UnsupportedDriver { store: String, driver: String },

    #[error("Store '{store}' requires the '{option}' option")]
    MissingOption { store: String, option: &'static str },

    #[error("Cache store '{0}' is not registered")]
    UnknownCache(String),
}

fn format_validation_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .enumerate()
        .map(|(i, err)| format!("  {}. {} - {}", i + 1, err.field_path, err.message))
        .collect::<Vec<_>>()
        .join("\n")
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StoreSettings {
    /// Store used when no name is given.
    pub default_store: String,

    pub locale: String,
    pub fallback_locale: String,

    pub cache: CacheSettings,

    /// Named stores, in the order multi-store loading merges them.
    pub stores: IndexMap<String, StoreConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CacheSettings {
    pub enabled: bool,
    /// Registered cache store name.
    pub store: String,
    pub prefix: String,
    /// Seconds; unset keeps entries until evicted.
    pub lifetime: Option<u64>,
}

impl CacheSettings {
    #[must_use]
    pub fn lifetime(&self) -> Option<Duration> {
        self.lifetime.map(Duration::from_secs)
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            store: "memory".to_string(),
            prefix: "translations".to_string(),
            lifetime: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StoreConfig {
    pub driver: String,

    /// Base directories of file stores.
    pub paths: Vec<PathBuf>,

    /// SQLite database file, or `:memory:`.
    pub database: Option<PathBuf>,
    pub table: String,
    pub columns: ColumnNames,

    /// Pretty-print written files.
    pub pretty: bool,

    /// Overrides the global cache settings for this store.
    pub cache: Option<CacheSettings>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            driver: String::new(),
            paths: Vec::new(),
            database: None,
            table: "translations".to_string(),
            columns: ColumnNames::default(),
            pretty: true,
            cache: None,
        }
    }
}

impl StoreConfig {
    #[must_use]
    pub fn new(driver: impl Into<String>) -> Self {
        Self { driver: driver.into(), ..Self::default() }
    }

    #[must_use]
    pub fn with_paths<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.paths = paths.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_database(mut self, database: impl Into<PathBuf>) -> Self {
        self.database = Some(database.into());
        self
    }

    fn is_file_driver(&self) -> bool {
        self.driver == JSON_DRIVER || self.driver == STRUCTURED_JSON_DRIVER
    }

    fn validate(&self, name: &str, errors: &mut Vec<ValidationError>) {
        let field = |path: &str| format!("stores.{name}.{path}");

        if self.driver.is_empty() {
            errors.push(ValidationError::new(
                field("driver"),
                "The driver cannot be empty. Example: \"json\", \"structured-json\" or \"sqlite\"",
            ));
        }

        if self.is_file_driver() && self.paths.is_empty() {
            errors.push(ValidationError::new(
                field("paths"),
                "At least one path is required. Example: [\"lang\"]",
            ));
        }

        if self.driver == SQLITE_DRIVER {
            if self.database.as_ref().is_none_or(|db| db.as_os_str().is_empty()) {
                errors.push(ValidationError::new(
                    field("database"),
                    "A database is required. Example: \"translations.db\" or \":memory:\"",
                ));
            }
            if self.table.is_empty() {
                errors.push(ValidationError::new(field("table"), "The table name cannot be empty"));
            }
            for (column, value) in self.columns.fields() {
                if value.is_empty() {
                    errors.push(ValidationError::new(
                        field(&format!("columns.{column}")),
                        "The column name cannot be empty",
                    ));
                }
            }
        }

        if let Some(cache) = &self.cache {
            validate_cache(cache, &field("cache"), errors);
        }
    }

    /// Joins relative paths onto `root`.
    fn resolve_paths(&mut self, root: &Path) {
        for path in &mut self.paths {
            if path.is_relative() {
                *path = root.join(&*path);
            }
        }
        if let Some(database) = &mut self.database
            && database.is_relative()
            && database.as_os_str() != IN_MEMORY_DATABASE
        {
            *database = root.join(&*database);
        }
    }
}

fn validate_cache(cache: &CacheSettings, field_path: &str, errors: &mut Vec<ValidationError>) {
    if !cache.enabled {
        return;
    }
    if cache.store.is_empty() {
        errors.push(ValidationError::new(
            format!("{field_path}.store"),
            "The cache store cannot be empty when caching is enabled. Example: \"memory\"",
        ));
    }
    if cache.prefix.is_empty() {
        errors.push(ValidationError::new(
            format!("{field_path}.prefix"),
            "The prefix cannot be empty when caching is enabled. Example: \"translations\"",
        ));
    }
}

impl StoreSettings {
    /// # Errors
    /// - Empty locale or fallback locale
    /// - Default store not defined
    /// - Incomplete store definition
    /// - Incomplete cache settings
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if self.locale.is_empty() {
            errors.push(ValidationError::new(
                "locale",
                "The locale cannot be empty. Example: \"en\"",
            ));
        }

        if self.fallback_locale.is_empty() {
            errors.push(ValidationError::new(
                "fallbackLocale",
                "The fallback locale cannot be empty. Example: \"en\"",
            ));
        }

        if !self.stores.contains_key(&self.default_store) {
            errors.push(ValidationError::new(
                "defaultStore",
                format!("Store '{}' is not defined in 'stores'", self.default_store),
            ));
        }

        validate_cache(&self.cache, "cache", &mut errors);

        for (name, store) in &self.stores {
            store.validate(name, &mut errors);
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }

    /// Effective cache settings of one store.
    #[must_use]
    pub fn cache_for(&self, store: &StoreConfig) -> CacheSettings {
        store.cache.clone().unwrap_or_else(|| self.cache.clone())
    }

    /// Joins every relative store path onto `root`.
    pub fn resolve_paths(&mut self, root: &Path) {
        for store in self.stores.values_mut() {
            store.resolve_paths(root);
        }
    }
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            default_store: JSON_DRIVER.to_string(),
            locale: "en".to_string(),
            fallback_locale: "en".to_string(),
            cache: CacheSettings::default(),
            stores: IndexMap::from([(
                JSON_DRIVER.to_string(),
                StoreConfig::new(JSON_DRIVER).with_paths(["lang"]),
            )]),
        }
    }
}
