//! Store settings: types, validation and the workspace file loader.
/// Config file loader
mod loader;
/// Configuration manager
mod manager;
/// Configuration types and settings
mod types;

pub use loader::CONFIG_FILE_NAME;
pub use manager::ConfigManager;
pub use types::{
    CacheSettings,
    ConfigError,
    IN_MEMORY_DATABASE,
    JSON_DRIVER,
    SQLITE_DRIVER,
    STRUCTURED_JSON_DRIVER,
    StoreConfig,
    StoreSettings,
    ValidationError,
};
