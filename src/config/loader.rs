//! 設定ファイルの読み込み関数

use std::path::Path;

use super::{
    ConfigError,
    StoreSettings,
};

/// Configuration file name looked up at the workspace root.
pub const CONFIG_FILE_NAME: &str = ".i18n-store.json";

/// ワークスペースから設定を読み込む
///
/// `.i18n-store.json` を探し、相対パスはワークスペースルート基準に解決する
///
/// # Returns
/// - `Ok(Some(settings))`: 設定ファイルが見つかり、読み込みに成功
/// - `Ok(None)`: 設定ファイルが見つからない
///
/// # Errors
/// - ファイル読み込みエラー
/// - JSON パースエラー
pub(super) fn load_from_workspace(
    workspace_root: &Path,
) -> Result<Option<StoreSettings>, ConfigError> {
    let config_path = workspace_root.join(CONFIG_FILE_NAME);

    if !config_path.exists() {
        tracing::debug!("Configuration file not found: {:?}", config_path);
        return Ok(None);
    }

    let mut settings = load_from_file(&config_path)?;
    settings.resolve_paths(workspace_root);

    Ok(Some(settings))
}

/// 任意のパスから設定を読み込む（パス解決は行わない）
///
/// # Errors
/// - ファイル読み込みエラー
/// - JSON パースエラー
pub(super) fn load_from_file(config_path: &Path) -> Result<StoreSettings, ConfigError> {
    tracing::debug!("Loading configuration from: {:?}", config_path);

    let content = std::fs::read_to_string(config_path)?;
    Ok(serde_json::from_str(&content)?)
}
