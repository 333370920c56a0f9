//! 設定管理を行うモジュール

use std::path::{
    Path,
    PathBuf,
};

use super::{
    ConfigError,
    StoreSettings,
    loader,
};

/// 設定管理を行う
#[derive(Default, Debug, Clone)]
pub struct ConfigManager {
    /// 現在の設定
    current_settings: StoreSettings,

    /// ワークスペースのルートパス
    workspace_root: Option<PathBuf>,
}

impl ConfigManager {
    /// 新しい設定マネージャーを作成
    #[must_use]
    pub fn new() -> Self {
        Self { current_settings: StoreSettings::default(), workspace_root: None }
    }

    /// ワークスペースの設定を読み込む
    ///
    /// 設定ファイルがない場合はデフォルト値（ルート基準の `lang`）を使う
    ///
    /// # Errors
    /// - ファイル読み込みエラー
    /// - JSON パースエラー
    /// - バリデーションエラー
    pub fn load_settings(&mut self, workspace_root: Option<PathBuf>) -> Result<(), ConfigError> {
        tracing::debug!("Loading settings for workspace: {:?}", workspace_root);

        let settings = match &workspace_root {
            Some(root) => loader::load_from_workspace(root)?.unwrap_or_else(|| {
                let mut defaults = StoreSettings::default();
                defaults.resolve_paths(root);
                defaults
            }),
            None => StoreSettings::default(),
        };

        settings.validate().map_err(ConfigError::ValidationErrors)?;

        self.current_settings = settings;
        self.workspace_root = workspace_root;
        tracing::debug!("Settings loaded successfully: {:?}", self.current_settings);

        Ok(())
    }

    /// 指定されたファイルから設定を読み込む
    ///
    /// # Errors
    /// - ファイル読み込みエラー
    /// - JSON パースエラー
    /// - バリデーションエラー
    pub fn load_file(&mut self, config_path: &Path) -> Result<(), ConfigError> {
        let mut settings = loader::load_from_file(config_path)?;
        if let Some(root) = config_path.parent() {
            settings.resolve_paths(root);
        }
        self.update_settings(settings)?;
        self.workspace_root = config_path.parent().map(Path::to_path_buf);
        Ok(())
    }

    /// 設定を差し替える
    ///
    /// # Errors
    /// - バリデーションエラー
    pub fn update_settings(&mut self, new_settings: StoreSettings) -> Result<(), ConfigError> {
        new_settings.validate().map_err(ConfigError::ValidationErrors)?;

        self.current_settings = new_settings;
        tracing::debug!("Settings updated successfully");

        Ok(())
    }

    /// 現在の設定を取得
    #[must_use]
    pub const fn get_settings(&self) -> &StoreSettings {
        &self.current_settings
    }

    /// 設定を取り出す
    #[must_use]
    pub fn into_settings(self) -> StoreSettings {
        self.current_settings
    }

    /// ワークスペースルートを取得
    #[must_use]
    pub const fn workspace_root(&self) -> Option<&PathBuf> {
        self.workspace_root.as_ref()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use std::fs;

    use googletest::prelude::*;
    use rstest::rstest;
    use tempfile::TempDir;

    use super::*;
    use crate::config::CONFIG_FILE_NAME;

    /// new: デフォルト値で作成される
    #[rstest]
    fn test_new_creates_default_settings() {
        let manager = ConfigManager::new();

        assert_that!(manager.get_settings().default_store, eq("json"));
        assert_that!(manager.workspace_root(), none());
    }

    /// load_settings: 設定ファイルがない場合はルート基準のデフォルト値
    #[rstest]
    fn test_load_settings_without_config_file() {
        let temp_dir = TempDir::new().unwrap();

        let mut manager = ConfigManager::new();
        manager.load_settings(Some(temp_dir.path().to_path_buf())).unwrap();

        assert_that!(
            manager.get_settings().stores["json"].paths,
            elements_are![eq(&temp_dir.path().join("lang"))]
        );
    }

    /// load_settings: 設定ファイルがある場合
    #[rstest]
    fn test_load_settings_with_config_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_content = r#"{
            "defaultStore": "db",
            "stores": { "db": { "driver": "sqlite", "database": "i18n.db" } }
        }"#;
        fs::write(temp_dir.path().join(CONFIG_FILE_NAME), config_content).unwrap();

        let mut manager = ConfigManager::new();
        manager.load_settings(Some(temp_dir.path().to_path_buf())).unwrap();

        assert_that!(
            manager.get_settings().stores["db"].database,
            some(eq(&temp_dir.path().join("i18n.db")))
        );
        assert_that!(manager.workspace_root(), some(anything()));
    }

    /// load_settings: バリデーションエラーは設定を変更しない
    #[rstest]
    fn test_load_settings_invalid_keeps_previous() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join(CONFIG_FILE_NAME), r#"{"defaultStore": "missing"}"#)
            .unwrap();

        let mut manager = ConfigManager::new();
        let result = manager.load_settings(Some(temp_dir.path().to_path_buf()));

        assert_that!(result, err(displays_as(contains_substring("defaultStore"))));
        assert_that!(manager.get_settings().default_store, eq("json"));
    }

    /// load_file: 設定ファイルのディレクトリを基準にする
    #[rstest]
    fn test_load_file_resolves_against_parent() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("i18n.json");
        fs::write(&path, r#"{"locale": "ar"}"#).unwrap();

        let mut manager = ConfigManager::new();
        manager.load_file(&path).unwrap();

        assert_that!(manager.get_settings().locale, eq("ar"));
        assert_that!(
            manager.into_settings().stores["json"].paths,
            elements_are![eq(&temp_dir.path().join("lang"))]
        );
    }

    /// update_settings: 無効な設定でエラー
    #[rstest]
    fn test_update_settings_invalid() {
        let mut manager = ConfigManager::new();
        let new_settings = StoreSettings { locale: String::new(), ..StoreSettings::default() };

        assert_that!(manager.update_settings(new_settings), err(anything()));
    }
}
