//! テスト用ユーティリティ関数
//!
//! 複数のテストモジュールで使用される共通のヘルパー関数を提供します。
#![cfg(test)]

use std::sync::Once;

use tracing_subscriber::EnvFilter;

use crate::dot::Translations;

/// `(key, value)` の組から Translations を作成する
pub(crate) fn translations(pairs: &[(&str, &str)]) -> Translations {
    pairs.iter().map(|(key, value)| ((*key).to_string(), (*value).to_string())).collect()
}

/// テスト出力に tracing のログを流す（`RUST_LOG` で制御）
pub(crate) fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}
