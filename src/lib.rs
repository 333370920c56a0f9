//! i18n-store
//!
//! 翻訳エントリを JSON ファイル・ディレクトリ構造の JSON ファイル・SQLite に保存し、
//! namespace / group / locale のパターンで読み書きするライブラリ

pub mod address;
pub mod backend;
pub mod cache;
pub mod codec;
pub mod config;
pub mod dot;
pub mod error;
pub mod manager;
pub mod path;
pub mod pattern;
pub mod store;
pub mod structure;

#[cfg(test)]
mod test_utils;

pub use error::StoreError;
pub use manager::{
    AnyStore,
    TranslationManager,
};
pub use store::{
    Fallback,
    FlatStore,
    Store,
    StructuredStore,
};
