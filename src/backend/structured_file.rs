//! Directory-structured file backend (`{base}/[vendor/{ns}/]{locale}/{group}.{ext}`).

use std::path::PathBuf;

use super::fs::{
    self,
    FileEntry,
};
use super::{
    DocumentBackend,
    Entry,
};
use crate::address::{
    Address,
    Scope,
};
use crate::codec::{
    Codec,
    FormatOptions,
};
use crate::dot::{
    self,
    Translations,
};
use crate::error::StoreError;
use crate::path;
use crate::pattern::{
    Pattern,
    name_matcher,
};

/// Structured translation files under one or more base directories.
///
/// Reads consider every base directory; new files are created under the
/// first one, with the codec's first extension.
#[derive(Debug, Clone)]
pub struct StructuredFileBackend<C> {
    /// Base directories; the first one receives new documents
    paths: Vec<PathBuf>,
    codec: C,
    options: FormatOptions,
}

impl<C: Codec> StructuredFileBackend<C> {
    #[must_use]
    pub const fn new(paths: Vec<PathBuf>, codec: C, options: FormatOptions) -> Self {
        Self { paths, codec, options }
    }

    /// 新規ファイルを作成するディレクトリ
    fn primary_base(&self) -> Option<&PathBuf> {
        self.paths.first()
    }

    /// 新規ファイルの拡張子
    fn primary_extension(&self) -> &str {
        self.codec.extensions().first().copied().unwrap_or("json")
    }
}

impl<C: Codec> DocumentBackend for StructuredFileBackend<C> {
    type Location = FileEntry;

    fn list(&self, scope: &Scope) -> Result<Vec<Entry<FileEntry>>, StoreError> {
        // ファイル名だけで先に絞り込み、残りはパスをデコードして判定する
        let stem_glob = match &scope.group {
            Pattern::Exact(group) => Pattern::Exact(path::split_group(group).0.to_string()).glob(),
            other => other.glob(),
        };
        let matcher = name_matcher(&stem_glob, self.codec.extensions())?;

        let entries = fs::list_files(&self.paths, &matcher, None)
            .into_iter()
            .filter_map(|file| {
                let address = path::path_to_address(file.relative())?;
                scope.matches(&address).then_some(Entry { address, location: file })
            })
            .collect();

        Ok(entries)
    }

    fn locate(&self, address: &Address) -> Result<FileEntry, StoreError> {
        let base = self.primary_base().ok_or_else(|| StoreError::NoBaseDirectory(address.to_string()))?;
        let file = path::address_to_path(base, address, self.primary_extension());
        Ok(FileEntry::new(base.clone(), file))
    }

    fn read(&self, entry: &Entry<FileEntry>) -> Result<Translations, StoreError> {
        let Some(bytes) = fs::read(&entry.location.path) else {
            return Ok(Translations::new());
        };

        match self.codec.decode(&bytes) {
            Ok(document) => Ok(dot::flatten(&document)),
            Err(err) => {
                tracing::warn!(
                    path = %entry.location.path.display(),
                    %err,
                    "Failed to decode translation file, treating it as empty"
                );
                Ok(Translations::new())
            }
        }
    }

    fn write(&self, batch: &[(Entry<FileEntry>, Translations)]) -> Result<(), StoreError> {
        for (entry, translations) in batch {
            let bytes = self.codec.encode(&dot::unflatten(translations), self.options)?;
            fs::write(&entry.location.path, &bytes)?;
            tracing::debug!(path = %entry.location.path.display(), "Wrote translation file");
        }
        Ok(())
    }

    fn delete(&self, entry: &Entry<FileEntry>) -> Result<(), StoreError> {
        fs::delete(&entry.location.path, &entry.location.base);
        tracing::debug!(path = %entry.location.path.display(), "Deleted translation file");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use std::fs as std_fs;
    use std::path::Path;

    use googletest::prelude::*;
    use rstest::{
        fixture,
        rstest,
    };
    use tempfile::TempDir;

    use super::*;
    use crate::codec::JsonCodec;
    use crate::pattern::Namespace;

    struct Fixture {
        _temp_dir: TempDir,
        base: PathBuf,
        backend: StructuredFileBackend<JsonCodec>,
    }

    fn put(base: &Path, relative: &str, content: &str) {
        let path = base.join(relative);
        std_fs::create_dir_all(path.parent().unwrap()).unwrap();
        std_fs::write(path, content).unwrap();
    }

    #[fixture]
    fn lang() -> Fixture {
        let temp_dir = TempDir::new().unwrap();
        let base = temp_dir.path().to_path_buf();
        put(&base, "en.json", r#"{"Flat": "ignored"}"#);
        put(&base, "en/messages.json", r#"{"welcome": "Welcome"}"#);
        put(&base, "en/admin/users.json", r#"{"title": "Users"}"#);
        put(&base, "fr/messages.json", r#"{"welcome": "Bienvenue"}"#);
        put(&base, "vendor/pkg/en/messages.json", r#"{"welcome": "Pkg"}"#);
        put(&base, "en/broken.json", "{ nope");

        let backend =
            StructuredFileBackend::new(vec![base.clone()], JsonCodec, FormatOptions::default());
        Fixture { _temp_dir: temp_dir, base, backend }
    }

    fn addresses(entries: &[Entry<FileEntry>]) -> Vec<Address> {
        entries.iter().map(|entry| entry.address.clone()).collect()
    }

    #[rstest]
    fn list_everything_skips_flat_files(lang: Fixture) {
        let entries = lang.backend.list(&Scope::everything()).unwrap();

        assert_that!(entries, len(eq(5)));
        assert!(entries.iter().all(|entry| entry.address.group != "en"));
    }

    #[rstest]
    fn list_default_namespace_only(lang: Fixture) {
        let scope = Scope::parse("messages", Some("*"), "*").unwrap();

        assert_that!(
            addresses(&lang.backend.list(&scope).unwrap()),
            elements_are![
                eq(&Address::new(Namespace::Default, "en", "messages")),
                eq(&Address::new(Namespace::Default, "fr", "messages"))
            ]
        );
    }

    #[rstest]
    fn list_sub_group(lang: Fixture) {
        let scope = Scope::parse("admin/users", Some("*"), "en").unwrap();

        assert_that!(
            addresses(&lang.backend.list(&scope).unwrap()),
            elements_are![eq(&Address::new(Namespace::Default, "en", "admin/users"))]
        );
    }

    #[rstest]
    fn read_broken_file_as_empty(lang: Fixture) {
        let scope = Scope::parse("broken", Some("*"), "en").unwrap();
        let entries = lang.backend.list(&scope).unwrap();

        assert_that!(entries, len(eq(1)));
        assert_that!(lang.backend.read(&entries[0]).unwrap(), is_empty());
    }

    #[rstest]
    fn write_then_read_new_document(lang: Fixture) {
        let address = Address::new(Namespace::Named("pkg".to_string()), "de", "auth/errors");
        let entry = Entry { location: lang.backend.locate(&address).unwrap(), address };
        let translations: Translations =
            [("failed.login".to_string(), "Fehler".to_string())].into_iter().collect();

        lang.backend.write(&[(entry.clone(), translations.clone())]).unwrap();

        assert_that!(
            entry.location.path,
            eq(&lang.base.join("vendor/pkg/de/auth/errors.json"))
        );
        assert_that!(lang.backend.read(&entry).unwrap(), eq(&translations));
    }

    #[rstest]
    fn locate_without_base_directory() {
        let backend = StructuredFileBackend::new(Vec::new(), JsonCodec, FormatOptions::default());

        let result = backend.locate(&Address::new(Namespace::Default, "en", "messages"));

        assert_that!(result, err(displays_as(contains_substring("No translation directory"))));
    }

    #[rstest]
    fn delete_prunes_vendor_directories(lang: Fixture) {
        let scope = Scope::parse("messages", Some("pkg"), "en").unwrap();
        let entries = lang.backend.list(&scope).unwrap();

        lang.backend.delete(&entries[0]).unwrap();

        assert!(!lang.base.join("vendor").exists());
        assert!(lang.base.join("en/messages.json").exists());
    }
}
