//! File capability: listing, reading, writing and pruning translation files.

use std::io::ErrorKind;
use std::path::{
    Path,
    PathBuf,
};

use globset::GlobMatcher;
use ignore::WalkBuilder;

use crate::error::StoreError;

/// A translation file found under one of the base directories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// Base directory the file was found under
    pub base: PathBuf,
    /// Absolute (or base-joined) file path
    pub path: PathBuf,
}

impl FileEntry {
    #[must_use]
    pub fn new(base: PathBuf, path: PathBuf) -> Self {
        Self { base, path }
    }

    /// Path relative to the base directory.
    #[must_use]
    pub fn relative(&self) -> &Path {
        self.path.strip_prefix(&self.base).unwrap_or(&self.path)
    }
}

/// Lists files under `bases` whose file name matches `name`.
///
/// `max_depth` of `Some(1)` restricts the walk to the immediate children of
/// each base. Missing base directories are skipped. Results are ordered by
/// base, then by path.
#[must_use]
pub fn list_files(bases: &[PathBuf], name: &GlobMatcher, max_depth: Option<usize>) -> Vec<FileEntry> {
    let mut found = Vec::new();

    for base in bases {
        if !base.is_dir() {
            tracing::debug!(base = %base.display(), "Skipping missing translation directory");
            continue;
        }

        for result in WalkBuilder::new(base)
            .standard_filters(false)
            .follow_links(false)
            .max_depth(max_depth)
            .sort_by_file_path(|a, b| a.cmp(b))
            .build()
        {
            let entry = match result {
                Ok(entry) => entry,
                Err(err) => {
                    tracing::debug!(?err, "Failed to read directory entry");
                    continue;
                }
            };

            // ファイルのみを対象
            if !entry.file_type().is_some_and(|ft| ft.is_file()) {
                continue;
            }
            if !name.is_match(entry.file_name()) {
                continue;
            }

            found.push(FileEntry::new(base.clone(), entry.into_path()));
        }
    }

    found
}

/// Reads a file. Missing or unreadable files yield `None`.
#[must_use]
pub fn read(path: &Path) -> Option<Vec<u8>> {
    match std::fs::read(path) {
        Ok(bytes) => Some(bytes),
        Err(err) if err.kind() == ErrorKind::NotFound => None,
        Err(err) => {
            tracing::warn!(path = %path.display(), %err, "Failed to read translation file");
            None
        }
    }
}

/// Writes a file, creating parent directories as needed.
///
/// # Errors
/// - Directory creation or write failure
pub fn write(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    let to_error = |source| StoreError::Write { path: path.to_path_buf(), source };

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(to_error)?;
    }
    std::fs::write(path, bytes).map_err(to_error)
}

/// Deletes a file, then removes the directories it leaves empty, up to but
/// not including `base`. Failures are logged and ignored.
pub fn delete(path: &Path, base: &Path) {
    if let Err(err) = std::fs::remove_file(path) {
        tracing::debug!(path = %path.display(), %err, "Failed to delete translation file");
        return;
    }
    if let Some(parent) = path.parent() {
        prune_empty_dirs(parent, base);
    }
}

/// Removes `dir` and its ancestors while they are empty, stopping at `base`.
pub fn prune_empty_dirs(dir: &Path, base: &Path) {
    let mut current = Some(dir);
    while let Some(dir) = current {
        if dir == base || !dir.starts_with(base) {
            break;
        }
        // 空でなければ失敗するので、そこで止める
        if let Err(err) = std::fs::remove_dir(dir) {
            tracing::debug!(dir = %dir.display(), %err, "Stopped pruning directories");
            break;
        }
        current = dir.parent();
    }
}
