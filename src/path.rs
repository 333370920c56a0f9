//! Address <-> file path mapping for structured file stores.
//!
//! Layout:
//! - default namespace: `{base}/{locale}/{subpath}/{filename}.{ext}`
//! - named namespace:   `{base}/vendor/{namespace}/{locale}/{subpath}/{filename}.{ext}`

use std::path::{
    Component,
    Path,
    PathBuf,
};

use crate::address::Address;
use crate::pattern::Namespace;

/// Directory holding named namespaces.
pub const VENDOR_DIR: &str = "vendor";

/// Group separator; also the on-disk sub-directory separator.
pub const GROUP_SEPARATOR: char = '/';

/// Splits `admin/users` into (`users`, `admin`). The last segment is the file name.
#[must_use]
pub fn split_group(group: &str) -> (&str, &str) {
    match group.rsplit_once(GROUP_SEPARATOR) {
        Some((subpath, filename)) => (filename, subpath),
        None => (group, ""),
    }
}

/// Maps a concrete address to the file that stores it.
#[must_use]
pub fn address_to_path(base: &Path, address: &Address, extension: &str) -> PathBuf {
    let mut path = base.to_path_buf();
    if let Namespace::Named(name) = &address.namespace {
        path.push(VENDOR_DIR);
        path.push(name);
    }
    path.push(&address.locale);

    let (filename, subpath) = split_group(&address.group);
    for segment in subpath.split(GROUP_SEPARATOR).filter(|s| !s.is_empty()) {
        path.push(segment);
    }
    path.push(format!("{filename}.{extension}"));
    path
}

/// Decodes a path relative to a base directory back into an address.
///
/// Returns `None` for files that do not live under a locale directory, such as
/// a flat `en.json` next to the locale directories.
#[must_use]
pub fn path_to_address(relative: &Path) -> Option<Address> {
    let segments: Vec<&str> = relative
        .components()
        .map(|component| match component {
            Component::Normal(segment) => segment.to_str(),
            _ => None,
        })
        .collect::<Option<_>>()?;

    let (namespace, rest) = match segments.as_slice() {
        [VENDOR_DIR, namespace, rest @ ..] => (Namespace::Named((*namespace).to_string()), rest),
        rest => (Namespace::Default, rest),
    };

    let [locale, group_segments @ .., file] = rest else {
        return None;
    };
    let (stem, _extension) = file.rsplit_once('.')?;
    if stem.is_empty() {
        return None;
    }

    let mut group = group_segments.join("/");
    if !group.is_empty() {
        group.push(GROUP_SEPARATOR);
    }
    group.push_str(stem);

    Some(Address::new(namespace, *locale, group))
}
