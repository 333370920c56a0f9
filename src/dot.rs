//! Dot-path codec for nested translation documents.
//!
//! Documents are flattened into insertion-ordered maps keyed by dot-joined
//! paths before any merge, so one nested file and several overlapping files
//! merge the same way.

use indexmap::IndexMap;
use serde_json::{
    Map,
    Value,
};

use crate::address::KEY_SEPARATOR;

/// Flattened translations (`"auth.failed" -> "These credentials..."`).
pub type Translations = IndexMap<String, String>;

/// Result of a dot-path lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranslationValue {
    Text(String),
    /// Sub-tree below the looked-up path, re-keyed relative to it.
    Group(Translations),
}

impl TranslationValue {
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Group(_) => None,
        }
    }
}

/// Flatten nested JSON object into dot-separated key map.
///
/// Arrays flatten with numeric segments, non-string scalars are stringified,
/// nulls and empty containers are dropped.
///
/// # Examples
/// ```
/// use serde_json::json;
/// use i18n_store::dot::flatten;
///
/// let flattened = flatten(&json!({
///     "auth": { "failed": "Nope", "throttle": "Slow down" }
/// }));
/// assert_eq!(flattened.get("auth.failed").map(String::as_str), Some("Nope"));
/// assert_eq!(flattened.len(), 2);
/// ```
#[must_use]
pub fn flatten(document: &Value) -> Translations {
    let mut result = Translations::new();
    visit(document, None, &mut |key, value| {
        if let Some(value) = leaf_text(value) {
            result.insert(key, value);
        }
    });
    result
}

/// Splits a write request into leaves to upsert and keys to remove.
///
/// A `null` leaf means "delete this key".
#[must_use]
pub fn partition(document: &Value) -> (Translations, Vec<String>) {
    let mut upserts = Translations::new();
    let mut removals = Vec::new();
    visit(document, None, &mut |key, value| {
        if value.is_null() {
            removals.push(key);
        } else if let Some(value) = leaf_text(value) {
            upserts.insert(key, value);
        }
    });
    (upserts, removals)
}

/// Top-level entries of a flat document, keys taken literally.
///
/// Nested containers and nulls are skipped.
#[must_use]
pub fn literal(document: &Value) -> Translations {
    partition_literal(document).0
}

/// [`partition`] for flat documents: keys are not split on dots.
#[must_use]
pub fn partition_literal(document: &Value) -> (Translations, Vec<String>) {
    let mut upserts = Translations::new();
    let mut removals = Vec::new();
    if let Value::Object(map) = document {
        for (key, value) in map {
            if value.is_null() {
                removals.push(key.clone());
            } else if let Some(value) = leaf_text(value) {
                upserts.insert(key.clone(), value);
            }
        }
    }
    (upserts, removals)
}

fn visit<F>(value: &Value, prefix: Option<&str>, emit: &mut F)
where
    F: FnMut(String, &Value),
{
    let join = |segment: &str| {
        prefix.map_or_else(|| segment.to_string(), |p| format!("{p}{KEY_SEPARATOR}{segment}"))
    };

    match value {
        Value::Object(map) => {
            for (key, child) in map {
                visit(child, Some(&join(key)), emit);
            }
        }
        Value::Array(items) => {
            for (index, child) in items.iter().enumerate() {
                visit(child, Some(&join(&index.to_string())), emit);
            }
        }
        _ => {
            if let Some(key) = prefix {
                emit(key.to_string(), value);
            }
        }
    }
}

fn leaf_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Null | Value::Object(_) | Value::Array(_) => None,
        other => Some(other.to_string()),
    }
}

/// Rebuilds a nested document from flattened translations.
///
/// When a key is both a leaf and a branch (`a` and `a.b`), the later entry wins.
#[must_use]
pub fn unflatten(translations: &Translations) -> Value {
    let mut root = Map::new();
    for (key, value) in translations {
        insert_path(&mut root, key, value);
    }
    Value::Object(root)
}

fn insert_path(node: &mut Map<String, Value>, path: &str, value: &str) {
    match path.split_once(KEY_SEPARATOR) {
        None => {
            node.insert(path.to_string(), Value::String(value.to_string()));
        }
        Some((head, rest)) => {
            let child = node.entry(head.to_string()).or_insert_with(|| Value::Object(Map::new()));
            if !child.is_object() {
                *child = Value::Object(Map::new());
            }
            if let Value::Object(child) = child {
                insert_path(child, rest, value);
            }
        }
    }
}

/// Looks up an item path in flattened translations.
///
/// Without an item the whole document is returned, or `None` when it is
/// empty so that an empty file reads as "absent".
#[must_use]
pub fn lookup(translations: &Translations, item: Option<&str>) -> Option<TranslationValue> {
    let Some(item) = item else {
        return (!translations.is_empty()).then(|| TranslationValue::Group(translations.clone()));
    };

    if let Some(text) = translations.get(item) {
        return Some(TranslationValue::Text(text.clone()));
    }

    let prefix = format!("{item}{KEY_SEPARATOR}");
    let subtree: Translations = translations
        .iter()
        .filter_map(|(key, value)| {
            key.strip_prefix(&prefix).map(|rest| (rest.to_string(), value.clone()))
        })
        .collect();

    (!subtree.is_empty()).then_some(TranslationValue::Group(subtree))
}

/// Removes `key` and every key nested below it. Returns whether anything was
/// removed.
pub fn forget(translations: &mut Translations, key: &str) -> bool {
    let prefix = format!("{key}{KEY_SEPARATOR}");
    let before = translations.len();
    translations.retain(|existing, _| existing != key && !existing.starts_with(&prefix));
    translations.len() != before
}

/// Overlays `top` on `base`; keys in `top` win.
#[must_use]
pub fn overlay(mut base: Translations, top: Translations) -> Translations {
    base.extend(top);
    base
}
