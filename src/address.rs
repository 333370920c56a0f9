//! Translation keys, concrete addresses and pattern scopes.

use std::fmt;

use crate::error::StoreError;
use crate::pattern::{
    Namespace,
    NamespaceSelector,
    Pattern,
    PatternError,
};

/// Separates a namespace from the rest of a key (`vendor-x::messages.welcome`).
pub const NAMESPACE_SEPARATOR: &str = "::";

/// Separates the group from the item and nested item segments.
pub const KEY_SEPARATOR: char = '.';

/// A key decomposed into namespace, group and optional item path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationKey {
    pub namespace: Namespace,
    pub group: String,
    pub item: Option<String>,
}

impl TranslationKey {
    /// Parses `[namespace::]group[.item]`.
    ///
    /// # Examples
    /// ```
    /// use i18n_store::address::TranslationKey;
    /// use i18n_store::pattern::Namespace;
    ///
    /// let key = TranslationKey::parse("vendor-x::messages.welcome.title").unwrap();
    /// assert_eq!(key.namespace, Namespace::Named("vendor-x".to_string()));
    /// assert_eq!(key.group, "messages");
    /// assert_eq!(key.item.as_deref(), Some("welcome.title"));
    /// ```
    ///
    /// # Errors
    /// - Empty namespace, group or item segment
    pub fn parse(key: &str) -> Result<Self, StoreError> {
        let invalid = || StoreError::InvalidKey(key.to_string());

        let (namespace, rest) = match key.split_once(NAMESPACE_SEPARATOR) {
            Some((namespace, rest)) if !namespace.is_empty() => {
                (Namespace::from_spec(namespace), rest)
            }
            Some(_) => return Err(invalid()),
            None => (Namespace::Default, key),
        };

        let (group, item) = match rest.split_once(KEY_SEPARATOR) {
            Some((group, item)) => (group, Some(item)),
            None => (rest, None),
        };

        if group.is_empty() || item.is_some_and(str::is_empty) {
            return Err(invalid());
        }

        Ok(Self { namespace, group: group.to_string(), item: item.map(str::to_string) })
    }
}

/// One concrete `(namespace, locale, group)` document location.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address {
    pub namespace: Namespace,
    pub locale: String,
    pub group: String,
}

impl Address {
    #[must_use]
    pub fn new(namespace: Namespace, locale: impl Into<String>, group: impl Into<String>) -> Self {
        Self { namespace, locale: locale.into(), group: group.into() }
    }

    /// `namespace.locale.group`, appended to the cache prefix.
    #[must_use]
    pub fn cache_suffix(&self) -> String {
        format!("{}.{}.{}", self.namespace, self.locale, self.group)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}/{}", self.namespace, self.locale, self.group)
    }
}

/// The set of addresses an operation targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scope {
    pub group: Pattern,
    pub namespace: NamespaceSelector,
    pub locale: Pattern,
}

impl Scope {
    /// Parses the three dimension specs of a structured call.
    ///
    /// # Errors
    /// - Any malformed dimension spec
    pub fn parse(group: &str, namespace: Option<&str>, locale: &str) -> Result<Self, PatternError> {
        Ok(Self {
            group: Pattern::parse_group(group)?,
            namespace: NamespaceSelector::parse(namespace)?,
            locale: Pattern::parse(locale)?,
        })
    }

    /// Every group, namespace and locale.
    #[must_use]
    pub const fn everything() -> Self {
        Self {
            group: Pattern::Wildcard,
            namespace: NamespaceSelector::All,
            locale: Pattern::Wildcard,
        }
    }

    #[must_use]
    pub fn from_address(address: &Address) -> Self {
        Self {
            group: Pattern::Exact(address.group.clone()),
            namespace: NamespaceSelector::single(address.namespace.clone()),
            locale: Pattern::Exact(address.locale.clone()),
        }
    }

    #[must_use]
    pub fn matches(&self, address: &Address) -> bool {
        self.group.matches(&address.group)
            && self.namespace.matches(&address.namespace)
            && self.locale.matches(&address.locale)
    }

    /// The single address this scope denotes, if it has no wildcard or union.
    #[must_use]
    pub fn concrete(&self) -> Option<Address> {
        let namespace = self.namespace.as_single()?;
        let locale = self.locale.as_exact()?;
        let group = self.group.as_exact()?;
        Some(Address::new(namespace.clone(), locale, group))
    }

    /// Splits namespace and locale unions into one scope per member.
    ///
    /// Wildcards stay whole, so a mass update produces a single non-concrete
    /// target.
    #[must_use]
    pub fn write_targets(&self) -> Vec<Self> {
        let locales = self.locale.split();
        self.namespace
            .split()
            .into_iter()
            .flat_map(|namespace| {
                locales.iter().map(move |locale| Self {
                    group: self.group.clone(),
                    namespace: namespace.clone(),
                    locale: locale.clone(),
                })
            })
            .collect()
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let namespace = match &self.namespace {
            NamespaceSelector::All => "<all>".to_string(),
            NamespaceSelector::Only(namespaces) => {
                namespaces.iter().map(Namespace::as_str).collect::<Vec<_>>().join("|")
            }
        };
        write!(f, "{namespace}::{}/{}", self.locale, self.group)
    }
}
