//! Store structure: which `(namespace, locale, group)` documents exist.

use std::collections::{
    BTreeMap,
    BTreeSet,
};

use crate::address::{
    Address,
    Scope,
};
use crate::pattern::Namespace;

/// `namespace -> locale -> {group}`, derived from a backend listing.
///
/// Never persisted; recomputed whenever a caller needs it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreStructure {
    namespaces: BTreeMap<Namespace, BTreeMap<String, BTreeSet<String>>>,
}

impl StoreStructure {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, address: Address) {
        self.namespaces
            .entry(address.namespace)
            .or_default()
            .entry(address.locale)
            .or_default()
            .insert(address.group);
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.namespaces.is_empty()
    }

    /// Known namespaces, default first.
    pub fn namespaces(&self) -> impl Iterator<Item = &Namespace> {
        self.namespaces.keys()
    }

    pub fn locales(&self, namespace: &Namespace) -> impl Iterator<Item = &String> {
        self.namespaces.get(namespace).into_iter().flat_map(BTreeMap::keys)
    }

    pub fn groups(&self, namespace: &Namespace, locale: &str) -> impl Iterator<Item = &String> {
        self.namespaces
            .get(namespace)
            .and_then(|locales| locales.get(locale))
            .into_iter()
            .flatten()
    }

    #[must_use]
    pub fn contains(&self, address: &Address) -> bool {
        self.groups(&address.namespace, &address.locale).any(|group| *group == address.group)
    }

    /// Every known address.
    pub fn addresses(&self) -> impl Iterator<Item = Address> + '_ {
        self.namespaces.iter().flat_map(|(namespace, locales)| {
            locales.iter().flat_map(move |(locale, groups)| {
                groups.iter().map(move |group| Address::new(namespace.clone(), locale, group))
            })
        })
    }

    /// Known addresses that fall inside `scope`.
    #[must_use]
    pub fn matching(&self, scope: &Scope) -> Vec<Address> {
        self.addresses().filter(|address| scope.matches(address)).collect()
    }
}

impl FromIterator<Address> for StoreStructure {
    fn from_iter<I: IntoIterator<Item = Address>>(iter: I) -> Self {
        let mut structure = Self::new();
        for address in iter {
            structure.insert(address);
        }
        structure
    }
}
