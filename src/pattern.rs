//! Address pattern parsing and matching.
//!
//! A dimension spec is either an exact value, the wildcard `*` or a
//! pipe-separated union (`en|fr`). The namespace dimension is special: `*`
//! names the default (unnamespaced) bucket, and "every namespace" is spelled by
//! omitting the namespace altogether.

use std::fmt;

use globset::{
    GlobBuilder,
    GlobMatcher,
};
use thiserror::Error;

/// Separator between union members.
pub const UNION_SEPARATOR: char = '|';

/// Spec token for the wildcard (or the default namespace).
pub const WILDCARD: &str = "*";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PatternError {
    #[error("Empty {dimension} pattern")]
    Empty { dimension: &'static str },

    #[error("Empty member in {dimension} union '{spec}'")]
    EmptyUnionMember { dimension: &'static str, spec: String },

    #[error("Wildcard is not allowed inside the {dimension} union '{spec}'")]
    WildcardInUnion { dimension: &'static str, spec: String },

    #[error("Unions are not allowed for groups: '{0}'")]
    GroupUnion(String),

    #[error("Invalid file name pattern '{pattern}': {source}")]
    InvalidGlob {
        pattern: String,
        #[source]
        source: globset::Error,
    },
}

/// A parsed locale or group specification.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Pattern {
    Exact(String),
    Wildcard,
    /// Always holds at least two distinct members.
    Union(Vec<String>),
}

impl Pattern {
    /// Parses a locale-style spec.
    ///
    /// # Errors
    /// - Empty spec or empty union member
    /// - `*` used as a union member
    pub fn parse(spec: &str) -> Result<Self, PatternError> {
        Self::parse_dimension(spec, "locale")
    }

    /// Parses a group spec. Groups accept exact values and the wildcard only.
    ///
    /// # Errors
    /// - Empty spec
    /// - Any union
    pub fn parse_group(spec: &str) -> Result<Self, PatternError> {
        if spec.contains(UNION_SEPARATOR) {
            return Err(PatternError::GroupUnion(spec.to_string()));
        }
        Self::parse_dimension(spec, "group")
    }

    fn parse_dimension(spec: &str, dimension: &'static str) -> Result<Self, PatternError> {
        let spec = spec.trim();
        if spec.is_empty() {
            return Err(PatternError::Empty { dimension });
        }
        if spec == WILDCARD {
            return Ok(Self::Wildcard);
        }
        if !spec.contains(UNION_SEPARATOR) {
            return Ok(Self::Exact(spec.to_string()));
        }

        let mut members: Vec<String> = Vec::new();
        for member in spec.split(UNION_SEPARATOR).map(str::trim) {
            if member.is_empty() {
                return Err(PatternError::EmptyUnionMember { dimension, spec: spec.to_string() });
            }
            if member == WILDCARD {
                return Err(PatternError::WildcardInUnion { dimension, spec: spec.to_string() });
            }
            if !members.iter().any(|m| m == member) {
                members.push(member.to_string());
            }
        }

        match <[String; 1]>::try_from(members) {
            Ok([single]) => Ok(Self::Exact(single)),
            Err(members) => Ok(Self::Union(members)),
        }
    }

    #[must_use]
    pub const fn is_concrete(&self) -> bool {
        matches!(self, Self::Exact(_))
    }

    #[must_use]
    pub fn as_exact(&self) -> Option<&str> {
        match self {
            Self::Exact(value) => Some(value),
            _ => None,
        }
    }

    #[must_use]
    pub fn matches(&self, value: &str) -> bool {
        match self {
            Self::Exact(exact) => exact == value,
            Self::Wildcard => true,
            Self::Union(members) => members.iter().any(|m| m == value),
        }
    }

    /// Concrete values this pattern stands for.
    ///
    /// `known` is only consulted for the wildcard and should come from a
    /// structure listing.
    #[must_use]
    pub fn expand<I, S>(&self, known: I) -> Vec<String>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        match self {
            Self::Exact(value) => vec![value.clone()],
            Self::Union(members) => members.clone(),
            Self::Wildcard => known.into_iter().map(Into::into).collect(),
        }
    }

    /// Splits a union into one exact pattern per member.
    #[must_use]
    pub fn split(&self) -> Vec<Self> {
        match self {
            Self::Union(members) => members.iter().cloned().map(Self::Exact).collect(),
            other => vec![other.clone()],
        }
    }

    /// Renders the pattern as a glob fragment.
    #[must_use]
    pub fn glob(&self) -> String {
        match self {
            Self::Exact(value) => globset::escape(value),
            Self::Wildcard => WILDCARD.to_string(),
            Self::Union(members) => alternation(members.iter().map(|m| globset::escape(m))),
        }
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(value) => f.write_str(value),
            Self::Wildcard => f.write_str(WILDCARD),
            Self::Union(members) => f.write_str(&members.join("|")),
        }
    }
}

/// A concrete namespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Namespace {
    /// The unnamespaced bucket, spelled `*`.
    Default,
    Named(String),
}

impl Namespace {
    #[must_use]
    pub fn from_spec(spec: &str) -> Self {
        if spec == WILDCARD { Self::Default } else { Self::Named(spec.to_string()) }
    }

    /// Spelling used in cache keys and relational rows.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Default => WILDCARD,
            Self::Named(name) => name,
        }
    }

    #[must_use]
    pub const fn is_default(&self) -> bool {
        matches!(self, Self::Default)
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which namespaces an operation targets.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NamespaceSelector {
    /// Default namespace and every named namespace.
    All,
    Only(Vec<Namespace>),
}

impl NamespaceSelector {
    /// Parses an optional namespace spec.
    ///
    /// `None` selects every namespace; `*` selects the default namespace only.
    ///
    /// # Errors
    /// - Empty spec or empty union member
    pub fn parse(spec: Option<&str>) -> Result<Self, PatternError> {
        let Some(spec) = spec else {
            return Ok(Self::All);
        };
        let spec = spec.trim();
        if spec.is_empty() {
            return Err(PatternError::Empty { dimension: "namespace" });
        }

        let mut namespaces: Vec<Namespace> = Vec::new();
        for member in spec.split(UNION_SEPARATOR).map(str::trim) {
            if member.is_empty() {
                return Err(PatternError::EmptyUnionMember {
                    dimension: "namespace",
                    spec: spec.to_string(),
                });
            }
            let namespace = Namespace::from_spec(member);
            if !namespaces.contains(&namespace) {
                namespaces.push(namespace);
            }
        }
        Ok(Self::Only(namespaces))
    }

    #[must_use]
    pub fn single(namespace: Namespace) -> Self {
        Self::Only(vec![namespace])
    }

    #[must_use]
    pub fn matches(&self, namespace: &Namespace) -> bool {
        match self {
            Self::All => true,
            Self::Only(namespaces) => namespaces.contains(namespace),
        }
    }

    /// The namespace when exactly one is selected.
    #[must_use]
    pub fn as_single(&self) -> Option<&Namespace> {
        match self {
            Self::Only(namespaces) => match namespaces.as_slice() {
                [single] => Some(single),
                _ => None,
            },
            Self::All => None,
        }
    }

    #[must_use]
    pub fn expand<I>(&self, known: I) -> Vec<Namespace>
    where
        I: IntoIterator<Item = Namespace>,
    {
        match self {
            Self::All => known.into_iter().collect(),
            Self::Only(namespaces) => namespaces.clone(),
        }
    }

    /// Splits into one selector per namespace; `All` stays whole.
    #[must_use]
    pub fn split(&self) -> Vec<Self> {
        match self {
            Self::All => vec![Self::All],
            Self::Only(namespaces) => namespaces.iter().cloned().map(Self::single).collect(),
        }
    }

    /// Relational filter values, `None` when every namespace is selected.
    #[must_use]
    pub fn values(&self) -> Option<Vec<&str>> {
        match self {
            Self::All => None,
            Self::Only(namespaces) => Some(namespaces.iter().map(Namespace::as_str).collect()),
        }
    }
}

fn alternation<I>(parts: I) -> String
where
    I: IntoIterator<Item = String>,
{
    let parts: Vec<String> = parts.into_iter().collect();
    match parts.as_slice() {
        [single] => single.clone(),
        _ => format!("{{{}}}", parts.join(",")),
    }
}

/// Compiles `{stem}.{ext,...}` into a file name matcher.
///
/// The glob is turned into a regex by `globset`, so brace unions behave the
/// same whether or not they span the whole name.
///
/// # Errors
/// - The rendered glob is invalid
pub fn name_matcher(stem_glob: &str, extensions: &[&str]) -> Result<GlobMatcher, PatternError> {
    let extension_glob = alternation(extensions.iter().map(|ext| globset::escape(ext)));
    let pattern = format!("{stem_glob}.{extension_glob}");

    GlobBuilder::new(&pattern)
        .literal_separator(true)
        .build()
        .map(|glob| glob.compile_matcher())
        .map_err(|source| PatternError::InvalidGlob { pattern, source })
}
