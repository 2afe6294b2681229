//! Set algebra over domain names
//!
//! Snapshots from both pollers and the engine's deletion queue are all
//! [`DomainSet`]s. Equality is element-set equality: same cardinality, same
//! membership, regardless of insertion history or internal representation.
//! That explicit definition is what makes the engine's no-op suppression
//! well-defined.

use std::collections::HashSet;
use std::collections::hash_set;
use std::fmt;

/// An unordered collection of unique domain-name strings.
#[derive(Debug, Clone, Default, Eq)]
pub struct DomainSet {
    inner: HashSet<String>,
}

impl DomainSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self {
            inner: HashSet::new(),
        }
    }

    /// Insert a domain. Returns `true` if it was not already present.
    pub fn add(&mut self, domain: impl Into<String>) -> bool {
        self.inner.insert(domain.into())
    }

    /// Membership test
    pub fn contains(&self, domain: &str) -> bool {
        self.inner.contains(domain)
    }

    /// All domains in `self` or `other`
    pub fn union(&self, other: &DomainSet) -> DomainSet {
        Self {
            inner: self.inner.union(&other.inner).cloned().collect(),
        }
    }

    /// All domains in both `self` and `other`
    pub fn intersect(&self, other: &DomainSet) -> DomainSet {
        Self {
            inner: self.inner.intersection(&other.inner).cloned().collect(),
        }
    }

    /// All domains in `self` but not in `other`
    pub fn difference(&self, other: &DomainSet) -> DomainSet {
        Self {
            inner: self.inner.difference(&other.inner).cloned().collect(),
        }
    }

    /// Number of domains in the set
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// True when the set holds no domains
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Iterate over the domains (no ordering guarantee)
    pub fn iter(&self) -> hash_set::Iter<'_, String> {
        self.inner.iter()
    }
}

impl PartialEq for DomainSet {
    fn eq(&self, other: &Self) -> bool {
        self.inner.len() == other.inner.len() && self.inner.iter().all(|d| other.inner.contains(d))
    }
}

impl fmt::Display for DomainSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut domains: Vec<&str> = self.inner.iter().map(String::as_str).collect();
        domains.sort_unstable();
        write!(f, "{{{}}}", domains.join(", "))
    }
}

impl<S: Into<String>> FromIterator<S> for DomainSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            inner: iter.into_iter().map(Into::into).collect(),
        }
    }
}

impl IntoIterator for DomainSet {
    type Item = String;
    type IntoIter = hash_set::IntoIter<String>;

    fn into_iter(self) -> Self::IntoIter {
        self.inner.into_iter()
    }
}

impl<'a> IntoIterator for &'a DomainSet {
    type Item = &'a String;
    type IntoIter = hash_set::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.inner.iter()
    }
}
