//! Field-name paths into a state tree.
//!
//! Paths exist for diagnostics and for leaf handlers that need positional
//! context (e.g. a per-unit quantity leaf). They never drive dispatch.

use std::fmt;

use serde::Serialize;
use smallvec::SmallVec;

/// An ordered sequence of field names locating a value in its tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
pub struct Path(SmallVec<[String; 8]>);

impl Path {
    /// The empty path (tree root).
    pub fn root() -> Self {
        Self(SmallVec::new())
    }

    /// A path rooted at a single name.
    pub fn named(name: impl Into<String>) -> Self {
        let mut p = Self::root();
        p.0.push(name.into());
        p
    }

    /// Extend this path by one field name, returning the child path.
    pub fn child(&self, key: impl Into<String>) -> Path {
        let mut next = self.clone();
        next.0.push(key.into());
        next
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "<root>");
        }
        write!(f, "{}", self.0.join("."))
    }
}

impl From<&[&str]> for Path {
    fn from(segments: &[&str]) -> Self {
        Self(segments.iter().map(|s| (*s).to_owned()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for Path {
    fn from(segments: [&str; N]) -> Self {
        Self(segments.iter().map(|s| (*s).to_owned()).collect())
    }
}
