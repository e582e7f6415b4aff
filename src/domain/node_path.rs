//! Diagnostic trail of the structural position reached during a descent.
//!
//! A [`NodePath`] is a persistent cons list: extending a path never touches
//! the parent, so sibling descents share their common prefix.

use std::{fmt, sync::Arc};

/// An immutable, structurally shared path of diagnostic entries.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct NodePath(Option<Arc<Segment>>);

#[derive(PartialEq, Eq)]
struct Segment {
    parent: NodePath,
    entry: String,
    depth: usize,
}

impl NodePath {
    /// The empty path.
    #[must_use]
    pub const fn root() -> Self {
        Self(None)
    }

    /// A path holding a single entry.
    #[must_use]
    pub fn single(entry: impl Into<String>) -> Self {
        Self::root().child(entry)
    }

    /// Returns a new path made of this one followed by `entry`.
    #[must_use]
    pub fn child(&self, entry: impl Into<String>) -> Self {
        Self(Some(Arc::new(Segment {
            parent: self.clone(),
            entry: entry.into(),
            depth: self.len() + 1,
        })))
    }

    /// The number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.as_ref().map_or(0, |segment| segment.depth)
    }

    /// Whether the path has no entries.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_none()
    }

    /// The final entry, if any.
    #[must_use]
    pub fn last(&self) -> Option<&str> {
        self.0.as_ref().map(|segment| segment.entry.as_str())
    }

    /// The path without its final entry.
    #[must_use]
    pub fn parent(&self) -> Option<&Self> {
        self.0.as_ref().map(|segment| &segment.parent)
    }

    /// The entries from the first to the last.
    #[must_use]
    pub fn entries(&self) -> Vec<&str> {
        let mut entries = Vec::with_capacity(self.len());
        let mut cursor = self;
        while let Some(segment) = &cursor.0 {
            entries.push(segment.entry.as_str());
            cursor = &segment.parent;
        }
        entries.reverse();
        entries
    }

    /// Whether `self` and `other` are the same shared instance.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        match (&self.0, &other.0) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        }
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, entry) in self.entries().into_iter().enumerate() {
            if i > 0 {
                f.write_str("/")?;
            }
            f.write_str(entry)?;
        }
        Ok(())
    }
}

impl fmt::Debug for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodePath({self})")
    }
}
