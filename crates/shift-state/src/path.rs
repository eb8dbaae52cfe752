//! Attribute paths for addressing within instance attributes
//!
//! Provides [`StatePath`] for addressing values inside a JSON attribute tree.
//! Paths are written as dotted keys with optional indices:
//! `settings.rules[0].name` or `settings.rules.0.name`.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use crate::error::PathError;

/// One step of a [`StatePath`]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    /// Object key (also resolves array positions when numeric)
    Key(String),
    /// Array position
    Index(usize),
}

impl Segment {
    /// Array position addressed by this segment
    #[must_use]
    pub fn as_index(&self) -> Option<usize> {
        match self {
            Self::Index(i) => Some(*i),
            Self::Key(k) => k.parse().ok(),
        }
    }
}

/// Path within an attribute tree
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct StatePath(Vec<Segment>);

impl StatePath {
    #[inline]
    #[must_use]
    pub fn new(segments: Vec<Segment>) -> Self {
        Self(segments)
    }

    /// Empty path (the attribute root)
    #[inline]
    #[must_use]
    pub fn root() -> Self {
        Self(Vec::new())
    }

    #[inline]
    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.0
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Get parent path (if not root)
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        let (_, parent) = self.0.split_last()?;
        Some(Self(parent.to_vec()))
    }

    #[inline]
    #[must_use]
    pub fn last(&self) -> Option<&Segment> {
        self.0.last()
    }

    /// Append a key, returning new path
    #[must_use]
    pub fn key(&self, key: impl Into<String>) -> Self {
        let mut new = self.clone();
        new.0.push(Segment::Key(key.into()));
        new
    }

    /// Append an index, returning new path
    #[must_use]
    pub fn index(&self, index: usize) -> Self {
        let mut new = self.clone();
        new.0.push(Segment::Index(index));
        new
    }
}

impl Display for StatePath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.0.iter().enumerate() {
            match segment {
                Segment::Key(key) if i == 0 => write!(f, "{key}")?,
                Segment::Key(key) => write!(f, ".{key}")?,
                Segment::Index(index) => write!(f, "[{index}]")?,
            }
        }
        Ok(())
    }
}

impl FromStr for StatePath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Ok(Self::root());
        }

        let mut segments = Vec::new();
        for part in s.split('.') {
            let (name, mut indices) = match part.find('[') {
                Some(i) => (&part[..i], &part[i..]),
                None => (part, ""),
            };
            if name.is_empty() && (indices.is_empty() || !segments.is_empty()) {
                return Err(PathError::EmptySegment);
            }
            if name.contains(']') {
                return Err(PathError::InvalidIndex(part.to_string()));
            }
            if !name.is_empty() {
                segments.push(Segment::Key(name.to_string()));
            }
            while !indices.is_empty() {
                let close = indices
                    .find(']')
                    .ok_or_else(|| PathError::InvalidIndex(part.to_string()))?;
                let index = indices[1..close]
                    .parse()
                    .map_err(|_| PathError::InvalidIndex(part.to_string()))?;
                segments.push(Segment::Index(index));
                indices = &indices[close + 1..];
                if !indices.is_empty() && !indices.starts_with('[') {
                    return Err(PathError::InvalidIndex(part.to_string()));
                }
            }
        }

        Ok(Self(segments))
    }
}

impl From<Vec<Segment>> for StatePath {
    fn from(segments: Vec<Segment>) -> Self {
        Self(segments)
    }
}
