//! Schema version pairs

use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};

/// A migration direction: from `source` schema major version to `target`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VersionPair {
    pub source: u32,
    pub target: u32,
}

impl VersionPair {
    /// Create a new version pair
    #[inline]
    #[must_use]
    pub const fn new(source: u32, target: u32) -> Self {
        Self { source, target }
    }

    /// Whether the pair describes an actual change of version
    #[inline]
    #[must_use]
    pub const fn is_upgrade(&self) -> bool {
        self.target > self.source
    }
}

impl Display for VersionPair {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "v{} -> v{}", self.source, self.target)
    }
}
