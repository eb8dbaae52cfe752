//! Error types for shift-state

/// Errors while reading or writing a state document
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    /// Document is not valid JSON or does not have the state layout
    #[error("invalid state document: {0}")]
    Decode(#[source] serde_json::Error),

    /// Document could not be serialized
    #[error("failed to serialize state document: {0}")]
    Encode(#[source] serde_json::Error),

    #[error(transparent)]
    Path(#[from] PathError),
}

impl StateError {
    /// 1-based `(line, column)` of a decode error
    #[must_use]
    pub fn position(&self) -> Option<(usize, usize)> {
        match self {
            Self::Decode(err) => Some((err.line(), err.column())),
            _ => None,
        }
    }
}

/// Errors related to attribute paths
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    /// Empty segment in path
    #[error("path contains empty segment")]
    EmptySegment,

    /// Malformed `[index]` suffix
    #[error("invalid index in segment: {0}")]
    InvalidIndex(String),

    /// A value on the path is not an object or array
    #[error("cannot descend into non-container value at '{0}'")]
    NotContainer(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, StateError>;
