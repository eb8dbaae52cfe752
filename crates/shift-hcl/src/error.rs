//! Error types for shift-hcl

/// Errors while reading configuration text
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HclError {
    /// Input is not valid configuration syntax
    #[error("syntax error at line {line}, column {column}: {message}")]
    Syntax {
        line: usize,
        column: usize,
        message: String,
    },
}

impl HclError {
    /// Create syntax error
    pub fn syntax(line: usize, column: usize, message: impl Into<String>) -> Self {
        Self::Syntax {
            line,
            column,
            message: message.into(),
        }
    }

    /// 1-based `(line, column)` of the error
    #[must_use]
    pub fn position(&self) -> (usize, usize) {
        match self {
            Self::Syntax { line, column, .. } => (*line, *column),
        }
    }
}

impl From<hcl_edit::parser::Error> for HclError {
    fn from(err: hcl_edit::parser::Error) -> Self {
        let location = err.location();
        Self::syntax(location.line(), location.column(), err.message())
    }
}

/// Expression text rejected by the expression grammar
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid expression `{text}`: {message}")]
pub struct InvalidExpression {
    pub text: String,
    pub message: String,
}

impl InvalidExpression {
    pub fn new(text: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            message: message.into(),
        }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, HclError>;
