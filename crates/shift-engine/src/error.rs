//! Error types for shift-engine
//!
//! Three layers of failure:
//! - [`RegistryError`]: programmer errors while registering rules, raised at
//!   startup
//! - [`RuleError`]: a rule could not transform one block or instance; the
//!   pipelines turn it into an error diagnostic and keep the original
//! - [`MigrateError`]: the whole file or document could not be migrated

use shift_core::{Diagnostic, SettingsError, VersionPair};
use shift_hcl::{HclError, InvalidExpression};
use shift_state::{PathError, StateError};

use crate::stage::ConfigStage;

/// Errors raised while building a [`crate::RuleRegistry`]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// Two different rule instances claim the same `(type, versions)` key
    #[error("duplicate rule for {resource_type} {versions}: '{existing}' already registered, '{incoming}' rejected")]
    Duplicate {
        resource_type: String,
        versions: VersionPair,
        existing: String,
        incoming: String,
    },

    /// A rule declares no resource type to register under
    #[error("rule '{0}' declares no resource types")]
    NoResourceTypes(String),
}

impl RegistryError {
    /// Create a duplicate registration error
    pub fn duplicate(
        resource_type: impl Into<String>,
        versions: VersionPair,
        existing: impl Into<String>,
        incoming: impl Into<String>,
    ) -> Self {
        Self::Duplicate {
            resource_type: resource_type.into(),
            versions,
            existing: existing.into(),
            incoming: incoming.into(),
        }
    }
}

/// A rule failed on one block or instance
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuleError {
    #[error("{0}")]
    Failed(String),

    /// The input does not have a shape the rule understands
    #[error("unexpected shape at '{path}': {message}")]
    Shape { path: String, message: String },

    #[error(transparent)]
    Path(#[from] PathError),

    #[error(transparent)]
    Expression(#[from] InvalidExpression),
}

impl RuleError {
    /// Create a free-form failure
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }

    /// Create a shape mismatch error
    pub fn shape(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Shape {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// A file or state document could not be migrated
#[derive(Debug, thiserror::Error)]
pub enum MigrateError {
    /// Configuration text does not parse
    #[error("{}: {source}", .file.as_deref().unwrap_or("<input>"))]
    Parse {
        file: Option<String>,
        #[source]
        source: HclError,
    },

    /// State document does not decode or encode
    #[error("state: {0}")]
    State(#[from] StateError),

    /// Run settings are invalid
    #[error(transparent)]
    Settings(#[from] SettingsError),

    /// Internal pipeline ordering violation
    #[error("pipeline stage {from:?} cannot advance to {to:?}")]
    Stage { from: ConfigStage, to: ConfigStage },
}

impl MigrateError {
    /// Create a parse error for a file
    pub fn parse(file: Option<&str>, source: HclError) -> Self {
        Self::Parse {
            file: file.map(str::to_string),
            source,
        }
    }

    /// 1-based `(line, column)` of the failure, when known
    #[must_use]
    pub fn position(&self) -> Option<(usize, usize)> {
        match self {
            Self::Parse { source, .. } => Some(source.position()),
            Self::State(err) => err.position(),
            Self::Settings(_) | Self::Stage { .. } => None,
        }
    }

    /// Error diagnostic carrying the file and position
    #[must_use]
    pub fn to_diagnostic(&self) -> Diagnostic {
        let detail = match self {
            Self::Parse { source, .. } => source.to_string(),
            other => other.to_string(),
        };
        let summary = match self.position() {
            Some((line, column)) => format!("parse failure at {line}:{column}"),
            None => "migration failed".to_string(),
        };
        let diagnostic = Diagnostic::error(summary, detail);
        match self {
            Self::Parse {
                file: Some(file), ..
            } => diagnostic.with_file(file.clone()),
            _ => diagnostic,
        }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, MigrateError>;
