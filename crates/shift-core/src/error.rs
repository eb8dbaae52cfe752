//! Error types for shift-core
//!
//! Only settings problems are errors at this layer. Everything that happens
//! during a run is reported through [`crate::Diagnostics`].

use std::path::PathBuf;

/// Errors while loading or validating [`crate::MigrationSettings`]
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    /// Settings file could not be read
    #[error("io error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Settings text does not match the settings schema
    #[error("invalid settings file: {0}")]
    Toml(#[from] toml::de::Error),

    /// Settings are well-formed but semantically invalid
    #[error("invalid settings: {0}")]
    Invalid(String),
}

impl SettingsError {
    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create validation error
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid(message.into())
    }
}

/// Two rules disagree on the new name of the same attribute
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("conflicting rename for {resource_type}.{old_attribute}: '{existing}' vs '{incoming}'")]
pub struct RenameConflict {
    pub resource_type: String,
    pub old_attribute: String,
    pub existing: String,
    pub incoming: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_error_display() {
        let err = SettingsError::invalid("target_version must differ from source_version");
        assert_eq!(
            err.to_string(),
            "invalid settings: target_version must differ from source_version"
        );
    }

    #[test]
    fn rename_conflict_display() {
        let err = RenameConflict {
            resource_type: "acme_zones".to_string(),
            old_attribute: "zones".to_string(),
            existing: "result".to_string(),
            incoming: "items".to_string(),
        };
        assert!(err.to_string().contains("acme_zones.zones"));
    }
}
