//! Run settings
//!
//! Settings are explicit values provided by the caller; the engine never reads
//! environment variables. They can be built in code or loaded from TOML:
//!
//! ```toml
//! source_version = 4
//! target_version = 5
//! resources = ["acme_zone", "acme_record"]
//!
//! [state]
//! hash_width = 64
//!
//! [state.schema_versions]
//! acme_zone = 1
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::SettingsError;
use crate::version::VersionPair;

/// Migration run settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MigrationSettings {
    /// Schema major version the artifacts are written against
    pub source_version: u32,
    /// Schema major version to migrate to
    pub target_version: u32,
    /// Optional allowlist of resource types to migrate
    pub resources: Option<Vec<String>>,
    /// Emit moved markers for resource type renames
    pub emit_moved_blocks: bool,
    /// State pipeline settings
    pub state: StateSettings,
}

impl MigrationSettings {
    /// Create settings for a version pair
    #[inline]
    #[must_use]
    pub fn new(source_version: u32, target_version: u32) -> Self {
        Self {
            source_version,
            target_version,
            ..Self::default()
        }
    }

    /// Restrict migration to the given resource types
    #[must_use]
    pub fn with_resources<I, S>(mut self, resources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.resources = Some(resources.into_iter().map(Into::into).collect());
        self
    }

    #[inline]
    #[must_use]
    pub fn with_emit_moved_blocks(mut self, emit: bool) -> Self {
        self.emit_moved_blocks = emit;
        self
    }

    /// Declare the target schema version of a type that has no rule
    #[inline]
    #[must_use]
    pub fn with_schema_version(mut self, resource_type: impl Into<String>, version: u64) -> Self {
        self.state
            .schema_versions
            .insert(resource_type.into(), version);
        self
    }

    #[inline]
    #[must_use]
    pub fn with_hash_width(mut self, width: HashWidth) -> Self {
        self.state.hash_width = width;
        self
    }

    /// Parse and validate settings from TOML text
    ///
    /// # Errors
    /// Returns error if the text is not valid TOML for this schema or fails
    /// [`MigrationSettings::validate`].
    pub fn from_toml_str(text: &str) -> Result<Self, SettingsError> {
        let settings: Self = toml::from_str(text)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Read, parse and validate a TOML settings file
    ///
    /// # Errors
    /// Returns error if the file cannot be read or its content is invalid.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let text =
            std::fs::read_to_string(path).map_err(|e| SettingsError::io_error(path, e))?;
        Self::from_toml_str(&text)
    }

    /// Validate settings
    ///
    /// # Errors
    /// - target version equals source version
    /// - empty or blank entries in the resource allowlist
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.source_version == self.target_version {
            return Err(SettingsError::invalid(format!(
                "target_version must differ from source_version (both {})",
                self.source_version
            )));
        }

        if let Some(resources) = &self.resources {
            if resources.iter().any(|r| r.trim().is_empty()) {
                return Err(SettingsError::invalid(
                    "resources allowlist must not contain empty entries",
                ));
            }
        }

        Ok(())
    }

    /// The version pair this run migrates across
    #[inline]
    #[must_use]
    pub fn version_pair(&self) -> VersionPair {
        VersionPair::new(self.source_version, self.target_version)
    }

    /// Allowlist as a set (`None` means every type is allowed)
    #[must_use]
    pub fn allowlist(&self) -> Option<BTreeSet<String>> {
        self.resources
            .as_ref()
            .map(|r| r.iter().cloned().collect())
    }

    /// Whether a resource type is selected for migration
    #[must_use]
    pub fn allows(&self, resource_type: &str) -> bool {
        self.resources
            .as_ref()
            .map_or(true, |r| r.iter().any(|t| t == resource_type))
    }
}

impl Default for MigrationSettings {
    fn default() -> Self {
        Self {
            source_version: 4,
            target_version: 5,
            resources: None,
            emit_moved_blocks: true,
            state: StateSettings::default(),
        }
    }
}

/// State pipeline settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StateSettings {
    /// Declared target schema versions for types without a rule
    pub schema_versions: BTreeMap<String, u64>,
    /// Integer semantics of the legacy checksum used by hash reversal
    pub hash_width: HashWidth,
}

/// Integer width the legacy system used for its string checksum
///
/// On 64-bit hosts the checksum was always non-negative. On 32-bit hosts it
/// was reinterpreted as a signed value and folded to its absolute value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum HashWidth {
    Bits32,
    #[default]
    Bits64,
}

impl TryFrom<u8> for HashWidth {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            32 => Ok(Self::Bits32),
            64 => Ok(Self::Bits64),
            other => Err(format!("unsupported hash width {other} (expected 32 or 64)")),
        }
    }
}

impl From<HashWidth> for u8 {
    fn from(value: HashWidth) -> Self {
        match value {
            HashWidth::Bits32 => 32,
            HashWidth::Bits64 => 64,
        }
    }
}
