//! Per-run session state
//!
//! One [`MigrationContext`] is created per file or state document and passed
//! by `&mut` to every rule invoked during that run. When files are processed
//! concurrently each gets its own context; the project runner merges them with
//! [`MigrationContext::absorb`] afterwards.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::Value;

use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::renames::{AttributeRename, RenameTable, ResourceMove};
use crate::settings::{HashWidth, MigrationSettings};
use crate::version::VersionPair;

/// Mutable state of one migration run
#[derive(Debug, Clone)]
pub struct MigrationContext {
    versions: VersionPair,
    allowlist: Option<BTreeSet<String>>,
    hash_width: HashWidth,
    file: Option<String>,
    source: Option<String>,
    diagnostics: Diagnostics,
    renames: RenameTable,
    metadata: BTreeMap<String, Value>,
}

impl MigrationContext {
    /// Create a context for a version pair with no allowlist
    #[must_use]
    pub fn new(versions: VersionPair) -> Self {
        Self {
            versions,
            allowlist: None,
            hash_width: HashWidth::default(),
            file: None,
            source: None,
            diagnostics: Diagnostics::new(),
            renames: RenameTable::new(),
            metadata: BTreeMap::new(),
        }
    }

    /// Create a context carrying the run parameters of `settings`
    #[must_use]
    pub fn from_settings(settings: &MigrationSettings) -> Self {
        Self {
            allowlist: settings.allowlist(),
            hash_width: settings.state.hash_width,
            ..Self::new(settings.version_pair())
        }
    }

    /// Attach the name of the file being migrated
    #[inline]
    #[must_use]
    pub fn with_file(mut self, file: impl Into<String>) -> Self {
        self.file = Some(file.into());
        self
    }

    #[inline]
    #[must_use]
    pub fn file(&self) -> Option<&str> {
        self.file.as_deref()
    }

    /// Keep the raw source text of the current run
    #[inline]
    pub fn set_source(&mut self, source: impl Into<String>) {
        self.source = Some(source.into());
    }

    #[inline]
    #[must_use]
    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    #[inline]
    #[must_use]
    pub fn versions(&self) -> VersionPair {
        self.versions
    }

    #[inline]
    #[must_use]
    pub fn source_version(&self) -> u32 {
        self.versions.source
    }

    #[inline]
    #[must_use]
    pub fn target_version(&self) -> u32 {
        self.versions.target
    }

    #[inline]
    #[must_use]
    pub fn hash_width(&self) -> HashWidth {
        self.hash_width
    }

    /// Whether a resource type is selected for migration in this run
    #[must_use]
    pub fn allows(&self, resource_type: &str) -> bool {
        self.allowlist
            .as_ref()
            .map_or(true, |set| set.contains(resource_type))
    }

    #[inline]
    #[must_use]
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    #[inline]
    pub fn diagnostics_mut(&mut self) -> &mut Diagnostics {
        &mut self.diagnostics
    }

    /// Move the accumulated diagnostics out, leaving the list empty
    pub fn take_diagnostics(&mut self) -> Diagnostics {
        std::mem::take(&mut self.diagnostics)
    }

    /// Record a diagnostic, attaching the current file when unset
    pub fn push(&mut self, mut diagnostic: Diagnostic) {
        if diagnostic.file.is_none() {
            diagnostic.file.clone_from(&self.file);
        }
        if diagnostic.is_error() {
            tracing::error!(
                file = diagnostic.file.as_deref().unwrap_or("-"),
                address = diagnostic.address.as_deref().unwrap_or("-"),
                "{}",
                diagnostic.summary
            );
        } else {
            tracing::warn!(
                file = diagnostic.file.as_deref().unwrap_or("-"),
                address = diagnostic.address.as_deref().unwrap_or("-"),
                "{}",
                diagnostic.summary
            );
        }
        self.diagnostics.push(diagnostic);
    }

    /// Record a warning not tied to a resource
    pub fn warn(&mut self, summary: impl Into<String>, detail: impl Into<String>) {
        self.push(Diagnostic::warning(summary, detail));
    }

    /// Record a warning addressed to a resource
    pub fn warn_at(
        &mut self,
        address: impl Into<String>,
        summary: impl Into<String>,
        detail: impl Into<String>,
    ) {
        self.push(Diagnostic::warning(summary, detail).with_address(address));
    }

    /// Record an error addressed to a resource
    pub fn error_at(
        &mut self,
        address: impl Into<String>,
        summary: impl Into<String>,
        detail: impl Into<String>,
    ) {
        self.push(Diagnostic::error(summary, detail).with_address(address));
    }

    #[inline]
    #[must_use]
    pub fn renames(&self) -> &RenameTable {
        &self.renames
    }

    /// Record an attribute rename for the cross-reference pass
    ///
    /// A conflicting rename keeps the first mapping and records a warning.
    pub fn record_rename(&mut self, rename: AttributeRename) {
        if let Err(conflict) = self.renames.record(rename) {
            self.warn("conflicting attribute rename", conflict.to_string());
        }
    }

    /// Record a block type change for the cross-reference pass
    ///
    /// A conflicting move keeps the first mapping and records a warning.
    pub fn record_move(&mut self, mv: ResourceMove) {
        if let Err(conflict) = self.renames.record_move(mv) {
            self.warn("conflicting resource move", conflict.to_string());
        }
    }

    /// Store a coordination value for later rules in the same run
    pub fn set_metadata(&mut self, key: impl Into<String>, value: Value) {
        self.metadata.insert(key.into(), value);
    }

    #[must_use]
    pub fn metadata(&self, key: &str) -> Option<&Value> {
        self.metadata.get(key)
    }

    /// Set a boolean flag, returning `true` if it was not already set
    pub fn mark(&mut self, key: impl Into<String>) -> bool {
        let key = key.into();
        if self.metadata.get(&key) == Some(&Value::Bool(true)) {
            return false;
        }
        self.metadata.insert(key, Value::Bool(true));
        true
    }

    /// Whether a boolean flag is set
    #[must_use]
    pub fn is_marked(&self, key: &str) -> bool {
        self.metadata.get(key) == Some(&Value::Bool(true))
    }

    /// Merge diagnostics, renames and metadata of another run into this one
    ///
    /// Diagnostics are appended in order. Rename conflicts keep this
    /// context's mapping and record a warning. Metadata of `self` wins.
    pub fn absorb(&mut self, other: MigrationContext) {
        self.diagnostics.extend(other.diagnostics);
        for conflict in self.renames.merge(&other.renames) {
            self.warn("conflicting attribute rename", conflict.to_string());
        }
        for (key, value) in other.metadata {
            self.metadata.entry(key).or_insert(value);
        }
    }

    /// Split the context into its diagnostics and rename table
    #[must_use]
    pub fn into_parts(self) -> (Diagnostics, RenameTable) {
        (self.diagnostics, self.renames)
    }
}
