//! Multi-file project runner
//!
//! Attribute renames reported in one file must reach references in every
//! other file, so the configuration pipeline runs in two parallel phases:
//! every file is dispatched first, the per-file rename tables are merged in
//! file order, then every file is rewritten with the merged table and
//! serialized. No state is shared between files while a phase runs.

use rayon::prelude::*;
use shift_core::{Diagnostic, Diagnostics, MigrationSettings, RenameTable};

use crate::config_pipeline::{ConfigOutcome, ConfigPipeline, DispatchedFile};
use crate::error::{MigrateError, Result};
use crate::registry::RuleRegistry;

/// One configuration file of a project
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub name: String,
    pub text: String,
}

impl SourceFile {
    #[must_use]
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
        }
    }
}

/// A file that could not be migrated
#[derive(Debug)]
pub struct FileFailure {
    pub file: String,
    pub error: MigrateError,
}

/// Result of migrating a project
#[derive(Debug, Default)]
pub struct ProjectOutcome {
    /// Migrated files, in input order
    pub files: Vec<ConfigOutcome>,
    /// Files left untouched because of a fatal error, in input order
    pub failures: Vec<FileFailure>,
    /// Every diagnostic of the run, in file order
    pub diagnostics: Diagnostics,
    /// Project-wide rename table applied to every file
    pub renames: RenameTable,
}

impl ProjectOutcome {
    /// Output text of a migrated file
    #[must_use]
    pub fn output(&self, file: &str) -> Option<&str> {
        self.files
            .iter()
            .find(|outcome| outcome.file.as_deref() == Some(file))
            .map(|outcome| outcome.output.as_str())
    }

    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.failures.is_empty() || self.diagnostics.has_errors()
    }
}

/// Migrate every file of a project
///
/// A file that fails to parse is reported in [`ProjectOutcome::failures`]
/// and an error diagnostic; the other files are still migrated.
///
/// # Errors
/// Returns [`MigrateError::Settings`] if the settings are invalid.
pub fn migrate_project(
    registry: &RuleRegistry,
    settings: &MigrationSettings,
    files: &[SourceFile],
) -> Result<ProjectOutcome> {
    let pipeline = ConfigPipeline::new(registry, settings)?;

    let dispatched: Vec<Result<DispatchedFile>> = files
        .par_iter()
        .map(|file| pipeline.dispatch(Some(&file.name), &file.text))
        .collect();

    let mut outcome = ProjectOutcome::default();
    for file in dispatched.iter().flatten() {
        for conflict in outcome.renames.merge(file.renames()) {
            let mut diagnostic = Diagnostic::warning("conflicting attribute rename", conflict.to_string());
            if let Some(name) = file.file() {
                diagnostic = diagnostic.with_file(name);
            }
            outcome.diagnostics.push(diagnostic);
        }
    }

    let renames = &outcome.renames;
    let finished: Vec<Result<ConfigOutcome>> = dispatched
        .into_par_iter()
        .map(|result| result.and_then(|file| pipeline.finish(file, renames)))
        .collect();

    for (source, result) in files.iter().zip(finished) {
        match result {
            Ok(file) => {
                outcome.diagnostics.extend(file.diagnostics.iter().cloned());
                outcome.files.push(file);
            }
            Err(error) => {
                let mut diagnostic = error.to_diagnostic();
                if diagnostic.file.is_none() {
                    diagnostic.file = Some(source.name.clone());
                }
                outcome.diagnostics.push(diagnostic);
                outcome.failures.push(FileFailure {
                    file: source.name.clone(),
                    error,
                });
            }
        }
    }

    tracing::info!(
        files = files.len(),
        failed = outcome.failures.len(),
        renames = outcome.renames.len(),
        diagnostics = outcome.diagnostics.len(),
        "migrated project"
    );
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RuleError;
    use crate::rule::{Rule, TransformResult};
    use pretty_assertions::assert_eq;
    use shift_core::{AttributeRename, MigrationContext, VersionPair};
    use shift_hcl::Block;

    struct Zones;

    impl Rule for Zones {
        fn name(&self) -> &str {
            "zones"
        }

        fn resource_types(&self) -> &[&str] {
            &["acme_zones"]
        }

        fn versions(&self) -> VersionPair {
            VersionPair::new(4, 5)
        }

        fn transform_config(
            &self,
            _block: &mut Block,
            _ctx: &mut MigrationContext,
        ) -> std::result::Result<TransformResult, RuleError> {
            Ok(TransformResult::in_place())
        }

        fn attribute_renames(&self) -> Vec<AttributeRename> {
            vec![AttributeRename::new("acme_zones", "zones", "result")]
        }
    }

    fn registry() -> RuleRegistry {
        RuleRegistry::builder().with_rule(Zones).unwrap().build()
    }

    #[test]
    fn renames_reach_other_files() {
        let files = vec![
            SourceFile::new("outputs.tf", "output \"z\" {\n  value = data.acme_zones.all.zones\n}\n"),
            SourceFile::new("data.tf", "data \"acme_zones\" \"all\" {}\n"),
        ];
        let outcome = migrate_project(&registry(), &MigrationSettings::default(), &files).unwrap();

        assert_eq!(
            outcome.output("outputs.tf"),
            Some("output \"z\" {\n  value = data.acme_zones.all.result\n}\n")
        );
        assert_eq!(outcome.output("data.tf"), Some("data \"acme_zones\" \"all\" {}\n"));
        assert_eq!(outcome.renames.get("acme_zones", "zones"), Some("result"));
    }

    #[test]
    fn parse_failure_only_affects_its_file() {
        let files = vec![
            SourceFile::new("bad.tf", "resource \"acme_zones\" {\n"),
            SourceFile::new("good.tf", "locals {\n  a = 1\n}\n"),
        ];
        let outcome = migrate_project(&registry(), &MigrationSettings::default(), &files).unwrap();

        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].file, "bad.tf");
        assert_eq!(outcome.output("good.tf"), Some("locals {\n  a = 1\n}\n"));
        assert!(outcome.has_errors());
        let error = outcome.diagnostics.iter().find(|d| d.is_error()).unwrap();
        assert_eq!(error.file.as_deref(), Some("bad.tf"));
    }

    #[test]
    fn invalid_settings_are_rejected() {
        let err = migrate_project(&registry(), &MigrationSettings::new(5, 5), &[]).unwrap_err();
        assert!(matches!(err, MigrateError::Settings(_)));
    }
}
