//! State pipeline
//!
//! A state document is migrated in two steps:
//!
//! 1. The merge phase folds child resource types declared by
//!    [`Rule::state_merges`] into their parents.
//! 2. Each resource entry is dispatched to its rule. Instances of a rule that
//!    defers to an external upgrader are left alone; every other migrated
//!    instance ends with the rule's target schema version. Entries without a
//!    rule keep their attributes but still get the declared schema version
//!    when their type is known to the run.

use std::collections::BTreeMap;

use shift_core::{Diagnostics, MigrationContext, MigrationSettings};
use shift_state::{StateDocument, StateResource, SUPPORTED_FORMAT_VERSION};

use crate::error::Result;
use crate::merge::{apply_merge, MergeStats};
use crate::registry::RuleRegistry;
use crate::rule::Rule;

/// Counters of one state run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StateStats {
    pub resources_visited: usize,
    /// Instances transformed by their rule
    pub instances_migrated: usize,
    /// Instances left for an external upgrader
    pub instances_deferred: usize,
    /// Instances of rule-less types whose schema version was corrected
    pub instances_normalized: usize,
    /// Instances a failing rule left untouched
    pub instances_failed: usize,
    pub resources_renamed: usize,
    pub merge: MergeStats,
}

/// Migrated state document
#[derive(Debug, Clone, PartialEq)]
pub struct StateOutcome {
    pub document: StateDocument,
    pub output: String,
    pub diagnostics: Diagnostics,
    pub stats: StateStats,
}

/// State pipeline bound to a registry and run settings
#[derive(Debug, Clone, Copy)]
pub struct StatePipeline<'a> {
    registry: &'a RuleRegistry,
    settings: &'a MigrationSettings,
}

impl<'a> StatePipeline<'a> {
    /// Create a pipeline
    ///
    /// # Errors
    /// Returns [`crate::MigrateError::Settings`] if the settings are invalid.
    pub fn new(registry: &'a RuleRegistry, settings: &'a MigrationSettings) -> Result<Self> {
        settings.validate()?;
        Ok(Self { registry, settings })
    }

    /// Decode, migrate and re-encode a state document
    ///
    /// # Errors
    /// Returns [`crate::MigrateError::State`] if the text is not a state
    /// document.
    pub fn migrate(&self, file: Option<&str>, source: &str) -> Result<StateOutcome> {
        let mut document = StateDocument::from_json(source)?;
        let mut ctx = MigrationContext::from_settings(self.settings);
        if let Some(file) = file {
            ctx = ctx.with_file(file);
        }
        ctx.set_source(source);

        let stats = self.migrate_document(&mut document, &mut ctx);
        let output = document.to_json()?;
        let (diagnostics, _) = ctx.into_parts();
        tracing::info!(
            file = file.unwrap_or("-"),
            migrated = stats.instances_migrated,
            deferred = stats.instances_deferred,
            merged = stats.merge.folded,
            diagnostics = diagnostics.len(),
            "migrated state"
        );
        Ok(StateOutcome {
            document,
            output,
            diagnostics,
            stats,
        })
    }

    /// Migrate a decoded document in place
    pub fn migrate_document(&self, doc: &mut StateDocument, ctx: &mut MigrationContext) -> StateStats {
        let mut stats = StateStats::default();
        if !doc.is_supported_format() {
            ctx.warn(
                "unsupported state format version",
                format!(
                    "document has format version {}, expected {SUPPORTED_FORMAT_VERSION}; migrating anyway",
                    doc.version
                ),
            );
        }

        let rules = self.registry.list_all(ctx.versions(), None);
        for rule in &rules {
            for spec in rule.state_merges() {
                if ctx.allows(&spec.child_type) {
                    stats.merge += apply_merge(doc, &spec, ctx);
                }
            }
        }

        let declared = self.declared_versions(&rules);
        for resource in &mut doc.resources {
            stats.resources_visited += 1;
            if !ctx.allows(&resource.resource_type) {
                continue;
            }
            match self.registry.lookup(&resource.resource_type, ctx.versions()) {
                None => {
                    if let Some(&version) = declared.get(&resource.resource_type) {
                        stats.instances_normalized += normalize_versions(resource, version);
                    }
                }
                Some(rule) if rule.state_upgrade_deferred() => {
                    stats.instances_deferred += resource.instances.len();
                    tracing::debug!(
                        address = %resource.address(),
                        rule = rule.name(),
                        "state upgrade deferred"
                    );
                }
                Some(rule) => migrate_resource(rule, resource, ctx, &mut stats),
            }
        }
        stats
    }

    /// Declared schema versions of types that have no rule of their own
    ///
    /// Settings entries come first; rename targets of non-deferred rules add
    /// the version their rule migrates to.
    fn declared_versions(&self, rules: &[&dyn Rule]) -> BTreeMap<String, u64> {
        let mut declared = self.settings.state.schema_versions.clone();
        for rule in rules {
            if rule.state_upgrade_deferred() {
                continue;
            }
            for resource_type in rule.resource_types() {
                if let Some(new_type) = rule.renamed_type(resource_type) {
                    let version = rule.target_schema_version(&new_type);
                    declared.entry(new_type).or_insert(version);
                }
            }
        }
        declared
    }
}

fn migrate_resource(rule: &dyn Rule, resource: &mut StateResource, ctx: &mut MigrationContext, stats: &mut StateStats) {
    let address = resource.address();
    let renamed = rule.renamed_type(&resource.resource_type);
    let final_type = renamed.as_deref().unwrap_or(&resource.resource_type);
    let target = rule.target_schema_version(final_type);

    let mut failed = false;
    for instance in &mut resource.instances {
        let backup = instance.clone();
        match rule.transform_state(instance, ctx) {
            Ok(()) => {
                instance.schema_version = target;
                stats.instances_migrated += 1;
            }
            Err(err) => {
                let instance_address = format!("{address}{}", backup.key_suffix());
                *instance = backup;
                failed = true;
                stats.instances_failed += 1;
                ctx.error_at(instance_address, "rule failed", format!("{}: {err}", rule.name()));
            }
        }
    }

    if let Some(new_type) = renamed {
        if failed {
            ctx.warn_at(
                &address,
                "resource type not renamed",
                format!("an instance could not be migrated; `{new_type}` left for a later run"),
            );
        } else {
            resource.resource_type = new_type;
            stats.resources_renamed += 1;
        }
    }
    tracing::debug!(address = %address, rule = rule.name(), "migrated state resource");
}

fn normalize_versions(resource: &mut StateResource, version: u64) -> usize {
    let mut changed = 0;
    for instance in &mut resource.instances {
        if instance.schema_version != version {
            instance.schema_version = version;
            changed += 1;
        }
    }
    changed
}

/// [`StatePipeline::migrate`] with a one-off pipeline
///
/// # Errors
/// See [`StatePipeline::new`] and [`StatePipeline::migrate`].
pub fn migrate_state(
    registry: &RuleRegistry,
    settings: &MigrationSettings,
    file: Option<&str>,
    source: &str,
) -> Result<StateOutcome> {
    StatePipeline::new(registry, settings)?.migrate(file, source)
}
