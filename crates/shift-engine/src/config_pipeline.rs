//! Configuration pipeline
//!
//! One file moves through [`ConfigStage`]s in two phases:
//!
//! 1. [`ConfigPipeline::dispatch`]: rule preprocessing over the raw text,
//!    parsing, then per-block rule dispatch over the top-level `resource` and
//!    `data` blocks. Attribute renames reported by the invoked rules, and
//!    the moves of blocks whose type changed, are collected, not applied.
//! 2. [`ConfigPipeline::finish`]: references are rewritten with a rename
//!    table (this file's or the whole project's) and the tree is serialized
//!    with the file's own line endings.
//!
//! [`ConfigPipeline::migrate`] runs both phases for a single file.

use shift_core::{Diagnostic, Diagnostics, MigrationContext, MigrationSettings, RenameTable, ResourceMove};
use shift_hcl::toolkit::rewrite_references;
use shift_hcl::{new_block, parse, reference, Block, BlockExt, Body, BodyExt, Decorate, Document, Ident, Structure};

use crate::error::{MigrateError, Result};
use crate::registry::RuleRegistry;
use crate::rule::Rule;
use crate::stage::{validate_transition, ConfigStage};

/// Counters of one configuration run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConfigStats {
    /// Rules whose preprocessing changed the text
    pub preprocessed: usize,
    /// `resource` and `data` blocks seen
    pub blocks_visited: usize,
    /// Blocks whose rule changed them
    pub blocks_migrated: usize,
    /// Blocks a rule removed without replacement
    pub blocks_removed: usize,
    /// Blocks added by rules next to their input block
    pub blocks_added: usize,
    pub moved_markers: usize,
    pub references_rewritten: usize,
}

/// Migrated file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigOutcome {
    pub file: Option<String>,
    pub output: String,
    pub diagnostics: Diagnostics,
    /// Attribute renames and block moves reported on this file
    pub renames: RenameTable,
    pub stats: ConfigStats,
}

impl ConfigOutcome {
    /// Whether the output differs from what was parsed
    #[must_use]
    pub fn changed(&self) -> bool {
        self.stats.blocks_migrated > 0
            || self.stats.preprocessed > 0
            || self.stats.references_rewritten > 0
    }
}

/// A file after dispatch, waiting for the project rename table
#[derive(Debug)]
pub struct DispatchedFile {
    stage: ConfigStage,
    document: Document,
    ctx: MigrationContext,
    stats: ConfigStats,
}

impl DispatchedFile {
    #[inline]
    #[must_use]
    pub fn file(&self) -> Option<&str> {
        self.ctx.file()
    }

    #[inline]
    #[must_use]
    pub fn stage(&self) -> ConfigStage {
        self.stage
    }

    #[inline]
    #[must_use]
    pub fn body(&self) -> &Body {
        &self.document.body
    }

    /// Attribute renames and block moves reported while dispatching this file
    #[inline]
    #[must_use]
    pub fn renames(&self) -> &RenameTable {
        self.ctx.renames()
    }

    #[inline]
    #[must_use]
    pub fn diagnostics(&self) -> &Diagnostics {
        self.ctx.diagnostics()
    }

    #[inline]
    #[must_use]
    pub fn stats(&self) -> ConfigStats {
        self.stats
    }

    fn advance(&mut self, to: ConfigStage) -> Result<()> {
        advance(&mut self.stage, to)
    }
}

/// Configuration pipeline bound to a registry and run settings
#[derive(Debug, Clone, Copy)]
pub struct ConfigPipeline<'a> {
    registry: &'a RuleRegistry,
    settings: &'a MigrationSettings,
}

impl<'a> ConfigPipeline<'a> {
    /// Create a pipeline
    ///
    /// # Errors
    /// Returns [`MigrateError::Settings`] if the settings are invalid.
    pub fn new(registry: &'a RuleRegistry, settings: &'a MigrationSettings) -> Result<Self> {
        settings.validate()?;
        Ok(Self { registry, settings })
    }

    /// Run both phases on one file, rewriting references with its own renames
    ///
    /// # Errors
    /// Returns [`MigrateError::Parse`] if the (preprocessed) text does not
    /// parse.
    pub fn migrate(&self, file: Option<&str>, source: &str) -> Result<ConfigOutcome> {
        let dispatched = self.dispatch(file, source)?;
        let renames = dispatched.renames().clone();
        self.finish(dispatched, &renames)
    }

    /// Phase one: preprocess, parse and dispatch every block to its rule
    ///
    /// # Errors
    /// Returns [`MigrateError::Parse`] if the (preprocessed) text does not
    /// parse.
    pub fn dispatch(&self, file: Option<&str>, source: &str) -> Result<DispatchedFile> {
        let mut ctx = MigrationContext::from_settings(self.settings);
        if let Some(file) = file {
            ctx = ctx.with_file(file);
        }
        ctx.set_source(source);
        let mut stats = ConfigStats::default();
        let mut stage = ConfigStage::Raw;

        let text = self.preprocess(source, &mut ctx, &mut stats);
        advance(&mut stage, ConfigStage::Preprocessed)?;

        let mut document = parse(&text).map_err(|err| MigrateError::parse(file, err))?;
        advance(&mut stage, ConfigStage::Parsed)?;

        let mut index = 0;
        while index < document.body.len() {
            index = self.visit(&mut document.body, index, &mut ctx, &mut stats);
        }
        advance(&mut stage, ConfigStage::PerBlockTransformed)?;

        tracing::debug!(
            file = file.unwrap_or("-"),
            visited = stats.blocks_visited,
            migrated = stats.blocks_migrated,
            renames = ctx.renames().len(),
            "dispatched configuration"
        );
        Ok(DispatchedFile {
            stage,
            document,
            ctx,
            stats,
        })
    }

    /// Phase two: rewrite references and serialize
    ///
    /// # Errors
    /// Returns [`MigrateError::Stage`] if `dispatched` is not at
    /// [`ConfigStage::PerBlockTransformed`].
    pub fn finish(&self, mut dispatched: DispatchedFile, renames: &RenameTable) -> Result<ConfigOutcome> {
        dispatched.advance(ConfigStage::ReferenceRewritten)?;
        if !renames.is_empty() {
            dispatched.stats.references_rewritten = rewrite_references(&mut dispatched.document.body, renames);
        }

        dispatched.advance(ConfigStage::Serialized)?;
        let output = dispatched.document.to_string();

        let file = dispatched.ctx.file().map(str::to_string);
        let (diagnostics, own_renames) = dispatched.ctx.into_parts();
        let stats = dispatched.stats;
        tracing::info!(
            file = file.as_deref().unwrap_or("-"),
            migrated = stats.blocks_migrated,
            moved = stats.moved_markers,
            references = stats.references_rewritten,
            diagnostics = diagnostics.len(),
            "migrated configuration"
        );
        Ok(ConfigOutcome {
            file,
            output,
            diagnostics,
            renames: own_renames,
            stats,
        })
    }

    fn preprocess(&self, source: &str, ctx: &mut MigrationContext, stats: &mut ConfigStats) -> String {
        let mut text = source.to_string();
        for rule in self.registry.list_all(ctx.versions(), None) {
            let applies = rule
                .resource_types()
                .iter()
                .any(|t| ctx.allows(t) && text.contains(t));
            if !applies {
                continue;
            }
            match rule.preprocess(&text, ctx) {
                Ok(Some(rewritten)) if rewritten != text => {
                    tracing::debug!(rule = rule.name(), "preprocessed source");
                    text = rewritten;
                    stats.preprocessed += 1;
                }
                Ok(_) => {}
                Err(err) => {
                    tracing::warn!(rule = rule.name(), error = %err, "preprocessing failed");
                    ctx.push(Diagnostic::error("preprocess failed", format!("{}: {err}", rule.name())));
                }
            }
        }
        text
    }

    /// Dispatch the structure at `index`, returning the index to visit next
    fn visit(&self, body: &mut Body, index: usize, ctx: &mut MigrationContext, stats: &mut ConfigStats) -> usize {
        let Some(block) = body.get(index).and_then(Structure::as_block) else {
            return index + 1;
        };
        if !block.has_ident("resource") && !block.has_ident("data") {
            return index + 1;
        }
        let Some(resource_type) = block.label(0) else {
            return index + 1;
        };
        stats.blocks_visited += 1;
        if !ctx.allows(resource_type) {
            return index + 1;
        }
        let Some(rule) = self.registry.lookup(resource_type, ctx.versions()) else {
            return index + 1;
        };
        let original = block.clone();
        self.apply(body, index, rule, original, ctx, stats)
    }

    fn apply(
        &self,
        body: &mut Body,
        index: usize,
        rule: &dyn Rule,
        original: Block,
        ctx: &mut MigrationContext,
        stats: &mut ConfigStats,
    ) -> usize {
        let address = original.address();
        let resource_type = original.label(0).unwrap_or_default().to_string();
        let mut block = original.clone();

        let result = match rule.transform_config(&mut block, ctx) {
            Ok(result) => result,
            Err(err) => {
                ctx.error_at(&address, "rule failed", format!("{}: {err}", rule.name()));
                return index + 1;
            }
        };

        let renamed = rule.renamed_type(&resource_type);
        let mut output = Vec::with_capacity(result.blocks.len() + 2);
        if !result.remove_original {
            if let Some(new_type) = &renamed {
                if block.label(0) == Some(resource_type.as_str()) {
                    block.set_label(0, new_type);
                }
            }
            output.push(block);
        }
        stats.blocks_added += result.blocks.len();
        output.extend(result.blocks);

        if let (Some(new_type), Some(name)) = (&renamed, original.label(1)) {
            if original.has_ident("data") {
                ctx.record_move(ResourceMove::data(&resource_type, name, new_type));
            } else {
                ctx.record_move(ResourceMove::managed(&resource_type, name, new_type));
                if self.settings.emit_moved_blocks {
                    let marker = moved_block(&resource_type, new_type, name);
                    let present = body.get_blocks("moved").any(|b| *b == marker) || output.contains(&marker);
                    if !present {
                        output.push(marker);
                        stats.moved_markers += 1;
                    }
                }
            }
        }

        for rename in rule.attribute_renames() {
            ctx.record_rename(rename);
        }

        let unchanged = matches!(output.as_slice(), [only] if only.to_source() == original.to_source());
        if unchanged {
            return index + 1;
        }
        stats.blocks_migrated += 1;
        tracing::debug!(
            address = %address,
            rule = rule.name(),
            outputs = output.len(),
            "transformed block"
        );

        let mut output = output.into_iter();
        let Some(first) = output.next() else {
            stats.blocks_removed += 1;
            body.remove_at(index);
            return index;
        };
        body.replace(index, first);
        let mut at = index + 1;
        for mut block in output {
            if block.decor().prefix().is_none() {
                block.decor_mut().set_prefix("\n");
            }
            body.insert(at, block);
            at += 1;
        }
        at
    }
}

/// `moved { from = <old>.<name>  to = <new>.<name> }`
#[must_use]
pub fn moved_block(old_type: &str, new_type: &str, name: &str) -> Block {
    let mut block = new_block("moved", &[]);
    block.body.set_attribute(Ident::new_sanitized("from"), reference(old_type, &[name]));
    block.body.set_attribute(Ident::new_sanitized("to"), reference(new_type, &[name]));
    block
}

/// [`ConfigPipeline::migrate`] with a one-off pipeline
///
/// # Errors
/// See [`ConfigPipeline::new`] and [`ConfigPipeline::migrate`].
pub fn migrate_config(
    registry: &RuleRegistry,
    settings: &MigrationSettings,
    file: Option<&str>,
    source: &str,
) -> Result<ConfigOutcome> {
    ConfigPipeline::new(registry, settings)?.migrate(file, source)
}

fn advance(stage: &mut ConfigStage, to: ConfigStage) -> Result<()> {
    validate_transition(*stage, to)?;
    tracing::trace!(from = ?*stage, to = ?to, "config stage");
    *stage = to;
    Ok(())
}
