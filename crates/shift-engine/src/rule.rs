//! The rule contract
//!
//! A [`Rule`] migrates one or more resource types between two schema
//! versions. Every capability except identification has a default that does
//! nothing, so a rule only implements the parts its resource needs.

use shift_core::{AttributeRename, MigrationContext, VersionPair};
use shift_hcl::Block;
use shift_state::StateInstance;

use crate::error::RuleError;
use crate::merge::MergeSpec;

/// Migration logic for a set of resource types
///
/// Rules are registered once and shared read-only across threads.
pub trait Rule: Send + Sync {
    /// Human-readable rule name, used in diagnostics and logs
    fn name(&self) -> &str;

    /// Resource types handled by this rule, including deprecated aliases
    fn resource_types(&self) -> &[&str];

    /// Schema versions this rule migrates between
    fn versions(&self) -> VersionPair;

    /// Rewrite the whole file text before parsing
    ///
    /// Only called when one of [`Rule::resource_types`] occurs in the text.
    /// Returns `Ok(None)` to leave the text unchanged.
    ///
    /// # Errors
    /// A [`RuleError`] keeps the text as it was and is reported as an error
    /// diagnostic.
    fn preprocess(&self, _source: &str, _ctx: &mut MigrationContext) -> Result<Option<String>, RuleError> {
        Ok(None)
    }

    /// Transform one `resource` or `data` block in place
    ///
    /// # Errors
    /// A [`RuleError`] restores the original block and is reported as an
    /// error diagnostic.
    fn transform_config(
        &self,
        _block: &mut Block,
        _ctx: &mut MigrationContext,
    ) -> Result<TransformResult, RuleError> {
        Ok(TransformResult::in_place())
    }

    /// Transform one state instance in place
    ///
    /// # Errors
    /// A [`RuleError`] restores the original instance and is reported as an
    /// error diagnostic.
    fn transform_state(
        &self,
        _instance: &mut StateInstance,
        _ctx: &mut MigrationContext,
    ) -> Result<(), RuleError> {
        Ok(())
    }

    /// New name of `resource_type` in the target schema, if it changes
    fn renamed_type(&self, _resource_type: &str) -> Option<String> {
        None
    }

    /// Attribute renames other files' references must follow
    fn attribute_renames(&self) -> Vec<AttributeRename> {
        Vec::new()
    }

    /// Whether state instances are upgraded by an external upgrader
    fn state_upgrade_deferred(&self) -> bool {
        false
    }

    /// Schema version of `resource_type` in the target schema
    fn target_schema_version(&self, _resource_type: &str) -> u64 {
        0
    }

    /// Child resource types folded into a parent collection before dispatch
    fn state_merges(&self) -> Vec<MergeSpec> {
        Vec::new()
    }
}

/// Output of [`Rule::transform_config`]
///
/// The (possibly mutated) input block stays in the tree unless
/// `remove_original` is set. `blocks` are inserted where the input block
/// was, after it when it stays.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransformResult {
    pub blocks: Vec<Block>,
    pub remove_original: bool,
}

impl TransformResult {
    /// The input block was edited in place (1 -> 1)
    #[inline]
    #[must_use]
    pub fn in_place() -> Self {
        Self::default()
    }

    /// Replace the input block with `blocks` (1 -> N)
    #[inline]
    #[must_use]
    pub fn replace_with(blocks: Vec<Block>) -> Self {
        Self {
            blocks,
            remove_original: true,
        }
    }

    /// Delete the input block (1 -> 0)
    #[inline]
    #[must_use]
    pub fn remove() -> Self {
        Self::replace_with(Vec::new())
    }

    /// Keep the input block and add `blocks` after it (1 -> 1 + N)
    #[inline]
    #[must_use]
    pub fn append(blocks: Vec<Block>) -> Self {
        Self {
            blocks,
            remove_original: false,
        }
    }

    /// Number of blocks the input turns into
    #[must_use]
    pub fn output_len(&self) -> usize {
        self.blocks.len() + usize::from(!self.remove_original)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shift_hcl::new_block;

    struct Noop;

    impl Rule for Noop {
        fn name(&self) -> &str {
            "noop"
        }

        fn resource_types(&self) -> &[&str] {
            &["acme_noop"]
        }

        fn versions(&self) -> VersionPair {
            VersionPair::new(4, 5)
        }
    }

    #[test]
    fn defaults_do_nothing() {
        let rule = Noop;
        let mut ctx = MigrationContext::new(rule.versions());
        let mut block = new_block("resource", &["acme_noop", "a"]);
        let before = block.clone();

        assert_eq!(rule.preprocess("text", &mut ctx), Ok(None));
        assert_eq!(
            rule.transform_config(&mut block, &mut ctx),
            Ok(TransformResult::in_place())
        );
        assert_eq!(block, before);
        assert_eq!(rule.renamed_type("acme_noop"), None);
        assert!(rule.attribute_renames().is_empty());
        assert!(!rule.state_upgrade_deferred());
        assert_eq!(rule.target_schema_version("acme_noop"), 0);
        assert!(ctx.diagnostics().is_empty());
    }

    #[test]
    fn result_shapes() {
        assert_eq!(TransformResult::in_place().output_len(), 1);
        assert_eq!(TransformResult::remove().output_len(), 0);
        let two = vec![new_block("resource", &["acme_noop", "a"]), new_block("moved", &[])];
        assert_eq!(TransformResult::replace_with(two.clone()).output_len(), 2);
        assert_eq!(TransformResult::append(two).output_len(), 3);
    }
}
