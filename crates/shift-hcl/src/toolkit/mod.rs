//! Structural rewrite primitives for configuration trees
//!
//! Every primitive is a function over a [`Body`] (usually a resource block's
//! body). Primitives that can fail validate their result before touching the
//! tree; the `*_or_comment` variants turn a failure into an inert comment and
//! a warning on the [`shift_core::MigrationContext`].

use crate::tree::{is_identifier, Block, BlockExt, Body, BodyExt, Ident};

mod convert;
mod dynamic;
mod inject;
mod references;

pub use convert::{
    block_to_attribute, blocks_to_array, convert_block_or_comment, convert_repeated_or_comment,
    Conversion,
};
pub use dynamic::{dynamic_to_comprehension, Unreducible};
pub use inject::{inject_expression, remove_dropped_attribute, set_raw_attribute};
pub use references::{rewrite_expression, rewrite_references};

/// Comment prefix of everything the toolkit writes for a human to finish
pub const FALLBACK_PREFIX: &str = "# shift:";

/// Immediate child blocks with the given identifier, in source order
#[must_use]
pub fn find_blocks<'a>(body: &'a Body, ident: &'a str) -> Vec<&'a Block> {
    body.get_blocks(ident).collect()
}

/// Immediate child blocks with the given identifier and leading labels
#[must_use]
pub fn find_labeled_blocks<'a>(body: &'a Body, ident: &'a str, labels: &[&str]) -> Vec<&'a Block> {
    body.get_blocks(ident)
        .filter(|b| {
            labels
                .iter()
                .enumerate()
                .all(|(i, label)| b.label(i) == Some(*label))
        })
        .collect()
}

/// Rename an attribute, keeping its value exactly as written
///
/// Returns `false` when `old` is absent, `new` already exists or is not an
/// identifier; an existing attribute is never overwritten.
pub fn rename_attribute(body: &mut Body, old: &str, new: &str) -> bool {
    if old == new || body.has_attribute(new) || !is_identifier(new) {
        return false;
    }
    body.rename_key(old, Ident::new_sanitized(new))
}

/// Comment lines for a multi-line snippet
pub(crate) fn comment_lines(header: String, snippet: Option<&str>) -> Vec<String> {
    let mut lines = vec![header];
    if let Some(snippet) = snippet {
        lines.extend(snippet.lines().map(|line| format!("# {line}")));
    }
    lines
}
