//! Configuration tree
//!
//! The tree is `hcl-edit`'s. [`BlockExt`] and [`BodyExt`] add the lookups and
//! edits rewrites need, keeping the decor of every node they touch: a
//! replaced structure inherits the comments and indentation of the one it
//! replaces, and comments in front of a removed structure move to the next
//! one.

use hcl_edit::expr::{Traversal, TraversalOperator};
use hcl_edit::{Decorated, RawString};

pub use hcl_edit::expr::Expression;
pub use hcl_edit::structure::{Attribute, Block, BlockLabel, Body, Structure};
pub use hcl_edit::{Decorate, Ident};

use crate::error::InvalidExpression;

const INDENT: &str = "  ";

/// Whether `text` is a bare identifier
#[must_use]
pub fn is_identifier(text: &str) -> bool {
    Ident::try_new(text).is_ok()
}

/// Identifier for a generated attribute or block name
///
/// # Errors
/// Returns [`InvalidExpression`] when `name` is not an identifier.
pub fn identifier(name: &str) -> Result<Ident, InvalidExpression> {
    Ident::try_new(name).map_err(|err| InvalidExpression::new(name, err.to_string()))
}

/// `root.attr.attr...` reference expression
#[must_use]
pub fn reference(root: &str, attributes: &[&str]) -> Expression {
    let root = Expression::Variable(Decorated::new(Ident::new_sanitized(root)));
    if attributes.is_empty() {
        return root;
    }
    let operators = attributes
        .iter()
        .map(|name| Decorated::new(TraversalOperator::GetAttr(Decorated::new(Ident::new_sanitized(*name)))))
        .collect();
    Expression::from(Traversal::new(root, operators))
}

/// Block with the given identifier and string labels
#[must_use]
pub fn new_block(ident: &str, labels: &[&str]) -> Block {
    let mut block = Block::new(Ident::new_sanitized(ident));
    block.labels = labels.iter().map(|label| BlockLabel::from(*label)).collect();
    block
}

/// Label and address helpers for blocks
pub trait BlockExt {
    /// Label at `index`
    fn label(&self, index: usize) -> Option<&str>;

    /// `type.name` address of a `resource` block, `data.type.name` of a
    /// `data` block
    fn address(&self) -> String;

    /// Replace the label at `index`, keeping its decor
    ///
    /// Returns `false` when there is no such label.
    fn set_label(&mut self, index: usize, value: &str) -> bool;

    /// Text of the block as written, comments and whitespace included
    fn to_source(&self) -> String;
}

impl BlockExt for Block {
    #[inline]
    fn label(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(BlockLabel::as_str)
    }

    fn address(&self) -> String {
        let local = self
            .labels
            .iter()
            .map(BlockLabel::as_str)
            .collect::<Vec<_>>()
            .join(".");
        if self.has_ident("data") {
            format!("data.{local}")
        } else {
            local
        }
    }

    fn set_label(&mut self, index: usize, value: &str) -> bool {
        let Some(label) = self.labels.get_mut(index) else {
            return false;
        };
        let decor = label.decor().clone();
        *label = match Ident::try_new(value) {
            Ok(ident) if label.is_ident() => BlockLabel::Ident(Decorated::new(ident)),
            _ => BlockLabel::String(Decorated::new(value.to_string())),
        };
        *label.decor_mut() = decor;
        true
    }

    fn to_source(&self) -> String {
        Body::from_iter([self.clone()]).to_string()
    }
}

/// Positional lookups and decor-preserving edits on a body
pub trait BodyExt {
    /// Index of the attribute named `key`
    fn attribute_position(&self, key: &str) -> Option<usize>;

    /// Indices of blocks matching `pred`, in source order
    fn block_positions(&self, pred: impl FnMut(&Block) -> bool) -> Vec<usize>;

    /// Indentation of this body's structures
    fn indent(&self) -> String;

    /// Set an attribute value in place, or append the attribute when absent
    fn set_attribute(&mut self, key: Ident, value: Expression);

    /// Rename an attribute in place, keeping its decor and value
    ///
    /// Returns `false` when `old` is absent.
    fn rename_key(&mut self, old: &str, new: Ident) -> bool;

    /// Insert a structure at `index` with this body's indentation, unless it
    /// already carries a prefix
    ///
    /// Returns `false` for an attribute whose key already exists.
    fn insert_indented(&mut self, index: usize, structure: impl Into<Structure>) -> bool;

    /// Replace the structure at `index`, handing its decor to the replacement
    ///
    /// Returns the replaced structure, or `None` when `index` is out of
    /// range or the replacement is an attribute whose key already exists.
    fn replace(&mut self, index: usize, structure: impl Into<Structure>) -> Option<Structure>;

    /// Remove the structure at `index`
    ///
    /// Comments in its prefix move to the next structure, or in front of
    /// the closing brace when it was the last one.
    fn remove_at(&mut self, index: usize) -> Option<Structure>;

    /// Add comment lines in front of the structure at `index`, unless the
    /// body already carries the first line
    ///
    /// An `index` past the last structure puts the lines in front of the
    /// closing brace.
    ///
    /// Returns whether the lines were added.
    fn comment_once(&mut self, index: usize, lines: &[String]) -> bool;
}

impl BodyExt for Body {
    fn attribute_position(&self, key: &str) -> Option<usize> {
        self.iter()
            .position(|s| s.as_attribute().is_some_and(|a| a.has_key(key)))
    }

    fn block_positions(&self, mut pred: impl FnMut(&Block) -> bool) -> Vec<usize> {
        self.iter()
            .enumerate()
            .filter_map(|(i, s)| s.as_block().filter(|b| pred(b)).map(|_| i))
            .collect()
    }

    fn indent(&self) -> String {
        if self.prefer_oneline() {
            return INDENT.to_string();
        }
        if let Some(indent) = self
            .iter()
            .find_map(|s| s.decor().prefix().and_then(|p| last_line_indent(p)))
        {
            return indent.to_string();
        }
        let closing = self
            .decor()
            .suffix()
            .and_then(|s| last_line_indent(s))
            .unwrap_or_default();
        if self.is_empty() {
            format!("{closing}{INDENT}")
        } else {
            closing.to_string()
        }
    }

    fn set_attribute(&mut self, key: Ident, value: Expression) {
        let position = self.attribute_position(key.as_str());
        match position.and_then(|i| self.get_mut(i)).and_then(Structure::as_attribute_mut) {
            Some(existing) => {
                let decor = existing.value.decor().clone();
                existing.value = value;
                *existing.value.decor_mut() = decor;
            }
            None => {
                let at = self.len();
                self.insert_indented(at, Attribute::new(key, value));
            }
        }
    }

    fn rename_key(&mut self, old: &str, new: Ident) -> bool {
        let position = self.attribute_position(old);
        let Some(attribute) = position.and_then(|i| self.get_mut(i)).and_then(Structure::as_attribute_mut) else {
            return false;
        };
        let decor = attribute.key.decor().clone();
        attribute.key = Decorated::new(new);
        *attribute.key.decor_mut() = decor;
        true
    }

    fn insert_indented(&mut self, index: usize, structure: impl Into<Structure>) -> bool {
        let mut structure = structure.into();
        if let Structure::Attribute(attribute) = &structure {
            if self.has_attribute(attribute.key.as_str()) {
                return false;
            }
        }
        let indent = self.indent();
        if self.prefer_oneline() {
            expand_oneline(self, &indent);
        }
        if structure.decor().prefix().is_none() {
            structure.decor_mut().set_prefix(indent);
        }
        let index = index.min(self.len());
        self.try_insert(index, structure).is_ok()
    }

    fn replace(&mut self, index: usize, structure: impl Into<Structure>) -> Option<Structure> {
        let mut structure = structure.into();
        if index >= self.len() {
            return None;
        }
        if let Structure::Attribute(attribute) = &structure {
            let taken = self.attribute_position(attribute.key.as_str());
            if taken.is_some_and(|at| at != index) {
                return None;
            }
        }
        let old = self.remove(index);
        *structure.decor_mut() = old.decor().clone();
        match self.try_insert(index, structure) {
            Ok(()) => Some(old),
            Err(_) => {
                self.insert(index, old);
                None
            }
        }
    }

    fn remove_at(&mut self, index: usize) -> Option<Structure> {
        if index >= self.len() {
            return None;
        }
        let removed = self.remove(index);
        let Some(comments) = removed.decor().prefix().and_then(|p| leading_comments(p)) else {
            return Some(removed);
        };
        match self.get_mut(index) {
            Some(next) => {
                let prefix = next.decor().prefix().map_or("", |p| &**p);
                let prefix = format!("{comments}{}", prefix.trim_start_matches('\n'));
                next.decor_mut().set_prefix(prefix);
            }
            None => {
                let suffix = self.decor().suffix().map_or("", |s| &**s);
                let suffix = format!("{comments}{suffix}");
                self.decor_mut().set_suffix(suffix);
            }
        }
        Some(removed)
    }

    fn comment_once(&mut self, index: usize, lines: &[String]) -> bool {
        let Some(first) = lines.first() else {
            return false;
        };
        let carries = |raw: Option<&RawString>| {
            raw.is_some_and(|raw| raw.lines().any(|line| line.trim() == first.as_str()))
        };
        if self.iter().any(|s| carries(s.decor().prefix())) || carries(self.decor().suffix()) {
            return false;
        }
        let indent = self.indent();
        if index >= self.len() {
            if self.prefer_oneline() {
                expand_oneline(self, &indent);
            }
            let suffix = self.decor().suffix().map_or("", |s| &**s).to_string();
            let (head, closing) = split_last_line(&suffix);
            let text = format!("{head}{}{closing}", indented_lines(&indent, lines));
            self.decor_mut().set_suffix(text);
            return true;
        }
        let Some(anchor) = self.get_mut(index) else {
            return false;
        };
        let prefix = anchor.decor().prefix().map_or("", |p| &**p).to_string();
        let (head, _) = split_last_line(&prefix);
        let text = format!("{head}{}{indent}", indented_lines(&indent, lines));
        anchor.decor_mut().set_prefix(text);
        true
    }
}

/// `(everything up to the last line break, last line)`
fn split_last_line(text: &str) -> (&str, &str) {
    match text.rfind('\n') {
        Some(at) => text.split_at(at + 1),
        None => ("", text),
    }
}

fn indented_lines(indent: &str, lines: &[String]) -> String {
    lines.iter().map(|line| format!("{indent}{line}\n")).collect()
}

/// Whitespace after the last line break, if that is all the last line holds
fn last_line_indent(raw: &RawString) -> Option<&str> {
    let (_, last) = split_last_line(raw);
    last.chars().all(|c| c == ' ' || c == '\t').then_some(last)
}

/// Comment lines of a prefix without its final indentation
fn leading_comments(raw: &RawString) -> Option<String> {
    let (head, _) = split_last_line(raw);
    let has_comment = head.lines().any(|line| {
        let line = line.trim_start();
        line.starts_with('#') || line.starts_with("//") || line.starts_with("/*")
    });
    has_comment.then(|| head.to_string())
}

/// Turn `{ a = 1 }` into a multi-line body indented with `indent`
fn expand_oneline(body: &mut Body, indent: &str) {
    body.set_prefer_oneline(false);
    for mut structure in body.iter_mut() {
        structure.decor_mut().set_prefix(indent.to_string());
        structure.decor_mut().set_suffix("");
    }
    let closing = indent.strip_suffix(INDENT).unwrap_or_default().to_string();
    body.decor_mut().set_suffix(closing);
}
