//! Block to attribute conversions

use hcl_edit::expr::Array;
use shift_core::MigrationContext;

use super::dynamic::{body_to_fields, nested_name, repeated_expr, Unreducible};
use super::{comment_lines, FALLBACK_PREFIX};
use crate::error::InvalidExpression;
use crate::tree::{identifier, Attribute, Body, BodyExt, Expression, Ident, Structure};
use crate::value::Value;

/// Outcome of a conversion primitive
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Conversion {
    /// The tree was rewritten
    Converted,
    /// No matching block; nothing to do
    NotFound,
    /// More than one block where exactly one is required
    Ambiguous(usize),
    /// The target attribute already exists next to the blocks
    Conflict,
    /// A `dynamic` block could not be reduced; the tree is untouched
    Unreducible(Unreducible),
}

impl Conversion {
    #[inline]
    #[must_use]
    pub fn is_converted(&self) -> bool {
        matches!(self, Self::Converted)
    }
}

/// Re-express the single `ident` block as `attribute = { ... }`
///
/// Nested blocks are converted the same way. The attribute takes the block's
/// position, comments and indentation.
pub fn block_to_attribute(body: &mut Body, ident: &str, attribute: &str) -> Conversion {
    let positions = body.block_positions(|b| b.has_ident(ident));
    let index = match positions.as_slice() {
        [] => return Conversion::NotFound,
        [index] => *index,
        many => return Conversion::Ambiguous(many.len()),
    };
    if body.has_attribute(attribute) {
        return Conversion::Conflict;
    }
    let key = match attribute_name(ident, attribute) {
        Ok(key) => key,
        Err(unreducible) => return Conversion::Unreducible(unreducible),
    };

    let fields = match body.get(index).and_then(Structure::as_block) {
        Some(block) => body_to_fields(&block.body, true),
        None => return Conversion::NotFound,
    };
    let value = match fields {
        Ok(fields) => Value::Object(fields),
        Err(reason) => return Conversion::Unreducible(Unreducible::new(ident, reason)),
    };
    let expr = match value.to_expression(&body.indent()) {
        Ok(expr) => expr,
        Err(err) => return Conversion::Unreducible(rejected(ident, err)),
    };

    match body.replace(index, Attribute::new(key, expr)) {
        Some(_) => Conversion::Converted,
        None => Conversion::Conflict,
    }
}

/// Re-express every `ident` block (static or `dynamic "ident"`) as
/// `attribute = [ ... ]`
///
/// Elements keep source order. With no blocks, `emit_empty` adds
/// `attribute = []` unless the attribute already exists.
pub fn blocks_to_array(body: &mut Body, ident: &str, attribute: &str, emit_empty: bool) -> Conversion {
    let positions = repeated_positions(body, ident);
    let Some(&first) = positions.first() else {
        if emit_empty && !body.has_attribute(attribute) {
            return match attribute_name(ident, attribute) {
                Ok(key) => {
                    body.set_attribute(key, Expression::Array(Array::new()));
                    Conversion::Converted
                }
                Err(unreducible) => Conversion::Unreducible(unreducible),
            };
        }
        return Conversion::NotFound;
    };
    if body.has_attribute(attribute) {
        return Conversion::Conflict;
    }
    let key = match attribute_name(ident, attribute) {
        Ok(key) => key,
        Err(unreducible) => return Conversion::Unreducible(unreducible),
    };

    let blocks: Vec<_> = positions
        .iter()
        .filter_map(|&i| body.get(i).and_then(Structure::as_block))
        .collect();
    let value = match repeated_expr(&blocks) {
        Ok(value) => value,
        Err(unreducible) => return Conversion::Unreducible(unreducible),
    };
    let expr = match value.to_expression(&body.indent()) {
        Ok(expr) => expr,
        Err(err) => return Conversion::Unreducible(rejected(ident, err)),
    };

    if body.replace(first, Attribute::new(key, expr)).is_none() {
        return Conversion::Conflict;
    }
    for &index in positions.iter().skip(1).rev() {
        body.remove_at(index);
    }
    Conversion::Converted
}

/// [`block_to_attribute`], leaving a comment and a warning when unreducible
pub fn convert_block_or_comment(
    body: &mut Body,
    ident: &str,
    attribute: &str,
    ctx: &mut MigrationContext,
    address: &str,
) -> Conversion {
    let anchor = body.block_positions(|b| b.has_ident(ident)).first().copied();
    let outcome = block_to_attribute(body, ident, attribute);
    if let (Conversion::Unreducible(unreducible), Some(anchor)) = (&outcome, anchor) {
        fallback(body, anchor, attribute, unreducible, ctx, address);
    }
    outcome
}

/// [`blocks_to_array`], leaving a comment and a warning when unreducible
pub fn convert_repeated_or_comment(
    body: &mut Body,
    ident: &str,
    attribute: &str,
    emit_empty: bool,
    ctx: &mut MigrationContext,
    address: &str,
) -> Conversion {
    let outcome = blocks_to_array(body, ident, attribute, emit_empty);
    if let Conversion::Unreducible(unreducible) = &outcome {
        let anchor = body
            .block_positions(|b| b.has_ident("dynamic") && nested_name(b) == Some(unreducible.label.as_str()))
            .first()
            .copied()
            .or_else(|| repeated_positions(body, ident).first().copied());
        if let Some(anchor) = anchor {
            fallback(body, anchor, attribute, unreducible, ctx, address);
        }
    }
    outcome
}

fn repeated_positions(body: &Body, ident: &str) -> Vec<usize> {
    body.block_positions(|b| nested_name(b) == Some(ident))
}

fn attribute_name(label: &str, attribute: &str) -> Result<Ident, Unreducible> {
    identifier(attribute)
        .map_err(|_| Unreducible::new(label, format!("`{attribute}` is not a valid attribute name")))
}

fn rejected(label: &str, err: InvalidExpression) -> Unreducible {
    Unreducible {
        label: label.to_string(),
        reason: err.message,
        attempted: Some(err.text),
    }
}

fn fallback(
    body: &mut Body,
    anchor: usize,
    attribute: &str,
    unreducible: &Unreducible,
    ctx: &mut MigrationContext,
    address: &str,
) {
    let header = format!(
        "{FALLBACK_PREFIX} convert dynamic \"{}\" to `{attribute}` by hand ({})",
        unreducible.label, unreducible.reason
    );
    let attempted = unreducible
        .attempted
        .as_ref()
        .map(|text| format!("{attribute} = {text}"));
    let lines = comment_lines(header, attempted.as_deref());
    body.comment_once(anchor, &lines);
    ctx.warn_at(
        address,
        "dynamic block kept unconverted",
        unreducible.to_string(),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse;
    use crate::tree::new_block;
    use pretty_assertions::assert_eq;
    use shift_core::VersionPair;

    fn resource_body(src: &str) -> Body {
        let doc = parse(src).unwrap();
        let block = doc.body.get_blocks("resource").next().unwrap().body.clone();
        block
    }

    fn render(body: Body) -> String {
        let mut block = new_block("resource", &["a", "b"]);
        block.body = body;
        Body::from_iter([block]).to_string()
    }

    fn inline(body: &Body, key: &str) -> String {
        Value::from(body.get_attribute(key).unwrap().value.clone()).render_inline()
    }

    #[test]
    fn singleton_block_to_object() {
        let mut body = resource_body("resource \"acme_widget\" \"w\" {\n  name = \"w\"\n  foo {\n    bar = 1\n  }\n}\n");
        assert_eq!(block_to_attribute(&mut body, "foo", "foo"), Conversion::Converted);
        assert_eq!(body.attribute_position("foo"), Some(1));
        assert_eq!(block_to_attribute(&mut body, "foo", "foo"), Conversion::NotFound);
        assert_eq!(
            render(body),
            "resource \"a\" \"b\" {\n  name = \"w\"\n  foo = {\n    bar = 1\n  }\n}\n"
        );
    }

    #[test]
    fn converted_attribute_keeps_comments() {
        let mut body = resource_body(
            "resource \"a\" \"b\" {\n  name = \"w\"\n\n  # settings\n  foo {\n    bar = 1\n  } # tail\n}\n",
        );
        assert!(block_to_attribute(&mut body, "foo", "foo").is_converted());
        assert_eq!(
            render(body),
            "resource \"a\" \"b\" {\n  name = \"w\"\n\n  # settings\n  foo = {\n    bar = 1\n  } # tail\n}\n"
        );
    }

    #[test]
    fn singleton_requires_exactly_one() {
        let mut body = resource_body("resource \"a\" \"b\" {\n  foo {}\n  foo {}\n}\n");
        assert_eq!(block_to_attribute(&mut body, "foo", "foo"), Conversion::Ambiguous(2));
        assert_eq!(body.get_blocks("foo").count(), 2);
        assert!(matches!(
            block_to_attribute(&mut resource_body("resource \"a\" \"b\" {\n  foo {}\n}\n"), "foo", "not valid"),
            Conversion::Unreducible(_)
        ));
    }

    #[test]
    fn nested_blocks_convert_recursively() {
        let mut body = resource_body(
            "resource \"a\" \"b\" {\n  foo {\n    inner {\n      x = 1\n    }\n    rule {\n      y = 1\n    }\n    rule {\n      y = 2\n    }\n  }\n}\n",
        );
        assert!(block_to_attribute(&mut body, "foo", "foo").is_converted());
        assert_eq!(
            inline(&body, "foo"),
            "{ inner = { x = 1 }, rule = [{ y = 1 }, { y = 2 }] }"
        );
    }

    #[test]
    fn repeated_blocks_keep_order() {
        let mut body = resource_body(
            "resource \"a\" \"b\" {\n  item {\n    v = \"a\"\n  }\n  name = \"n\"\n  item {\n    v = \"b\"\n  }\n}\n",
        );
        assert!(blocks_to_array(&mut body, "item", "items", false).is_converted());
        assert_eq!(inline(&body, "items"), r#"[{ v = "a" }, { v = "b" }]"#);
        assert!(!body.has_blocks("item"));
        assert_eq!(blocks_to_array(&mut body, "item", "items", true), Conversion::NotFound);
        assert_eq!(
            render(body),
            "resource \"a\" \"b\" {\n  items = [\n    {\n      v = \"a\"\n    },\n    {\n      v = \"b\"\n    },\n  ]\n  name = \"n\"\n}\n"
        );
    }

    #[test]
    fn empty_set_respects_emit_flag() {
        let mut body = Body::new();
        assert_eq!(blocks_to_array(&mut body, "item", "items", false), Conversion::NotFound);
        assert!(!body.has_attribute("items"));
        assert!(blocks_to_array(&mut body, "item", "items", true).is_converted());
        assert_eq!(inline(&body, "items"), "[]");
    }

    #[test]
    fn unreducible_dynamic_leaves_comment_once() {
        let src = "resource \"a\" \"b\" {\n  dynamic \"item\" {\n    for_each = var.xs\n    content {\n      v = item\n    }\n  }\n}\n";
        let mut body = resource_body(src);
        let mut ctx = MigrationContext::new(VersionPair::new(4, 5));

        let outcome = convert_repeated_or_comment(&mut body, "item", "items", false, &mut ctx, "a.b");
        assert!(matches!(outcome, Conversion::Unreducible(_)));
        assert_eq!(body.get_blocks("dynamic").count(), 1);
        assert_eq!(ctx.diagnostics().warnings(), 1);

        convert_repeated_or_comment(&mut body, "item", "items", false, &mut ctx, "a.b");
        let out = render(body);
        assert_eq!(out.matches("# shift: convert dynamic").count(), 1);
        assert!(out.contains("  # shift: convert dynamic \"item\" to `items` by hand"));
        assert!(out.contains("  dynamic \"item\" {\n"));
    }
}
