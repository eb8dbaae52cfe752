//! Raw expression injection and dropped attributes

use shift_core::MigrationContext;

use super::{comment_lines, FALLBACK_PREFIX};
use crate::error::InvalidExpression;
use crate::parse::parse_expression;
use crate::tree::{identifier, Attribute, Body, BodyExt};

/// Set `name` from unparsed expression text
///
/// # Errors
/// Returns [`InvalidExpression`] without touching the body when `name` is
/// not an identifier or `text` is not a single valid expression.
pub fn set_raw_attribute(body: &mut Body, name: &str, text: &str) -> Result<(), InvalidExpression> {
    let key = identifier(name)?;
    let value = parse_expression(text)?;
    body.set_attribute(key, value);
    Ok(())
}

/// [`set_raw_attribute`], leaving a commented placeholder and a warning when
/// the text does not parse
///
/// Returns whether the attribute was set.
pub fn inject_expression(
    body: &mut Body,
    name: &str,
    text: &str,
    ctx: &mut MigrationContext,
    address: &str,
) -> bool {
    match set_raw_attribute(body, name, text) {
        Ok(()) => true,
        Err(err) => {
            let header = format!("{FALLBACK_PREFIX} set `{name}` by hand, generated expression is invalid");
            let snippet = format!("{name} = {text}");
            let lines = comment_lines(header, Some(&snippet));
            let at = body.attribute_position(name).unwrap_or(body.len());
            body.comment_once(at, &lines);
            ctx.warn_at(address, "expression could not be injected", err.to_string());
            false
        }
    }
}

/// Remove an attribute that has no equivalent in the target schema
///
/// Records a warning naming the resource and the attribute when it was
/// present. Comments in front of the attribute stay in place.
pub fn remove_dropped_attribute(
    body: &mut Body,
    name: &str,
    ctx: &mut MigrationContext,
    address: &str,
) -> Option<Attribute> {
    let index = body.attribute_position(name)?;
    let removed = body.remove_at(index)?.into_attribute().ok()?;
    ctx.warn_at(
        address,
        "attribute dropped",
        format!(
            "`{name}` has no equivalent in schema v{} and was removed",
            ctx.target_version()
        ),
    );
    Some(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse;
    use crate::tree::Expression;
    use pretty_assertions::assert_eq;
    use shift_core::VersionPair;

    fn ctx() -> MigrationContext {
        MigrationContext::new(VersionPair::new(4, 5))
    }

    fn resource(src: &str) -> Body {
        parse(src).unwrap().into_body()
    }

    fn body_of(doc: &Body) -> &Body {
        &doc.get_blocks("resource").next().unwrap().body
    }

    fn body_mut(doc: &mut Body) -> &mut Body {
        &mut doc.get_blocks_mut("resource").next().unwrap().body
    }

    #[test]
    fn valid_text_sets_attribute() {
        let mut doc = resource("resource \"acme_zone\" \"a\" {\n  ttl = 1 # minutes\n}\n");
        set_raw_attribute(body_mut(&mut doc), "ttl", "var.ttl * 60").unwrap();
        set_raw_attribute(body_mut(&mut doc), "name", "\"x\"").unwrap();
        assert!(set_raw_attribute(body_mut(&mut doc), "bad name", "1").is_err());
        assert_eq!(body_of(&doc).get_attribute("name").unwrap().value.as_str(), Some("x"));
        assert_eq!(
            doc.to_string(),
            "resource \"acme_zone\" \"a\" {\n  ttl = var.ttl * 60 # minutes\n  name = \"x\"\n}\n"
        );
    }

    #[test]
    fn invalid_text_leaves_placeholder() {
        let mut doc = resource("resource \"acme_zone\" \"a\" {\n  ttl = 1\n}\n");
        let mut ctx = ctx();

        assert!(!inject_expression(body_mut(&mut doc), "ttl", "var.ttl *", &mut ctx, "acme_zone.a"));
        assert!(!inject_expression(body_mut(&mut doc), "ttl", "var.ttl *", &mut ctx, "acme_zone.a"));

        assert_eq!(ctx.diagnostics().warnings(), 2);
        assert_eq!(
            doc.to_string(),
            "resource \"acme_zone\" \"a\" {\n  # shift: set `ttl` by hand, generated expression is invalid\n  # ttl = var.ttl *\n  ttl = 1\n}\n"
        );
    }

    #[test]
    fn invalid_text_for_absent_attribute_comments_at_the_end() {
        let mut doc = resource("resource \"acme_zone\" \"a\" {\n  name = \"n\"\n}\n");
        let mut ctx = ctx();
        assert!(!inject_expression(body_mut(&mut doc), "ttl", "(", &mut ctx, "acme_zone.a"));
        assert_eq!(
            doc.to_string(),
            "resource \"acme_zone\" \"a\" {\n  name = \"n\"\n  # shift: set `ttl` by hand, generated expression is invalid\n  # ttl = (\n}\n"
        );
    }

    #[test]
    fn dropped_attribute_warns() {
        let mut doc = resource("resource \"acme_zone\" \"a\" {\n  # pause switch\n  paused = true\n  name = \"n\"\n}\n");
        let mut ctx = ctx();
        let removed = remove_dropped_attribute(body_mut(&mut doc), "paused", &mut ctx, "acme_zone.a");
        assert_eq!(removed.map(|a| a.value), Some(Expression::from(true)));
        assert!(remove_dropped_attribute(body_mut(&mut doc), "paused", &mut ctx, "acme_zone.a").is_none());
        assert_eq!(ctx.diagnostics().warnings(), 1);
        assert!(ctx.diagnostics().as_slice()[0].detail.contains("schema v5"));
        assert_eq!(
            doc.to_string(),
            "resource \"acme_zone\" \"a\" {\n  # pause switch\n  name = \"n\"\n}\n"
        );
    }
}
