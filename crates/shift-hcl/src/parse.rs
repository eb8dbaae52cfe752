//! Parsing configuration text and expressions

use hcl_edit::Decorate;

use crate::document::{normalize, Document, LineEnding};
use crate::error::{HclError, InvalidExpression, Result};
use crate::tree::Expression;

/// Parse a configuration file
///
/// # Errors
/// Returns [`HclError::Syntax`] with the 1-based position of the first
/// grammar violation.
pub fn parse(src: &str) -> Result<Document> {
    let line_ending = LineEnding::detect(src);
    let text = normalize(src);
    let body = hcl_edit::parser::parse_body(&text).map_err(HclError::from)?;
    tracing::trace!(structures = body.len(), ?line_ending, "parsed configuration body");
    Ok(Document::new(body).with_line_ending(line_ending))
}

/// Parse one expression, without surrounding decor
///
/// The expression keeps the layout of `text`, so a multi-line object stays
/// multi-line when it is placed into a body.
///
/// # Errors
/// Returns [`InvalidExpression`] carrying the grammar's message.
pub fn parse_expression(text: &str) -> std::result::Result<Expression, InvalidExpression> {
    let mut expr = hcl_edit::parser::parse_expr(text.trim())
        .map_err(|err| InvalidExpression::new(text, err.message()))?;
    expr.decor_mut().clear();
    Ok(expr)
}

/// Check that `text` is a single valid expression
///
/// # Errors
/// Returns [`InvalidExpression`] carrying the grammar's message.
pub fn validate_expression(text: &str) -> std::result::Result<(), InvalidExpression> {
    parse_expression(text).map(|_| ())
}
