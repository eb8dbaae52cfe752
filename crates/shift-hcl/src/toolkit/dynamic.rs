//! `dynamic` block to `for` comprehension

use hcl_edit::expr::TraversalOperator;
use hcl_edit::visit_mut::{visit_expr_mut, VisitMut};
use hcl_edit::{Decorate, Decorated};

use crate::parse::parse_expression;
use crate::tree::{Block, BlockExt, Body, Expression, Ident, Structure};
use crate::value::Value;

/// A `dynamic` block that cannot be reduced to a comprehension
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("cannot convert dynamic \"{label}\": {reason}")]
pub struct Unreducible {
    /// Label of the offending `dynamic` block
    pub label: String,
    pub reason: String,
    /// Expression that was synthesized but rejected, if any
    pub attempted: Option<String>,
}

impl Unreducible {
    pub(crate) fn new(label: &str, reason: impl Into<String>) -> Self {
        Self {
            label: label.to_string(),
            reason: reason.into(),
            attempted: None,
        }
    }
}

/// Synthesize `[for <it> in <for_each> : { ... }]` from a `dynamic` block
///
/// References to `<it>.value` become `<it>`; references to `<it>.key` bind
/// the comprehension's key variable `<it>_key`. The iterator name is the
/// block label unless an `iterator` argument overrides it.
///
/// # Errors
/// Returns [`Unreducible`] when the block has arguments other than
/// `for_each`, `iterator` and one `content` block, when `content` contains a
/// nested `dynamic` block, when the iterator is used other than through
/// `.key`/`.value`, or when the synthesized text is not a valid expression.
pub fn dynamic_to_comprehension(block: &Block) -> Result<Expression, Unreducible> {
    let label = block.label(0).unwrap_or_default();
    if !block.has_ident("dynamic") || label.is_empty() {
        return Err(Unreducible::new(label, "not a labeled dynamic block"));
    }

    let mut for_each = None;
    let mut iterator = label.to_string();
    let mut content = None;
    for structure in block.body.iter() {
        match structure {
            Structure::Attribute(a) if a.has_key("for_each") => for_each = Some(a.value.clone()),
            Structure::Attribute(a) if a.has_key("iterator") => match &a.value {
                Expression::Variable(name) => iterator = name.as_str().to_string(),
                other => {
                    let text = other.to_string();
                    return Err(Unreducible::new(
                        label,
                        format!("iterator `{}` is not an identifier", text.trim()),
                    ));
                }
            },
            Structure::Attribute(a) => {
                return Err(Unreducible::new(label, format!("unsupported argument `{}`", a.key.as_str())));
            }
            Structure::Block(b) if b.has_ident("content") && content.is_none() => content = Some(b),
            Structure::Block(b) => {
                return Err(Unreducible::new(
                    label,
                    format!("unexpected nested block `{}`", b.ident.as_str()),
                ));
            }
        }
    }
    let for_each = for_each.ok_or_else(|| Unreducible::new(label, "missing for_each"))?;
    let content = content.ok_or_else(|| Unreducible::new(label, "missing content block"))?;

    let fields = body_to_fields(&content.body, false).map_err(|reason| Unreducible::new(label, reason))?;
    let mut object = Value::Object(fields);

    let mut refs = IteratorRefs::new(&iterator);
    object.visit_leaves(&mut refs);
    if let Some(bad) = refs.misuse {
        return Err(Unreducible::new(
            label,
            format!("iterator `{iterator}` used as `{bad}`; only .key and .value can be rewritten"),
        ));
    }

    let bindings = if refs.uses_key {
        format!("{iterator}_key, {iterator}")
    } else {
        iterator.clone()
    };
    let text = format!(
        "[for {bindings} in {} : {}]",
        Value::from(for_each).render_inline(),
        object.render_inline()
    );
    parse_expression(&text).map_err(|err| Unreducible {
        label: label.to_string(),
        reason: err.message,
        attempted: Some(text.clone()),
    })
}

/// Object fields of a block body, converting nested blocks
///
/// A nested block type appearing once becomes an object; repeated or
/// `dynamic` ones become a list expression.
pub(crate) fn body_to_fields(body: &Body, allow_dynamic: bool) -> Result<Vec<(String, Value)>, String> {
    let mut fields = Vec::new();
    let mut done: Vec<&str> = Vec::new();
    for structure in body.iter() {
        match structure {
            Structure::Attribute(a) => fields.push((a.key.as_str().to_string(), Value::from(a.value.clone()))),
            Structure::Block(b) => {
                let name = nested_name(b).ok_or_else(|| "dynamic block has no label".to_string())?;
                if done.contains(&name) {
                    continue;
                }
                done.push(name);

                let group: Vec<&Block> = body
                    .iter()
                    .filter_map(Structure::as_block)
                    .filter(|other| nested_name(other) == Some(name))
                    .collect();
                if !allow_dynamic && group.iter().any(|g| g.has_ident("dynamic")) {
                    return Err(format!("nested dynamic \"{name}\" block"));
                }
                let value = match group.as_slice() {
                    [single] if !single.has_ident("dynamic") => {
                        Value::Object(body_to_fields(&single.body, allow_dynamic)?)
                    }
                    _ => repeated_expr(&group).map_err(|u| u.to_string())?,
                };
                fields.push((name.to_string(), value));
            }
        }
    }
    Ok(fields)
}

/// Name a nested block contributes to its parent object
pub(crate) fn nested_name(block: &Block) -> Option<&str> {
    if block.has_ident("dynamic") {
        block.label(0)
    } else {
        Some(block.ident.as_str())
    }
}

/// List value for a group of static and `dynamic` blocks in source order
///
/// Consecutive static blocks form one tuple; a mix of tuples and
/// comprehensions is joined with `concat`.
pub(crate) fn repeated_expr(blocks: &[&Block]) -> Result<Value, Unreducible> {
    let mut parts: Vec<Value> = Vec::new();
    let mut statics: Vec<Value> = Vec::new();
    for block in blocks {
        if block.has_ident("dynamic") {
            if !statics.is_empty() {
                parts.push(Value::Array(std::mem::take(&mut statics)));
            }
            parts.push(Value::from(dynamic_to_comprehension(block)?));
        } else {
            let fields = body_to_fields(&block.body, true)
                .map_err(|reason| Unreducible::new(block.ident.as_str(), reason))?;
            statics.push(Value::Object(fields));
        }
    }
    if !statics.is_empty() {
        parts.push(Value::Array(statics));
    }

    if parts.len() == 1 {
        return Ok(parts.remove(0));
    }
    Ok(Value::Call("concat".to_string(), parts))
}

/// Rewrites `<it>.value` to `<it>` and `<it>.key` to `<it>_key`, recording
/// the first other use of the iterator
struct IteratorRefs<'a> {
    iterator: &'a str,
    uses_key: bool,
    misuse: Option<String>,
}

impl<'a> IteratorRefs<'a> {
    fn new(iterator: &'a str) -> Self {
        Self {
            iterator,
            uses_key: false,
            misuse: None,
        }
    }

    fn record_misuse(&mut self, text: String) {
        if self.misuse.is_none() {
            self.misuse = Some(text);
        }
    }

    fn is_iterator(&self, expr: &Expression) -> bool {
        matches!(expr, Expression::Variable(var) if var.as_str() == self.iterator)
    }
}

impl VisitMut for IteratorRefs<'_> {
    fn visit_expr_mut(&mut self, expr: &mut Expression) {
        if self.is_iterator(expr) {
            self.record_misuse(self.iterator.to_string());
            return;
        }
        let Expression::Traversal(traversal) = expr else {
            visit_expr_mut(self, expr);
            return;
        };
        if !self.is_iterator(&traversal.expr) {
            visit_expr_mut(self, expr);
            return;
        }

        let member = match traversal.operators.first().map(|op| op.value()) {
            Some(TraversalOperator::GetAttr(attr)) => attr.as_str().to_string(),
            _ => {
                self.record_misuse(self.iterator.to_string());
                return;
            }
        };
        match member.as_str() {
            "value" => {}
            "key" => {
                self.uses_key = true;
                let key = Ident::new_sanitized(format!("{}_key", self.iterator));
                traversal.expr = Expression::Variable(Decorated::new(key));
            }
            other => {
                self.record_misuse(format!("{}.{other}", self.iterator));
                return;
            }
        }
        traversal.operators.remove(0);
        for operator in &mut traversal.operators {
            self.visit_traversal_operator_mut(operator);
        }

        if traversal.operators.is_empty() {
            let decor = traversal.decor().clone();
            let mut root = std::mem::replace(&mut traversal.expr, Expression::null());
            *root.decor_mut() = decor;
            *expr = root;
        }
    }
}
