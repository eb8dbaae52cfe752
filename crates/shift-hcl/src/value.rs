//! Values synthesized by rewrites
//!
//! A [`Value`] is laid out as text (objects and non-empty tuples one entry
//! per line, nested one level deeper than the line they start on) and parsed
//! back, so the resulting [`Expression`] carries that layout in its decor.

use hcl_edit::visit_mut::VisitMut;

use crate::error::InvalidExpression;
use crate::parse::parse_expression;
use crate::tree::{is_identifier, Expression};

const INDENT: &str = "  ";

/// Object, tuple or call built from existing expressions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Expr(Expression),
    Object(Vec<(String, Value)>),
    Array(Vec<Value>),
    /// Function call, always written on one line
    Call(String, Vec<Value>),
}

impl Value {
    /// Text of this value starting on a line indented with `indent`
    #[must_use]
    pub fn render(&self, indent: &str) -> String {
        let inner = format!("{indent}{INDENT}");
        match self {
            Self::Object(fields) if !fields.is_empty() => {
                let mut out = String::from("{\n");
                for (key, value) in fields {
                    out.push_str(&inner);
                    out.push_str(&render_key(key));
                    out.push_str(" = ");
                    out.push_str(&value.render(&inner));
                    out.push('\n');
                }
                out.push_str(indent);
                out.push('}');
                out
            }
            Self::Array(items) if !items.is_empty() => {
                let mut out = String::from("[\n");
                for item in items {
                    out.push_str(&inner);
                    out.push_str(&item.render(&inner));
                    out.push_str(",\n");
                }
                out.push_str(indent);
                out.push(']');
                out
            }
            _ => self.render_inline(),
        }
    }

    /// Text of this value on a single line where possible
    #[must_use]
    pub fn render_inline(&self) -> String {
        match self {
            Self::Expr(expr) => expr.to_string().trim().to_string(),
            Self::Object(fields) if fields.is_empty() => "{}".to_string(),
            Self::Object(fields) => {
                let fields: Vec<String> = fields
                    .iter()
                    .map(|(k, v)| format!("{} = {}", render_key(k), v.render_inline()))
                    .collect();
                format!("{{ {} }}", fields.join(", "))
            }
            Self::Array(items) => {
                let items: Vec<String> = items.iter().map(Self::render_inline).collect();
                format!("[{}]", items.join(", "))
            }
            Self::Call(name, args) => {
                let args: Vec<String> = args.iter().map(Self::render_inline).collect();
                format!("{name}({})", args.join(", "))
            }
        }
    }

    /// Parse the multi-line layout into an expression
    ///
    /// # Errors
    /// Returns [`InvalidExpression`] with the rendered text when it does not
    /// parse.
    pub fn to_expression(&self, indent: &str) -> Result<Expression, InvalidExpression> {
        match self {
            Self::Expr(expr) => {
                let mut expr = expr.clone();
                hcl_edit::Decorate::decor_mut(&mut expr).clear();
                Ok(expr)
            }
            _ => parse_expression(&self.render(indent)),
        }
    }

    /// Run `visitor` over every leaf expression
    pub fn visit_leaves(&mut self, visitor: &mut impl VisitMut) {
        match self {
            Self::Expr(expr) => visitor.visit_expr_mut(expr),
            Self::Object(fields) => fields.iter_mut().for_each(|(_, v)| v.visit_leaves(visitor)),
            Self::Array(items) | Self::Call(_, items) => {
                items.iter_mut().for_each(|v| v.visit_leaves(visitor));
            }
        }
    }
}

impl From<Expression> for Value {
    fn from(expr: Expression) -> Self {
        Self::Expr(expr)
    }
}

fn render_key(key: &str) -> String {
    if is_identifier(key) {
        key.to_string()
    } else {
        format!("\"{key}\"")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn expr(text: &str) -> Value {
        Value::Expr(parse_expression(text).unwrap())
    }

    #[test]
    fn renders_nested_layout() {
        let value = Value::Object(vec![
            ("ttl".to_string(), expr("300")),
            ("tags".to_string(), Value::Array(vec![expr("\"a\"")])),
            ("empty".to_string(), Value::Array(vec![])),
        ]);
        assert_eq!(
            value.render("  "),
            "{\n    ttl = 300\n    tags = [\n      \"a\",\n    ]\n    empty = []\n  }"
        );
        let parsed = value.to_expression("  ").unwrap();
        assert_eq!(parsed.to_string(), value.render("  "));
    }

    #[test]
    fn renders_inline() {
        let value = Value::Object(vec![
            ("v".to_string(), expr("item")),
            ("n".to_string(), Value::Array(vec![expr("1"), expr("2")])),
            ("my key".to_string(), expr("null")),
        ]);
        assert_eq!(value.render_inline(), r#"{ v = item, n = [1, 2], "my key" = null }"#);
        assert_eq!(
            Value::Call("concat".to_string(), vec![Value::Array(vec![]), expr("var.xs")]).render_inline(),
            "concat([], var.xs)"
        );
    }

    #[test]
    fn invalid_layout_is_reported_with_text() {
        let value = Value::Array(vec![expr("var.x"), Value::Call("f".to_string(), vec![expr("[for x in var.y : x]")])]);
        assert!(value.to_expression("").is_ok());
        let bad = Value::Call("1f".to_string(), vec![]);
        let err = bad.to_expression("").unwrap_err();
        assert_eq!(err.text, "1f()");
    }
}
