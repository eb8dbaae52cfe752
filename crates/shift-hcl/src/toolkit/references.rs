//! Cross-reference rewriting for attribute renames and resource moves
//!
//! References are traversals rooted at a resource type
//! (`<type>.<name>[index].<attr>`) or at `data`
//! (`data.<type>.<name>[index].<attr>`). Index expressions are rewritten as
//! well, so references nested inside another reference's index are found.
//! String literals and comments are not expressions and are never touched.

use hcl_edit::expr::{Traversal, TraversalOperator};
use hcl_edit::structure::Block;
use hcl_edit::visit_mut::{visit_block_mut, visit_expr_mut, VisitMut};
use hcl_edit::{Decorate, Decorated};
use shift_core::RenameTable;

use crate::parse::parse_expression;
use crate::tree::{Body, Expression, Ident};

/// Rewrite references in one expression's text
///
/// Returns the new text and the number of references rewritten. Text that
/// is not a single expression is returned unchanged.
#[must_use]
pub fn rewrite_expression(text: &str, renames: &RenameTable) -> (String, usize) {
    let Ok(mut expr) = parse_expression(text) else {
        return (text.to_string(), 0);
    };
    let mut rewriter = Rewriter::new(renames);
    rewriter.visit_expr_mut(&mut expr);
    if rewriter.count == 0 {
        return (text.to_string(), 0);
    }
    (expr.to_string(), rewriter.count)
}

/// Rewrite references in every expression of a body, recursively
///
/// `moved` blocks are left alone: their `from` must keep naming the old
/// address. Returns the number of references rewritten.
pub fn rewrite_references(body: &mut Body, renames: &RenameTable) -> usize {
    if renames.is_empty() {
        return 0;
    }
    let mut rewriter = Rewriter::new(renames);
    rewriter.visit_body_mut(body);
    tracing::trace!(rewritten = rewriter.count, "rewrote references");
    rewriter.count
}

struct Rewriter<'a> {
    renames: &'a RenameTable,
    count: usize,
}

impl<'a> Rewriter<'a> {
    fn new(renames: &'a RenameTable) -> Self {
        Self { renames, count: 0 }
    }

    fn rewrite(&mut self, traversal: &mut Traversal) {
        let Expression::Variable(root) = &traversal.expr else {
            return;
        };
        let data = root.as_str() == "data";
        let type_at = usize::from(data);
        let resource_type = if data {
            match get_attr(&traversal.operators, 0) {
                Some(ty) => ty.to_string(),
                None => return,
            }
        } else {
            root.as_str().to_string()
        };
        let Some(name) = get_attr(&traversal.operators, type_at).map(str::to_string) else {
            return;
        };
        let mut attr_at = type_at + 1;
        if matches!(
            traversal.operators.get(attr_at).map(|op| op.value()),
            Some(TraversalOperator::Index(_) | TraversalOperator::LegacyIndex(_))
        ) {
            attr_at += 1;
        }

        let moved = self.renames.moved_to(data, &resource_type, &name).map(str::to_string);
        if let Some(new_type) = &moved {
            let ident = Ident::new_sanitized(new_type);
            if data {
                if let Some(op) = traversal.operators.get_mut(0) {
                    set_attr(op, ident);
                }
            } else if let Expression::Variable(root) = &mut traversal.expr {
                set_ident(root, ident);
            }
            self.count += 1;
        }

        let Some(old) = get_attr(&traversal.operators, attr_at).map(str::to_string) else {
            return;
        };
        let renamed = self
            .renames
            .get(&resource_type, &old)
            .or_else(|| moved.as_deref().and_then(|ty| self.renames.get(ty, &old)))
            .map(str::to_string);
        if let (Some(new), Some(op)) = (renamed, traversal.operators.get_mut(attr_at)) {
            set_attr(op, Ident::new_sanitized(new));
            self.count += 1;
        }
    }
}

impl VisitMut for Rewriter<'_> {
    fn visit_block_mut(&mut self, block: &mut Block) {
        if !block.has_ident("moved") {
            visit_block_mut(self, block);
        }
    }

    fn visit_expr_mut(&mut self, expr: &mut Expression) {
        if let Expression::Traversal(traversal) = expr {
            self.rewrite(traversal);
        }
        visit_expr_mut(self, expr);
    }
}

fn get_attr(operators: &[Decorated<TraversalOperator>], index: usize) -> Option<&str> {
    match operators.get(index).map(|op| op.value()) {
        Some(TraversalOperator::GetAttr(ident)) => Some(ident.as_str()),
        _ => None,
    }
}

fn set_attr(operator: &mut Decorated<TraversalOperator>, ident: Ident) {
    if let TraversalOperator::GetAttr(attr) = operator.value_mut() {
        set_ident(attr, ident);
    }
}

fn set_ident(target: &mut Decorated<Ident>, ident: Ident) {
    let decor = target.decor().clone();
    *target = Decorated::new(ident);
    *target.decor_mut() = decor;
}
