//! The reference rewriter.
//!
//! Substitutes every [`Expression::SourceRef`] matching a mapped source with
//! the corresponding replacement expression, structurally, throughout an
//! expression tree or a whole model. This is the workhorse behind the
//! subquery flattener: once a clause is relocated or replaced, every
//! reference to it elsewhere in the model must be rewritten in the same
//! pass, or the tree is left with dangling identities.
//!
//! The rewrite has no side effects beyond the returned tree; callers decide
//! whether to install the result back into the model.

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::expressions::Expression;
use crate::model::{QueryModel, SourceId};

/// Mapping from a query source to the expression that replaces references
/// to it.
pub type SourceMapping = HashMap<SourceId, Expression>;

/// Options controlling a reference rewrite.
#[derive(Debug, Clone, Copy, Default)]
pub struct RewriteOptions {
    /// When `true`, a `SourceRef` whose id is not in the mapping is an
    /// error. When `false` (default), unmapped references are left intact.
    pub error_on_unmapped: bool,
    /// When `true`, the mapping is also applied inside embedded subquery
    /// models. Off by default: nested models have independent scope, and
    /// only a caller that knows outer references may leak inward (the
    /// flattener) should opt in.
    pub rewrite_subqueries: bool,
}

/// Replace source references throughout `expr` according to `mapping`.
///
/// Replacement is structural substitution, not evaluation: the mapped
/// expression is cloned in wherever a matching reference occurs.
///
/// # Arguments
/// * `expr` - The expression to rewrite (consumed)
/// * `mapping` - Source-to-replacement mapping
/// * `options` - Unmapped-reference and subquery-recursion behavior
///
/// # Returns
/// The rewritten expression, or [`Error::UnmappedSourceReference`] if an
/// unmapped reference is found under `error_on_unmapped`.
pub fn replace_source_references(
    expr: Expression,
    mapping: &SourceMapping,
    options: RewriteOptions,
) -> Result<Expression> {
    match expr {
        Expression::SourceRef(id) => match mapping.get(&id) {
            Some(replacement) => Ok(replacement.clone()),
            None if options.error_on_unmapped => Err(Error::unmapped(id)),
            None => Ok(Expression::SourceRef(id)),
        },
        Expression::Member(mut m) => {
            m.target = replace_source_references(m.target, mapping, options)?;
            Ok(Expression::Member(m))
        }
        Expression::Binary(mut b) => {
            b.left = replace_source_references(b.left, mapping, options)?;
            b.right = replace_source_references(b.right, mapping, options)?;
            Ok(Expression::Binary(b))
        }
        Expression::Not(inner) => {
            let inner = replace_source_references(*inner, mapping, options)?;
            Ok(Expression::Not(Box::new(inner)))
        }
        Expression::Call(mut c) => {
            for arg in &mut c.args {
                let taken = std::mem::replace(arg, Expression::null());
                *arg = replace_source_references(taken, mapping, options)?;
            }
            Ok(Expression::Call(c))
        }
        Expression::SubQuery(mut model) => {
            if options.rewrite_subqueries {
                model.transform_expressions(&mut |e| {
                    replace_source_references(e, mapping, options)
                })?;
            }
            Ok(Expression::SubQuery(model))
        }
        other @ (Expression::Constant(_) | Expression::Collection(_)) => Ok(other),
    }
}

/// Apply [`replace_source_references`] to every expression-bearing site of
/// `model`, in place.
///
/// The rewrite runs over a scratch copy that replaces `model` only on
/// success, so a strict rewrite (`error_on_unmapped`) that fails partway
/// through leaves the model exactly as it was.
pub fn replace_model_references(
    model: &mut QueryModel,
    mapping: &SourceMapping,
    options: RewriteOptions,
) -> Result<()> {
    let mut rewritten = model.clone();
    rewritten.transform_expressions(&mut |e| replace_source_references(e, mapping, options))?;
    *model = rewritten;
    Ok(())
}
