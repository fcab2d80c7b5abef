//! Subquery Flattening Module
//!
//! Two rewrites that remove one level of query nesting:
//!
//! - [`optimize_join_source`]: a join whose inner sequence is an *identity*
//!   subquery with no result operators iterates exactly the subquery's own
//!   source, so the subquery wrapper is dropped and the join reads the
//!   source directly.
//! - [`flatten_subquery`]: a from clause (main or additional) whose source
//!   is a subquery is merged with the inner model — the clause adopts the
//!   inner source, the inner body clauses are spliced in at the point where
//!   the subquery executed, and every reference in the outer model is
//!   rewritten to stay consistent.
//!
//! Both rules optimize the inner model first (bottom-up) and evaluate their
//! safety guard before any mutation: on guard failure the outer model is
//! left completely unmodified.

use tracing::debug;

use crate::annotations::AnnotationTable;
use crate::error::{Error, Result};
use crate::expressions::Expression;
use crate::model::{BodyClause, MainFromClause, QueryModel, SourceId};
use crate::rewriter::{replace_model_references, RewriteOptions, SourceMapping};

use super::optimizer::visit_query_model;

/// Addresses the from clause a flatten operates on: the main from clause,
/// or an additional from clause at a body-clause index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlattenTarget {
    MainFrom,
    Body(usize),
}

impl FlattenTarget {
    /// Where the inner model's body clauses are spliced in: before all body
    /// clauses for the main from, directly after the target clause
    /// otherwise — they must execute exactly where the subquery previously
    /// executed.
    fn insertion_index(self) -> usize {
        match self {
            FlattenTarget::MainFrom => 0,
            FlattenTarget::Body(index) => index + 1,
        }
    }
}

/// Replace a join's identity-subquery inner sequence with the subquery's
/// own source.
///
/// The inner model is recursively optimized first; the replacement then
/// applies only if the simplified inner model is an identity query
/// (`from x in S select x`) with no result operators — a pure pass-through
/// denoting exactly `S`. Annotations keyed to the inner main from clause
/// are re-pointed at the join clause, which now plays that role.
///
/// # Arguments
/// * `model` - The enclosing model
/// * `index` - Body-clause index of the join clause
/// * `annotations` - Annotation table updated on replacement
pub fn optimize_join_source(
    model: &mut QueryModel,
    index: usize,
    annotations: &mut AnnotationTable,
) -> Result<()> {
    let join = match model.body_clauses.get_mut(index) {
        Some(BodyClause::Join(join)) => join,
        _ => {
            return Err(Error::precondition(format!(
                "body clause {index} is not a join clause"
            )))
        }
    };
    let join_id = join.id;

    let eliminated = {
        let inner = match &mut join.inner_sequence {
            Expression::SubQuery(inner) => inner,
            _ => return Ok(()),
        };
        visit_query_model(inner, annotations)?;

        if inner.is_identity_query() && inner.result_operators.is_empty() {
            Some((inner.main_from.id, inner.main_from.from_expression.clone()))
        } else {
            None
        }
    };

    if let Some((inner_main_id, source_expression)) = eliminated {
        join.inner_sequence = source_expression;
        annotations.repoint_source(inner_main_id, join_id);
        debug!(join = %join_id, source = %inner_main_id, "eliminated identity subquery in join source");
    }

    Ok(())
}

/// Flatten the subquery in `target`'s from expression into `model`.
///
/// The inner model is recursively optimized first. The flatten then applies
/// only under the safety guard: every inner result operator is a type
/// filter (`OfType`) and the inner body contains no order-by clause. Any
/// other operator or an explicit ordering changes which elements survive,
/// how many, or their order — flattening would silently drop that
/// semantics, so it is refused and the outer model is left untouched.
///
/// On success the six-step splice runs:
/// 1. the target clause adopts the inner main from clause's source
///    declaration (keeping its own identity);
/// 2. references to the target clause anywhere in the outer model are
///    replaced by the inner projection — consumers expected the subquery's
///    projected value, not the raw adopted source;
/// 3. the inner body clauses are spliced in at the insertion point;
/// 4. references to the inner main from clause are redirected to the
///    target clause that replaced it;
/// 5. the inner type-filter operators are prepended to the outer operator
///    sequence, preserving their relative order;
/// 6. annotations keyed to the inner main from clause are re-pointed to the
///    target clause and the outer model.
///
/// Only annotations keyed to the inner main from clause are re-pointed:
/// that is the one clause the splice dissolves. Inner body clauses keep
/// their identity when spliced, so annotations keyed to them keep their
/// recorded handles.
pub fn flatten_subquery(
    model: &mut QueryModel,
    target: FlattenTarget,
    annotations: &mut AnnotationTable,
) -> Result<()> {
    // Optimize the inner model and evaluate the guard before touching the
    // outer model.
    {
        let inner = match target_from_expression_mut(model, target)? {
            Expression::SubQuery(inner) => inner,
            _ => {
                return Err(Error::precondition(
                    "flatten target's from expression is not a subquery",
                ))
            }
        };
        visit_query_model(inner, annotations)?;

        if inner.result_operators.iter().any(|op| !op.is_type_filter())
            || inner.body_clauses.iter().any(BodyClause::is_order_by)
        {
            debug!(inner = %inner.id, "subquery not flattened: guard rejected");
            return Ok(());
        }
    }

    // Commit: detach the inner model and splice it in.
    let inner = match std::mem::replace(
        target_from_expression_mut(model, target)?,
        Expression::null(),
    ) {
        Expression::SubQuery(inner) => *inner,
        _ => unreachable!("guard phase verified the target holds a subquery"),
    };

    let target_id = target_source_id(model, target)?;
    let inner_main_id = inner.main_from.id;
    let options = RewriteOptions {
        error_on_unmapped: false,
        rewrite_subqueries: true,
    };

    // 1. The target clause now directly iterates what the inner main from
    //    clause iterated.
    adopt_inner_source(model, target, &inner.main_from)?;

    // 2. "the subquery's projected value" now reads "the value of the
    //    spliced-in clause".
    let mut selector_mapping = SourceMapping::new();
    selector_mapping.insert(target_id, inner.select.selector);
    replace_model_references(model, &selector_mapping, options)?;

    // 3. Splice the inner body clauses, preserving their relative order.
    let insertion_index = target.insertion_index();
    for (offset, clause) in inner.body_clauses.into_iter().enumerate() {
        model.body_clauses.insert(insertion_index + offset, clause);
    }

    // 4. Spliced clauses referenced the inner main from clause; the target
    //    clause replaced it.
    let mut source_mapping = SourceMapping::new();
    source_mapping.insert(inner_main_id, Expression::source_ref(target_id));
    replace_model_references(model, &source_mapping, options)?;

    // 5. Reverse insertion at the front keeps the inner operators' relative
    //    order, ahead of any outer operators existing at the splice point.
    for op in inner.result_operators.into_iter().rev() {
        model.result_operators.insert(0, op);
    }

    // 6.
    annotations.repoint(inner_main_id, target_id, model.id);

    debug!(
        model = %model.id,
        target = %target_id,
        source = %inner_main_id,
        "flattened subquery into enclosing model"
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// Target addressing helpers
// ---------------------------------------------------------------------------

fn target_from_expression_mut(
    model: &mut QueryModel,
    target: FlattenTarget,
) -> Result<&mut Expression> {
    match target {
        FlattenTarget::MainFrom => Ok(&mut model.main_from.from_expression),
        FlattenTarget::Body(index) => match model.body_clauses.get_mut(index) {
            Some(BodyClause::AdditionalFrom(clause)) => Ok(&mut clause.from_expression),
            _ => Err(Error::precondition(format!(
                "body clause {index} is not an additional from clause"
            ))),
        },
    }
}

fn target_source_id(model: &QueryModel, target: FlattenTarget) -> Result<SourceId> {
    match target {
        FlattenTarget::MainFrom => Ok(model.main_from.id),
        FlattenTarget::Body(index) => match model.body_clauses.get(index) {
            Some(BodyClause::AdditionalFrom(clause)) => Ok(clause.id),
            _ => Err(Error::precondition(format!(
                "body clause {index} is not an additional from clause"
            ))),
        },
    }
}

fn adopt_inner_source(
    model: &mut QueryModel,
    target: FlattenTarget,
    donor: &MainFromClause,
) -> Result<()> {
    match target {
        FlattenTarget::MainFrom => {
            model.main_from.adopt_source(donor);
            Ok(())
        }
        FlattenTarget::Body(index) => match model.body_clauses.get_mut(index) {
            Some(BodyClause::AdditionalFrom(clause)) => {
                clause.adopt_source(donor);
                Ok(())
            }
            _ => Err(Error::precondition(format!(
                "body clause {index} is not an additional from clause"
            ))),
        },
    }
}
