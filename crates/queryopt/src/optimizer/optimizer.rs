//! Optimizer Orchestration Module
//!
//! This module provides the main entry point for query-model optimization,
//! coordinating the rewrite passes in a single depth-first traversal.
//!
//! # Traversal order
//!
//! For one model, the driver visits the main from clause, then each body
//! clause in order, then each result operator in order. Nested models are
//! optimized *inside* the flatten passes, before the enclosing splice
//! decision is evaluated, so flattening opportunities resolve bottom-up and
//! each guard sees an already-simplified inner model.
//!
//! The pass is synchronous, single-threaded, and idempotent: a second run
//! over an optimized model finds no further applicable rewrite.

use tracing::trace;

use crate::annotations::AnnotationTable;
use crate::error::Result;
use crate::model::{BodyClause, QueryModel};

use super::elide_orderings::elide_redundant_orderings;
use super::flatten_subqueries::{flatten_subquery, optimize_join_source, FlattenTarget};

/// Optimize `model` in place, updating `annotations` so every annotation
/// still locates its result operator afterwards.
///
/// The optimizer assumes exclusive access to both the model and the table
/// for the duration of the pass.
///
/// # Arguments
/// * `model` - The fully-parsed query model to simplify
/// * `annotations` - Result-operator annotations populated by the front-end
///
/// # Returns
/// `Ok(())` on success; rewrite rules whose guards fail simply leave the
/// model unchanged and are not errors.
pub fn optimize(model: &mut QueryModel, annotations: &mut AnnotationTable) -> Result<()> {
    trace!(model = %model.id, "optimizing query model");
    visit_query_model(model, annotations)
}

/// One depth-first visit of a model. Also invoked by the flatten passes for
/// nested models.
pub(crate) fn visit_query_model(
    model: &mut QueryModel,
    annotations: &mut AnnotationTable,
) -> Result<()> {
    if model.main_from.from_expression.is_subquery() {
        flatten_subquery(model, FlattenTarget::MainFrom, annotations)?;
    }

    // Manual index loop: a flatten splices clauses into the body, so the
    // clause count can grow while we walk it. Spliced clauses come from an
    // already-optimized inner model, so revisiting them is a no-op.
    let mut index = 0;
    while index < model.body_clauses.len() {
        let flattenable_from = matches!(
            &model.body_clauses[index],
            BodyClause::AdditionalFrom(clause) if clause.from_expression.is_subquery()
        );
        if flattenable_from {
            flatten_subquery(model, FlattenTarget::Body(index), annotations)?;
        } else if matches!(model.body_clauses[index], BodyClause::Join(_)) {
            optimize_join_source(model, index, annotations)?;
        }
        index += 1;
    }

    for index in 0..model.result_operators.len() {
        elide_redundant_orderings(model, index)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::*;
    use crate::result_operators::ResultOperator;

    #[test]
    fn test_optimize_noop_on_plain_model() {
        let b = from_collection("x", "Order", "orders");
        let x = b.source_id();
        let mut model = b
            .where_(gt(member(source(x), "Total"), int(10)))
            .select(member(source(x), "Total"))
            .build();
        let snapshot = model.clone();
        let mut annotations = AnnotationTable::new();

        optimize(&mut model, &mut annotations).unwrap();

        assert_eq!(model, snapshot);
        assert!(annotations.is_empty());
    }

    #[test]
    fn test_optimize_is_idempotent() {
        // from y in (from x in orders select x.Total) select y, .Count()
        let inner_b = from_collection("x", "Order", "orders");
        let x = inner_b.source_id();
        let inner = inner_b.select(member(source(x), "Total")).build();

        let mut model = from_source("y", "Decimal", crate::expressions::Expression::subquery(inner))
            .operator(ResultOperator::Count)
            .build();
        let mut annotations = AnnotationTable::new();

        optimize(&mut model, &mut annotations).unwrap();
        let once = model.clone();
        optimize(&mut model, &mut annotations).unwrap();

        assert_eq!(model, once);
    }
}
