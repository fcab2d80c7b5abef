//! Redundant-Ordering Elision Module
//!
//! An aggregate/count/distinct-style consumer is insensitive to input
//! ordering, so sorting beforehand is pure overhead with no observable
//! effect. This pass removes every order-by clause from a model when the
//! visited result operator cannot observe element order.
//!
//! Two exclusions keep the rewrite safe:
//! - choice operators (First/Single/Any) may depend on element order for
//!   *which* element is returned;
//! - a windowing operator (Take/Skip) anywhere in the operator sequence
//!   makes earlier ordering observable, because it determines which
//!   elements the window keeps.

use tracing::debug;

use crate::error::{Error, Result};
use crate::model::QueryModel;

/// Remove every order-by body clause of `model` if the result operator at
/// `operator_index` is an order-insensitive value-from-sequence consumer
/// and no windowing operator exists anywhere in the model.
///
/// Invoked once per result operator in traversal order; each invocation
/// re-evaluates the conditions independently, so an ordering that precedes
/// a windowing operator is never removed.
///
/// # Arguments
/// * `model` - The model being visited
/// * `operator_index` - Index of the result operator currently visited
///
/// # Returns
/// `Err(Error::Precondition)` if `operator_index` is out of range.
pub fn elide_redundant_orderings(model: &mut QueryModel, operator_index: usize) -> Result<()> {
    let operator = model.result_operators.get(operator_index).ok_or_else(|| {
        Error::precondition(format!(
            "result operator index {operator_index} out of range"
        ))
    })?;

    if !operator.is_value_from_sequence() || operator.is_choice() {
        return Ok(());
    }
    if model.result_operators.iter().any(|op| op.is_windowing()) {
        return Ok(());
    }

    // Scan from the end so removal does not perturb indices of
    // not-yet-visited clauses.
    let mut removed = 0usize;
    for index in (0..model.body_clauses.len()).rev() {
        if model.body_clauses[index].is_order_by() {
            model.body_clauses.remove(index);
            removed += 1;
        }
    }

    if removed > 0 {
        debug!(model = %model.id, removed, "removed redundant order-by clauses");
    }
    Ok(())
}
