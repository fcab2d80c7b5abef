//! Fluent query-model construction.
//!
//! Provides a programmatic way to build [`QueryModel`] trees without
//! spelling every struct literal. Front-ends that lower a parsed query into
//! the IR, and this crate's own tests, are the intended consumers.
//!
//! # Examples
//!
//! ```
//! use queryopt::builder::*;
//! use queryopt::result_operators::ResultOperator;
//!
//! // from x in orders where x.Total > 10 orderby x.Date select x.Total, then .Count()
//! let b = from_collection("x", "Order", "orders");
//! let x = b.source_id();
//! let model = b
//!     .where_(gt(member(source(x), "Total"), int(10)))
//!     .order_by_asc(member(source(x), "Date"))
//!     .select(member(source(x), "Total"))
//!     .operator(ResultOperator::Count)
//!     .build();
//!
//! assert_eq!(model.body_clauses.len(), 2);
//! ```

use crate::expressions::{BinaryOperator, Expression, TypeRef};
use crate::model::{
    AdditionalFromClause, BodyClause, JoinClause, MainFromClause, OrderByClause, Ordering,
    OrderingDirection, QueryModel, SelectClause, SourceId, WhereClause,
};
use crate::result_operators::ResultOperator;

// ---------------------------------------------------------------------------
// Expression helpers
// ---------------------------------------------------------------------------

/// Reference a query source.
pub fn source(id: SourceId) -> Expression {
    Expression::source_ref(id)
}

/// Member access on `target`.
pub fn member(target: Expression, name: &str) -> Expression {
    Expression::member(target, name)
}

/// Integer constant.
pub fn int(value: i64) -> Expression {
    Expression::int(value)
}

/// Equality comparison.
pub fn eq(left: Expression, right: Expression) -> Expression {
    Expression::binary(BinaryOperator::Eq, left, right)
}

/// Greater-than comparison.
pub fn gt(left: Expression, right: Expression) -> Expression {
    Expression::binary(BinaryOperator::Gt, left, right)
}

/// Boolean conjunction.
pub fn and(left: Expression, right: Expression) -> Expression {
    Expression::binary(BinaryOperator::And, left, right)
}

/// Free function call.
pub fn call(name: &str, args: Vec<Expression>) -> Expression {
    Expression::call(name, args)
}

// ---------------------------------------------------------------------------
// Query starters
// ---------------------------------------------------------------------------

/// Start a model iterating a named root collection:
/// `from <item_name> in <collection>`.
pub fn from_collection(item_name: &str, item_type: &str, collection: &str) -> QueryModelBuilder {
    from_source(item_name, item_type, Expression::collection(collection))
}

/// Start a model iterating an arbitrary source expression (e.g. a subquery).
pub fn from_source(
    item_name: &str,
    item_type: &str,
    from_expression: Expression,
) -> QueryModelBuilder {
    QueryModelBuilder {
        main_from: MainFromClause::new(item_name, TypeRef::new(item_type), from_expression),
        body_clauses: Vec::new(),
        selector: None,
        result_operators: Vec::new(),
    }
}

/// Fluent builder for a [`QueryModel`].
///
/// The main from clause is allocated up front so that [`source_id`]
/// (and therefore references to the bound range variable) is available
/// while the rest of the model is being described. When no selector is
/// given, [`build`] defaults to the identity projection.
///
/// [`source_id`]: QueryModelBuilder::source_id
/// [`build`]: QueryModelBuilder::build
#[derive(Debug)]
pub struct QueryModelBuilder {
    main_from: MainFromClause,
    body_clauses: Vec<BodyClause>,
    selector: Option<Expression>,
    result_operators: Vec<ResultOperator>,
}

impl QueryModelBuilder {
    /// The id of the main from clause's bound variable.
    pub fn source_id(&self) -> SourceId {
        self.main_from.id
    }

    /// Append a `where` clause.
    pub fn where_(mut self, predicate: Expression) -> Self {
        self.body_clauses
            .push(BodyClause::Where(WhereClause { predicate }));
        self
    }

    /// Append an ascending single-key `orderby` clause.
    pub fn order_by_asc(self, key: Expression) -> Self {
        self.order_by(vec![Ordering {
            expression: key,
            direction: OrderingDirection::Asc,
        }])
    }

    /// Append an `orderby` clause with the given orderings.
    pub fn order_by(mut self, orderings: Vec<Ordering>) -> Self {
        self.body_clauses
            .push(BodyClause::OrderBy(OrderByClause { orderings }));
        self
    }

    /// Append a join clause (construct it with [`JoinClause::new`] so its
    /// source id can be referenced).
    pub fn join(mut self, join: JoinClause) -> Self {
        self.body_clauses.push(BodyClause::Join(join));
        self
    }

    /// Append an additional from clause.
    pub fn additional_from(mut self, clause: AdditionalFromClause) -> Self {
        self.body_clauses.push(BodyClause::AdditionalFrom(clause));
        self
    }

    /// Set the projection.
    pub fn select(mut self, selector: Expression) -> Self {
        self.selector = Some(selector);
        self
    }

    /// Append a result operator.
    pub fn operator(mut self, op: ResultOperator) -> Self {
        self.result_operators.push(op);
        self
    }

    /// Build the model. Without an explicit selector the projection is the
    /// identity `select <item_name>`.
    pub fn build(self) -> QueryModel {
        let selector = self
            .selector
            .unwrap_or(Expression::SourceRef(self.main_from.id));
        let mut model = QueryModel::new(self.main_from, SelectClause { selector });
        model.body_clauses = self.body_clauses;
        model.result_operators = self.result_operators;
        model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_selector_is_identity() {
        let model = from_collection("x", "Order", "orders").build();
        assert!(model.is_identity_query());
    }

    #[test]
    fn test_builder_orders_body_clauses() {
        let b = from_collection("x", "Order", "orders");
        let x = b.source_id();
        let model = b
            .where_(gt(member(source(x), "Total"), int(10)))
            .order_by_asc(member(source(x), "Date"))
            .build();

        assert!(matches!(model.body_clauses[0], BodyClause::Where(_)));
        assert!(matches!(model.body_clauses[1], BodyClause::OrderBy(_)));
    }
}
