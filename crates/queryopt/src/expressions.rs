//! Query expression trees.
//!
//! This module defines the expression nodes that appear inside a
//! [`QueryModel`](crate::model::QueryModel): filter predicates, join key
//! selectors, ordering keys, and select projections.
//!
//! # Architecture
//!
//! The central type is [`Expression`], a tagged enum with one variant per
//! expression kind. Non-trivial variants box their payload to keep the enum
//! small. Two variants are special:
//!
//! - [`Expression::SourceRef`] is a *non-owning* back-reference to a query
//!   source (a from clause or join clause) by its stable [`SourceId`]. The
//!   same source may be referenced from many places; rewrites that remove or
//!   replace a source must update every reference (see
//!   [`rewriter`](crate::rewriter)).
//! - [`Expression::SubQuery`] embeds a whole nested [`QueryModel`] as a
//!   value, e.g. a subquery used as a join's inner sequence or inside a
//!   filter. Nested models have their own scope.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::model::{QueryModel, SourceId};

/// A named element type, e.g. the entity type bound by a from clause or the
/// target of an `OfType` result operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeRef(pub String);

impl TypeRef {
    pub fn new(name: impl Into<String>) -> Self {
        TypeRef(name.into())
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Constant values appearing in query expressions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

/// A queryable root collection (an entity set or table the query iterates).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionRef {
    pub name: String,
}

/// Member (property/field) access on a target expression, e.g. `x.Key`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
    pub target: Expression,
    pub name: String,
}

/// Binary operators used in predicates and arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinaryOperator {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Add,
    Sub,
    Mul,
    Div,
    And,
    Or,
}

/// A binary operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Binary {
    pub op: BinaryOperator,
    pub left: Expression,
    pub right: Expression,
}

/// A free function call, e.g. `Lower(x.Name)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Call {
    pub name: String,
    pub args: Vec<Expression>,
}

/// A single query expression node.
///
/// Expressions form an owned tree with two kinds of cross-model edges:
/// `SourceRef` points *out* of the tree at a query source by handle, and
/// `SubQuery` embeds an independent nested model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expression {
    /// Constant literal value.
    Constant(Value),
    /// A queryable root collection.
    Collection(CollectionRef),
    /// Non-owning reference to a query source by identity.
    SourceRef(SourceId),
    /// Member access on a target expression.
    Member(Box<Member>),
    /// Binary operation.
    Binary(Box<Binary>),
    /// Boolean negation.
    Not(Box<Expression>),
    /// Free function call.
    Call(Box<Call>),
    /// A nested query model used as a value.
    SubQuery(Box<QueryModel>),
}

impl Expression {
    /// Create a null constant.
    pub fn null() -> Self {
        Expression::Constant(Value::Null)
    }

    /// Create an integer constant.
    pub fn int(value: i64) -> Self {
        Expression::Constant(Value::Int(value))
    }

    /// Create a string constant.
    pub fn string(value: impl Into<String>) -> Self {
        Expression::Constant(Value::String(value.into()))
    }

    /// Create a reference to a root collection by name.
    pub fn collection(name: impl Into<String>) -> Self {
        Expression::Collection(CollectionRef { name: name.into() })
    }

    /// Create a reference to a query source.
    pub fn source_ref(source: SourceId) -> Self {
        Expression::SourceRef(source)
    }

    /// Create a member access on `target`.
    pub fn member(target: Expression, name: impl Into<String>) -> Self {
        Expression::Member(Box::new(Member {
            target,
            name: name.into(),
        }))
    }

    /// Create a binary operation.
    pub fn binary(op: BinaryOperator, left: Expression, right: Expression) -> Self {
        Expression::Binary(Box::new(Binary { op, left, right }))
    }

    /// Create a function call.
    pub fn call(name: impl Into<String>, args: Vec<Expression>) -> Self {
        Expression::Call(Box::new(Call {
            name: name.into(),
            args,
        }))
    }

    /// Wrap a query model as a subquery expression.
    pub fn subquery(model: QueryModel) -> Self {
        Expression::SubQuery(Box::new(model))
    }

    /// Returns `true` if this expression is a subquery.
    pub fn is_subquery(&self) -> bool {
        matches!(self, Expression::SubQuery(_))
    }

    /// Collect every query source referenced anywhere in this tree,
    /// including references inside nested subquery models (which may be
    /// correlated references to outer sources).
    pub fn referenced_sources(&self) -> Vec<SourceId> {
        let mut out = Vec::new();
        self.collect_source_refs(&mut out);
        out
    }

    /// Returns `true` if any `SourceRef` in this tree points at `source`.
    pub fn references_source(&self, source: SourceId) -> bool {
        self.referenced_sources().contains(&source)
    }

    fn collect_source_refs(&self, out: &mut Vec<SourceId>) {
        match self {
            Expression::Constant(_) | Expression::Collection(_) => {}
            Expression::SourceRef(id) => out.push(*id),
            Expression::Member(m) => m.target.collect_source_refs(out),
            Expression::Binary(b) => {
                b.left.collect_source_refs(out);
                b.right.collect_source_refs(out);
            }
            Expression::Not(e) => e.collect_source_refs(out),
            Expression::Call(c) => {
                for arg in &c.args {
                    arg.collect_source_refs(out);
                }
            }
            Expression::SubQuery(model) => {
                model.visit_expressions(&mut |e| e.collect_source_refs(out));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{MainFromClause, QueryModel, SelectClause};

    #[test]
    fn test_referenced_sources_walks_nested_models() {
        let main = MainFromClause::new("x", TypeRef::new("Order"), Expression::collection("orders"));
        let outer_id = SourceId::fresh();
        let select = SelectClause {
            // A correlated reference to some outer source inside the
            // nested model's projection.
            selector: Expression::member(Expression::source_ref(outer_id), "Total"),
        };
        let inner = QueryModel::new(main, select);
        let expr = Expression::binary(
            BinaryOperator::Eq,
            Expression::subquery(inner),
            Expression::int(1),
        );

        assert!(expr.references_source(outer_id));
    }

    #[test]
    fn test_references_source_negative() {
        let expr = Expression::member(Expression::collection("orders"), "Total");
        assert!(!expr.references_source(SourceId::fresh()));
    }
}
