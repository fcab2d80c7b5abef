//! queryopt - Query-model optimization library
//!
//! This library simplifies the intermediate representation of a declarative
//! query (from/where/join/order-by clauses, a select projection, and a
//! sequence of result operators) before it is lowered to an execution plan.
//! It performs structural rewrites that are safe only under carefully
//! checked preconditions, while keeping every cross-reference into the tree
//! consistent: clauses refer to each other by identity, and an external
//! annotation table points into the tree.
//!
//! # Architecture
//!
//! 1. **IR** — [`model`] and [`expressions`] define the query model tree;
//!    query sources are identified by stable handles so that references are
//!    never embedded copies.
//! 2. **Side-table** — [`annotations`] records where each result operator
//!    was declared and currently resides.
//! 3. **Rewriting** — [`rewriter`] substitutes source references
//!    throughout a tree; [`optimizer`] orchestrates the guarded rewrite
//!    passes (subquery flattening, identity-join elimination,
//!    redundant-ordering elision) in one depth-first pass.
//!
//! Parsing source syntax into the IR and translating the optimized IR into
//! a storage-specific plan are the embedding pipeline's concern, not this
//! crate's.
//!
//! # Example
//!
//! ```
//! use queryopt::builder::*;
//! use queryopt::result_operators::ResultOperator;
//! use queryopt::{optimize, AnnotationTable};
//!
//! // from x in orders orderby x.Date select x, then .Count():
//! // the ordering is unobservable and gets elided.
//! let b = from_collection("x", "Order", "orders");
//! let x = b.source_id();
//! let mut model = b
//!     .order_by_asc(member(source(x), "Date"))
//!     .operator(ResultOperator::Count)
//!     .build();
//! let mut annotations = AnnotationTable::new();
//!
//! optimize(&mut model, &mut annotations).unwrap();
//! assert!(model.body_clauses.is_empty());
//! ```

pub mod annotations;
pub mod builder;
pub mod error;
pub mod expressions;
pub mod model;
pub mod optimizer;
pub mod result_operators;
pub mod rewriter;

pub use annotations::{AnnotationTable, QueryAnnotation};
pub use error::{Error, Result};
pub use expressions::{BinaryOperator, Expression, TypeRef, Value};
pub use model::{
    AdditionalFromClause, BodyClause, JoinClause, MainFromClause, ModelId, OrderByClause,
    Ordering, OrderingDirection, QueryModel, SelectClause, SourceId, WhereClause,
};
pub use optimizer::{
    elide_redundant_orderings, flatten_subquery, optimize, optimize_join_source, FlattenTarget,
};
pub use result_operators::ResultOperator;
pub use rewriter::{replace_model_references, replace_source_references, RewriteOptions, SourceMapping};
