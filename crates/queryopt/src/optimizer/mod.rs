//! Query-Model Optimizer Module
//!
//! This module contains the structural rewrite passes applied to a query
//! model before lowering: subquery flattening, identity-join elimination,
//! and redundant-ordering elision, plus the driver that orchestrates them
//! in a single depth-first pass.

/// Redundant order-by elision for order-insensitive consumers
pub mod elide_orderings;
/// Subquery flattening: identity-join and general from-clause cases
pub mod flatten_subqueries;
/// Main optimizer entry point and traversal orchestration
pub mod optimizer;

/// Order-by elision applicable per visited result operator
pub use elide_orderings::elide_redundant_orderings;
/// Flattening passes and their target addressing
pub use flatten_subqueries::{flatten_subquery, optimize_join_source, FlattenTarget};
/// Single-pass optimization of a model plus its annotation table
pub use optimizer::optimize;
