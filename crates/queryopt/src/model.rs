//! The query model: clauses, query sources, and stable identity handles.
//!
//! A [`QueryModel`] represents one logical query: a main from clause that
//! introduces the first range variable, an ordered sequence of body clauses
//! (additional froms, joins, filters, orderings), exactly one select clause,
//! and an ordered sequence of result operators applied left-to-right to the
//! projected sequence.
//!
//! # Identity
//!
//! Clauses that bind a range variable (main from, additional from, join) are
//! *query sources*. Expressions elsewhere in the tree refer to a specific
//! source instance, so sources are identified by a stable [`SourceId`]
//! handle allocated at construction and never reused. Likewise every model
//! carries a [`ModelId`]. The annotation side-table
//! ([`annotations`](crate::annotations)) records handles rather than
//! embedded pointers, so relocating structure is a single handle update.
//!
//! Clause containment is ownership: a model exclusively owns its clauses and
//! result operators. Only [`Expression::SourceRef`] and annotations hold
//! non-owning references into that structure.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering as AtomicOrdering};

use crate::error::Result;
use crate::expressions::{Expression, TypeRef};
use crate::result_operators::ResultOperator;

static NEXT_SOURCE_ID: AtomicU32 = AtomicU32::new(0);
static NEXT_MODEL_ID: AtomicU32 = AtomicU32::new(0);

/// Stable identity handle for a query source (from clause or join clause).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceId(u32);

impl SourceId {
    /// Allocate a fresh, process-unique source id.
    pub fn fresh() -> Self {
        SourceId(NEXT_SOURCE_ID.fetch_add(1, AtomicOrdering::Relaxed))
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s{}", self.0)
    }
}

/// Stable identity handle for a query model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModelId(u32);

impl ModelId {
    /// Allocate a fresh, process-unique model id.
    pub fn fresh() -> Self {
        ModelId(NEXT_MODEL_ID.fetch_add(1, AtomicOrdering::Relaxed))
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "m{}", self.0)
    }
}

/// The clause that introduces the first range variable of a query:
/// `from x in S`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MainFromClause {
    /// Stable source identity; referenced by `Expression::SourceRef`.
    pub id: SourceId,
    /// Name of the bound range variable (diagnostic only).
    pub item_name: String,
    /// Element type the range variable is bound to.
    pub item_type: TypeRef,
    /// The sequence being iterated.
    pub from_expression: Expression,
}

impl MainFromClause {
    pub fn new(
        item_name: impl Into<String>,
        item_type: TypeRef,
        from_expression: Expression,
    ) -> Self {
        Self {
            id: SourceId::fresh(),
            item_name: item_name.into(),
            item_type,
            from_expression,
        }
    }

    /// Adopt the source declaration of `donor`, keeping this clause's own
    /// identity. Used by the flattener so the outer clause directly iterates
    /// what the inner main from clause iterated.
    pub fn adopt_source(&mut self, donor: &MainFromClause) {
        self.item_name = donor.item_name.clone();
        self.item_type = donor.item_type.clone();
        self.from_expression = donor.from_expression.clone();
    }
}

/// A further `from y in T` clause in the query body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdditionalFromClause {
    pub id: SourceId,
    pub item_name: String,
    pub item_type: TypeRef,
    pub from_expression: Expression,
}

impl AdditionalFromClause {
    pub fn new(
        item_name: impl Into<String>,
        item_type: TypeRef,
        from_expression: Expression,
    ) -> Self {
        Self {
            id: SourceId::fresh(),
            item_name: item_name.into(),
            item_type,
            from_expression,
        }
    }

    /// See [`MainFromClause::adopt_source`].
    pub fn adopt_source(&mut self, donor: &MainFromClause) {
        self.item_name = donor.item_name.clone();
        self.item_type = donor.item_type.clone();
        self.from_expression = donor.from_expression.clone();
    }
}

/// A `join y in T on f(x) equals g(y)` clause. Binds `y`, so it is a query
/// source like the from clauses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinClause {
    pub id: SourceId,
    pub item_name: String,
    pub item_type: TypeRef,
    /// The sequence joined against (may be a subquery).
    pub inner_sequence: Expression,
    /// Key computed from the enclosing query's sources.
    pub outer_key_selector: Expression,
    /// Key computed from the joined sequence's element.
    pub inner_key_selector: Expression,
}

impl JoinClause {
    pub fn new(
        item_name: impl Into<String>,
        item_type: TypeRef,
        inner_sequence: Expression,
        outer_key_selector: Expression,
        inner_key_selector: Expression,
    ) -> Self {
        Self {
            id: SourceId::fresh(),
            item_name: item_name.into(),
            item_type,
            inner_sequence,
            outer_key_selector,
            inner_key_selector,
        }
    }
}

/// A filter: `where P(x)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WhereClause {
    pub predicate: Expression,
}

/// Sort direction of one ordering key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderingDirection {
    Asc,
    Desc,
}

/// One ordering key inside an order-by clause.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ordering {
    pub expression: Expression,
    pub direction: OrderingDirection,
}

/// An `orderby k1, k2 descending, ...` clause.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderByClause {
    pub orderings: Vec<Ordering>,
}

/// A clause in the query body. Order is semantically significant: filters,
/// joins, and orderings apply in sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BodyClause {
    AdditionalFrom(AdditionalFromClause),
    Join(JoinClause),
    Where(WhereClause),
    OrderBy(OrderByClause),
}

impl BodyClause {
    /// The source id this clause binds, if it is a query source.
    pub fn source_id(&self) -> Option<SourceId> {
        match self {
            BodyClause::AdditionalFrom(c) => Some(c.id),
            BodyClause::Join(c) => Some(c.id),
            BodyClause::Where(_) | BodyClause::OrderBy(_) => None,
        }
    }

    pub fn is_order_by(&self) -> bool {
        matches!(self, BodyClause::OrderBy(_))
    }
}

/// The projection: `select f(x)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectClause {
    pub selector: Expression,
}

/// One logical query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryModel {
    /// Stable model identity; recorded by annotations.
    pub id: ModelId,
    pub main_from: MainFromClause,
    pub body_clauses: Vec<BodyClause>,
    pub select: SelectClause,
    /// Applied left-to-right to the projected sequence.
    pub result_operators: Vec<ResultOperator>,
}

impl QueryModel {
    pub fn new(main_from: MainFromClause, select: SelectClause) -> Self {
        Self {
            id: ModelId::fresh(),
            main_from,
            body_clauses: Vec::new(),
            select,
            result_operators: Vec::new(),
        }
    }

    /// Returns `true` if this model is a pure pass-through of its main
    /// source: no body clauses, and a selector that is exactly a reference
    /// to the main from clause. `(from x in S select x)` denotes exactly `S`.
    pub fn is_identity_query(&self) -> bool {
        self.body_clauses.is_empty()
            && matches!(self.select.selector,
                Expression::SourceRef(id) if id == self.main_from.id)
    }

    /// All source ids declared by this model's clauses (main from plus any
    /// source-binding body clauses). Does not include sources of nested
    /// subquery models.
    pub fn source_ids(&self) -> Vec<SourceId> {
        let mut ids = vec![self.main_from.id];
        ids.extend(self.body_clauses.iter().filter_map(BodyClause::source_id));
        ids
    }

    /// Returns `true` if `source` is declared by one of this model's clauses.
    pub fn declares_source(&self, source: SourceId) -> bool {
        self.source_ids().contains(&source)
    }

    /// Apply `f` to every expression-bearing site of the model, replacing
    /// each site with the returned expression. Sites: the main-from source,
    /// each body clause's expressions (additional-from sources, join
    /// sequences and key selectors, filter predicates, ordering keys), the
    /// selector, and expression-carrying result operators.
    ///
    /// `f` receives each site's whole expression; recursion into the
    /// expression tree is the transformation's own concern.
    pub fn transform_expressions<F>(&mut self, f: &mut F) -> Result<()>
    where
        F: FnMut(Expression) -> Result<Expression>,
    {
        transform_site(&mut self.main_from.from_expression, f)?;
        for clause in &mut self.body_clauses {
            match clause {
                BodyClause::AdditionalFrom(c) => {
                    transform_site(&mut c.from_expression, f)?;
                }
                BodyClause::Join(c) => {
                    transform_site(&mut c.inner_sequence, f)?;
                    transform_site(&mut c.outer_key_selector, f)?;
                    transform_site(&mut c.inner_key_selector, f)?;
                }
                BodyClause::Where(c) => {
                    transform_site(&mut c.predicate, f)?;
                }
                BodyClause::OrderBy(c) => {
                    for ordering in &mut c.orderings {
                        transform_site(&mut ordering.expression, f)?;
                    }
                }
            }
        }
        transform_site(&mut self.select.selector, f)?;
        for op in &mut self.result_operators {
            op.transform_expressions(f)?;
        }
        Ok(())
    }

    /// Read-only companion of [`transform_expressions`](Self::transform_expressions):
    /// invoke `f` on every expression-bearing site.
    pub fn visit_expressions(&self, f: &mut dyn FnMut(&Expression)) {
        f(&self.main_from.from_expression);
        for clause in &self.body_clauses {
            match clause {
                BodyClause::AdditionalFrom(c) => f(&c.from_expression),
                BodyClause::Join(c) => {
                    f(&c.inner_sequence);
                    f(&c.outer_key_selector);
                    f(&c.inner_key_selector);
                }
                BodyClause::Where(c) => f(&c.predicate),
                BodyClause::OrderBy(c) => {
                    for ordering in &c.orderings {
                        f(&ordering.expression);
                    }
                }
            }
        }
        f(&self.select.selector);
        for op in &self.result_operators {
            op.visit_expressions(f);
        }
    }
}

fn transform_site<F>(site: &mut Expression, f: &mut F) -> Result<()>
where
    F: FnMut(Expression) -> Result<Expression>,
{
    let taken = std::mem::replace(site, Expression::null());
    *site = f(taken)?;
    Ok(())
}
