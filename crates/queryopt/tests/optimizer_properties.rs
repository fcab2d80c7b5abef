//! End-to-end properties of the optimization pass.
//!
//! Each test drives the full [`optimize`] entry point over a hand-built
//! model and asserts the structural outcome: what got flattened, what the
//! guards refused, which orderings survived, and that the annotation table
//! never dangles.

use queryopt::builder::*;
use queryopt::{
    optimize, AnnotationTable, BodyClause, Expression, JoinClause, QueryAnnotation,
    ResultOperator, TypeRef,
};

/// from x in orders where x.Total > 10 select x.Total
fn filtered_totals() -> (queryopt::QueryModel, queryopt::SourceId) {
    let b = from_collection("x", "Order", "orders");
    let x = b.source_id();
    let model = b
        .where_(gt(member(source(x), "Total"), int(10)))
        .select(member(source(x), "Total"))
        .build();
    (model, x)
}

#[test]
fn splice_correctness() {
    // from y in (from x in orders where x.Total > 10 select x.Total)
    // where y > 5
    // select Round(y)
    let (inner, _) = filtered_totals();

    let b = from_source("y", "Decimal", Expression::subquery(inner));
    let y = b.source_id();
    let mut model = b
        .where_(gt(source(y), int(5)))
        .select(call("Round", vec![source(y)]))
        .build();
    let mut annotations = AnnotationTable::new();

    optimize(&mut model, &mut annotations).unwrap();

    // Main source is the inner source, under the target clause's identity.
    assert_eq!(model.main_from.id, y);
    assert_eq!(model.main_from.from_expression, Expression::collection("orders"));
    assert_eq!(model.main_from.item_name, "x");

    // Body: [where x.Total > 10, where x.Total > 5] — the inner filter
    // executes first, and the outer filter sees the inner projection.
    let total = member(source(y), "Total");
    assert_eq!(model.body_clauses.len(), 2);
    match &model.body_clauses[0] {
        BodyClause::Where(w) => assert_eq!(w.predicate, gt(total.clone(), int(10))),
        other => panic!("expected where clause, got {:?}", other),
    }
    match &model.body_clauses[1] {
        BodyClause::Where(w) => assert_eq!(w.predicate, gt(total.clone(), int(5))),
        other => panic!("expected where clause, got {:?}", other),
    }

    // Projection: g(f(x)) = Round(x.Total).
    assert_eq!(model.select.selector, call("Round", vec![total]));
}

#[test]
fn idempotence() {
    let (inner, _) = filtered_totals();
    let b = from_source("y", "Decimal", Expression::subquery(inner));
    let y = b.source_id();
    let mut model = b
        .where_(gt(source(y), int(5)))
        .operator(ResultOperator::Count)
        .build();
    let mut annotations = AnnotationTable::new();
    annotations.push(QueryAnnotation::new(ResultOperator::Count, y, model.id));

    optimize(&mut model, &mut annotations).unwrap();
    let model_once = model.clone();
    let annotations_once = annotations.clone();

    optimize(&mut model, &mut annotations).unwrap();

    assert_eq!(model, model_once);
    assert_eq!(annotations, annotations_once);
}

#[test]
fn identity_join_elimination() {
    // join c in (from c in customers select c) on x.CustomerId equals c.Id
    let inner = from_collection("c", "Customer", "customers").build();
    let inner_main_id = inner.main_from.id;

    let b = from_collection("x", "Order", "orders");
    let x = b.source_id();
    let join = JoinClause::new(
        "c",
        TypeRef::new("Customer"),
        Expression::subquery(inner),
        member(source(x), "CustomerId"),
        Expression::null(),
    );
    let join_id = join.id;
    let mut model = b.join(join).select(member(source(x), "Total")).build();
    let mut annotations = AnnotationTable::new();
    annotations.push(QueryAnnotation::new(
        ResultOperator::Distinct,
        inner_main_id,
        model.id,
    ));

    optimize(&mut model, &mut annotations).unwrap();

    match &model.body_clauses[0] {
        BodyClause::Join(join) => {
            assert_eq!(join.inner_sequence, Expression::collection("customers"));
        }
        other => panic!("expected join clause, got {:?}", other),
    }
    let annotation = annotations.iter().next().unwrap();
    assert_eq!(annotation.query_source, join_id);
}

#[test]
fn guarded_flattening_refusal() {
    let inner_with = |configure: fn(QueryModelBuilder) -> QueryModelBuilder| {
        let b = from_collection("x", "Order", "orders");
        configure(b).build()
    };

    let inners = vec![
        inner_with(|b| {
            let x = b.source_id();
            b.order_by_asc(member(source(x), "Date"))
        }),
        inner_with(|b| b.operator(ResultOperator::Distinct)),
        inner_with(|b| b.operator(ResultOperator::Take(int(3)))),
        inner_with(|b| b.operator(ResultOperator::Count)),
    ];

    for inner in inners {
        let mut model = from_source("y", "Order", Expression::subquery(inner)).build();
        let snapshot = model.clone();
        let mut annotations = AnnotationTable::new();

        optimize(&mut model, &mut annotations).unwrap();

        // Clause count and the subquery boundary are unchanged.
        assert_eq!(model, snapshot);
        assert!(model.main_from.from_expression.is_subquery());
    }
}

#[test]
fn ordering_elision_with_count() {
    let b = from_collection("x", "Order", "orders");
    let x = b.source_id();
    let mut model = b
        .order_by_asc(member(source(x), "Key"))
        .operator(ResultOperator::Count)
        .build();
    let mut annotations = AnnotationTable::new();

    optimize(&mut model, &mut annotations).unwrap();
    assert!(model.body_clauses.is_empty());
}

#[test]
fn ordering_retained_under_windowing() {
    let b = from_collection("x", "Order", "orders");
    let x = b.source_id();
    let mut model = b
        .order_by_asc(member(source(x), "Key"))
        .operator(ResultOperator::Take(int(5)))
        .operator(ResultOperator::Count)
        .build();
    let mut annotations = AnnotationTable::new();

    optimize(&mut model, &mut annotations).unwrap();
    assert_eq!(model.body_clauses.len(), 1);
    assert!(model.body_clauses[0].is_order_by());
}

#[test]
fn choice_operator_exemption() {
    let b = from_collection("x", "Order", "orders");
    let x = b.source_id();
    let mut model = b
        .order_by_asc(member(source(x), "Key"))
        .operator(ResultOperator::First)
        .build();
    let mut annotations = AnnotationTable::new();

    optimize(&mut model, &mut annotations).unwrap();
    assert_eq!(model.body_clauses.len(), 1);
    assert!(model.body_clauses[0].is_order_by());
}

#[test]
fn annotation_integrity_after_flatten() {
    // The inner model declares an OfType operator annotated against its own
    // main from clause; after the flatten the annotation must locate the
    // operator in the outer model, keyed to a source that exists there.
    let inner = from_collection("x", "Order", "orders")
        .operator(ResultOperator::OfType(TypeRef::new("RushOrder")))
        .build();
    let inner_main_id = inner.main_from.id;
    let inner_model_id = inner.id;

    let b = from_source("y", "Order", Expression::subquery(inner));
    let y = b.source_id();
    let mut model = b
        .where_(gt(member(source(y), "Total"), int(10)))
        .build();
    let mut annotations = AnnotationTable::new();
    annotations.push(QueryAnnotation::new(
        ResultOperator::OfType(TypeRef::new("RushOrder")),
        inner_main_id,
        inner_model_id,
    ));

    optimize(&mut model, &mut annotations).unwrap();

    // The type filter was carried onto the outer model.
    assert_eq!(
        model.result_operators,
        vec![ResultOperator::OfType(TypeRef::new("RushOrder"))]
    );
    for annotation in annotations.iter() {
        assert_eq!(annotation.query_model, model.id);
        assert!(
            model.declares_source(annotation.query_source),
            "annotation dangles: {} not declared by its recorded model",
            annotation.query_source
        );
    }
}

#[test]
fn flatten_rewrites_correlated_references_in_nested_subqueries() {
    // The outer filter holds a nested subquery whose own filter references
    // the outer range variable `y`. Flattening must rewrite that correlated
    // reference to the inner projection as well.
    let (flattenable, _) = filtered_totals();

    let b = from_source("y", "Decimal", Expression::subquery(flattenable));
    let y = b.source_id();

    let nested_b = from_collection("l", "Limit", "limits");
    let l = nested_b.source_id();
    let nested = nested_b
        .where_(gt(source(y), member(source(l), "Threshold")))
        .operator(ResultOperator::Any)
        .build();

    let mut model = b
        .where_(eq(
            Expression::subquery(nested),
            Expression::Constant(queryopt::Value::Bool(true)),
        ))
        .build();
    let mut annotations = AnnotationTable::new();

    optimize(&mut model, &mut annotations).unwrap();

    // The flatten happened.
    assert_eq!(model.main_from.from_expression, Expression::collection("orders"));

    // Inside the nested subquery, `y` now reads `y.Total` (the inner
    // projection re-targeted to the adopted clause).
    let expected = member(source(y), "Total");
    match &model.body_clauses[1] {
        BodyClause::Where(w) => match &w.predicate {
            Expression::Binary(outer_eq) => match &outer_eq.left {
                Expression::SubQuery(nested) => match &nested.body_clauses[0] {
                    BodyClause::Where(nested_where) => match &nested_where.predicate {
                        Expression::Binary(cmp) => assert_eq!(cmp.left, expected),
                        other => panic!("unexpected nested predicate: {:?}", other),
                    },
                    other => panic!("expected nested where clause, got {:?}", other),
                },
                other => panic!("expected nested subquery, got {:?}", other),
            },
            other => panic!("unexpected outer predicate: {:?}", other),
        },
        other => panic!("expected where clause, got {:?}", other),
    }
}
