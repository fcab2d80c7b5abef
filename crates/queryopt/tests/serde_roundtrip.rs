//! Serialization round-trips for the IR.
//!
//! Models cross process boundaries in tooling (plan dumps, test fixtures),
//! so the whole IR serializes with serde. Identity handles are serialized
//! as plain numbers; a deserialized model keeps its internal references
//! consistent because handles travel with the data.

use queryopt::builder::*;
use queryopt::{
    AnnotationTable, QueryAnnotation, QueryModel, ResultOperator, TypeRef,
};

fn sample_model() -> QueryModel {
    let b = from_collection("x", "Order", "orders");
    let x = b.source_id();
    b.where_(gt(member(source(x), "Total"), int(10)))
        .order_by_asc(member(source(x), "Date"))
        .select(member(source(x), "Total"))
        .operator(ResultOperator::OfType(TypeRef::new("RushOrder")))
        .operator(ResultOperator::Count)
        .build()
}

#[test]
fn query_model_roundtrip() {
    let model = sample_model();
    let json = serde_json::to_string(&model).unwrap();
    let back: QueryModel = serde_json::from_str(&json).unwrap();

    assert_eq!(model, back);
    assert_eq!(back.main_from.id, model.main_from.id);
    assert!(back.select.selector.references_source(model.main_from.id));
}

#[test]
fn annotation_table_roundtrip() {
    let model = sample_model();
    let mut table = AnnotationTable::new();
    table.push(QueryAnnotation::new(
        ResultOperator::Count,
        model.main_from.id,
        model.id,
    ));

    let json = serde_json::to_string(&table).unwrap();
    let back: AnnotationTable = serde_json::from_str(&json).unwrap();

    assert_eq!(table, back);
}
