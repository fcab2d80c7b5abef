use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use queryopt::builder::*;
use queryopt::{optimize, AnnotationTable, Expression, QueryModel, ResultOperator};

/// Build a model with `depth` levels of flattenable subquery nesting:
/// from y in (from y in (... from x in orders where x.Total > 10 ...)) ...
fn nested_model(depth: usize) -> QueryModel {
    let b = from_collection("x", "Order", "orders");
    let x = b.source_id();
    let mut model = b
        .where_(gt(member(source(x), "Total"), int(10)))
        .select(member(source(x), "Total"))
        .build();

    for _ in 0..depth {
        let b = from_source("y", "Decimal", Expression::subquery(model));
        let y = b.source_id();
        model = b.where_(gt(source(y), int(5))).build();
    }
    model.result_operators.push(ResultOperator::Count);
    model
}

fn bench_optimize(c: &mut Criterion) {
    let mut group = c.benchmark_group("optimize");

    for depth in [1usize, 4, 16] {
        let prepared = nested_model(depth);
        group.bench_with_input(
            BenchmarkId::new("nested_flatten", depth),
            &prepared,
            |b, prepared| {
                b.iter(|| {
                    let mut model = prepared.clone();
                    let mut annotations = AnnotationTable::new();
                    optimize(&mut model, &mut annotations).unwrap();
                    black_box(model)
                })
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_optimize);
criterion_main!(benches);
