//! The annotation side-table.
//!
//! A [`QueryAnnotation`] records that a result operator was declared against
//! a particular query source and currently resides in a particular model.
//! The front-end populates the table during IR construction; the optimizer
//! re-points annotations as it relocates structure; the lowering stage reads
//! them afterwards to locate each operator.
//!
//! Annotations hold [`SourceId`]/[`ModelId`] handles rather than embedded
//! pointers, so keeping the table consistent with a tree under rewrite is a
//! handle update, auditable independently of the tree mutation.

use serde::{Deserialize, Serialize};

use crate::model::{ModelId, SourceId};
use crate::result_operators::ResultOperator;

/// One annotation record. `query_source` and `query_model` are mutable over
/// the annotation's lifetime; the operator itself is fixed at construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryAnnotation {
    pub result_operator: ResultOperator,
    pub query_source: SourceId,
    pub query_model: ModelId,
}

impl QueryAnnotation {
    pub fn new(result_operator: ResultOperator, query_source: SourceId, query_model: ModelId) -> Self {
        Self {
            result_operator,
            query_source,
            query_model,
        }
    }
}

/// The mutable collection of annotations for one optimization pass.
///
/// Multiple annotations may reference the same source. The optimizer assumes
/// exclusive access to the table for the duration of one pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnnotationTable {
    annotations: Vec<QueryAnnotation>,
}

impl AnnotationTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, annotation: QueryAnnotation) {
        self.annotations.push(annotation);
    }

    pub fn len(&self) -> usize {
        self.annotations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &QueryAnnotation> {
        self.annotations.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut QueryAnnotation> {
        self.annotations.iter_mut()
    }

    /// Re-point every annotation keyed to `from` so its source becomes `to`.
    /// The recorded model is left unchanged.
    pub fn repoint_source(&mut self, from: SourceId, to: SourceId) {
        for annotation in self.annotations.iter_mut() {
            if annotation.query_source == from {
                annotation.query_source = to;
            }
        }
    }

    /// Re-point every annotation keyed to `from`: its source becomes `to`
    /// and its model becomes `model`.
    pub fn repoint(&mut self, from: SourceId, to: SourceId, model: ModelId) {
        for annotation in self.annotations.iter_mut() {
            if annotation.query_source == from {
                annotation.query_source = to;
                annotation.query_model = model;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repoint_source_leaves_model() {
        let old = SourceId::fresh();
        let new = SourceId::fresh();
        let model = ModelId::fresh();
        let mut table = AnnotationTable::new();
        table.push(QueryAnnotation::new(ResultOperator::Count, old, model));
        table.push(QueryAnnotation::new(ResultOperator::Distinct, old, model));

        table.repoint_source(old, new);

        for annotation in table.iter() {
            assert_eq!(annotation.query_source, new);
            assert_eq!(annotation.query_model, model);
        }
    }

    #[test]
    fn test_repoint_only_matching_annotations() {
        let a = SourceId::fresh();
        let b = SourceId::fresh();
        let target = SourceId::fresh();
        let before = ModelId::fresh();
        let after = ModelId::fresh();
        let mut table = AnnotationTable::new();
        table.push(QueryAnnotation::new(ResultOperator::Count, a, before));
        table.push(QueryAnnotation::new(ResultOperator::First, b, before));

        table.repoint(a, target, after);

        let annotations: Vec<_> = table.iter().collect();
        assert_eq!(annotations[0].query_source, target);
        assert_eq!(annotations[0].query_model, after);
        assert_eq!(annotations[1].query_source, b);
        assert_eq!(annotations[1].query_model, before);
    }
}
