//! Validation passes over extracted schemas.
//!
//! Extraction only guarantees a consistent shape; these passes enforce
//! placement rules a model-configuration layer may want on top of it.

pub mod setter;

pub use setter::validate_setter_annotations;

use crate::{annotation::AnnotationKind, schema::ModelSchema};
use modelschema_error::ErrorTree;
use std::collections::BTreeSet;

///
/// AnnotationRules
/// Which annotation kinds only make sense on getters.
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct AnnotationRules {
    getter_only: BTreeSet<AnnotationKind>,
}

impl AnnotationRules {
    #[must_use]
    pub fn new(getter_only: impl IntoIterator<Item = AnnotationKind>) -> Self {
        Self {
            getter_only: getter_only.into_iter().collect(),
        }
    }

    #[must_use]
    pub fn is_getter_only(&self, kind: &AnnotationKind) -> bool {
        self.getter_only.contains(kind)
    }
}

/// Run every schema-level pass, in a fixed order.
pub fn validate_schema(schema: &ModelSchema, rules: &AnnotationRules) -> Result<(), ErrorTree> {
    let mut errs = ErrorTree::new();
    errs.add_result(validate_setter_annotations(schema, rules));

    errs.result()
}
