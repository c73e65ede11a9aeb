use crate::{property::PropertyDescriptor, schema::ModelSchema, validate::AnnotationRules};
use modelschema_error::{ErrorTree, err};

/// Flag setter annotations that belong on the getter, and setter annotations
/// on properties that have no setter at all. Errors are routed by property.
pub fn validate_setter_annotations(
    schema: &ModelSchema,
    rules: &AnnotationRules,
) -> Result<(), ErrorTree> {
    let mut errs = ErrorTree::new();

    for property in schema.properties() {
        errs.merge_for(property.name(), validate_property(property, rules));
    }

    errs.result()
}

fn validate_property(property: &PropertyDescriptor, rules: &AnnotationRules) -> ErrorTree {
    let mut errs = ErrorTree::new();

    for kind in property.setter_annotations().keys() {
        if !property.is_writable() {
            err!(
                errs,
                "annotation '{kind}' is attached to a setter but '{}' is read-only",
                property.name()
            );
        } else if rules.is_getter_only(kind) {
            err!(
                errs,
                "annotation '{kind}' is only allowed on the getter of '{}'",
                property.name()
            );
        }
    }

    errs
}

///
/// TESTS
///
