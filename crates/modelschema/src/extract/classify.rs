use crate::{
    error::ConflictKind,
    extract::{discover::Declaration, reconcile::Problem},
    node::MethodBody,
    property::StateManagement,
};

/// Whether every declaration of a property agrees on having a body.
pub(crate) fn uniform_body(decls: &[Declaration<'_>]) -> Result<MethodBody, Problem> {
    let (abstract_decls, concrete_decls): (Vec<_>, Vec<_>) =
        decls.iter().partition(|d| d.method.is_abstract());

    match (abstract_decls.is_empty(), concrete_decls.is_empty()) {
        (false, true) => Ok(MethodBody::Abstract),
        (true, false) => Ok(MethodBody::Concrete),
        _ => {
            let list = |ds: &[&Declaration<'_>]| {
                ds.iter()
                    .map(|d| format!("'{}.{}'", d.declaring, d.method.name))
                    .collect::<Vec<_>>()
                    .join(", ")
            };

            Err(Problem::conflict(
                ConflictKind::StateManagement,
                format!(
                    "abstract in {} but concrete in {}",
                    list(abstract_decls.as_slice()),
                    list(concrete_decls.as_slice())
                ),
            ))
        }
    }
}

/// Pick the state management for a property with a uniform body.
///
/// `delegate_getter` is the delegate type's concrete getter for this
/// property, when a delegate was supplied and declares one.
pub(crate) const fn classify(
    body: MethodBody,
    delegate_getter: Option<&Declaration<'_>>,
) -> StateManagement {
    match (body, delegate_getter) {
        (MethodBody::Concrete, _) => StateManagement::Unmanaged,
        (MethodBody::Abstract, Some(_)) => StateManagement::Delegated,
        (MethodBody::Abstract, None) => StateManagement::Managed,
    }
}

///
/// TESTS
///
