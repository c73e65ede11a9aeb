use crate::{
    annotation::{AnnotationKind, AnnotationMap},
    config::AnnotationCollision,
    error::ConflictKind,
    extract::{
        discover::{Declaration, Role},
        reconcile::{Problem, Reconciled, with_role},
    },
    generation::{AccessTarget, AccessorFactory, BoundAccessor, Generation},
    property::StateManagement,
    types::TypeRef,
};
use std::{collections::BTreeMap, sync::Arc};

/// Collect the annotations one role carries across every declaration.
///
/// Declarations arrive in closure order, so under `LastWriteWins` a
/// supertype's annotation replaces the candidate's.
pub(crate) fn merge_annotations(
    decls: &[Declaration<'_>],
    role: Role,
    policy: AnnotationCollision,
) -> Result<AnnotationMap, Vec<Problem>> {
    let mut merged = AnnotationMap::new();
    let mut first_seen = BTreeMap::<AnnotationKind, &TypeRef>::new();
    let mut problems = Vec::new();

    for decl in with_role(decls, role) {
        for annotation in &decl.method.annotations {
            let first = *first_seen
                .entry(annotation.kind.clone())
                .or_insert(decl.declaring);

            match merged.get(&annotation.kind) {
                Some(existing) if existing == annotation => {}
                Some(_) if policy == AnnotationCollision::Reject => {
                    problems.push(Problem::conflict(
                        ConflictKind::Annotation,
                        format!(
                            "{} annotation '{}' differs between '{first}' and '{}'",
                            role_label(role),
                            annotation.kind,
                            decl.declaring
                        ),
                    ));
                }
                _ => {
                    merged.insert(annotation.kind.clone(), annotation.clone());
                }
            }
        }
    }

    if problems.is_empty() {
        Ok(merged)
    } else {
        Err(problems)
    }
}

/// Bind the getter a descriptor reads through.
///
/// Managed getters bind against the most specific declaring type. Unmanaged
/// and delegated getters need a registered implementation to invoke.
pub(crate) fn bind_getter(
    generation: &Arc<Generation>,
    property: &str,
    state: StateManagement,
    reconciled: &Reconciled<'_>,
    delegate_getter: Option<&Declaration<'_>>,
) -> Result<BoundAccessor, Problem> {
    let missing = |decl: &Declaration<'_>| {
        Problem::Invalid(format!(
            "concrete getter '{}' declared by '{}' has no registered implementation",
            decl.method.signature(),
            decl.declaring
        ))
    };

    match (state, delegate_getter) {
        (StateManagement::Delegated, Some(decl)) => {
            let slot = decl.method.slot().ok_or_else(|| missing(decl))?;

            Ok(generation.bind(
                decl.declaring,
                &decl.method.signature(),
                AccessTarget::Delegated {
                    property: property.to_string(),
                    slot,
                },
            ))
        }
        (StateManagement::Unmanaged, _) => {
            let most_specific = reconciled.getters.first().ok_or_else(|| {
                Problem::Invalid(format!("property '{property}' has no getter to bind"))
            })?;
            let (decl, slot) = reconciled
                .getters
                .iter()
                .find_map(|d| d.method.slot().map(|slot| (d, slot)))
                .ok_or_else(|| missing(most_specific))?;

            Ok(generation.bind(
                decl.declaring,
                &decl.method.signature(),
                AccessTarget::Implementation { slot },
            ))
        }
        _ => {
            let decl = reconciled.getters.first().ok_or_else(|| {
                Problem::Invalid(format!("property '{property}' has no getter to bind"))
            })?;

            Ok(generation.bind(
                decl.declaring,
                &decl.method.signature(),
                AccessTarget::Managed {
                    property: property.to_string(),
                },
            ))
        }
    }
}

const fn role_label(role: Role) -> &'static str {
    match role {
        Role::Getter => "getter",
        Role::Setter => "setter",
    }
}

///
/// TESTS
///
