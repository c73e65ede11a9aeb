use crate::{
    error::ConflictKind,
    extract::discover::{Declaration, Role},
    types::TypeRef,
};
use std::collections::{BTreeMap, BTreeSet};

///
/// Problem
/// Something wrong with one property's declaration list.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) enum Problem {
    Invalid(String),
    Conflict {
        kind: ConflictKind,
        detail: String,
        /// A type outside the property's declaration list that takes part.
        involving: Option<TypeRef>,
    },
}

impl Problem {
    pub fn conflict(kind: ConflictKind, detail: impl Into<String>) -> Self {
        Self::Conflict {
            kind,
            detail: detail.into(),
            involving: None,
        }
    }

    #[must_use]
    pub fn involving(self, ty: &TypeRef) -> Self {
        match self {
            Self::Conflict { kind, detail, .. } => Self::Conflict {
                kind,
                detail,
                involving: Some(ty.clone()),
            },
            invalid @ Self::Invalid(_) => invalid,
        }
    }
}

///
/// Reconciled
/// The single shape a property resolves to across all its declarations.
///

#[derive(Clone, Debug)]
pub(crate) struct Reconciled<'a> {
    pub ty: TypeRef,
    pub writable: bool,
    pub declared_by: BTreeSet<TypeRef>,

    /// Getters whose return type is the resolved type, most specific first.
    pub getters: Vec<Declaration<'a>>,
}

/// Resolve a property's type and writability from its declaration list.
///
/// Pure over `decls` and the assignability relation: every problem found is
/// returned, none short-circuits the others.
pub(crate) fn reconcile<'a>(
    decls: &[Declaration<'a>],
    is_assignable: impl Fn(&TypeRef, &TypeRef) -> bool,
) -> Result<Reconciled<'a>, Vec<Problem>> {
    let mut problems = Vec::new();
    let getters = decls.iter().filter(|d| d.is_getter()).collect::<Vec<_>>();
    let setters = decls.iter().filter(|d| !d.is_getter()).collect::<Vec<_>>();

    if getters.is_empty() {
        let declaring = join_types(setters.iter().map(|d| d.declaring));
        return Err(vec![Problem::Invalid(format!(
            "setter declared by {declaring} has no corresponding getter"
        ))]);
    }

    // one getter per declaring type
    let mut per_type = BTreeMap::<&TypeRef, Vec<&str>>::new();
    for getter in &getters {
        per_type
            .entry(getter.declaring)
            .or_default()
            .push(&getter.method.name);
    }
    for (declaring, names) in &per_type {
        if names.len() > 1 {
            problems.push(Problem::Invalid(format!(
                "'{declaring}' declares more than one getter ({})",
                names.join(", ")
            )));
        }
    }

    // return type: the most specific one every other is assignable from
    let mut candidates = Vec::<&TypeRef>::new();
    for getter in &getters {
        if !candidates.contains(&getter.value_type()) {
            candidates.push(getter.value_type());
        }
    }
    let resolved = candidates
        .iter()
        .find(|c| candidates.iter().all(|other| is_assignable(c, other)))
        .copied();
    if resolved.is_none() {
        let detail = getters
            .iter()
            .map(|g| format!("'{}' returns {}", g.declaring, g.value_type()))
            .collect::<Vec<_>>()
            .join("; ");
        problems.push(Problem::conflict(ConflictKind::ReturnType, detail));
    }

    // writability: every getter-declaring type agrees on having a setter
    let with_setter = per_type
        .keys()
        .copied()
        .filter(|ty| setters.iter().any(|s| s.declaring == *ty))
        .collect::<Vec<_>>();
    let without_setter = per_type
        .keys()
        .copied()
        .filter(|ty| !with_setter.contains(ty))
        .collect::<Vec<_>>();
    if !with_setter.is_empty() && !without_setter.is_empty() {
        problems.push(Problem::conflict(
            ConflictKind::Writability,
            format!(
                "setter declared alongside the getter by {} but not by {}",
                join_types(with_setter.into_iter()),
                join_types(without_setter.into_iter())
            ),
        ));
    }

    // setters take exactly the resolved type
    if let Some(resolved) = resolved {
        for setter in &setters {
            if setter.value_type() != resolved {
                problems.push(Problem::conflict(
                    ConflictKind::SetterType,
                    format!(
                        "setter declared by '{}' takes {}, but the property type is {resolved}",
                        setter.declaring,
                        setter.value_type()
                    ),
                ));
            }
        }
    }

    match resolved {
        Some(ty) if problems.is_empty() => Ok(Reconciled {
            ty: ty.clone(),
            writable: !setters.is_empty(),
            declared_by: decls.iter().map(|d| d.declaring.clone()).collect(),
            getters: getters
                .into_iter()
                .filter(|g| g.value_type() == ty)
                .copied()
                .collect(),
        }),
        _ => Err(problems),
    }
}

/// Every distinct declaring type, in declaration order.
pub(crate) fn declaring_types(decls: &[Declaration<'_>]) -> Vec<TypeRef> {
    let mut out = Vec::<TypeRef>::new();
    for decl in decls {
        if !out.contains(decl.declaring) {
            out.push(decl.declaring.clone());
        }
    }

    out
}

/// Declarations of one role.
pub(crate) fn with_role<'a, 'd>(
    decls: &'d [Declaration<'a>],
    role: Role,
) -> impl Iterator<Item = Declaration<'a>> + 'd {
    decls.iter().filter(move |d| d.role == role).copied()
}

fn join_types<'a>(types: impl Iterator<Item = &'a TypeRef>) -> String {
    types
        .map(|t| format!("'{t}'"))
        .collect::<Vec<_>>()
        .join(", ")
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::MethodDef;

    fn decl<'a>(declaring: &'a TypeRef, method: &'a MethodDef) -> Declaration<'a> {
        let role = if method.params.is_empty() {
            Role::Getter
        } else {
            Role::Setter
        };

        Declaration {
            declaring,
            role,
            method,
        }
    }

    // Animal <- Dog, nothing else is related
    fn assignable(from: &TypeRef, to: &TypeRef) -> bool {
        from == to || (from.path() == "app::Dog" && to.path() == "app::Animal")
    }

    #[test]
    fn identical_getters_in_two_parents_resolve_once() {
        let (left, right) = (TypeRef::new("app::Left"), TypeRef::new("app::Right"));
        let get_id = MethodDef::getter("getId", TypeRef::string());
        let decls = [decl(&left, &get_id), decl(&right, &get_id)];

        let reconciled = reconcile(&decls, assignable).expect("compatible");
        assert_eq!(reconciled.ty, TypeRef::string());
        assert!(!reconciled.writable);
        assert_eq!(reconciled.declared_by.len(), 2);
        assert_eq!(reconciled.getters.len(), 2);
    }

    #[test]
    fn covariant_narrowing_picks_most_specific_type() {
        let (owner, kennel) = (TypeRef::new("app::Owner"), TypeRef::new("app::Kennel"));
        let get_animal = MethodDef::getter("getPet", TypeRef::new("app::Animal"));
        let get_dog = MethodDef::getter("getPet", TypeRef::new("app::Dog"));
        let decls = [decl(&owner, &get_animal), decl(&kennel, &get_dog)];

        let reconciled = reconcile(&decls, assignable).expect("narrowing is accepted");
        assert_eq!(reconciled.ty, TypeRef::new("app::Dog"));
        assert_eq!(reconciled.getters.len(), 1);
        assert_eq!(reconciled.getters[0].declaring, &kennel);
    }

    #[test]
    fn unrelated_return_types_conflict() {
        let (a, b) = (TypeRef::new("app::A"), TypeRef::new("app::B"));
        let as_string = MethodDef::getter("getValue", TypeRef::string());
        let as_int = MethodDef::getter("getValue", TypeRef::int());
        let decls = [decl(&a, &as_string), decl(&b, &as_int)];

        let problems = reconcile(&decls, assignable).expect_err("must conflict");
        assert!(matches!(
            &problems[..],
            [Problem::Conflict {
                kind: ConflictKind::ReturnType,
                ..
            }]
        ));
    }

    #[test]
    fn setter_without_getter_is_invalid() {
        let a = TypeRef::new("app::A");
        let set_age = MethodDef::setter("setAge", TypeRef::int());

        let problems = reconcile(&[decl(&a, &set_age)], assignable).expect_err("invalid");
        assert!(matches!(&problems[..], [Problem::Invalid(msg)] if msg.contains("no corresponding getter")));
    }

    #[test]
    fn writability_and_setter_type_disagreements_are_all_reported() {
        let (a, b) = (TypeRef::new("app::A"), TypeRef::new("app::B"));
        let get_age = MethodDef::getter("getAge", TypeRef::int());
        let set_age = MethodDef::setter("setAge", TypeRef::string());
        let decls = [decl(&a, &get_age), decl(&a, &set_age), decl(&b, &get_age)];

        let problems = reconcile(&decls, assignable).expect_err("must conflict");
        let kinds = problems
            .iter()
            .filter_map(|p| match p {
                Problem::Conflict { kind, .. } => Some(*kind),
                Problem::Invalid(_) => None,
            })
            .collect::<Vec<_>>();

        assert_eq!(kinds, [ConflictKind::Writability, ConflictKind::SetterType]);
    }

    #[test]
    fn setter_only_type_extends_writability() {
        let (a, b) = (TypeRef::new("app::A"), TypeRef::new("app::B"));
        let get_age = MethodDef::getter("getAge", TypeRef::int());
        let set_age = MethodDef::setter("setAge", TypeRef::int());
        let decls = [decl(&a, &get_age), decl(&b, &set_age)];

        let reconciled = reconcile(&decls, assignable).expect("compatible");
        assert!(reconciled.writable);
        assert_eq!(declaring_types(&decls), [a, b]);
    }
}
