use crate::{
    annotation::{Annotation, AnnotationKind, AnnotationMap},
    error::{AccessError, InvalidDescriptorError},
    generation::BoundAccessor,
    types::TypeRef,
    value::Value,
};
use modelschema_error::{ErrorTree, err};
use serde::{Deserialize, Serialize};
use std::{
    any::Any,
    collections::BTreeSet,
    fmt::{self, Display},
    hash::{Hash, Hasher},
};

///
/// StateManagement
///

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StateManagement {
    /// Stored as structured child data inside the model's own storage,
    /// synthesized downstream.
    Managed,

    /// Held by a concrete, user-authored implementation of the view.
    Unmanaged,

    /// Held by an external object the model references but does not own.
    Delegated,
}

impl StateManagement {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Managed => "managed",
            Self::Unmanaged => "unmanaged",
            Self::Delegated => "delegated",
        }
    }
}

impl Display for StateManagement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

///
/// PropertyDescriptor
///
/// Immutable description of one logical property of a model type.
///
/// Equality and hashing cover only `(name, ty, state_management, writable)`,
/// so descriptors extracted from different but equivalent hierarchies compare
/// equal. `declared_by`, annotations and the getter are diagnostics and
/// behaviour, not identity.
///

#[derive(Clone, Debug)]
pub struct PropertyDescriptor {
    name: String,
    ty: TypeRef,
    state_management: StateManagement,
    writable: bool,
    declared_by: BTreeSet<TypeRef>,
    annotations: AnnotationMap,
    setter_annotations: AnnotationMap,
    getter: BoundAccessor,
}

impl PropertyDescriptor {
    #[expect(clippy::too_many_arguments)]
    pub fn of(
        ty: &TypeRef,
        name: &str,
        state_management: StateManagement,
        writable: bool,
        declared_by: &BTreeSet<TypeRef>,
        getter: &BoundAccessor,
        annotations: &AnnotationMap,
        setter_annotations: &AnnotationMap,
    ) -> Result<Self, InvalidDescriptorError> {
        let mut errs = ErrorTree::new();
        if name.is_empty() {
            err!(errs, "property name is empty");
        }
        if declared_by.is_empty() {
            err!(errs, "property '{name}' has no declaring type");
        }
        errs.result()
            .map_err(|issues| InvalidDescriptorError::new(format!("{name}({ty})"), issues))?;

        Ok(Self {
            name: name.to_string(),
            ty: ty.clone(),
            state_management,
            writable,
            declared_by: declared_by.clone(),
            annotations: annotations.clone(),
            setter_annotations: setter_annotations.clone(),
            getter: getter.clone(),
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn ty(&self) -> &TypeRef {
        &self.ty
    }

    #[must_use]
    pub const fn state_management(&self) -> StateManagement {
        self.state_management
    }

    #[must_use]
    pub const fn is_writable(&self) -> bool {
        self.writable
    }

    #[must_use]
    pub const fn declared_by(&self) -> &BTreeSet<TypeRef> {
        &self.declared_by
    }

    #[must_use]
    pub const fn getter(&self) -> &BoundAccessor {
        &self.getter
    }

    /// Read this property from `instance` through the bound getter.
    pub fn get_property_value(&self, instance: &dyn Any) -> Result<Value, AccessError> {
        self.getter.invoke(instance)
    }

    #[must_use]
    pub fn is_annotation_present(&self, kind: &AnnotationKind) -> bool {
        self.annotations.contains_key(kind)
    }

    #[must_use]
    pub fn annotation(&self, kind: &AnnotationKind) -> Option<&Annotation> {
        self.annotations.get(kind)
    }

    pub fn annotations(&self) -> impl Iterator<Item = &Annotation> {
        self.annotations.values()
    }

    // setter_annotations
    // only kept so validators can inspect and complain about them
    #[must_use]
    pub const fn setter_annotations(&self) -> &AnnotationMap {
        &self.setter_annotations
    }
}

impl PartialEq for PropertyDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.ty == other.ty
            && self.state_management == other.state_management
            && self.writable == other.writable
    }
}

impl Eq for PropertyDescriptor {}

impl Hash for PropertyDescriptor {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.ty.hash(state);
        self.state_management.hash(state);
        self.writable.hash(state);
    }
}

impl Display for PropertyDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}({})",
            self.state_management,
            self.name,
            self.ty.simple_name()
        )
    }
}

///
/// TESTS
///
