use crate::{
    annotation::AnnotationKind,
    generation::GenerationId,
    property::{PropertyDescriptor, StateManagement},
    types::TypeRef,
};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, sync::Arc};

///
/// ModelSchema
///
/// Every property of one model type, keyed by name. Immutable and shared;
/// descriptors are handed out as `Arc`s so callers can keep one without
/// keeping the whole schema.
///

#[derive(Clone, Debug)]
pub struct ModelSchema {
    ty: TypeRef,
    delegate: Option<TypeRef>,
    generation: GenerationId,
    properties: BTreeMap<String, Arc<PropertyDescriptor>>,
}

impl ModelSchema {
    pub(crate) fn new(
        ty: TypeRef,
        delegate: Option<TypeRef>,
        generation: GenerationId,
        properties: impl IntoIterator<Item = PropertyDescriptor>,
    ) -> Self {
        let properties = properties
            .into_iter()
            .map(|p| (p.name().to_string(), Arc::new(p)))
            .collect();

        Self {
            ty,
            delegate,
            generation,
            properties,
        }
    }

    #[must_use]
    pub const fn ty(&self) -> &TypeRef {
        &self.ty
    }

    #[must_use]
    pub const fn delegate(&self) -> Option<&TypeRef> {
        self.delegate.as_ref()
    }

    #[must_use]
    pub const fn generation(&self) -> GenerationId {
        self.generation
    }

    #[must_use]
    pub fn property(&self, name: &str) -> Option<&Arc<PropertyDescriptor>> {
        self.properties.get(name)
    }

    /// Descriptors in property-name order.
    pub fn properties(&self) -> impl Iterator<Item = &Arc<PropertyDescriptor>> {
        self.properties.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.properties.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// Whether any bound getter outlived its generation.
    #[must_use]
    pub fn is_stale(&self) -> bool {
        self.properties.values().any(|p| p.getter().is_stale())
    }

    #[must_use]
    pub fn summary(&self) -> Vec<PropertySummary> {
        self.properties
            .values()
            .map(|p| PropertySummary::from(p.as_ref()))
            .collect()
    }
}

impl PartialEq for ModelSchema {
    fn eq(&self, other: &Self) -> bool {
        self.ty == other.ty && self.properties == other.properties
    }
}

impl Eq for ModelSchema {}

///
/// PropertySummary
/// Serializable view of one descriptor, without its accessor.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct PropertySummary {
    pub name: String,
    pub ty: TypeRef,
    pub state_management: StateManagement,
    pub writable: bool,
    pub declared_by: Vec<TypeRef>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub annotations: Vec<AnnotationKind>,
}

impl From<&PropertyDescriptor> for PropertySummary {
    fn from(p: &PropertyDescriptor) -> Self {
        Self {
            name: p.name().to_string(),
            ty: p.ty().clone(),
            state_management: p.state_management(),
            writable: p.is_writable(),
            declared_by: p.declared_by().iter().cloned().collect(),
            annotations: p.annotations().map(|a| a.kind.clone()).collect(),
        }
    }
}
