//! Model-property schema extraction.
//!
//! Register model types into a [`TypeRegistry`], then ask a
//! [`SchemaExtractor`] (or a [`SchemaCache`]) for the [`ModelSchema`] of a
//! candidate type. Each property comes back as an immutable
//! [`PropertyDescriptor`] classified as managed, unmanaged or delegated.

pub mod annotation;
pub mod cache;
pub mod config;
pub mod error;
pub mod extract;
pub mod generation;
pub mod node;
pub mod obs;
pub mod property;
pub mod registry;
pub mod schema;
pub mod types;
pub mod validate;
pub mod value;

#[cfg(test)]
pub(crate) mod test_support;

pub use cache::SchemaCache;
pub use extract::{SchemaExtractor, extract};
pub use modelschema_error::{ErrorTree, err};
pub use property::PropertyDescriptor;
pub use registry::TypeRegistry;
pub use schema::ModelSchema;

use crate::{
    config::ConfigError,
    error::{AccessError, ExtractError, InvalidDescriptorError},
};
use thiserror::Error as ThisError;

///
/// Prelude
///

pub mod prelude {
    pub use crate::{
        annotation::{Annotation, AnnotationKind, AnnotationMap},
        cache::SchemaCache,
        config::{AnnotationCollision, ExtractConfig},
        error::{AccessError, ConflictKind, ExtractError},
        extract::SchemaExtractor,
        generation::ManagedInstance,
        node::{MethodDef, ModelTypeDef},
        property::{PropertyDescriptor, StateManagement},
        registry::TypeRegistry,
        schema::ModelSchema,
        types::TypeRef,
        value::Value,
    };
}

///
/// Error
///

#[derive(Debug, ThisError)]
pub enum Error {
    #[error(transparent)]
    AccessError(#[from] AccessError),

    #[error(transparent)]
    ConfigError(#[from] ConfigError),

    #[error(transparent)]
    ExtractError(#[from] ExtractError),

    #[error(transparent)]
    InvalidDescriptorError(#[from] InvalidDescriptorError),
}
