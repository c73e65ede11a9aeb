use crate::{
    generation::{AccessTarget, AccessorFactory, BoundAccessor, Generation},
    node::{MethodDef, MethodSignature, ModelTypeDef},
    registry::TypeRegistry,
    types::TypeRef,
};
use std::{
    collections::BTreeSet,
    sync::{Arc, LazyLock},
};

// Never retired, so accessors bound against it stay live for the whole run.
static FIXTURE_GENERATION: LazyLock<Arc<Generation>> = LazyLock::new(Generation::new);

/// Set of type refs from paths.
pub fn types(paths: &[&str]) -> BTreeSet<TypeRef> {
    paths.iter().map(|p| TypeRef::new(p)).collect()
}

/// Managed getter bound against the shared fixture generation.
pub fn managed_accessor(property: &str) -> BoundAccessor {
    FIXTURE_GENERATION.bind(
        &TypeRef::new("tests::Fixture"),
        &MethodSignature {
            name: format!("get{property}"),
            params: Vec::new(),
        },
        AccessTarget::Managed {
            property: property.to_string(),
        },
    )
}

/// `app::Person { getName(): string; getAge(): int; setAge(int) }`
pub fn person_registry() -> TypeRegistry {
    let mut registry = TypeRegistry::new();
    registry
        .register(
            ModelTypeDef::interface("app::Person")
                .method(MethodDef::getter("getName", TypeRef::string()))
                .method(MethodDef::getter("getAge", TypeRef::int()))
                .method(MethodDef::setter("setAge", TypeRef::int())),
        )
        .expect("person fixture registers");

    registry
}

/// `app::Bottom` extends `app::Left` and `app::Right`, both declaring
/// `getId(): string`.
pub fn diamond_registry() -> TypeRegistry {
    let mut registry = TypeRegistry::new();
    registry
        .register_all([
            ModelTypeDef::interface("app::Left")
                .method(MethodDef::getter("getId", TypeRef::string())),
            ModelTypeDef::interface("app::Right")
                .method(MethodDef::getter("getId", TypeRef::string())),
            ModelTypeDef::interface("app::Bottom")
                .extends("app::Left")
                .extends("app::Right"),
        ])
        .expect("diamond fixture registers");

    registry
}
