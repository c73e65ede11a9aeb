//! Generation arena for accessor implementations.
//!
//! Every registry owns one `Generation`. Implementations supplied at
//! registration live in the arena and are addressed by slot index; a
//! `BoundAccessor` holds only the index and a weak handle. Retiring (or
//! dropping) a generation frees all of its implementations at once, and any
//! accessor still pointing at it reports `AccessError::Stale` instead of
//! keeping it alive.

use crate::{
    error::AccessError,
    node::{Invoker, MethodSignature},
    obs::sink::{MetricsEvent, record},
    types::TypeRef,
    value::Value,
};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::{
    any::Any,
    collections::BTreeMap,
    fmt::{self, Debug},
    sync::{
        Arc, RwLock, Weak,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
};

static NEXT_GENERATION: AtomicU64 = AtomicU64::new(1);

///
/// GenerationId
///

#[derive(
    Clone, Copy, Debug, Deserialize, Display, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize,
)]
pub struct GenerationId(u64);

impl GenerationId {
    fn next() -> Self {
        Self(NEXT_GENERATION.fetch_add(1, Ordering::Relaxed))
    }

    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

///
/// SlotId
///

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct SlotId(u32);

///
/// Generation
///

pub struct Generation {
    id: GenerationId,
    retired: AtomicBool,
    invokers: RwLock<Vec<Invoker>>,
}

impl Generation {
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            id: GenerationId::next(),
            retired: AtomicBool::new(false),
            invokers: RwLock::new(Vec::new()),
        })
    }

    #[must_use]
    pub const fn id(&self) -> GenerationId {
        self.id
    }

    #[must_use]
    pub fn is_retired(&self) -> bool {
        self.retired.load(Ordering::Acquire)
    }

    /// Number of implementations currently owned by the arena.
    #[must_use]
    pub fn len(&self) -> usize {
        self.invokers
            .read()
            .expect("generation RwLock poisoned while acquiring read lock")
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // insert
    // registry-only; slots are never reused within a generation
    pub(crate) fn insert(&self, invoker: Invoker) -> SlotId {
        let mut invokers = self
            .invokers
            .write()
            .expect("generation RwLock poisoned while acquiring write lock");
        let slot = u32::try_from(invokers.len()).expect("generation arena exceeds u32 slots");
        invokers.push(invoker);

        SlotId(slot)
    }

    /// Drop every implementation owned by this generation.
    pub fn retire(&self) {
        if self.retired.swap(true, Ordering::AcqRel) {
            return;
        }

        let freed = {
            let mut invokers = self
                .invokers
                .write()
                .expect("generation RwLock poisoned while acquiring write lock");
            let freed = invokers.len();
            invokers.clear();
            freed
        };

        record(MetricsEvent::GenerationRetired {
            generation: self.id,
            freed: u64::try_from(freed).unwrap_or(u64::MAX),
        });
    }

    fn invoker(&self, slot: SlotId) -> Option<Invoker> {
        if self.is_retired() {
            return None;
        }

        self.invokers
            .read()
            .expect("generation RwLock poisoned while acquiring read lock")
            .get(slot.0 as usize)
            .cloned()
    }
}

impl Debug for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Generation")
            .field("id", &self.id)
            .field("retired", &self.is_retired())
            .finish_non_exhaustive()
    }
}

///
/// AccessTarget
/// What a bound getter reads once invoked.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum AccessTarget {
    /// The named value inside a `ManagedInstance`.
    Managed { property: String },

    /// A concrete implementation invoked on the instance itself.
    Implementation { slot: SlotId },

    /// A concrete implementation invoked on the instance's delegate.
    Delegated { property: String, slot: SlotId },
}

///
/// AccessorFactory
///
/// Produces callables that read a property from an arbitrary instance
/// without holding a strong reference to the registering generation.
///

pub trait AccessorFactory {
    fn bind(
        &self,
        declaring: &TypeRef,
        signature: &MethodSignature,
        target: AccessTarget,
    ) -> BoundAccessor;
}

impl AccessorFactory for Arc<Generation> {
    fn bind(
        &self,
        declaring: &TypeRef,
        signature: &MethodSignature,
        target: AccessTarget,
    ) -> BoundAccessor {
        BoundAccessor {
            generation: self.id,
            declaring: declaring.clone(),
            method: signature.name.clone(),
            target,
            arena: Arc::downgrade(self),
        }
    }
}

///
/// BoundAccessor
///

#[derive(Clone, Debug)]
pub struct BoundAccessor {
    generation: GenerationId,
    declaring: TypeRef,
    method: String,
    target: AccessTarget,
    arena: Weak<Generation>,
}

impl BoundAccessor {
    #[must_use]
    pub const fn generation(&self) -> GenerationId {
        self.generation
    }

    #[must_use]
    pub const fn declaring(&self) -> &TypeRef {
        &self.declaring
    }

    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }

    #[must_use]
    pub const fn target(&self) -> &AccessTarget {
        &self.target
    }

    /// Whether the generation behind this accessor is gone or retired.
    #[must_use]
    pub fn is_stale(&self) -> bool {
        self.arena.upgrade().is_none_or(|arena| arena.is_retired())
    }

    pub fn invoke(&self, instance: &dyn Any) -> Result<Value, AccessError> {
        let stale = || AccessError::Stale {
            generation: self.generation,
        };
        let arena = self.arena.upgrade().ok_or_else(stale)?;
        if arena.is_retired() {
            return Err(stale());
        }

        match &self.target {
            AccessTarget::Managed { property } => {
                let managed = self.managed(instance)?;

                Ok(managed.value(property).cloned().unwrap_or(Value::Null))
            }
            AccessTarget::Implementation { slot } => {
                let invoker = arena.invoker(*slot).ok_or_else(stale)?;
                drop(arena);

                invoker.invoke(instance)
            }
            AccessTarget::Delegated { property, slot } => {
                let managed = self.managed(instance)?;
                let delegate = managed
                    .delegate
                    .as_deref()
                    .ok_or_else(|| AccessError::MissingDelegate {
                        property: property.clone(),
                    })?;
                let invoker = arena.invoker(*slot).ok_or_else(stale)?;
                drop(arena);

                invoker.invoke(delegate)
            }
        }
    }

    fn managed<'a>(&self, instance: &'a dyn Any) -> Result<&'a ManagedInstance, AccessError> {
        instance
            .downcast_ref::<ManagedInstance>()
            .ok_or_else(|| AccessError::TypeMismatch {
                expected: self.declaring.to_string(),
            })
    }
}

///
/// ManagedInstance
///
/// Storage shape for instances whose state the framework owns: managed
/// property values by name, plus the optional external delegate that
/// delegated properties forward to.
///

#[derive(Clone, Default)]
pub struct ManagedInstance {
    values: BTreeMap<String, Value>,
    delegate: Option<Arc<dyn Any + Send + Sync>>,
}

impl ManagedInstance {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, property: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(property, value);
        self
    }

    #[must_use]
    pub fn with_delegate<T: Any + Send + Sync>(mut self, delegate: T) -> Self {
        self.delegate = Some(Arc::new(delegate));
        self
    }

    pub fn set(&mut self, property: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(property.into(), value.into());
    }

    #[must_use]
    pub fn value(&self, property: &str) -> Option<&Value> {
        self.values.get(property)
    }
}

impl Debug for ManagedInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManagedInstance")
            .field("values", &self.values)
            .field("delegate", &self.delegate.is_some())
            .finish()
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;

    struct Engine {
        cylinders: i64,
    }

    fn signature(name: &str) -> MethodSignature {
        MethodSignature {
            name: name.to_string(),
            params: Vec::new(),
        }
    }

    #[test]
    fn generation_ids_are_unique() {
        let a = Generation::new();
        let b = Generation::new();

        assert_ne!(a.id(), b.id());
        assert!(b.id().get() > a.id().get());
    }

    #[test]
    fn implementation_accessor_goes_stale_on_retire() {
        let generation = Generation::new();
        let slot = generation.insert(Invoker::typed(|e: &Engine| e.cylinders));
        let accessor = generation.bind(
            &TypeRef::new("app::Engine"),
            &signature("getCylinders"),
            AccessTarget::Implementation { slot },
        );
        let engine = Engine { cylinders: 8 };

        assert_eq!(accessor.invoke(&engine), Ok(Value::Int(8)));
        assert!(!accessor.is_stale());

        generation.retire();
        assert!(generation.is_empty());
        assert!(accessor.is_stale());
        assert_eq!(
            accessor.invoke(&engine),
            Err(AccessError::Stale {
                generation: generation.id()
            })
        );
    }

    #[test]
    fn accessor_does_not_keep_generation_alive() {
        let generation = Generation::new();
        let id = generation.id();
        let accessor = generation.bind(
            &TypeRef::new("app::Car"),
            &signature("getColor"),
            AccessTarget::Managed {
                property: "color".to_string(),
            },
        );

        drop(generation);

        assert!(accessor.is_stale());
        assert_eq!(
            accessor.invoke(&ManagedInstance::new()),
            Err(AccessError::Stale { generation: id })
        );
    }

    #[test]
    fn managed_accessor_reads_named_value_or_null() {
        let generation = Generation::new();
        let accessor = generation.bind(
            &TypeRef::new("app::Car"),
            &signature("getColor"),
            AccessTarget::Managed {
                property: "color".to_string(),
            },
        );

        let painted = ManagedInstance::new().with("color", "red");
        assert_eq!(accessor.invoke(&painted), Ok(Value::from("red")));
        assert_eq!(accessor.invoke(&ManagedInstance::new()), Ok(Value::Null));
        assert!(matches!(
            accessor.invoke(&Engine { cylinders: 4 }),
            Err(AccessError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn delegated_accessor_forwards_to_delegate() {
        let generation = Generation::new();
        let slot = generation.insert(Invoker::typed(|e: &Engine| e.cylinders));
        let accessor = generation.bind(
            &TypeRef::new("app::Engine"),
            &signature("getCylinders"),
            AccessTarget::Delegated {
                property: "cylinders".to_string(),
                slot,
            },
        );

        let car = ManagedInstance::new().with_delegate(Engine { cylinders: 6 });
        assert_eq!(accessor.invoke(&car), Ok(Value::Int(6)));
        assert_eq!(
            accessor.invoke(&ManagedInstance::new()),
            Err(AccessError::MissingDelegate {
                property: "cylinders".to_string()
            })
        );
    }
}
