//! Generation-aware schema memoization.
//!
//! Extraction is deterministic, so a schema can be reused until the
//! generation that bound its accessors is replaced or retired. Lookups
//! compare the cached generation with the extractor's registry and re-extract
//! on mismatch. Entries are keyed by the extractor's configuration too, since
//! it decides what counts as an accessor and how annotations merge.

use crate::{
    config::ExtractConfig,
    error::ExtractError,
    extract::SchemaExtractor,
    generation::GenerationId,
    obs::sink::{MetricsEvent, record},
    schema::ModelSchema,
    types::TypeRef,
};
use std::{
    collections::HashMap,
    sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

///
/// CacheKey
///

#[derive(Clone, Debug, Eq, Hash, PartialEq)]
struct CacheKey {
    ty: TypeRef,
    delegate: Option<TypeRef>,
    config: ExtractConfig,
}

///
/// SchemaCache
///
/// Shared map from model type to its extracted schema. Failed extractions
/// are not cached.
///

#[derive(Debug, Default)]
pub struct SchemaCache {
    entries: RwLock<HashMap<CacheKey, Arc<ModelSchema>>>,
}

impl SchemaCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_extract(
        &self,
        extractor: &SchemaExtractor<'_>,
        ty: &TypeRef,
    ) -> Result<Arc<ModelSchema>, ExtractError> {
        self.get_or_extract_with_delegate(extractor, ty, None)
    }

    pub fn get_or_extract_with_delegate(
        &self,
        extractor: &SchemaExtractor<'_>,
        ty: &TypeRef,
        delegate: Option<&TypeRef>,
    ) -> Result<Arc<ModelSchema>, ExtractError> {
        let key = CacheKey {
            ty: ty.clone(),
            delegate: delegate.cloned(),
            config: extractor.config().clone(),
        };
        let current = extractor.registry().generation_id();

        let cached = self.read().get(&key).cloned();
        match cached {
            Some(schema) if is_fresh(&schema, current) => {
                record(MetricsEvent::CacheHit { ty: ty.clone() });
                return Ok(schema);
            }
            Some(schema) => {
                record(MetricsEvent::CacheStale {
                    ty: ty.clone(),
                    generation: schema.generation(),
                });
            }
            None => record(MetricsEvent::CacheMiss { ty: ty.clone() }),
        }

        // extract outside the lock; duplicate concurrent misses are harmless
        let schema = Arc::new(extractor.extract_with_delegate(ty, delegate)?);

        let mut entries = self.write();
        let entry = entries.entry(key).or_insert_with(|| schema.clone());
        if !is_fresh(entry, current) {
            *entry = schema;
        }

        Ok(entry.clone())
    }

    /// The cached schema for `ty` without a delegate under `config`, fresh
    /// or not.
    #[must_use]
    pub fn peek(&self, ty: &TypeRef, config: &ExtractConfig) -> Option<Arc<ModelSchema>> {
        let key = CacheKey {
            ty: ty.clone(),
            delegate: None,
            config: config.clone(),
        };

        self.read().get(&key).cloned()
    }

    /// Drop every entry extracted in `generation`; returns how many went.
    pub fn evict_generation(&self, generation: GenerationId) -> usize {
        let mut entries = self.write();
        let before = entries.len();
        entries.retain(|_, schema| schema.generation() != generation);

        before - entries.len()
    }

    pub fn clear(&self) {
        self.write().clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<CacheKey, Arc<ModelSchema>>> {
        self.entries
            .read()
            .expect("schema cache RwLock poisoned while acquiring read lock")
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<CacheKey, Arc<ModelSchema>>> {
        self.entries
            .write()
            .expect("schema cache RwLock poisoned while acquiring write lock")
    }
}

fn is_fresh(schema: &ModelSchema, current: GenerationId) -> bool {
    schema.generation() == current && !schema.is_stale()
}

///
/// TESTS
///
