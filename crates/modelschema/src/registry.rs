use crate::{
    error::InvalidDescriptorError,
    generation::{Generation, GenerationId},
    node::{ModelTypeDef, ValidateNode},
    types::TypeRef,
};
use modelschema_error::{ErrorTree, err};
use std::{
    collections::{HashMap, HashSet, VecDeque},
    sync::Arc,
};

///
/// TypeRegistry
///
/// Registered model types for one generation (one load of the build logic).
/// Mutable while being populated, then shared read-only; a reload builds a
/// fresh registry and retires the old one.
///

#[derive(Debug)]
pub struct TypeRegistry {
    generation: Arc<Generation>,
    types: HashMap<TypeRef, ModelTypeDef>,
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self {
            generation: Generation::new(),
            types: HashMap::new(),
        }
    }

    #[must_use]
    pub const fn generation(&self) -> &Arc<Generation> {
        &self.generation
    }

    #[must_use]
    pub fn generation_id(&self) -> GenerationId {
        self.generation.id()
    }

    /// Register one type, moving its implementations into the arena.
    pub fn register(&mut self, mut def: ModelTypeDef) -> Result<(), InvalidDescriptorError> {
        let subject = def.ty.to_string();
        let mut errs = ErrorTree::new();

        errs.add_result(def.validate());
        if self.types.contains_key(&def.ty) {
            err!(errs, "type is already registered");
        }
        if self.generation.is_retired() {
            err!(errs, "generation {} is retired", self.generation.id());
        }
        errs.result()
            .map_err(|issues| InvalidDescriptorError::new(subject, issues))?;

        for method in &mut def.methods {
            if let Some(invoker) = method.invoker.take() {
                method.slot = Some(self.generation.insert(invoker));
            }
        }
        self.types.insert(def.ty.clone(), def);

        Ok(())
    }

    /// Register several types, reporting every rejected one together.
    pub fn register_all(
        &mut self,
        defs: impl IntoIterator<Item = ModelTypeDef>,
    ) -> Result<(), InvalidDescriptorError> {
        let mut errs = ErrorTree::new();
        for def in defs {
            if let Err(e) = self.register(def) {
                errs.merge_for(e.subject, e.issues);
            }
        }

        errs.result()
            .map_err(|issues| InvalidDescriptorError::new("registry", issues))
    }

    #[must_use]
    pub fn get(&self, ty: &TypeRef) -> Option<&ModelTypeDef> {
        self.types.get(ty)
    }

    #[must_use]
    pub fn contains(&self, ty: &TypeRef) -> bool {
        self.types.contains_key(ty)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.types.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Free every implementation registered in this generation.
    pub fn retire(&self) {
        self.generation.retire();
    }

    /// Transitive supertypes of `ty`, `ty` first, each exactly once, in
    /// breadth-first declaration order. Unregistered supertypes and
    /// inheritance cycles are reported; the walk still covers everything
    /// reachable.
    pub fn closure(&self, ty: &TypeRef) -> Result<Vec<&ModelTypeDef>, ErrorTree> {
        let mut errs = ErrorTree::new();
        let mut out = Vec::new();
        let mut seen = HashSet::new();
        let mut queue = VecDeque::new();

        seen.insert(ty);
        queue.push_back(ty);

        while let Some(current) = queue.pop_front() {
            let Some(def) = self.types.get(current) else {
                errs.add_for("supertypes", format!("'{current}' is not registered"));
                continue;
            };
            out.push(def);

            for supertype in &def.supertypes {
                if seen.insert(supertype) {
                    queue.push_back(supertype);
                }
            }
        }

        self.find_cycles(ty, &mut Vec::new(), &mut HashSet::new(), &mut errs);
        errs.result()?;

        Ok(out)
    }

    // find_cycles
    // depth-first; an edge back onto the current path closes a cycle
    fn find_cycles<'a>(
        &'a self,
        ty: &'a TypeRef,
        path: &mut Vec<&'a TypeRef>,
        done: &mut HashSet<&'a TypeRef>,
        errs: &mut ErrorTree,
    ) {
        let Some(def) = self.types.get(ty) else {
            return;
        };

        path.push(ty);
        for supertype in &def.supertypes {
            if path.contains(&supertype) {
                errs.add_for(
                    "supertypes",
                    format!("inheritance cycle through '{}'", def.ty),
                );
            } else if !done.contains(supertype) {
                self.find_cycles(supertype, path, done, errs);
            }
        }
        path.pop();
        done.insert(ty);
    }

    /// Whether a value of `from` can stand in for `to`.
    #[must_use]
    pub fn is_assignable(&self, from: &TypeRef, to: &TypeRef) -> bool {
        if from == to {
            return true;
        }

        let mut seen = HashSet::new();
        let mut stack = vec![from];
        while let Some(current) = stack.pop() {
            let Some(def) = self.types.get(current) else {
                continue;
            };
            for supertype in &def.supertypes {
                if supertype == to {
                    return true;
                }
                if seen.insert(supertype) {
                    stack.push(supertype);
                }
            }
        }

        false
    }
}

///
/// TESTS
///
