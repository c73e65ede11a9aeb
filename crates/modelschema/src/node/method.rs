use crate::{
    annotation::Annotation, error::AccessError, generation::SlotId, node::ValidateNode,
    types::TypeRef, value::Value,
};
use modelschema_error::{ErrorTree, err};
use std::{
    any::{Any, type_name},
    fmt::{self, Debug, Display},
    sync::Arc,
};

///
/// Invoker
///
/// Type-erased, thread-safe implementation of a no-argument accessor.
/// Owned by a generation arena once its declaring type is registered.
///

#[derive(Clone)]
pub struct Invoker(Arc<dyn Fn(&dyn Any) -> Result<Value, AccessError> + Send + Sync>);

impl Invoker {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&dyn Any) -> Result<Value, AccessError> + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Wrap a typed getter; invoking it on anything other than a `T` is a
    /// type mismatch.
    pub fn typed<T, V, F>(f: F) -> Self
    where
        T: Any,
        V: Into<Value>,
        F: Fn(&T) -> V + Send + Sync + 'static,
    {
        Self::new(move |instance| {
            instance
                .downcast_ref::<T>()
                .map(|target| f(target).into())
                .ok_or_else(|| AccessError::TypeMismatch {
                    expected: type_name::<T>().to_string(),
                })
        })
    }

    pub fn invoke(&self, instance: &dyn Any) -> Result<Value, AccessError> {
        (self.0)(instance)
    }
}

impl Debug for Invoker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Invoker(..)")
    }
}

///
/// MethodBody
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MethodBody {
    Abstract,
    Concrete,
}

impl MethodBody {
    #[must_use]
    pub const fn is_abstract(self) -> bool {
        matches!(self, Self::Abstract)
    }
}

///
/// MethodSignature
/// Name plus parameter types; the identity used for binding and dedup.
///

#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct MethodSignature {
    pub name: String,
    pub params: Vec<TypeRef>,
}

impl Display for MethodSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let params = self
            .params
            .iter()
            .map(TypeRef::simple_name)
            .collect::<Vec<_>>()
            .join(", ");

        write!(f, "{}({params})", self.name)
    }
}

///
/// MethodDef
///

#[derive(Clone, Debug)]
pub struct MethodDef {
    pub name: String,
    pub params: Vec<TypeRef>,
    pub returns: TypeRef,
    pub body: MethodBody,
    pub annotations: Vec<Annotation>,

    // Before registration: the implementation supplied by the author.
    // After registration: moved into the arena and replaced by `slot`.
    pub(crate) invoker: Option<Invoker>,
    pub(crate) slot: Option<SlotId>,
}

impl MethodDef {
    #[must_use]
    pub fn new(name: impl Into<String>, params: Vec<TypeRef>, returns: TypeRef) -> Self {
        Self {
            name: name.into(),
            params,
            returns,
            body: MethodBody::Abstract,
            annotations: Vec::new(),
            invoker: None,
            slot: None,
        }
    }

    /// Abstract no-argument getter.
    #[must_use]
    pub fn getter(name: impl Into<String>, returns: TypeRef) -> Self {
        Self::new(name, Vec::new(), returns)
    }

    /// Abstract single-argument setter returning unit.
    #[must_use]
    pub fn setter(name: impl Into<String>, param: TypeRef) -> Self {
        Self::new(name, vec![param], TypeRef::unit())
    }

    #[must_use]
    pub fn annotated(mut self, annotation: Annotation) -> Self {
        self.annotations.push(annotation);
        self
    }

    /// Mark the method concrete without a readable implementation
    /// (concrete setters, or methods whose body is irrelevant to reads).
    #[must_use]
    pub const fn concrete(mut self) -> Self {
        self.body = MethodBody::Concrete;
        self
    }

    /// Mark the method concrete and supply the implementation used to read
    /// it from an instance of `T`.
    #[must_use]
    pub fn implemented_by<T, V, F>(mut self, f: F) -> Self
    where
        T: Any,
        V: Into<Value>,
        F: Fn(&T) -> V + Send + Sync + 'static,
    {
        self.body = MethodBody::Concrete;
        self.invoker = Some(Invoker::typed(f));
        self
    }

    #[must_use]
    pub fn signature(&self) -> MethodSignature {
        MethodSignature {
            name: self.name.clone(),
            params: self.params.clone(),
        }
    }

    #[must_use]
    pub const fn is_abstract(&self) -> bool {
        self.body.is_abstract()
    }

    /// Arena slot of the implementation, if this method has one and its
    /// declaring type has been registered.
    #[must_use]
    pub const fn slot(&self) -> Option<SlotId> {
        self.slot
    }
}

impl ValidateNode for MethodDef {
    fn validate(&self) -> Result<(), ErrorTree> {
        let mut errs = ErrorTree::new();

        if self.name.is_empty() {
            err!(errs, "method name is empty");
        } else if !self.name.chars().all(|c| c.is_alphanumeric() || c == '_') {
            err!(errs, "method name '{}' is not an identifier", self.name);
        }

        if self.body.is_abstract() && self.invoker.is_some() {
            err!(
                errs,
                "abstract method '{}' cannot carry an implementation",
                self.name
            );
        }

        errs.result()
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;

    struct Person {
        name: String,
    }

    #[test]
    fn typed_invoker_reads_matching_instances_only() {
        let invoker = Invoker::typed(|p: &Person| p.name.clone());
        let person = Person {
            name: "ada".to_string(),
        };

        assert_eq!(invoker.invoke(&person), Ok(Value::from("ada")));
        assert!(matches!(
            invoker.invoke(&42_u8),
            Err(AccessError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn signature_renders_simple_param_names() {
        let setter = MethodDef::setter("setOwner", TypeRef::new("app::model::Person"));

        assert_eq!(setter.signature().to_string(), "setOwner(Person)");
        assert!(setter.returns.is_unit());
    }

    #[test]
    fn validate_rejects_bad_names() {
        assert!(MethodDef::getter("", TypeRef::int()).validate().is_err());
        assert!(MethodDef::getter("get Age", TypeRef::int()).validate().is_err());
        assert!(MethodDef::getter("getAge", TypeRef::int()).validate().is_ok());
    }
}
