use crate::{
    node::{MethodDef, ValidateNode},
    types::TypeRef,
};
use modelschema_error::{ErrorTree, err};
use std::collections::BTreeSet;

///
/// TypeKind
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TypeKind {
    Interface,
    AbstractClass,
    Class { is_final: bool },
}

impl TypeKind {
    /// Whether the type leaves room for abstract (framework-provided) methods.
    #[must_use]
    pub const fn is_abstract(self) -> bool {
        matches!(self, Self::Interface | Self::AbstractClass)
    }

    #[must_use]
    pub const fn is_final(self) -> bool {
        matches!(self, Self::Class { is_final: true })
    }
}

///
/// ModelTypeDef
///
/// One registered type: its kind, direct supertypes and declared methods.
/// Inherited methods are not repeated here; the extractor walks supertypes.
///

#[derive(Clone, Debug)]
pub struct ModelTypeDef {
    pub ty: TypeRef,
    pub kind: TypeKind,
    pub supertypes: Vec<TypeRef>,
    pub methods: Vec<MethodDef>,
}

impl ModelTypeDef {
    #[must_use]
    pub const fn new(ty: TypeRef, kind: TypeKind) -> Self {
        Self {
            ty,
            kind,
            supertypes: Vec::new(),
            methods: Vec::new(),
        }
    }

    #[must_use]
    pub fn interface(ty: impl Into<TypeRef>) -> Self {
        Self::new(ty.into(), TypeKind::Interface)
    }

    #[must_use]
    pub fn abstract_class(ty: impl Into<TypeRef>) -> Self {
        Self::new(ty.into(), TypeKind::AbstractClass)
    }

    #[must_use]
    pub fn class(ty: impl Into<TypeRef>) -> Self {
        Self::new(ty.into(), TypeKind::Class { is_final: false })
    }

    #[must_use]
    pub fn final_class(ty: impl Into<TypeRef>) -> Self {
        Self::new(ty.into(), TypeKind::Class { is_final: true })
    }

    #[must_use]
    pub fn extends(mut self, supertype: impl Into<TypeRef>) -> Self {
        self.supertypes.push(supertype.into());
        self
    }

    #[must_use]
    pub fn method(mut self, method: MethodDef) -> Self {
        self.methods.push(method);
        self
    }
}

impl ValidateNode for ModelTypeDef {
    fn validate(&self) -> Result<(), ErrorTree> {
        let mut errs = ErrorTree::new();

        if self.ty.path().is_empty() {
            err!(errs, "type path is empty");
        }

        // supertypes
        let mut seen = BTreeSet::new();
        for supertype in &self.supertypes {
            if supertype == &self.ty {
                errs.add_for("supertypes", format!("'{}' cannot extend itself", self.ty));
            } else if !seen.insert(supertype) {
                errs.add_for(
                    "supertypes",
                    format!("'{supertype}' is listed more than once"),
                );
            }
        }

        // methods
        let mut signatures = BTreeSet::new();
        for method in &self.methods {
            if let Err(e) = method.validate() {
                errs.merge_for(&method.name, e);
            }

            if !signatures.insert(method.signature()) {
                errs.add_for(
                    &method.name,
                    format!("signature '{}' is declared twice", method.signature()),
                );
            }

            if !self.kind.is_abstract() && method.is_abstract() {
                errs.add_for(
                    &method.name,
                    "concrete class cannot declare an abstract method",
                );
            }
        }

        errs.result()
    }
}

///
/// TESTS
///
