use crate::{generation::GenerationId, types::TypeRef};
use modelschema_error::ErrorTree;
use std::fmt::{self, Display};
use thiserror::Error as ThisError;

///
/// ExtractError
///
/// Every way schema extraction can fail. Extraction is deterministic, so
/// none of these are worth retrying without changing the model type.
///

#[derive(Debug, ThisError)]
pub enum ExtractError {
    #[error(transparent)]
    InvalidDescriptor(#[from] InvalidDescriptorError),

    #[error(transparent)]
    SchemaConflict(#[from] SchemaConflictError),

    #[error(transparent)]
    UnsupportedType(#[from] UnsupportedTypeError),
}

impl ExtractError {
    /// Conflicts carried by a schema-conflict failure; empty otherwise.
    #[must_use]
    pub fn conflicts(&self) -> &[PropertyConflict] {
        match self {
            Self::SchemaConflict(err) => &err.conflicts,
            _ => &[],
        }
    }

    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::SchemaConflict(_))
    }

    #[must_use]
    pub const fn is_invalid_descriptor(&self) -> bool {
        matches!(self, Self::InvalidDescriptor(_))
    }

    #[must_use]
    pub const fn is_unsupported(&self) -> bool {
        matches!(self, Self::UnsupportedType(_))
    }
}

///
/// ConflictKind
///

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[remain::sorted]
pub enum ConflictKind {
    Annotation,
    ReturnType,
    SetterType,
    StateManagement,
    Writability,
}

impl ConflictKind {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Annotation => "annotation collision",
            Self::ReturnType => "incompatible return types",
            Self::SetterType => "incompatible setter types",
            Self::StateManagement => "mixed abstract and concrete declarations",
            Self::Writability => "disagreement on writability",
        }
    }
}

impl Display for ConflictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

///
/// PropertyConflict
/// One inconsistency between declarations of the same property.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PropertyConflict {
    pub property: String,
    pub kind: ConflictKind,
    pub declared_by: Vec<TypeRef>,
    pub detail: String,
}

impl Display for PropertyConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let declared_by = self
            .declared_by
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");

        write!(
            f,
            "property '{}': {}: {} (declared by {declared_by})",
            self.property, self.kind, self.detail
        )
    }
}

///
/// SchemaConflictError
///
/// Carries every conflict found during one extraction, across all
/// properties, so the model author can fix them in a single pass.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SchemaConflictError {
    pub ty: TypeRef,
    pub conflicts: Vec<PropertyConflict>,
}

impl SchemaConflictError {
    pub fn conflicts_for<'a>(
        &'a self,
        property: &'a str,
    ) -> impl Iterator<Item = &'a PropertyConflict> + 'a {
        self.conflicts.iter().filter(move |c| c.property == property)
    }
}

impl Display for SchemaConflictError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "type '{}' has {} conflicting property declaration(s):",
            self.ty,
            self.conflicts.len()
        )?;
        for conflict in &self.conflicts {
            write!(f, "\n  - {conflict}")?;
        }

        Ok(())
    }
}

impl std::error::Error for SchemaConflictError {}

///
/// InvalidDescriptorError
///
/// A malformed model type or descriptor input. When raised for a type that
/// already passed discovery it indicates an internal-consistency defect.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
#[error("invalid model declaration '{subject}':\n{issues}")]
pub struct InvalidDescriptorError {
    pub subject: String,
    pub issues: ErrorTree,
}

impl InvalidDescriptorError {
    #[must_use]
    pub fn new(subject: impl Into<String>, issues: ErrorTree) -> Self {
        Self {
            subject: subject.into(),
            issues,
        }
    }
}

///
/// UnsupportedReason
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum UnsupportedReason {
    FinalClass,
    NotRegistered,
}

impl Display for UnsupportedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FinalClass => f.write_str("it is a final concrete class"),
            Self::NotRegistered => f.write_str("it has not been registered"),
        }
    }
}

///
/// UnsupportedTypeError
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
#[error(
    "type '{ty}' cannot be used as a model type because {reason}; model types must be registered \
     interfaces, abstract classes, or non-final classes that leave room for managed storage"
)]
pub struct UnsupportedTypeError {
    pub ty: TypeRef,
    pub reason: UnsupportedReason,
}

///
/// AccessError
/// Failure to read a property value through a bound accessor.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum AccessError {
    #[error("accessor failed: {0}")]
    Failed(String),

    #[error("delegated property '{property}' has no delegate object on the instance")]
    MissingDelegate { property: String },

    #[error("accessor from generation {generation} is stale")]
    Stale { generation: GenerationId },

    #[error("instance is not compatible with accessor declared by '{expected}'")]
    TypeMismatch { expected: String },
}
