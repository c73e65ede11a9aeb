use serde::{Deserialize, Serialize};
use std::{
    fmt::{self, Display},
    sync::Arc,
};

///
/// CONSTANTS
///

const STRING_PATH: &str = "string";
const INT_PATH: &str = "int";
const BOOL_PATH: &str = "bool";
const UNIT_PATH: &str = "unit";

///
/// TypeRef
///
/// Identity of a (possibly generic) type: a fully qualified path plus its
/// generic arguments. Cheap to clone; used as the `type` of a property, as
/// the key space of `declared_by`, and as the cache key for schemas.
///

#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct TypeRef {
    path: Arc<str>,

    #[serde(default = "no_args", skip_serializing_if = "<[_]>::is_empty")]
    args: Arc<[Self]>,
}

fn no_args() -> Arc<[TypeRef]> {
    Arc::from(Vec::new())
}

impl TypeRef {
    #[must_use]
    pub fn new(path: impl AsRef<str>) -> Self {
        Self {
            path: Arc::from(path.as_ref()),
            args: no_args(),
        }
    }

    #[must_use]
    pub fn generic(path: impl AsRef<str>, args: impl IntoIterator<Item = Self>) -> Self {
        Self {
            path: Arc::from(path.as_ref()),
            args: args.into_iter().collect(),
        }
    }

    #[must_use]
    pub fn string() -> Self {
        Self::new(STRING_PATH)
    }

    #[must_use]
    pub fn int() -> Self {
        Self::new(INT_PATH)
    }

    #[must_use]
    pub fn bool() -> Self {
        Self::new(BOOL_PATH)
    }

    /// The "no value" return type.
    #[must_use]
    pub fn unit() -> Self {
        Self::new(UNIT_PATH)
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[must_use]
    pub fn args(&self) -> &[Self] {
        &self.args
    }

    #[must_use]
    pub fn is_unit(&self) -> bool {
        self.args.is_empty() && &*self.path == UNIT_PATH
    }

    #[must_use]
    pub fn is_bool(&self) -> bool {
        self.args.is_empty() && &*self.path == BOOL_PATH
    }

    /// Last path segment, with generic arguments rendered by simple name.
    #[must_use]
    pub fn simple_name(&self) -> String {
        let base = self.path.rsplit("::").next().unwrap_or(&self.path);
        if self.args.is_empty() {
            return base.to_string();
        }

        let args = self
            .args
            .iter()
            .map(Self::simple_name)
            .collect::<Vec<_>>()
            .join(", ");

        format!("{base}<{args}>")
    }
}

impl Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path)?;
        if !self.args.is_empty() {
            write!(f, "<")?;
            for (i, arg) in self.args.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{arg}")?;
            }
            write!(f, ">")?;
        }

        Ok(())
    }
}

impl From<&str> for TypeRef {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_name_strips_module_path_and_keeps_generics() {
        let list = TypeRef::generic(
            "app::collections::List",
            [TypeRef::new("app::model::Person")],
        );

        assert_eq!(list.simple_name(), "List<Person>");
        assert_eq!(list.args(), [TypeRef::new("app::model::Person")]);
        assert_eq!(
            list.to_string(),
            "app::collections::List<app::model::Person>"
        );
        assert_eq!(TypeRef::int().simple_name(), "int");
    }

    #[test]
    fn generic_arguments_participate_in_identity() {
        let of_string = TypeRef::generic("List", [TypeRef::string()]);
        let of_int = TypeRef::generic("List", [TypeRef::int()]);

        assert_ne!(of_string, of_int);
        assert_ne!(of_string, TypeRef::new("List"));
        assert_eq!(of_string, TypeRef::generic("List", [TypeRef::string()]));
    }

    #[test]
    fn builtin_predicates() {
        assert!(TypeRef::unit().is_unit());
        assert!(TypeRef::bool().is_bool());
        assert!(!TypeRef::generic("unit", [TypeRef::int()]).is_unit());
    }
}
