use crate::{
    node::{MethodDef, ModelTypeDef},
    types::TypeRef,
};
use modelschema_error::ErrorTree;
use std::collections::BTreeMap;

///
/// Role
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Role {
    Getter,
    Setter,
}

///
/// Declaration
/// One accessor contributing to a property, tagged with where it came from.
///

#[derive(Clone, Copy, Debug)]
pub(crate) struct Declaration<'a> {
    pub declaring: &'a TypeRef,
    pub role: Role,
    pub method: &'a MethodDef,
}

impl<'a> Declaration<'a> {
    /// The property type as this declaration sees it.
    pub fn value_type(&self) -> &'a TypeRef {
        match self.role {
            Role::Getter => &self.method.returns,
            Role::Setter => &self.method.params[0],
        }
    }

    pub const fn is_getter(&self) -> bool {
        matches!(self.role, Role::Getter)
    }
}

///
/// Discovery
///
/// Declarations grouped by property name before any decision is made.
/// `BTreeMap` keeps per-property diagnostics in a stable order.
///

#[derive(Debug, Default)]
pub(crate) struct Discovery<'a> {
    pub properties: BTreeMap<String, Vec<Declaration<'a>>>,
    pub issues: ErrorTree,
}

/// Walk a supertype closure and group every accessor-shaped method.
pub(crate) fn discover<'a>(closure: &[&'a ModelTypeDef], allow_is_getters: bool) -> Discovery<'a> {
    let mut discovery = Discovery::default();

    for &def in closure {
        for method in &def.methods {
            match accessor_shape(method, allow_is_getters) {
                Some((role, property)) => {
                    discovery
                        .properties
                        .entry(property)
                        .or_default()
                        .push(Declaration {
                            declaring: &def.ty,
                            role,
                            method,
                        });
                }
                None if method.is_abstract() => {
                    discovery.issues.add_for(
                        &method.name,
                        format!(
                            "abstract method '{}' declared by '{}' is not a getter or setter",
                            method.signature(),
                            def.ty
                        ),
                    );
                }
                None => {}
            }
        }
    }

    discovery
}

/// Classify a method as a getter or setter and derive its property name.
pub(crate) fn accessor_shape(method: &MethodDef, allow_is_getters: bool) -> Option<(Role, String)> {
    let name = method.name.as_str();

    if method.params.is_empty() && !method.returns.is_unit() {
        if let Some(property) = name.strip_prefix("get").and_then(property_name) {
            return Some((Role::Getter, property));
        }
        if allow_is_getters
            && method.returns.is_bool()
            && let Some(property) = name.strip_prefix("is").and_then(property_name)
        {
            return Some((Role::Getter, property));
        }
    }

    if method.params.len() == 1
        && method.returns.is_unit()
        && let Some(property) = name.strip_prefix("set").and_then(property_name)
    {
        return Some((Role::Setter, property));
    }

    None
}

// property_name
// `Age` -> `age`, `URL` -> `URL`; the suffix must start upper-case
fn property_name(suffix: &str) -> Option<String> {
    let mut chars = suffix.chars();
    let first = chars.next()?;
    if !first.is_uppercase() {
        return None;
    }

    if chars.next().is_some_and(char::is_uppercase) {
        return Some(suffix.to_string());
    }

    let mut out = first.to_lowercase().collect::<String>();
    out.push_str(&suffix[first.len_utf8()..]);

    Some(out)
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;

    fn shape(method: &MethodDef) -> Option<(Role, String)> {
        accessor_shape(method, true)
    }

    #[test]
    fn getter_and_setter_names_decapitalize() {
        assert_eq!(
            shape(&MethodDef::getter("getAge", TypeRef::int())),
            Some((Role::Getter, "age".to_string()))
        );
        assert_eq!(
            shape(&MethodDef::setter("setFirstName", TypeRef::string())),
            Some((Role::Setter, "firstName".to_string()))
        );
        assert_eq!(
            shape(&MethodDef::getter("getURL", TypeRef::string())),
            Some((Role::Getter, "URL".to_string()))
        );
    }

    #[test]
    fn is_getters_require_bool_and_config() {
        let is_active = MethodDef::getter("isActive", TypeRef::bool());

        assert_eq!(shape(&is_active), Some((Role::Getter, "active".to_string())));
        assert_eq!(accessor_shape(&is_active, false), None);
        assert_eq!(shape(&MethodDef::getter("isActive", TypeRef::int())), None);
    }

    #[test]
    fn non_accessor_shapes_are_ignored() {
        assert_eq!(shape(&MethodDef::getter("get", TypeRef::int())), None);
        assert_eq!(shape(&MethodDef::getter("getaway", TypeRef::int())), None);
        assert_eq!(shape(&MethodDef::getter("getAge", TypeRef::unit())), None);
        assert_eq!(
            shape(&MethodDef::new("setAge", vec![TypeRef::int()], TypeRef::int())),
            None
        );
        assert_eq!(
            shape(&MethodDef::new(
                "getAge",
                vec![TypeRef::int()],
                TypeRef::int()
            )),
            None
        );
    }

    #[test]
    fn discover_groups_by_property_and_flags_abstract_non_accessors() {
        let person = ModelTypeDef::interface("app::Person")
            .method(MethodDef::getter("getAge", TypeRef::int()))
            .method(MethodDef::setter("setAge", TypeRef::int()))
            .method(MethodDef::new("describe", Vec::new(), TypeRef::string()))
            .method(MethodDef::new("render", Vec::new(), TypeRef::string()).concrete());
        let named = ModelTypeDef::interface("app::Named")
            .method(MethodDef::getter("getAge", TypeRef::int()));

        let discovery = discover(&[&person, &named], true);

        let age = &discovery.properties["age"];
        assert_eq!(age.len(), 3);
        assert_eq!(age.iter().filter(|d| d.is_getter()).count(), 2);
        assert_eq!(age[2].declaring, &TypeRef::new("app::Named"));

        let issues = discovery.issues.to_string();
        assert!(issues.contains("describe"), "{issues}");
        assert!(!issues.contains("render"), "{issues}");
    }
}
