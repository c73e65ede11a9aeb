//! Schema extraction.
//!
//! One pass per candidate type, in stages:
//! closure -> discovery -> per-property reconcile/classify -> bind -> assemble.
//! Every stage after discovery works on an explicit declaration list, so all
//! problems across all properties are collected before anything is returned.

mod assemble;
mod classify;
mod discover;
mod reconcile;

use crate::{
    config::ExtractConfig,
    error::{
        ConflictKind, ExtractError, InvalidDescriptorError, PropertyConflict,
        SchemaConflictError, UnsupportedReason, UnsupportedTypeError,
    },
    extract::{
        discover::{Declaration, Discovery, Role},
        reconcile::{Problem, declaring_types},
    },
    obs::sink::{FailureKind, MetricsEvent, record},
    property::PropertyDescriptor,
    registry::TypeRegistry,
    schema::ModelSchema,
    types::TypeRef,
};
use modelschema_error::ErrorTree;

///
/// SchemaExtractor
///
/// Reads a registry and never mutates it; share one across threads freely.
///

#[derive(Clone, Debug)]
pub struct SchemaExtractor<'r> {
    registry: &'r TypeRegistry,
    config: ExtractConfig,
}

impl<'r> SchemaExtractor<'r> {
    #[must_use]
    pub const fn new(registry: &'r TypeRegistry, config: ExtractConfig) -> Self {
        Self { registry, config }
    }

    #[must_use]
    pub const fn registry(&self) -> &'r TypeRegistry {
        self.registry
    }

    #[must_use]
    pub const fn config(&self) -> &ExtractConfig {
        &self.config
    }

    /// Extract the schema of `ty`.
    pub fn extract(&self, ty: &TypeRef) -> Result<ModelSchema, ExtractError> {
        self.extract_with_delegate(ty, None)
    }

    /// Extract the schema of `ty`, classifying abstract properties the
    /// `delegate` type implements as `Delegated`.
    pub fn extract_with_delegate(
        &self,
        ty: &TypeRef,
        delegate: Option<&TypeRef>,
    ) -> Result<ModelSchema, ExtractError> {
        record(MetricsEvent::ExtractStart { ty: ty.clone() });

        let result = self.run(ty, delegate);
        match &result {
            Ok(schema) => record(MetricsEvent::ExtractFinish {
                ty: ty.clone(),
                properties: count(schema.len()),
            }),
            Err(err) => {
                let (kind, problems) = match err {
                    ExtractError::InvalidDescriptor(e) => {
                        (FailureKind::InvalidDescriptor, e.issues.len())
                    }
                    ExtractError::SchemaConflict(e) => (FailureKind::Conflict, e.conflicts.len()),
                    ExtractError::UnsupportedType(_) => (FailureKind::Unsupported, 1),
                };
                record(MetricsEvent::ExtractFailed {
                    ty: ty.clone(),
                    kind,
                    problems: count(problems),
                });
            }
        }

        result
    }

    fn run(&self, ty: &TypeRef, delegate: Option<&TypeRef>) -> Result<ModelSchema, ExtractError> {
        self.check_eligible(ty)?;

        let invalid = |issues| InvalidDescriptorError::new(ty.to_string(), issues);
        let closure = self.registry.closure(ty).map_err(invalid)?;
        let delegate_discovery = delegate
            .map(|d| self.discover_delegate(d))
            .transpose()
            .map_err(invalid)?;

        let Discovery {
            properties,
            mut issues,
        } = discover::discover(&closure, self.config.allow_is_getters);
        let mut conflicts = Vec::new();
        let mut descriptors = Vec::new();

        for (name, decls) in &properties {
            let delegate_decls = delegate_discovery
                .as_ref()
                .and_then(|d| d.properties.get(name))
                .map_or(&[][..], Vec::as_slice);

            match self.property(name, decls, delegate_decls) {
                Ok(descriptor) => descriptors.push(descriptor),
                Err(problems) => {
                    for problem in problems {
                        match problem {
                            Problem::Invalid(message) => issues.add_for(name, message),
                            Problem::Conflict {
                                kind,
                                detail,
                                involving,
                            } => {
                                let mut declared_by = declaring_types(decls);
                                declared_by.extend(involving);
                                conflicts.push(PropertyConflict {
                                    property: name.clone(),
                                    kind,
                                    declared_by,
                                    detail,
                                });
                            }
                        }
                    }
                }
            }
        }

        issues.result().map_err(invalid)?;
        if !conflicts.is_empty() {
            return Err(SchemaConflictError {
                ty: ty.clone(),
                conflicts,
            }
            .into());
        }

        Ok(ModelSchema::new(
            ty.clone(),
            delegate.cloned(),
            self.registry.generation_id(),
            descriptors,
        ))
    }

    fn check_eligible(&self, ty: &TypeRef) -> Result<(), UnsupportedTypeError> {
        let reason = match self.registry.get(ty) {
            None => UnsupportedReason::NotRegistered,
            Some(def) if def.kind.is_final() => UnsupportedReason::FinalClass,
            Some(_) => return Ok(()),
        };

        Err(UnsupportedTypeError {
            ty: ty.clone(),
            reason,
        })
    }

    // discover_delegate
    // only the delegate's getters matter; its own shape problems are not ours
    fn discover_delegate(&self, delegate: &TypeRef) -> Result<Discovery<'r>, ErrorTree> {
        if !self.registry.contains(delegate) {
            let mut errs = ErrorTree::new();
            errs.add_for(
                "delegate",
                format!("delegate type '{delegate}' is not registered"),
            );

            return Err(errs);
        }

        let closure = self.registry.closure(delegate).map_err(|issues| {
            let mut errs = ErrorTree::new();
            errs.merge_for("delegate", issues);
            errs
        })?;
        let mut discovery = discover::discover(&closure, self.config.allow_is_getters);
        discovery.issues = ErrorTree::new();

        Ok(discovery)
    }

    // property
    // everything about one property; collects problems rather than stopping
    fn property(
        &self,
        name: &str,
        decls: &[Declaration<'r>],
        delegate_decls: &[Declaration<'r>],
    ) -> Result<PropertyDescriptor, Vec<Problem>> {
        let mut problems = Vec::<Problem>::new();
        let policy = self.config.annotation_collision;

        let reconciled = reconcile::reconcile(decls, |from, to| {
            self.registry.is_assignable(from, to)
        })
        .map_err(|p| problems.extend(p))
        .ok();
        let body = classify::uniform_body(decls)
            .map_err(|p| problems.push(p))
            .ok();
        let annotations = assemble::merge_annotations(decls, Role::Getter, policy)
            .map_err(|p| problems.extend(p))
            .ok();
        let setter_annotations = assemble::merge_annotations(decls, Role::Setter, policy)
            .map_err(|p| problems.extend(p))
            .ok();

        let (Some(reconciled), Some(body), Some(annotations), Some(setter_annotations)) =
            (reconciled, body, annotations, setter_annotations)
        else {
            return Err(problems);
        };

        let delegate_getter = if body.is_abstract() {
            self.delegate_getter(&reconciled.ty, delegate_decls)
                .map_err(|p| vec![p])?
        } else {
            None
        };
        let state = classify::classify(body, delegate_getter.as_ref());
        let getter = assemble::bind_getter(
            self.registry.generation(),
            name,
            state,
            &reconciled,
            delegate_getter.as_ref(),
        )
        .map_err(|p| vec![p])?;

        PropertyDescriptor::of(
            &reconciled.ty,
            name,
            state,
            reconciled.writable,
            &reconciled.declared_by,
            &getter,
            &annotations,
            &setter_annotations,
        )
        .map_err(|e| {
            e.issues
                .flatten()
                .into_iter()
                .map(|(_, message)| Problem::Invalid(message))
                .collect()
        })
    }

    // delegate_getter
    // the delegate's first concrete getter; it must produce the property type
    fn delegate_getter(
        &self,
        property_ty: &TypeRef,
        delegate_decls: &[Declaration<'r>],
    ) -> Result<Option<Declaration<'r>>, Problem> {
        let Some(getter) = delegate_decls
            .iter()
            .find(|d| d.is_getter() && !d.method.is_abstract())
        else {
            return Ok(None);
        };

        if !self.registry.is_assignable(getter.value_type(), property_ty) {
            return Err(Problem::conflict(
                ConflictKind::ReturnType,
                format!(
                    "delegate '{}' returns {} but the property type is {property_ty}",
                    getter.declaring,
                    getter.value_type()
                ),
            )
            .involving(getter.declaring));
        }

        Ok(Some(*getter))
    }
}

fn count(n: usize) -> u64 {
    u64::try_from(n).unwrap_or(u64::MAX)
}

/// Extract with the default configuration.
pub fn extract(registry: &TypeRegistry, ty: &TypeRef) -> Result<ModelSchema, ExtractError> {
    SchemaExtractor::new(registry, ExtractConfig::default()).extract(ty)
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        node::{MethodDef, ModelTypeDef},
        obs::{MetricsSink, with_metrics_sink},
        property::StateManagement,
        test_support::{diamond_registry, person_registry},
    };
    use std::{cell::RefCell, rc::Rc};

    fn registry_of(defs: impl IntoIterator<Item = ModelTypeDef>) -> TypeRegistry {
        let mut registry = TypeRegistry::new();
        registry.register_all(defs).expect("fixtures register");

        registry
    }

    #[test]
    fn diamond_getter_yields_one_descriptor_naming_both_parents() {
        let registry = diamond_registry();
        let schema = extract(&registry, &TypeRef::new("app::Bottom")).expect("extracts");

        let id = schema.property("id").expect("id property");
        assert_eq!(schema.len(), 1);
        assert_eq!(id.state_management(), StateManagement::Managed);
        assert!(id.declared_by().contains(&TypeRef::new("app::Left")));
        assert!(id.declared_by().contains(&TypeRef::new("app::Right")));
        assert_eq!(id.getter().declaring(), &TypeRef::new("app::Left"));
    }

    #[test]
    fn final_and_unregistered_candidates_are_unsupported() {
        let registry = registry_of([ModelTypeDef::final_class("app::Sealed")]);

        let err = extract(&registry, &TypeRef::new("app::Sealed")).expect_err("final");
        assert!(matches!(
            err,
            ExtractError::UnsupportedType(UnsupportedTypeError {
                reason: UnsupportedReason::FinalClass,
                ..
            })
        ));

        let err = extract(&registry, &TypeRef::new("app::Ghost")).expect_err("unregistered");
        assert!(err.to_string().contains("has not been registered"), "{err}");
    }

    #[test]
    fn invalid_issues_take_precedence_over_conflicts() {
        let registry = registry_of([ModelTypeDef::interface("app::Broken")
            .method(MethodDef::getter("getId", TypeRef::string()))
            .method(MethodDef::setter("setId", TypeRef::int()))
            .method(MethodDef::setter("setOrphan", TypeRef::int()))]);

        let err = extract(&registry, &TypeRef::new("app::Broken")).expect_err("invalid");
        let ExtractError::InvalidDescriptor(e) = err else {
            panic!("expected invalid descriptor, got {err}");
        };
        assert_eq!(e.issues.flatten()[0].0, "orphan");
    }

    #[test]
    fn cycle_above_the_candidate_is_an_invalid_descriptor() {
        let registry = registry_of([
            ModelTypeDef::interface("app::A").extends("app::B"),
            ModelTypeDef::interface("app::B")
                .extends("app::C")
                .method(MethodDef::getter("getId", TypeRef::string())),
            ModelTypeDef::interface("app::C").extends("app::B"),
        ]);

        let err = extract(&registry, &TypeRef::new("app::A")).expect_err("cyclic hierarchy");
        assert!(err.is_invalid_descriptor());
        assert!(
            err.to_string().contains("inheritance cycle through 'app::C'"),
            "{err}"
        );
    }

    #[test]
    fn delegated_properties_need_a_concrete_delegate_getter() {
        struct Store;

        let registry = registry_of([
            ModelTypeDef::interface("app::Settings")
                .method(MethodDef::getter("getUrl", TypeRef::string()))
                .method(MethodDef::getter("getRetries", TypeRef::int())),
            ModelTypeDef::class("app::Store").method(
                MethodDef::getter("getUrl", TypeRef::string()).implemented_by(|_: &Store| "x"),
            ),
        ]);
        let extractor = SchemaExtractor::new(&registry, ExtractConfig::default());
        let settings = TypeRef::new("app::Settings");

        let schema = extractor
            .extract_with_delegate(&settings, Some(&TypeRef::new("app::Store")))
            .expect("extracts");
        assert_eq!(schema.delegate(), Some(&TypeRef::new("app::Store")));
        assert_eq!(
            schema.property("url").map(|p| p.state_management()),
            Some(StateManagement::Delegated)
        );
        assert_eq!(
            schema.property("retries").map(|p| p.state_management()),
            Some(StateManagement::Managed)
        );

        let err = extractor
            .extract_with_delegate(&settings, Some(&TypeRef::new("app::Missing")))
            .expect_err("unregistered delegate");
        assert!(err.to_string().contains("is not registered"), "{err}");
    }

    #[test]
    fn delegate_with_incompatible_getter_conflicts() {
        struct Store;

        let registry = registry_of([
            ModelTypeDef::interface("app::Settings")
                .method(MethodDef::getter("getUrl", TypeRef::string())),
            ModelTypeDef::class("app::Store").method(
                MethodDef::getter("getUrl", TypeRef::int()).implemented_by(|_: &Store| 1),
            ),
        ]);

        let err = SchemaExtractor::new(&registry, ExtractConfig::default())
            .extract_with_delegate(&TypeRef::new("app::Settings"), Some(&TypeRef::new("app::Store")))
            .expect_err("conflict");
        assert!(err.is_conflict());

        let conflict = &err.conflicts()[0];
        assert_eq!(conflict.kind, ConflictKind::ReturnType);
        assert_eq!(
            conflict.declared_by,
            [TypeRef::new("app::Settings"), TypeRef::new("app::Store")]
        );
    }

    #[test]
    fn is_getters_follow_configuration() {
        let registry = registry_of([ModelTypeDef::interface("app::Flag")
            .method(MethodDef::getter("isActive", TypeRef::bool()))]);
        let flag = TypeRef::new("app::Flag");

        let schema = extract(&registry, &flag).expect("extracts");
        assert!(schema.property("active").is_some());

        let config = ExtractConfig {
            allow_is_getters: false,
            ..ExtractConfig::default()
        };
        let err = SchemaExtractor::new(&registry, config)
            .extract(&flag)
            .expect_err("isActive is then an abstract non-accessor");
        assert!(err.is_invalid_descriptor());
    }

    #[test]
    fn extraction_reports_start_and_outcome_events() {
        #[derive(Default)]
        struct Recorder(RefCell<Vec<String>>);

        impl MetricsSink for Recorder {
            fn record(&self, event: MetricsEvent) {
                let label = match event {
                    MetricsEvent::ExtractStart { ty } => format!("start {}", ty.simple_name()),
                    MetricsEvent::ExtractFinish { properties, .. } => format!("ok {properties}"),
                    MetricsEvent::ExtractFailed { kind, problems, .. } => {
                        format!("failed {kind:?} {problems}")
                    }
                    _ => return,
                };
                self.0.borrow_mut().push(label);
            }
        }

        let registry = person_registry();
        let recorder = Rc::new(Recorder::default());
        with_metrics_sink(recorder.clone(), || {
            extract(&registry, &TypeRef::new("app::Person")).expect("extracts");
            extract(&registry, &TypeRef::new("app::Ghost")).expect_err("unsupported");
        });

        assert_eq!(
            *recorder.0.borrow(),
            ["start Person", "ok 2", "start Ghost", "failed Unsupported 1"]
        );
    }
}
