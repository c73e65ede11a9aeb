use derive_more::{Deref, Display};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, sync::Arc};

///
/// AnnotationKind
/// Path-like identity of an annotation type; one entry per kind per target.
///

#[derive(
    Clone, Debug, Deref, Deserialize, Display, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize,
)]
pub struct AnnotationKind(Arc<str>);

impl AnnotationKind {
    #[must_use]
    pub fn new(path: impl AsRef<str>) -> Self {
        Self(Arc::from(path.as_ref()))
    }
}

impl From<&str> for AnnotationKind {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

///
/// Annotation
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Annotation {
    pub kind: AnnotationKind,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub values: BTreeMap<String, String>,
}

impl Annotation {
    #[must_use]
    pub fn marker(kind: impl Into<AnnotationKind>) -> Self {
        Self {
            kind: kind.into(),
            values: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn value(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }
}

/// Annotations on one accessor, keyed uniquely by kind.
pub type AnnotationMap = BTreeMap<AnnotationKind, Annotation>;
