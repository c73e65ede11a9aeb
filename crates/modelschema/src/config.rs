use crate::{annotation::AnnotationKind, validate::AnnotationRules};
use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;

///
/// ConfigError
///

#[derive(Debug, ThisError)]
pub enum ConfigError {
    #[error("failed to parse extraction config: {0}")]
    Parse(#[from] toml::de::Error),
}

///
/// AnnotationCollision
/// What happens when two declarations put different annotations of one kind
/// on the same accessor role.
///

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnnotationCollision {
    /// Report a `ConflictKind::Annotation` conflict.
    #[default]
    Reject,

    /// The declaration found later in the supertype closure replaces the
    /// earlier one.
    LastWriteWins,
}

///
/// ExtractConfig
///
/// ```toml
/// annotation_collision = "last_write_wins"
/// allow_is_getters = false
/// getter_only_annotations = ["app::Unmanaged"]
/// ```
///

#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExtractConfig {
    pub annotation_collision: AnnotationCollision,

    /// Accept `isX(): bool` as a getter for property `x`.
    pub allow_is_getters: bool,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub getter_only_annotations: Vec<AnnotationKind>,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            annotation_collision: AnnotationCollision::default(),
            allow_is_getters: true,
            getter_only_annotations: Vec::new(),
        }
    }
}

impl ExtractConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(source)?)
    }

    /// Rules for `validate::validate_setter_annotations`.
    #[must_use]
    pub fn annotation_rules(&self) -> AnnotationRules {
        AnnotationRules::new(self.getter_only_annotations.iter().cloned())
    }
}

///
/// TESTS
///
