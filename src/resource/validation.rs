use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use super::attributes::Attributes;
use super::Resource;

/// One failed validation rule. Collected, never raised.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{resource}: {message}")]
pub struct ValidationError {
    pub resource: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(resource: &Resource, message: impl Into<String>) -> Self {
        Self {
            resource: resource.terraform_name(),
            message: message.into(),
        }
    }
}

type EntryPredicate = Arc<dyn Fn(&Attributes) -> bool + Send + Sync>;
type CustomRule = Arc<dyn Fn(&Resource) -> Vec<ValidationError> + Send + Sync>;

/// A rule registered on a resource type and evaluated against each fully
/// declared resource of that type.
#[derive(Clone)]
pub enum Validation {
    /// Every listed top-level attribute is declared
    RequiredAttributes(Vec<String>),
    /// The sub-resource is declared with at least one entry
    RequiredSubresource(String),
    /// Every entry of the sub-resource declares the listed attributes
    SubresourceRequiredAttributes {
        subresource: String,
        attributes: Vec<String>,
    },
    /// At least one entry of the sub-resource satisfies the predicate
    AnySubresource {
        subresource: String,
        description: String,
        predicate: EntryPredicate,
    },
    Custom(CustomRule),
}

impl Validation {
    pub fn required_attributes<I, S>(attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Validation::RequiredAttributes(attributes.into_iter().map(Into::into).collect())
    }

    pub fn required_subresource(subresource: impl Into<String>) -> Self {
        Validation::RequiredSubresource(subresource.into())
    }

    pub fn subresource_required_attributes<I, S>(
        subresource: impl Into<String>,
        attributes: I,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Validation::SubresourceRequiredAttributes {
            subresource: subresource.into(),
            attributes: attributes.into_iter().map(Into::into).collect(),
        }
    }

    pub fn any_subresource<F>(
        subresource: impl Into<String>,
        description: impl Into<String>,
        predicate: F,
    ) -> Self
    where
        F: Fn(&Attributes) -> bool + Send + Sync + 'static,
    {
        Validation::AnySubresource {
            subresource: subresource.into(),
            description: description.into(),
            predicate: Arc::new(predicate),
        }
    }

    /// Requires a `tags` entry declaring `key`.
    pub fn has_tag(key: impl Into<String>) -> Self {
        let key = key.into();
        let description = format!("a '{}' tag", key);
        Self::any_subresource("tags", description, move |entry| entry.contains_key(&key))
    }

    pub fn custom<F>(rule: F) -> Self
    where
        F: Fn(&Resource) -> Vec<ValidationError> + Send + Sync + 'static,
    {
        Validation::Custom(Arc::new(rule))
    }

    pub fn check(&self, resource: &Resource) -> Vec<ValidationError> {
        match self {
            Validation::RequiredAttributes(required) => required
                .iter()
                .filter(|key| resource.attribute(key).is_none())
                .map(|key| {
                    ValidationError::new(resource, format!("missing required attribute '{}'", key))
                })
                .collect(),

            Validation::RequiredSubresource(subresource) => {
                if resource.subresources(subresource).is_empty() {
                    vec![ValidationError::new(
                        resource,
                        format!("missing required sub-resource '{}'", subresource),
                    )]
                } else {
                    Vec::new()
                }
            }

            Validation::SubresourceRequiredAttributes {
                subresource,
                attributes,
            } => resource
                .subresources(subresource)
                .iter()
                .enumerate()
                .flat_map(|(index, entry)| {
                    attributes
                        .iter()
                        .filter(|key| !entry.contains_key(key.as_str()))
                        .map(move |key| {
                            ValidationError::new(
                                resource,
                                format!(
                                    "missing required attribute '{}' in {}[{}]",
                                    key, subresource, index
                                ),
                            )
                        })
                })
                .collect(),

            Validation::AnySubresource {
                subresource,
                description,
                predicate,
            } => {
                if resource
                    .subresources(subresource)
                    .iter()
                    .any(|entry| predicate(entry))
                {
                    Vec::new()
                } else {
                    vec![ValidationError::new(
                        resource,
                        format!("'{}' must include {}", subresource, description),
                    )]
                }
            }

            Validation::Custom(rule) => rule(resource),
        }
    }
}

impl fmt::Debug for Validation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Validation::RequiredAttributes(keys) => {
                f.debug_tuple("RequiredAttributes").field(keys).finish()
            }
            Validation::RequiredSubresource(name) => {
                f.debug_tuple("RequiredSubresource").field(name).finish()
            }
            Validation::SubresourceRequiredAttributes {
                subresource,
                attributes,
            } => f
                .debug_struct("SubresourceRequiredAttributes")
                .field("subresource", subresource)
                .field("attributes", attributes)
                .finish(),
            Validation::AnySubresource {
                subresource,
                description,
                ..
            } => f
                .debug_struct("AnySubresource")
                .field("subresource", subresource)
                .field("description", description)
                .finish(),
            Validation::Custom(_) => f.write_str("Custom"),
        }
    }
}
