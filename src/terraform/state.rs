use serde::{Deserialize, Serialize};

use crate::resource::Attributes;

/// One resource entry of a Terraform state file:
/// `{type, primary: {id, attributes}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateResource {
    #[serde(rename = "type")]
    pub resource_type: String,
    pub primary: StatePrimary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatePrimary {
    pub id: Option<String>,
    pub attributes: Attributes,
}

impl StateResource {
    pub fn new(
        resource_type: impl Into<String>,
        id: Option<String>,
        attributes: Attributes,
    ) -> Self {
        Self {
            resource_type: resource_type.into(),
            primary: StatePrimary { id, attributes },
        }
    }
}
