//! Projections into the formats Terraform reads.

mod state;

use indexmap::IndexMap;
use serde::Serialize;

pub use state::{StatePrimary, StateResource};

use crate::resource::Attributes;

/// A `main.tf.json` document: `{"resource": {<type>: {<id>: {...}}}}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TerraformDocument {
    pub resource: IndexMap<String, IndexMap<String, Attributes>>,
}

impl TerraformDocument {
    pub fn insert(&mut self, resource_type: &str, id: &str, attributes: Attributes) {
        self.resource
            .entry(resource_type.to_string())
            .or_default()
            .insert(id.to_string(), attributes);
    }

    pub fn len(&self) -> usize {
        self.resource.values().map(IndexMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Terraform state file body holding the given resources, keyed by
/// `<type>.<id>`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TerraformState {
    pub version: u32,
    pub resources: IndexMap<String, StateResource>,
}

impl TerraformState {
    pub fn new() -> Self {
        Self {
            version: 1,
            resources: IndexMap::new(),
        }
    }

    pub fn insert(&mut self, terraform_name: String, resource: StateResource) {
        self.resources.insert(terraform_name, resource);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::attributes;

    #[test]
    fn test_document_groups_by_type() {
        let mut doc = TerraformDocument::default();
        doc.insert("aws_elb", "a", attributes([("name", "a")]));
        doc.insert("aws_elb", "b", attributes([("name", "b")]));
        doc.insert("aws_s3_bucket", "logs", Attributes::new());

        assert_eq!(doc.len(), 3);
        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["resource"]["aws_elb"]["b"]["name"], "b");
        assert!(json["resource"]["aws_s3_bucket"]["logs"].is_object());
    }

    #[test]
    fn test_state_keys_by_terraform_name() {
        let mut state = TerraformState::new();
        state.insert(
            "aws_elb.a".to_string(),
            StateResource::new("aws_elb", Some("elb-1".to_string()), Attributes::new()),
        );
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["version"], 1);
        assert_eq!(json["resources"]["aws_elb.a"]["primary"]["id"], "elb-1");
    }
}
