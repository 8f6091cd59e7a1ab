use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::resource::{Attributes, Resource};

/// The `(project, environment, configuration, type, name)` address of a node.
///
/// Empty project/environment/configuration means "global to that level".
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId {
    #[serde(default)]
    pub project: String,
    #[serde(default)]
    pub environment: String,
    #[serde(default)]
    pub configuration: String,
    #[serde(rename = "type")]
    pub node_type: String,
    pub name: String,
}

impl NodeId {
    pub fn new(
        project: impl Into<String>,
        environment: impl Into<String>,
        configuration: impl Into<String>,
        node_type: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            project: project.into(),
            environment: environment.into(),
            configuration: configuration.into(),
            node_type: node_type.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}:{}:{}",
            self.project, self.environment, self.configuration, self.node_type, self.name
        )
    }
}

/// Defaults substituted into empty reference segments. There is no `type`
/// default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Context {
    pub project: Option<String>,
    pub environment: Option<String>,
    pub configuration: Option<String>,
    pub node_name: Option<String>,
}

impl Context {
    /// The context a node's own declarations are resolved in.
    pub fn for_node(id: &NodeId) -> Self {
        Self {
            project: Some(id.project.clone()),
            environment: Some(id.environment.clone()),
            configuration: Some(id.configuration.clone()),
            node_name: Some(id.name.clone()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.project.is_none()
            && self.environment.is_none()
            && self.configuration.is_none()
            && self.node_name.is_none()
    }
}

/// Anything the finder can select and dereference.
pub trait NodeLike {
    fn identity(&self) -> &NodeId;

    /// A reference to one of this node's sub-resources, or `None` when the
    /// node has no resource under that name.
    fn reference(&self, resource: &str, attribute: Option<&str>) -> Option<String>;
}

impl<T: NodeLike + ?Sized> NodeLike for Arc<T> {
    fn identity(&self) -> &NodeId {
        (**self).identity()
    }

    fn reference(&self, resource: &str, attribute: Option<&str>) -> Option<String> {
        (**self).reference(resource, attribute)
    }
}

/// A declared node and the resources it generated.
#[derive(Debug, Clone)]
pub struct Node {
    id: NodeId,
    attributes: Attributes,
    resources: IndexMap<String, Arc<Resource>>,
}

impl Node {
    pub fn new(id: NodeId) -> Self {
        Self {
            id,
            attributes: Attributes::new(),
            resources: IndexMap::new(),
        }
    }

    pub fn with_attributes(mut self, attributes: Attributes) -> Self {
        self.attributes = attributes;
        self
    }

    pub fn id(&self) -> &NodeId {
        &self.id
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    /// Records `resource` as owned by this node under `key`, so it can be
    /// enumerated and referenced as `...#key`.
    pub fn add_resource(&mut self, key: impl Into<String>, resource: Resource) -> Arc<Resource> {
        let resource = Arc::new(resource);
        self.resources.insert(key.into(), Arc::clone(&resource));
        resource
    }

    pub fn resource(&self, key: &str) -> Option<&Arc<Resource>> {
        self.resources.get(key)
    }

    pub fn resources(&self) -> impl Iterator<Item = (&String, &Arc<Resource>)> {
        self.resources.iter()
    }
}

impl NodeLike for Node {
    fn identity(&self) -> &NodeId {
        &self.id
    }

    fn reference(&self, resource: &str, attribute: Option<&str>) -> Option<String> {
        self.resources
            .get(resource)
            .map(|resource| resource.to_ref(attribute))
    }
}
