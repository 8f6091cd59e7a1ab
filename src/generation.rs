//! A generation run: declared nodes are loaded once, validated as a whole,
//! their embedded references resolved, and the result projected for
//! Terraform.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::Deserialize;
use thiserror::Error;
use tokio::task::JoinSet;

use crate::cache::RemoteInventory;
use crate::definitions::Registry;
use crate::gps::{Context, Finder, GpsError, Node, NodeId, is_node_reference};
use crate::providers::{Provider, ProviderError};
use crate::resource::{Attributes, Resource, ResourceError, ValidationError, Value};
use crate::terraform::{TerraformDocument, TerraformState};

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("{} validation error(s); refusing to generate", .0.len())]
    Invalid(Vec<ValidationError>),

    #[error("{resource}: cannot resolve '{attribute}': {source}")]
    Reference {
        resource: String,
        attribute: String,
        #[source]
        source: GpsError,
    },

    #[error(transparent)]
    Resource(#[from] ResourceError),

    #[error("malformed declarations: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("cannot read declarations: {0}")]
    Io(#[from] std::io::Error),
}

/// The declarations file: `{"nodes": [...]}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Declarations {
    #[serde(default)]
    pub nodes: Vec<NodeDeclaration>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NodeDeclaration {
    #[serde(flatten)]
    pub id: NodeId,
    #[serde(default)]
    pub attributes: Attributes,
    #[serde(default)]
    pub resources: IndexMap<String, ResourceDeclaration>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResourceDeclaration {
    #[serde(rename = "type")]
    pub resource_type: String,
    pub id: String,
    #[serde(default)]
    pub attributes: Attributes,
}

pub struct Generation {
    finder: Finder<Arc<Node>>,
}

impl Generation {
    pub fn new(nodes: Vec<Node>, context: Context) -> Self {
        let nodes = nodes.into_iter().map(Arc::new).collect();
        Self {
            finder: Finder::with_context(nodes, context),
        }
    }

    /// Builds every declared resource against its registered type.
    pub fn from_declarations(
        declarations: Declarations,
        registry: &mut Registry,
        context: Context,
    ) -> Self {
        let nodes = declarations
            .nodes
            .into_iter()
            .map(|decl| {
                let mut node = Node::new(decl.id).with_attributes(decl.attributes);
                for (key, resource) in decl.resources {
                    let kind = registry.resolve(&resource.resource_type);
                    let built = Resource::builder(kind, resource.id)
                        .attributes(resource.attributes)
                        .build();
                    node.add_resource(key, built);
                }
                node
            })
            .collect();
        Self::new(nodes, context)
    }

    pub fn from_json(
        text: &str,
        registry: &mut Registry,
        context: Context,
    ) -> Result<Self, GenerationError> {
        let declarations: Declarations = serde_json::from_str(text)?;
        Ok(Self::from_declarations(declarations, registry, context))
    }

    pub fn load(
        path: &Path,
        registry: &mut Registry,
        context: Context,
    ) -> Result<Self, GenerationError> {
        let text = std::fs::read_to_string(path)?;
        let generation = Self::from_json(&text, registry, context)?;
        tracing::debug!(
            path = %path.display(),
            nodes = generation.nodes().len(),
            "declarations loaded"
        );
        Ok(generation)
    }

    pub fn finder(&self) -> &Finder<Arc<Node>> {
        &self.finder
    }

    pub fn nodes(&self) -> &[Arc<Node>] {
        self.finder.nodes()
    }

    /// Every declared resource with its owning node, in declaration order.
    pub fn resources(&self) -> impl Iterator<Item = (&Arc<Node>, &Arc<Resource>)> {
        self.nodes()
            .iter()
            .flat_map(|node| node.resources().map(move |(_, resource)| (node, resource)))
    }

    /// Errors of every resource; one resource failing does not stop the rest
    /// from being checked.
    pub fn validate(&self) -> Vec<ValidationError> {
        self.resources()
            .flat_map(|(_, resource)| resource.errors())
            .collect()
    }

    /// `resource`'s output mapping with each embedded node reference replaced
    /// by the single value it dereferences to, relative to `node`.
    pub fn resolve(&self, node: &Node, resource: &Resource) -> Result<Attributes, GenerationError> {
        let context = Context::for_node(node.id());
        let mut resolved = Attributes::new();
        for (key, value) in resource.to_output_mapping() {
            let value = self.resolve_value(value, &context).map_err(|source| {
                GenerationError::Reference {
                    resource: resource.terraform_name(),
                    attribute: key.clone(),
                    source,
                }
            })?;
            resolved.insert(key, value);
        }
        Ok(resolved)
    }

    fn resolve_value(&self, value: Value, context: &Context) -> Result<Value, GpsError> {
        match value {
            Value::String(text) if is_node_reference(&text) => {
                let values = self.finder.dereference_in(&text, context)?;
                match <[String; 1]>::try_from(values) {
                    Ok([value]) => {
                        tracing::debug!(reference = %text, value = %value, "reference resolved");
                        Ok(Value::String(value))
                    }
                    Err(values) => Err(GpsError::NotUnique {
                        reference: text,
                        count: values.len(),
                    }),
                }
            }
            Value::String(text) => Ok(Value::String(text)),
            Value::List(entries) => entries
                .into_iter()
                .map(|entry| self.resolve_map(entry, context))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::List),
            Value::Map(map) => self.resolve_map(map, context).map(Value::Map),
        }
    }

    fn resolve_map(&self, map: Attributes, context: &Context) -> Result<Attributes, GpsError> {
        map.into_iter()
            .map(|(key, value)| Ok::<_, GpsError>((key, self.resolve_value(value, context)?)))
            .collect()
    }

    /// `{"resource": {<type>: {<id>: <mapping>}}}`, refused while any
    /// resource fails validation.
    pub fn to_terraform_json(&self) -> Result<TerraformDocument, GenerationError> {
        self.ensure_valid()?;

        let mut document = TerraformDocument::default();
        for (node, resource) in self.resources() {
            let mapping = self.resolve(node, resource)?;
            document.insert(resource.type_name(), resource.id(), mapping);
        }
        tracing::info!(resources = document.len(), "terraform document generated");
        Ok(document)
    }

    fn ensure_valid(&self) -> Result<(), GenerationError> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(GenerationError::Invalid(errors))
        }
    }

    /// Reconciles every resource against `inventory` and collects the state
    /// entries from the resolved mappings. Refused while any resource fails
    /// validation.
    pub async fn to_terraform_state(
        &self,
        inventory: &RemoteInventory,
    ) -> Result<TerraformState, GenerationError> {
        self.ensure_valid()?;

        let mut state = TerraformState::new();
        for (node, resource) in self.resources() {
            let resolved = self.resolve(node, resource)?;
            let entry = resource.to_reconciled_state(inventory, resolved).await?;
            state.insert(resource.terraform_name(), entry);
        }
        Ok(state)
    }

    /// `import {}` blocks for every resource that already exists remotely.
    pub async fn import_blocks(
        &self,
        inventory: &RemoteInventory,
    ) -> Result<Vec<String>, GenerationError> {
        self.ensure_valid()?;

        let mut blocks = Vec::new();
        for (_, resource) in self.resources() {
            let Some(provider) = resource.kind().provider() else {
                continue;
            };
            if let Some(terraform_id) = resource.terraform_id(inventory).await? {
                blocks.push(provider.generate_import(resource, terraform_id));
            }
        }
        Ok(blocks)
    }

    /// Fetches the inventory of every declared type that has a remote source,
    /// one task per type. Each type reports its own outcome.
    pub async fn prefetch(
        &self,
        inventory: Arc<RemoteInventory>,
    ) -> BTreeMap<String, Result<usize, ProviderError>> {
        let mut providers: BTreeMap<String, Arc<dyn Provider>> = BTreeMap::new();
        for (_, resource) in self.resources() {
            if let Some(provider) = resource.kind().provider() {
                providers
                    .entry(resource.type_name().to_string())
                    .or_insert_with(|| Arc::clone(provider));
            }
        }

        let mut tasks = JoinSet::new();
        for (resource_type, provider) in providers {
            let inventory = Arc::clone(&inventory);
            tasks.spawn(async move {
                let fetched = inventory
                    .entries(&resource_type, provider.as_ref())
                    .await
                    .map(|entries| entries.len());
                (resource_type, fetched)
            });
        }

        let mut outcomes = BTreeMap::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((resource_type, fetched)) => {
                    outcomes.insert(resource_type, fetched);
                }
                Err(e) => tracing::error!(error = %e, "inventory fetch task failed"),
            }
        }
        outcomes
    }
}
