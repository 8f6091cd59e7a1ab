//! Declared resources: the declaration builder, per-type lifecycle hooks and
//! validation rules, lazily derived identities, and reconciliation against
//! remote inventory.

mod attributes;
mod validation;

use std::fmt;
use std::sync::{Arc, OnceLock};

use thiserror::Error;
use tokio::sync::OnceCell;

pub use attributes::{Attributes, Value, attributes, is_internal, without_internal};
pub use validation::{Validation, ValidationError};

use crate::cache::RemoteInventory;
use crate::providers::{Provider, ProviderError, RemoteEntry};
use crate::terraform::StateResource;

pub const GEO_ID_KEY: &str = "_geo_id";
pub const TERRAFORM_ID_KEY: &str = "_terraform_id";

#[derive(Debug, Error)]
pub enum ResourceError {
    /// More than one remote entry claims this resource's identity. The geo_id
    /// derivation is broken or the remote side holds an unresolvable duplicate.
    #[error("{resource}: {count} remote resources share geo_id '{geo_id}'")]
    AmbiguousRemote {
        resource: String,
        geo_id: String,
        count: usize,
    },

    #[error("{resource}: remote fetch failed: {source}")]
    Fetch {
        resource: String,
        #[source]
        source: ProviderError,
    },
}

type AfterInit = Arc<dyn Fn(&mut ResourceBuilder) + Send + Sync>;
type GeoIdFn = Arc<dyn Fn(&Attributes) -> String + Send + Sync>;
type OutputShaper = Arc<dyn Fn(&Resource, Attributes) -> Attributes + Send + Sync>;

/// Behaviour shared by every resource of one type.
pub struct ResourceType {
    name: String,
    after_init: Vec<AfterInit>,
    validations: Vec<Validation>,
    geo_id: Option<GeoIdFn>,
    shape_output: Option<OutputShaper>,
    remote: Option<Arc<dyn Provider>>,
}

impl ResourceType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            after_init: Vec::new(),
            validations: Vec::new(),
            geo_id: None,
            shape_output: None,
            remote: None,
        }
    }

    /// Registers a hook run on the builder, in registration order, before the
    /// resource is frozen.
    pub fn after_init<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut ResourceBuilder) + Send + Sync + 'static,
    {
        self.after_init.push(Arc::new(hook));
        self
    }

    pub fn validate(mut self, rule: Validation) -> Self {
        self.validations.push(rule);
        self
    }

    /// Derives the identity used to match declared and remote resources. Must
    /// be a pure function of the declared attributes.
    pub fn geo_id<F>(mut self, derive: F) -> Self
    where
        F: Fn(&Attributes) -> String + Send + Sync + 'static,
    {
        self.geo_id = Some(Arc::new(derive));
        self
    }

    /// Reshapes the output mapping (internal keys already removed).
    pub fn shape_output<F>(mut self, shape: F) -> Self
    where
        F: Fn(&Resource, Attributes) -> Attributes + Send + Sync + 'static,
    {
        self.shape_output = Some(Arc::new(shape));
        self
    }

    pub fn remote(mut self, provider: Arc<dyn Provider>) -> Self {
        self.remote = Some(provider);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn validations(&self) -> &[Validation] {
        &self.validations
    }

    pub fn provider(&self) -> Option<&Arc<dyn Provider>> {
        self.remote.as_ref()
    }
}

impl fmt::Debug for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceType")
            .field("name", &self.name)
            .field("after_init", &self.after_init.len())
            .field("validations", &self.validations)
            .field("geo_id", &self.geo_id.is_some())
            .field("remote", &self.remote.as_ref().map(|p| p.name().to_string()))
            .finish()
    }
}

/// Collects a resource's attributes during declaration.
#[derive(Debug)]
pub struct ResourceBuilder {
    kind: Arc<ResourceType>,
    id: String,
    attributes: Attributes,
}

impl ResourceBuilder {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    pub fn attr(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.attributes.insert(key.into(), value.into());
    }

    /// Merges declared attributes, later keys overwriting earlier ones.
    pub fn attributes(mut self, attributes: Attributes) -> Self {
        self.attributes.extend(attributes);
        self
    }

    /// Appends one block to the sub-resource list under `key`.
    pub fn subresource<K, V, I>(mut self, key: impl Into<String>, entry: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        self.push_subresource(key, attributes(entry));
        self
    }

    pub fn push_subresource(&mut self, key: impl Into<String>, entry: Attributes) {
        let slot = self
            .attributes
            .entry(key.into())
            .or_insert_with(|| Value::List(Vec::new()));
        match slot {
            Value::List(entries) => entries.push(entry),
            other => *other = Value::List(vec![entry]),
        }
    }

    /// Runs the type's `after_init` hooks and freezes the declaration.
    pub fn build(mut self) -> Resource {
        let kind = Arc::clone(&self.kind);
        for hook in &kind.after_init {
            hook(&mut self);
        }

        Resource {
            kind: self.kind,
            id: self.id,
            attributes: self.attributes,
            geo_id: OnceLock::new(),
            terraform_id: OnceCell::new(),
        }
    }
}

/// One declared resource. Attributes are read-only once built.
#[derive(Debug)]
pub struct Resource {
    kind: Arc<ResourceType>,
    id: String,
    attributes: Attributes,
    geo_id: OnceLock<String>,
    terraform_id: OnceCell<Option<String>>,
}

impl Resource {
    pub fn builder(kind: Arc<ResourceType>, id: impl Into<String>) -> ResourceBuilder {
        ResourceBuilder {
            kind,
            id: id.into(),
            attributes: Attributes::new(),
        }
    }

    pub fn kind(&self) -> &Arc<ResourceType> {
        &self.kind
    }

    pub fn type_name(&self) -> &str {
        self.kind.name()
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// `<type>.<id>`, the address Terraform knows this resource by.
    pub fn terraform_name(&self) -> String {
        format!("{}.{}", self.type_name(), self.id)
    }

    /// Terraform interpolation of one of this resource's attributes.
    pub fn to_ref(&self, attribute: Option<&str>) -> String {
        format!("${{{}.{}}}", self.terraform_name(), attribute.unwrap_or("id"))
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    pub fn str_attribute(&self, key: &str) -> Option<&str> {
        self.attribute(key).and_then(Value::as_str)
    }

    pub fn subresources(&self, key: &str) -> &[Attributes] {
        self.attribute(key).and_then(Value::as_list).unwrap_or(&[])
    }

    /// Runs every validation rule; all failures are returned.
    pub fn errors(&self) -> Vec<ValidationError> {
        self.kind
            .validations
            .iter()
            .flat_map(|rule| rule.check(self))
            .collect()
    }

    /// Identity derived from declared attributes, computed on first access.
    pub fn geo_id(&self) -> &str {
        self.geo_id.get_or_init(|| match &self.kind.geo_id {
            Some(derive) => derive(&self.attributes),
            None => self
                .str_attribute(GEO_ID_KEY)
                .unwrap_or(&self.id)
                .to_string(),
        })
    }

    /// The id assigned by the provisioning system, if known yet.
    ///
    /// A declared `_terraform_id` wins; otherwise the remote entry matching
    /// this resource supplies it. Resolved once and memoized.
    pub async fn terraform_id(
        &self,
        inventory: &RemoteInventory,
    ) -> Result<Option<&str>, ResourceError> {
        let id = self
            .terraform_id
            .get_or_try_init(|| async {
                if let Some(declared) = self.str_attribute(TERRAFORM_ID_KEY) {
                    return Ok(Some(declared.to_string()));
                }
                let remote = self.remote_resource(inventory).await?;
                Ok::<_, ResourceError>(remote.and_then(|entry| entry.terraform_id))
            })
            .await?;
        Ok(id.as_deref())
    }

    /// The memoized or declared terraform id, without touching remote state.
    pub fn known_terraform_id(&self) -> Option<&str> {
        match self.terraform_id.get() {
            Some(id) => id.as_deref(),
            None => self.str_attribute(TERRAFORM_ID_KEY),
        }
    }

    /// The unique remote entry whose `_geo_id` equals this resource's.
    ///
    /// The type's inventory is fetched at most once per [`RemoteInventory`];
    /// matching is re-derived on every call.
    pub async fn remote_resource(
        &self,
        inventory: &RemoteInventory,
    ) -> Result<Option<RemoteEntry>, ResourceError> {
        let Some(provider) = self.kind.provider() else {
            return Ok(None);
        };

        let entries = inventory
            .entries(self.type_name(), provider.as_ref())
            .await
            .map_err(|source| ResourceError::Fetch {
                resource: self.terraform_name(),
                source,
            })?;

        let geo_id = self.geo_id();
        let mut matches = entries.iter().filter(|entry| entry.geo_id == geo_id);

        match (matches.next(), matches.next()) {
            (None, _) => {
                tracing::debug!(resource = %self.terraform_name(), geo_id, "no remote match");
                Ok(None)
            }
            (Some(entry), None) => Ok(Some(entry.clone())),
            (Some(_), Some(_)) => Err(ResourceError::AmbiguousRemote {
                resource: self.terraform_name(),
                geo_id: geo_id.to_string(),
                count: entries.iter().filter(|entry| entry.geo_id == geo_id).count(),
            }),
        }
    }

    /// Declared attributes minus bookkeeping keys, shaped by the type.
    pub fn to_output_mapping(&self) -> Attributes {
        let output = without_internal(&self.attributes);
        match &self.kind.shape_output {
            Some(shape) => shape(self, output),
            None => output,
        }
    }

    pub fn to_state_mapping(&self, terraform_id: Option<&str>) -> StateResource {
        StateResource::new(
            self.type_name(),
            terraform_id.map(str::to_string),
            self.to_output_mapping(),
        )
    }

    /// Reconciles, then projects `resolved` (this resource's output mapping
    /// with references already dereferenced) into a state entry.
    pub async fn to_reconciled_state(
        &self,
        inventory: &RemoteInventory,
        resolved: Attributes,
    ) -> Result<StateResource, ResourceError> {
        let terraform_id = self.terraform_id(inventory).await?;
        Ok(StateResource::new(
            self.type_name(),
            terraform_id.map(str::to_string),
            resolved,
        ))
    }
}
