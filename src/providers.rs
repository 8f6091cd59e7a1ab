pub mod cloudflare;

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::resource::Resource;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("unknown provider: {0}")]
    UnknownProvider(String),
    #[error("{provider} cannot fetch resources of type {resource_type}")]
    Unsupported {
        provider: String,
        resource_type: String,
    },
    #[error("authentication error: {0}")]
    Auth(String),
    #[error("cloudflare error: {0}")]
    Cloudflare(String),
    #[error("fetch failed: {0}")]
    Fetch(String),
}

/// One raw entry of a remote inventory, tagged with the keys used to match it
/// against declared resources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteEntry {
    #[serde(rename = "_geo_id")]
    pub geo_id: String,
    #[serde(rename = "_terraform_id", default, skip_serializing_if = "Option::is_none")]
    pub terraform_id: Option<String>,
    #[serde(flatten)]
    pub attributes: serde_json::Map<String, serde_json::Value>,
}

impl RemoteEntry {
    pub fn new(geo_id: impl Into<String>, terraform_id: Option<String>) -> Self {
        Self {
            geo_id: geo_id.into(),
            terraform_id,
            attributes: serde_json::Map::new(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }
}

/// A remote system that can list what already exists, per resource type.
#[async_trait]
pub trait Provider: Send + Sync {
    fn name(&self) -> &str;

    fn resource_types(&self) -> Vec<&str>;

    async fn fetch_remote(&self, resource_type: &str) -> Result<Vec<RemoteEntry>, ProviderError>;

    /// A Terraform `import` block adopting an existing remote resource.
    fn generate_import(&self, resource: &Resource, terraform_id: &str) -> String {
        format!(
            "import {{\n  to = {}\n  id = \"{}\"\n}}",
            resource.terraform_name(),
            terraform_id
        )
    }
}

/// Wraps a plain function as a provider. Handy for inventories produced
/// out-of-band and for tests.
pub struct FnProvider<F> {
    name: String,
    fetch: F,
}

impl<F> FnProvider<F>
where
    F: Fn(&str) -> Result<Vec<RemoteEntry>, ProviderError> + Send + Sync,
{
    pub fn new(name: impl Into<String>, fetch: F) -> Self {
        Self {
            name: name.into(),
            fetch,
        }
    }
}

impl<F> fmt::Debug for FnProvider<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnProvider").field("name", &self.name).finish()
    }
}

#[async_trait]
impl<F> Provider for FnProvider<F>
where
    F: Fn(&str) -> Result<Vec<RemoteEntry>, ProviderError> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn resource_types(&self) -> Vec<&str> {
        Vec::new()
    }

    async fn fetch_remote(&self, resource_type: &str) -> Result<Vec<RemoteEntry>, ProviderError> {
        (self.fetch)(resource_type)
    }
}

/// Settings a provider needs to reach its remote API.
#[derive(Debug, Clone, Default)]
pub struct ProviderConfig {
    pub token: Option<String>,
    pub zone: Option<String>,
}

pub fn get_provider(
    name: &str,
    config: ProviderConfig,
) -> Result<Box<dyn Provider>, ProviderError> {
    match name {
        "cloudflare" => Ok(Box::new(cloudflare::CloudflareProvider::new(
            config.token,
            config.zone,
        ))),
        other => Err(ProviderError::UnknownProvider(other.to_string())),
    }
}
