mod client;
mod error;
mod types;

pub use client::CloudflareClient;
pub use error::CloudflareError;
pub use types::{DnsRecord, PageRule, ZoneInfo, dns_record_geo_id, is_zone_id, page_rule_geo_id};

use async_trait::async_trait;
use tokio::sync::OnceCell;

use super::{Provider, ProviderError, RemoteEntry};
use crate::resource::Resource;

pub const DNS_RECORD: &str = "cloudflare_dns_record";
pub const PAGE_RULE: &str = "cloudflare_page_rule";

pub struct CloudflareProvider {
    token: Option<String>,
    zone: Option<String>,
    base_url: Option<String>,
    session: OnceCell<(CloudflareClient, ZoneInfo)>,
}

impl CloudflareProvider {
    pub fn new(token: Option<String>, zone: Option<String>) -> Self {
        Self {
            token,
            zone,
            base_url: None,
            session: OnceCell::new(),
        }
    }

    /// NOTE: Primarily used for testing with mock servers.
    pub fn with_base_url(token: Option<String>, zone: Option<String>, base_url: String) -> Self {
        Self {
            base_url: Some(base_url),
            ..Self::new(token, zone)
        }
    }

    // NOTE: Authenticates and resolves the zone once; every resource type
    // fetched afterwards reuses the session.
    async fn session(&self) -> Result<&(CloudflareClient, ZoneInfo), ProviderError> {
        self.session
            .get_or_try_init(|| async {
                let token = self.token.clone().ok_or_else(|| {
                    ProviderError::Auth(
                        "No API token provided. Set CLOUDFLARE_API_TOKEN or use --token flag"
                            .to_string(),
                    )
                })?;

                let zone = self.zone.as_ref().ok_or_else(|| {
                    ProviderError::Cloudflare(
                        "No zone provided. Set CLOUDFLARE_ZONE_ID or use --zone flag".to_string(),
                    )
                })?;

                let client = match &self.base_url {
                    Some(base_url) => CloudflareClient::with_base_url(token, base_url.clone()),
                    None => CloudflareClient::new(token),
                }?;

                client.verify_auth().await?;
                tracing::info!("Cloudflare authentication verified");

                let zone_info = client.lookup_zone(zone).await?;
                tracing::info!(
                    zone_id = %zone_info.zone_id,
                    account_id = %zone_info.account_id,
                    "Zone lookup successful"
                );

                Ok::<_, ProviderError>((client, zone_info))
            })
            .await
    }
}

impl std::fmt::Debug for CloudflareProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudflareProvider")
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("zone", &self.zone)
            .finish()
    }
}

#[async_trait]
impl Provider for CloudflareProvider {
    fn name(&self) -> &str {
        "cloudflare"
    }

    fn resource_types(&self) -> Vec<&str> {
        vec![DNS_RECORD, PAGE_RULE]
    }

    async fn fetch_remote(&self, resource_type: &str) -> Result<Vec<RemoteEntry>, ProviderError> {
        if !self.resource_types().contains(&resource_type) {
            return Err(ProviderError::Unsupported {
                provider: self.name().to_string(),
                resource_type: resource_type.to_string(),
            });
        }

        let (client, zone_info) = self.session().await?;
        let zone_id = zone_info.zone_id.as_str();

        let entries: Vec<RemoteEntry> = match resource_type {
            DNS_RECORD => client
                .discover_dns_records(zone_id)
                .await?
                .into_iter()
                .map(|record| record.into_remote_entry(zone_id))
                .collect(),
            _ => client
                .discover_page_rules(zone_id)
                .await?
                .into_iter()
                .map(|rule| rule.into_remote_entry(zone_id))
                .collect(),
        };

        tracing::info!(resource_type, count = entries.len(), "remote resources discovered");
        Ok(entries)
    }

    // NOTE: Cloudflare imports are addressed as <zone_id>/<resource_id>
    fn generate_import(&self, resource: &Resource, terraform_id: &str) -> String {
        let id = match resource.str_attribute("zone_id") {
            Some(zone_id) => format!("{}/{}", zone_id, terraform_id),
            None => terraform_id.to_string(),
        };
        format!(
            "import {{\n  to = {}\n  id = \"{}\"\n}}",
            resource.terraform_name(),
            id
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::ResourceType;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_unsupported_type() {
        let provider = CloudflareProvider::new(Some("token".into()), Some("example.com".into()));
        let result = provider.fetch_remote("cloudflare_ruleset").await;
        assert!(matches!(result, Err(ProviderError::Unsupported { .. })));
    }

    #[tokio::test]
    async fn test_missing_zone() {
        let provider = CloudflareProvider::new(Some("token".into()), None);
        match provider.fetch_remote(DNS_RECORD).await {
            Err(ProviderError::Cloudflare(msg)) => assert!(msg.contains("No zone provided")),
            other => panic!("expected zone error, got {:?}", other),
        }
    }

    #[test]
    fn test_generate_import_prefixes_zone() {
        let provider = CloudflareProvider::new(None, None);
        let resource = Resource::builder(Arc::new(ResourceType::new(DNS_RECORD)), "www")
            .attr("zone_id", "zone456")
            .build();
        let import = provider.generate_import(&resource, "rec123");
        assert!(import.contains("to = cloudflare_dns_record.www"));
        assert!(import.contains("id = \"zone456/rec123\""));
    }

    #[test]
    fn test_debug_does_not_expose_token() {
        let provider = CloudflareProvider::new(Some("super_secret_token_12345".into()), None);
        let debug_output = format!("{:?}", provider);
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super_secret_token_12345"));
    }
}
