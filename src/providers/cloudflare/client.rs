use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};

use super::CloudflareError;
use super::types::{DEFAULT_PAGE_SIZE, DnsRecord, PageRule, Zone, ZoneInfo, is_zone_id};

const CLOUDFLARE_API_BASE: &str = "https://api.cloudflare.com/client/v4";

#[derive(Clone)]
pub struct CloudflareClient {
    client: reqwest::Client,
    base_url: String,
}

/// First error message of a Cloudflare envelope, if the call failed.
fn envelope_error(body: &serde_json::Value) -> Option<String> {
    if body.get("success").and_then(|v| v.as_bool()) == Some(true) {
        return None;
    }
    let message = body
        .get("errors")
        .and_then(|e| e.as_array())
        .and_then(|arr| arr.first())
        .and_then(|e| e.get("message"))
        .and_then(|m| m.as_str())
        .unwrap_or("Unknown error");
    Some(message.to_string())
}

impl CloudflareClient {
    pub fn new(token: String) -> Result<Self, CloudflareError> {
        Self::with_base_url(token, CLOUDFLARE_API_BASE.to_string())
    }

    /// NOTE: Primarily used for testing with mock servers.
    pub fn with_base_url(token: String, base_url: String) -> Result<Self, CloudflareError> {
        let mut headers = HeaderMap::new();
        let header_value = HeaderValue::from_str(&format!("Bearer {}", token)).map_err(|_| {
            CloudflareError::Auth {
                message: "Invalid token format".to_string(),
            }
        })?;
        headers.insert(AUTHORIZATION, header_value);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(CloudflareError::Network)?;

        Ok(Self { client, base_url })
    }

    pub fn api_base(&self) -> &str {
        &self.base_url
    }

    async fn get_json(&self, url: &str) -> Result<(u16, serde_json::Value), CloudflareError> {
        let response = self.client.get(url).send().await?;
        let status = response.status().as_u16();
        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| CloudflareError::Api {
                status,
                message: format!("Failed to parse response: {}", e),
            })?;
        Ok((status, body))
    }

    pub async fn verify_auth(&self) -> Result<(), CloudflareError> {
        let url = format!("{}/user/tokens/verify", self.base_url);
        let (_, body) = self.get_json(&url).await?;

        match envelope_error(&body) {
            None => Ok(()),
            Some(message) => Err(CloudflareError::Auth { message }),
        }
    }

    // NOTE: Auto-detects zone ID (32-char hex) vs zone name
    pub async fn lookup_zone(&self, zone: &str) -> Result<ZoneInfo, CloudflareError> {
        let by_id = is_zone_id(zone);
        let url = if by_id {
            format!("{}/zones/{}", self.base_url, zone)
        } else {
            format!("{}/zones?name={}", self.base_url, urlencoding::encode(zone))
        };

        let (status, body) = self.get_json(&url).await.map_err(|e| match e {
            CloudflareError::Api { message, .. } => CloudflareError::ZoneLookupFailed { message },
            other => other,
        })?;

        if let Some(message) = envelope_error(&body) {
            if by_id && (status == 404 || message.to_lowercase().contains("not found")) {
                return Err(CloudflareError::ZoneNotFound {
                    zone: zone.to_string(),
                });
            }
            return Err(CloudflareError::ZoneLookupFailed { message });
        }

        let parse_failed = |e: serde_json::Error| CloudflareError::ZoneLookupFailed {
            message: format!("Failed to parse zone: {}", e),
        };
        let found = if by_id {
            Some(serde_json::from_value::<Zone>(body["result"].clone()).map_err(parse_failed)?)
        } else {
            serde_json::from_value::<Vec<Zone>>(body["result"].clone())
                .map_err(parse_failed)?
                .into_iter()
                .next()
        };

        let zone_record = found.ok_or_else(|| CloudflareError::ZoneNotFound {
            zone: zone.to_string(),
        })?;

        tracing::debug!(zone = %zone_record.name, "zone resolved");

        Ok(ZoneInfo {
            zone_id: zone_record.id,
            account_id: zone_record.account.id,
        })
    }

    pub async fn discover_dns_records(
        &self,
        zone_id: &str,
    ) -> Result<Vec<DnsRecord>, CloudflareError> {
        let url = format!("{}/zones/{}/dns_records", self.base_url, zone_id);

        self.fetch_all_pages(&url, DEFAULT_PAGE_SIZE, |result| async move {
            serde_json::from_value::<Vec<DnsRecord>>(result).map_err(|e| {
                CloudflareError::DiscoveryFailed {
                    resource_type: "cloudflare_dns_record".to_string(),
                    message: format!("Failed to parse DNS records: {}", e),
                }
            })
        })
        .await
    }

    // NOTE: The pagerules endpoint is not paginated
    pub async fn discover_page_rules(
        &self,
        zone_id: &str,
    ) -> Result<Vec<PageRule>, CloudflareError> {
        let url = format!("{}/zones/{}/pagerules", self.base_url, zone_id);
        let (status, body) = self.get_json(&url).await?;

        if let Some(message) = envelope_error(&body) {
            return Err(CloudflareError::Api { status, message });
        }

        serde_json::from_value(body["result"].clone()).map_err(|e| {
            CloudflareError::DiscoveryFailed {
                resource_type: "cloudflare_page_rule".to_string(),
                message: format!("Failed to parse page rules: {}", e),
            }
        })
    }

    pub async fn fetch_all_pages<T, F, Fut>(
        &self,
        base_url: &str,
        page_size: u32,
        parse_fn: F,
    ) -> Result<Vec<T>, CloudflareError>
    where
        F: Fn(serde_json::Value) -> Fut,
        Fut: std::future::Future<Output = Result<Vec<T>, CloudflareError>>,
    {
        let mut all_results = Vec::new();
        let mut page = 1u32;

        loop {
            let url = format!("{}?page={}&per_page={}", base_url, page, page_size);
            let (status, body) = self.get_json(&url).await?;

            if let Some(message) = envelope_error(&body) {
                return Err(CloudflareError::Api { status, message });
            }

            let page_results = parse_fn(body["result"].clone()).await?;
            let count = page_results.len();
            all_results.extend(page_results);

            let total_count = body
                .get("result_info")
                .and_then(|ri| ri.get("total_count"))
                .and_then(|tc| tc.as_u64())
                .unwrap_or(0) as u32;

            tracing::debug!(page, count, total_count, "fetched page");

            if page * page_size >= total_count || count == 0 {
                break;
            }

            page += 1;
        }

        Ok(all_results)
    }
}

impl std::fmt::Debug for CloudflareClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudflareClient")
            .field("token", &"[REDACTED]")
            .field("base_url", &self.base_url)
            .finish()
    }
}
