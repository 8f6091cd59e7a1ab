use serde::Deserialize;

use crate::providers::RemoteEntry;

pub const DEFAULT_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone, PartialEq)]
pub struct ZoneInfo {
    pub zone_id: String,
    pub account_id: String,
}

#[derive(Debug, Deserialize)]
pub struct Zone {
    pub id: String,
    pub name: String,
    pub account: ZoneAccount,
}

#[derive(Debug, Deserialize)]
pub struct ZoneAccount {
    pub id: String,
}

pub fn is_zone_id(input: &str) -> bool {
    input.len() == 32 && input.chars().all(|c| c.is_ascii_hexdigit())
}

/// `<zone_id>::<name>::<type>`, shared by declared and discovered records.
pub fn dns_record_geo_id(zone_id: &str, name: &str, record_type: &str) -> String {
    format!("{}::{}::{}", zone_id, name, record_type)
}

/// `<zone_id>::<target>`, where target is the page rule's URL pattern.
pub fn page_rule_geo_id(zone_id: &str, target: &str) -> String {
    format!("{}::{}", zone_id, target)
}

#[derive(Debug, Deserialize)]
pub struct DnsRecord {
    pub id: String,
    #[serde(default)]
    pub zone_id: Option<String>,
    pub name: String,
    #[serde(rename = "type")]
    pub type_: String,
    #[serde(default)]
    pub content: Option<String>,
}

impl DnsRecord {
    pub fn into_remote_entry(self, zone_id: &str) -> RemoteEntry {
        let zone_id = self.zone_id.unwrap_or_else(|| zone_id.to_string());
        let mut entry = RemoteEntry::new(
            dns_record_geo_id(&zone_id, &self.name, &self.type_),
            Some(self.id),
        )
        .with_attribute("zone_id", zone_id.into())
        .with_attribute("name", self.name.into())
        .with_attribute("type", self.type_.into());
        if let Some(content) = self.content {
            entry = entry.with_attribute("content", content.into());
        }
        entry
    }
}

#[derive(Debug, Deserialize)]
pub struct PageRuleTarget {
    #[allow(dead_code)] // NOTE: Always "url" today
    pub target: String,
    pub constraint: PageRuleConstraint,
}

#[derive(Debug, Deserialize)]
pub struct PageRuleConstraint {
    #[allow(dead_code)] // NOTE: Only read through Debug
    pub operator: String,
    pub value: String,
}

#[derive(Debug, Deserialize)]
pub struct PageRule {
    pub id: String,
    pub targets: Vec<PageRuleTarget>,
    #[serde(default)]
    pub status: Option<String>,
}

impl PageRule {
    pub fn into_remote_entry(self, zone_id: &str) -> RemoteEntry {
        let target = self
            .targets
            .first()
            .map(|t| t.constraint.value.clone())
            .unwrap_or_else(|| self.id.clone());

        let mut entry = RemoteEntry::new(page_rule_geo_id(zone_id, &target), Some(self.id))
            .with_attribute("zone_id", zone_id.into())
            .with_attribute("target", target.into());
        if let Some(status) = self.status {
            entry = entry.with_attribute("status", status.into());
        }
        entry
    }
}
