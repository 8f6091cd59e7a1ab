//! Built-in resource types and the registry declarations are resolved
//! against.

use std::collections::HashMap;
use std::sync::Arc;

use crate::providers::Provider;
use crate::providers::cloudflare::{self, dns_record_geo_id, page_rule_geo_id};
use crate::resource::{Attributes, ResourceType, Validation, ValidationError, Value};

fn text<'a>(attributes: &'a Attributes, key: &str) -> &'a str {
    attributes.get(key).and_then(Value::as_str).unwrap_or_default()
}

pub fn cloudflare_dns_record() -> ResourceType {
    ResourceType::new(cloudflare::DNS_RECORD)
        .validate(Validation::required_attributes([
            "zone_id", "name", "type", "content",
        ]))
        .geo_id(|attrs| {
            dns_record_geo_id(text(attrs, "zone_id"), text(attrs, "name"), text(attrs, "type"))
        })
}

pub fn cloudflare_page_rule() -> ResourceType {
    ResourceType::new(cloudflare::PAGE_RULE)
        .validate(Validation::required_attributes(["zone_id", "target"]))
        .validate(Validation::required_subresource("actions"))
        .geo_id(|attrs| page_rule_geo_id(text(attrs, "zone_id"), text(attrs, "target")))
}

/// An API Gateway method. `authorizer_id` is only emitted when an
/// `authorizer` is attached, and is required for CUSTOM/COGNITO methods.
pub fn aws_api_gateway_method() -> ResourceType {
    const AUTHORIZED: [&str; 2] = ["CUSTOM", "COGNITO_USER_POOLS"];

    ResourceType::new("aws_api_gateway_method")
        .after_init(|builder| {
            if builder.get("authorization").is_none() {
                builder.set("authorization", "NONE");
            }
        })
        .validate(Validation::required_attributes([
            "rest_api_id",
            "resource_id",
            "http_method",
            "authorization",
        ]))
        .validate(Validation::custom(|resource| {
            let needs_authorizer = resource
                .str_attribute("authorization")
                .is_some_and(|auth| AUTHORIZED.contains(&auth));
            if needs_authorizer && resource.attribute("authorizer").is_none() {
                vec![ValidationError::new(
                    resource,
                    "missing required attribute 'authorizer'",
                )]
            } else {
                Vec::new()
            }
        }))
        .geo_id(|attrs| {
            format!(
                "{}::{}::{}",
                text(attrs, "rest_api_id"),
                text(attrs, "resource_id"),
                text(attrs, "http_method")
            )
        })
        .shape_output(|resource, mut output| {
            let authorizer = output.shift_remove("authorizer");
            match authorizer {
                Some(authorizer) if resource.attribute("authorizer").is_some() => {
                    output.insert("authorizer_id".to_string(), authorizer);
                }
                _ => {
                    output.shift_remove("authorizer_id");
                }
            }
            output
        })
}

/// Resource types by name.
#[derive(Debug, Default)]
pub struct Registry {
    types: HashMap<String, Arc<ResourceType>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in types, with Cloudflare types wired to `cloudflare` when
    /// given.
    pub fn builtin(cloudflare: Option<Arc<dyn Provider>>) -> Self {
        let mut registry = Self::new();
        for kind in [cloudflare_dns_record(), cloudflare_page_rule()] {
            let kind = match &cloudflare {
                Some(provider) => kind.remote(Arc::clone(provider)),
                None => kind,
            };
            registry.register(kind);
        }
        registry.register(aws_api_gateway_method());
        registry
    }

    pub fn register(&mut self, kind: ResourceType) -> Arc<ResourceType> {
        let kind = Arc::new(kind);
        self.types.insert(kind.name().to_string(), Arc::clone(&kind));
        kind
    }

    pub fn get(&self, name: &str) -> Option<&Arc<ResourceType>> {
        self.types.get(name)
    }

    /// The registered type, or a plain type with no rules and no remote
    /// source for names nobody registered.
    pub fn resolve(&mut self, name: &str) -> Arc<ResourceType> {
        if let Some(kind) = self.types.get(name) {
            return Arc::clone(kind);
        }
        tracing::debug!(resource_type = name, "using generic resource type");
        self.register(ResourceType::new(name))
    }
}
