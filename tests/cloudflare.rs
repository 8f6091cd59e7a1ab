use std::sync::Arc;

use geoengineer::definitions::{Registry, cloudflare_dns_record};
use geoengineer::gps::Context;
use geoengineer::providers::{Provider, ProviderError};
use geoengineer::{
    CloudflareClient, CloudflareError, CloudflareProvider, Generation, RemoteInventory, Resource,
};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ZONE_ID: &str = "023e105f4ecef8ad9ca31a8372d0c353";

async fn mount_session(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/user/tokens/verify"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "success": true,
            "result": { "id": "tok", "status": "active" }
        })))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/zones"))
        .and(query_param("name", "example.com"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "success": true,
            "errors": [],
            "result": [{
                "id": ZONE_ID,
                "name": "example.com",
                "account": { "id": "01a7362d577a6c3019a474fd6f485823", "name": "Ops" }
            }]
        })))
        .mount(server)
        .await;
}

async fn mount_dns_records(server: &MockServer, expected_calls: u64) {
    Mock::given(method("GET"))
        .and(path(format!("/zones/{}/dns_records", ZONE_ID)))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "success": true,
            "errors": [],
            "result": [
                { "id": "rec_www", "name": "www.example.com", "type": "A", "content": "192.0.2.1" },
                { "id": "rec_mx", "name": "example.com", "type": "MX", "content": "mail.example.com" }
            ],
            "result_info": { "page": 1, "per_page": 100, "total_count": 2 }
        })))
        .expect(expected_calls)
        .mount(server)
        .await;
}

fn provider(server: &MockServer) -> CloudflareProvider {
    CloudflareProvider::with_base_url(
        Some("test_token".to_string()),
        Some("example.com".to_string()),
        server.uri(),
    )
}

#[tokio::test]
async fn test_verify_auth_rejects_invalid_token_without_leaking_it() {
    let server = MockServer::start().await;
    let secret_token = "cf_super_secret_token_xyz789";

    Mock::given(method("GET"))
        .and(path("/user/tokens/verify"))
        .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
            "success": false,
            "errors": [{ "code": 1000, "message": "Invalid API Token" }]
        })))
        .mount(&server)
        .await;

    let client = CloudflareClient::with_base_url(secret_token.to_string(), server.uri()).unwrap();
    let result = client.verify_auth().await;

    match &result {
        Err(CloudflareError::Auth { message }) => assert_eq!(message, "Invalid API Token"),
        other => panic!("Expected CloudflareError::Auth, got {:?}", other),
    }
    assert!(!format!("{:?}", result).contains(secret_token));
}

#[tokio::test]
async fn test_lookup_zone_by_id_not_found() {
    let server = MockServer::start().await;
    let zone_id = "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";

    Mock::given(method("GET"))
        .and(path(format!("/zones/{}", zone_id)))
        .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
            "success": false,
            "errors": [{ "code": 7003, "message": "Could not route to /zones/aaaa" }]
        })))
        .mount(&server)
        .await;

    let client = CloudflareClient::with_base_url("test_token".to_string(), server.uri()).unwrap();
    match client.lookup_zone(zone_id).await {
        Err(CloudflareError::ZoneNotFound { zone }) => assert_eq!(zone, zone_id),
        other => panic!("Expected CloudflareError::ZoneNotFound, got {:?}", other),
    }
}

#[tokio::test]
async fn test_lookup_zone_by_name_permission_denied() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/zones"))
        .and(query_param("name", "restricted.com"))
        .respond_with(ResponseTemplate::new(403).set_body_json(serde_json::json!({
            "success": false,
            "errors": [{ "code": 9109, "message": "You do not have permission to access this zone" }]
        })))
        .mount(&server)
        .await;

    let client = CloudflareClient::with_base_url("test_token".to_string(), server.uri()).unwrap();
    match client.lookup_zone("restricted.com").await {
        Err(CloudflareError::ZoneLookupFailed { message }) => {
            assert!(message.contains("permission"))
        }
        other => panic!("Expected CloudflareError::ZoneLookupFailed, got {:?}", other),
    }
}

#[tokio::test]
async fn test_discover_dns_records_follows_pages() {
    let server = MockServer::start().await;

    for (page, ids) in [("1", vec!["r1", "r2"]), ("2", vec!["r3"])] {
        let records: Vec<serde_json::Value> = ids
            .iter()
            .map(|id| serde_json::json!({ "id": id, "name": format!("{}.example.com", id), "type": "A" }))
            .collect();
        Mock::given(method("GET"))
            .and(path("/zones/zone123/dns_records"))
            .and(query_param("page", page))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "success": true,
                "errors": [],
                "result": records,
                "result_info": { "per_page": 2, "total_count": 3 }
            })))
            .mount(&server)
            .await;
    }

    let client = CloudflareClient::with_base_url("test_token".to_string(), server.uri()).unwrap();
    let records = client.discover_dns_records("zone123").await;

    // Default page size exceeds total_count, so only page 1 is requested.
    let ids: Vec<String> = records.unwrap().into_iter().map(|r| r.id).collect();
    assert_eq!(ids, vec!["r1", "r2"]);
}

#[tokio::test]
async fn test_discover_page_rules_api_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/zones/zone123/pagerules"))
        .respond_with(ResponseTemplate::new(403).set_body_json(serde_json::json!({
            "success": false,
            "errors": [{ "code": 9109, "message": "Insufficient permissions" }],
            "result": null
        })))
        .mount(&server)
        .await;

    let client = CloudflareClient::with_base_url("test_token".to_string(), server.uri()).unwrap();
    match client.discover_page_rules("zone123").await {
        Err(CloudflareError::Api { status, message }) => {
            assert_eq!(status, 403);
            assert!(message.contains("Insufficient permissions"));
        }
        other => panic!("Expected CloudflareError::Api, got {:?}", other),
    }
}

#[tokio::test]
async fn test_provider_fetch_remote_tags_entries_with_geo_id() {
    let server = MockServer::start().await;
    mount_session(&server).await;
    mount_dns_records(&server, 1).await;

    let entries = provider(&server)
        .fetch_remote("cloudflare_dns_record")
        .await
        .unwrap();

    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].geo_id, format!("{}::www.example.com::A", ZONE_ID));
    assert_eq!(entries[0].terraform_id.as_deref(), Some("rec_www"));
    assert_eq!(entries[1].attributes["content"], "mail.example.com");
}

#[tokio::test]
async fn test_provider_fetch_remote_page_rules() {
    let server = MockServer::start().await;
    mount_session(&server).await;

    Mock::given(method("GET"))
        .and(path(format!("/zones/{}/pagerules", ZONE_ID)))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "success": true,
            "errors": [],
            "result": [{
                "id": "rule_abc",
                "status": "active",
                "targets": [{
                    "target": "url",
                    "constraint": { "operator": "matches", "value": "*example.com/images/*" }
                }],
                "actions": [{ "id": "browser_check", "value": "on" }]
            }]
        })))
        .mount(&server)
        .await;

    let entries = provider(&server)
        .fetch_remote("cloudflare_page_rule")
        .await
        .unwrap();

    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].geo_id, format!("{}::*example.com/images/*", ZONE_ID));
    assert_eq!(entries[0].attributes["status"], "active");
}

#[tokio::test]
async fn test_provider_auth_failure_maps_to_provider_auth() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/user/tokens/verify"))
        .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
            "success": false,
            "errors": [{ "code": 1000, "message": "Invalid API Token" }]
        })))
        .mount(&server)
        .await;

    let result = provider(&server).fetch_remote("cloudflare_dns_record").await;
    assert!(matches!(result, Err(ProviderError::Auth(ref m)) if m == "Invalid API Token"));
}

#[tokio::test]
async fn test_resources_reconcile_against_one_fetch() {
    let server = MockServer::start().await;
    mount_session(&server).await;
    mount_dns_records(&server, 1).await;

    let kind = Arc::new(cloudflare_dns_record().remote(Arc::new(provider(&server))));
    let www = Resource::builder(Arc::clone(&kind), "www")
        .attr("zone_id", ZONE_ID)
        .attr("name", "www.example.com")
        .attr("type", "A")
        .attr("content", "192.0.2.1")
        .build();
    let api = Resource::builder(kind, "api")
        .attr("zone_id", ZONE_ID)
        .attr("name", "api.example.com")
        .attr("type", "A")
        .attr("content", "192.0.2.2")
        .build();

    let inventory = RemoteInventory::new();
    assert_eq!(www.terraform_id(&inventory).await.unwrap(), Some("rec_www"));
    assert_eq!(api.terraform_id(&inventory).await.unwrap(), None);
}

#[tokio::test]
async fn test_generation_import_blocks_for_existing_records() {
    let server = MockServer::start().await;
    mount_session(&server).await;
    mount_dns_records(&server, 1).await;

    let declarations = serde_json::json!({
        "nodes": [{
            "project": "web", "environment": "prod", "configuration": "edge",
            "type": "dns", "name": "www",
            "resources": {
                "record": {
                    "type": "cloudflare_dns_record",
                    "id": "www",
                    "attributes": {
                        "zone_id": ZONE_ID, "name": "www.example.com",
                        "type": "A", "content": "192.0.2.1"
                    }
                },
                "mx": {
                    "type": "cloudflare_dns_record",
                    "id": "new_mx",
                    "attributes": {
                        "zone_id": ZONE_ID, "name": "new.example.com",
                        "type": "MX", "content": "mail.example.com"
                    }
                }
            }
        }]
    });

    let provider: Arc<dyn Provider> = Arc::new(provider(&server));
    let mut registry = Registry::builtin(Some(provider));
    let generation =
        Generation::from_json(&declarations.to_string(), &mut registry, Context::default())
            .unwrap();

    let inventory = RemoteInventory::new();
    let blocks = generation.import_blocks(&inventory).await.unwrap();

    assert_eq!(blocks.len(), 1);
    assert!(blocks[0].contains("to = cloudflare_dns_record.www"));
    assert!(blocks[0].contains(&format!("id = \"{}/rec_www\"", ZONE_ID)));

    let state = generation.to_terraform_state(&inventory).await.unwrap();
    assert_eq!(
        state.resources["cloudflare_dns_record.www"].primary.id.as_deref(),
        Some("rec_www")
    );
    assert!(state.resources["cloudflare_dns_record.new_mx"].primary.id.is_none());
}
