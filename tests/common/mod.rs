//! Test utilities and fixtures for Premia SDK integration tests

#![allow(dead_code)]

use std::sync::Arc;

use premia_sdk::{
    ClientOptions, Entity, MemoryOptionStore, MemoryTtlCache, PremiaClient, StaticHostEnv,
};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const LICENSE_KEY: &str = "ABCD-1234";
pub const INSTALL_ID: &str = "77";

/// Host fixture matching the activation scenario: example.com, instance 1.
pub fn test_host() -> Arc<StaticHostEnv> {
    Arc::new(StaticHostEnv {
        site_url: "https://example.com".into(),
        instance_id: "1".into(),
        platform_version: "6.4".into(),
        language_version: "8.2".into(),
        installed_version: "1.0.0".into(),
        display_name: "Example Plugin".into(),
        author: "Example Co".into(),
    })
}

/// Shared storage handles plus a client wired to a mock server.
pub struct TestClient {
    pub client: PremiaClient,
    pub store: Arc<MemoryOptionStore>,
    pub cache: Arc<MemoryTtlCache>,
}

pub fn test_client(server: &MockServer) -> TestClient {
    let store = Arc::new(MemoryOptionStore::new());
    let cache = Arc::new(MemoryTtlCache::new());

    let client = PremiaClient::new(
        Entity::plugin("42"),
        test_host(),
        ClientOptions {
            base_url: Some(server.uri()),
            options_store: Some(store.clone()),
            cache: Some(cache.clone()),
            ..Default::default()
        },
    )
    .expect("client construction");

    TestClient {
        client,
        store,
        cache,
    }
}

/// Mount the standard successful `activate.json` response: install_id plus
/// an install-scoped credential pair in the capability bag.
pub async fn mount_activation_success(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/v1/plugins/42/activate.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "install_id": INSTALL_ID,
            "public_key": "pk_install",
            "secret_key": "sk_install",
            "plan": "pro"
        })))
        .mount(server)
        .await;
}

/// Mount the standard successful `deactivate.json` response.
pub async fn mount_deactivation_success(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/v1/plugins/42/deactivate.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": INSTALL_ID })))
        .mount(server)
        .await;
}

/// Activate the test client against a freshly-mounted success response.
pub async fn activate(tc: &TestClient, server: &MockServer) {
    mount_activation_success(server).await;
    tc.client.activate(LICENSE_KEY).await.expect("activation");
}

/// Drop the update throttle marker and result entry, simulating natural
/// TTL expiry of both.
pub fn expire_update_entries(tc: &TestClient) {
    use premia_sdk::TtlCache;
    tc.cache.delete("premia_42_update_check");
    tc.cache.delete("premia_42_update_data");
}
