//! Update checks: caching, throttling and the environment gate.

mod common;

use common::*;
use premia_sdk::PremiaError;
use serde_json::json;
use wiremock::matchers::{header_exists, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn release(version: &str) -> serde_json::Value {
    json!({
        "version": version,
        "url": "https://cdn.premia.dev/pkg-2.0.zip",
        "requires_platform_version": "6.0",
        "requires_language_version": "8.0",
        "tested_up_to": "6.5",
        "updated_at": "2024-01-01T00:00:00Z"
    })
}

async fn mount_update(server: &MockServer, body: serde_json::Value, expected_calls: u64) {
    Mock::given(method("GET"))
        .and(path("/v1/plugins/42/updates/latest.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .expect(expected_calls)
        .mount(server)
        .await;
}

#[tokio::test]
async fn update_check_requires_active_license() {
    let server = MockServer::start().await;
    let tc = test_client(&server);

    // No mocks mounted: a network attempt would fail loudly.
    let err = tc.client.get_update_info(false).await.unwrap_err();
    assert!(matches!(err, PremiaError::NotActive));
}

#[tokio::test]
async fn update_check_is_cached_and_throttled() {
    let server = MockServer::start().await;
    let tc = test_client(&server);
    activate(&tc, &server).await;

    mount_update(&server, release("2.0"), 1).await;

    let first = tc.client.get_update_info(false).await.unwrap().unwrap();
    assert_eq!(first.version, "2.0");

    // Second call inside the window: served from cache, no second request
    // (the expect(1) above verifies when the server drops).
    let second = tc.client.get_update_info(false).await.unwrap().unwrap();
    assert_eq!(second.version, "2.0");

    // Force-check during the throttle window still serves the cache.
    let forced = tc.client.get_update_info(true).await.unwrap().unwrap();
    assert_eq!(forced.version, "2.0");
}

#[tokio::test]
async fn expired_entries_trigger_exactly_one_new_call() {
    let server = MockServer::start().await;
    let tc = test_client(&server);
    activate(&tc, &server).await;

    mount_update(&server, release("2.0"), 2).await;

    tc.client.get_update_info(false).await.unwrap();
    tc.client.get_update_info(false).await.unwrap();

    expire_update_entries(&tc);

    tc.client.get_update_info(false).await.unwrap();
    tc.client.get_update_info(false).await.unwrap();
}

#[tokio::test]
async fn force_check_refetches_once_window_passed() {
    let server = MockServer::start().await;
    let tc = test_client(&server);
    activate(&tc, &server).await;

    mount_update(&server, release("2.0"), 2).await;
    tc.client.get_update_info(false).await.unwrap();

    // Marker expired, cached result still live: force drops the result
    // entry and refetches.
    use premia_sdk::TtlCache;
    tc.cache.delete("premia_42_update_check");
    tc.client.get_update_info(true).await.unwrap();
}

#[tokio::test]
async fn failed_check_still_counts_against_the_rate_limit() {
    let server = MockServer::start().await;
    let tc = test_client(&server);
    activate(&tc, &server).await;

    Mock::given(method("GET"))
        .and(path("/v1/plugins/42/updates/latest.json"))
        .respond_with(ResponseTemplate::new(500).set_body_string(""))
        .expect(1)
        .mount(&server)
        .await;

    let err = tc.client.get_update_info(false).await.unwrap_err();
    assert!(matches!(err, PremiaError::Remote { .. }));

    // The failure is not cached as a result, but the throttle marker is
    // set: the next call short-circuits without touching the network.
    let err = tc.client.get_update_info(false).await.unwrap_err();
    assert!(matches!(err, PremiaError::TooManyRequests));
}

#[tokio::test]
async fn no_update_response_is_cached_too() {
    let server = MockServer::start().await;
    let tc = test_client(&server);
    activate(&tc, &server).await;

    mount_update(&server, json!({}), 1).await;

    assert!(tc.client.get_update_info(false).await.unwrap().is_none());
    // Up-to-date installs must not re-query on every call.
    assert!(tc.client.get_update_info(false).await.unwrap().is_none());
}

#[tokio::test]
async fn gate_hides_releases_the_host_cannot_run() {
    let server = MockServer::start().await;
    let tc = test_client(&server);
    activate(&tc, &server).await;

    // Platform floor above the host's 6.4.
    let mut body = release("2.0");
    body["requires_platform_version"] = json!("7.0");
    mount_update(&server, body, 1).await;

    assert!(tc.client.get_update_info(false).await.unwrap().is_none());
}

#[tokio::test]
async fn gate_hides_non_newer_releases() {
    let server = MockServer::start().await;
    let tc = test_client(&server);
    activate(&tc, &server).await;

    // Same version as installed; platform and language gates would pass.
    mount_update(&server, release("1.0.0"), 1).await;
    assert!(tc.client.get_update_info(false).await.unwrap().is_none());
}

#[tokio::test]
async fn update_request_is_signed_and_versioned() {
    let server = MockServer::start().await;
    let tc = test_client(&server);
    activate(&tc, &server).await;

    Mock::given(method("GET"))
        .and(path("/v1/plugins/42/updates/latest.json"))
        .and(query_param("version", "1.0.0"))
        .and(header_exists("Authorization"))
        .and(header_exists("Date"))
        .respond_with(ResponseTemplate::new(200).set_body_json(release("2.0")))
        .expect(1)
        .mount(&server)
        .await;

    let info = tc.client.get_update_info(false).await.unwrap().unwrap();
    assert_eq!(info.url, "https://cdn.premia.dev/pkg-2.0.zip");
    assert_eq!(info.tested_up_to.as_deref(), Some("6.5"));
}

#[tokio::test]
async fn marketing_info_is_cached_and_requires_activation() {
    let server = MockServer::start().await;
    let tc = test_client(&server);

    let err = tc.client.get_marketing_info().await.unwrap_err();
    assert!(matches!(err, PremiaError::NotActive));

    activate(&tc, &server).await;

    Mock::given(method("GET"))
        .and(path("/v1/plugins/42/info.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "description": "The best example plugin.",
            "banner_url": "https://cdn.premia.dev/banner.png"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let info = tc.client.get_marketing_info().await.unwrap();
    assert_eq!(info.description, "The best example plugin.");

    // Cached on the second read.
    let info = tc.client.get_marketing_info().await.unwrap();
    assert_eq!(
        info.banner_url.as_deref(),
        Some("https://cdn.premia.dev/banner.png")
    );
}

#[tokio::test]
async fn marketing_failure_throttles_subsequent_calls() {
    let server = MockServer::start().await;
    let tc = test_client(&server);
    activate(&tc, &server).await;

    Mock::given(method("GET"))
        .and(path("/v1/plugins/42/info.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "error": { "code": "not_published", "message": "listing unavailable" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let err = tc.client.get_marketing_info().await.unwrap_err();
    assert!(matches!(err, PremiaError::Remote { .. }));

    let err = tc.client.get_marketing_info().await.unwrap_err();
    assert!(matches!(err, PremiaError::TooManyRequests));
}
