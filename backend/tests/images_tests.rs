mod common;

use common::*;

use backend::types::Environment;
use http::StatusCode;
use pretty_assertions::assert_eq;
use serde_json::json;

#[tokio::test]
async fn test_list_images_happy_path() {
    let ctx = TestContext::new();
    ctx.add_processed("bob_sunset.png", minutes_after_epoch(5));
    ctx.add_processed("alice_beach.jpg", minutes_after_epoch(1));

    let response = ctx.send_get_request("/api/images").await;

    assert_eq!(response.status(), StatusCode::OK);

    let body = parse_response_body(response).await;
    let entries = body.as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["filename"], "alice_beach.jpg");
    assert_eq!(entries[0]["uploader"], "alice");
    assert_eq!(entries[1]["filename"], "bob_sunset.png");
    assert_eq!(entries[1]["uploader"], "bob");
    assert!(entries[1]["url"]
        .as_str()
        .unwrap()
        .contains("img/after/bob_sunset.png"));

    // Creation time is only used for ordering
    assert!(entries[0].get("created_at").is_none());
    assert!(entries[0].get("createdAt").is_none());
}

#[tokio::test]
async fn test_list_images_empty() {
    let ctx = TestContext::new();

    let response = ctx.send_get_request("/api/images").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(parse_response_body(response).await, json!([]));
}

#[tokio::test]
async fn test_list_images_omits_unsignable_entries() {
    let ctx = TestContext::new();
    ctx.add_processed("alice_one.jpg", minutes_after_epoch(1));
    ctx.add_processed("bob_two.jpg", minutes_after_epoch(2));
    ctx.add_processed("carol_three.jpg", minutes_after_epoch(3));
    ctx.store.fail_signing("img/after/carol_three.jpg");

    let response = ctx.send_get_request("/api/images").await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = parse_response_body(response).await;
    let filenames: Vec<_> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["filename"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(filenames, vec!["alice_one.jpg", "bob_two.jpg"]);
}

#[tokio::test]
async fn test_list_images_enumeration_failure() {
    let ctx = TestContext::new();
    ctx.add_processed("alice_one.jpg", minutes_after_epoch(1));
    ctx.store.fail_list_after(0);

    let response = ctx.send_get_request("/api/images").await;

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(
        parse_response_body(response).await,
        json!({
            "allowRetry": true,
            "error": {
                "code": "upstream_error",
                "message": "Image storage temporarily unavailable"
            }
        })
    );
}

#[tokio::test]
async fn test_health() {
    let ctx = TestContext::new();

    let response = ctx.send_get_request("/health").await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = parse_response_body(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "image-gallery");
    assert_eq!(body["semver"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_openapi_hidden_in_production() {
    let ctx = TestContext::with_environment(Environment::Production);

    let response = ctx.send_get_request("/openapi.json").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let ctx = TestContext::new();
    let response = ctx.send_get_request("/openapi.json").await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = parse_response_body(response).await;
    assert!(body["paths"]["/api/images"]["get"].is_object());
}
