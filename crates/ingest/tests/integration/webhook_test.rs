use super::common::TestContext;
use sentry_core::security::SignatureVerifier;
use sentry_ingest::{IngestRequest, WebhookHeaders};

fn sample_request(delivery_id: Option<&str>) -> IngestRequest {
    IngestRequest {
        asset_name: "web-01".to_string(),
        signature: "disk-full".to_string(),
        severity: "sev2".to_string(),
        message: "disk at 95%".to_string(),
        tool_source: "datadog".to_string(),
        metadata: None,
        delivery_id: delivery_id.map(|s| s.to_string()),
    }
}

fn no_headers() -> WebhookHeaders {
    WebhookHeaders {
        x_timestamp: None,
        x_signature: None,
    }
}

#[tokio::test]
async fn unknown_api_key_is_rejected() {
    let ctx = TestContext::new().await;
    let result = ctx
        .service
        .ingest("does-not-exist", "{}", sample_request(None), no_headers())
        .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn successful_ingest_auto_discovers_asset_and_responds() {
    let ctx = TestContext::new().await;
    ctx.seed_tenant("key-1", false, "").await;

    let response = ctx
        .service
        .ingest("key-1", "{}", sample_request(Some("delivery-1")), no_headers())
        .await
        .expect("ingest should succeed");

    assert!(!response.duplicate);
    assert!(response.alert_id.is_some());
    assert!(response.created_at.is_some());
}

#[tokio::test]
async fn duplicate_delivery_id_short_circuits() {
    let ctx = TestContext::new().await;
    ctx.seed_tenant("key-2", false, "").await;

    let first = ctx
        .service
        .ingest("key-2", "{}", sample_request(Some("delivery-dup")), no_headers())
        .await
        .expect("first ingest should succeed");
    assert!(!first.duplicate);

    let second = ctx
        .service
        .ingest("key-2", "{}", sample_request(Some("delivery-dup")), no_headers())
        .await
        .expect("duplicate ingest should still return 200");
    assert!(second.duplicate);
    assert_eq!(second.alert_id, first.alert_id);
}

#[tokio::test]
async fn rate_limit_rejects_once_burst_exhausted() {
    let ctx = TestContext::new().await;
    let tenant_id = ctx.seed_tenant("key-3", false, "").await;

    ctx.storage
        .update_one(
            "tenants",
            &[sentry_core::storage::FieldFilter::eq("id", tenant_id.0.to_string())],
            serde_json::json!({ "rate_limit": { "requests_per_minute": 1, "burst_size": 1, "enabled": true } }),
        )
        .await
        .expect("tenant update should succeed");

    let first = ctx
        .service
        .ingest("key-3", "{}", sample_request(Some("d1")), no_headers())
        .await;
    assert!(first.is_ok());

    let second = ctx
        .service
        .ingest("key-3", "{}", sample_request(Some("d2")), no_headers())
        .await;
    assert!(second.is_err(), "second request should be rate-limited");
}

#[tokio::test]
async fn hmac_signature_is_required_and_verified() {
    let ctx = TestContext::new().await;
    ctx.seed_tenant("key-4", true, "shared-secret").await;

    let body = serde_json::to_string(&sample_request(Some("d-hmac"))).unwrap();

    // missing headers entirely
    let missing = ctx
        .service
        .ingest("key-4", &body, sample_request(Some("d-hmac")), no_headers())
        .await;
    assert!(missing.is_err());

    // correctly signed
    let now = chrono::Utc::now().timestamp();
    let signature = SignatureVerifier::sign(&body, now, "shared-secret").unwrap();
    let headers = WebhookHeaders {
        x_timestamp: Some(now.to_string()),
        x_signature: Some(signature),
    };
    let ok = ctx
        .service
        .ingest("key-4", &body, sample_request(Some("d-hmac-ok")), headers)
        .await;
    assert!(ok.is_ok());

    // tampered signature
    let mut bad_signature = SignatureVerifier::sign(&body, now, "shared-secret").unwrap();
    bad_signature.pop();
    bad_signature.push('0');
    let bad_headers = WebhookHeaders {
        x_timestamp: Some(now.to_string()),
        x_signature: Some(bad_signature),
    };
    let tampered = ctx
        .service
        .ingest("key-4", &body, sample_request(Some("d-hmac-bad")), bad_headers)
        .await;
    assert!(tampered.is_err());
}
