//! Webhook ingestion (spec §6): the one route authenticated by the
//! tenant's `api_key` query parameter rather than a JWT, so it is mounted
//! outside the bearer-auth middleware stack.

use axum::{
    extract::{Query, State},
    response::Json,
    routing::post,
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use sentry_ingest::service::{IngestRequest, WebhookHeaders};

use crate::error::ApiError;
use crate::state::AppState;

pub fn webhook_routes() -> Router<AppState> {
    Router::new().route("/alerts", post(ingest_alert))
}

#[derive(Debug, Deserialize)]
pub struct WebhookQuery {
    pub api_key: String,
}

async fn ingest_alert(
    State(state): State<AppState>,
    Query(query): Query<WebhookQuery>,
    headers: axum::http::HeaderMap,
    body: axum::body::Bytes,
) -> Result<Json<Value>, ApiError> {
    let raw_body = String::from_utf8_lossy(&body).into_owned();
    let request: IngestRequest = serde_json::from_str(&raw_body)
        .map_err(|e| sentry_core::Error::validation(format!("malformed webhook body: {e}")))?;

    let webhook_headers = WebhookHeaders {
        x_timestamp: header_str(&headers, "x-timestamp"),
        x_signature: header_str(&headers, "x-signature"),
    };

    let response = state
        .ingest_service
        .ingest(&query.api_key, &raw_body, request, webhook_headers)
        .await?;

    Ok(Json(json!({
        "alert_id": response.alert_id,
        "created_at": response.created_at,
        "duplicate": response.duplicate,
    })))
}

fn header_str(headers: &axum::http::HeaderMap, name: &str) -> Option<String> {
    headers.get(name)?.to_str().ok().map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{seed_tenant, test_app, test_state};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    fn sample_body() -> String {
        serde_json::to_string(&IngestRequest {
            asset_name: "web-01".to_string(),
            signature: "disk-full".to_string(),
            severity: "sev2".to_string(),
            message: "disk at 95%".to_string(),
            tool_source: "datadog".to_string(),
            metadata: None,
            delivery_id: Some("delivery-1".to_string()),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn unknown_api_key_is_rejected() {
        let state = test_state().await;
        let app = test_app(state);

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/webhooks/alerts?api_key=does-not-exist")
                    .header("content-type", "application/json")
                    .body(Body::from(sample_body()))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_ne!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn valid_api_key_ingests_alert() {
        let state = test_state().await;
        seed_tenant(&state, "webhook-key-1").await;
        let app = test_app(state);

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/webhooks/alerts?api_key=webhook-key-1")
                    .header("content-type", "application/json")
                    .body(Body::from(sample_body()))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }
}
