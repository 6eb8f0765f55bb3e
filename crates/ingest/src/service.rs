//! Webhook receiver (§4.E): the fixed 8-step order of checks, terminating
//! on first failure.

use crate::models::Alert;
use crate::repository::{AlertRepository, AssetRepository};
use chrono::Utc;
use sentry_core::security::SignatureVerifier;
use sentry_core::{
    AlertId, AlertSeverity, AuditLogger, AuditStatus, Error, EventBus, IdempotencyGuard,
    RateLimiter, Result, TenantRepository, Topic,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookHeaders {
    pub x_timestamp: Option<String>,
    pub x_signature: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestRequest {
    pub asset_name: String,
    pub signature: String,
    pub severity: String,
    pub message: String,
    pub tool_source: String,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
    #[serde(default)]
    pub delivery_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct IngestResponse {
    pub alert_id: Option<uuid::Uuid>,
    pub created_at: Option<i64>,
    pub duplicate: bool,
}

pub struct IngestService {
    tenants: TenantRepository,
    assets: AssetRepository,
    alerts: AlertRepository,
    rate_limiter: RateLimiter,
    idempotency: IdempotencyGuard,
    event_bus: Arc<EventBus>,
    audit: Arc<AuditLogger>,
}

impl IngestService {
    pub fn new(
        tenants: TenantRepository,
        assets: AssetRepository,
        alerts: AlertRepository,
        rate_limiter: RateLimiter,
        idempotency: IdempotencyGuard,
        event_bus: Arc<EventBus>,
        audit: Arc<AuditLogger>,
    ) -> Self {
        Self {
            tenants,
            assets,
            alerts,
            rate_limiter,
            idempotency,
            event_bus,
            audit,
        }
    }

    /// Runs the full §4.E check order. `raw_body` is the exact bytes the
    /// signature was computed over; `request` is the already-deserialized
    /// form of the same payload.
    pub async fn ingest(
        &self,
        api_key: &str,
        raw_body: &str,
        request: IngestRequest,
        headers: WebhookHeaders,
    ) -> Result<IngestResponse> {
        // 1. Resolve tenant by api_key.
        let tenant = self
            .tenants
            .get_by_api_key(api_key)
            .await?
            .ok_or_else(|| Error::unauthorized("unknown api_key"))?;

        // 2. Admit through the rate limiter.
        let decision = self
            .rate_limiter
            .admit(tenant.id, tenant.rate_limit)
            .await?;
        if !decision.admitted {
            return Err(Error::rate_limited("rate limit exceeded")
                .add_metadata("retry_after_seconds", decision.retry_after_seconds.into())
                .add_metadata("limit", decision.limit.into())
                .add_metadata("burst", decision.burst.into()));
        }

        // 3. Verify HMAC signature if the tenant requires it.
        if tenant.webhook_security.hmac_enabled {
            let timestamp = headers
                .x_timestamp
                .as_deref()
                .ok_or_else(|| Error::unauthorized("invalid webhook signature"))?;
            let signature = headers
                .x_signature
                .as_deref()
                .ok_or_else(|| Error::unauthorized("invalid webhook signature"))?;
            SignatureVerifier::verify(
                raw_body,
                timestamp,
                signature,
                &tenant.webhook_security.secret,
                tenant.webhook_security.timestamp_skew_seconds,
            )?;
        }

        // 4. Idempotency guard.
        let delivery_id = request.delivery_id.clone().unwrap_or_else(|| {
            IdempotencyGuard::derive_delivery_id(
                tenant.id,
                &request.asset_name,
                &request.signature,
                &request.message,
                raw_body,
            )
        });
        let dedup = self.idempotency.check_and_record(tenant.id, &delivery_id).await?;
        if dedup.duplicate {
            return Ok(IngestResponse {
                alert_id: dedup.alert_id,
                created_at: None,
                duplicate: true,
            });
        }

        // 5. Auto-discover the asset if unknown.
        let now = Utc::now().timestamp();
        self.assets
            .get_or_auto_discover(tenant.id, &request.asset_name, &request.tool_source, now)
            .await?;

        // 6. Persist the alert.
        let alert = Alert {
            id: AlertId::new(),
            tenant_id: tenant.id,
            asset_name: request.asset_name,
            signature: request.signature,
            severity: AlertSeverity::from_free_form(&request.severity),
            message: request.message,
            tool_source: request.tool_source,
            timestamp: now,
            delivery_id,
            delivery_attempts: 1,
            correlated: false,
            incident_id: None,
            metadata: request.metadata,
        };
        self.alerts.insert(&alert).await?;

        // 7. Emit alert.ingested.
        self.event_bus.publish(
            Topic::AlertIngested,
            tenant.id,
            serde_json::json!({
                "alert_id": alert.id,
                "asset_name": alert.asset_name,
                "signature": alert.signature,
                "severity": alert.severity,
            }),
        );

        self.audit
            .log(AuditLogger::entry(
                tenant.id,
                None,
                "alert.ingested",
                "alert",
                Some(alert.id.0),
                AuditStatus::Success,
                None,
            ))
            .await;

        info!(tenant_id = %tenant.id, alert_id = %alert.id, "alert ingested");

        // 8. Respond.
        Ok(IngestResponse {
            alert_id: Some(alert.id.0),
            created_at: Some(now),
            duplicate: false,
        })
    }
}
