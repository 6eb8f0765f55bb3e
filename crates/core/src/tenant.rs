//! Tenant entity and repository (§3 `Tenant`).
//!
//! Shared across `sentry-ingest` (api_key lookup, webhook security,
//! rate-limit/correlation config), `sentry-incidents` (critical-asset
//! bonus in the priority formula) and `sentry-api` (tenant administration),
//! so it lives in `sentry-core` alongside the other cross-cutting facades
//! rather than being owned by any one consuming crate.

use crate::ratelimit::RateLimitConfig;
use crate::storage::{FieldFilter, Storage};
use crate::types::TenantId;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

const COLLECTION: &str = "tenants";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AwsIntegration {
    pub account_id: String,
    pub role_arn: String,
    pub external_id: String,
    pub region: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrelationConfig {
    pub time_window_seconds: i64,
    pub aggregation_key: crate::types::AggregationKeyKind,
    pub auto_correlate: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookSecurityConfig {
    pub hmac_enabled: bool,
    pub secret: String,
    pub timestamp_skew_seconds: i64,
}

/// Per-severity deadline used by the assignment scorer (to start the clock,
/// §4.G) and the SLA/escalation monitor (to detect a breach, §4.J). Neither
/// spec.md §3 nor its per-tenant config list spells out an SLA schema; this
/// is the Open Question resolution recorded in DESIGN.md.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SlaConfig {
    pub critical_minutes: i64,
    pub high_minutes: i64,
    pub medium_minutes: i64,
    pub low_minutes: i64,
}

impl SlaConfig {
    pub fn deadline_minutes(&self, severity: crate::types::AlertSeverity) -> i64 {
        match severity {
            crate::types::AlertSeverity::Critical => self.critical_minutes,
            crate::types::AlertSeverity::High => self.high_minutes,
            crate::types::AlertSeverity::Medium => self.medium_minutes,
            crate::types::AlertSeverity::Low => self.low_minutes,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tenant {
    pub id: TenantId,
    pub name: String,
    pub api_key: String,
    pub hmac_secret: Option<String>,
    pub aws_integration: Option<AwsIntegration>,
    pub critical_assets: HashSet<String>,
    pub rate_limit: RateLimitConfig,
    pub correlation: CorrelationConfig,
    pub webhook_security: WebhookSecurityConfig,
    pub sla: SlaConfig,
    pub status: crate::types::TenantStatus,
    pub created_at: i64,
    pub version: u32,
}

impl Tenant {
    pub fn is_critical_asset(&self, asset_name: &str) -> bool {
        self.critical_assets.contains(asset_name)
    }
}

#[derive(Clone)]
pub struct TenantRepository {
    storage: Arc<dyn Storage>,
}

impl TenantRepository {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    pub async fn insert(&self, tenant: &Tenant) -> Result<()> {
        self.storage
            .insert_one(COLLECTION, tenant.id.0, serde_json::to_value(tenant)?)
            .await
    }

    pub async fn get_by_id(&self, tenant_id: TenantId) -> Result<Option<Tenant>> {
        let doc = self
            .storage
            .find_one(COLLECTION, &[FieldFilter::eq("id", tenant_id.0.to_string())])
            .await?;
        doc.map(|v| serde_json::from_value(v).map_err(Error::from))
            .transpose()
    }

    /// The webhook receiver's only handle on a tenant before it knows the
    /// tenant id (§4.E step 1).
    pub async fn get_by_api_key(&self, api_key: &str) -> Result<Option<Tenant>> {
        let doc = self
            .storage
            .find_one(COLLECTION, &[FieldFilter::eq("api_key", api_key)])
            .await?;
        doc.map(|v| serde_json::from_value(v).map_err(Error::from))
            .transpose()
    }

    pub async fn rotate_api_key(&self, tenant_id: TenantId, new_api_key: String) -> Result<()> {
        self.storage
            .update_one(
                COLLECTION,
                &[FieldFilter::eq("id", tenant_id.0.to_string())],
                serde_json::json!({ "api_key": new_api_key }),
            )
            .await?;
        Ok(())
    }

    pub async fn rotate_hmac_secret(
        &self,
        tenant_id: TenantId,
        new_secret: String,
    ) -> Result<()> {
        self.storage
            .update_one(
                COLLECTION,
                &[FieldFilter::eq("id", tenant_id.0.to_string())],
                serde_json::json!({
                    "webhook_security": { "secret": new_secret }
                }),
            )
            .await?;
        Ok(())
    }

    /// Auto-discovers an asset name into the tenant's critical-asset set
    /// only when the caller explicitly marks it so; webhook auto-discovery
    /// always creates assets with `is_critical=false` (§4.E step 5) and
    /// never calls this.
    pub async fn mark_asset_critical(&self, tenant_id: TenantId, asset_name: &str) -> Result<()> {
        let tenant = self
            .get_by_id(tenant_id)
            .await?
            .ok_or_else(|| Error::not_found("tenant not found"))?;
        let mut assets = tenant.critical_assets;
        assets.insert(asset_name.to_string());
        self.storage
            .update_one(
                COLLECTION,
                &[FieldFilter::eq("id", tenant_id.0.to_string())],
                serde_json::json!({ "critical_assets": assets }),
            )
            .await?;
        Ok(())
    }
}
