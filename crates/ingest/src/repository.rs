use crate::models::{Alert, Asset};
use sentry_core::storage::{FieldFilter, Sort, Storage};
use sentry_core::{AlertId, Error, Result, TenantId};
use std::sync::Arc;

const ASSETS: &str = "assets";
const ALERTS: &str = "alerts";

#[derive(Clone)]
pub struct AssetRepository {
    storage: Arc<dyn Storage>,
}

impl AssetRepository {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    pub async fn get_by_name(&self, tenant_id: TenantId, name: &str) -> Result<Option<Asset>> {
        let doc = self
            .storage
            .find_one(
                ASSETS,
                &[FieldFilter::tenant(tenant_id), FieldFilter::eq("name", name)],
            )
            .await?;
        doc.map(|v| serde_json::from_value(v).map_err(Error::from))
            .transpose()
    }

    pub async fn insert(&self, asset: &Asset) -> Result<()> {
        self.storage
            .insert_one(ASSETS, asset.id, serde_json::to_value(asset)?)
            .await
    }

    /// Looks up the asset by name, creating one with `is_critical=false` and
    /// `tags={tool_source}` on first reference (§4.E step 5, §3 `Asset`).
    pub async fn get_or_auto_discover(
        &self,
        tenant_id: TenantId,
        name: &str,
        tool_source: &str,
        now: i64,
    ) -> Result<Asset> {
        if let Some(existing) = self.get_by_name(tenant_id, name).await? {
            return Ok(existing);
        }

        let asset = Asset {
            id: uuid::Uuid::new_v4(),
            tenant_id,
            name: name.to_string(),
            kind: "unknown".to_string(),
            is_critical: false,
            tags: std::iter::once(tool_source.to_string()).collect(),
            created_at: now,
            version: 0,
        };
        self.insert(&asset).await?;
        Ok(asset)
    }
}

#[derive(Clone)]
pub struct AlertRepository {
    storage: Arc<dyn Storage>,
}

impl AlertRepository {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    pub async fn insert(&self, alert: &Alert) -> Result<()> {
        self.storage
            .insert_one(ALERTS, alert.id.0, serde_json::to_value(alert)?)
            .await
    }

    pub async fn get_by_id(&self, tenant_id: TenantId, id: AlertId) -> Result<Option<Alert>> {
        let doc = self
            .storage
            .find_one(
                ALERTS,
                &[
                    FieldFilter::tenant(tenant_id),
                    FieldFilter::eq("id", id.0.to_string()),
                ],
            )
            .await?;
        doc.map(|v| serde_json::from_value(v).map_err(Error::from))
            .transpose()
    }

    /// Uncorrelated alerts within the correlation window, newest first —
    /// the correlation engine's input set (§4.F step 1).
    pub async fn find_uncorrelated_since(
        &self,
        tenant_id: TenantId,
        since: i64,
    ) -> Result<Vec<Alert>> {
        let docs = self
            .storage
            .find(
                ALERTS,
                &[
                    FieldFilter::tenant(tenant_id),
                    FieldFilter::eq("correlated", false),
                    FieldFilter::gte("timestamp", since),
                ],
                Some(Sort::desc("timestamp")),
                None,
            )
            .await?;
        docs.into_iter()
            .map(|v| serde_json::from_value(v).map_err(Error::from))
            .collect()
    }

    /// Count of alerts for the tenant in `[since, until]`, regardless of
    /// correlation state — the metrics aggregator's alert total (§4.M).
    pub async fn count_between(&self, tenant_id: TenantId, since: i64, until: i64) -> Result<usize> {
        self.storage
            .count(
                ALERTS,
                &[
                    FieldFilter::tenant(tenant_id),
                    FieldFilter::gte("timestamp", since),
                    FieldFilter::lte("timestamp", until),
                ],
            )
            .await
    }

    pub async fn mark_correlated(
        &self,
        tenant_id: TenantId,
        id: AlertId,
        incident_id: sentry_core::IncidentId,
    ) -> Result<()> {
        self.storage
            .update_one(
                ALERTS,
                &[
                    FieldFilter::tenant(tenant_id),
                    FieldFilter::eq("id", id.0.to_string()),
                ],
                serde_json::json!({ "correlated": true, "incident_id": incident_id }),
            )
            .await?;
        Ok(())
    }
}
