//! Idempotency guard (§4.C): 24 h dedup of inbound alerts by delivery id.

use crate::error::Result;
use crate::storage::{FieldFilter, Storage};
use crate::types::TenantId;
use chrono::Utc;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use uuid::Uuid;

const ALERTS_COLLECTION: &str = "alerts";
const DEDUP_WINDOW_SECONDS: i64 = 24 * 60 * 60;

pub struct IdempotencyGuard {
    storage: Arc<dyn Storage>,
}

#[derive(Debug, Clone)]
pub struct DedupOutcome {
    pub duplicate: bool,
    pub alert_id: Option<Uuid>,
}

impl IdempotencyGuard {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// Derives a delivery id when the caller didn't supply one.
    pub fn derive_delivery_id(
        tenant_id: TenantId,
        asset_name: &str,
        signature: &str,
        message: &str,
        body: &str,
    ) -> String {
        let mut hasher = Sha256::new();
        hasher.update(tenant_id.0.to_string().as_bytes());
        hasher.update(b"\xe2\x80\x96"); // U+2016 DOUBLE VERTICAL LINE separator
        hasher.update(asset_name.as_bytes());
        hasher.update(b"\xe2\x80\x96");
        hasher.update(signature.as_bytes());
        hasher.update(b"\xe2\x80\x96");
        hasher.update(message.as_bytes());
        hasher.update(b"\xe2\x80\x96");
        hasher.update(body.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Looks up alerts within the last 24h for `tenant_id`/`delivery_id`. If
    /// a match exists, `delivery_attempts` is incremented in place.
    pub async fn check_and_record(
        &self,
        tenant_id: TenantId,
        delivery_id: &str,
    ) -> Result<DedupOutcome> {
        let cutoff = Utc::now().timestamp() - DEDUP_WINDOW_SECONDS;
        let filters = [
            FieldFilter::tenant(tenant_id),
            FieldFilter::eq("delivery_id", delivery_id),
            FieldFilter::gte("timestamp", cutoff),
        ];

        let existing = self.storage.find_one(ALERTS_COLLECTION, &filters).await?;
        match existing {
            Some(doc) => {
                let alert_id = doc
                    .get("id")
                    .and_then(|v| v.as_str())
                    .and_then(|s| s.parse::<Uuid>().ok());
                let attempts = doc
                    .get("delivery_attempts")
                    .and_then(|v| v.as_u64())
                    .unwrap_or(1);

                if let Some(id) = alert_id {
                    self.storage
                        .update_one(
                            ALERTS_COLLECTION,
                            &[FieldFilter::tenant(tenant_id), FieldFilter::eq("id", id.to_string())],
                            serde_json::json!({ "delivery_attempts": attempts + 1 }),
                        )
                        .await?;
                }

                Ok(DedupOutcome {
                    duplicate: true,
                    alert_id,
                })
            }
            None => Ok(DedupOutcome {
                duplicate: false,
                alert_id: None,
            }),
        }
    }
}
