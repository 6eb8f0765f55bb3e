//! Per-tenant sliding-window rate limiter (§4.B).
//!
//! State is a monotonic counter keyed by `(tenant_id, window_start_second)`
//! persisted through the storage facade so the limiter is safe for
//! concurrent callers across the process, not just within one task.

use crate::error::Result;
use crate::storage::{FieldFilter, Storage};
use crate::types::TenantId;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

const COLLECTION: &str = "rate_limit_windows";
const WINDOW_SECONDS: i64 = 60;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RateLimitWindow {
    id: Uuid,
    tenant_id: Uuid,
    window_start_second: i64,
    count: u64,
    expires_at: i64,
}

#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    pub requests_per_minute: u32,
    pub burst_size: u32,
    pub enabled: bool,
}

#[derive(Debug, Clone)]
pub struct RateLimitDecision {
    pub admitted: bool,
    pub limit: u32,
    pub burst: u32,
    pub remaining: u32,
    pub retry_after_seconds: u64,
}

pub struct RateLimiter {
    storage: Arc<dyn Storage>,
}

impl RateLimiter {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// Admits or rejects one request for `tenant_id` under `config`.
    pub async fn admit(
        &self,
        tenant_id: TenantId,
        config: RateLimitConfig,
    ) -> Result<RateLimitDecision> {
        if !config.enabled {
            return Ok(RateLimitDecision {
                admitted: true,
                limit: config.requests_per_minute,
                burst: config.burst_size,
                remaining: config.burst_size,
                retry_after_seconds: 0,
            });
        }

        let now = Utc::now().timestamp();
        let window_start_second = now - (now % WINDOW_SECONDS);

        let filters = [
            FieldFilter::tenant(tenant_id),
            FieldFilter::eq("window_start_second", window_start_second),
        ];

        let existing = self.storage.find_one(COLLECTION, &filters).await?;
        let current_count = existing
            .as_ref()
            .and_then(|doc| doc.get("count"))
            .and_then(|v| v.as_u64())
            .unwrap_or(0);

        if current_count >= config.burst_size as u64 {
            let retry_after = (window_start_second + WINDOW_SECONDS - now).max(1) as u64;
            return Ok(RateLimitDecision {
                admitted: false,
                limit: config.requests_per_minute,
                burst: config.burst_size,
                remaining: 0,
                retry_after_seconds: retry_after,
            });
        }

        match existing {
            Some(doc) => {
                let id = doc
                    .get("id")
                    .and_then(|v| v.as_str())
                    .and_then(|s| s.parse::<Uuid>().ok())
                    .unwrap_or_else(Uuid::new_v4);
                self.storage
                    .update_one(
                        COLLECTION,
                        &[FieldFilter::tenant(tenant_id), FieldFilter::eq("id", id.to_string())],
                        json!({ "count": current_count + 1 }),
                    )
                    .await?;
            }
            None => {
                let window = RateLimitWindow {
                    id: Uuid::new_v4(),
                    tenant_id: tenant_id.0,
                    window_start_second,
                    count: 1,
                    expires_at: window_start_second + WINDOW_SECONDS * 2,
                };
                self.storage
                    .insert_one(COLLECTION, window.id, serde_json::to_value(&window)?)
                    .await?;
            }
        }

        let remaining = config.burst_size.saturating_sub(current_count as u32 + 1);
        Ok(RateLimitDecision {
            admitted: true,
            limit: config.requests_per_minute,
            burst: config.burst_size,
            remaining,
            retry_after_seconds: 0,
        })
    }
}
