//! Audit logging backed by the storage facade.
//!
//! Every non-read mutation must produce exactly one `AuditLog` row. Writes
//! are retried up to 3 times; on persistent failure the entry is held in a
//! local dead-letter buffer and retried opportunistically on the next
//! successful write, rather than being dropped.

use crate::error::Result;
use crate::storage::Storage;
use crate::types::{AuditLog, AuditStatus, TenantId, UserId};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;

const AUDIT_COLLECTION: &str = "audit_logs";
const MAX_WRITE_ATTEMPTS: u32 = 3;

pub struct AuditLogger {
    storage: Arc<dyn Storage>,
    dead_letters: Mutex<VecDeque<AuditLog>>,
}

impl AuditLogger {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self {
            storage,
            dead_letters: Mutex::new(VecDeque::new()),
        }
    }

    pub fn entry(
        tenant_id: TenantId,
        actor_id: Option<UserId>,
        action: impl Into<String>,
        target_type: impl Into<String>,
        target_id: Option<Uuid>,
        status: AuditStatus,
        details: Option<serde_json::Value>,
    ) -> AuditLog {
        AuditLog {
            id: Uuid::new_v4(),
            tenant_id,
            actor_id,
            action: action.into(),
            target_type: target_type.into(),
            target_id,
            status,
            details,
            timestamp: chrono::Utc::now(),
        }
    }

    /// Persists one audit entry, logging and buffering on failure rather
    /// than propagating the error — audit writes never block the caller's
    /// own mutation from succeeding.
    pub async fn log(&self, entry: AuditLog) {
        self.drain_dead_letters().await;

        if let Err(e) = self.write_with_retry(&entry).await {
            tracing::error!(
                action = %entry.action,
                tenant_id = %entry.tenant_id,
                error = %e,
                "audit log write failed after retries, buffering to dead-letter queue"
            );
            self.dead_letters
                .lock()
                .expect("dead letter queue poisoned")
                .push_back(entry);
        }
    }

    async fn write_with_retry(&self, entry: &AuditLog) -> Result<()> {
        let doc = serde_json::to_value(entry)?;
        let mut attempt = 0;
        loop {
            match self
                .storage
                .insert_one(AUDIT_COLLECTION, entry.id, doc.clone())
                .await
            {
                Ok(()) => return Ok(()),
                Err(e) if attempt + 1 < MAX_WRITE_ATTEMPTS => {
                    attempt += 1;
                    tokio::time::sleep(Duration::from_millis(100 * attempt as u64)).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn drain_dead_letters(&self) {
        let pending: Vec<AuditLog> = {
            let mut buffer = self.dead_letters.lock().expect("dead letter queue poisoned");
            buffer.drain(..).collect()
        };

        for entry in pending {
            if self.write_with_retry(&entry).await.is_err() {
                self.dead_letters
                    .lock()
                    .expect("dead letter queue poisoned")
                    .push_back(entry);
            }
        }
    }

    pub fn pending_dead_letters(&self) -> usize {
        self.dead_letters
            .lock()
            .expect("dead letter queue poisoned")
            .len()
    }
}
