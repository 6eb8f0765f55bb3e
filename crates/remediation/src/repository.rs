use crate::models::{ApprovalRequest, RemediationExecution, Runbook};
use sentry_core::storage::{FieldFilter, Storage};
use sentry_core::{ApprovalRequestId, Error, RemediationExecutionId, Result, RunbookId, TenantId};
use std::sync::Arc;

const RUNBOOKS: &str = "runbooks";
const APPROVAL_REQUESTS: &str = "approval_requests";
const REMEDIATION_EXECUTIONS: &str = "remediation_executions";

#[derive(Clone)]
pub struct RunbookRepository {
    storage: Arc<dyn Storage>,
}

impl RunbookRepository {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    pub async fn insert(&self, runbook: &Runbook) -> Result<()> {
        self.storage
            .insert_one(RUNBOOKS, runbook.id.0, serde_json::to_value(runbook)?)
            .await
    }

    pub async fn get_by_id(&self, tenant_id: TenantId, id: RunbookId) -> Result<Option<Runbook>> {
        let doc = self
            .storage
            .find_one(
                RUNBOOKS,
                &[
                    FieldFilter::tenant(tenant_id),
                    FieldFilter::eq("id", id.0.to_string()),
                ],
            )
            .await?;
        doc.map(|v| serde_json::from_value(v).map_err(Error::from))
            .transpose()
    }
}

#[derive(Clone)]
pub struct ApprovalRepository {
    storage: Arc<dyn Storage>,
}

impl ApprovalRepository {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    pub async fn insert(&self, request: &ApprovalRequest) -> Result<()> {
        self.storage
            .insert_one(APPROVAL_REQUESTS, request.id.0, serde_json::to_value(request)?)
            .await
    }

    pub async fn get_by_id(
        &self,
        tenant_id: TenantId,
        id: ApprovalRequestId,
    ) -> Result<Option<ApprovalRequest>> {
        let doc = self
            .storage
            .find_one(
                APPROVAL_REQUESTS,
                &[
                    FieldFilter::tenant(tenant_id),
                    FieldFilter::eq("id", id.0.to_string()),
                ],
            )
            .await?;
        doc.map(|v| serde_json::from_value(v).map_err(Error::from))
            .transpose()
    }

    /// Atomic compare-and-set on `status`, per §4.I: "first write wins,
    /// others see a conflict".
    pub async fn transition(
        &self,
        tenant_id: TenantId,
        id: ApprovalRequestId,
        expected_version: u32,
        patch: serde_json::Value,
    ) -> Result<bool> {
        let mut patch = patch;
        if let Some(obj) = patch.as_object_mut() {
            obj.insert("version".to_string(), serde_json::json!(expected_version + 1));
        }
        self.storage
            .compare_and_set(
                APPROVAL_REQUESTS,
                id.0,
                &[
                    FieldFilter::tenant(tenant_id),
                    FieldFilter::eq("version", expected_version),
                ],
                patch,
            )
            .await
    }
}

#[derive(Clone)]
pub struct RemediationExecutionRepository {
    storage: Arc<dyn Storage>,
}

impl RemediationExecutionRepository {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    pub async fn insert(&self, execution: &RemediationExecution) -> Result<()> {
        self.storage
            .insert_one(
                REMEDIATION_EXECUTIONS,
                execution.id.0,
                serde_json::to_value(execution)?,
            )
            .await
    }

    pub async fn update(
        &self,
        tenant_id: TenantId,
        id: RemediationExecutionId,
        patch: serde_json::Value,
    ) -> Result<()> {
        self.storage
            .update_one(
                REMEDIATION_EXECUTIONS,
                &[
                    FieldFilter::tenant(tenant_id),
                    FieldFilter::eq("id", id.0.to_string()),
                ],
                patch,
            )
            .await?;
        Ok(())
    }
}
