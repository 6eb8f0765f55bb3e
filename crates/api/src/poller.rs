//! Spawns the background task that drives an in-flight remediation
//! execution to completion, shared by the handler that starts a
//! low-risk runbook directly and the one that resumes an approved one.

use sentry_core::storage::FieldFilter;
use sentry_core::{IncidentId, RemediationExecutionId, TenantId};

use crate::state::AppState;

pub fn spawn_poller(
    state: AppState,
    tenant_id: TenantId,
    incident_id: IncidentId,
    execution_id: RemediationExecutionId,
) {
    tokio::spawn(async move {
        let Ok(docs) = state
            .storage
            .find(
                "remediation_executions",
                &[
                    FieldFilter::tenant(tenant_id),
                    FieldFilter::eq("id", execution_id.0.to_string()),
                ],
                None,
                None,
            )
            .await
        else {
            return;
        };
        let Some(execution) = docs
            .into_iter()
            .next()
            .and_then(|doc| serde_json::from_value::<sentry_remediation::RemediationExecution>(doc).ok())
        else {
            return;
        };
        let assigned_to = state
            .incidents
            .get_by_id(tenant_id, incident_id)
            .await
            .ok()
            .flatten()
            .and_then(|incident| incident.assigned_to);

        if let Err(e) = state
            .dispatcher
            .poll_to_completion(tenant_id, incident_id, assigned_to, execution)
            .await
        {
            tracing::warn!(%tenant_id, %incident_id, "remediation poll failed: {}", e);
        }
    });
}
