use crate::models::{Incident, TechnicianSignatureStat};
use sentry_core::storage::{FieldFilter, Filter, Sort, Storage};
use sentry_core::{AggregationKeyKind, Error, IncidentId, IncidentStatus, Result, TenantId, UserId};
use std::sync::Arc;
use uuid::Uuid;

const INCIDENTS: &str = "incidents";
const TECHNICIAN_SIGNATURE_STATS: &str = "technician_signature_stats";

/// Every status `IncidentStatus::is_open` reports `true` for, as JSON —
/// used to scope the correlator's and assigner's reads to open incidents.
fn open_statuses() -> Vec<serde_json::Value> {
    [
        IncidentStatus::New,
        IncidentStatus::InProgress,
        IncidentStatus::PendingApproval,
        IncidentStatus::Remediating,
        IncidentStatus::Escalated,
    ]
    .into_iter()
    .map(|s| serde_json::to_value(s).expect("IncidentStatus always serializes"))
    .collect()
}

#[derive(Clone)]
pub struct IncidentRepository {
    storage: Arc<dyn Storage>,
}

impl IncidentRepository {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    pub async fn insert(&self, incident: &Incident) -> Result<()> {
        self.storage
            .insert_one(INCIDENTS, incident.id.0, serde_json::to_value(incident)?)
            .await
    }

    pub async fn get_by_id(&self, tenant_id: TenantId, id: IncidentId) -> Result<Option<Incident>> {
        let doc = self
            .storage
            .find_one(
                INCIDENTS,
                &[
                    FieldFilter::tenant(tenant_id),
                    FieldFilter::eq("id", id.0.to_string()),
                ],
            )
            .await?;
        doc.map(|v| serde_json::from_value(v).map_err(Error::from))
            .transpose()
    }

    /// Open incidents created at or after `since`, newest first — the
    /// correlation engine's candidate set for "find or extend" (§4.F step
    /// 3a). The aggregation key match happens in-process in the caller,
    /// since `AggregationKeyKind` can collapse more than one asset or
    /// signature into the same group and the facade only compares single
    /// fields.
    pub async fn find_open_since(&self, tenant_id: TenantId, since: i64) -> Result<Vec<Incident>> {
        let docs = self
            .storage
            .find(
                INCIDENTS,
                &[
                    FieldFilter::tenant(tenant_id),
                    FieldFilter {
                        field: "status".to_string(),
                        filter: Filter::In(open_statuses()),
                    },
                    FieldFilter::gte("created_at", since),
                ],
                Some(Sort::desc("created_at")),
                None,
            )
            .await?;
        docs.into_iter()
            .map(|v| serde_json::from_value(v).map_err(Error::from))
            .collect()
    }

    /// Finds the open incident (within the window) whose representative
    /// asset/signature/tool recompute to the same aggregation key as the
    /// given alert, per `kind`. `None` means the group needs a new incident.
    pub async fn find_open_by_key(
        &self,
        tenant_id: TenantId,
        kind: AggregationKeyKind,
        since: i64,
        asset_name: &str,
        signature: &str,
        tool_source: &str,
    ) -> Result<Option<Incident>> {
        let key = kind.compute(asset_name, signature, tool_source);
        let candidates = self.find_open_since(tenant_id, since).await?;
        Ok(candidates.into_iter().find(|incident| {
            let incident_tool = incident
                .tool_sources
                .iter()
                .next()
                .map(String::as_str)
                .unwrap_or("");
            kind.compute(&incident.asset_name, &incident.signature, incident_tool) == key
        }))
    }

    /// Number of open incidents currently assigned to a technician — the
    /// assignment scorer's `active_incident_count` term (§4.G).
    pub async fn count_open_assigned(&self, tenant_id: TenantId, user_id: UserId) -> Result<usize> {
        self.storage
            .count(
                INCIDENTS,
                &[
                    FieldFilter::tenant(tenant_id),
                    FieldFilter::eq("assigned_to", user_id.0.to_string()),
                    FieldFilter {
                        field: "status".to_string(),
                        filter: Filter::In(open_statuses()),
                    },
                ],
            )
            .await
    }

    /// All incidents for the tenant in `[since, until)`, any status — the
    /// metrics aggregator's input set (§4.M).
    pub async fn find_created_between(
        &self,
        tenant_id: TenantId,
        since: i64,
        until: i64,
    ) -> Result<Vec<Incident>> {
        let docs = self
            .storage
            .find(
                INCIDENTS,
                &[
                    FieldFilter::tenant(tenant_id),
                    FieldFilter::gte("created_at", since),
                    FieldFilter::lte("created_at", until),
                ],
                None,
                None,
            )
            .await?;
        docs.into_iter()
            .map(|v| serde_json::from_value(v).map_err(Error::from))
            .collect()
    }

    /// Applies a merge patch to an incident, guarded by its current
    /// `version` — the optimistic-concurrency path every status/priority/
    /// assignment transition goes through.
    pub async fn update(
        &self,
        tenant_id: TenantId,
        id: IncidentId,
        expected_version: u32,
        mut patch: serde_json::Value,
    ) -> Result<bool> {
        if let Some(obj) = patch.as_object_mut() {
            obj.insert("version".to_string(), serde_json::json!(expected_version + 1));
        }
        self.storage
            .compare_and_set(
                INCIDENTS,
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

/// Backs the assignment scorer's "has this technician handled this
/// signature before" lookup (§4.G `expertise_match`).
#[derive(Clone)]
pub struct SignatureStatsRepository {
    storage: Arc<dyn Storage>,
}

impl SignatureStatsRepository {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    pub async fn has_handled(&self, tenant_id: TenantId, user_id: UserId, signature: &str) -> Result<bool> {
        let doc = self
            .storage
            .find_one(
                TECHNICIAN_SIGNATURE_STATS,
                &[
                    FieldFilter::tenant(tenant_id),
                    FieldFilter::eq("user_id", user_id.0.to_string()),
                    FieldFilter::eq("signature", signature.to_string()),
                ],
            )
            .await?;
        Ok(doc.is_some())
    }

    /// Records that `user_id` handled `signature`, upserting the row's
    /// counter. Called once per auto-resolved incident, from the
    /// remediation dispatcher.
    pub async fn record_handled(
        &self,
        tenant_id: TenantId,
        user_id: UserId,
        signature: &str,
        now: i64,
    ) -> Result<()> {
        let filters = [
            FieldFilter::tenant(tenant_id),
            FieldFilter::eq("user_id", user_id.0.to_string()),
            FieldFilter::eq("signature", signature.to_string()),
        ];
        let existing = self.storage.find_one(TECHNICIAN_SIGNATURE_STATS, &filters).await?;
        match existing {
            Some(doc) => {
                let stat: TechnicianSignatureStat = serde_json::from_value(doc)?;
                self.storage
                    .update_one(
                        TECHNICIAN_SIGNATURE_STATS,
                        &filters,
                        serde_json::json!({
                            "handled_count": stat.handled_count + 1,
                            "last_handled_at": now,
                        }),
                    )
                    .await?;
            }
            None => {
                let stat = TechnicianSignatureStat {
                    tenant_id,
                    user_id,
                    signature: signature.to_string(),
                    handled_count: 1,
                    last_handled_at: now,
                };
                self.storage
                    .insert_one(TECHNICIAN_SIGNATURE_STATS, Uuid::new_v4(), serde_json::to_value(&stat)?)
                    .await?;
            }
        }
        Ok(())
    }
}
