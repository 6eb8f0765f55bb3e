use sentry_auth::{AuthRepository, AuthService};
use sentry_core::security::JwtService;
use sentry_core::storage::Storage;
use sentry_core::{AuditLogger, Config, EventBus, TenantRepository};
use sentry_incidents::{Assigner, Correlator, IncidentRepository, MetricsAggregator};
use sentry_ingest::{AlertRepository, AssetRepository, IngestService};
use sentry_remediation::{
    ApprovalRepository, ApprovalWorkflow, Dispatcher, NotificationService,
    RemediationExecutionRepository, RunbookRepository, SlaMonitor,
};
use std::sync::Arc;

/// Everything a handler or background worker needs, wired once in
/// `main.rs` and shared behind `Arc`s so cloning `AppState` per request is
/// cheap — the same shape as the teacher's `AppState`, with the
/// Postgres/Redis-backed services replaced by the `Storage`-backed
/// components every other workspace crate is built against.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub storage: Arc<dyn Storage>,
    pub event_bus: Arc<EventBus>,
    pub audit: Arc<AuditLogger>,
    pub jwt: Arc<JwtService>,

    pub auth_service: Arc<AuthService>,
    pub auth_repository: AuthRepository,
    pub tenants: TenantRepository,

    pub ingest_service: Arc<IngestService>,
    pub assets: AssetRepository,
    pub alerts: AlertRepository,

    pub incidents: IncidentRepository,
    pub correlator: Arc<Correlator>,
    pub assigner: Arc<Assigner>,
    pub metrics_aggregator: Arc<MetricsAggregator>,

    pub runbooks: RunbookRepository,
    pub approvals: ApprovalRepository,
    pub executions: RemediationExecutionRepository,
    pub notifications: NotificationService,
    pub dispatcher: Arc<Dispatcher>,
    pub approval_workflow: Arc<ApprovalWorkflow>,
    pub sla_monitor: Arc<SlaMonitor>,
}
