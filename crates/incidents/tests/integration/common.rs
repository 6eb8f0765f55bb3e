use sentry_auth::{AuthRepository, User};
use sentry_core::storage::InMemoryStorage;
use sentry_core::{
    AuditLogger, EventBus, Permission, Role, Storage, TenantId, UserId,
};
use sentry_ingest::{Alert, AlertRepository};
use sentry_incidents::{Assigner, Correlator, IncidentRepository, MetricsAggregator, SignatureStatsRepository};
use std::collections::HashSet;
use std::sync::Arc;

pub struct TestContext {
    pub storage: Arc<dyn Storage>,
    pub alerts: AlertRepository,
    pub incidents: IncidentRepository,
    pub users: AuthRepository,
    pub signature_stats: SignatureStatsRepository,
    pub correlator: Correlator,
    pub assigner: Assigner,
    pub metrics: MetricsAggregator,
}

impl TestContext {
    pub fn new() -> Self {
        let storage: Arc<dyn Storage> = Arc::new(InMemoryStorage::new());
        let alerts = AlertRepository::new(storage.clone());
        let incidents = IncidentRepository::new(storage.clone());
        let users = AuthRepository::new(storage.clone());
        let signature_stats = SignatureStatsRepository::new(storage.clone());
        let event_bus = Arc::new(EventBus::new());
        let audit = Arc::new(AuditLogger::new(storage.clone()));

        let correlator = Correlator::new(
            incidents.clone(),
            alerts.clone(),
            event_bus.clone(),
            audit.clone(),
        );
        let assigner = Assigner::new(
            incidents.clone(),
            users.clone(),
            signature_stats.clone(),
            event_bus.clone(),
            audit.clone(),
        );
        let metrics = MetricsAggregator::new(incidents.clone(), alerts.clone());

        Self {
            storage,
            alerts,
            incidents,
            users,
            signature_stats,
            correlator,
            assigner,
            metrics,
        }
    }

    pub async fn seed_alert(
        &self,
        tenant_id: TenantId,
        asset_name: &str,
        signature: &str,
        severity: sentry_core::AlertSeverity,
        tool_source: &str,
        timestamp: i64,
    ) -> Alert {
        let alert = Alert {
            id: sentry_core::AlertId::new(),
            tenant_id,
            asset_name: asset_name.to_string(),
            signature: signature.to_string(),
            severity,
            message: "synthetic alert".to_string(),
            tool_source: tool_source.to_string(),
            timestamp,
            delivery_id: uuid::Uuid::new_v4().to_string(),
            delivery_attempts: 1,
            correlated: false,
            incident_id: None,
            metadata: None,
        };
        self.alerts.insert(&alert).await.expect("alert insert should succeed");
        alert
    }

    pub async fn seed_technician(
        &self,
        tenant_id: TenantId,
        expertise: &[&str],
        on_shift: bool,
        avg_resolution_min: Option<f64>,
    ) -> UserId {
        let user = User {
            id: UserId::new(),
            tenant_id: Some(tenant_id),
            email: format!("{}@acme.msp", uuid::Uuid::new_v4()),
            password_hash: "unused-in-these-tests".to_string(),
            role: Role::Technician,
            permissions: HashSet::<Permission>::new(),
            is_active: true,
            created_at: 0,
            updated_at: 0,
            last_login_at: Some(0),
            expertise: expertise.iter().map(|s| s.to_string()).collect(),
            on_shift,
            avg_resolution_min,
            version: 0,
        };
        self.users.insert_user(&user).await.expect("user insert should succeed");
        user.id
    }
}
