use async_trait::async_trait;
use sentry_auth::{AuthRepository, User};
use sentry_core::storage::InMemoryStorage;
use sentry_core::{
    AlertSeverity, AuditLogger, Error, EventBus, IncidentId, Permission, Resolution, Result,
    RiskLevel, Role, RunbookId, Storage, TenantId, UserId,
};
use sentry_incidents::{Incident, IncidentRepository, SignatureStatsRepository};
use sentry_remediation::{
    ApprovalRepository, ApprovalWorkflow, Dispatcher, Executor, ExecutorStatusReport,
    NotificationService, RemediationExecutionRepository, Runbook, RunbookRepository, SlaMonitor,
};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

/// A scripted `Executor`: each submission is assigned a `command_id` that
/// always reports a pre-seeded terminal status on its first `status` poll,
/// or never resolves at all (for exercising the poll timeout path in unit
/// tests that shrink the wall clock, not here).
#[derive(Clone)]
pub struct ScriptedExecutor {
    next_status: Arc<Mutex<HashMap<String, ExecutorStatusReport>>>,
    submissions: Arc<Mutex<Vec<String>>>,
}

impl ScriptedExecutor {
    pub fn new() -> Self {
        Self {
            next_status: Arc::new(Mutex::new(HashMap::new())),
            submissions: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn seed_result(&self, command_id: &str, report: ExecutorStatusReport) {
        self.next_status
            .lock()
            .unwrap()
            .insert(command_id.to_string(), report);
    }

    pub fn submission_count(&self) -> usize {
        self.submissions.lock().unwrap().len()
    }
}

#[async_trait]
impl Executor for ScriptedExecutor {
    async fn execute(&self, _commands: &[String], _instance_ids: &[String], _timeout_seconds: u64) -> Result<String> {
        let command_id = format!("cmd-{}", self.submissions.lock().unwrap().len());
        self.submissions.lock().unwrap().push(command_id.clone());
        Ok(command_id)
    }

    async fn status(&self, command_id: &str) -> Result<ExecutorStatusReport> {
        self.next_status
            .lock()
            .unwrap()
            .get(command_id)
            .cloned()
            .ok_or_else(|| Error::not_found("no scripted status for command"))
    }
}

pub struct TestContext {
    pub storage: Arc<dyn Storage>,
    pub incidents: IncidentRepository,
    pub users: AuthRepository,
    pub runbooks: RunbookRepository,
    pub approvals: ApprovalRepository,
    pub executions: RemediationExecutionRepository,
    pub signature_stats: SignatureStatsRepository,
    pub notifications: NotificationService,
    pub executor: ScriptedExecutor,
    pub dispatcher: Dispatcher,
    pub approval_workflow: ApprovalWorkflow,
    pub sla_monitor: SlaMonitor,
}

impl TestContext {
    pub fn new() -> Self {
        let storage: Arc<dyn Storage> = Arc::new(InMemoryStorage::new());
        let incidents = IncidentRepository::new(storage.clone());
        let users = AuthRepository::new(storage.clone());
        let runbooks = RunbookRepository::new(storage.clone());
        let approvals = ApprovalRepository::new(storage.clone());
        let executions = RemediationExecutionRepository::new(storage.clone());
        let signature_stats = SignatureStatsRepository::new(storage.clone());
        let event_bus = Arc::new(EventBus::new());
        let audit = Arc::new(AuditLogger::new(storage.clone()));
        let notifications = NotificationService::new(storage.clone(), users.clone(), None);
        let executor = ScriptedExecutor::new();

        let dispatcher = Dispatcher::new(
            runbooks.clone(),
            approvals.clone(),
            executions.clone(),
            incidents.clone(),
            signature_stats.clone(),
            notifications.clone(),
            Arc::new(executor.clone()),
            event_bus.clone(),
            audit.clone(),
        );
        let approval_workflow = ApprovalWorkflow::new(
            approvals.clone(),
            incidents.clone(),
            notifications.clone(),
            audit.clone(),
        );
        let sla_monitor = SlaMonitor::new(incidents.clone(), notifications.clone(), audit.clone());

        Self {
            storage,
            incidents,
            users,
            runbooks,
            approvals,
            executions,
            signature_stats,
            notifications,
            executor,
            dispatcher,
            approval_workflow,
            sla_monitor,
        }
    }

    pub async fn seed_incident(
        &self,
        tenant_id: TenantId,
        signature: &str,
        severity: AlertSeverity,
        created_at: i64,
        sla_deadline: Option<i64>,
        assigned_to: Option<UserId>,
    ) -> Incident {
        let incident = Incident {
            id: IncidentId::new(),
            tenant_id,
            signature: signature.to_string(),
            asset_name: "web-01".to_string(),
            alert_ids: HashSet::new(),
            alert_count: 1,
            priority_score: 50,
            severity,
            tool_sources: HashSet::new(),
            status: sentry_core::IncidentStatus::InProgress,
            assigned_to,
            assigned_at: assigned_to.map(|_| created_at),
            created_at,
            resolved_at: None,
            resolution: Resolution::Unresolved,
            runbook_execution: None,
            sla_deadline,
            escalated_to: None,
            escalation_level: 0,
            version: 0,
        };
        self.incidents.insert(&incident).await.expect("incident insert should succeed");
        incident
    }

    pub async fn seed_runbook(
        &self,
        tenant_id: TenantId,
        signature: &str,
        risk: RiskLevel,
        auto_approve: bool,
    ) -> Runbook {
        let runbook = Runbook {
            id: RunbookId::new(),
            tenant_id,
            name: "restart-service".to_string(),
            signature: signature.to_string(),
            risk,
            auto_approve,
            actions: vec!["systemctl restart app".to_string()],
            health_checks: Vec::new(),
            created_at: 0,
            version: 0,
        };
        self.runbooks.insert(&runbook).await.expect("runbook insert should succeed");
        runbook
    }

    pub async fn seed_runbook_with_health_checks(
        &self,
        tenant_id: TenantId,
        signature: &str,
        risk: RiskLevel,
        auto_approve: bool,
        health_checks: Vec<String>,
    ) -> Runbook {
        let runbook = Runbook {
            id: RunbookId::new(),
            tenant_id,
            name: "restart-service".to_string(),
            signature: signature.to_string(),
            risk,
            auto_approve,
            actions: vec!["systemctl restart app".to_string()],
            health_checks,
            created_at: 0,
            version: 0,
        };
        self.runbooks.insert(&runbook).await.expect("runbook insert should succeed");
        runbook
    }

    pub async fn seed_user(&self, tenant_id: TenantId, role: Role) -> UserId {
        let user = User {
            id: UserId::new(),
            tenant_id: if role.is_global() { None } else { Some(tenant_id) },
            email: format!("{}@acme.msp", uuid::Uuid::new_v4()),
            password_hash: "unused-in-these-tests".to_string(),
            role,
            permissions: HashSet::<Permission>::new(),
            is_active: true,
            created_at: 0,
            updated_at: 0,
            last_login_at: Some(0),
            expertise: HashSet::new(),
            on_shift: true,
            avg_resolution_min: None,
            version: 0,
        };
        self.users.insert_user(&user).await.expect("user insert should succeed");
        user.id
    }
}
