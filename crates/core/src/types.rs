use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

// Axum integration for RequestContext
#[cfg(feature = "axum")]
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    response::Json,
};

macro_rules! uuid_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

uuid_newtype!(TenantId);

impl TenantId {
    /// Sentinel tenant id for audit entries produced by a global-role
    /// actor (`system_admin`/`msp_admin`) acting outside any one tenant's
    /// scope. `AuditLog.tenant_id` has no room for "none" in spec §3.
    pub fn platform() -> Self {
        Self(Uuid::nil())
    }
}

uuid_newtype!(UserId);
uuid_newtype!(RoleId);
uuid_newtype!(PermissionId);
uuid_newtype!(AssetId);
uuid_newtype!(AlertId);
uuid_newtype!(IncidentId);
uuid_newtype!(RunbookId);
uuid_newtype!(ApprovalRequestId);
uuid_newtype!(RemediationExecutionId);
uuid_newtype!(NotificationId);
uuid_newtype!(RefreshTokenId);

/// `system_admin`/`msp_admin` are treated as one role per the platform's
/// role-collapsing decision; tenant scope match is waived for both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    SystemAdmin,
    MspAdmin,
    TenantAdmin,
    Technician,
}

impl Role {
    pub fn at_least(&self, other: Role) -> bool {
        self.rank() >= other.rank()
    }

    fn rank(&self) -> u8 {
        match self {
            Role::Technician => 0,
            Role::TenantAdmin => 1,
            Role::MspAdmin => 2,
            Role::SystemAdmin => 2,
        }
    }

    pub fn is_global(&self) -> bool {
        matches!(self, Role::SystemAdmin | Role::MspAdmin)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Role::SystemAdmin => "system_admin",
            Role::MspAdmin => "msp_admin",
            Role::TenantAdmin => "tenant_admin",
            Role::Technician => "technician",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl AlertSeverity {
    /// Severity base used by the correlation engine's priority formula.
    pub fn base_score(&self) -> i32 {
        match self {
            AlertSeverity::Critical => 90,
            AlertSeverity::High => 60,
            AlertSeverity::Medium => 30,
            AlertSeverity::Low => 10,
        }
    }

    /// Fixed table mapping free-form input to a severity; unknown values
    /// default to medium.
    pub fn from_free_form(input: &str) -> Self {
        match input.trim().to_lowercase().as_str() {
            "critical" | "sev1" | "p1" | "emergency" => AlertSeverity::Critical,
            "high" | "sev2" | "p2" | "major" => AlertSeverity::High,
            "medium" | "sev3" | "p3" | "warning" | "warn" => AlertSeverity::Medium,
            "low" | "sev4" | "p4" | "info" | "informational" => AlertSeverity::Low,
            _ => AlertSeverity::Medium,
        }
    }
}

impl std::fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AlertSeverity::Critical => "critical",
            AlertSeverity::High => "high",
            AlertSeverity::Medium => "medium",
            AlertSeverity::Low => "low",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncidentStatus {
    New,
    InProgress,
    PendingApproval,
    Remediating,
    Resolved,
    Escalated,
}

impl IncidentStatus {
    /// Statuses the correlation engine treats as open for grouping purposes.
    pub fn is_open(&self) -> bool {
        matches!(
            self,
            IncidentStatus::New
                | IncidentStatus::InProgress
                | IncidentStatus::PendingApproval
                | IncidentStatus::Remediating
                | IncidentStatus::Escalated
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    Manual,
    Auto,
    Unresolved,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// Minimum role permitted to execute a runbook at this risk level.
    pub fn minimum_role(&self) -> Role {
        match self {
            RiskLevel::Low => Role::Technician,
            RiskLevel::Medium => Role::TenantAdmin,
            RiskLevel::High => Role::MspAdmin,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
    Expired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemediationStatus {
    Queued,
    InProgress,
    Success,
    Failed,
    Timeout,
}

impl RemediationStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RemediationStatus::Success | RemediationStatus::Failed | RemediationStatus::Timeout
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TenantStatus {
    Active,
    Suspended,
    Deleted,
}

/// Append-only audit trail entry. Every non-read mutation writes exactly one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLog {
    pub id: Uuid,
    pub tenant_id: TenantId,
    pub actor_id: Option<UserId>,
    pub action: String,
    pub target_type: String,
    pub target_id: Option<Uuid>,
    pub status: AuditStatus,
    pub details: Option<serde_json::Value>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditStatus {
    Success,
    Failure,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Permission {
    pub resource: String,
    pub action: String,
}

impl Permission {
    pub fn new(resource: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            action: action.into(),
        }
    }

    pub fn as_string(&self) -> String {
        format!("{}:{}", self.resource, self.action)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtClaims {
    pub sub: String, // user_id
    pub tenant_id: String,
    pub role: String,
    pub permissions: Vec<String>,
    pub exp: i64,
    pub iat: i64,
    pub jti: String, // JWT ID for revocation bookkeeping
}

#[derive(Debug, Clone)]
pub struct TenantContext {
    pub tenant_id: TenantId,
}

/// Per-request identity and scope, populated by the auth middleware and
/// consulted by the permission check in `sentry-auth`.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub tenant_context: Option<TenantContext>,
    pub user_id: Option<UserId>,
    pub role: Option<Role>,
    pub jti: Option<String>,
    pub permissions: Vec<Permission>,
    pub request_id: String,
}

impl RequestContext {
    pub fn new() -> Self {
        Self {
            tenant_context: None,
            user_id: None,
            role: None,
            jti: None,
            permissions: Vec::new(),
            request_id: uuid::Uuid::new_v4().to_string(),
        }
    }

    pub fn with_request_id(mut self, request_id: String) -> Self {
        self.request_id = request_id;
        self
    }

    pub fn with_tenant_context(mut self, tenant_context: TenantContext) -> Self {
        self.tenant_context = Some(tenant_context);
        self
    }

    pub fn with_user_id(mut self, user_id: UserId) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.role = Some(role);
        self
    }

    pub fn with_jti(mut self, jti: String) -> Self {
        self.jti = Some(jti);
        self
    }

    pub fn with_permissions(mut self, permissions: Vec<Permission>) -> Self {
        self.permissions = permissions;
        self
    }

    pub fn tenant_id(&self) -> Option<TenantId> {
        self.tenant_context.as_ref().map(|c| c.tenant_id)
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "axum")]
#[async_trait]
impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<serde_json::Value>);

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<RequestContext>()
            .cloned()
            .ok_or_else(|| {
                (
                    StatusCode::UNAUTHORIZED,
                    Json(serde_json::json!({
                        "error": "Authentication required"
                    })),
                )
            })
    }
}

/// Named aggregation key for the correlation engine, fixed to the set
/// allowed by `CorrelationConfig`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregationKeyKind {
    AssetSignature,
    AssetSignatureTool,
    Signature,
    Asset,
}

impl AggregationKeyKind {
    pub fn compute(&self, asset_name: &str, signature: &str, tool_source: &str) -> String {
        match self {
            AggregationKeyKind::AssetSignature => format!("{}|{}", asset_name, signature),
            AggregationKeyKind::AssetSignatureTool => {
                format!("{}|{}|{}", asset_name, signature, tool_source)
            }
            AggregationKeyKind::Signature => signature.to_string(),
            AggregationKeyKind::Asset => asset_name.to_string(),
        }
    }
}

pub type TagSet = HashSet<String>;
