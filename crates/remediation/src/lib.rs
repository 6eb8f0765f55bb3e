pub mod approval;
pub mod dispatcher;
pub mod models;
pub mod notifications;
pub mod repository;
pub mod sla;
pub mod traits;

pub use approval::{ApprovalWorkflow, Decision};
pub use dispatcher::{DispatchOutcome, Dispatcher};
pub use models::{ApprovalRequest, Notification, RemediationExecution, Runbook};
pub use notifications::NotificationService;
pub use repository::{ApprovalRepository, RemediationExecutionRepository, RunbookRepository};
pub use sla::SlaMonitor;
pub use traits::{AdvisorDecision, DecisionAdvisor, Executor, ExecutorStatusReport, Notifier};
