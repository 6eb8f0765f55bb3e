//! Fan-out of in-app `Notification` rows (§3) to users by role. Delivery
//! through the optional `Notifier` collaborator (email/SMS, §6) is
//! best-effort: failures are logged, never propagated.

use crate::models::{Notification, NOTIFICATION_TTL_SECONDS};
use crate::traits::Notifier;
use sentry_auth::AuthRepository;
use sentry_core::storage::{FieldFilter, Storage};
use sentry_core::{NotificationId, Result, Role, TenantId, UserId};
use std::sync::Arc;

const NOTIFICATIONS: &str = "notifications";

#[derive(Clone)]
pub struct NotificationService {
    storage: Arc<dyn Storage>,
    users: AuthRepository,
    notifier: Option<Arc<dyn Notifier>>,
}

impl NotificationService {
    pub fn new(storage: Arc<dyn Storage>, users: AuthRepository, notifier: Option<Arc<dyn Notifier>>) -> Self {
        Self {
            storage,
            users,
            notifier,
        }
    }

    /// Writes one `Notification` for a specific user.
    pub async fn notify_user(
        &self,
        tenant_id: TenantId,
        user_id: UserId,
        notification_type: &str,
        message: &str,
    ) -> Result<()> {
        let now = chrono::Utc::now().timestamp();
        let notification = Notification {
            id: NotificationId::new(),
            tenant_id,
            user_id,
            notification_type: notification_type.to_string(),
            message: message.to_string(),
            read: false,
            created_at: now,
            expires_at: now + NOTIFICATION_TTL_SECONDS,
        };
        self.storage
            .insert_one(NOTIFICATIONS, notification.id.0, serde_json::to_value(&notification)?)
            .await?;

        if let Some(notifier) = &self.notifier {
            if let Err(e) = notifier.send(&user_id.to_string(), notification_type, message).await {
                tracing::warn!(error = %e, "notifier delivery failed, in-app notification still recorded");
            }
        }
        Ok(())
    }

    /// Notifies every active user of `role` in the tenant, or every active
    /// global-role user when `role` is global (§4.J's `msp_admin` rung has
    /// no single tenant to scope the lookup by).
    pub async fn notify_role(
        &self,
        tenant_id: TenantId,
        role: Role,
        notification_type: &str,
        message: &str,
    ) -> Result<()> {
        let recipients = if role.is_global() {
            self.users.list_global_by_role(role).await?
        } else {
            self.users.list_by_role(tenant_id, role).await?
        };
        for user in recipients {
            self.notify_user(tenant_id, user.id, notification_type, message).await?;
        }
        Ok(())
    }

    pub async fn unread_for_user(&self, tenant_id: TenantId, user_id: UserId) -> Result<Vec<Notification>> {
        let docs = self
            .storage
            .find(
                NOTIFICATIONS,
                &[
                    FieldFilter::tenant(tenant_id),
                    FieldFilter::eq("user_id", user_id.0.to_string()),
                    FieldFilter::eq("read", false),
                ],
                None,
                None,
            )
            .await?;
        docs.into_iter()
            .map(|v| serde_json::from_value(v).map_err(sentry_core::Error::from))
            .collect()
    }
}
