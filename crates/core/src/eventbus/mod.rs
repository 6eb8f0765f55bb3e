//! In-process publish/subscribe event bus with per-connection fanout.
//!
//! Each subscribed connection gets its own bounded queue (capacity 256).
//! Unlike a plain `mpsc` channel, which would reject the *newest* message
//! once full, overflow here drops the *oldest* queued message and flags the
//! next delivered one `congested` so the client knows to resync over REST.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering as AtomicOrdering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;
use uuid::Uuid;

use crate::types::TenantId;

/// Bounded per-connection delivery queue depth before messages are dropped.
pub const CONNECTION_QUEUE_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Topic {
    AlertIngested,
    IncidentCreated,
    IncidentUpdated,
    IncidentAssigned,
    ApprovalRequested,
    ApprovalDecided,
    RemediationCompleted,
    NotificationCreated,
    CorrelatorProgress,
    ConfigInvalidated,
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Topic::AlertIngested => "alert.ingested",
            Topic::IncidentCreated => "incident.created",
            Topic::IncidentUpdated => "incident.updated",
            Topic::IncidentAssigned => "incident.assigned",
            Topic::ApprovalRequested => "approval.requested",
            Topic::ApprovalDecided => "approval.decided",
            Topic::RemediationCompleted => "remediation.completed",
            Topic::NotificationCreated => "notification.created",
            Topic::CorrelatorProgress => "correlator.progress",
            Topic::ConfigInvalidated => "config.invalidated",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub topic: Topic,
    pub tenant_id: TenantId,
    pub payload: Value,
    pub published_at: DateTime<Utc>,
    /// Set on delivery, not at publish time, when this connection previously
    /// dropped a message and the client needs to know to resync.
    #[serde(default)]
    pub congested: bool,
}

struct ConnectionQueue {
    buffer: Mutex<VecDeque<Event>>,
    notify: Notify,
    closed: AtomicBool,
    dropped_since_delivery: AtomicBool,
}

impl ConnectionQueue {
    fn push(&self, mut event: Event) {
        let mut buffer = self.buffer.lock().expect("connection queue poisoned");
        if buffer.len() >= CONNECTION_QUEUE_CAPACITY {
            buffer.pop_front();
            self.dropped_since_delivery.store(true, AtomicOrdering::Release);
        }
        if self
            .dropped_since_delivery
            .swap(false, AtomicOrdering::AcqRel)
        {
            event.congested = true;
        }
        buffer.push_back(event);
        drop(buffer);
        self.notify.notify_one();
    }

    fn close(&self) {
        self.closed.store(true, AtomicOrdering::Release);
        self.notify.notify_waiters();
    }
}

/// Receiving half handed to a WebSocket connection task.
pub struct ConnectionReceiver {
    queue: Arc<ConnectionQueue>,
}

impl ConnectionReceiver {
    pub async fn recv(&self) -> Option<Event> {
        loop {
            {
                let mut buffer = self.queue.buffer.lock().expect("connection queue poisoned");
                if let Some(event) = buffer.pop_front() {
                    return Some(event);
                }
                if self.queue.closed.load(AtomicOrdering::Acquire) {
                    return None;
                }
            }
            self.queue.notify.notified().await;
        }
    }
}

/// Tracks `tenant_id -> set<connection>` and fans out published events.
/// Backed by `DashMap` (sharded internally) rather than a single
/// `RwLock<HashMap>`, since subscribe/unsubscribe churn is far more
/// frequent than a full-index scan.
pub struct EventBus {
    connections: DashMap<Uuid, Arc<ConnectionQueue>>,
    tenant_index: DashMap<TenantId, HashSet<Uuid>>,
    sequence: AtomicU64,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            connections: DashMap::new(),
            tenant_index: DashMap::new(),
            sequence: AtomicU64::new(0),
        }
    }

    /// Registers a new subscriber for a tenant, returning the connection id
    /// and the receiving half of its bounded queue.
    pub fn subscribe(&self, tenant_id: TenantId) -> (Uuid, ConnectionReceiver) {
        let connection_id = Uuid::new_v4();
        let queue = Arc::new(ConnectionQueue {
            buffer: Mutex::new(VecDeque::with_capacity(CONNECTION_QUEUE_CAPACITY)),
            notify: Notify::new(),
            closed: AtomicBool::new(false),
            dropped_since_delivery: AtomicBool::new(false),
        });
        self.connections.insert(connection_id, queue.clone());
        self.tenant_index
            .entry(tenant_id)
            .or_default()
            .insert(connection_id);
        (connection_id, ConnectionReceiver { queue })
    }

    /// Lazily reaps a closed connection from the index.
    pub fn unsubscribe(&self, tenant_id: TenantId, connection_id: Uuid) {
        if let Some((_, queue)) = self.connections.remove(&connection_id) {
            queue.close();
        }
        if let Some(mut set) = self.tenant_index.get_mut(&tenant_id) {
            set.remove(&connection_id);
        }
    }

    /// Publishes to every connection subscribed to `tenant_id`. Within a
    /// single connection, delivery order matches publish order; across
    /// connections, no ordering is guaranteed.
    pub fn publish(&self, topic: Topic, tenant_id: TenantId, payload: Value) {
        self.sequence.fetch_add(1, AtomicOrdering::Relaxed);
        let event = Event {
            topic,
            tenant_id,
            payload,
            published_at: Utc::now(),
            congested: false,
        };

        let Some(subscribers) = self.tenant_index.get(&tenant_id) else {
            return;
        };

        for connection_id in subscribers.iter() {
            if let Some(queue) = self.connections.get(connection_id) {
                queue.push(event.clone());
            }
        }
    }

    pub fn subscriber_count(&self, tenant_id: TenantId) -> usize {
        self.tenant_index
            .get(&tenant_id)
            .map(|set| set.len())
            .unwrap_or(0)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
