//! Tenant-scoped storage facade.
//!
//! The adapter accepts a tagged filter variant (`Eq | In | Range | Ne |
//! SetContains`) instead of a free-form query map, and every query must
//! carry an equality filter on `tenant_id` — the facade rejects any that
//! don't. Typed repositories in the other crates build on top of this
//! generic document facade; it stays collection-agnostic so the set of
//! entities can grow without widening this trait.

mod memory;

pub use memory::InMemoryStorage;

use crate::error::{Error, Result};
use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

pub const TENANT_FIELD: &str = "tenant_id";

/// Collections that hold identity records rather than tenant-owned business
/// data. `User.tenant_id` is itself optional in the data model ("tenant
/// scope (empty = all)", spec §3), and a user's refresh tokens are looked
/// up by opaque id or by the user's email before the caller knows which
/// tenant they belong to — so these two collections are exempt from the
/// mandatory tenant-scope check enforced on every other collection.
/// `tenants` is exempt too: a tenant's own record defines `tenant_id`, so
/// looking it up by its `id` or by its `api_key` (the webhook receiver's
/// only handle before it knows which tenant it's talking to) can never
/// itself carry a `tenant_id` equality filter.
pub const GLOBAL_COLLECTIONS: &[&str] = &["users", "refresh_tokens", "tenants"];

/// A single comparison against one document field.
#[derive(Debug, Clone)]
pub enum Filter {
    Eq(Value),
    Ne(Value),
    In(Vec<Value>),
    Range {
        gt: Option<Value>,
        gte: Option<Value>,
        lt: Option<Value>,
        lte: Option<Value>,
    },
    SetContains(Value),
}

#[derive(Debug, Clone)]
pub struct FieldFilter {
    pub field: String,
    pub filter: Filter,
}

impl FieldFilter {
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            filter: Filter::Eq(value.into()),
        }
    }

    pub fn ne(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            filter: Filter::Ne(value.into()),
        }
    }

    pub fn in_set(field: impl Into<String>, values: Vec<Value>) -> Self {
        Self {
            field: field.into(),
            filter: Filter::In(values),
        }
    }

    pub fn set_contains(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            filter: Filter::SetContains(value.into()),
        }
    }

    pub fn gte(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            filter: Filter::Range {
                gt: None,
                gte: Some(value.into()),
                lt: None,
                lte: None,
            },
        }
    }

    pub fn lte(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            filter: Filter::Range {
                gt: None,
                gte: None,
                lt: None,
                lte: Some(value.into()),
            },
        }
    }

    pub fn tenant(tenant_id: crate::types::TenantId) -> Self {
        Self::eq(TENANT_FIELD, tenant_id.0.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

#[derive(Debug, Clone)]
pub struct Sort {
    pub field: String,
    pub direction: SortDirection,
}

impl Sort {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Ascending,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Descending,
        }
    }
}

/// Ensures every query against a tenant-owned collection is tenant-scoped.
/// Multi-tenant isolation is load-bearing: a single gap here is the root
/// cause of cross-tenant leaks. `GLOBAL_COLLECTIONS` are exempt.
pub fn require_tenant_scope(collection: &str, filters: &[FieldFilter]) -> Result<()> {
    if GLOBAL_COLLECTIONS.contains(&collection) {
        return Ok(());
    }
    let scoped = filters
        .iter()
        .any(|f| f.field == TENANT_FIELD && matches!(f.filter, Filter::Eq(_)));
    if scoped {
        Ok(())
    } else {
        Err(Error::storage_scope_violation(
            "query is missing a required tenant_id equality filter",
        ))
    }
}

#[async_trait]
pub trait Storage: Send + Sync {
    /// Insert a document, server-assigned `id`. Last-writer-wins on an
    /// identical id; callers generate ids themselves.
    async fn insert_one(&self, collection: &str, id: Uuid, doc: Value) -> Result<()>;

    async fn find_one(&self, collection: &str, filters: &[FieldFilter]) -> Result<Option<Value>>;

    async fn find(
        &self,
        collection: &str,
        filters: &[FieldFilter],
        sort: Option<Sort>,
        limit: Option<usize>,
    ) -> Result<Vec<Value>>;

    /// Merge-patches the first matching document. Returns whether a match
    /// was found.
    async fn update_one(
        &self,
        collection: &str,
        filters: &[FieldFilter],
        patch: Value,
    ) -> Result<bool>;

    /// Merge-patches every matching document. Returns the number updated.
    async fn update_many(
        &self,
        collection: &str,
        filters: &[FieldFilter],
        patch: Value,
    ) -> Result<usize>;

    async fn delete_one(&self, collection: &str, filters: &[FieldFilter]) -> Result<bool>;

    async fn count(&self, collection: &str, filters: &[FieldFilter]) -> Result<usize>;

    /// Atomic compare-and-set on one field, used by optimistic-concurrency
    /// callers (incident status transitions, approval decisions). Succeeds
    /// only if the document currently matches `expected_filters`; the patch
    /// is applied in the same atomic step.
    async fn compare_and_set(
        &self,
        collection: &str,
        id: Uuid,
        expected_filters: &[FieldFilter],
        patch: Value,
    ) -> Result<bool>;
}
