use super::{require_tenant_scope, Filter, FieldFilter, Sort, SortDirection};
use crate::error::{Error, Result};
use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use serde_json::Value;
use std::cmp::Ordering;
use uuid::Uuid;

/// Reference `Storage` implementation: one `DashMap` per collection, keyed
/// by document id. Adequate for a single process; a durable backend would
/// implement the same trait against a real database.
#[derive(Default)]
pub struct InMemoryStorage {
    collections: DashMap<String, DashMap<Uuid, Value>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn collection(&self, name: &str) -> dashmap::mapref::one::Ref<'_, String, DashMap<Uuid, Value>> {
        if self.collections.get(name).is_none() {
            self.collections.entry(name.to_string()).or_default();
        }
        self.collections.get(name).expect("just inserted")
    }

    fn is_expired(doc: &Value) -> bool {
        match doc.get("expires_at") {
            Some(Value::Number(n)) => match n.as_i64() {
                Some(expires_at) => expires_at <= Utc::now().timestamp(),
                None => false,
            },
            _ => false,
        }
    }
}

fn value_cmp(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            x.as_f64().and_then(|x| y.as_f64().map(|y| x.partial_cmp(&y)))?
        }
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

fn value_eq(a: &Value, b: &Value) -> bool {
    value_cmp(a, b) == Some(Ordering::Equal) || a == b
}

fn matches_one(doc: &Value, ff: &FieldFilter) -> bool {
    let field_value = doc.get(&ff.field).unwrap_or(&Value::Null);
    match &ff.filter {
        Filter::Eq(v) => value_eq(field_value, v),
        Filter::Ne(v) => !value_eq(field_value, v),
        Filter::In(values) => values.iter().any(|v| value_eq(field_value, v)),
        Filter::SetContains(v) => match field_value {
            Value::Array(items) => items.iter().any(|item| value_eq(item, v)),
            _ => false,
        },
        Filter::Range { gt, gte, lt, lte } => {
            if let Some(v) = gt {
                if !matches!(value_cmp(field_value, v), Some(Ordering::Greater)) {
                    return false;
                }
            }
            if let Some(v) = gte {
                if !matches!(
                    value_cmp(field_value, v),
                    Some(Ordering::Greater) | Some(Ordering::Equal)
                ) {
                    return false;
                }
            }
            if let Some(v) = lt {
                if !matches!(value_cmp(field_value, v), Some(Ordering::Less)) {
                    return false;
                }
            }
            if let Some(v) = lte {
                if !matches!(
                    value_cmp(field_value, v),
                    Some(Ordering::Less) | Some(Ordering::Equal)
                ) {
                    return false;
                }
            }
            true
        }
    }
}

fn matches_all(doc: &Value, filters: &[FieldFilter]) -> bool {
    filters.iter().all(|ff| matches_one(doc, ff))
}

fn merge_patch(target: &mut Value, patch: &Value) {
    match (target, patch) {
        (Value::Object(target_map), Value::Object(patch_map)) => {
            for (key, value) in patch_map {
                merge_patch(
                    target_map.entry(key.clone()).or_insert(Value::Null),
                    value,
                );
            }
        }
        (target, patch) => {
            *target = patch.clone();
        }
    }
}

#[async_trait]
impl super::Storage for InMemoryStorage {
    async fn insert_one(&self, collection: &str, id: Uuid, doc: Value) -> Result<()> {
        self.collection(collection).insert(id, doc);
        Ok(())
    }

    async fn find_one(&self, collection: &str, filters: &[FieldFilter]) -> Result<Option<Value>> {
        require_tenant_scope(collection, filters)?;
        let col = self.collection(collection);
        Ok(col
            .iter()
            .map(|entry| entry.value().clone())
            .find(|doc| !Self::is_expired(doc) && matches_all(doc, filters)))
    }

    async fn find(
        &self,
        collection: &str,
        filters: &[FieldFilter],
        sort: Option<Sort>,
        limit: Option<usize>,
    ) -> Result<Vec<Value>> {
        require_tenant_scope(collection, filters)?;
        let col = self.collection(collection);
        let mut docs: Vec<Value> = col
            .iter()
            .map(|entry| entry.value().clone())
            .filter(|doc| !Self::is_expired(doc) && matches_all(doc, filters))
            .collect();

        if let Some(sort) = sort {
            docs.sort_by(|a, b| {
                let ordering = value_cmp(
                    a.get(&sort.field).unwrap_or(&Value::Null),
                    b.get(&sort.field).unwrap_or(&Value::Null),
                )
                .unwrap_or(Ordering::Equal);
                match sort.direction {
                    SortDirection::Ascending => ordering,
                    SortDirection::Descending => ordering.reverse(),
                }
            });
        }

        if let Some(limit) = limit {
            docs.truncate(limit);
        }

        Ok(docs)
    }

    async fn update_one(
        &self,
        collection: &str,
        filters: &[FieldFilter],
        patch: Value,
    ) -> Result<bool> {
        require_tenant_scope(collection, filters)?;
        let col = self.collection(collection);
        let target_id = col
            .iter()
            .find(|entry| !Self::is_expired(entry.value()) && matches_all(entry.value(), filters))
            .map(|entry| *entry.key());

        match target_id {
            Some(id) => {
                if let Some(mut entry) = col.get_mut(&id) {
                    merge_patch(entry.value_mut(), &patch);
                }
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn update_many(
        &self,
        collection: &str,
        filters: &[FieldFilter],
        patch: Value,
    ) -> Result<usize> {
        require_tenant_scope(collection, filters)?;
        let col = self.collection(collection);
        let target_ids: Vec<Uuid> = col
            .iter()
            .filter(|entry| !Self::is_expired(entry.value()) && matches_all(entry.value(), filters))
            .map(|entry| *entry.key())
            .collect();

        let mut updated = 0;
        for id in target_ids {
            if let Some(mut entry) = col.get_mut(&id) {
                merge_patch(entry.value_mut(), &patch);
                updated += 1;
            }
        }
        Ok(updated)
    }

    async fn delete_one(&self, collection: &str, filters: &[FieldFilter]) -> Result<bool> {
        require_tenant_scope(collection, filters)?;
        let col = self.collection(collection);
        let target_id = col
            .iter()
            .find(|entry| !Self::is_expired(entry.value()) && matches_all(entry.value(), filters))
            .map(|entry| *entry.key());

        match target_id {
            Some(id) => {
                col.remove(&id);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn count(&self, collection: &str, filters: &[FieldFilter]) -> Result<usize> {
        require_tenant_scope(collection, filters)?;
        let col = self.collection(collection);
        Ok(col
            .iter()
            .filter(|entry| !Self::is_expired(entry.value()) && matches_all(entry.value(), filters))
            .count())
    }

    async fn compare_and_set(
        &self,
        collection: &str,
        id: Uuid,
        expected_filters: &[FieldFilter],
        patch: Value,
    ) -> Result<bool> {
        require_tenant_scope(collection, expected_filters)?;
        let col = self.collection(collection);
        let mut entry = match col.get_mut(&id) {
            Some(entry) => entry,
            None => return Err(Error::not_found("document not found for compare_and_set")),
        };

        if Self::is_expired(entry.value()) || !matches_all(entry.value(), expected_filters) {
            return Ok(false);
        }

        merge_patch(entry.value_mut(), &patch);
        Ok(true)
    }
}
