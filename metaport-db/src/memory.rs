use std::collections::HashMap;

use async_trait::async_trait;
use indexmap::IndexMap;
use parking_lot::RwLock;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::models::{Entity, EntityKind};
use crate::store::{LegacySource, MetaStore};

pub(crate) fn assign_id(attrs: &mut Value) -> DbResult<String> {
    let obj = attrs.as_object_mut().ok_or_else(|| {
        DbError::Serde(serde::de::Error::custom("entity attributes must be an object"))
    })?;
    let carried = obj
        .get("id")
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
        .map(str::to_owned);
    let id = carried.unwrap_or_else(|| Uuid::now_v7().to_string());
    obj.insert("id".into(), Value::String(id.clone()));
    Ok(id)
}

pub(crate) fn field_matches(record: &Value, field: &str, value: &str) -> bool {
    match record.get(field) {
        Some(Value::String(s)) => s == value,
        Some(Value::Number(n)) => n.to_string() == value,
        Some(Value::Bool(b)) => b.to_string() == value,
        _ => false,
    }
}

/// In-process store. Used for dry runs and tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<EntityKind, IndexMap<String, Value>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// All records of one kind, in insertion order.
    pub fn all(&self, kind: EntityKind) -> Vec<Value> {
        self.records
            .read()
            .get(&kind)
            .map(|rows| rows.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn all_entities<E: Entity>(&self) -> DbResult<Vec<E>> {
        self.all(E::KIND)
            .into_iter()
            .map(|v| serde_json::from_value(v).map_err(Into::into))
            .collect()
    }

    pub fn get<E: Entity>(&self, id: &str) -> Option<E> {
        let guard = self.records.read();
        let value = guard.get(&E::KIND)?.get(id)?.clone();
        serde_json::from_value(value).ok()
    }

    pub fn count(&self, kind: EntityKind) -> usize {
        self.records.read().get(&kind).map_or(0, IndexMap::len)
    }

    /// Whole store as one JSON object keyed by entity kind.
    pub fn snapshot(&self) -> Value {
        let guard = self.records.read();
        let mut kinds: Vec<&EntityKind> = guard.keys().collect();
        kinds.sort_by_key(|k| k.to_string());
        let mut out = Map::new();
        for kind in kinds {
            let rows = guard[kind].values().cloned().collect();
            out.insert(kind.to_string(), Value::Array(rows));
        }
        Value::Object(out)
    }
}

#[async_trait]
impl MetaStore for MemoryStore {
    async fn create(&self, kind: EntityKind, mut attrs: Value) -> DbResult<Value> {
        let id = assign_id(&mut attrs)?;
        self.records
            .write()
            .entry(kind)
            .or_default()
            .insert(id, attrs.clone());
        Ok(attrs)
    }

    async fn update(&self, kind: EntityKind, id: &str, patch: Value) -> DbResult<()> {
        let mut guard = self.records.write();
        let record = guard
            .get_mut(&kind)
            .and_then(|rows| rows.get_mut(id))
            .ok_or_else(|| DbError::NotFound { kind, id: id.to_string() })?;
        if let (Some(target), Value::Object(fields)) = (record.as_object_mut(), patch) {
            for (k, v) in fields {
                if k != "id" {
                    target.insert(k, v);
                }
            }
        }
        Ok(())
    }

    async fn list(&self, kind: EntityKind, field: &str, value: &str) -> DbResult<Vec<Value>> {
        let guard = self.records.read();
        Ok(guard
            .get(&kind)
            .map(|rows| {
                rows.values()
                    .filter(|r| field_matches(r, field, value))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}

/// Legacy collections held in memory.
#[derive(Debug, Default, Clone)]
pub struct MemorySource {
    collections: HashMap<String, Vec<Value>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, collection: &str, rows: Vec<Value>) -> Self {
        self.push_all(collection, rows);
        self
    }

    pub fn push(&mut self, collection: &str, row: Value) {
        self.collections.entry(collection.to_string()).or_default().push(row);
    }

    pub fn push_all(&mut self, collection: &str, rows: Vec<Value>) {
        self.collections.entry(collection.to_string()).or_default().extend(rows);
    }
}

#[async_trait]
impl LegacySource for MemorySource {
    async fn list(&self, collection: &str) -> DbResult<Vec<Value>> {
        Ok(self.collections.get(collection).cloned().unwrap_or_default())
    }
}
