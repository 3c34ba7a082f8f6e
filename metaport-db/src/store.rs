use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::error::DbResult;
use crate::models::{Column, Entity, EntityKind, ViewColumn};

/// Persistence layer of the target schema.
///
/// Each call is committed on its own. The store enforces no cross-entity rules,
/// those belong to the caller.
#[async_trait]
pub trait MetaStore: Send + Sync {
    /// Persists `attrs` and returns them with the assigned `id`.
    async fn create(&self, kind: EntityKind, attrs: Value) -> DbResult<Value>;

    /// Shallow-merges `patch` into an existing record.
    async fn update(&self, kind: EntityKind, id: &str, patch: Value) -> DbResult<()>;

    /// Records of `kind` whose `field` equals `value`, in insertion order.
    async fn list(&self, kind: EntityKind, field: &str, value: &str) -> DbResult<Vec<Value>>;
}

/// Typed helpers over the untyped [`MetaStore`] primitives.
#[async_trait]
pub trait MetaStoreExt: MetaStore {
    async fn insert<E: Entity>(&self, entity: E) -> DbResult<E> {
        let attrs = serde_json::to_value(&entity)?;
        let created = self.create(E::KIND, attrs).await?;
        Ok(serde_json::from_value(created)?)
    }

    async fn patch<P: Serialize + Sync>(&self, kind: EntityKind, id: &str, patch: &P) -> DbResult<()> {
        let patch = serde_json::to_value(patch)?;
        self.update(kind, id, patch).await
    }

    async fn list_entities<E: Entity>(&self, field: &str, value: &str) -> DbResult<Vec<E>> {
        self.list(E::KIND, field, value)
            .await?
            .into_iter()
            .map(|v| serde_json::from_value(v).map_err(Into::into))
            .collect()
    }

    async fn list_columns(&self, table_id: &str) -> DbResult<Vec<Column>> {
        self.list_entities::<Column>("table_id", table_id).await
    }

    async fn list_view_columns(&self, view_id: &str) -> DbResult<Vec<ViewColumn>> {
        self.list_entities::<ViewColumn>("view_id", view_id).await
    }
}

impl<T: MetaStore + ?Sized> MetaStoreExt for T {}

/// Reader over the legacy metadata collections.
///
/// A collection that does not exist reads as empty. Row order is unspecified.
#[async_trait]
pub trait LegacySource: Send + Sync {
    async fn list(&self, collection: &str) -> DbResult<Vec<Value>>;
}
