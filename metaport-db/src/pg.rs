use async_trait::async_trait;
use serde_json::Value;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use crate::error::{DbError, DbResult};
use crate::memory::assign_id;
use crate::models::EntityKind;
use crate::store::{LegacySource, MetaStore};

pub const ENTITY_TABLE: &str = "metaport_entities";

fn schema_sql() -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {ENTITY_TABLE} (
    seq BIGSERIAL NOT NULL,
    id TEXT PRIMARY KEY,
    kind TEXT NOT NULL,
    attrs JSONB NOT NULL
);
CREATE INDEX IF NOT EXISTS {ENTITY_TABLE}_kind_seq_idx ON {ENTITY_TABLE} (kind, seq);"
    )
}

/// Legacy collection names are interpolated into SQL, so only plain identifiers pass.
pub fn is_collection_name(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_lowercase() || c == '_')
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
        && name.len() <= 63
}

pub async fn connect(url: &str, max_connections: u32) -> DbResult<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(url)
            .await?;
    Ok(pool)
}

/// Target store keeping every entity as a JSONB row of one table.
#[derive(Clone, Debug)]
pub struct PgMetaStore {
    pool: PgPool,
}

impl PgMetaStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn ensure_schema(&self) -> DbResult<()> {
        let sql = schema_sql();
        sqlx::raw_sql(&sql).execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl MetaStore for PgMetaStore {
    async fn create(&self, kind: EntityKind, mut attrs: Value) -> DbResult<Value> {
        let id = assign_id(&mut attrs)?;
        let sql =
            format!("INSERT INTO {ENTITY_TABLE} (id, kind, attrs) VALUES ($1, $2, $3) RETURNING attrs");
        let stored: Value = sqlx::query_scalar(&sql)
            .bind(&id)
            .bind(kind.as_ref())
            .bind(&attrs)
            .fetch_one(&self.pool)
            .await?;
        Ok(stored)
    }

    async fn update(&self, kind: EntityKind, id: &str, mut patch: Value) -> DbResult<()> {
        if let Some(fields) = patch.as_object_mut() {
            fields.remove("id");
        }
        let sql =
            format!("UPDATE {ENTITY_TABLE} SET attrs = attrs || $3 WHERE kind = $1 AND id = $2");
        let affected = sqlx::query(&sql)
            .bind(kind.as_ref())
            .bind(id)
            .bind(&patch)
            .execute(&self.pool)
            .await?
            .rows_affected();
        if affected == 0 {
            return Err(DbError::NotFound { kind, id: id.to_string() });
        }
        Ok(())
    }

    async fn list(&self, kind: EntityKind, field: &str, value: &str) -> DbResult<Vec<Value>> {
        let sql = format!(
            "SELECT attrs FROM {ENTITY_TABLE} WHERE kind = $1 AND attrs ->> $2 = $3 ORDER BY seq"
        );
        let rows: Vec<Value> = sqlx::query_scalar(&sql)
            .bind(kind.as_ref())
            .bind(field)
            .bind(value)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }
}

/// Reads legacy collections straight from the legacy metadata tables.
#[derive(Clone, Debug)]
pub struct PgLegacySource {
    pool: PgPool,
}

impl PgLegacySource {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LegacySource for PgLegacySource {
    async fn list(&self, collection: &str) -> DbResult<Vec<Value>> {
        if !is_collection_name(collection) {
            return Err(DbError::InvalidCollection(collection.to_string()));
        }
        let exists: Option<String> = sqlx::query_scalar("SELECT to_regclass($1)::text")
            .bind(collection)
            .fetch_one(&self.pool)
            .await?;
        if exists.is_none() {
            tracing::debug!("legacy collection {} does not exist", collection);
            return Ok(Vec::new());
        }
        let sql = format!("SELECT row_to_json(t)::jsonb FROM {collection} t");
        let rows: Vec<Value> = sqlx::query_scalar(&sql).fetch_all(&self.pool).await?;
        Ok(rows)
    }
}
