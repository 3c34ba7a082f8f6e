//! Builders for legacy fixtures and helpers to inspect a migrated store.

use std::sync::Arc;

use metaport_db::models::{Column, Entity, Table, View, ViewColumn};
use metaport_db::{MemorySource, MemoryStore};
use serde_json::{Value, json};

use crate::errors::MigrateResult;
use crate::legacy::collections;
use crate::migrator::Migrator;
use crate::report::MigrationReport;

/// A legacy table and the blobs stored with it.
#[derive(Debug, Clone)]
pub struct TableFixture {
    id: Option<String>,
    name: String,
    alias: String,
    columns: Vec<Value>,
    belongs_to: Vec<Value>,
    has_many: Vec<Value>,
    virtuals: Vec<Value>,
    query_params: Value,
    view_order: Option<i64>,
}

impl TableFixture {
    pub fn new(name: &str, alias: &str) -> Self {
        Self {
            id: None,
            name: name.to_string(),
            alias: alias.to_string(),
            columns: Vec::new(),
            belongs_to: Vec::new(),
            has_many: Vec::new(),
            virtuals: Vec::new(),
            query_params: Value::Null,
            view_order: None,
        }
    }

    pub fn legacy_id(mut self, id: &str) -> Self {
        self.id = Some(id.to_string());
        self
    }

    pub fn column(mut self, name: &str, alias: &str, uidt: &str) -> Self {
        self.columns
            .push(json!({"cn": name, "_cn": alias, "uidt": uidt, "dt": "varchar"}));
        self
    }

    pub fn belongs_to(mut self, cn: &str, rtn: &str, rcn: &str) -> Self {
        let tn = self.name.clone();
        self.belongs_to
            .push(json!({"tn": tn, "cn": cn, "rtn": rtn, "rcn": rcn}));
        self
    }

    pub fn has_many(mut self, tn: &str, cn: &str, rcn: &str) -> Self {
        let rtn = self.name.clone();
        self.has_many
            .push(json!({"tn": tn, "cn": cn, "rtn": rtn, "rcn": rcn}));
        self
    }

    /// Raw entry of the virtual column list (`hm`/`bt`/`mm`/`lk`/`rl`/`formula`).
    pub fn virtual_column(mut self, entry: Value) -> Self {
        self.virtuals.push(entry);
        self
    }

    pub fn query_params(mut self, params: Value) -> Self {
        self.query_params = params;
        self
    }

    pub fn view_order(mut self, order: i64) -> Self {
        self.view_order = Some(order);
        self
    }

    fn into_row(self, project_id: &str) -> Value {
        let meta = json!({
            "columns": self.columns,
            "belongsTo": self.belongs_to,
            "hasMany": self.has_many,
            "v": self.virtuals,
        });
        json!({
            "id": self.id,
            "project_id": project_id,
            "title": self.name,
            "alias": self.alias,
            "type": "table",
            "meta": meta.to_string(),
            "query_params": self.query_params.to_string(),
            "view_order": self.view_order,
            "mm": 0,
        })
    }
}

/// Assembles legacy collections into a [`MemorySource`].
#[derive(Debug, Default, Clone)]
pub struct LegacyFixture {
    source: MemorySource,
}

impl LegacyFixture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn row(mut self, collection: &str, row: Value) -> Self {
        self.source.push(collection, row);
        self
    }

    /// A project with one `pg` data source.
    pub fn project(self, id: &str, title: &str) -> Self {
        let config = json!({
            "title": title,
            "prefix": "nc_",
            "envs": {"_noco": {"db": [{
                "client": "pg",
                "connection": {"database": title},
                "meta": {"inflection": {"tn": "camelize", "cn": "camelize"}}
            }]}}
        });
        self.row(
            collections::PROJECTS,
            json!({"id": id, "title": title, "config": config.to_string()}),
        )
    }

    pub fn user(self, id: &str, email: &str) -> Self {
        self.row(
            collections::USERS,
            json!({"id": id, "email": email, "roles": "user", "email_verified": 1}),
        )
    }

    pub fn member(self, project_id: &str, user_id: &str, roles: &str) -> Self {
        self.row(
            collections::PROJECT_USERS,
            json!({"project_id": project_id, "user_id": user_id, "roles": roles}),
        )
    }

    pub fn table(self, project_id: &str, table: TableFixture) -> Self {
        let row = table.into_row(project_id);
        self.row(collections::MODELS, row)
    }

    /// A saved view of `parent` shown as grid, gallery or form.
    pub fn view(self, project_id: &str, parent: &str, title: &str, show_as: &str, params: Value) -> Self {
        self.row(
            collections::MODELS,
            json!({
                "project_id": project_id,
                "title": title,
                "alias": title,
                "type": "vtable",
                "parent_model_title": parent,
                "show_as": show_as,
                "query_params": params.to_string(),
            }),
        )
    }

    pub fn relation(self, project_id: &str, tn: &str, cn: &str, rtn: &str, rcn: &str, kind: &str) -> Self {
        self.row(
            collections::RELATIONS,
            json!({"project_id": project_id, "tn": tn, "cn": cn, "rtn": rtn, "rcn": rcn, "type": kind}),
        )
    }

    pub fn source(self) -> MemorySource {
        self.source
    }

    /// Migrates the fixture into a fresh [`MemoryStore`].
    pub async fn migrate(self) -> MigrateResult<(Arc<MemoryStore>, MigrationReport)> {
        let store = Arc::new(MemoryStore::new());
        let report = Migrator::builder(Arc::new(self.source), store.clone())
            .build()
            .run()
            .await?;
        Ok((store, report))
    }
}

fn entities<E: Entity>(store: &MemoryStore) -> Vec<E> {
    store.all_entities::<E>().unwrap_or_default()
}

pub fn table_named(store: &MemoryStore, table_name: &str) -> Option<Table> {
    entities::<Table>(store)
        .into_iter()
        .find(|t| t.table_name == table_name)
}

/// Columns of a table in creation order.
pub fn columns_of(store: &MemoryStore, table_id: &str) -> Vec<Column> {
    entities::<Column>(store)
        .into_iter()
        .filter(|c| c.table_id == table_id)
        .collect()
}

pub fn column_titled(store: &MemoryStore, table_id: &str, title: &str) -> Option<Column> {
    columns_of(store, table_id).into_iter().find(|c| c.title == title)
}

pub fn view_titled(store: &MemoryStore, table_id: &str, title: &str) -> Option<View> {
    entities::<View>(store)
        .into_iter()
        .find(|v| v.table_id == table_id && v.title == title)
}

/// View columns of a view, sorted by display order.
pub fn view_columns(store: &MemoryStore, view_id: &str) -> Vec<ViewColumn> {
    let mut columns: Vec<ViewColumn> = entities::<ViewColumn>(store)
        .into_iter()
        .filter(|vc| vc.view_id == view_id)
        .collect();
    columns.sort_by_key(|vc| vc.order);
    columns
}
