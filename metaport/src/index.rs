//! Reference Index: per-tenant lookups from legacy names and display aliases
//! to the entities created for them.
//!
//! Columns are scoped by the canonical name of their table. Entries are
//! written once when the entity is created and never removed.

use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;
use metaport_db::models::{Column, Table, View};

use crate::legacy::QueryParams;

/// A created view together with the legacy parameter blob it came from.
#[derive(Debug, Clone)]
pub struct ViewRef {
    pub view: View,
    pub params: QueryParams,
}

#[derive(Debug, Default)]
pub struct TenantIndex {
    pub base_id: Option<String>,
    tables_by_name: IndexMap<String, Table>,
    tables_by_alias: IndexMap<String, Table>,
    columns_by_name: HashMap<String, IndexMap<String, Column>>,
    columns_by_alias: HashMap<String, IndexMap<String, Column>>,
    /// Views per table keyed by view id. Titles may repeat within a table.
    views: HashMap<String, IndexMap<String, ViewRef>>,
    legacy_models: HashMap<String, String>,
}

impl TenantIndex {
    pub fn record_table(&mut self, table: &Table) {
        self.tables_by_name.insert(table.table_name.clone(), table.clone());
        self.tables_by_alias.insert(table.title.clone(), table.clone());
    }

    /// Virtual columns have no canonical name and only land in the alias map.
    pub fn record_column(&mut self, table_name: &str, column: &Column) {
        if let Some(name) = &column.column_name {
            self.columns_by_name
                .entry(table_name.to_string())
                .or_default()
                .insert(name.clone(), column.clone());
        }
        self.columns_by_alias
            .entry(table_name.to_string())
            .or_default()
            .insert(column.title.clone(), column.clone());
    }

    pub fn record_view(&mut self, table_name: &str, view: ViewRef) {
        self.views
            .entry(table_name.to_string())
            .or_default()
            .insert(view.view.id.clone(), view);
    }

    pub fn record_legacy_model(&mut self, legacy_id: &str, table_name: &str) {
        self.legacy_models
            .insert(legacy_id.to_string(), table_name.to_string());
    }

    pub fn table_by_name(&self, name: &str) -> Option<&Table> {
        self.tables_by_name.get(name)
    }

    pub fn table_by_alias(&self, alias: &str) -> Option<&Table> {
        self.tables_by_alias.get(alias)
    }

    /// Canonical name first, display alias second.
    pub fn resolve_table(&self, name_or_alias: &str) -> Option<&Table> {
        self.table_by_name(name_or_alias)
            .or_else(|| self.table_by_alias(name_or_alias))
    }

    pub fn table_by_legacy_id(&self, legacy_id: &str) -> Option<&Table> {
        self.legacy_models
            .get(legacy_id)
            .and_then(|name| self.table_by_name(name))
    }

    pub fn column_by_name(&self, table_name: &str, name: &str) -> Option<&Column> {
        self.columns_by_name.get(table_name)?.get(name)
    }

    pub fn column_by_alias(&self, table_name: &str, alias: &str) -> Option<&Column> {
        self.columns_by_alias.get(table_name)?.get(alias)
    }

    /// Canonical name first, display alias second.
    pub fn resolve_column(&self, table_name: &str, name_or_alias: &str) -> Option<&Column> {
        self.column_by_name(table_name, name_or_alias)
            .or_else(|| self.column_by_alias(table_name, name_or_alias))
    }

    /// Columns of a table in creation order.
    pub fn columns(&self, table_name: &str) -> impl Iterator<Item = &Column> {
        self.columns_by_alias
            .get(table_name)
            .into_iter()
            .flat_map(|cols| cols.values())
    }

    /// First view of the table carrying `title`, in creation order.
    pub fn view(&self, table_name: &str, title: &str) -> Option<&ViewRef> {
        self.views
            .get(table_name)?
            .values()
            .find(|v| v.view.title == title)
    }

    /// Every recorded view as `(table_name, view)`.
    pub fn views(&self) -> Vec<(String, ViewRef)> {
        self.tables_by_name
            .keys()
            .filter_map(|name| self.views.get(name).map(|views| (name, views)))
            .flat_map(|(name, views)| views.values().map(move |v| (name.clone(), v.clone())))
            .collect()
    }
}

/// Index over every tenant of one migration run.
#[derive(Debug, Default)]
pub struct ReferenceIndex {
    tenants: IndexMap<String, TenantIndex>,
    users: HashSet<String>,
}

impl ReferenceIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_tenant(&mut self, tenant: &str, base_id: Option<String>) {
        self.tenants.entry(tenant.to_string()).or_default().base_id = base_id;
    }

    pub fn tenant(&self, tenant: &str) -> Option<&TenantIndex> {
        self.tenants.get(tenant)
    }

    pub fn tenant_mut(&mut self, tenant: &str) -> &mut TenantIndex {
        self.tenants.entry(tenant.to_string()).or_default()
    }

    pub fn has_tenant(&self, tenant: &str) -> bool {
        self.tenants.contains_key(tenant)
    }

    pub fn tenant_ids(&self) -> Vec<String> {
        self.tenants.keys().cloned().collect()
    }

    pub fn record_user(&mut self, user_id: &str) {
        self.users.insert(user_id.to_string());
    }

    pub fn has_user(&self, user_id: &str) -> bool {
        self.users.contains(user_id)
    }

    pub fn record_table(&mut self, tenant: &str, table: &Table) {
        self.tenant_mut(tenant).record_table(table);
    }

    pub fn record_column(&mut self, tenant: &str, table_name: &str, column: &Column) {
        self.tenant_mut(tenant).record_column(table_name, column);
    }

    pub fn resolve_table(&self, tenant: &str, name_or_alias: &str) -> Option<&Table> {
        self.tenant(tenant)?.resolve_table(name_or_alias)
    }

    pub fn resolve_column(&self, tenant: &str, table_name: &str, name_or_alias: &str) -> Option<&Column> {
        self.tenant(tenant)?.resolve_column(table_name, name_or_alias)
    }
}
