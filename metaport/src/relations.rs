//! Relation column resolver.
//!
//! Legacy relations name their endpoints by canonical table and column names.
//! Resolution happens when the relations queue drains, after every plain
//! column of the tenant is in the index.

use std::sync::Arc;

use metaport_db::models::{
    Column, ColumnOptions, Junction, RelationOptions, RelationSignature, RelationType, uidt,
};

use crate::context::MigrationCtx;
use crate::errors::{MigrateError, MigrateResult};
use crate::index::TenantIndex;
use crate::legacy::{LegacyRelation, RelationDescriptor};

/// One relation column waiting for its endpoints.
#[derive(Debug, Clone)]
pub struct RelationJob {
    pub tenant: String,
    /// Canonical name of the table that owns the column.
    pub owner: String,
    pub alias: String,
    pub relation_type: RelationType,
    pub descriptor: RelationDescriptor,
    pub system: bool,
}

impl RelationJob {
    pub fn label(&self) -> String {
        format!("{}.{} ({})", self.owner, self.alias, self.relation_type)
    }
}

fn field<'a>(value: &'a Option<String>) -> &'a str {
    value.as_deref().unwrap_or_default()
}

pub(crate) fn table_id(index: &TenantIndex, tenant: &str, name: &str) -> MigrateResult<String> {
    index
        .table_by_name(name)
        .map(|t| t.id.clone())
        .ok_or_else(|| MigrateError::UnresolvedTable {
            tenant: tenant.to_string(),
            name: name.to_string(),
        })
}

pub(crate) fn column_id(index: &TenantIndex, tenant: &str, table: &str, name: &str) -> MigrateResult<String> {
    index
        .column_by_name(table, name)
        .map(|c| c.id.clone())
        .ok_or_else(|| MigrateError::UnresolvedColumn {
            tenant: tenant.to_string(),
            table: table.to_string(),
            name: name.to_string(),
        })
}

/// Endpoint signature of a legacy descriptor, resolved to target ids.
pub(crate) fn signature(
    index: &TenantIndex,
    tenant: &str,
    relation_type: RelationType,
    d: &RelationDescriptor,
) -> MigrateResult<RelationSignature> {
    let junction_table_id = match relation_type {
        RelationType::ManyToMany => Some(table_id(index, tenant, field(&d.vtn))?),
        _ => None,
    };
    Ok(RelationSignature {
        relation_type,
        child_column_id: column_id(index, tenant, field(&d.tn), field(&d.cn))?,
        parent_column_id: column_id(index, tenant, field(&d.rtn), field(&d.rcn))?,
        junction_table_id,
    })
}

/// Whether the legacy relation definitions mark this relation virtual.
///
/// Many-to-many relations are matched through their junction side. Definitions
/// carrying a tenant only match relations of that tenant.
pub fn is_virtual(
    definitions: &[LegacyRelation],
    tenant: &str,
    relation_type: RelationType,
    d: &RelationDescriptor,
) -> bool {
    definitions
        .iter()
        .filter(|r| r.project_id.as_deref().is_none_or(|p| p == tenant))
        .find(|r| match relation_type {
            RelationType::ManyToMany => {
                r.rtn == d.tn && r.rcn == d.cn && r.tn == d.vtn && r.cn == d.vcn
            }
            _ => r.rtn == d.rtn && r.tn == d.tn && r.rcn == d.rcn && r.cn == d.cn,
        })
        .is_some_and(LegacyRelation::is_virtual)
}

fn resolve(ctx: &MigrationCtx, job: &RelationJob) -> MigrateResult<Column> {
    let index = ctx.index.read();
    let tenant = index
        .tenant(&job.tenant)
        .ok_or_else(|| MigrateError::UnresolvedTable {
            tenant: job.tenant.clone(),
            name: job.owner.clone(),
        })?;
    let t = job.tenant.as_str();
    let d = &job.descriptor;

    let owner_id = table_id(tenant, t, &job.owner)?;
    let child_table_id = table_id(tenant, t, field(&d.tn))?;
    let parent_table_id = table_id(tenant, t, field(&d.rtn))?;
    let child_column_id = column_id(tenant, t, field(&d.tn), field(&d.cn))?;
    let parent_column_id = column_id(tenant, t, field(&d.rtn), field(&d.rcn))?;

    let junction = match job.relation_type {
        RelationType::ManyToMany => {
            let vtn = field(&d.vtn);
            Some(Junction {
                table_id: table_id(tenant, t, vtn)?,
                child_column_id: column_id(tenant, t, vtn, field(&d.vcn))?,
                parent_column_id: column_id(tenant, t, vtn, field(&d.vrcn))?,
            })
        }
        _ => None,
    };

    let related_table_id = match job.relation_type {
        RelationType::HasMany => child_table_id,
        _ => parent_table_id,
    };

    Ok(Column {
        table_id: owner_id,
        column_name: None,
        title: job.alias.clone(),
        uidt: uidt::LINK_TO_ANOTHER_RECORD.to_string(),
        system: job.system,
        options: ColumnOptions::Relation(RelationOptions {
            relation_type: job.relation_type,
            child_column_id,
            parent_column_id,
            related_table_id,
            junction,
            fk_index_name: d.fkn.clone(),
            update_rule: d.ur.clone(),
            delete_rule: d.dr.clone(),
            is_virtual: is_virtual(&ctx.relations, t, job.relation_type, d),
        }),
        ..Default::default()
    })
}

/// Creates the relation column and records it under its owning table.
pub async fn create_relation_column(ctx: Arc<MigrationCtx>, job: RelationJob) -> MigrateResult<()> {
    let column = resolve(&ctx, &job)?;
    let column = ctx.insert(column).await?;
    tracing::debug!("created relation column {} on {}", column.title, job.owner);
    ctx.index.write().record_column(&job.tenant, &job.owner, &column);
    Ok(())
}
