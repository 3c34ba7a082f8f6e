//! Lookup, rollup and formula columns.
//!
//! These drain after the relations queue, so every relation column of the
//! tenant is already in the index when a lookup or rollup looks for the one it
//! rides on.

use std::sync::Arc;

use metaport_db::MetaStoreExt;
use metaport_db::models::{
    Column, ColumnOptions, FormulaOptions, LookupOptions, RelationType, RollupOptions, uidt,
};

use crate::context::MigrationCtx;
use crate::errors::{MigrateError, MigrateResult};
use crate::index::TenantIndex;
use crate::legacy::{FormulaDescriptor, LookupDescriptor, RelationDescriptor, RollupDescriptor};
use crate::relations::{column_id, signature, table_id};

pub const INVALID_FORMULA: &str = "Invalid formula";

#[derive(Debug, Clone)]
pub enum ComputedKind {
    Lookup(LookupDescriptor),
    Rollup(RollupDescriptor),
    Formula(FormulaDescriptor),
}

#[derive(Debug, Clone)]
pub struct ComputedJob {
    pub tenant: String,
    /// Canonical name of the owning table.
    pub owner: String,
    pub alias: String,
    pub kind: ComputedKind,
}

impl ComputedJob {
    pub fn label(&self) -> String {
        let kind = match self.kind {
            ComputedKind::Lookup(_) => "lookup",
            ComputedKind::Rollup(_) => "rollup",
            ComputedKind::Formula(_) => "formula",
        };
        format!("{}.{} ({})", self.owner, self.alias, kind)
    }
}

/// Id of the relation column on `owner` whose endpoints match the descriptor.
/// The first match in creation order wins. An unknown relation token matches
/// nothing.
fn find_relation(
    index: &TenantIndex,
    job: &ComputedJob,
    relation_type: Option<&str>,
    d: &RelationDescriptor,
) -> MigrateResult<String> {
    let not_found = || MigrateError::RelationNotFound {
        table: job.owner.clone(),
        column: job.alias.clone(),
    };
    let relation_type: RelationType = relation_type
        .and_then(|t| t.parse().ok())
        .ok_or_else(not_found)?;
    let wanted = signature(index, &job.tenant, relation_type, d)?;
    index
        .columns(&job.owner)
        .find(|c| c.relation().is_some_and(|r| r.signature().matches(&wanted)))
        .map(|c| c.id.clone())
        .ok_or_else(not_found)
}

fn target_column(index: &TenantIndex, job: &ComputedJob, table: &Option<String>, column: &Option<String>) -> MigrateResult<String> {
    column_id(
        index,
        &job.tenant,
        table.as_deref().unwrap_or_default(),
        column.as_deref().unwrap_or_default(),
    )
}

fn resolve_dependent(ctx: &MigrationCtx, job: &ComputedJob) -> MigrateResult<(String, ColumnOptions)> {
    let index = ctx.index.read();
    let tenant = index.tenant(&job.tenant).ok_or_else(|| MigrateError::UnresolvedTable {
        tenant: job.tenant.clone(),
        name: job.owner.clone(),
    })?;
    let owner_id = table_id(tenant, &job.tenant, &job.owner)?;
    let options = match &job.kind {
        ComputedKind::Lookup(lk) => {
            let lookup_column_id = target_column(tenant, job, &lk.ltn, &lk.lcn)?;
            let relation_column_id = find_relation(tenant, job, lk.relation_type.as_deref(), &lk.relation)?;
            ColumnOptions::Lookup(LookupOptions {
                relation_column_id,
                lookup_column_id,
            })
        }
        ComputedKind::Rollup(rl) => {
            let rollup_column_id = target_column(tenant, job, &rl.rltn, &rl.rlcn)?;
            let relation_column_id = find_relation(tenant, job, rl.relation_type.as_deref(), &rl.relation)?;
            ColumnOptions::Rollup(RollupOptions {
                relation_column_id,
                rollup_column_id,
                rollup_function: rl.function.clone(),
            })
        }
        ComputedKind::Formula(_) => ColumnOptions::Plain,
    };
    Ok((owner_id, options))
}

/// A formula never fails to migrate: a rewrite failure or a legacy error
/// becomes an error-marked column keeping the raw text.
fn formula_options(ctx: &MigrationCtx, job: &ComputedJob, f: &FormulaDescriptor, columns: &[Column]) -> ColumnOptions {
    let raw = f.value.clone().unwrap_or_default();
    if let Some(error) = f.legacy_error() {
        return ColumnOptions::Formula(FormulaOptions {
            formula: None,
            formula_raw: raw,
            error: Some(error),
        });
    }
    match ctx.rewriter.rewrite(&raw, columns) {
        Ok(formula) => ColumnOptions::Formula(FormulaOptions {
            formula: Some(formula),
            formula_raw: raw,
            error: None,
        }),
        Err(e) => {
            tracing::warn!("formula {} of tenant {} kept as invalid: {}", job.label(), job.tenant, e);
            ColumnOptions::Formula(FormulaOptions {
                formula: None,
                formula_raw: raw,
                error: Some(INVALID_FORMULA.to_string()),
            })
        }
    }
}

pub async fn create_computed_column(ctx: Arc<MigrationCtx>, job: ComputedJob) -> MigrateResult<()> {
    let (table_id, mut options) = resolve_dependent(&ctx, &job)?;
    let column_uidt = match &job.kind {
        ComputedKind::Lookup(_) => uidt::LOOKUP,
        ComputedKind::Rollup(_) => uidt::ROLLUP,
        ComputedKind::Formula(f) => {
            let columns = ctx.store.list_columns(&table_id).await?;
            options = formula_options(&ctx, &job, f, &columns);
            uidt::FORMULA
        }
    };
    let column = ctx
        .insert(Column {
            table_id,
            column_name: None,
            title: job.alias.clone(),
            uidt: column_uidt.to_string(),
            system: false,
            options,
            ..Default::default()
        })
        .await?;
    tracing::debug!("created {} column {} on {}", column.uidt, column.title, job.owner);
    ctx.index.write().record_column(&job.tenant, &job.owner, &column);
    Ok(())
}
