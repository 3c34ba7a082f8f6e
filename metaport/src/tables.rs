//! Per-tenant table pass.
//!
//! Tables and their plain columns are created immediately. Relation columns,
//! computed columns and views are queued and drained at the end of the pass,
//! after which the sorts and filters of every created view are migrated.

use std::collections::HashSet;
use std::sync::Arc;

use metaport_db::models::{Column, ColumnOptions, Stamps, Table, TableKind, uidt};

use crate::computed::{ComputedJob, ComputedKind, create_computed_column};
use crate::context::MigrationCtx;
use crate::deferred::{DeferredQueues, Phase};
use crate::errors::MigrateResult;
use crate::legacy::{LegacyColumn, LegacyModel, ModelMeta, collections};
use crate::naming::unique_alias;
use crate::params::migrate_view_params;
use crate::relations::{RelationJob, create_relation_column};
use crate::views::{ViewJob, ViewScope, create_view};

fn plain_column(table_id: &str, meta: &ModelMeta, legacy: &LegacyColumn) -> Column {
    let name = legacy.cn.clone().unwrap_or_default();
    let title = legacy.alias.clone().unwrap_or_else(|| name.clone());
    let is_fk = meta.is_foreign_key(&name);
    let column_uidt = match legacy.uidt.as_deref() {
        _ if is_fk => uidt::FOREIGN_KEY.to_string(),
        Some(uidt::RATING) => uidt::NUMBER.to_string(),
        Some(other) => other.to_string(),
        None => String::new(),
    };
    Column {
        table_id: table_id.to_string(),
        column_name: Some(name),
        title,
        uidt: column_uidt,
        system: is_fk,
        options: if is_fk {
            ColumnOptions::ForeignKey
        } else {
            ColumnOptions::Plain
        },
        meta: legacy.extra.clone(),
        ..Default::default()
    }
}

async fn create_table(ctx: &MigrationCtx, tenant: &str, base_id: &str, model: &LegacyModel) -> MigrateResult<Table> {
    let table = ctx
        .insert(Table {
            tenant_id: tenant.to_string(),
            base_id: base_id.to_string(),
            table_name: model.title().to_string(),
            title: model.alias().to_string(),
            kind: match model.model_type.as_deref() {
                Some("view") => TableKind::View,
                _ => TableKind::Table,
            },
            order: model.order,
            mm: model.mm.unwrap_or_default(),
            stamps: (&model.stamps).into(),
            ..Default::default()
        })
        .await?;
    let mut index = ctx.index.write();
    let entry = index.tenant_mut(tenant);
    entry.record_table(&table);
    if let Some(id) = &model.id {
        entry.record_legacy_model(id, &table.table_name);
    }
    Ok(table)
}

/// Creates the table and its plain columns, then queues everything that may
/// reference tables not created yet.
async fn migrate_table(
    ctx: &Arc<MigrationCtx>,
    queues: &mut DeferredQueues,
    tenant: &str,
    base_id: &str,
    model: &LegacyModel,
) -> MigrateResult<()> {
    let table = create_table(ctx, tenant, base_id, model).await?;
    let meta = model.model_meta();
    tracing::debug!(
        "table {} ({}): {} columns, {} virtual",
        table.table_name,
        table.title,
        meta.columns.len(),
        meta.v.items.len()
    );
    for error in &meta.v.rejected {
        ctx.skip(
            collections::MODELS,
            format!("undecodable virtual column on {} of tenant {}: {}", table.table_name, tenant, error),
        );
    }

    for legacy in &meta.columns {
        if legacy.cn.is_none() {
            ctx.skip(
                collections::MODELS,
                format!("column without name on {} of tenant {}", table.table_name, tenant),
            );
            continue;
        }
        let column = ctx.insert(plain_column(&table.id, &meta, legacy)).await?;
        ctx.index.write().record_column(tenant, &table.table_name, &column);
    }

    let mut aliases: HashSet<String> = meta
        .columns
        .iter()
        .filter_map(|c| c.alias.clone().or_else(|| c.cn.clone()))
        .chain(meta.v.items.iter().map(|v| v.alias().to_string()))
        .collect();

    for v in &meta.v.items {
        if let Some((relation_type, descriptor)) = v.relation() {
            let job = RelationJob {
                tenant: tenant.to_string(),
                owner: table.table_name.clone(),
                alias: v.alias().to_string(),
                relation_type,
                descriptor: descriptor.clone(),
                system: false,
            };
            let ctx = ctx.clone();
            queues
                .queue(Phase::Relations)
                .enqueue(tenant, job.label(), move || create_relation_column(ctx, job));
            continue;
        }
        let kind = if let Some(lk) = &v.lk {
            ComputedKind::Lookup(lk.clone())
        } else if let Some(rl) = &v.rl {
            ComputedKind::Rollup(rl.clone())
        } else if let Some(formula) = &v.formula {
            ComputedKind::Formula(formula.clone())
        } else {
            ctx.skip(
                collections::MODELS,
                format!("virtual column {} on {} has no known kind", v.alias(), table.table_name),
            );
            continue;
        };
        let job = ComputedJob {
            tenant: tenant.to_string(),
            owner: table.table_name.clone(),
            alias: v.alias().to_string(),
            kind,
        };
        let ctx = ctx.clone();
        queues
            .queue(Phase::ComputedColumns)
            .enqueue(tenant, job.label(), move || create_computed_column(ctx, job));
    }

    for hm in meta.implicit_has_many() {
        let base = format!("{}List", hm.tn.as_deref().unwrap_or_default());
        let alias = unique_alias(aliases.iter().map(String::as_str), &base);
        aliases.insert(alias.clone());
        let job = RelationJob {
            tenant: tenant.to_string(),
            owner: table.table_name.clone(),
            alias,
            relation_type: metaport_db::models::RelationType::HasMany,
            descriptor: hm.clone(),
            system: true,
        };
        let ctx = ctx.clone();
        queues
            .queue(Phase::Relations)
            .enqueue(tenant, job.label(), move || create_relation_column(ctx, job));
    }

    let job = ViewJob {
        tenant: tenant.to_string(),
        table: Some(table.table_name.clone()),
        title: None,
        show_as: Some("grid".to_string()),
        order: model.view_order,
        scope: ViewScope::TableDefault,
        params: model.query_params(),
        stamps: Stamps::default(),
    };
    let ctx = ctx.clone();
    queues
        .queue(Phase::ViewDefaults)
        .enqueue(tenant, job.label(), move || create_view(ctx, job));
    Ok(())
}

fn queue_declared_view(ctx: &Arc<MigrationCtx>, queues: &mut DeferredQueues, tenant: &str, model: &LegacyModel) {
    let job = ViewJob {
        tenant: tenant.to_string(),
        table: model.parent_model_title.clone(),
        title: model.title.clone(),
        show_as: model.show_as.clone(),
        order: model.view_order,
        scope: ViewScope::Declared,
        params: model.query_params(),
        stamps: (&model.stamps).into(),
    };
    let ctx = ctx.clone();
    queues
        .queue(Phase::ViewDefaults)
        .enqueue(tenant, job.label(), move || create_view(ctx, job));
}

/// Migrates every table, column and view of one tenant.
///
/// Failures of queued actions are recorded in the report; an error returned
/// here aborts the rest of this tenant.
pub async fn migrate_tenant_tables(ctx: &Arc<MigrationCtx>, tenant: &str, models: &[LegacyModel]) -> MigrateResult<()> {
    let base_id = ctx.index.read().tenant(tenant).and_then(|t| t.base_id.clone());
    let Some(base_id) = base_id else {
        for model in models {
            ctx.skip(
                collections::MODELS,
                format!("model {} of tenant {} has no data source", model.title(), tenant),
            );
        }
        return Ok(());
    };

    let mut queues = DeferredQueues::new();
    for model in models.iter().filter(|m| m.is_table()) {
        if model.title().is_empty() {
            ctx.skip(collections::MODELS, format!("untitled model in tenant {}", tenant));
            continue;
        }
        migrate_table(ctx, &mut queues, tenant, &base_id, model).await?;
    }
    for model in models.iter().filter(|m| m.model_type.as_deref() == Some("vtable")) {
        queue_declared_view(ctx, &mut queues, tenant, model);
    }

    tracing::info!("tenant {}: draining {} deferred actions", tenant, queues.len());
    let failures = queues.drain_all(ctx.mode).await;
    ctx.deferred_failures(&failures);

    let views = ctx.index.read().tenant(tenant).map(|t| t.views()).unwrap_or_default();
    for (table, view) in &views {
        migrate_view_params(ctx, tenant, table, view).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_plain_column_marks_foreign_keys_and_ratings() {
        let meta: ModelMeta = serde_json::from_value(json!({
            "columns": [
                {"cn": "customer_id", "_cn": "CustomerId", "uidt": "Number", "dt": "int"},
                {"cn": "stars", "_cn": "Stars", "uidt": "Rating"}
            ],
            "belongsTo": [{"tn": "orders", "cn": "customer_id", "rtn": "customers", "rcn": "id"}]
        }))
        .unwrap();

        let fk = plain_column("t1", &meta, &meta.columns[0]);
        assert_eq!(fk.uidt, uidt::FOREIGN_KEY);
        assert!(fk.system);
        assert_eq!(fk.options, ColumnOptions::ForeignKey);
        assert_eq!(fk.meta["dt"], "int");
        assert_eq!(fk.title, "CustomerId");

        let rating = plain_column("t1", &meta, &meta.columns[1]);
        assert_eq!(rating.uidt, uidt::NUMBER);
        assert!(!rating.system);
    }
}
