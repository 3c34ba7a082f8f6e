//! Sorts and filters of views and hooks.
//!
//! An entry whose field does not resolve is kept with no column.

use metaport_db::models::{Filter, Sort, SortDirection};

use crate::context::MigrationCtx;
use crate::errors::MigrateResult;
use crate::index::ViewRef;
use crate::legacy::LegacyFilter;
use crate::ops;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldLookup {
    AliasFirst,
    NameFirst,
}

pub fn resolve_field(ctx: &MigrationCtx, tenant: &str, table: &str, field: Option<&str>, lookup: FieldLookup) -> Option<String> {
    let field = field.filter(|f| !f.is_empty())?;
    let index = ctx.index.read();
    let tenant = index.tenant(tenant)?;
    let column = match lookup {
        FieldLookup::AliasFirst => tenant
            .column_by_alias(table, field)
            .or_else(|| tenant.column_by_name(table, field)),
        FieldLookup::NameFirst => tenant.resolve_column(table, field),
    };
    column.map(|c| c.id.clone())
}

fn direction(order: Option<&str>) -> SortDirection {
    match order {
        Some("-") => SortDirection::Desc,
        _ => SortDirection::Asc,
    }
}

fn filter(column_id: Option<String>, f: &LegacyFilter) -> Filter {
    Filter {
        column_id,
        comparison_op: f.op.as_deref().and_then(ops::translate),
        logical_op: ops::logical(f.logic_op.as_deref()),
        value: f.value.clone(),
        ..Default::default()
    }
}

fn unresolved(tenant: &str, table: &str, field: Option<&str>) {
    tracing::warn!(
        "field {:?} of {} in tenant {} did not resolve, keeping entry without column",
        field,
        table,
        tenant
    );
}

/// Sorts and filters stored in a view's parameter blob.
pub async fn migrate_view_params(ctx: &MigrationCtx, tenant: &str, table: &str, view: &ViewRef) -> MigrateResult<()> {
    let view_id = view.view.id.clone();
    for sort in &view.params.sort_list {
        let field = sort.field.as_deref();
        let column_id = resolve_field(ctx, tenant, table, field, FieldLookup::AliasFirst);
        if column_id.is_none() {
            unresolved(tenant, table, field);
        }
        ctx.insert(Sort {
            view_id: view_id.clone(),
            column_id,
            direction: direction(sort.order.as_deref()),
            ..Default::default()
        })
        .await?;
    }
    for f in &view.params.filters {
        let field = f.field.as_deref();
        let column_id = resolve_field(ctx, tenant, table, field, FieldLookup::AliasFirst);
        if column_id.is_none() {
            unresolved(tenant, table, field);
        }
        ctx.insert(Filter {
            view_id: Some(view_id.clone()),
            ..filter(column_id, f)
        })
        .await?;
    }
    Ok(())
}

/// Filters from a hook's condition blob.
pub async fn migrate_hook_filters(
    ctx: &MigrationCtx,
    tenant: &str,
    table: &str,
    hook_id: &str,
    filters: &[LegacyFilter],
) -> MigrateResult<()> {
    for f in filters {
        let field = f.field.as_deref();
        let column_id = resolve_field(ctx, tenant, table, field, FieldLookup::NameFirst);
        if column_id.is_none() {
            unresolved(tenant, table, field);
        }
        ctx.insert(Filter {
            hook_id: Some(hook_id.to_string()),
            ..filter(column_id, f)
        })
        .await?;
    }
    Ok(())
}
