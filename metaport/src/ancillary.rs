//! Records that hang off migrated tables and views: role visibility, shared
//! view and base credentials, plugins, webhooks and the audit log.
//!
//! Each runs after every tenant's table pass. Orphans are skipped.

use metaport_db::models::{
    Audit, EntityKind, Hook, Plugin, RoleVisibility, TenantPatch, ViewPatch,
};

use crate::context::MigrationCtx;
use crate::errors::MigrateResult;
use crate::legacy::{
    LegacyAclRule, LegacyAudit, LegacyHook, LegacyPlugin, LegacySharedBase, LegacySharedView,
    collections,
};
use crate::params::migrate_hook_filters;

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

/// View id a role rule points at.
fn acl_view(ctx: &MigrationCtx, tenant: &str, rule: &LegacyAclRule, title: &str) -> Option<String> {
    let index = ctx.index.read();
    let t = index.tenant(tenant)?;
    let view = if rule.model_type.as_deref() == Some("vtable") {
        let parent = non_empty(&rule.parent_model_title)?;
        let table = t.resolve_table(parent)?;
        t.view(&table.table_name, title)?
    } else {
        let alias = t.table_by_name(title).map(|table| table.title.clone());
        alias
            .and_then(|alias| t.view(title, &alias))
            .or_else(|| t.view(title, title))?
    };
    Some(view.view.id.clone())
}

pub async fn migrate_acl(ctx: &MigrationCtx, rules: &[LegacyAclRule]) {
    for rule in rules {
        let Some(tenant) = non_empty(&rule.project_id) else {
            ctx.skip(collections::DISABLED_MODELS_FOR_ROLE, "rule without project");
            continue;
        };
        let Some(title) = non_empty(&rule.title) else {
            ctx.skip(collections::DISABLED_MODELS_FOR_ROLE, "rule without title");
            continue;
        };
        let Some(view_id) = acl_view(ctx, tenant, rule, title) else {
            ctx.skip(
                collections::DISABLED_MODELS_FOR_ROLE,
                format!("no view {title} in tenant {tenant}"),
            );
            continue;
        };
        let visibility = RoleVisibility {
            view_id,
            role: rule.role.clone().unwrap_or_default(),
            disabled: rule.disabled.unwrap_or_default(),
            stamps: (&rule.stamps).into(),
            ..Default::default()
        };
        if let Err(e) = ctx.insert(visibility).await {
            ctx.fail(tenant, &format!("role visibility {title}"), &e);
        }
    }
}

/// Shared table links point at the default view; others name the view.
fn shared_view(ctx: &MigrationCtx, tenant: &str, shared: &LegacySharedView) -> Option<String> {
    let index = ctx.index.read();
    let t = index.tenant(tenant)?;
    let table = t.resolve_table(non_empty(&shared.model_name)?)?;
    let title = match shared.view_type.as_deref() {
        None | Some("table") | Some("view") => table.title.as_str(),
        Some(_) => non_empty(&shared.view_name)?,
    };
    t.view(&table.table_name, title).map(|v| v.view.id.clone())
}

pub async fn migrate_shared_views(ctx: &MigrationCtx, shared: &[LegacySharedView]) {
    for s in shared {
        let Some(tenant) = non_empty(&s.project_id) else {
            ctx.skip(collections::SHARED_VIEWS, "shared view without project");
            continue;
        };
        let Some(view_id) = shared_view(ctx, tenant, s) else {
            ctx.skip(
                collections::SHARED_VIEWS,
                format!("shared view {:?}/{:?} not found in tenant {}", s.model_name, s.view_name, tenant),
            );
            continue;
        };
        let patch = ViewPatch {
            uuid: s.view_id.clone(),
            password: s.password.clone(),
            ..Default::default()
        };
        if let Err(e) = ctx.patch(EntityKind::View, &view_id, &patch).await {
            ctx.fail(tenant, &format!("shared view {view_id}"), &e);
        }
    }
}

pub async fn migrate_shared_bases(ctx: &MigrationCtx, shared: &[LegacySharedBase]) {
    for s in shared {
        let Some(tenant) = non_empty(&s.project_id).filter(|t| ctx.index.read().has_tenant(t)) else {
            ctx.skip(collections::SHARED_BASES, format!("tenant {:?} not migrated", s.project_id));
            continue;
        };
        let patch = TenantPatch {
            uuid: s.shared_base_id.clone(),
            password: s.password.clone(),
            roles: s.roles.clone(),
        };
        if let Err(e) = ctx.patch(EntityKind::Tenant, tenant, &patch).await {
            ctx.fail(tenant, "shared base", &e);
        }
    }
}

pub async fn migrate_plugins(ctx: &MigrationCtx, plugins: &[LegacyPlugin]) {
    for p in plugins {
        let plugin = Plugin {
            title: p.title.clone(),
            description: p.description.clone(),
            active: p.active,
            version: p.version.clone(),
            docs: p.docs.clone(),
            status: p.status.clone(),
            status_details: p.status_details.clone(),
            logo: p.logo.clone(),
            tags: p.tags.clone(),
            category: p.category.clone(),
            input: p.input.clone(),
            input_schema: p.input_schema.clone(),
            creator: p.creator.clone(),
            creator_website: p.creator_website.clone(),
            price: p.price.clone(),
            stamps: (&p.stamps).into(),
            ..Default::default()
        };
        if let Err(e) = ctx.insert(plugin).await {
            ctx.fail("-", &format!("plugin {:?}", p.title), &e);
        }
    }
}

async fn migrate_hook(ctx: &MigrationCtx, tenant: &str, table: &str, table_id: String, h: &LegacyHook) -> MigrateResult<()> {
    let hook = ctx
        .insert(Hook {
            tenant_id: tenant.to_string(),
            table_id,
            title: h.title.clone(),
            description: h.description.clone(),
            env: h.env.clone(),
            hook_type: h.hook_type.clone(),
            event: h.event.clone(),
            operation: h.operation.clone(),
            is_async: h.is_async,
            payload: h.payload.clone(),
            url: h.url.clone(),
            headers: h.headers.clone(),
            condition: h.has_condition(),
            notification: h.notification.clone(),
            retries: h.retries,
            retry_interval: h.retry_interval,
            timeout: h.timeout,
            active: h.active,
            stamps: (&h.stamps).into(),
            ..Default::default()
        })
        .await?;
    migrate_hook_filters(ctx, tenant, table, &hook.id, &h.condition_filters()).await
}

pub async fn migrate_hooks(ctx: &MigrationCtx, hooks: &[LegacyHook]) {
    for h in hooks {
        let Some(tenant) = non_empty(&h.project_id) else {
            ctx.skip(collections::HOOKS, "hook without project");
            continue;
        };
        let table_name = h.tn.clone().unwrap_or_default();
        let table_id = {
            let index = ctx.index.read();
            index
                .tenant(tenant)
                .and_then(|t| t.table_by_name(&table_name))
                .map(|t| t.id.clone())
        };
        let Some(table_id) = table_id else {
            ctx.skip(collections::HOOKS, format!("table {table_name:?} not found in tenant {tenant}"));
            continue;
        };
        if let Err(e) = migrate_hook(ctx, tenant, &table_name, table_id, h).await {
            ctx.fail(tenant, &format!("hook {:?}", h.title), &e);
        }
    }
}

/// The model name as alias, then as canonical name, then the legacy id of
/// the model the entry points at. Entries without a model name have no table.
fn audit_table(ctx: &MigrationCtx, tenant: &str, model_name: &str, model_id: Option<&str>) -> Option<String> {
    let index = ctx.index.read();
    let t = index.tenant(tenant)?;
    t.table_by_alias(model_name)
        .or_else(|| t.table_by_name(model_name))
        .or_else(|| t.table_by_legacy_id(model_id?))
        .map(|table| table.id.clone())
}

pub async fn migrate_audit(ctx: &MigrationCtx, entries: &[LegacyAudit]) {
    for a in entries {
        let Some(tenant) = non_empty(&a.project_id).filter(|t| ctx.index.read().has_tenant(t)) else {
            ctx.skip(collections::AUDIT, format!("tenant {:?} not migrated", a.project_id));
            continue;
        };
        let table_id = non_empty(&a.model_name).and_then(|model| {
            let found = audit_table(ctx, tenant, model, non_empty(&a.model_id));
            if found.is_none() {
                tracing::debug!("audit entry keeps no table: {} not found in {}", model, tenant);
            }
            found
        });
        let audit = Audit {
            tenant_id: tenant.to_string(),
            table_id,
            user: a.user.clone(),
            ip: a.ip.clone(),
            row_id: a.model_id.clone(),
            op_type: a.op_type.clone(),
            op_sub_type: a.op_sub_type.clone(),
            status: a.status.clone(),
            description: a.description.clone(),
            details: a.details.clone(),
            stamps: (&a.stamps).into(),
            ..Default::default()
        };
        if let Err(e) = ctx.insert(audit).await {
            ctx.fail(tenant, "audit entry", &e);
        }
    }
}
