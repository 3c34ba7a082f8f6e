//! Tenants, their data sources, users and memberships. These run before the
//! table pass; everything else refers to them.

use metaport_db::models::{Base, Tenant, TenantUser, User};
use serde_json::Value;

use crate::context::MigrationCtx;
use crate::errors::MigrateResult;
use crate::legacy::{
    LegacyProject, LegacyProjectUser, LegacyUser, ProjectConfig, collections, loose, parse_blob,
};

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

fn inflection(db: &Value, key: &str) -> Option<String> {
    db.pointer(&format!("/meta/inflection/{key}"))
        .cloned()
        .and_then(loose::scalar_to_string)
}

async fn migrate_tenant(ctx: &MigrationCtx, id: &str, project: &LegacyProject) -> MigrateResult<()> {
    let config: ProjectConfig = parse_blob(&project.config, "project config");
    let prefix = config.prefix.clone().filter(|p| !p.is_empty());
    let is_meta = prefix.is_some();
    let tenant = ctx
        .insert(Tenant {
            id: id.to_string(),
            title: project.title.clone().or_else(|| config.title.clone()),
            prefix,
            is_meta,
            stamps: (&project.stamps).into(),
            ..Default::default()
        })
        .await?;

    let mut base_id = None;
    for db in config.databases() {
        let base = ctx
            .insert(Base {
                tenant_id: tenant.id.clone(),
                client: db.get("client").cloned().and_then(loose::scalar_to_string),
                inflection_column: inflection(&db, "cn"),
                inflection_table: inflection(&db, "tn"),
                config: db,
                is_meta,
                ..Default::default()
            })
            .await?;
        base_id.get_or_insert(base.id);
    }
    if base_id.is_none() {
        tracing::warn!("tenant {} has no configured data source", tenant.id);
    }
    tracing::info!("migrated tenant {} ({:?})", tenant.id, tenant.title);
    ctx.index.write().record_tenant(&tenant.id, base_id);
    Ok(())
}

pub async fn migrate_tenants(ctx: &MigrationCtx, projects: &[LegacyProject]) {
    for project in projects {
        let Some(id) = non_empty(&project.id) else {
            ctx.skip(collections::PROJECTS, "project without id");
            continue;
        };
        if let Err(e) = migrate_tenant(ctx, id, project).await {
            ctx.fail(id, "tenant", &e);
        }
    }
}

fn user(id: &str, u: &LegacyUser) -> User {
    User {
        id: id.to_string(),
        email: u.email.clone(),
        password: u.password.clone(),
        salt: u.salt.clone(),
        firstname: u.firstname.clone(),
        lastname: u.lastname.clone(),
        username: u.username.clone(),
        roles: u.roles.clone(),
        email_verified: u.email_verified,
        email_verification_token: u.email_verification_token.clone(),
        refresh_token: u.refresh_token.clone(),
        invite_token: u.invite_token.clone(),
        invite_token_expires: u.invite_token_expires.clone(),
        reset_password_token: u.reset_password_token.clone(),
        reset_password_expires: u.reset_password_expires.clone(),
        stamps: (&u.stamps).into(),
    }
}

pub async fn migrate_users(ctx: &MigrationCtx, users: &[LegacyUser]) {
    for u in users {
        let Some(id) = non_empty(&u.id) else {
            ctx.skip(collections::USERS, "user without id");
            continue;
        };
        match ctx.insert(user(id, u)).await {
            Ok(created) => ctx.index.write().record_user(&created.id),
            Err(e) => ctx.fail("-", &format!("user {id}"), &e),
        }
    }
}

pub async fn migrate_memberships(ctx: &MigrationCtx, memberships: &[LegacyProjectUser]) {
    for m in memberships {
        let (Some(tenant), Some(user)) = (non_empty(&m.project_id), non_empty(&m.user_id)) else {
            ctx.skip(collections::PROJECT_USERS, "membership without project or user");
            continue;
        };
        let known = {
            let index = ctx.index.read();
            (index.has_tenant(tenant), index.has_user(user))
        };
        match known {
            (false, _) => {
                ctx.skip(collections::PROJECT_USERS, format!("tenant {tenant} not migrated"));
                continue;
            }
            (_, false) => {
                ctx.skip(collections::PROJECT_USERS, format!("user {user} not migrated"));
                continue;
            }
            _ => {}
        }
        let membership = TenantUser {
            tenant_id: tenant.to_string(),
            user_id: user.to_string(),
            roles: m.roles.clone(),
            stamps: (&m.stamps).into(),
            ..Default::default()
        };
        if let Err(e) = ctx.insert(membership).await {
            ctx.fail(tenant, &format!("membership of {user}"), &e);
        }
    }
}
