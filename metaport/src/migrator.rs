use std::sync::Arc;

use metaport_db::{LegacySource, MetaStore};
use serde::de::DeserializeOwned;

use crate::accounts::{migrate_memberships, migrate_tenants, migrate_users};
use crate::ancillary::{
    migrate_acl, migrate_audit, migrate_hooks, migrate_plugins, migrate_shared_bases,
    migrate_shared_views,
};
use crate::context::MigrationCtx;
use crate::deferred::DrainMode;
use crate::errors::MigrateResult;
use crate::formula::{AliasSubstitution, FormulaRewriter};
use crate::legacy::{
    LegacyAclRule, LegacyAudit, LegacyHook, LegacyModel, LegacyPlugin, LegacyProject,
    LegacyProjectUser, LegacySharedBase, LegacySharedView, LegacyUser, collections, decode_rows,
};
use crate::report::MigrationReport;
use crate::tables::migrate_tenant_tables;

pub struct MigratorBuilder {
    source: Arc<dyn LegacySource>,
    store: Arc<dyn MetaStore>,
    rewriter: Arc<dyn FormulaRewriter>,
    mode: DrainMode,
}

impl MigratorBuilder {
    pub fn rewriter(mut self, rewriter: Arc<dyn FormulaRewriter>) -> Self {
        self.rewriter = rewriter;
        self
    }

    pub fn drain_mode(mut self, mode: DrainMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn build(self) -> Migrator {
        Migrator {
            source: self.source,
            store: self.store,
            rewriter: self.rewriter,
            mode: self.mode,
        }
    }
}

/// One-shot upgrade of every tenant found in a legacy source.
pub struct Migrator {
    source: Arc<dyn LegacySource>,
    store: Arc<dyn MetaStore>,
    rewriter: Arc<dyn FormulaRewriter>,
    mode: DrainMode,
}

impl Migrator {
    pub fn builder(source: Arc<dyn LegacySource>, store: Arc<dyn MetaStore>) -> MigratorBuilder {
        MigratorBuilder {
            source,
            store,
            rewriter: Arc::new(AliasSubstitution),
            mode: DrainMode::default(),
        }
    }

    async fn load<T: DeserializeOwned>(&self, collection: &str) -> MigrateResult<Vec<T>> {
        let rows = self.source.list(collection).await?;
        tracing::debug!("loaded {} rows from {}", rows.len(), collection);
        Ok(decode_rows(collection, rows))
    }

    /// Runs the whole migration.
    ///
    /// Only a failure to read the legacy source aborts the run; everything
    /// else is recorded in the report and the run moves on.
    pub async fn run(&self) -> MigrateResult<MigrationReport> {
        let projects: Vec<LegacyProject> = self.load(collections::PROJECTS).await?;
        let relations = self.load(collections::RELATIONS).await?;
        let ctx = Arc::new(MigrationCtx::new(
            self.store.clone(),
            self.rewriter.clone(),
            self.mode,
            relations,
        ));

        migrate_users(&ctx, &self.load::<LegacyUser>(collections::USERS).await?).await;
        migrate_tenants(&ctx, &projects).await;
        migrate_memberships(&ctx, &self.load::<LegacyProjectUser>(collections::PROJECT_USERS).await?).await;

        let models: Vec<LegacyModel> = self.load(collections::MODELS).await?;
        let tenants = ctx.index.read().tenant_ids();
        for tenant in tenants {
            let owned: Vec<LegacyModel> = models
                .iter()
                .filter(|m| m.project_id.as_deref() == Some(tenant.as_str()))
                .cloned()
                .collect();
            tracing::info!("migrating tenant {} ({} models)", tenant, owned.len());
            if let Err(e) = migrate_tenant_tables(&ctx, &tenant, &owned).await {
                ctx.fail(&tenant, "tables", &e);
            }
            ctx.tenant_done();
        }

        for model in &models {
            let known = model
                .project_id
                .as_deref()
                .is_some_and(|p| ctx.index.read().has_tenant(p));
            if !known {
                ctx.skip(
                    collections::MODELS,
                    format!("model {} of unknown tenant {:?}", model.title(), model.project_id),
                );
            }
        }

        migrate_acl(&ctx, &self.load::<LegacyAclRule>(collections::DISABLED_MODELS_FOR_ROLE).await?).await;
        migrate_shared_views(&ctx, &self.load::<LegacySharedView>(collections::SHARED_VIEWS).await?).await;
        migrate_shared_bases(&ctx, &self.load::<LegacySharedBase>(collections::SHARED_BASES).await?).await;
        migrate_plugins(&ctx, &self.load::<LegacyPlugin>(collections::PLUGINS).await?).await;
        migrate_hooks(&ctx, &self.load::<LegacyHook>(collections::HOOKS).await?).await;
        migrate_audit(&ctx, &self.load::<LegacyAudit>(collections::AUDIT).await?).await;

        let report = ctx.report();
        tracing::info!(
            "migration finished: {} tenants, {} skipped, {} failed",
            report.tenants,
            report.skipped.len(),
            report.failures.len()
        );
        Ok(report)
    }
}
