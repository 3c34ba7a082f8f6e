use std::sync::Arc;

use metaport_db::models::{Entity, EntityKind};
use metaport_db::{MetaStore, MetaStoreExt};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;

use crate::deferred::{DeferredFailure, DrainMode};
use crate::errors::{MigrateError, MigrateResult};
use crate::formula::FormulaRewriter;
use crate::index::ReferenceIndex;
use crate::legacy::LegacyRelation;
use crate::report::MigrationReport;

/// State shared by every stage of one migration run.
///
/// Index guards are never held across an `.await`: readers copy out what they
/// need, writers record only after the store call succeeded.
pub struct MigrationCtx {
    pub store: Arc<dyn MetaStore>,
    pub rewriter: Arc<dyn FormulaRewriter>,
    pub mode: DrainMode,
    pub index: RwLock<ReferenceIndex>,
    /// Legacy relation definitions, consulted for the virtual flag.
    pub relations: Vec<LegacyRelation>,
    report: Mutex<MigrationReport>,
}

impl MigrationCtx {
    pub fn new(
        store: Arc<dyn MetaStore>,
        rewriter: Arc<dyn FormulaRewriter>,
        mode: DrainMode,
        relations: Vec<LegacyRelation>,
    ) -> Self {
        Self {
            store,
            rewriter,
            mode,
            index: RwLock::new(ReferenceIndex::new()),
            relations,
            report: Mutex::new(MigrationReport::default()),
        }
    }

    pub async fn insert<E: Entity>(&self, entity: E) -> MigrateResult<E> {
        let created = self.store.insert(entity).await?;
        self.report.lock().created(E::KIND);
        Ok(created)
    }

    pub async fn patch<P: Serialize + Sync>(&self, kind: EntityKind, id: &str, patch: &P) -> MigrateResult<()> {
        self.store.patch(kind, id, patch).await?;
        self.report.lock().updated(kind);
        Ok(())
    }

    pub fn skip(&self, collection: &str, reason: impl Into<String>) {
        let reason = reason.into();
        tracing::warn!("skipping {} record: {}", collection, reason);
        self.report.lock().skip(collection, reason);
    }

    pub fn fail(&self, tenant: &str, entity: &str, error: &MigrateError) {
        tracing::error!("failed to migrate {} of tenant {}: {}", entity, tenant, error);
        self.report.lock().fail(tenant, entity, error);
    }

    pub fn deferred_failures(&self, failures: &[DeferredFailure]) {
        let mut report = self.report.lock();
        for failure in failures {
            report.deferred_failure(failure);
        }
    }

    pub fn tenant_done(&self) {
        self.report.lock().tenants += 1;
    }

    pub fn report(&self) -> MigrationReport {
        self.report.lock().clone()
    }
}
