use std::collections::BTreeMap;

use metaport_db::models::EntityKind;
use serde::Serialize;

use crate::deferred::DeferredFailure;
use crate::errors::MigrateError;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedRecord {
    pub collection: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailedEntity {
    pub tenant: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,
    pub entity: String,
    pub code: String,
    pub message: String,
}

/// Outcome of one migration run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MigrationReport {
    pub tenants: usize,
    pub created: BTreeMap<String, usize>,
    pub updated: BTreeMap<String, usize>,
    pub skipped: Vec<SkippedRecord>,
    pub failures: Vec<FailedEntity>,
}

impl MigrationReport {
    pub fn created(&mut self, kind: EntityKind) {
        *self.created.entry(kind.to_string()).or_default() += 1;
    }

    pub fn updated(&mut self, kind: EntityKind) {
        *self.updated.entry(kind.to_string()).or_default() += 1;
    }

    pub fn skip(&mut self, collection: &str, reason: impl Into<String>) {
        self.skipped.push(SkippedRecord {
            collection: collection.to_string(),
            reason: reason.into(),
        });
    }

    pub fn fail(&mut self, tenant: &str, entity: &str, error: &MigrateError) {
        self.failures.push(FailedEntity {
            tenant: tenant.to_string(),
            phase: None,
            entity: entity.to_string(),
            code: error.code().to_string(),
            message: error.to_string(),
        });
    }

    pub fn deferred_failure(&mut self, failure: &DeferredFailure) {
        self.failures.push(FailedEntity {
            tenant: failure.tenant.clone(),
            phase: Some(failure.phase.to_string()),
            entity: failure.label.clone(),
            code: failure.error.code().to_string(),
            message: failure.error.to_string(),
        });
    }

    pub fn created_count(&self, kind: EntityKind) -> usize {
        self.created.get(kind.as_ref()).copied().unwrap_or_default()
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}
