//! Deferred operation queues.
//!
//! Actions are enqueued while the legacy tables of a tenant are walked and run
//! only after every table of that tenant exists. The three phases drain in a
//! fixed order, each one fully before the next.

use std::future::Future;

use futures::future::BoxFuture;
use futures::{FutureExt, StreamExt, stream};
use strum::{AsRefStr, Display};

use crate::errors::{MigrateError, MigrateResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr)]
#[strum(serialize_all = "kebab-case")]
pub enum Phase {
    Relations,
    ComputedColumns,
    ViewDefaults,
}

impl Phase {
    pub const ORDER: [Phase; 3] = [Phase::Relations, Phase::ComputedColumns, Phase::ViewDefaults];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DrainMode {
    #[default]
    Sequential,
    /// Up to `n` actions of one queue in flight at once.
    Concurrent(usize),
}

impl DrainMode {
    pub fn from_concurrency(n: usize) -> Self {
        if n <= 1 {
            DrainMode::Sequential
        } else {
            DrainMode::Concurrent(n)
        }
    }
}

type Action = Box<dyn FnOnce() -> BoxFuture<'static, MigrateResult<()>> + Send>;

pub struct Deferred {
    pub tenant: String,
    pub label: String,
    action: Action,
}

impl std::fmt::Debug for Deferred {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Deferred")
            .field("tenant", &self.tenant)
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

#[derive(Debug)]
pub struct DeferredFailure {
    pub phase: Phase,
    pub tenant: String,
    pub label: String,
    pub error: MigrateError,
}

#[derive(Debug)]
pub struct DeferredQueue {
    phase: Phase,
    items: Vec<Deferred>,
}

impl DeferredQueue {
    pub fn new(phase: Phase) -> Self {
        Self {
            phase,
            items: Vec::new(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn enqueue<F, Fut>(&mut self, tenant: &str, label: impl Into<String>, action: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = MigrateResult<()>> + Send + 'static,
    {
        self.items.push(Deferred {
            tenant: tenant.to_string(),
            label: label.into(),
            action: Box::new(move || action().boxed()),
        });
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Runs every queued action. A failing action does not stop the drain;
    /// failures come back in enqueue order.
    pub async fn drain(&mut self, mode: DrainMode) -> Vec<DeferredFailure> {
        let phase = self.phase;
        let items = std::mem::take(&mut self.items);
        tracing::debug!("draining {} queue ({} actions, {:?})", phase, items.len(), mode);

        let outcomes: Vec<(String, String, MigrateResult<()>)> = match mode {
            DrainMode::Sequential => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    let result = (item.action)().await;
                    out.push((item.tenant, item.label, result));
                }
                out
            }
            DrainMode::Concurrent(n) => {
                stream::iter(items.into_iter().map(|item| async move {
                    let result = (item.action)().await;
                    (item.tenant, item.label, result)
                }))
                .buffered(n.max(1))
                .collect()
                .await
            }
        };

        outcomes
            .into_iter()
            .filter_map(|(tenant, label, result)| {
                let error = result.err()?;
                tracing::error!("{} action {} failed for tenant {}: {}", phase, label, tenant, error);
                Some(DeferredFailure {
                    phase,
                    tenant,
                    label,
                    error,
                })
            })
            .collect()
    }
}

/// The three queues of one tenant.
#[derive(Debug)]
pub struct DeferredQueues {
    queues: [DeferredQueue; 3],
}

impl Default for DeferredQueues {
    fn default() -> Self {
        Self {
            queues: Phase::ORDER.map(DeferredQueue::new),
        }
    }
}

impl DeferredQueues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue(&mut self, phase: Phase) -> &mut DeferredQueue {
        let slot = Phase::ORDER.iter().position(|p| *p == phase).unwrap_or_default();
        &mut self.queues[slot]
    }

    pub fn len(&self) -> usize {
        self.queues.iter().map(DeferredQueue::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub async fn drain_all(&mut self, mode: DrainMode) -> Vec<DeferredFailure> {
        let mut failures = Vec::new();
        for queue in self.queues.iter_mut() {
            failures.extend(queue.drain(mode).await);
        }
        failures
    }
}
