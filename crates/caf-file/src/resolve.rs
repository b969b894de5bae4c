//! Pinning and fan-out over an ordered list of storages.
//!
//! Every backend call produces an explicit outcome. The public handle API
//! folds a probe fault into a miss and swallows delete failures, but the full
//! outcomes are kept here so callers can tell "absent" from "faulted".

use std::fmt;
use std::sync::Arc;

use caf_store::{Storage, StorageError};
use caf_types::ContentId;
use tracing::{debug, warn};

/// Outcome of asking one backend whether it holds an id.
#[derive(Debug)]
pub enum Probe {
    Hit,
    Miss,
    /// The existence check itself failed.
    Fault(StorageError),
}

impl Probe {
    pub fn is_hit(&self) -> bool {
        matches!(self, Self::Hit)
    }

    pub fn is_fault(&self) -> bool {
        matches!(self, Self::Fault(_))
    }
}

/// A probe outcome tagged with the backend that produced it.
pub struct ProbeReport {
    pub storage: Arc<dyn Storage>,
    pub probe: Probe,
}

impl fmt::Debug for ProbeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProbeReport")
            .field("storage", &self.storage.name())
            .field("probe", &self.probe)
            .finish()
    }
}

/// Ask one backend whether it holds `id`.
pub fn probe(storage: &dyn Storage, id: &ContentId) -> Probe {
    match storage.exists(id) {
        Ok(true) => Probe::Hit,
        Ok(false) => Probe::Miss,
        Err(e) => {
            warn!(
                %id,
                storage = storage.name(),
                error = %e,
                "existence probe failed; treating as miss"
            );
            Probe::Fault(e)
        }
    }
}

/// First storage, in order, that reports holding `id`.
///
/// Stops at the first hit; later storages are never asked.
pub fn pin(storages: &[Arc<dyn Storage>], id: &ContentId) -> Option<Arc<dyn Storage>> {
    let pinned = storages
        .iter()
        .find(|storage| probe(storage.as_ref(), id).is_hit())
        .cloned();
    match &pinned {
        Some(storage) => debug!(%id, storage = storage.name(), "pinned storage"),
        None => debug!(%id, scanned = storages.len(), "no storage holds content"),
    }
    pinned
}

/// Probe every storage, in order, without stopping at the first hit.
pub fn probe_all(storages: &[Arc<dyn Storage>], id: &ContentId) -> Vec<ProbeReport> {
    storages
        .iter()
        .map(|storage| ProbeReport {
            storage: Arc::clone(storage),
            probe: probe(storage.as_ref(), id),
        })
        .collect()
}

/// Outcome of a delete against one backend.
#[derive(Debug)]
pub enum DeleteOutcome {
    Deleted,
    /// The backend has no delete capability (read-only registrations).
    Skipped,
    Failed(StorageError),
}

/// Per-backend results of a fan-out delete, in registration order.
#[derive(Debug, Default)]
pub struct DeleteReport {
    pub outcomes: Vec<(String, DeleteOutcome)>,
}

impl DeleteReport {
    /// Backends the delete call succeeded on.
    pub fn deleted(&self) -> usize {
        self.count(|o| matches!(o, DeleteOutcome::Deleted))
    }

    /// Backends without delete capability.
    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, DeleteOutcome::Skipped))
    }

    /// Backends whose delete call failed.
    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, DeleteOutcome::Failed(_)))
    }

    /// Whether no delete call failed.
    pub fn is_clean(&self) -> bool {
        self.failed() == 0
    }

    fn count(&self, pred: impl Fn(&DeleteOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|(_, o)| pred(o)).count()
    }
}

/// Delete `id` from every storage that can delete. Never fails as a whole.
pub fn delete_all(storages: &[Arc<dyn Storage>], id: &ContentId) -> DeleteReport {
    let outcomes = storages
        .iter()
        .map(|storage| {
            let outcome = match storage.as_deleter() {
                None => DeleteOutcome::Skipped,
                Some(deleter) => match deleter.delete(id) {
                    Ok(()) => DeleteOutcome::Deleted,
                    Err(e) => {
                        warn!(%id, storage = storage.name(), error = %e, "delete failed; continuing");
                        DeleteOutcome::Failed(e)
                    }
                },
            };
            (storage.name().to_string(), outcome)
        })
        .collect();
    let report = DeleteReport { outcomes };
    debug!(
        %id,
        deleted = report.deleted(),
        skipped = report.skipped(),
        failed = report.failed(),
        "fan-out delete finished"
    );
    report
}
