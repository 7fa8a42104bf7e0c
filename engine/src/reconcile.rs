//! Key-based reconciliation of remote records against a local store.
//!
//! # Algorithm
//!
//! 1. Build the local key index through the store (always, whatever
//!    operations are requested)
//! 2. Extract keys from the remote records
//! 3. Classify against that index snapshot:
//!    - delete: local keys absent remotely, ascending key order
//!    - insert: remote keys absent locally, remote order
//!    - update: keys on both sides, remote order
//! 4. Delete, then insert, then update
//!
//! Classification happens entirely before the first deletion, so later passes
//! never see the effect of earlier ones. Nothing is rolled back when a
//! handler fails.

use crate::{
    config::{ConsistencyPolicy, ReconcileConfig},
    error::{ConsistencyWarning, InconsistencyReason, KeyRole, ReconcileError},
    Error, KeyValue, LocalKeyIndex, LocalStore, Operation, OperationSet, RemoteKeys,
    RemoteRecord,
};
use serde::{Deserialize, Serialize};

/// The three disjoint key lists of one reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Classification {
    /// Local keys absent remotely
    pub delete: Vec<KeyValue>,
    /// Remote keys absent locally
    pub insert: Vec<KeyValue>,
    /// Keys present on both sides
    pub update: Vec<KeyValue>,
}

impl Classification {
    /// Classify remote keys against a local index.
    ///
    /// Classes not in `operations` are left empty.
    pub fn classify<H>(
        local: &LocalKeyIndex<H>,
        remote: &RemoteKeys<'_>,
        operations: OperationSet,
    ) -> Self {
        let mut plan = Self::default();

        if operations.contains(Operation::Delete) {
            plan.delete = local
                .keys()
                .filter(|key| !remote.contains(key))
                .cloned()
                .collect();
        }

        let (update, insert): (Vec<_>, Vec<_>) = remote
            .keys()
            .iter()
            .cloned()
            .partition(|key| local.contains_key(key));

        if operations.contains(Operation::Insert) {
            plan.insert = insert;
        }
        if operations.contains(Operation::Update) {
            plan.update = update;
        }

        plan
    }

    pub fn len(&self) -> usize {
        self.delete.len() + self.insert.len() + self.update.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// What a successful reconciliation did.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileReport {
    /// Keys whose local record was deleted
    pub deleted: Vec<KeyValue>,
    /// Keys passed to the insert handler
    pub inserted: Vec<KeyValue>,
    /// Keys passed to the update handler
    pub updated: Vec<KeyValue>,
    /// Remote records left out for lack of a usable key
    pub skipped_remote: usize,
    /// Remote records that overwrote an earlier record with the same key
    pub duplicate_remote: usize,
    /// Keys skipped under [`ConsistencyPolicy::Warn`]
    pub warnings: Vec<ConsistencyWarning>,
}

impl ReconcileReport {
    /// True if no record was inserted or deleted.
    pub fn is_unchanged(&self) -> bool {
        self.deleted.is_empty() && self.inserted.is_empty()
    }
}

/// Drives a reconciliation pass. Holds configuration only; every call builds
/// its own index and key map.
#[derive(Debug, Clone, Copy, Default)]
pub struct Reconciler {
    config: ReconcileConfig,
}

impl Reconciler {
    /// Create a new reconciler.
    pub fn new(config: ReconcileConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ReconcileConfig {
        &self.config
    }

    /// Reconcile `records` against the local records of `entity`.
    ///
    /// `on_insert` receives each remote record whose key is unknown locally,
    /// together with the store so it can create the local record.
    /// `on_update` receives each remote record whose key is known locally,
    /// together with the resolved local record. Local records whose key is
    /// absent remotely are deleted through the store.
    ///
    /// `predicate` narrows which local records take part. Note that building
    /// the index deletes in-scope local records with a missing or repeated
    /// key (see [`LocalStore::index_keys`]).
    ///
    /// The first handler error stops the pass and is returned as
    /// [`ReconcileError::Handler`]; work already done stays done.
    #[allow(clippy::too_many_arguments)]
    pub fn reconcile<S, E, I, U>(
        &self,
        store: &mut S,
        records: &[RemoteRecord],
        entity: &str,
        local_key_field: &str,
        remote_key_field: &str,
        predicate: Option<&dyn Fn(&S::Record) -> bool>,
        mut on_insert: I,
        mut on_update: U,
    ) -> Result<ReconcileReport, ReconcileError<E>>
    where
        S: LocalStore,
        I: FnMut(&RemoteRecord, &mut S) -> Result<(), E>,
        U: FnMut(&RemoteRecord, &mut S::Record) -> Result<(), E>,
    {
        let span = tracing::debug_span!(
            "reconcile",
            entity,
            operations = %self.config.operations
        );
        let _enter = span.enter();

        if local_key_field.is_empty() {
            return Err(ReconcileError::Config(Error::EmptyKeyField(KeyRole::Local)));
        }
        if remote_key_field.is_empty() {
            return Err(ReconcileError::Config(Error::EmptyKeyField(KeyRole::Remote)));
        }

        let index = LocalKeyIndex::build(store, entity, local_key_field, predicate)
            .map_err(ReconcileError::Store)?;
        let remote = RemoteKeys::extract(records, remote_key_field, self.config.key_kind)
            .map_err(ReconcileError::Config)?;

        let plan = Classification::classify(&index, &remote, self.config.operations);
        tracing::debug!(
            delete = plan.delete.len(),
            insert = plan.insert.len(),
            update = plan.update.len(),
            skipped = remote.skipped(),
            "classified remote records"
        );

        let mut report = ReconcileReport {
            skipped_remote: remote.skipped(),
            duplicate_remote: remote.duplicates(),
            ..ReconcileReport::default()
        };

        for key in plan.delete {
            let Some(handle) = index.get(&key) else {
                self.inconsistent::<E>(
                    &mut report,
                    Operation::Delete,
                    key,
                    InconsistencyReason::MissingLocalHandle,
                )?;
                continue;
            };
            match store.delete(handle) {
                Ok(()) => report.deleted.push(key),
                Err(Error::StaleHandle(_)) => {
                    self.inconsistent::<E>(
                        &mut report,
                        Operation::Delete,
                        key,
                        InconsistencyReason::StaleHandle,
                    )?;
                }
                Err(err) => return Err(ReconcileError::Store(err)),
            }
        }

        for key in plan.insert {
            let Some(record) = remote.get(&key) else {
                self.inconsistent::<E>(
                    &mut report,
                    Operation::Insert,
                    key,
                    InconsistencyReason::MissingRemoteRecord,
                )?;
                continue;
            };
            tracing::trace!(%key, "insert");
            if let Err(error) = on_insert(record, &mut *store) {
                return Err(ReconcileError::Handler {
                    operation: Operation::Insert,
                    key,
                    error,
                });
            }
            report.inserted.push(key);
        }

        for key in plan.update {
            let Some(record) = remote.get(&key) else {
                self.inconsistent::<E>(
                    &mut report,
                    Operation::Update,
                    key,
                    InconsistencyReason::MissingRemoteRecord,
                )?;
                continue;
            };
            let Some(handle) = index.get(&key) else {
                self.inconsistent::<E>(
                    &mut report,
                    Operation::Update,
                    key,
                    InconsistencyReason::MissingLocalHandle,
                )?;
                continue;
            };
            let local = match store.resolve(handle) {
                Ok(local) => local,
                Err(Error::StaleHandle(_)) => {
                    self.inconsistent::<E>(
                        &mut report,
                        Operation::Update,
                        key,
                        InconsistencyReason::StaleHandle,
                    )?;
                    continue;
                }
                Err(err) => return Err(ReconcileError::Store(err)),
            };
            tracing::trace!(%key, "update");
            if let Err(error) = on_update(record, local) {
                return Err(ReconcileError::Handler {
                    operation: Operation::Update,
                    key,
                    error,
                });
            }
            report.updated.push(key);
        }

        tracing::debug!(
            deleted = report.deleted.len(),
            inserted = report.inserted.len(),
            updated = report.updated.len(),
            warnings = report.warnings.len(),
            "reconciliation complete"
        );
        Ok(report)
    }

    fn inconsistent<E>(
        &self,
        report: &mut ReconcileReport,
        operation: Operation,
        key: KeyValue,
        reason: InconsistencyReason,
    ) -> Result<(), ReconcileError<E>> {
        let warning = ConsistencyWarning {
            operation,
            key,
            reason,
        };
        match self.config.on_inconsistency {
            ConsistencyPolicy::Warn => {
                tracing::warn!(%warning, "skipping key");
                report.warnings.push(warning);
                Ok(())
            }
            ConsistencyPolicy::Fail => Err(ReconcileError::Inconsistent(warning)),
        }
    }
}

/// Reconcile with the default configuration (all operations, warn on
/// inconsistencies) and no predicate.
pub fn changes<S, E, I, U>(
    store: &mut S,
    records: &[RemoteRecord],
    entity: &str,
    local_key_field: &str,
    remote_key_field: &str,
    on_insert: I,
    on_update: U,
) -> Result<ReconcileReport, ReconcileError<E>>
where
    S: LocalStore,
    I: FnMut(&RemoteRecord, &mut S) -> Result<(), E>,
    U: FnMut(&RemoteRecord, &mut S::Record) -> Result<(), E>,
{
    Reconciler::default().reconcile(
        store,
        records,
        entity,
        local_key_field,
        remote_key_field,
        None,
        on_insert,
        on_update,
    )
}
