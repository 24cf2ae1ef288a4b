//! Repository traits and the file-backed record store
//!
//! Each record family gets a narrow trait so the engine and the Run Action
//! depend only on what they use. [`Store`] implements all of them.

mod file;

pub use file::Store;

use chrono::{DateTime, Utc};
use std::collections::BTreeSet;

use crate::Result;
use crate::filter::Filter;
use crate::model::{JobLog, MappingRecord, SynchronizationContract, SynchronizationDefinition};

/// Storage for synchronization definitions
pub trait DefinitionStore: Send + Sync {
    fn find_definition(&self, id: i64) -> Result<Option<SynchronizationDefinition>>;

    fn find_definitions(&self, filter: &Filter) -> Result<Vec<SynchronizationDefinition>>;

    /// Store a new definition, assigning an id when it is 0.
    fn insert_definition(
        &self,
        definition: SynchronizationDefinition,
    ) -> Result<SynchronizationDefinition>;

    /// Replace an existing definition.
    fn update_definition(
        &self,
        definition: SynchronizationDefinition,
    ) -> Result<SynchronizationDefinition>;

    /// Returns whether a definition was removed.
    fn delete_definition(&self, id: i64) -> Result<bool>;
}

/// Storage for standalone mappings
pub trait MappingStore: Send + Sync {
    fn find_mapping(&self, id: i64) -> Result<Option<MappingRecord>>;

    fn find_mappings(&self, filter: &Filter) -> Result<Vec<MappingRecord>>;

    fn insert_mapping(&self, mapping: MappingRecord) -> Result<MappingRecord>;

    fn update_mapping(&self, mapping: MappingRecord) -> Result<MappingRecord>;

    fn delete_mapping(&self, id: i64) -> Result<bool>;
}

/// How a source object relates to its existing contract
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// First time this origin id is seen
    New,
    /// Content differs from the last write, or the last write did not succeed
    Changed,
    /// Content matches the last successful write
    Unchanged,
}

/// Result of [`ContractStore::reconcile`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    pub contract: SynchronizationContract,
    pub outcome: ReconcileOutcome,
}

impl Reconciliation {
    pub fn is_new(&self) -> bool {
        self.outcome == ReconcileOutcome::New
    }
}

/// Per-object synchronization state
pub trait ContractStore: Send + Sync {
    /// Find or create the contract for an origin id and compare fingerprints.
    ///
    /// Unchanged contracts are returned untouched; new and changed ones are
    /// left `pending`.
    fn reconcile(
        &self,
        synchronization_id: i64,
        origin_id: &str,
        fingerprint: &str,
    ) -> Result<Reconciliation>;

    fn mark_synced(
        &self,
        contract_id: i64,
        target_id: &str,
        origin_hash: &str,
        target_hash: &str,
    ) -> Result<SynchronizationContract>;

    fn mark_failed(&self, contract_id: i64, reason: &str) -> Result<SynchronizationContract>;

    /// Delete every contract of the synchronization whose origin id is not in `seen`.
    fn purge_missing(&self, synchronization_id: i64, seen: &BTreeSet<String>) -> Result<usize>;

    /// Contracts of the synchronization whose origin id is not in `seen`
    fn stale(
        &self,
        synchronization_id: i64,
        seen: &BTreeSet<String>,
    ) -> Result<Vec<SynchronizationContract>>;

    fn find_contract(&self, id: i64) -> Result<Option<SynchronizationContract>>;

    fn find_contracts(&self, filter: &Filter) -> Result<Vec<SynchronizationContract>>;

    fn find_by_synchronization(
        &self,
        synchronization_id: i64,
    ) -> Result<Vec<SynchronizationContract>>;

    fn count_for_synchronization(&self, synchronization_id: i64) -> Result<usize>;
}

/// Storage for job logs
pub trait JobLogStore: Send + Sync {
    fn insert_log(&self, log: JobLog) -> Result<JobLog>;

    fn find_logs(&self, filter: &Filter) -> Result<Vec<JobLog>>;

    /// Logs whose arguments name the synchronization, newest first
    fn logs_for_synchronization(&self, synchronization_id: i64) -> Result<Vec<JobLog>>;

    /// Delete logs whose `expires` is at or before `now`.
    fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize>;
}
