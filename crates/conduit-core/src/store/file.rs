use chrono::{DateTime, Utc};
use conduit_fs::{ConfigStore, LockFile, NormalizedPath};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::{
    ContractStore, DefinitionStore, JobLogStore, MappingStore, ReconcileOutcome, Reconciliation,
};
use crate::filter::Filter;
use crate::model::{
    ContractStatus, JobLog, MappingRecord, SynchronizationContract, SynchronizationDefinition,
};
use crate::{Error, Result};

const DEFINITIONS_FILE: &str = "synchronizations.json";
const MAPPINGS_FILE: &str = "mappings.json";
const CONTRACTS_FILE: &str = "contracts.json";
const LOGS_FILE: &str = "job_logs.json";
const LOCK_FILE: &str = ".lock";

trait Record: Clone + Serialize + DeserializeOwned {
    fn id(&self) -> i64;
    fn set_id(&mut self, id: i64);
}

macro_rules! impl_record {
    ($($ty:ty),*) => {$(
        impl Record for $ty {
            fn id(&self) -> i64 {
                self.id
            }

            fn set_id(&mut self, id: i64) {
                self.id = id;
            }
        }
    )*};
}

impl_record!(SynchronizationDefinition, MappingRecord, SynchronizationContract, JobLog);

/// On-disk form of a table
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase", bound(deserialize = "T: DeserializeOwned"))]
struct TableFile<T> {
    #[serde(default)]
    last_id: i64,
    records: Vec<T>,
}

/// One record family keyed by id
///
/// `last_id` is the highest id ever assigned. It is persisted with the
/// records and never decreases, so ids of deleted records are not reused.
#[derive(Debug)]
struct Table<T> {
    file: &'static str,
    last_id: i64,
    records: BTreeMap<i64, T>,
}

impl<T: Record> Table<T> {
    fn empty(file: &'static str) -> Self {
        Self {
            file,
            last_id: 0,
            records: BTreeMap::new(),
        }
    }

    fn load(dir: &NormalizedPath, file: &'static str) -> Result<Self> {
        let path = dir.join(file);
        let Some(stored) = ConfigStore::new()
            .load_if_exists::<TableFile<T>>(&path)
            .map_err(persistence)?
        else {
            return Ok(Self::empty(file));
        };

        let records: BTreeMap<i64, T> = stored.records.into_iter().map(|r| (r.id(), r)).collect();
        let highest = records.keys().next_back().copied().unwrap_or(0);
        tracing::debug!(path = %path, count = records.len(), "Loaded table");
        Ok(Self {
            file,
            last_id: stored.last_id.max(highest),
            records,
        })
    }

    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }

    fn insert(&mut self, mut record: T, kind: &str) -> Result<T> {
        if record.id() == 0 {
            let id = self.next_id();
            record.set_id(id);
        } else if self.records.contains_key(&record.id()) {
            return Err(Error::Conflict(format!("{kind} {} already exists", record.id())));
        } else {
            self.last_id = self.last_id.max(record.id());
        }
        self.records.insert(record.id(), record.clone());
        Ok(record)
    }

    fn replace(&mut self, record: T, kind: &str) -> Result<T> {
        match self.records.get_mut(&record.id()) {
            Some(slot) => {
                *slot = record.clone();
                Ok(record)
            }
            None => Err(Error::NotFound(format!("{kind} {}", record.id()))),
        }
    }

    fn filtered(&self, filter: &Filter) -> Result<Vec<T>> {
        filter.apply(self.records.values().cloned())
    }

    fn file_view(&self) -> TableFile<&T> {
        TableFile {
            last_id: self.last_id,
            records: self.records.values().collect(),
        }
    }
}

#[derive(Debug)]
struct Tables {
    definitions: Table<SynchronizationDefinition>,
    mappings: Table<MappingRecord>,
    contracts: Table<SynchronizationContract>,
    logs: Table<JobLog>,
}

/// Record store for definitions, mappings, contracts and job logs
///
/// Records live in memory behind a mutex. When opened on a data directory,
/// every mutation rewrites the affected table file (`synchronizations.json`,
/// `mappings.json`, `contracts.json`, `job_logs.json`) with an atomic locked
/// write. Tables are read once at open, so a persisted store holds an
/// exclusive lock on `<data_dir>/.lock` for its lifetime. A mutation whose
/// table write fails is rolled back in memory.
#[derive(Debug)]
pub struct Store {
    tables: Mutex<Tables>,
    data_dir: Option<NormalizedPath>,
    _lock: Option<LockFile>,
}

fn poison_err<T>(_: PoisonError<T>) -> Error {
    Error::Persistence("store lock poisoned".to_string())
}

fn persistence(error: conduit_fs::Error) -> Error {
    Error::Persistence(error.to_string())
}

impl Store {
    /// A store that never touches the filesystem
    pub fn in_memory() -> Self {
        Self {
            tables: Mutex::new(Tables {
                definitions: Table::empty(DEFINITIONS_FILE),
                mappings: Table::empty(MAPPINGS_FILE),
                contracts: Table::empty(CONTRACTS_FILE),
                logs: Table::empty(LOGS_FILE),
            }),
            data_dir: None,
            _lock: None,
        }
    }

    /// Open (or initialize) a store persisted under `data_dir`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Conflict`] if another store has the directory open and
    /// [`Error::Persistence`] if a table file exists but cannot be read or
    /// parsed.
    pub fn open(data_dir: impl Into<NormalizedPath>) -> Result<Self> {
        let dir = data_dir.into();
        let lock = LockFile::try_acquire(&dir.join(LOCK_FILE)).map_err(|error| match error {
            conduit_fs::Error::LockContended { .. } => {
                Error::Conflict(format!("Data directory {dir} is in use by another process"))
            }
            other => persistence(other),
        })?;
        let tables = Tables {
            definitions: Table::load(&dir, DEFINITIONS_FILE)?,
            mappings: Table::load(&dir, MAPPINGS_FILE)?,
            contracts: Table::load(&dir, CONTRACTS_FILE)?,
            logs: Table::load(&dir, LOGS_FILE)?,
        };
        tracing::info!(data_dir = %dir, "Opened record store");

        Ok(Self {
            tables: Mutex::new(tables),
            data_dir: Some(dir),
            _lock: Some(lock),
        })
    }

    pub fn data_dir(&self) -> Option<&NormalizedPath> {
        self.data_dir.as_ref()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>> {
        self.tables.lock().map_err(poison_err)
    }

    fn persist<T: Record>(&self, table: &Table<T>) -> Result<()> {
        let Some(dir) = &self.data_dir else {
            return Ok(());
        };
        ConfigStore::new()
            .save(&dir.join(table.file), &table.file_view())
            .map_err(persistence)
    }

    /// Run `mutate` on `table` and persist it, restoring the previous
    /// records if the write fails.
    fn commit<T: Record, R>(
        &self,
        table: &mut Table<T>,
        mutate: impl FnOnce(&mut Table<T>) -> Result<R>,
    ) -> Result<R> {
        let snapshot = self.data_dir.as_ref().map(|_| table.records.clone());
        let result = mutate(table)?;
        if let Err(error) = self.persist(table) {
            if let Some(records) = snapshot {
                table.records = records;
            }
            tracing::warn!(file = table.file, %error, "Table write failed; mutation rolled back");
            return Err(error);
        }
        Ok(result)
    }
}

impl DefinitionStore for Store {
    fn find_definition(&self, id: i64) -> Result<Option<SynchronizationDefinition>> {
        Ok(self.lock()?.definitions.records.get(&id).cloned())
    }

    fn find_definitions(&self, filter: &Filter) -> Result<Vec<SynchronizationDefinition>> {
        self.lock()?.definitions.filtered(filter)
    }

    fn insert_definition(
        &self,
        definition: SynchronizationDefinition,
    ) -> Result<SynchronizationDefinition> {
        let mut tables = self.lock()?;
        self.commit(&mut tables.definitions, |t| t.insert(definition, "Synchronization"))
    }

    fn update_definition(
        &self,
        definition: SynchronizationDefinition,
    ) -> Result<SynchronizationDefinition> {
        let mut tables = self.lock()?;
        self.commit(&mut tables.definitions, |t| t.replace(definition, "Synchronization"))
    }

    fn delete_definition(&self, id: i64) -> Result<bool> {
        let mut tables = self.lock()?;
        if !tables.definitions.records.contains_key(&id) {
            return Ok(false);
        }
        self.commit(&mut tables.definitions, |t| Ok(t.records.remove(&id).is_some()))
    }
}

impl MappingStore for Store {
    fn find_mapping(&self, id: i64) -> Result<Option<MappingRecord>> {
        Ok(self.lock()?.mappings.records.get(&id).cloned())
    }

    fn find_mappings(&self, filter: &Filter) -> Result<Vec<MappingRecord>> {
        self.lock()?.mappings.filtered(filter)
    }

    fn insert_mapping(&self, mapping: MappingRecord) -> Result<MappingRecord> {
        let mut tables = self.lock()?;
        self.commit(&mut tables.mappings, |t| t.insert(mapping, "Mapping"))
    }

    fn update_mapping(&self, mapping: MappingRecord) -> Result<MappingRecord> {
        let mut tables = self.lock()?;
        self.commit(&mut tables.mappings, |t| t.replace(mapping, "Mapping"))
    }

    fn delete_mapping(&self, id: i64) -> Result<bool> {
        let mut tables = self.lock()?;
        if !tables.mappings.records.contains_key(&id) {
            return Ok(false);
        }
        self.commit(&mut tables.mappings, |t| Ok(t.records.remove(&id).is_some()))
    }
}

fn contract_mut(
    table: &mut Table<SynchronizationContract>,
    contract_id: i64,
) -> Result<&mut SynchronizationContract> {
    table
        .records
        .get_mut(&contract_id)
        .ok_or_else(|| Error::NotFound(format!("Contract {contract_id}")))
}

impl ContractStore for Store {
    #[tracing::instrument(skip(self, fingerprint))]
    fn reconcile(
        &self,
        synchronization_id: i64,
        origin_id: &str,
        fingerprint: &str,
    ) -> Result<Reconciliation> {
        let mut tables = self.lock()?;
        let now = Utc::now();

        let existing = tables
            .contracts
            .records
            .values()
            .find(|c| c.synchronization_id == synchronization_id && c.origin_id == origin_id);

        if let Some(contract) = existing
            && contract.status == ContractStatus::Synced
            && contract.origin_hash.as_deref() == Some(fingerprint)
        {
            return Ok(Reconciliation {
                contract: contract.clone(),
                outcome: ReconcileOutcome::Unchanged,
            });
        }
        let existing_id = existing.map(|c| c.id);

        let reconciliation = self.commit(&mut tables.contracts, |t| match existing_id {
            Some(id) => {
                let contract = contract_mut(t, id)?;
                if contract.origin_hash.as_deref() != Some(fingerprint) {
                    contract.source_last_changed = Some(now);
                }
                contract.status = ContractStatus::Pending;
                contract.updated = now;
                Ok(Reconciliation {
                    contract: contract.clone(),
                    outcome: ReconcileOutcome::Changed,
                })
            }
            None => Ok(Reconciliation {
                contract: t.insert(
                    SynchronizationContract::pending(synchronization_id, origin_id),
                    "Contract",
                )?,
                outcome: ReconcileOutcome::New,
            }),
        })?;

        tracing::trace!(outcome = ?reconciliation.outcome, "Reconciled contract");
        Ok(reconciliation)
    }

    fn mark_synced(
        &self,
        contract_id: i64,
        target_id: &str,
        origin_hash: &str,
        target_hash: &str,
    ) -> Result<SynchronizationContract> {
        let mut tables = self.lock()?;
        let now = Utc::now();
        self.commit(&mut tables.contracts, |t| {
            let contract = contract_mut(t, contract_id)?;
            contract.target_id = Some(target_id.to_string());
            contract.origin_hash = Some(origin_hash.to_string());
            contract.target_hash = Some(target_hash.to_string());
            contract.status = ContractStatus::Synced;
            contract.last_error = None;
            contract.target_last_synced = Some(now);
            contract.updated = now;
            Ok(contract.clone())
        })
    }

    fn mark_failed(&self, contract_id: i64, reason: &str) -> Result<SynchronizationContract> {
        let mut tables = self.lock()?;
        self.commit(&mut tables.contracts, |t| {
            let contract = contract_mut(t, contract_id)?;
            contract.status = ContractStatus::Failed;
            contract.last_error = Some(reason.to_string());
            contract.updated = Utc::now();
            Ok(contract.clone())
        })
    }

    fn purge_missing(&self, synchronization_id: i64, seen: &BTreeSet<String>) -> Result<usize> {
        let mut tables = self.lock()?;
        let is_stale = |c: &SynchronizationContract| {
            c.synchronization_id == synchronization_id && !seen.contains(&c.origin_id)
        };
        if !tables.contracts.records.values().any(is_stale) {
            return Ok(0);
        }

        let purged = self.commit(&mut tables.contracts, |t| {
            let before = t.records.len();
            t.records.retain(|_, c| !is_stale(&*c));
            Ok(before - t.records.len())
        })?;
        tracing::debug!(synchronization_id, purged, "Purged stale contracts");
        Ok(purged)
    }

    fn stale(
        &self,
        synchronization_id: i64,
        seen: &BTreeSet<String>,
    ) -> Result<Vec<SynchronizationContract>> {
        Ok(self
            .lock()?
            .contracts
            .records
            .values()
            .filter(|c| c.synchronization_id == synchronization_id && !seen.contains(&c.origin_id))
            .cloned()
            .collect())
    }

    fn find_contract(&self, id: i64) -> Result<Option<SynchronizationContract>> {
        Ok(self.lock()?.contracts.records.get(&id).cloned())
    }

    fn find_contracts(&self, filter: &Filter) -> Result<Vec<SynchronizationContract>> {
        self.lock()?.contracts.filtered(filter)
    }

    fn find_by_synchronization(
        &self,
        synchronization_id: i64,
    ) -> Result<Vec<SynchronizationContract>> {
        Ok(self
            .lock()?
            .contracts
            .records
            .values()
            .filter(|c| c.synchronization_id == synchronization_id)
            .cloned()
            .collect())
    }

    fn count_for_synchronization(&self, synchronization_id: i64) -> Result<usize> {
        Ok(self
            .lock()?
            .contracts
            .records
            .values()
            .filter(|c| c.synchronization_id == synchronization_id)
            .count())
    }
}

impl JobLogStore for Store {
    fn insert_log(&self, log: JobLog) -> Result<JobLog> {
        let mut tables = self.lock()?;
        self.commit(&mut tables.logs, |t| t.insert(log, "Job log"))
    }

    fn find_logs(&self, filter: &Filter) -> Result<Vec<JobLog>> {
        self.lock()?.logs.filtered(filter)
    }

    fn logs_for_synchronization(&self, synchronization_id: i64) -> Result<Vec<JobLog>> {
        Ok(self
            .lock()?
            .logs
            .records
            .values()
            .rev()
            .filter(|log| log.synchronization_id() == Some(synchronization_id))
            .cloned()
            .collect())
    }

    fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize> {
        let mut tables = self.lock()?;
        if !tables.logs.records.values().any(|log| log.is_expired(now)) {
            return Ok(0);
        }
        self.commit(&mut tables.logs, |t| {
            let before = t.records.len();
            t.records.retain(|_, log| !log.is_expired(now));
            Ok(before - t.records.len())
        })
    }
}
