use conduit_mapping::{
    AcceptAllValidator, CompiledMapping, MappingDefinition, SchemaValidator, ValidationReport,
};
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use super::locks::{RunGuard, RunLocks};
use crate::adapters::{
    AdapterRegistry, CallContext, CancellationToken, SourceAdapter, SourceObject, SourceObjects,
    TargetAdapter,
};
use crate::fingerprint::{checksum, fingerprint};
use crate::model::{
    ContractStatus, MappingSource, SynchronizationContract, SynchronizationDefinition,
};
use crate::store::{ContractStore, MappingStore, ReconcileOutcome};
use crate::{Error, Result};

const DUPLICATE_ORIGIN: &str = "duplicate origin id in source; skipped";

/// Options for synchronization runs
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Deadline for each adapter call
    pub call_timeout: Duration,
    /// Abort the run on the first per-object failure
    pub fail_fast: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            call_timeout: Duration::from_secs(30),
            fail_fast: false,
        }
    }
}

/// Which source objects a run processes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SyncScope {
    #[default]
    All,
    /// Only the object with this origin id
    Contract(String),
}

impl SyncScope {
    pub fn includes(&self, origin_id: &str) -> bool {
        match self {
            Self::All => true,
            Self::Contract(scoped) => scoped == origin_id,
        }
    }
}

/// An object that could not be synchronized
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectFailure {
    pub origin_id: String,
    pub message: String,
}

impl std::fmt::Display for ObjectFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.origin_id, self.message)
    }
}

/// Result of [`SyncSession::synchronize`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncOutcome {
    /// Objects written to the target
    pub written: usize,
    /// Every origin id seen in the source, including failed ones
    pub origin_ids: BTreeSet<String>,
    /// Unchanged objects and duplicates
    pub skipped: usize,
    pub failures: Vec<ObjectFailure>,
    /// The run stopped early; `origin_ids` is incomplete
    pub cancelled: bool,
}

/// One source object as a real run would write it
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewObject {
    pub origin_id: String,
    /// False when the contract is synced with the same fingerprint
    pub changed: bool,
    pub result_object: Value,
}

/// Result of [`SyncEngine::preview`]
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncPreview {
    pub objects: Vec<PreviewObject>,
    pub failures: Vec<ObjectFailure>,
}

impl SyncPreview {
    /// Objects a real run would write
    pub fn changed(&self) -> usize {
        self.objects.iter().filter(|object| object.changed).count()
    }
}

/// Adapters and mapping resolved for one definition
struct Prepared {
    source: Arc<dyn SourceAdapter>,
    target: Arc<dyn TargetAdapter>,
    compiled: CompiledMapping,
    mapping_value: Value,
}

enum Processed {
    Written,
    Unchanged,
    Failed(Error),
}

/// Engine synchronizing definitions into their targets
///
/// The engine only mutates contracts; definitions and mappings are read.
pub struct SyncEngine {
    contracts: Arc<dyn ContractStore>,
    mappings: Arc<dyn MappingStore>,
    registry: AdapterRegistry,
    locks: RunLocks,
    validator: Arc<dyn SchemaValidator>,
    options: SyncOptions,
}

impl SyncEngine {
    pub fn new(
        contracts: Arc<dyn ContractStore>,
        mappings: Arc<dyn MappingStore>,
        registry: AdapterRegistry,
    ) -> Self {
        Self {
            contracts,
            mappings,
            registry,
            locks: RunLocks::new(),
            validator: Arc::new(AcceptAllValidator),
            options: SyncOptions::default(),
        }
    }

    pub fn with_options(mut self, options: SyncOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_locks(mut self, locks: RunLocks) -> Self {
        self.locks = locks;
        self
    }

    pub fn with_validator(mut self, validator: Arc<dyn SchemaValidator>) -> Self {
        self.validator = validator;
        self
    }

    pub fn options(&self) -> &SyncOptions {
        &self.options
    }

    pub fn locks(&self) -> &RunLocks {
        &self.locks
    }

    /// Take the run lock for `definition`.
    ///
    /// The returned session keeps the lock until dropped, so a synchronize
    /// followed by a stale-target deletion runs without interleaving. Each
    /// session gets its own cancellation token.
    pub fn begin<'a>(&'a self, definition: &'a SynchronizationDefinition) -> Result<SyncSession<'a>> {
        self.begin_with(definition, CancellationToken::new())
    }

    /// Like [`SyncEngine::begin`], with a token the caller can cancel.
    pub fn begin_with<'a>(
        &'a self,
        definition: &'a SynchronizationDefinition,
        cancellation: CancellationToken,
    ) -> Result<SyncSession<'a>> {
        let guard = self.locks.acquire(definition.id)?;
        Ok(SyncSession {
            engine: self,
            definition,
            cancellation,
            _guard: guard,
        })
    }

    /// Run a full synchronization under its own run lock.
    pub fn synchronize(&self, definition: &SynchronizationDefinition) -> Result<SyncOutcome> {
        self.begin(definition)?.synchronize(&SyncScope::All)
    }

    /// Delete stale targets under their own run lock.
    pub fn delete_old_targets(
        &self,
        definition: &SynchronizationDefinition,
        origin_ids: &BTreeSet<String>,
    ) -> Result<usize> {
        self.begin(definition)?.delete_old_targets(origin_ids)
    }

    /// Resolve the mapping a definition uses.
    pub fn resolve_mapping(&self, definition: &SynchronizationDefinition) -> Result<MappingDefinition> {
        match &definition.mapping {
            MappingSource::Embedded(mapping) => Ok(mapping.clone()),
            MappingSource::Reference(reference) => self
                .mappings
                .find_mapping(reference.mapping_id)?
                .map(|record| record.mapping)
                .ok_or_else(|| Error::NotFound(format!("Mapping {}", reference.mapping_id))),
        }
    }

    /// Fetch and map the objects in `scope` without writing anything.
    ///
    /// Neither the target nor any contract is touched and no run lock is
    /// taken. Per-object mapping and validation failures are reported in the
    /// preview; everything else fails as a real run would.
    #[tracing::instrument(skip_all, fields(synchronization_id = definition.id, scope = ?scope))]
    pub fn preview(
        &self,
        definition: &SynchronizationDefinition,
        scope: &SyncScope,
    ) -> Result<SyncPreview> {
        let prepared = self.prepare(definition)?;
        let contracts: HashMap<String, SynchronizationContract> = self
            .contracts
            .find_by_synchronization(definition.id)?
            .into_iter()
            .map(|contract| (contract.origin_id.clone(), contract))
            .collect();

        let mut preview = SyncPreview::default();
        let mut fetched = HashSet::new();

        for item in self.fetch(definition, &prepared)? {
            let object = item?;
            if !scope.includes(&object.origin_id) {
                continue;
            }
            if !fetched.insert(object.origin_id.clone()) {
                preview.failures.push(ObjectFailure {
                    origin_id: object.origin_id,
                    message: DUPLICATE_ORIGIN.to_string(),
                });
                continue;
            }

            let fingerprint = fingerprint(&object.payload, &prepared.mapping_value)?;
            let changed = !contracts.get(&object.origin_id).is_some_and(|contract| {
                contract.status == ContractStatus::Synced
                    && contract.origin_hash.as_deref() == Some(fingerprint.as_str())
            });

            match self.map_object(&prepared.compiled, &object.payload) {
                Ok(result_object) => preview.objects.push(PreviewObject {
                    origin_id: object.origin_id,
                    changed,
                    result_object,
                }),
                Err(error) if error.is_per_object() => preview.failures.push(ObjectFailure {
                    origin_id: object.origin_id,
                    message: error.to_string(),
                }),
                Err(error) => return Err(error),
            }
        }

        tracing::info!(
            mapped = preview.objects.len(),
            changed = preview.changed(),
            failed = preview.failures.len(),
            "Preview finished"
        );
        Ok(preview)
    }

    fn call_context(&self) -> CallContext {
        CallContext::new(self.options.call_timeout)
    }

    fn prepare(&self, definition: &SynchronizationDefinition) -> Result<Prepared> {
        let source = self.registry.source(definition.source_type()?)?;
        let target = self.registry.target(definition.target_type()?)?;
        let mapping = self.resolve_mapping(definition)?;
        Ok(Prepared {
            source,
            target,
            compiled: CompiledMapping::compile(&mapping)?,
            mapping_value: serde_json::to_value(&mapping)?,
        })
    }

    fn fetch(&self, definition: &SynchronizationDefinition, prepared: &Prepared) -> Result<SourceObjects> {
        prepared
            .source
            .fetch(&definition.source_config, &self.call_context())
    }

    /// Map one payload and validate the result against the mapping schema.
    fn map_object(&self, compiled: &CompiledMapping, payload: &Value) -> Result<Value> {
        let mapped = compiled.apply(payload)?;
        let report = ValidationReport::check(self.validator.as_ref(), compiled.schema(), &mapped);
        if !report.is_valid {
            return Err(Error::Validation {
                errors: report.validation_errors,
            });
        }
        Ok(mapped)
    }

    #[tracing::instrument(skip_all, fields(synchronization_id = definition.id, scope = ?scope))]
    fn run_synchronize(
        &self,
        definition: &SynchronizationDefinition,
        scope: &SyncScope,
        cancellation: &CancellationToken,
    ) -> Result<SyncOutcome> {
        let prepared = self.prepare(definition)?;
        let objects = self.fetch(definition, &prepared)?;

        let mut outcome = SyncOutcome::default();
        let mut fetched = HashSet::new();

        for item in objects {
            if cancellation.is_cancelled() {
                tracing::warn!("Synchronization cancelled");
                outcome.cancelled = true;
                break;
            }

            let object = item?;
            if !scope.includes(&object.origin_id) {
                continue;
            }

            if !fetched.insert(object.origin_id.clone()) {
                tracing::warn!(origin_id = %object.origin_id, "Duplicate origin id in source");
                outcome.skipped += 1;
                outcome.failures.push(ObjectFailure {
                    origin_id: object.origin_id,
                    message: DUPLICATE_ORIGIN.to_string(),
                });
                continue;
            }
            outcome.origin_ids.insert(object.origin_id.clone());

            match self.process(definition, &prepared, &object)? {
                Processed::Written => outcome.written += 1,
                Processed::Unchanged => outcome.skipped += 1,
                Processed::Failed(error) => {
                    tracing::warn!(origin_id = %object.origin_id, %error, "Object failed");
                    if self.options.fail_fast {
                        return Err(error);
                    }
                    outcome.failures.push(ObjectFailure {
                        origin_id: object.origin_id,
                        message: error.to_string(),
                    });
                }
            }
        }

        tracing::info!(
            written = outcome.written,
            skipped = outcome.skipped,
            failed = outcome.failures.len(),
            "Synchronization finished"
        );
        Ok(outcome)
    }

    /// Reconcile and, when needed, write one object.
    ///
    /// Only contract store failures are returned as `Err`; everything that
    /// concerns the object itself becomes [`Processed::Failed`].
    fn process(
        &self,
        definition: &SynchronizationDefinition,
        prepared: &Prepared,
        object: &SourceObject,
    ) -> Result<Processed> {
        let fingerprint = fingerprint(&object.payload, &prepared.mapping_value)?;
        let reconciliation = self
            .contracts
            .reconcile(definition.id, &object.origin_id, &fingerprint)?;

        if reconciliation.outcome == ReconcileOutcome::Unchanged {
            return Ok(Processed::Unchanged);
        }
        let contract = reconciliation.contract;

        let written = self
            .map_object(&prepared.compiled, &object.payload)
            .and_then(|payload| {
                let target_id = prepared.target.write(
                    &definition.target_config,
                    &payload,
                    contract.target_id.as_deref(),
                    &self.call_context(),
                )?;
                Ok((target_id, checksum(&payload)?))
            });

        match written {
            Ok((target_id, target_hash)) => {
                self.contracts
                    .mark_synced(contract.id, &target_id, &fingerprint, &target_hash)?;
                Ok(Processed::Written)
            }
            Err(error) if error.is_per_object() => {
                self.contracts.mark_failed(contract.id, &error.to_string())?;
                Ok(Processed::Failed(error))
            }
            Err(error) => Err(error),
        }
    }

    #[tracing::instrument(skip_all, fields(synchronization_id = definition.id))]
    fn run_delete_old_targets(
        &self,
        definition: &SynchronizationDefinition,
        origin_ids: &BTreeSet<String>,
    ) -> Result<usize> {
        if !definition.delete_old_targets() {
            return Ok(0);
        }

        let target = self.registry.target(definition.target_type()?)?;
        let stale = self.contracts.stale(definition.id, origin_ids)?;

        let mut keep = origin_ids.clone();
        let mut deleted = 0;
        let mut failures = Vec::new();

        for contract in stale {
            let Some(target_id) = contract.target_id.as_deref() else {
                continue;
            };
            match target.delete(&definition.target_config, target_id, &self.call_context()) {
                Ok(()) => deleted += 1,
                Err(error) => {
                    tracing::warn!(origin_id = %contract.origin_id, %error, "Target deletion failed");
                    failures.push(format!("{}: {error}", contract.origin_id));
                    keep.insert(contract.origin_id);
                }
            }
        }

        let purged = self.contracts.purge_missing(definition.id, &keep)?;
        tracing::info!(deleted, purged, failed = failures.len(), "Stale targets reconciled");

        if !failures.is_empty() {
            return Err(Error::TargetDeletion {
                failed: failures.len(),
                deleted,
                details: failures.join("; "),
            });
        }
        Ok(deleted)
    }
}

impl std::fmt::Debug for SyncEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncEngine")
            .field("registry", &self.registry)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

/// One locked run of a definition
pub struct SyncSession<'a> {
    engine: &'a SyncEngine,
    definition: &'a SynchronizationDefinition,
    cancellation: CancellationToken,
    _guard: RunGuard,
}

impl SyncSession<'_> {
    /// Token checked before each object of this session's runs
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// Pull, map and write every new or changed source object in `scope`.
    ///
    /// # Errors
    ///
    /// Adapter resolution, mapping compilation, fetch and contract store
    /// failures abort the run. Per-object failures are reported in the
    /// outcome unless `fail_fast` is set.
    pub fn synchronize(&self, scope: &SyncScope) -> Result<SyncOutcome> {
        self.engine
            .run_synchronize(self.definition, scope, &self.cancellation)
    }

    /// Delete targets of contracts whose origin id is not in `origin_ids`.
    ///
    /// Does nothing unless the definition sets `deleteOldTargets`. Contracts
    /// whose target could not be deleted are kept for the next run.
    ///
    /// # Errors
    ///
    /// [`Error::TargetDeletion`] after all deletions were attempted if any
    /// failed.
    pub fn delete_old_targets(&self, origin_ids: &BTreeSet<String>) -> Result<usize> {
        self.engine.run_delete_old_targets(self.definition, origin_ids)
    }
}
