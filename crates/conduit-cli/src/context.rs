//! Data directory context shared by the commands

use conduit_core::{
    AdapterRegistry, AdminService, ConfigResolver, RunLocks, Settings, Store, SyncEngine,
    SynchronizationAction,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::Result;

/// An opened data directory with its resolved settings
pub struct Context {
    pub data_dir: PathBuf,
    pub settings: Settings,
    pub store: Arc<Store>,
}

impl Context {
    /// Resolve settings and open the record store under `data_dir`.
    pub fn open(data_dir: &Path) -> Result<Self> {
        let settings = ConfigResolver::new(data_dir).resolve()?;
        let store = Arc::new(Store::open(data_dir)?);
        tracing::debug!(data_dir = %data_dir.display(), "Opened data directory");
        Ok(Self {
            data_dir: data_dir.to_path_buf(),
            settings,
            store,
        })
    }

    pub fn store_admin(&self) -> AdminService {
        AdminService::new(self.store.clone(), self.store.clone(), self.store.clone())
    }

    /// The run action over the shipped adapters
    ///
    /// Run locks default to `<data_dir>/locks` so concurrent CLI invocations
    /// against one data directory exclude each other.
    pub fn action(&self) -> SynchronizationAction {
        let locks = match &self.settings.sync.lock_dir {
            Some(_) => self.settings.run_locks(),
            None => RunLocks::with_lock_dir(self.data_dir.join("locks").as_path()),
        };
        let engine = SyncEngine::new(
            self.store.clone(),
            self.store.clone(),
            AdapterRegistry::with_defaults(),
        )
        .with_options(self.settings.sync_options())
        .with_locks(locks);
        SynchronizationAction::new(self.store.clone(), self.store.clone(), Arc::new(engine))
    }
}
