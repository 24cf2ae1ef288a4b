//! Shared handler state

use conduit_core::{
    AdapterRegistry, AdminService, Settings, Store, SyncEngine, SynchronizationAction,
};
use conduit_mapping::{AcceptAllValidator, SchemaValidator};
use std::sync::Arc;

/// Everything the route handlers need, cheap to clone
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Store>,
    pub admin: Arc<AdminService>,
    pub engine: Arc<SyncEngine>,
    pub action: Arc<SynchronizationAction>,
    pub validator: Arc<dyn SchemaValidator>,
    pub settings: Arc<Settings>,
}

impl AppState {
    /// Wire the engine, run action and admin service over `store`.
    pub fn new(store: Arc<Store>, registry: AdapterRegistry, settings: Settings) -> Self {
        Self::with_validator(store, registry, settings, Arc::new(AcceptAllValidator))
    }

    pub fn with_validator(
        store: Arc<Store>,
        registry: AdapterRegistry,
        settings: Settings,
        validator: Arc<dyn SchemaValidator>,
    ) -> Self {
        let engine = Arc::new(
            SyncEngine::new(store.clone(), store.clone(), registry)
                .with_options(settings.sync_options())
                .with_locks(settings.run_locks())
                .with_validator(validator.clone()),
        );
        let action = Arc::new(SynchronizationAction::new(
            store.clone(),
            store.clone(),
            engine.clone(),
        ));
        let admin = Arc::new(AdminService::new(store.clone(), store.clone(), store.clone()));

        Self {
            store,
            admin,
            engine,
            action,
            validator,
            settings: Arc::new(settings),
        }
    }
}
