//! Synchronization orchestration
//!
//! [`SyncEngine`] reconciles one definition's source objects against their
//! contracts, writes new and changed objects to the target and, when asked,
//! deletes targets whose source object disappeared. [`SyncEngine::preview`]
//! maps the same objects without writing anything. [`RunLocks`] keeps two
//! runs of the same definition from interleaving.

mod engine;
mod locks;

pub use engine::{
    ObjectFailure, PreviewObject, SyncEngine, SyncOptions, SyncOutcome, SyncPreview, SyncScope,
    SyncSession,
};
pub use locks::{RunGuard, RunLocks};
