//! Synchronization engine for Conduit
//!
//! This crate holds everything between the mapping engine and the outer
//! surfaces (HTTP server, CLI):
//!
//! - **Data model**: synchronization definitions, stored mappings, contracts
//!   and job logs
//! - **Stores**: repository traits plus a file-backed [`Store`]
//! - **Adapters**: source/target traits, a registry and the shipped adapters
//! - **SyncEngine**: contract reconciliation, target writes and stale-target
//!   deletion
//! - **SynchronizationAction**: the unit of work a scheduler invokes, which
//!   turns one engine run into a [`RunTrace`]
//!
//! # Architecture
//!
//! ```text
//!            conduit-server / conduit-cli
//!                        |
//!                  conduit-core
//!                   |        |
//!          conduit-mapping  conduit-fs
//! ```

pub mod action;
pub mod adapters;
pub mod admin;
pub mod config;
pub mod error;
pub mod filter;
pub mod fingerprint;
pub mod model;
pub mod store;
pub mod sync;

pub use action::{SynchronizationAction, TestRun};
pub use adapters::{
    AdapterRegistry, CallContext, CancellationToken, SourceAdapter, SourceObject, TargetAdapter,
};
pub use admin::AdminService;
pub use config::{ConfigResolver, Settings};
pub use error::{Error, Result};
pub use filter::{Filter, Predicate};
pub use fingerprint::{canonical_json, fingerprint};
pub use model::{
    ContractStatus, JobLog, LogLevel, MappingRecord, MappingSource, RunTrace,
    SynchronizationContract, SynchronizationDefinition,
};
pub use store::{
    ContractStore, DefinitionStore, JobLogStore, MappingStore, ReconcileOutcome, Reconciliation,
    Store,
};
pub use sync::{
    ObjectFailure, PreviewObject, RunGuard, RunLocks, SyncEngine, SyncOptions, SyncOutcome,
    SyncPreview, SyncScope, SyncSession,
};
