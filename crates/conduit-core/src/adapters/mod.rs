//! Source and target adapters
//!
//! Adapters are the only place the engine touches external systems. A
//! definition's `sourceConfig.type` and `targetConfig.type` select the
//! registered adapter; the rest of the config object is handed to it as-is.

mod json_directory;
mod json_file;
pub mod memory;

pub use json_directory::JsonDirectoryTarget;
pub use json_file::JsonFileSource;

use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::{Error, Result};

/// Adapter-specific configuration object
pub type AdapterConfig = Map<String, Value>;

/// One object pulled from a source
#[derive(Debug, Clone, PartialEq)]
pub struct SourceObject {
    pub origin_id: String,
    pub payload: Value,
}

impl SourceObject {
    pub fn new(origin_id: impl Into<String>, payload: Value) -> Self {
        Self {
            origin_id: origin_id.into(),
            payload,
        }
    }
}

/// Lazily produced source objects; an `Err` item aborts the run
pub type SourceObjects = Box<dyn Iterator<Item = Result<SourceObject>>>;

/// Reads objects from a source system
pub trait SourceAdapter: Send + Sync {
    /// Start fetching.
    ///
    /// # Errors
    ///
    /// [`Error::SourceUnavailable`] when the source cannot be read and
    /// [`Error::Timeout`] when `ctx` expires.
    fn fetch(&self, config: &AdapterConfig, ctx: &CallContext) -> Result<SourceObjects>;
}

/// Writes objects to and deletes objects from a target system
pub trait TargetAdapter: Send + Sync {
    /// Create or update a target object, returning its id.
    ///
    /// `existing_target_id` is the id from the previous successful write.
    fn write(
        &self,
        config: &AdapterConfig,
        payload: &Value,
        existing_target_id: Option<&str>,
        ctx: &CallContext,
    ) -> Result<String>;

    fn delete(&self, config: &AdapterConfig, target_id: &str, ctx: &CallContext) -> Result<()>;
}

/// Cooperative cancellation flag shared between a run and its controller
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Deadline for one adapter call
///
/// A timeout too large to add to the current instant means no deadline.
#[derive(Debug, Clone)]
pub struct CallContext {
    deadline: Option<Instant>,
    timeout: Duration,
}

impl CallContext {
    pub fn new(timeout: Duration) -> Self {
        Self {
            deadline: Instant::now().checked_add(timeout),
            timeout,
        }
    }

    pub fn remaining(&self) -> Duration {
        self.deadline
            .map_or(Duration::MAX, |deadline| deadline.saturating_duration_since(Instant::now()))
    }

    pub fn is_expired(&self) -> bool {
        self.deadline.is_some_and(|deadline| Instant::now() >= deadline)
    }

    /// Fail with [`Error::Timeout`] once the deadline has passed.
    pub fn check(&self, operation: &str) -> Result<()> {
        if self.is_expired() {
            return Err(Error::Timeout {
                operation: operation.to_string(),
                seconds: self.timeout.as_secs(),
            });
        }
        Ok(())
    }
}

/// Adapters keyed by their config `type`
#[derive(Clone, Default)]
pub struct AdapterRegistry {
    sources: HashMap<String, Arc<dyn SourceAdapter>>,
    targets: HashMap<String, Arc<dyn TargetAdapter>>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the file-based adapters: `json_file` and `json_directory`
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register_source(JsonFileSource::TYPE, Arc::new(JsonFileSource));
        registry.register_target(JsonDirectoryTarget::TYPE, Arc::new(JsonDirectoryTarget));
        registry
    }

    pub fn register_source(&mut self, kind: impl Into<String>, adapter: Arc<dyn SourceAdapter>) {
        self.sources.insert(kind.into(), adapter);
    }

    pub fn register_target(&mut self, kind: impl Into<String>, adapter: Arc<dyn TargetAdapter>) {
        self.targets.insert(kind.into(), adapter);
    }

    pub fn source(&self, kind: &str) -> Result<Arc<dyn SourceAdapter>> {
        self.sources
            .get(kind)
            .cloned()
            .ok_or_else(|| Error::InvalidInput(format!("Unknown source type '{kind}'")))
    }

    pub fn target(&self, kind: &str) -> Result<Arc<dyn TargetAdapter>> {
        self.targets
            .get(kind)
            .cloned()
            .ok_or_else(|| Error::InvalidInput(format!("Unknown target type '{kind}'")))
    }

    /// Registered source types, sorted
    pub fn source_types(&self) -> Vec<&str> {
        let mut kinds: Vec<&str> = self.sources.keys().map(String::as_str).collect();
        kinds.sort_unstable();
        kinds
    }

    /// Registered target types, sorted
    pub fn target_types(&self) -> Vec<&str> {
        let mut kinds: Vec<&str> = self.targets.keys().map(String::as_str).collect();
        kinds.sort_unstable();
        kinds
    }
}

impl std::fmt::Debug for AdapterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdapterRegistry")
            .field("sources", &self.source_types())
            .field("targets", &self.target_types())
            .finish()
    }
}

/// Required string option from an adapter config
pub(crate) fn required_str<'a>(config: &'a AdapterConfig, key: &str) -> Result<&'a str> {
    config
        .get(key)
        .and_then(Value::as_str)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| Error::InvalidInput(format!("adapter option '{key}' is required")))
}
