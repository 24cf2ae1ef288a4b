//! In-process adapters for embedding and tests
//!
//! Both adapters are cheap handles over shared state: keep a clone to feed
//! or inspect the data while the registry holds another.

use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::{AdapterConfig, CallContext, SourceAdapter, SourceObject, SourceObjects, TargetAdapter};
use crate::{Error, Result};

fn poison_err<T>(_: PoisonError<T>) -> Error {
    Error::Persistence("memory adapter lock poisoned".to_string())
}

#[derive(Debug, Default)]
struct SourceState {
    objects: Vec<SourceObject>,
    unavailable: Option<String>,
}

/// Source serving a mutable list of objects
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    state: Arc<Mutex<SourceState>>,
}

impl MemorySource {
    pub const TYPE: &'static str = "memory";

    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `(originId, payload)` pairs.
    pub fn with_objects<I, K>(objects: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        let source = Self::new();
        source.replace(objects);
        source
    }

    fn lock(&self) -> Result<MutexGuard<'_, SourceState>> {
        self.state.lock().map_err(poison_err)
    }

    /// Replace the served objects.
    pub fn replace<I, K>(&self, objects: I)
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        let objects = objects
            .into_iter()
            .map(|(id, payload)| SourceObject::new(id, payload))
            .collect();
        if let Ok(mut state) = self.lock() {
            state.objects = objects;
        }
    }

    pub fn push(&self, origin_id: impl Into<String>, payload: Value) {
        if let Ok(mut state) = self.lock() {
            state.objects.push(SourceObject::new(origin_id, payload));
        }
    }

    pub fn remove(&self, origin_id: &str) {
        if let Ok(mut state) = self.lock() {
            state.objects.retain(|object| object.origin_id != origin_id);
        }
    }

    /// Make every fetch fail with [`Error::SourceUnavailable`] until cleared.
    pub fn set_unavailable(&self, reason: Option<&str>) {
        if let Ok(mut state) = self.lock() {
            state.unavailable = reason.map(str::to_string);
        }
    }
}

impl SourceAdapter for MemorySource {
    fn fetch(&self, _config: &AdapterConfig, ctx: &CallContext) -> Result<SourceObjects> {
        ctx.check("memory fetch")?;
        let state = self.lock()?;
        if let Some(reason) = &state.unavailable {
            return Err(Error::SourceUnavailable(reason.clone()));
        }
        Ok(Box::new(state.objects.clone().into_iter().map(Ok)))
    }
}

type Rejection = Arc<dyn Fn(&Value) -> Option<String> + Send + Sync>;

#[derive(Default)]
struct TargetState {
    objects: BTreeMap<String, Value>,
    next_id: u64,
    writes: usize,
    deletes: usize,
    failing_deletes: BTreeSet<String>,
    rejection: Option<Rejection>,
}

/// Target keeping written objects in a map
#[derive(Clone, Default)]
pub struct MemoryTarget {
    state: Arc<Mutex<TargetState>>,
}

impl std::fmt::Debug for MemoryTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryTarget").finish_non_exhaustive()
    }
}

impl MemoryTarget {
    pub const TYPE: &'static str = "memory";

    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, TargetState>> {
        self.state.lock().map_err(poison_err)
    }

    /// Reject payloads for which `rule` returns a reason.
    pub fn reject_when(&self, rule: impl Fn(&Value) -> Option<String> + Send + Sync + 'static) {
        if let Ok(mut state) = self.lock() {
            state.rejection = Some(Arc::new(rule));
        }
    }

    /// Make deleting `target_id` fail with [`Error::TargetUnavailable`].
    pub fn fail_delete(&self, target_id: impl Into<String>) {
        if let Ok(mut state) = self.lock() {
            state.failing_deletes.insert(target_id.into());
        }
    }

    /// Snapshot of stored objects by target id
    pub fn objects(&self) -> BTreeMap<String, Value> {
        self.lock().map(|s| s.objects.clone()).unwrap_or_default()
    }

    pub fn get(&self, target_id: &str) -> Option<Value> {
        self.lock().ok()?.objects.get(target_id).cloned()
    }

    /// Number of successful writes so far
    pub fn write_count(&self) -> usize {
        self.lock().map(|s| s.writes).unwrap_or_default()
    }

    /// Number of successful deletes so far
    pub fn delete_count(&self) -> usize {
        self.lock().map(|s| s.deletes).unwrap_or_default()
    }
}

impl TargetAdapter for MemoryTarget {
    fn write(
        &self,
        _config: &AdapterConfig,
        payload: &Value,
        existing_target_id: Option<&str>,
        ctx: &CallContext,
    ) -> Result<String> {
        ctx.check("memory write")?;
        let mut state = self.lock()?;
        if let Some(reason) = state.rejection.as_ref().and_then(|rule| rule(payload)) {
            return Err(Error::TargetRejected(reason));
        }

        let target_id = match existing_target_id {
            Some(id) => id.to_string(),
            None => {
                state.next_id += 1;
                format!("mem-{}", state.next_id)
            }
        };
        state.objects.insert(target_id.clone(), payload.clone());
        state.writes += 1;
        Ok(target_id)
    }

    fn delete(&self, _config: &AdapterConfig, target_id: &str, ctx: &CallContext) -> Result<()> {
        ctx.check("memory delete")?;
        let mut state = self.lock()?;
        if state.failing_deletes.contains(target_id) {
            return Err(Error::TargetUnavailable(format!(
                "cannot delete {target_id}"
            )));
        }
        if state.objects.remove(target_id).is_some() {
            state.deletes += 1;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;

    #[test]
    fn test_source_shares_state_between_clones() {
        let source = MemorySource::with_objects([("1", json!({"a": 1}))]);
        let handle = source.clone();
        handle.push("2", json!({"a": 2}));

        let ctx = CallContext::new(Duration::from_secs(1));
        let ids: Vec<String> = source
            .fetch(&AdapterConfig::new(), &ctx)
            .unwrap()
            .map(|o| o.unwrap().origin_id)
            .collect();
        assert_eq!(ids, vec!["1", "2"]);

        handle.set_unavailable(Some("offline"));
        assert!(matches!(
            source.fetch(&AdapterConfig::new(), &ctx),
            Err(Error::SourceUnavailable(_))
        ));
    }

    #[test]
    fn test_target_rejection_and_delete_failure() {
        let target = MemoryTarget::new();
        let ctx = CallContext::new(Duration::from_secs(1));
        target.reject_when(|p| p.get("bad").map(|_| "bad payload".to_string()));

        let err = target
            .write(&AdapterConfig::new(), &json!({"bad": true}), None, &ctx)
            .unwrap_err();
        assert!(matches!(err, Error::TargetRejected(_)));

        let id = target
            .write(&AdapterConfig::new(), &json!({"ok": true}), None, &ctx)
            .unwrap();
        target.fail_delete(id.clone());
        assert!(target.delete(&AdapterConfig::new(), &id, &ctx).is_err());
        assert_eq!(target.write_count(), 1);
        assert_eq!(target.delete_count(), 0);
    }
}
