use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Synchronization state of one contract
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContractStatus {
    /// Seen in the source, not yet written (or changed since the last write)
    #[default]
    Pending,
    /// Target holds the content matching `originHash`
    Synced,
    /// The last attempt failed; see `lastError`
    Failed,
}

/// Durable link between one source object and its target object
///
/// There is at most one contract per (`synchronizationId`, `originId`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SynchronizationContract {
    pub id: i64,
    pub uuid: Uuid,
    pub synchronization_id: i64,
    pub origin_id: String,
    #[serde(default)]
    pub target_id: Option<String>,
    /// Fingerprint of the content last written to the target
    #[serde(default)]
    pub origin_hash: Option<String>,
    /// Checksum of the mapped payload last written
    #[serde(default)]
    pub target_hash: Option<String>,
    #[serde(default)]
    pub status: ContractStatus,
    #[serde(default)]
    pub last_error: Option<String>,
    #[serde(default)]
    pub source_last_changed: Option<DateTime<Utc>>,
    #[serde(default)]
    pub target_last_synced: Option<DateTime<Utc>>,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

impl SynchronizationContract {
    /// A fresh pending contract; the store assigns the id.
    pub fn pending(synchronization_id: i64, origin_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            uuid: Uuid::new_v4(),
            synchronization_id,
            origin_id: origin_id.into(),
            target_id: None,
            origin_hash: None,
            target_hash: None,
            status: ContractStatus::Pending,
            last_error: None,
            source_last_changed: Some(now),
            target_last_synced: None,
            created: now,
            updated: now,
        }
    }
}
