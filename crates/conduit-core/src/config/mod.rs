//! Layered configuration
//!
//! Settings are read from up to three TOML files, later layers overriding
//! earlier ones key by key:
//!
//! 1. `<config_dir>/conduit/config.toml` (user-wide defaults)
//! 2. `<data_dir>/conduit.toml`
//! 3. `<data_dir>/conduit.local.toml` (machine-local overrides)
//!
//! ```toml
//! [server]
//! host = "127.0.0.1"
//! port = 8080
//!
//! [sync]
//! callTimeoutSecs = 30
//! failFast = false
//! lockDir = "/var/lock/conduit"
//!
//! [logs]
//! retentionDays = 7
//! ```

mod resolver;

pub use resolver::ConfigResolver;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::sync::{RunLocks, SyncOptions};
use crate::{Error, Result};

/// Upper bound for `sync.callTimeoutSecs` (one day)
pub const MAX_CALL_TIMEOUT_SECS: u64 = 86_400;
/// Upper bound for `logs.retentionDays` (one hundred years)
pub const MAX_RETENTION_DAYS: i64 = 36_500;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SyncSettings {
    /// Deadline for each adapter call, in seconds
    pub call_timeout_secs: u64,
    pub fail_fast: bool,
    /// Directory for cross-process run lock files
    pub lock_dir: Option<PathBuf>,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            call_timeout_secs: 30,
            fail_fast: false,
            lock_dir: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LogSettings {
    /// Days a job log is kept before it may be purged
    pub retention_days: i64,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self { retention_days: 7 }
    }
}

/// Effective configuration after merging all layers
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub sync: SyncSettings,
    pub logs: LogSettings,
}

impl Settings {
    /// Reject values the engine cannot turn into deadlines or expiry dates.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidInput`] naming the offending key.
    pub fn validate(&self) -> Result<()> {
        if !(1..=MAX_CALL_TIMEOUT_SECS).contains(&self.sync.call_timeout_secs) {
            return Err(Error::InvalidInput(format!(
                "sync.callTimeoutSecs must be between 1 and {MAX_CALL_TIMEOUT_SECS}, got {}",
                self.sync.call_timeout_secs
            )));
        }
        if !(0..=MAX_RETENTION_DAYS).contains(&self.logs.retention_days) {
            return Err(Error::InvalidInput(format!(
                "logs.retentionDays must be between 0 and {MAX_RETENTION_DAYS}, got {}",
                self.logs.retention_days
            )));
        }
        Ok(())
    }

    pub fn sync_options(&self) -> SyncOptions {
        SyncOptions {
            call_timeout: Duration::from_secs(self.sync.call_timeout_secs),
            fail_fast: self.sync.fail_fast,
            ..SyncOptions::default()
        }
    }

    pub fn run_locks(&self) -> RunLocks {
        match &self.sync.lock_dir {
            Some(dir) => RunLocks::with_lock_dir(dir.as_path()),
            None => RunLocks::new(),
        }
    }

    /// Job log retention; saturates for values [`Settings::validate`] rejects
    pub fn log_retention(&self) -> chrono::TimeDelta {
        chrono::TimeDelta::try_days(self.logs.retention_days).unwrap_or(chrono::TimeDelta::MAX)
    }
}
