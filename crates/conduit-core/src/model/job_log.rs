use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::trace::{LogLevel, RunTrace};

fn default_message() -> String {
    "success".to_string()
}

fn default_execution_time() -> i64 {
    3600
}

/// Persisted record of one job execution
///
/// Every field is always serialized, absent values as `null`. Unknown keys are
/// ignored when decoding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobLog {
    #[serde(default)]
    pub id: i64,
    pub uuid: Uuid,
    #[serde(default)]
    pub level: LogLevel,
    #[serde(default = "default_message")]
    pub message: String,
    #[serde(default)]
    pub job_id: Option<String>,
    #[serde(default)]
    pub job_list_id: Option<String>,
    #[serde(default)]
    pub job_class: Option<String>,
    #[serde(default)]
    pub arguments: Value,
    /// Whole seconds
    #[serde(default = "default_execution_time")]
    pub execution_time: i64,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub stack_trace: Vec<String>,
    #[serde(default)]
    pub expires: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_run: Option<DateTime<Utc>>,
    #[serde(default)]
    pub next_run: Option<DateTime<Utc>>,
    pub created: DateTime<Utc>,
}

impl JobLog {
    /// Build the log entry for a finished run, expiring `retention` after creation.
    ///
    /// A retention reaching past the representable range never expires.
    pub fn from_trace(trace: &RunTrace, job_class: &str, retention: Duration) -> Self {
        let created = trace.finished_at();
        Self {
            id: 0,
            uuid: Uuid::new_v4(),
            level: trace.level(),
            message: trace.message().to_string(),
            job_id: Some(trace.uuid().to_string()),
            job_list_id: None,
            job_class: Some(job_class.to_string()),
            arguments: trace.arguments().clone(),
            execution_time: (trace.execution_time() / 1000) as i64,
            user_id: None,
            session_id: None,
            stack_trace: trace.stack_trace().to_vec(),
            expires: created.checked_add_signed(retention),
            last_run: Some(trace.started_at()),
            next_run: None,
            created,
        }
    }

    /// The synchronization this log belongs to, if its arguments name one
    pub fn synchronization_id(&self) -> Option<i64> {
        match self.arguments.get("synchronizationId")? {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires.is_some_and(|expires| expires <= now)
    }
}
