use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Severity of a run outcome or log record
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    #[default]
    Info,
    Warning,
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Info => "INFO",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
        })
    }
}

/// Immutable record of one Run Action execution
///
/// `stackTrace` lists every step in the order it was started, ending with the
/// terminal message. `executionTime` is in milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunTrace {
    uuid: Uuid,
    level: LogLevel,
    message: String,
    stack_trace: Vec<String>,
    arguments: Value,
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
    execution_time: u64,
}

impl RunTrace {
    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    pub fn level(&self) -> LogLevel {
        self.level
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn stack_trace(&self) -> &[String] {
        &self.stack_trace
    }

    pub fn arguments(&self) -> &Value {
        &self.arguments
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn finished_at(&self) -> DateTime<Utc> {
        self.finished_at
    }

    /// Wall-clock duration in milliseconds
    pub fn execution_time(&self) -> u64 {
        self.execution_time
    }
}

/// Append-only accumulator consumed into a [`RunTrace`]
#[derive(Debug)]
pub struct TraceBuilder {
    uuid: Uuid,
    arguments: Value,
    started_at: DateTime<Utc>,
    steps: Vec<String>,
}

impl TraceBuilder {
    pub fn start(arguments: Value) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            arguments,
            started_at: Utc::now(),
            steps: Vec::new(),
        }
    }

    /// Record a step before attempting it.
    pub fn step(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::debug!(step = %message, "Run step");
        self.steps.push(message);
    }

    /// Close the trace; the terminal message is also the last step.
    pub fn finish(mut self, level: LogLevel, message: impl Into<String>) -> RunTrace {
        let message = message.into();
        self.steps.push(message.clone());
        let finished_at = Utc::now();
        let execution_time = (finished_at - self.started_at)
            .num_milliseconds()
            .max(0) as u64;

        RunTrace {
            uuid: self.uuid,
            level,
            message,
            stack_trace: self.steps,
            arguments: self.arguments,
            started_at: self.started_at,
            finished_at,
            execution_time,
        }
    }
}
