use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Lifecycle state reported by the backend's task queue. Anything the client does not know
/// (e.g. `PROGRESS`, `RETRY`) is kept verbatim and treated as non-terminal.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(from = "String", into = "String")]
pub enum TaskState {
    Pending,
    Success,
    Failure,
    Other(String),
}

impl TaskState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskState::Success | TaskState::Failure)
    }

    pub fn as_str(&self) -> &str {
        match self {
            TaskState::Pending => "PENDING",
            TaskState::Success => "SUCCESS",
            TaskState::Failure => "FAILURE",
            TaskState::Other(state) => state,
        }
    }
}

impl From<String> for TaskState {
    fn from(state: String) -> Self {
        match state.as_str() {
            "PENDING" => TaskState::Pending,
            "SUCCESS" => TaskState::Success,
            "FAILURE" => TaskState::Failure,
            _ => TaskState::Other(state),
        }
    }
}

impl From<TaskState> for String {
    fn from(state: TaskState) -> Self {
        state.as_str().to_string()
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One status snapshot. Replaced wholesale on every poll, never merged.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TaskStatus {
    pub state: TaskState,
    #[serde(default)]
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl TaskStatus {
    pub fn pending(status: impl Into<String>, progress: Option<f64>) -> Self {
        Self {
            state: TaskState::Pending,
            status: status.into(),
            progress,
            result: None,
            error: None,
        }
    }

    pub fn in_state(state: TaskState, status: impl Into<String>, progress: Option<f64>) -> Self {
        Self {
            state,
            status: status.into(),
            progress,
            result: None,
            error: None,
        }
    }

    pub fn success(result: Value) -> Self {
        Self {
            state: TaskState::Success,
            status: "Completado".to_string(),
            progress: None,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            state: TaskState::Failure,
            status: "Fallido".to_string(),
            progress: None,
            result: None,
            error: Some(error.into()),
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Result payload; `None` unless the task succeeded.
    pub fn result(&self) -> Option<&Value> {
        match self.state {
            TaskState::Success => self.result.as_ref(),
            _ => None,
        }
    }

    /// Failure message; `None` unless the task failed.
    pub fn error(&self) -> Option<&str> {
        match self.state {
            TaskState::Failure => self.error.as_deref(),
            _ => None,
        }
    }
}

/// Opaque identifier of a server-side analysis job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskHandle(String);

impl TaskHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What an upload produced: a job to poll, or a file stored right away (`raw` uploads).
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    Task {
        handle: TaskHandle,
        message: Option<String>,
    },
    Stored {
        file_url: Option<String>,
        analysis_id: Option<i64>,
        message: Option<String>,
    },
}

impl SubmitOutcome {
    pub fn task_handle(&self) -> Option<&TaskHandle> {
        match self {
            SubmitOutcome::Task { handle, .. } => Some(handle),
            SubmitOutcome::Stored { .. } => None,
        }
    }
}
