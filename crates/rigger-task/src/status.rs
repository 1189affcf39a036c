//! Executor wire types.

use serde::{Deserialize, Serialize};

/// Lifecycle state of a remote task as reported by the executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
  Running,
  Completed,
  Failed,
  NotFound,
}

impl TaskState {
  /// Whether polling stops at this state.
  pub fn is_terminal(self) -> bool {
    !matches!(self, TaskState::Running)
  }
}

/// Response of a status call.
///
/// `logs` is the cumulative log of the task, not a delta.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteStatus {
  pub status: TaskState,
  #[serde(default)]
  pub logs: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub error: Option<String>,
}

impl RemoteStatus {
  pub fn running(logs: impl Into<String>) -> Self {
    Self {
      status: TaskState::Running,
      logs: logs.into(),
      error: None,
    }
  }

  pub fn completed(logs: impl Into<String>) -> Self {
    Self {
      status: TaskState::Completed,
      logs: logs.into(),
      error: None,
    }
  }

  pub fn failed(logs: impl Into<String>, error: impl Into<String>) -> Self {
    Self {
      status: TaskState::Failed,
      logs: logs.into(),
      error: Some(error.into()),
    }
  }

  pub fn not_found() -> Self {
    Self {
      status: TaskState::NotFound,
      logs: String::new(),
      error: None,
    }
  }
}

/// Response of a start call.
///
/// A successful start either carries a task id (asynchronous work to be
/// polled) or none (the call itself ran the operation to completion).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartResponse {
  pub success: bool,
  #[serde(default, alias = "task_id", skip_serializing_if = "Option::is_none")]
  pub task_id: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub message: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub error: Option<String>,
}

impl StartResponse {
  /// Accepted asynchronous work identified by `task_id`.
  pub fn accepted(task_id: impl Into<String>) -> Self {
    Self {
      success: true,
      task_id: Some(task_id.into()),
      ..Self::default()
    }
  }

  /// Work that already finished during the start call.
  pub fn completed() -> Self {
    Self {
      success: true,
      ..Self::default()
    }
  }

  /// A start call the executor refused.
  pub fn rejected(message: impl Into<String>) -> Self {
    Self {
      success: false,
      message: Some(message.into()),
      ..Self::default()
    }
  }

  pub fn with_message(mut self, message: impl Into<String>) -> Self {
    self.message = Some(message.into());
    self
  }

  /// User-facing reason for a refused start: `message`, then `error`, then a
  /// generic fallback.
  pub fn failure_message(&self) -> String {
    [self.message.as_deref(), self.error.as_deref()]
      .into_iter()
      .flatten()
      .map(str::trim)
      .find(|m| !m.is_empty())
      .unwrap_or("operation failed to start")
      .to_string()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_status_from_wire() {
    let status: RemoteStatus = serde_json::from_value(json!({
      "status": "failed",
      "logs": "TASK [x]\n",
      "error": "permission denied"
    }))
    .unwrap();
    assert_eq!(status, RemoteStatus::failed("TASK [x]\n", "permission denied"));

    let status: RemoteStatus = serde_json::from_value(json!({ "status": "not_found" })).unwrap();
    assert_eq!(status, RemoteStatus::not_found());
  }

  #[test]
  fn test_terminal_states() {
    assert!(!TaskState::Running.is_terminal());
    assert!(TaskState::Completed.is_terminal());
    assert!(TaskState::Failed.is_terminal());
    assert!(TaskState::NotFound.is_terminal());
  }

  #[test]
  fn test_start_response_accepts_both_id_spellings() {
    let camel: StartResponse =
      serde_json::from_value(json!({ "success": true, "taskId": "t1" })).unwrap();
    let snake: StartResponse =
      serde_json::from_value(json!({ "success": true, "task_id": "t1" })).unwrap();
    assert_eq!(camel, StartResponse::accepted("t1"));
    assert_eq!(snake, StartResponse::accepted("t1"));
  }

  #[test]
  fn test_failure_message_preference() {
    assert_eq!(StartResponse::rejected("disk full").failure_message(), "disk full");

    let only_error = StartResponse {
      error: Some("no route to host".to_string()),
      ..StartResponse::default()
    };
    assert_eq!(only_error.failure_message(), "no route to host");

    let blank = StartResponse {
      message: Some("  ".to_string()),
      ..StartResponse::default()
    };
    assert_eq!(blank.failure_message(), "operation failed to start");
  }
}
