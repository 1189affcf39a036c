//! Scripted executor used by the runtime integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use rigger_client::{ClientError, TaskClient};
use rigger_runtime::{PipelineEvent, PipelineNotifier};
use rigger_task::{Operation, OperationKind, RemoteStatus, StartResponse, TaskFamily};

/// What a scripted start call does.
#[derive(Debug, Clone)]
pub enum StartScript {
  Respond(StartResponse),
  /// Fail at the transport level with this HTTP status and body.
  Error(u16, String),
  /// Never answer.
  Hang,
}

/// What a scripted status call does.
#[derive(Debug, Clone)]
pub enum StatusScript {
  Respond(RemoteStatus),
  Error(u16, String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
  Start(OperationKind),
  Status(TaskFamily, String),
}

/// An in-memory executor.
///
/// Start calls pop from a per-operation queue and fall back to an immediate
/// success. Status calls pop from a per-task queue whose last entry repeats;
/// unknown tasks report `not_found`.
#[derive(Default)]
pub struct ScriptedClient {
  starts: Mutex<HashMap<OperationKind, VecDeque<StartScript>>>,
  statuses: Mutex<HashMap<String, VecDeque<StatusScript>>>,
  calls: Mutex<Vec<Call>>,
}

impl ScriptedClient {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn on_start(self, kind: OperationKind, script: StartScript) -> Self {
    self
      .starts
      .lock()
      .unwrap()
      .entry(kind)
      .or_default()
      .push_back(script);
    self
  }

  /// Start `kind` as task `task_id`, which then reports `statuses` in order.
  pub fn task(self, kind: OperationKind, task_id: &str, statuses: Vec<RemoteStatus>) -> Self {
    let client = self.on_start(kind, StartScript::Respond(StartResponse::accepted(task_id)));
    client
      .statuses
      .lock()
      .unwrap()
      .entry(task_id.to_string())
      .or_default()
      .extend(statuses.into_iter().map(StatusScript::Respond));
    client
  }

  pub fn on_status(self, task_id: &str, script: StatusScript) -> Self {
    self
      .statuses
      .lock()
      .unwrap()
      .entry(task_id.to_string())
      .or_default()
      .push_back(script);
    self
  }

  pub fn calls(&self) -> Vec<Call> {
    self.calls.lock().unwrap().clone()
  }

  pub fn status_calls(&self, task_id: &str) -> usize {
    self
      .calls()
      .iter()
      .filter(|c| matches!(c, Call::Status(_, id) if id == task_id))
      .count()
  }

  pub fn start_calls(&self) -> Vec<OperationKind> {
    self
      .calls()
      .into_iter()
      .filter_map(|c| match c {
        Call::Start(kind) => Some(kind),
        Call::Status(..) => None,
      })
      .collect()
  }
}

#[async_trait]
impl TaskClient for ScriptedClient {
  async fn start(&self, operation: &Operation) -> Result<StartResponse, ClientError> {
    self.calls.lock().unwrap().push(Call::Start(operation.kind));
    let script = self
      .starts
      .lock()
      .unwrap()
      .get_mut(&operation.kind)
      .and_then(VecDeque::pop_front);

    match script {
      None => Ok(StartResponse::completed()),
      Some(StartScript::Respond(response)) => Ok(response),
      Some(StartScript::Error(status, body)) => Err(ClientError::Status { status, body }),
      Some(StartScript::Hang) => std::future::pending().await,
    }
  }

  async fn status(&self, family: TaskFamily, task_id: &str) -> Result<RemoteStatus, ClientError> {
    self
      .calls
      .lock()
      .unwrap()
      .push(Call::Status(family, task_id.to_string()));

    let script = {
      let mut statuses = self.statuses.lock().unwrap();
      match statuses.get_mut(task_id) {
        Some(queue) if queue.len() > 1 => queue.pop_front(),
        Some(queue) => queue.front().cloned(),
        None => None,
      }
    };

    match script {
      None => Ok(RemoteStatus::not_found()),
      Some(StatusScript::Respond(status)) => Ok(status),
      Some(StatusScript::Error(status, body)) => Err(ClientError::Status { status, body }),
    }
  }
}

/// Records every event it receives.
#[derive(Default)]
pub struct RecordingNotifier {
  events: Mutex<Vec<PipelineEvent>>,
}

impl RecordingNotifier {
  pub fn events(&self) -> Vec<PipelineEvent> {
    self.events.lock().unwrap().clone()
  }
}

impl PipelineNotifier for RecordingNotifier {
  fn notify(&self, event: PipelineEvent) {
    self.events.lock().unwrap().push(event);
  }
}

/// Sleep in small steps until `condition` holds. Meant for paused-clock tests.
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
  for _ in 0..1000 {
    if condition() {
      return;
    }
    tokio::time::sleep(Duration::from_millis(50)).await;
  }
  panic!("condition not reached");
}
