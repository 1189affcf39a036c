//! Steps, their observable descriptors, and the runner that executes one.

use std::sync::{PoisonError, RwLock};

use rigger_client::TaskClient;
use rigger_task::{LogLine, Operation, TaskHandle};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::events::{PipelineEvent, PipelineNotifier};
use crate::outcome::{PollOutcome, StepOutcome};
use crate::poller::{Poller, TIMEOUT_MESSAGE, deadline_elapsed};
use crate::settings::PipelineSettings;
use crate::sink::LogSink;

/// Progress of one step.
///
/// Moves `Pending → Active → {Completed, Error}` and nowhere else; only a
/// pipeline reset puts a step back to `Pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
  Pending,
  Active,
  Completed,
  Error,
}

/// Observable state of one step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepDescriptor {
  pub label: String,
  pub status: StepStatus,
  /// Failure message, present only when `status` is `Error`.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub error: Option<String>,
}

impl StepDescriptor {
  pub fn new(label: impl Into<String>) -> Self {
    Self {
      label: label.into(),
      status: StepStatus::Pending,
      error: None,
    }
  }

  fn activate(&mut self) -> bool {
    self.transition(StepStatus::Pending, StepStatus::Active)
  }

  fn complete(&mut self) -> bool {
    self.transition(StepStatus::Active, StepStatus::Completed)
  }

  fn fail(&mut self, message: &str) -> bool {
    let moved = self.transition(StepStatus::Active, StepStatus::Error);
    if moved {
      self.error = Some(message.to_string());
    }
    moved
  }

  fn reset(&mut self) {
    self.status = StepStatus::Pending;
    self.error = None;
  }

  fn transition(&mut self, from: StepStatus, to: StepStatus) -> bool {
    if self.status != from {
      warn!(step = %self.label, from = ?self.status, to = ?to, "ignoring illegal step transition");
      return false;
    }
    self.status = to;
    true
  }
}

/// One named unit of remote work.
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
  pub label: String,
  pub operation: Operation,
}

impl Step {
  pub fn new(label: impl Into<String>, operation: Operation) -> Self {
    Self {
      label: label.into(),
      operation,
    }
  }

  /// A step labelled after its operation.
  pub fn from_operation(operation: Operation) -> Self {
    Self::new(operation.kind.label(), operation)
  }
}

/// Descriptors of every step of a pipeline, shared with observers.
#[derive(Debug)]
pub(crate) struct StepBoard {
  steps: RwLock<Vec<StepDescriptor>>,
}

impl StepBoard {
  pub(crate) fn new(steps: &[Step]) -> Self {
    Self {
      steps: RwLock::new(steps.iter().map(|s| StepDescriptor::new(&s.label)).collect()),
    }
  }

  pub(crate) fn snapshot(&self) -> Vec<StepDescriptor> {
    self
      .steps
      .read()
      .unwrap_or_else(PoisonError::into_inner)
      .clone()
  }

  pub(crate) fn reset(&self) {
    let mut steps = self.steps.write().unwrap_or_else(PoisonError::into_inner);
    steps.iter_mut().for_each(StepDescriptor::reset);
  }

  fn update<R>(&self, index: usize, f: impl FnOnce(&mut StepDescriptor) -> R) -> Option<R> {
    let mut steps = self.steps.write().unwrap_or_else(PoisonError::into_inner);
    steps.get_mut(index).map(f)
  }
}

/// Executes one step of a run: start call, optional polling, descriptor
/// updates, and log forwarding.
pub(crate) struct StepRunner<'a> {
  pub(crate) pipeline: &'a str,
  pub(crate) run_id: &'a str,
  pub(crate) client: &'a dyn TaskClient,
  pub(crate) settings: &'a PipelineSettings,
  pub(crate) board: &'a StepBoard,
  pub(crate) sink: &'a LogSink,
  pub(crate) notifier: &'a dyn PipelineNotifier,
  pub(crate) cancel: &'a CancellationToken,
  pub(crate) deadline: Option<Instant>,
}

impl StepRunner<'_> {
  /// Run the step at `index`.
  ///
  /// A cancelled step keeps whatever status it had; cancellation is never
  /// recorded as an error.
  #[instrument(
    name = "step_run",
    skip(self, index, step),
    fields(
      pipeline = %self.pipeline,
      run_id = %self.run_id,
      step = %step.label,
      operation = %step.operation.kind,
    )
  )]
  pub(crate) async fn run(&self, index: usize, step: &Step) -> StepOutcome {
    self.board.update(index, StepDescriptor::activate);
    self.notifier.notify(PipelineEvent::StepStarted {
      run_id: self.run_id.to_string(),
      pipeline: self.pipeline.to_string(),
      step: step.label.clone(),
    });
    info!("step_started");

    let outcome = self.execute(step).await;

    match &outcome {
      StepOutcome::Completed => {
        self.board.update(index, StepDescriptor::complete);
        self.notifier.notify(PipelineEvent::StepCompleted {
          run_id: self.run_id.to_string(),
          pipeline: self.pipeline.to_string(),
          step: step.label.clone(),
        });
        info!("step_completed");
      }
      StepOutcome::Failed { message } => {
        self.board.update(index, |d| d.fail(message));
        self.notifier.notify(PipelineEvent::StepFailed {
          run_id: self.run_id.to_string(),
          pipeline: self.pipeline.to_string(),
          step: step.label.clone(),
          error: message.clone(),
        });
        error!(error = %message, "step_failed");
      }
      StepOutcome::Cancelled => {
        info!("step_cancelled");
      }
    }

    outcome
  }

  async fn execute(&self, step: &Step) -> StepOutcome {
    let started = tokio::select! {
      biased;
      _ = self.cancel.cancelled() => return StepOutcome::Cancelled,
      started = self.client.start(&step.operation) => started,
      _ = deadline_elapsed(self.deadline) => return timed_out(),
    };

    let response = match started {
      Ok(response) => response,
      Err(e) => {
        return StepOutcome::Failed {
          message: e.to_string(),
        };
      }
    };
    if !response.success {
      return StepOutcome::Failed {
        message: response.failure_message(),
      };
    }

    if let Some(message) = response
      .message
      .as_deref()
      .map(str::trim)
      .filter(|m| !m.is_empty())
    {
      self.forward(step, vec![LogLine::new(message)]);
    }

    let Some(task_id) = response.task_id.filter(|id| !id.is_empty()) else {
      debug!("operation finished during start call");
      return StepOutcome::Completed;
    };

    let family = step.operation.family();
    let mut handle = TaskHandle::new(task_id);
    let poller = Poller::new(self.settings.interval_for(family), self.cancel.clone())
      .with_deadline(self.deadline);

    let outcome = poller
      .poll(self.client, family, &mut handle, |lines| {
        self.forward(step, lines)
      })
      .await;

    match outcome {
      PollOutcome::Completed => StepOutcome::Completed,
      PollOutcome::Failed { message } => StepOutcome::Failed { message },
      PollOutcome::Cancelled => StepOutcome::Cancelled,
      PollOutcome::TimedOut => timed_out(),
    }
  }

  fn forward(&self, step: &Step, lines: Vec<LogLine>) {
    self.sink.extend(lines.iter().cloned());
    self.notifier.notify(PipelineEvent::StepLog {
      run_id: self.run_id.to_string(),
      pipeline: self.pipeline.to_string(),
      step: step.label.clone(),
      lines,
    });
  }
}

fn timed_out() -> StepOutcome {
  StepOutcome::Failed {
    message: TIMEOUT_MESSAGE.to_string(),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use rigger_task::OperationKind;

  #[test]
  fn test_descriptor_lifecycle() {
    let mut descriptor = StepDescriptor::new("Ping nodes");
    assert_eq!(descriptor.status, StepStatus::Pending);

    assert!(descriptor.activate());
    assert!(descriptor.fail("unreachable"));
    assert_eq!(descriptor.status, StepStatus::Error);
    assert_eq!(descriptor.error.as_deref(), Some("unreachable"));

    descriptor.reset();
    assert_eq!(descriptor, StepDescriptor::new("Ping nodes"));
  }

  #[test]
  fn test_descriptor_rejects_skipped_states() {
    let mut descriptor = StepDescriptor::new("Deploy cluster");
    assert!(!descriptor.complete());
    assert_eq!(descriptor.status, StepStatus::Pending);

    descriptor.activate();
    descriptor.complete();
    assert!(!descriptor.fail("late"));
    assert_eq!(descriptor.status, StepStatus::Completed);
    assert!(descriptor.error.is_none());
  }

  #[test]
  fn test_step_from_operation_uses_kind_label() {
    let step = Step::from_operation(Operation::new(OperationKind::DistributeKeys));
    assert_eq!(step.label, "Distribute SSH keys");
  }

  #[test]
  fn test_board_update_out_of_range() {
    let board = StepBoard::new(&[Step::from_operation(Operation::new(
      OperationKind::PingNodes,
    ))]);
    assert!(board.update(3, StepDescriptor::activate).is_none());
    assert_eq!(board.snapshot()[0].status, StepStatus::Pending);
  }
}
