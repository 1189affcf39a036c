//! Outcomes of polls, steps and pipeline runs.

use rigger_task::LogLine;
use serde::{Deserialize, Serialize};

/// How a poll loop ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
  /// The task reached `completed`.
  Completed,
  /// The task failed, disappeared, or its status could not be fetched.
  Failed { message: String },
  /// The loop was cancelled; says nothing about the task itself.
  Cancelled,
  /// The run's deadline passed before the task reached a terminal state.
  TimedOut,
}

/// How a single step ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
  Completed,
  Failed { message: String },
  Cancelled,
}

impl StepOutcome {
  pub fn is_completed(&self) -> bool {
    matches!(self, StepOutcome::Completed)
  }
}

/// Result of one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineResult {
  /// Unique id of this run.
  pub run_id: String,
  pub succeeded: bool,
  /// Label of the step that failed, when a step failed.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub failed_step_label: Option<String>,
  /// Failure message surfaced by the failed step.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub error: Option<String>,
  /// The run was cancelled; no step was marked as failed because of it.
  #[serde(default)]
  pub cancelled: bool,
  /// Log lines appended during this run, in arrival order.
  pub log_lines: Vec<LogLine>,
}

impl PipelineResult {
  pub(crate) fn succeeded(run_id: String, log_lines: Vec<LogLine>) -> Self {
    Self {
      run_id,
      succeeded: true,
      failed_step_label: None,
      error: None,
      cancelled: false,
      log_lines,
    }
  }

  pub(crate) fn failed(
    run_id: String,
    label: String,
    message: String,
    log_lines: Vec<LogLine>,
  ) -> Self {
    Self {
      run_id,
      succeeded: false,
      failed_step_label: Some(label),
      error: Some(message),
      cancelled: false,
      log_lines,
    }
  }

  pub(crate) fn cancelled(run_id: String, log_lines: Vec<LogLine>) -> Self {
    Self {
      run_id,
      succeeded: false,
      failed_step_label: None,
      error: None,
      cancelled: true,
      log_lines,
    }
  }
}
