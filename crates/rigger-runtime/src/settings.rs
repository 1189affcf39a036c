use std::time::Duration;

use rigger_task::TaskFamily;

/// Polling cadence and limits applied to a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineSettings {
  /// Delay between status calls for initialization-family tasks.
  pub initialization_interval: Duration,
  /// Delay between status calls for playbook executions.
  pub playbook_interval: Duration,
  /// Wall-clock limit on one run; `None` waits indefinitely.
  pub max_duration: Option<Duration>,
}

impl PipelineSettings {
  /// Poll interval for tasks of `family`.
  pub fn interval_for(&self, family: TaskFamily) -> Duration {
    match family {
      TaskFamily::Initialization => self.initialization_interval,
      TaskFamily::Playbook => self.playbook_interval,
    }
  }

  pub fn with_max_duration(mut self, max_duration: Option<Duration>) -> Self {
    self.max_duration = max_duration;
    self
  }
}

impl Default for PipelineSettings {
  fn default() -> Self {
    Self {
      initialization_interval: Duration::from_millis(1000),
      playbook_interval: Duration::from_millis(1500),
      max_duration: None,
    }
  }
}
