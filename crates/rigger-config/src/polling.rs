use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Fixed-delay polling cadence, per task family.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollingConfig {
  /// Delay between status calls for initialization-family tasks
  /// (Ansible lifecycle, initialization steps, Kubernetes phases).
  #[serde(default = "default_initialization_interval_ms")]
  pub initialization_interval_ms: u64,
  /// Delay between status calls for playbook executions.
  #[serde(default = "default_playbook_interval_ms")]
  pub playbook_interval_ms: u64,
}

impl PollingConfig {
  pub fn initialization_interval(&self) -> Duration {
    Duration::from_millis(self.initialization_interval_ms)
  }

  pub fn playbook_interval(&self) -> Duration {
    Duration::from_millis(self.playbook_interval_ms)
  }
}

impl Default for PollingConfig {
  fn default() -> Self {
    Self {
      initialization_interval_ms: default_initialization_interval_ms(),
      playbook_interval_ms: default_playbook_interval_ms(),
    }
  }
}

fn default_initialization_interval_ms() -> u64 {
  1000
}

fn default_playbook_interval_ms() -> u64 {
  1500
}
