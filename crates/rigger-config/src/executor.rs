use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Location and endpoint layout of the remote task executor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutorConfig {
  /// Base URL every endpoint path is joined onto (e.g. `http://10.0.0.2:8080/api`).
  #[serde(default = "default_base_url")]
  pub base_url: String,
  /// Per-request timeout for start and status calls.
  #[serde(default = "default_request_timeout_ms")]
  pub request_timeout_ms: u64,
  /// Start endpoint overrides, keyed by operation name (e.g. `install_ansible`).
  #[serde(default, skip_serializing_if = "HashMap::is_empty")]
  pub paths: HashMap<String, String>,
  /// Status endpoint overrides, keyed by task family (`initialization`, `playbook`).
  #[serde(default, skip_serializing_if = "HashMap::is_empty")]
  pub status_paths: HashMap<String, String>,
}

impl ExecutorConfig {
  pub fn request_timeout(&self) -> Duration {
    Duration::from_millis(self.request_timeout_ms)
  }

  /// Start path configured for `operation`, if overridden.
  pub fn path_override(&self, operation: &str) -> Option<&str> {
    self.paths.get(operation).map(String::as_str)
  }

  /// Status path configured for `family`, if overridden.
  pub fn status_path_override(&self, family: &str) -> Option<&str> {
    self.status_paths.get(family).map(String::as_str)
  }
}

impl Default for ExecutorConfig {
  fn default() -> Self {
    Self {
      base_url: default_base_url(),
      request_timeout_ms: default_request_timeout_ms(),
      paths: HashMap::new(),
      status_paths: HashMap::new(),
    }
  }
}

fn default_base_url() -> String {
  "http://127.0.0.1:8080/api".to_string()
}

fn default_request_timeout_ms() -> u64 {
  30_000
}
