use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::executor::ExecutorConfig;
use crate::polling::PollingConfig;

/// Top-level console configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsoleConfig {
  #[serde(default)]
  pub executor: ExecutorConfig,
  #[serde(default)]
  pub polling: PollingConfig,
  /// Upper bound on a single pipeline run. Unset means a run waits for the
  /// executor to report a terminal status, however long that takes.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub max_pipeline_duration_ms: Option<u64>,
}

impl ConsoleConfig {
  /// Load configuration from a JSON file.
  ///
  /// A file that does not exist yields the default configuration.
  pub fn load(path: &Path) -> Result<Self, ConfigError> {
    if !path.exists() {
      return Ok(Self::default());
    }
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
      path: path.to_path_buf(),
      source,
    })?;
    Self::from_json(&content)
  }

  /// Parse configuration from a JSON string.
  pub fn from_json(content: &str) -> Result<Self, ConfigError> {
    Ok(serde_json::from_str(content)?)
  }

  pub fn max_pipeline_duration(&self) -> Option<Duration> {
    self.max_pipeline_duration_ms.map(Duration::from_millis)
  }
}
