use std::path::PathBuf;

/// Errors that can occur while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
  /// The configuration file exists but could not be read.
  #[error("failed to read config file '{path}': {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  /// The configuration file is not valid JSON for [`crate::ConsoleConfig`].
  #[error("failed to parse config: {0}")]
  Parse(#[from] serde_json::Error),
}
