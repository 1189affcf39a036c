//! Client error types.

/// Errors that can occur while talking to the remote executor.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
  /// The request could not be sent or the response could not be read.
  #[error("http request failed: {0}")]
  Http(#[from] reqwest::Error),

  /// The executor answered with a non-success HTTP status.
  #[error("executor returned {status}: {body}")]
  Status { status: u16, body: String },

  /// The executor answered with a body that is not the expected JSON.
  #[error("invalid executor response: {message}")]
  InvalidResponse { message: String },

  /// An endpoint URL could not be built.
  #[error("invalid executor url: {0}")]
  InvalidUrl(#[from] url::ParseError),

  /// The base URL cannot carry path segments (e.g. `mailto:`).
  #[error("executor base url cannot be a base: {url}")]
  CannotBeABase { url: String },
}
