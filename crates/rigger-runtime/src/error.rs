//! Pipeline lifecycle errors.
//!
//! Step failures are not errors at this level: they are reported through
//! [`crate::PipelineResult`]. These variants cover misuse of the pipeline
//! instance itself.

/// Errors raised when a pipeline is asked to do something its lifecycle forbids.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PipelineError {
  /// The pipeline already ran; call `reset` before running it again.
  #[error("pipeline '{pipeline}' has already run; reset it before running again")]
  AlreadyRun { pipeline: String },

  /// The pipeline is running; it cannot be started or reset.
  #[error("pipeline '{pipeline}' is running")]
  Running { pipeline: String },
}
