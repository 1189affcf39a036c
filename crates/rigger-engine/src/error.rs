//! Engine error types.

use rigger_runtime::PipelineError;

use crate::kubernetes::ClusterPhase;

/// Errors raised when a console action cannot be carried out.
///
/// A run that starts and then fails is not an error here; its outcome is in
/// the returned [`rigger_runtime::PipelineResult`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
  /// A bootstrap phase was requested before the phase it depends on succeeded.
  #[error("phase '{phase}' is locked until '{requires}' succeeds")]
  PhaseLocked {
    phase: ClusterPhase,
    requires: ClusterPhase,
  },

  /// The pipeline refused the request.
  #[error(transparent)]
  Pipeline(#[from] PipelineError),

  /// No pipeline is registered under this name.
  #[error("unknown pipeline '{name}'")]
  UnknownPipeline { name: String },
}
