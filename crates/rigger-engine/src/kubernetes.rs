//! Three-phase Kubernetes bootstrap with ordered gating.

use std::fmt;

use rigger_runtime::{PipelineError, PipelineHandle, PipelineResult, Step};
use rigger_task::OperationKind;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, instrument, warn};

use crate::ansible::steps_for;
use crate::context::{PipelineContext, Slot};
use crate::error::EngineError;

/// Bootstrap phases, in the order they must succeed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClusterPhase {
  Environment,
  Deployment,
  Verification,
}

impl ClusterPhase {
  pub const ALL: [ClusterPhase; 3] = [
    ClusterPhase::Environment,
    ClusterPhase::Deployment,
    ClusterPhase::Verification,
  ];

  pub fn as_str(self) -> &'static str {
    match self {
      ClusterPhase::Environment => "environment",
      ClusterPhase::Deployment => "deployment",
      ClusterPhase::Verification => "verification",
    }
  }

  pub fn pipeline_name(self) -> &'static str {
    match self {
      ClusterPhase::Environment => "k8s-environment",
      ClusterPhase::Deployment => "k8s-deployment",
      ClusterPhase::Verification => "k8s-verification",
    }
  }

  pub fn operation(self) -> OperationKind {
    match self {
      ClusterPhase::Environment => OperationKind::PrepareEnvironment,
      ClusterPhase::Deployment => OperationKind::DeployCluster,
      ClusterPhase::Verification => OperationKind::VerifyCluster,
    }
  }

  /// The phase that must have succeeded before this one may run.
  pub fn requires(self) -> Option<ClusterPhase> {
    match self {
      ClusterPhase::Environment => None,
      ClusterPhase::Deployment => Some(ClusterPhase::Environment),
      ClusterPhase::Verification => Some(ClusterPhase::Deployment),
    }
  }

  pub fn steps(self, params: &Value) -> Vec<Step> {
    steps_for(&[self.operation()], params)
  }

  fn index(self) -> usize {
    self as usize
  }
}

impl fmt::Display for ClusterPhase {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// One single-step pipeline per phase.
///
/// A phase runs only once the latest result of the phase before it
/// succeeded. Resetting a phase also discards every later phase.
pub struct ClusterBootstrap {
  context: PipelineContext,
  phases: [Slot; 3],
}

impl ClusterBootstrap {
  pub fn new(context: PipelineContext) -> Self {
    Self {
      context,
      phases: ClusterPhase::ALL.map(|phase| Slot::new(phase.pipeline_name())),
    }
  }

  /// Whether `phase` may run now: every earlier phase's latest run succeeded.
  pub fn unlocked(&self, phase: ClusterPhase) -> bool {
    self.blocked_by(phase).is_none()
  }

  pub fn last_result(&self, phase: ClusterPhase) -> Option<PipelineResult> {
    self.slot(phase).last_result()
  }

  pub fn handle(&self, phase: ClusterPhase) -> Option<PipelineHandle> {
    self.slot(phase).current().map(|p| p.handle())
  }

  /// Run `phase` with `params`, replacing any previous run of it.
  ///
  /// Every later phase is discarded first and has to run again.
  #[instrument(name = "cluster_phase", skip(self, phase, params), fields(phase = %phase))]
  pub async fn run_phase(
    &self,
    phase: ClusterPhase,
    params: &Value,
  ) -> Result<PipelineResult, EngineError> {
    if let Some(requires) = self.blocked_by(phase) {
      warn!(requires = %requires, "phase_locked");
      return Err(EngineError::PhaseLocked { phase, requires });
    }

    let later = &self.phases[phase.index() + 1..];
    ensure_idle(later)?;
    let claim = self.slot(phase).claim(&self.context, phase.steps(params))?;
    for slot in later {
      slot.clear(&self.context)?;
    }
    Ok(claim.run().await?)
  }

  /// Discard the result of `phase` and of every phase after it.
  ///
  /// Refused while any of those phases is running; nothing is discarded then.
  pub fn reset_phase(&self, phase: ClusterPhase) -> Result<(), EngineError> {
    let affected = &self.phases[phase.index()..];
    ensure_idle(affected)?;
    for slot in affected {
      slot.clear(&self.context)?;
    }
    info!(phase = %phase, "phase_reset");
    Ok(())
  }

  /// Cancel whichever phase is running.
  pub fn cancel(&self) {
    for slot in &self.phases {
      if let Some(pipeline) = slot.current() {
        pipeline.cancel();
      }
    }
  }

  /// The first earlier phase whose latest run did not succeed.
  fn blocked_by(&self, phase: ClusterPhase) -> Option<ClusterPhase> {
    ClusterPhase::ALL
      .into_iter()
      .take_while(|earlier| *earlier < phase)
      .find(|earlier| !self.last_result(*earlier).is_some_and(|r| r.succeeded))
  }

  fn slot(&self, phase: ClusterPhase) -> &Slot {
    &self.phases[phase.index()]
  }
}

fn ensure_idle(slots: &[Slot]) -> Result<(), PipelineError> {
  match slots.iter().find(|slot| slot.is_busy()) {
    Some(busy) => Err(PipelineError::Running {
      pipeline: busy.name().to_string(),
    }),
    None => Ok(()),
  }
}
