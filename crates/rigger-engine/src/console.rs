//! The console: one independent pipeline per provisioning action.

use std::sync::Arc;

use rigger_client::TaskClient;
use rigger_config::ConsoleConfig;
use rigger_runtime::{PipelineHandle, PipelineNotifier, PipelineRegistry, PipelineResult};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

use crate::ansible::{AnsibleAction, INIT_PIPELINE, InitMode, PING_PIPELINE, ping_steps};
use crate::context::{PipelineContext, Slot, settings_from_config};
use crate::error::EngineError;
use crate::kubernetes::{ClusterBootstrap, ClusterPhase};
use crate::playbook::{PLAYBOOK_PIPELINE, playbook_steps};

/// Owner of every provisioning pipeline.
///
/// Pipelines never share state: each action has its own instance with its
/// own steps, log and cancellation token. Triggering an action while its
/// previous run is still going is refused.
pub struct Console {
  context: PipelineContext,
  install: Slot,
  reinstall: Slot,
  uninstall: Slot,
  init: Slot,
  ping: Slot,
  playbook: Slot,
  cluster: ClusterBootstrap,
}

impl Console {
  pub fn new(config: &ConsoleConfig, client: Arc<dyn TaskClient>) -> Self {
    let mut context = PipelineContext::new(client);
    context.settings = settings_from_config(config);
    Self::from_context(context)
  }

  pub fn from_context(context: PipelineContext) -> Self {
    Self {
      install: Slot::new(AnsibleAction::Install.pipeline_name()),
      reinstall: Slot::new(AnsibleAction::Reinstall.pipeline_name()),
      uninstall: Slot::new(AnsibleAction::Uninstall.pipeline_name()),
      init: Slot::new(INIT_PIPELINE),
      ping: Slot::new(PING_PIPELINE),
      playbook: Slot::new(PLAYBOOK_PIPELINE),
      cluster: ClusterBootstrap::new(context.clone()),
      context,
    }
  }

  /// Send events of every pipeline built from now on to `notifier`.
  pub fn with_notifier(mut self, notifier: Arc<dyn PipelineNotifier>) -> Self {
    self.context.notifier = notifier;
    self.cluster = ClusterBootstrap::new(self.context.clone());
    self
  }

  pub fn registry(&self) -> &PipelineRegistry {
    &self.context.registry
  }

  pub fn cluster(&self) -> &ClusterBootstrap {
    &self.cluster
  }

  /// Token every pipeline run derives from.
  pub fn shutdown_token(&self) -> &CancellationToken {
    &self.context.cancel
  }

  #[instrument(name = "console_ansible", skip(self, action, params), fields(action = %action))]
  pub async fn run_ansible(
    &self,
    action: AnsibleAction,
    params: &Value,
  ) -> Result<PipelineResult, EngineError> {
    let slot = match action {
      AnsibleAction::Install => &self.install,
      AnsibleAction::Reinstall => &self.reinstall,
      AnsibleAction::Uninstall => &self.uninstall,
    };
    Ok(slot.run(&self.context, action.steps(params)).await?)
  }

  pub async fn initialize(
    &self,
    mode: InitMode,
    params: &Value,
  ) -> Result<PipelineResult, EngineError> {
    Ok(self.init.run(&self.context, mode.steps(params)).await?)
  }

  /// Check connectivity to every node without re-running initialization.
  pub async fn ping(&self, params: &Value) -> Result<PipelineResult, EngineError> {
    Ok(self.ping.run(&self.context, ping_steps(params)).await?)
  }

  pub async fn run_phase(
    &self,
    phase: ClusterPhase,
    params: &Value,
  ) -> Result<PipelineResult, EngineError> {
    self.cluster.run_phase(phase, params).await
  }

  pub fn reset_phase(&self, phase: ClusterPhase) -> Result<(), EngineError> {
    self.cluster.reset_phase(phase)
  }

  pub async fn execute_playbook(
    &self,
    playbook_id: &str,
    params: &Value,
  ) -> Result<PipelineResult, EngineError> {
    let steps = playbook_steps(playbook_id, params);
    Ok(self.playbook.run(&self.context, steps).await?)
  }

  /// Look up a pipeline by its registry name.
  pub fn pipeline(&self, name: &str) -> Result<PipelineHandle, EngineError> {
    self
      .context
      .registry
      .get(name)
      .ok_or_else(|| EngineError::UnknownPipeline {
        name: name.to_string(),
      })
  }

  /// Cancel one pipeline by name.
  pub fn cancel(&self, name: &str) -> Result<(), EngineError> {
    self.pipeline(name).map(|handle| handle.cancel())
  }

  /// Cancel every running pipeline. The console stays usable.
  pub fn cancel_all(&self) {
    let running = self.context.registry.running();
    info!(count = running.len(), "cancel_all");
    for handle in running {
      handle.cancel();
    }
  }

  /// Cancel everything, including runs started after this call.
  pub fn shutdown(&self) {
    info!("console_shutdown");
    self.context.cancel.cancel();
  }
}
