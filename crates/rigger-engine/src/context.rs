//! Shared construction inputs for every console pipeline.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use rigger_client::TaskClient;
use rigger_config::ConsoleConfig;
use rigger_runtime::{
  NoopNotifier, Pipeline, PipelineError, PipelineNotifier, PipelineRegistry, PipelineResult,
  PipelineSettings, Step,
};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Client, cadence, notifier and parent token handed to each pipeline.
#[derive(Clone)]
pub struct PipelineContext {
  pub client: Arc<dyn TaskClient>,
  pub settings: PipelineSettings,
  pub notifier: Arc<dyn PipelineNotifier>,
  pub cancel: CancellationToken,
  pub registry: PipelineRegistry,
}

impl PipelineContext {
  pub fn new(client: Arc<dyn TaskClient>) -> Self {
    Self {
      client,
      settings: PipelineSettings::default(),
      notifier: Arc::new(NoopNotifier),
      cancel: CancellationToken::new(),
      registry: PipelineRegistry::new(),
    }
  }

  pub fn build(&self, name: &str, steps: Vec<Step>) -> Pipeline {
    Pipeline::new(name, steps, Arc::clone(&self.client))
      .with_settings(self.settings)
      .with_notifier(Arc::clone(&self.notifier))
      .with_cancellation(self.cancel.clone())
  }
}

/// Pipeline cadence derived from the console configuration.
pub fn settings_from_config(config: &ConsoleConfig) -> PipelineSettings {
  PipelineSettings {
    initialization_interval: config.polling.initialization_interval(),
    playbook_interval: config.polling.playbook_interval(),
    max_duration: config.max_pipeline_duration(),
  }
}

/// The current instance of one named pipeline.
///
/// A fresh instance is built for every trigger, since steps carry the
/// request parameters. The slot is claimed under its lock before the new
/// instance is installed and stays claimed until that run finishes, so only
/// one trigger at a time gets through.
pub(crate) struct Slot {
  name: String,
  state: Mutex<SlotState>,
}

#[derive(Default)]
struct SlotState {
  current: Option<Arc<Pipeline>>,
  claimed: bool,
}

impl Slot {
  pub(crate) fn new(name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      state: Mutex::new(SlotState::default()),
    }
  }

  pub(crate) fn name(&self) -> &str {
    &self.name
  }

  /// Claim the slot and install a new instance with `steps`, registering it
  /// for discovery.
  pub(crate) fn claim(
    &self,
    context: &PipelineContext,
    steps: Vec<Step>,
  ) -> Result<Claim<'_>, PipelineError> {
    let mut state = self.lock();
    self.ensure_idle(&state)?;

    let pipeline = Arc::new(context.build(&self.name, steps));
    context.registry.register(pipeline.handle());
    debug!(pipeline = %self.name, "pipeline_prepared");
    state.current = Some(Arc::clone(&pipeline));
    state.claimed = true;
    Ok(Claim {
      slot: self,
      pipeline,
    })
  }

  /// Claim the slot and run a new instance with `steps` to completion.
  pub(crate) async fn run(
    &self,
    context: &PipelineContext,
    steps: Vec<Step>,
  ) -> Result<PipelineResult, PipelineError> {
    self.claim(context, steps)?.run().await
  }

  /// Drop the current instance and its result.
  pub(crate) fn clear(&self, context: &PipelineContext) -> Result<(), PipelineError> {
    let mut state = self.lock();
    self.ensure_idle(&state)?;
    if state.current.take().is_some() {
      context.registry.unregister(&self.name);
    }
    Ok(())
  }

  /// Whether a trigger holds the slot or its instance is running.
  pub(crate) fn is_busy(&self) -> bool {
    let state = self.lock();
    state.claimed || state.current.as_ref().is_some_and(|p| p.is_running())
  }

  pub(crate) fn current(&self) -> Option<Arc<Pipeline>> {
    self.lock().current.clone()
  }

  pub(crate) fn last_result(&self) -> Option<PipelineResult> {
    self.current().and_then(|p| p.last_result())
  }

  fn ensure_idle(&self, state: &SlotState) -> Result<(), PipelineError> {
    let running = state.current.as_ref().is_some_and(|p| p.is_running());
    if state.claimed || running {
      return Err(PipelineError::Running {
        pipeline: self.name.clone(),
      });
    }
    Ok(())
  }

  fn lock(&self) -> MutexGuard<'_, SlotState> {
    self.state.lock().unwrap_or_else(PoisonError::into_inner)
  }
}

/// A claimed slot. Releases the claim when dropped.
pub(crate) struct Claim<'a> {
  slot: &'a Slot,
  pipeline: Arc<Pipeline>,
}

impl Claim<'_> {
  pub(crate) async fn run(self) -> Result<PipelineResult, PipelineError> {
    self.pipeline.run().await
  }
}

impl Drop for Claim<'_> {
  fn drop(&mut self) {
    self.slot.lock().claimed = false;
  }
}
