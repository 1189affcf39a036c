//! Fail-fast sequencing of steps.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use rigger_client::TaskClient;
use rigger_task::LogLine;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{Span, error, info, instrument};
use uuid::Uuid;

use crate::error::PipelineError;
use crate::events::{NoopNotifier, PipelineEvent, PipelineNotifier};
use crate::outcome::{PipelineResult, StepOutcome};
use crate::settings::PipelineSettings;
use crate::sink::LogSink;
use crate::step::{Step, StepBoard, StepDescriptor, StepRunner};

/// An ordered list of steps run one after another, stopping at the first
/// failure.
///
/// A pipeline is single-use: once it has run, [`Pipeline::reset`] must be
/// called before it can run again. Its descriptors and log are readable at
/// any time, from the pipeline itself or from a [`PipelineHandle`].
pub struct Pipeline {
  steps: Vec<Step>,
  client: Arc<dyn TaskClient>,
  settings: PipelineSettings,
  notifier: Arc<dyn PipelineNotifier>,
  parent: CancellationToken,
  shared: Arc<Shared>,
}

struct Shared {
  name: String,
  board: StepBoard,
  sink: LogSink,
  run: Mutex<RunState>,
  last_result: RwLock<Option<PipelineResult>>,
}

#[derive(Default)]
struct RunState {
  running: bool,
  used: bool,
  token: Option<CancellationToken>,
}

impl Pipeline {
  pub fn new(name: impl Into<String>, steps: Vec<Step>, client: Arc<dyn TaskClient>) -> Self {
    let shared = Shared {
      name: name.into(),
      board: StepBoard::new(&steps),
      sink: LogSink::new(),
      run: Mutex::new(RunState::default()),
      last_result: RwLock::new(None),
    };
    Self {
      steps,
      client,
      settings: PipelineSettings::default(),
      notifier: Arc::new(NoopNotifier),
      parent: CancellationToken::new(),
      shared: Arc::new(shared),
    }
  }

  pub fn with_settings(mut self, settings: PipelineSettings) -> Self {
    self.settings = settings;
    self
  }

  pub fn with_notifier(mut self, notifier: Arc<dyn PipelineNotifier>) -> Self {
    self.notifier = notifier;
    self
  }

  /// Derive every run's token from `parent`, so cancelling it stops this
  /// pipeline along with its siblings.
  pub fn with_cancellation(mut self, parent: CancellationToken) -> Self {
    self.parent = parent;
    self
  }

  pub fn name(&self) -> &str {
    &self.shared.name
  }

  /// A cloneable read-and-cancel view of this pipeline.
  pub fn handle(&self) -> PipelineHandle {
    PipelineHandle {
      shared: Arc::clone(&self.shared),
    }
  }

  pub fn settings(&self) -> &PipelineSettings {
    &self.settings
  }

  pub fn steps(&self) -> Vec<StepDescriptor> {
    self.shared.board.snapshot()
  }

  pub fn logs(&self) -> Vec<LogLine> {
    self.shared.sink.snapshot()
  }

  pub fn sink(&self) -> &LogSink {
    &self.shared.sink
  }

  pub fn is_running(&self) -> bool {
    self.shared.run_state().running
  }

  pub fn last_result(&self) -> Option<PipelineResult> {
    self.shared.last_result()
  }

  /// Cancel the current run. Does nothing when the pipeline is idle.
  pub fn cancel(&self) {
    self.shared.cancel();
  }

  /// Return every step to `Pending` and allow another run.
  ///
  /// The log is kept: lines from earlier runs stay in the sink.
  pub fn reset(&self) -> Result<(), PipelineError> {
    let mut run = self.shared.run_state();
    if run.running {
      return Err(PipelineError::Running {
        pipeline: self.shared.name.clone(),
      });
    }
    run.used = false;
    drop(run);

    self.shared.board.reset();
    *self
      .shared
      .last_result
      .write()
      .unwrap_or_else(PoisonError::into_inner) = None;
    info!(pipeline = %self.shared.name, "pipeline_reset");
    Ok(())
  }

  /// Run every step in order.
  ///
  /// Step failures and cancellation are reported in the returned
  /// [`PipelineResult`]; the error case is reserved for a pipeline that is
  /// already running or has run without a reset.
  #[instrument(
    name = "pipeline_run",
    skip(self),
    fields(pipeline = %self.shared.name, run_id = tracing::field::Empty)
  )]
  pub async fn run(&self) -> Result<PipelineResult, PipelineError> {
    let token = self.shared.begin(&self.parent)?;
    let _guard = RunGuard {
      shared: &self.shared,
    };

    let run_id = Uuid::new_v4().to_string();
    Span::current().record("run_id", run_id.as_str());

    let pipeline = self.shared.name.as_str();
    let offset = self.shared.sink.len();
    let deadline = self.settings.max_duration.map(|d| Instant::now() + d);

    self.notifier.notify(PipelineEvent::PipelineStarted {
      run_id: run_id.clone(),
      pipeline: pipeline.to_string(),
    });
    info!(steps = self.steps.len(), "pipeline_started");

    let runner = StepRunner {
      pipeline,
      run_id: &run_id,
      client: &*self.client,
      settings: &self.settings,
      board: &self.shared.board,
      sink: &self.shared.sink,
      notifier: &*self.notifier,
      cancel: &token,
      deadline,
    };

    let mut failure = None;
    let mut cancelled = false;
    for (index, step) in self.steps.iter().enumerate() {
      if token.is_cancelled() {
        cancelled = true;
        break;
      }
      match runner.run(index, step).await {
        StepOutcome::Completed => {}
        StepOutcome::Failed { message } => {
          failure = Some((step.label.clone(), message));
          break;
        }
        StepOutcome::Cancelled => {
          cancelled = true;
          break;
        }
      }
    }

    let lines = self.shared.sink.since(offset);
    let result = if let Some((label, message)) = failure {
      self.notifier.notify(PipelineEvent::PipelineFailed {
        run_id: run_id.clone(),
        pipeline: pipeline.to_string(),
        step: label.clone(),
        error: message.clone(),
      });
      error!(step = %label, error = %message, "pipeline_failed");
      PipelineResult::failed(run_id, label, message, lines)
    } else if cancelled {
      self.notifier.notify(PipelineEvent::PipelineCancelled {
        run_id: run_id.clone(),
        pipeline: pipeline.to_string(),
      });
      info!("pipeline_cancelled");
      PipelineResult::cancelled(run_id, lines)
    } else {
      self.notifier.notify(PipelineEvent::PipelineCompleted {
        run_id: run_id.clone(),
        pipeline: pipeline.to_string(),
      });
      info!(lines = lines.len(), "pipeline_completed");
      PipelineResult::succeeded(run_id, lines)
    };

    *self
      .shared
      .last_result
      .write()
      .unwrap_or_else(PoisonError::into_inner) = Some(result.clone());
    Ok(result)
  }
}

impl Shared {
  fn run_state(&self) -> MutexGuard<'_, RunState> {
    self.run.lock().unwrap_or_else(PoisonError::into_inner)
  }

  fn begin(&self, parent: &CancellationToken) -> Result<CancellationToken, PipelineError> {
    let mut run = self.run_state();
    if run.running {
      return Err(PipelineError::Running {
        pipeline: self.name.clone(),
      });
    }
    if run.used {
      return Err(PipelineError::AlreadyRun {
        pipeline: self.name.clone(),
      });
    }
    let token = parent.child_token();
    run.running = true;
    run.used = true;
    run.token = Some(token.clone());
    Ok(token)
  }

  fn cancel(&self) {
    if let Some(token) = self.run_state().token.as_ref() {
      info!(pipeline = %self.name, "pipeline_cancel_requested");
      token.cancel();
    }
  }

  fn last_result(&self) -> Option<PipelineResult> {
    self
      .last_result
      .read()
      .unwrap_or_else(PoisonError::into_inner)
      .clone()
  }
}

/// Ends a run, including when its future is dropped mid-step.
struct RunGuard<'a> {
  shared: &'a Shared,
}

impl Drop for RunGuard<'_> {
  fn drop(&mut self) {
    let mut run = self.shared.run_state();
    if let Some(token) = run.token.take() {
      token.cancel();
    }
    run.running = false;
  }
}

/// Cloneable view of a [`Pipeline`] for observers and teardown.
#[derive(Clone)]
pub struct PipelineHandle {
  shared: Arc<Shared>,
}

impl PipelineHandle {
  pub fn name(&self) -> &str {
    &self.shared.name
  }

  pub fn steps(&self) -> Vec<StepDescriptor> {
    self.shared.board.snapshot()
  }

  pub fn logs(&self) -> Vec<LogLine> {
    self.shared.sink.snapshot()
  }

  pub fn is_running(&self) -> bool {
    self.shared.run_state().running
  }

  pub fn last_result(&self) -> Option<PipelineResult> {
    self.shared.last_result()
  }

  pub fn cancel(&self) {
    self.shared.cancel();
  }
}

impl std::fmt::Debug for PipelineHandle {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("PipelineHandle")
      .field("name", &self.shared.name)
      .field("running", &self.is_running())
      .finish()
  }
}
