//! Status polling for one remote task.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use rigger_client::TaskClient;
use rigger_task::{LogLine, TaskFamily, TaskHandle, TaskState};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::outcome::PollOutcome;

/// Failure message for a task the executor no longer knows about.
pub const TASK_LOST_MESSAGE: &str = "task expired or unknown";
/// Failure message for a failed task that reported no error text.
pub const REMOTE_FAILURE_MESSAGE: &str = "remote task failed";
/// Failure message when a run outlives its configured maximum duration.
pub const TIMEOUT_MESSAGE: &str = "operation timed out";
/// Prefix of the failure message when a status call itself fails.
pub const STATUS_FETCH_FAILURE_PREFIX: &str = "failed to fetch task status";

/// Drives one task handle to a terminal outcome.
///
/// The poller fetches status, hands the log delta to the caller, and sleeps a
/// fixed interval while the task is running. It owns at most one loop at a
/// time: starting a new poll cancels the previous one. Every loop listens on a
/// child of the token given at construction, so cancelling that token (or
/// calling [`Poller::cancel`]) stops the loop at its current suspension point
/// without another status call.
pub struct Poller {
  interval: Duration,
  cancel: CancellationToken,
  deadline: Option<Instant>,
  slot: Mutex<LoopSlot>,
}

#[derive(Default)]
struct LoopSlot {
  next_generation: u64,
  active: Option<ActiveLoop>,
}

struct ActiveLoop {
  generation: u64,
  token: CancellationToken,
}

impl Poller {
  pub fn new(interval: Duration, cancel: CancellationToken) -> Self {
    Self {
      interval,
      cancel,
      deadline: None,
      slot: Mutex::new(LoopSlot::default()),
    }
  }

  /// Give up with [`PollOutcome::TimedOut`] once `deadline` passes.
  pub fn with_deadline(mut self, deadline: Option<Instant>) -> Self {
    self.deadline = deadline;
    self
  }

  pub fn interval(&self) -> Duration {
    self.interval
  }

  /// Whether a poll loop is currently running.
  pub fn is_active(&self) -> bool {
    self.slot().active.is_some()
  }

  /// Cancel the running loop, if any.
  ///
  /// A poller with no running loop is left untouched, so a later `poll`
  /// starts normally.
  pub fn cancel(&self) {
    if let Some(active) = self.slot().active.take() {
      debug!("cancelling poll loop");
      active.token.cancel();
    }
  }

  /// Poll `handle` until it reaches a terminal state or the loop is cancelled.
  ///
  /// `on_delta` receives the non-blank lines appended since the previous
  /// status call, in arrival order. Transport and parse errors end the loop
  /// as a failure; nothing is retried here.
  #[instrument(
    name = "task_poll",
    skip(self, client, family, handle, on_delta),
    fields(task_id = %handle.id(), family = %family)
  )]
  pub async fn poll<F>(
    &self,
    client: &dyn TaskClient,
    family: TaskFamily,
    handle: &mut TaskHandle,
    mut on_delta: F,
  ) -> PollOutcome
  where
    F: FnMut(Vec<LogLine>) + Send,
  {
    let (generation, token) = self.begin();
    let _guard = LoopGuard {
      poller: self,
      generation,
    };

    self
      .run_loop(client, family, handle, &mut on_delta, &token)
      .await
  }

  async fn run_loop<F>(
    &self,
    client: &dyn TaskClient,
    family: TaskFamily,
    handle: &mut TaskHandle,
    on_delta: &mut F,
    token: &CancellationToken,
  ) -> PollOutcome
  where
    F: FnMut(Vec<LogLine>) + Send,
  {
    loop {
      let fetched = tokio::select! {
        biased;
        _ = token.cancelled() => return PollOutcome::Cancelled,
        fetched = client.status(family, handle.id()) => fetched,
        _ = deadline_elapsed(self.deadline) => return PollOutcome::TimedOut,
      };

      let status = match fetched {
        Ok(status) => status,
        Err(e) => {
          warn!(error = %e, "status fetch failed");
          return PollOutcome::Failed {
            message: format!("{}: {}", STATUS_FETCH_FAILURE_PREFIX, e),
          };
        }
      };

      let lines = handle.extract_delta(&status.logs);
      if !lines.is_empty() {
        on_delta(lines);
      }

      match status.status {
        TaskState::Running => {
          debug!(consumed_length = handle.consumed_length(), "task running");
        }
        TaskState::Completed => {
          info!("task completed");
          return PollOutcome::Completed;
        }
        TaskState::Failed => {
          let message = status
            .error
            .filter(|e| !e.trim().is_empty())
            .unwrap_or_else(|| REMOTE_FAILURE_MESSAGE.to_string());
          warn!(error = %message, "task failed");
          return PollOutcome::Failed { message };
        }
        TaskState::NotFound => {
          warn!("task not found");
          return PollOutcome::Failed {
            message: TASK_LOST_MESSAGE.to_string(),
          };
        }
      }

      tokio::select! {
        biased;
        _ = token.cancelled() => return PollOutcome::Cancelled,
        _ = tokio::time::sleep(self.interval) => {}
        _ = deadline_elapsed(self.deadline) => return PollOutcome::TimedOut,
      }
    }
  }

  /// Register a new loop, cancelling the one it replaces.
  fn begin(&self) -> (u64, CancellationToken) {
    let token = self.cancel.child_token();
    let mut slot = self.slot();
    slot.next_generation += 1;
    let generation = slot.next_generation;
    let previous = slot.active.replace(ActiveLoop {
      generation,
      token: token.clone(),
    });
    drop(slot);

    if let Some(previous) = previous {
      debug!("replacing running poll loop");
      previous.token.cancel();
    }
    (generation, token)
  }

  fn finish(&self, generation: u64) {
    let mut slot = self.slot();
    if slot
      .active
      .as_ref()
      .is_some_and(|active| active.generation == generation)
    {
      slot.active = None;
    }
  }

  fn slot(&self) -> MutexGuard<'_, LoopSlot> {
    self.slot.lock().unwrap_or_else(PoisonError::into_inner)
  }
}

/// Clears the poller's slot when a loop ends, including when its future is dropped.
struct LoopGuard<'a> {
  poller: &'a Poller,
  generation: u64,
}

impl Drop for LoopGuard<'_> {
  fn drop(&mut self) {
    self.poller.finish(self.generation);
  }
}

/// Resolves when `deadline` passes; never resolves without one.
pub(crate) async fn deadline_elapsed(deadline: Option<Instant>) {
  match deadline {
    Some(deadline) => tokio::time::sleep_until(deadline).await,
    None => std::future::pending().await,
  }
}
