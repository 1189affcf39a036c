//! Pipeline events and notifiers for observability.
//!
//! Events are emitted while a pipeline runs so consumers can render progress,
//! stream logs to a console, or raise a one-shot notification when a run ends.

use rigger_task::LogLine;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Events emitted during a pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelineEvent {
  /// A run has started.
  PipelineStarted { run_id: String, pipeline: String },

  /// A step became active.
  StepStarted {
    run_id: String,
    pipeline: String,
    step: String,
  },

  /// New log lines arrived for the active step.
  StepLog {
    run_id: String,
    pipeline: String,
    step: String,
    lines: Vec<LogLine>,
  },

  /// A step completed.
  StepCompleted {
    run_id: String,
    pipeline: String,
    step: String,
  },

  /// A step failed; the run stops here.
  StepFailed {
    run_id: String,
    pipeline: String,
    step: String,
    error: String,
  },

  /// Every step completed.
  PipelineCompleted { run_id: String, pipeline: String },

  /// The run stopped at a failed step.
  PipelineFailed {
    run_id: String,
    pipeline: String,
    step: String,
    error: String,
  },

  /// The run was cancelled before finishing.
  PipelineCancelled { run_id: String, pipeline: String },
}

impl PipelineEvent {
  /// Name of the pipeline the event belongs to.
  pub fn pipeline(&self) -> &str {
    match self {
      PipelineEvent::PipelineStarted { pipeline, .. }
      | PipelineEvent::StepStarted { pipeline, .. }
      | PipelineEvent::StepLog { pipeline, .. }
      | PipelineEvent::StepCompleted { pipeline, .. }
      | PipelineEvent::StepFailed { pipeline, .. }
      | PipelineEvent::PipelineCompleted { pipeline, .. }
      | PipelineEvent::PipelineFailed { pipeline, .. }
      | PipelineEvent::PipelineCancelled { pipeline, .. } => pipeline,
    }
  }

  /// Whether this event ends a run.
  pub fn is_final(&self) -> bool {
    matches!(
      self,
      PipelineEvent::PipelineCompleted { .. }
        | PipelineEvent::PipelineFailed { .. }
        | PipelineEvent::PipelineCancelled { .. }
    )
  }
}

/// Trait for receiving pipeline events.
///
/// The pipeline calls `notify` for each event; implementations decide what to
/// do with them. `notify` runs inline on the pipeline's task and must not block.
pub trait PipelineNotifier: Send + Sync {
  fn notify(&self, event: PipelineEvent);
}

/// A notifier that discards all events.
#[derive(Debug, Clone, Default)]
pub struct NoopNotifier;

impl PipelineNotifier for NoopNotifier {
  fn notify(&self, _event: PipelineEvent) {}
}

/// A notifier that forwards events to an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
  // Unbounded so a slow console never stalls a poll loop. Volume is a handful
  // of events per poll interval.
  sender: mpsc::UnboundedSender<PipelineEvent>,
}

impl ChannelNotifier {
  pub fn new(sender: mpsc::UnboundedSender<PipelineEvent>) -> Self {
    Self { sender }
  }

  /// Create a notifier together with the receiving end of its channel.
  pub fn channel() -> (Self, mpsc::UnboundedReceiver<PipelineEvent>) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (Self::new(sender), receiver)
  }
}

impl PipelineNotifier for ChannelNotifier {
  fn notify(&self, event: PipelineEvent) {
    // Receiver may have been dropped
    let _ = self.sender.send(event);
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_channel_notifier_delivers_in_order() {
    let (notifier, mut receiver) = ChannelNotifier::channel();
    notifier.notify(PipelineEvent::PipelineStarted {
      run_id: "r1".to_string(),
      pipeline: "ping".to_string(),
    });
    notifier.notify(PipelineEvent::PipelineCompleted {
      run_id: "r1".to_string(),
      pipeline: "ping".to_string(),
    });

    let first = receiver.try_recv().unwrap();
    assert_eq!(first.pipeline(), "ping");
    assert!(!first.is_final());
    assert!(receiver.try_recv().unwrap().is_final());
  }

  #[test]
  fn test_dropped_receiver_is_ignored() {
    let (notifier, receiver) = ChannelNotifier::channel();
    drop(receiver);
    notifier.notify(PipelineEvent::PipelineCancelled {
      run_id: "r1".to_string(),
      pipeline: "ping".to_string(),
    });
  }
}
