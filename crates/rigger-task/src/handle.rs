//! Task handles and incremental log extraction.

use tracing::warn;

use crate::log::{LogLine, split_lines};

/// Client-side reference to one outstanding remote task.
///
/// The executor only ever reports the cumulative log of a task. The handle
/// remembers how many characters of that log have already been emitted so
/// each status response can be reduced to the text appended since the last
/// one. Lengths are counted in characters so the cursor never lands inside a
/// multi-byte sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskHandle {
  id: String,
  consumed_length: usize,
}

impl TaskHandle {
  pub fn new(id: impl Into<String>) -> Self {
    Self {
      id: id.into(),
      consumed_length: 0,
    }
  }

  /// The executor-issued task id.
  pub fn id(&self) -> &str {
    &self.id
  }

  /// Number of log characters already emitted.
  pub fn consumed_length(&self) -> usize {
    self.consumed_length
  }

  /// Return the portion of `full_log` not yet emitted and advance the cursor.
  ///
  /// If `full_log` is shorter than what was already consumed, the executor is
  /// assumed to have restarted the stream: the cursor resets and the whole
  /// string is returned. This is a compatibility shim for executors that reuse
  /// task ids; it is not part of the documented status contract.
  pub fn take_delta<'a>(&mut self, full_log: &'a str) -> &'a str {
    let length = full_log.chars().count();
    if length < self.consumed_length {
      warn!(
        task_id = %self.id,
        consumed_length = self.consumed_length,
        observed_length = length,
        "task log shrank, restarting log stream"
      );
      self.consumed_length = 0;
    }

    let start = full_log
      .char_indices()
      .nth(self.consumed_length)
      .map(|(offset, _)| offset)
      .unwrap_or(full_log.len());
    self.consumed_length = length;

    &full_log[start..]
  }

  /// Return the classified, non-blank lines appended since the last call.
  pub fn extract_delta(&mut self, full_log: &str) -> Vec<LogLine> {
    split_lines(self.take_delta(full_log))
  }
}
