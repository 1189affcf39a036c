//! Append-only log sink.

use std::sync::{Arc, PoisonError, RwLock};

use rigger_task::LogLine;

/// Ordered, append-only log of one pipeline.
///
/// Lines are never reordered, deduplicated or removed. Readers get copies.
/// Cloning the sink shares the same underlying log.
#[derive(Debug, Clone, Default)]
pub struct LogSink {
  lines: Arc<RwLock<Vec<LogLine>>>,
}

impl LogSink {
  pub fn new() -> Self {
    Self::default()
  }

  pub(crate) fn extend(&self, lines: impl IntoIterator<Item = LogLine>) {
    self
      .lines
      .write()
      .unwrap_or_else(PoisonError::into_inner)
      .extend(lines);
  }

  /// Number of lines written so far.
  pub fn len(&self) -> usize {
    self.lines.read().unwrap_or_else(PoisonError::into_inner).len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// Copy of every line.
  pub fn snapshot(&self) -> Vec<LogLine> {
    self.since(0)
  }

  /// Copy of the lines written at or after position `offset`.
  pub fn since(&self, offset: usize) -> Vec<LogLine> {
    let lines = self.lines.read().unwrap_or_else(PoisonError::into_inner);
    lines.get(offset..).map(<[LogLine]>::to_vec).unwrap_or_default()
  }
}
