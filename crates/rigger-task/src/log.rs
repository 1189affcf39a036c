//! Log line splitting and severity inference.
//!
//! Severity is cosmetic. It drives console colouring only and never affects
//! how a task or pipeline progresses.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Display severity inferred from markers in a log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
  Info,
  Step,
  Success,
  Error,
}

impl Severity {
  pub fn as_str(self) -> &'static str {
    match self {
      Severity::Info => "info",
      Severity::Step => "step",
      Severity::Success => "success",
      Severity::Error => "error",
    }
  }
}

impl fmt::Display for Severity {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// A single non-blank log line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogLine {
  pub text: String,
  pub severity: Severity,
}

impl LogLine {
  /// Create a line, inferring its severity from the text.
  pub fn new(text: impl Into<String>) -> Self {
    let text = text.into();
    let severity = classify(&text);
    Self { text, severity }
  }

  pub fn with_severity(text: impl Into<String>, severity: Severity) -> Self {
    Self {
      text: text.into(),
      severity,
    }
  }
}

const ERROR_MARKERS: &[&str] = &["fatal:", "failed:", "ERROR", "FAILED", "✗", "[error]"];
const SUCCESS_MARKERS: &[&str] = &["SUCCESS", "✓", "[success]", "completed"];
const SUCCESS_PREFIXES: &[&str] = &["ok:", "changed:"];
const STEP_PREFIXES: &[&str] = &["TASK [", "PLAY [", "PLAY RECAP", "==>", "[step]", "Step "];

/// Infer the display severity of a single (already trimmed) line.
///
/// Error markers win over success markers, which win over step markers.
pub fn classify(line: &str) -> Severity {
  if ERROR_MARKERS.iter().any(|m| line.contains(m)) {
    Severity::Error
  } else if SUCCESS_PREFIXES.iter().any(|p| line.starts_with(p))
    || SUCCESS_MARKERS.iter().any(|m| line.contains(m))
  {
    Severity::Success
  } else if STEP_PREFIXES.iter().any(|p| line.starts_with(p)) {
    Severity::Step
  } else {
    Severity::Info
  }
}

/// Split a log delta into trimmed, classified lines, dropping blank ones.
pub fn split_lines(delta: &str) -> Vec<LogLine> {
  delta
    .lines()
    .map(str::trim)
    .filter(|line| !line.is_empty())
    .map(LogLine::new)
    .collect()
}
