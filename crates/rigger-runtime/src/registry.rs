//! Name-based discovery of pipelines.

use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::pipeline::PipelineHandle;

/// Maps pipeline names to their handles.
///
/// Lookup only: pipelines never read each other's state through it. Cloning
/// the registry shares the same entries.
#[derive(Debug, Clone, Default)]
pub struct PipelineRegistry {
  entries: Arc<RwLock<BTreeMap<String, PipelineHandle>>>,
}

impl PipelineRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  /// Register `handle` under its pipeline name, replacing any previous entry.
  pub fn register(&self, handle: PipelineHandle) -> Option<PipelineHandle> {
    self
      .entries
      .write()
      .unwrap_or_else(PoisonError::into_inner)
      .insert(handle.name().to_string(), handle)
  }

  pub fn unregister(&self, name: &str) -> Option<PipelineHandle> {
    self
      .entries
      .write()
      .unwrap_or_else(PoisonError::into_inner)
      .remove(name)
  }

  pub fn get(&self, name: &str) -> Option<PipelineHandle> {
    self
      .entries
      .read()
      .unwrap_or_else(PoisonError::into_inner)
      .get(name)
      .cloned()
  }

  /// Registered names in sorted order.
  pub fn names(&self) -> Vec<String> {
    self
      .entries
      .read()
      .unwrap_or_else(PoisonError::into_inner)
      .keys()
      .cloned()
      .collect()
  }

  pub fn handles(&self) -> Vec<PipelineHandle> {
    self
      .entries
      .read()
      .unwrap_or_else(PoisonError::into_inner)
      .values()
      .cloned()
      .collect()
  }

  /// Handles of the pipelines that are running right now.
  pub fn running(&self) -> Vec<PipelineHandle> {
    self
      .handles()
      .into_iter()
      .filter(PipelineHandle::is_running)
      .collect()
  }

  /// Cancel every registered pipeline.
  pub fn cancel_all(&self) {
    for handle in self.handles() {
      handle.cancel();
    }
  }
}
