use std::sync::Arc;

use async_trait::async_trait;
use rigger_task::{Operation, RemoteStatus, StartResponse, TaskFamily};

use crate::error::ClientError;

/// The remote executor, as seen by the pipeline runtime.
///
/// Implementations must not retry on their own: a failed call is reported
/// once and retry is left to whoever triggered the pipeline.
#[async_trait]
pub trait TaskClient: Send + Sync {
  /// Start `operation`.
  async fn start(&self, operation: &Operation) -> Result<StartResponse, ClientError>;

  /// Fetch the cumulative status of task `task_id` from `family`'s endpoint.
  async fn status(&self, family: TaskFamily, task_id: &str) -> Result<RemoteStatus, ClientError>;
}

#[async_trait]
impl<T: TaskClient + ?Sized> TaskClient for Arc<T> {
  async fn start(&self, operation: &Operation) -> Result<StartResponse, ClientError> {
    (**self).start(operation).await
  }

  async fn status(&self, family: TaskFamily, task_id: &str) -> Result<RemoteStatus, ClientError> {
    (**self).status(family, task_id).await
  }
}
